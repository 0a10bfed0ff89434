//! Link lifecycle, breed rules and link queries.

use super::{LinkKey, World};
use crate::error::{Result, WorldError};
use crate::link::{Link, TieMode};
use crate::schema::{link_var, realloc, SlotLayout};
use terrarium_data::{AgentKind, AgentRef, LinkId, Program, TurtleId};

const STALE_RANK_BASE: usize = usize::MAX / 2;

impl World {
    fn resolve_link_breed(&self, breed: Option<&str>) -> Result<(String, usize)> {
        let name = breed.unwrap_or(Program::LINKS);
        match (self.link_breeds.rank(name), self.link_breeds.get(name)) {
            (Some(rank), Some(set)) => Ok((set.name().to_string(), rank)),
            _ => Err(WorldError::UnknownBreed {
                kind: AgentKind::Link,
                name: name.to_string(),
            }),
        }
    }

    /// Breeded and unbreeded links never share a world, and every link of
    /// one breed has the same directedness.
    fn check_link_compat(&self, breed: &str, directed: bool, ignore: Option<LinkId>) -> Result<()> {
        let breeded = breed != Program::LINKS;
        if let Some(other) = self.links.values().find(|l| Some(l.id()) != ignore) {
            if (other.breed() != Program::LINKS) != breeded {
                return Err(WorldError::MixedLinkBreeds);
            }
        }
        let set = self.link_breeds.get(breed);
        let conflict = match set {
            Some(set) if breeded => set.is_directed() != directed,
            Some(set) => {
                let others = set.iter().filter(|&id| Some(id) != ignore).count();
                others > 0 && set.is_directed() != directed
            }
            None => false,
        };
        if conflict {
            return Err(WorldError::LinkDirectednessConflict(breed.to_lowercase()));
        }
        Ok(())
    }

    /// Rank of a link in the link index. Links of a breed that no longer
    /// exists sort after every declared breed, each under a rank of its own
    /// so two of them between the same turtles keep separate keys.
    pub(crate) fn index_rank(&self, link: &Link) -> usize {
        self.link_breeds
            .rank(link.breed())
            .unwrap_or_else(|| STALE_RANK_BASE.saturating_add(link.id().0 as usize))
    }

    pub(crate) fn link_key(end1: TurtleId, end2: TurtleId, directed: bool, rank: usize) -> LinkKey {
        if directed || end1 <= end2 {
            (end1, end2, rank)
        } else {
            (end2, end1, rank)
        }
    }

    /// Creates a link from `end1` to `end2`.
    ///
    /// `directed` must agree with the breed's declaration; for plain links
    /// the first link decides.
    pub fn create_link(
        &mut self,
        end1: TurtleId,
        end2: TurtleId,
        breed: Option<&str>,
        directed: bool,
    ) -> Result<LinkId> {
        self.turtle(end1)?;
        self.turtle(end2)?;
        if end1 == end2 {
            return Err(WorldError::SelfLink(end1.0));
        }
        let (breed, rank) = self.resolve_link_breed(breed)?;
        self.check_link_compat(&breed, directed, None)?;
        let key = Self::link_key(end1, end2, directed, rank);
        if self.link_index.contains_key(&key) {
            let singular = self
                .link_breeds
                .get(&breed)
                .map_or("link", |b| b.singular())
                .to_lowercase();
            return Err(WorldError::LinkExists {
                breed: singular,
                end1: key.0 .0,
                end2: key.1 .0,
            });
        }
        let slots = SlotLayout::resolve(&self.program, AgentKind::Link, &breed, self.is_3d())
            .map_or(0, |l| l.len());
        let id = LinkId(self.next_link_id);
        self.next_link_id += 1;
        let link = Link::new(
            id,
            end1,
            end2,
            directed,
            &breed,
            self.shapes.link_shape_for(&breed),
            slots,
        );
        self.links.insert(id, link);
        self.link_index.insert(key, id);
        for end in [end1, end2] {
            self.turtle_mut(end)?.links.push(id);
        }
        if breed == Program::LINKS {
            self.link_breeds.universal_mut().set_directed(directed);
        }
        self.link_breeds.enroll(&breed, id);
        self.metrics.record_link_created();
        tracing::debug!(link = id.0, end1 = end1.0, end2 = end2.0, breed = %breed, "Link created");
        Ok(id)
    }

    /// Kills a link. Killing a dead link does nothing. Returns whether the
    /// link was alive.
    pub fn kill_link(&mut self, id: LinkId) -> bool {
        let Some(link) = self.links.remove(&id) else {
            return false;
        };
        let rank = self.index_rank(&link);
        self.link_index
            .remove(&Self::link_key(link.end1(), link.end2(), link.is_directed(), rank));
        for end in [link.end1(), link.end2()] {
            if let Some(t) = self.turtles.get_mut(&end) {
                t.unlink(id);
            }
        }
        if link.is_tied() {
            self.tie_count = self.tie_count.saturating_sub(1);
        }
        self.link_breeds.withdraw(link.breed(), id);
        self.observer.forget(AgentRef::Link(id));
        self.metrics.record_link_died();
        tracing::debug!(link = id.0, "Link died");
        true
    }

    /// Moves a link into another link breed, migrating its breed-owned
    /// variables by name.
    pub fn set_link_breed(&mut self, id: LinkId, breed: &str) -> Result<()> {
        let (breed, rank) = self.resolve_link_breed(Some(breed))?;
        let link = self.link(id)?;
        if link.breed() == breed {
            return Ok(());
        }
        let directed = link.is_directed();
        self.check_link_compat(&breed, directed, Some(id))?;
        let (end1, end2) = (link.end1(), link.end2());
        let old_rank = self.index_rank(link);
        let new_key = Self::link_key(end1, end2, directed, rank);
        if self.link_index.contains_key(&new_key) {
            return Err(WorldError::LinkExists {
                breed: breed.to_lowercase(),
                end1: end1.0,
                end2: end2.0,
            });
        }
        let is_3d = self.is_3d();
        let new = SlotLayout::resolve(&self.program, AgentKind::Link, &breed, is_3d).ok_or_else(
            || WorldError::UnknownBreed {
                kind: AgentKind::Link,
                name: breed.clone(),
            },
        )?;
        let link = self
            .links
            .get_mut(&id)
            .ok_or_else(|| WorldError::dead(format!("link #{}", id.0)))?;
        let old = match &link.stale {
            Some(stale) => stale.layout(AgentKind::Link, is_3d),
            None => SlotLayout::resolve(&self.program, AgentKind::Link, &link.breed, is_3d)
                .unwrap_or(SlotLayout {
                    breed_owned: &[],
                    ..new
                }),
        };
        link.vars = realloc(std::mem::take(&mut link.vars), &old, &new);
        link.stale = None;
        link.vars[link_var::SHAPE] = self.shapes.link_shape_for(&breed).into();
        let old_breed = std::mem::replace(&mut link.breed, breed.clone());
        self.link_index
            .remove(&Self::link_key(end1, end2, directed, old_rank));
        self.link_index.insert(new_key, id);
        self.link_breeds.withdraw(&old_breed, id);
        self.link_breeds.enroll(&breed, id);
        Ok(())
    }

    /// The link joining two turtles in `breed`, if any. Undirected links
    /// match in either order; directed links only from `from` to `to`.
    pub fn find_link(
        &self,
        from: TurtleId,
        to: TurtleId,
        breed: Option<&str>,
    ) -> Result<Option<LinkId>> {
        let (_, rank) = self.resolve_link_breed(breed)?;
        if let Some(&id) = self.link_index.get(&(from, to, rank)) {
            return Ok(Some(id));
        }
        Ok(self
            .link_index
            .get(&(to, from, rank))
            .copied()
            .filter(|id| self.links.get(id).is_some_and(|l| !l.is_directed())))
    }

    /// Links attached to a turtle, in creation order.
    pub fn links_of(&self, turtle: TurtleId) -> Result<Vec<LinkId>> {
        Ok(self.turtle(turtle)?.links.clone())
    }

    fn neighbors_by<F>(&self, turtle: TurtleId, breed: Option<&str>, keep: F) -> Result<Vec<TurtleId>>
    where
        F: Fn(&Link) -> bool,
    {
        let filter_breed = match breed {
            Some(b) => Some(self.resolve_link_breed(Some(b))?.0),
            None => None,
        };
        let mut out: Vec<TurtleId> = self
            .turtle(turtle)?
            .links
            .iter()
            .filter_map(|id| self.links.get(id))
            .filter(|l| filter_breed.as_deref().map_or(true, |b| l.breed() == b))
            .filter(|l| keep(l))
            .filter_map(|l| l.other_end(turtle))
            .collect();
        out.sort_unstable();
        out.dedup();
        Ok(out)
    }

    /// Turtles at the other end of any link attached to `turtle`.
    pub fn link_neighbors(&self, turtle: TurtleId, breed: Option<&str>) -> Result<Vec<TurtleId>> {
        self.neighbors_by(turtle, breed, |_| true)
    }

    /// Turtles reachable along an outgoing directed link or an undirected
    /// link.
    pub fn out_link_neighbors(
        &self,
        turtle: TurtleId,
        breed: Option<&str>,
    ) -> Result<Vec<TurtleId>> {
        self.neighbors_by(turtle, breed, |l| !l.is_directed() || l.end1() == turtle)
    }

    /// Turtles with an incoming directed link or an undirected link to
    /// `turtle`.
    pub fn in_link_neighbors(
        &self,
        turtle: TurtleId,
        breed: Option<&str>,
    ) -> Result<Vec<TurtleId>> {
        self.neighbors_by(turtle, breed, |l| !l.is_directed() || l.end2() == turtle)
    }

    /// True if any link joins the two turtles, in either direction.
    pub fn is_linked_with(&self, a: TurtleId, b: TurtleId) -> Result<bool> {
        Ok(self.link_neighbors(a, None)?.contains(&b))
    }

    pub fn other_end(&self, link: LinkId, turtle: TurtleId) -> Result<Option<TurtleId>> {
        Ok(self.link(link)?.other_end(turtle))
    }

    pub fn set_tie_mode(&mut self, id: LinkId, mode: TieMode) -> Result<()> {
        let link = self
            .links
            .get_mut(&id)
            .ok_or_else(|| WorldError::dead(format!("link #{}", id.0)))?;
        let was_tied = link.is_tied();
        link.vars[link_var::TIE_MODE] = mode.as_str().into();
        match (was_tied, mode != TieMode::None) {
            (false, true) => self.tie_count += 1,
            (true, false) => self.tie_count = self.tie_count.saturating_sub(1),
            _ => {}
        }
        Ok(())
    }

    /// Ties the far end rigidly to the near end.
    pub fn tie(&mut self, id: LinkId) -> Result<()> {
        self.set_tie_mode(id, TieMode::Fixed)
    }

    pub fn untie(&mut self, id: LinkId) -> Result<()> {
        self.set_tie_mode(id, TieMode::None)
    }

    /// Length of a link, wrap-aware.
    pub fn link_length(&self, id: LinkId) -> Result<f64> {
        let link = self.link(id)?;
        self.distance(link.end1().into(), link.end2().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agentset::AgentSet;
    use crate::topology::{Point, Topology};
    use terrarium_data::{BreedDecl, Value};

    fn world(program: Program) -> World {
        World::new(Topology::torus(-5, 5, -5, 5), program).unwrap()
    }

    fn turtles(w: &mut World, n: usize) -> Vec<TurtleId> {
        w.create_turtles(n, None).unwrap()
    }

    #[test]
    fn test_create_and_find_undirected() {
        let mut w = world(Program::new());
        let t = turtles(&mut w, 2);
        let link = w.create_link(t[1], t[0], None, false).unwrap();
        assert_eq!(w.link(link).unwrap().end1(), t[0]);
        assert_eq!(w.find_link(t[0], t[1], None).unwrap(), Some(link));
        assert_eq!(w.find_link(t[1], t[0], None).unwrap(), Some(link));
        assert_eq!(w.links_of(t[0]).unwrap(), vec![link]);
        assert!(w.is_linked_with(t[1], t[0]).unwrap());
    }

    #[test]
    fn test_duplicate_link_rejected() {
        let mut w = world(Program::new());
        let t = turtles(&mut w, 2);
        w.create_link(t[0], t[1], None, false).unwrap();
        assert!(matches!(
            w.create_link(t[1], t[0], None, false),
            Err(WorldError::LinkExists { .. })
        ));
    }

    #[test]
    fn test_directed_find_is_one_way() {
        let mut w = world(Program::new());
        let t = turtles(&mut w, 2);
        let link = w.create_link(t[1], t[0], None, true).unwrap();
        assert_eq!(w.find_link(t[1], t[0], None).unwrap(), Some(link));
        assert_eq!(w.find_link(t[0], t[1], None).unwrap(), None);
        assert_eq!(w.out_link_neighbors(t[1], None).unwrap(), vec![t[0]]);
        assert!(w.out_link_neighbors(t[0], None).unwrap().is_empty());
        assert_eq!(w.in_link_neighbors(t[0], None).unwrap(), vec![t[1]]);
        // A reverse directed link is a different link.
        w.create_link(t[0], t[1], None, true).unwrap();
        assert_eq!(w.link_count(), 2);
    }

    #[test]
    fn test_self_link_and_dead_end() {
        let mut w = world(Program::new());
        let t = turtles(&mut w, 2);
        assert_eq!(
            w.create_link(t[0], t[0], None, false),
            Err(WorldError::SelfLink(0))
        );
        w.kill_turtle(t[1]);
        assert!(matches!(
            w.create_link(t[0], t[1], None, false),
            Err(WorldError::DeadAgent(_))
        ));
    }

    #[test]
    fn test_breeded_and_unbreeded_do_not_mix() {
        let mut w = world(Program::new().link_breed(BreedDecl::new("roads", "road")));
        let t = turtles(&mut w, 3);
        w.create_link(t[0], t[1], Some("roads"), false).unwrap();
        assert_eq!(
            w.create_link(t[1], t[2], None, false),
            Err(WorldError::MixedLinkBreeds)
        );
    }

    #[test]
    fn test_directedness_must_match_breed() {
        let mut w = world(Program::new().link_breed(BreedDecl::new("streets", "street").directed(true)));
        let t = turtles(&mut w, 2);
        assert!(matches!(
            w.create_link(t[0], t[1], Some("streets"), false),
            Err(WorldError::LinkDirectednessConflict(_))
        ));
        let mut w = world(Program::new());
        let t = turtles(&mut w, 3);
        w.create_link(t[0], t[1], None, true).unwrap();
        assert!(matches!(
            w.create_link(t[1], t[2], None, false),
            Err(WorldError::LinkDirectednessConflict(_))
        ));
    }

    #[test]
    fn test_turtle_death_cascades_to_links() {
        let mut w = world(Program::new());
        let t = turtles(&mut w, 3);
        let a = w.create_link(t[0], t[1], None, false).unwrap();
        let b = w.create_link(t[1], t[2], None, false).unwrap();
        w.kill_turtle(t[1]);
        assert!(w.link(a).is_err());
        assert!(w.link(b).is_err());
        assert!(w.links_of(t[0]).unwrap().is_empty());
        assert!(w.links_of(t[2]).unwrap().is_empty());
        assert!(!w.kill_link(a));
    }

    #[test]
    fn test_links_iterate_in_canonical_order() {
        let mut w = world(Program::new());
        let t = turtles(&mut w, 3);
        w.create_link(t[1], t[2], None, false).unwrap();
        w.create_link(t[0], t[2], None, false).unwrap();
        w.create_link(t[0], t[1], None, false).unwrap();
        let ends: Vec<(u64, u64)> = w.links().map(|l| (l.end1().0, l.end2().0)).collect();
        assert_eq!(ends, vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn test_set_link_breed_migrates_vars() {
        let program = Program::new()
            .links_own(["weight"])
            .link_breed(BreedDecl::new("roads", "road").owns(["lanes"]))
            .link_breed(BreedDecl::new("rails", "rail").owns(["gauge"]));
        let mut w = world(program);
        let t = turtles(&mut w, 2);
        let link = w.create_link(t[0], t[1], Some("roads"), false).unwrap();
        w.set_link_variable_named(link, "weight", Value::Number(2.0)).unwrap();
        w.set_link_breed(link, "rails").unwrap();
        assert_eq!(w.link_variable_named(link, "weight").unwrap(), Value::Number(2.0));
        assert_eq!(w.link_variable_named(link, "gauge").unwrap(), Value::ZERO);
        assert_eq!(w.find_link(t[0], t[1], Some("rails")).unwrap(), Some(link));
        assert_eq!(w.find_link(t[0], t[1], Some("roads")).unwrap(), None);
        assert_eq!(w.describe(link.into()), "rail 0 1");
    }

    #[test]
    fn test_stale_links_between_same_turtles_stay_indexed() {
        let program = Program::new()
            .link_breed(BreedDecl::new("roads", "road").owns(["lanes"]))
            .link_breed(BreedDecl::new("rails", "rail"));
        let mut w = world(program);
        let t = turtles(&mut w, 2);
        let road = w.create_link(t[0], t[1], Some("roads"), false).unwrap();
        let rail = w.create_link(t[0], t[1], Some("rails"), false).unwrap();
        w.set_link_variable_named(road, "lanes", Value::Number(4.0)).unwrap();

        let report = w.recompile(Program::new());
        assert_eq!(report.stale_links, vec![road, rail]);
        assert_eq!(w.link_count(), 2);
        assert_eq!(
            w.members(&AgentSet::AllLinks).unwrap(),
            vec![AgentRef::Link(road), AgentRef::Link(rail)]
        );
        assert_eq!(w.link_variable_named(road, "lanes").unwrap(), Value::Number(4.0));

        assert!(w.kill_link(road));
        assert_eq!(w.members(&AgentSet::AllLinks).unwrap(), vec![AgentRef::Link(rail)]);
        assert!(w.kill_link(rail));
        assert_eq!(w.link_count(), 0);
        assert!(w.members(&AgentSet::AllLinks).unwrap().is_empty());
    }

    #[test]
    fn test_link_length_wraps() {
        let mut w = world(Program::new());
        let a = w.create_turtle_at(Point::new(-5.0, 0.0), None).unwrap();
        let b = w.create_turtle_at(Point::new(5.0, 0.0), None).unwrap();
        let link = w.create_link(a, b, None, false).unwrap();
        assert!((w.link_length(link).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_tie_count_tracks_modes() {
        let mut w = world(Program::new());
        let t = turtles(&mut w, 2);
        let link = w.create_link(t[0], t[1], None, false).unwrap();
        w.tie(link).unwrap();
        w.set_tie_mode(link, TieMode::Free).unwrap();
        assert_eq!(w.tie_count, 1);
        w.untie(link).unwrap();
        assert_eq!(w.tie_count, 0);
        w.tie(link).unwrap();
        w.kill_link(link);
        assert_eq!(w.tie_count, 0);
    }
}
