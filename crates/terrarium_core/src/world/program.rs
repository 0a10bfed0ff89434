//! Program recompilation and world resizing.

use super::{build_patches, LinkKey, World};
use crate::agentset::Breeds;
use crate::error::{Result, WorldError};
use crate::schema::{predefined, realloc, SlotLayout, StaleSlots};
use crate::topology::Topology;
use serde::Serialize;
use terrarium_data::{AgentKind, AgentRef, LinkId, PatchId, Program, TurtleId};

/// Agents a recompile left untouched because their breed is gone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecompileReport {
    pub stale_turtles: Vec<TurtleId>,
    pub stale_links: Vec<LinkId>,
}

impl RecompileReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.stale_turtles.is_empty() && self.stale_links.is_empty()
    }
}

/// Old layout of an agent, or a breedless one when the old program did not
/// know its breed either.
fn old_layout<'a>(
    program: &'a Program,
    kind: AgentKind,
    breed: &str,
    is_3d: bool,
) -> SlotLayout<'a> {
    SlotLayout::resolve(program, kind, breed, is_3d).unwrap_or_else(|| SlotLayout {
        predefined: predefined(kind, is_3d),
        kind_owned: match kind {
            AgentKind::Link => &program.links_own,
            AgentKind::Patch => &program.patches_own,
            AgentKind::Turtle => &program.turtles_own,
        },
        breed_owned: &[],
    })
}

impl World {
    /// Swaps in a new program and migrates every agent's variables to it.
    ///
    /// Breed sets are rebuilt in the new declaration order; surviving breeds
    /// keep their members. Turtles and links whose breed no longer exists
    /// keep their values and their old slot names until they join a
    /// declared breed again, and are listed in the report.
    pub fn recompile(&mut self, program: Program) -> RecompileReport {
        let old_program = std::mem::replace(&mut self.program, program.normalized());
        let old_turtles = std::mem::replace(&mut self.turtle_breeds, Breeds::for_turtles(&self.program));
        old_turtles.carry_into(&mut self.turtle_breeds);
        let old_links = std::mem::replace(&mut self.link_breeds, Breeds::for_links(&self.program));
        old_links.carry_into(&mut self.link_breeds);

        let report = self.migrate_agents(&old_program);
        self.reindex_links();

        if !report.is_clean() {
            tracing::warn!(
                turtles = report.stale_turtles.len(),
                links = report.stale_links.len(),
                "Agents left in breeds that no longer exist"
            );
        }
        tracing::info!(
            breeds = self.program.breeds.len(),
            link_breeds = self.program.link_breeds.len(),
            "Program recompiled"
        );
        report
    }

    fn migrate_agents(&mut self, old_program: &Program) -> RecompileReport {
        let is_3d = self.is_3d();
        let program = &self.program;
        let mut report = RecompileReport::default();

        let old = old_layout(old_program, AgentKind::Patch, "", is_3d);
        let new = old_layout(program, AgentKind::Patch, "", is_3d);
        for patch in self.patches.iter_mut() {
            patch.vars = realloc(std::mem::take(&mut patch.vars), &old, &new);
        }

        for turtle in self.turtles.values_mut() {
            let old = match &turtle.stale {
                Some(stale) => stale.layout(AgentKind::Turtle, is_3d),
                None => old_layout(old_program, AgentKind::Turtle, &turtle.breed, is_3d),
            };
            match SlotLayout::resolve(program, AgentKind::Turtle, &turtle.breed, is_3d) {
                Some(new) => {
                    turtle.vars = realloc(std::mem::take(&mut turtle.vars), &old, &new);
                    if turtle.stale.take().is_some() {
                        self.turtle_breeds.enroll(&turtle.breed, turtle.id());
                    }
                }
                None => {
                    report.stale_turtles.push(turtle.id());
                    turtle.stale = Some(StaleSlots::capture(&old));
                }
            }
        }

        for link in self.links.values_mut() {
            let old = match &link.stale {
                Some(stale) => stale.layout(AgentKind::Link, is_3d),
                None => old_layout(old_program, AgentKind::Link, &link.breed, is_3d),
            };
            match SlotLayout::resolve(program, AgentKind::Link, &link.breed, is_3d) {
                Some(new) => {
                    link.vars = realloc(std::mem::take(&mut link.vars), &old, &new);
                    if link.stale.take().is_some() {
                        self.link_breeds.enroll(&link.breed, link.id());
                    }
                }
                None => {
                    report.stale_links.push(link.id());
                    link.stale = Some(StaleSlots::capture(&old));
                }
            }
        }
        report
    }

    /// Rebuilds the link index after breed ranks changed.
    fn reindex_links(&mut self) {
        let entries: Vec<(LinkKey, LinkId)> = self
            .links
            .values()
            .map(|l| {
                let rank = self.index_rank(l);
                (Self::link_key(l.end1(), l.end2(), l.is_directed(), rank), l.id())
            })
            .collect();
        self.link_index = entries.into_iter().collect();
    }

    /// Replaces the patch grid with one for `topology`.
    ///
    /// Patches start over with default values. Turtles outside the new
    /// bounds die; the rest are re-registered on their new patches. The
    /// number of dimensions cannot change.
    pub fn resize(&mut self, topology: Topology) -> Result<()> {
        if !topology.contains_origin() {
            return Err(WorldError::OriginOutsideWorld);
        }
        if topology.is_3d() != self.is_3d() {
            return Err(WorldError::DimensionMismatch {
                from: self.topology.dimensions(),
                to: topology.dimensions(),
            });
        }

        let outside: Vec<TurtleId> = self
            .turtles
            .values()
            .filter(|t| !topology.contains(t.position()))
            .map(|t| t.id())
            .collect();
        for &id in &outside {
            self.kill_turtle(id);
        }

        self.patches = build_patches(&topology, &self.program);
        self.topology = topology;
        if matches!(self.observer.target(), Some(AgentRef::Patch(_))) {
            self.observer.reset_perspective();
        }

        let placements: Vec<(TurtleId, Option<PatchId>)> = self
            .turtles
            .values()
            .map(|t| (t.id(), self.patch_at_point(t.position())))
            .collect();
        for (id, patch) in placements {
            match patch {
                Some(patch) => {
                    if let Some(t) = self.turtles.get_mut(&id) {
                        t.patch = patch;
                    }
                    self.patches[patch.0].add_turtle(id);
                }
                None => {
                    self.kill_turtle(id);
                }
            }
        }

        let program = self.program.clone();
        self.migrate_agents(&program);

        tracing::info!(
            topology = self.topology.name(),
            patches = self.patches.len(),
            turtles = self.turtles.len(),
            died = outside.len(),
            "World resized"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agentset::AgentSet;
    use crate::topology::{Axis, Point};
    use terrarium_data::{BreedDecl, Value};

    fn program() -> Program {
        Program::new()
            .turtles_own(["energy", "age"])
            .patches_own(["chemical"])
            .breed(BreedDecl::new("wolves", "wolf").owns(["speed"]))
            .breed(BreedDecl::new("sheep", "a-sheep"))
            .link_breed(BreedDecl::new("roads", "road"))
    }

    fn world() -> World {
        World::new(Topology::torus(-3, 3, -3, 3), program()).unwrap()
    }

    #[test]
    fn test_recompile_keeps_values_across_reorder() {
        let mut w = world();
        let id = w.create_turtle(Some("wolves")).unwrap();
        w.set_turtle_variable_named(id, "energy", 5.0.into()).unwrap();
        w.set_turtle_variable_named(id, "age", 2.0.into()).unwrap();
        w.set_turtle_variable_named(id, "speed", 1.5.into()).unwrap();
        w.set_turtle_variable_named(id, "color", 15.0.into()).unwrap();

        let report = w.recompile(
            Program::new()
                .turtles_own(["age", "size-class", "energy"])
                .patches_own(["chemical"])
                .breed(BreedDecl::new("sheep", "a-sheep"))
                .breed(BreedDecl::new("wolves", "wolf").owns(["hunger", "speed"]))
                .link_breed(BreedDecl::new("roads", "road")),
        );
        assert!(report.is_clean());
        assert_eq!(w.turtle_variable_named(id, "energy").unwrap(), Value::Number(5.0));
        assert_eq!(w.turtle_variable_named(id, "age").unwrap(), Value::Number(2.0));
        assert_eq!(w.turtle_variable_named(id, "size-class").unwrap(), Value::ZERO);
        assert_eq!(w.turtle_variable_named(id, "speed").unwrap(), Value::Number(1.5));
        assert_eq!(w.turtle_variable_named(id, "hunger").unwrap(), Value::ZERO);
        assert_eq!(w.turtle_variable_named(id, "color").unwrap(), Value::Number(15.0));
        assert_eq!(w.turtle_breeds().rank("WOLVES"), Some(2));
        assert!(w.turtle_breeds().get("wolves").unwrap().contains(&id));
    }

    #[test]
    fn test_recompile_reports_vanished_breeds() {
        let mut w = world();
        let wolf = w.create_turtle(Some("wolves")).unwrap();
        let plain = w.create_turtle(None).unwrap();
        let a = w.create_turtle(None).unwrap();
        let road = w.create_link(plain, a, Some("roads"), false).unwrap();
        w.set_turtle_variable_named(wolf, "speed", 3.0.into()).unwrap();

        let report = w.recompile(Program::new().turtles_own(["energy", "age"]));
        assert_eq!(report.stale_turtles, vec![wolf]);
        assert_eq!(report.stale_links, vec![road]);
        // Untouched: the breed-owned value is still in its old slot.
        assert_eq!(
            w.turtle(wolf).unwrap().vars.last(),
            Some(&Value::Number(3.0))
        );
        assert!(w.turtle_breeds().get("WOLVES").is_none());
        assert_eq!(w.members(&AgentSet::AllLinks).unwrap(), vec![AgentRef::Link(road)]);
        assert!(w.kill_link(road));
        assert_eq!(w.link_count(), 0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stale_turtles"], serde_json::json!([0]));
    }

    #[test]
    fn test_returning_breed_restores_stale_values() {
        let mut w = world();
        let wolf = w.create_turtle(Some("wolves")).unwrap();
        w.set_turtle_variable_named(wolf, "energy", 5.0.into()).unwrap();
        w.set_turtle_variable_named(wolf, "speed", 3.0.into()).unwrap();

        let report = w.recompile(Program::new().turtles_own(["age", "energy"]));
        assert_eq!(report.stale_turtles, vec![wolf]);
        let report = w.recompile(Program::new().turtles_own(["energy"]));
        assert_eq!(report.stale_turtles, vec![wolf]);
        assert_eq!(w.turtle_variable_named(wolf, "speed").unwrap(), Value::Number(3.0));

        let report = w.recompile(
            Program::new()
                .turtles_own(["energy"])
                .breed(BreedDecl::new("wolves", "wolf").owns(["speed"])),
        );
        assert!(report.is_clean());
        assert!(w.turtle(wolf).unwrap().stale.is_none());
        assert_eq!(w.turtle_variable_named(wolf, "energy").unwrap(), Value::Number(5.0));
        assert_eq!(w.turtle_variable_named(wolf, "speed").unwrap(), Value::Number(3.0));
        assert!(w.turtle_variable_named(wolf, "age").is_err());
        assert!(w.turtle_breeds().get("wolves").unwrap().contains(&wolf));
    }

    #[test]
    fn test_recompile_migrates_patches() {
        let mut w = world();
        let p = w.patch_at(1.0, 1.0).unwrap();
        w.set_patch_variable_named(p, "chemical", 8.0.into()).unwrap();
        w.recompile(Program::new().patches_own(["food", "chemical"]));
        assert_eq!(w.patch_variable_named(p, "chemical").unwrap(), Value::Number(8.0));
        assert_eq!(w.patch_variable_named(p, "food").unwrap(), Value::ZERO);
        assert_eq!(w.patch_variable_named(p, "pxcor").unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_resize_kills_turtles_outside() {
        let mut w = world();
        let inside = w.create_turtle_at(Point::new(1.0, 1.0), None).unwrap();
        let outside = w.create_turtle_at(Point::new(3.0, -3.0), None).unwrap();
        let link = w.create_link(inside, outside, None, false).unwrap();
        w.set_turtle_variable_named(inside, "energy", 4.0.into()).unwrap();

        w.resize(Topology::torus(-2, 2, -2, 2)).unwrap();
        assert_eq!(w.patch_count(), 25);
        assert!(w.turtle(outside).is_err());
        assert!(w.link(link).is_err());
        let here = w.patch_here(inside).unwrap();
        assert_eq!(w.patch(here).unwrap().coord(), crate::topology::Coord::new(1, 1));
        assert_eq!(w.turtles_here(here), &[inside]);
        assert_eq!(w.turtle_variable_named(inside, "energy").unwrap(), Value::Number(4.0));
    }

    #[test]
    fn test_resize_checks_bounds_and_dimensions() {
        let mut w = world();
        assert_eq!(
            w.resize(Topology::torus(1, 3, 1, 3)),
            Err(WorldError::OriginOutsideWorld)
        );
        let err = w
            .resize(Topology::torus(-1, 1, -1, 1).with_z(Axis::new(-1, 1, true)))
            .unwrap_err();
        assert_eq!(err, WorldError::DimensionMismatch { from: 2, to: 3 });
        assert_eq!(w.patch_count(), 49);
    }

    #[test]
    fn test_resize_keeps_who_counter() {
        let mut w = world();
        w.create_turtles(3, None).unwrap();
        w.resize(Topology::torus(-5, 5, -5, 5)).unwrap();
        assert_eq!(w.create_turtle(None).unwrap(), TurtleId(3));
    }
}
