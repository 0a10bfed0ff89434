//! The world: patches, turtles, links and the indices that tie them together.
//!
//! Turtles and links live in id-keyed arenas. A missing id means the agent
//! is dead, so stale handles are detected rather than dereferenced. Patches
//! are a dense row-major array that only changes when the world is resized.

mod links;
mod program;
mod ties;
mod turtles;
mod variables;

pub use program::RecompileReport;

use crate::agentset::{self, AgentSet, Breeds};
use crate::config::WorldConfig;
use crate::drawing::{DrawingSink, NullDrawing, TrailBounds};
use crate::error::{Result, WorldError};
use crate::link::Link;
use crate::metrics::WorldMetrics;
use crate::observer::{BreedShapes, Observer};
use crate::patch::Patch;
use crate::schema::SlotLayout;
use crate::topology::{Coord, Neighborhood, Point, Topology};
use crate::turtle::Turtle;
use rand::Rng;
use std::collections::BTreeMap;
use terrarium_data::{AgentKind, AgentRef, LinkId, PatchId, Program, TurtleId};

/// Canonical link order: end1, end2, then breed rank.
pub(crate) type LinkKey = (TurtleId, TurtleId, usize);

pub struct World {
    pub(crate) topology: Topology,
    pub(crate) patch_size: f64,
    pub(crate) program: Program,
    pub(crate) patches: Vec<Patch>,
    pub(crate) turtles: BTreeMap<TurtleId, Turtle>,
    pub(crate) links: BTreeMap<LinkId, Link>,
    pub(crate) link_index: BTreeMap<LinkKey, LinkId>,
    pub(crate) turtle_breeds: Breeds<TurtleId>,
    pub(crate) link_breeds: Breeds<LinkId>,
    pub(crate) next_who: u64,
    pub(crate) next_link_id: u64,
    pub(crate) tie_count: usize,
    pub(crate) observer: Observer,
    pub(crate) shapes: BreedShapes,
    pub(crate) drawing: Box<dyn DrawingSink>,
    pub(crate) metrics: WorldMetrics,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("topology", &self.topology)
            .field("patches", &self.patches.len())
            .field("turtles", &self.turtles.len())
            .field("links", &self.links.len())
            .finish()
    }
}

impl World {
    /// Creates an empty world. The origin patch must lie inside `topology`.
    pub fn new(topology: Topology, program: Program) -> Result<Self> {
        if !topology.contains_origin() {
            return Err(WorldError::OriginOutsideWorld);
        }
        let program = program.normalized();
        let patches = build_patches(&topology, &program);
        tracing::info!(
            topology = topology.name(),
            dimensions = topology.dimensions(),
            patches = patches.len(),
            "World created"
        );
        Ok(Self {
            topology,
            patch_size: 13.0,
            turtle_breeds: Breeds::for_turtles(&program),
            link_breeds: Breeds::for_links(&program),
            program,
            patches,
            turtles: BTreeMap::new(),
            links: BTreeMap::new(),
            link_index: BTreeMap::new(),
            next_who: 0,
            next_link_id: 0,
            tie_count: 0,
            observer: Observer::new(),
            shapes: BreedShapes::new(),
            drawing: Box::new(NullDrawing),
            metrics: WorldMetrics::new(),
        })
    }

    pub fn from_config(config: &WorldConfig, program: Program) -> Result<Self> {
        let mut world = Self::new(config.topology(), program)?;
        world.patch_size = config.patch_size;
        Ok(world)
    }

    /// Routes pen trails to `sink` from now on.
    pub fn set_drawing<S: DrawingSink + 'static>(&mut self, sink: S) {
        self.drawing = Box::new(sink);
    }

    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    #[inline]
    #[must_use]
    pub fn is_3d(&self) -> bool {
        self.topology.is_3d()
    }

    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    #[must_use]
    pub fn patch_size(&self) -> f64 {
        self.patch_size
    }

    #[must_use]
    pub fn metrics(&self) -> &WorldMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut Observer {
        &mut self.observer
    }

    #[must_use]
    pub fn shapes(&self) -> &BreedShapes {
        &self.shapes
    }

    pub fn shapes_mut(&mut self) -> &mut BreedShapes {
        &mut self.shapes
    }

    #[must_use]
    pub fn turtle_breeds(&self) -> &Breeds<TurtleId> {
        &self.turtle_breeds
    }

    #[must_use]
    pub fn link_breeds(&self) -> &Breeds<LinkId> {
        &self.link_breeds
    }

    /// Changes which axes wrap. Cached neighbor lists are rebuilt lazily.
    pub fn set_wrapping(&mut self, wrap_x: bool, wrap_y: bool, wrap_z: bool) {
        self.topology.set_wrapping(wrap_x, wrap_y, wrap_z);
        for patch in self.patches.iter_mut() {
            patch.neighbors.take();
            patch.neighbors4.take();
        }
        tracing::info!(topology = self.topology.name(), "Wrapping changed");
    }

    pub(crate) fn trail_bounds(&self) -> TrailBounds {
        TrailBounds {
            min_x: self.topology.x.lower_edge(),
            max_x: self.topology.x.upper_edge(),
            min_y: self.topology.y.lower_edge(),
            max_y: self.topology.y.upper_edge(),
        }
    }

    // ---- patches ----

    #[must_use]
    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }

    #[must_use]
    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    #[must_use]
    pub fn patch(&self, id: PatchId) -> Option<&Patch> {
        self.patches.get(id.0)
    }

    pub(crate) fn patch_or_err(&self, id: PatchId) -> Result<&Patch> {
        self.patches
            .get(id.0)
            .ok_or_else(|| WorldError::dead(format!("patch #{}", id.0)))
    }

    /// Patch at integer coordinates, without wrapping.
    #[must_use]
    pub fn patch_at_coord(&self, coord: Coord) -> Option<PatchId> {
        self.topology.index_of(coord).map(PatchId)
    }

    /// Patch containing the point `(x, y)`, wrapping where allowed.
    #[must_use]
    pub fn patch_at(&self, x: f64, y: f64) -> Option<PatchId> {
        self.patch_at_point(Point::new(x, y))
    }

    #[must_use]
    pub fn patch_at_point(&self, p: Point) -> Option<PatchId> {
        self.topology
            .coord_of(p)
            .and_then(|c| self.topology.index_of(c))
            .map(PatchId)
    }

    /// Patch at offset `(dx, dy)` from an agent. `None` past a wall.
    pub fn patch_at_offset(&self, agent: AgentRef, dx: f64, dy: f64) -> Result<Option<PatchId>> {
        let origin = self.position_of(agent)?;
        Ok(self.patch_at_point(Point::new3(origin.x + dx, origin.y + dy, origin.z)))
    }

    /// Patch `distance` away from an agent along `heading`.
    pub fn patch_at_heading_and_distance(
        &self,
        agent: AgentRef,
        heading: f64,
        distance: f64,
    ) -> Result<Option<PatchId>> {
        let rad = heading.to_radians();
        self.patch_at_offset(agent, distance * rad.sin(), distance * rad.cos())
    }

    pub(crate) fn patch_for(&self, p: Point) -> Result<PatchId> {
        self.patch_at_point(p).ok_or(WorldError::BeyondWorldEdge)
    }

    /// The eight (26 in 3D) surrounding patches.
    #[must_use]
    pub fn neighbors(&self, patch: PatchId) -> &[PatchId] {
        self.cached_neighbors(patch, Neighborhood::Moore)
    }

    /// The four (six in 3D) face-adjacent patches.
    #[must_use]
    pub fn neighbors4(&self, patch: PatchId) -> &[PatchId] {
        self.cached_neighbors(patch, Neighborhood::Cardinal)
    }

    fn cached_neighbors(&self, patch: PatchId, kind: Neighborhood) -> &[PatchId] {
        let Some(p) = self.patches.get(patch.0) else {
            return &[];
        };
        let cell = match kind {
            Neighborhood::Moore => &p.neighbors,
            Neighborhood::Cardinal => &p.neighbors4,
        };
        cell.get_or_init(|| {
            self.topology
                .neighbors(p.coord(), kind)
                .into_iter()
                .filter_map(|c| self.topology.index_of(c).map(PatchId))
                .collect()
        })
    }

    // ---- turtles and links ----

    pub fn turtle(&self, id: TurtleId) -> Result<&Turtle> {
        self.turtles
            .get(&id)
            .ok_or_else(|| WorldError::dead(format!("turtle {}", id.0)))
    }

    pub(crate) fn turtle_mut(&mut self, id: TurtleId) -> Result<&mut Turtle> {
        self.turtles
            .get_mut(&id)
            .ok_or_else(|| WorldError::dead(format!("turtle {}", id.0)))
    }

    /// Live turtles in who-number order.
    pub fn turtles(&self) -> impl Iterator<Item = &Turtle> {
        self.turtles.values()
    }

    #[must_use]
    pub fn turtle_count(&self) -> usize {
        self.turtles.len()
    }

    pub fn link(&self, id: LinkId) -> Result<&Link> {
        self.links
            .get(&id)
            .ok_or_else(|| WorldError::dead(format!("link #{}", id.0)))
    }

    /// Live links ordered by end1, end2, then breed.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.link_index.values().filter_map(|id| self.links.get(id))
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_alive(&self, agent: AgentRef) -> bool {
        match agent {
            AgentRef::Turtle(id) => self.turtles.contains_key(&id),
            AgentRef::Patch(id) => id.0 < self.patches.len(),
            AgentRef::Link(id) => self.links.contains_key(&id),
        }
    }

    /// Name of an agent as shown to users, e.g. `wolf 3` or `patch 0 -2`.
    #[must_use]
    pub fn describe(&self, agent: AgentRef) -> String {
        match agent {
            AgentRef::Turtle(id) => match self.turtles.get(&id) {
                Some(t) => {
                    let singular = self
                        .turtle_breeds
                        .get(t.breed())
                        .map_or("turtle", |b| b.singular());
                    format!("{} {}", singular.to_lowercase(), id.0)
                }
                None => format!("turtle {}", id.0),
            },
            AgentRef::Patch(id) => match self.patches.get(id.0) {
                Some(p) if self.is_3d() => {
                    format!("patch {} {} {}", p.pxcor(), p.pycor(), p.pzcor())
                }
                Some(p) => format!("patch {} {}", p.pxcor(), p.pycor()),
                None => format!("patch #{}", id.0),
            },
            AgentRef::Link(id) => match self.links.get(&id) {
                Some(l) => {
                    let singular = self
                        .link_breeds
                        .get(l.breed())
                        .map_or("link", |b| b.singular());
                    format!("{} {} {}", singular.to_lowercase(), l.end1().0, l.end2().0)
                }
                None => format!("link #{}", id.0),
            },
        }
    }

    /// Location of a turtle, or the centre of a patch.
    pub fn position_of(&self, agent: AgentRef) -> Result<Point> {
        match agent {
            AgentRef::Turtle(id) => Ok(self.turtle(id)?.position()),
            AgentRef::Patch(id) => Ok(self.patch_or_err(id)?.coord().center()),
            AgentRef::Link(_) => Err(WorldError::wrong_kind(AgentKind::Turtle, AgentKind::Link)),
        }
    }

    /// Wrap-aware distance between two turtles or patches.
    pub fn distance(&self, a: AgentRef, b: AgentRef) -> Result<f64> {
        Ok(self
            .topology
            .distance(self.position_of(a)?, self.position_of(b)?, true))
    }

    /// Wrap-aware heading from one turtle or patch to another.
    pub fn towards(&self, from: AgentRef, to: AgentRef) -> Result<f64> {
        self.topology
            .towards(self.position_of(from)?, self.position_of(to)?, true)
    }

    // ---- agentsets ----

    /// Live members of `set`. Breeds and universal sets come in canonical
    /// order; explicit sets keep their order minus dead agents.
    pub fn members(&self, set: &AgentSet) -> Result<Vec<AgentRef>> {
        Ok(match set {
            AgentSet::AllTurtles => self.turtles.keys().map(|&id| id.into()).collect(),
            AgentSet::AllPatches => (0..self.patches.len())
                .map(|i| PatchId(i).into())
                .collect(),
            AgentSet::AllLinks => self.link_index.values().map(|&id| id.into()).collect(),
            AgentSet::TurtleBreed(name) => {
                if name.eq_ignore_ascii_case(Program::TURTLES) {
                    return self.members(&AgentSet::AllTurtles);
                }
                self.turtle_breeds
                    .get(name)
                    .ok_or_else(|| WorldError::UnknownBreed {
                        kind: AgentKind::Turtle,
                        name: name.clone(),
                    })?
                    .iter()
                    .map(AgentRef::from)
                    .collect()
            }
            AgentSet::LinkBreed(name) => {
                if name.eq_ignore_ascii_case(Program::LINKS) {
                    return self.members(&AgentSet::AllLinks);
                }
                let rank = self
                    .link_breeds
                    .rank(name)
                    .ok_or_else(|| WorldError::UnknownBreed {
                        kind: AgentKind::Link,
                        name: name.clone(),
                    })?;
                self.link_index
                    .iter()
                    .filter(|(key, _)| key.2 == rank)
                    .map(|(_, &id)| id.into())
                    .collect()
            }
            AgentSet::Turtles(ids) => ids
                .iter()
                .filter(|id| self.turtles.contains_key(id))
                .map(|&id| id.into())
                .collect(),
            AgentSet::Patches(ids) => ids
                .iter()
                .filter(|id| id.0 < self.patches.len())
                .map(|&id| id.into())
                .collect(),
            AgentSet::Links(ids) => ids
                .iter()
                .filter(|id| self.links.contains_key(id))
                .map(|&id| id.into())
                .collect(),
        })
    }

    pub fn count(&self, set: &AgentSet) -> Result<usize> {
        Ok(match set {
            AgentSet::AllTurtles => self.turtles.len(),
            AgentSet::AllPatches => self.patches.len(),
            AgentSet::AllLinks => self.links.len(),
            _ => self.members(set)?.len(),
        })
    }

    /// Members of `set` in a random order drawn from `rng`.
    pub fn shuffled<R: Rng + ?Sized>(&self, set: &AgentSet, rng: &mut R) -> Result<Vec<AgentRef>> {
        Ok(agentset::shuffled(&self.members(set)?, rng))
    }

    /// A random member of `set`, or `None` when it is empty.
    pub fn one_of<R: Rng + ?Sized>(&self, set: &AgentSet, rng: &mut R) -> Result<Option<AgentRef>> {
        let members = self.members(set)?;
        if members.is_empty() {
            return Ok(None);
        }
        Ok(Some(members[rng.gen_range(0..members.len())]))
    }

    // ---- clearing ----

    /// Kills every turtle (and so every link) and restarts who numbers.
    pub fn clear_turtles(&mut self) {
        self.links.clear();
        self.link_index.clear();
        self.link_breeds.clear_members();
        self.turtles.clear();
        self.turtle_breeds.clear_members();
        for patch in self.patches.iter_mut() {
            patch.turtles_here.clear();
        }
        self.tie_count = 0;
        self.next_who = 0;
        self.next_link_id = 0;
        if matches!(
            self.observer.target(),
            Some(AgentRef::Turtle(_) | AgentRef::Link(_))
        ) {
            self.observer.reset_perspective();
        }
        tracing::debug!("Turtles cleared");
    }

    pub fn clear_links(&mut self) {
        let ids: Vec<LinkId> = self.links.keys().copied().collect();
        for id in ids {
            self.kill_link(id);
        }
        self.next_link_id = 0;
        tracing::debug!("Links cleared");
    }

    /// Resets every patch variable to its default.
    pub fn clear_patches(&mut self) {
        let is_3d = self.is_3d();
        for patch in self.patches.iter_mut() {
            patch.reset(is_3d);
        }
        tracing::debug!("Patches cleared");
    }

    pub fn clear_drawing(&mut self) {
        self.drawing.clear();
    }

    pub fn clear_all(&mut self) {
        self.clear_turtles();
        self.clear_patches();
        self.clear_drawing();
        self.observer.reset_perspective();
        tracing::info!("World cleared");
    }
}

pub(crate) fn build_patches(topology: &Topology, program: &Program) -> Vec<Patch> {
    let is_3d = topology.is_3d();
    let slots = SlotLayout::resolve(program, AgentKind::Patch, "", is_3d).map_or(0, |l| l.len());
    (0..topology.patch_count())
        .map(|i| Patch::new(PatchId(i), topology.coord_at(i), slots, is_3d))
        .collect()
}
