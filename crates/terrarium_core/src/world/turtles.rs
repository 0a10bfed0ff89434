//! Turtle lifecycle and motion.

use super::World;
use crate::drawing::{split_trail, PenMode, TrailSegment};
use crate::error::{Result, WorldError};
use crate::schema::{realloc, SlotLayout};
use crate::topology::{heading_from_delta, normalize_heading, wrap, Point};
use crate::turtle::Turtle;
use std::collections::HashSet;
use terrarium_data::{AgentKind, AgentRef, PatchId, Program, TurtleId};

impl World {
    /// Upper-cased breed name, checked against the program.
    pub(crate) fn resolve_turtle_breed(&self, breed: Option<&str>) -> Result<String> {
        let name = breed.unwrap_or(Program::TURTLES);
        match self.turtle_breeds.get(name) {
            Some(set) => Ok(set.name().to_string()),
            None => Err(WorldError::UnknownBreed {
                kind: AgentKind::Turtle,
                name: name.to_string(),
            }),
        }
    }

    /// Creates a turtle at the origin, facing north.
    pub fn create_turtle(&mut self, breed: Option<&str>) -> Result<TurtleId> {
        self.create_turtle_at(Point::ORIGIN, breed)
    }

    pub fn create_turtle_at(&mut self, at: Point, breed: Option<&str>) -> Result<TurtleId> {
        let breed = self.resolve_turtle_breed(breed)?;
        let position = self.topology.wrap_point(at)?;
        let patch = self.patch_for(position)?;
        let slots = SlotLayout::resolve(&self.program, AgentKind::Turtle, &breed, self.is_3d())
            .map_or(0, |l| l.len());
        let id = TurtleId(self.next_who);
        self.next_who += 1;
        let turtle = Turtle::new(id, &breed, self.shapes.shape_for(&breed), position, patch, slots);
        self.turtles.insert(id, turtle);
        self.patches[patch.0].add_turtle(id);
        self.turtle_breeds.enroll(&breed, id);
        self.metrics.record_turtle_created();
        tracing::debug!(who = id.0, breed = %breed, "Turtle created");
        Ok(id)
    }

    pub fn create_turtles(&mut self, count: usize, breed: Option<&str>) -> Result<Vec<TurtleId>> {
        (0..count).map(|_| self.create_turtle(breed)).collect()
    }

    /// Creates `count` turtles with headings spread evenly around the circle.
    pub fn create_ordered_turtles(
        &mut self,
        count: usize,
        breed: Option<&str>,
    ) -> Result<Vec<TurtleId>> {
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let id = self.create_turtle(breed)?;
            self.turtle_mut(id)?.heading = 360.0 * i as f64 / count as f64;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Creates a turtle on the centre of `patch` with base color
    /// `5 + 10 * color_index` and the given heading.
    pub fn sprout(
        &mut self,
        patch: PatchId,
        breed: Option<&str>,
        color_index: u32,
        heading: f64,
    ) -> Result<TurtleId> {
        let heading = WorldError::finite("sprout", heading)?;
        let center = self.patch_or_err(patch)?.coord().center();
        let id = self.create_turtle_at(center, breed)?;
        let color = wrap(5.0 + 10.0 * f64::from(color_index), 0.0, 140.0);
        self.turtle_mut(id)?.vars[crate::schema::turtle_var::COLOR] = color.into();
        self.set_heading(id, heading)?;
        Ok(id)
    }

    /// Creates a copy of `parent` on the same spot with a new who number,
    /// optionally in another breed.
    pub fn hatch(&mut self, parent: TurtleId, breed: Option<&str>) -> Result<TurtleId> {
        let target_breed = breed.map(|b| self.resolve_turtle_breed(Some(b))).transpose()?;
        let id = TurtleId(self.next_who);
        let child = self.turtle(parent)?.hatch(id);
        self.next_who += 1;
        let (patch, child_breed) = (child.patch, child.breed.clone());
        self.turtles.insert(id, child);
        self.patches[patch.0].add_turtle(id);
        self.turtle_breeds.enroll(&child_breed, id);
        self.metrics.record_turtle_created();
        tracing::debug!(who = id.0, parent = parent.0, "Turtle hatched");
        if let Some(target) = target_breed {
            if target != child_breed {
                self.set_turtle_breed(id, &target)?;
            }
        }
        Ok(id)
    }

    /// Kills a turtle and every link attached to it. Killing a dead turtle
    /// does nothing. Returns whether the turtle was alive.
    pub fn kill_turtle(&mut self, id: TurtleId) -> bool {
        let Some(links) = self.turtles.get(&id).map(|t| t.links.clone()) else {
            return false;
        };
        for link in links {
            self.kill_link(link);
        }
        let Some(turtle) = self.turtles.remove(&id) else {
            return false;
        };
        if let Some(patch) = self.patches.get_mut(turtle.patch.0) {
            patch.remove_turtle(id);
        }
        self.turtle_breeds.withdraw(&turtle.breed, id);
        self.observer.forget(AgentRef::Turtle(id));
        self.metrics.record_turtle_died();
        tracing::debug!(who = id.0, "Turtle died");
        true
    }

    /// Moves a turtle into another breed, migrating its breed-owned
    /// variables by name and giving it the breed's default shape.
    pub fn set_turtle_breed(&mut self, id: TurtleId, breed: &str) -> Result<()> {
        let breed = self.resolve_turtle_breed(Some(breed))?;
        let is_3d = self.is_3d();
        let turtle = self
            .turtles
            .get_mut(&id)
            .ok_or_else(|| WorldError::dead(format!("turtle {}", id.0)))?;
        if turtle.breed == breed {
            return Ok(());
        }
        let new = SlotLayout::resolve(&self.program, AgentKind::Turtle, &breed, is_3d)
            .ok_or_else(|| WorldError::UnknownBreed {
                kind: AgentKind::Turtle,
                name: breed.clone(),
            })?;
        let old = match &turtle.stale {
            Some(stale) => stale.layout(AgentKind::Turtle, is_3d),
            None => SlotLayout::resolve(&self.program, AgentKind::Turtle, &turtle.breed, is_3d)
                .unwrap_or(SlotLayout {
                    breed_owned: &[],
                    ..new
                }),
        };
        turtle.vars = realloc(std::mem::take(&mut turtle.vars), &old, &new);
        turtle.stale = None;
        turtle.vars[crate::schema::turtle_var::SHAPE] = self.shapes.shape_for(&breed).into();
        let old_breed = std::mem::replace(&mut turtle.breed, breed.clone());
        self.turtle_breeds.withdraw(&old_breed, id);
        self.turtle_breeds.enroll(&breed, id);
        tracing::debug!(who = id.0, from = %old_breed, to = %breed, "Breed changed");
        Ok(())
    }

    // ---- motion ----

    /// Puts a turtle at `target` without touching tied turtles. Draws the
    /// pen trail along `trail` (heading, distance) or, when absent, along
    /// the shortest path from the old position.
    pub(crate) fn place_turtle(
        &mut self,
        id: TurtleId,
        target: Point,
        trail: Option<(f64, f64)>,
    ) -> Result<()> {
        let position = self.topology.wrap_point(target)?;
        let patch = self.patch_for(position)?;
        let bounds = self.trail_bounds();
        let shortest = self.turtle(id).map(|t| {
            let d = self.topology.shortest_path_delta(t.position, position);
            (d.x, d.y)
        })?;
        let turtle = self.turtle_mut(id)?;
        let old = turtle.position;
        let old_patch = turtle.patch;
        let mode = turtle.pen_mode();
        if mode.draws() {
            let (heading, distance) = trail.unwrap_or_else(|| {
                let (dx, dy) = shortest;
                if dx == 0.0 && dy == 0.0 {
                    (0.0, 0.0)
                } else {
                    (heading_from_delta(dx, dy), dx.hypot(dy))
                }
            });
            let color = turtle.color().clone();
            let pen_size = turtle.pen_size();
            for (x1, y1, x2, y2) in split_trail(old.x, old.y, heading, distance, bounds) {
                self.drawing.draw_line(TrailSegment {
                    x1,
                    y1,
                    x2,
                    y2,
                    color: color.clone(),
                    pen_size,
                    mode,
                });
            }
        }
        let turtle = self.turtle_mut(id)?;
        turtle.position = position;
        turtle.patch = patch;
        if old_patch != patch {
            if let Some(p) = self.patches.get_mut(old_patch.0) {
                p.remove_turtle(id);
            }
            self.patches[patch.0].add_turtle(id);
        }
        Ok(())
    }

    /// Moves a turtle and drags its tied turtles along by the same offset.
    pub(crate) fn move_turtle(
        &mut self,
        id: TurtleId,
        target: Point,
        trail: Option<(f64, f64)>,
    ) -> Result<()> {
        let old = self.turtle(id)?.position;
        self.place_turtle(id, target, trail)?;
        if self.tie_count > 0 {
            let offset = Point::new3(target.x - old.x, target.y - old.y, target.z - old.z);
            let mut seen = HashSet::from([id]);
            self.drag_tied(id, offset, &mut seen);
        }
        Ok(())
    }

    pub fn set_xy(&mut self, id: TurtleId, x: f64, y: f64) -> Result<()> {
        let z = self.turtle(id)?.position.z;
        self.move_turtle(id, Point::new3(x, y, z), None)
    }

    pub fn set_position(&mut self, id: TurtleId, to: Point) -> Result<()> {
        self.move_turtle(id, to, None)
    }

    /// Moves `distance` along the current heading (and pitch in 3D) in one
    /// step. Fails without moving if the destination is beyond a wall.
    pub fn jump(&mut self, id: TurtleId, distance: f64) -> Result<()> {
        let distance = WorldError::finite("jump", distance)?;
        let t = self.turtle(id)?;
        let (h, p) = (t.heading.to_radians(), t.pitch.to_radians());
        let from = t.position;
        let flat = distance * p.cos();
        let to = Point::new3(
            from.x + flat * h.sin(),
            from.y + flat * h.cos(),
            from.z + distance * p.sin(),
        );
        let trail = (t.heading, flat);
        self.move_turtle(id, to, Some(trail))
    }

    /// Moves forward in steps of at most one patch, stopping quietly at a
    /// wall.
    pub fn forward(&mut self, id: TurtleId, distance: f64) -> Result<()> {
        let distance = WorldError::finite("forward", distance)?;
        self.turtle(id)?;
        let whole = distance.abs().trunc();
        let unit = distance.signum();
        let rest = distance - unit * whole;
        let steps = std::iter::repeat(unit)
            .take(whole as usize)
            .chain((rest != 0.0).then_some(rest));
        for step in steps {
            match self.jump(id, step) {
                Ok(()) => {}
                Err(WorldError::BeyondWorldEdge) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Sets the heading, swinging tied turtles around this one.
    pub fn set_heading(&mut self, id: TurtleId, heading: f64) -> Result<()> {
        let heading = WorldError::finite("set-heading", heading)?;
        let turtle = self.turtle_mut(id)?;
        let old = turtle.heading;
        turtle.heading = normalize_heading(heading);
        let new = turtle.heading;
        if self.tie_count > 0 && new != old {
            let mut seen = HashSet::from([id]);
            let center = self.turtle(id)?.position;
            self.swing_tied(id, center, new - old, &mut seen);
        }
        Ok(())
    }

    pub fn right(&mut self, id: TurtleId, degrees: f64) -> Result<()> {
        let heading = self.turtle(id)?.heading;
        self.set_heading(id, heading + degrees)
    }

    pub fn left(&mut self, id: TurtleId, degrees: f64) -> Result<()> {
        self.right(id, -degrees)
    }

    pub fn set_pitch(&mut self, id: TurtleId, pitch: f64) -> Result<()> {
        let pitch = WorldError::finite("set-pitch", pitch)?;
        self.turtle_mut(id)?.pitch = normalize_heading(pitch);
        Ok(())
    }

    pub(crate) fn set_roll(&mut self, id: TurtleId, roll: f64) -> Result<()> {
        let roll = WorldError::finite("set-roll", roll)?;
        self.turtle_mut(id)?.roll = normalize_heading(roll);
        Ok(())
    }

    /// Turns to face another turtle or patch. Facing the spot the turtle is
    /// already on leaves the heading unchanged.
    pub fn face(&mut self, id: TurtleId, target: AgentRef) -> Result<()> {
        let to = self.position_of(target)?;
        self.face_point(id, to)
    }

    pub fn face_xy(&mut self, id: TurtleId, x: f64, y: f64) -> Result<()> {
        let x = WorldError::finite("facexy", x)?;
        let y = WorldError::finite("facexy", y)?;
        self.face_point(id, Point::new(x, y))
    }

    fn face_point(&mut self, id: TurtleId, to: Point) -> Result<()> {
        let from = self.turtle(id)?.position;
        match self.topology.towards(from, to, true) {
            Ok(heading) => self.set_heading(id, heading),
            Err(WorldError::NoHeading { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Moves onto another turtle's position or a patch centre.
    pub fn move_to(&mut self, id: TurtleId, target: AgentRef) -> Result<()> {
        let to = self.position_of(target)?;
        self.move_turtle(id, to, None)
    }

    pub fn home(&mut self, id: TurtleId) -> Result<()> {
        self.move_turtle(id, Point::ORIGIN, None)
    }

    pub fn move_to_patch_center(&mut self, id: TurtleId) -> Result<()> {
        let patch = self.turtle(id)?.patch;
        let center = self.patch_or_err(patch)?.coord().center();
        self.move_turtle(id, center, None)
    }

    pub fn set_pen_mode(&mut self, id: TurtleId, mode: PenMode) -> Result<()> {
        self.turtle_mut(id)?.vars[crate::schema::turtle_var::PEN_MODE] = mode.into();
        Ok(())
    }

    /// Unit step along the heading: `(sin h, cos h)`.
    pub fn dx_dy(&self, id: TurtleId) -> Result<(f64, f64)> {
        let h = self.turtle(id)?.heading.to_radians();
        Ok((h.sin(), h.cos()))
    }

    pub fn patch_here(&self, id: TurtleId) -> Result<PatchId> {
        Ok(self.turtle(id)?.patch)
    }

    /// Turtles on a patch, in arrival order.
    #[must_use]
    pub fn turtles_here(&self, patch: PatchId) -> &[TurtleId] {
        self.patch(patch).map_or(&[], |p| p.turtles_here())
    }

    /// Turtles on the patch at offset `(dx, dy)` from a turtle.
    pub fn turtles_at(&self, id: TurtleId, dx: f64, dy: f64) -> Result<Vec<TurtleId>> {
        Ok(self
            .patch_at_offset(id.into(), dx, dy)?
            .map(|p| self.turtles_here(p).to_vec())
            .unwrap_or_default())
    }
}
