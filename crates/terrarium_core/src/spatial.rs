//! Radius and cone queries over turtles and patches.
//!
//! Both queries scan the box of patches that could hold a match, row by row
//! starting from the lowest offset, so results come back in scan order
//! rather than sorted by id. In-cone also retests each candidate against
//! shifted copies of the world so a cone that reaches across a wrapping edge
//! still sees what lies beyond it.

use crate::agentset::AgentSet;
use crate::error::{Result, WorldError};
use crate::topology::{heading_from_delta, Axis, Coord, Point};
use crate::turtle::Turtle;
use crate::world::World;
use std::collections::HashSet;
use terrarium_data::{AgentKind, AgentRef, PatchId, Program, TurtleId};

/// Slack for turtles sitting anywhere inside their patch: each end can be
/// up to half a diagonal from its patch centre.
const PATCH_DIAGONAL_SLACK: f64 = 1.415;

/// Which agents a query may return.
enum Candidates {
    AllPatches,
    Patches(HashSet<PatchId>),
    AllTurtles,
    TurtleBreed(String),
    Turtles(HashSet<TurtleId>),
}

impl Candidates {
    fn kind(&self) -> AgentKind {
        match self {
            Candidates::AllPatches | Candidates::Patches(_) => AgentKind::Patch,
            _ => AgentKind::Turtle,
        }
    }

    fn has_patch(&self, id: PatchId) -> bool {
        match self {
            Candidates::AllPatches => true,
            Candidates::Patches(ids) => ids.contains(&id),
            _ => false,
        }
    }

    fn has_turtle(&self, turtle: &Turtle) -> bool {
        match self {
            Candidates::AllTurtles => true,
            Candidates::TurtleBreed(name) => turtle.breed() == name,
            Candidates::Turtles(ids) => ids.contains(&turtle.id()),
            _ => false,
        }
    }
}

/// The cone a turtle sees: apex, facing and reach.
#[derive(Debug, Clone, Copy)]
struct Cone {
    apex: Point,
    heading: f64,
    pitch: f64,
    radius: f64,
    half_angle: f64,
    is_3d: bool,
}

impl Cone {
    /// Tests a point in plain, unwrapped coordinates.
    fn contains(&self, p: Point) -> bool {
        let d = Point::new3(p.x - self.apex.x, p.y - self.apex.y, p.z - self.apex.z);
        if d.x == 0.0 && d.y == 0.0 && d.z == 0.0 {
            return true;
        }
        if d.length() > self.radius {
            return false;
        }
        if self.is_3d {
            let (h, pitch) = (self.heading.to_radians(), self.pitch.to_radians());
            let forward = Point::new3(pitch.cos() * h.sin(), pitch.cos() * h.cos(), pitch.sin());
            let cos = (d.x * forward.x + d.y * forward.y + d.z * forward.z) / d.length();
            cos.clamp(-1.0, 1.0).acos() <= self.half_angle.to_radians()
        } else {
            let diff = (heading_from_delta(d.x, d.y) - self.heading).abs();
            diff <= self.half_angle || 360.0 - diff <= self.half_angle
        }
    }
}

/// Patch offsets around `start`, slowest axis first.
fn scan_offsets(x: (i32, i32), y: (i32, i32), z: (i32, i32)) -> impl Iterator<Item = (i32, i32, i32)> {
    (z.0..=z.1).flat_map(move |dz| {
        (y.0..=y.1).flat_map(move |dy| (x.0..=x.1).map(move |dx| (dx, dy, dz)))
    })
}

fn copies(axis: Option<&Axis>, radius: f64, wrap: bool) -> i32 {
    match axis {
        Some(a) if wrap && a.wrap => (radius / a.extent()).ceil() as i32,
        _ => 0,
    }
}

fn offset_length(dx: i32, dy: i32, dz: i32) -> f64 {
    let (dx, dy, dz) = (f64::from(dx), f64::from(dy), f64::from(dz));
    (dx * dx + dy * dy + dz * dz).sqrt()
}

impl World {
    fn candidates(&self, set: &AgentSet, operation: &'static str) -> Result<Candidates> {
        let wrong_kind = |found| WorldError::WrongCandidateKind {
            operation,
            expected: "turtles or patches",
            found,
        };
        Ok(match set {
            AgentSet::AllPatches => Candidates::AllPatches,
            AgentSet::Patches(ids) => Candidates::Patches(ids.iter().copied().collect()),
            AgentSet::AllTurtles => Candidates::AllTurtles,
            AgentSet::TurtleBreed(name) if name.eq_ignore_ascii_case(Program::TURTLES) => {
                Candidates::AllTurtles
            }
            AgentSet::TurtleBreed(name) => {
                let set = self
                    .turtle_breeds
                    .get(name)
                    .ok_or_else(|| WorldError::UnknownBreed {
                        kind: AgentKind::Turtle,
                        name: name.clone(),
                    })?;
                Candidates::TurtleBreed(set.name().to_string())
            }
            AgentSet::Turtles(ids) => Candidates::Turtles(ids.iter().copied().collect()),
            AgentSet::AllLinks | AgentSet::LinkBreed(_) | AgentSet::Links(_) => {
                return Err(wrong_kind(AgentKind::Link));
            }
        })
    }

    /// Patch offset ranges to scan around `start` for radius `r`, per axis.
    fn scan_box(&self, start: Coord, r: i32) -> ((i32, i32), (i32, i32), (i32, i32)) {
        let topo = &self.topology;
        let z = topo.z.map_or((0, 0), |axis| axis.search_range(start.z, r));
        (
            topo.x.search_range(start.x, r),
            topo.y.search_range(start.y, r),
            z,
        )
    }

    /// Members of `candidates` within `radius` of `origin` (a turtle or a
    /// patch). With `wrap`, distances are measured across wrapping edges.
    pub fn in_radius(
        &self,
        origin: AgentRef,
        candidates: &AgentSet,
        radius: f64,
        wrap: bool,
    ) -> Result<Vec<AgentRef>> {
        if radius < 0.0 || radius.is_nan() {
            return Err(WorldError::NegativeRadius {
                operation: "in-radius",
                radius,
            });
        }
        let filter = self.candidates(candidates, "in-radius")?;
        let center = self.position_of(origin)?;
        let start = match origin {
            AgentRef::Turtle(id) => self.patch_or_err(self.turtle(id)?.patch_here())?.coord(),
            AgentRef::Patch(id) => self.patch_or_err(id)?.coord(),
            AgentRef::Link(_) => return Err(WorldError::wrong_kind(AgentKind::Turtle, AgentKind::Link)),
        };
        self.metrics.record_spatial_query();

        let r = radius.ceil() as i32;
        let (x, y, z) = self.scan_box(start, r);
        let mut found = Vec::new();
        for (dx, dy, dz) in scan_offsets(x, y, z) {
            let Some(patch) = self
                .topology
                .offset(start, dx, dy, dz)
                .and_then(|c| self.patch_at_coord(c))
            else {
                continue;
            };
            match filter.kind() {
                AgentKind::Patch => {
                    let at = self.patches[patch.0].coord().center();
                    if filter.has_patch(patch) && self.topology.distance(center, at, wrap) <= radius {
                        found.push(patch.into());
                    }
                }
                _ => {
                    if offset_length(dx, dy, dz) > radius + PATCH_DIAGONAL_SLACK {
                        continue;
                    }
                    for id in self.turtles_here(patch) {
                        let Some(turtle) = self.turtles.get(id) else {
                            continue;
                        };
                        if filter.has_turtle(turtle)
                            && self.topology.distance(center, turtle.position(), wrap) <= radius
                        {
                            found.push((*id).into());
                        }
                    }
                }
            }
        }
        tracing::trace!(origin = ?origin, radius, found = found.len(), "in-radius");
        Ok(found)
    }

    /// Members of `candidates` within `radius` of turtle `apex` and no more
    /// than `angle / 2` degrees off its heading (and pitch, in 3D).
    pub fn in_cone(
        &self,
        apex: TurtleId,
        candidates: &AgentSet,
        radius: f64,
        angle: f64,
        wrap: bool,
    ) -> Result<Vec<AgentRef>> {
        if radius < 0.0 || radius.is_nan() {
            return Err(WorldError::NegativeRadius {
                operation: "in-cone",
                radius,
            });
        }
        if !(0.0..=360.0).contains(&angle) {
            return Err(WorldError::InvalidConeAngle(angle));
        }
        let filter = self.candidates(candidates, "in-cone")?;
        let turtle = self.turtle(apex)?;
        let start = self.patch_or_err(turtle.patch_here())?.coord();
        let cone = Cone {
            apex: turtle.position(),
            heading: turtle.heading(),
            pitch: turtle.pitch(),
            radius,
            half_angle: angle / 2.0,
            is_3d: self.is_3d(),
        };
        self.metrics.record_spatial_query();

        let topo = &self.topology;
        let m = copies(Some(&topo.x), radius, wrap);
        let n = copies(Some(&topo.y), radius, wrap);
        let o = copies(topo.z.as_ref(), radius, wrap);
        let (w, h) = (topo.x.extent(), topo.y.extent());
        let d = topo.z.map_or(0.0, |axis| axis.extent());
        // The first world copy that puts `p` inside the cone wins.
        let seen_in_cone = |p: Point| {
            scan_offsets((-m, m), (-n, n), (-o, o)).any(|(cx, cy, cz)| {
                cone.contains(Point::new3(
                    p.x + w * f64::from(cx),
                    p.y + h * f64::from(cy),
                    p.z + d * f64::from(cz),
                ))
            })
        };

        let r = radius.ceil() as i32;
        let (x, y, z) = self.scan_box(start, r);
        let mut found = Vec::new();
        for (dx, dy, dz) in scan_offsets(x, y, z) {
            let Some(patch) = topo
                .offset(start, dx, dy, dz)
                .and_then(|c| self.patch_at_coord(c))
            else {
                continue;
            };
            match filter.kind() {
                AgentKind::Patch => {
                    if filter.has_patch(patch) && seen_in_cone(self.patches[patch.0].coord().center()) {
                        found.push(patch.into());
                    }
                }
                _ => {
                    if offset_length(dx, dy, dz) > radius + PATCH_DIAGONAL_SLACK {
                        continue;
                    }
                    for id in self.turtles_here(patch) {
                        let Some(t) = self.turtles.get(id) else {
                            continue;
                        };
                        if filter.has_turtle(t) && seen_in_cone(t.position()) {
                            found.push((*id).into());
                        }
                    }
                }
            }
        }
        tracing::trace!(apex = apex.0, radius, angle, found = found.len(), "in-cone");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Topology;
    use terrarium_data::{BreedDecl, LinkId};

    fn world(topology: Topology) -> World {
        World::new(
            topology,
            Program::new().breed(BreedDecl::new("wolves", "wolf")),
        )
        .unwrap()
    }

    fn coords(w: &World, found: &[AgentRef]) -> Vec<(i32, i32)> {
        found
            .iter()
            .map(|a| {
                let p = w.patch(a.as_patch().unwrap()).unwrap();
                (p.pxcor(), p.pycor())
            })
            .collect()
    }

    #[test]
    fn test_patches_in_radius_in_scan_order() {
        let w = world(Topology::torus(-5, 5, -5, 5));
        let origin = w.patch_at(0.0, 0.0).unwrap();
        let found = w
            .in_radius(origin.into(), &AgentSet::AllPatches, 1.0, true)
            .unwrap();
        assert_eq!(
            coords(&w, &found),
            vec![(0, -1), (-1, 0), (0, 0), (1, 0), (0, 1)]
        );
    }

    #[test]
    fn test_radius_box_stops_at_walls() {
        let w = world(Topology::bounded(-2, 2, -2, 2));
        let corner = w.patch_at(2.0, 2.0).unwrap();
        let found = w
            .in_radius(corner.into(), &AgentSet::AllPatches, 1.0, true)
            .unwrap();
        assert_eq!(coords(&w, &found), vec![(2, 1), (1, 2), (2, 2)]);
    }

    #[test]
    fn test_turtles_in_radius_across_seam() {
        let mut w = world(Topology::torus(-5, 5, -5, 5));
        let a = w.create_turtle_at(Point::new(5.0, 0.0), None).unwrap();
        let b = w.create_turtle_at(Point::new(-5.0, 0.0), None).unwrap();
        let far = w.create_turtle_at(Point::new(0.0, 0.0), None).unwrap();
        let found = w
            .in_radius(a.into(), &AgentSet::AllTurtles, 1.5, true)
            .unwrap();
        assert!(found.contains(&b.into()));
        assert!(found.contains(&a.into()));
        assert!(!found.contains(&far.into()));
        let unwrapped = w
            .in_radius(a.into(), &AgentSet::AllTurtles, 1.5, false)
            .unwrap();
        assert_eq!(unwrapped, vec![AgentRef::Turtle(a)]);
    }

    #[test]
    fn test_radius_respects_candidate_set() {
        let mut w = world(Topology::torus(-5, 5, -5, 5));
        let plain = w.create_turtle_at(Point::new(0.4, 0.4), None).unwrap();
        let wolf = w.create_turtle_at(Point::new(1.0, 0.0), Some("wolves")).unwrap();
        let found = w
            .in_radius(plain.into(), &AgentSet::TurtleBreed("wolves".into()), 2.0, true)
            .unwrap();
        assert_eq!(found, vec![AgentRef::Turtle(wolf)]);
        let found = w
            .in_radius(plain.into(), &AgentSet::Turtles(vec![plain]), 2.0, true)
            .unwrap();
        assert_eq!(found, vec![AgentRef::Turtle(plain)]);
        let found = w
            .in_radius(plain.into(), &AgentSet::TurtleBreed("turtles".into()), 2.0, true)
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_turtle_off_center_is_found() {
        let mut w = world(Topology::torus(-5, 5, -5, 5));
        let a = w.create_turtle_at(Point::new(0.45, 0.45), None).unwrap();
        let b = w.create_turtle_at(Point::new(2.0, 1.6), None).unwrap();
        // b's patch centre is 2.83 away, b itself about 1.93.
        let found = w
            .in_radius(a.into(), &AgentSet::AllTurtles, 2.0, true)
            .unwrap();
        assert!(found.contains(&b.into()));
    }

    #[test]
    fn test_cone_keeps_what_it_faces() {
        let mut w = world(Topology::torus(-5, 5, -5, 5));
        let apex = w.create_turtle(None).unwrap();
        let same_spot = w.create_turtle(None).unwrap();
        let ahead = w.create_turtle_at(Point::new(0.0, 2.0), None).unwrap();
        let slightly_off = w.create_turtle_at(Point::new(1.0, 2.0), None).unwrap();
        let beside = w.create_turtle_at(Point::new(2.0, 0.0), None).unwrap();
        let behind = w.create_turtle_at(Point::new(0.0, -2.0), None).unwrap();
        let found = w
            .in_cone(apex, &AgentSet::AllTurtles, 3.0, 90.0, true)
            .unwrap();
        for id in [apex, same_spot, ahead, slightly_off] {
            assert!(found.contains(&id.into()), "missing turtle {}", id.0);
        }
        assert!(!found.contains(&beside.into()));
        assert!(!found.contains(&behind.into()));
    }

    #[test]
    fn test_cone_sees_across_seam() {
        let mut w = world(Topology::torus(-5, 5, -5, 5));
        let apex = w.create_turtle_at(Point::new(4.0, 0.0), None).unwrap();
        w.set_heading(apex, 90.0).unwrap();
        let beyond = w.create_turtle_at(Point::new(-5.0, 0.0), None).unwrap();
        let wrapped = w
            .in_cone(apex, &AgentSet::AllTurtles, 3.0, 60.0, true)
            .unwrap();
        assert!(wrapped.contains(&beyond.into()));
        let flat = w
            .in_cone(apex, &AgentSet::AllTurtles, 3.0, 60.0, false)
            .unwrap();
        assert!(!flat.contains(&beyond.into()));
    }

    #[test]
    fn test_cone_over_patches() {
        let mut w = world(Topology::torus(-5, 5, -5, 5));
        let apex = w.create_turtle(None).unwrap();
        let found = w
            .in_cone(apex, &AgentSet::AllPatches, 1.0, 10.0, true)
            .unwrap();
        assert_eq!(coords(&w, &found), vec![(0, 0), (0, 1)]);
    }

    #[test]
    fn test_cone_in_3d_uses_pitch() {
        let topo = Topology::torus(-3, 3, -3, 3).with_z(Axis::new(-3, 3, true));
        let mut w = world(topo);
        let apex = w.create_turtle(None).unwrap();
        w.set_pitch(apex, 90.0).unwrap();
        let above = w.create_turtle_at(Point::new3(0.0, 0.0, 2.0), None).unwrap();
        let north = w.create_turtle_at(Point::new3(0.0, 2.0, 0.0), None).unwrap();
        let found = w
            .in_cone(apex, &AgentSet::AllTurtles, 2.5, 60.0, false)
            .unwrap();
        assert!(found.contains(&above.into()));
        assert!(!found.contains(&north.into()));
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let mut w = world(Topology::torus(-5, 5, -5, 5));
        let apex = w.create_turtle(None).unwrap();
        assert!(matches!(
            w.in_radius(apex.into(), &AgentSet::AllTurtles, -1.0, true),
            Err(WorldError::NegativeRadius { .. })
        ));
        assert_eq!(
            w.in_cone(apex, &AgentSet::AllTurtles, 1.0, 400.0, true),
            Err(WorldError::InvalidConeAngle(400.0))
        );
        assert!(matches!(
            w.in_radius(apex.into(), &AgentSet::AllLinks, 1.0, true),
            Err(WorldError::WrongCandidateKind { found: AgentKind::Link, .. })
        ));
        let err = w
            .in_radius(AgentRef::Link(LinkId(0)), &AgentSet::AllTurtles, 1.0, true)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Invariant);
        assert!(matches!(
            w.in_radius(apex.into(), &AgentSet::TurtleBreed("sheep".into()), 1.0, true),
            Err(WorldError::UnknownBreed { .. })
        ));
    }

    #[test]
    fn test_queries_counted_in_metrics() {
        let mut w = world(Topology::torus(-2, 2, -2, 2));
        let apex = w.create_turtle(None).unwrap();
        w.in_radius(apex.into(), &AgentSet::AllPatches, 1.0, true).unwrap();
        w.in_cone(apex, &AgentSet::AllPatches, 1.0, 90.0, true).unwrap();
        assert_eq!(w.metrics().snapshot().spatial_queries, 2);
    }
}
