//! Tie propagation.
//!
//! A tied link makes its far end follow the near end. For a directed link
//! only `end2` follows `end1`; an undirected link drags both ways. Each
//! propagation visits a turtle at most once, and a tied turtle that cannot
//! follow (a wall is in the way) is simply left behind.

use super::World;
use crate::link::TieMode;
use crate::topology::{heading_from_delta, normalize_heading, Point};
use std::collections::HashSet;
use terrarium_data::TurtleId;

impl World {
    /// Turtles that follow `root`, with the tie mode of the link that binds
    /// each one.
    pub fn tied_turtles(&self, root: TurtleId) -> Vec<(TurtleId, TieMode)> {
        let Some(turtle) = self.turtles.get(&root) else {
            return Vec::new();
        };
        turtle
            .links
            .iter()
            .filter_map(|id| self.links.get(id))
            .filter(|link| link.is_tied())
            .filter_map(|link| {
                if link.end1() == root {
                    Some((link.end2(), link.tie_mode()))
                } else if !link.is_directed() && link.end2() == root {
                    Some((link.end1(), link.tie_mode()))
                } else {
                    None
                }
            })
            .collect()
    }

    pub(crate) fn drag_tied(&mut self, root: TurtleId, offset: Point, seen: &mut HashSet<TurtleId>) {
        for (follower, _) in self.tied_turtles(root) {
            if !seen.insert(follower) {
                continue;
            }
            let Ok(from) = self.turtle(follower).map(|t| t.position) else {
                continue;
            };
            let to = Point::new3(from.x + offset.x, from.y + offset.y, from.z + offset.z);
            if self.place_turtle(follower, to, None).is_ok() {
                self.drag_tied(follower, offset, seen);
            }
        }
    }

    /// Orbits every turtle tied to `root` (directly or through other ties)
    /// around `center` by `angle` degrees clockwise. Turtles on fixed ties
    /// also turn by `angle`.
    pub(crate) fn swing_tied(
        &mut self,
        root: TurtleId,
        center: Point,
        angle: f64,
        seen: &mut HashSet<TurtleId>,
    ) {
        for (follower, mode) in self.tied_turtles(root) {
            if !seen.insert(follower) {
                continue;
            }
            let Ok(from) = self.turtle(follower).map(|t| t.position) else {
                continue;
            };
            let rel = self.topology.shortest_path_delta(center, from);
            let r = rel.x.hypot(rel.y);
            if r > 0.0 {
                let h = (heading_from_delta(rel.x, rel.y) + angle).to_radians();
                let to = Point::new3(center.x + r * h.sin(), center.y + r * h.cos(), from.z);
                if self.place_turtle(follower, to, None).is_err() {
                    continue;
                }
            }
            if mode == TieMode::Fixed {
                if let Ok(t) = self.turtle_mut(follower) {
                    t.heading = normalize_heading(t.heading + angle);
                }
            }
            self.swing_tied(follower, center, angle, seen);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::link::TieMode;
    use crate::topology::{Point, Topology};
    use crate::world::World;
    use terrarium_data::Program;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    fn world() -> World {
        World::new(Topology::torus(-10, 10, -10, 10), Program::new()).unwrap()
    }

    #[test]
    fn test_tied_turtle_follows_move() {
        let mut w = world();
        let a = w.create_turtle(None).unwrap();
        let b = w.create_turtle_at(Point::new(2.0, 0.0), None).unwrap();
        let link = w.create_link(a, b, None, true).unwrap();
        w.tie(link).unwrap();
        w.set_xy(a, 0.0, 3.0).unwrap();
        let pb = w.turtle(b).unwrap().position();
        assert_close(pb.x, 2.0);
        assert_close(pb.y, 3.0);
        // Directed ties do not pull backwards.
        w.set_xy(b, 5.0, 5.0).unwrap();
        assert_eq!(w.turtle(a).unwrap().position(), Point::new(0.0, 3.0));
    }

    #[test]
    fn test_untied_turtle_stays() {
        let mut w = world();
        let a = w.create_turtle(None).unwrap();
        let b = w.create_turtle_at(Point::new(2.0, 0.0), None).unwrap();
        w.create_link(a, b, None, false).unwrap();
        w.set_xy(a, 0.0, 3.0).unwrap();
        assert_eq!(w.turtle(b).unwrap().position(), Point::new(2.0, 0.0));
    }

    #[test]
    fn test_free_tie_orbits_without_turning() {
        let mut w = world();
        let a = w.create_turtle(None).unwrap();
        let b = w.create_turtle_at(Point::new(0.0, 2.0), None).unwrap();
        let link = w.create_link(a, b, None, false).unwrap();
        w.set_tie_mode(link, TieMode::Free).unwrap();
        w.right(a, 90.0).unwrap();
        let t = w.turtle(b).unwrap();
        assert_close(t.xcor(), 2.0);
        assert_close(t.ycor(), 0.0);
        assert_close(t.heading(), 0.0);
    }

    #[test]
    fn test_fixed_tie_turns_follower() {
        let mut w = world();
        let a = w.create_turtle(None).unwrap();
        let b = w.create_turtle_at(Point::new(0.0, 2.0), None).unwrap();
        let link = w.create_link(a, b, None, false).unwrap();
        w.set_tie_mode(link, TieMode::Fixed).unwrap();
        w.right(a, 90.0).unwrap();
        assert_close(w.turtle(b).unwrap().heading(), 90.0);
    }

    #[test]
    fn test_tie_cycle_terminates() {
        let mut w = world();
        let a = w.create_turtle(None).unwrap();
        let b = w.create_turtle_at(Point::new(1.0, 0.0), None).unwrap();
        let c = w.create_turtle_at(Point::new(2.0, 0.0), None).unwrap();
        for (x, y) in [(a, b), (b, c), (a, c)] {
            let link = w.create_link(x, y, None, false).unwrap();
            w.tie(link).unwrap();
        }
        w.set_xy(a, 0.0, 1.0).unwrap();
        assert_close(w.turtle(b).unwrap().ycor(), 1.0);
        assert_close(w.turtle(c).unwrap().ycor(), 1.0);
        assert_close(w.turtle(c).unwrap().xcor(), 2.0);
    }
}
