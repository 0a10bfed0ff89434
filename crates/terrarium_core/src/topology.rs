//! World geometry.
//!
//! A world is a grid of unit patches centred on integer coordinates. Each
//! axis spans `[min - 0.5, max + 0.5)` in continuous space and either wraps
//! (torus/cylinder) or ends at a wall (box). All distance and heading math
//! lives here so the rest of the crate never has to think about wrapping.

use crate::error::{Result, WorldError};
use serde::{Deserialize, Serialize};

/// Folds `pos` into the half-open window `[min, max)`.
#[inline]
#[must_use]
pub fn wrap(pos: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    let folded = if pos >= max {
        min + (pos - max) % span
    } else if pos < min {
        max - (min - pos) % span
    } else {
        return pos;
    };
    // Rounding can land exactly on the open end.
    if folded >= max || folded < min {
        min
    } else {
        folded
    }
}

/// Normalizes a heading into `[0, 360)`.
#[inline]
#[must_use]
pub fn normalize_heading(heading: f64) -> f64 {
    wrap(heading, 0.0, 360.0)
}

/// Smallest signed turn that takes `h2` to `h1`, in `(-180, 180]`.
#[must_use]
pub fn subtract_headings(h1: f64, h2: f64) -> f64 {
    let diff = normalize_heading(h1) - normalize_heading(h2);
    if diff > 180.0 {
        diff - 360.0
    } else if diff <= -180.0 {
        diff + 360.0
    } else {
        diff
    }
}

/// Heading, clockwise from north, of the offset `(dx, dy)`.
///
/// The offset must not be zero.
#[must_use]
pub fn heading_from_delta(dx: f64, dy: f64) -> f64 {
    if dx == 0.0 {
        if dy > 0.0 {
            0.0
        } else {
            180.0
        }
    } else if dy == 0.0 {
        if dx > 0.0 {
            90.0
        } else {
            270.0
        }
    } else {
        normalize_heading(270.0 + (std::f64::consts::PI + (-dy).atan2(dx)).to_degrees())
    }
}

/// Continuous position in world space. `z` is zero in 2D worlds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub const ORIGIN: Point = Point {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    #[must_use]
    pub const fn new3(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Integer patch coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coord {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y, z: 0 }
    }

    #[must_use]
    pub const fn new3(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Continuous position of the patch centre.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new3(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }
}

/// Which adjacent patches count as neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Neighborhood {
    /// Shares a face: 4 in 2D, 6 in 3D.
    Cardinal,
    /// Shares a face, edge or corner: 8 in 2D, 26 in 3D.
    Moore,
}

const CARDINAL_2D: [(i32, i32, i32); 4] = [(0, 1, 0), (1, 0, 0), (0, -1, 0), (-1, 0, 0)];

const MOORE_2D: [(i32, i32, i32); 8] = [
    (0, 1, 0),
    (1, 0, 0),
    (0, -1, 0),
    (-1, 0, 0),
    (1, 1, 0),
    (1, -1, 0),
    (-1, -1, 0),
    (-1, 1, 0),
];

/// One dimension of the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis {
    pub min: i32,
    pub max: i32,
    pub wrap: bool,
}

impl Axis {
    #[must_use]
    pub const fn new(min: i32, max: i32, wrap: bool) -> Self {
        Self { min, max, wrap }
    }

    /// Number of patches along this axis.
    #[inline]
    #[must_use]
    pub fn size(&self) -> i32 {
        self.max - self.min + 1
    }

    #[inline]
    #[must_use]
    pub fn extent(&self) -> f64 {
        f64::from(self.size())
    }

    #[inline]
    #[must_use]
    pub fn lower_edge(&self) -> f64 {
        f64::from(self.min) - 0.5
    }

    #[inline]
    #[must_use]
    pub fn upper_edge(&self) -> f64 {
        f64::from(self.max) + 0.5
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, pos: f64) -> bool {
        pos >= self.lower_edge() && pos < self.upper_edge()
    }

    /// Wraps a coordinate into the world, or rejects it at a wall.
    pub fn wrap_coord(&self, pos: f64) -> Result<f64> {
        let pos = WorldError::finite("position", pos)?;
        if self.wrap {
            Ok(wrap(pos, self.lower_edge(), self.upper_edge()))
        } else if self.contains(pos) {
            Ok(pos)
        } else {
            Err(WorldError::BeyondWorldEdge)
        }
    }

    /// Wraps an integer patch coordinate; `None` past a wall.
    #[must_use]
    pub fn wrap_patch(&self, c: i32) -> Option<i32> {
        if (self.min..=self.max).contains(&c) {
            Some(c)
        } else if self.wrap {
            Some(self.min + (c - self.min).rem_euclid(self.size()))
        } else {
            None
        }
    }

    /// Signed offset from `from` to `to`, taking the shorter way around
    /// when this axis wraps.
    #[must_use]
    pub fn shortest_delta(&self, from: f64, to: f64) -> f64 {
        let direct = to - from;
        if !self.wrap {
            return direct;
        }
        let w = self.extent();
        let via_copy = if direct > 0.0 { direct - w } else { direct + w };
        if via_copy.abs() < direct.abs() {
            via_copy
        } else {
            direct
        }
    }

    /// Offset folded into `[-w/2, w/2)` on a wrapping axis.
    fn heading_delta(&self, from: f64, to: f64) -> f64 {
        let direct = to - from;
        if self.wrap {
            let half = self.extent() / 2.0;
            wrap(direct, -half, half)
        } else {
            direct
        }
    }

    /// Patch offsets around `start` worth scanning for a radius of `r`
    /// patches. Never visits the same patch twice on a wrapping axis and
    /// never steps past a wall.
    #[must_use]
    pub fn search_range(&self, start: i32, r: i32) -> (i32, i32) {
        if self.wrap {
            let half = self.extent() / 2.0;
            if f64::from(r) < half {
                (-r, r)
            } else {
                (-((half - 1.0).ceil() as i32), half.floor() as i32)
            }
        } else {
            let low = self.min - start;
            let dmin = if low.abs() < r { low } else { -r };
            let dmax = (self.max - start).min(r);
            (dmin, dmax)
        }
    }
}

/// Bounds and wrapping of a 2D or 3D world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub x: Axis,
    pub y: Axis,
    pub z: Option<Axis>,
}

impl Topology {
    #[must_use]
    pub const fn new(x: Axis, y: Axis) -> Self {
        Self { x, y, z: None }
    }

    /// A 2D world that wraps on both axes.
    #[must_use]
    pub const fn torus(min_x: i32, max_x: i32, min_y: i32, max_y: i32) -> Self {
        Self::new(Axis::new(min_x, max_x, true), Axis::new(min_y, max_y, true))
    }

    /// A 2D world with walls on every side.
    #[must_use]
    pub const fn bounded(min_x: i32, max_x: i32, min_y: i32, max_y: i32) -> Self {
        Self::new(Axis::new(min_x, max_x, false), Axis::new(min_y, max_y, false))
    }

    #[must_use]
    pub const fn with_z(mut self, z: Axis) -> Self {
        self.z = Some(z);
        self
    }

    #[inline]
    #[must_use]
    pub fn is_3d(&self) -> bool {
        self.z.is_some()
    }

    #[must_use]
    pub fn dimensions(&self) -> u8 {
        if self.is_3d() {
            3
        } else {
            2
        }
    }

    /// Human-readable name of the wrapping scheme.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match (self.x.wrap, self.y.wrap) {
            (true, true) => "torus",
            (true, false) => "vertical cylinder",
            (false, true) => "horizontal cylinder",
            (false, false) => "box",
        }
    }

    pub fn set_wrapping(&mut self, wrap_x: bool, wrap_y: bool, wrap_z: bool) {
        self.x.wrap = wrap_x;
        self.y.wrap = wrap_y;
        if let Some(z) = self.z.as_mut() {
            z.wrap = wrap_z;
        }
    }

    fn z_axis(&self) -> Axis {
        self.z.unwrap_or(Axis::new(0, 0, false))
    }

    #[must_use]
    pub fn patch_count(&self) -> usize {
        (self.x.size() as usize) * (self.y.size() as usize) * (self.z_axis().size() as usize)
    }

    #[must_use]
    pub fn contains_origin(&self) -> bool {
        self.contains_coord(Coord::default())
    }

    #[must_use]
    pub fn contains_coord(&self, c: Coord) -> bool {
        let z = self.z_axis();
        (self.x.min..=self.x.max).contains(&c.x)
            && (self.y.min..=self.y.max).contains(&c.y)
            && (z.min..=z.max).contains(&c.z)
    }

    /// True when `p` lies inside the world without any wrapping.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y) && self.z.map_or(true, |z| z.contains(p.z))
    }

    /// Wraps every coordinate of `p`, failing at a wall.
    pub fn wrap_point(&self, p: Point) -> Result<Point> {
        Ok(Point {
            x: self.x.wrap_coord(p.x)?,
            y: self.y.wrap_coord(p.y)?,
            z: match self.z {
                Some(z) => z.wrap_coord(p.z)?,
                None => 0.0,
            },
        })
    }

    /// Patch containing `p`, after wrapping. `None` beyond a wall.
    #[must_use]
    pub fn coord_of(&self, p: Point) -> Option<Coord> {
        let p = self.wrap_point(p).ok()?;
        let round = |v: f64| (v + 0.5).floor() as i32;
        let c = Coord::new3(round(p.x), round(p.y), round(p.z));
        // Clamp the rounding of values a hair below an upper edge.
        let z = self.z_axis();
        Some(Coord::new3(
            c.x.min(self.x.max),
            c.y.min(self.y.max),
            c.z.min(z.max),
        ))
    }

    /// Position of `c` in the row-major patch array, top row first.
    #[must_use]
    pub fn index_of(&self, c: Coord) -> Option<usize> {
        if !self.contains_coord(c) {
            return None;
        }
        let z = self.z_axis();
        let width = self.x.size() as usize;
        let height = self.y.size() as usize;
        let layer = (c.z - z.min) as usize;
        let row = (self.y.max - c.y) as usize;
        let col = (c.x - self.x.min) as usize;
        Some((layer * height + row) * width + col)
    }

    /// Inverse of [`Topology::index_of`].
    #[must_use]
    pub fn coord_at(&self, index: usize) -> Coord {
        let width = self.x.size() as usize;
        let height = self.y.size() as usize;
        let col = index % width;
        let row = (index / width) % height;
        let layer = index / (width * height);
        Coord::new3(
            self.x.min + col as i32,
            self.y.max - row as i32,
            self.z_axis().min + layer as i32,
        )
    }

    /// Patch at an integer offset from `c`, wrapping where allowed.
    #[must_use]
    pub fn offset(&self, c: Coord, dx: i32, dy: i32, dz: i32) -> Option<Coord> {
        let z = match self.z {
            Some(axis) => axis.wrap_patch(c.z + dz)?,
            None if dz == 0 => 0,
            None => return None,
        };
        Some(Coord::new3(
            self.x.wrap_patch(c.x + dx)?,
            self.y.wrap_patch(c.y + dy)?,
            z,
        ))
    }

    /// Neighbor patches of `c` in N, E, S, W, NE, SE, SW, NW order (then up
    /// and down layers in 3D). Missing neighbors at a wall are skipped, and
    /// in worlds one or two patches wide the same patch is listed once.
    #[must_use]
    pub fn neighbors(&self, c: Coord, kind: Neighborhood) -> Vec<Coord> {
        let offsets: Vec<(i32, i32, i32)> = match (kind, self.is_3d()) {
            (Neighborhood::Cardinal, false) => CARDINAL_2D.to_vec(),
            (Neighborhood::Moore, false) => MOORE_2D.to_vec(),
            (Neighborhood::Cardinal, true) => {
                let mut v = CARDINAL_2D.to_vec();
                v.extend([(0, 0, 1), (0, 0, -1)]);
                v
            }
            (Neighborhood::Moore, true) => {
                let mut v = MOORE_2D.to_vec();
                for dz in [1, -1] {
                    v.push((0, 0, dz));
                    v.extend(MOORE_2D.iter().map(|&(dx, dy, _)| (dx, dy, dz)));
                }
                v
            }
        };
        let mut out: Vec<Coord> = Vec::with_capacity(offsets.len());
        for (dx, dy, dz) in offsets {
            if let Some(n) = self.offset(c, dx, dy, dz) {
                if n != c && !out.contains(&n) {
                    out.push(n);
                }
            }
        }
        out
    }

    /// Per-axis offset from `from` to `to`. With `wrap`, wrapping axes take
    /// the shorter way around.
    #[must_use]
    pub fn delta(&self, from: Point, to: Point, wrap: bool) -> Point {
        let axis_delta = |axis: &Axis, a: f64, b: f64| {
            if wrap {
                axis.shortest_delta(a, b)
            } else {
                b - a
            }
        };
        Point {
            x: axis_delta(&self.x, from.x, to.x),
            y: axis_delta(&self.y, from.y, to.y),
            z: match self.z {
                Some(z) => axis_delta(&z, from.z, to.z),
                None => 0.0,
            },
        }
    }

    /// Offset that takes an animated move the short way across a wrap seam.
    #[must_use]
    pub fn shortest_path_delta(&self, from: Point, to: Point) -> Point {
        self.delta(from, to, true)
    }

    /// Euclidean distance. With `wrap`, never larger than the direct
    /// distance.
    #[must_use]
    pub fn distance(&self, a: Point, b: Point, wrap: bool) -> f64 {
        self.delta(a, b, wrap).length()
    }

    /// Heading from `from` to `to` in degrees clockwise from north.
    pub fn towards(&self, from: Point, to: Point, wrap: bool) -> Result<f64> {
        if from.x == to.x && from.y == to.y {
            return Err(WorldError::NoHeading {
                x: from.x,
                y: from.y,
            });
        }
        let (dx, dy) = if wrap {
            (
                self.x.heading_delta(from.x, to.x),
                self.y.heading_delta(from.y, to.y),
            )
        } else {
            (to.x - from.x, to.y - from.y)
        };
        if dx == 0.0 && dy == 0.0 {
            // A full-world offset folds to nothing.
            return Err(WorldError::NoHeading {
                x: from.x,
                y: from.y,
            });
        }
        Ok(heading_from_delta(dx, dy))
    }

    /// Pitch from `from` to `to` in degrees, for 3D worlds.
    pub fn towards_pitch(&self, from: Point, to: Point, wrap: bool) -> Result<f64> {
        let d = self.delta(from, to, wrap);
        if d.x == 0.0 && d.y == 0.0 && d.z == 0.0 {
            return Err(WorldError::NoPitch);
        }
        let flat = (d.x * d.x + d.y * d.y).sqrt();
        Ok(normalize_heading(d.z.atan2(flat).to_degrees()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_wrap_folds_into_window() {
        assert_close(wrap(2.5, -2.5, 2.5), -2.5);
        assert_close(wrap(3.0, -2.5, 2.5), -2.0);
        assert_close(wrap(-2.6, -2.5, 2.5), 2.4);
        assert_close(wrap(-7.5, -2.5, 2.5), -2.5);
        assert_close(wrap(1.0, -2.5, 2.5), 1.0);
    }

    #[test]
    fn test_box_axis_rejects_out_of_range() {
        let axis = Axis::new(-2, 2, false);
        assert_eq!(axis.wrap_coord(2.5), Err(WorldError::BeyondWorldEdge));
        assert_eq!(axis.wrap_coord(-2.5), Ok(-2.5));
        assert_eq!(axis.wrap_patch(3), None);
    }

    #[test]
    fn test_non_finite_coordinates_rejected() {
        let topo = Topology::torus(-2, 2, -2, 2);
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                topo.wrap_point(Point::new(bad, 0.0)),
                Err(WorldError::NonFiniteNumber { .. })
            ));
            assert_eq!(topo.coord_of(Point::new(0.0, bad)), None);
        }
    }

    #[test]
    fn test_wrap_patch() {
        let axis = Axis::new(-2, 2, true);
        assert_eq!(axis.wrap_patch(3), Some(-2));
        assert_eq!(axis.wrap_patch(-3), Some(2));
        assert_eq!(axis.wrap_patch(-8), Some(2));
    }

    #[test]
    fn test_heading_cardinal_directions() {
        assert_close(heading_from_delta(0.0, 1.0), 0.0);
        assert_close(heading_from_delta(1.0, 0.0), 90.0);
        assert_close(heading_from_delta(0.0, -1.0), 180.0);
        assert_close(heading_from_delta(-1.0, 0.0), 270.0);
        assert_close(heading_from_delta(1.0, 1.0), 45.0);
        assert_close(heading_from_delta(-1.0, 1.0), 315.0);
    }

    #[test]
    fn test_towards_wraps_on_torus() {
        let topo = Topology::torus(-2, 2, -2, 2);
        let h = topo
            .towards(Point::new(2.0, 0.0), Point::new(-2.0, 0.0), true)
            .unwrap();
        assert_close(h, 90.0);
        let h = topo
            .towards(Point::new(2.0, 0.0), Point::new(-2.0, 0.0), false)
            .unwrap();
        assert_close(h, 270.0);
    }

    #[test]
    fn test_towards_same_point_is_error() {
        let topo = Topology::torus(-2, 2, -2, 2);
        let err = topo
            .towards(Point::new(1.0, 1.0), Point::new(1.0, 1.0), true)
            .unwrap_err();
        assert!(matches!(err, WorldError::NoHeading { .. }));
    }

    #[test]
    fn test_distance_through_seam() {
        let topo = Topology::torus(-5, 5, -5, 5);
        let a = Point::new(-5.0, 0.0);
        let b = Point::new(5.0, 0.0);
        assert_close(topo.distance(a, b, true), 1.0);
        assert_close(topo.distance(a, b, false), 10.0);

        let boxed = Topology::bounded(-5, 5, -5, 5);
        assert_close(boxed.distance(a, b, true), 10.0);
    }

    #[test]
    fn test_shortest_path_delta_picks_copy() {
        let topo = Topology::torus(-5, 5, -5, 5);
        let d = topo.shortest_path_delta(Point::new(4.0, 0.0), Point::new(-4.0, 0.0));
        assert_close(d.x, 3.0);
    }

    #[test]
    fn test_neighbor_order_on_torus() {
        let topo = Topology::torus(-1, 1, -1, 1);
        let n = topo.neighbors(Coord::new(0, 0), Neighborhood::Moore);
        assert_eq!(
            n,
            vec![
                Coord::new(0, 1),
                Coord::new(1, 0),
                Coord::new(0, -1),
                Coord::new(-1, 0),
                Coord::new(1, 1),
                Coord::new(1, -1),
                Coord::new(-1, -1),
                Coord::new(-1, 1),
            ]
        );
    }

    #[test]
    fn test_box_corner_has_fewer_neighbors() {
        let topo = Topology::bounded(-2, 2, -2, 2);
        assert_eq!(topo.neighbors(Coord::new(2, 2), Neighborhood::Moore).len(), 3);
        assert_eq!(
            topo.neighbors(Coord::new(2, 2), Neighborhood::Cardinal),
            vec![Coord::new(2, 1), Coord::new(1, 2)]
        );
        assert_eq!(topo.neighbors(Coord::new(0, 2), Neighborhood::Moore).len(), 5);
    }

    #[test]
    fn test_narrow_torus_dedupes_neighbors() {
        let topo = Topology::torus(0, 1, 0, 0);
        assert_eq!(
            topo.neighbors(Coord::new(0, 0), Neighborhood::Moore),
            vec![Coord::new(1, 0)]
        );
    }

    #[test]
    fn test_3d_neighbor_counts() {
        let topo = Topology::torus(-2, 2, -2, 2).with_z(Axis::new(-2, 2, true));
        assert_eq!(topo.neighbors(Coord::default(), Neighborhood::Cardinal).len(), 6);
        assert_eq!(topo.neighbors(Coord::default(), Neighborhood::Moore).len(), 26);
    }

    #[test]
    fn test_index_roundtrip() {
        let topo = Topology::torus(-2, 3, -1, 1).with_z(Axis::new(0, 1, false));
        for i in 0..topo.patch_count() {
            let c = topo.coord_at(i);
            assert_eq!(topo.index_of(c), Some(i));
        }
        assert_eq!(topo.index_of(Coord::new3(-2, 1, 0)), Some(0));
    }

    #[test]
    fn test_coord_of_rounds_to_nearest_patch() {
        let topo = Topology::torus(-2, 2, -2, 2);
        assert_eq!(topo.coord_of(Point::new(0.49, -0.5)), Some(Coord::new(0, 0)));
        assert_eq!(topo.coord_of(Point::new(2.6, 0.0)), Some(Coord::new(-2, 0)));
        let boxed = Topology::bounded(-2, 2, -2, 2);
        assert_eq!(boxed.coord_of(Point::new(2.6, 0.0)), None);
    }

    #[test]
    fn test_search_range() {
        let axis = Axis::new(-5, 5, true);
        assert_eq!(axis.search_range(0, 2), (-2, 2));
        assert_eq!(axis.search_range(0, 6), (-5, 5));
        let even = Axis::new(0, 3, true);
        assert_eq!(even.search_range(0, 3), (-1, 2));
        let wall = Axis::new(-5, 5, false);
        assert_eq!(wall.search_range(4, 3), (-3, 1));
        assert_eq!(wall.search_range(-4, 3), (-1, 3));
    }

    #[test]
    fn test_subtract_headings() {
        assert_close(subtract_headings(10.0, 350.0), 20.0);
        assert_close(subtract_headings(350.0, 10.0), -20.0);
        assert_close(subtract_headings(90.0, 270.0), 180.0);
    }

    #[test]
    fn test_topology_names() {
        let mut topo = Topology::torus(-1, 1, -1, 1);
        assert_eq!(topo.name(), "torus");
        topo.set_wrapping(false, false, false);
        assert_eq!(topo.name(), "box");
        topo.set_wrapping(true, false, false);
        assert_eq!(topo.name(), "vertical cylinder");
    }
}
