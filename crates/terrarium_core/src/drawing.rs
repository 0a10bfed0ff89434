//! Pen trails.
//!
//! Turtles with their pen down leave line segments behind as they move.
//! The world hands those segments to a [`DrawingSink`]; what the sink does
//! with them (rasterize, record, discard) is up to the host.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use terrarium_data::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PenMode {
    #[default]
    Up,
    Down,
    Erase,
}

impl PenMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PenMode::Up => "up",
            PenMode::Down => "down",
            PenMode::Erase => "erase",
        }
    }

    #[must_use]
    pub fn draws(self) -> bool {
        self != PenMode::Up
    }
}

impl FromStr for PenMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(PenMode::Up),
            "down" => Ok(PenMode::Down),
            "erase" => Ok(PenMode::Erase),
            _ => Err(()),
        }
    }
}

impl From<PenMode> for Value {
    fn from(mode: PenMode) -> Self {
        Value::from(mode.as_str())
    }
}

/// One straight piece of a pen trail, already inside the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailSegment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub color: Value,
    pub pen_size: f64,
    pub mode: PenMode,
}

/// Receives pen trail segments from the world.
pub trait DrawingSink: Send {
    fn draw_line(&mut self, segment: TrailSegment);

    /// Wipes the drawing layer.
    fn clear(&mut self) {}
}

/// Sink that discards every segment.
pub struct NullDrawing;

impl DrawingSink for NullDrawing {
    fn draw_line(&mut self, _segment: TrailSegment) {}
}

/// Sink that records segments in memory. Clones share the same buffer, so
/// keep one clone to read back what the world drew.
#[derive(Debug, Clone, Default)]
pub struct TrailBuffer {
    segments: Arc<Mutex<Vec<TrailSegment>>>,
}

impl TrailBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn segments(&self) -> Vec<TrailSegment> {
        self.segments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DrawingSink for TrailBuffer {
    fn draw_line(&mut self, segment: TrailSegment) {
        self.segments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(segment);
    }

    fn clear(&mut self) {
        self.segments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

/// Rectangle of the wrap window, `[min, max)` on each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

const MAX_TRAIL_PIECES: usize = 10_000;

/// Splits a straight move of `distance` along `heading` from `(x, y)` into
/// pieces that each stay inside `bounds`, re-entering on the opposite side
/// every time the line crosses an edge.
///
/// Returns `(x1, y1, x2, y2)` tuples. A negative distance walks backwards.
#[must_use]
pub fn split_trail(
    x: f64,
    y: f64,
    heading: f64,
    distance: f64,
    bounds: TrailBounds,
) -> Vec<(f64, f64, f64, f64)> {
    let rad = heading.to_radians();
    let sign = if distance < 0.0 { -1.0 } else { 1.0 };
    let (dx, dy) = (sign * rad.sin(), sign * rad.cos());
    let mut remaining = distance.abs();
    let (mut x, mut y) = (x, y);
    let mut pieces = Vec::new();

    while remaining > 0.0 && pieces.len() < MAX_TRAIL_PIECES {
        let tx = if dx > 0.0 {
            (bounds.max_x - x) / dx
        } else if dx < 0.0 {
            (bounds.min_x - x) / dx
        } else {
            f64::INFINITY
        };
        let ty = if dy > 0.0 {
            (bounds.max_y - y) / dy
        } else if dy < 0.0 {
            (bounds.min_y - y) / dy
        } else {
            f64::INFINITY
        };
        let t = tx.min(ty).max(0.0);
        if remaining <= t {
            pieces.push((x, y, x + dx * remaining, y + dy * remaining));
            break;
        }
        let (ex, ey) = (x + dx * t, y + dy * t);
        if t > 0.0 {
            pieces.push((x, y, ex, ey));
        }
        remaining -= t;
        x = ex;
        y = ey;
        if tx <= ty {
            x = if dx > 0.0 { bounds.min_x } else { bounds.max_x };
        }
        if ty <= tx {
            y = if dy > 0.0 { bounds.min_y } else { bounds.max_y };
        }
    }
    pieces
}
