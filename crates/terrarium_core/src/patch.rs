use crate::schema::patch_var;
use crate::topology::Coord;
use std::sync::OnceLock;
use terrarium_data::{PatchId, TurtleId, Value};

/// Default label color (white).
pub const DEFAULT_LABEL_COLOR: f64 = 9.9;

/// A fixed grid cell. Patches are created with the world and only replaced
/// when the world is resized.
#[derive(Debug)]
pub struct Patch {
    id: PatchId,
    coord: Coord,
    pub(crate) vars: Vec<Value>,
    pub(crate) turtles_here: Vec<TurtleId>,
    pub(crate) neighbors: OnceLock<Vec<PatchId>>,
    pub(crate) neighbors4: OnceLock<Vec<PatchId>>,
}

impl Patch {
    pub(crate) fn new(id: PatchId, coord: Coord, slots: usize, is_3d: bool) -> Self {
        let mut vars = vec![
            Value::Number(f64::from(coord.x)),
            Value::Number(f64::from(coord.y)),
            Value::Number(0.0),
            Value::from(""),
            Value::Number(DEFAULT_LABEL_COLOR),
        ];
        if is_3d {
            vars.push(Value::Number(f64::from(coord.z)));
        }
        vars.resize(slots.max(vars.len()), Value::ZERO);
        Self {
            id,
            coord,
            vars,
            turtles_here: Vec::new(),
            neighbors: OnceLock::new(),
            neighbors4: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> PatchId {
        self.id
    }

    #[must_use]
    pub fn coord(&self) -> Coord {
        self.coord
    }

    #[must_use]
    pub fn pxcor(&self) -> i32 {
        self.coord.x
    }

    #[must_use]
    pub fn pycor(&self) -> i32 {
        self.coord.y
    }

    #[must_use]
    pub fn pzcor(&self) -> i32 {
        self.coord.z
    }

    /// Turtles standing on this patch, in arrival order.
    #[must_use]
    pub fn turtles_here(&self) -> &[TurtleId] {
        &self.turtles_here
    }

    #[must_use]
    pub fn vars(&self) -> &[Value] {
        &self.vars
    }

    #[must_use]
    pub fn pcolor(&self) -> &Value {
        &self.vars[patch_var::PCOLOR]
    }

    pub(crate) fn add_turtle(&mut self, id: TurtleId) {
        self.turtles_here.push(id);
    }

    pub(crate) fn remove_turtle(&mut self, id: TurtleId) {
        if let Some(pos) = self.turtles_here.iter().position(|&t| t == id) {
            self.turtles_here.remove(pos);
        }
    }

    /// Restores the predefined slots to their defaults, leaving owned slots
    /// at zero.
    pub(crate) fn reset(&mut self, is_3d: bool) {
        let slots = self.vars.len();
        *self = Self {
            turtles_here: std::mem::take(&mut self.turtles_here),
            neighbors: std::mem::take(&mut self.neighbors),
            neighbors4: std::mem::take(&mut self.neighbors4),
            ..Self::new(self.id, self.coord, slots, is_3d)
        };
    }
}
