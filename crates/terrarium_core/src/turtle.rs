use crate::drawing::PenMode;
use crate::patch::DEFAULT_LABEL_COLOR;
use crate::schema::{turtle_var, StaleSlots};
use crate::topology::Point;
use terrarium_data::{LinkId, PatchId, TurtleId, Value};

/// A mobile agent.
///
/// Position, heading, pitch, roll, breed and who number live in typed
/// fields; their predefined slots are filled in on read. Everything else is
/// in `vars`.
#[derive(Debug, Clone)]
pub struct Turtle {
    id: TurtleId,
    pub(crate) vars: Vec<Value>,
    pub(crate) position: Point,
    pub(crate) heading: f64,
    pub(crate) pitch: f64,
    pub(crate) roll: f64,
    pub(crate) breed: String,
    pub(crate) patch: PatchId,
    pub(crate) links: Vec<LinkId>,
    /// Set while the turtle's breed is missing from the program.
    pub(crate) stale: Option<StaleSlots>,
}

impl Turtle {
    pub(crate) fn new(
        id: TurtleId,
        breed: &str,
        shape: &str,
        position: Point,
        patch: PatchId,
        slots: usize,
    ) -> Self {
        let mut vars = vec![Value::ZERO; slots.max(turtle_var::PEN_MODE + 1)];
        vars[turtle_var::COLOR] = Value::Number(0.0);
        vars[turtle_var::SHAPE] = Value::from(shape);
        vars[turtle_var::LABEL] = Value::from("");
        vars[turtle_var::LABEL_COLOR] = Value::Number(DEFAULT_LABEL_COLOR);
        vars[turtle_var::HIDDEN] = Value::Boolean(false);
        vars[turtle_var::SIZE] = Value::Number(1.0);
        vars[turtle_var::PEN_SIZE] = Value::Number(1.0);
        vars[turtle_var::PEN_MODE] = PenMode::Up.into();
        Self {
            id,
            vars,
            position,
            heading: 0.0,
            pitch: 0.0,
            roll: 0.0,
            breed: breed.to_string(),
            patch,
            links: Vec::new(),
            stale: None,
        }
    }

    /// Copy of `self` under a new who number, with no links.
    pub(crate) fn hatch(&self, id: TurtleId) -> Self {
        Self {
            id,
            links: Vec::new(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn id(&self) -> TurtleId {
        self.id
    }

    #[must_use]
    pub fn who(&self) -> u64 {
        self.id.0
    }

    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }

    #[must_use]
    pub fn xcor(&self) -> f64 {
        self.position.x
    }

    #[must_use]
    pub fn ycor(&self) -> f64 {
        self.position.y
    }

    #[must_use]
    pub fn zcor(&self) -> f64 {
        self.position.z
    }

    #[must_use]
    pub fn heading(&self) -> f64 {
        self.heading
    }

    #[must_use]
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    #[must_use]
    pub fn breed(&self) -> &str {
        &self.breed
    }

    /// Patch the turtle is standing on.
    #[must_use]
    pub fn patch_here(&self) -> PatchId {
        self.patch
    }

    /// Incident links, in creation order.
    #[must_use]
    pub fn links(&self) -> &[LinkId] {
        &self.links
    }

    #[must_use]
    pub fn color(&self) -> &Value {
        &self.vars[turtle_var::COLOR]
    }

    #[must_use]
    pub fn pen_mode(&self) -> PenMode {
        self.vars[turtle_var::PEN_MODE]
            .as_text()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn pen_size(&self) -> f64 {
        self.vars[turtle_var::PEN_SIZE].as_number().unwrap_or(1.0)
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.vars[turtle_var::HIDDEN].as_bool().unwrap_or(false)
    }

    /// Value of slot `index`, or `None` past the end.
    #[must_use]
    pub fn slot(&self, index: usize, is_3d: bool) -> Option<Value> {
        let synthesized = match index {
            turtle_var::WHO => Value::Number(self.id.0 as f64),
            turtle_var::HEADING => Value::Number(self.heading),
            turtle_var::XCOR => Value::Number(self.position.x),
            turtle_var::YCOR => Value::Number(self.position.y),
            turtle_var::BREED => Value::Breed(self.breed.clone()),
            turtle_var::ZCOR if is_3d => Value::Number(self.position.z),
            turtle_var::PITCH if is_3d => Value::Number(self.pitch),
            turtle_var::ROLL if is_3d => Value::Number(self.roll),
            _ => return self.vars.get(index).cloned(),
        };
        Some(synthesized)
    }

    pub(crate) fn unlink(&mut self, link: LinkId) {
        self.links.retain(|&l| l != link);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turtle() -> Turtle {
        Turtle::new(
            TurtleId(7),
            "WOLVES",
            "wolf",
            Point::new(1.0, 2.0),
            PatchId(0),
            15,
        )
    }

    #[test]
    fn test_defaults() {
        let t = turtle();
        assert_eq!(t.vars.len(), 15);
        assert_eq!(t.pen_mode(), PenMode::Up);
        assert_eq!(t.pen_size(), 1.0);
        assert!(!t.is_hidden());
        assert_eq!(t.slot(turtle_var::SHAPE, false), Some(Value::from("wolf")));
        assert_eq!(t.slot(14, false), Some(Value::ZERO));
        assert_eq!(t.slot(15, false), None);
    }

    #[test]
    fn test_synthesized_slots() {
        let mut t = turtle();
        t.heading = 45.0;
        assert_eq!(t.slot(turtle_var::WHO, false), Some(Value::Number(7.0)));
        assert_eq!(t.slot(turtle_var::XCOR, false), Some(Value::Number(1.0)));
        assert_eq!(t.slot(turtle_var::HEADING, false), Some(Value::Number(45.0)));
        assert_eq!(
            t.slot(turtle_var::BREED, false),
            Some(Value::Breed("WOLVES".into()))
        );
        // Slot 13 is a turtles-own variable in 2D and ZCOR in 3D.
        assert_eq!(t.slot(turtle_var::ZCOR, false), Some(Value::ZERO));
    }

    #[test]
    fn test_hatch_drops_links() {
        let mut t = turtle();
        t.links.push(LinkId(0));
        let child = t.hatch(TurtleId(8));
        assert_eq!(child.who(), 8);
        assert!(child.links().is_empty());
        assert_eq!(child.position(), t.position());
        t.unlink(LinkId(0));
        assert!(t.links().is_empty());
    }
}
