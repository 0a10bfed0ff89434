//! The observer's point of view and per-breed default shapes.

use std::collections::HashMap;
use terrarium_data::{AgentRef, Program};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Perspective {
    #[default]
    Observe,
    Ride,
    Follow,
    Watch,
}

/// What the observer is looking at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observer {
    perspective: Perspective,
    target: Option<AgentRef>,
}

impl Observer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn perspective(&self) -> Perspective {
        self.perspective
    }

    #[must_use]
    pub fn target(&self) -> Option<AgentRef> {
        self.target
    }

    pub fn watch(&mut self, agent: AgentRef) {
        self.set(Perspective::Watch, agent);
    }

    pub fn follow(&mut self, agent: AgentRef) {
        self.set(Perspective::Follow, agent);
    }

    pub fn ride(&mut self, agent: AgentRef) {
        self.set(Perspective::Ride, agent);
    }

    fn set(&mut self, perspective: Perspective, agent: AgentRef) {
        self.perspective = perspective;
        self.target = Some(agent);
    }

    pub fn reset_perspective(&mut self) {
        self.perspective = Perspective::Observe;
        self.target = None;
    }

    /// Drops the focus if it is on `agent`. Returns true if it was.
    pub fn forget(&mut self, agent: AgentRef) -> bool {
        if self.target == Some(agent) {
            self.reset_perspective();
            true
        } else {
            false
        }
    }
}

/// Default shape given to new members of each breed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreedShapes {
    shapes: HashMap<String, String>,
}

impl Default for BreedShapes {
    fn default() -> Self {
        Self::new()
    }
}

impl BreedShapes {
    pub const DEFAULT_SHAPE: &'static str = "default";

    #[must_use]
    pub fn new() -> Self {
        Self {
            shapes: HashMap::new(),
        }
    }

    /// Shape for `breed`, falling back to the universal set's shape.
    #[must_use]
    pub fn shape_for(&self, breed: &str) -> &str {
        self.shapes
            .get(&breed.to_uppercase())
            .or_else(|| self.shapes.get(Program::TURTLES))
            .map_or(Self::DEFAULT_SHAPE, String::as_str)
    }

    #[must_use]
    pub fn link_shape_for(&self, breed: &str) -> &str {
        self.shapes
            .get(&breed.to_uppercase())
            .or_else(|| self.shapes.get(Program::LINKS))
            .map_or(Self::DEFAULT_SHAPE, String::as_str)
    }

    pub fn set_shape(&mut self, breed: &str, shape: &str) {
        self.shapes.insert(breed.to_uppercase(), shape.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrarium_data::TurtleId;

    #[test]
    fn test_forget_only_current_target() {
        let mut observer = Observer::new();
        observer.watch(AgentRef::Turtle(TurtleId(1)));
        assert_eq!(observer.perspective(), Perspective::Watch);
        assert!(!observer.forget(AgentRef::Turtle(TurtleId(2))));
        assert!(observer.forget(AgentRef::Turtle(TurtleId(1))));
        assert_eq!(observer.perspective(), Perspective::Observe);
        assert_eq!(observer.target(), None);
    }

    #[test]
    fn test_breed_shapes_fallback() {
        let mut shapes = BreedShapes::new();
        assert_eq!(shapes.shape_for("WOLVES"), "default");
        shapes.set_shape("turtles", "circle");
        assert_eq!(shapes.shape_for("WOLVES"), "circle");
        shapes.set_shape("wolves", "wolf");
        assert_eq!(shapes.shape_for("Wolves"), "wolf");
        assert_eq!(shapes.link_shape_for("ROADS"), "default");
    }
}
