use crate::patch::DEFAULT_LABEL_COLOR;
use crate::schema::{link_var, StaleSlots};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use terrarium_data::{AgentRef, LinkId, TurtleId, Value};

/// Default link color (gray).
pub const DEFAULT_LINK_COLOR: f64 = 5.0;

/// How a link drags its far end along when the near end moves or turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TieMode {
    #[default]
    None,
    /// The far end follows moves and orbits on turns but keeps its heading.
    Free,
    /// Like `Free`, and the far end also turns with the near end.
    Fixed,
}

impl TieMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TieMode::None => "none",
            TieMode::Free => "free",
            TieMode::Fixed => "fixed",
        }
    }
}

impl FromStr for TieMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "" => Ok(TieMode::None),
            "free" => Ok(TieMode::Free),
            "fixed" => Ok(TieMode::Fixed),
            _ => Err(()),
        }
    }
}

/// A connection between two turtles.
///
/// Undirected links always store the lower who number as `end1`.
#[derive(Debug, Clone)]
pub struct Link {
    id: LinkId,
    end1: TurtleId,
    end2: TurtleId,
    pub(crate) directed: bool,
    pub(crate) breed: String,
    pub(crate) vars: Vec<Value>,
    pub(crate) stale: Option<StaleSlots>,
}

impl Link {
    pub(crate) fn new(
        id: LinkId,
        end1: TurtleId,
        end2: TurtleId,
        directed: bool,
        breed: &str,
        shape: &str,
        slots: usize,
    ) -> Self {
        let (end1, end2) = if directed || end1 <= end2 {
            (end1, end2)
        } else {
            (end2, end1)
        };
        let mut vars = vec![Value::ZERO; slots.max(link_var::TIE_MODE + 1)];
        vars[link_var::COLOR] = Value::Number(DEFAULT_LINK_COLOR);
        vars[link_var::LABEL] = Value::from("");
        vars[link_var::LABEL_COLOR] = Value::Number(DEFAULT_LABEL_COLOR);
        vars[link_var::HIDDEN] = Value::Boolean(false);
        vars[link_var::THICKNESS] = Value::Number(0.0);
        vars[link_var::SHAPE] = Value::from(shape);
        vars[link_var::TIE_MODE] = Value::from(TieMode::None.as_str());
        Self {
            id,
            end1,
            end2,
            directed,
            breed: breed.to_string(),
            vars,
            stale: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> LinkId {
        self.id
    }

    #[must_use]
    pub fn end1(&self) -> TurtleId {
        self.end1
    }

    #[must_use]
    pub fn end2(&self) -> TurtleId {
        self.end2
    }

    #[must_use]
    pub fn is_directed(&self) -> bool {
        self.directed
    }

    #[must_use]
    pub fn breed(&self) -> &str {
        &self.breed
    }

    #[must_use]
    pub fn touches(&self, turtle: TurtleId) -> bool {
        self.end1 == turtle || self.end2 == turtle
    }

    /// The end that is not `turtle`, or `None` if `turtle` is not an end.
    #[must_use]
    pub fn other_end(&self, turtle: TurtleId) -> Option<TurtleId> {
        if self.end1 == turtle {
            Some(self.end2)
        } else if self.end2 == turtle {
            Some(self.end1)
        } else {
            None
        }
    }

    #[must_use]
    pub fn tie_mode(&self) -> TieMode {
        self.vars[link_var::TIE_MODE]
            .as_text()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_tied(&self) -> bool {
        self.tie_mode() != TieMode::None
    }

    #[must_use]
    pub fn slot(&self, index: usize) -> Option<Value> {
        match index {
            link_var::END1 => Some(Value::Agent(AgentRef::Turtle(self.end1))),
            link_var::END2 => Some(Value::Agent(AgentRef::Turtle(self.end2))),
            link_var::BREED => Some(Value::Breed(self.breed.clone())),
            _ => self.vars.get(index).cloned(),
        }
    }
}
