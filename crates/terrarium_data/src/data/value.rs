use super::agent::AgentRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value held in an agent variable slot.
///
/// Slots are dynamically typed; the world checks the few predefined slots
/// that require a particular shape (numbers for coordinates, text for
/// pen mode and so on) when they are written.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Nobody,
    Number(f64),
    Boolean(bool),
    Text(String),
    List(Vec<Value>),
    Agent(AgentRef),
    /// The agentset naming a breed, stored in the BREED slot.
    Breed(String),
}

impl Value {
    /// Fill value for freshly allocated user-declared slots.
    pub const ZERO: Value = Value::Number(0.0);

    #[inline]
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_nobody(&self) -> bool {
        matches!(self, Value::Nobody)
    }

    /// Short type name used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nobody => "nobody",
            Value::Number(_) => "number",
            Value::Boolean(_) => "true/false",
            Value::Text(_) => "string",
            Value::List(_) => "list",
            Value::Agent(_) => "agent",
            Value::Breed(_) => "agentset",
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<AgentRef> for Value {
    fn from(agent: AgentRef) -> Self {
        Value::Agent(agent)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nobody => f.write_str("nobody"),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{n}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Text(s) => write!(f, "\"{s}\""),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Agent(AgentRef::Turtle(id)) => write!(f, "(turtle {})", id.0),
            Value::Agent(AgentRef::Patch(id)) => write!(f, "(patch #{})", id.0),
            Value::Agent(AgentRef::Link(id)) => write!(f, "(link #{})", id.0),
            Value::Breed(name) => f.write_str(&name.to_lowercase()),
        }
    }
}
