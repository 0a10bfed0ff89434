//! Error types for world operations.
//!
//! Every failure carries enough context to build a user-facing message and
//! is classified by [`ErrorKind`] so callers can tell a bad argument from a
//! geometric impossibility or a dead agent.

use terrarium_data::{AgentKind, Value};
use thiserror::Error;

/// Broad classification of a [`WorldError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller passed an argument the operation cannot accept.
    Precondition,
    /// The request has no geometric answer (beyond a wall, no heading).
    Geometry,
    /// The agent involved is dead, or the request would break link rules.
    Lifecycle,
    /// An agent of the wrong kind reached a kind-specific accessor.
    Invariant,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorldError {
    #[error("{operation}: radius cannot be negative, got {radius}")]
    NegativeRadius { operation: &'static str, radius: f64 },

    #[error("in-cone: angle must be between 0 and 360, got {0}")]
    InvalidConeAngle(f64),

    #[error("diffusion rate must be between 0 and 1, got {0}")]
    InvalidDiffusionRate(f64),

    #[error("{operation} expected a finite number but got {value}")]
    NonFiniteNumber { operation: &'static str, value: f64 },

    #[error("{operation} expected {expected} but got a set of {found}s")]
    WrongCandidateKind {
        operation: &'static str,
        expected: &'static str,
        found: AgentKind,
    },

    #[error("{agent} has no variable at index {index}")]
    VariableIndexOutOfRange { agent: String, index: usize },

    #[error("{agent} does not own variable {variable}")]
    VariableNotOwned { agent: String, variable: String },

    #[error("can't set {agent} variable {variable} to {value}: expected {expected}")]
    WrongTypeForVariable {
        agent: String,
        variable: String,
        expected: &'static str,
        value: Value,
    },

    #[error("{variable} is read-only for {agent}")]
    ReadOnlyVariable { agent: String, variable: String },

    #[error("no {kind} breed named {name}")]
    UnknownBreed { kind: AgentKind, name: String },

    #[error("can't diffuse {variable}: patch {pxcor} {pycor} holds {value}, which is not a number")]
    NonNumericPatchValue {
        variable: String,
        pxcor: i32,
        pycor: i32,
        value: Value,
    },

    #[error("cannot resize a {from}D world into a {to}D world")]
    DimensionMismatch { from: u8, to: u8 },

    #[error("the origin must lie inside the world bounds")]
    OriginOutsideWorld,

    #[error("Cannot move turtle beyond the world's edge.")]
    BeyondWorldEdge,

    #[error("No heading is defined from a point ({x},{y}) to that same point.")]
    NoHeading { x: f64, y: f64 },

    #[error("No pitch is defined from a point to that same point.")]
    NoPitch,

    #[error("that {0} is dead")]
    DeadAgent(String),

    #[error("turtle {0} cannot link with itself")]
    SelfLink(u64),

    #[error("there is already a {breed} between turtle {end1} and turtle {end2}")]
    LinkExists {
        breed: String,
        end1: u64,
        end2: u64,
    },

    #[error("you cannot have both breeded and unbreeded links in the same world")]
    MixedLinkBreeds,

    #[error("you cannot have both directed and undirected {0} in the same world")]
    LinkDirectednessConflict(String),

    #[error("expected a {expected} but got a {found}")]
    WrongAgentKind {
        expected: AgentKind,
        found: AgentKind,
    },
}

/// Result type alias for world operations.
pub type Result<T> = std::result::Result<T, WorldError>;

impl WorldError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NegativeRadius { .. }
            | Self::InvalidConeAngle(_)
            | Self::InvalidDiffusionRate(_)
            | Self::NonFiniteNumber { .. }
            | Self::WrongCandidateKind { .. }
            | Self::VariableIndexOutOfRange { .. }
            | Self::VariableNotOwned { .. }
            | Self::WrongTypeForVariable { .. }
            | Self::ReadOnlyVariable { .. }
            | Self::UnknownBreed { .. }
            | Self::NonNumericPatchValue { .. }
            | Self::OriginOutsideWorld => ErrorKind::Precondition,
            Self::BeyondWorldEdge | Self::NoHeading { .. } | Self::NoPitch => ErrorKind::Geometry,
            Self::DeadAgent(_)
            | Self::SelfLink(_)
            | Self::LinkExists { .. }
            | Self::MixedLinkBreeds
            | Self::LinkDirectednessConflict(_) => ErrorKind::Lifecycle,
            Self::WrongAgentKind { .. } | Self::DimensionMismatch { .. } => ErrorKind::Invariant,
        }
    }

    /// Creates a dead-agent error for the described agent.
    #[must_use]
    pub fn dead<S: Into<String>>(agent: S) -> Self {
        Self::DeadAgent(agent.into())
    }

    #[must_use]
    pub fn not_owned<A: Into<String>, V: Into<String>>(agent: A, variable: V) -> Self {
        Self::VariableNotOwned {
            agent: agent.into(),
            variable: variable.into(),
        }
    }

    #[must_use]
    pub fn wrong_type<A: Into<String>, V: Into<String>>(
        agent: A,
        variable: V,
        expected: &'static str,
        value: Value,
    ) -> Self {
        Self::WrongTypeForVariable {
            agent: agent.into(),
            variable: variable.into(),
            expected,
            value,
        }
    }

    /// Passes `value` through, or rejects NaN and infinities.
    pub fn finite(operation: &'static str, value: f64) -> Result<f64> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Self::NonFiniteNumber { operation, value })
        }
    }

    #[must_use]
    pub fn wrong_kind(expected: AgentKind, found: AgentKind) -> Self {
        Self::WrongAgentKind { expected, found }
    }
}
