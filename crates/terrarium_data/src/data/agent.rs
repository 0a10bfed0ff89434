use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a turtle. Assigned from a monotonic counter ("who number").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TurtleId(pub u64);

/// Index of a patch in row-major order, top row first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PatchId(pub usize);

/// Identifier of a link. Never reused within a world until links are cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    Turtle,
    Patch,
    Link,
}

impl AgentKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            AgentKind::Turtle => "turtle",
            AgentKind::Patch => "patch",
            AgentKind::Link => "link",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A reference to any agent in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentRef {
    Turtle(TurtleId),
    Patch(PatchId),
    Link(LinkId),
}

impl AgentRef {
    #[must_use]
    pub fn kind(&self) -> AgentKind {
        match self {
            AgentRef::Turtle(_) => AgentKind::Turtle,
            AgentRef::Patch(_) => AgentKind::Patch,
            AgentRef::Link(_) => AgentKind::Link,
        }
    }

    #[must_use]
    pub fn as_turtle(&self) -> Option<TurtleId> {
        match self {
            AgentRef::Turtle(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_patch(&self) -> Option<PatchId> {
        match self {
            AgentRef::Patch(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_link(&self) -> Option<LinkId> {
        match self {
            AgentRef::Link(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<TurtleId> for AgentRef {
    fn from(id: TurtleId) -> Self {
        AgentRef::Turtle(id)
    }
}

impl From<PatchId> for AgentRef {
    fn from(id: PatchId) -> Self {
        AgentRef::Patch(id)
    }
}

impl From<LinkId> for AgentRef {
    fn from(id: LinkId) -> Self {
        AgentRef::Link(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_ref_kind_and_projection() {
        let t: AgentRef = TurtleId(4).into();
        assert_eq!(t.kind(), AgentKind::Turtle);
        assert_eq!(t.as_turtle(), Some(TurtleId(4)));
        assert_eq!(t.as_patch(), None);

        let l: AgentRef = LinkId(1).into();
        assert_eq!(l.kind().to_string(), "link");
        assert_eq!(l.as_link(), Some(LinkId(1)));
    }

    #[test]
    fn test_turtle_ids_order_by_who_number() {
        let mut ids = vec![TurtleId(3), TurtleId(0), TurtleId(2)];
        ids.sort();
        assert_eq!(ids, vec![TurtleId(0), TurtleId(2), TurtleId(3)]);
    }
}
