//! Plain data shared by the terrarium world model.
//!
//! Nothing in here knows about topology or lifecycle; these are the values
//! stored in agent variable slots, the handles that name agents, and the
//! compiled program schema that decides how many slots each agent carries.

pub mod data;

pub use data::agent::{AgentKind, AgentRef, LinkId, PatchId, TurtleId};
pub use data::program::{BreedDecl, Program};
pub use data::value::Value;
