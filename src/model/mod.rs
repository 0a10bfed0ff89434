pub use terrarium_core::{AgentSet, RecompileReport, World, WorldError};
pub use terrarium_data::{AgentKind, AgentRef, BreedDecl, LinkId, PatchId, Program, TurtleId, Value};

pub mod agentset {
    pub use terrarium_core::agentset::*;
}
pub mod config {
    pub use terrarium_core::config::*;
}
pub mod diffusion {
    pub use terrarium_core::diffusion::*;
}
pub mod drawing {
    pub use terrarium_core::drawing::*;
}
pub mod error {
    pub use terrarium_core::error::*;
}
pub mod link {
    pub use terrarium_core::link::*;
}
pub mod metrics {
    pub use terrarium_core::metrics::*;
}
pub mod observer {
    pub use terrarium_core::observer::*;
}
pub mod patch {
    pub use terrarium_core::patch::*;
}
pub mod schema {
    pub use terrarium_core::schema::*;
}
pub mod topology {
    pub use terrarium_core::topology::*;
}
pub mod turtle {
    pub use terrarium_core::turtle::*;
}
pub mod world {
    pub use terrarium_core::world::*;
}
