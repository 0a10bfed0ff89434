pub mod agent;
pub mod program;
pub mod value;
