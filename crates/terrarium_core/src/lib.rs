//! # Terrarium Core
//!
//! The world model of an agent-based modelling runtime: a grid of patches,
//! turtles that move across it, and links that join turtles.
//!
//! This crate contains:
//! - Topology (torus, cylinders, box) with wrap-aware distance and headings
//! - Agent lifecycle with patch occupancy, breed sets and link incidence
//! - Variable slots and their migration when a program or breed changes
//! - Radius and cone queries that see across wrapping edges
//! - Patch diffusion over 4- or 8-neighbor kernels
//! - Metrics counters and structured logging
//!
//! ## Architecture
//!
//! - **Arenas with id handles**: turtles and links live in id-keyed maps and
//!   every cross reference is an id, so a dead agent is detected, never
//!   dereferenced
//! - **Slots as tagged values**: every agent carries a `Vec<Value>` laid out
//!   as predefined, kind-owned and breed-owned variables
//! - **Snapshot passes**: diffusion gathers from a copy of the old values in
//!   parallel with Rayon, so the result does not depend on visit order
//! - **Caller-owned randomness**: the engine draws nothing itself; shuffles
//!   take a seeded RNG from the caller
//!
//! ## Example
//!
//! ```
//! use terrarium_core::topology::{Point, Topology};
//! use terrarium_core::World;
//! use terrarium_data::Program;
//!
//! let mut world = World::new(Topology::torus(-2, 2, -2, 2), Program::new()).unwrap();
//! let turtle = world.create_turtle_at(Point::new(2.0, 0.0), None).unwrap();
//! world.set_heading(turtle, 90.0).unwrap();
//! world.jump(turtle, 1.0).unwrap();
//! assert_eq!(world.turtle(turtle).unwrap().xcor(), -2.0);
//! ```

/// Breed registries, agentset descriptions and shuffling
pub mod agentset;
/// Configuration loading and validation
pub mod config;
/// Patch variable diffusion
pub mod diffusion;
/// Pen modes and the trail sink turtles draw into
pub mod drawing;
/// Error types and their classification
pub mod error;
/// Links and tie modes
pub mod link;
/// World counters and logging setup
pub mod metrics;
/// Observer focus and per-breed default shapes
pub mod observer;
/// Patches and their occupancy lists
pub mod patch;
/// Variable slot layouts and migration between them
pub mod schema;
/// In-radius and in-cone queries
pub mod spatial;
/// World bounds, wrapping, distance and neighbors
pub mod topology;
/// Turtles
pub mod turtle;
/// The world that owns every agent
pub mod world;

pub use agentset::{AgentSet, BreedSet, Breeds};
pub use config::AppConfig;
pub use drawing::{DrawingSink, PenMode, TrailBuffer};
pub use error::{ErrorKind, Result, WorldError};
pub use link::{Link, TieMode};
pub use metrics::{init_logging, MetricsSnapshot, WorldMetrics};
pub use world::{RecompileReport, World};
