//! # Terrarium
//!
//! Headless front end for the `terrarium_core` world model. The model itself
//! is re-exported under [`model`]; [`runner`] drives a seeded session from a
//! `config.toml`.

pub mod model;
pub mod runner;
