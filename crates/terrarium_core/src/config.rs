//! Configuration for a world and a headless run.
//!
//! Maps onto `config.toml`. Every section has defaults, so an empty file is
//! a valid configuration.
//!
//! ## Example `config.toml`
//!
//! ```toml
//! [world]
//! min_pxcor = -16
//! max_pxcor = 16
//! wrap_y = false
//!
//! [program]
//! patches_own = ["chemical"]
//!
//! [[program.breeds]]
//! name = "ants"
//! singular = "ant"
//! owns = ["carrying"]
//!
//! [run]
//! seed = 42
//! ticks = 500
//! ```

use crate::topology::{Axis, Topology};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use terrarium_data::Program;

/// World bounds and wrapping.
///
/// Set both `min_pzcor` and `max_pzcor` for a 3D world.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    pub min_pxcor: i32,
    pub max_pxcor: i32,
    pub min_pycor: i32,
    pub max_pycor: i32,
    pub min_pzcor: Option<i32>,
    pub max_pzcor: Option<i32>,
    pub wrap_x: bool,
    pub wrap_y: bool,
    pub wrap_z: bool,
    pub patch_size: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            min_pxcor: -16,
            max_pxcor: 16,
            min_pycor: -16,
            max_pycor: 16,
            min_pzcor: None,
            max_pzcor: None,
            wrap_x: true,
            wrap_y: true,
            wrap_z: true,
            patch_size: 13.0,
        }
    }
}

impl WorldConfig {
    #[must_use]
    pub fn topology(&self) -> Topology {
        let topo = Topology::new(
            Axis::new(self.min_pxcor, self.max_pxcor, self.wrap_x),
            Axis::new(self.min_pycor, self.max_pycor, self.wrap_y),
        );
        match (self.min_pzcor, self.max_pzcor) {
            (Some(min), Some(max)) => topo.with_z(Axis::new(min, max, self.wrap_z)),
            _ => topo,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive such as `info` or `terrarium_core=debug`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Parameters of the headless runner.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub seed: Option<u64>,
    pub ticks: u64,
    pub initial_turtles: usize,
    /// Breed of the initial turtles; the universal set when absent.
    pub breed: Option<String>,
    /// Patch variable that turtles deposit into and that gets diffused.
    pub deposit_variable: Option<String>,
    pub deposit_amount: f64,
    pub diffusion_rate: f64,
    pub wiggle: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: None,
            ticks: 100,
            initial_turtles: 50,
            breed: None,
            deposit_variable: None,
            deposit_amount: 10.0,
            diffusion_rate: 0.5,
            wiggle: 40.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub world: WorldConfig,
    pub program: Program,
    pub logging: LoggingConfig,
    pub run: RunConfig,
}

impl AppConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let w = &self.world;
        anyhow::ensure!(w.min_pxcor <= w.max_pxcor, "min_pxcor must not exceed max_pxcor");
        anyhow::ensure!(w.min_pycor <= w.max_pycor, "min_pycor must not exceed max_pycor");
        anyhow::ensure!(
            w.min_pzcor.is_some() == w.max_pzcor.is_some(),
            "min_pzcor and max_pzcor must be set together"
        );
        if let (Some(min), Some(max)) = (w.min_pzcor, w.max_pzcor) {
            anyhow::ensure!(min <= max, "min_pzcor must not exceed max_pzcor");
        }
        anyhow::ensure!(
            w.topology().contains_origin(),
            "The world must contain the origin patch"
        );
        anyhow::ensure!(
            w.patch_size.is_finite() && w.patch_size > 0.0,
            "Patch size must be positive"
        );

        let r = &self.run;
        anyhow::ensure!(
            (0.0..=1.0).contains(&r.diffusion_rate),
            "Diffusion rate must be between 0 and 1"
        );
        anyhow::ensure!(
            r.initial_turtles <= 100_000,
            "Initial turtle count too large (max 100000)"
        );

        self.validate_program()?;
        if let Some(breed) = &r.breed {
            anyhow::ensure!(
                self.program.turtle_breed(breed).is_some(),
                "Run breed {breed} is not declared"
            );
        }
        if let Some(var) = &r.deposit_variable {
            anyhow::ensure!(
                self.program
                    .patches_own
                    .iter()
                    .any(|v| v.eq_ignore_ascii_case(var)),
                "Deposit variable {var} is not in patches_own"
            );
        }
        Ok(())
    }

    fn validate_program(&self) -> anyhow::Result<()> {
        let p = &self.program;
        ensure_unique("turtles_own", p.turtles_own.iter())?;
        ensure_unique("patches_own", p.patches_own.iter())?;
        ensure_unique("links_own", p.links_own.iter())?;
        ensure_unique("breeds", p.breeds.iter().map(|b| &b.name))?;
        ensure_unique("link breeds", p.link_breeds.iter().map(|b| &b.name))?;
        for breed in p.breeds.iter() {
            ensure_unique(&breed.name, p.turtles_own.iter().chain(breed.owns.iter()))?;
        }
        for breed in p.link_breeds.iter() {
            ensure_unique(&breed.name, p.links_own.iter().chain(breed.owns.iter()))?;
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let mut config = toml::from_str::<Self>(content)?;
        config.program = config.program.normalized();
        config.validate()?;
        Ok(config)
    }

    /// Stable hash of everything that affects a run's outcome.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.world).as_bytes());
        hasher.update(format!("{:?}", self.program).as_bytes());
        hasher.update(format!("{:?}", self.run).as_bytes());
        hex::encode(hasher.finalize())
    }
}

fn ensure_unique<'a, I>(what: &str, names: I) -> anyhow::Result<()>
where
    I: Iterator<Item = &'a String>,
{
    let mut seen = HashSet::new();
    for name in names {
        anyhow::ensure!(
            seen.insert(name.to_uppercase()),
            "Duplicate name {name} in {what}"
        );
    }
    Ok(())
}
