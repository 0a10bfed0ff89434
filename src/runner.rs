//! Headless session: a seeded world stepped tick by tick.
//!
//! Each tick every turtle, in a freshly shuffled order, wiggles, steps
//! forward one patch and drops some of the deposit variable on its patch.
//! The deposit variable is then diffused across the grid.

use crate::model::agentset::{seeded_rng, AgentSet};
use crate::model::config::AppConfig;
use crate::model::metrics::MetricsSnapshot;
use crate::model::topology::Point;
use crate::model::world::World;
use anyhow::Context;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

pub struct Session {
    pub config: AppConfig,
    pub world: World,
    pub tick: u64,
    rng: ChaCha8Rng,
}

/// End-of-run figures, printed as text or JSON.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub seed: u64,
    pub topology: String,
    pub patches: usize,
    pub turtles: usize,
    pub links: usize,
    /// Sum of the deposit variable over every patch.
    pub deposit_total: Option<f64>,
    pub metrics: MetricsSnapshot,
    pub fingerprint: String,
}

impl Session {
    /// Builds the world from `config` and scatters the initial turtles.
    ///
    /// Without a configured seed one is drawn from the OS so the run can
    /// still be replayed from the summary.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let seed = config.run.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let mut config = config;
        config.run.seed = Some(seed);

        let mut world = World::from_config(&config.world, config.program.clone())
            .context("Failed to create world")?;
        let mut rng = seeded_rng(seed);
        let topology = *world.topology();
        let breed = config.run.breed.as_deref();
        for _ in 0..config.run.initial_turtles {
            let at = Point::new(
                rng.gen_range(topology.x.lower_edge()..topology.x.upper_edge()),
                rng.gen_range(topology.y.lower_edge()..topology.y.upper_edge()),
            );
            let id = world.create_turtle_at(at, breed)?;
            world.set_heading(id, rng.gen_range(0.0..360.0))?;
        }
        tracing::info!(
            seed,
            turtles = world.turtle_count(),
            patches = world.patch_count(),
            "Session ready"
        );
        Ok(Self {
            config,
            world,
            tick: 0,
            rng,
        })
    }

    pub fn step(&mut self) -> anyhow::Result<()> {
        let run = &self.config.run;
        let order = self.world.shuffled(&AgentSet::AllTurtles, &mut self.rng)?;
        for agent in order {
            let id = self.world.expect_turtle(agent)?;
            if run.wiggle > 0.0 {
                let turn = self.rng.gen_range(-run.wiggle..=run.wiggle);
                self.world.right(id, turn)?;
            }
            self.world.forward(id, 1.0)?;
            if let Some(var) = &run.deposit_variable {
                let patch = self.world.patch_here(id)?;
                let here = self.world.patch_variable_named(patch, var)?;
                let level = here.as_number().unwrap_or(0.0) + run.deposit_amount;
                self.world
                    .set_patch_variable_named(patch, var, level.into())?;
            }
        }
        if let Some(var) = &run.deposit_variable {
            self.world.diffuse_named(var, run.diffusion_rate)?;
        }
        self.tick += 1;
        if self.tick % 100 == 0 {
            tracing::debug!(tick = self.tick, "Tick");
        }
        Ok(())
    }

    pub fn run(&mut self, ticks: u64) -> anyhow::Result<()> {
        for _ in 0..ticks {
            self.step()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let deposit_total = self.config.run.deposit_variable.as_ref().map(|var| {
            self.world
                .patches()
                .iter()
                .filter_map(|p| self.world.patch_variable_named(p.id(), var).ok())
                .filter_map(|v| v.as_number())
                .sum()
        });
        RunSummary {
            ticks: self.tick,
            seed: self.config.run.seed.unwrap_or_default(),
            topology: self.world.topology().name().to_string(),
            patches: self.world.patch_count(),
            turtles: self.world.turtle_count(),
            links: self.world.link_count(),
            deposit_total,
            metrics: self.world.metrics().snapshot(),
            fingerprint: self.config.fingerprint(),
        }
    }
}
