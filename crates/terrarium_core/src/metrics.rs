//! Counters and logging setup for the world model.
//!
//! The world bumps these counters as agents are born and die and as the
//! heavier queries run; the runner prints them at the end of a session.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Running totals for a single world.
#[derive(Debug, Default)]
pub struct WorldMetrics {
    turtles_created: AtomicU64,
    turtles_died: AtomicU64,
    links_created: AtomicU64,
    links_died: AtomicU64,
    diffusions: AtomicU64,
    spatial_queries: AtomicU64,
}

/// Plain copy of [`WorldMetrics`] for printing or serializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub turtles_created: u64,
    pub turtles_died: u64,
    pub links_created: u64,
    pub links_died: u64,
    pub diffusions: u64,
    pub spatial_queries: u64,
}

impl WorldMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_turtle_created(&self) {
        self.turtles_created.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_turtle_died(&self) {
        self.turtles_died.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_link_created(&self) {
        self.links_created.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_link_died(&self) {
        self.links_died.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_diffusion(&self) {
        self.diffusions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_spatial_query(&self) {
        self.spatial_queries.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            turtles_created: self.turtles_created.load(Ordering::Relaxed),
            turtles_died: self.turtles_died.load(Ordering::Relaxed),
            links_created: self.links_created.load(Ordering::Relaxed),
            links_died: self.links_died.load(Ordering::Relaxed),
            diffusions: self.diffusions.load(Ordering::Relaxed),
            spatial_queries: self.spatial_queries.load(Ordering::Relaxed),
        }
    }

    /// Logs the current totals at info level.
    pub fn log_summary(&self) {
        let s = self.snapshot();
        tracing::info!(
            turtles_created = s.turtles_created,
            turtles_died = s.turtles_died,
            links_created = s.links_created,
            links_died = s.links_died,
            diffusions = s.diffusions,
            spatial_queries = s.spatial_queries,
            "World metrics"
        );
    }
}

static LOGGING: Once = Once::new();

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins over `level` when set. Calling this more than once is
/// harmless.
pub fn init_logging(level: &str) {
    LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        tracing::subscriber::set_global_default(
            tracing_subscriber::FmtSubscriber::builder()
                .with_env_filter(filter)
                .finish(),
        )
        .ok();
    });
}
