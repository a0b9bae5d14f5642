//! The poll → normalize → persist → sleep loop.
//!
//! The loop observes a stop request only while it is fetching or sleeping.
//! A batch that has been handed to the writer always commits before the loop
//! acknowledges the stop (by returning), which is what lets the shutdown path
//! close the store without racing an insert.

pub mod jitter;

use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::collectors::Collector;
use crate::error::CollectError;
use crate::stats::SamplerStats;
use crate::store::SharedStore;

pub use jitter::next_interval;

/// Loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Base poll interval in seconds, before jitter.
    pub interval_secs: u64,
    /// Stop after this many cycles; `None` runs until signalled.
    pub max_cycles: Option<u64>,
}

/// Longest accepted base interval: one day.
pub const MAX_INTERVAL_SECS: u64 = 86_400;

impl SamplerConfig {
    /// Reject intervals outside `1..=MAX_INTERVAL_SECS` and a zero cycle cap.
    pub fn validate(&self) -> Result<(), CollectError> {
        if !(1..=MAX_INTERVAL_SECS).contains(&self.interval_secs) {
            return Err(CollectError::Config(format!(
                "poll interval must be between 1 and {} seconds, got {}",
                MAX_INTERVAL_SECS, self.interval_secs
            )));
        }
        if self.max_cycles == Some(0) {
            return Err(CollectError::Config(
                "max_cycles must be greater than 0 (omit it to run unbounded)".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            max_cycles: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Running,
    Stopping,
}

/// How a loop that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The configured cycle count was reached.
    Completed { cycles: u64 },
    /// A stop was requested.
    Stopped { cycles: u64 },
}

impl LoopOutcome {
    pub fn cycles(&self) -> u64 {
        match self {
            LoopOutcome::Completed { cycles } | LoopOutcome::Stopped { cycles } => *cycles,
        }
    }
}

pub struct Sampler<C> {
    collector: C,
    store: SharedStore,
    config: SamplerConfig,
    stats: Arc<SamplerStats>,
    state: SamplerState,
}

impl<C: Collector> Sampler<C> {
    pub fn new(collector: C, store: SharedStore, config: SamplerConfig) -> Self {
        Self {
            collector,
            store,
            config,
            stats: Arc::new(SamplerStats::default()),
            state: SamplerState::Running,
        }
    }

    pub fn stats(&self) -> Arc<SamplerStats> {
        Arc::clone(&self.stats)
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Run until the cycle cap, a stop request, or the first error.
    pub async fn run(
        &mut self,
        mut stop: watch::Receiver<bool>,
    ) -> Result<LoopOutcome, CollectError> {
        let result = self.cycle_loop(&mut stop).await;
        self.state = SamplerState::Stopping;
        result
    }

    async fn cycle_loop(
        &mut self,
        stop: &mut watch::Receiver<bool>,
    ) -> Result<LoopOutcome, CollectError> {
        let family = self.collector.family();
        let mut rng = StdRng::from_entropy();
        let mut cycles = 0_u64;

        info!(
            family = family.name(),
            interval_s = self.config.interval_secs,
            max_cycles = ?self.config.max_cycles,
            "Sampler started"
        );

        loop {
            if self.cap_reached(cycles) {
                return Ok(LoopOutcome::Completed { cycles });
            }

            let fetch_start = Instant::now();
            let batch = tokio::select! {
                biased;
                _ = stop_requested(stop) => {
                    debug!(cycle = cycles + 1, "Stop requested during fetch");
                    return Ok(LoopOutcome::Stopped { cycles });
                }
                batch = self.collector.collect() => batch?,
            };
            let fetch_elapsed = fetch_start.elapsed();

            // The write is not cancellable: once handed over it commits.
            let write_start = Instant::now();
            let store = self.store.clone();
            let rows = tokio::task::spawn_blocking(move || store.write_batch(&batch))
                .await
                .map_err(|e| CollectError::Io(format!("writer task failed: {}", e)))?
                .map_err(CollectError::Write)?;
            let write_elapsed = write_start.elapsed();

            cycles += 1;
            self.stats.record_cycle(rows, fetch_elapsed, write_elapsed);
            debug!(
                family = family.name(),
                cycle = cycles,
                rows,
                fetch_ms = fetch_elapsed.as_millis() as u64,
                write_ms = write_elapsed.as_millis() as u64,
                "Cycle committed"
            );

            if self.cap_reached(cycles) {
                return Ok(LoopOutcome::Completed { cycles });
            }

            let pause = next_interval(self.config.interval_secs, &mut rng);
            self.stats.record_sleep(pause);
            tokio::select! {
                biased;
                _ = stop_requested(stop) => {
                    debug!(cycle = cycles, "Stop requested during sleep");
                    return Ok(LoopOutcome::Stopped { cycles });
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    fn cap_reached(&self, cycles: u64) -> bool {
        self.config.max_cycles.is_some_and(|max| cycles >= max)
    }
}

/// Resolves once `true` has been sent. A dropped sender never resolves.
async fn stop_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

