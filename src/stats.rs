//! Running statistics of a collector process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::info;

/// Running statistics for a single metric.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            *self = RunningStat {
                count: 1,
                sum: value,
                min: value,
                max: value,
            };
            return;
        }
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Debug, Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    pub fn add_duration(&self, d: Duration) {
        self.add_sample(d.as_secs_f64() * 1000.0);
    }

    pub fn snapshot(&self) -> RunningStat {
        self.inner.lock().map(|s| *s).unwrap_or_default()
    }
}

/// Counters and timings of one sampler loop.
#[derive(Debug)]
pub struct SamplerStats {
    pub cycles: AtomicU64,
    pub rows_written: AtomicU64,
    pub fetch_duration_ms: Stat,
    pub write_duration_ms: Stat,
    pub sleep_seconds: Stat,
    pub start_time: Instant,
}

impl Default for SamplerStats {
    fn default() -> Self {
        Self {
            cycles: AtomicU64::new(0),
            rows_written: AtomicU64::new(0),
            fetch_duration_ms: Stat::default(),
            write_duration_ms: Stat::default(),
            sleep_seconds: Stat::default(),
            start_time: Instant::now(),
        }
    }
}

impl SamplerStats {
    pub fn record_cycle(&self, rows: usize, fetch: Duration, write: Duration) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.rows_written.fetch_add(rows as u64, Ordering::Relaxed);
        self.fetch_duration_ms.add_duration(fetch);
        self.write_duration_ms.add_duration(write);
    }

    pub fn record_sleep(&self, pause: Duration) {
        self.sleep_seconds.add_sample(pause.as_secs_f64());
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written.load(Ordering::Relaxed)
    }

    /// Emit one summary log line.
    pub fn log_summary(&self) {
        let fetch = self.fetch_duration_ms.snapshot();
        let write = self.write_duration_ms.snapshot();
        let sleep = self.sleep_seconds.snapshot();
        info!(
            cycles = self.cycles(),
            rows = self.rows_written(),
            uptime_s = self.start_time.elapsed().as_secs(),
            fetch_avg_ms = format!("{:.1}", fetch.avg()),
            fetch_max_ms = format!("{:.1}", fetch.max()),
            write_avg_ms = format!("{:.1}", write.avg()),
            write_max_ms = format!("{:.1}", write.max()),
            sleeps = sleep.count(),
            sleep_avg_s = format!("{:.1}", sleep.avg()),
            sleep_min_s = format!("{:.0}", sleep.min()),
            sleep_max_s = format!("{:.0}", sleep.max()),
            "Sampler statistics"
        );
    }
}
