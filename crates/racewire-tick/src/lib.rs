//! Fixed-period tick scheduler for racewire.
//!
//! The sender loop and the dispatch loop both wake on a fixed period
//! (10 ms by default), do all the work that piled up since the last tick,
//! and go back to sleep. The period bounds the worst-case latency of a
//! queued message; this crate makes that bound explicit and reports when
//! a loop falls behind it.
//!
//! # Integration
//!
//! ```ignore
//! let mut ticks = TickScheduler::every(Duration::from_millis(10));
//! loop {
//!     ticks.wait_for_tick().await;
//!     if shutdown.is_triggered() { break; }
//!     for msg in queue.drain() { /* ... */ }
//!     ticks.record_tick_end();
//! }
//! ```

use std::time::{Duration, Instant};

use tokio::time::{self, Instant as TokioInstant};
use tracing::{trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a loop wakes up late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Schedule the next tick one period from *now*. Missed ticks are
    /// skipped, never replayed in a burst.
    #[default]
    Skip,
    /// Keep the original cadence: the next tick fires at
    /// `previous deadline + period` even if that is already in the past.
    Drop,
}

/// Configuration for a [`TickScheduler`].
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks.
    pub period: Duration,
    /// Late-wakeup handling.
    pub policy: TickPolicy,
    /// Fraction of `period` (0.0–1.0) the loop body may use before a
    /// warning is logged. Default: 0.80.
    pub budget_warn_threshold: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: TickConfig::DEFAULT_PERIOD,
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.80,
        }
    }
}

impl TickConfig {
    /// The polling period used by every racewire worker loop.
    pub const DEFAULT_PERIOD: Duration = Duration::from_millis(10);

    /// Shortest period accepted; anything below is raised to this.
    pub const MIN_PERIOD: Duration = Duration::from_millis(1);

    /// Config for a specific period with default settings.
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TickScheduler::new`].
    pub fn validated(mut self) -> Self {
        if self.period < Self::MIN_PERIOD {
            warn!(
                period_us = self.period.as_micros() as u64,
                "tick period below minimum, raising to 1 ms"
            );
            self.period = Self::MIN_PERIOD;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Information about a fired tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// `true` if the tick fired more than 10% of a period late.
    pub overrun: bool,
    /// Whole periods skipped because of the late wakeup.
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-period tick scheduler. One per worker loop.
pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    total_overruns: u64,
    next_tick: TokioInstant,
    tick_start: Option<Instant>,
}

impl TickScheduler {
    /// Create a scheduler from config. The first tick fires one period
    /// from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        trace!(
            period_ms = config.period.as_secs_f64() * 1000.0,
            policy = ?config.policy,
            "tick scheduler created"
        );
        Self {
            next_tick: TokioInstant::now() + config.period,
            config,
            tick_count: 0,
            total_overruns: 0,
            tick_start: None,
        }
    }

    /// Create a scheduler for a period with default settings.
    pub fn every(period: Duration) -> Self {
        Self::new(TickConfig::with_period(period))
    }

    /// Sleep until the next tick is due.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let deadline = self.next_tick;
        let period = self.config.period;

        time::sleep_until(deadline).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(deadline);
        let overrun = late_by > period / 10;
        let mut ticks_skipped = 0;

        self.next_tick = match self.config.policy {
            TickPolicy::Skip => {
                if overrun {
                    ticks_skipped = (late_by.as_nanos() / period.as_nanos()) as u64;
                }
                now + period
            }
            TickPolicy::Drop => deadline + period,
        };

        if overrun {
            self.total_overruns += 1;
            if ticks_skipped > 0 {
                warn!(
                    tick = self.tick_count,
                    skipped = ticks_skipped,
                    late_ms = late_by.as_secs_f64() * 1000.0,
                    "tick overrun"
                );
            }
        }

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    /// Record that the loop body for the current tick has finished.
    ///
    /// Logs a warning when the body used more than the configured share
    /// of the period. Does nothing if no tick is in progress.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        let utilization = elapsed.as_secs_f64() / self.config.period.as_secs_f64();
        if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = self.config.period.as_secs_f64() * 1000.0,
                "tick body approaching its period"
            );
        }
    }

    /// Ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Ticks that fired late.
    pub fn total_overruns(&self) -> u64 {
        self.total_overruns
    }

    /// The configured period.
    pub fn period(&self) -> Duration {
        self.config.period
    }
}
