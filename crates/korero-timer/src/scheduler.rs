//! Fixed-interval tick scheduler.
//!
//! One scheduler drives the server-wide timer loop. Each tick the loop
//! asks every room to re-evaluate its phase timer, so the interval only
//! bounds how late a timeout can be observed, never how long a phase
//! lasts.
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = shutdown.changed() => break,
//!         info = scheduler.wait_for_tick() => {
//!             sweep_rooms(info.tick).await;
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks. Default: 1s.
    pub interval: Duration,
    /// Random delay (0..max) added to the first tick so several servers
    /// started together do not poll in lockstep.
    pub initial_jitter: Duration,
    /// Fraction of the interval a tick's work may take before a warning
    /// is logged. Default: 0.5.
    pub budget_warn_threshold: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            initial_jitter: Duration::from_millis(250),
            budget_warn_threshold: 0.5,
        }
    }
}

impl TickConfig {
    /// Shortest interval accepted; anything faster is clamped.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values. Called by [`TickScheduler::new`].
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                "tick interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }
}

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Starts at 1.
    pub tick: u64,
    /// `true` if the tick fired noticeably late.
    pub overrun: bool,
    /// Whole intervals missed because of the overrun.
    pub ticks_skipped: u64,
}

pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    next_tick: TokioInstant,
    tick_start: Option<Instant>,
    total_skipped: u64,
}

impl TickScheduler {
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();

        let jitter_us = config.initial_jitter.as_micros() as u64;
        let jitter = if jitter_us > 0 {
            Duration::from_micros(rand::rng().random_range(0..jitter_us))
        } else {
            Duration::ZERO
        };
        let next_tick = TokioInstant::now() + config.interval + jitter;

        debug!(
            interval_ms = config.interval.as_millis() as u64,
            jitter_us = jitter.as_micros() as u64,
            "tick scheduler created"
        );

        Self {
            config,
            tick_count: 0,
            next_tick,
            tick_start: None,
            total_skipped: 0,
        }
    }

    /// Waits until the next tick is due.
    ///
    /// A late wake-up skips the missed ticks and schedules the next one a
    /// full interval from now, so a stalled runtime never produces a burst
    /// of back-to-back sweeps.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let next = self.next_tick;
        let interval = self.config.interval;

        time::sleep_until(next).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > interval / 10;
        let ticks_skipped = if overrun {
            (late_by.as_nanos() / interval.as_nanos()) as u64
        } else {
            0
        };
        if ticks_skipped > 0 {
            warn!(
                tick = self.tick_count,
                skipped = ticks_skipped,
                late_ms = late_by.as_millis() as u64,
                "tick overrun, skipping ahead"
            );
        }
        self.total_skipped += ticks_skipped;
        self.next_tick = now + interval;

        trace!(tick = self.tick_count, overrun, "tick fired");
        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    /// Marks the end of the current tick's work and warns when it took a
    /// large share of the interval. A no-op without a preceding tick.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        let utilization = elapsed.as_secs_f64() / self.config.interval.as_secs_f64();
        if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_millis() as u64,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "timer sweep is slow"
            );
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Ticks dropped across every overrun so far.
    pub fn total_skipped(&self) -> u64 {
        self.total_skipped
    }
}
