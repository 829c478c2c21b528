// ABOUTME: Scheduler loop that runs every pair on a fixed second of every minute
// ABOUTME: The trigger predicate is pure; the loop only checks for shutdown between ticks

use crate::config::{Pair, ScheduleSettings};
use crate::driver::Driver;
use crate::error::ConfigError;
use crate::probe::{Prober, DEFAULT_PROBE_TIMEOUT};
use crate::report::Reporter;
use crate::sync::{PairOutcome, PairSynchronizer};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// Second of the minute at which pairs are synchronized by default.
pub const DEFAULT_TRIGGER_SECOND: u32 = 2;

/// Fires once per minute, at a fixed second, every hour of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerSchedule {
    second: u32,
}

impl TriggerSchedule {
    pub fn every_minute_at(second: u32) -> Result<Self, ConfigError> {
        if second > 59 {
            return Err(ConfigError::Schedule(format!(
                "trigger second must be 0-59, got {}",
                second
            )));
        }
        Ok(Self { second })
    }

    pub fn second(&self) -> u32 {
        self.second
    }

    /// True when `time` falls on the trigger second of any minute.
    pub fn fires_at<T: Timelike>(&self, time: &T) -> bool {
        time.second() == self.second
    }
}

impl Default for TriggerSchedule {
    fn default() -> Self {
        Self {
            second: DEFAULT_TRIGGER_SECOND,
        }
    }
}

/// Source of wall-clock time for the scheduler.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local time of day, as the schedule is expressed in local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Configuration for the scheduler loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub trigger: TriggerSchedule,
    /// Pause after a tick so the same minute does not fire twice
    pub cooldown: Duration,
    /// Pause between clock checks while waiting for the trigger second
    pub poll_interval: Duration,
    pub probe_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            trigger: TriggerSchedule::default(),
            cooldown: Duration::from_secs(30),
            poll_interval: Duration::from_millis(200),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl SchedulerConfig {
    /// Overlay values from the config file's `schedule` section.
    pub fn apply_settings(&mut self, settings: &ScheduleSettings) -> Result<(), ConfigError> {
        if let Some(second) = settings.trigger_second {
            self.trigger = TriggerSchedule::every_minute_at(second)?;
        }
        if let Some(secs) = settings.cooldown_secs {
            self.set_cooldown_secs(secs)?;
        }
        if let Some(secs) = settings.probe_timeout_secs {
            self.probe_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = settings.poll_interval_ms {
            if ms == 0 {
                return Err(ConfigError::Schedule(
                    "poll_interval_ms must be greater than zero".to_string(),
                ));
            }
            self.poll_interval = Duration::from_millis(ms);
        }
        Ok(())
    }

    /// Set the post-tick pause; it must end before the next trigger minute.
    pub fn set_cooldown_secs(&mut self, secs: u64) -> Result<(), ConfigError> {
        if !(1..=59).contains(&secs) {
            return Err(ConfigError::Schedule(format!(
                "cooldown_secs must be 1-59, got {}",
                secs
            )));
        }
        self.cooldown = Duration::from_secs(secs);
        Ok(())
    }
}

/// Statistics from one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickStats {
    pub pairs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

impl TickStats {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Drives [`PairSynchronizer`] for every configured pair.
pub struct Scheduler<C: Clock = LocalClock> {
    config: SchedulerConfig,
    pairs: Vec<Pair>,
    synchronizer: PairSynchronizer,
    clock: C,
}

impl Scheduler<LocalClock> {
    pub fn new(
        config: SchedulerConfig,
        pairs: Vec<Pair>,
        driver: Arc<dyn Driver>,
        prober: Arc<dyn Prober>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let synchronizer =
            PairSynchronizer::new(driver, prober, reporter).with_probe_timeout(config.probe_timeout);
        Self {
            config,
            pairs,
            synchronizer,
            clock: LocalClock,
        }
    }
}

impl<C: Clock> Scheduler<C> {
    /// Replace the clock, e.g. with a scripted one in tests.
    pub fn with_clock<D: Clock>(self, clock: D) -> Scheduler<D> {
        Scheduler {
            config: self.config,
            pairs: self.pairs,
            synchronizer: self.synchronizer,
            clock,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Synchronize every pair once, in configuration order.
    pub async fn run_once(&self) -> TickStats {
        let start = Instant::now();
        let mut stats = TickStats {
            pairs: self.pairs.len(),
            ..TickStats::default()
        };

        for pair in &self.pairs {
            match self.synchronizer.sync(pair).await {
                PairOutcome::Inactive => stats.skipped += 1,
                outcome if outcome.is_success() => stats.succeeded += 1,
                _ => stats.failed += 1,
            }
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;
        stats
    }

    /// Run until `shutdown` fires, returning the number of ticks run.
    ///
    /// The signal is only observed while sleeping, so a tick that has started
    /// always finishes and every connection it opened is closed.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> u64 {
        let mut ticks = 0u64;
        // Minute of the last tick; a minute never fires twice
        let mut last_fired: Option<(NaiveDate, u32, u32)> = None;

        tracing::info!(
            "Starting scheduler with {} pair(s): trigger at second {} of every minute, cooldown={:?}",
            self.pairs.len(),
            self.config.trigger.second(),
            self.config.cooldown
        );

        loop {
            let now = self.clock.now();
            let minute = (now.date(), now.hour(), now.minute());
            let pause = if self.config.trigger.fires_at(&now) && last_fired != Some(minute) {
                last_fired = Some(minute);
                ticks += 1;
                tracing::info!("Timestamp: {}", now.format("%m/%d/%Y %H:%M:%S"));

                let stats = self.run_once().await;
                tracing::info!(
                    "Tick {} completed: {} pair(s), {} ok, {} failed, {} skipped in {}ms",
                    ticks,
                    stats.pairs,
                    stats.succeeded,
                    stats.failed,
                    stats.skipped,
                    stats.duration_ms
                );
                self.config.cooldown
            } else {
                self.config.poll_interval
            };

            tokio::select! {
                biased; // Check shutdown first

                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, stopping scheduler");
                    break;
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }

        ticks
    }
}
