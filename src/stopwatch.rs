//! Elapsed-time measurement with pause and resume, e.g. for timing bulk
//! copies between streams.

use std::time::{Duration, Instant};

/// Source of monotonic time points.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The OS monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Measures time since the last reset, minus the time spent paused.
#[derive(Debug)]
pub struct StopWatch<C: Clock = MonotonicClock> {
    clock: C,
    started: Instant,
    paused_total: Duration,
    paused_at: Option<Instant>,
}

impl StopWatch<MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock)
    }
}

impl Default for StopWatch<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> StopWatch<C> {
    /// Start measuring on `clock`.
    pub fn with_clock(clock: C) -> Self {
        let started = clock.now();
        Self {
            clock,
            started,
            paused_total: Duration::ZERO,
            paused_at: None,
        }
    }

    /// Restart from zero. A pending pause is dropped.
    pub fn reset(&mut self) {
        self.started = self.clock.now();
        self.paused_total = Duration::ZERO;
        self.paused_at = None;
    }

    /// Stop the count until [`resume`](Self::resume). Pausing twice keeps
    /// the first pause.
    pub fn pause(&mut self) {
        if self.paused_at.is_none() {
            self.paused_at = Some(self.clock.now());
        }
    }

    /// Continue after [`pause`](Self::pause); does nothing when running.
    pub fn resume(&mut self) {
        if let Some(paused_at) = self.paused_at.take() {
            let now = self.clock.now();
            self.paused_total += now.saturating_duration_since(paused_at);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Running time since the last reset. While paused this stays at the
    /// value it had when the pause began.
    pub fn elapsed(&self) -> Duration {
        let end = self.paused_at.unwrap_or_else(|| self.clock.now());
        end.saturating_duration_since(self.started)
            .saturating_sub(self.paused_total)
    }

    /// [`elapsed`](Self::elapsed) in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}
