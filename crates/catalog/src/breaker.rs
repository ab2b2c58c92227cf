//! Circuit breaker guarding the catalog.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

/// The state of a circuit breaker.
///
/// State transitions:
/// ```text
/// Closed ──(failure rate >= threshold)──► Open
///   ▲                                      │ cooldown elapsed
///   │                                      ▼
///   └────────(trial succeeds)────────── HalfOpen ──(trial fails)──► Open
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BreakerState {
    /// Calls pass through and outcomes are recorded.
    #[default]
    Closed,

    /// Calls are rejected without touching the network.
    Open,

    /// A limited number of trial calls are let through.
    HalfOpen,
}

impl BreakerState {
    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "Closed",
            BreakerState::Open => "Open",
            BreakerState::HalfOpen => "HalfOpen",
        }
    }
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tuning of a [`CircuitBreaker`].
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerConfig {
    /// Number of most recent calls the failure rate is computed over.
    pub window_size: usize,
    /// Failure percentage (0-100) at or above which the breaker opens.
    pub failure_rate_threshold: f64,
    /// How long the breaker stays open before admitting trial calls.
    pub open_cooldown: Duration,
    /// Trial calls admitted while half-open.
    pub half_open_max_calls: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            failure_rate_threshold: 50.0,
            open_cooldown: Duration::from_secs(10),
            half_open_max_calls: 1,
        }
    }
}

/// Returned when the breaker refuses a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Circuit breaker is {state}")]
pub struct BreakerOpen {
    pub state: BreakerState,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    /// `true` marks a failed call; oldest first.
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    half_open_in_flight: u32,
    /// Bumped on every transition; permits from an older generation are ignored.
    generation: u64,
}

/// Count-based circuit breaker with an inspectable state.
///
/// Process-local: every instance keeps its own window.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    pub fn new(config: BreakerConfig) -> Self {
        let config = BreakerConfig {
            window_size: config.window_size.max(1),
            half_open_max_calls: config.half_open_max_calls.max(1),
            ..config
        };
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                window: VecDeque::with_capacity(config.window_size),
                opened_at: None,
                half_open_in_flight: 0,
                generation: 0,
            }),
            config,
        }
    }

    /// Returns the current state, moving Open to HalfOpen once the cooldown is over.
    pub fn state(&self) -> BreakerState {
        let mut inner = self.lock();
        self.refresh(&mut inner);
        inner.state
    }

    /// Failure percentage over the window, once the window is full.
    pub fn failure_rate(&self) -> Option<f64> {
        let inner = self.lock();
        self.rate_of(&inner)
    }

    /// Asks for permission to make one call.
    pub fn try_acquire(&self) -> Result<Permit<'_>, BreakerOpen> {
        let mut inner = self.lock();
        self.refresh(&mut inner);

        match inner.state {
            BreakerState::Closed => Ok(Permit::new(self, inner.generation)),
            BreakerState::Open => Err(BreakerOpen {
                state: BreakerState::Open,
            }),
            BreakerState::HalfOpen => {
                if inner.half_open_in_flight < self.config.half_open_max_calls {
                    inner.half_open_in_flight += 1;
                    Ok(Permit::new(self, inner.generation))
                } else {
                    Err(BreakerOpen {
                        state: BreakerState::HalfOpen,
                    })
                }
            }
        }
    }

    fn record(&self, generation: u64, failed: bool) {
        let mut inner = self.lock();
        if generation != inner.generation {
            tracing::debug!(failed, "ignoring outcome of a call admitted in an earlier state");
            return;
        }

        match inner.state {
            BreakerState::Closed => {
                if inner.window.len() == self.config.window_size {
                    inner.window.pop_front();
                }
                inner.window.push_back(failed);

                if let Some(rate) = self.rate_of(&inner)
                    && rate >= self.config.failure_rate_threshold
                {
                    tracing::warn!(failure_rate = rate, "circuit breaker opening");
                    self.transition(&mut inner, BreakerState::Open);
                }
            }
            BreakerState::HalfOpen => {
                inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
                if failed {
                    tracing::warn!("circuit breaker trial call failed, reopening");
                    self.transition(&mut inner, BreakerState::Open);
                } else {
                    tracing::info!("circuit breaker trial call succeeded, closing");
                    self.transition(&mut inner, BreakerState::Closed);
                }
            }
            // Open hands out no permits.
            BreakerState::Open => {}
        }
    }

    fn release(&self, generation: u64) {
        let mut inner = self.lock();
        if generation == inner.generation && inner.state == BreakerState::HalfOpen {
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }
    }

    fn refresh(&self, inner: &mut Inner) {
        if inner.state == BreakerState::Open
            && let Some(opened_at) = inner.opened_at
            && opened_at.elapsed() >= self.config.open_cooldown
        {
            self.transition(inner, BreakerState::HalfOpen);
        }
    }

    fn transition(&self, inner: &mut Inner, to: BreakerState) {
        inner.state = to;
        inner.half_open_in_flight = 0;
        inner.generation += 1;
        match to {
            BreakerState::Open => inner.opened_at = Some(Instant::now()),
            BreakerState::Closed => {
                inner.window.clear();
                inner.opened_at = None;
            }
            BreakerState::HalfOpen => {}
        }
        metrics::counter!("circuit_breaker_transitions_total", "to" => to.as_str()).increment(1);
    }

    fn rate_of(&self, inner: &Inner) -> Option<f64> {
        if inner.window.len() < self.config.window_size {
            return None;
        }
        let failures = inner.window.iter().filter(|failed| **failed).count();
        Some(failures as f64 * 100.0 / inner.window.len() as f64)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

/// Permission to make one call; report its outcome with
/// [`success`](Permit::success) or [`failure`](Permit::failure).
///
/// Dropping an unsettled permit frees its half-open slot without recording anything.
#[must_use = "report the call outcome on the permit"]
#[derive(Debug)]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl<'a> Permit<'a> {
    fn new(breaker: &'a CircuitBreaker, generation: u64) -> Self {
        Self {
            breaker,
            generation,
            settled: false,
        }
    }

    /// Records a successful call.
    pub fn success(mut self) {
        self.settled = true;
        self.breaker.record(self.generation, false);
    }

    /// Records a failed call.
    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.record(self.generation, true);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.release(self.generation);
        }
    }
}
