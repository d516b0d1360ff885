//! Jittered delays before remote calls
//!
//! This module handles:
//! - Delay profiles (uniform range, fixed set of jitter values)
//! - A shared limiter that serializes waits across concurrent callers
//! - Counting waits and total time waited for the run statistics

use crate::config::RateLimitConfig;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// How long to wait before a remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelayProfile {
    /// Any duration in `min..=max`, uniformly
    Uniform { min: Duration, max: Duration },

    /// One of a fixed set of durations, uniformly
    Choice(Vec<Duration>),
}

impl DelayProfile {
    /// Coarse profile for search listings and detail pages
    pub fn search(config: &RateLimitConfig) -> Self {
        Self::Uniform {
            min: Duration::from_millis(config.search_min_delay),
            max: Duration::from_millis(config.search_max_delay),
        }
    }

    /// Fine jitter for autocomplete calls
    pub fn autocomplete(config: &RateLimitConfig) -> Self {
        Self::Choice(
            config
                .autocomplete_delays
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
        )
    }

    /// No delay at all
    pub fn none() -> Self {
        Self::Choice(Vec::new())
    }

    /// Draws the next delay
    pub fn sample(&self) -> Duration {
        match self {
            Self::Uniform { min, max } => {
                let (lo, hi) = (min.as_millis() as u64, max.as_millis() as u64);
                if hi <= lo {
                    return *min;
                }
                Duration::from_millis(rand::rng().random_range(lo..=hi))
            }
            Self::Choice(values) => values
                .choose(&mut rand::rng())
                .copied()
                .unwrap_or(Duration::ZERO),
        }
    }

    /// Smallest delay this profile can produce
    pub fn minimum(&self) -> Duration {
        match self {
            Self::Uniform { min, .. } => *min,
            Self::Choice(values) => values.iter().min().copied().unwrap_or(Duration::ZERO),
        }
    }
}

/// Rate limiter shared by everything calling one remote service
///
/// Waits are serialized: with several detail workers, each call still sits
/// behind its own full delay, so the call rate never exceeds what a single
/// sequential caller would produce.
pub struct RateLimiter {
    profile: DelayProfile,
    gate: Mutex<()>,
    waits: AtomicU64,
    waited_ms: AtomicU64,
}

impl RateLimiter {
    pub fn new(profile: DelayProfile) -> Self {
        Self {
            profile,
            gate: Mutex::new(()),
            waits: AtomicU64::new(0),
            waited_ms: AtomicU64::new(0),
        }
    }

    /// A limiter that never sleeps
    pub fn unlimited() -> Self {
        Self::new(DelayProfile::none())
    }

    pub fn profile(&self) -> &DelayProfile {
        &self.profile
    }

    /// Sleeps for one delay drawn from the profile
    pub async fn wait(&self) {
        let _turn = self.gate.lock().await;

        let delay = self.profile.sample();
        if !delay.is_zero() {
            tracing::trace!("Rate limit: waiting {:?}", delay);
            tokio::time::sleep(delay).await;
        }

        self.waits.fetch_add(1, Ordering::Relaxed);
        self.waited_ms
            .fetch_add(delay.as_millis() as u64, Ordering::Relaxed);
    }

    /// Number of completed waits
    pub fn waits(&self) -> u64 {
        self.waits.load(Ordering::Relaxed)
    }

    /// Total time spent waiting
    pub fn total_waited(&self) -> Duration {
        Duration::from_millis(self.waited_ms.load(Ordering::Relaxed))
    }
}
