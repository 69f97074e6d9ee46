//! Retry and pacing schedule for synthesis backend calls

use std::time::Duration;

/// Retry policy for per-chunk synthesis requests
///
/// The synthesis backend throttles rapid sequential requests, so every
/// request is paced and every retry waits noticeably longer than the pacing
/// delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Total attempts per chunk, including the first
    pub max_attempts: u32,
    /// Delay after a successful request when more chunks remain
    pub pacing_delay: Duration,
    /// Delay before each retry attempt
    pub retry_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            pacing_delay: Duration::from_millis(200),
            retry_delay: Duration::from_millis(1000),
        }
    }
}

impl BackoffPolicy {
    /// Policy with no delays, for tests and local backends
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            pacing_delay: Duration::ZERO,
            retry_delay: Duration::ZERO,
        }
    }

    /// Start the attempt budget for one chunk
    #[must_use]
    pub fn start(&self) -> Backoff {
        Backoff {
            attempts_remaining: self.max_attempts.max(1),
            attempts_made: 0,
            retry_delay: self.retry_delay,
        }
    }
}

/// Per-chunk attempt budget derived from a [`BackoffPolicy`]
#[derive(Debug, Clone)]
pub struct Backoff {
    attempts_remaining: u32,
    attempts_made: u32,
    retry_delay: Duration,
}

impl Backoff {
    /// Claim the next attempt.
    ///
    /// Returns `None` when the budget is exhausted, otherwise the delay to
    /// wait before issuing the attempt (zero for the first one).
    pub fn next_attempt(&mut self) -> Option<Duration> {
        if self.attempts_remaining == 0 {
            return None;
        }

        self.attempts_remaining -= 1;
        self.attempts_made += 1;

        if self.attempts_made == 1 {
            Some(Duration::ZERO)
        } else {
            Some(self.retry_delay)
        }
    }

    /// Attempts not yet claimed
    #[must_use]
    pub const fn attempts_remaining(&self) -> u32 {
        self.attempts_remaining
    }

    /// Attempts claimed so far
    #[must_use]
    pub const fn attempts_made(&self) -> u32 {
        self.attempts_made
    }
}
