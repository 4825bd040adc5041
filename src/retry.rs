use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);

/// Blocking wait between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Constant,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub kind: BackoffKind,
    pub delay: Duration,
}

impl Backoff {
    pub fn constant(delay: Duration) -> Self {
        Self {
            kind: BackoffKind::Constant,
            delay,
        }
    }

    /// Delay before retry number `retry` (1 for the wait after the first failure).
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.kind {
            BackoffKind::Constant => self.delay,
            BackoffKind::Linear => self.delay.saturating_mul(retry.max(1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, Backoff::constant(DEFAULT_DELAY))
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first call; values below 1 are raised to 1.
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Runs `op` until it succeeds, returns a non-retryable error, or the
    /// attempt budget is spent. `on_retry` sees each failed attempt that is
    /// about to be retried, with the delay that follows it.
    pub fn run<T, E, F, P, R>(
        &self,
        sleeper: &dyn Sleeper,
        mut op: F,
        is_retryable: P,
        mut on_retry: R,
    ) -> Result<T, E>
    where
        F: FnMut(u32) -> Result<T, E>,
        P: Fn(&E) -> bool,
        R: FnMut(u32, &E, Duration),
    {
        let mut attempt = 1u32;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= self.max_attempts || !is_retryable(&err) {
                        return Err(err);
                    }
                    let delay = self.backoff.delay_for(attempt);
                    on_retry(attempt, &err, delay);
                    sleeper.sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}
