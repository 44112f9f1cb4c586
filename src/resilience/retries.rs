//! Retry logic.
//!
//! # Responsibilities
//! - Run one fallible operation up to `max_attempts` times
//! - Sleep with exponential backoff between retryable failures
//! - Stop early on terminal errors and when the deadline cannot cover the next wait
//!
//! # Design Decisions
//! - The retryable/terminal split is a caller-supplied predicate
//! - Terminal errors never consume retry budget
//! - Every attempt is told how long it may run (tier timeout clamped to the deadline)

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::resilience::backoff::calculate_backoff;
use crate::resilience::timeouts::Deadline;

/// One execution of the wrapped operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number: u32,
    /// Time this attempt may take.
    pub timeout: Duration,
}

/// Why a retry loop gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// A non-retryable error ended the loop.
    Terminal { attempt: u32, error: E },
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last: E },
    /// The deadline left no room for another attempt or backoff.
    DeadlineExceeded { attempts: u32, last: Option<E> },
}

impl<E> RetryError<E> {
    /// Attempts actually executed.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Terminal { attempt, .. } => *attempt,
            Self::Exhausted { attempts, .. } | Self::DeadlineExceeded { attempts, .. } => *attempts,
        }
    }

    /// The last error observed, if any attempt ran.
    pub fn into_last(self) -> Option<E> {
        match self {
            Self::Terminal { error, .. } => Some(error),
            Self::Exhausted { last, .. } => Some(last),
            Self::DeadlineExceeded { last, .. } => last,
        }
    }
}

/// Exponential-backoff retrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: bool,
}

impl RetryPolicy {
    /// `max_attempts` total tries (at least one) with `base_delay * 2^(n-1)` waits.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_secs(30),
            jitter: false,
        }
    }

    /// A single attempt, no retries.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait that follows failed attempt `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay, self.max_delay, self.jitter)
    }

    /// Run `op` until it succeeds, fails terminally, runs out of attempts, or hits `deadline`.
    ///
    /// Returns the value together with the number of attempts it took.
    pub async fn run<T, E, F, Fut, P>(
        &self,
        deadline: Deadline,
        attempt_timeout: Duration,
        mut op: F,
        is_retryable: P,
    ) -> Result<(T, u32), RetryError<E>>
    where
        E: Display,
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut number = 0;
        let mut last = None;

        loop {
            let timeout = deadline.clamp(attempt_timeout);
            if timeout.is_zero() {
                return Err(RetryError::DeadlineExceeded {
                    attempts: number,
                    last,
                });
            }

            number += 1;
            let error = match op(Attempt { number, timeout }).await {
                Ok(value) => return Ok((value, number)),
                Err(error) => error,
            };

            if !is_retryable(&error) {
                return Err(RetryError::Terminal {
                    attempt: number,
                    error,
                });
            }

            if number >= self.max_attempts {
                return Err(RetryError::Exhausted {
                    attempts: number,
                    last: error,
                });
            }

            let delay = self.delay_for(number);
            if delay >= deadline.remaining() {
                tracing::warn!(
                    attempt = number,
                    delay = ?delay,
                    error = %error,
                    "Deadline leaves no room for another attempt"
                );
                return Err(RetryError::DeadlineExceeded {
                    attempts: number,
                    last: Some(error),
                });
            }

            tracing::info!(attempt = number, delay = ?delay, error = %error, "Retrying after failure");
            last = Some(error);
            tokio::time::sleep(delay).await;
        }
    }
}
