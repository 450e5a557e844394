// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Rate-limit driven retry policy for GitHub API calls.
//!
//! Primary rate limits are waited out until the reset instant reported by the
//! server; secondary limits sleep for `Retry-After` plus a jittered number of
//! minutes. Both retry the identical request and, by default, never give up.
//! Any other error is returned to the caller on the first occurrence.
use std::{
    future::Future,
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::Error;

/// Source of wall-clock time and suspension used by the retry loop.
#[async_trait]
pub trait Clock: Send + Sync
{
    /// Current wall-clock instant.
    fn now(&self,) -> SystemTime;

    /// Suspends the caller for `duration`.
    async fn sleep(&self, duration: Duration,);
}

/// [`Clock`] backed by the system time and the tokio timer.
#[derive(Debug, Clone, Copy, Default,)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock
{
    fn now(&self,) -> SystemTime
    {
        SystemTime::now()
    }

    async fn sleep(&self, duration: Duration,)
    {
        sleep(duration,).await;
    }
}

/// How long to wait before repeating a rate-limited request.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub enum WaitStrategy
{
    /// Sleep until the quota resets.
    UntilReset(SystemTime,),
    /// Sleep for a fixed duration (`Retry-After` plus jitter).
    Fixed(Duration,),
}

impl WaitStrategy
{
    /// Delay to apply given the current instant.
    ///
    /// A reset instant already in the past yields a zero delay.
    pub fn delay(&self, now: SystemTime,) -> Duration
    {
        match self {
            Self::UntilReset(reset,) => reset.duration_since(now,).unwrap_or(Duration::ZERO,),
            Self::Fixed(duration,) => *duration,
        }
    }
}

/// Retry configuration for rate-limited calls.
#[derive(Debug, Clone,)]
pub struct RetryPolicy
{
    /// Maximum number of attempts; `None` retries without bound.
    pub max_attempts:  Option<u32,>,
    /// Granularity of the secondary rate-limit jitter (default: 60s).
    pub jitter_unit:   Duration,
    /// Jitter is `jitter_unit * n` with `n` uniform in `0..jitter_steps`
    /// (default: 5).
    pub jitter_steps:  u64,
}

impl Default for RetryPolicy
{
    fn default() -> Self
    {
        Self {
            max_attempts: None, jitter_unit: Duration::from_secs(60,), jitter_steps: 5,
        }
    }
}

impl RetryPolicy
{
    /// Policy without secondary rate-limit jitter.
    pub fn without_jitter() -> Self
    {
        Self {
            jitter_steps: 1, ..Self::default()
        }
    }

    /// Maps an error to the wait strategy that recovers from it.
    ///
    /// Returns `None` for errors that must not be retried.
    pub fn wait_for(&self, error: &Error,) -> Option<WaitStrategy,>
    {
        match error {
            Error::RateLimited {
                reset,
            } => Some(WaitStrategy::UntilReset(*reset,),),
            Error::SecondaryRateLimited {
                retry_after,
            } => Some(WaitStrategy::Fixed(Duration::from_secs(*retry_after,) + self.jitter(),),),
            _ => None,
        }
    }

    fn jitter(&self,) -> Duration
    {
        let steps = rand::thread_rng().gen_range(0..self.jitter_steps.max(1,),);
        self.jitter_unit * u32::try_from(steps,).unwrap_or(u32::MAX,)
    }

    fn exhausted(&self, attempt: u32,) -> bool
    {
        self.max_attempts.is_some_and(|max| attempt >= max,)
    }

    /// Executes `operation`, waiting out rate limits and repeating it.
    ///
    /// # Arguments
    ///
    /// * `clock` - Time source used for computing and applying waits
    /// * `operation_name` - Name of the operation for logging
    /// * `operation` - Async call to repeat
    ///
    /// # Errors
    ///
    /// Returns the first non rate-limit error, or the last rate-limit error
    /// once `max_attempts` is reached.
    pub async fn execute<F, Fut, T,>(
        &self,
        clock: &dyn Clock,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, Error,>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error,>,>,
    {
        let mut attempt = 1;

        loop {
            let error = match operation().await {
                Ok(value,) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}", operation_name, attempt);
                    }
                    return Ok(value,);
                }
                Err(error,) => error,
            };

            let Some(strategy,) = self.wait_for(&error,) else {
                return Err(error,);
            };

            if self.exhausted(attempt,) {
                warn!("{} still rate limited after {} attempts", operation_name, attempt);
                return Err(error,);
            }

            let delay = strategy.delay(clock.now(),);
            match strategy {
                WaitStrategy::UntilReset(reset,) => {
                    warn!("{} ratelimited. Pausing until {:?} ({:?})", operation_name, reset, delay);
                }
                WaitStrategy::Fixed(_,) => {
                    warn!("{} {}, sleeping for {:?}", operation_name, error, delay);
                }
            }

            clock.sleep(delay,).await;
            attempt += 1;
        }
    }
}
