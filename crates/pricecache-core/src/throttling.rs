//! Rate budgeting for upstream fetches.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::fetch_policy::{BackoffPolicy, FetchPolicy};
use crate::fetcher::{FetchError, Fetcher};
use crate::{DateRange, InstrumentKey, PriceRecord};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Sleep hook, replaceable so tests can observe waits without blocking.
pub type Sleeper = Arc<dyn Fn(Duration) + Send + Sync>;

/// Token bucket sized from a quota window and a call limit.
#[derive(Clone)]
pub struct ThrottlingQueue {
    limiter: Arc<DirectRateLimiter>,
    replenish_interval: Duration,
}

impl ThrottlingQueue {
    pub fn new(quota_window: Duration, quota_limit: u32) -> Self {
        let (quota, replenish_interval) = quota_from_window(quota_window, quota_limit);
        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            replenish_interval,
        }
    }

    pub fn from_policy(policy: &FetchPolicy) -> Self {
        Self::new(policy.quota_window, policy.quota_limit)
    }

    /// Takes one unit of budget, or returns how long to wait before the next
    /// unit is replenished.
    pub fn acquire(&self) -> Result<(), Duration> {
        self.limiter
            .check()
            .map_err(|_| self.replenish_interval)
    }
}

/// Longest window the limiter accepts; longer windows are clamped to it.
const MAX_QUOTA_WINDOW: Duration = Duration::from_secs(365 * 24 * 60 * 60);

fn quota_from_window(quota_window: Duration, quota_limit: u32) -> (Quota, Duration) {
    let safe_limit = NonZeroU32::new(quota_limit.max(1)).unwrap_or(NonZeroU32::MIN);
    let quota_window = quota_window.min(MAX_QUOTA_WINDOW);

    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(safe_limit.get())).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    let quota = Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(safe_limit))
        .allow_burst(safe_limit);
    (quota, period)
}

/// Wraps a [`Fetcher`] with a rate budget and retry of retryable failures.
///
/// Calls stay sequential: the caller blocks while waiting for budget or
/// backing off.
pub struct ThrottledFetcher<F> {
    inner: F,
    queue: ThrottlingQueue,
    backoff: BackoffPolicy,
    sleeper: Sleeper,
}

impl<F: Fetcher> ThrottledFetcher<F> {
    pub fn new(inner: F, policy: &FetchPolicy) -> Self {
        Self {
            inner,
            queue: ThrottlingQueue::from_policy(policy),
            backoff: policy.retry_backoff.clone(),
            sleeper: Arc::new(std::thread::sleep),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Sleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    fn wait_for_budget(&self) -> Result<(), FetchError> {
        for _ in 0..=self.backoff.max_retries {
            match self.queue.acquire() {
                Ok(()) => return Ok(()),
                Err(wait) => {
                    let wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
                    tracing::debug!(wait_ms, "waiting for fetch budget");
                    (self.sleeper)(wait);
                }
            }
        }

        self.queue.acquire().map_err(|wait| {
            FetchError::rate_limited(format!(
                "fetch budget exhausted; next slot in {}ms",
                wait.as_millis()
            ))
        })
    }
}

impl<F: Fetcher> Fetcher for ThrottledFetcher<F> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch(
        &self,
        instrument: &InstrumentKey,
        range: DateRange,
    ) -> Result<Vec<PriceRecord>, FetchError> {
        let mut retries = 0_u32;
        loop {
            self.wait_for_budget()?;

            match self.inner.fetch(instrument, range) {
                Ok(records) => return Ok(records),
                Err(error) if error.retryable() && retries < self.backoff.max_retries => {
                    let delay = self
                        .backoff
                        .delay_for(retries)
                        .unwrap_or(self.backoff.max_delay);
                    tracing::warn!(
                        fetcher = self.inner.name(),
                        %instrument,
                        %range,
                        error = %error,
                        retry = retries + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "retrying fetch"
                    );
                    (self.sleeper)(delay);
                    retries += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
