use std::time::Duration;

/// Rate budget and retry behaviour for an upstream price source.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPolicy {
    pub quota_window: Duration,
    pub quota_limit: u32,
    pub retry_backoff: BackoffPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub max_retries: u32,
}

impl BackoffPolicy {
    /// Delay before retry number `retry_count` (0-based), `None` once retries
    /// are exhausted.
    pub fn delay_for(&self, retry_count: u32) -> Option<Duration> {
        if retry_count > self.max_retries {
            return None;
        }

        let scale = self.multiplier.powf(f64::from(retry_count));
        let seconds = self.initial_delay.as_secs_f64() * scale;
        let capped_seconds = seconds.min(self.max_delay.as_secs_f64());
        Some(Duration::from_secs_f64(capped_seconds))
    }
}

impl Default for FetchPolicy {
    /// Conservative budget for a scraped source: 5 calls per minute.
    fn default() -> Self {
        Self {
            quota_window: Duration::from_secs(60),
            quota_limit: 5,
            retry_backoff: BackoffPolicy {
                initial_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(30),
                multiplier: 2.0,
                max_retries: 3,
            },
        }
    }
}

impl FetchPolicy {
    /// No waiting and no retries; useful for local or synthetic sources.
    pub fn unthrottled() -> Self {
        Self {
            quota_window: Duration::from_secs(1),
            quota_limit: u32::MAX,
            retry_backoff: BackoffPolicy {
                initial_delay: Duration::ZERO,
                max_delay: Duration::ZERO,
                multiplier: 1.0,
                max_retries: 0,
            },
        }
    }
}
