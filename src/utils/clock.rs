use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};

use super::time::TimezonePolicy;

/// Represents an entity responsible for providing dates across application. Components never read
/// system time themselves, which keeps gap and schedule scenarios deterministic under test.
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);

    /// Current wall time in the journal's timezone.
    fn local_time(&self, zone: &TimezonePolicy) -> DateTime<FixedOffset> {
        zone.localize(self.time())
    }
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock frozen at a single moment. Sleeping returns immediately but is recorded so retry
/// backoff can be asserted on.
#[cfg(test)]
pub struct FixedClock {
    pub time: DateTime<Utc>,
    pub slept: std::sync::Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl FixedClock {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time,
            slept: Default::default(),
        }
    }

    pub fn total_slept(&self) -> Duration {
        self.slept.lock().unwrap().iter().sum()
    }
}

#[cfg(test)]
#[async_trait]
impl Clock for FixedClock {
    fn time(&self) -> DateTime<Utc> {
        self.time
    }

    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}
