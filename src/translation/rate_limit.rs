/*!
 * Request pacing shared between translation jobs.
 *
 * A `RateLimiter` is an explicit handle rather than process-wide state:
 * clones share the same schedule, so concurrent jobs talking to the same
 * provider can be paced together while tests stay isolated.
 */

use std::sync::Arc;
use std::time::Duration;

use log::trace;
use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
struct Schedule {
    /// Earliest instant the next request may start
    next_slot: Option<Instant>,
    /// Requests granted so far
    granted: u64,
}

/// Cloneable, concurrency-safe request pacer
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    schedule: Arc<Mutex<Schedule>>,
}

impl RateLimiter {
    /// Pace requests to at most `requests_per_minute`
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let min_interval = if requests_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(60_000 / requests_per_minute as u64)
        };
        Self::with_interval(min_interval)
    }

    /// Require at least `min_interval` between request starts
    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            schedule: Arc::new(Mutex::new(Schedule {
                next_slot: None,
                granted: 0,
            })),
        }
    }

    /// A limiter that never waits
    pub fn unlimited() -> Self {
        Self::with_interval(Duration::ZERO)
    }

    /// Build from an optional requests-per-minute setting; `None` or 0 disables pacing
    pub fn from_rate_limit(rate_limit: Option<u32>) -> Self {
        match rate_limit {
            Some(rpm) if rpm > 0 => Self::per_minute(rpm),
            _ => Self::unlimited(),
        }
    }

    /// Minimum spacing between request starts
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Number of requests granted through this limiter and its clones
    pub fn granted(&self) -> u64 {
        self.schedule.lock().granted
    }

    /// Wait until the next request slot is available.
    ///
    /// The slot is reserved under the lock and the wait happens after it is
    /// released, so concurrent callers queue up one interval apart.
    pub async fn acquire(&self) {
        let slot = {
            let mut schedule = self.schedule.lock();
            let now = Instant::now();
            let slot = match schedule.next_slot {
                Some(next) if next > now => next,
                _ => now,
            };
            schedule.next_slot = Some(slot + self.min_interval);
            schedule.granted += 1;
            slot
        };

        if slot > Instant::now() {
            trace!("Rate limiter: waiting {:?}", slot - Instant::now());
            tokio::time::sleep_until(slot).await;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}
