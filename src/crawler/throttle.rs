//! Request spacing toward the target host
//!
//! Every request a session issues passes through a [`HostThrottle`], which
//! enforces a minimum interval between consecutive requests. Explicit
//! politeness sleeps in the paginator and orchestrator still apply; the
//! throttle guarantees the spacing even on paths that do not sleep.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Minimum-interval gate for a single host
#[derive(Debug)]
pub struct HostThrottle {
    /// Minimum time between two requests
    min_interval: Duration,

    /// Timestamp of the last request and number of requests so far
    state: Mutex<ThrottleState>,
}

#[derive(Debug, Default)]
struct ThrottleState {
    last_request_time: Option<Instant>,
    request_count: u64,
}

impl HostThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            state: Mutex::new(ThrottleState::default()),
        }
    }

    /// Returns how long to wait before a request may be sent at `now`
    ///
    /// Returns None if a request can be made right away.
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        let state = self.state.lock().ok()?;
        let last = state.last_request_time?;
        let elapsed = now.saturating_duration_since(last);

        if elapsed >= self.min_interval {
            None
        } else {
            Some(self.min_interval - elapsed)
        }
    }

    /// Records that a request was sent at `now`
    pub fn record_request(&self, now: Instant) {
        if let Ok(mut state) = self.state.lock() {
            state.request_count += 1;
            state.last_request_time = Some(now);
        }
    }

    /// Waits until the minimum interval has elapsed, then records a request
    pub async fn acquire(&self) {
        if let Some(wait) = self.time_until_next_request(Instant::now()) {
            tracing::trace!("Throttling next request by {:?}", wait);
            tokio::time::sleep(wait).await;
        }
        self.record_request(Instant::now());
    }

    /// Number of requests recorded so far
    pub fn request_count(&self) -> u64 {
        self.state.lock().map(|s| s.request_count).unwrap_or(0)
    }
}
