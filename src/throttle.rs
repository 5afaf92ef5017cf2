//! Per-source politeness pacing.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Enforces a minimum interval between consecutive requests to one source.
///
/// The lock is held while waiting, so concurrent callers queue up and are
/// released one interval apart.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    /// Creates a throttle with the given minimum interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Returns the minimum interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until a request may be issued and records it.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let next = previous + self.interval;
            if next > Instant::now() {
                debug!("Pacing request for {:?}", next.saturating_duration_since(Instant::now()));
                sleep_until(next).await;
            }
        }
        *last = Some(Instant::now());
    }
}
