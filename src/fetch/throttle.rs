use std::time::Duration;

use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// An [`HttpClient`] wrapper that enforces a minimum spacing between
/// requests.
///
/// Transit providers commonly cap polling at around one request per second;
/// all feed fetches share this spacing regardless of how many feeds are
/// polled concurrently.
pub struct Throttle<C> {
    inner: C,
    min_interval: Duration,
    next_allowed: Mutex<Instant>,
}

impl<C> Throttle<C> {
    pub fn new(inner: C, min_interval: Duration) -> Self {
        Self {
            inner,
            min_interval,
            next_allowed: Mutex::new(Instant::now()),
        }
    }

    /// Spacing for `calls` requests per second.
    pub fn per_second(inner: C, calls: u32) -> Self {
        let calls = calls.max(1);
        Self::new(inner, Duration::from_secs(1) / calls)
    }

    async fn wait_for_slot(&self) {
        let wakeup = {
            let mut next_allowed = self.next_allowed.lock().await;
            let now = Instant::now();
            let slot = if *next_allowed > now { *next_allowed } else { now };
            *next_allowed = slot + self.min_interval;
            slot
        };
        tokio::time::sleep_until(wakeup).await;
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for Throttle<C> {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.wait_for_slot().await;
        self.inner.execute(req).await
    }
}
