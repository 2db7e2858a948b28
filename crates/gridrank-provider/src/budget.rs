//! Fixed-window request budget, shared by every clone.
//!
//! At most `max_requests` calls start per `window`.
//! [`RequestBudget::acquire`] waits for the next window when the budget is
//! spent; [`RequestBudget::try_acquire`] reports it instead.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
struct Window {
    started_at: Instant,
    count: usize,
}

impl Window {
    /// Takes a slot, or returns how long until the window rolls over.
    fn take(&mut self, max_requests: usize, length: Duration) -> Result<(), Duration> {
        if self.started_at.elapsed() >= length {
            self.started_at = Instant::now();
            self.count = 0;
        }
        if self.count < max_requests {
            self.count += 1;
            Ok(())
        } else {
            Err(length.saturating_sub(self.started_at.elapsed()))
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestBudget {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<Window>>,
}

impl RequestBudget {
    /// `max_requests == 0` disables the limit.
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(Window {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }

    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Waits until a request slot is free in the current window.
    pub async fn acquire(&self) {
        if self.max_requests == 0 {
            return;
        }
        loop {
            let outcome = self.state.lock().await.take(self.max_requests, self.window);
            let Err(wait) = outcome else {
                return;
            };
            tracing::debug!(
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "provider request budget exhausted, waiting for next window"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Takes a slot if one is free, without waiting.
    pub async fn try_acquire(&self) -> bool {
        if self.max_requests == 0 {
            return true;
        }
        self.state
            .lock()
            .await
            .take(self.max_requests, self.window)
            .is_ok()
    }
}
