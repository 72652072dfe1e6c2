//! Sliding-window rate limiter shared by all calls of one client

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Allows at most `max_calls` acquisitions in any `window`.
///
/// The call log is the single critical section; waiting happens outside
/// the lock so concurrent callers queue on the clock, not on the mutex.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            window,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    /// `max_calls` per minute
    pub fn per_minute(max_calls: usize) -> Self {
        Self::new(max_calls, Duration::from_secs(60))
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait until a call slot is free, then claim it.
    pub async fn acquire(&self) {
        loop {
            match self.claim_or_wait(Instant::now()) {
                None => return,
                Some(wait) => {
                    tracing::debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Claim a slot without waiting. Returns false when the window is full.
    pub fn try_acquire(&self) -> bool {
        self.claim_or_wait(Instant::now()).is_none()
    }

    /// Claims a slot and returns `None`, or returns how long until the
    /// oldest call in the window expires.
    fn claim_or_wait(&self, now: Instant) -> Option<Duration> {
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());

        while let Some(&oldest) = calls.front() {
            if now.duration_since(oldest) >= self.window {
                calls.pop_front();
            } else {
                break;
            }
        }

        if calls.len() < self.max_calls {
            calls.push_back(now);
            return None;
        }

        calls
            .front()
            .map(|&oldest| self.window.saturating_sub(now.duration_since(oldest)))
    }
}
