// src/utils/wait.rs

//! Bounded polling for asynchronous page updates.

use std::time::Duration;

use tokio::time::{Instant, sleep};

/// Deadline-bounded poll loop.
///
/// ```ignore
/// let mut poll = Poller::new(timeout, interval);
/// loop {
///     if ready().await? { break; }
///     if !poll.tick().await { return Err(...); }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Poller {
    deadline: Instant,
    interval: Duration,
    attempts: usize,
}

impl Poller {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            interval,
            attempts: 0,
        }
    }

    pub fn from_millis(timeout_ms: u64, interval: Duration) -> Self {
        Self::new(Duration::from_millis(timeout_ms), interval)
    }

    /// Sleep until the next attempt. Returns false once the deadline has passed;
    /// the last sleep is shortened so the deadline is never overshot.
    pub async fn tick(&mut self) -> bool {
        let now = Instant::now();
        if now >= self.deadline {
            return false;
        }
        let remaining = self.deadline - now;
        sleep(self.interval.min(remaining)).await;
        self.attempts += 1;
        true
    }

    /// Number of completed waits.
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_tick_stops_at_deadline() {
        let mut poll = Poller::new(Duration::from_millis(1000), Duration::from_millis(300));
        let mut ticks = 0;
        while poll.tick().await {
            ticks += 1;
        }
        // 300 + 300 + 300 + 100
        assert_eq!(ticks, 4);
        assert_eq!(poll.attempts(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_never_waits() {
        let mut poll = Poller::new(Duration::ZERO, Duration::from_millis(100));
        assert!(!poll.tick().await);
    }
}
