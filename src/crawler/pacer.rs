//! Request pacing
//!
//! Enforces a fixed minimum pause between successive page requests so a pass
//! over many pages never bursts against the forum.

use std::time::{Duration, Instant};

/// Tracks the last request time and sleeps until the next one is allowed
#[derive(Debug, Clone)]
pub struct RequestPacer {
    /// Minimum time between the start of two requests
    min_interval: Duration,

    /// When the last request was let through
    last_request: Option<Instant>,
}

impl RequestPacer {
    /// Creates a pacer that allows one request per `min_interval`
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: None,
        }
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.min_interval {
            Some(self.min_interval - elapsed)
        } else {
            None
        }
    }

    /// Records that a request was made at `now`
    pub fn record_request(&mut self, now: Instant) {
        self.last_request = Some(now);
    }

    /// Waits until a request is allowed, then records it
    pub async fn wait_turn(&mut self) {
        if let Some(wait) = self.time_until_next_request(Instant::now()) {
            tracing::trace!("Pausing {:?} before next page request", wait);
            tokio::time::sleep(wait).await;
        }
        self.record_request(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_request_is_immediate() {
        let pacer = RequestPacer::new(Duration::from_secs(3));
        assert_eq!(pacer.time_until_next_request(Instant::now()), None);
    }

    #[test]
    fn test_second_request_waits_remaining_interval() {
        let mut pacer = RequestPacer::new(Duration::from_secs(3));
        let start = Instant::now();
        pacer.record_request(start);

        assert_eq!(
            pacer.time_until_next_request(start + Duration::from_secs(1)),
            Some(Duration::from_secs(2))
        );
        assert_eq!(
            pacer.time_until_next_request(start + Duration::from_secs(3)),
            None
        );
    }

    #[tokio::test]
    async fn test_wait_turn_enforces_pause() {
        let mut pacer = RequestPacer::new(Duration::from_millis(50));
        let start = Instant::now();

        pacer.wait_turn().await;
        pacer.wait_turn().await;

        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
