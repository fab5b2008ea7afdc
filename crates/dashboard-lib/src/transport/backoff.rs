//! Reconnect backoff for the push channel

use std::time::Duration;

/// Exponential backoff: each delay is the previous one times `factor`,
/// capped at `max`, back to `initial` after a successful connect.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    initial: Duration,
    max: Duration,
    factor: f64,
    current: Duration,
    attempts: u32,
}

impl ReconnectBackoff {
    pub fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        Self {
            initial,
            max,
            factor,
            current: initial,
            attempts: 0,
        }
    }

    /// Delay to wait before the next attempt; grows the delay for the one after
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let grown_ms = (self.current.as_millis() as f64 * self.factor).round() as u64;
        self.current = Duration::from_millis(grown_ms).min(self.max);
        self.attempts += 1;
        delay
    }

    /// Delay the next call to [`next_delay`](Self::next_delay) will return
    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
        self.attempts = 0;
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000), Duration::from_millis(30_000), 1.8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_sequence() {
        let mut backoff = ReconnectBackoff::default();
        let delays: Vec<u64> = (0..9)
            .map(|_| backoff.next_delay().as_millis() as u64)
            .collect();

        assert_eq!(
            delays,
            vec![1000, 1800, 3240, 5832, 10498, 18896, 30000, 30000, 30000]
        );
    }

    #[test]
    fn test_reset_after_connect() {
        let mut backoff = ReconnectBackoff::default();
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.current(), Duration::from_millis(3240));
        assert_eq!(backoff.attempts(), 2);

        backoff.reset();
        assert_eq!(backoff.current(), Duration::from_millis(1000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
    }
}
