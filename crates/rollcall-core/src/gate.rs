use std::time::Duration;
use tokio::time::Instant;

/// Minimum-interval guard in front of a high-frequency input.
///
/// The gate starts open. After [mark](RateGate::mark) it stays closed
/// until `min_interval` has elapsed since the marked instant.
#[derive(Debug, Clone)]
pub struct RateGate {
    min_interval: Duration,
    last_pass: Option<Instant>,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_pass: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Start of the last processed pass, if any.
    pub fn last_pass(&self) -> Option<Instant> {
        self.last_pass
    }

    pub fn is_open(&self, now: Instant) -> bool {
        match self.last_pass {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last_pass = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_before_first_pass() {
        let gate = RateGate::new(Duration::from_secs(5));
        assert!(gate.is_open(Instant::now()));
        assert_eq!(gate.last_pass(), None);
    }

    #[test]
    fn test_closed_within_interval() {
        let t0 = Instant::now();
        let mut gate = RateGate::new(Duration::from_secs(5));
        gate.mark(t0);

        assert!(!gate.is_open(t0));
        assert!(!gate.is_open(t0 + Duration::from_millis(4999)));
        assert!(gate.is_open(t0 + Duration::from_secs(5)));
        assert!(gate.is_open(t0 + Duration::from_secs(60)));
    }

    #[test]
    fn test_zero_interval_never_closes() {
        let t0 = Instant::now();
        let mut gate = RateGate::new(Duration::ZERO);
        gate.mark(t0);
        assert!(gate.is_open(t0));
    }
}
