use std::time::{Duration, Instant};

/// Minimum interval between repeated user-initiated submissions (sign-in,
/// send, delete). This is the only concurrency safeguard the app carries:
/// it exists to stop a double tap from submitting twice.
#[derive(Debug)]
pub struct TapGuard {
    min_interval: Duration,
    last: Option<Instant>,
}

pub const DEFAULT_TAP_INTERVAL: Duration = Duration::from_millis(750);

impl TapGuard {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// True when the action may run now; records the tap. False while still
    /// inside the interval of the previous tap.
    pub fn try_acquire(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(previous) if now.duration_since(previous) < self.min_interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

impl Default for TapGuard {
    fn default() -> Self {
        Self::new(DEFAULT_TAP_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tap_is_allowed() {
        let mut guard = TapGuard::default();
        assert!(guard.try_acquire());
    }

    #[test]
    fn rapid_second_tap_is_swallowed() {
        let mut guard = TapGuard::new(Duration::from_millis(200));
        assert!(guard.try_acquire());
        assert!(!guard.try_acquire());
    }

    #[test]
    fn tap_after_the_interval_is_allowed() {
        let mut guard = TapGuard::new(Duration::from_millis(10));
        assert!(guard.try_acquire());
        std::thread::sleep(Duration::from_millis(15));
        assert!(guard.try_acquire());
    }
}
