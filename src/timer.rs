//! Single-shot interruption-grace timer on a virtual clock.
//!
//! The detector never sleeps. Time advances only through the timestamps it
//! is handed, so the timer is a pending deadline that fires the first time
//! the clock reaches it.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraceTimer {
    deadline_ms: Option<u64>,
}

impl GraceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the timer. A timer that is already pending keeps its
    /// original deadline. Returns whether a new deadline was set.
    pub fn arm(&mut self, now_ms: u64, grace_ms: u64) -> bool {
        if self.deadline_ms.is_some() {
            return false;
        }
        self.deadline_ms = Some(now_ms.saturating_add(grace_ms));
        true
    }

    /// Safe to call on an idle or already-fired timer. Returns whether
    /// something was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline_ms.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.deadline_ms.is_some()
    }

    pub fn deadline(&self) -> Option<u64> {
        self.deadline_ms
    }

    /// Fires (and disarms) when `now_ms` has reached the deadline.
    pub fn fire_if_due(&mut self, now_ms: u64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arming_twice_keeps_first_deadline() {
        let mut timer = GraceTimer::new();
        assert!(timer.arm(100, 1000));
        assert!(!timer.arm(500, 1000));
        assert_eq!(timer.deadline(), Some(1100));
    }

    #[test]
    fn fires_once_at_deadline() {
        let mut timer = GraceTimer::new();
        timer.arm(0, 1000);
        assert!(!timer.fire_if_due(999));
        assert!(timer.fire_if_due(1000));
        assert!(!timer.fire_if_due(2000));
        assert!(!timer.is_pending());
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut timer = GraceTimer::new();
        assert!(!timer.cancel());
        timer.arm(0, 10);
        assert!(timer.cancel());
        assert!(!timer.cancel());

        timer.arm(0, 10);
        assert!(timer.fire_if_due(10));
        assert!(!timer.cancel());
    }

    #[test]
    fn deadline_saturates() {
        let mut timer = GraceTimer::new();
        timer.arm(u64::MAX - 1, 1000);
        assert_eq!(timer.deadline(), Some(u64::MAX));
    }
}
