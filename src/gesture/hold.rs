use std::time::Duration;

pub const DEFAULT_HOLD_THRESHOLD: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoldState {
    Idle,
    Pressed { generation: u64 },
    /// Threshold reached; stays here until the finger lifts.
    Fired,
}

/// Time-threshold confirmation, free of any clock.
///
/// `press` hands out a generation for the caller to arm a timer with;
/// `elapsed` with that generation confirms the hold exactly once. Releasing
/// before then returns to idle with nothing recorded, so a half-held gesture
/// leaves no trace and can be retried indefinitely.
#[derive(Debug, Clone)]
pub struct HoldDetector {
    threshold: Duration,
    state: HoldState,
    next_generation: u64,
}

impl Default for HoldDetector {
    fn default() -> Self {
        Self::new(DEFAULT_HOLD_THRESHOLD)
    }
}

impl HoldDetector {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            state: HoldState::Idle,
            next_generation: 0,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Starts a hold. Returns `None` while a previous press is still down.
    pub fn press(&mut self) -> Option<u64> {
        if self.state != HoldState::Idle {
            return None;
        }
        self.next_generation = self.next_generation.wrapping_add(1);
        let generation = self.next_generation;
        self.state = HoldState::Pressed { generation };
        Some(generation)
    }

    /// Lifts the finger. Returns `true` if this cancelled a pending hold.
    pub fn release(&mut self) -> bool {
        let cancelled = matches!(self.state, HoldState::Pressed { .. });
        self.state = HoldState::Idle;
        cancelled
    }

    /// Threshold timer for `generation` ran out. `true` means confirm now.
    pub fn elapsed(&mut self, generation: u64) -> bool {
        match self.state {
            HoldState::Pressed { generation: pending } if pending == generation => {
                self.state = HoldState::Fired;
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.state = HoldState::Idle;
    }

    pub fn is_pressed(&self) -> bool {
        matches!(self.state, HoldState::Pressed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sustained_press_fires_exactly_once() {
        let mut detector = HoldDetector::default();
        let generation = detector.press().unwrap();
        assert!(detector.elapsed(generation));
        assert!(!detector.elapsed(generation));
        assert!(!detector.release());
    }

    #[test]
    fn early_release_is_a_no_op_any_number_of_times() {
        let mut detector = HoldDetector::default();
        let mut stale = Vec::new();
        for _ in 0..50 {
            let generation = detector.press().unwrap();
            assert!(detector.is_pressed());
            assert!(detector.release());
            stale.push(generation);
        }
        // Timers armed by the abandoned presses must never confirm.
        assert!(stale.into_iter().all(|g| !detector.elapsed(g)));
        assert!(!detector.is_pressed());
    }

    #[test]
    fn stale_generation_does_not_confirm_a_new_press() {
        let mut detector = HoldDetector::default();
        let first = detector.press().unwrap();
        detector.release();
        let second = detector.press().unwrap();
        assert!(!detector.elapsed(first));
        assert!(detector.is_pressed());
        assert!(detector.elapsed(second));
    }

    #[test]
    fn second_press_while_down_is_refused() {
        let mut detector = HoldDetector::default();
        detector.press().unwrap();
        assert_eq!(detector.press(), None);
        detector.reset();
        assert!(detector.press().is_some());
    }
}
