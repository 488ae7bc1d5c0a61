//! Enum-keyed elapsed-time accumulators

/// Named timers of the pursuer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKey {
    /// Time since the last state transition
    StateChanged,
    /// Time since the vehicle moved into the pursuer's lane
    CarEnteredLane,
    /// Time since the vehicle left the pursuer's lane
    CarExitedLane,
    /// Time since the last attack ended
    AttackEnded,
}

impl TimerKey {
    pub const ALL: [TimerKey; 4] = [
        TimerKey::StateChanged,
        TimerKey::CarEnteredLane,
        TimerKey::CarExitedLane,
        TimerKey::AttackEnded,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

/// One monotonic accumulator per [`TimerKey`], all seeded to zero
#[derive(Debug, Clone, Default)]
pub struct TimerBank {
    elapsed: [f32; TimerKey::ALL.len()],
}

impl TimerBank {
    /// Add `dt` seconds to every timer (negative deltas are ignored)
    pub fn accumulate(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        for t in &mut self.elapsed {
            *t += dt;
        }
    }

    pub fn reset(&mut self, key: TimerKey) {
        self.elapsed[key.slot()] = 0.0;
    }

    pub fn elapsed(&self, key: TimerKey) -> f32 {
        self.elapsed[key.slot()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_only_touches_one_timer() {
        let mut timers = TimerBank::default();
        timers.accumulate(1.5);
        timers.reset(TimerKey::CarExitedLane);
        timers.accumulate(0.5);

        assert!((timers.elapsed(TimerKey::CarExitedLane) - 0.5).abs() < 1e-6);
        assert!((timers.elapsed(TimerKey::StateChanged) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_never_negative() {
        let mut timers = TimerBank::default();
        timers.accumulate(-3.0);
        for key in TimerKey::ALL {
            assert_eq!(timers.elapsed(key), 0.0);
        }
    }
}
