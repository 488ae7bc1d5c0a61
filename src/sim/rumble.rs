//! Cosmetic body roll of the vehicle

use crate::tuning::VehicleTuning;

/// Accumulated roll angle that jitters with intensity phases
#[derive(Debug, Clone)]
pub struct Rumble {
    /// Divisors for the three phases (higher = calmer)
    levels: [f32; 3],
    delay_secs: u32,
    threshold: f32,
    roll: f32,
    elapsed: f32,
}

impl Rumble {
    pub fn new(tuning: &VehicleTuning) -> Self {
        let base = tuning.rumble_level;
        Self {
            levels: [base, base * 2.0, base * 3.0],
            delay_secs: tuning.rumble_delay_secs.max(1),
            threshold: tuning.rumble_threshold,
            roll: 0.0,
            elapsed: 0.0,
        }
    }

    /// Divisor for the phase containing `second`
    pub fn intensity(&self, second: u32) -> f32 {
        let phase = (second % (self.delay_secs * 3)) / self.delay_secs;
        self.levels[phase as usize]
    }

    /// Advance by `dt` seconds and return the current roll (radians)
    pub fn update(&mut self, dt: f32) -> f32 {
        self.elapsed += dt.max(0.0);
        let intensity = self.intensity(self.elapsed as u32);
        let next = self.roll + (self.elapsed * 1000.0).sin() / intensity;
        // A step that would leave the band is dropped
        if next.abs() <= self.threshold {
            self.roll = next;
        }
        self.roll
    }

    pub fn roll(&self) -> f32 {
        self.roll
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intensity_cycles_through_phases() {
        let rumble = Rumble::new(&VehicleTuning::default());
        assert_eq!(rumble.intensity(0), 50.0);
        assert_eq!(rumble.intensity(4), 50.0);
        assert_eq!(rumble.intensity(5), 100.0);
        assert_eq!(rumble.intensity(10), 150.0);
        assert_eq!(rumble.intensity(15), 50.0);
    }

    #[test]
    fn test_roll_stays_within_threshold() {
        let mut rumble = Rumble::new(&VehicleTuning::default());
        for _ in 0..2000 {
            let roll = rumble.update(1.0 / 60.0);
            assert!(roll.abs() <= crate::consts::RUMBLE_THRESHOLD);
        }
    }
}
