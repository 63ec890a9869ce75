//! Pressure level state machine with a downgrade band.
//!
//! Upgrades take effect on the tick that crosses a threshold. Downgrades
//! step one level per monitoring tick and only once the measured value
//! has dropped below `threshold * (1 - HYSTERESIS_BAND)` of the level
//! being left, so noisy measurements near a threshold cannot flap the
//! level up and down.

use crate::pressure::{PressureLevel, ResourceThresholds};

/// Fractional buffer below a threshold required to leave its level.
pub const HYSTERESIS_BAND: f64 = 0.10;

/// Per-resource effective-level tracker.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct HysteresisTracker {
    current: PressureLevel,
}

impl HysteresisTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The effective level after the last observation.
    pub fn current(&self) -> PressureLevel {
        self.current
    }

    /// Feeds one measured value; returns the new effective level.
    pub fn observe(&mut self, value: f64, thresholds: ResourceThresholds) -> PressureLevel {
        let raw = thresholds.level_for(value);

        if raw >= self.current {
            // Upgrades are immediate
            self.current = raw;
            return self.current;
        }

        // Downgrade: leave the current level only once the value is a full
        // band below the threshold that put us here, and step down one
        // level per tick.
        let release_point = thresholds.threshold_for(self.current) * (1.0 - HYSTERESIS_BAND);
        if value < release_point {
            self.current = self.current.one_below().max(raw);
        }

        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> ResourceThresholds {
        ResourceThresholds::new(60.0, 80.0)
    }

    fn run(values: &[f64]) -> Vec<PressureLevel> {
        let mut tracker = HysteresisTracker::new();
        values
            .iter()
            .map(|v| tracker.observe(*v, thresholds()))
            .collect()
    }

    #[test]
    fn test_upgrades_are_immediate() {
        assert_eq!(
            run(&[50.0, 65.0, 85.0]),
            vec![
                PressureLevel::Normal,
                PressureLevel::Warning,
                PressureLevel::Critical
            ]
        );
    }

    #[test]
    fn test_monitoring_tick_scenario() {
        // warning=60, critical=80. 70 < 80*0.9=72 releases Critical down to
        // Warning; 53 < 60*0.9=54 releases Warning down to Normal.
        assert_eq!(
            run(&[50.0, 65.0, 85.0, 70.0, 53.0]),
            vec![
                PressureLevel::Normal,
                PressureLevel::Warning,
                PressureLevel::Critical,
                PressureLevel::Warning,
                PressureLevel::Normal
            ]
        );
    }

    #[test]
    fn test_downgrade_held_inside_band() {
        // 75 is below critical (80) but above 80*0.9=72: Critical holds
        assert_eq!(
            run(&[85.0, 75.0, 75.0]),
            vec![
                PressureLevel::Critical,
                PressureLevel::Critical,
                PressureLevel::Critical
            ]
        );
    }

    #[test]
    fn test_warning_held_inside_band() {
        // 55 is below warning (60) but above 60*0.9=54: Warning holds
        assert_eq!(
            run(&[65.0, 55.0, 55.0]),
            vec![
                PressureLevel::Warning,
                PressureLevel::Warning,
                PressureLevel::Warning
            ]
        );
    }

    #[test]
    fn test_downgrade_steps_one_level_per_tick() {
        // A collapse from Critical to a very low value still passes
        // through Warning for one tick.
        assert_eq!(
            run(&[85.0, 10.0, 10.0]),
            vec![
                PressureLevel::Critical,
                PressureLevel::Warning,
                PressureLevel::Normal
            ]
        );
    }

    #[test]
    fn test_no_flapping_around_threshold() {
        // Oscillating just around the warning threshold must not flap
        // once Warning is entered.
        let levels = run(&[61.0, 59.0, 61.0, 59.0, 61.0]);
        assert!(levels[1..]
            .iter()
            .all(|level| *level == PressureLevel::Warning));
    }
}
