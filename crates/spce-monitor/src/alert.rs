//! Threshold alert state machine.
//!
//! The alert level is the integer multiple of the threshold the current
//! has reached: level 0 below the threshold, level 2 at twice the
//! threshold, and so on. An event fires on every level change and never
//! otherwise, so a steady over-threshold current alerts exactly once.
//! There is no hysteresis; a current hovering at a boundary flaps
//! between levels.

use std::fmt;

/// A change of alert level observed by [`AlertMonitor::evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub enum AlertEvent {
    /// The current climbed into a higher threshold multiple.
    Escalation { level: u32, current: f64, threshold: f64 },
    /// The current dropped a level but is still above the threshold.
    PartialRecovery { from_level: u32, to_level: u32, current: f64, threshold: f64 },
    /// The current fell back below the threshold.
    FullRecovery { from_level: u32, current: f64, threshold: f64 },
}

impl fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertEvent::Escalation { level, current, threshold } => write!(
                f,
                "ALERT: current {current:.2} uA crossed level {level} ({:.2} uA, threshold {threshold:.2} uA)",
                *level as f64 * threshold
            ),
            AlertEvent::PartialRecovery { from_level, to_level, current, threshold } => write!(
                f,
                "Partial recovery: current {current:.2} uA dropped from level {from_level} to level {to_level} (threshold {threshold:.2} uA)"
            ),
            AlertEvent::FullRecovery { from_level, current, threshold } => write!(
                f,
                "Recovered: current {current:.2} uA back below threshold {threshold:.2} uA (was level {from_level})"
            ),
        }
    }
}

/// Tracks the alert level across readings.
#[derive(Debug, Default)]
pub struct AlertMonitor {
    level: u32,
}

impl AlertMonitor {
    /// Start at level 0, no alert active.
    pub fn new() -> Self {
        AlertMonitor::default()
    }

    /// The current alert level.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Fold one reading into the state machine.
    ///
    /// `current` and `threshold` are in the same unit (microamperes in
    /// this service). A current exactly equal to the threshold counts
    /// as level 0.
    pub fn evaluate(&mut self, current: f64, threshold: f64) -> Option<AlertEvent> {
        let new_level = if current > threshold {
            (current / threshold) as u32
        } else {
            0
        };

        let old_level = self.level;
        if new_level == old_level {
            return None;
        }
        self.level = new_level;

        if new_level > old_level {
            Some(AlertEvent::Escalation { level: new_level, current, threshold })
        } else if new_level == 0 {
            Some(AlertEvent::FullRecovery { from_level: old_level, current, threshold })
        } else {
            Some(AlertEvent::PartialRecovery {
                from_level: old_level,
                to_level: new_level,
                current,
                threshold,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escalation_jumps_straight_to_the_reached_level() {
        let mut monitor = AlertMonitor::new();
        let event = monitor.evaluate(25.0, 10.0).unwrap();
        assert_eq!(
            event,
            AlertEvent::Escalation { level: 2, current: 25.0, threshold: 10.0 }
        );
        assert_eq!(monitor.level(), 2);
    }

    #[test]
    fn test_steady_current_alerts_once() {
        let mut monitor = AlertMonitor::new();
        assert!(monitor.evaluate(25.0, 10.0).is_some());
        assert!(monitor.evaluate(25.0, 10.0).is_none());
        assert!(monitor.evaluate(28.0, 10.0).is_none());
    }

    #[test]
    fn test_partial_then_full_recovery() {
        let mut monitor = AlertMonitor::new();
        monitor.evaluate(35.0, 10.0);
        assert_eq!(monitor.level(), 3);

        let event = monitor.evaluate(15.0, 10.0).unwrap();
        assert_eq!(
            event,
            AlertEvent::PartialRecovery {
                from_level: 3,
                to_level: 1,
                current: 15.0,
                threshold: 10.0
            }
        );

        let event = monitor.evaluate(5.0, 10.0).unwrap();
        assert_eq!(
            event,
            AlertEvent::FullRecovery { from_level: 1, current: 5.0, threshold: 10.0 }
        );
        assert_eq!(monitor.level(), 0);
    }

    #[test]
    fn test_current_equal_to_threshold_is_level_zero() {
        let mut monitor = AlertMonitor::new();
        assert!(monitor.evaluate(10.0, 10.0).is_none());
        assert_eq!(monitor.level(), 0);
    }

    #[test]
    fn test_boundary_current_flaps_without_hysteresis() {
        let mut monitor = AlertMonitor::new();
        assert!(matches!(
            monitor.evaluate(10.1, 10.0),
            Some(AlertEvent::Escalation { level: 1, .. })
        ));
        assert!(matches!(
            monitor.evaluate(9.9, 10.0),
            Some(AlertEvent::FullRecovery { from_level: 1, .. })
        ));
        assert!(matches!(
            monitor.evaluate(10.1, 10.0),
            Some(AlertEvent::Escalation { level: 1, .. })
        ));
    }

    #[test]
    fn test_below_threshold_from_start_never_fires() {
        let mut monitor = AlertMonitor::new();
        for current in [0.0, 1.0, 5.0, 9.99] {
            assert!(monitor.evaluate(current, 10.0).is_none());
        }
    }
}
