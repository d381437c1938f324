//! Session configuration and the validation applied before a session starts.

use crate::error::ValidationError;
use crate::zones;

/// Capacity of the item table in the world state.
pub const MAX_ITEMS: usize = 50;
/// Capacity of the robot table in the world state.
pub const MAX_ROBOTS: usize = 20;

/// Slowest accepted pacing; keeps every derived sleep within minutes.
pub const MIN_TIME_SCALE: f64 = 1e-3;
/// Longest accepted controller timestep (simulated seconds).
pub const MAX_TICK_SECONDS: f64 = 1.0;

/// Share of the reach radius used when no explicit item radius is set.
const DEFAULT_RADIUS_FRACTION: f64 = 0.8;

/// Parameters of one simulation session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Belt speed (cm/s).
    pub belt_speed: f64,
    /// Side of the square box (cm); also the width of each robot zone.
    pub box_size: f64,
    /// Length of the belt section carrying robots (cm).
    pub belt_length: f64,
    pub robot_count: usize,
    pub item_count: usize,
    /// Failure probability per robot per simulated second.
    pub failure_probability: f64,
    /// Inject random robot failures when set.
    pub redundancy_enabled: bool,
    /// Fraction of items that must be labeled for the run to succeed.
    pub success_threshold: f64,
    /// Arm speed as a fraction of the box size per second.
    pub service_speed_ratio: f64,
    /// Half-side of the square items are drawn from; derived when unset.
    pub item_radius: Option<f64>,
    /// Belt controller timestep (simulated seconds).
    pub tick_seconds: f64,
    /// Simulated seconds per wall-clock second.
    pub time_scale: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            belt_speed: 10.0,
            box_size: 50.0,
            belt_length: 200.0,
            robot_count: 5,
            item_count: 20,
            failure_probability: 0.0,
            redundancy_enabled: false,
            success_threshold: 1.0,
            service_speed_ratio: 0.1,
            item_radius: None,
            tick_seconds: 0.05,
            time_scale: 1.0,
        }
    }
}

impl SessionConfig {
    /// Physical parameters with every other knob at its default.
    pub fn new(belt_speed: f64, box_size: f64, belt_length: f64, robot_count: usize) -> Self {
        Self {
            belt_speed,
            box_size,
            belt_length,
            robot_count,
            ..Self::default()
        }
    }

    pub fn with_robots(mut self, robot_count: usize) -> Self {
        self.robot_count = robot_count;
        self
    }

    pub fn with_items(mut self, item_count: usize) -> Self {
        self.item_count = item_count;
        self
    }

    /// Set the failure probability and whether failures are injected at all.
    pub fn with_failures(mut self, probability: f64, redundancy_enabled: bool) -> Self {
        self.failure_probability = probability;
        self.redundancy_enabled = redundancy_enabled;
        self
    }

    pub fn with_success_threshold(mut self, threshold: f64) -> Self {
        self.success_threshold = threshold;
        self
    }

    pub fn with_service_speed_ratio(mut self, ratio: f64) -> Self {
        self.service_speed_ratio = ratio;
        self
    }

    pub fn with_item_radius(mut self, radius: f64) -> Self {
        self.item_radius = Some(radius);
        self
    }

    pub fn with_tick(mut self, tick_seconds: f64) -> Self {
        self.tick_seconds = tick_seconds;
        self
    }

    pub fn with_time_scale(mut self, time_scale: f64) -> Self {
        self.time_scale = time_scale;
        self
    }

    /// Arm speed (cm/s).
    pub fn service_speed(&self) -> f64 {
        self.service_speed_ratio * self.box_size
    }

    /// Simulated time for the box to clear the whole belt.
    pub fn transit_seconds(&self) -> f64 {
        (self.belt_length + self.box_size) / self.belt_speed
    }

    /// Half-side of the square items are seeded in.
    ///
    /// Defaults to 80% of [`zones::reach_radius`], which for the default
    /// geometry is about 7.07 cm, capped at half the box so fruit never
    /// lands outside it.
    pub fn effective_item_radius(&self) -> f64 {
        self.item_radius.unwrap_or_else(|| {
            let reach = zones::reach_radius(self.service_speed(), self.box_size, self.belt_speed);
            (DEFAULT_RADIUS_FRACTION * reach).min(self.box_size / 2.0)
        })
    }

    /// Check every range and capacity rule.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let positives = [
            ("belt_speed", self.belt_speed),
            ("box_size", self.box_size),
            ("belt_length", self.belt_length),
            ("service_speed_ratio", self.service_speed_ratio),
            ("tick_seconds", self.tick_seconds),
            ("time_scale", self.time_scale),
        ];
        for (field, value) in positives {
            if !(value.is_finite() && value > 0.0) {
                return Err(ValidationError::NonPositive { field, value });
            }
        }
        let bounded = [
            ("time_scale", self.time_scale, MIN_TIME_SCALE, f64::MAX),
            ("tick_seconds", self.tick_seconds, 0.0, MAX_TICK_SECONDS),
        ];
        for (field, value, min, max) in bounded {
            if !(min..=max).contains(&value) {
                return Err(ValidationError::OutOfRange {
                    field,
                    value,
                    min,
                    max,
                });
            }
        }
        if !(0.0..=1.0).contains(&self.failure_probability) {
            return Err(ValidationError::ProbabilityOutOfRange(
                self.failure_probability,
            ));
        }
        if !(self.success_threshold > 0.0 && self.success_threshold <= 1.0) {
            return Err(ValidationError::ThresholdOutOfRange(self.success_threshold));
        }
        if self.robot_count > MAX_ROBOTS {
            return Err(ValidationError::TooManyRobots {
                count: self.robot_count,
                max: MAX_ROBOTS,
            });
        }
        if self.item_count > MAX_ITEMS {
            return Err(ValidationError::TooManyItems {
                count: self.item_count,
                max: MAX_ITEMS,
            });
        }
        if let Some(radius) = self.item_radius {
            if !(radius.is_finite() && radius > 0.0) {
                return Err(ValidationError::NonPositive {
                    field: "item_radius",
                    value: radius,
                });
            }
            let reach = zones::reach_radius(self.service_speed(), self.box_size, self.belt_speed);
            if radius > reach {
                return Err(ValidationError::RadiusOutOfBounds {
                    radius,
                    bound: reach,
                    reason: "not serviceable within one zone transit",
                });
            }
            let half_box = self.box_size / 2.0;
            if radius > half_box {
                return Err(ValidationError::RadiusOutOfBounds {
                    radius,
                    bound: half_box,
                    reason: "outside the box",
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.service_speed(), 5.0);
        assert_eq!(config.transit_seconds(), 25.0);
    }

    #[test]
    fn default_radius_is_close_to_seven_cm() {
        let radius = SessionConfig::default().effective_item_radius();
        assert!((radius - 7.07).abs() < 0.01, "radius={radius}");
    }

    #[test]
    fn default_radius_stays_inside_slow_belt_box() {
        // Reach on a 1 cm/s belt is ~88 cm, far wider than the box.
        let config = SessionConfig::new(1.0, 50.0, 10.0, 1).with_items(MAX_ITEMS);
        assert!(config.validate().is_ok());
        assert_eq!(config.effective_item_radius(), 25.0);
        let explicit = config.clone().with_item_radius(config.effective_item_radius());
        assert!(explicit.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_physical_parameters() {
        let config = SessionConfig::new(0.0, 50.0, 200.0, 5);
        assert_eq!(
            config.validate(),
            Err(ValidationError::NonPositive {
                field: "belt_speed",
                value: 0.0
            })
        );
        let config = SessionConfig::new(10.0, -1.0, 200.0, 5);
        assert!(matches!(
            config.validate(),
            Err(ValidationError::NonPositive {
                field: "box_size",
                ..
            })
        ));
        let config = SessionConfig::new(10.0, 50.0, f64::NAN, 5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_probability_outside_unit_interval() {
        let config = SessionConfig::default().with_failures(1.5, true);
        assert_eq!(
            config.validate(),
            Err(ValidationError::ProbabilityOutOfRange(1.5))
        );
        let config = SessionConfig::default().with_failures(1.0, true);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_capacity_overflow() {
        let config = SessionConfig::default().with_robots(MAX_ROBOTS + 1);
        assert!(matches!(
            config.validate(),
            Err(ValidationError::TooManyRobots { count: 21, max: 20 })
        ));
        let config = SessionConfig::default().with_items(MAX_ITEMS + 1);
        assert!(matches!(
            config.validate(),
            Err(ValidationError::TooManyItems { .. })
        ));
    }

    #[test]
    fn rejects_unreachable_radius() {
        let config = SessionConfig::default().with_item_radius(20.0);
        assert!(matches!(
            config.validate(),
            Err(ValidationError::RadiusOutOfBounds { .. })
        ));
        let config = SessionConfig::default().with_item_radius(5.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_pacing_that_overflows_sleeps() {
        let config = SessionConfig::default().with_time_scale(1e-30);
        assert!(matches!(
            config.validate(),
            Err(ValidationError::OutOfRange {
                field: "time_scale",
                ..
            })
        ));
        let config = SessionConfig::default().with_tick(5.0);
        assert!(matches!(
            config.validate(),
            Err(ValidationError::OutOfRange {
                field: "tick_seconds",
                ..
            })
        ));
        let config = SessionConfig::default().with_time_scale(MIN_TIME_SCALE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_threshold() {
        let config = SessionConfig::default().with_success_threshold(0.0);
        assert_eq!(
            config.validate(),
            Err(ValidationError::ThresholdOutOfRange(0.0))
        );
    }
}
