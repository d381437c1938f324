//! Belt zone geometry and robot placement.

use crate::types::{Robot, RobotId};

/// Closed interval of box positions within which a robot can act.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Zone {
    pub start: f64,
    pub end: f64,
}

impl Zone {
    /// Zone of width `box_size` centred on `belt_position`.
    pub fn centred(belt_position: f64, box_size: f64) -> Self {
        let half = box_size / 2.0;
        Self {
            start: belt_position - half,
            end: belt_position + half,
        }
    }

    pub fn contains(&self, box_position: f64) -> bool {
        box_position >= self.start && box_position <= self.end
    }

    /// Simulated seconds until the box leaves the zone.
    pub fn time_remaining(&self, box_position: f64, belt_speed: f64) -> f64 {
        (self.end - box_position) / belt_speed
    }

    /// True once the box is more than `margin` past the zone end.
    pub fn passed_by(&self, box_position: f64, margin: f64) -> bool {
        box_position > self.end + margin
    }
}

/// Evenly spaced belt position of robot `index` out of `robot_count`.
pub fn belt_position(belt_length: f64, robot_count: usize, index: RobotId) -> f64 {
    belt_length / robot_count as f64 * (index as f64 + 0.5)
}

/// Lay out `robot_count` operational robots along the belt.
pub fn layout_robots(belt_length: f64, box_size: f64, robot_count: usize) -> Vec<Robot> {
    (0..robot_count)
        .map(|id| {
            let position = belt_position(belt_length, robot_count, id);
            Robot {
                id,
                belt_position: position,
                zone: Zone::centred(position, box_size),
                failed: false,
            }
        })
        .collect()
}

/// Largest square half-side whose corner is serviceable in one zone transit.
///
/// A full transit lasts `box_size / belt_speed`; servicing an item at
/// distance `d` takes `2d / service_speed`, and the square corner sits at
/// `r * sqrt(2)`.
pub fn reach_radius(service_speed: f64, box_size: f64, belt_speed: f64) -> f64 {
    service_speed * box_size / (2.0 * std::f64::consts::SQRT_2 * belt_speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn robots_are_evenly_spaced() {
        let robots = layout_robots(200.0, 50.0, 4);
        let positions: Vec<f64> = robots.iter().map(|r| r.belt_position).collect();
        assert_eq!(positions, vec![25.0, 75.0, 125.0, 175.0]);
        assert_eq!(robots[1].zone, Zone { start: 50.0, end: 100.0 });
        assert!(robots.iter().all(|r| !r.failed));
    }

    #[test]
    fn no_robots_yields_empty_layout() {
        assert!(layout_robots(200.0, 50.0, 0).is_empty());
    }

    #[test]
    fn zone_bounds_are_inclusive() {
        let zone = Zone::centred(100.0, 50.0);
        assert!(zone.contains(75.0));
        assert!(zone.contains(125.0));
        assert!(!zone.contains(125.1));
        assert!(!zone.contains(74.9));
    }

    #[test]
    fn time_remaining_shrinks_as_box_advances() {
        let zone = Zone::centred(100.0, 50.0);
        assert_eq!(zone.time_remaining(75.0, 10.0), 5.0);
        assert_eq!(zone.time_remaining(120.0, 10.0), 0.5);
        assert!(!zone.passed_by(170.0, 50.0));
        assert!(zone.passed_by(175.5, 50.0));
    }

    #[test]
    fn reach_radius_corner_fits_transit() {
        let radius = reach_radius(5.0, 50.0, 10.0);
        let corner = radius * std::f64::consts::SQRT_2;
        let service = 2.0 * corner / 5.0;
        assert!((service - 5.0).abs() < 1e-9);
    }
}
