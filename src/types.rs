//! Shared identifiers and the item/robot records kept in the world state.

/// Index of an item inside the box.
pub type ItemId = usize;
/// Unique identifier for a robot worker.
pub type RobotId = usize;

/// A piece of fruit inside the box.
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    /// X offset from the box centroid (cm).
    pub x: f64,
    /// Y offset from the box centroid (cm).
    pub y: f64,
    pub labeled: bool,
    /// Robot holding the claim; set once and never changed.
    pub claimed_by: Option<RobotId>,
    /// Simulation time (s) at which the label was applied.
    pub label_timestamp: Option<f64>,
}

impl Item {
    /// Construct an unclaimed, unlabeled item at the given offset.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            labeled: false,
            claimed_by: None,
            label_timestamp: None,
        }
    }

    /// Straight-line distance from the box centroid.
    pub fn distance(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Time for an arm moving at `service_speed` to reach the item and return.
    pub fn service_time(&self, service_speed: f64) -> f64 {
        2.0 * self.distance() / service_speed
    }

    pub fn is_claimable(&self) -> bool {
        self.claimed_by.is_none() && !self.labeled
    }
}

/// A robotic arm at a fixed belt position.
#[derive(Clone, Debug, PartialEq)]
pub struct Robot {
    pub id: RobotId,
    /// Position of the arm along the belt (cm).
    pub belt_position: f64,
    pub zone: crate::zones::Zone,
    /// Monotonic: once true it never resets.
    pub failed: bool,
}
