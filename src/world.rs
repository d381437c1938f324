//! Shared world state behind a single mutex.
//!
//! Every read and write from the belt controller and the robot workers goes
//! through one of the methods below, each of which holds the lock only for
//! field access. Simulated delays always happen with the lock released.

use std::sync::{Mutex, MutexGuard};

use crate::error::EngineError;
use crate::types::{Item, ItemId, Robot, RobotId};
use crate::zones::Zone;

/// The whole mutable record of a running session.
#[derive(Debug)]
pub struct WorldState {
    items: Vec<Item>,
    robots: Vec<Robot>,
    /// Monotonically non-decreasing.
    box_position: f64,
    belt_speed: f64,
    completed: bool,
    active: bool,
}

/// What a robot sees when it polls the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RobotView {
    pub active: bool,
    pub failed: bool,
    pub box_position: f64,
}

/// A claim granted to a robot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Claim {
    pub item: ItemId,
    /// Simulated seconds the robot needs to label the item.
    pub service_time: f64,
}

/// Result of trying to write a label after the service wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelOutcome {
    Labeled,
    /// The robot failed mid-service; the item keeps its claim unlabeled.
    RobotFailed,
    /// The session stopped mid-service.
    Inactive,
}

/// State read back by the belt controller at the end of a tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    pub box_position: f64,
    pub completed: bool,
    pub active: bool,
    pub newly_failed: Vec<RobotId>,
}

/// Final snapshot handed back to the caller.
#[derive(Clone, Debug)]
pub struct WorldSnapshot {
    pub items: Vec<Item>,
    pub robots: Vec<Robot>,
    pub box_position: f64,
    pub completed: bool,
}

impl WorldSnapshot {
    pub fn labeled_count(&self) -> usize {
        self.items.iter().filter(|item| item.labeled).count()
    }
}

/// The shared region: world state plus the one lock guarding it.
pub struct World {
    state: Mutex<WorldState>,
}

impl World {
    /// Allocate the region for the given items and robots.
    ///
    /// Storage is reserved up front; a failed reservation is reported instead
    /// of aborting. With no items the box is complete from the start.
    pub fn new(items: &[Item], robots: &[Robot], belt_speed: f64) -> Result<Self, EngineError> {
        let mut item_table = Vec::new();
        item_table
            .try_reserve_exact(items.len())
            .map_err(|err| EngineError::ResourceAcquisition {
                resource: "item table",
                reason: err.to_string(),
            })?;
        item_table.extend_from_slice(items);

        let mut robot_table = Vec::new();
        robot_table
            .try_reserve_exact(robots.len())
            .map_err(|err| EngineError::ResourceAcquisition {
                resource: "robot table",
                reason: err.to_string(),
            })?;
        robot_table.extend_from_slice(robots);

        Ok(Self {
            state: Mutex::new(WorldState {
                completed: item_table.is_empty(),
                items: item_table,
                robots: robot_table,
                box_position: 0.0,
                belt_speed,
                active: true,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, WorldState> {
        self.state.lock().expect("world mutex poisoned")
    }

    /// Consistent snapshot of the fields a robot polls.
    pub fn observe(&self, robot: RobotId) -> RobotView {
        let guard = self.lock();
        RobotView {
            active: guard.active,
            failed: guard.robots.get(robot).is_none_or(|r| r.failed),
            box_position: guard.box_position,
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Claim the first unclaimed, unlabeled item that fits the time budget.
    ///
    /// The availability check and the claim happen in one critical section.
    /// Items are scanned in index order; the first fit wins.
    pub fn try_claim(&self, robot: RobotId, zone: &Zone, service_speed: f64) -> Option<Claim> {
        let mut guard = self.lock();
        let state = &mut *guard;
        if !state.active || state.robots.get(robot).is_none_or(|r| r.failed) {
            return None;
        }
        let box_position = state.box_position;
        if !zone.contains(box_position) {
            return None;
        }
        let remaining = zone.time_remaining(box_position, state.belt_speed);
        for (index, item) in state.items.iter_mut().enumerate() {
            if !item.is_claimable() {
                continue;
            }
            let service_time = item.service_time(service_speed);
            if service_time <= remaining {
                item.claimed_by = Some(robot);
                return Some(Claim {
                    item: index,
                    service_time,
                });
            }
        }
        None
    }

    /// Write the label for an item claimed by `robot`.
    pub fn complete_label(&self, robot: RobotId, item: ItemId) -> LabelOutcome {
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.robots.get(robot).is_none_or(|r| r.failed) {
            return LabelOutcome::RobotFailed;
        }
        if !state.active {
            return LabelOutcome::Inactive;
        }
        let now = state.box_position / state.belt_speed;
        let Some(entry) = state.items.get_mut(item) else {
            debug_assert!(false, "label for unknown item {item}");
            return LabelOutcome::Inactive;
        };
        debug_assert_eq!(entry.claimed_by, Some(robot), "label by non-owner");
        entry.labeled = true;
        entry.label_timestamp = Some(now);
        LabelOutcome::Labeled
    }

    /// Mark the box complete if every item is labeled.
    pub fn mark_completed_if_done(&self) -> bool {
        let mut guard = self.lock();
        if guard.items.iter().all(|item| item.labeled) {
            guard.completed = true;
        }
        guard.completed
    }

    /// One controller tick: advance the box, draw failures, read flags.
    ///
    /// `fail` is consulted once per operational robot.
    pub fn advance<F>(&self, distance: f64, mut fail: F) -> TickReport
    where
        F: FnMut(RobotId) -> bool,
    {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.box_position += distance.max(0.0);
        let mut newly_failed = Vec::new();
        for robot in state.robots.iter_mut().filter(|r| !r.failed) {
            if fail(robot.id) {
                robot.failed = true;
                newly_failed.push(robot.id);
            }
        }
        TickReport {
            box_position: state.box_position,
            completed: state.completed,
            active: state.active,
            newly_failed,
        }
    }

    /// Clear the active flag; workers stop at their next poll.
    pub fn deactivate(&self) {
        self.lock().active = false;
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let guard = self.lock();
        WorldSnapshot {
            items: guard.items.clone(),
            robots: guard.robots.clone(),
            box_position: guard.box_position,
            completed: guard.completed,
        }
    }
}
