//! Belt controller: the only writer of box position and robot failures.

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use tracing::{info, warn};

use crate::clock::SimClock;
use crate::failure::FailureModel;
use crate::session::CancelToken;
use crate::world::World;

/// Controller state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BeltState {
    Running,
    /// A robot found every item labeled.
    Completed,
    /// The session was stopped from outside.
    Cancelled,
    /// The box cleared the belt before completion.
    Exhausted,
}

impl BeltState {
    pub fn is_terminal(self) -> bool {
        self != BeltState::Running
    }
}

impl fmt::Display for BeltState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BeltState::Running => "running",
            BeltState::Completed => "completed",
            BeltState::Cancelled => "cancelled",
            BeltState::Exhausted => "exhausted",
        };
        f.write_str(name)
    }
}

/// Advances the box in fixed timesteps until a terminal state is reached.
pub struct BeltController<R> {
    world: Arc<World>,
    belt_speed: f64,
    dt: f64,
    transit_seconds: f64,
    failures: FailureModel,
    clock: SimClock,
    cancel: CancelToken,
    rng: R,
    state: BeltState,
    elapsed: f64,
}

impl<R: Rng> BeltController<R> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        world: Arc<World>,
        belt_speed: f64,
        dt: f64,
        transit_seconds: f64,
        failures: FailureModel,
        clock: SimClock,
        cancel: CancelToken,
        rng: R,
    ) -> Self {
        Self {
            world,
            belt_speed,
            dt,
            transit_seconds,
            failures,
            clock,
            cancel,
            rng,
            state: BeltState::Running,
            elapsed: 0.0,
        }
    }

    pub fn state(&self) -> BeltState {
        self.state
    }

    /// Simulated seconds advanced so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Run one tick and return the resulting state.
    pub fn tick(&mut self) -> BeltState {
        if self.state.is_terminal() {
            return self.state;
        }
        let failures = self.failures;
        let dt = self.dt;
        let rng = &mut self.rng;
        let report = self
            .world
            .advance(self.belt_speed * dt, |_| failures.sample(&mut *rng, dt));
        self.elapsed += dt;
        for robot in &report.newly_failed {
            warn!(robot, box_position = report.box_position, "robot failed");
        }

        self.state = if report.completed {
            BeltState::Completed
        } else if self.elapsed > self.transit_seconds {
            BeltState::Exhausted
        } else if !report.active || self.cancel.is_cancelled() {
            BeltState::Cancelled
        } else {
            BeltState::Running
        };
        self.state
    }

    /// Tick and sleep until a terminal state, then clear `active`.
    pub fn run(&mut self) -> BeltState {
        while !self.tick().is_terminal() {
            self.clock.pause(self.dt);
        }
        self.world.deactivate();
        info!(
            state = %self.state,
            sim_seconds = self.elapsed,
            "belt stopped"
        );
        self.state
    }
}
