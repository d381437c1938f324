//! Session lifecycle: allocate the world, spawn robots, run the belt, tear
//! everything down exactly once.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info, warn};

use crate::belt::{BeltController, BeltState};
use crate::clock::SimClock;
use crate::config::SessionConfig;
use crate::error::EngineError;
use crate::failure::FailureModel;
use crate::robot::{RobotWorker, WorkerExit};
use crate::types::{Item, RobotId};
use crate::world::World;
use crate::zones::layout_robots;

/// Shared flag used to stop a running session from another thread.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Final state of one robot.
#[derive(Clone, Debug, PartialEq)]
pub struct RobotStatus {
    pub id: RobotId,
    pub belt_position: f64,
    pub failed: bool,
    pub labeled: usize,
}

/// Everything the caller learns from a finished session.
#[derive(Clone, Debug)]
pub struct SessionOutcome {
    pub success: bool,
    pub labeled: usize,
    pub item_count: usize,
    pub end_state: BeltState,
    /// Simulated seconds the belt ran.
    pub sim_seconds: f64,
    pub wall: Duration,
    pub robots: Vec<RobotStatus>,
    pub items: Vec<Item>,
}

impl SessionOutcome {
    pub fn failed_robots(&self) -> usize {
        self.robots.iter().filter(|r| r.failed).count()
    }
}

/// Whether `labeled` out of `item_count` meets `threshold`.
pub fn meets_threshold(labeled: usize, item_count: usize, threshold: f64) -> bool {
    if item_count == 0 {
        return true;
    }
    labeled as f64 / item_count as f64 >= threshold
}

/// Seed `count` items uniformly in the square `[-radius, radius]^2`.
pub fn seed_items<R: Rng>(rng: &mut R, count: usize, radius: f64) -> Vec<Item> {
    (0..count)
        .map(|_| {
            Item::new(
                rng.gen_range(-radius..=radius),
                rng.gen_range(-radius..=radius),
            )
        })
        .collect()
}

/// A started session: the shared world plus its robot threads.
///
/// Teardown runs at most once no matter how many paths request it, and
/// always runs on drop.
pub struct SessionHandle {
    config: SessionConfig,
    cancel: CancelToken,
    world: Mutex<Option<Arc<World>>>,
    workers: Mutex<Vec<thread::JoinHandle<WorkerExit>>>,
    released: AtomicBool,
}

impl SessionHandle {
    /// Validate, allocate the world, seed items and spawn one worker per robot.
    pub fn start(config: SessionConfig) -> Result<Self, EngineError> {
        Self::start_with_cancel(config, CancelToken::new())
    }

    pub fn start_with_cancel(config: SessionConfig, cancel: CancelToken) -> Result<Self, EngineError> {
        Self::start_with_spawner(config, cancel, RobotWorker::spawn)
    }

    /// Like [`start_with_cancel`](Self::start_with_cancel), with the thread
    /// launch supplied by the caller.
    ///
    /// If any spawn fails, the workers already running are stopped and
    /// joined before the error is returned.
    pub fn start_with_spawner<S>(
        config: SessionConfig,
        cancel: CancelToken,
        mut spawn: S,
    ) -> Result<Self, EngineError>
    where
        S: FnMut(RobotWorker) -> io::Result<thread::JoinHandle<WorkerExit>>,
    {
        config.validate()?;

        let robots = layout_robots(config.belt_length, config.box_size, config.robot_count);
        let items = seed_items(
            &mut rand::thread_rng(),
            config.item_count,
            config.effective_item_radius(),
        );
        let world = Arc::new(World::new(&items, &robots, config.belt_speed)?);

        let handle = Self {
            config,
            cancel,
            world: Mutex::new(Some(Arc::clone(&world))),
            workers: Mutex::new(Vec::with_capacity(robots.len())),
            released: AtomicBool::new(false),
        };

        let clock = SimClock::new(handle.config.time_scale);
        let service_speed = handle.config.service_speed();
        for robot in &robots {
            let worker = RobotWorker::new(
                robot.id,
                robot.zone,
                handle.config.box_size,
                service_speed,
                Arc::clone(&world),
                clock,
            );
            match spawn(worker) {
                Ok(join) => handle.lock_workers().push(join),
                Err(source) => {
                    warn!(robot = robot.id, error = %source, "worker spawn failed");
                    // Stops and joins the workers already running.
                    handle.teardown();
                    return Err(EngineError::WorkerSpawn {
                        robot: robot.id,
                        source,
                    });
                }
            }
        }

        info!(
            robots = handle.config.robot_count,
            items = handle.config.item_count,
            belt_speed = handle.config.belt_speed,
            box_size = handle.config.box_size,
            redundancy = handle.config.redundancy_enabled,
            "session started"
        );
        Ok(handle)
    }

    fn lock_workers(&self) -> std::sync::MutexGuard<'_, Vec<thread::JoinHandle<WorkerExit>>> {
        self.workers.lock().expect("worker list mutex poisoned")
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The shared world, or `None` after teardown.
    pub fn world(&self) -> Option<Arc<World>> {
        self.world.lock().expect("world slot mutex poisoned").clone()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Stop the session from outside; the belt notices on its next tick.
    pub fn cancel(&self) {
        self.cancel.cancel();
        if let Some(world) = self.world() {
            world.deactivate();
        }
    }

    /// Clear `active` and wait for every worker thread.
    fn join_workers(&self) {
        if let Some(world) = self.world() {
            world.deactivate();
        }
        let handles: Vec<_> = self.lock_workers().drain(..).collect();
        for handle in handles {
            match handle.join() {
                Ok(exit) => debug!(?exit, "worker joined"),
                Err(_) => warn!("robot worker panicked"),
            }
        }
    }

    /// Run the belt to a terminal state and collect the outcome.
    ///
    /// Every exit path ends in the same teardown.
    pub fn run(&self) -> Result<SessionOutcome, EngineError> {
        let world = self.world().ok_or(EngineError::SessionReleased)?;
        let started = Instant::now();
        let mut belt = BeltController::new(
            Arc::clone(&world),
            self.config.belt_speed,
            self.config.tick_seconds,
            self.config.transit_seconds(),
            FailureModel::new(
                self.config.redundancy_enabled,
                self.config.failure_probability,
            ),
            SimClock::new(self.config.time_scale),
            self.cancel.clone(),
            rand::thread_rng(),
        );
        let end_state = belt.run();
        self.join_workers();

        let snapshot = world.snapshot();
        let labeled = snapshot.labeled_count();
        let robots = snapshot
            .robots
            .iter()
            .map(|robot| RobotStatus {
                id: robot.id,
                belt_position: robot.belt_position,
                failed: robot.failed,
                labeled: snapshot
                    .items
                    .iter()
                    .filter(|item| item.labeled && item.claimed_by == Some(robot.id))
                    .count(),
            })
            .collect();
        let outcome = SessionOutcome {
            success: meets_threshold(labeled, snapshot.items.len(), self.config.success_threshold),
            labeled,
            item_count: snapshot.items.len(),
            end_state,
            sim_seconds: belt.elapsed(),
            wall: started.elapsed(),
            robots,
            items: snapshot.items,
        };
        drop(world);
        self.teardown();

        info!(
            labeled = outcome.labeled,
            items = outcome.item_count,
            success = outcome.success,
            state = %outcome.end_state,
            "session finished"
        );
        Ok(outcome)
    }

    /// Release the world and stop all workers.
    ///
    /// Idempotent and safe to call concurrently; only the first call does
    /// the work.
    pub fn teardown(&self) {
        if self
            .released
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        self.join_workers();
        let released = self.world.lock().expect("world slot mutex poisoned").take();
        debug!(released = released.is_some(), "session torn down");
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Run one full session to completion.
pub fn run_session(config: &SessionConfig) -> Result<SessionOutcome, EngineError> {
    run_session_with_cancel(config, CancelToken::new())
}

/// Run one full session that stops early once `cancel` is set.
pub fn run_session_with_cancel(
    config: &SessionConfig,
    cancel: CancelToken,
) -> Result<SessionOutcome, EngineError> {
    let session = SessionHandle::start_with_cancel(config.clone(), cancel)?;
    session.run()
}
