//! Per-robot worker loop.

use std::io;
use std::sync::Arc;
use std::thread;

use tracing::{debug, trace};

use crate::clock::{FAILED_BACKOFF_S, IDLE_POLL_S, LOOP_PAUSE_S, SimClock};
use crate::types::{ItemId, RobotId};
use crate::world::{LabelOutcome, World};
use crate::zones::Zone;

/// Why a worker loop returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerExit {
    /// The session cleared `active`.
    Deactivated,
    /// The box moved past this robot's zone.
    PassedZone { completed: bool },
}

/// One robot polling the shared world from its own thread.
pub struct RobotWorker {
    id: RobotId,
    zone: Zone,
    box_size: f64,
    service_speed: f64,
    world: Arc<World>,
    clock: SimClock,
}

impl RobotWorker {
    pub fn new(
        id: RobotId,
        zone: Zone,
        box_size: f64,
        service_speed: f64,
        world: Arc<World>,
        clock: SimClock,
    ) -> Self {
        Self {
            id,
            zone,
            box_size,
            service_speed,
            world,
            clock,
        }
    }

    pub fn id(&self) -> RobotId {
        self.id
    }

    /// Start the worker on a thread named `robot-<id>`.
    pub fn spawn(self) -> io::Result<thread::JoinHandle<WorkerExit>> {
        thread::Builder::new()
            .name(format!("robot-{}", self.id))
            .spawn(move || self.run())
    }

    /// Poll, claim, service and label until the session stops or the box
    /// has left this robot behind.
    pub fn run(self) -> WorkerExit {
        debug!(
            robot = self.id,
            zone_start = self.zone.start,
            zone_end = self.zone.end,
            "robot started"
        );
        let exit = loop {
            let view = self.world.observe(self.id);
            if !view.active {
                break WorkerExit::Deactivated;
            }
            // Permanent: a failed robot only waits for the session to end.
            if view.failed {
                self.clock.pause(FAILED_BACKOFF_S);
                continue;
            }

            if self.zone.contains(view.box_position) {
                match self.world.try_claim(self.id, &self.zone, self.service_speed) {
                    Some(claim) => {
                        self.service(claim.item, claim.service_time);
                    }
                    None => self.clock.pause(IDLE_POLL_S),
                }
            } else {
                self.clock.pause(IDLE_POLL_S);
            }

            if self.zone.passed_by(view.box_position, self.box_size) {
                let completed = self.world.mark_completed_if_done();
                break WorkerExit::PassedZone { completed };
            }

            self.clock.pause(LOOP_PAUSE_S);
        };
        debug!(robot = self.id, ?exit, "robot stopped");
        exit
    }

    /// Wait out the service time with the lock released, then label.
    ///
    /// The wait is sliced so a stopped session or a failure of this robot
    /// is noticed within one poll.
    fn service(&self, item: ItemId, service_time: f64) -> LabelOutcome {
        let mut remaining = service_time;
        while remaining > 0.0 {
            let slice = remaining.min(IDLE_POLL_S);
            self.clock.pause(slice);
            remaining -= slice;
            let view = self.world.observe(self.id);
            if !view.active || view.failed {
                break;
            }
        }
        let outcome = self.world.complete_label(self.id, item);
        match outcome {
            LabelOutcome::Labeled => {
                debug!(robot = self.id, item, service_time, "item labeled");
            }
            LabelOutcome::RobotFailed => {
                debug!(robot = self.id, item, "robot failed mid-service, item left claimed");
            }
            LabelOutcome::Inactive => {
                trace!(robot = self.id, item, "session stopped mid-service");
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Item;
    use crate::zones::layout_robots;
    use std::time::Duration;

    fn fast_clock() -> SimClock {
        SimClock::new(100.0)
    }

    #[test]
    fn worker_labels_items_inside_its_zone() {
        let robots = layout_robots(200.0, 50.0, 1);
        let zone = robots[0].zone;
        let items = vec![Item::new(1.0, 0.0), Item::new(0.0, 2.0)];
        let world = Arc::new(World::new(&items, &robots, 10.0).expect("world"));
        // Park the box at the robot position.
        world.advance(100.0, |_| false);

        let worker = RobotWorker::new(0, zone, 50.0, 5.0, Arc::clone(&world), fast_clock());
        let handle = worker.spawn().expect("spawn worker");

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while world.snapshot().labeled_count() < 2 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        world.deactivate();
        assert_eq!(handle.join().expect("worker panicked"), WorkerExit::Deactivated);

        let snapshot = world.snapshot();
        assert_eq!(snapshot.labeled_count(), 2);
        assert!(snapshot.items.iter().all(|item| item.claimed_by == Some(0)));
    }

    #[test]
    fn worker_marks_completion_after_passing_zone() {
        let robots = layout_robots(200.0, 50.0, 1);
        let zone = robots[0].zone;
        let world = Arc::new(World::new(&[], &robots, 10.0).expect("world"));
        world.advance(500.0, |_| false);

        let worker = RobotWorker::new(0, zone, 50.0, 5.0, Arc::clone(&world), fast_clock());
        let exit = worker.run();
        assert_eq!(exit, WorkerExit::PassedZone { completed: true });
    }

    #[test]
    fn worker_leaves_unlabeled_box_incomplete() {
        let robots = layout_robots(200.0, 50.0, 1);
        let zone = robots[0].zone;
        let world = Arc::new(World::new(&[Item::new(1.0, 1.0)], &robots, 10.0).expect("world"));
        world.advance(500.0, |_| false);

        let worker = RobotWorker::new(0, zone, 50.0, 5.0, Arc::clone(&world), fast_clock());
        assert_eq!(worker.run(), WorkerExit::PassedZone { completed: false });
        assert!(!world.snapshot().completed);
    }

    #[test]
    fn failed_worker_never_claims() {
        let robots = layout_robots(200.0, 50.0, 1);
        let zone = robots[0].zone;
        let world = Arc::new(World::new(&[Item::new(0.0, 0.0)], &robots, 10.0).expect("world"));
        world.advance(100.0, |_| true);

        let worker = RobotWorker::new(0, zone, 50.0, 5.0, Arc::clone(&world), fast_clock());
        let handle = worker.spawn().expect("spawn worker");
        thread::sleep(Duration::from_millis(20));
        world.deactivate();
        assert_eq!(handle.join().expect("worker panicked"), WorkerExit::Deactivated);
        assert_eq!(world.snapshot().items[0].claimed_by, None);
    }

    #[test]
    fn failure_mid_service_abandons_item() {
        let robots = layout_robots(200.0, 50.0, 1);
        let zone = robots[0].zone;
        let world = Arc::new(World::new(&[Item::new(1.0, 0.0)], &robots, 10.0).expect("world"));
        world.advance(100.0, |_| false);
        // 2 simulated seconds of service at real-time pacing.
        let claim = world.try_claim(0, &zone, 1.0).expect("claim");
        assert_eq!(claim.service_time, 2.0);

        let failer = {
            let world = Arc::clone(&world);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                world.advance(0.0, |_| true);
            })
        };
        let worker = RobotWorker::new(0, zone, 50.0, 1.0, Arc::clone(&world), SimClock::new(1.0));
        let start = std::time::Instant::now();
        let outcome = worker.service(claim.item, claim.service_time);
        failer.join().expect("failer panicked");

        assert_eq!(outcome, LabelOutcome::RobotFailed);
        assert!(start.elapsed() < Duration::from_secs(1), "took {:?}", start.elapsed());
        let item = &world.snapshot().items[0];
        assert!(!item.labeled);
        assert_eq!(item.claimed_by, Some(0));
    }
}
