//! Whole-session properties with compressed simulated time.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use mango_line::{
    BeltState, CancelToken, SessionConfig, SessionHandle, run_session, run_session_with_cancel,
};

fn reference_line() -> SessionConfig {
    SessionConfig::new(10.0, 50.0, 200.0, 10)
        .with_items(10)
        .with_time_scale(20.0)
}

#[test]
fn reference_line_labels_everything_most_runs() {
    let config = reference_line();
    let mut successes = 0;
    for _ in 0..10 {
        let outcome = run_session(&config).expect("session");
        assert!(outcome.labeled <= outcome.item_count);
        if outcome.success {
            assert_eq!(outcome.labeled, 10);
            assert_eq!(outcome.end_state, BeltState::Completed);
            successes += 1;
        }
    }
    assert!(successes >= 9, "only {successes}/10 runs succeeded");
}

#[test]
fn claims_are_exclusive_and_labels_consistent() {
    let outcome = run_session(&reference_line()).expect("session");
    for item in &outcome.items {
        if item.labeled {
            assert!(item.claimed_by.is_some());
            assert!(item.label_timestamp.is_some());
        } else {
            assert!(item.label_timestamp.is_none());
        }
    }
    let per_robot: usize = outcome.robots.iter().map(|r| r.labeled).sum();
    assert_eq!(per_robot, outcome.labeled);
}

#[test]
fn empty_box_succeeds_immediately() {
    let config = reference_line().with_items(0);
    let started = Instant::now();
    let outcome = run_session(&config).expect("session");
    assert!(outcome.success);
    assert_eq!(outcome.labeled, 0);
    assert_eq!(outcome.end_state, BeltState::Completed);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn no_robots_never_succeeds() {
    let config = SessionConfig::new(10.0, 10.0, 20.0, 0)
        .with_items(5)
        .with_time_scale(50.0);
    let outcome = run_session(&config).expect("session");
    assert!(!outcome.success);
    assert_eq!(outcome.labeled, 0);
    assert_eq!(outcome.end_state, BeltState::Exhausted);
    assert!(outcome.robots.is_empty());
}

#[test]
fn failures_require_redundancy() {
    let config = SessionConfig::new(10.0, 50.0, 100.0, 4)
        .with_items(50)
        .with_failures(1.0, false)
        .with_time_scale(100.0);
    for _ in 0..3 {
        let outcome = run_session(&config).expect("session");
        assert_eq!(outcome.failed_robots(), 0);
    }
}

#[test]
fn certain_failure_rate_fails_every_robot() {
    // Fifty items cannot all be labeled, so the belt runs the full 25 s
    // transit: 500 ticks at a 5% per-tick failure chance.
    let config = SessionConfig::new(10.0, 50.0, 200.0, 3)
        .with_items(50)
        .with_failures(1.0, true)
        .with_time_scale(100.0);
    let outcome = run_session(&config).expect("session");
    assert_eq!(outcome.end_state, BeltState::Exhausted);
    assert!(outcome.robots.iter().all(|r| r.failed));
    assert!(!outcome.success);
}

#[test]
fn cancellation_stops_a_long_session() {
    // Real-time transit would take 25 seconds.
    let config = SessionConfig::default().with_robots(6);
    let cancel = CancelToken::new();
    let runner = {
        let cancel = cancel.clone();
        thread::spawn(move || run_session_with_cancel(&config, cancel))
    };
    thread::sleep(Duration::from_millis(200));
    let started = Instant::now();
    cancel.cancel();
    let outcome = runner.join().expect("session thread panicked").expect("session");
    assert_eq!(outcome.end_state, BeltState::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn cancel_and_teardown_race_safely() {
    let session = Arc::new(
        SessionHandle::start(SessionConfig::default().with_time_scale(10.0)).expect("start"),
    );
    let runner = {
        let session = Arc::clone(&session);
        thread::spawn(move || session.run())
    };
    thread::sleep(Duration::from_millis(50));
    session.cancel();
    session.teardown();
    let result = runner.join().expect("session thread panicked");
    // Either the run finished first, or teardown released the world under it.
    if let Ok(outcome) = result {
        assert_eq!(outcome.end_state, BeltState::Cancelled);
    }
    assert!(session.is_released());
    assert!(session.world().is_none());
}
