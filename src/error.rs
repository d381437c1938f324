//! Error types for the engine and the search driver.

use std::io;

use thiserror::Error;

use crate::types::RobotId;

/// A configuration rejected before any resource is acquired.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be > 0 (got {value})")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be within [{min}, {max}] (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("failure probability must be within [0, 1] (got {0})")]
    ProbabilityOutOfRange(f64),

    #[error("success threshold must be within (0, 1] (got {0})")]
    ThresholdOutOfRange(f64),

    #[error("robot count {count} exceeds capacity {max}")]
    TooManyRobots { count: usize, max: usize },

    #[error("item count {count} exceeds capacity {max}")]
    TooManyItems { count: usize, max: usize },

    #[error("item radius {radius} exceeds bound {bound} ({reason})")]
    RadiusOutOfBounds {
        radius: f64,
        bound: f64,
        reason: &'static str,
    },

    #[error("repetitions must be > 0")]
    NoRepetitions,
}

/// Errors raised while running a simulation session.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    /// The shared world region could not be allocated.
    #[error("failed to acquire {resource}: {reason}")]
    ResourceAcquisition {
        resource: &'static str,
        reason: String,
    },

    #[error("failed to spawn worker for robot {robot}: {source}")]
    WorkerSpawn {
        robot: RobotId,
        #[source]
        source: io::Error,
    },

    /// The session was already torn down.
    #[error("session already released")]
    SessionReleased,
}

/// Errors raised by the parameter-search driver.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),

    #[error("invalid sweep range {min}..={max} step {step}")]
    InvalidRange { min: usize, max: usize, step: usize },
}

impl From<ValidationError> for SearchError {
    fn from(err: ValidationError) -> Self {
        SearchError::Engine(EngineError::Validation(err))
    }
}
