//! Concurrent simulation of a fruit-labeling production cell.
//!
//! A belt controller advances a box past a row of robot arms; every arm runs
//! on its own thread and claims items from one mutex-guarded world state.
//! [`run_session`] runs one box transit; [`search`] repeats sessions to size
//! the robot line.

pub mod belt;
pub mod clock;
pub mod config;
pub mod error;
pub mod failure;
pub mod logging;
pub mod robot;
pub mod search;
pub mod session;
pub mod signals;
pub mod types;
pub mod world;
pub mod zones;

pub use belt::BeltState;
pub use config::{MAX_ITEMS, MAX_ROBOTS, SessionConfig};
pub use error::{EngineError, SearchError, ValidationError};
pub use session::{
    CancelToken, RobotStatus, SessionHandle, SessionOutcome, run_session, run_session_with_cancel,
};
