//! Mango line CLI
//!
//! Runs one box transit past the robot line and reports whether enough fruit
//! was labeled.
//!
//! ```bash
//! # 10 cm/s belt, 50 cm box, 200 cm belt, 5 robots, 20 items
//! mango_line 10 50 200 5 20
//!
//! # 8 robots with a 5%/s failure rate and redundancy on, 50x faster
//! mango_line 10 50 200 8 20 0.05 1 --time-scale 50
//! ```
//!
//! Exit codes: 0 success, 1 finished below threshold, 2 invalid input or
//! resource error.

use std::process::ExitCode;

use clap::{ArgAction, Parser};
use mango_line::{CancelToken, SessionConfig, logging, run_session_with_cancel, signals};
use tracing::warn;

/// Simulate one box of fruit passing a row of labeling robots.
#[derive(Parser, Debug)]
#[command(name = "mango_line")]
#[command(version, about, long_about = None, allow_negative_numbers = true)]
struct Args {
    /// Belt speed (cm/s)
    belt_speed: f64,

    /// Side of the square box (cm)
    box_size: f64,

    /// Belt length (cm)
    belt_length: f64,

    /// Number of robots (at most 20)
    robot_count: usize,

    /// Number of items in the box (at most 50)
    #[arg(default_value = "20")]
    item_count: usize,

    /// Failure probability per robot per second (0-1)
    #[arg(default_value = "0.0")]
    failure_probability: f64,

    /// Inject robot failures (0/1/true/false)
    #[arg(default_value = "0", value_parser = parse_flag, action = ArgAction::Set)]
    redundancy_enabled: bool,

    /// Fraction of items that must be labeled
    #[arg(long, default_value = "1.0")]
    threshold: f64,

    /// Simulated seconds per wall-clock second
    #[arg(long, default_value = "1.0")]
    time_scale: f64,
}

fn parse_flag(arg: &str) -> Result<bool, String> {
    match arg.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => match other.parse::<i64>() {
            Ok(value) => Ok(value != 0),
            Err(_) => Err(format!("expected 0/1/true/false, got {arg}")),
        },
    }
}

fn main() -> ExitCode {
    logging::init(logging::DEFAULT_FILTER);
    let args = Args::parse();

    let config = SessionConfig::new(
        args.belt_speed,
        args.box_size,
        args.belt_length,
        args.robot_count,
    )
    .with_items(args.item_count)
    .with_failures(args.failure_probability, args.redundancy_enabled)
    .with_success_threshold(args.threshold)
    .with_time_scale(args.time_scale);

    let cancel = CancelToken::new();
    if let Err(err) = signals::install(cancel.clone()) {
        warn!(error = %err, "could not install interrupt handlers");
    }

    match run_session_with_cancel(&config, cancel) {
        Ok(outcome) => {
            println!("SESSION SUMMARY");
            println!("labeled={}/{}", outcome.labeled, outcome.item_count);
            println!("end_state={}", outcome.end_state);
            println!("sim_seconds={:.2}", outcome.sim_seconds);
            println!("failed_robots={}", outcome.failed_robots());
            println!("success={}", outcome.success);
            if outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}
