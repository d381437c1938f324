//! Mango line parameter search
//!
//! Repeats full sessions to size the robot line.
//!
//! ```bash
//! # Minimum robots for 20 items, 5 sessions per robot count
//! mango_search minimum 20 5
//!
//! # Robots-vs-items curve for 10..=30 items in steps of 5, 3 sessions each
//! mango_search curve 10 30 5 3 --time-scale 20
//!
//! # Redundancy table: 20 items, from 5 robots, 5%/s failures, 5 sessions
//! mango_search redundancy 20 5 0.05 5
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mango_line::search::{
    DEFAULT_TARGET_RATE, EngineRunner, ItemRange, find_minimum_robots, sweep_curve,
    sweep_redundancy,
};
use mango_line::{CancelToken, SessionConfig, logging, signals};
use tracing::{info, warn};

const CURVE_FILE: &str = "robots_vs_items.csv";
const REDUNDANCY_FILE: &str = "redundancy.csv";

/// Search robot counts against success rate.
#[derive(Parser, Debug)]
#[command(name = "mango_search")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    /// Success rate a configuration must reach
    #[arg(long, global = true, default_value_t = DEFAULT_TARGET_RATE)]
    target: f64,

    /// Simulated seconds per wall-clock second
    #[arg(long, global = true, default_value = "1.0")]
    time_scale: f64,

    /// Directory the CSV reports are written to
    #[arg(long, global = true, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Find the minimum robot count for one item count
    Minimum {
        #[arg(default_value = "20")]
        items: usize,
        #[arg(default_value = "5")]
        repetitions: usize,
    },
    /// Minimum robots for a range of item counts
    Curve {
        #[arg(default_value = "10")]
        min_items: usize,
        #[arg(default_value = "30")]
        max_items: usize,
        #[arg(default_value = "5")]
        step: usize,
        #[arg(default_value = "3")]
        repetitions: usize,
    },
    /// Success rate with random robot failures as robots are added
    Redundancy {
        #[arg(default_value = "20")]
        items: usize,
        #[arg(default_value = "5")]
        robots: usize,
        #[arg(default_value = "0.05")]
        failure_probability: f64,
        #[arg(default_value = "5")]
        repetitions: usize,
    },
}

fn create_report(dir: &Path, name: &str) -> Result<BufWriter<File>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;
    let path = dir.join(name);
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    info!(path = %path.display(), "writing report");
    Ok(BufWriter::new(file))
}

fn main() -> Result<()> {
    logging::init(logging::DEFAULT_FILTER);
    let cli = Cli::parse();

    let cancel = CancelToken::new();
    if let Err(err) = signals::install(cancel.clone()) {
        warn!(error = %err, "could not install interrupt handlers");
    }
    let mut runner = EngineRunner::new(cancel);
    let base = SessionConfig::default().with_time_scale(cli.time_scale);

    match cli.mode {
        Mode::Minimum { items, repetitions } => {
            let config = base.with_items(items);
            let search = find_minimum_robots(&mut runner, &config, cli.target, repetitions)?;
            match (search.minimum, search.analysis) {
                (Some(robots), Some(analysis)) => println!(
                    "minimum_robots={robots} success_rate={:.3} mean_runtime_s={:.3}",
                    analysis.success_rate, analysis.mean_runtime_s
                ),
                _ => println!("minimum_robots=NA (no robot count up to the ceiling met the target)"),
            }
        }
        Mode::Curve {
            min_items,
            max_items,
            step,
            repetitions,
        } => {
            let mut out = create_report(&cli.out_dir, CURVE_FILE)?;
            let range = ItemRange {
                min: min_items,
                max: max_items,
                step,
            };
            let rows = sweep_curve(&mut runner, &base, range, repetitions, cli.target, &mut out)?;
            println!("itemCount | minRobots | successRate | meanRuntime");
            for row in rows {
                let minimum = row
                    .minimum_robots
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "NA".to_string());
                println!(
                    "{:>9} | {:>9} | {:>10.1}% | {:>10.2}s",
                    row.item_count,
                    minimum,
                    row.success_rate * 100.0,
                    row.mean_runtime_s
                );
            }
        }
        Mode::Redundancy {
            items,
            robots,
            failure_probability,
            repetitions,
        } => {
            let mut out = create_report(&cli.out_dir, REDUNDANCY_FILE)?;
            let config = base.with_items(items).with_robots(robots);
            let rows = sweep_redundancy(
                &mut runner,
                &config,
                failure_probability,
                repetitions,
                cli.target,
                &mut out,
            )?;
            println!("robots | successRate | meanRuntime");
            for row in rows {
                println!(
                    "{:>6} | {:>10.1}% | {:>10.2}s",
                    row.robot_count,
                    row.success_rate * 100.0,
                    row.mean_runtime_s
                );
            }
        }
    }

    if signals::interrupted() {
        warn!("search interrupted; reports hold the rows finished so far");
    }
    Ok(())
}
