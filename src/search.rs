//! Parameter search over repeated sessions: minimum robot count, the
//! robots-vs-items curve and the redundancy table.

use std::io::Write;
use std::time::Instant;

use tracing::info;

use crate::config::{MAX_ROBOTS, SessionConfig};
use crate::error::{EngineError, SearchError, ValidationError};
use crate::session::{CancelToken, run_session_with_cancel};

/// Highest robot count tried by [`find_minimum_robots`].
pub const ROBOT_SEARCH_CEILING: usize = 15;
/// How many robots past the base count the redundancy sweep tries.
pub const REDUNDANCY_EXTRA_ROBOTS: usize = 5;
/// Success rate the CLI searches for unless told otherwise.
pub const DEFAULT_TARGET_RATE: f64 = 0.95;

pub const CURVE_HEADER: &str = "itemCount,minimumRobots,successRate,meanRuntime";
pub const REDUNDANCY_HEADER: &str = "robotCount,successRate,meanRuntime";

/// Result of one session as seen by the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSample {
    pub success: bool,
    pub labeled: usize,
}

/// Something that can run a session for a configuration.
pub trait Runner {
    fn run(&mut self, config: &SessionConfig) -> Result<RunSample, EngineError>;

    /// Stop sweeping once this returns true.
    fn cancelled(&self) -> bool {
        false
    }
}

/// Runs real engine sessions.
#[derive(Clone, Debug, Default)]
pub struct EngineRunner {
    cancel: CancelToken,
}

impl EngineRunner {
    pub fn new(cancel: CancelToken) -> Self {
        Self { cancel }
    }
}

impl Runner for EngineRunner {
    fn run(&mut self, config: &SessionConfig) -> Result<RunSample, EngineError> {
        let outcome = run_session_with_cancel(config, self.cancel.clone())?;
        Ok(RunSample {
            success: outcome.success,
            labeled: outcome.labeled,
        })
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Aggregated statistics over repeated sessions of one configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    pub robot_count: usize,
    pub item_count: usize,
    pub successes: usize,
    pub failures: usize,
    pub success_rate: f64,
    /// Mean wall-clock seconds per session.
    pub mean_runtime_s: f64,
    pub cpu_user_s: Option<f64>,
    pub cpu_sys_s: Option<f64>,
}

/// Process CPU time consumed so far, split into user and kernel time.
#[derive(Clone, Copy, Debug, PartialEq)]
struct CpuTimes {
    user: f64,
    sys: f64,
}

impl CpuTimes {
    #[cfg(unix)]
    fn sample() -> Option<Self> {
        let mut usage = std::mem::MaybeUninit::<libc::rusage>::uninit();
        if unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) } != 0 {
            return None;
        }
        // getrusage returned 0, so the struct is filled in.
        let usage = unsafe { usage.assume_init() };
        Some(Self {
            user: timeval_secs(usage.ru_utime),
            sys: timeval_secs(usage.ru_stime),
        })
    }

    #[cfg(not(unix))]
    fn sample() -> Option<Self> {
        None
    }

    fn since(self, earlier: Self) -> Self {
        Self {
            user: self.user - earlier.user,
            sys: self.sys - earlier.sys,
        }
    }
}

#[cfg(unix)]
fn timeval_secs(tv: libc::timeval) -> f64 {
    tv.tv_sec as f64 + tv.tv_usec as f64 * 1e-6
}

/// Run `repetitions` independent sessions and aggregate them.
pub fn analyze<R: Runner + ?Sized>(
    runner: &mut R,
    config: &SessionConfig,
    repetitions: usize,
) -> Result<Analysis, SearchError> {
    if repetitions == 0 {
        return Err(ValidationError::NoRepetitions.into());
    }
    let cpu_start = CpuTimes::sample();
    let mut successes = 0usize;
    let mut runs = 0usize;
    let mut total_runtime = 0.0;
    for rep in 0..repetitions {
        if runner.cancelled() {
            break;
        }
        let start = Instant::now();
        let sample = runner.run(config)?;
        let runtime = start.elapsed().as_secs_f64();
        total_runtime += runtime;
        runs += 1;
        if sample.success {
            successes += 1;
        }
        info!(
            rep = rep + 1,
            repetitions,
            robots = config.robot_count,
            items = config.item_count,
            success = sample.success,
            labeled = sample.labeled,
            runtime_s = runtime,
            "repetition finished"
        );
    }

    let cpu = cpu_start.zip(CpuTimes::sample()).map(|(start, end)| end.since(start));
    let (success_rate, mean_runtime_s) = if runs > 0 {
        (successes as f64 / runs as f64, total_runtime / runs as f64)
    } else {
        (0.0, 0.0)
    };
    Ok(Analysis {
        robot_count: config.robot_count,
        item_count: config.item_count,
        successes,
        failures: runs - successes,
        success_rate,
        mean_runtime_s,
        cpu_user_s: cpu.map(|c| c.user),
        cpu_sys_s: cpu.map(|c| c.sys),
    })
}

/// Outcome of a minimum robot search.
#[derive(Clone, Debug, PartialEq)]
pub struct RobotSearch {
    /// Smallest robot count meeting the target; `None` when the ceiling was
    /// reached (or the search was cancelled) first.
    pub minimum: Option<usize>,
    /// Analysis of the crossing count, or of the last count tried.
    pub analysis: Option<Analysis>,
}

/// Increase the robot count from 1 until the success rate reaches `target`.
pub fn find_minimum_robots<R: Runner + ?Sized>(
    runner: &mut R,
    config: &SessionConfig,
    target: f64,
    repetitions: usize,
) -> Result<RobotSearch, SearchError> {
    let mut last = None;
    for robots in 1..=ROBOT_SEARCH_CEILING {
        if runner.cancelled() {
            break;
        }
        let candidate = config.clone().with_robots(robots);
        let analysis = analyze(&mut *runner, &candidate, repetitions)?;
        info!(
            robots,
            items = config.item_count,
            success_rate = analysis.success_rate,
            "robot count analysed"
        );
        if analysis.success_rate >= target {
            return Ok(RobotSearch {
                minimum: Some(robots),
                analysis: Some(analysis),
            });
        }
        last = Some(analysis);
    }
    Ok(RobotSearch {
        minimum: None,
        analysis: last,
    })
}

/// One point of the robots-vs-items curve.
#[derive(Clone, Debug, PartialEq)]
pub struct CurveRow {
    pub item_count: usize,
    pub minimum_robots: Option<usize>,
    pub success_rate: f64,
    pub mean_runtime_s: f64,
}

impl CurveRow {
    pub fn to_csv(&self) -> String {
        let minimum = self
            .minimum_robots
            .map(|v| v.to_string())
            .unwrap_or_else(|| "NA".to_string());
        format!(
            "{},{},{:.3},{:.3}",
            self.item_count, minimum, self.success_rate, self.mean_runtime_s
        )
    }
}

/// Inclusive range of item counts to sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemRange {
    pub min: usize,
    pub max: usize,
    pub step: usize,
}

impl ItemRange {
    fn points(&self) -> Result<impl Iterator<Item = usize>, SearchError> {
        if self.step == 0 || self.min > self.max {
            return Err(SearchError::InvalidRange {
                min: self.min,
                max: self.max,
                step: self.step,
            });
        }
        Ok((self.min..=self.max).step_by(self.step))
    }
}

/// Find the minimum robot count for each item count and write one CSV row
/// per point as soon as it is known.
pub fn sweep_curve<R: Runner + ?Sized, W: Write>(
    runner: &mut R,
    base: &SessionConfig,
    range: ItemRange,
    repetitions: usize,
    target: f64,
    out: &mut W,
) -> Result<Vec<CurveRow>, SearchError> {
    let points = range.points()?;
    writeln!(out, "{CURVE_HEADER}")?;
    let mut rows = Vec::new();
    for items in points {
        if runner.cancelled() {
            break;
        }
        let config = base.clone().with_items(items);
        let search = find_minimum_robots(&mut *runner, &config, target, repetitions)?;
        let (success_rate, mean_runtime_s) = search
            .analysis
            .as_ref()
            .map_or((0.0, 0.0), |a| (a.success_rate, a.mean_runtime_s));
        let row = CurveRow {
            item_count: items,
            minimum_robots: search.minimum,
            success_rate,
            mean_runtime_s,
        };
        writeln!(out, "{}", row.to_csv())?;
        out.flush()?;
        rows.push(row);
    }
    Ok(rows)
}

/// One row of the redundancy table.
#[derive(Clone, Debug, PartialEq)]
pub struct RedundancyRow {
    pub robot_count: usize,
    pub success_rate: f64,
    pub mean_runtime_s: f64,
}

impl RedundancyRow {
    pub fn to_csv(&self) -> String {
        format!(
            "{},{:.3},{:.3}",
            self.robot_count, self.success_rate, self.mean_runtime_s
        )
    }
}

/// Sweep robot counts upward from the base with failures injected, stopping
/// once the success rate reaches `stop_rate`.
pub fn sweep_redundancy<R: Runner + ?Sized, W: Write>(
    runner: &mut R,
    base: &SessionConfig,
    failure_probability: f64,
    repetitions: usize,
    stop_rate: f64,
    out: &mut W,
) -> Result<Vec<RedundancyRow>, SearchError> {
    let config = base.clone().with_failures(failure_probability, true);
    config.validate()?;
    let last = (base.robot_count + REDUNDANCY_EXTRA_ROBOTS).min(MAX_ROBOTS);
    writeln!(out, "{REDUNDANCY_HEADER}")?;
    let mut rows = Vec::new();
    for robots in base.robot_count..=last {
        if runner.cancelled() {
            break;
        }
        let analysis = analyze(&mut *runner, &config.clone().with_robots(robots), repetitions)?;
        let row = RedundancyRow {
            robot_count: robots,
            success_rate: analysis.success_rate,
            mean_runtime_s: analysis.mean_runtime_s,
        };
        writeln!(out, "{}", row.to_csv())?;
        out.flush()?;
        rows.push(row);
        if analysis.success_rate >= stop_rate {
            info!(robots, failure_probability, "redundancy target reached");
            break;
        }
    }
    Ok(rows)
}
