//! Batch driver: runs the selected stages over every game.
//!
//! ## What this does
//! - **Filter**: `<raw>/<game>.csv` → `<filtered>/filtered_<game>.csv`
//! - **Average**: filtered tables → `<averaged>/daily_avg_filtered_<game>.csv`
//! - **Describe**: averaged tables → `<stats>/Descriptives.csv`
//!
//! Each stage reads the previous stage's directory, so any suffix of the
//! pipeline can be re-run on its own.
//!
//! ## Failure model
//! Directory problems are checked up front by [`prepare_dirs`] and abort the
//! batch. Everything after that is per game: a bad file becomes a
//! [`GameOutcome::Failed`] entry in the [`StageReport`] and the batch moves
//! on. A failed game's outputs from earlier runs are removed, so later
//! stages never pick up stale tables for it.
//!
//! ## Determinism
//! Files are visited in sorted order and every table is written with fixed
//! formatting, so re-running over unchanged input rewrites identical bytes.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use indexmap::{IndexMap, IndexSet};
use tracing::{error, info, warn};

use crate::aggregate::daily_profile;
use crate::config::{Dirs, ResolvedConfig};
use crate::describe::describe_all;
use crate::errors::{Error, Result};
use crate::filter::{collapse_hourly, filter_samples};
use crate::io::raw::read_raw_series;
use crate::io::tables::{read_averaged, read_filtered, write_averaged, write_filtered, write_stats};
use crate::io::{
    AVERAGED_PREFIX, FILTERED_PREFIX, STATS_FILE, averaged_path, filtered_path, game_name,
    list_csv_files,
};

/// A pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Raw → Filtered Data.
    Filter,
    /// Filtered Data → Averaged Data.
    Average,
    /// Averaged Data → Stat Data.
    Describe,
}

impl Stage {
    /// Every stage in pipeline order.
    pub const ALL: [Stage; 3] = [Stage::Filter, Stage::Average, Stage::Describe];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Filter => "filter",
            Stage::Average => "average",
            Stage::Describe => "describe",
        };
        f.write_str(s)
    }
}

/// What happened to one game in one stage.
#[derive(Debug)]
pub enum GameOutcome {
    /// Output written.
    Written {
        /// File produced for this game.
        output: PathBuf,
        /// Rows (or hours) written.
        rows: usize,
        /// Input rows skipped as malformed.
        malformed: usize,
    },
    /// Filter found no date with hourly-or-finer data. A header-only table is
    /// still written so later stages report the game with undefined values.
    NoQualifyingDates {
        output: PathBuf,
        malformed: usize,
    },
    /// The game could not be processed in this stage.
    Failed(Error),
}

impl GameOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, GameOutcome::Failed(_))
    }
}

/// Per-game outcomes of one stage, in processing order.
#[derive(Debug)]
pub struct StageReport {
    pub stage: Stage,
    pub games: IndexMap<String, GameOutcome>,
    /// Files written that are not per game (the Stat table).
    pub extra_outputs: Vec<PathBuf>,
}

impl StageReport {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            games: IndexMap::new(),
            extra_outputs: Vec::new(),
        }
    }

    pub fn failed(&self) -> usize {
        self.games.values().filter(|o| o.is_failure()).count()
    }

    pub fn succeeded(&self) -> usize {
        self.games.len() - self.failed()
    }

    /// Distinct paths this stage wrote, per-game outputs first.
    pub fn outputs(&self) -> IndexSet<&Path> {
        self.games
            .values()
            .filter_map(|o| match o {
                GameOutcome::Written { output, .. }
                | GameOutcome::NoQualifyingDates { output, .. } => Some(output.as_path()),
                GameOutcome::Failed(_) => None,
            })
            .chain(self.extra_outputs.iter().map(PathBuf::as_path))
            .collect()
    }
}

/// Check the raw directory and create the output directories.
///
/// This is the only place a batch can fail as a whole.
pub fn prepare_dirs(dirs: &Dirs) -> anyhow::Result<()> {
    shared_utils::require_dir(&dirs.raw).context("raw data directory")?;
    for dir in [&dirs.filtered, &dirs.averaged, &dirs.stats] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output directory {}", dir.display()))?;
    }
    Ok(())
}

/// Run `stages` in pipeline order (duplicates ignored).
pub fn run_stages(cfg: &ResolvedConfig, stages: &[Stage]) -> anyhow::Result<Vec<StageReport>> {
    prepare_dirs(&cfg.dirs)?;

    let mut selected = stages.to_vec();
    selected.sort();
    selected.dedup();

    let mut reports = Vec::with_capacity(selected.len());
    for stage in selected {
        info!(%stage, "running stage");
        let report = match stage {
            Stage::Filter => run_filter_stage(cfg),
            Stage::Average => run_average_stage(cfg),
            Stage::Describe => run_describe_stage(cfg),
        }
        .with_context(|| format!("{stage} stage"))?;
        info!(
            %stage,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "stage finished"
        );
        reports.push(report);
    }
    Ok(reports)
}

/// Raw → Filtered Data for every raw file.
pub fn run_filter_stage(cfg: &ResolvedConfig) -> Result<StageReport> {
    let mut report = StageReport::new(Stage::Filter);
    for path in list_csv_files(&cfg.dirs.raw)? {
        let Some(game) = game_name(&path, "") else {
            continue;
        };
        let outcome = filter_game(&path, &game, cfg).unwrap_or_else(|e| {
            discard_stale_outputs(
                &game,
                &[
                    filtered_path(&cfg.dirs.filtered, &game),
                    averaged_path(&cfg.dirs.averaged, &game),
                ],
            );
            GameOutcome::Failed(e)
        });
        log_outcome(Stage::Filter, &game, &outcome);
        report.games.insert(game, outcome);
    }
    Ok(report)
}

fn filter_game(path: &Path, game: &str, cfg: &ResolvedConfig) -> Result<GameOutcome> {
    let read = read_raw_series(path, game)?;
    let filtered = collapse_hourly(&filter_samples(&read.series, &cfg.filter)?);
    let output = filtered_path(&cfg.dirs.filtered, game);
    write_filtered(&output, &filtered)?;

    let malformed = read.malformed.len();
    if filtered.samples.is_empty() {
        Ok(GameOutcome::NoQualifyingDates { output, malformed })
    } else {
        Ok(GameOutcome::Written {
            output,
            rows: filtered.samples.len(),
            malformed,
        })
    }
}

/// Filtered Data → Averaged Data for every filtered table.
pub fn run_average_stage(cfg: &ResolvedConfig) -> Result<StageReport> {
    let mut report = StageReport::new(Stage::Average);
    for path in list_csv_files(&cfg.dirs.filtered)? {
        let Some(game) = game_name(&path, FILTERED_PREFIX) else {
            continue;
        };
        let outcome = average_game(&path, &game, cfg).unwrap_or_else(|e| {
            discard_stale_outputs(&game, &[averaged_path(&cfg.dirs.averaged, &game)]);
            GameOutcome::Failed(e)
        });
        log_outcome(Stage::Average, &game, &outcome);
        report.games.insert(game, outcome);
    }
    Ok(report)
}

fn average_game(path: &Path, game: &str, cfg: &ResolvedConfig) -> Result<GameOutcome> {
    let (series, malformed) = read_filtered(path, game)?;
    let profile = daily_profile(&series, &cfg.aggregate);
    let output = averaged_path(&cfg.dirs.averaged, game);
    write_averaged(&output, &profile)?;
    Ok(GameOutcome::Written {
        output,
        rows: profile.present_count(),
        malformed: malformed.len(),
    })
}

/// Averaged Data → Stat Data. Games whose table cannot be read are left out
/// of the Stat table and reported as failed.
pub fn run_describe_stage(cfg: &ResolvedConfig) -> Result<StageReport> {
    let mut report = StageReport::new(Stage::Describe);
    let mut profiles = Vec::new();
    for path in list_csv_files(&cfg.dirs.averaged)? {
        let Some(game) = game_name(&path, AVERAGED_PREFIX) else {
            continue;
        };
        match read_averaged(&path, &game) {
            Ok((profile, malformed)) => {
                let outcome = GameOutcome::Written {
                    output: cfg.dirs.stats.join(STATS_FILE),
                    rows: 1,
                    malformed: malformed.len(),
                };
                log_outcome(Stage::Describe, &game, &outcome);
                report.games.insert(game, outcome);
                profiles.push(profile);
            }
            Err(e) => {
                let outcome = GameOutcome::Failed(e);
                log_outcome(Stage::Describe, &game, &outcome);
                report.games.insert(game, outcome);
            }
        }
    }

    let records = describe_all(&profiles);
    for r in records.iter().filter(|r| r.mean.is_none()) {
        warn!(game = %r.game, "no hour slot present; statistics undefined");
    }
    let stats_path = cfg.dirs.stats.join(STATS_FILE);
    write_stats(&stats_path, &records)?;
    report.extra_outputs.push(stats_path);
    Ok(report)
}

/// Remove a failed game's outputs from earlier runs so later stages skip it.
fn discard_stale_outputs(game: &str, paths: &[PathBuf]) {
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => info!(game, path = %path.display(), "removed stale output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(game, path = %path.display(), error = %e, "could not remove stale output")
            }
        }
    }
}

fn log_outcome(stage: Stage, game: &str, outcome: &GameOutcome) {
    match outcome {
        GameOutcome::Written { rows, malformed, .. } => {
            info!(%stage, game, rows, malformed, "processed");
        }
        GameOutcome::NoQualifyingDates { malformed, .. } => {
            warn!(%stage, game, malformed, "no date with hourly granularity; empty result");
        }
        GameOutcome::Failed(e) => {
            error!(%stage, game, error = %e, "game failed; continuing batch");
        }
    }
}
