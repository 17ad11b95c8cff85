//! Pipeline configuration: parsing, validation, and directory resolution.
//!
//! The TOML file names the four stage directories and the stage tunables:
//!
//! ```toml
//! [dirs]
//! raw = "data/raw"
//! filtered = "data/filtered"
//! averaged = "data/averaged"
//! stats = "data/stats"
//!
//! [filter]
//! min_samples_per_date = 24
//! start_date = "2024-09-01"
//! max_backstep_minutes = 60
//!
//! [aggregate]
//! timezone = "UTC"
//! ```
//!
//! Key behaviors:
//! - Unknown keys are rejected (`deny_unknown_fields`).
//! - `[filter]` and `[aggregate]` are optional; every field has a default.
//! - Relative directories resolve against a base directory, normally the
//!   config file's own directory.
//! - [`PipelineConfig::resolve`] turns the file shape into a
//!   [`ResolvedConfig`], the explicit parameter struct each stage receives.
//!
//! Entrypoints:
//! - Parse from a TOML string: [`load_config_str`]
//! - Parse from a file path and resolve against its directory: [`load_config_path`]
//! - Pick the file to load: [`locate_config`]

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateParams;
use crate::filter::{DEFAULT_MAX_BACKSTEP_MINUTES, DEFAULT_MIN_SAMPLES_PER_DATE, FilterParams};
use crate::tz::parse_tz;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "player_stats.toml";
/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "PLAYER_STATS_CONFIG";

/// Top-level configuration file shape.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Stage directories.
    pub dirs: DirsCfg,
    /// Filter stage tunables.
    #[serde(default)]
    pub filter: FilterCfg,
    /// Aggregation stage tunables.
    #[serde(default)]
    pub aggregate: AggregateCfg,
}

/// Directory layout as written in the file (possibly relative).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DirsCfg {
    pub raw: PathBuf,
    pub filtered: PathBuf,
    pub averaged: PathBuf,
    pub stats: PathBuf,
}

/// `[filter]` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct FilterCfg {
    /// Distinct timestamps a date needs to count as hourly-resolved.
    pub min_samples_per_date: u32,
    /// Optional first UTC date to consider, as `"YYYY-MM-DD"`.
    pub start_date: Option<NaiveDate>,
    /// Tolerated backwards step between consecutive readings.
    pub max_backstep_minutes: u32,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            min_samples_per_date: DEFAULT_MIN_SAMPLES_PER_DATE.get(),
            start_date: None,
            max_backstep_minutes: DEFAULT_MAX_BACKSTEP_MINUTES,
        }
    }
}

/// `[aggregate]` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct AggregateCfg {
    /// IANA zone name for hour-of-day slots.
    pub timezone: String,
}

impl Default for AggregateCfg {
    fn default() -> Self {
        Self {
            timezone: "UTC".into(),
        }
    }
}

/// Absolute stage directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dirs {
    pub raw: PathBuf,
    pub filtered: PathBuf,
    pub averaged: PathBuf,
    pub stats: PathBuf,
}

/// Fully validated configuration handed to the stages.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub dirs: Dirs,
    pub filter: FilterParams,
    pub aggregate: AggregateParams,
}

impl PipelineConfig {
    /// Validate tunables and anchor relative directories at `base`.
    ///
    /// Errors:
    /// - `min_samples_per_date` is zero
    /// - `timezone` is not a known IANA zone
    ///
    /// Directory existence is checked by the driver, not here.
    pub fn resolve(&self, base: &Path) -> anyhow::Result<ResolvedConfig> {
        let min_samples_per_date = NonZeroU32::new(self.filter.min_samples_per_date)
            .ok_or_else(|| anyhow!("filter.min_samples_per_date must be > 0"))?;
        let tz = parse_tz(&self.aggregate.timezone).context("aggregate.timezone")?;

        let anchor = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };

        Ok(ResolvedConfig {
            dirs: Dirs {
                raw: anchor(&self.dirs.raw),
                filtered: anchor(&self.dirs.filtered),
                averaged: anchor(&self.dirs.averaged),
                stats: anchor(&self.dirs.stats),
            },
            filter: FilterParams {
                min_samples_per_date,
                start_date: self.filter.start_date,
                max_backstep_minutes: self.filter.max_backstep_minutes,
            },
            aggregate: AggregateParams { tz },
        })
    }
}

/// Parse a configuration from a TOML string.
///
/// Errors:
/// - TOML parse failures, unknown keys, missing `[dirs]` entries
pub fn load_config_str(toml_str: &str) -> anyhow::Result<PipelineConfig> {
    toml::from_str(toml_str).context("failed to parse pipeline config TOML")
}

/// Read a configuration file, parse it, and resolve it against the file's directory.
pub fn load_config_path(path: impl AsRef<Path>) -> anyhow::Result<ResolvedConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config file {}", path.display()))?;
    let cfg = load_config_str(&text)?;
    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    cfg.resolve(base)
        .with_context(|| format!("invalid config {}", path.display()))
}

/// Config file to load: the explicit path if given, else `$PLAYER_STATS_CONFIG`,
/// else `player_stats.toml` in the working directory.
pub fn locate_config(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| {
        PathBuf::from(shared_utils::get_env_var_or(
            CONFIG_ENV_VAR,
            DEFAULT_CONFIG_FILE,
        ))
    })
}
