//! Hand-curated Stat table (`Descriptives_edited.csv`).
//!
//! The pipeline never computes these columns. A person appends game metadata
//! (genres, player mode, storefront flags...) to the Stat table; this module
//! only seeds that file and reads it back.
//!
//! - [`write_template`]: copy `Descriptives.csv` into the curated layout with
//!   blank metadata cells. Never replaces an existing curated file.
//! - [`read_curated`]: parse the curated file. Blank cells are `None`.
//! - [`games_without_cloud_save_by_player_mode`]: count of games lacking
//!   cloud saves per player mode.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::{info, warn};

use crate::errors::{Error, Result};
use crate::io::raw::MalformedSample;
use crate::io::tables::{STATS_HEADER, open_with_columns, parse_stat_fields, read_stats};
use crate::io::{fmt_opt, parse_opt};
use crate::models::StatRecord;

/// Metadata columns following the Stat columns, in order.
pub const METADATA_HEADER: [&str; 12] = [
    "Genres",
    "Player",
    "Developer",
    "Publisher",
    "Year",
    "Price",
    "isIndie",
    "hasAchv",
    "hasSteamCloud",
    "ControllerSupport",
    "accountRequired",
    "hasKernel",
];

/// Player mode label used when a row leaves `Player` blank.
pub const UNSPECIFIED_PLAYER_MODE: &str = "unspecified";

/// Controller support level as listed on the store page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerSupport {
    None,
    Partial,
    Full,
}

impl FromStr for ControllerSupport {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "no" => Ok(Self::None),
            "partial" => Ok(Self::Partial),
            "full" | "yes" => Ok(Self::Full),
            other => Err(format!("unknown controller support: {other:?}")),
        }
    }
}

impl fmt::Display for ControllerSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Partial => "partial",
            Self::Full => "full",
        })
    }
}

/// Categorical columns a person fills in per game.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameMetadata {
    pub genres: Vec<String>,
    /// Single-player / multi-player mode label, free text.
    pub player_mode: Option<String>,
    pub developer: Option<String>,
    pub publisher: Option<String>,
    pub release_year: Option<u16>,
    pub price: Option<f64>,
    pub is_indie: Option<bool>,
    pub has_achievements: Option<bool>,
    pub has_cloud_save: Option<bool>,
    pub controller_support: Option<ControllerSupport>,
    pub account_required: Option<bool>,
    pub has_kernel_anticheat: Option<bool>,
}

/// A Stat row together with its curated metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CuratedRecord {
    pub stat: StatRecord,
    pub metadata: GameMetadata,
}

/// Seed the curated file from the Stat table.
///
/// Errors:
/// - [`Error::WouldOverwrite`] if `curated` already exists
/// - the Stat table cannot be read, or the curated file cannot be written
pub fn write_template(stats: &Path, curated: &Path) -> Result<usize> {
    if curated.exists() {
        return Err(Error::WouldOverwrite(curated.to_path_buf()));
    }
    let (records, _) = read_stats(stats)?;
    let rows: Vec<CuratedRecord> = records
        .into_iter()
        .map(|stat| CuratedRecord {
            stat,
            metadata: GameMetadata::default(),
        })
        .collect();
    write_curated(curated, &rows)?;
    info!(path = %curated.display(), games = rows.len(), "wrote curation template");
    Ok(rows.len())
}

/// Write curated rows in the `Descriptives_edited.csv` layout.
pub fn write_curated(path: &Path, rows: &[CuratedRecord]) -> Result<()> {
    let mut w = csv::Writer::from_path(path).map_err(|e| Error::csv(path, e))?;
    let header = STATS_HEADER.iter().chain(METADATA_HEADER.iter());
    w.write_record(header).map_err(|e| Error::csv(path, e))?;

    for row in rows {
        let m = &row.metadata;
        let fields = [
            row.stat.game.clone(),
            fmt_opt(row.stat.mean),
            fmt_opt(row.stat.sd),
            m.genres.join(";"),
            m.player_mode.clone().unwrap_or_default(),
            m.developer.clone().unwrap_or_default(),
            m.publisher.clone().unwrap_or_default(),
            m.release_year.map(|y| y.to_string()).unwrap_or_default(),
            fmt_opt(m.price),
            fmt_flag(m.is_indie),
            fmt_flag(m.has_achievements),
            fmt_flag(m.has_cloud_save),
            m.controller_support.map(|c| c.to_string()).unwrap_or_default(),
            fmt_flag(m.account_required),
            fmt_flag(m.has_kernel_anticheat),
        ];
        w.write_record(&fields).map_err(|e| Error::csv(path, e))?;
    }
    w.flush().map_err(|e| Error::io(path, e))
}

/// Read the curated file. Rows with unparseable cells are skipped and reported.
pub fn read_curated(path: &Path) -> Result<(Vec<CuratedRecord>, Vec<MalformedSample>)> {
    let mut reader = open_with_columns(path, &STATS_HEADER)?;
    let headers = reader.headers().map_err(|e| Error::csv(path, e))?.clone();
    let idx: Vec<Option<usize>> = METADATA_HEADER
        .iter()
        .map(|name| headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
        .collect();

    let mut rows = Vec::new();
    let mut malformed = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let line = i as u64 + 2;
        let parsed = record.map_err(|e| e.to_string()).and_then(|r| {
            let cell = |k: usize| idx[k].and_then(|j| r.get(j)).unwrap_or_default();
            let stat = parse_stat_fields(r.get(0), r.get(1), r.get(2))?;
            let metadata = parse_metadata(cell)?;
            Ok(CuratedRecord { stat, metadata })
        });
        match parsed {
            Ok(row) => rows.push(row),
            Err(reason) => {
                warn!(file = %path.display(), line, reason = %reason, "skipping curated row");
                malformed.push(MalformedSample { line, reason });
            }
        }
    }
    Ok((rows, malformed))
}

fn parse_metadata<'a>(
    cell: impl Fn(usize) -> &'a str,
) -> std::result::Result<GameMetadata, String> {
    let text = |k: usize| {
        let v = cell(k).trim();
        (!v.is_empty()).then(|| v.to_string())
    };
    let genres = cell(0)
        .split(';')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect();
    let release_year = match text(4) {
        Some(y) => Some(y.parse::<u16>().map_err(|e| format!("bad Year {y:?}: {e}"))?),
        None => None,
    };
    let controller_support = text(9).map(|c| c.parse()).transpose()?;

    Ok(GameMetadata {
        genres,
        player_mode: text(1),
        developer: text(2),
        publisher: text(3),
        release_year,
        price: parse_opt(cell(5))?,
        is_indie: parse_flag(cell(6))?,
        has_achievements: parse_flag(cell(7))?,
        has_cloud_save: parse_flag(cell(8))?,
        controller_support,
        account_required: parse_flag(cell(10))?,
        has_kernel_anticheat: parse_flag(cell(11))?,
    })
}

/// `1/0`, `true/false`, `yes/no` (any case); blank is `None`.
pub fn parse_flag(s: &str) -> std::result::Result<Option<bool>, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "1" | "true" | "yes" | "y" => Ok(Some(true)),
        "0" | "false" | "no" | "n" => Ok(Some(false)),
        other => Err(format!("bad flag {other:?}")),
    }
}

fn fmt_flag(v: Option<bool>) -> String {
    match v {
        Some(true) => "1".into(),
        Some(false) => "0".into(),
        None => String::new(),
    }
}

/// Per player mode, how many games are known to lack cloud saves.
///
/// Games with an unknown cloud-save flag are not counted; games with a
/// blank player mode are grouped under [`UNSPECIFIED_PLAYER_MODE`]. Modes
/// whose games all have cloud saves appear with a count of zero.
pub fn games_without_cloud_save_by_player_mode(rows: &[CuratedRecord]) -> BTreeMap<String, usize> {
    let mut out = BTreeMap::new();
    for row in rows {
        let mode = row
            .metadata
            .player_mode
            .clone()
            .unwrap_or_else(|| UNSPECIFIED_PLAYER_MODE.to_string());
        let count = out.entry(mode).or_insert(0);
        if row.metadata.has_cloud_save == Some(false) {
            *count += 1;
        }
    }
    out
}
