//! File layout and table codecs for each pipeline stage.
//!
//! | stage output   | file                                      | columns            |
//! |----------------|-------------------------------------------|--------------------|
//! | raw input      | `<raw>/<game>.csv`                        | `DateTime,Players` |
//! | filtered       | `<filtered>/filtered_<game>.csv`          | `DateTime,AvgPlayers` |
//! | averaged       | `<averaged>/daily_avg_filtered_<game>.csv`| `Hour,AvgPlayers`  |
//! | stats          | `<stats>/Descriptives.csv`                | `Game,Mean,SD`     |
//!
//! Numbers are written with `f64`'s shortest round-trip formatting, so a
//! later stage reads back exactly the value an earlier one computed.

pub mod raw;
pub mod tables;

use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};

/// Prefix of filtered-stage files.
pub const FILTERED_PREFIX: &str = "filtered_";
/// Prefix of averaged-stage files.
pub const AVERAGED_PREFIX: &str = "daily_avg_filtered_";
/// File name of the Stat table.
pub const STATS_FILE: &str = "Descriptives.csv";
/// File name of the hand-curated Stat table.
pub const CURATED_STATS_FILE: &str = "Descriptives_edited.csv";

/// Path of a game's filtered table.
pub fn filtered_path(dir: &Path, game: &str) -> PathBuf {
    dir.join(format!("{FILTERED_PREFIX}{game}.csv"))
}

/// Path of a game's averaged table.
pub fn averaged_path(dir: &Path, game: &str) -> PathBuf {
    dir.join(format!("{AVERAGED_PREFIX}{game}.csv"))
}

/// Game name from a stage file, stripping the stage prefix when present.
pub fn game_name(path: &Path, prefix: &str) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let name = stem.strip_prefix(prefix).unwrap_or(stem);
    (!name.is_empty()).then(|| name.to_string())
}

/// `.csv` files directly under `dir`, sorted by path for deterministic runs.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut out = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Shortest round-trip rendering; empty for an undefined value.
pub(crate) fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

/// Inverse of [`fmt_opt`]; `Err` carries a reason for the malformed-row report.
pub(crate) fn parse_opt(s: &str) -> std::result::Result<Option<f64>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        Ok(v) => Err(format!("non-finite value {v}")),
        Err(e) => Err(format!("bad number {s:?}: {e}")),
    }
}
