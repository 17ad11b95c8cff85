//! Raw Store reader.
//!
//! Exports carry a `DateTime` column plus a `Players` column (`Users` for
//! software titles), possibly among others such as `Average Players` or
//! `Twitch Viewers`, which are ignored. Rows that do not parse as
//! (timestamp, count) are skipped and reported as [`MalformedSample`]s.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::errors::{Error, Result};
use crate::models::{Sample, SampleSeries};
use crate::tz::parse_sample_timestamp;

/// Header of the timestamp column.
pub const TIMESTAMP_COLUMN: &str = "DateTime";
/// Header of the player-count column.
pub const PLAYERS_COLUMN: &str = "Players";
/// Player-count header used for software titles.
pub const USERS_COLUMN: &str = "Users";

/// A skipped input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedSample {
    /// 1-based line number in the source file.
    pub line: u64,
    /// Why the row was rejected.
    pub reason: String,
}

/// A game's readings together with the rows that were skipped.
#[derive(Debug, Clone)]
pub struct RawRead {
    pub series: SampleSeries,
    pub malformed: Vec<MalformedSample>,
}

/// Read one game's raw export.
///
/// Errors:
/// - the file cannot be opened or its header read
/// - neither a `Players` nor a `Users` column is present, or `DateTime` is missing
pub fn read_raw_series(path: &Path, game: &str) -> Result<RawRead> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| Error::csv(path, e))?;

    let headers = reader.headers().map_err(|e| Error::csv(path, e))?.clone();
    let ts_idx = find_column(&headers, TIMESTAMP_COLUMN).ok_or_else(|| Error::MissingColumn {
        path: path.to_path_buf(),
        column: TIMESTAMP_COLUMN.into(),
    })?;
    let players_idx = find_column(&headers, PLAYERS_COLUMN)
        .or_else(|| find_column(&headers, USERS_COLUMN))
        .ok_or_else(|| Error::MissingColumn {
            path: path.to_path_buf(),
            column: PLAYERS_COLUMN.into(),
        })?;

    let mut samples = Vec::new();
    let mut malformed = Vec::new();
    for (i, record) in reader.records().enumerate() {
        // header is line 1
        let fallback_line = i as u64 + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                let line = e
                    .position()
                    .map(|p| p.line())
                    .unwrap_or(fallback_line);
                malformed.push(MalformedSample {
                    line,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(fallback_line);

        match parse_row(record.get(ts_idx), record.get(players_idx)) {
            Ok((timestamp, players)) => samples.push(Sample { timestamp, players }),
            Err(reason) => malformed.push(MalformedSample { line, reason }),
        }
    }

    for m in &malformed {
        warn!(game, line = m.line, reason = %m.reason, "skipping malformed sample");
    }

    Ok(RawRead {
        series: SampleSeries {
            game: game.to_string(),
            samples,
        },
        malformed,
    })
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
}

fn parse_row(
    ts: Option<&str>,
    players: Option<&str>,
) -> std::result::Result<(DateTime<Utc>, u64), String> {
    let ts = ts.ok_or("missing timestamp field")?;
    let players = players.ok_or("missing player count field")?;
    let timestamp = parse_sample_timestamp(ts).map_err(|e| e.to_string())?;
    let players = parse_player_count(players)?;
    Ok((timestamp, players))
}

/// Non-negative integer count; integral floats such as `1234.0` are accepted.
pub fn parse_player_count(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("missing player count".into());
    }
    if let Ok(n) = s.parse::<u64>() {
        return Ok(n);
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
            Ok(f as u64)
        }
        Ok(f) => Err(format!("player count is not a non-negative integer: {f}")),
        Err(_) => Err(format!("bad player count {s:?}")),
    }
}
