//! Writers and readers for the Filtered, Averaged and Stat tables.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::raw::MalformedSample;
use super::{fmt_opt, parse_opt};
use crate::errors::{Error, Result};
use crate::models::{DailyProfile, FilteredSample, FilteredSeries, HourSlot, StatRecord};
use crate::tz::{format_table_ts, parse_sample_timestamp};

const FILTERED_HEADER: [&str; 2] = ["DateTime", "AvgPlayers"];
const AVERAGED_HEADER: [&str; 2] = ["Hour", "AvgPlayers"];
/// Columns of the Stat table, in order.
pub const STATS_HEADER: [&str; 3] = ["Game", "Mean", "SD"];

/// Write a collapsed series as `DateTime,AvgPlayers`. An empty series yields
/// a header-only file.
pub fn write_filtered(path: &Path, series: &FilteredSeries) -> Result<()> {
    let mut w = csv::Writer::from_path(path).map_err(|e| Error::csv(path, e))?;
    w.write_record(FILTERED_HEADER).map_err(|e| Error::csv(path, e))?;
    for s in &series.samples {
        w.write_record([format_table_ts(s.hour), s.players.to_string()])
            .map_err(|e| Error::csv(path, e))?;
    }
    w.flush().map_err(|e| Error::io(path, e))
}

/// Read a filtered table back into a series.
pub fn read_filtered(path: &Path, game: &str) -> Result<(FilteredSeries, Vec<MalformedSample>)> {
    let mut reader = open_with_columns(path, &FILTERED_HEADER)?;
    let mut samples = Vec::new();
    let mut malformed = Vec::new();

    for (i, record) in reader.records().enumerate() {
        let line = i as u64 + 2;
        let parsed = record
            .map_err(|e| e.to_string())
            .and_then(|r| parse_filtered_row(r.get(0), r.get(1)));
        match parsed {
            Ok(s) => samples.push(s),
            Err(reason) => malformed.push(MalformedSample { line, reason }),
        }
    }
    report(path, &malformed);

    Ok((
        FilteredSeries {
            game: game.to_string(),
            samples,
        },
        malformed,
    ))
}

fn parse_filtered_row(
    ts: Option<&str>,
    value: Option<&str>,
) -> std::result::Result<FilteredSample, String> {
    let hour: DateTime<Utc> =
        parse_sample_timestamp(ts.unwrap_or_default()).map_err(|e| e.to_string())?;
    let players = parse_opt(value.unwrap_or_default())?.ok_or("missing AvgPlayers value")?;
    Ok(FilteredSample { hour, players })
}

/// Write a profile as 24 `Hour,AvgPlayers` rows; absent slots get an empty cell.
pub fn write_averaged(path: &Path, profile: &DailyProfile) -> Result<()> {
    let mut w = csv::Writer::from_path(path).map_err(|e| Error::csv(path, e))?;
    w.write_record(AVERAGED_HEADER).map_err(|e| Error::csv(path, e))?;
    for slot in HourSlot::all() {
        w.write_record([slot.to_string(), fmt_opt(profile.get(slot))])
            .map_err(|e| Error::csv(path, e))?;
    }
    w.flush().map_err(|e| Error::io(path, e))
}

/// Read an averaged table. Hours missing from the file stay absent.
pub fn read_averaged(path: &Path, game: &str) -> Result<(DailyProfile, Vec<MalformedSample>)> {
    let mut reader = open_with_columns(path, &AVERAGED_HEADER)?;
    let mut profile = DailyProfile::empty(game);
    let mut malformed = Vec::new();

    for (i, record) in reader.records().enumerate() {
        let line = i as u64 + 2;
        let parsed = record
            .map_err(|e| e.to_string())
            .and_then(|r| parse_averaged_row(r.get(0), r.get(1)));
        match parsed {
            Ok((slot, value)) => profile.slots[slot.index()] = value,
            Err(reason) => malformed.push(MalformedSample { line, reason }),
        }
    }
    report(path, &malformed);

    Ok((profile, malformed))
}

fn parse_averaged_row(
    hour: Option<&str>,
    value: Option<&str>,
) -> std::result::Result<(HourSlot, Option<f64>), String> {
    let hour = hour.unwrap_or_default().trim();
    let slot = hour
        .parse::<u8>()
        .ok()
        .and_then(HourSlot::new)
        .ok_or_else(|| format!("bad hour {hour:?}"))?;
    let value = parse_opt(value.unwrap_or_default())?;
    Ok((slot, value))
}

/// Write the Stat table; undefined statistics become empty cells.
pub fn write_stats(path: &Path, records: &[StatRecord]) -> Result<()> {
    let mut w = csv::Writer::from_path(path).map_err(|e| Error::csv(path, e))?;
    w.write_record(STATS_HEADER).map_err(|e| Error::csv(path, e))?;
    for r in records {
        w.write_record([r.game.clone(), fmt_opt(r.mean), fmt_opt(r.sd)])
            .map_err(|e| Error::csv(path, e))?;
    }
    w.flush().map_err(|e| Error::io(path, e))
}

/// Read the Stat table. `present` is unknown from the file and set to 0.
pub fn read_stats(path: &Path) -> Result<(Vec<StatRecord>, Vec<MalformedSample>)> {
    let mut reader = open_with_columns(path, &STATS_HEADER)?;
    let mut records = Vec::new();
    let mut malformed = Vec::new();

    for (i, record) in reader.records().enumerate() {
        let line = i as u64 + 2;
        let parsed = record
            .map_err(|e| e.to_string())
            .and_then(|r| parse_stat_fields(r.get(0), r.get(1), r.get(2)));
        match parsed {
            Ok(r) => records.push(r),
            Err(reason) => malformed.push(MalformedSample { line, reason }),
        }
    }
    report(path, &malformed);

    Ok((records, malformed))
}

pub(crate) fn parse_stat_fields(
    game: Option<&str>,
    mean: Option<&str>,
    sd: Option<&str>,
) -> std::result::Result<StatRecord, String> {
    let game = game.unwrap_or_default().trim();
    if game.is_empty() {
        return Err("missing game name".into());
    }
    Ok(StatRecord {
        game: game.to_string(),
        mean: parse_opt(mean.unwrap_or_default())?,
        sd: parse_opt(sd.unwrap_or_default())?,
        present: 0,
    })
}

/// Open a table and check that it starts with `expected` columns.
pub(crate) fn open_with_columns(
    path: &Path,
    expected: &[&str],
) -> Result<csv::Reader<std::fs::File>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| Error::csv(path, e))?;
    let headers = reader.headers().map_err(|e| Error::csv(path, e))?;
    for (i, want) in expected.iter().enumerate() {
        let found = headers.get(i).map(|h| h.trim_start_matches('\u{feff}'));
        if !found.is_some_and(|h| h.eq_ignore_ascii_case(want)) {
            return Err(Error::MissingColumn {
                path: path.to_path_buf(),
                column: (*want).to_string(),
            });
        }
    }
    Ok(reader)
}

fn report(path: &Path, malformed: &[MalformedSample]) {
    for m in malformed {
        warn!(file = %path.display(), line = m.line, reason = %m.reason, "skipping malformed row");
    }
}
