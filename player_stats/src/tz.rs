//! Timestamp parsing and time-zone helpers.
//!
//! What this module provides:
//! - [`parse_ts_to_utc`]: Parse RFC-3339 timestamps with an explicit offset and convert to UTC.
//! - [`parse_sample_timestamp`]: Parse the timestamp layouts found in scraped player-count
//!   exports. Naive timestamps (no offset) are taken as UTC.
//! - [`parse_tz`]: Parse an IANA time zone name (e.g. "America/New_York").
//! - [`local_hour_slot`]: Hour-of-day of a UTC instant in a reference zone.
//! - [`format_table_ts`]: The `YYYY-MM-DD HH:MM:SS` layout written to output tables.
//!
//! Notes:
//! - All rounding and date grouping uses UTC. The reference zone only decides which
//!   hour-of-day slot an hour lands in, so a UTC -> local conversion is always
//!   unambiguous, even across DST transitions.
//! - Zones with sub-hour offsets (e.g. "Asia/Kolkata") map a UTC hour onto `hh:30`
//!   local; the slot is the local hour component.
//!
//! Examples
//! - RFC-3339 with offset to UTC:
//!   "2024-03-10T09:30:00-05:00" -> "2024-03-10T14:30:00Z"
//! - 14:00Z in America/New_York: slot 9 in January (EST), slot 10 in July (EDT).

use anyhow::{Context, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::models::HourSlot;

/// Naive layouts accepted for sample timestamps, tried in order.
pub const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Layout used for every timestamp written by the pipeline.
pub const TABLE_TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// RFC-3339 with offset -> UTC.
///
/// Example:
/// - "2024-03-10T09:30:00-05:00" -> "2024-03-10T14:30:00Z"
pub fn parse_ts_to_utc(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let dt = DateTime::parse_from_rfc3339(s).with_context(|| format!("bad rfc3339: {s}"))?;
    Ok(dt.with_timezone(&Utc))
}

/// Parse a sample timestamp.
///
/// RFC-3339 values keep their offset and are converted to UTC; naive values
/// in any of [`NAIVE_FORMATS`] are taken as UTC. A bare date is accepted as
/// midnight UTC.
pub fn parse_sample_timestamp(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        bail!("empty timestamp");
    }
    if let Ok(dt) = parse_ts_to_utc(s) {
        return Ok(dt);
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    bail!("unrecognized timestamp: {s}")
}

/// Parse an IANA time zone name (e.g., "America/New_York", "UTC").
pub fn parse_tz(name: &str) -> anyhow::Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("bad tz: {name}: {e}"))
}

/// Hour-of-day of `instant` observed in `tz`.
pub fn local_hour_slot(instant: DateTime<Utc>, tz: Tz) -> HourSlot {
    HourSlot::from_hour_component(instant.with_timezone(&tz).hour())
}

/// Format a UTC datetime the way output tables store it.
pub fn format_table_ts(dt: DateTime<Utc>) -> String {
    dt.format(TABLE_TS_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_rfc3339_offset_to_utc() {
        // Offset timestamp: 2024-03-10 09:30 at -05:00 -> 14:30Z
        let ts = "2024-03-10T09:30:00-05:00";
        let got = parse_ts_to_utc(ts).expect("parse");
        let want = Utc.with_ymd_and_hms(2024, 3, 10, 14, 30, 0).unwrap();
        assert_eq!(got, want);
    }

    #[test]
    fn naive_layouts_are_utc() {
        let want = Utc.with_ymd_and_hms(2024, 9, 1, 10, 30, 0).unwrap();
        for s in [
            "2024-09-01 10:30:00",
            "2024-09-01T10:30:00",
            "2024-09-01 10:30:00.000",
            "2024-09-01 10:30",
            "2024/09/01 10:30:00",
            " 2024-09-01 10:30:00 ",
            "2024-09-01T10:30:00Z",
        ] {
            assert_eq!(parse_sample_timestamp(s).unwrap(), want, "layout {s:?}");
        }
    }

    #[test]
    fn bare_date_is_midnight() {
        let got = parse_sample_timestamp("2015-06-01").unwrap();
        assert_eq!(got, Utc.with_ymd_and_hms(2015, 6, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_sample_timestamp("").is_err());
        assert!(parse_sample_timestamp("yesterday").is_err());
        assert!(parse_sample_timestamp("2024-13-01 00:00:00").is_err());
    }

    #[test]
    fn ny_slot_follows_dst() {
        let tz = parse_tz("America/New_York").unwrap();
        let winter = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        let summer = Utc.with_ymd_and_hms(2024, 7, 15, 14, 0, 0).unwrap();
        assert_eq!(local_hour_slot(winter, tz).get(), 9);
        assert_eq!(local_hour_slot(summer, tz).get(), 10);
    }

    #[test]
    fn half_hour_offset_zone_uses_hour_component() {
        let tz = parse_tz("Asia/Kolkata").unwrap();
        // 12:00Z -> 17:30 IST
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(local_hour_slot(ts, tz).get(), 17);
    }

    #[test]
    fn unknown_zone_errors() {
        let err = parse_tz("Mars/Olympus_Mons").unwrap_err();
        assert!(err.to_string().contains("bad tz"));
    }

    #[test]
    fn table_format_has_no_offset() {
        let ts = Utc.with_ymd_and_hms(2024, 9, 1, 7, 0, 0).unwrap();
        assert_eq!(format_table_ts(ts), "2024-09-01 07:00:00");
    }
}
