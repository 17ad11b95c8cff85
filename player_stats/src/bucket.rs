//! bucket.rs — UTC hour-grid utilities
//!
//! - One stable epoch: Unix (1970-01-01T00:00:00Z).
//! - Fixed-size hour buckets: second-based math with `div_euclid`.
//! - Nearest-hour rounding with the half-hour duplication rule.
//!
//! All functions assume the input timestamp is UTC.

use chrono::{DateTime, Duration, Utc};

/// Unix epoch start (1970-01-01T00:00:00Z).
pub const EPOCH_UNIX: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// Number of seconds in a minute.
pub const SECS_PER_MINUTE: i64 = 60;
/// Number of seconds in an hour.
pub const SECS_PER_HOUR: i64 = 60 * SECS_PER_MINUTE;

const HALF_HOUR_SECS: i64 = SECS_PER_HOUR / 2;

/// Result of snapping a timestamp onto the hour grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundedHour {
    /// The timestamp rounds to a single, nearest hour.
    Nearest(DateTime<Utc>),
    /// Half-hour duplication rule: a timestamp exactly on `:30:00` belongs to
    /// both neighbouring hours, with its full value in each.
    HalfHourTie {
        /// Start of the hour the sample falls in.
        floor: DateTime<Utc>,
        /// Start of the following hour.
        ceil: DateTime<Utc>,
    },
}

impl RoundedHour {
    /// Hour starts this rounding contributes to, earliest first.
    pub fn hours(self) -> impl Iterator<Item = DateTime<Utc>> {
        let (first, second) = match self {
            Self::Nearest(h) => (h, None),
            Self::HalfHourTie { floor, ceil } => (floor, Some(ceil)),
        };
        std::iter::once(first).chain(second)
    }
}

/// Start of the UTC hour containing `ts`.
pub fn hour_floor(ts: DateTime<Utc>) -> DateTime<Utc> {
    start_fixed(id_fixed(ts, SECS_PER_HOUR), SECS_PER_HOUR)
}

/// Snap `ts` to the nearest hour.
///
/// Anything before `:30:00` rounds down, anything after rounds up, and a
/// timestamp exactly on `:30:00` is duplicated into both hours.
pub fn round_to_hour(ts: DateTime<Utc>) -> RoundedHour {
    let floor = hour_floor(ts);
    let offset = ts.signed_duration_since(floor);
    let half = Duration::seconds(HALF_HOUR_SECS);
    let ceil = floor + Duration::seconds(SECS_PER_HOUR);

    if offset < half {
        RoundedHour::Nearest(floor)
    } else if offset > half {
        RoundedHour::Nearest(ceil)
    } else {
        RoundedHour::HalfHourTie { floor, ceil }
    }
}

// ----- fixed-size internals -----

fn id_fixed(ts_utc: DateTime<Utc>, bucket_secs: i64) -> i64 {
    let secs = ts_utc.signed_duration_since(EPOCH_UNIX).num_seconds();
    secs.div_euclid(bucket_secs)
}

fn start_fixed(id: i64, bucket_secs: i64) -> DateTime<Utc> {
    EPOCH_UNIX + Duration::seconds(id * bucket_secs)
}
