//! Filter stage: qualifying dates, hour-grid rounding, per-hour collapse.
//!
//! A UTC date *qualifies* when it holds at least
//! [`FilterParams::min_samples_per_date`] distinct timestamps, i.e. the
//! scrape kept hourly-or-finer readings for it. Older history in the exports
//! thins out to a handful of readings per day; those dates are dropped whole.
//!
//! Readings on qualifying dates are snapped to the nearest hour with
//! [`round_to_hour`], so a reading exactly on `:30` lands in both neighbouring
//! hours. A rounded hour that crosses into a non-qualifying date is dropped.

use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroU32;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use thiserror::Error;
use tracing::debug;

use crate::bucket::round_to_hour;
use crate::models::{FilteredSample, FilteredSeries, Sample, SampleSeries};

/// Default granularity threshold: one reading per hour.
pub const DEFAULT_MIN_SAMPLES_PER_DATE: NonZeroU32 = match NonZeroU32::new(24) {
    Some(nz) => nz,
    None => unreachable!(),
};

/// Default tolerated backwards step between consecutive readings.
pub const DEFAULT_MAX_BACKSTEP_MINUTES: u32 = 60;

/// Errors that stop the filter stage for one game.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A reading is earlier than one already seen by more than the tolerance.
    #[error("samples out of order: {current} follows {latest} (tolerance {tolerance_minutes} min)")]
    OutOfOrder {
        /// Latest timestamp seen before the offending reading.
        latest: DateTime<Utc>,
        /// The offending reading's timestamp.
        current: DateTime<Utc>,
        /// Configured tolerance.
        tolerance_minutes: u32,
    },
}

/// Tunables for [`filter_samples`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterParams {
    /// Distinct timestamps a UTC date needs to qualify.
    pub min_samples_per_date: NonZeroU32,
    /// Readings before this UTC date are ignored entirely.
    pub start_date: Option<NaiveDate>,
    /// Largest backwards step between readings accepted as jitter.
    pub max_backstep_minutes: u32,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            min_samples_per_date: DEFAULT_MIN_SAMPLES_PER_DATE,
            start_date: None,
            max_backstep_minutes: DEFAULT_MAX_BACKSTEP_MINUTES,
        }
    }
}

/// Restrict a game's readings to qualifying dates and snap them to the hour grid.
///
/// The output holds one entry per retained reading, two for a reading on
/// `:30`, in input order. An empty output means the game has no qualifying
/// date; that is not an error.
///
/// Errors:
/// - [`FilterError::OutOfOrder`] when the input is grossly unsorted.
pub fn filter_samples(
    series: &SampleSeries,
    params: &FilterParams,
) -> Result<FilteredSeries, FilterError> {
    check_order(&series.samples, params.max_backstep_minutes)?;

    let kept: Vec<&Sample> = series
        .samples
        .iter()
        .filter(|s| match params.start_date {
            Some(start) => s.timestamp.date_naive() >= start,
            None => true,
        })
        .collect();

    let qualifying = qualifying_dates(kept.iter().copied(), params.min_samples_per_date);

    let mut samples = Vec::with_capacity(kept.len());
    for s in kept {
        if !qualifying.contains(&s.timestamp.date_naive()) {
            continue;
        }
        for hour in round_to_hour(s.timestamp).hours() {
            if qualifying.contains(&hour.date_naive()) {
                samples.push(FilteredSample {
                    hour,
                    players: s.players as f64,
                });
            }
        }
    }

    debug!(
        game = %series.game,
        raw = series.samples.len(),
        qualifying_dates = qualifying.len(),
        filtered = samples.len(),
        "filtered samples"
    );

    Ok(FilteredSeries {
        game: series.game.clone(),
        samples,
    })
}

/// UTC dates holding at least `min` distinct timestamps.
pub fn qualifying_dates<'a>(
    samples: impl IntoIterator<Item = &'a Sample>,
    min: NonZeroU32,
) -> BTreeSet<NaiveDate> {
    let mut per_date: BTreeMap<NaiveDate, BTreeSet<DateTime<Utc>>> = BTreeMap::new();
    for s in samples {
        per_date
            .entry(s.timestamp.date_naive())
            .or_default()
            .insert(s.timestamp);
    }
    per_date
        .into_iter()
        .filter(|(_, stamps)| stamps.len() >= min.get() as usize)
        .map(|(date, _)| date)
        .collect()
}

/// Average all values that share an hour, ascending by hour.
///
/// Values are summed in sorted order so the result does not depend on the
/// order of `series.samples`.
pub fn collapse_hourly(series: &FilteredSeries) -> FilteredSeries {
    let mut by_hour: BTreeMap<DateTime<Utc>, Vec<f64>> = BTreeMap::new();
    for s in &series.samples {
        by_hour.entry(s.hour).or_default().push(s.players);
    }

    let samples = by_hour
        .into_iter()
        .map(|(hour, mut values)| FilteredSample {
            hour,
            players: canonical_mean(&mut values),
        })
        .collect();

    FilteredSeries {
        game: series.game.clone(),
        samples,
    }
}

/// Mean of a non-empty slice, summed in ascending order.
pub(crate) fn canonical_mean(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    values.iter().sum::<f64>() / values.len() as f64
}

fn check_order(samples: &[Sample], tolerance_minutes: u32) -> Result<(), FilterError> {
    let tolerance = Duration::minutes(tolerance_minutes as i64);
    let mut latest: Option<DateTime<Utc>> = None;
    for s in samples {
        match latest {
            Some(l) if s.timestamp < l - tolerance => {
                return Err(FilterError::OutOfOrder {
                    latest: l,
                    current: s.timestamp,
                    tolerance_minutes,
                });
            }
            Some(l) if s.timestamp <= l => {}
            _ => latest = Some(s.timestamp),
        }
    }
    Ok(())
}
