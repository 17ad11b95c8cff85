//! Aggregation stage: hour-of-day profile across all retained dates.

use chrono_tz::Tz;

use crate::filter::canonical_mean;
use crate::models::{DailyProfile, FilteredSeries, HOURS_PER_DAY};
use crate::tz::local_hour_slot;

/// Reference frame for hour-of-day slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateParams {
    /// Zone whose wall-clock hour picks the slot. UTC unless configured.
    pub tz: Tz,
}

impl Default for AggregateParams {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

/// Build the 24-slot mean profile for one game.
///
/// Slots without any value stay `None`. The result depends only on the
/// multiset of input values: each slot is summed in sorted order.
pub fn daily_profile(series: &FilteredSeries, params: &AggregateParams) -> DailyProfile {
    let mut groups: [Vec<f64>; HOURS_PER_DAY] = Default::default();
    for s in &series.samples {
        groups[local_hour_slot(s.hour, params.tz).index()].push(s.players);
    }

    let mut profile = DailyProfile::empty(series.game.clone());
    for (slot, values) in profile.slots.iter_mut().zip(groups.iter_mut()) {
        if !values.is_empty() {
            *slot = Some(canonical_mean(values));
        }
    }
    profile
}
