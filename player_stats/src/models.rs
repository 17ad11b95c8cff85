//! In-memory records flowing through the pipeline.
//!
//! - [`Sample`] / [`SampleSeries`]: raw, timestamped player counts for one game.
//! - [`FilteredSample`] / [`FilteredSeries`]: hour-grid values on qualifying dates.
//! - [`DailyProfile`]: the 24-slot hour-of-day mean curve.
//! - [`StatRecord`]: summary statistics over a profile.

use std::fmt;

use chrono::{DateTime, NaiveDate, Timelike, Utc};

/// Number of hour-of-day slots in a [`DailyProfile`].
pub const HOURS_PER_DAY: usize = 24;

/// A single raw player-count reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// When the reading was taken (UTC).
    pub timestamp: DateTime<Utc>,
    /// Concurrent players at `timestamp`.
    pub players: u64,
}

/// All raw readings for one game, ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSeries {
    /// Game identifier (the raw file stem, e.g. "Counter-Strike 2").
    pub game: String,
    /// Readings, ascending by timestamp.
    pub samples: Vec<Sample>,
}

/// A value placed on the hour grid of a qualifying date.
///
/// Straight out of the filter stage `players` is a raw count; after
/// [`collapse_hourly`](crate::filter::collapse_hourly) it is the mean of all
/// counts that landed on the same hour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredSample {
    /// Start of the UTC hour this value belongs to.
    pub hour: DateTime<Utc>,
    /// Player count or per-hour mean.
    pub players: f64,
}

impl FilteredSample {
    /// UTC date of the hour.
    pub fn date(&self) -> NaiveDate {
        self.hour.date_naive()
    }

    /// UTC hour-of-day slot.
    pub fn hour_slot(&self) -> HourSlot {
        HourSlot::from_hour_component(self.hour.hour())
    }
}

/// Hour-grid values for one game.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredSeries {
    /// Game identifier.
    pub game: String,
    /// Values, ascending by hour once collapsed.
    pub samples: Vec<FilteredSample>,
}

/// Hour-of-day bucket, always in `0..=23`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HourSlot(u8);

impl HourSlot {
    /// Returns `None` for hours outside `0..=23`.
    pub const fn new(hour: u8) -> Option<Self> {
        if (hour as usize) < HOURS_PER_DAY {
            Some(Self(hour))
        } else {
            None
        }
    }

    /// Wraps the hour component of a chrono time, which is always in range.
    pub(crate) fn from_hour_component(hour: u32) -> Self {
        Self((hour % HOURS_PER_DAY as u32) as u8)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// All 24 slots in order.
    pub fn all() -> impl Iterator<Item = HourSlot> {
        (0..HOURS_PER_DAY as u8).map(HourSlot)
    }
}

impl TryFrom<u8> for HourSlot {
    type Error = String;

    fn try_from(hour: u8) -> Result<Self, Self::Error> {
        Self::new(hour).ok_or_else(|| format!("hour slot out of range: {hour}"))
    }
}

impl From<HourSlot> for u8 {
    fn from(slot: HourSlot) -> Self {
        slot.0
    }
}

impl fmt::Display for HourSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mean player count per hour-of-day for one game.
///
/// Always 24 entries; `None` marks a slot with no samples, which is not the
/// same thing as a slot whose mean is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyProfile {
    /// Game identifier.
    pub game: String,
    /// Slot values indexed by [`HourSlot::index`].
    pub slots: [Option<f64>; HOURS_PER_DAY],
}

impl DailyProfile {
    /// A profile with every slot absent.
    pub fn empty(game: impl Into<String>) -> Self {
        Self {
            game: game.into(),
            slots: [None; HOURS_PER_DAY],
        }
    }

    pub fn get(&self, slot: HourSlot) -> Option<f64> {
        self.slots[slot.index()]
    }

    /// Present values in slot order.
    pub fn present(&self) -> impl Iterator<Item = f64> + '_ {
        self.slots.iter().flatten().copied()
    }

    pub fn present_count(&self) -> usize {
        self.slots.iter().filter(|v| v.is_some()).count()
    }

    /// `true` when no slot has a value.
    pub fn is_empty(&self) -> bool {
        self.present_count() == 0
    }
}

/// Summary statistics over one game's present profile values.
#[derive(Debug, Clone, PartialEq)]
pub struct StatRecord {
    /// Game identifier.
    pub game: String,
    /// Mean of present slots; `None` when no slot is present.
    pub mean: Option<f64>,
    /// Sample standard deviation; `None` with fewer than two present slots.
    pub sd: Option<f64>,
    /// Number of present slots the statistics were computed from.
    pub present: usize,
}
