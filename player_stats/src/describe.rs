//! Descriptive stage: mean and sample standard deviation per profile.

use crate::models::{DailyProfile, StatRecord};

/// Mean and sample standard deviation (n − 1) over the present slots.
///
/// - no present slot: mean and SD undefined
/// - one present slot: mean defined, SD undefined
pub fn describe(profile: &DailyProfile) -> StatRecord {
    let values: Vec<f64> = profile.present().collect();
    let n = values.len();

    let mean = (n > 0).then(|| values.iter().sum::<f64>() / n as f64);
    let sd = match mean {
        Some(m) if n > 1 => {
            let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
            Some((ss / (n as f64 - 1.0)).sqrt())
        }
        _ => None,
    };

    StatRecord {
        game: profile.game.clone(),
        mean,
        sd,
        present: n,
    }
}

/// Describe many profiles, sorted by game name.
pub fn describe_all<'a>(profiles: impl IntoIterator<Item = &'a DailyProfile>) -> Vec<StatRecord> {
    let mut out: Vec<StatRecord> = profiles.into_iter().map(describe).collect();
    out.sort_by(|a, b| a.game.cmp(&b.game));
    out
}
