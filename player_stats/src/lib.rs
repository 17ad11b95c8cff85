//! Hourly player-count pipeline for Steam games.
//!
//! Three file-to-file stages turn raw player-count exports into per-game
//! summary statistics:
//!
//! 1. [`filter`]: keep dates with hourly-or-finer sampling and collapse the
//!    readings to one value per UTC hour.
//! 2. [`aggregate`]: average those hourly values into a 24-slot
//!    [`models::DailyProfile`].
//! 3. [`describe`]: mean and sample standard deviation of each profile.
//!
//! [`pipeline`] drives the stages over whole directories; [`curation`] seeds
//! and reads the hand-edited copy of the Stat table.

pub mod aggregate;
pub mod bucket;
pub mod config;
pub mod curation;
pub mod describe;
pub mod errors;
pub mod filter;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod tz;

pub use errors::{Error, Result};
