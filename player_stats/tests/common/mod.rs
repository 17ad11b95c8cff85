#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use player_stats::config::{ResolvedConfig, load_config_path};
use tempfile::TempDir;

pub struct TestWorkspace {
    _dir: TempDir, // keep alive for the life of the test
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub cfg: ResolvedConfig,
}

impl TestWorkspace {
    pub fn raw(&self, game: &str) -> PathBuf {
        self.cfg.dirs.raw.join(format!("{game}.csv"))
    }

    pub fn write_raw(&self, game: &str, content: &str) {
        std::fs::write(self.raw(game), content).expect("write raw file");
    }

    pub fn read(&self, path: impl AsRef<Path>) -> String {
        std::fs::read_to_string(path).expect("read output")
    }

    pub fn stats_table(&self) -> String {
        self.read(self.cfg.dirs.stats.join("Descriptives.csv"))
    }
}

/// Temp workspace with a `player_stats.toml` using relative stage dirs and
/// an existing, empty raw dir. `extra` is appended to the TOML.
pub fn setup_workspace(extra: &str) -> TestWorkspace {
    let dir = TempDir::new().expect("tempdir");
    let root = dir.path().to_path_buf();
    let config_path = root.join("player_stats.toml");
    let toml = format!(
        r#"
[dirs]
raw = "Raw Data"
filtered = "Filtered Data"
averaged = "Averaged Data"
stats = "Stat Data"
{extra}
"#
    );
    std::fs::write(&config_path, toml).expect("write config");
    std::fs::create_dir_all(root.join("Raw Data")).expect("raw dir");

    let cfg = load_config_path(&config_path).expect("load config");
    TestWorkspace {
        _dir: dir,
        root,
        config_path,
        cfg,
    }
}

pub fn ts(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
    date.and_hms_opt(h, m, 0).expect("valid time")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Raw export body for `readings`, in order.
pub fn raw_csv(readings: impl IntoIterator<Item = (NaiveDateTime, u64)>) -> String {
    let mut out = String::from("DateTime,Players,Average Players\n");
    for (t, players) in readings {
        out.push_str(&format!("{},{players},\n", t.format("%Y-%m-%d %H:%M:%S")));
    }
    out
}

/// One reading at the top of every hour of `day`, `players(hour)` each.
pub fn full_day(day: NaiveDate, players: impl Fn(u32) -> u64) -> Vec<(NaiveDateTime, u64)> {
    (0..24).map(|h| (ts(day, h, 0), players(h))).collect()
}

/// `n` readings spaced `step` apart starting at `start`, all `players`.
pub fn spaced(
    start: NaiveDateTime,
    step: Duration,
    n: usize,
    players: u64,
) -> Vec<(NaiveDateTime, u64)> {
    (0..n).map(|i| (start + step * i as i32, players)).collect()
}
