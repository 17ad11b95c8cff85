mod common;
use common::{TestWorkspace, date, full_day, raw_csv, setup_workspace, spaced, ts};

use chrono::Duration;
use player_stats::io::tables::{read_averaged, read_stats};
use player_stats::pipeline::{GameOutcome, Stage, run_stages};

fn seed_games(ws: &TestWorkspace) {
    let d1 = date(2024, 9, 1);
    let d2 = date(2024, 9, 2);

    // slot h averages to 10h + 10 over the two days
    let mut alpha = full_day(d1, |h| 10 * h as u64);
    alpha.extend(full_day(d2, |h| 10 * h as u64 + 20));
    ws.write_raw("Alpha", &raw_csv(alpha));

    // a flat day plus one half-hour reading shared by hours 10 and 11
    let mut tie = full_day(d1, |_| 100);
    tie.insert(11, (ts(d1, 10, 30), 50));
    ws.write_raw("Tie", &raw_csv(tie));

    // never dense enough to qualify
    let mut sparse = spaced(ts(d1, 0, 0), Duration::hours(6), 4, 9);
    sparse.extend(spaced(ts(d2, 0, 0), Duration::hours(6), 4, 9));
    ws.write_raw("Sparse", &raw_csv(sparse));
}

fn stat_row<'a>(table: &'a str, game: &str) -> Vec<&'a str> {
    table
        .lines()
        .find(|l| l.starts_with(&format!("{game},")))
        .unwrap_or_else(|| panic!("no row for {game} in\n{table}"))
        .split(',')
        .collect()
}

#[test]
fn full_run_produces_every_stage_output() {
    let ws = setup_workspace("");
    seed_games(&ws);

    let reports = run_stages(&ws.cfg, &Stage::ALL).expect("run");
    let stages: Vec<Stage> = reports.iter().map(|r| r.stage).collect();
    assert_eq!(stages, Stage::ALL.to_vec());
    for r in &reports {
        assert_eq!(r.failed(), 0, "{:?}", r.stage);
        assert_eq!(r.games.len(), 3);
    }
    assert!(matches!(
        reports[0].games["Sparse"],
        GameOutcome::NoQualifyingDates { .. }
    ));

    let dirs = &ws.cfg.dirs;
    let tie_filtered = ws.read(dirs.filtered.join("filtered_Tie.csv"));
    assert!(tie_filtered.contains("\n2024-09-01 10:00:00,75\n"));
    assert!(tie_filtered.contains("\n2024-09-01 11:00:00,75\n"));
    assert_eq!(tie_filtered.lines().count(), 25);

    assert_eq!(
        ws.read(dirs.filtered.join("filtered_Sparse.csv")),
        "DateTime,AvgPlayers\n"
    );

    let (alpha, _) = read_averaged(&dirs.averaged.join("daily_avg_filtered_Alpha.csv"), "Alpha")
        .expect("averaged table");
    for (i, v) in alpha.slots.iter().enumerate() {
        assert_eq!(*v, Some(10.0 * i as f64 + 10.0));
    }
    let (sparse, _) =
        read_averaged(&dirs.averaged.join("daily_avg_filtered_Sparse.csv"), "Sparse")
            .expect("averaged table");
    assert!(sparse.is_empty());

    let table = ws.stats_table();
    assert!(table.starts_with("Game,Mean,SD\n"));
    let games: Vec<&str> = table
        .lines()
        .skip(1)
        .map(|l| l.split(',').next().unwrap_or_default())
        .collect();
    assert_eq!(games, vec!["Alpha", "Sparse", "Tie"]);
    assert_eq!(stat_row(&table, "Sparse"), vec!["Sparse", "", ""]);

    let (records, malformed) = read_stats(&dirs.stats.join("Descriptives.csv")).expect("stats");
    assert!(malformed.is_empty());
    let alpha = &records[0];
    assert!((alpha.mean.unwrap() - 125.0).abs() < 1e-9);
    assert!((alpha.sd.unwrap() - 10.0 * 50f64.sqrt()).abs() < 1e-9);
    let tie = &records[2];
    assert!((tie.mean.unwrap() - 2350.0 / 24.0).abs() < 1e-9);
}

#[test]
fn rerun_rewrites_identical_bytes() {
    let ws = setup_workspace("");
    seed_games(&ws);

    run_stages(&ws.cfg, &Stage::ALL).expect("first run");
    let first: Vec<_> = reports_snapshot(&ws);
    run_stages(&ws.cfg, &Stage::ALL).expect("second run");
    assert_eq!(reports_snapshot(&ws), first);
}

fn reports_snapshot(ws: &TestWorkspace) -> Vec<(String, Vec<u8>)> {
    let dirs = &ws.cfg.dirs;
    let mut out = Vec::new();
    for dir in [&dirs.filtered, &dirs.averaged, &dirs.stats] {
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        paths.sort();
        for p in paths {
            out.push((p.display().to_string(), std::fs::read(&p).unwrap()));
        }
    }
    out
}

#[test]
fn one_bad_game_does_not_stop_the_batch() {
    let ws = setup_workspace("");
    seed_games(&ws);
    ws.write_raw("Broken", "When,Count\n2024-09-01 00:00:00,3\n");

    let d = date(2024, 9, 1);
    let mut backwards = full_day(d, |_| 1);
    backwards.push((ts(d, 5, 0), 1));
    ws.write_raw("Backwards", &raw_csv(backwards));

    let reports = run_stages(&ws.cfg, &Stage::ALL).expect("run");
    let filter = &reports[0];
    assert_eq!(filter.failed(), 2);
    assert_eq!(filter.succeeded(), 3);
    assert!(filter.games["Broken"].is_failure());
    assert!(filter.games["Backwards"].is_failure());

    let table = ws.stats_table();
    assert!(!table.contains("Broken"));
    assert!(!table.contains("Backwards"));
    assert_eq!(table.lines().count(), 4);
}

#[test]
fn malformed_rows_are_counted_not_fatal() {
    let ws = setup_workspace("");
    let d = date(2024, 9, 1);
    let mut body = raw_csv(full_day(d, |h| h as u64));
    body.push_str("garbage,row,\n2024-09-01 23:30:00,,\n");
    ws.write_raw("Noisy", &body);

    let reports = run_stages(&ws.cfg, &[Stage::Filter]).expect("run");
    match &reports[0].games["Noisy"] {
        GameOutcome::Written { rows, malformed, .. } => {
            assert_eq!(*rows, 24);
            assert_eq!(*malformed, 2);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn later_stages_rerun_from_existing_files() {
    let ws = setup_workspace("");
    seed_games(&ws);

    let reports = run_stages(&ws.cfg, &[Stage::Filter]).expect("filter only");
    assert_eq!(reports.len(), 1);
    assert_eq!(
        std::fs::read_dir(&ws.cfg.dirs.averaged).unwrap().count(),
        0,
        "average stage must not have run"
    );

    // remove the raw store; later stages only need the filtered tables
    std::fs::remove_dir_all(&ws.cfg.dirs.raw).unwrap();
    std::fs::create_dir_all(&ws.cfg.dirs.raw).unwrap();

    let reports = run_stages(&ws.cfg, &[Stage::Describe, Stage::Average, Stage::Describe])
        .expect("average + describe");
    let stages: Vec<Stage> = reports.iter().map(|r| r.stage).collect();
    assert_eq!(stages, vec![Stage::Average, Stage::Describe]);
    assert_eq!(ws.stats_table().lines().count(), 4);
}

#[test]
fn missing_raw_dir_aborts_before_any_work() {
    let ws = setup_workspace("");
    std::fs::remove_dir_all(&ws.cfg.dirs.raw).unwrap();

    let err = run_stages(&ws.cfg, &Stage::ALL).unwrap_err();
    assert!(format!("{err:#}").contains("raw data directory"));
    assert!(!ws.cfg.dirs.stats.exists());
}

#[test]
fn start_date_drops_earlier_dates() {
    let ws = setup_workspace("[filter]\nstart_date = \"2024-09-02\"\n");
    seed_games(&ws);

    run_stages(&ws.cfg, &Stage::ALL).expect("run");
    let filtered = ws.read(ws.cfg.dirs.filtered.join("filtered_Alpha.csv"));
    assert!(!filtered.contains("2024-09-01"));
    assert_eq!(filtered.lines().count(), 25);

    // Tie only has data on the first date
    assert_eq!(stat_row(&ws.stats_table(), "Tie"), vec!["Tie", "", ""]);
}

#[test]
fn timezone_shifts_profile_slots() {
    let ws = setup_workspace("[aggregate]\ntimezone = \"Asia/Tokyo\"\n");
    let d = date(2024, 9, 1);
    ws.write_raw("Shifted", &raw_csv(full_day(d, |h| h as u64)));

    run_stages(&ws.cfg, &[Stage::Filter, Stage::Average]).expect("run");
    let (profile, _) = read_averaged(
        &ws.cfg.dirs.averaged.join("daily_avg_filtered_Shifted.csv"),
        "Shifted",
    )
    .expect("averaged");
    // 00:00 UTC is 09:00 in Tokyo
    assert_eq!(profile.slots[9], Some(0.0));
    assert_eq!(profile.slots[8], Some(23.0));
}

#[test]
fn game_failing_on_rerun_drops_out_of_later_stages() {
    let ws = setup_workspace("");
    seed_games(&ws);
    run_stages(&ws.cfg, &Stage::ALL).expect("first run");
    assert!(ws.stats_table().contains("\nAlpha,"));

    ws.write_raw("Alpha", "When,Count\n2024-09-01 00:00:00,100\n");
    let reports = run_stages(&ws.cfg, &Stage::ALL).expect("second run");

    assert!(reports[0].games["Alpha"].is_failure());
    assert!(!reports[1].games.contains_key("Alpha"));
    assert!(!reports[2].games.contains_key("Alpha"));
    assert!(!ws.cfg.dirs.filtered.join("filtered_Alpha.csv").exists());
    assert!(!ws.cfg.dirs.averaged.join("daily_avg_filtered_Alpha.csv").exists());

    let table = ws.stats_table();
    assert!(!table.contains("Alpha"), "{table}");
    assert_eq!(table.lines().count(), 3);
}

#[test]
fn filter_only_rerun_still_clears_stale_averages() {
    let ws = setup_workspace("");
    seed_games(&ws);
    run_stages(&ws.cfg, &Stage::ALL).expect("first run");

    let d = date(2024, 9, 1);
    let mut backwards = full_day(d, |_| 1);
    backwards.push((ts(d, 0, 0), 1));
    ws.write_raw("Tie", &raw_csv(backwards));

    run_stages(&ws.cfg, &[Stage::Filter]).expect("filter only");
    run_stages(&ws.cfg, &[Stage::Describe]).expect("describe only");
    assert!(!ws.stats_table().contains("Tie"));
}
