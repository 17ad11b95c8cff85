use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use player_stats::config::{load_config_path, locate_config};
use player_stats::curation::{games_without_cloud_save_by_player_mode, read_curated, write_template};
use player_stats::io::{CURATED_STATS_FILE, STATS_FILE};
use player_stats::pipeline::{GameOutcome, Stage, run_stages};

#[derive(Parser)]
#[command(version, about = "Steam player-count statistics pipeline")]
struct Cli {
    /// Pipeline config (TOML). Defaults to $PLAYER_STATS_CONFIG, then ./player_stats.toml.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run pipeline stages over every game.
    Run {
        /// Stage to run; repeat for several. All stages when omitted.
        #[arg(long = "stage", value_enum)]
        stages: Vec<StageArg>,
    },
    Curation(CurationCmd),
}

#[derive(Args)]
struct CurationCmd {
    #[command(subcommand)]
    sub: CurationSub,
}

#[derive(Subcommand)]
enum CurationSub {
    /// Seed Descriptives_edited.csv from Descriptives.csv.
    Template,
    /// Summarize the curated Stat table.
    Summary,
}

#[derive(Clone, Copy, ValueEnum)]
enum StageArg {
    Filter,
    Average,
    Describe,
}

impl From<StageArg> for Stage {
    fn from(s: StageArg) -> Self {
        match s {
            StageArg::Filter => Stage::Filter,
            StageArg::Average => Stage::Average,
            StageArg::Describe => Stage::Describe,
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = locate_config(cli.config);
    let cfg = load_config_path(&config_path)?;

    match cli.cmd {
        Cmd::Run { stages } => {
            let stages: Vec<Stage> = if stages.is_empty() {
                Stage::ALL.to_vec()
            } else {
                stages.into_iter().map(Stage::from).collect()
            };

            let reports = run_stages(&cfg, &stages)?;
            for report in &reports {
                for path in report.outputs() {
                    println!("{}", path.display());
                }
                for (game, outcome) in &report.games {
                    if let GameOutcome::Failed(e) = outcome {
                        eprintln!("ERROR: {} {} - {}", report.stage, game, e);
                    }
                }
            }
            for report in &reports {
                eprintln!(
                    "SUMMARY: {} {} succeeded, {} failed",
                    report.stage,
                    report.succeeded(),
                    report.failed()
                );
            }
        }
        Cmd::Curation(CurationCmd { sub }) => {
            let stats = cfg.dirs.stats.join(STATS_FILE);
            let curated = cfg.dirs.stats.join(CURATED_STATS_FILE);
            match sub {
                CurationSub::Template => {
                    write_template(&stats, &curated)
                        .with_context(|| format!("seed {}", curated.display()))?;
                    println!("{}", curated.display());
                }
                CurationSub::Summary => {
                    let (rows, malformed) = read_curated(&curated)
                        .with_context(|| format!("read {}", curated.display()))?;

                    println!("Player mode,Games without cloud save");
                    for (mode, count) in games_without_cloud_save_by_player_mode(&rows) {
                        println!("{mode},{count}");
                    }
                    let undefined: Vec<&str> = rows
                        .iter()
                        .filter(|r| r.stat.mean.is_none() || r.stat.sd.is_none())
                        .map(|r| r.stat.game.as_str())
                        .collect();
                    if !undefined.is_empty() {
                        println!();
                        println!("Games with undefined statistics:");
                        for game in undefined {
                            println!("{game}");
                        }
                    }
                    eprintln!(
                        "SUMMARY: {} curated games, {} rows skipped",
                        rows.len(),
                        malformed.len()
                    );
                }
            }
        }
    }

    Ok(())
}
