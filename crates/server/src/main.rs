use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gametracker_core::TrackerConfig;
use gametracker_core::db::{Database, SnapshotsDao};
use gametracker_core::domain::{DailyScheduler, HistoryService, SnapshotRecorder};
use gametracker_core::models::RunStatus;
use gametracker_core::source::SteamClient;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gametracker", about = "Daily game playtime snapshot tracker")]
struct Cli {
    /// Database path, overriding GAMETRACKER_DB
    #[arg(long)]
    db: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daily snapshot scheduler in the foreground
    Run,
    /// Run one reconciliation cycle now and exit
    Record,
    /// Print the aggregate daily history
    History {
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
    /// Print the per-game breakdown for a date
    Breakdown {
        #[arg(long)]
        date: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = TrackerConfig::from_env()?;
    if let Some(db_path) = cli.db {
        config.db_path = db_path;
    }

    let db = Arc::new(Database::open(&config.db_path)?);

    match cli.command {
        Command::Run => run_scheduler(db, &config),
        Command::Record => record_once(db, &config),
        Command::History { days } => print_history(db, &config, days),
        Command::Breakdown { date } => print_breakdown(db, &config, &date),
    }
}

fn build_recorder(db: Arc<Database>, config: &TrackerConfig) -> Result<Arc<SnapshotRecorder>> {
    let source = Arc::new(SteamClient::new(config)?);
    Ok(Arc::new(SnapshotRecorder::new(db, source, config)))
}

fn run_scheduler(db: Arc<Database>, config: &TrackerConfig) -> Result<()> {
    let recorder = build_recorder(Arc::clone(&db), config)?;
    let snapshots = SnapshotsDao::new(db);

    let _scheduler = DailyScheduler::start(
        recorder,
        snapshots,
        config.reference_offset(),
        config.run_time,
    );

    info!(
        run_time = %config.run_time,
        offset_minutes = config.reference_offset_minutes,
        "scheduler running"
    );

    loop {
        std::thread::sleep(Duration::from_secs(3600));
    }
}

fn record_once(db: Arc<Database>, config: &TrackerConfig) -> Result<()> {
    let recorder = build_recorder(db, config)?;
    let result = recorder.record_today();

    match result.status {
        RunStatus::Completed => println!(
            "{}: recorded {:.1} h across {} games{}",
            result.date,
            result.total_hours,
            result.games_count,
            if result.source_refreshed {
                ""
            } else {
                " (source unavailable, used stored hours)"
            }
        ),
        RunStatus::Skipped => println!("{}: skipped, another cycle is running", result.date),
        RunStatus::Failed => anyhow::bail!(
            "cycle failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        ),
    }

    Ok(())
}

fn print_history(db: Arc<Database>, config: &TrackerConfig, days: u32) -> Result<()> {
    let history = HistoryService::new(db, config).get_daily_history(days)?;

    if history.is_empty() {
        println!("no snapshots recorded yet");
        return Ok(());
    }

    for entry in history {
        println!(
            "{}  {:8.1} h total  {:+6.1} h  {} games",
            entry.date, entry.total_hours, entry.hours_added, entry.games_played
        );
    }

    Ok(())
}

fn print_breakdown(db: Arc<Database>, config: &TrackerConfig, date: &str) -> Result<()> {
    let breakdown = HistoryService::new(db, config).get_games_played_on(date)?;

    if breakdown.is_first_day {
        println!(
            "{}: first recorded day, no prior snapshot to diff against",
            breakdown.date
        );
        return Ok(());
    }

    if breakdown.games.is_empty() {
        println!("{}: no games played", breakdown.date);
        return Ok(());
    }

    for game in breakdown.games {
        println!(
            "{:<40} +{:.1} h  ({:.1} h total)",
            game.title, game.hours_added, game.total_hours
        );
    }

    Ok(())
}
