use std::path::PathBuf;

use clap::{Parser, Subcommand};

use kazi_core::ids::ActorId;
use kazi_store::tasks::TaskRepo;
use kazi_store::Database;
use kazi_telemetry::{LogQuery, TelemetryConfig};

#[derive(Parser)]
#[command(name = "kazi", about = "Task lifecycle and VAT reconciliation engine")]
struct Cli {
    /// Data directory; defaults to ~/.kazi
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database and schema
    Init,
    /// Per-status task counts for an actor
    Workload {
        #[arg(long)]
        actor: String,
    },
    /// Search persisted warn+ logs
    Logs {
        #[arg(long)]
        level: Option<String>,
        #[arg(long)]
        task: Option<String>,
        #[arg(long)]
        since: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
}

fn main() {
    let cli = Cli::parse();
    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);

    let telemetry = kazi_telemetry::init_telemetry(TelemetryConfig {
        log_db_path: data_dir.join("database/logs.db"),
        ..TelemetryConfig::default()
    });

    if let Err(e) = run(&cli, &data_dir, &telemetry) {
        tracing::error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(
    cli: &Cli,
    data_dir: &std::path::Path,
    telemetry: &kazi_telemetry::TelemetryGuard,
) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = data_dir.join("database/kazi.db");

    match &cli.command {
        Command::Init => {
            let db = Database::open(&db_path)?;
            println!("database ready at {}", db.path().display());
        }
        Command::Workload { actor } => {
            let db = Database::open(&db_path)?;
            let repo = TaskRepo::new(db);
            let counts = repo.status_counts(&ActorId::from_raw(actor.clone()))?;
            if counts.is_empty() {
                println!("no tasks assigned to {actor}");
            }
            for (status, count) in counts {
                println!("{status:<16} {count}");
            }
        }
        Command::Logs {
            level,
            task,
            since,
            limit,
        } => {
            let Some(sink) = telemetry.logs() else {
                return Err("log persistence is disabled".into());
            };
            let records = sink.query(&LogQuery {
                level: level.clone(),
                task_id: task.clone(),
                since: since.clone(),
                limit: Some(*limit),
                ..LogQuery::default()
            })?;
            for r in records {
                println!("{} {:<5} {} {}", r.timestamp, r.level, r.target, r.message);
            }
        }
    }

    Ok(())
}

fn default_data_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join(".kazi")
}
