//! optrack CLI - operations checklist progress tracking.

mod import;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use optrack_core::{Clock, PartNumber, Phase, PhaseId, Priority, Subphase, SubphaseId, SystemClock, TrackingMode, WorkItem};
use optrack_progress::{BasicProgressTracker, ProgressFilter, ProgressSort, ProgressStatus, ProgressTracker};
use optrack_storage::{JsonDirectory, JsonStorage, Repository};
use optrack_work::{evaluate_completion, BasicTrackingManager, GateDecision, TrackingConfig, TrackingManager};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "optrack")]
#[command(about = "Operations checklist progress tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Storage directory for work items and the employee directory
    #[arg(short, long, global = true, default_value = ".optrack")]
    storage: PathBuf,

    /// JSON tracking configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create work items from a JSON draft file
    Import {
        /// Draft file (one item or an array)
        file: PathBuf,
    },
    /// Start a phase
    Start { part: String, phase: String },
    /// Pause a running phase
    Pause { part: String, phase: String },
    /// Resume a paused phase
    Resume { part: String, phase: String },
    /// Stop a running phase whose subphases are all complete
    Stop { part: String, phase: String },
    /// Reset a phase timer
    Reset { part: String, phase: String },
    /// Mark a subphase complete (true) or incomplete (false)
    Toggle {
        subphase: String,
        #[arg(action = clap::ArgAction::Set)]
        completed: bool,
    },
    /// Set a subphase's completed quantity
    Quantity {
        subphase: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Assign a worker by scanned badge code
    Assign { subphase: String, code: String },
    /// Show per-phase and per-item progress
    Progress { part: String },
    /// List work items by progress
    List {
        /// not-started, in-progress or complete
        #[arg(long)]
        status: Option<ProgressStatus>,
        /// High, Medium or Low
        #[arg(long)]
        priority: Option<Priority>,
        /// Client name
        #[arg(long)]
        client: Option<String>,
        /// Substring of part number or name
        #[arg(long)]
        search: Option<String>,
        /// progress, priority or part
        #[arg(long, default_value = "priority")]
        sort: ProgressSort,
    },
    /// Show a work item with phase states and gating hints
    Show { part: String },
    /// Time report: elapsed per phase, recorded vs expected per subphase
    Report { part: String },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn load_config(path: Option<&Path>) -> Result<TrackingConfig> {
    let Some(path) = path else {
        return Ok(TrackingConfig::default());
    };
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing config {}", path.display()))
}

fn part(s: &str) -> Result<PartNumber> {
    PartNumber::new(s).context("invalid part number")
}

fn phase_id(s: &str) -> Result<PhaseId> {
    s.parse().map_err(|_| anyhow::anyhow!("Invalid phase ID: {s}"))
}

fn subphase_id(s: &str) -> Result<SubphaseId> {
    s.parse().map_err(|_| anyhow::anyhow!("Invalid subphase ID: {s}"))
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = load_config(cli.config.as_deref()).await?;
    let storage = Arc::new(JsonStorage::new(&cli.storage).await?);
    let directory = Arc::new(JsonDirectory::open(cli.storage.join("employees.json")).await?);
    let manager = BasicTrackingManager::new(storage.clone(), directory).with_config(config);
    let tracker = BasicProgressTracker::new(storage.clone());
    let clock = SystemClock;
    let json = cli.json;

    match cli.command {
        Commands::Import { file } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            for draft in import::parse_drafts(&text)? {
                let item = draft.into_work_item()?;
                storage
                    .save_item(&item, None)
                    .await
                    .with_context(|| format!("importing {}", item.part_number))?;
                info!(part_number = %item.part_number, phases = item.phases.len(), "imported work item");
                println!("Imported {} - {}", item.part_number, item.name);
            }
        }
        Commands::Start { part: p, phase } => {
            let updated = manager.start_phase(&part(&p)?, phase_id(&phase)?).await?;
            emit(json, &updated, |ph| print_phase_line(ph, clock.now()))?;
        }
        Commands::Pause { part: p, phase } => {
            let updated = manager.pause_phase(&part(&p)?, phase_id(&phase)?).await?;
            emit(json, &updated, |ph| print_phase_line(ph, clock.now()))?;
        }
        Commands::Resume { part: p, phase } => {
            let updated = manager.resume_phase(&part(&p)?, phase_id(&phase)?).await?;
            emit(json, &updated, |ph| print_phase_line(ph, clock.now()))?;
        }
        Commands::Stop { part: p, phase } => {
            let updated = manager.stop_phase(&part(&p)?, phase_id(&phase)?).await?;
            emit(json, &updated, |ph| print_phase_line(ph, clock.now()))?;
        }
        Commands::Reset { part: p, phase } => {
            let updated = manager.reset_phase(&part(&p)?, phase_id(&phase)?).await?;
            emit(json, &updated, |ph| print_phase_line(ph, clock.now()))?;
        }
        Commands::Toggle { subphase, completed } => {
            let updated = manager.toggle_subphase(subphase_id(&subphase)?, completed).await?;
            emit(json, &updated, print_subphase_line)?;
        }
        Commands::Quantity { subphase, quantity } => {
            let updated = manager.update_quantity(subphase_id(&subphase)?, quantity).await?;
            emit(json, &updated, print_subphase_line)?;
        }
        Commands::Assign { subphase, code } => {
            let updated = manager.assign_worker(subphase_id(&subphase)?, &code).await?;
            emit(json, &updated, print_subphase_line)?;
        }
        Commands::Progress { part: p } => {
            let report = manager.get_progress(&part(&p)?).await?;
            emit(json, &report, |r| {
                println!("{}: {}% ({})", r.part_number, r.item.percentage, r.item.status);
                for phase in &r.phases {
                    println!(
                        "  {:<24} {:>3}%  {}/{}",
                        phase.name, phase.percentage, phase.completed_subphases, phase.total_subphases
                    );
                }
            })?;
        }
        Commands::List { status, priority, client, search, sort } => {
            let filter = ProgressFilter {
                status,
                priority,
                client_name: client,
                search,
            };
            let rows = tracker.list(&filter, sort).await?;
            emit(json, &rows, |rows| {
                println!("Work items ({})", rows.len());
                for row in rows {
                    println!(
                        "  {} | {:<6} | {:>3}% | {:<11} | {} | {}",
                        row.part_number,
                        row.priority,
                        row.progress,
                        row.status.to_string(),
                        row.name,
                        row.current_phase.as_deref().unwrap_or("-"),
                    );
                }
            })?;
        }
        Commands::Show { part: p } => {
            let item = manager.load_item(&part(&p)?).await?;
            emit(json, &item, |item| print_item(item, clock.now()))?;
        }
        Commands::Report { part: p } => {
            let part_number = part(&p)?;
            let Some(report) = tracker.time_report(&part_number).await? else {
                anyhow::bail!("Work item not found: {part_number}");
            };
            emit(json, &report, |r| {
                println!("Time report for {} at {}", r.part_number, r.generated_at);
                for phase in &r.phases {
                    println!(
                        "  {} [{}] elapsed {} paused {}",
                        phase.name,
                        phase.state,
                        format_seconds(phase.elapsed_seconds),
                        format_seconds(phase.paused_seconds),
                    );
                    for sub in &phase.subphases {
                        println!(
                            "    {} {:<24} recorded {:>9} expected {:>6}{}",
                            if sub.completed { "[x]" } else { "[ ]" },
                            sub.name,
                            sub.recorded_seconds.map(format_seconds).unwrap_or_else(|| "-".into()),
                            sub.expected_minutes.map(|m| format!("{m}m")).unwrap_or_else(|| "-".into()),
                            if sub.overrun { "  OVERRUN" } else { "" },
                        );
                    }
                }
                println!("  Total elapsed: {}", format_seconds(r.total_elapsed_seconds));
            })?;
        }
    }

    Ok(())
}

fn format_seconds(total: u64) -> String {
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    format!("{h:02}:{m:02}:{s:02}")
}

fn print_phase_line(phase: &Phase, now: optrack_core::Time) {
    println!(
        "Phase {} ({}) is {} - elapsed {}",
        phase.name,
        phase.id,
        phase.state(),
        format_seconds(phase.elapsed(now)),
    );
}

fn print_subphase_line(sub: &Subphase) {
    let quantity = match sub.mode() {
        TrackingMode::QuantityTracked => {
            format!(" qty {}/{}", sub.current_completed_quantity, sub.expected_quantity)
        }
        TrackingMode::TimeTracked => String::new(),
    };
    println!(
        "{} {} ({}){} worker: {}",
        if sub.completed { "[x]" } else { "[ ]" },
        sub.name,
        sub.id,
        quantity,
        sub.employee_name.as_deref().unwrap_or("-"),
    );
}

fn print_item(item: &WorkItem, now: optrack_core::Time) {
    println!("Work item: {} - {}", item.part_number, item.name);
    if let Some(client) = &item.client_name {
        println!("  Client: {client}");
    }
    println!("  Priority: {}", item.priority);
    if let Some(remarks) = &item.remarks {
        println!("  Remarks: {remarks}");
    }
    for phase in &item.phases {
        let allowed: Vec<String> = phase
            .state()
            .allowed_operations()
            .iter()
            .map(ToString::to_string)
            .collect();
        println!();
        print_phase_line(phase, now);
        println!("  allowed: {}", allowed.join(", "));
        for sub in &phase.subphases {
            print!("  ");
            print_subphase_line(sub);
            if !sub.completed {
                if let GateDecision::Denied(reasons) = evaluate_completion(phase, sub) {
                    for reason in reasons {
                        println!("      blocked: {reason}");
                    }
                }
            }
        }
    }
}
