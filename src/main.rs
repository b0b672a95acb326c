use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use workforce::engine::Driver;
use workforce::storage::{JsonFileSnapshotStore, SnapshotStore};
use workforce::{Config, WorkItemDraft, Workforce};

#[derive(Parser)]
#[command(name = "workforce")]
#[command(about = "Shift-based worker agent simulation", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON snapshot to resume from and save to.
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the real-time loops until Ctrl-C.
    Run {
        /// JSON array of work item drafts to submit at start.
        #[arg(long)]
        work: Option<PathBuf>,
    },
    /// Advance a fixed number of simulated hours as fast as possible.
    Simulate {
        #[arg(long, default_value_t = 24.0)]
        hours: f64,
        #[arg(long)]
        work: Option<PathBuf>,
    },
    /// Look up a fact in the shared store, or in one agent's recall.
    Query {
        text: String,
        #[arg(long)]
        agent: Option<String>,
    },
    /// Print progress, ledger totals and recent activity.
    Status {
        #[arg(long, default_value_t = 10)]
        recent: usize,
        /// Also list every agent with role, shift, phase and balance.
        #[arg(long)]
        agents: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.snapshot.is_some() {
        config.snapshot_path = cli.snapshot;
    }
    let store = config
        .snapshot_path
        .clone()
        .map(|path| Arc::new(JsonFileSnapshotStore::new(path)));

    match cli.command {
        Commands::Run { work } => run(config, store, work.as_deref()).await?,
        Commands::Simulate { hours, work } => {
            simulate(config, store, hours, work.as_deref()).await?
        }
        Commands::Query { text, agent } => {
            let workforce = open(&config, store.as_deref()).await?;
            let result = match agent {
                Some(agent) => workforce.recall(&agent, &text)?,
                None => workforce.query(&text),
            };
            println!("{}", result.describe());
        }
        Commands::Status { recent, agents } => {
            let workforce = open(&config, store.as_deref()).await?;
            if agents {
                print_roster(&workforce);
            }
            print_status(&workforce, recent)?;
        }
    }

    Ok(())
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))
}

/// Resumes from the snapshot when one exists, otherwise starts fresh.
async fn open(config: &Config, store: Option<&JsonFileSnapshotStore>) -> Result<Workforce> {
    let snapshot = match store {
        Some(store) => store.load().await?,
        None => None,
    };

    match snapshot {
        Some(snapshot) => Workforce::from_snapshot(config.simulation.clone(), snapshot)
            .context("restoring snapshot"),
        None => Ok(Workforce::new(config.simulation.clone())),
    }
}

fn load_work(path: &Path) -> Result<Vec<WorkItemDraft>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading work file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing work file {}", path.display()))
}

fn submit_all(workforce: &Workforce, path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let drafts = load_work(path)?;
    let total = drafts.len();
    let mut rejected = 0;
    for draft in drafts {
        if let Err(e) = workforce.submit(draft) {
            log::warn!("Rejected work item: {}", e);
            rejected += 1;
        }
    }
    log::info!("Submitted {} of {} work items", total - rejected, total);
    Ok(())
}

async fn run(
    config: Config,
    store: Option<Arc<JsonFileSnapshotStore>>,
    work: Option<&Path>,
) -> Result<()> {
    let workforce = Arc::new(open(&config, store.as_deref()).await?);
    submit_all(&workforce, work)?;

    let mut driver = Driver::new(workforce.clone(), config.driver.clone());
    if let Some(store) = store {
        driver = driver.with_store(store);
    }
    let handle = driver.start();

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    log::info!("Shutting down");
    handle.shutdown().await?;

    print_status(&workforce, 5)
}

async fn simulate(
    config: Config,
    store: Option<Arc<JsonFileSnapshotStore>>,
    hours: f64,
    work: Option<&Path>,
) -> Result<()> {
    let workforce = open(&config, store.as_deref()).await?;
    submit_all(&workforce, work)?;

    let step = config.driver.hours_per_step.max(0.01);
    let steps = (hours.max(0.0) / step).ceil() as u64;
    let steps_per_share = (config.driver.propagation_interval_ms
        / config.driver.step_interval_ms.max(1))
    .max(1);

    let mut errors = 0;
    for n in 1..=steps {
        errors += workforce.step(step).errors.len();
        if n % steps_per_share == 0 {
            workforce.propagate();
        }
    }
    if errors > 0 {
        log::warn!("{} step errors during simulation", errors);
    }

    if let Some(store) = &store {
        store.save(&workforce.snapshot()).await?;
        log::info!("Snapshot written to {}", store.describe());
    }

    print_status(&workforce, 10)
}

fn print_roster(workforce: &Workforce) {
    for agent in workforce.agents() {
        println!(
            "{:<10} {:<26} {:<32} shift {:<5} {:<8} {:>6} credits {:>4} done",
            agent.id(),
            agent.role(),
            agent.specialty(),
            agent.shift.as_str(),
            agent.lifecycle.phase.as_str(),
            agent.credits,
            agent.tasks_completed,
        );
    }
}

fn print_status(workforce: &Workforce, recent: usize) -> Result<()> {
    let progress = workforce.progress();
    let totals = workforce.ledger_totals();
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "progress": progress,
            "ledger": totals,
        }))?
    );

    let activity = workforce.activity();
    let skip = activity.len().saturating_sub(recent);
    for event in activity.iter().skip(skip) {
        println!(
            "{} [{}] {}",
            event.timestamp.format("%H:%M:%S"),
            event.source.as_str(),
            event.message
        );
    }
    Ok(())
}
