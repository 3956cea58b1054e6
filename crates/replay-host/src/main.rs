//! Task replay host.
//!
//! Watches a shared directory for task files and replays them one at a time
//! against the in-memory authority, writing results, exports and the JSON
//! lines log next to them.

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use cad_authority::MockAuthority;
use clap::{Args, Parser, Subcommand};
use task_engine::BehaviorDefinition;
use task_runner::{
    behavior_source, waiting_tasks, BehaviorLoader, Host, Monitor, PendingTasks, RunOutcome,
    RunnerConfig, TaskRunner,
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "replay-host")]
#[command(version, about = "Replay CAD task files from a shared directory")]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=debug    Enable debug logging")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the shared directory and replay tasks (default)
    Serve(ServeArgs),
    /// Print the built-in behavior definition, a starting point for edits
    Behavior {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Clone)]
struct ServeArgs {
    /// Shared directory holding tasks/, results/ and exports/
    #[arg(default_value = "shared")]
    shared_dir: PathBuf,

    /// Process the tasks waiting now, then exit
    #[arg(long)]
    once: bool,

    /// Milliseconds between directory scans
    #[arg(long, default_value_t = 1000)]
    poll_ms: u64,

    /// Seconds to keep each finished design open (overrides the behavior file)
    #[arg(long)]
    pause_secs: Option<f64>,

    /// Behavior source to watch (default: <shared_dir>/behavior.json)
    #[arg(long, conflicts_with = "builtin_behavior")]
    behavior: Option<PathBuf>,

    /// Never reload behavior; keep the built-in table
    #[arg(long)]
    builtin_behavior: bool,
}

impl ServeArgs {
    fn config(&self) -> Result<RunnerConfig> {
        let mut config = RunnerConfig::from_shared_dir(&self.shared_dir)
            .with_poll_interval(Duration::from_millis(self.poll_ms.max(1)));
        if self.builtin_behavior {
            config = config.with_behavior_source(None);
        } else if let Some(path) = &self.behavior {
            config = config.with_behavior_source(Some(path.clone()));
        }
        if let Some(secs) = self.pause_secs {
            let pause = Duration::try_from_secs_f64(secs)
                .with_context(|| format!("invalid --pause-secs {secs}"))?;
            config = config.with_viewing_pause(pause);
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Serve(args)) => serve(&args),
        Some(Commands::Behavior { output }) => print_behavior(output),
        None => serve(&cli.serve),
    }
}

fn print_behavior(output: Option<PathBuf>) -> Result<()> {
    let json = BehaviorDefinition::builtin()
        .to_json()
        .context("failed to serialize the built-in behavior")?;
    match output {
        Some(path) => std::fs::write(&path, json + "\n")
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn serve(args: &ServeArgs) -> Result<()> {
    let config = args.config()?;
    config
        .ensure_dirs()
        .with_context(|| format!("failed to prepare {}", args.shared_dir.display()))?;

    let pending = PendingTasks::new();
    let mut host = Host::new(
        TaskRunner::new(config.clone()),
        BehaviorLoader::new(behavior_source(&config)),
        pending.clone(),
    );
    let mut authority = MockAuthority::new();

    info!(
        tasks = %config.tasks_dir.display(),
        results = %config.results_dir.display(),
        waiting = waiting_tasks(&config).len(),
        "replay host ready"
    );

    if args.once {
        let outcomes = host.run_pending(&mut authority)?;
        let failures = outcomes
            .iter()
            .filter(|o| matches!(o, RunOutcome::HostFailure { .. }))
            .count();
        info!(settled = outcomes.len(), failures, "pending tasks processed");
        if failures > 0 {
            warn!(error_file = %config.error_file.display(), "host failures recorded");
        }
        return Ok(());
    }

    let (tx, rx) = mpsc::channel();
    let monitor = Monitor::spawn(config.tasks_dir.clone(), config.poll_interval, tx, pending)
        .context("failed to start the task monitor")?;
    host.run(&rx, &mut authority);
    monitor.stop();
    Ok(())
}
