mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "buildplan",
    about = "Decide which interventions are active at each timestep of a planning run",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from runs/)
    #[arg(long, global = true, env = "BUILDPLAN_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log every decision step
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the decision loop for a model run and write its state
    Run {
        run: String,

        /// Stop after this many bundles
        #[arg(long)]
        max_bundles: Option<usize>,
    },

    /// Show the state written for a timestep and decision iteration
    State {
        run: String,

        #[arg(long)]
        timestep: i64,

        #[arg(long, default_value = "0")]
        iteration: u32,
    },

    /// List the interventions of a model run
    Interventions {
        run: String,

        /// Only interventions not already planned
        #[arg(long)]
        available: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Run { run, max_bundles } => cmd::run::run(&root, &run, max_bundles, cli.json),
        Commands::State {
            run,
            timestep,
            iteration,
        } => cmd::state::run(&root, &run, timestep, iteration, cli.json),
        Commands::Interventions { run, available } => {
            cmd::interventions::run(&root, &run, available, cli.json)
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
