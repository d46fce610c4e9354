//! Stipend Ledger Command Line Interface
//!
//! Offline tooling around the distribution engine: replay scenarios against
//! in-memory collaborators, inspect saved ledger snapshots and validate
//! genesis files.

mod scenario;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use scenario::{Scenario, Simulation};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stipend_distribution::memory::{InMemoryTokenLedger, StaticOracle, StaticVerifier, SystemClock};
use stipend_distribution::{Collaborators, DistributionEngine, GenesisConfig, LedgerState};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stipend-cli")]
#[command(about = "Stipend Ledger Command Line Interface", long_about = None)]
#[command(version)]
struct Cli {
    /// Log filter (overrides the genesis log level; RUST_LOG wins over both)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario against a fresh ledger
    Simulate {
        /// Genesis configuration (TOML)
        #[arg(long)]
        genesis: PathBuf,
        /// Scenario to replay (JSON)
        #[arg(long)]
        scenario: PathBuf,
        /// Write the final ledger snapshot here
        #[arg(long, value_name = "PATH")]
        state_out: Option<PathBuf>,
    },
    /// Print statistics for a saved ledger snapshot
    Inspect {
        /// Snapshot written by `simulate --state-out`
        #[arg(long)]
        state: PathBuf,
        /// First log id to print
        #[arg(long, default_value_t = 1)]
        from: u64,
        /// Last log id to print
        #[arg(long, default_value_t = u64::MAX)]
        to: u64,
    },
    /// Check a genesis configuration without running anything
    Validate {
        /// Genesis configuration (TOML)
        #[arg(long)]
        genesis: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            genesis,
            scenario,
            state_out,
        } => {
            let genesis = load_genesis(&genesis)?;
            init_tracing(cli.log_level.as_deref().unwrap_or(&genesis.log_level));
            handle_simulate(&genesis, &scenario, state_out.as_deref())
        }
        Commands::Inspect { state, from, to } => {
            init_tracing(cli.log_level.as_deref().unwrap_or("info"));
            handle_inspect(&state, from, to)
        }
        Commands::Validate { genesis } => {
            let genesis = load_genesis(&genesis)?;
            init_tracing(cli.log_level.as_deref().unwrap_or(&genesis.log_level));
            println!("{}", serde_json::to_string_pretty(&genesis)?);
            println!("✅ Genesis configuration is valid");
            Ok(())
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_genesis(path: &Path) -> Result<GenesisConfig> {
    GenesisConfig::load_from_file(path)
        .with_context(|| format!("Failed to load genesis from {}", path.display()))
}

fn handle_simulate(genesis: &GenesisConfig, scenario: &Path, state_out: Option<&Path>) -> Result<()> {
    let scenario = Scenario::load_from_file(scenario)?;
    let mut simulation = Simulation::new(genesis, &scenario)?;
    let report = simulation.run(&scenario.steps);

    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(path) = state_out {
        let snapshot = serde_json::to_string_pretty(&simulation.engine.snapshot())?;
        fs::write(path, snapshot)
            .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
        println!("💾 Snapshot written to {}", path.display());
    }

    let mismatches = report.mismatches();
    if mismatches > 0 {
        bail!("{mismatches} step(s) did not match their expected outcome");
    }
    Ok(())
}

fn handle_inspect(path: &Path, from: u64, to: u64) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let state: LedgerState = serde_json::from_str(&content).context("Failed to parse snapshot")?;

    // Collaborators are never called by the read-only queries below
    let engine = DistributionEngine::from_state(
        state,
        Default::default(),
        Collaborators::new(
            Arc::new(InMemoryTokenLedger::new()),
            Arc::new(StaticVerifier::new()),
            Arc::new(StaticOracle::new()),
            Arc::new(SystemClock),
        ),
    )
    .context("Snapshot failed validation")?;

    println!("{}", serde_json::to_string_pretty(&engine.statistics())?);

    let snapshot = engine.snapshot();
    for (region, entry) in snapshot.caps.iter() {
        let cap = if entry.is_bounded() {
            entry.cap.to_string()
        } else {
            "unbounded".to_string()
        };
        println!("  {region}: used {} / {cap}", entry.used);
    }
    for entry in engine.distribution_log_range(from, to) {
        println!(
            "  #{} round {} {} → {}",
            entry.id, entry.round, entry.amount, entry.beneficiary
        );
    }
    Ok(())
}
