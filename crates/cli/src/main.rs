// Path: crates/cli/src/main.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]

//! # ScopeGate CLI
//!
//! The operational surface of the engine: ingest Tier-A documents, seed
//! the program catalogue, verify scope questions, and report stats.
//! Exit codes: 0 success, 1 invalid input, 2 operational failure,
//! 3 validation rejection. No core component depends on this binary.

use clap::{Parser, Subcommand};
use std::process::ExitCode;

mod commands;
mod engine;

use commands::*;

#[derive(Parser, Debug)]
#[clap(
    name = "scopegate",
    version,
    about = "The ScopeGate CLI (tariff scope verification engine).",
    long_about = "ScopeGate answers tariff scope questions only from verbatim quotes in \
                  ingested primary-source documents, and files stacks computed from those \
                  verified facts."
)]
struct Cli {
    /// Path to the engine database file.
    #[clap(long, global = true, default_value = "scopegate.redb")]
    db: String,

    /// Path to an engine TOML config; defaults apply when absent.
    #[clap(long, global = true)]
    config: Option<String>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch and ingest one Tier-A document through its trusted connector.
    Ingest(ingest::IngestArgs),

    /// Write the seeded program catalogue (or one program) as JSON.
    Seed(seed::SeedArgs),

    /// Resolve one scope question through the L1/L2/L3 pipeline.
    Verify(verify::VerifyArgs),

    /// Report audit-derived engine statistics.
    Stats(stats::StatsArgs),
}

/// Exit codes fixed by the operational contract.
pub(crate) enum Outcome {
    Success,
    InvalidInput(String),
    Operational(String),
    ValidationRejected(String),
}

impl Outcome {
    fn finish(self) -> ExitCode {
        match self {
            Outcome::Success => ExitCode::from(0),
            Outcome::InvalidInput(message) => {
                eprintln!("invalid input: {}", message);
                ExitCode::from(1)
            }
            Outcome::Operational(message) => {
                eprintln!("operational failure: {}", message);
                ExitCode::from(2)
            }
            Outcome::ValidationRejected(message) => {
                eprintln!("not verified: {}", message);
                ExitCode::from(3)
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = scopegate_telemetry::init::init_tracing() {
        eprintln!("failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Ingest(ref args) => ingest::run(&cli.db, cli.config.as_deref(), args).await,
        Commands::Seed(ref args) => seed::run(args).await,
        Commands::Verify(ref args) => verify::run(&cli.db, cli.config.as_deref(), args).await,
        Commands::Stats(ref args) => stats::run(&cli.db, args).await,
    };
    outcome.finish()
}
