use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "holofuel")]
#[command(about = "Holo Fuel ledger client and currency dynamics simulator")]
pub struct Cli {
    #[arg(long, short, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a market simulation described by a TOML file
    Simulate {
        #[arg(long, short)]
        config: PathBuf,

        /// Overrides output.trades_csv
        #[arg(long)]
        trades_csv: Option<String>,

        #[arg(long, help = "Validate and build the simulation without running it")]
        dry_run: bool,
    },

    /// Fetch the ledger state
    LedgerState {
        /// REST base URL, eg. http://localhost:3141/fn/transaction
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Set credit limits from a JSON document
    SetLimits {
        #[arg(long)]
        endpoint: Option<String>,

        /// JSON text, or @path to read it from a file
        #[arg(long)]
        data: String,
    },
}
