pub mod order;
pub mod parties;
pub mod seed;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "estatio")]
#[command(about = "Seed and inspect an Estatio party and capex order store.")]
#[command(version)]
pub struct CommandLine {
    /// SQLite database file; an in-memory store is used when omitted
    #[arg(long, global = true, env = "ESTATIO_DB_PATH")]
    pub db: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true, env = "ESTATIO_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Absolute directory for rotated log files
    #[arg(long, global = true, env = "ESTATIO_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Mirror log lines to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a fixture and everything it depends on
    #[command(alias = "s")]
    Seed {
        #[arg(default_value = "demo")]
        fixture: String,
    },
    /// List the built-in fixtures
    Fixtures,
    /// List parties
    #[command(alias = "p")]
    Parties {
        #[arg(long, value_enum)]
        kind: Option<PartyKindArg>,
        /// Tenancy path, e.g. /GB
        #[arg(long)]
        visible_from: Option<String>,
    },
    /// Show an order and its items
    #[command(alias = "o")]
    Order { order_number: String },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PartyKindArg {
    Organisation,
    Person,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
