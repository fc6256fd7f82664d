//! `estatio` command line entry point.
//!
//! # Responsibility
//! - Resolve configuration from flags and `ESTATIO_*` variables.
//! - Dispatch to the seed and inspection commands.

mod commands;

use anyhow::{anyhow, Context};
use commands::{CommandLine, Commands};
use estatio_core::{init_logging, CoreConfig, LogLevel};
use log::info;

fn main() -> anyhow::Result<()> {
    let cli = CommandLine::parse_args();

    let log_level = match cli.log_level.as_deref() {
        Some(level) => level.parse::<LogLevel>().map_err(|err| anyhow!("{err}"))?,
        None => LogLevel::default_for_build(),
    };
    let config = CoreConfig {
        db_path: cli.db.clone(),
        log_level,
        log_dir: cli.log_dir.clone(),
    };

    if let Some(mut options) = config.logging_options() {
        options.duplicate_to_stderr = cli.verbose;
        init_logging(&options).map_err(|err| anyhow!("failed to initialize logging: {err}"))?;
    }

    let mut conn = config.open_db().context("failed to open database")?;
    info!(
        "event=cli_start module=cli status=ok store={}",
        if config.db_path.is_some() { "file" } else { "memory" }
    );

    match cli.command {
        Commands::Seed { fixture } => {
            commands::seed::seed(&mut conn, &fixture, config.db_path.is_some())
        }
        Commands::Fixtures => {
            commands::seed::list_fixtures();
            Ok(())
        }
        Commands::Parties { kind, visible_from } => {
            commands::parties::list_parties(&conn, kind, visible_from)
        }
        Commands::Order { order_number } => commands::order::show_order(&conn, &order_number),
    }
}
