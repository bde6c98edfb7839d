//! romforge CLI
//!
//! Verify a SNES ROM collection against a No-Intro catalog, sort matched
//! files into a canonical layout, and report missing titles.

mod cli_types;
mod commands;
mod error;
mod interrupt;

use std::io::Write;

use clap::Parser;
use log::Level;
use romforge_lib::CancelToken;

use cli_types::{CacheAction, Cli, Commands, ConfigAction};
use commands::RunContext;
use error::CliError;

/// Crates whose logs are shown at the chosen verbosity; everything else is `warn`.
const LOG_TARGETS: &[&str] = &["romforge", "romforge_lib", "romforge_dat"];

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = std::iter::once("warn".to_string())
        .chain(LOG_TARGETS.iter().map(|t| format!("{t}={level}")))
        .collect::<Vec<_>>()
        .join(",");

    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter));
    builder.target(env_logger::Target::Stdout);
    if !cli.verbose {
        // Plain output for normal use; verbose keeps env_logger's timestamps.
        builder.format(|buf, record| match record.level() {
            Level::Error => writeln!(buf, "error: {}", record.args()),
            _ => writeln!(buf, "{}", record.args()),
        });
    }
    builder.init();
}

fn run(cli: &Cli) -> Result<(), CliError> {
    if let Commands::Config {
        action: ConfigAction::Path,
    } = cli.command
    {
        commands::config::run_config_path();
        return Ok(());
    }

    let cancel = CancelToken::new();
    if let Err(e) = interrupt::cancel_on_interrupt(cancel.clone()) {
        log::debug!("Could not watch for interrupts: {e}");
    }

    let ctx = RunContext::from_cli(cli, cancel)?;
    match &cli.command {
        Commands::Verify { root } => commands::verify::run_verify(&ctx, root),
        Commands::Sort {
            root,
            dry_run,
            covers,
        } => commands::sort::run_sort(&ctx, root, *dry_run, *covers),
        Commands::Missing { root } => commands::missing::run_missing(&ctx, root),
        Commands::Cache { action } => match action {
            CacheAction::List => commands::cache::run_cache_list(&ctx),
            CacheAction::Clear => commands::cache::run_cache_clear(&ctx),
            CacheAction::Fetch => commands::cache::run_cache_fetch(&ctx),
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::run_config_show(&ctx),
            ConfigAction::Path => {
                commands::config::run_config_path();
                Ok(())
            }
        },
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Err(e) = run(&cli) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
