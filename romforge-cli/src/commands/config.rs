use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use romforge_lib::settings::settings_path;

use super::RunContext;
use crate::error::CliError;

/// Show the settings file status and the effective settings.
pub(crate) fn run_config_show(ctx: &RunContext) -> Result<(), CliError> {
    let path = settings_path();

    log::info!(
        "{}",
        "romforge configuration".if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("");
    if path.exists() {
        log::info!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(exists)".if_supports_color(Stdout, |t| t.green()),
        );
    } else {
        log::info!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(not found, using defaults)".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    log::info!(
        "  DAT cache:     {}",
        ctx.cache_dir()?.display().if_supports_color(Stdout, |t| t.cyan()),
    );
    if let Some(dat) = &ctx.dat {
        log::info!(
            "  Local DAT:     {}",
            dat.display().if_supports_color(Stdout, |t| t.cyan()),
        );
    }
    log::info!("");
    log::info!(
        "{}",
        "Effective settings:".if_supports_color(Stdout, |t| t.bold()),
    );
    for line in ctx.settings.to_toml()?.lines() {
        log::info!("  {line}");
    }
    Ok(())
}

/// Print the settings file path.
pub(crate) fn run_config_path() {
    println!("{}", settings_path().display());
}
