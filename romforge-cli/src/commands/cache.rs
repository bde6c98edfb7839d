use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use romforge_dat::{CatalogIndex, cache};

use super::{RunContext, format_bytes};
use crate::error::CliError;

/// List cached DAT files.
pub(crate) fn run_cache_list(ctx: &RunContext) -> Result<(), CliError> {
    let entries = cache::list(&ctx.cache_dir()?)?;
    if entries.is_empty() {
        log::info!(
            "{}",
            "No cached DAT files.".if_supports_color(Stdout, |t| t.dimmed()),
        );
        log::info!("Run 'romforge cache fetch' to download the catalog.");
        return Ok(());
    }

    log::info!(
        "{}",
        "Cached DAT files:".if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("");

    let mut total_size = 0u64;
    for entry in &entries {
        total_size += entry.file_size;
        log::info!(
            "  {} [{}]",
            entry.file_name.if_supports_color(Stdout, |t| t.bold()),
            entry.dat_name.if_supports_color(Stdout, |t| t.cyan()),
        );
        log::info!(
            "    Size: {}, Downloaded: {}, Version: {}",
            format_bytes(entry.file_size),
            entry.downloaded,
            entry.dat_version,
        );
    }
    log::info!("");
    log::info!(
        "Total: {} files, {}",
        entries.len(),
        format_bytes(total_size)
    );
    Ok(())
}

/// Clear the DAT cache.
pub(crate) fn run_cache_clear(ctx: &RunContext) -> Result<(), CliError> {
    let freed = cache::clear(&ctx.cache_dir()?)?;
    log::info!(
        "{} Cache cleared ({} freed)",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        format_bytes(freed),
    );
    Ok(())
}

/// Re-download the configured catalog into the cache.
pub(crate) fn run_cache_fetch(ctx: &RunContext) -> Result<(), CliError> {
    let url = &ctx.settings.catalog.url;
    let pb = ctx.spinner();
    pb.set_message(format!("Downloading {url}"));
    let bytes = cache::fetch_catalog(url, &ctx.cache_dir()?, true);
    pb.finish_and_clear();
    let bytes = bytes?;

    let index = CatalogIndex::from_bytes(&bytes, ctx.settings.catalog.duplicate_policy)?;
    log::info!(
        "{} {} ({} entries, {})",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        index.name.if_supports_color(Stdout, |t| t.bold()),
        index.len(),
        format_bytes(bytes.len() as u64),
    );
    Ok(())
}
