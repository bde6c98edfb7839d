use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use romforge_lib::missing_titles;

use super::{RunContext, log_scan_summary};
use crate::error::CliError;

pub(crate) fn run_missing(ctx: &RunContext, root: &Path) -> Result<(), CliError> {
    let (_root, index, result) = ctx.scan(root)?;
    log_scan_summary(&result);
    if result.cancelled {
        log::warn!("Scan was interrupted; the missing list would be incomplete");
        return Ok(());
    }

    let report = missing_titles(&index, &result.matched);
    log::info!("");
    if report.is_empty() {
        log::info!(
            "{} Collection is complete: all {} catalog titles present",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            report.catalog_titles,
        );
        return Ok(());
    }

    log::info!(
        "{}",
        format!("Missing titles ({}):", report.len()).if_supports_color(Stdout, |t| t.bold()),
    );
    for title in &report.missing {
        log::info!("  {title}");
    }
    log::info!("");
    log::info!(
        "Have {} of {} titles ({} missing)",
        report.owned().if_supports_color(Stdout, |t| t.green()),
        report.catalog_titles,
        report.len().if_supports_color(Stdout, |t| t.yellow()),
    );
    Ok(())
}
