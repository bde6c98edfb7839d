use std::path::Path;

use log::Level;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use romforge_lib::{
    HttpCoverProvider, MoveConflict, OrganizePlan, fetch_covers, organize, placed_titles,
    plan_moves,
};

use super::verify::print_classification;
use super::{RunContext, log_scan_summary};
use crate::error::CliError;

pub(crate) fn run_sort(
    ctx: &RunContext,
    root: &Path,
    dry_run: bool,
    covers: bool,
) -> Result<(), CliError> {
    let (root, _index, mut result) = ctx.scan(root)?;
    print_classification(&root, &result);
    log_scan_summary(&result);

    if dry_run {
        log::info!(
            "{}",
            "Dry run: no files will be moved".if_supports_color(Stdout, |t| t.dimmed()),
        );
        let plan = plan_moves(&root, &result.matched)?;
        print_plan(&root, &plan);
        return Ok(());
    }

    if result.cancelled {
        log::warn!("Scan was interrupted; leaving files where they are");
        return Ok(());
    }

    let summary = organize(&root, &mut result.matched)?;
    print_conflicts(&summary.conflicts);

    log::info!(
        "{} {} files moved, {} already in place",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        summary.moved.len(),
        summary.already_correct,
    );
    if !summary.failures.is_empty() {
        log::warn!(
            "{} {} moves failed:",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            summary.failures.len(),
        );
        for f in &summary.failures {
            log::warn!("  {}", f.error);
        }
    }

    if covers && ctx.cancel.is_cancelled() {
        log::warn!("Interrupted; skipping covers");
    } else if covers {
        let provider = match HttpCoverProvider::new(&ctx.settings.covers.base_url) {
            Ok(p) => p,
            Err(e) => {
                log::warn!(
                    "{} Skipping covers: {e}",
                    "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
                );
                return Ok(());
            }
        };
        let dest = ctx.settings.covers_dir(&root);
        log::info!(
            "Fetching covers into {}",
            dest.display().if_supports_color(Stdout, |t| t.cyan()),
        );
        let pb = ctx.spinner();
        pb.set_message("Downloading covers");
        let titles = placed_titles(&root, &result.matched);
        let cover_summary = fetch_covers(&provider, titles.iter().map(String::as_str), &dest);
        pb.finish_and_clear();
        log::info!(
            "{} {} covers available, {} not found",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            cover_summary.fetched.len(),
            cover_summary.failures.len(),
        );
    }

    Ok(())
}

fn print_plan(root: &Path, plan: &OrganizePlan) {
    log::info!("");
    for action in &plan.moves {
        log::info!(
            "  {} {}",
            action
                .source
                .strip_prefix(root)
                .unwrap_or(&action.source)
                .display(),
            format!(
                "\u{2192} {}",
                action
                    .target
                    .strip_prefix(root)
                    .unwrap_or(&action.target)
                    .display()
            )
            .if_supports_color(Stdout, |t| t.green()),
        );
    }
    print_conflicts(&plan.conflicts);
    log::info!("");
    log::info!(
        "{} moves planned, {} already in place, {} conflicts",
        plan.moves.len(),
        plan.already_in_place.len(),
        plan.conflicts.len(),
    );
}

fn print_conflicts(conflicts: &[MoveConflict]) {
    let level = if conflicts.is_empty() { Level::Info } else { Level::Warn };
    for c in conflicts {
        log::log!(
            level,
            "  {} {} ({})",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            c.target.display(),
            c.reason,
        );
        for source in &c.sources {
            log::log!(level, "      {}", source.display());
        }
    }
}
