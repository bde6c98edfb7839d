use std::path::Path;

use log::Level;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use romforge_lib::ClassificationResult;

use super::{RunContext, log_scan_summary};
use crate::error::CliError;

pub(crate) fn run_verify(ctx: &RunContext, root: &Path) -> Result<(), CliError> {
    let (root, _index, result) = ctx.scan(root)?;
    print_classification(&root, &result);
    log_scan_summary(&result);
    Ok(())
}

fn relative<'a>(root: &Path, path: &'a Path) -> std::path::Display<'a> {
    path.strip_prefix(root).unwrap_or(path).display()
}

/// Print the good and bad lists.
pub(crate) fn print_classification(root: &Path, result: &ClassificationResult) {
    if !result.matched.is_empty() {
        log::info!("");
        log::info!("{}", "Verified:".if_supports_color(Stdout, |t| t.bold()));
        for m in &result.matched {
            log::info!(
                "  {} {} {}",
                "\u{2714}".if_supports_color(Stdout, |t| t.green()),
                relative(root, &m.file.path),
                format!("\u{2192} {} [{}, {}]", m.entry.title, m.entry.genre, m.entry.region)
                    .if_supports_color(Stdout, |t| t.dimmed()),
            );
        }
    }

    let level = if result.unmatched.is_empty() { Level::Info } else { Level::Warn };
    if !result.unmatched.is_empty() {
        log::log!(level, "");
        log::log!(level, "{}", "Not in catalog:".if_supports_color(Stdout, |t| t.bold()));
    }
    for f in &result.unmatched {
        match &f.fingerprint {
            Some(fp) => log::log!(
                level,
                "  {} {} {}",
                "\u{2718}".if_supports_color(Stdout, |t| t.red()),
                relative(root, &f.path),
                format!("(crc {fp})").if_supports_color(Stdout, |t| t.dimmed()),
            ),
            None => {
                let error = result
                    .failures
                    .iter()
                    .find(|e| e.path == f.path)
                    .map(|e| e.error.as_str())
                    .unwrap_or("unreadable");
                log::log!(
                    level,
                    "  {} {} {}",
                    "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
                    relative(root, &f.path),
                    format!("({error})").if_supports_color(Stdout, |t| t.dimmed()),
                );
            }
        }
    }
    log::info!("");
}
