//! Command implementations and the helpers they share.

pub(crate) mod cache;
pub(crate) mod config;
pub(crate) mod missing;
pub(crate) mod sort;
pub(crate) mod verify;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use romforge_dat::{CatalogIndex, cache as dat_cache};
use romforge_lib::verify::resolve_root;
use romforge_lib::{CancelToken, ClassificationResult, ScanOptions, ScanProgress, Settings, scanner};

use crate::cli_types::Cli;
use crate::error::CliError;

/// Settings with command-line overrides applied, plus global flags.
pub(crate) struct RunContext {
    pub settings: Settings,
    pub dat: Option<PathBuf>,
    pub quiet: bool,
    /// Cancelled by the first Ctrl-C
    pub cancel: CancelToken,
}

impl RunContext {
    /// Load settings and layer the command-line flags on top.
    pub(crate) fn from_cli(cli: &Cli, cancel: CancelToken) -> Result<Self, CliError> {
        let mut settings = Settings::load()?;
        if let Some(url) = &cli.url {
            settings.catalog.url = url.clone();
        }
        if let Some(workers) = cli.workers {
            if workers == 0 {
                return Err(CliError::config("--workers must be at least 1"));
            }
            settings.scan.workers = workers;
        }
        Ok(Self {
            settings,
            dat: cli.dat.clone(),
            quiet: cli.quiet,
            cancel,
        })
    }

    /// DAT cache directory: the settings override, else the platform cache dir.
    pub(crate) fn cache_dir(&self) -> Result<PathBuf, CliError> {
        match &self.settings.catalog.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(dat_cache::cache_dir()?),
        }
    }

    /// Load and index the catalog, from `--dat` if given, else the cache/URL.
    pub(crate) fn load_catalog(&self) -> Result<Arc<CatalogIndex>, CliError> {
        let bytes = match &self.dat {
            Some(path) => {
                log::debug!("Using local DAT {}", path.display());
                dat_cache::read_local(path)?
            }
            None => {
                let pb = self.spinner();
                pb.set_message("Loading catalog");
                let bytes = dat_cache::fetch_catalog(&self.settings.catalog.url, &self.cache_dir()?, false);
                pb.finish_and_clear();
                bytes?
            }
        };

        let index = CatalogIndex::from_bytes(&bytes, self.settings.catalog.duplicate_policy)?;
        log::info!(
            "Catalog: {} {}",
            index.name.if_supports_color(Stdout, |t| t.bold()),
            format!("({}, {} entries, {} titles)", index.version, index.len(), index.titles().len())
                .if_supports_color(Stdout, |t| t.dimmed()),
        );
        Ok(Arc::new(index))
    }

    /// Validate `root`, load the catalog and run a full scan with a progress bar.
    pub(crate) fn scan(&self, root: &Path) -> Result<(PathBuf, Arc<CatalogIndex>, ClassificationResult), CliError> {
        // Fail on a bad root before any download.
        let root = resolve_root(root)?;
        let index = self.load_catalog()?;

        log::info!(
            "Scanning {}",
            root.display().if_supports_color(Stdout, |t| t.cyan()),
        );

        let options = ScanOptions {
            extensions: scanner::extension_set(&self.settings.scan.extensions),
            workers: self.settings.scan.workers,
            cancel: self.cancel.clone(),
        };

        let pb = self.spinner();
        let progress = |p: ScanProgress| match p {
            ScanProgress::Discovered { file_count } => {
                pb.set_length(file_count as u64);
                pb.set_style(bar_style());
                pb.set_message(format!("Found {file_count} ROM files"));
            }
            ScanProgress::Hashed { file_name, done, .. } => {
                pb.set_position(done as u64);
                pb.set_message(file_name);
            }
            ScanProgress::Done => pb.finish_and_clear(),
        };

        let result = romforge_lib::scan_blocking(&root, index.clone(), &options, &progress);
        pb.finish_and_clear();
        Ok((root, index, result?))
    }

    /// Spinner for long operations (hidden in quiet mode).
    pub(crate) fn spinner(&self) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("  {spinner:.cyan} {msg}")
                .expect("static pattern")
                .tick_chars("/-\\|"),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("  {bar:30.cyan/blue} {pos}/{len} {wide_msg}")
        .expect("static pattern")
        .progress_chars("=> ")
}

/// Print the scan summary line shared by every scanning command.
pub(crate) fn log_scan_summary(result: &ClassificationResult) {
    log::info!(
        "{} matched, {} unknown, {} unreadable",
        result
            .matched
            .len()
            .if_supports_color(Stdout, |t| t.green()),
        (result.unmatched.len() - result.failures.len()).if_supports_color(Stdout, |t| t.yellow()),
        result.failures.len().if_supports_color(Stdout, |t| t.red()),
    );
    if result.cancelled {
        log::warn!(
            "{} Scan was cancelled; results are partial",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
        );
    }
}

/// Format a byte size as a human-readable string.
pub(crate) fn format_bytes(bytes: u64) -> String {
    if bytes >= 1024 * 1024 && bytes.is_multiple_of(1024 * 1024) {
        format!("{} MB", bytes / (1024 * 1024))
    } else if bytes >= 1024 && bytes.is_multiple_of(1024) {
        format!("{} KB", bytes / 1024)
    } else {
        format!("{} bytes", bytes)
    }
}
