//! Scan orchestration: walk the tree, fingerprint every candidate file on
//! the worker pool, and partition the results against the catalog.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use romforge_dat::{CatalogEntry, CatalogIndex};

use crate::error::RomForgeError;
use crate::hasher;
use crate::scanner::{self, ScannedFile};
use crate::worker_pool::{CancelToken, WorkerPool};

/// Extensions recognized when no other set is configured (SNES cartridge images).
pub const DEFAULT_EXTENSIONS: &[&str] = &["sfc", "smc"];

/// Default worker count: the machine's available parallelism.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Options controlling a scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Lower-cased extensions (without dot) that are checksummed
    pub extensions: HashSet<String>,
    /// Number of concurrent checksum workers
    pub workers: usize,
    /// Cooperative cancellation
    pub cancel: CancelToken,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: scanner::extension_set(DEFAULT_EXTENSIONS),
            workers: default_workers(),
            cancel: CancelToken::new(),
        }
    }
}

/// Progress information for callbacks.
#[derive(Debug, Clone)]
pub enum ScanProgress {
    /// The tree walk finished
    Discovered { file_count: usize },
    /// A file's checksum finished (or failed)
    Hashed {
        file_name: String,
        done: usize,
        total: usize,
    },
    /// Classification is complete
    Done,
}

/// A scanned file together with the catalog entry its fingerprint matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFile {
    pub file: ScannedFile,
    pub entry: CatalogEntry,
}

/// A file whose checksum could not be computed.
#[derive(Debug, Clone)]
pub struct ReadFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Partition produced by one scan pass.
///
/// Every file that passed the extension filter and was dispatched appears in
/// exactly one of `matched` / `unmatched`, in tree-walk order. Files that
/// could not be read are in `unmatched` without a fingerprint and are also
/// listed in `failures`.
#[derive(Debug, Clone, Default)]
pub struct ClassificationResult {
    pub matched: Vec<MatchedFile>,
    pub unmatched: Vec<ScannedFile>,
    pub failures: Vec<ReadFailure>,
    /// The scan was cancelled before every file was processed
    pub cancelled: bool,
}

impl ClassificationResult {
    /// Files partitioned in this pass.
    pub fn total(&self) -> usize {
        self.matched.len() + self.unmatched.len()
    }

    /// Files that received a fingerprint (matched or not).
    pub fn classified_count(&self) -> usize {
        self.total() - self.failures.len()
    }
}

/// Fingerprint outcome for one file, tagged with the file it belongs to.
type HashOutcome = (ScannedFile, Result<String, RomForgeError>);

/// Absolute, validated scan root.
pub fn resolve_root(root: &Path) -> Result<PathBuf, RomForgeError> {
    if !root.is_dir() {
        return Err(RomForgeError::InvalidRoot(root.to_path_buf()));
    }
    std::path::absolute(root).map_err(|_| RomForgeError::InvalidRoot(root.to_path_buf()))
}

/// Scan `root` and classify every recognized file against `index`.
///
/// The tree walk runs on the calling task; checksums run on a pool of
/// `options.workers` workers. The result is ordered by discovery regardless of
/// worker count. A single unreadable file never fails the scan.
pub async fn scan(
    root: &Path,
    index: Arc<CatalogIndex>,
    options: &ScanOptions,
    progress: &dyn Fn(ScanProgress),
) -> Result<ClassificationResult, RomForgeError> {
    let root = resolve_root(root)?;
    let files = scanner::walk_files(&root, &options.extensions);
    let total = files.len();
    log::info!("Found {total} candidate files under {}", root.display());
    progress(ScanProgress::Discovered { file_count: total });

    let mut pool = WorkerPool::start(
        options.workers,
        files,
        options.cancel.clone(),
        |file: ScannedFile| async move {
            let path = file.path.clone();
            let outcome = tokio::task::spawn_blocking(move || hasher::fingerprint_file(&path))
                .await
                .unwrap_or_else(|e| {
                    Err(RomForgeError::file_read(
                        file.path.clone(),
                        std::io::Error::other(e.to_string()),
                    ))
                });
            (file, outcome)
        },
    );

    let mut outcomes: Vec<HashOutcome> = Vec::with_capacity(total);
    while let Some((file, outcome)) = pool.recv().await {
        log::debug!("Hashed {}", file.path.display());
        let file_name = file.display_name();
        outcomes.push((file, outcome));
        progress(ScanProgress::Hashed {
            file_name,
            done: outcomes.len(),
            total,
        });
    }

    // Completion order depends on scheduling; discovery order does not.
    outcomes.sort_by_key(|(file, _)| file.discovery_index);

    let mut result = classify(outcomes, &index);
    result.cancelled = result.total() < total;
    if result.cancelled {
        log::warn!(
            "Scan cancelled after {} of {total} files",
            result.total()
        );
    }
    log::info!(
        "{} matched, {} unmatched, {} unreadable",
        result.matched.len(),
        result.unmatched.len() - result.failures.len(),
        result.failures.len()
    );
    progress(ScanProgress::Done);

    Ok(result)
}

/// Blocking wrapper around [`scan`] for synchronous callers.
pub fn scan_blocking(
    root: &Path,
    index: Arc<CatalogIndex>,
    options: &ScanOptions,
    progress: &dyn Fn(ScanProgress),
) -> Result<ClassificationResult, RomForgeError> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(options.workers.max(1))
        .enable_all()
        .build()
        .map_err(|e| RomForgeError::runtime(e.to_string()))?;
    rt.block_on(scan(root, index, options, progress))
}

/// Partition already-ordered fingerprint outcomes against the catalog.
fn classify(outcomes: Vec<HashOutcome>, index: &CatalogIndex) -> ClassificationResult {
    let mut result = ClassificationResult::default();

    for (mut file, outcome) in outcomes {
        match outcome {
            Ok(fingerprint) => {
                let entry = index.lookup(&fingerprint).cloned();
                file.fingerprint = Some(fingerprint);
                match entry {
                    Some(entry) => result.matched.push(MatchedFile { file, entry }),
                    None => result.unmatched.push(file),
                }
            }
            Err(e) => {
                log::warn!("{e}");
                result.failures.push(ReadFailure {
                    path: file.path.clone(),
                    error: e.to_string(),
                });
                result.unmatched.push(file);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use romforge_dat::DuplicatePolicy;
    use std::fs;

    const DAT: &str = r#"clrmamepro (
	name "Test"
)

game (
	name "Alpha (USA)"
	genre "Action"
	region "USA"
	rom ( name "Alpha (USA).sfc" size 3 crc 352441C2 )
)

game (
	name "Beta (Japan)"
	rom ( name "Beta (Japan).sfc" size 9 crc CBF43926 )
)
"#;

    fn index() -> Arc<CatalogIndex> {
        Arc::new(CatalogIndex::from_bytes(DAT.as_bytes(), DuplicatePolicy::LastWins).unwrap())
    }

    fn options(workers: usize) -> ScanOptions {
        ScanOptions {
            workers,
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_scan_partitions_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("alpha.sfc"), b"abc").unwrap();
        fs::write(dir.path().join("beta.SMC"), b"123456789").unwrap();
        fs::write(dir.path().join("junk.sfc"), b"garbage").unwrap();
        fs::write(dir.path().join("readme.txt"), b"abc").unwrap();

        let result = scan(dir.path(), index(), &options(2), &|_| {}).await.unwrap();

        assert_eq!(result.matched.len(), 2);
        assert_eq!(result.unmatched.len(), 1);
        assert!(result.failures.is_empty());
        assert!(!result.cancelled);
        assert_eq!(result.matched[0].entry.title, "Alpha (USA)");
        assert_eq!(result.matched[0].file.fingerprint.as_deref(), Some("352441c2"));
        assert_eq!(result.matched[1].entry.title, "Beta (Japan)");
        assert_eq!(result.unmatched[0].display_name(), "junk.sfc");
        assert!(result.unmatched[0].fingerprint.is_some());
    }

    #[tokio::test]
    async fn test_invalid_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.sfc");
        fs::write(&file, b"abc").unwrap();

        let result = scan(&file, index(), &options(1), &|_| {}).await;
        assert!(matches!(result, Err(RomForgeError::InvalidRoot(_))));
        let result = scan(&dir.path().join("missing"), index(), &options(1), &|_| {}).await;
        assert!(matches!(result, Err(RomForgeError::InvalidRoot(_))));
    }

    #[tokio::test]
    async fn test_cancelled_scan_dispatches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("alpha.sfc"), b"abc").unwrap();
        let opts = options(1);
        opts.cancel.cancel();

        let result = scan(dir.path(), index(), &opts, &|_| {}).await.unwrap();
        assert!(result.cancelled);
        assert_eq!(result.total(), 0);
    }

    #[test]
    fn test_classify_records_read_failures_as_unmatched() {
        let file = ScannedFile {
            path: PathBuf::from("/roms/bad.sfc"),
            extension: "sfc".into(),
            fingerprint: None,
            discovery_index: 0,
        };
        let err = RomForgeError::file_read(
            "/roms/bad.sfc",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        let result = classify(vec![(file, Err(err))], &index());
        assert_eq!(result.unmatched.len(), 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.classified_count(), 0);
        assert_eq!(result.failures[0].path, PathBuf::from("/roms/bad.sfc"));
    }

    #[test]
    fn test_scan_blocking() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("alpha.sfc"), b"abc").unwrap();
        let result = scan_blocking(dir.path(), index(), &options(3), &|_| {}).unwrap();
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.matched[0].entry.title, "Alpha (USA)");
    }
}
