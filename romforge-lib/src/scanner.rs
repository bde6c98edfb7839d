//! Directory walker for ROM collections.
//!
//! Produces the ordered list of candidate files the scan orchestrator hashes.
//! Only regular files with a recognized extension are returned; everything
//! else is invisible to the pipeline.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A file discovered under the scan root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedFile {
    /// Absolute location; updated after a successful move.
    pub path: PathBuf,
    /// Lower-cased extension without the dot.
    pub extension: String,
    /// CRC32 fingerprint, once the checksum has run.
    pub fingerprint: Option<String>,
    /// Position in the tree walk.
    pub discovery_index: usize,
}

impl ScannedFile {
    /// The file name for display (lossy).
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "?".to_string())
    }
}

/// Build the extension set from a list like `["sfc", ".SMC"]`.
pub fn extension_set<S: AsRef<str>>(extensions: &[S]) -> HashSet<String> {
    extensions
        .iter()
        .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Lower-cased extension of `path` if it is in the allowed set.
fn matching_extension(path: &Path, extensions: &HashSet<String>) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    extensions.contains(&ext).then_some(ext)
}

/// Recursively collect the files under `root` whose extension is in
/// `extensions`, in a deterministic order (entries sorted by path within
/// each directory, depth-first).
///
/// Symlinked directories are not followed. Directories that cannot be read
/// are logged and skipped.
pub fn walk_files(root: &Path, extensions: &HashSet<String>) -> Vec<ScannedFile> {
    let mut files = Vec::new();
    walk_dir(root, extensions, &mut files);
    files
}

fn walk_dir(dir: &Path, extensions: &HashSet<String>, out: &mut Vec<ScannedFile>) {
    let mut entries: Vec<fs::DirEntry> = match fs::read_dir(dir) {
        Ok(entries) => entries.flatten().collect(),
        Err(e) => {
            log::warn!("Skipping unreadable directory {}: {e}", dir.display());
            return;
        }
    };
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            walk_dir(&path, extensions, out);
        } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
            if let Some(extension) = matching_extension(&path, extensions) {
                out.push(ScannedFile {
                    path,
                    extension,
                    fingerprint: None,
                    discovery_index: out.len(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_extension_set_normalizes() {
        let set = extension_set(&["SFC", ".smc", ""]);
        assert_eq!(set.len(), 2);
        assert!(set.contains("sfc"));
        assert!(set.contains("smc"));
    }

    #[test]
    fn test_walk_filters_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b.sfc"));
        touch(&root.join("a.SMC"));
        touch(&root.join("notes.txt"));
        touch(&root.join("sub/c.sfc"));
        touch(&root.join("sub/deeper/d.sfc"));
        touch(&root.join("0-first/e.sfc"));

        let files = walk_files(root, &extension_set(&["sfc", "smc"]));
        let names: Vec<String> = files.iter().map(|f| f.display_name()).collect();
        assert_eq!(names, vec!["e.sfc", "a.SMC", "b.sfc", "c.sfc", "d.sfc"]);

        for (i, f) in files.iter().enumerate() {
            assert_eq!(f.discovery_index, i);
            assert!(f.fingerprint.is_none());
        }
        assert_eq!(files[1].extension, "smc");
    }

    #[test]
    fn test_walk_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = walk_files(&dir.path().join("absent"), &extension_set(&["sfc"]));
        assert!(files.is_empty());
    }
}
