//! Relocate matched files into the canonical `<genre>/<letter>/<title> (<region>)<ext>` layout.
//!
//! Planning is pure apart from existence checks; execution is sequential and
//! isolates per-file failures.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use romforge_dat::{CatalogEntry, UNKNOWN};

use crate::error::RomForgeError;
use crate::verify::MatchedFile;

/// Characters that cannot appear in a path segment on common filesystems.
pub const FORBIDDEN_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Letter directory used when a title sanitizes to nothing.
const FALLBACK_LETTER: &str = "U";

/// `EXDEV` on Unix, `ERROR_NOT_SAME_DEVICE` on Windows.
const CROSS_DEVICE_ERROR: i32 = if cfg!(windows) { 17 } else { 18 };

/// Strip path-hostile characters and surrounding whitespace from a title.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Sanitize a directory/label segment, falling back to `Unknown` when
/// nothing usable remains.
fn sanitize_segment(value: &str) -> String {
    let s = sanitize_title(value);
    if s.is_empty() || s == "." || s == ".." {
        UNKNOWN.to_string()
    } else {
        s
    }
}

/// Upper-cased first character of an already sanitized title.
pub fn first_letter(sanitized_title: &str) -> String {
    sanitized_title
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| FALLBACK_LETTER.to_string())
}

/// Canonical location of an entry relative to the collection root.
///
/// `fallback_extension` (without dot) is used when the catalog's reference
/// filename has no extension.
pub fn relative_target(entry: &CatalogEntry, fallback_extension: &str) -> PathBuf {
    let title = sanitize_title(&entry.title);
    let extension = match entry.extension() {
        ext if !ext.is_empty() => ext,
        _ if !fallback_extension.is_empty() => format!(".{fallback_extension}"),
        _ => String::new(),
    };

    PathBuf::from(sanitize_segment(&entry.genre))
        .join(first_letter(&title))
        .join(format!("{title} ({}){extension}", sanitize_segment(&entry.region)))
}

/// Canonical absolute location of a matched file under `root`.
pub fn target_path(root: &Path, matched: &MatchedFile) -> PathBuf {
    root.join(relative_target(&matched.entry, &matched.file.extension))
}

/// A planned move.
#[derive(Debug, Clone)]
pub struct MoveAction {
    /// Position of the file in the matched slice the plan was built from
    pub index: usize,
    pub source: PathBuf,
    pub target: PathBuf,
    pub title: String,
}

/// A target that cannot be written without losing data.
#[derive(Debug, Clone)]
pub struct MoveConflict {
    pub target: PathBuf,
    pub sources: Vec<PathBuf>,
    pub reason: String,
}

/// Result of planning moves for a matched set.
#[derive(Debug, Default)]
pub struct OrganizePlan {
    pub moves: Vec<MoveAction>,
    pub already_in_place: Vec<PathBuf>,
    pub conflicts: Vec<MoveConflict>,
}

/// A move that was attempted and failed; the file stays where it was.
#[derive(Debug, Clone)]
pub struct MoveFailure {
    pub source: PathBuf,
    pub target: PathBuf,
    pub error: String,
}

/// Summary of executing a plan.
#[derive(Debug, Default)]
pub struct OrganizeSummary {
    /// Moves that completed
    pub moved: Vec<MoveAction>,
    pub already_correct: usize,
    pub failures: Vec<MoveFailure>,
    pub conflicts: Vec<MoveConflict>,
}

/// True when two paths name the same file on disk (e.g. a case-only rename
/// on a case-insensitive filesystem).
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Where a candidate move stands while the plan is resolved.
#[derive(Clone, Copy)]
enum Readiness {
    Ready,
    /// Target is currently held by the source of another candidate
    After(usize),
    Blocked(&'static str),
}

/// Plan moves for every matched file.
///
/// Files already at their target need no action. Two files mapping to the
/// same target, or a target occupied by a file that stays put, are conflicts;
/// the files involved are left untouched. A target held by another matched
/// file that is itself moving away is freed first: its move is ordered ahead.
pub fn plan_moves(root: &Path, matched: &[MatchedFile]) -> Result<OrganizePlan, RomForgeError> {
    if root.exists() && !root.is_dir() {
        return Err(RomForgeError::InvalidRoot(root.to_path_buf()));
    }
    let root = std::path::absolute(root).map_err(|_| RomForgeError::InvalidRoot(root.to_path_buf()))?;

    let mut plan = OrganizePlan::default();
    let mut by_target: BTreeMap<PathBuf, Vec<usize>> = BTreeMap::new();

    for (i, m) in matched.iter().enumerate() {
        let target = target_path(&root, m);
        if m.file.path == target {
            plan.already_in_place.push(target);
        } else {
            by_target.entry(target).or_default().push(i);
        }
    }

    let mut candidates: Vec<MoveAction> = Vec::new();
    for (target, indices) in by_target {
        if indices.len() > 1 {
            let sources: Vec<PathBuf> = indices.iter().map(|&i| matched[i].file.path.clone()).collect();
            plan.conflicts.push(MoveConflict {
                reason: format!("{} files map to the same target", sources.len()),
                target,
                sources,
            });
            continue;
        }

        let i = indices[0];
        candidates.push(MoveAction {
            index: i,
            source: matched[i].file.path.clone(),
            target,
            title: matched[i].entry.title.clone(),
        });
    }
    // BTreeMap iteration is by target; work in the caller's order instead.
    candidates.sort_by_key(|m| m.index);

    let by_source: HashMap<&Path, usize> = candidates
        .iter()
        .enumerate()
        .map(|(c, action)| (action.source.as_path(), c))
        .collect();

    let mut readiness: Vec<Readiness> = candidates
        .iter()
        .enumerate()
        .map(|(c, action)| {
            if !action.target.exists() || same_file(&action.source, &action.target) {
                return Readiness::Ready;
            }
            match by_source.get(action.target.as_path()) {
                Some(&holder) if holder != c => Readiness::After(holder),
                _ => Readiness::Blocked("target already exists"),
            }
        })
        .collect();

    // Emit in caller order, holding back moves until their target is vacated.
    let mut emitted = vec![false; candidates.len()];
    let mut order: Vec<usize> = Vec::with_capacity(candidates.len());
    let mut changed = true;
    while changed {
        changed = false;
        for c in 0..candidates.len() {
            if emitted[c] {
                continue;
            }
            match readiness[c] {
                Readiness::Ready => {}
                Readiness::After(holder) if emitted[holder] => {}
                Readiness::After(holder) => {
                    if let Readiness::Blocked(_) = readiness[holder] {
                        readiness[c] = Readiness::Blocked("target is held by a file that cannot move");
                        changed = true;
                    }
                    continue;
                }
                Readiness::Blocked(_) => continue,
            }
            emitted[c] = true;
            order.push(c);
            changed = true;
        }
    }

    let mut slots: Vec<Option<MoveAction>> = candidates.into_iter().map(Some).collect();
    for c in order {
        if let Some(action) = slots[c].take() {
            plan.moves.push(action);
        }
    }
    for (c, slot) in slots.into_iter().enumerate() {
        let Some(action) = slot else { continue };
        let reason = match readiness[c] {
            Readiness::Blocked(reason) => reason,
            // Whatever is still waiting is part of a cycle, e.g. two files
            // sitting at each other's targets.
            _ => "move cycle",
        };
        plan.conflicts.push(MoveConflict {
            reason: reason.to_string(),
            target: action.target,
            sources: vec![action.source],
        });
    }

    Ok(plan)
}

/// Sanitized titles of matched files that currently sit at their canonical
/// location under `root`.
pub fn placed_titles(root: &Path, matched: &[MatchedFile]) -> Vec<String> {
    let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
    matched
        .iter()
        .filter(|m| m.file.path == target_path(&root, m))
        .map(|m| sanitize_title(&m.entry.title))
        .collect()
}

/// Hidden sibling a cross-device copy is staged in.
fn partial_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.part"))
}

/// Copy `source` into place and remove it. The target only appears once the
/// copy is complete; on failure neither a partial target nor the staging
/// file is left behind.
fn copy_then_remove(source: &Path, target: &Path) -> io::Result<()> {
    let partial = partial_path(target);
    if let Err(e) = fs::copy(source, &partial).and_then(|_| fs::rename(&partial, target)) {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }
    if let Err(e) = fs::remove_file(source) {
        let _ = fs::remove_file(target);
        return Err(e);
    }
    Ok(())
}

/// Move one file, creating parent directories as needed.
fn move_file(source: &Path, target: &Path) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(CROSS_DEVICE_ERROR) => copy_then_remove(source, target),
        Err(e) => Err(e),
    }
}

/// Execute a plan sequentially. A failed move is recorded and logged; the
/// remaining moves still run.
pub fn execute_moves(plan: &OrganizePlan) -> OrganizeSummary {
    let mut summary = OrganizeSummary {
        already_correct: plan.already_in_place.len(),
        conflicts: plan.conflicts.clone(),
        ..Default::default()
    };

    for conflict in &plan.conflicts {
        log::warn!(
            "Conflict at {}: {} ({})",
            conflict.target.display(),
            conflict.reason,
            conflict
                .sources
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    for action in &plan.moves {
        // The target may have appeared since planning.
        let result = if action.target.exists() && !same_file(&action.source, &action.target) {
            Err(io::Error::new(io::ErrorKind::AlreadyExists, "target already exists"))
        } else {
            move_file(&action.source, &action.target)
        };

        match result {
            Ok(()) => {
                log::debug!("Moved {} -> {}", action.source.display(), action.target.display());
                summary.moved.push(action.clone());
            }
            Err(source) => {
                let err = RomForgeError::FileMove {
                    source_path: action.source.clone(),
                    target: action.target.clone(),
                    source,
                };
                log::warn!("{err}");
                summary.failures.push(MoveFailure {
                    source: action.source.clone(),
                    target: action.target.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    summary
}

/// Plan and execute moves for `matched`, updating each moved file's path.
pub fn organize(root: &Path, matched: &mut [MatchedFile]) -> Result<OrganizeSummary, RomForgeError> {
    let plan = plan_moves(root, matched)?;
    let summary = execute_moves(&plan);

    for action in &summary.moved {
        matched[action.index].file.path = action.target.clone();
    }

    log::info!(
        "{} moved, {} already in place, {} failed, {} conflicts",
        summary.moved.len(),
        summary.already_correct,
        summary.failures.len(),
        summary.conflicts.len()
    );

    Ok(summary)
}
