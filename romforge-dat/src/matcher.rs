use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dat::{self, DatFile};
use crate::error::DatError;

/// Fallback for genre/region fields the catalog leaves empty.
pub const UNKNOWN: &str = "Unknown";

/// One canonical release record, keyed by its CRC32 fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// CRC32 (lowercase hex)
    pub fingerprint: String,
    /// Reference filename from the DAT `rom` record
    pub canonical_file_name: String,
    /// Display/grouping name (the DAT `game` name)
    pub title: String,
    pub genre: String,
    pub region: String,
    pub size: u64,
}

impl CatalogEntry {
    /// Extension of the canonical filename, lower-cased, with its leading dot.
    /// Empty when the reference filename has none.
    pub fn extension(&self) -> String {
        Path::new(&self.canonical_file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default()
    }
}

/// What to do when two catalog records share a fingerprint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The later record replaces the earlier one.
    #[default]
    LastWins,
    /// Fail the load.
    Reject,
}

/// Canonical form of a CRC32 fingerprint: eight lowercase hex digits,
/// zero-padded. `None` when the value is not a CRC32 at all.
pub fn normalize_fingerprint(fingerprint: &str) -> Option<String> {
    let hex = fingerprint.trim();
    if hex.is_empty() || hex.len() > 8 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("{:0>8}", hex.to_ascii_lowercase()))
}

fn field_or_unknown(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

/// An indexed view of a catalog for O(1) fingerprint lookups.
///
/// Read-only once built, so it can be shared across scan workers behind an `Arc`.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    /// CRC32 (lowercase hex) → entry
    by_fingerprint: HashMap<String, CatalogEntry>,
    /// Every game title in the catalog, including ones whose roms were superseded
    titles: BTreeSet<String>,
    /// Number of records that replaced an earlier one with the same fingerprint
    duplicates: usize,
    pub name: String,
    pub version: String,
}

impl CatalogIndex {
    /// Build an index from a parsed DAT file.
    ///
    /// Every `rom` of every game becomes one entry carrying the game's title,
    /// genre and region.
    pub fn from_dat(dat: DatFile, policy: DuplicatePolicy) -> Result<Self, DatError> {
        let mut index = Self {
            name: dat.name,
            version: dat.version,
            ..Default::default()
        };

        for game in dat.games {
            let genre = field_or_unknown(game.genre.as_deref());
            let region = field_or_unknown(game.region.as_deref());
            index.titles.insert(game.name.clone());

            for rom in game.roms {
                if rom.crc.is_empty() {
                    log::debug!("Skipping rom without CRC: {}", rom.name);
                    continue;
                }
                let Some(fingerprint) = normalize_fingerprint(&rom.crc) else {
                    log::warn!("Skipping rom with invalid CRC {:?}: {}", rom.crc, rom.name);
                    continue;
                };
                let entry = CatalogEntry {
                    fingerprint,
                    canonical_file_name: rom.name,
                    title: game.name.clone(),
                    genre: genre.clone(),
                    region: region.clone(),
                    size: rom.size,
                };
                index.insert(entry, policy)?;
            }
        }

        if index.duplicates > 0 {
            log::warn!(
                "{} catalog records share a fingerprint with an earlier record; later records win",
                index.duplicates
            );
        }

        Ok(index)
    }

    /// Parse raw catalog bytes and index them.
    pub fn from_bytes(bytes: &[u8], policy: DuplicatePolicy) -> Result<Self, DatError> {
        Self::from_dat(dat::parse_dat_bytes(bytes)?, policy)
    }

    fn insert(&mut self, entry: CatalogEntry, policy: DuplicatePolicy) -> Result<(), DatError> {
        if let Some(existing) = self.by_fingerprint.get(&entry.fingerprint) {
            if policy == DuplicatePolicy::Reject {
                return Err(DatError::DuplicateFingerprint {
                    fingerprint: entry.fingerprint,
                    first: existing.canonical_file_name.clone(),
                    second: entry.canonical_file_name,
                });
            }
            log::debug!(
                "Fingerprint {} reassigned from \"{}\" to \"{}\"",
                entry.fingerprint,
                existing.canonical_file_name,
                entry.canonical_file_name
            );
            self.duplicates += 1;
        }
        self.by_fingerprint.insert(entry.fingerprint.clone(), entry);
        Ok(())
    }

    /// Exact fingerprint lookup. The query is case- and width-normalized;
    /// anything else that differs is a miss.
    pub fn lookup(&self, fingerprint: &str) -> Option<&CatalogEntry> {
        normalize_fingerprint(fingerprint).and_then(|fp| self.by_fingerprint.get(&fp))
    }

    /// All catalog titles, sorted.
    pub fn titles(&self) -> &BTreeSet<String> {
        &self.titles
    }

    /// Number of indexed fingerprints.
    pub fn len(&self) -> usize {
        self.by_fingerprint.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_fingerprint.is_empty()
    }

    /// Number of records that superseded an earlier one during the load.
    pub fn duplicate_count(&self) -> usize {
        self.duplicates
    }
}
