//! Missing-title report: catalog titles with no matched file.

use std::collections::HashSet;

use romforge_dat::CatalogIndex;

use crate::verify::MatchedFile;

/// Catalog titles not represented by any matched file, sorted and unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GapReport {
    pub missing: Vec<String>,
    /// Size of the catalog's title set
    pub catalog_titles: usize,
}

impl GapReport {
    pub fn len(&self) -> usize {
        self.missing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty()
    }

    /// Number of catalog titles that have at least one matched file.
    pub fn owned(&self) -> usize {
        self.catalog_titles - self.missing.len()
    }
}

/// Compute the catalog titles that no matched file covers.
///
/// Title comparison is exact (case-sensitive).
pub fn missing_titles(index: &CatalogIndex, matched: &[MatchedFile]) -> GapReport {
    let owned: HashSet<&str> = matched.iter().map(|m| m.entry.title.as_str()).collect();

    // titles() is a BTreeSet, so the filtered output is already sorted and unique.
    let missing: Vec<String> = index
        .titles()
        .iter()
        .filter(|t| !owned.contains(t.as_str()))
        .cloned()
        .collect();

    GapReport {
        missing,
        catalog_titles: index.titles().len(),
    }
}
