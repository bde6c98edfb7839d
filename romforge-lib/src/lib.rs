//! Collection pipeline for cartridge ROM libraries: checksum every file,
//! match it against a reference catalog, move matches into a canonical
//! layout, and report which catalog titles are still missing.

pub mod covers;
pub mod error;
pub mod gaps;
pub mod hasher;
pub mod organize;
pub mod scanner;
pub mod settings;
pub mod verify;
pub mod worker_pool;

pub use covers::{CoverArtProvider, CoverSummary, HttpCoverProvider, fetch_covers};
pub use error::RomForgeError;
pub use gaps::{GapReport, missing_titles};
pub use organize::{
    MoveAction, MoveConflict, MoveFailure, OrganizePlan, OrganizeSummary, execute_moves, organize,
    placed_titles, plan_moves,
};
pub use scanner::ScannedFile;
pub use settings::Settings;
pub use verify::{
    ClassificationResult, MatchedFile, ReadFailure, ScanOptions, ScanProgress, scan, scan_blocking,
};
pub use worker_pool::CancelToken;
