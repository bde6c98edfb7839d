pub mod cache;
pub mod dat;
pub mod error;
pub mod matcher;

pub use cache::{CacheEntry, CachedDat, DEFAULT_CATALOG_URL};
pub use dat::{DatFile, DatGame, DatRom};
pub use error::DatError;
pub use matcher::{CatalogEntry, CatalogIndex, DuplicatePolicy, UNKNOWN};
