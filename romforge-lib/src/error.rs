use std::path::PathBuf;

use thiserror::Error;

use romforge_dat::DatError;

/// Errors raised by the scan/verify/organize pipeline.
///
/// `Catalog` and `InvalidRoot` are fatal to an invocation. `FileRead` and
/// `FileMove` describe a single file and are collected into results rather
/// than propagated.
#[derive(Debug, Error)]
pub enum RomForgeError {
    /// Catalog could not be fetched or parsed
    #[error(transparent)]
    Catalog(#[from] DatError),

    /// The scan root is missing or not a directory
    #[error("Not a directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    /// A file could not be checksummed
    #[error("Failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A matched file could not be relocated
    #[error("Failed to move {} -> {}: {source}", source_path.display(), target.display())]
    FileMove {
        source_path: PathBuf,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cover-art lookup or download failed
    #[error("Cover art error: {0}")]
    Cover(String),

    /// Settings file could not be read or written
    #[error("Settings error: {0}")]
    Settings(String),

    /// Async runtime could not be created
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl RomForgeError {
    pub fn cover(msg: impl Into<String>) -> Self {
        Self::Cover(msg.into())
    }

    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }
}
