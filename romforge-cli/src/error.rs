use thiserror::Error;

use romforge_dat::DatError;
use romforge_lib::RomForgeError;

/// Errors that end a command with a non-zero exit status.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// Pipeline error (invalid root, catalog failure, runtime)
    #[error(transparent)]
    Pipeline(#[from] RomForgeError),

    /// Catalog fetch, parse or cache error
    #[error("Catalog error: {0}")]
    Catalog(#[from] DatError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

impl CliError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
