//! User settings (`~/.config/romforge/settings.toml`).
//!
//! Every field is optional in the file; anything missing takes the built-in
//! default. Command-line flags are applied on top by the CLI.

use std::fs;
use std::path::{Path, PathBuf};

use romforge_dat::{DEFAULT_CATALOG_URL, DuplicatePolicy};
use serde::{Deserialize, Serialize};

use crate::covers::DEFAULT_COVER_BASE_URL;
use crate::error::RomForgeError;
use crate::verify::{DEFAULT_EXTENSIONS, default_workers};

/// Canonical path to the settings file: `~/.config/romforge/settings.toml`.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("romforge").join("settings.toml")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Where the catalog DAT is downloaded from
    pub url: String,
    /// Override for the DAT cache directory
    pub cache_dir: Option<PathBuf>,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_CATALOG_URL.to_string(),
            cache_dir: None,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub workers: usize,
    pub extensions: Vec<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverSettings {
    pub base_url: String,
    /// Covers directory; relative paths are resolved against the collection root
    pub dir: PathBuf,
}

impl Default for CoverSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_COVER_BASE_URL.to_string(),
            dir: PathBuf::from("Covers"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub catalog: CatalogSettings,
    pub scan: ScanSettings,
    pub covers: CoverSettings,
}

impl Settings {
    /// Load from the canonical settings path. A missing file yields defaults.
    pub fn load() -> Result<Self, RomForgeError> {
        Self::load_from(&settings_path())
    }

    /// Load from `path`. A missing file yields defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self, RomForgeError> {
        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No settings file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(RomForgeError::settings(format!("{}: {e}", path.display())));
            }
        };
        toml::from_str(&contents)
            .map_err(|e| RomForgeError::settings(format!("{}: {e}", path.display())))
    }

    /// Write to `path` atomically, creating the parent directory.
    pub fn save_to(&self, path: &Path) -> Result<(), RomForgeError> {
        let err = |e: std::io::Error| RomForgeError::settings(format!("{}: {e}", path.display()));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(err)?;
        }
        let serialized = self.to_toml()?;
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, serialized).map_err(err)?;
        fs::rename(&tmp, path).map_err(err)?;
        Ok(())
    }

    pub fn save(&self) -> Result<(), RomForgeError> {
        self.save_to(&settings_path())
    }

    /// Effective settings rendered as TOML.
    pub fn to_toml(&self) -> Result<String, RomForgeError> {
        toml::to_string_pretty(self).map_err(|e| RomForgeError::settings(e.to_string()))
    }

    /// Covers directory for a collection rooted at `root`.
    pub fn covers_dir(&self, root: &Path) -> PathBuf {
        if self.covers.dir.is_absolute() {
            self.covers.dir.clone()
        } else {
            root.join(&self.covers.dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.scan.extensions, vec!["sfc", "smc"]);
        assert_eq!(settings.catalog.duplicate_policy, DuplicatePolicy::LastWins);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            "[scan]\nworkers = 3\n\n[catalog]\nduplicate_policy = \"reject\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.scan.workers, 3);
        assert_eq!(settings.scan.extensions, vec!["sfc", "smc"]);
        assert_eq!(settings.catalog.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(settings.catalog.url, DEFAULT_CATALOG_URL);
        assert_eq!(settings.covers, CoverSettings::default());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[scan\nworkers = ").unwrap();
        assert!(matches!(Settings::load_from(&path), Err(RomForgeError::Settings(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/settings.toml");
        let mut settings = Settings::default();
        settings.scan.workers = 2;
        settings.catalog.cache_dir = Some(PathBuf::from("/tmp/dats"));
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(&path).unwrap(), settings);
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_covers_dir_resolution() {
        let mut settings = Settings::default();
        assert_eq!(
            settings.covers_dir(Path::new("/roms")),
            PathBuf::from("/roms/Covers")
        );
        settings.covers.dir = PathBuf::from("/art");
        assert_eq!(settings.covers_dir(Path::new("/roms")), PathBuf::from("/art"));
    }

    #[test]
    fn test_settings_path_location() {
        let path = settings_path();
        assert!(path.ends_with("romforge/settings.toml"));
    }
}
