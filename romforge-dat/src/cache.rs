//! Catalog fetch collaborator: downloads a DAT once and serves it from an
//! on-disk cache afterwards.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dat;
use crate::error::DatError;

/// No-Intro SNES DAT as mirrored by the libretro-database project.
pub const DEFAULT_CATALOG_URL: &str = "https://raw.githubusercontent.com/libretro/libretro-database/master/metadat/no-intro/Nintendo%20-%20Super%20Nintendo%20Entertainment%20System.dat";

/// Cache format version. Bump this when changing the meta layout to
/// invalidate stale entries automatically.
const CACHE_VERSION: u32 = 1;

const META_FILE: &str = "meta.json";

/// Metadata about a cached DAT file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedDat {
    pub source: String,
    pub downloaded: String,
    pub dat_version: String,
    pub file_size: u64,
    #[serde(default)]
    pub dat_name: String,
}

/// Metadata file tracking all cached DATs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheMeta {
    #[serde(default)]
    pub version: u32,
    /// Cached file name → metadata
    pub dats: BTreeMap<String, CachedDat>,
}

/// Information about a cached DAT for display purposes.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub file_name: String,
    pub dat_name: String,
    pub file_size: u64,
    pub downloaded: String,
    pub dat_version: String,
}

/// Default cache directory for romforge DAT files.
pub fn cache_dir() -> Result<PathBuf, DatError> {
    let base =
        dirs::cache_dir().ok_or_else(|| DatError::cache("Could not determine cache directory"))?;
    Ok(base.join("romforge").join("dats"))
}

/// File name a catalog URL is cached under: its last path segment with
/// `%20` decoded, falling back to `catalog.dat`.
pub fn cache_file_name(url: &str) -> String {
    let segment = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .rsplit('/')
        .next()
        .unwrap_or("")
        .replace("%20", " ");
    if segment.is_empty() {
        "catalog.dat".to_string()
    } else {
        segment
    }
}

fn load_meta(dir: &Path) -> Result<CacheMeta, DatError> {
    let path = dir.join(META_FILE);
    if !path.exists() {
        return Ok(CacheMeta {
            version: CACHE_VERSION,
            ..Default::default()
        });
    }
    let contents = fs::read_to_string(&path)?;
    let meta: CacheMeta = serde_json::from_str(&contents)?;
    if meta.version != CACHE_VERSION {
        log::debug!("Discarding cache metadata with version {}", meta.version);
        return Ok(CacheMeta {
            version: CACHE_VERSION,
            ..Default::default()
        });
    }
    Ok(meta)
}

fn save_meta(dir: &Path, meta: &CacheMeta) -> Result<(), DatError> {
    fs::create_dir_all(dir)?;
    let contents = serde_json::to_string_pretty(meta)?;
    fs::write(dir.join(META_FILE), contents)?;
    Ok(())
}

/// Download raw catalog bytes.
pub fn download(url: &str) -> Result<Vec<u8>, DatError> {
    log::info!("Downloading catalog from {url}");
    let response =
        reqwest::blocking::get(url).map_err(|e| DatError::fetch(format!("{url}: {e}")))?;

    if !response.status().is_success() {
        return Err(DatError::fetch(format!("HTTP {} for {url}", response.status())));
    }

    let bytes = response
        .bytes()
        .map_err(|e| DatError::fetch(format!("Failed to read response from {url}: {e}")))?;
    Ok(bytes.to_vec())
}

/// Return the catalog bytes for `url`, from `dir` if cached (and `refresh`
/// is false), otherwise by downloading and caching them.
///
/// A download that does not parse as a DAT is not cached.
pub fn fetch_catalog(url: &str, dir: &Path, refresh: bool) -> Result<Vec<u8>, DatError> {
    let file_name = cache_file_name(url);
    let dat_path = dir.join(&file_name);

    if !refresh && dat_path.exists() {
        log::debug!("Using cached catalog {}", dat_path.display());
        return Ok(fs::read(&dat_path)?);
    }

    let bytes = download(url)?;
    let parsed = dat::parse_dat_bytes(&bytes)?;

    fs::create_dir_all(dir)?;
    let tmp = dat_path.with_extension("dat.tmp");
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, &dat_path)?;

    let mut meta = load_meta(dir)?;
    meta.version = CACHE_VERSION;
    meta.dats.insert(
        file_name,
        CachedDat {
            source: url.to_string(),
            downloaded: chrono::Utc::now().to_rfc3339(),
            dat_version: parsed.version,
            file_size: bytes.len() as u64,
            dat_name: parsed.name,
        },
    );
    save_meta(dir, &meta)?;

    Ok(bytes)
}

/// Read catalog bytes from a local DAT file supplied by the user.
pub fn read_local(path: &Path) -> Result<Vec<u8>, DatError> {
    fs::read(path).map_err(|e| DatError::fetch(format!("Cannot read {}: {e}", path.display())))
}

/// List all cached DAT files in `dir`.
pub fn list(dir: &Path) -> Result<Vec<CacheEntry>, DatError> {
    let meta = load_meta(dir)?;
    Ok(meta
        .dats
        .into_iter()
        .filter(|(file_name, _)| dir.join(file_name).exists())
        .map(|(file_name, cached)| CacheEntry {
            dat_name: if cached.dat_name.is_empty() {
                file_name.clone()
            } else {
                cached.dat_name
            },
            file_name,
            file_size: cached.file_size,
            downloaded: cached.downloaded,
            dat_version: cached.dat_version,
        })
        .collect())
}

/// Remove every cached file in `dir`. Returns the number of bytes freed.
pub fn clear(dir: &Path) -> Result<u64, DatError> {
    let mut total_size = 0u64;

    if dir.exists() {
        for entry in fs::read_dir(dir)?.flatten() {
            let path = entry.path();
            if path.is_file() {
                if let Ok(meta) = fs::metadata(&path) {
                    total_size += meta.len();
                }
                fs::remove_file(&path)?;
            }
        }
    }

    Ok(total_size)
}
