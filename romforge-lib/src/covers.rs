//! Cover art for matched titles.
//!
//! The provider is a seam: the HTTP implementation pulls PNG box art from a
//! libretro-thumbnails style server, tests substitute their own.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::RomForgeError;

/// Named box-art directory of the libretro thumbnail server for SNES.
pub const DEFAULT_COVER_BASE_URL: &str =
    "https://thumbnails.libretro.com/Nintendo - Super Nintendo Entertainment System/Named_Boxarts";

/// Characters libretro thumbnail names replace with `_`.
const THUMBNAIL_FORBIDDEN: &[char] = &['&', '*', '/', ':', '`', '<', '>', '?', '\\', '|', '"'];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Supplies a cover image for a title.
pub trait CoverArtProvider {
    /// Make a cover for `title` available in `dest_dir` and return its path.
    fn fetch_cover(&self, title: &str, dest_dir: &Path) -> Result<PathBuf, RomForgeError>;
}

/// File name a thumbnail server uses for `title`.
pub fn cover_file_name(title: &str) -> String {
    let escaped: String = title
        .chars()
        .map(|c| if THUMBNAIL_FORBIDDEN.contains(&c) { '_' } else { c })
        .collect();
    format!("{escaped}.png")
}

/// Downloads `<base_url>/<escaped title>.png` over HTTP.
pub struct HttpCoverProvider {
    base_url: reqwest::Url,
    http: reqwest::blocking::Client,
}

impl HttpCoverProvider {
    pub fn new(base_url: &str) -> Result<Self, RomForgeError> {
        let base_url = reqwest::Url::parse(base_url)
            .map_err(|e| RomForgeError::cover(format!("Invalid cover URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RomForgeError::cover(format!("Invalid cover URL {base_url}")));
        }
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RomForgeError::cover(e.to_string()))?;
        Ok(Self { base_url, http })
    }

    /// URL of the cover for `title`; the file name is percent-encoded as one
    /// path segment.
    pub fn cover_url(&self, title: &str) -> reqwest::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&cover_file_name(title));
        }
        url
    }
}

impl CoverArtProvider for HttpCoverProvider {
    fn fetch_cover(&self, title: &str, dest_dir: &Path) -> Result<PathBuf, RomForgeError> {
        let dest = dest_dir.join(cover_file_name(title));
        if dest.exists() {
            log::debug!("Cover already present: {}", dest.display());
            return Ok(dest);
        }

        let url = self.cover_url(title);
        let response = self
            .http
            .get(url.clone())
            .send()
            .map_err(|e| RomForgeError::cover(format!("{url}: {e}")))?;
        if !response.status().is_success() {
            return Err(RomForgeError::cover(format!(
                "HTTP {} for {url}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .map_err(|e| RomForgeError::cover(format!("{url}: {e}")))?;

        fs::create_dir_all(dest_dir)
            .map_err(|e| RomForgeError::cover(format!("{}: {e}", dest_dir.display())))?;
        let tmp = dest.with_extension("png.tmp");
        fs::write(&tmp, &bytes)
            .and_then(|()| fs::rename(&tmp, &dest))
            .map_err(|e| RomForgeError::cover(format!("{}: {e}", dest.display())))?;

        log::debug!("Saved cover {}", dest.display());
        Ok(dest)
    }
}

/// Outcome of a cover pass.
#[derive(Debug, Default)]
pub struct CoverSummary {
    pub fetched: Vec<PathBuf>,
    /// (title, error)
    pub failures: Vec<(String, String)>,
}

/// Fetch a cover for every distinct title. Failures are logged and
/// collected; they never abort the pass.
pub fn fetch_covers<'a>(
    provider: &dyn CoverArtProvider,
    titles: impl IntoIterator<Item = &'a str>,
    dest_dir: &Path,
) -> CoverSummary {
    let titles: BTreeSet<&str> = titles.into_iter().collect();
    let mut summary = CoverSummary::default();

    for title in titles {
        match provider.fetch_cover(title, dest_dir) {
            Ok(path) => summary.fetched.push(path),
            Err(e) => {
                log::warn!("No cover for {title}: {e}");
                summary.failures.push((title.to_string(), e.to_string()));
            }
        }
    }

    log::info!(
        "{} covers available, {} failed",
        summary.fetched.len(),
        summary.failures.len()
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use romforge_dat::CatalogEntry;

    use crate::organize::{organize, placed_titles};
    use crate::scanner::ScannedFile;
    use crate::verify::MatchedFile;

    /// Writes a placeholder file for every title except those listed as missing.
    struct FakeProvider {
        missing: Vec<&'static str>,
        calls: RefCell<Vec<String>>,
    }

    impl CoverArtProvider for FakeProvider {
        fn fetch_cover(&self, title: &str, dest_dir: &Path) -> Result<PathBuf, RomForgeError> {
            self.calls.borrow_mut().push(title.to_string());
            if self.missing.iter().any(|m| *m == title) {
                return Err(RomForgeError::cover("HTTP 404"));
            }
            let dest = dest_dir.join(cover_file_name(title));
            fs::write(&dest, b"png").unwrap();
            Ok(dest)
        }
    }

    #[test]
    fn test_cover_file_name_escapes() {
        assert_eq!(
            cover_file_name("Legend of Zelda, The - A Link to the Past (USA)"),
            "Legend of Zelda, The - A Link to the Past (USA).png"
        );
        assert_eq!(cover_file_name("Tom & Jerry: 1/2"), "Tom _ Jerry_ 1_2.png");
    }

    #[test]
    fn test_cover_url_encodes_segment() {
        let provider = HttpCoverProvider::new("https://example.com/Named Boxarts/").unwrap();
        assert_eq!(
            provider.cover_url("Super Mario World (USA)").as_str(),
            "https://example.com/Named%20Boxarts/Super%20Mario%20World%20(USA).png"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpCoverProvider::new("not a url"),
            Err(RomForgeError::Cover(_))
        ));
    }

    #[test]
    fn test_existing_cover_is_not_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("Alpha.png");
        fs::write(&existing, b"png").unwrap();
        // Port 9 is discard; a request would fail.
        let provider = HttpCoverProvider::new("http://127.0.0.1:9/covers").unwrap();
        assert_eq!(provider.fetch_cover("Alpha", dir.path()).unwrap(), existing);
    }

    #[test]
    fn test_fetch_covers_is_non_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FakeProvider {
            missing: vec!["Beta"],
            calls: RefCell::new(Vec::new()),
        };

        let summary = fetch_covers(&provider, ["Gamma", "Alpha", "Beta", "Alpha"], dir.path());

        assert_eq!(*provider.calls.borrow(), vec!["Alpha", "Beta", "Gamma"]);
        assert_eq!(summary.fetched.len(), 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, "Beta");
        assert!(dir.path().join("Gamma.png").exists());
    }

    fn matched(path: PathBuf, title: &str) -> MatchedFile {
        MatchedFile {
            file: ScannedFile {
                path,
                extension: "sfc".into(),
                fingerprint: Some("00000000".into()),
                discovery_index: 0,
            },
            entry: CatalogEntry {
                fingerprint: "00000000".into(),
                canonical_file_name: format!("{title}.sfc"),
                title: title.into(),
                genre: "Action".into(),
                region: "USA".into(),
                size: 0,
            },
        }
    }

    #[test]
    fn test_covers_follow_organized_files_by_sanitized_title() {
        let dir = tempfile::tempdir().unwrap();
        let root = std::path::absolute(dir.path()).unwrap();
        let zelda = root.join("zelda.sfc");
        let copy1 = root.join("copy1.sfc");
        let copy2 = root.join("copy2.sfc");
        for path in [&zelda, &copy1, &copy2] {
            fs::write(path, b"rom").unwrap();
        }

        let mut files = vec![
            matched(zelda, "The Legend of Zelda: A Link to the Past"),
            matched(copy1, "Pilotwings"),
            matched(copy2, "Pilotwings"),
        ];
        let summary = organize(&root, &mut files).unwrap();
        assert_eq!(summary.moved.len(), 1);
        assert_eq!(summary.conflicts.len(), 1);

        let covers = root.join("covers");
        fs::create_dir_all(&covers).unwrap();
        let provider = FakeProvider {
            missing: vec![],
            calls: RefCell::new(Vec::new()),
        };
        let titles = placed_titles(&root, &files);
        fetch_covers(&provider, titles.iter().map(String::as_str), &covers);

        assert_eq!(
            *provider.calls.borrow(),
            vec!["The Legend of Zelda A Link to the Past"]
        );
    }
}
