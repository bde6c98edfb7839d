/// Errors that can occur while loading, fetching or caching a catalog.
#[derive(Debug, thiserror::Error)]
pub enum DatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    /// The catalog does not have the expected structure (no game list).
    #[error("Invalid catalog: {0}")]
    Format(String),

    /// Two catalog entries share a fingerprint and the load policy rejects that.
    #[error("Duplicate fingerprint {fingerprint}: \"{first}\" and \"{second}\"")]
    DuplicateFingerprint {
        fingerprint: String,
        first: String,
        second: String,
    },

    /// The catalog could not be obtained from its source.
    #[error("Catalog fetch failed: {0}")]
    Fetch(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DatError {
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }
}
