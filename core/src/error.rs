use crate::DocId;

/// Errors produced by the crawl/index/search pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network, timeout, or HTTP-status failure while fetching one page.
    /// Non-fatal during a crawl: the URL is skipped and counted.
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// robots.txt forbids fetching this URL. Non-fatal, skipped.
    #[error("fetch disallowed by robots policy: {0}")]
    PolicyDenied(String),

    #[error("document {0} not found")]
    NotFound(DocId),

    /// Malformed query input. Callers clamp recoverable cases (negative
    /// result limits, empty queries) to empty results instead.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A persisted index failed structural validation on load. Nothing is
    /// loaded; any in-memory index stays as it was.
    #[error("index corrupt: {0}")]
    IndexCorrupt(String),

    /// At most one index build may be in flight.
    #[error("reindex already in progress")]
    ReindexInProgress,

    #[error("http client setup: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("index file: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
