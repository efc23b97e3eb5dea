use std::time::Duration;

/// Engine-wide settings. `Default` carries the stock values; front ends
/// override individual fields from flags or the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// How many link-hops away from the seed to follow (0 = seed only).
    pub max_depth: usize,
    /// Hard cap on pages fetched in one crawl.
    pub max_pages: usize,
    /// Politeness delay before each request. robots.txt `Crawl-delay`
    /// overrides it when present.
    pub crawl_delay: Duration,
    /// Per-request HTTP timeout. A timed-out fetch counts as a failure.
    pub request_timeout: Duration,
    /// Bounded number of in-flight fetches.
    pub fetch_concurrency: usize,
    /// User-Agent sent with every request, robots.txt included.
    pub user_agent: String,
    /// Default number of results per query.
    pub top_k: usize,
    /// Maximum characters in a result snippet.
    pub snippet_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_pages: 50,
            crawl_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
            fetch_concurrency: 8,
            user_agent: "sitesearch-bot/0.1 (+https://example.com/bot)".into(),
            top_k: 10,
            snippet_length: 200,
        }
    }
}
