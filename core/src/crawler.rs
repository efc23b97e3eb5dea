use crate::config::Config;
use crate::error::{Error, Result};
use crate::index::Document;
use crate::DocId;
use lazy_static::lazy_static;
use reqwest::{header, Client};
use scraper::node::Node;
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use url::Url;

lazy_static! {
    static ref SEL_TITLE: Selector = Selector::parse("title").expect("valid selector");
    static ref SEL_LINKS: Selector = Selector::parse("a[href]").expect("valid selector");
}

/// Elements whose text never reaches the index.
const HIDDEN_TAGS: &[&str] = &["script", "style", "nav", "header", "footer", "head", "noscript"];

/// Pages larger than this are skipped outright.
const MAX_PAGE_BYTES: usize = 2 * 1024 * 1024;

/// Poll interval while waiting on in-flight fetches.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Parsed robots-exclusion rules for the `*` user-agent group. The empty
/// default allows everything, which doubles as the fail-open behavior when
/// robots.txt is missing or unreachable.
#[derive(Debug, Clone, Default)]
pub struct RobotsPolicy {
    allows: Vec<String>,
    disallows: Vec<String>,
    pub crawl_delay: Option<Duration>,
}

impl RobotsPolicy {
    pub fn parse(txt: &str) -> Self {
        let mut active = false;
        let mut policy = Self::default();
        for line in txt.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else { continue };
            let value = value.trim();
            match key.trim().to_lowercase().as_str() {
                "user-agent" => active = value == "*",
                "allow" if active => policy.allows.push(value.to_string()),
                // An empty Disallow line means "allow everything".
                "disallow" if active && !value.is_empty() => {
                    policy.disallows.push(value.to_string());
                }
                "crawl-delay" if active => {
                    if let Ok(secs) = value.parse::<f64>() {
                        if secs >= 0.0 {
                            policy.crawl_delay = Some(Duration::from_secs_f64(secs));
                        }
                    }
                }
                _ => {}
            }
        }
        policy
    }

    /// Longest matching rule wins; Allow beats Disallow on equal length.
    pub fn allows(&self, path: &str) -> bool {
        let best_allow = self
            .allows
            .iter()
            .filter(|p| path.starts_with(p.as_str()))
            .map(|p| p.len())
            .max();
        let best_disallow = self
            .disallows
            .iter()
            .filter(|p| path.starts_with(p.as_str()))
            .map(|p| p.len())
            .max();
        match (best_allow, best_disallow) {
            (Some(a), Some(d)) => a >= d,
            (None, Some(_)) => false,
            _ => true,
        }
    }
}

/// host + effective port; the crawl never leaves the seed's authority.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Authority {
    host: String,
    port: Option<u16>,
}

impl Authority {
    fn of(url: &Url) -> Option<Self> {
        url.host_str().map(|h| Self { host: h.to_string(), port: url.port_or_known_default() })
    }
}

struct FetchedPage {
    url: String,
    title: String,
    text: String,
    links: Vec<Url>,
}

/// Everything one crawl produced, for the reindex summary.
#[derive(Debug)]
pub struct CrawlOutcome {
    /// Successfully fetched pages, `doc_id` in emit order.
    pub documents: Vec<Document>,
    /// Transport, HTTP-status, and content failures (all skipped).
    pub pages_failed: usize,
    /// URLs robots.txt refused.
    pub pages_denied: usize,
}

/// Breadth-first crawler bounded to the seed's domain. Fetches run
/// concurrently up to `Config::fetch_concurrency`; the frontier and the
/// visited set stay owned by the scheduling loop, so a URL is enqueued at
/// most once.
pub struct Crawler {
    client: Client,
    config: Config,
}

impl Crawler {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config: config.clone() })
    }

    /// Crawl from `seed_url`, at most `max_pages` pages and `max_depth`
    /// link-hops. Individual fetch failures are counted and skipped; the
    /// crawl itself only fails on an unusable seed URL.
    pub async fn crawl(
        &self,
        seed_url: &str,
        max_depth: usize,
        max_pages: usize,
    ) -> Result<CrawlOutcome> {
        let seed = Url::parse(seed_url).map_err(|e| Error::Fetch {
            url: seed_url.to_string(),
            reason: format!("invalid seed url: {e}"),
        })?;
        let authority = Authority::of(&seed).ok_or_else(|| Error::Fetch {
            url: seed_url.to_string(),
            reason: "seed url has no host".to_string(),
        })?;

        let policy = self.fetch_robots(&seed).await;
        let delay = policy.crawl_delay.unwrap_or(self.config.crawl_delay);

        let mut frontier: VecDeque<(Url, usize)> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(norm_url(&seed));
        frontier.push_back((seed, 0));

        let mut documents: Vec<Document> = Vec::new();
        let mut pages_failed = 0usize;
        let mut pages_denied = 0usize;
        let mut next_doc_id: DocId = 0;
        let mut inflight: Vec<JoinHandle<(usize, Result<FetchedPage>)>> = Vec::new();

        tracing::info!(seed = seed_url, max_depth, max_pages, "starting crawl");

        while documents.len() < max_pages && (!frontier.is_empty() || !inflight.is_empty()) {
            while inflight.len() < self.config.fetch_concurrency
                && documents.len() + inflight.len() < max_pages
            {
                let Some((url, depth)) = frontier.pop_front() else { break };
                let client = self.client.clone();
                let policy = policy.clone();
                let authority = authority.clone();
                inflight.push(tokio::spawn(async move {
                    if !policy.allows(url.path()) {
                        return (depth, Err(Error::PolicyDenied(url.to_string())));
                    }
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                    (depth, fetch_page(&client, url, &authority).await)
                }));
            }

            if inflight.is_empty() {
                break;
            }

            let mut completed = false;
            let mut i = 0;
            while i < inflight.len() {
                if !inflight[i].is_finished() {
                    i += 1;
                    continue;
                }
                completed = true;
                let handle = inflight.swap_remove(i);
                match handle.await {
                    Ok((depth, Ok(page))) => {
                        if depth < max_depth {
                            for link in page.links {
                                if visited.insert(norm_url(&link)) {
                                    frontier.push_back((link, depth + 1));
                                }
                            }
                        }
                        if documents.len() < max_pages {
                            let doc_id = next_doc_id;
                            next_doc_id += 1;
                            tracing::info!(doc_id, depth, url = %page.url, "fetched page");
                            documents.push(Document::new(doc_id, page.url, page.title, page.text));
                        }
                    }
                    Ok((_, Err(Error::PolicyDenied(url)))) => {
                        pages_denied += 1;
                        tracing::info!(%url, "blocked by robots policy");
                    }
                    Ok((_, Err(err))) => {
                        pages_failed += 1;
                        tracing::warn!(%err, "skipping page");
                    }
                    Err(join_err) => {
                        pages_failed += 1;
                        tracing::warn!(%join_err, "fetch task aborted");
                    }
                }
            }
            if !completed {
                sleep(POLL_INTERVAL).await;
            }
        }

        for handle in inflight {
            handle.abort();
        }

        tracing::info!(
            pages = documents.len(),
            failed = pages_failed,
            denied = pages_denied,
            frontier = frontier.len(),
            "crawl finished"
        );
        Ok(CrawlOutcome { documents, pages_failed, pages_denied })
    }

    async fn fetch_robots(&self, seed: &Url) -> RobotsPolicy {
        let robots_url = match seed.join("/robots.txt") {
            Ok(u) => u,
            Err(_) => return RobotsPolicy::default(),
        };
        match self.client.get(robots_url.clone()).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(txt) => RobotsPolicy::parse(&txt),
                Err(_) => RobotsPolicy::default(),
            },
            _ => {
                tracing::debug!(url = %robots_url, "no robots.txt, allowing all");
                RobotsPolicy::default()
            }
        }
    }
}

async fn fetch_page(client: &Client, url: Url, authority: &Authority) -> Result<FetchedPage> {
    let resp = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| fetch_error(&url, e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(fetch_error(&url, format!("http status {status}")));
    }
    if let Some(ct) = resp.headers().get(header::CONTENT_TYPE) {
        let ct = ct.to_str().unwrap_or("");
        if !ct.starts_with("text/html") {
            return Err(fetch_error(&url, format!("unsupported content type {ct:?}")));
        }
    }
    let body = resp.text().await.map_err(|e| fetch_error(&url, e.to_string()))?;
    if body.len() > MAX_PAGE_BYTES {
        return Err(fetch_error(&url, format!("page exceeds {MAX_PAGE_BYTES} bytes")));
    }
    Ok(parse_page(&url, &body, authority))
}

fn fetch_error(url: &Url, reason: String) -> Error {
    Error::Fetch { url: url.to_string(), reason }
}

fn parse_page(url: &Url, body: &str, authority: &Authority) -> FetchedPage {
    let html = Html::parse_document(body);
    let title = html
        .select(&SEL_TITLE)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());
    let text = visible_text(&html);
    let links = extract_links(&html, url, authority);
    FetchedPage { url: norm_url(url), title, text, links }
}

/// All text under elements that render, whitespace collapsed.
fn visible_text(html: &Html) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in html.tree.nodes() {
        let Node::Text(text) = node.value() else { continue };
        let hidden = node.ancestors().any(|a| match a.value() {
            Node::Element(el) => HIDDEN_TAGS.contains(&el.name()),
            _ => false,
        });
        if !hidden {
            parts.push(&*text.text);
        }
    }
    parts.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_links(html: &Html, base: &Url, authority: &Authority) -> Vec<Url> {
    let mut links = Vec::new();
    for anchor in html.select(&SEL_LINKS) {
        let Some(href) = anchor.value().attr("href") else { continue };
        let href = href.trim();
        if href.starts_with('#') || href.starts_with("mailto:") || href.starts_with("javascript:")
        {
            continue;
        }
        let Ok(mut link) = Url::parse(href).or_else(|_| base.join(href)) else { continue };
        if !matches!(link.scheme(), "http" | "https") {
            continue;
        }
        // Queries and fragments mostly alias the same page; drop them.
        link.set_query(None);
        link.set_fragment(None);
        // Single-domain scope is a hard boundary, not a heuristic.
        if Authority::of(&link).as_ref() != Some(authority) {
            continue;
        }
        links.push(link);
    }
    links
}

/// Canonical form used for visited-set membership: query and fragment
/// dropped, trailing slash trimmed.
pub(crate) fn norm_url(u: &Url) -> String {
    let mut u = u.clone();
    u.set_fragment(None);
    u.set_query(None);
    let trimmed = {
        let path = u.path();
        if path.len() > 1 && path.ends_with('/') {
            Some(path.trim_end_matches('/').to_string())
        } else {
            None
        }
    };
    if let Some(path) = trimmed {
        u.set_path(&path);
    }
    u.to_string()
}
