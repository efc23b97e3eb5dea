use crate::config::Config;
use crate::crawler::Crawler;
use crate::error::{Error, Result};
use crate::index::{Document, InvertedIndex};
use crate::persist;
use crate::ranker::{self, ScoredResult};
use crate::tokenizer::Tokenizer;
use crate::DocId;
use parking_lot::RwLock;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Read-only index summary.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub doc_count: usize,
    pub term_count: usize,
    pub average_postings_per_term: f64,
}

/// What one `reindex` call accomplished.
#[derive(Debug, Clone)]
pub struct ReindexSummary {
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub pages_denied: usize,
    pub terms_indexed: usize,
    pub duration: Duration,
}

/// Orchestrates tokenizer, crawler, index, and ranker behind one API.
///
/// Queries read a snapshot `Arc` of the current index; `reindex` builds a
/// replacement off to the side and swaps it in atomically, so concurrent
/// readers observe either the old or the new index, never a partial one.
pub struct SearchEngine {
    config: Config,
    tokenizer: Tokenizer,
    index: RwLock<Arc<InvertedIndex>>,
    reindex_gate: tokio::sync::Mutex<()>,
}

impl SearchEngine {
    pub fn new(config: Config) -> Self {
        Self::with_index(config, InvertedIndex::new())
    }

    pub fn with_index(config: Config, index: InvertedIndex) -> Self {
        Self {
            config,
            tokenizer: Tokenizer::default(),
            index: RwLock::new(Arc::new(index)),
            reindex_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Load a previously saved index. Fails with `IndexCorrupt` (and loads
    /// nothing) if the file does not satisfy the index invariants.
    pub fn open(config: Config, path: &Path) -> Result<Self> {
        let index = persist::load(path)?;
        Ok(Self::with_index(config, index))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Consistent point-in-time view of the index.
    pub fn snapshot(&self) -> Arc<InvertedIndex> {
        self.index.read().clone()
    }

    /// Tokenize `query` and return up to `top_k` ranked results. Empty and
    /// all-stop-word queries return no results rather than an error.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<ScoredResult> {
        let terms = self.tokenizer.tokenize(query);
        let index = self.snapshot();
        ranker::rank(&terms, &index, top_k)
    }

    pub fn document(&self, doc_id: DocId) -> Result<Document> {
        self.snapshot().document(doc_id).cloned()
    }

    pub fn stats(&self) -> IndexStats {
        let index = self.snapshot();
        let term_count = index.term_count();
        let posting_entries: usize = index.terms().map(|(_, list)| list.len()).sum();
        let average =
            if term_count == 0 { 0.0 } else { posting_entries as f64 / term_count as f64 };
        IndexStats { doc_count: index.doc_count(), term_count, average_postings_per_term: average }
    }

    /// Crawl from `seed_url` and replace the index with one built from the
    /// crawled pages. All-or-nothing: on any failure, including a crawl
    /// that produced no documents, the previous index stays in place. A
    /// second call while one is running gets `ReindexInProgress`.
    pub async fn reindex(
        &self,
        seed_url: &str,
        max_depth: usize,
        max_pages: usize,
    ) -> Result<ReindexSummary> {
        let _gate = self.reindex_gate.try_lock().map_err(|_| Error::ReindexInProgress)?;
        let started = Instant::now();

        let crawler = Crawler::new(&self.config)?;
        let outcome = crawler.crawl(seed_url, max_depth, max_pages).await?;
        if outcome.documents.is_empty() {
            return Err(Error::Fetch {
                url: seed_url.to_string(),
                reason: "crawl produced no documents".to_string(),
            });
        }

        let index = InvertedIndex::build(outcome.documents, &self.tokenizer);
        let summary = ReindexSummary {
            pages_fetched: index.doc_count(),
            pages_failed: outcome.pages_failed,
            pages_denied: outcome.pages_denied,
            terms_indexed: index.term_count(),
            duration: started.elapsed(),
        };

        *self.index.write() = Arc::new(index);
        tracing::info!(
            pages = summary.pages_fetched,
            failed = summary.pages_failed,
            terms = summary.terms_indexed,
            took_s = summary.duration.as_secs_f64(),
            "index replaced"
        );
        Ok(summary)
    }

    /// Swap in a prebuilt index (loaders and tests).
    pub fn replace_index(&self, index: InvertedIndex) {
        *self.index.write() = Arc::new(index);
    }

    /// Persist the current index snapshot.
    pub fn save(&self, path: &Path) -> Result<()> {
        persist::save(&self.snapshot(), path)
    }
}
