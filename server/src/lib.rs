use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sitesearch::{make_snippet, rank, Config, Error, SearchEngine};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub index_path: PathBuf,
    pub admin_token: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: i64,
}
fn default_k() -> i64 {
    10
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: u32,
    pub rank: usize,
    pub score: f64,
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Deserialize)]
pub struct ReindexRequest {
    pub seed_url: String,
    pub max_depth: Option<usize>,
    pub max_pages: Option<usize>,
}

#[derive(Serialize)]
pub struct ReindexResponse {
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub pages_denied: usize,
    pub terms_indexed: usize,
    pub took_s: f64,
}

pub fn build_app(index_path: PathBuf) -> Result<Router> {
    let config = Config::default();
    let engine = if index_path.exists() {
        SearchEngine::open(config, &index_path)?
    } else {
        tracing::warn!(path = %index_path.display(), "no index file yet, starting empty");
        SearchEngine::new(config)
    };
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let state = AppState { engine: Arc::new(engine), index_path, admin_token };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/stats", get(stats_handler))
        .route("/reindex", post(reindex_handler))
        .with_state(state)
        .layer(cors);
    Ok(app)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse> {
    let start = Instant::now();
    // A negative limit clamps to an empty result rather than failing.
    let top_k = params.k.max(0) as usize;

    // One snapshot for ranking and hydration, so a concurrent reindex
    // cannot mix documents from two index generations.
    let index = state.engine.snapshot();
    let terms = state.engine.tokenizer().tokenize(&params.q);
    let hits = rank(&terms, &index, top_k);

    let raw_terms: Vec<String> = params.q.split_whitespace().map(str::to_string).collect();
    let snippet_len = state.engine.config().snippet_length;
    let mut results = Vec::with_capacity(hits.len());
    for hit in hits {
        let Ok(doc) = index.document(hit.doc_id) else { continue };
        let snippet = snippet_around(&doc.raw_text, &raw_terms, snippet_len);
        results.push(SearchHit {
            doc_id: doc.doc_id,
            rank: hit.rank,
            score: hit.score,
            title: doc.title.clone(),
            url: doc.url.clone(),
            snippet: highlight_terms(&snippet, &raw_terms),
        });
    }

    Json(SearchResponse {
        query: params.q,
        took_s: start.elapsed().as_secs_f64(),
        total_hits: results.len(),
        results,
    })
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<u32>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    match state.engine.document(doc_id) {
        Ok(doc) => Ok(Json(serde_json::json!({
            "doc_id": doc.doc_id,
            "title": doc.title,
            "url": doc.url,
            "term_count": doc.term_count,
            "text": doc.raw_text,
        }))),
        Err(err) => Err((StatusCode::NOT_FOUND, err.to_string())),
    }
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<sitesearch::IndexStats> {
    Json(state.engine.stats())
}

pub async fn reindex_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ReindexRequest>,
) -> Result<Json<ReindexResponse>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let config = state.engine.config();
    let max_depth = req.max_depth.unwrap_or(config.max_depth);
    let max_pages = req.max_pages.unwrap_or(config.max_pages);

    match state.engine.reindex(&req.seed_url, max_depth, max_pages).await {
        Ok(summary) => {
            if let Err(err) = state.engine.save(&state.index_path) {
                tracing::error!(%err, "failed to persist fresh index");
            }
            Ok(Json(ReindexResponse {
                pages_fetched: summary.pages_fetched,
                pages_failed: summary.pages_failed,
                pages_denied: summary.pages_denied,
                terms_indexed: summary.terms_indexed,
                took_s: summary.duration.as_secs_f64(),
            }))
        }
        Err(Error::ReindexInProgress) => {
            Err((StatusCode::CONFLICT, Error::ReindexInProgress.to_string()))
        }
        Err(err) => Err((StatusCode::BAD_GATEWAY, err.to_string())),
    }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let Some(required) = &state.admin_token else { return Ok(()) };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

/// Window of the page text around the first query-term occurrence, sized
/// and word-cut by `make_snippet`.
fn snippet_around(text: &str, raw_terms: &[String], max_chars: usize) -> String {
    let first = raw_terms.iter().filter(|t| !t.trim().is_empty()).find_map(|t| {
        regex::RegexBuilder::new(&regex::escape(t))
            .case_insensitive(true)
            .build()
            .ok()?
            .find(text)
            .map(|m| m.start())
    });
    match first {
        Some(idx) => {
            let mut start = idx.saturating_sub(max_chars / 2);
            while start > 0 && !text.is_char_boundary(start) {
                start -= 1;
            }
            let mut end = (idx + max_chars).min(text.len());
            while end < text.len() && !text.is_char_boundary(end) {
                end += 1;
            }
            make_snippet(&text[start..end], max_chars)
        }
        None => make_snippet(text, max_chars),
    }
}

fn highlight_terms(snippet: &str, raw_terms: &[String]) -> String {
    let mut out = snippet.to_string();
    for term in raw_terms {
        if term.trim().is_empty() {
            continue;
        }
        let Ok(pattern) =
            regex::RegexBuilder::new(&regex::escape(term)).case_insensitive(true).build()
        else {
            continue;
        };
        out = pattern
            .replace_all(&out, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0]))
            .to_string();
    }
    out
}
