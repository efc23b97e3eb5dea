use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sitesearch::{persist, Document, InvertedIndex, Tokenizer};
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

fn build_tiny_index(path: &Path) {
    let tok = Tokenizer::default();
    let index = InvertedIndex::build(
        vec![
            Document::new(
                0,
                "https://example.com/intro".into(),
                "Intro to Rust".into(),
                "Rust is great. Rust systems programming.".into(),
            ),
            Document::new(
                1,
                "https://example.com/learn".into(),
                "Learning".into(),
                "Learning rust slowly but surely.".into(),
            ),
        ],
        &tok,
    );
    persist::save(&index, path).unwrap();
}

fn test_app() -> (tempfile::TempDir, Router) {
    let dir = tempdir().unwrap();
    let index_path = dir.path().join("index.json");
    build_tiny_index(&index_path);
    let app = sitesearch_server::build_app(index_path).unwrap();
    (dir, app)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let (_dir, app) = test_app();

    let (status, json) = get(&app, "/search?q=rust&k=2").await;
    assert_eq!(status, StatusCode::OK);
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    // Doc 0 mentions rust twice, doc 1 once.
    assert_eq!(results[0]["doc_id"].as_u64().unwrap(), 0);
    assert_eq!(results[1]["doc_id"].as_u64().unwrap(), 1);
    assert_eq!(results[0]["rank"].as_u64().unwrap(), 1);
    assert!(results[0]["snippet"].as_str().unwrap().contains("<em>"));
}

#[tokio::test]
async fn zero_and_negative_limits_return_empty_results() {
    let (_dir, app) = test_app();

    let (status, json) = get(&app, "/search?q=rust&k=0").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["results"].as_array().unwrap().is_empty());

    let (status, json) = get(&app, "/search?q=rust&k=-3").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn doc_endpoint_serves_metadata_and_404s_unknown_ids() {
    let (_dir, app) = test_app();

    let (status, json) = get(&app, "/doc/0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"].as_str().unwrap(), "Intro to Rust");
    assert!(json["text"].as_str().unwrap().contains("systems programming"));

    let resp = app
        .clone()
        .oneshot(Request::get("/doc/99").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_reports_index_shape() {
    let (_dir, app) = test_app();

    let (status, json) = get(&app, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["doc_count"].as_u64().unwrap(), 2);
    assert!(json["term_count"].as_u64().unwrap() > 0);
    assert!(json["average_postings_per_term"].as_f64().unwrap() >= 1.0);
}

#[tokio::test]
async fn reindex_with_unusable_seed_keeps_the_old_index() {
    let (_dir, app) = test_app();

    let req = Request::post("/reindex")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"seed_url":"not a url","max_pages":3}"#))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let (status, json) = get(&app, "/search?q=rust").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn health_endpoint_answers() {
    let (_dir, app) = test_app();
    let resp = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
