use sitesearch::{Config, Crawler};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> Config {
    Config {
        crawl_delay: Duration::ZERO,
        request_timeout: Duration::from_secs(5),
        fetch_concurrency: 4,
        ..Config::default()
    }
}

fn html_page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><head><title>{title}</title></head><body>{body}</body></html>"),
        "text/html; charset=utf-8",
    )
}

#[tokio::test]
async fn single_page_without_links_yields_one_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", "<p>just one lonely page</p>"))
        .mount(&server)
        .await;

    let crawler = Crawler::new(&test_config()).unwrap();
    // Depth headroom changes nothing when there is nowhere to go.
    let outcome = crawler.crawl(&server.uri(), 5, 10).await.unwrap();

    assert_eq!(outcome.documents.len(), 1);
    assert_eq!(outcome.pages_failed, 0);
    assert_eq!(outcome.pages_denied, 0);
    let doc = &outcome.documents[0];
    assert_eq!(doc.doc_id, 0);
    assert_eq!(doc.title, "Home");
    assert!(doc.raw_text.contains("lonely page"));
}

#[tokio::test]
async fn max_pages_bounds_a_cyclic_graph() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("A", "<a href=\"/b\">to b</a>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html_page("B", "<a href=\"/\">back</a>"))
        .mount(&server)
        .await;

    let crawler = Crawler::new(&test_config()).unwrap();
    let outcome = crawler.crawl(&server.uri(), 10, 2).await.unwrap();

    assert_eq!(outcome.documents.len(), 2);
}

#[tokio::test]
async fn robots_disallow_is_respected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", "<a href=\"/private\">p</a> <a href=\"/public\">q</a>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(html_page("Public", "fine"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(html_page("Private", "secret"))
        .expect(0)
        .mount(&server)
        .await;

    let crawler = Crawler::new(&test_config()).unwrap();
    let outcome = crawler.crawl(&server.uri(), 2, 10).await.unwrap();

    assert_eq!(outcome.documents.len(), 2);
    assert_eq!(outcome.pages_denied, 1);
}

#[tokio::test]
async fn missing_robots_txt_allows_everything() {
    let server = MockServer::start().await;
    // No robots.txt mock: the server answers 404 and the crawl proceeds.
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", "<a href=\"/b\">b</a>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html_page("B", "beta"))
        .mount(&server)
        .await;

    let crawler = Crawler::new(&test_config()).unwrap();
    let outcome = crawler.crawl(&server.uri(), 1, 10).await.unwrap();
    assert_eq!(outcome.documents.len(), 2);
}

#[tokio::test]
async fn out_of_domain_links_are_discarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", "<a href=\"http://elsewhere.invalid/x\">away</a>"))
        .mount(&server)
        .await;

    let crawler = Crawler::new(&test_config()).unwrap();
    let outcome = crawler.crawl(&server.uri(), 3, 10).await.unwrap();

    // The off-site link is never enqueued, so nothing fails either.
    assert_eq!(outcome.documents.len(), 1);
    assert_eq!(outcome.pages_failed, 0);
}

#[tokio::test]
async fn aliased_urls_are_fetched_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            "<a href=\"/b\">1</a> <a href=\"/b/\">2</a> <a href=\"/b#frag\">3</a> <a href=\"/b?q=1\">4</a>",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html_page("B", "beta"))
        .expect(1)
        .mount(&server)
        .await;

    let crawler = Crawler::new(&test_config()).unwrap();
    let outcome = crawler.crawl(&server.uri(), 1, 10).await.unwrap();

    assert_eq!(outcome.documents.len(), 2);
}

#[tokio::test]
async fn non_html_and_http_errors_are_counted_and_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", "<a href=\"/data.bin\">d</a> <a href=\"/missing\">m</a>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/octet-stream")
                .set_body_bytes(vec![0u8; 16]),
        )
        .mount(&server)
        .await;
    // "/missing" has no mock and returns 404.

    let crawler = Crawler::new(&test_config()).unwrap();
    let outcome = crawler.crawl(&server.uri(), 1, 10).await.unwrap();

    assert_eq!(outcome.documents.len(), 1);
    assert_eq!(outcome.pages_failed, 2);
}

#[tokio::test]
async fn depth_zero_fetches_the_seed_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", "<a href=\"/b\">b</a>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html_page("B", "beta"))
        .expect(0)
        .mount(&server)
        .await;

    let crawler = Crawler::new(&test_config()).unwrap();
    let outcome = crawler.crawl(&server.uri(), 0, 10).await.unwrap();

    assert_eq!(outcome.documents.len(), 1);
}

#[tokio::test]
async fn unparseable_seed_is_an_error() {
    let crawler = Crawler::new(&test_config()).unwrap();
    assert!(crawler.crawl("not a url", 1, 10).await.is_err());
}
