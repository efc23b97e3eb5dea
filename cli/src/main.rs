use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sitesearch::{make_snippet, Config, SearchEngine};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "sitesearch")]
#[command(about = "Crawl a site and search it with TF-IDF", long_about = None)]
struct Cli {
    /// Index file path
    #[arg(long, default_value = "./index.json")]
    index: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl a website and rebuild the index
    Crawl {
        /// Seed URL to start from
        url: String,
        /// Maximum link depth from the seed (0 = seed only)
        #[arg(long, short, default_value_t = 2)]
        depth: usize,
        /// Maximum pages to fetch
        #[arg(long, short, default_value_t = 50)]
        pages: usize,
    },
    /// Search the index
    Search {
        /// Query words
        #[arg(required = true)]
        query: Vec<String>,
        /// Number of results to show
        #[arg(long, short = 'k', default_value_t = 10)]
        top: usize,
    },
    /// Show index statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Crawl { url, depth, pages } => crawl(&cli.index, &url, depth, pages).await,
        Commands::Search { query, top } => search(&cli.index, &query.join(" "), top),
        Commands::Stats => stats(&cli.index),
    }
}

async fn crawl(index_path: &Path, url: &str, depth: usize, pages: usize) -> Result<()> {
    let engine = SearchEngine::new(Config::default());
    let summary = engine.reindex(url, depth, pages).await.context("crawl failed")?;
    engine.save(index_path)?;
    println!(
        "Crawled {} pages ({} failed, {} denied by robots), {} terms in {:.2}s",
        summary.pages_fetched,
        summary.pages_failed,
        summary.pages_denied,
        summary.terms_indexed,
        summary.duration.as_secs_f64()
    );
    println!("Index written to {}", index_path.display());
    Ok(())
}

fn open(index_path: &Path) -> Result<SearchEngine> {
    SearchEngine::open(Config::default(), index_path).with_context(|| {
        format!("no usable index at {}; run `crawl` first", index_path.display())
    })
}

fn search(index_path: &Path, query: &str, top: usize) -> Result<()> {
    let engine = open(index_path)?;
    let results = engine.search(query, top);
    if results.is_empty() {
        println!("No results found for: {query:?}");
        return Ok(());
    }

    println!("Top {} result(s) for: {query:?}\n", results.len());
    let snippet_len = engine.config().snippet_length;
    for hit in results {
        let doc = engine.document(hit.doc_id)?;
        println!("{}. {}", hit.rank, doc.title);
        println!("   URL:     {}", doc.url);
        println!("   Score:   {:.4}", hit.score);
        println!("   Snippet: {}", make_snippet(&doc.raw_text, snippet_len));
        println!();
    }
    Ok(())
}

fn stats(index_path: &Path) -> Result<()> {
    let engine = open(index_path)?;
    let stats = engine.stats();
    println!("Documents indexed : {}", stats.doc_count);
    println!("Unique terms      : {}", stats.term_count);
    println!("Avg postings/term : {:.2}", stats.average_postings_per_term);
    Ok(())
}
