//! Single-domain web search: bounded BFS crawler, positional inverted
//! index, and smoothed TF-IDF ranking behind one engine API.

pub mod config;
pub mod crawler;
pub mod engine;
pub mod error;
pub mod index;
pub mod persist;
pub mod ranker;
pub mod tokenizer;

pub type DocId = u32;

pub use config::Config;
pub use crawler::{CrawlOutcome, Crawler, RobotsPolicy};
pub use engine::{IndexStats, ReindexSummary, SearchEngine};
pub use error::{Error, Result};
pub use index::{make_snippet, Document, InvertedIndex, Posting};
pub use ranker::{rank, ScoredResult};
pub use tokenizer::Tokenizer;
