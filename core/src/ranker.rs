use crate::index::InvertedIndex;
use crate::DocId;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// One ranked hit. Transient: produced per query, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    pub doc_id: DocId,
    pub score: f64,
    /// 1-based position in the result list.
    pub rank: usize,
}

/// Score every document containing at least one query term and return the
/// top `top_k`, best first.
///
/// Per document and term: `tf * (ln((N + 1) / (df + 1)) + 1)` where `tf`
/// is the raw occurrence count. Repeated query terms are evaluated once.
/// Ties on score break toward the lower `doc_id` so identical corpora
/// rank identically across runs.
pub fn rank(query_terms: &[String], index: &InvertedIndex, top_k: usize) -> Vec<ScoredResult> {
    if top_k == 0 || query_terms.is_empty() {
        return Vec::new();
    }

    let n = index.doc_count() as f64;
    let mut scores: HashMap<DocId, f64> = HashMap::new();
    let mut evaluated: HashSet<&str> = HashSet::with_capacity(query_terms.len());

    for term in query_terms {
        if !evaluated.insert(term.as_str()) {
            continue;
        }
        let df = index.df(term);
        if df == 0 {
            continue;
        }
        let idf = ((n + 1.0) / (f64::from(df) + 1.0)).ln() + 1.0;
        for posting in index.postings(term) {
            let tf = posting.positions.len() as f64;
            *scores.entry(posting.doc_id).or_insert(0.0) += tf * idf;
        }
    }

    let mut ranked: Vec<(DocId, f64)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    ranked
        .into_iter()
        .take(top_k)
        .enumerate()
        .map(|(i, (doc_id, score))| ScoredResult { doc_id, score, rank: i + 1 })
        .collect()
}
