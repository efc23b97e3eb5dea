use crate::error::{Error, Result};
use crate::tokenizer::Tokenizer;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One crawled page. Immutable once it enters the document store; replaced
/// only by a full reindex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: DocId,
    pub url: String,
    pub title: String,
    pub raw_text: String,
    /// Total tokens the page normalized to. Set when the document is added
    /// to the index, since it derives from the tokenizer tables.
    pub term_count: usize,
}

impl Document {
    pub fn new(doc_id: DocId, url: String, title: String, raw_text: String) -> Self {
        Self { doc_id, url, title, raw_text, term_count: 0 }
    }
}

/// Occurrence positions of one term within one document. Positions are
/// zero-based offsets into the document's normalized token stream, ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub positions: Vec<u32>,
}

/// Term -> postings mapping plus the document store. Postings lists are
/// kept sorted by `doc_id`; `doc_freq` always equals the number of
/// distinct documents in the term's list.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    pub(crate) postings: HashMap<String, Vec<Posting>>,
    pub(crate) doc_freq: HashMap<String, u32>,
    pub(crate) docs: HashMap<DocId, Document>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch-build from crawled documents in one pass.
    pub fn build(documents: Vec<Document>, tokenizer: &Tokenizer) -> Self {
        let mut index = Self::new();
        for doc in documents {
            index.add_document(doc, tokenizer);
        }
        tracing::info!(
            doc_count = index.doc_count(),
            term_count = index.term_count(),
            "index built"
        );
        index
    }

    /// Tokenize one document and fold it into the index. Touches only this
    /// document's terms; existing documents are never rescanned.
    pub fn add_document(&mut self, mut doc: Document, tokenizer: &Tokenizer) {
        let tokens = tokenizer.tokenize(&doc.raw_text);
        doc.term_count = tokens.len();

        let mut term_positions: HashMap<String, Vec<u32>> = HashMap::new();
        for (position, term) in tokens.into_iter().enumerate() {
            term_positions.entry(term).or_default().push(position as u32);
        }

        for (term, positions) in term_positions {
            let list = self.postings.entry(term.clone()).or_default();
            match list.binary_search_by_key(&doc.doc_id, |p| p.doc_id) {
                // Same doc_id added twice: keep the latest positions, df
                // already counts this document.
                Ok(i) => list[i].positions = positions,
                Err(i) => {
                    list.insert(i, Posting { doc_id: doc.doc_id, positions });
                    *self.doc_freq.entry(term).or_insert(0) += 1;
                }
            }
        }

        self.docs.insert(doc.doc_id, doc);
    }

    /// Postings for `term`, empty if the term was never indexed.
    pub fn postings(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of documents containing `term`, 0 if unseen.
    pub fn df(&self, term: &str) -> u32 {
        self.doc_freq.get(term).copied().unwrap_or(0)
    }

    pub fn doc_count(&self) -> usize {
        self.docs.len()
    }

    /// Number of distinct terms.
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn document(&self, doc_id: DocId) -> Result<&Document> {
        self.docs.get(&doc_id).ok_or(Error::NotFound(doc_id))
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.docs.values()
    }

    pub fn terms(&self) -> impl Iterator<Item = (&str, &[Posting])> {
        self.postings.iter().map(|(t, l)| (t.as_str(), l.as_slice()))
    }

    /// Check the structural invariants: every posting has positions, refers
    /// to a stored document, appears once per term, and `doc_freq` matches
    /// the distinct-document count. Used to reject corrupt index files.
    pub fn validate(&self) -> Result<()> {
        if self.postings.len() != self.doc_freq.len() {
            return Err(Error::IndexCorrupt(format!(
                "{} postings terms but {} doc_freq entries",
                self.postings.len(),
                self.doc_freq.len()
            )));
        }
        for (term, list) in &self.postings {
            let mut seen: HashSet<DocId> = HashSet::with_capacity(list.len());
            for posting in list {
                if posting.positions.is_empty() {
                    return Err(Error::IndexCorrupt(format!(
                        "term {term:?} has an empty position list for doc {}",
                        posting.doc_id
                    )));
                }
                if !self.docs.contains_key(&posting.doc_id) {
                    return Err(Error::IndexCorrupt(format!(
                        "term {term:?} references unknown doc {}",
                        posting.doc_id
                    )));
                }
                if !seen.insert(posting.doc_id) {
                    return Err(Error::IndexCorrupt(format!(
                        "term {term:?} lists doc {} more than once",
                        posting.doc_id
                    )));
                }
            }
            let recorded = self.df(term);
            if recorded as usize != seen.len() {
                return Err(Error::IndexCorrupt(format!(
                    "term {term:?} has doc_freq {recorded} but {} postings",
                    seen.len()
                )));
            }
        }
        Ok(())
    }
}

/// First `max_chars` characters of `text`, whitespace collapsed, cut at a
/// word boundary with an ellipsis when truncated. Display helper for
/// result listings.
pub fn make_snippet(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let truncated: String = collapsed.chars().take(max_chars).collect();
    let cut = truncated.rfind(' ').unwrap_or(truncated.len());
    format!("{}…", &truncated[..cut])
}
