use crate::error::{Error, Result};
use crate::index::{Document, InvertedIndex, Posting};
use crate::tokenizer::RULES_VERSION;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use time::format_description::well_known::Rfc3339;

pub const FORMAT_VERSION: u32 = 1;

/// On-disk layout: one JSON document holding the document store and the
/// term -> doc -> positions mapping. BTreeMaps keep the output stable
/// across saves of the same index.
#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    /// Tokenizer table version the terms were produced with. An index cut
    /// with different tables would silently mismatch queries.
    rules_version: u32,
    created_at: String,
    doc_count: usize,
    documents: BTreeMap<DocId, Document>,
    index: BTreeMap<String, BTreeMap<DocId, Vec<u32>>>,
}

pub fn save(index: &InvertedIndex, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            create_dir_all(dir)?;
        }
    }

    let documents: BTreeMap<DocId, Document> =
        index.docs.iter().map(|(id, doc)| (*id, doc.clone())).collect();
    let mut terms: BTreeMap<String, BTreeMap<DocId, Vec<u32>>> = BTreeMap::new();
    for (term, list) in &index.postings {
        let by_doc = terms.entry(term.clone()).or_default();
        for posting in list {
            by_doc.insert(posting.doc_id, posting.positions.clone());
        }
    }

    let file = IndexFile {
        version: FORMAT_VERSION,
        rules_version: RULES_VERSION,
        created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        doc_count: index.doc_count(),
        documents,
        index: terms,
    };

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &file)?;
    writer.flush()?;
    tracing::info!(path = %path.display(), docs = file.doc_count, "index saved");
    Ok(())
}

/// Load and validate a saved index. Any structural problem is
/// `IndexCorrupt` and nothing is loaded.
pub fn load(path: &Path) -> Result<InvertedIndex> {
    let reader = BufReader::new(File::open(path)?);
    let file: IndexFile = serde_json::from_reader(reader)
        .map_err(|e| Error::IndexCorrupt(format!("malformed index file: {e}")))?;

    if file.version != FORMAT_VERSION {
        return Err(Error::IndexCorrupt(format!(
            "unsupported index version {} (expected {FORMAT_VERSION})",
            file.version
        )));
    }
    if file.rules_version != RULES_VERSION {
        return Err(Error::IndexCorrupt(format!(
            "index built with tokenizer rules v{}, this build uses v{RULES_VERSION}",
            file.rules_version
        )));
    }
    if file.doc_count != file.documents.len() {
        return Err(Error::IndexCorrupt(format!(
            "doc_count {} does not match {} stored documents",
            file.doc_count,
            file.documents.len()
        )));
    }

    let mut docs: HashMap<DocId, Document> = HashMap::with_capacity(file.documents.len());
    for (id, doc) in file.documents {
        if doc.doc_id != id {
            return Err(Error::IndexCorrupt(format!(
                "document stored under id {id} carries doc_id {}",
                doc.doc_id
            )));
        }
        docs.insert(id, doc);
    }

    let mut postings: HashMap<String, Vec<Posting>> = HashMap::with_capacity(file.index.len());
    let mut doc_freq: HashMap<String, u32> = HashMap::with_capacity(file.index.len());
    for (term, by_doc) in file.index {
        // BTreeMap iteration keeps each postings list sorted by doc_id.
        let list: Vec<Posting> = by_doc
            .into_iter()
            .map(|(doc_id, positions)| Posting { doc_id, positions })
            .collect();
        doc_freq.insert(term.clone(), list.len() as u32);
        postings.insert(term, list);
    }

    let index = InvertedIndex { postings, doc_freq, docs };
    index.validate()?;
    tracing::info!(
        path = %path.display(),
        created_at = %file.created_at,
        docs = index.doc_count(),
        terms = index.term_count(),
        "index loaded"
    );
    Ok(index)
}
