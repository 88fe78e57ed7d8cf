//! Keyword corpus: loading and matching.
//!
//! The knowledge base is a directory of `*.json` files, each holding at
//! least a string `content` field. It is loaded once at startup and never
//! changes afterwards.
//!
//! Matching is deliberately naive: a document is related to a query when any
//! whitespace-delimited query token occurs, case-insensitively, as a
//! substring of the document content. There is no ranking and no size limit.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::models::KnowledgeDocument;

#[derive(Deserialize)]
struct DocumentRecord {
    content: String,
}

/// In-memory mapping of file name to document, iterated in file-name order.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    docs: BTreeMap<String, KnowledgeDocument>,
}

impl KnowledgeBase {
    pub fn from_documents(docs: impl IntoIterator<Item = KnowledgeDocument>) -> Self {
        Self {
            docs: docs
                .into_iter()
                .map(|d| (d.identifier.clone(), d))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get(&self, identifier: &str) -> Option<&KnowledgeDocument> {
        self.docs.get(identifier)
    }

    pub fn documents(&self) -> impl Iterator<Item = &KnowledgeDocument> {
        self.docs.values()
    }
}

/// Load every `*.json` file directly under `dir`.
///
/// Fails on the first file that cannot be read, is not valid JSON, or has
/// no string `content` field.
pub fn load_knowledge_base(dir: &Path) -> Result<KnowledgeBase> {
    if !dir.is_dir() {
        bail!("Knowledge directory does not exist: {}", dir.display());
    }

    let mut docs = Vec::new();

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list knowledge directory: {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().to_string();
        if !file_name.ends_with(".json") {
            continue;
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read knowledge file: {}", path.display()))?;
        let record: DocumentRecord = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid knowledge document: {}", path.display()))?;

        docs.push(KnowledgeDocument {
            identifier: file_name,
            content: record.content,
        });
    }

    Ok(KnowledgeBase::from_documents(docs))
}

/// Concatenate (with `"\n"`) the content of every document that shares at
/// least one query token as a case-insensitive substring.
pub fn find_relevant_content(query: &str, kb: &KnowledgeBase) -> String {
    let keywords: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    if keywords.is_empty() {
        return String::new();
    }

    let mut related = Vec::new();
    for doc in kb.documents() {
        let haystack = doc.content.to_lowercase();
        if keywords.iter().any(|k| haystack.contains(k.as_str())) {
            related.push(doc.content.as_str());
        }
    }

    related.join("\n")
}
