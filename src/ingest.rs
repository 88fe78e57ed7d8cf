//! Offline documentation ingestion.
//!
//! One sequential pass: scan Markdown files → split by headings → embed →
//! append to the vector store. Any error aborts the run; chunks from files
//! processed before the failure stay in the store.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::embedding::OpenAIEmbedder;
use crate::markdown::split_by_headers;
use crate::models::Chunk;
use crate::store;

/// A Markdown file found under the docs directory.
#[derive(Debug, Clone)]
pub struct MarkdownFile {
    pub path: PathBuf,
    /// Path relative to the docs directory, `/`-separated.
    pub relative_path: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub files: u64,
    pub chunks: u64,
    pub store_total: i64,
}

/// Find every file under `root` matching `include_globs`, sorted by
/// relative path.
pub fn scan_markdown(root: &Path, include_globs: &[String]) -> Result<Vec<MarkdownFile>> {
    if !root.is_dir() {
        bail!("Docs directory does not exist: {}", root.display());
    }

    let include_set = build_globset(include_globs)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(MarkdownFile {
            path: path.to_path_buf(),
            relative_path: rel_str,
        });
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}

/// Read and split every file into heading sections.
pub fn split_files(files: &[MarkdownFile]) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();
    for file in files {
        let text = std::fs::read_to_string(&file.path)
            .with_context(|| format!("Failed to read {}", file.path.display()))?;
        chunks.extend(split_by_headers(&file.relative_path, &text));
    }
    Ok(chunks)
}

pub async fn run_ingest(config: &Config) -> Result<IngestReport> {
    let files = scan_markdown(&config.ingest.docs_dir, &config.ingest.include_globs)?;
    let chunks = split_files(&files)?;
    tracing::info!(files = files.len(), chunks = chunks.len(), "split markdown");

    let embedder = OpenAIEmbedder::new(&config.embedding)?;
    let pool = store::connect(&config.ingest.store_path).await?;
    store::run_migrations(&pool).await?;

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed_texts(&texts).await?;
    let written = store::add_chunks(&pool, &chunks, &vectors, embedder.model_name()).await?;
    let store_total = store::count_chunks(&pool).await?;

    pool.close().await;

    let report = IngestReport {
        files: files.len() as u64,
        chunks: written,
        store_total,
    };
    tracing::info!(
        chunks = report.chunks,
        store_total = report.store_total,
        store = %config.ingest.store_path.display(),
        "ingest complete"
    );
    Ok(report)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
