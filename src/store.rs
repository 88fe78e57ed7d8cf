//! On-disk vector store for ingested documentation.
//!
//! A single SQLite file holding one row per chunk with its text, content
//! hash, and embedding (little-endian `f32` BLOB). Writes are append-only:
//! ingesting the same file twice stores its chunks twice.

use anyhow::{bail, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::models::Chunk;

/// A chunk read back from the store.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub id: String,
    pub source_path: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
    pub model: String,
    pub embedding: Vec<f32>,
}

pub async fn connect(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Create the schema if it does not exist yet. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            source_path TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            hash TEXT NOT NULL,
            model TEXT NOT NULL,
            dims INTEGER NOT NULL,
            embedding BLOB NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source_path ON chunks(source_path)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Append `chunks` with their `vectors` in one transaction.
pub async fn add_chunks(
    pool: &SqlitePool,
    chunks: &[Chunk],
    vectors: &[Vec<f32>],
    model: &str,
) -> Result<u64> {
    if chunks.len() != vectors.len() {
        bail!(
            "chunk/vector count mismatch: {} chunks, {} vectors",
            chunks.len(),
            vectors.len()
        );
    }

    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    for (chunk, vector) in chunks.iter().zip(vectors) {
        sqlx::query(
            r#"
            INSERT INTO chunks (id, source_path, chunk_index, text, hash, model, dims, embedding, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.source_path)
        .bind(chunk.chunk_index)
        .bind(&chunk.text)
        .bind(&chunk.hash)
        .bind(model)
        .bind(vector.len() as i64)
        .bind(vec_to_blob(vector))
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(chunks.len() as u64)
}

pub async fn count_chunks(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// All stored chunks ordered by source path, then chunk index.
pub async fn load_chunks(pool: &SqlitePool) -> Result<Vec<StoredChunk>> {
    let rows = sqlx::query(
        r#"
        SELECT id, source_path, chunk_index, text, hash, model, embedding
        FROM chunks
        ORDER BY source_path, chunk_index, created_at
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| {
            let blob: Vec<u8> = row.get("embedding");
            StoredChunk {
                id: row.get("id"),
                source_path: row.get("source_path"),
                chunk_index: row.get("chunk_index"),
                text: row.get("text"),
                hash: row.get("hash"),
                model: row.get("model"),
                embedding: blob_to_vec(&blob),
            }
        })
        .collect())
}
