//! SQLite-backed [`IndexStore`] implementation.
//!
//! Collections share one database file; every row in `entries` carries the
//! name of its collection. Vectors are stored as little-endian `f32` BLOBs
//! and scored in process by brute-force cosine similarity.
//!
//! A database opened read-only by the retriever may predate the schema (or
//! be some unrelated SQLite file). Missing tables read as "no collections"
//! rather than as SQL errors.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{CollectionInfo, IndexEntry, SectionMetadata};
use crate::store::{rank_candidates, EntryCandidate, IndexStore};

pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    async fn has_schema(&self) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('collections', 'entries')",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count == 2)
    }
}

fn info_from_row(row: &SqliteRow) -> CollectionInfo {
    let dims: i64 = row.get("dims");
    CollectionInfo {
        name: row.get("name"),
        provider: row.get("provider"),
        model: row.get("model"),
        dims: dims as usize,
        entry_count: row.get("entry_count"),
        corpus_hash: row.get("corpus_hash"),
        built_at: row.get("built_at"),
    }
}

fn candidate_from_row(row: &SqliteRow, raw_score: f64) -> EntryCandidate {
    let section_number: i64 = row.get("section_number");
    EntryCandidate {
        position: row.get("position"),
        metadata: SectionMetadata {
            chapter: row.get("chapter"),
            chapter_title: row.get("chapter_title"),
            section_number: section_number as u32,
            section_title: row.get("section_title"),
        },
        content: row.get("content"),
        raw_score,
    }
}

#[async_trait]
impl IndexStore for SqliteIndex {
    async fn replace_collection(
        &self,
        info: &CollectionInfo,
        entries: &[IndexEntry],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM entries WHERE collection = ?")
            .bind(&info.name)
            .execute(&mut *tx)
            .await?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO entries (id, collection, position, chapter, chapter_title,
                                     section_number, section_title, content,
                                     content_hash, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&entry.id)
            .bind(&info.name)
            .bind(entry.position)
            .bind(&entry.metadata.chapter)
            .bind(&entry.metadata.chapter_title)
            .bind(entry.metadata.section_number as i64)
            .bind(&entry.metadata.section_title)
            .bind(&entry.content)
            .bind(&entry.content_hash)
            .bind(vec_to_blob(&entry.embedding))
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO collections (name, provider, model, dims, entry_count, corpus_hash, built_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                provider = excluded.provider,
                model = excluded.model,
                dims = excluded.dims,
                entry_count = excluded.entry_count,
                corpus_hash = excluded.corpus_hash,
                built_at = excluded.built_at
            "#,
        )
        .bind(&info.name)
        .bind(&info.provider)
        .bind(&info.model)
        .bind(info.dims as i64)
        .bind(info.entry_count)
        .bind(&info.corpus_hash)
        .bind(info.built_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>> {
        if !self.has_schema().await? {
            return Ok(None);
        }
        let row = sqlx::query(
            "SELECT name, provider, model, dims, entry_count, corpus_hash, built_at FROM collections WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(info_from_row))
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        if !self.has_schema().await? {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "SELECT name, provider, model, dims, entry_count, corpus_hash, built_at FROM collections ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(info_from_row).collect())
    }

    async fn nearest(
        &self,
        name: &str,
        query_vec: &[f32],
        k: usize,
    ) -> Result<Vec<EntryCandidate>> {
        if !self.has_schema().await? {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT position, chapter, chapter_title, section_number, section_title,
                   content, embedding
            FROM entries
            WHERE collection = ?
            "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        let mut candidates: Vec<EntryCandidate> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let similarity = cosine_similarity(query_vec, &blob_to_vec(&blob)) as f64;
                candidate_from_row(row, similarity)
            })
            .collect();

        rank_candidates(&mut candidates, k);
        Ok(candidates)
    }

    async fn entries_by_section(&self, name: &str, number: u32) -> Result<Vec<EntryCandidate>> {
        if !self.has_schema().await? {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT position, chapter, chapter_title, section_number, section_title, content
            FROM entries
            WHERE collection = ? AND section_number = ?
            ORDER BY position ASC
            "#,
        )
        .bind(name)
        .bind(number as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| candidate_from_row(row, 1.0)).collect())
    }
}
