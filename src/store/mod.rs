//! Storage abstraction for section collections.
//!
//! The [`IndexStore`] trait covers everything the builder and the retriever
//! need from persistence, so ranking and lookup logic is shared between the
//! SQLite backend ([`crate::sqlite_store::SqliteIndex`]) and the in-memory
//! one ([`memory::InMemoryIndex`]).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::cmp::Ordering;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{CollectionInfo, IndexEntry, SectionMetadata};

/// A scored entry returned from a nearest-neighbour search.
#[derive(Debug, Clone)]
pub struct EntryCandidate {
    pub position: i64,
    pub metadata: SectionMetadata,
    pub content: String,
    /// Cosine similarity to the query vector.
    pub raw_score: f64,
}

/// Abstract storage backend for section collections.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`replace_collection`](IndexStore::replace_collection) | Atomically swap in a freshly built collection |
/// | [`collection_info`](IndexStore::collection_info) | Bookkeeping for one collection |
/// | [`list_collections`](IndexStore::list_collections) | Bookkeeping for every collection |
/// | [`nearest`](IndexStore::nearest) | Top-k entries by cosine similarity |
/// | [`entries_by_section`](IndexStore::entries_by_section) | Exact lookup by section number |
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Replace the collection named `info.name` with exactly `entries`.
    ///
    /// Readers see either the previous contents or the new ones, never a
    /// mix.
    async fn replace_collection(&self, info: &CollectionInfo, entries: &[IndexEntry])
        -> Result<()>;

    async fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>>;

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>>;

    /// The `k` entries closest to `query_vec`, ordered by
    /// [`rank_candidates`].
    async fn nearest(&self, name: &str, query_vec: &[f32], k: usize)
        -> Result<Vec<EntryCandidate>>;

    /// All entries of a section number, in document order.
    async fn entries_by_section(&self, name: &str, number: u32) -> Result<Vec<EntryCandidate>>;
}

/// Sort by descending score, ties broken by ascending position, and keep
/// the first `k`.
pub fn rank_candidates(candidates: &mut Vec<EntryCandidate>, k: usize) {
    candidates.sort_by(|a, b| {
        b.raw_score
            .partial_cmp(&a.raw_score)
            .unwrap_or(Ordering::Equal)
            .then(a.position.cmp(&b.position))
    });
    candidates.truncate(k);
}
