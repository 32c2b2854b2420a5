//! In-memory [`IndexStore`] implementation for tests and embedding in other
//! processes.
//!
//! Collections live in a `HashMap` behind `std::sync::RwLock`. Search is
//! brute-force cosine similarity over the collection's vectors.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{CollectionInfo, IndexEntry};

use super::{rank_candidates, EntryCandidate, IndexStore};

struct StoredCollection {
    info: CollectionInfo,
    entries: Vec<IndexEntry>,
}

pub struct InMemoryIndex {
    collections: RwLock<HashMap<String, StoredCollection>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory index lock poisoned")
}

fn to_candidate(entry: &IndexEntry, raw_score: f64) -> EntryCandidate {
    EntryCandidate {
        position: entry.position,
        metadata: entry.metadata.clone(),
        content: entry.content.clone(),
        raw_score,
    }
}

#[async_trait]
impl IndexStore for InMemoryIndex {
    async fn replace_collection(
        &self,
        info: &CollectionInfo,
        entries: &[IndexEntry],
    ) -> Result<()> {
        let mut entries = entries.to_vec();
        entries.sort_by_key(|e| e.position);
        let mut collections = self.collections.write().map_err(poisoned)?;
        collections.insert(
            info.name.clone(),
            StoredCollection {
                info: info.clone(),
                entries,
            },
        );
        Ok(())
    }

    async fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections.get(name).map(|c| c.info.clone()))
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let collections = self.collections.read().map_err(poisoned)?;
        let mut infos: Vec<CollectionInfo> = collections.values().map(|c| c.info.clone()).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }

    async fn nearest(
        &self,
        name: &str,
        query_vec: &[f32],
        k: usize,
    ) -> Result<Vec<EntryCandidate>> {
        let collections = self.collections.read().map_err(poisoned)?;
        let Some(stored) = collections.get(name) else {
            return Ok(Vec::new());
        };
        let mut candidates: Vec<EntryCandidate> = stored
            .entries
            .iter()
            .map(|e| to_candidate(e, cosine_similarity(query_vec, &e.embedding) as f64))
            .collect();
        rank_candidates(&mut candidates, k);
        Ok(candidates)
    }

    async fn entries_by_section(&self, name: &str, number: u32) -> Result<Vec<EntryCandidate>> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections
            .get(name)
            .map(|c| {
                c.entries
                    .iter()
                    .filter(|e| e.metadata.section_number == number)
                    .map(|e| to_candidate(e, 1.0))
                    .collect()
            })
            .unwrap_or_default())
    }
}
