//! Semantic retrieval over a built collection.
//!
//! [`search_sections`] is the core operation and works against any
//! [`IndexStore`]. [`Retriever`] binds it to a SQLite index location: every
//! call opens the database read-only, answers, and closes it again, so a
//! retriever never holds the index open between calls and never creates
//! one.
//!
//! Ranking is cosine similarity, descending, with ties broken by the
//! entry's position in the corpus. The same query on an unchanged index
//! always returns the same ordered results.

use anyhow::Result;
use serde::Serialize;

use crate::config::{Config, IndexAddress};
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::IndexError;
use crate::models::{CollectionInfo, SectionHit};
use crate::sqlite_store::SqliteIndex;
use crate::store::{EntryCandidate, IndexStore};

fn to_hit(c: EntryCandidate) -> SectionHit {
    SectionHit {
        section_number: c.metadata.section_number,
        section_title: c.metadata.section_title,
        chapter: c.metadata.chapter,
        chapter_title: c.metadata.chapter_title,
        content: c.content,
        score: c.raw_score,
    }
}

/// Fail unless the collection was built with the same provider, model and
/// dimensionality as the one about to embed the query.
pub fn check_compatibility(info: &CollectionInfo, provider: &dyn EmbeddingProvider) -> Result<()> {
    if info.provider != provider.provider_name()
        || info.model != provider.model_name()
        || info.dims != provider.dims()
    {
        return Err(IndexError::Configuration(format!(
            "collection '{}' was built with {} / {} ({} dims) but the configured embedding is {} / {} ({} dims); rebuild the collection or change [embedding]",
            info.name,
            info.provider,
            info.model,
            info.dims,
            provider.provider_name(),
            provider.model_name(),
            provider.dims()
        ))
        .into());
    }
    Ok(())
}

async fn require_collection(
    store: &dyn IndexStore,
    address: &IndexAddress,
) -> Result<CollectionInfo> {
    store
        .collection_info(&address.collection)
        .await?
        .ok_or_else(|| {
            IndexError::IndexNotFound {
                collection: address.collection.clone(),
                location: address.location.clone(),
            }
            .into()
        })
}

/// Return up to `k` sections most similar to `text`.
///
/// # Errors
///
/// - [`IndexError::InvalidQuery`] when `k == 0`.
/// - [`IndexError::IndexNotFound`] when the collection does not exist.
/// - [`IndexError::Configuration`] when the collection was built with a
///   different embedding setup.
/// - [`IndexError::Backend`] when the query cannot be embedded.
pub async fn search_sections(
    store: &dyn IndexStore,
    provider: &dyn EmbeddingProvider,
    address: &IndexAddress,
    text: &str,
    k: usize,
) -> Result<Vec<SectionHit>> {
    if k == 0 {
        return Err(IndexError::InvalidQuery("k must be at least 1".into()).into());
    }
    let info = require_collection(store, address).await?;
    check_compatibility(&info, provider)?;

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let query_vec = embedding::embed_query(provider, text).await?;
    let candidates = store.nearest(&address.collection, &query_vec, k).await?;
    Ok(candidates.into_iter().map(to_hit).collect())
}

/// Every entry whose section number is `number`, in corpus order.
pub async fn find_section(
    store: &dyn IndexStore,
    address: &IndexAddress,
    number: u32,
) -> Result<Vec<SectionHit>> {
    require_collection(store, address).await?;
    let found = store.entries_by_section(&address.collection, number).await?;
    Ok(found.into_iter().map(to_hit).collect())
}

/// Handle to a persisted collection.
///
/// Holds only the address and the embedding provider; the index itself is
/// opened per call.
pub struct Retriever {
    address: IndexAddress,
    provider: Box<dyn EmbeddingProvider>,
    default_k: usize,
}

impl Retriever {
    pub fn new(address: IndexAddress, provider: Box<dyn EmbeddingProvider>, default_k: usize) -> Self {
        Self {
            address,
            provider,
            default_k,
        }
    }

    /// Resolve the address and provider from configuration. Fails with a
    /// configuration error before touching the filesystem.
    pub fn from_config(config: &Config) -> Result<Self> {
        let address = config.index.address()?;
        let provider = embedding::create_provider(&config.embedding)?;
        Ok(Self::new(address, provider, config.retrieval.top_k))
    }

    pub fn address(&self) -> &IndexAddress {
        &self.address
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    async fn open(&self) -> Result<SqliteIndex> {
        Ok(SqliteIndex::new(db::connect_for_query(&self.address).await?))
    }

    /// Query with an explicit `k`, or the configured default.
    pub async fn search(&self, text: &str, k: Option<usize>) -> Result<Vec<SectionHit>> {
        let k = k.unwrap_or(self.default_k);
        if k == 0 {
            return Err(IndexError::InvalidQuery("k must be at least 1".into()).into());
        }
        let store = self.open().await?;
        let result =
            search_sections(&store, self.provider.as_ref(), &self.address, text, k).await;
        store.close().await;
        result
    }

    pub async fn section(&self, number: u32) -> Result<Vec<SectionHit>> {
        let store = self.open().await?;
        let result = find_section(&store, &self.address, number).await;
        store.close().await;
        result
    }
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    query: &'a str,
    collection: &'a str,
    results: &'a [SectionHit],
}

fn print_hits(hits: &[SectionHit]) {
    for (i, hit) in hits.iter().enumerate() {
        println!(
            "{}. [{:.2}] Section {}: {}",
            i + 1,
            hit.score,
            hit.section_number,
            hit.section_title
        );
        println!("    chapter: {} ({})", hit.chapter, hit.chapter_title);
        let excerpt: String = hit.content.replace('\n', " ").chars().take(240).collect();
        println!("    excerpt: \"{}\"", excerpt.trim());
        println!();
    }
}

/// `statute query`
pub async fn run_search(config: &Config, text: &str, k: Option<usize>, json: bool) -> Result<()> {
    let retriever = Retriever::from_config(config)?;
    let hits = retriever.search(text, k).await?;

    if json {
        let out = QueryOutput {
            query: text,
            collection: &retriever.address().collection,
            results: &hits,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }
    print_hits(&hits);
    Ok(())
}

/// `statute section`
pub async fn run_section(config: &Config, number: u32, json: bool) -> Result<()> {
    let retriever = Retriever::from_config(config)?;
    let hits = retriever.section(number).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("Section {} not found.", number);
        return Ok(());
    }
    for hit in &hits {
        println!("--- Chapter {}: {} ---", hit.chapter, hit.chapter_title);
        println!("{}", hit.content);
        println!();
    }
    Ok(())
}
