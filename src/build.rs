//! Collection building: corpus records → embedded, persisted collection.
//!
//! A build is a full replace. Every section is turned into a document
//! (display text plus metadata), all documents are embedded in batches, and
//! only then is the collection swapped in through
//! [`IndexStore::replace_collection`]. A failure at any point before the
//! swap leaves the previously built collection untouched.

use std::path::{Path, PathBuf};

use anyhow::Result;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::Config;
use crate::corpus;
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::IndexError;
use crate::migrate;
use crate::models::{CollectionInfo, IndexEntry, SectionMetadata, SectionRecord};
use crate::progress::{BuildProgressEvent, BuildProgressReporter, ProgressMode};
use crate::sqlite_store::SqliteIndex;
use crate::store::IndexStore;

/// One section ready to be embedded.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    pub position: i64,
    pub text: String,
    pub metadata: SectionMetadata,
    pub content_hash: String,
}

/// Summary of a finished build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub collection: CollectionInfo,
    pub embedded: usize,
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Turn records into documents in corpus order.
pub fn prepare_documents(records: &[SectionRecord]) -> Vec<PreparedDocument> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let text = r.display_text();
            PreparedDocument {
                position: i as i64,
                content_hash: sha256_hex(&text),
                text,
                metadata: r.metadata(),
            }
        })
        .collect()
}

/// Hash over every display text in order; identical corpora give identical
/// hashes.
pub fn corpus_hash(docs: &[PreparedDocument]) -> String {
    let mut hasher = Sha256::new();
    for doc in docs {
        hasher.update(doc.text.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Embed `records` and replace the collection `name` in `store` with them.
pub async fn build_collection(
    store: &dyn IndexStore,
    provider: &dyn EmbeddingProvider,
    name: &str,
    records: &[SectionRecord],
    batch_size: usize,
    reporter: &dyn BuildProgressReporter,
) -> Result<BuildReport> {
    if name.trim().is_empty() {
        return Err(IndexError::Configuration("collection name is empty".into()).into());
    }
    let batch_size = batch_size.max(1);

    let docs = prepare_documents(records);
    let total = docs.len() as u64;
    reporter.report(BuildProgressEvent::Preparing {
        collection: name.to_string(),
        total,
    });

    let mut entries: Vec<IndexEntry> = Vec::with_capacity(docs.len());
    for batch in docs.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
        let vectors = embedding::embed_texts(provider, &texts).await?;
        for (doc, vector) in batch.iter().zip(vectors) {
            entries.push(IndexEntry {
                id: Uuid::new_v4().to_string(),
                position: doc.position,
                metadata: doc.metadata.clone(),
                content: doc.text.clone(),
                content_hash: doc.content_hash.clone(),
                embedding: vector,
            });
        }
        reporter.report(BuildProgressEvent::Embedding {
            collection: name.to_string(),
            n: entries.len() as u64,
            total,
        });
    }

    let info = CollectionInfo {
        name: name.to_string(),
        provider: provider.provider_name().to_string(),
        model: provider.model_name().to_string(),
        dims: provider.dims(),
        entry_count: entries.len() as i64,
        corpus_hash: corpus_hash(&docs),
        built_at: chrono::Utc::now().timestamp(),
    };

    reporter.report(BuildProgressEvent::Writing {
        collection: name.to_string(),
        total: entries.len() as u64,
    });
    store.replace_collection(&info, &entries).await?;

    Ok(BuildReport {
        collection: info,
        embedded: entries.len(),
    })
}

/// Resolve the corpus file: the explicit override, else `corpus.path`.
pub fn corpus_path(config: &Config, override_path: Option<&Path>) -> Result<PathBuf> {
    override_path
        .map(Path::to_path_buf)
        .or_else(|| config.corpus.path.clone())
        .ok_or_else(|| {
            IndexError::Configuration(
                "no corpus file given (pass --corpus or set corpus.path / STATUTE_CORPUS_PATH)"
                    .into(),
            )
            .into()
        })
}

/// `statute build`: load the corpus file and rebuild the configured
/// collection in the SQLite index.
pub async fn run_build(
    config: &Config,
    corpus_override: Option<&Path>,
    batch_size_override: Option<usize>,
    progress: ProgressMode,
    allow_empty: bool,
) -> Result<()> {
    let address = config.index.address()?;
    let provider = embedding::create_provider(&config.embedding)?;
    let corpus_file = corpus_path(config, corpus_override)?;
    let records = corpus::load_corpus(&corpus_file)?;

    if records.is_empty() && !allow_empty {
        return Err(IndexError::Corpus(format!(
            "{} contains no sections; rerun with --allow-empty to build an empty collection",
            corpus_file.display()
        ))
        .into());
    }

    let pool = db::connect_for_build(&address).await?;
    migrate::run_migrations(&pool).await?;
    let store = SqliteIndex::new(pool);

    let reporter = progress.reporter();
    let batch_size = batch_size_override.unwrap_or(config.embedding.batch_size);
    let result = build_collection(
        &store,
        provider.as_ref(),
        &address.collection,
        &records,
        batch_size,
        reporter.as_ref(),
    )
    .await;
    store.close().await;
    let report = result?;

    println!("build {}", report.collection.name);
    println!("  corpus: {}", corpus_file.display());
    println!("  index: {}", address.db_path().display());
    println!(
        "  embedding: {} / {} ({} dims)",
        report.collection.provider, report.collection.model, report.collection.dims
    );
    println!("  sections: {}", report.embedded);
    println!("ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashProvider;
    use crate::progress::NoProgress;
    use crate::store::memory::InMemoryIndex;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn record(n: u32, title: &str, body: &str) -> SectionRecord {
        SectionRecord {
            chapter: "I".into(),
            chapter_title: "General".into(),
            section_number: n,
            section_title: title.into(),
            section_body: body.into(),
        }
    }

    struct Recorder(Mutex<Vec<BuildProgressEvent>>);

    impl BuildProgressReporter for Recorder {
        fn report(&self, event: BuildProgressEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl EmbeddingProvider for FailingProvider {
        fn provider_name(&self) -> &str {
            "failing"
        }
        fn model_name(&self) -> &str {
            "none"
        }
        fn dims(&self) -> usize {
            4
        }
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(IndexError::backend("failing", "unavailable").into())
        }
    }

    #[test]
    fn documents_use_display_text_and_positions() {
        let docs = prepare_documents(&[
            record(1, "Short title", "This Code may be called the Penal Code."),
            record(2, "Punishment", "Every person liable shall be punished."),
        ]);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].position, 1);
        assert_eq!(
            docs[0].text,
            "Section 1: Short title\n\nThis Code may be called the Penal Code."
        );
        assert_eq!(docs[1].metadata.section_title, "Punishment");
        assert_eq!(docs[0].content_hash.len(), 64);
    }

    #[test]
    fn corpus_hash_depends_on_order() {
        let a = prepare_documents(&[record(1, "A", "a"), record(2, "B", "b")]);
        let b = prepare_documents(&[record(2, "B", "b"), record(1, "A", "a")]);
        assert_eq!(corpus_hash(&a), corpus_hash(&a.clone()));
        assert_ne!(corpus_hash(&a), corpus_hash(&b));
    }

    #[tokio::test]
    async fn build_records_collection_info_and_progress() {
        let store = InMemoryIndex::new();
        let provider = HashProvider::new(64);
        let recorder = Recorder(Mutex::new(Vec::new()));
        let records: Vec<SectionRecord> = (1..=5)
            .map(|n| record(n, &format!("title {}", n), "body text"))
            .collect();

        let report = build_collection(&store, &provider, "slpc", &records, 2, &recorder)
            .await
            .unwrap();
        assert_eq!(report.embedded, 5);
        assert_eq!(report.collection.provider, "hash");
        assert_eq!(report.collection.dims, 64);

        let info = store.collection_info("slpc").await.unwrap().unwrap();
        assert_eq!(info.entry_count, 5);

        let events = recorder.0.lock().unwrap();
        let embedded: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                BuildProgressEvent::Embedding { n, .. } => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(embedded, vec![2, 4, 5]);
        assert!(matches!(events.last(), Some(BuildProgressEvent::Writing { total: 5, .. })));
    }

    #[tokio::test]
    async fn failed_embedding_keeps_previous_collection() {
        let store = InMemoryIndex::new();
        build_collection(
            &store,
            &HashProvider::new(16),
            "slpc",
            &[record(1, "Old", "old body")],
            8,
            &NoProgress,
        )
        .await
        .unwrap();

        let err = build_collection(
            &store,
            &FailingProvider,
            "slpc",
            &[record(2, "New", "new body")],
            8,
            &NoProgress,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::Backend { .. })
        ));

        let hits = store.entries_by_section("slpc", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(store.collection_info("slpc").await.unwrap().unwrap().provider, "hash");
    }

    #[tokio::test]
    async fn empty_name_is_rejected() {
        let store = InMemoryIndex::new();
        let err = build_collection(&store, &HashProvider::new(8), " ", &[], 8, &NoProgress)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::Configuration(_))
        ));
    }

    #[test]
    fn corpus_path_prefers_override() {
        let mut config = Config::default();
        config.corpus.path = Some(PathBuf::from("from-config.json"));
        assert_eq!(
            corpus_path(&config, Some(Path::new("cli.json"))).unwrap(),
            PathBuf::from("cli.json")
        );
        assert_eq!(
            corpus_path(&config, None).unwrap(),
            PathBuf::from("from-config.json")
        );
        assert!(corpus_path(&Config::default(), None).is_err());
    }
}
