//! Index statistics.
//!
//! `statute stats` summarizes what has been built at the configured index
//! location: database size and, per collection, how many sections it holds
//! and which embedding setup produced it.

use anyhow::Result;

use crate::config::{Config, IndexAddress};
use crate::db;
use crate::error::IndexError;
use crate::models::CollectionInfo;
use crate::sqlite_store::SqliteIndex;
use crate::store::IndexStore;

/// Collections and database size at an index location.
#[derive(Debug, Clone)]
pub struct IndexStats {
    pub db_size: u64,
    pub collections: Vec<CollectionInfo>,
}

/// Read the stats of the index at `address.location`.
///
/// Returns `Ok(None)` when nothing has been built there yet.
pub async fn collect_stats(address: &IndexAddress) -> Result<Option<IndexStats>> {
    let pool = match db::connect_for_query(address).await {
        Ok(pool) => pool,
        Err(e) => match e.downcast_ref::<IndexError>() {
            Some(IndexError::IndexNotFound { .. }) => return Ok(None),
            _ => return Err(e),
        },
    };
    let store = SqliteIndex::new(pool);
    let collections = store.list_collections().await;
    store.close().await;

    let db_size = std::fs::metadata(address.db_path())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(Some(IndexStats {
        db_size,
        collections: collections?,
    }))
}

pub async fn run_stats(config: &Config) -> Result<()> {
    let location = config.index.location.clone().ok_or_else(|| {
        IndexError::Configuration("index.location is not set (or STATUTE_INDEX_LOCATION)".into())
    })?;
    let address = IndexAddress::new(location, config.index.collection.clone().unwrap_or_default());

    println!("Statute Index: Stats");
    println!("=====================");
    println!();
    println!("  Database:    {}", address.db_path().display());

    let Some(stats) = collect_stats(&address).await? else {
        println!("  (not built yet; run `statute build`)");
        println!();
        return Ok(());
    };

    println!("  Size:        {}", format_bytes(stats.db_size));
    println!("  Collections: {}", stats.collections.len());

    if !stats.collections.is_empty() {
        println!();
        println!(
            "  {:<20} {:>8} {:<28} {:>6}   {:<20}  {}",
            "COLLECTION", "SECTIONS", "EMBEDDING", "DIMS", "BUILT", "CORPUS"
        );
        println!("  {}", "-".repeat(100));
        for c in &stats.collections {
            let marker = if c.name == address.collection { "*" } else { " " };
            println!(
                "{} {:<20} {:>8} {:<28} {:>6}   {:<20}  {}",
                marker,
                c.name,
                c.entry_count,
                format!("{}/{}", c.provider, c.model),
                c.dims,
                format_ts_rfc3339(c.built_at),
                &c.corpus_hash[..c.corpus_hash.len().min(12)]
            );
        }
    }

    println!();
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

fn format_ts_rfc3339(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;

    #[test]
    fn bytes_are_humanized() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn timestamps_are_rfc3339() {
        assert_eq!(format_ts_rfc3339(0), "1970-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn missing_index_has_no_stats() {
        let dir = tempfile::tempdir().unwrap();
        let address = IndexAddress::new(dir.path().join("idx"), "slpc");
        assert!(collect_stats(&address).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lists_built_collections() {
        let dir = tempfile::tempdir().unwrap();
        let address = IndexAddress::new(dir.path(), "slpc");
        let pool = db::connect_for_build(&address).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        let store = SqliteIndex::new(pool);
        let info = CollectionInfo {
            name: "slpc".into(),
            provider: "hash".into(),
            model: "fnv1a-bow".into(),
            dims: 8,
            entry_count: 0,
            corpus_hash: "e3b0c442".into(),
            built_at: 0,
        };
        store.replace_collection(&info, &[]).await.unwrap();
        store.close().await;

        let stats = collect_stats(&address).await.unwrap().unwrap();
        assert_eq!(stats.collections, vec![info]);
    }
}
