//! SQLite connection management for an index location.
//!
//! An index location is a directory holding a single `index.sqlite` file
//! (see [`IndexAddress::db_path`]). There are two ways to open it:
//!
//! - [`connect_for_build`] creates the directory and the database file if
//!   needed and enables WAL so readers are never blocked by a rebuild.
//! - [`connect_for_query`] opens an existing database read-only and never
//!   creates anything; a missing file is reported as
//!   [`IndexError::IndexNotFound`].

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::IndexAddress;
use crate::error::IndexError;

/// Open (creating if missing) the database of an index location for
/// writing.
pub async fn connect_for_build(address: &IndexAddress) -> Result<SqlitePool> {
    std::fs::create_dir_all(&address.location)?;

    let db_path = address.db_path();
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Open the database of an index location read-only.
pub async fn connect_for_query(address: &IndexAddress) -> Result<SqlitePool> {
    let db_path = address.db_path();
    if !db_path.is_file() {
        return Err(IndexError::IndexNotFound {
            collection: address.collection.clone(),
            location: address.location.clone(),
        }
        .into());
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .read_only(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}
