//! # Statute Index
//!
//! Turns a penal code (PDF or plain text) into a corpus of individually
//! addressable sections, builds a persistent semantic index over them, and
//! answers free-text questions with the most relevant sections.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │ Source doc   │──▶│  Structurer  │──▶│ Corpus JSON  │──▶│  Build   │
//! │ PDF / text   │   │ chapter+sect │   │ SectionRecord│   │ embed    │
//! └──────────────┘   └──────────────┘   └──────────────┘   └────┬─────┘
//!                                                               ▼
//!                                  ┌──────────┐           ┌──────────┐
//!                                  │ CLI/HTTP │◀──────────│  SQLite  │
//!                                  │ Retriever│           │  index   │
//!                                  └──────────┘           └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! statute extract ./penal_code.pdf --out ./data/slpc.json
//! statute build --corpus ./data/slpc.json
//! statute query "punishment for theft" -k 3
//! statute serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`extract`] | Source document to plain text |
//! | [`structure`] | Line classifier and section parser |
//! | [`corpus`] | Corpus JSON file |
//! | [`models`] | Core data types |
//! | [`config`] | TOML configuration and environment overrides |
//! | [`error`] | Error taxonomy |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Storage trait and in-memory backend |
//! | [`sqlite_store`] | SQLite backend |
//! | [`build`] | Collection building |
//! | [`search`] | Retrieval |
//! | [`traits`] | Tool trait and registry |
//! | [`server`] | HTTP tool server |
//! | [`progress`] | Build progress reporting |
//! | [`stats`] | Index statistics |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod build;
pub mod config;
pub mod corpus;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod search;
pub mod server;
pub mod sqlite_store;
pub mod stats;
pub mod store;
pub mod structure;
pub mod traits;
