//! Error taxonomy for extraction, indexing, and retrieval.
//!
//! Library functions return `anyhow::Result` like the rest of the crate; the
//! failures callers need to tell apart are raised as [`IndexError`] values so
//! they can be recovered with `err.downcast_ref::<IndexError>()`.

use std::path::PathBuf;

/// Classified failures of the structurer, index builder, and retriever.
///
/// # Examples
///
/// ```
/// use statute_index::error::IndexError;
///
/// let err = IndexError::Configuration("index.collection is not set".into());
/// assert_eq!(err.to_string(), "configuration error: index.collection is not set");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The source document could not be read or decoded to text.
    #[error("extraction failed for {}: {message}", .path.display())]
    Extraction { path: PathBuf, message: String },

    /// Addressing or embedding settings are missing, invalid, or disagree
    /// with what the collection was built with.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No collection with this name has been built at this location.
    #[error("collection '{collection}' not found at {}", .location.display())]
    IndexNotFound {
        collection: String,
        location: PathBuf,
    },

    /// The embedding backend failed or returned an unusable response.
    #[error("{backend} backend error: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    /// The query itself is unusable (e.g. `k == 0`).
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The intermediate corpus file is unreadable or malformed.
    #[error("corpus file error: {0}")]
    Corpus(String),

    /// The collection exists but holds no entry with this section number.
    #[error("section {0} not found")]
    SectionNotFound(u32),
}

impl IndexError {
    pub fn backend(backend: &'static str, message: impl Into<String>) -> Self {
        IndexError::Backend {
            backend,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_shows_collection_and_location() {
        let err = IndexError::IndexNotFound {
            collection: "slpc".into(),
            location: PathBuf::from("/tmp/index"),
        };
        let msg = err.to_string();
        assert!(msg.contains("'slpc'"));
        assert!(msg.contains("/tmp/index"));
    }

    #[test]
    fn downcast_through_anyhow() {
        let err: anyhow::Error = IndexError::backend("ollama", "connection refused").into();
        match err.downcast_ref::<IndexError>() {
            Some(IndexError::Backend { backend, message }) => {
                assert_eq!(*backend, "ollama");
                assert_eq!(message, "connection refused");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
