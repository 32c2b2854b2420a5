//! Feature-hashing embedder.
//!
//! Each lowercase alphanumeric token is hashed with FNV-1a into one of
//! `dims` buckets; the bag-of-words counts are L2-normalized. No model, no
//! network, and identical output on every platform, which makes it the
//! provider for offline use and tests. It only captures lexical overlap.

use anyhow::Result;
use async_trait::async_trait;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub const DEFAULT_HASH_DIMS: usize = 384;
pub const HASH_MODEL_NAME: &str = "fnv1a-bow";

pub struct HashProvider {
    dims: usize,
}

impl HashProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(config.dims.unwrap_or(DEFAULT_HASH_DIMS))
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for token in tokenize(text) {
            let bucket = (fnv1a(token.as_bytes()) % self.dims as u64) as usize;
            v[bucket] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashProvider {
    fn provider_name(&self) -> &str {
        "hash"
    }
    fn model_name(&self) -> &str {
        HASH_MODEL_NAME
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
