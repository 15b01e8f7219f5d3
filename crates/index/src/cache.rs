use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Bounded embedding cache keyed by the SHA-256 of the prefixed input text.
#[derive(Clone)]
pub struct EmbeddingCache {
    embeddings: Arc<DashMap<String, Vec<f32>>>,
    max_entries: usize,
}

impl EmbeddingCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            embeddings: Arc::new(DashMap::new()),
            max_entries,
        }
    }

    pub fn insert(&self, text: &str, embedding: Vec<f32>) {
        if self.max_entries == 0 {
            return;
        }
        if self.embeddings.len() >= self.max_entries {
            self.evict((self.max_entries / 4).max(1));
        }
        self.embeddings.insert(hash_text(text), embedding);
    }

    /// Drop `count` arbitrary entries; DashMap iteration order is unspecified.
    fn evict(&self, count: usize) {
        let victims: Vec<String> = self
            .embeddings
            .iter()
            .take(count)
            .map(|entry| entry.key().clone())
            .collect();
        for key in &victims {
            self.embeddings.remove(key);
        }
        tracing::trace!(evicted = victims.len(), "Embedding cache full");
    }

    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        self.embeddings
            .get(&hash_text(text))
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_eviction() {
        let cache = EmbeddingCache::new(4);
        for i in 0..4 {
            cache.insert(&format!("passage: {i}"), vec![i as f32]);
        }
        assert_eq!(cache.get("passage: 2"), Some(vec![2.0]));
        assert_eq!(cache.get("query: 2"), None);

        cache.insert("passage: 4", vec![4.0]);
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get("passage: 4"), Some(vec![4.0]));
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let cache = EmbeddingCache::new(0);
        cache.insert("x", vec![1.0]);
        assert!(cache.is_empty());
    }
}
