use annotate::{resolve_with_report, EntityAnnotation, Resolution};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Memoizes resolved segment sequences by content hash of text and entities.
pub struct SegmentCache {
    resolutions: Arc<DashMap<String, Arc<Resolution>>>,
    max_entries: usize,
}

impl SegmentCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            resolutions: Arc::new(DashMap::new()),
            max_entries,
        }
    }

    /// Returns the resolution and whether it came from the cache.
    pub fn resolve(&self, text: &str, entities: &[EntityAnnotation]) -> (Arc<Resolution>, bool) {
        if self.max_entries == 0 {
            return (Arc::new(resolve_with_report(text, entities)), false);
        }

        let key = self.hash_input(text, entities);
        if let Some(hit) = self.resolutions.get(&key) {
            return (Arc::clone(hit.value()), true);
        }

        let resolution = Arc::new(resolve_with_report(text, entities));
        self.insert(key, Arc::clone(&resolution));
        (resolution, false)
    }

    fn insert(&self, key: String, resolution: Arc<Resolution>) {
        if self.resolutions.len() >= self.max_entries {
            // Simple eviction: clear 25% when full
            let to_remove: Vec<_> = self.resolutions.iter()
                .take((self.max_entries / 4).max(1))
                .map(|r| r.key().clone())
                .collect();
            for key in to_remove {
                self.resolutions.remove(&key);
            }
        }
        self.resolutions.insert(key, resolution);
    }

    fn hash_input(&self, text: &str, entities: &[EntityAnnotation]) -> String {
        let mut hasher = Sha256::new();
        hasher.update((text.len() as u64).to_le_bytes());
        hasher.update(text.as_bytes());
        for entity in entities {
            hasher.update(entity.start.to_le_bytes());
            hasher.update(entity.end.to_le_bytes());
            hasher.update((entity.label.len() as u64).to_le_bytes());
            hasher.update(entity.label.as_bytes());
            hasher.update((entity.text.len() as u64).to_le_bytes());
            hasher.update(entity.text.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            resolutions_cached: self.resolutions.len(),
            max_entries: self.max_entries,
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct CacheStats {
    pub resolutions_cached: usize,
    pub max_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities() -> Vec<EntityAnnotation> {
        vec![EntityAnnotation::new("Bob", "PERSON", 0, 3)]
    }

    #[test]
    fn test_hit_on_identical_input() {
        let cache = SegmentCache::new(8);
        let (first, hit) = cache.resolve("Bob runs", &entities());
        assert!(!hit);

        let (second, hit) = cache.resolve("Bob runs", &entities());
        assert!(hit);
        assert_eq!(first, second);
    }

    #[test]
    fn test_entity_order_is_part_of_key() {
        let cache = SegmentCache::new(8);
        let mut swapped = entities();
        swapped.push(EntityAnnotation::new("runs", "VERB", 4, 8));
        cache.resolve("Bob runs", &swapped);
        swapped.reverse();

        let (_, hit) = cache.resolve("Bob runs", &swapped);
        assert!(!hit);
    }

    #[test]
    fn test_eviction_bounds_size() {
        let cache = SegmentCache::new(4);
        for i in 0..20 {
            cache.resolve(&format!("text {}", i), &[]);
        }
        let stats = cache.stats();
        assert!(stats.resolutions_cached <= 4);
        assert_eq!(stats.max_entries, 4);
    }

    #[test]
    fn test_disabled_cache_never_stores() {
        let cache = SegmentCache::new(0);
        cache.resolve("Bob", &entities());
        let (_, hit) = cache.resolve("Bob", &entities());
        assert!(!hit);
        assert_eq!(cache.stats().resolutions_cached, 0);
    }
}
