use std::{num::NonZeroUsize, sync::Arc};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::trace;

use crate::Accelerator;

/// Default maximum number of cached accelerators.
const DEFAULT_CAPACITY: usize = 128;

/// Thread-safe, size-bounded memo of parsed accelerators.
///
/// Failed parses are cached too, so a malformed accelerator delivered on every
/// key press is only examined once.
pub struct AcceleratorCache {
    /// Accelerator text → parse result.
    map: Mutex<LruCache<String, Option<Arc<Accelerator>>>>,
}

impl Default for AcceleratorCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl AcceleratorCache {
    /// Create a new cache with default capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new cache with a specific capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            map: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Get the parsed accelerator for `text`, parsing and caching on miss.
    pub fn get_or_parse(&self, text: &str) -> Option<Arc<Accelerator>> {
        let mut guard = self.map.lock();
        if let Some(found) = guard.get(text) {
            return found.clone();
        }
        let parsed = Accelerator::parse(text).map(Arc::new);
        trace!(accel = %text, ok = parsed.is_some(), "accelerator_parsed");
        guard.put(text.to_string(), parsed.clone());
        parsed
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    /// True when nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.map.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_shares_allocation() {
        let cache = AcceleratorCache::new();
        let a = cache.get_or_parse("ctrl+shift+p").expect("parse");
        let b = cache.get_or_parse("ctrl+shift+p").expect("parse");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failures_are_cached() {
        let cache = AcceleratorCache::new();
        assert!(cache.get_or_parse("").is_none());
        assert!(cache.get_or_parse("").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn capacity_bounds_entries() {
        let cache = AcceleratorCache::with_capacity(2);
        for text in ["a", "b", "c"] {
            let _ = cache.get_or_parse(text);
        }
        assert_eq!(cache.len(), 2);
    }
}
