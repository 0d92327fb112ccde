//! Small bounded read-through cache used by repository decorators.
//!
//! Repositories wrap expensive or heavily repeated cloud API lookups (for
//! example bucket-location queries that are needed once per bucket but asked
//! for by several enumerators) in a [`Cache`]. Eviction is FIFO on insertion
//! order; the cache is safe to share across tasks.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

struct CacheInner<V> {
    entries: HashMap<String, V>,
    order: VecDeque<String>,
}

/// A bounded key/value cache.
pub struct Cache<V> {
    capacity: usize,
    inner: Mutex<CacheInner<V>>,
}

impl<V: Clone> Cache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.get(key).cloned()
    }

    pub fn put(&self, key: impl Into<String>, value: V) {
        if self.capacity == 0 {
            return;
        }
        let key = key.into();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.entries.insert(key.clone(), value).is_none() {
            inner.order.push_back(key);
            if inner.order.len() > self.capacity {
                if let Some(evicted) = inner.order.pop_front() {
                    inner.entries.remove(&evicted);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
