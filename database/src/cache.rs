use indexmap::IndexMap;
use parking_lot::RwLock;
use rand::Rng;
use sopnet_utils::mem_size::{MemMode, MemSizeEstimator};
use std::{collections::hash_map::RandomState, hash::BuildHasher, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// No caching
    Empty,
    /// Holds at most this many entries
    Count(usize),
    /// Holds entries while their estimated total size, in the given mode, stays under the bound
    Tracked { max_size: usize, mem_mode: MemMode },
}

impl CachePolicy {
    fn capacity_hint(&self) -> usize {
        match *self {
            CachePolicy::Empty => 0,
            // Use `size + 1` for not triggering a realloc if a new element exactly overflows capacity
            CachePolicy::Count(max_size) => max_size + 1,
            CachePolicy::Tracked { .. } => 0,
        }
    }
}

struct Inner<TKey, TData, S = RandomState> {
    // IndexMap makes removing a random element cheap when the cache is full
    map: IndexMap<TKey, TData, S>,
    tracked_size: usize,
}

/// A concurrent cache with random eviction
#[derive(Clone)]
pub struct Cache<TKey, TData, S = RandomState>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync + MemSizeEstimator,
{
    inner: Arc<RwLock<Inner<TKey, TData, S>>>,
    policy: CachePolicy,
}

impl<TKey, TData, S> Cache<TKey, TData, S>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync + MemSizeEstimator,
    S: BuildHasher + Default,
{
    pub fn new(policy: CachePolicy) -> Self {
        let map = IndexMap::with_capacity_and_hasher(policy.capacity_hint(), S::default());
        Self { inner: Arc::new(RwLock::new(Inner { map, tracked_size: 0 })), policy }
    }

    pub fn get(&self, key: &TKey) -> Option<TData> {
        self.inner.read().map.get(key).cloned()
    }

    pub fn contains_key(&self, key: &TKey) -> bool {
        self.inner.read().map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_impl(&self, inner: &mut Inner<TKey, TData, S>, key: TKey, data: TData) {
        match self.policy {
            CachePolicy::Empty => {}
            CachePolicy::Count(0) => {}
            CachePolicy::Count(max_size) => {
                if inner.map.len() >= max_size && !inner.map.contains_key(&key) {
                    inner.map.swap_remove_index(rand::thread_rng().gen_range(0..inner.map.len()));
                }
                inner.map.insert(key, data);
            }
            CachePolicy::Tracked { max_size, mem_mode } => {
                inner.tracked_size += data.estimate_size(mem_mode);
                if let Some(removed) = inner.map.insert(key, data) {
                    inner.tracked_size = inner.tracked_size.saturating_sub(removed.estimate_size(mem_mode));
                }
                while inner.tracked_size > max_size && !inner.map.is_empty() {
                    if let Some((_, v)) = inner.map.swap_remove_index(rand::thread_rng().gen_range(0..inner.map.len())) {
                        inner.tracked_size = inner.tracked_size.saturating_sub(v.estimate_size(mem_mode));
                    }
                }
            }
        }
    }

    pub fn insert(&self, key: TKey, data: TData) {
        if self.policy == CachePolicy::Empty {
            return;
        }
        let mut write_guard = self.inner.write();
        self.insert_impl(&mut write_guard, key, data);
    }

    pub fn insert_many(&self, iter: &mut impl Iterator<Item = (TKey, TData)>) {
        if self.policy == CachePolicy::Empty {
            return;
        }
        let mut write_guard = self.inner.write();
        for (key, data) in iter {
            self.insert_impl(&mut write_guard, key, data);
        }
    }
}
