use indexmap::IndexMap;
use parking_lot::RwLock;
use rand::Rng;
use std::{collections::hash_map::RandomState, hash::BuildHasher, sync::Arc};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CachePolicy {
    /// Nothing is cached
    Empty,
    /// Caches up to the given number of items, evicting a random entry when full
    Count(usize),
}

impl CachePolicy {
    fn max_size(self) -> usize {
        match self {
            CachePolicy::Empty => 0,
            CachePolicy::Count(size) => size,
        }
    }
}

#[derive(Clone)]
pub struct Cache<TKey, TData, S = RandomState>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync,
{
    // IndexMap makes removing a random element cheap
    map: Arc<RwLock<IndexMap<TKey, TData, S>>>,
    max_size: usize,
}

impl<TKey, TData, S> Cache<TKey, TData, S>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync,
    S: BuildHasher + Default,
{
    pub fn new(policy: CachePolicy) -> Self {
        let max_size = policy.max_size();
        // `size + 1` so that an insert into a full cache does not realloc
        Self { map: Arc::new(RwLock::new(IndexMap::with_capacity_and_hasher(max_size + 1, S::default()))), max_size }
    }

    pub fn get(&self, key: &TKey) -> Option<TData> {
        self.map.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &TKey) -> bool {
        self.map.read().contains_key(key)
    }

    fn insert_impl(&self, map: &mut IndexMap<TKey, TData, S>, key: TKey, data: TData) {
        if map.len() == self.max_size && !map.contains_key(&key) {
            map.swap_remove_index(rand::thread_rng().gen_range(0..self.max_size));
        }
        map.insert(key, data);
    }

    pub fn insert(&self, key: TKey, data: TData) {
        if self.max_size == 0 {
            return;
        }
        let mut write_guard = self.map.write();
        self.insert_impl(&mut write_guard, key, data);
    }

    pub fn insert_many(&self, iter: &mut impl Iterator<Item = (TKey, TData)>) {
        if self.max_size == 0 {
            return;
        }
        let mut write_guard = self.map.write();
        for (key, data) in iter {
            self.insert_impl(&mut write_guard, key, data);
        }
    }

    pub fn remove(&self, key: &TKey) -> Option<TData> {
        if self.max_size == 0 {
            return None;
        }
        self.map.write().swap_remove(key)
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
