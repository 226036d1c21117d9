use crate::{
    cache::CachePolicy,
    db::DB,
    errors::{StoreError, StoreResult},
};

use super::prelude::{Cache, DbKey, DbWriter};
use serde::{Serialize, de::DeserializeOwned};
use sopnet_utils::mem_size::MemSizeEstimator;
use std::{collections::hash_map::RandomState, hash::BuildHasher, sync::Arc};

/// A concurrent DB store access with typed caching.
#[derive(Clone)]
pub struct CachedDbAccess<TKey, TData, S = RandomState>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync + MemSizeEstimator,
{
    db: Arc<DB>,

    // Cache
    cache: Cache<TKey, TData, S>,

    // DB bucket/path
    prefix: Vec<u8>,
}

impl<TKey, TData, S> CachedDbAccess<TKey, TData, S>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync + AsRef<[u8]>,
    TData: Clone + Send + Sync + MemSizeEstimator,
    S: BuildHasher + Default,
{
    pub fn new(db: Arc<DB>, cache_policy: CachePolicy, prefix: Vec<u8>) -> Self {
        Self { db, cache: Cache::new(cache_policy), prefix }
    }

    pub fn has(&self, key: TKey) -> StoreResult<bool> {
        Ok(self.cache.contains_key(&key) || self.db.get_pinned(DbKey::new(&self.prefix, key))?.is_some())
    }

    pub fn read(&self, key: TKey) -> StoreResult<TData>
    where
        TData: DeserializeOwned, // We need `DeserializeOwned` since the slice coming from `db.get_pinned` has short lifetime
    {
        if let Some(data) = self.cache.get(&key) {
            Ok(data)
        } else {
            let db_key = DbKey::new(&self.prefix, key.clone());
            if let Some(slice) = self.db.get_pinned(&db_key)? {
                let data: TData = bincode::deserialize(&slice)?;
                self.cache.insert(key, data.clone());
                Ok(data)
            } else {
                Err(StoreError::KeyNotFound(db_key))
            }
        }
    }

    /// Writes the entry. A direct write is cached once the DB accepted it, a batched write is left to be cached
    /// by a later read, so a batch that never commits leaves no trace.
    pub fn write<W: DbWriter>(&self, mut writer: W, key: TKey, data: TData) -> StoreResult<()>
    where
        TData: Serialize,
    {
        let bin_data = bincode::serialize(&data)?;
        writer.put(DbKey::new(&self.prefix, key.clone()), bin_data)?;
        if !W::IS_BATCH {
            self.cache.insert(key, data);
        }
        Ok(())
    }

    /// Writes the entry only if the key is absent. Returns whether a write took place.
    ///
    /// Used for content-addressed buckets where an existing entry is by definition identical to the new one.
    pub fn write_if_absent<W: DbWriter>(&self, writer: W, key: TKey, data: TData) -> StoreResult<bool>
    where
        TData: Serialize,
    {
        if self.has(key.clone())? {
            return Ok(false);
        }
        self.write(writer, key, data)?;
        Ok(true)
    }

    pub fn write_many<W: DbWriter>(&self, mut writer: W, iter: &mut (impl Iterator<Item = (TKey, TData)> + Clone)) -> StoreResult<()>
    where
        TData: Serialize,
    {
        let iter_clone = iter.clone();
        for (key, data) in iter_clone {
            let bin_data = bincode::serialize(&data)?;
            writer.put(DbKey::new(&self.prefix, key), bin_data)?;
        }
        if !W::IS_BATCH {
            self.cache.insert_many(iter);
        }
        Ok(())
    }
}
