use crate::{
    db::DB,
    errors::{StoreError, StoreResult},
};

use super::prelude::{DbKey, DbWriter};
use rocksdb::{IterateBounds, IteratorMode, ReadOptions};
use serde::{Serialize, de::DeserializeOwned};
use std::{marker::PhantomData, sync::Arc};

/// A concurrent DB store for typed **set** access without caching.
///
/// Each set member is its own rocksdb key nested in the bucket of the set key, so adding members from
/// independent writers never requires a read-modify-write of the whole set.
#[derive(Clone)]
pub struct DbSetAccess<TKey, TData> {
    db: Arc<DB>,

    // DB bucket/path
    prefix: Vec<u8>,

    _phantom: PhantomData<(TKey, TData)>,
}

impl<TKey, TData> DbSetAccess<TKey, TData>
where
    TKey: Clone + Send + Sync + AsRef<[u8]>,
    TData: Clone + Send + Sync + DeserializeOwned + Serialize,
{
    pub fn new(db: Arc<DB>, prefix: Vec<u8>) -> Self {
        Self { db, prefix, _phantom: Default::default() }
    }

    fn get_db_key(&self, key: &TKey, data: &TData) -> StoreResult<DbKey> {
        let bin_data = bincode::serialize(data)?;
        Ok(DbKey::new_with_bucket(&self.prefix, key, bin_data))
    }

    pub fn write_many<'a>(&self, mut writer: impl DbWriter, key: TKey, data: impl IntoIterator<Item = &'a TData>) -> StoreResult<()>
    where
        TData: 'a,
    {
        for item in data {
            writer.put(self.get_db_key(&key, item)?, [])?;
        }
        Ok(())
    }

    pub fn delete_bucket(&self, mut writer: impl DbWriter, key: TKey) -> StoreResult<()> {
        let db_key = DbKey::new_with_bucket(&self.prefix, &key, []);
        match rocksdb::PrefixRange(db_key.as_ref()).into_bounds() {
            (Some(from), Some(to)) => writer.delete_range(from, to)?,
            _ => return Err(StoreError::DataInconsistency(format!("unbounded prefix range for {}", db_key))),
        }
        Ok(())
    }

    pub fn bucket_iterator(&self, key: TKey) -> impl Iterator<Item = StoreResult<TData>> + '_ {
        let db_key = DbKey::new_with_bucket(&self.prefix, &key, []);
        let mut read_opts = ReadOptions::default();
        read_opts.set_iterate_range(rocksdb::PrefixRange(db_key.as_ref()));

        self.db.iterator_opt(IteratorMode::Start, read_opts).map(move |item| {
            let (key_bytes, _) = item?;
            Ok(bincode::deserialize(&key_bytes[db_key.prefix_len()..])?)
        })
    }
}
