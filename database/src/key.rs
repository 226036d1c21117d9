use crate::registry::{DatabaseStorePrefixes, SEPARATOR};
use num_traits::FromPrimitive;
use smallvec::SmallVec;
use std::fmt::{Debug, Display};

/// A full rocksdb key: the store prefix (possibly extended by buckets) followed by the serialized key.
#[derive(Clone, PartialEq, Eq)]
pub struct DbKey {
    path: SmallVec<[u8; 48]>,
    prefix_len: usize,
}

impl DbKey {
    pub fn new<TKey>(prefix: &[u8], key: TKey) -> Self
    where
        TKey: AsRef<[u8]>,
    {
        Self { path: prefix.iter().chain(key.as_ref().iter()).copied().collect(), prefix_len: prefix.len() }
    }

    /// A key nested under `bucket`. Bucket bytes are counted as part of the prefix, so bucket iteration
    /// yields only the trailing key bytes.
    pub fn new_with_bucket<TBucket, TKey>(prefix: &[u8], bucket: TBucket, key: TKey) -> Self
    where
        TBucket: AsRef<[u8]>,
        TKey: AsRef<[u8]>,
    {
        let mut db_key = Self::prefix_only(prefix);
        db_key.add_bucket(bucket);
        db_key.add_key(key);
        db_key
    }

    pub fn prefix_only(prefix: &[u8]) -> Self {
        Self::new(prefix, [])
    }

    /// Appends a bucket to the prefix. Bucket keys are expected to have a fixed length so that prefix ranges
    /// never overlap across buckets.
    pub fn add_bucket<TBucket>(&mut self, bucket: TBucket)
    where
        TBucket: AsRef<[u8]>,
    {
        self.path.extend(bucket.as_ref().iter().copied());
        self.prefix_len += bucket.as_ref().len();
    }

    pub fn add_key<TKey>(&mut self, key: TKey)
    where
        TKey: AsRef<[u8]>,
    {
        self.path.extend(key.as_ref().iter().copied());
    }

    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }
}

impl AsRef<[u8]> for DbKey {
    fn as_ref(&self) -> &[u8] {
        &self.path
    }
}

impl Display for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (prefix, key) = self.path.split_at(self.prefix_len);
        match prefix.split_first() {
            Some((&store, rest)) => {
                match DatabaseStorePrefixes::from_u8(store) {
                    Some(store) if store as u8 != SEPARATOR => write!(f, "{:?}", store)?,
                    _ => write!(f, "{}", store)?,
                }
                if !rest.is_empty() {
                    write!(f, "/{}", faster_hex::hex_string(rest))?;
                }
            }
            None => f.write_str("<root>")?,
        }
        write!(f, "/{}", faster_hex::hex_string(key))
    }
}

impl Debug for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
