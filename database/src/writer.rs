use crate::prelude::DB;
use rocksdb::WriteBatch;

/// Where the accessors send their writes: straight to the DB or into a pending batch
pub trait DbWriter {
    /// Writes of a batch only land once the batch is committed. Accessors keep such writes out of their caches.
    const IS_BATCH: bool;

    fn put<K, V>(&mut self, key: K, value: V) -> Result<(), rocksdb::Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>;

    /// Deletes the half-open key range `[from, to)`
    fn delete_range<K: AsRef<[u8]>>(&mut self, from: K, to: K) -> Result<(), rocksdb::Error>;
}

/// Applies every write immediately. Used for single-key writes such as completion flags.
pub struct DirectDbWriter<'a> {
    db: &'a DB,
}

impl<'a> DirectDbWriter<'a> {
    pub fn new(db: &'a DB) -> Self {
        Self { db }
    }
}

impl DbWriter for DirectDbWriter<'_> {
    const IS_BATCH: bool = false;

    fn put<K, V>(&mut self, key: K, value: V) -> Result<(), rocksdb::Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        self.db.put(key, value)
    }

    fn delete_range<K: AsRef<[u8]>>(&mut self, from: K, to: K) -> Result<(), rocksdb::Error> {
        // rocksdb only offers range deletion on batches
        let mut batch = WriteBatch::default();
        batch.delete_range(from, to);
        self.db.write(batch)
    }
}

/// Collects writes into a rocksdb [`WriteBatch`]. Nothing is visible until the caller commits the batch, so a
/// block's data lands atomically and always before its completion flag.
pub struct BatchDbWriter<'a> {
    batch: &'a mut WriteBatch,
}

impl<'a> BatchDbWriter<'a> {
    pub fn new(batch: &'a mut WriteBatch) -> Self {
        Self { batch }
    }
}

impl DbWriter for BatchDbWriter<'_> {
    const IS_BATCH: bool = true;

    fn put<K, V>(&mut self, key: K, value: V) -> Result<(), rocksdb::Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        self.batch.put(key, value);
        Ok(())
    }

    fn delete_range<K: AsRef<[u8]>>(&mut self, from: K, to: K) -> Result<(), rocksdb::Error> {
        self.batch.delete_range(from, to);
        Ok(())
    }
}

/// Lets one writer be lent to several accessors in a row
impl<T: DbWriter> DbWriter for &mut T {
    const IS_BATCH: bool = T::IS_BATCH;

    #[inline]
    fn put<K, V>(&mut self, key: K, value: V) -> Result<(), rocksdb::Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        (*self).put(key, value)
    }

    #[inline]
    fn delete_range<K: AsRef<[u8]>>(&mut self, from: K, to: K) -> Result<(), rocksdb::Error> {
        (*self).delete_range(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_temp_db, prelude::ConnBuilder};

    #[test]
    fn test_batch_is_invisible_until_committed() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let mut batch = WriteBatch::default();
        let mut writer = BatchDbWriter::new(&mut batch);
        for key in [[1u8, 1], [1, 2], [1, 3]] {
            (&mut writer).put(key, [7u8]).unwrap();
        }
        writer.delete_range([1u8, 2], [1u8, 3]).unwrap();
        assert!(db.get([1u8, 1]).unwrap().is_none());

        db.write(batch).unwrap();
        assert!(db.get([1u8, 1]).unwrap().is_some());
        assert!(db.get([1u8, 2]).unwrap().is_none());
        assert!(db.get([1u8, 3]).unwrap().is_some());

        let mut writer = DirectDbWriter::new(&db);
        writer.delete_range([1u8, 1], [1u8, 2]).unwrap();
        assert!(db.get([1u8, 1]).unwrap().is_none());
        writer.put([1u8, 4], [8u8]).unwrap();
        assert!(db.get([1u8, 4]).unwrap().is_some());
    }
}
