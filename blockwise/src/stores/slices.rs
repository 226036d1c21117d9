use super::{SliceStore, SliceStoreReader};
use rocksdb::WriteBatch;
use sopnet_blockwise_core::{
    SliceHash,
    blocks::{Block, Blocks, GridKey},
    conflict::{ConflictSet, ConflictSets},
    config::params::CacheParams,
    slice::{Slice, Slices},
};
use sopnet_core::debug;
use sopnet_database::{
    prelude::{BatchDbWriter, CachePolicy, CachedDbAccess, DB, DbSetAccess, DirectDbWriter, StoreResult, StoreResultExt},
    registry::DatabaseStorePrefixes,
};
use sopnet_utils::mem_size::MemMode;
use std::sync::Arc;

/// A DB + cache implementation of `SliceStore`, with concurrency support. Several stores may share one DB
/// through distinct namespaces.
#[derive(Clone)]
pub struct DbSliceStore {
    db: Arc<DB>,
    slices: CachedDbAccess<SliceHash, Arc<Slice>>,
    block_slices: DbSetAccess<GridKey, SliceHash>,
    block_conflict_sets: CachedDbAccess<GridKey, Arc<Vec<ConflictSet>>>,
    flags: CachedDbAccess<GridKey, bool>,
}

impl DbSliceStore {
    pub fn new(db: Arc<DB>, namespace: u8, cache: &CacheParams) -> Self {
        Self {
            db: Arc::clone(&db),
            slices: CachedDbAccess::new(
                db.clone(),
                CachePolicy::Tracked { max_size: cache.slice_bytes, mem_mode: MemMode::Bytes },
                DatabaseStorePrefixes::Slices.namespaced(namespace),
            ),
            block_slices: DbSetAccess::new(db.clone(), DatabaseStorePrefixes::BlockSlices.namespaced(namespace)),
            block_conflict_sets: CachedDbAccess::new(
                db.clone(),
                CachePolicy::Count(cache.block_entries),
                DatabaseStorePrefixes::BlockConflictSets.namespaced(namespace),
            ),
            flags: CachedDbAccess::new(db, CachePolicy::Count(cache.block_entries), DatabaseStorePrefixes::SlicesFlags.namespaced(namespace)),
        }
    }
}

impl SliceStoreReader for DbSliceStore {
    fn get_slices_by_blocks(&self, blocks: &Blocks, missing: &mut Blocks) -> StoreResult<Slices> {
        let mut slices = Slices::new();
        for block in blocks {
            if !self.slices_flag(block)? {
                missing.insert(*block);
                continue;
            }
            for hash in self.block_slices.bucket_iterator(block.key()) {
                slices.add(self.slices.read(hash?)?);
            }
        }
        Ok(slices)
    }

    fn get_conflict_sets_by_blocks(&self, blocks: &Blocks, missing: &mut Blocks) -> StoreResult<ConflictSets> {
        let mut conflict_sets = ConflictSets::new();
        for block in blocks {
            if !self.slices_flag(block)? {
                missing.insert(*block);
                continue;
            }
            if let Some(sets) = self.block_conflict_sets.read(block.key()).optional()? {
                conflict_sets.extend(sets.iter().cloned());
            }
        }
        Ok(conflict_sets)
    }

    fn slices_flag(&self, block: &Block) -> StoreResult<bool> {
        Ok(self.flags.read(block.key()).optional()?.unwrap_or(false))
    }
}

impl SliceStore for DbSliceStore {
    fn associate_slices_to_block(&self, slices: &[Arc<Slice>], block: &Block) -> StoreResult<()> {
        let mut batch = WriteBatch::default();
        let mut written = 0;
        for slice in slices {
            if self.slices.write_if_absent(BatchDbWriter::new(&mut batch), slice.hash(), slice.clone())? {
                written += 1;
            }
        }
        self.block_slices.delete_bucket(BatchDbWriter::new(&mut batch), block.key())?;
        let hashes = slices.iter().map(|s| s.hash()).collect::<Vec<_>>();
        self.block_slices.write_many(BatchDbWriter::new(&mut batch), block.key(), &hashes)?;
        self.db.write(batch)?;
        debug!("associated {} slices ({} new) to {}", slices.len(), written, block);
        Ok(())
    }

    fn associate_conflict_sets_to_block(&self, conflict_sets: &[ConflictSet], block: &Block) -> StoreResult<()> {
        self.block_conflict_sets.write(DirectDbWriter::new(&self.db), block.key(), Arc::new(conflict_sets.to_vec()))
    }

    fn set_slices_flag(&self, block: &Block) -> StoreResult<()> {
        self.flags.write(DirectDbWriter::new(&self.db), block.key(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{grid_blocks, square_slice};
    use sopnet_database::{create_temp_db, prelude::ConnBuilder};

    #[test]
    fn test_slices_by_blocks() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let store = DbSliceStore::new(db.clone(), 0, &CacheParams::default());
        let blocks = grid_blocks(2);
        let (a, b) = (square_slice(0, 0, 0, 2), square_slice(0, 5, 5, 2));

        let mut missing = Blocks::new();
        assert!(store.get_slices_by_blocks(&blocks, &mut missing).unwrap().is_empty());
        assert_eq!(blocks, missing);

        store.associate_slices_to_block(&[a.clone(), b.clone()], &blocks[0]).unwrap();
        store.associate_conflict_sets_to_block(&[ConflictSet::new([a.hash(), b.hash()])], &blocks[0]).unwrap();
        // Not visible before the flag is raised
        let mut missing = Blocks::new();
        assert!(store.get_slices_by_blocks(&blocks, &mut missing).unwrap().is_empty());
        assert_eq!(2, missing.len());

        store.set_slices_flag(&blocks[0]).unwrap();
        let mut missing = Blocks::new();
        let slices = store.get_slices_by_blocks(&blocks, &mut missing).unwrap();
        assert_eq!(2, slices.len());
        assert!(slices.contains(&a.hash()) && slices.contains(&b.hash()));
        assert_eq!(vec![blocks[1]], missing.into_iter().collect::<Vec<_>>());

        // Another namespace in the same DB is independent, while a fresh handle on the same namespace sees the data
        let other = DbSliceStore::new(db.clone(), 1, &CacheParams::default());
        assert!(!other.slices_flag(&blocks[0]).unwrap());
        let reopened = DbSliceStore::new(db, 0, &CacheParams::default());
        let mut missing = Blocks::new();
        let conflict_sets = reopened.get_conflict_sets_by_blocks(&blocks, &mut missing).unwrap();
        assert_eq!(1, conflict_sets.len());
        assert!(conflict_sets.in_conflict(&a.hash(), &b.hash()));
    }

    #[test]
    fn test_association_overwrites() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let store = DbSliceStore::new(db, 0, &CacheParams::default());
        let blocks = grid_blocks(1);
        let (a, b) = (square_slice(0, 0, 0, 2), square_slice(0, 5, 5, 2));

        store.associate_slices_to_block(&[a.clone(), b], &blocks[0]).unwrap();
        store.associate_slices_to_block(&[a.clone()], &blocks[0]).unwrap();
        store.set_slices_flag(&blocks[0]).unwrap();

        let slices = store.get_slices_by_blocks(&blocks, &mut Blocks::new()).unwrap();
        assert_eq!(vec![a.hash()], slices.hashes().collect::<Vec<_>>());
    }
}
