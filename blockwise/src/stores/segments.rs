use super::{CoreSolution, SegmentStore, SegmentStoreReader};
use rocksdb::WriteBatch;
use sopnet_blockwise_core::{
    SegmentHash,
    blocks::{Block, Blocks, Core, GridKey},
    config::params::CacheParams,
    constraint::{SegmentConstraint, SegmentConstraints},
    description::{SegmentDescription, SegmentDescriptions},
};
use sopnet_core::debug;
use sopnet_database::{
    prelude::{
        BatchDbWriter, CachePolicy, CachedDbAccess, CachedDbItem, DB, DbSetAccess, DirectDbWriter, StoreError, StoreResult,
        StoreResultExt,
    },
    registry::DatabaseStorePrefixes,
};
use sopnet_utils::mem_size::MemMode;
use std::sync::Arc;

/// A DB + cache implementation of `SegmentStore`, with concurrency support.
///
/// Descriptions are stored once per hash and without their cost; costs live in their own bucket so that a
/// segment shared by several blocks carries a single cost.
#[derive(Clone)]
pub struct DbSegmentStore {
    db: Arc<DB>,
    segments: CachedDbAccess<SegmentHash, Arc<SegmentDescription>>,
    block_segments: DbSetAccess<GridKey, SegmentHash>,
    block_constraints: CachedDbAccess<GridKey, Arc<Vec<SegmentConstraint>>>,
    costs: CachedDbAccess<SegmentHash, f64>,
    feature_weights: CachedDbItem<Vec<f64>>,
    solutions: CachedDbAccess<GridKey, Arc<CoreSolution>>,
    gold_standards: CachedDbAccess<GridKey, Arc<CoreSolution>>,
    segment_flags: CachedDbAccess<GridKey, bool>,
    solution_flags: CachedDbAccess<GridKey, bool>,
    gold_standard_flags: CachedDbAccess<GridKey, bool>,
}

impl DbSegmentStore {
    pub fn new(db: Arc<DB>, namespace: u8, cache: &CacheParams) -> Self {
        let block_policy = CachePolicy::Count(cache.block_entries);
        Self {
            db: Arc::clone(&db),
            segments: CachedDbAccess::new(
                db.clone(),
                CachePolicy::Tracked { max_size: cache.segment_bytes, mem_mode: MemMode::Bytes },
                DatabaseStorePrefixes::Segments.namespaced(namespace),
            ),
            block_segments: DbSetAccess::new(db.clone(), DatabaseStorePrefixes::BlockSegments.namespaced(namespace)),
            block_constraints: CachedDbAccess::new(
                db.clone(),
                block_policy,
                DatabaseStorePrefixes::BlockConstraints.namespaced(namespace),
            ),
            costs: CachedDbAccess::new(
                db.clone(),
                CachePolicy::Count(cache.costs),
                DatabaseStorePrefixes::SegmentCosts.namespaced(namespace),
            ),
            feature_weights: CachedDbItem::new(db.clone(), DatabaseStorePrefixes::FeatureWeights.namespaced(namespace)),
            solutions: CachedDbAccess::new(db.clone(), block_policy, DatabaseStorePrefixes::CoreSolutions.namespaced(namespace)),
            gold_standards: CachedDbAccess::new(db.clone(), block_policy, DatabaseStorePrefixes::GoldStandards.namespaced(namespace)),
            segment_flags: CachedDbAccess::new(db.clone(), block_policy, DatabaseStorePrefixes::SegmentsFlags.namespaced(namespace)),
            solution_flags: CachedDbAccess::new(db.clone(), block_policy, DatabaseStorePrefixes::SolutionFlags.namespaced(namespace)),
            gold_standard_flags: CachedDbAccess::new(
                db,
                block_policy,
                DatabaseStorePrefixes::GoldStandardFlags.namespaced(namespace),
            ),
        }
    }

    fn read_segment(&self, hash: SegmentHash) -> StoreResult<SegmentDescription> {
        let description = self.segments.read(hash)?;
        description.verify().map_err(|err| StoreError::DataInconsistency(format!("stored segment {hash}: {err}")))?;
        Ok((*description).clone())
    }
}

impl SegmentStoreReader for DbSegmentStore {
    fn get_segments_by_blocks(&self, blocks: &Blocks, missing: &mut Blocks, read_costs: bool) -> StoreResult<SegmentDescriptions> {
        let mut descriptions = SegmentDescriptions::new();
        for block in blocks {
            if !self.segments_flag(block)? {
                missing.insert(*block);
                continue;
            }
            for hash in self.block_segments.bucket_iterator(block.key()) {
                let hash = hash?;
                if descriptions.contains(&hash) {
                    continue;
                }
                let mut description = self.read_segment(hash)?;
                if read_costs {
                    description.cost = self.costs.read(hash).optional()?;
                }
                descriptions.add(description);
            }
        }
        Ok(descriptions)
    }

    fn segments_flag(&self, block: &Block) -> StoreResult<bool> {
        Ok(self.segment_flags.read(block.key()).optional()?.unwrap_or(false))
    }

    fn get_constraints_by_blocks(&self, blocks: &Blocks) -> StoreResult<SegmentConstraints> {
        let mut constraints = SegmentConstraints::new();
        for block in blocks {
            if let Some(stored) = self.block_constraints.read(block.key()).optional()? {
                constraints.extend(stored.iter().cloned());
            }
        }
        Ok(constraints)
    }

    fn solution_flag(&self, core: &Core) -> StoreResult<bool> {
        Ok(self.solution_flags.read(core.key()).optional()?.unwrap_or(false))
    }

    fn get_solution(&self, core: &Core) -> StoreResult<Option<CoreSolution>> {
        Ok(self.solutions.read(core.key()).optional()?.map(|solution| (*solution).clone()))
    }

    fn gold_standard_flag(&self, core: &Core) -> StoreResult<bool> {
        Ok(self.gold_standard_flags.read(core.key()).optional()?.unwrap_or(false))
    }

    fn get_gold_standard(&self, core: &Core) -> StoreResult<Option<CoreSolution>> {
        Ok(self.gold_standards.read(core.key()).optional()?.map(|solution| (*solution).clone()))
    }

    fn get_feature_weights(&self) -> StoreResult<Option<Vec<f64>>> {
        self.feature_weights.read().optional()
    }
}

impl SegmentStore for DbSegmentStore {
    fn associate_segments_to_block(&self, segments: &SegmentDescriptions, block: &Block) -> StoreResult<()> {
        let mut batch = WriteBatch::default();
        let mut written = 0;
        for description in segments.iter() {
            let stored = Arc::new(SegmentDescription { cost: None, ..description.clone() });
            if self.segments.write_if_absent(BatchDbWriter::new(&mut batch), description.hash, stored)? {
                written += 1;
            }
        }
        self.block_segments.delete_bucket(BatchDbWriter::new(&mut batch), block.key())?;
        let hashes = segments.hashes().collect::<Vec<_>>();
        self.block_segments.write_many(BatchDbWriter::new(&mut batch), block.key(), &hashes)?;
        self.db.write(batch)?;
        debug!("associated {} segments ({} new) to {}", segments.len(), written, block);
        Ok(())
    }

    fn associate_constraints_to_block(&self, constraints: &[SegmentConstraint], block: &Block) -> StoreResult<()> {
        self.block_constraints.write(DirectDbWriter::new(&self.db), block.key(), Arc::new(constraints.to_vec()))
    }

    fn store_segment_costs(&self, costs: &[(SegmentHash, f64)]) -> StoreResult<()> {
        let mut batch = WriteBatch::default();
        self.costs.write_many(BatchDbWriter::new(&mut batch), &mut costs.iter().copied())?;
        self.db.write(batch)?;
        Ok(())
    }

    fn store_feature_weights(&self, weights: &[f64]) -> StoreResult<()> {
        self.feature_weights.write(DirectDbWriter::new(&self.db), &weights.to_vec())
    }

    fn store_solution(&self, solution: &CoreSolution, core: &Core) -> StoreResult<()> {
        self.solutions.write(DirectDbWriter::new(&self.db), core.key(), Arc::new(solution.clone()))
    }

    fn set_segments_flag(&self, block: &Block) -> StoreResult<()> {
        self.segment_flags.write(DirectDbWriter::new(&self.db), block.key(), true)
    }

    fn set_solution_flag(&self, core: &Core) -> StoreResult<()> {
        self.solution_flags.write(DirectDbWriter::new(&self.db), core.key(), true)
    }

    fn store_gold_standard(&self, solution: &CoreSolution, core: &Core) -> StoreResult<()> {
        self.gold_standards.write(DirectDbWriter::new(&self.db), core.key(), Arc::new(solution.clone()))
    }

    fn set_gold_standard_flag(&self, core: &Core) -> StoreResult<()> {
        self.gold_standard_flags.write(DirectDbWriter::new(&self.db), core.key(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{continuation, end, grid_blocks, grid_cores, square_slice};
    use sopnet_blockwise_core::segment::Side;
    use sopnet_database::{create_temp_db, prelude::ConnBuilder};

    #[test]
    fn test_segments_and_costs() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let store = DbSegmentStore::new(db.clone(), 0, &CacheParams::default());
        let blocks = grid_blocks(2);
        let (a, b) = (square_slice(0, 0, 0, 2), square_slice(1, 0, 0, 2));
        let descriptions: SegmentDescriptions = [end(&a, Side::Right), continuation(&a, &b), end(&b, Side::Left)]
            .iter()
            .map(|s| SegmentDescription::from_segment(s).with_features(vec![1.0, 2.0]).with_cost(7.0))
            .collect();

        store.associate_segments_to_block(&descriptions, &blocks[0]).unwrap();
        store.set_segments_flag(&blocks[0]).unwrap();

        let mut missing = Blocks::new();
        let read = store.get_segments_by_blocks(&blocks, &mut missing, false).unwrap();
        assert_eq!(vec![blocks[1]], missing.into_iter().collect::<Vec<_>>());
        assert_eq!(3, read.len());
        assert!(read.iter().all(|d| d.cost.is_none() && d.features == vec![1.0, 2.0]));

        // Costs are only attached once stored, and only when asked for
        let first = descriptions.hashes().next().unwrap();
        store.store_segment_costs(&[(first, -3.5)]).unwrap();
        let fresh = DbSegmentStore::new(db, 0, &CacheParams::default());
        let read = fresh.get_segments_by_blocks(&blocks, &mut Blocks::new(), true).unwrap();
        assert_eq!(Some(-3.5), read.get(&first).unwrap().cost);
        assert_eq!(1, read.iter().filter(|d| d.cost.is_some()).count());
    }

    #[test]
    fn test_solutions_and_weights() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let store = DbSegmentStore::new(db.clone(), 0, &CacheParams::default());
        let core = grid_cores(1)[0];

        assert!(store.get_feature_weights().unwrap().is_none());
        assert!(store.get_solution(&core).unwrap().is_none());
        assert!(!store.solution_flag(&core).unwrap());

        let a = square_slice(0, 0, 0, 2);
        let solution = CoreSolution { segments: vec![end(&a, Side::Right).hash()], assemblies: vec![vec![end(&a, Side::Right).hash()]] };
        store.store_feature_weights(&[0.5, 1.5]).unwrap();
        store.store_solution(&solution, &core).unwrap();
        store.set_solution_flag(&core).unwrap();

        let reopened = DbSegmentStore::new(db.clone(), 0, &CacheParams::default());
        assert_eq!(Some(vec![0.5, 1.5]), reopened.get_feature_weights().unwrap());
        assert_eq!(Some(solution.clone()), reopened.get_solution(&core).unwrap());
        assert!(reopened.solution_flag(&core).unwrap());
        assert!(!DbSegmentStore::new(db, 1, &CacheParams::default()).solution_flag(&core).unwrap());

        // The gold standard of a core is independent of its solution
        assert!(!reopened.gold_standard_flag(&core).unwrap());
        assert!(reopened.get_gold_standard(&core).unwrap().is_none());
        let gold = CoreSolution { segments: vec![end(&a, Side::Left).hash()], assemblies: vec![vec![end(&a, Side::Left).hash()]] };
        reopened.store_gold_standard(&gold, &core).unwrap();
        reopened.set_gold_standard_flag(&core).unwrap();
        assert!(store.gold_standard_flag(&core).unwrap());
        assert_eq!(Some(gold), store.get_gold_standard(&core).unwrap());
        assert_eq!(Some(solution), store.get_solution(&core).unwrap());
    }

    #[test]
    fn test_constraints_by_blocks() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let store = DbSegmentStore::new(db.clone(), 0, &CacheParams::default());
        let blocks = grid_blocks(3);
        let (a, b) = (square_slice(0, 0, 0, 2), square_slice(1, 0, 0, 2));
        let forced = SegmentConstraint::force(continuation(&a, &b).hash());
        let forbidden = SegmentConstraint::forbid(end(&a, Side::Right).hash());

        // No constraints is not missing data
        assert!(store.get_constraints_by_blocks(&blocks).unwrap().is_empty());

        store.associate_constraints_to_block(&[forced.clone(), forbidden.clone()], &blocks[0]).unwrap();
        store.associate_constraints_to_block(&[forced.clone()], &blocks[1]).unwrap();
        let fresh = DbSegmentStore::new(db.clone(), 0, &CacheParams::default());
        let constraints = fresh.get_constraints_by_blocks(&blocks).unwrap();
        assert_eq!(vec![&forced, &forbidden], constraints.iter().collect::<Vec<_>>());

        // Associations replace earlier ones
        store.associate_constraints_to_block(&[], &blocks[0]).unwrap();
        assert_eq!(1, store.get_constraints_by_blocks(&blocks).unwrap().len());
        assert!(DbSegmentStore::new(db, 1, &CacheParams::default()).get_constraints_by_blocks(&blocks).unwrap().is_empty());
    }
}
