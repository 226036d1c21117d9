use super::{CoreSolution, SegmentStore, SegmentStoreReader, SliceStore, SliceStoreReader};
use parking_lot::RwLock;
use sopnet_blockwise_core::{
    SegmentHash, SliceHash,
    blocks::{Block, Blocks, Core},
    conflict::{ConflictSet, ConflictSets},
    constraint::{SegmentConstraint, SegmentConstraints},
    description::{SegmentDescription, SegmentDescriptions},
    slice::{Slice, Slices},
};
use sopnet_database::prelude::{StoreError, StoreResult};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

#[derive(Default)]
struct SliceMaps {
    slices: HashMap<SliceHash, Arc<Slice>>,
    block_slices: HashMap<Block, Vec<SliceHash>>,
    block_conflict_sets: HashMap<Block, Arc<Vec<ConflictSet>>>,
    flags: HashSet<Block>,
}

/// A process local `SliceStore`
#[derive(Default)]
pub struct MemorySliceStore {
    inner: RwLock<SliceMaps>,
}

impl MemorySliceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SliceStoreReader for MemorySliceStore {
    fn get_slices_by_blocks(&self, blocks: &Blocks, missing: &mut Blocks) -> StoreResult<Slices> {
        let inner = self.inner.read();
        let mut slices = Slices::new();
        for block in blocks {
            if !inner.flags.contains(block) {
                missing.insert(*block);
                continue;
            }
            for hash in inner.block_slices.get(block).into_iter().flatten() {
                let slice = inner
                    .slices
                    .get(hash)
                    .ok_or_else(|| StoreError::DataInconsistency(format!("slice {hash} of {block} is not stored")))?;
                slices.add(slice.clone());
            }
        }
        Ok(slices)
    }

    fn get_conflict_sets_by_blocks(&self, blocks: &Blocks, missing: &mut Blocks) -> StoreResult<ConflictSets> {
        let inner = self.inner.read();
        let mut conflict_sets = ConflictSets::new();
        for block in blocks {
            if !inner.flags.contains(block) {
                missing.insert(*block);
                continue;
            }
            if let Some(sets) = inner.block_conflict_sets.get(block) {
                conflict_sets.extend(sets.iter().cloned());
            }
        }
        Ok(conflict_sets)
    }

    fn slices_flag(&self, block: &Block) -> StoreResult<bool> {
        Ok(self.inner.read().flags.contains(block))
    }
}

impl SliceStore for MemorySliceStore {
    fn associate_slices_to_block(&self, slices: &[Arc<Slice>], block: &Block) -> StoreResult<()> {
        let mut inner = self.inner.write();
        for slice in slices {
            inner.slices.entry(slice.hash()).or_insert_with(|| slice.clone());
        }
        inner.block_slices.insert(*block, slices.iter().map(|s| s.hash()).collect());
        Ok(())
    }

    fn associate_conflict_sets_to_block(&self, conflict_sets: &[ConflictSet], block: &Block) -> StoreResult<()> {
        self.inner.write().block_conflict_sets.insert(*block, Arc::new(conflict_sets.to_vec()));
        Ok(())
    }

    fn set_slices_flag(&self, block: &Block) -> StoreResult<()> {
        self.inner.write().flags.insert(*block);
        Ok(())
    }
}

#[derive(Default)]
struct SegmentMaps {
    segments: HashMap<SegmentHash, Arc<SegmentDescription>>,
    block_segments: HashMap<Block, Vec<SegmentHash>>,
    block_constraints: HashMap<Block, Vec<SegmentConstraint>>,
    costs: HashMap<SegmentHash, f64>,
    feature_weights: Option<Vec<f64>>,
    solutions: HashMap<Core, CoreSolution>,
    gold_standards: HashMap<Core, CoreSolution>,
    segment_flags: HashSet<Block>,
    solution_flags: HashSet<Core>,
    gold_standard_flags: HashSet<Core>,
}

/// A process local `SegmentStore`
#[derive(Default)]
pub struct MemorySegmentStore {
    inner: RwLock<SegmentMaps>,
}

impl MemorySegmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SegmentStoreReader for MemorySegmentStore {
    fn get_segments_by_blocks(&self, blocks: &Blocks, missing: &mut Blocks, read_costs: bool) -> StoreResult<SegmentDescriptions> {
        let inner = self.inner.read();
        let mut descriptions = SegmentDescriptions::new();
        for block in blocks {
            if !inner.segment_flags.contains(block) {
                missing.insert(*block);
                continue;
            }
            for hash in inner.block_segments.get(block).into_iter().flatten() {
                let mut description = inner
                    .segments
                    .get(hash)
                    .map(|d| (**d).clone())
                    .ok_or_else(|| StoreError::DataInconsistency(format!("segment {hash} of {block} is not stored")))?;
                description.cost = if read_costs { inner.costs.get(hash).copied() } else { None };
                descriptions.add(description);
            }
        }
        Ok(descriptions)
    }

    fn segments_flag(&self, block: &Block) -> StoreResult<bool> {
        Ok(self.inner.read().segment_flags.contains(block))
    }

    fn get_constraints_by_blocks(&self, blocks: &Blocks) -> StoreResult<SegmentConstraints> {
        let inner = self.inner.read();
        Ok(blocks.iter().filter_map(|block| inner.block_constraints.get(block)).flatten().cloned().collect())
    }

    fn solution_flag(&self, core: &Core) -> StoreResult<bool> {
        Ok(self.inner.read().solution_flags.contains(core))
    }

    fn get_solution(&self, core: &Core) -> StoreResult<Option<CoreSolution>> {
        Ok(self.inner.read().solutions.get(core).cloned())
    }

    fn gold_standard_flag(&self, core: &Core) -> StoreResult<bool> {
        Ok(self.inner.read().gold_standard_flags.contains(core))
    }

    fn get_gold_standard(&self, core: &Core) -> StoreResult<Option<CoreSolution>> {
        Ok(self.inner.read().gold_standards.get(core).cloned())
    }

    fn get_feature_weights(&self) -> StoreResult<Option<Vec<f64>>> {
        Ok(self.inner.read().feature_weights.clone())
    }
}

impl SegmentStore for MemorySegmentStore {
    fn associate_segments_to_block(&self, segments: &SegmentDescriptions, block: &Block) -> StoreResult<()> {
        let mut inner = self.inner.write();
        for description in segments.iter() {
            inner.segments.entry(description.hash).or_insert_with(|| Arc::new(SegmentDescription { cost: None, ..description.clone() }));
        }
        inner.block_segments.insert(*block, segments.hashes().collect());
        Ok(())
    }

    fn associate_constraints_to_block(&self, constraints: &[SegmentConstraint], block: &Block) -> StoreResult<()> {
        self.inner.write().block_constraints.insert(*block, constraints.to_vec());
        Ok(())
    }

    fn store_segment_costs(&self, costs: &[(SegmentHash, f64)]) -> StoreResult<()> {
        self.inner.write().costs.extend(costs.iter().copied());
        Ok(())
    }

    fn store_feature_weights(&self, weights: &[f64]) -> StoreResult<()> {
        self.inner.write().feature_weights = Some(weights.to_vec());
        Ok(())
    }

    fn store_solution(&self, solution: &CoreSolution, core: &Core) -> StoreResult<()> {
        self.inner.write().solutions.insert(*core, solution.clone());
        Ok(())
    }

    fn set_segments_flag(&self, block: &Block) -> StoreResult<()> {
        self.inner.write().segment_flags.insert(*block);
        Ok(())
    }

    fn set_solution_flag(&self, core: &Core) -> StoreResult<()> {
        self.inner.write().solution_flags.insert(*core);
        Ok(())
    }

    fn store_gold_standard(&self, solution: &CoreSolution, core: &Core) -> StoreResult<()> {
        self.inner.write().gold_standards.insert(*core, solution.clone());
        Ok(())
    }

    fn set_gold_standard_flag(&self, core: &Core) -> StoreResult<()> {
        self.inner.write().gold_standard_flags.insert(*core);
        Ok(())
    }
}
