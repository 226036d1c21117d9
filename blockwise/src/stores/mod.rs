//! Persistence of slices, segments and solutions.
//!
//! Every store comes as a reader/writer trait pair with an in-memory and a rocksdb implementation. Retrievals by
//! block never fail on absent data: blocks whose completion flag is not set are added to the caller's `missing` set
//! instead, which is what drives the guarantee protocol. Writers commit a block's data before its flag can be
//! raised, so a raised flag always implies durable data.

pub mod factory;
pub mod memory;
pub mod segments;
pub mod slices;

use serde::{Deserialize, Serialize};
use sopnet_blockwise_core::{
    SegmentHash,
    blocks::{Block, Blocks, Core},
    conflict::{ConflictSet, ConflictSets},
    constraint::{SegmentConstraint, SegmentConstraints},
    description::SegmentDescriptions,
    slice::{Slice, Slices},
};
use sopnet_database::prelude::StoreResult;
use sopnet_utils::mem_size::MemSizeEstimator;
use std::sync::Arc;

/// The accepted segments of a core, grouped into assemblies as well
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreSolution {
    pub segments: Vec<SegmentHash>,
    pub assemblies: Vec<Vec<SegmentHash>>,
}

impl MemSizeEstimator for CoreSolution {}

/// Reader API for `SliceStore`
pub trait SliceStoreReader: Send + Sync {
    fn get_slices_by_blocks(&self, blocks: &Blocks, missing: &mut Blocks) -> StoreResult<Slices>;

    fn get_conflict_sets_by_blocks(&self, blocks: &Blocks, missing: &mut Blocks) -> StoreResult<ConflictSets>;

    fn slices_flag(&self, block: &Block) -> StoreResult<bool>;
}

/// Write API for `SliceStore`. Associations replace whatever was associated to the block before.
pub trait SliceStore: SliceStoreReader {
    fn associate_slices_to_block(&self, slices: &[Arc<Slice>], block: &Block) -> StoreResult<()>;

    fn associate_conflict_sets_to_block(&self, conflict_sets: &[ConflictSet], block: &Block) -> StoreResult<()>;

    fn set_slices_flag(&self, block: &Block) -> StoreResult<()>;
}

/// Reader API for `SegmentStore`
pub trait SegmentStoreReader: Send + Sync {
    /// Descriptions of all segments of `blocks`. Stored costs are attached only if `read_costs` is set.
    fn get_segments_by_blocks(&self, blocks: &Blocks, missing: &mut Blocks, read_costs: bool) -> StoreResult<SegmentDescriptions>;

    fn segments_flag(&self, block: &Block) -> StoreResult<bool>;

    /// The explicit constraints associated to any of `blocks`. Blocks without constraints contribute none, they
    /// are never reported missing.
    fn get_constraints_by_blocks(&self, blocks: &Blocks) -> StoreResult<SegmentConstraints>;

    fn solution_flag(&self, core: &Core) -> StoreResult<bool>;

    fn get_solution(&self, core: &Core) -> StoreResult<Option<CoreSolution>>;

    fn gold_standard_flag(&self, core: &Core) -> StoreResult<bool>;

    fn get_gold_standard(&self, core: &Core) -> StoreResult<Option<CoreSolution>>;

    fn get_feature_weights(&self) -> StoreResult<Option<Vec<f64>>>;
}

/// Write API for `SegmentStore`
pub trait SegmentStore: SegmentStoreReader {
    fn associate_segments_to_block(&self, segments: &SegmentDescriptions, block: &Block) -> StoreResult<()>;

    /// Replaces the explicit constraints of `block`
    fn associate_constraints_to_block(&self, constraints: &[SegmentConstraint], block: &Block) -> StoreResult<()>;

    fn store_segment_costs(&self, costs: &[(SegmentHash, f64)]) -> StoreResult<()>;

    fn store_feature_weights(&self, weights: &[f64]) -> StoreResult<()>;

    fn store_solution(&self, solution: &CoreSolution, core: &Core) -> StoreResult<()>;

    fn set_segments_flag(&self, block: &Block) -> StoreResult<()>;

    fn set_solution_flag(&self, core: &Core) -> StoreResult<()>;

    /// Gold standards are kept apart from the inferred solutions, a core may have both
    fn store_gold_standard(&self, solution: &CoreSolution, core: &Core) -> StoreResult<()>;

    fn set_gold_standard_flag(&self, core: &Core) -> StoreResult<()>;
}
