//! Guarantees addressed by world locations rather than blocks and cores.
//!
//! Each function resolves the block or core containing `location` and reports the world locations of the blocks
//! still missing. An empty result means the requested data exists.

use crate::{
    errors::{GuarantorError, GuarantorResult},
    guarantors::{gold_standard::GoldStandardGuarantor, segments::SegmentGuarantor, slices::SliceGuarantor, solution::SolutionGuarantor},
};
use sopnet_blockwise_core::{
    block_manager::BlockManager,
    blocks::{Block, Blocks, Core},
    config::ProjectConfig,
    geometry::Point3,
};

/// World locations of blocks
pub type Locations = Vec<Point3>;

fn block_at(location: Point3, config: &ProjectConfig) -> GuarantorResult<Block> {
    BlockManager::from_config(config)?.block_at_location(location).ok_or(GuarantorError::NoSuchBlock(location))
}

fn core_at(location: Point3, config: &ProjectConfig) -> GuarantorResult<Core> {
    BlockManager::from_config(config)?.core_at_location(location).ok_or(GuarantorError::NoSuchCore(location))
}

fn locations(blocks: Blocks) -> Locations {
    blocks.into_iter().map(|b| b.location()).collect()
}

/// Returns the blocks for which image data is needed
pub fn fill_slices(location: Point3, config: &ProjectConfig, guarantor: &SliceGuarantor) -> GuarantorResult<Locations> {
    Ok(locations(guarantor.guarantee_block(&block_at(location, config)?)?))
}

/// Returns the blocks for which slices are needed
pub fn fill_segments(location: Point3, config: &ProjectConfig, guarantor: &SegmentGuarantor) -> GuarantorResult<Locations> {
    Ok(locations(guarantor.guarantee(&block_at(location, config)?)?))
}

/// Returns the blocks for which slices or segments are needed
pub fn fill_solution(location: Point3, config: &ProjectConfig, guarantor: &SolutionGuarantor) -> GuarantorResult<Locations> {
    Ok(locations(guarantor.guarantee(&core_at(location, config)?)?))
}

pub fn fill_gold_standard(location: Point3, config: &ProjectConfig, guarantor: &GoldStandardGuarantor) -> GuarantorResult<Locations> {
    Ok(locations(guarantor.guarantee(&core_at(location, config)?)?))
}
