use super::{core_solution, solve};
use crate::{
    collaborators::LinearSolver,
    errors::{GuarantorError, GuarantorResult},
    processes::problem::ProblemAssembler,
    stores::{SegmentStore, SliceStore},
};
use sopnet_blockwise_core::{
    SegmentHash,
    block_manager::BlockManager,
    blocks::{Blocks, Core},
    config::{ProjectConfig, params::SolutionParams},
    description::SegmentDescriptions,
};
use sopnet_core::{debug, info};
use std::{collections::HashMap, sync::Arc};

/// Solves cores. The problem of a core covers its blocks padded in x and y, while only the segments of the
/// core's own blocks are kept as its solution.
pub struct SolutionGuarantor {
    block_manager: BlockManager,
    slice_store: Arc<dyn SliceStore>,
    segment_store: Arc<dyn SegmentStore>,
    solver: Arc<dyn LinearSolver>,
    params: SolutionParams,
}

impl SolutionGuarantor {
    pub fn new(
        config: &ProjectConfig,
        slice_store: Arc<dyn SliceStore>,
        segment_store: Arc<dyn SegmentStore>,
        solver: Arc<dyn LinearSolver>,
    ) -> GuarantorResult<Self> {
        Ok(Self {
            block_manager: BlockManager::from_config(config)?,
            slice_store,
            segment_store,
            solver,
            params: config.solution.clone(),
        })
    }

    pub fn guarantee(&self, core: &Core) -> GuarantorResult<Blocks> {
        if self.segment_store.solution_flag(core)? {
            debug!("{} is already solved", core);
            return Ok(Blocks::new());
        }

        let blocks = self.block_manager.padded_core_blocks(core, self.params.core_padding);
        let mut missing = Blocks::new();
        let descriptions = self.segment_store.get_segments_by_blocks(&blocks, &mut missing, self.params.read_costs)?;
        let conflict_sets = self.slice_store.get_conflict_sets_by_blocks(&blocks, &mut missing)?;
        if !missing.is_empty() {
            debug!("cannot solve {}, {} of {} blocks are not ready", core, missing.len(), blocks.len());
            return Ok(missing);
        }

        let explicit = self.segment_store.get_constraints_by_blocks(&blocks)?;
        let costs = if self.params.read_costs { Self::stored_costs(core, &descriptions)? } else { self.weighted_costs(core, &descriptions)? };

        let problem = ProblemAssembler::new(self.params.force_explanation).assemble(&descriptions, &conflict_sets, &explicit, &costs);
        let accepted = solve(self.solver.as_ref(), &problem, core)?;
        let solution = core_solution(self.segment_store.as_ref(), core, &self.block_manager.core_blocks(core), &accepted, &descriptions)?;

        // Nothing is written unless the problem was solved
        if self.params.store_costs && !self.params.read_costs {
            self.segment_store.store_segment_costs(&costs.iter().map(|(h, c)| (*h, *c)).collect::<Vec<_>>())?;
        }
        self.segment_store.store_solution(&solution, core)?;
        self.segment_store.set_solution_flag(core)?;
        info!("solved {} with {} explicit constraints: {} segments in {} assemblies", core, explicit.len(), solution.segments.len(), solution.assemblies.len());
        Ok(Blocks::new())
    }

    fn stored_costs(core: &Core, descriptions: &SegmentDescriptions) -> GuarantorResult<HashMap<SegmentHash, f64>> {
        descriptions
            .iter()
            .map(|d| d.cost.map(|c| (d.hash, c)).ok_or(GuarantorError::MissingSegmentCost { core: *core, segment: d.hash }))
            .collect()
    }

    /// The costs as weighted sums of the segment features
    fn weighted_costs(&self, core: &Core, descriptions: &SegmentDescriptions) -> GuarantorResult<HashMap<SegmentHash, f64>> {
        let weights = self.segment_store.get_feature_weights()?.ok_or(GuarantorError::MissingFeatureWeights(*core))?;
        descriptions
            .iter()
            .map(|d| {
                if d.features.len() != weights.len() {
                    return Err(GuarantorError::FeatureWeightsMismatch { segment: d.hash, expected: d.features.len(), found: weights.len() });
                }
                Ok((d.hash, d.features.iter().zip(weights.iter()).map(|(f, w)| f * w).sum()))
            })
            .collect()
    }
}
