use super::{core_solution, solve};
use crate::{
    collaborators::{ImageTileSource, LinearSolver},
    errors::GuarantorResult,
    processes::{merge_cost::MergeCost, problem::ProblemAssembler},
    stores::factory::StoreSet,
};
use sopnet_blockwise_core::{
    block_manager::BlockManager,
    blocks::{Blocks, Core},
    config::{ProjectConfig, params::GoldStandardParams},
};
use sopnet_core::{debug, info};
use std::{collections::HashMap, sync::Arc};

/// Finds the membrane segments that best reproduce the ground truth of a core.
///
/// Each membrane segment is scored by how it merges ground truth labels, with a reward for segments the ground
/// truth contains as well. The best scoring explanation is stored as the gold standard of the core, apart from its
/// inferred solution, so that it can serve as a training target.
pub struct GoldStandardGuarantor {
    block_manager: BlockManager,
    ground_truth: StoreSet,
    membrane: StoreSet,
    labels: Arc<dyn ImageTileSource>,
    solver: Arc<dyn LinearSolver>,
    params: GoldStandardParams,
}

impl GoldStandardGuarantor {
    pub fn new(
        config: &ProjectConfig,
        ground_truth: StoreSet,
        membrane: StoreSet,
        labels: Arc<dyn ImageTileSource>,
        solver: Arc<dyn LinearSolver>,
    ) -> GuarantorResult<Self> {
        Ok(Self {
            block_manager: BlockManager::from_config(config)?,
            ground_truth,
            membrane,
            labels,
            solver,
            params: config.gold_standard.clone(),
        })
    }

    pub fn guarantee(&self, core: &Core) -> GuarantorResult<Blocks> {
        if self.membrane.segments.gold_standard_flag(core)? {
            debug!("{} already has a gold standard", core);
            return Ok(Blocks::new());
        }

        let blocks = self.block_manager.core_blocks(core);
        let mut missing = Blocks::new();
        let gt_slices = self.ground_truth.slices.get_slices_by_blocks(&blocks, &mut missing)?;
        let gt_descriptions = self.ground_truth.segments.get_segments_by_blocks(&blocks, &mut missing, false)?;
        let slices = self.membrane.slices.get_slices_by_blocks(&blocks, &mut missing)?;
        let descriptions = self.membrane.segments.get_segments_by_blocks(&blocks, &mut missing, false)?;
        let conflict_sets = self.membrane.slices.get_conflict_sets_by_blocks(&blocks, &mut missing)?;
        if !missing.is_empty() {
            debug!("cannot compute the gold standard of {}, {} blocks are not ready", core, missing.len());
            return Ok(missing);
        }
        let Some(labels) = self.labels.tile(&BlockManager::bounding_box(blocks.iter()))? else {
            debug!("no ground truth labels for {} yet", core);
            return Ok(blocks);
        };
        let explicit = self.membrane.segments.get_constraints_by_blocks(&blocks)?;

        let gt_segments = gt_descriptions.as_segments(&gt_slices)?;
        let segments = descriptions.as_segments(&slices)?;
        let cost = MergeCost::new(self.params.clone()).with_ground_truth(gt_segments.iter().map(|s| s.hash()));
        let costs = segments.iter().map(|s| (s.hash(), cost.cost(s, &labels))).collect::<HashMap<_, _>>();
        debug!(
            "{}: {} of {} segments reproduce one of {} ground truth segments",
            core,
            segments.iter().filter(|s| cost.reproduces_ground_truth(s)).count(),
            segments.len(),
            gt_segments.len()
        );

        let problem = ProblemAssembler::new(false).assemble(&descriptions, &conflict_sets, &explicit, &costs);
        let accepted = solve(self.solver.as_ref(), &problem, core)?;
        let solution = core_solution(self.membrane.segments.as_ref(), core, &blocks, &accepted, &descriptions)?;
        self.membrane.segments.store_gold_standard(&solution, core)?;
        self.membrane.segments.set_gold_standard_flag(core)?;
        info!("found the gold standard of {}: {} segments in {} assemblies", core, solution.segments.len(), solution.assemblies.len());
        Ok(Blocks::new())
    }
}
