use crate::{
    errors::GuarantorResult,
    guarantors::{segments::SegmentGuarantor, slices::SliceGuarantor, solution::SolutionGuarantor},
};
use rayon::prelude::*;
use sopnet_blockwise_core::{
    block_manager::BlockManager,
    blocks::Blocks,
    config::ProjectConfig,
    geometry::Box3,
};
use sopnet_core::{debug, info, warn};

const DEFAULT_MAX_ROUNDS: usize = 8;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Blocks of the region
    pub blocks: usize,
    /// Cores of the region
    pub cores: usize,
    /// Blocks outside of the region that had to be filled as dependencies
    pub dependencies: usize,
    pub rounds: usize,
    /// Blocks still missing when the driver gave up, typically for lack of image data
    pub missing: Blocks,
}

impl BackfillReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Drives all guarantors over a region until every core in it is solved.
///
/// Each round guarantees slices, then segments, then solutions, each stage running over independent blocks
/// (or cores) in parallel. Missing blocks reported by a stage are added to the earlier stages of the next round.
/// Blocks outside of the region are filled as well when the padding of a core reaches them.
pub struct Backfill {
    block_manager: BlockManager,
    slices: SliceGuarantor,
    segments: SegmentGuarantor,
    solution: SolutionGuarantor,
    max_rounds: usize,
}

impl Backfill {
    pub fn new(config: &ProjectConfig, slices: SliceGuarantor, segments: SegmentGuarantor, solution: SolutionGuarantor) -> GuarantorResult<Self> {
        Ok(Self { block_manager: BlockManager::from_config(config)?, slices, segments, solution, max_rounds: DEFAULT_MAX_ROUNDS })
    }

    pub fn with_max_rounds(self, max_rounds: usize) -> Self {
        Self { max_rounds, ..self }
    }

    pub fn run(&self, region: &Box3) -> GuarantorResult<BackfillReport> {
        let blocks = self.block_manager.blocks_in_box(region);
        let cores = self.block_manager.cores_in_box(region).into_iter().collect::<Vec<_>>();
        let mut targets = blocks.clone();
        let mut report = BackfillReport { blocks: blocks.len(), cores: cores.len(), ..Default::default() };

        while report.rounds < self.max_rounds {
            report.rounds += 1;
            let current = targets.iter().copied().collect::<Vec<_>>();

            let images_missing = Self::merge(current.par_iter().map(|b| self.slices.guarantee_block(b)).collect::<GuarantorResult<Vec<_>>>()?);
            let slices_missing = Self::merge(current.par_iter().map(|b| self.segments.guarantee(b)).collect::<GuarantorResult<Vec<_>>>()?);
            let segments_missing = Self::merge(cores.par_iter().map(|c| self.solution.guarantee(c)).collect::<GuarantorResult<Vec<_>>>()?);
            debug!(
                "backfill round {}: {} blocks lack images, {} lack slices, {} lack segments",
                report.rounds,
                images_missing.len(),
                slices_missing.len(),
                segments_missing.len()
            );

            if slices_missing.is_empty() && segments_missing.is_empty() {
                report.missing = images_missing;
                break;
            }
            let before = targets.len();
            targets.extend(slices_missing.iter().chain(segments_missing.iter()).copied());
            if targets.len() == before && !images_missing.is_empty() {
                // Nothing new to fill, only image data can unblock the remaining blocks
                report.missing = images_missing;
                break;
            }
            report.missing = images_missing.into_iter().chain(slices_missing).chain(segments_missing).collect();
        }

        report.dependencies = targets.len() - blocks.len();
        if report.is_complete() {
            info!("backfilled {} ({} blocks, {} cores) in {} rounds", region, report.blocks, report.cores, report.rounds);
        } else {
            warn!("backfill of {} stopped after {} rounds with {} blocks missing", region, report.rounds, report.missing.len());
        }
        Ok(report)
    }

    fn merge(missing: Vec<Blocks>) -> Blocks {
        missing.into_iter().flatten().collect::<Blocks>()
    }
}
