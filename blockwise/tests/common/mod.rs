use sopnet_blockwise::{
    backfill::Backfill,
    collaborators::{ImageTileSource, SliceExtractor},
    guarantors::{segments::SegmentGuarantor, slices::SliceGuarantor, solution::SolutionGuarantor},
    processes::{features::GeometricFeatures, hypotheses::SegmentHypothesisExtractor},
    stores::{
        CoreSolution,
        factory::{StoreSet, Stores},
    },
    test_helpers::BranchAndBoundSolver,
};
use sopnet_blockwise_core::{
    SegmentHash, SliceHash,
    block_manager::BlockManager,
    blocks::Blocks,
    config::{ConfigBuilder, ProjectConfig},
    description::SegmentDescriptions,
    geometry::Point3,
};
use std::{collections::HashMap, sync::Arc};

/// Weights of the geometric features favouring continuations over ends
pub const CONTINUATION_WEIGHTS: [f64; 8] = [5.0, -5.0, 5.0, 0.0, 0.1, -1.0, 0.1, 0.0];

/// Stack (20, 10, 4) in blocks of (10, 10, 2), one block per core, solved with forced explanation
pub fn column_config() -> ProjectConfig {
    ConfigBuilder::new(Point3::new(20, 10, 4), Point3::new(10, 10, 2), Point3::ONE).force_explanation().build()
}

/// The membrane pipeline of a project, wired to `stores`
pub struct Pipeline {
    pub config: ProjectConfig,
    pub block_manager: BlockManager,
    pub stores: StoreSet,
}

impl Pipeline {
    pub fn new(config: ProjectConfig, stores: StoreSet) -> Self {
        sopnet_core::log::try_init_logger("info,sopnet_blockwise=debug");
        Self { block_manager: BlockManager::from_config(&config).unwrap(), config, stores }
    }

    pub fn in_memory(config: ProjectConfig) -> Self {
        Self::new(config, Stores::in_memory().membrane)
    }

    pub fn slice_guarantor(&self, images: Arc<dyn ImageTileSource>, extractor: Arc<dyn SliceExtractor>) -> SliceGuarantor {
        SliceGuarantor::new(&self.config, self.stores.slices.clone(), images, extractor).unwrap()
    }

    pub fn segment_guarantor(&self) -> SegmentGuarantor {
        SegmentGuarantor::new(
            &self.config,
            self.stores.slices.clone(),
            self.stores.segments.clone(),
            Arc::new(SegmentHypothesisExtractor::new(self.config.segment_extraction.clone())),
            Arc::new(GeometricFeatures),
        )
        .unwrap()
    }

    pub fn solution_guarantor(&self) -> SolutionGuarantor {
        SolutionGuarantor::new(&self.config, self.stores.slices.clone(), self.stores.segments.clone(), Arc::new(BranchAndBoundSolver))
            .unwrap()
    }

    pub fn backfill(&self, images: Arc<dyn ImageTileSource>, extractor: Arc<dyn SliceExtractor>) -> Backfill {
        Backfill::new(&self.config, self.slice_guarantor(images, extractor), self.segment_guarantor(), self.solution_guarantor()).unwrap()
    }

    pub fn all_blocks(&self) -> Blocks {
        self.block_manager.blocks_in_box(&self.block_manager.stack_box())
    }

    pub fn all_descriptions(&self) -> SegmentDescriptions {
        let mut missing = Blocks::new();
        let descriptions = self.stores.segments.get_segments_by_blocks(&self.all_blocks(), &mut missing, false).unwrap();
        assert!(missing.is_empty());
        descriptions
    }

    pub fn all_solutions(&self) -> Vec<CoreSolution> {
        self.block_manager
            .cores_in_box(&self.block_manager.stack_box())
            .iter()
            .map(|core| self.stores.segments.get_solution(core).unwrap().unwrap())
            .collect()
    }
}

/// For every slice referenced by `accepted`: (number of accepted segments using it on the left, on the right)
pub fn slice_usage(accepted: &[SegmentHash], descriptions: &SegmentDescriptions) -> HashMap<SliceHash, (usize, usize)> {
    let mut usage: HashMap<SliceHash, (usize, usize)> = HashMap::new();
    for description in accepted.iter().map(|h| descriptions.get(h).unwrap()) {
        for slice in description.left_slices.iter() {
            usage.entry(*slice).or_default().0 += 1;
        }
        for slice in description.right_slices.iter() {
            usage.entry(*slice).or_default().1 += 1;
        }
    }
    usage
}
