use crate::{
    collaborators::{SegmentExtractor, SegmentFeaturesExtractor},
    errors::GuarantorResult,
    stores::{SegmentStore, SliceStore},
};
use sopnet_blockwise_core::{
    block_manager::BlockManager,
    blocks::{Block, Blocks},
    config::ProjectConfig,
    description::{SegmentDescription, SegmentDescriptions},
    geometry::Offset3,
    slice::{Slice, Slices},
};
use sopnet_core::{debug, info};
use std::sync::Arc;

/// Extracts the segment hypotheses of blocks.
///
/// A block spanning sections `[z0, z1)` owns the intervals `z0 + 1 ..= z1`, and interval 0 if it touches the
/// bottom of the stack. Interval `z1` reaches into the first section of the block above, whose slices are
/// therefore a dependency.
pub struct SegmentGuarantor {
    block_manager: BlockManager,
    slice_store: Arc<dyn SliceStore>,
    segment_store: Arc<dyn SegmentStore>,
    extractor: Arc<dyn SegmentExtractor>,
    features: Arc<dyn SegmentFeaturesExtractor>,
}

impl SegmentGuarantor {
    pub fn new(
        config: &ProjectConfig,
        slice_store: Arc<dyn SliceStore>,
        segment_store: Arc<dyn SegmentStore>,
        extractor: Arc<dyn SegmentExtractor>,
        features: Arc<dyn SegmentFeaturesExtractor>,
    ) -> GuarantorResult<Self> {
        Ok(Self { block_manager: BlockManager::from_config(config)?, slice_store, segment_store, extractor, features })
    }

    pub fn guarantee(&self, block: &Block) -> GuarantorResult<Blocks> {
        if self.segment_store.segments_flag(block)? {
            debug!("{} already has segments", block);
            return Ok(Blocks::new());
        }

        let mut required = Blocks::from_iter([*block]);
        required.extend(self.block_manager.block_at_offset(block, Offset3::new(0, 0, 1)));

        let mut missing = Blocks::new();
        let slices = self.slice_store.get_slices_by_blocks(&required, &mut missing)?;
        let conflict_sets = self.slice_store.get_conflict_sets_by_blocks(&required, &mut missing)?;
        if !missing.is_empty() {
            debug!("cannot extract segments of {}, {} blocks lack slices", block, missing.len());
            return Ok(missing);
        }

        let sections = block.sections();
        let first_interval = if sections.start == 0 { 0 } else { sections.start + 1 };
        let mut descriptions = SegmentDescriptions::new();
        for interval in first_interval..=sections.end {
            let left = Self::section_slices(&slices, interval.checked_sub(1));
            let right = Self::section_slices(&slices, Some(interval));
            for segment in self.extractor.extract(interval, &left, &right, &conflict_sets) {
                let features = self.features.features(&segment);
                descriptions.add(SegmentDescription::from_segment(&segment).with_features(features));
            }
        }

        self.segment_store.associate_segments_to_block(&descriptions, block)?;
        self.segment_store.set_segments_flag(block)?;
        info!("extracted {} segments from {} slices in {}", descriptions.len(), slices.len(), block);
        Ok(Blocks::new())
    }

    fn section_slices(slices: &Slices, section: Option<u32>) -> Vec<Arc<Slice>> {
        section.map(|z| slices.in_section(z).cloned().collect()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        guarantors::slices::SliceGuarantor,
        processes::{features::GeometricFeatures, hypotheses::SegmentHypothesisExtractor, label_slices::LabelSliceExtractor},
        stores::memory::{MemorySegmentStore, MemorySliceStore},
        test_helpers::two_objects_volume,
    };
    use sopnet_blockwise_core::{
        geometry::{Box3, Point3},
        segment::SegmentType,
    };

    struct Fixture {
        block_manager: BlockManager,
        slices: SliceGuarantor,
        segments: SegmentGuarantor,
        segment_store: Arc<MemorySegmentStore>,
    }

    fn fixture() -> Fixture {
        let config = ProjectConfig::new(Point3::new(20, 10, 4), Point3::new(20, 10, 2), Point3::ONE);
        let slice_store = Arc::new(MemorySliceStore::new());
        let segment_store = Arc::new(MemorySegmentStore::new());
        let volume = Arc::new(two_objects_volume(config.stack_size));
        Fixture {
            block_manager: BlockManager::from_config(&config).unwrap(),
            slices: SliceGuarantor::new(&config, slice_store.clone(), volume, Arc::new(LabelSliceExtractor)).unwrap(),
            segments: SegmentGuarantor::new(
                &config,
                slice_store,
                segment_store.clone(),
                Arc::new(SegmentHypothesisExtractor::new(config.segment_extraction.clone())),
                Arc::new(GeometricFeatures),
            )
            .unwrap(),
            segment_store,
        }
    }

    #[test]
    fn test_neighbour_slices_are_required() {
        let f = fixture();
        let bottom = f.block_manager.block_at_location(Point3::ZERO).unwrap();
        let top = f.block_manager.block_at_location(Point3::new(0, 0, 3)).unwrap();

        assert!(f.slices.guarantee_block(&bottom).unwrap().is_empty());
        assert_eq!(vec![top], f.segments.guarantee(&bottom).unwrap().into_iter().collect::<Vec<_>>());
        assert!(!f.segment_store.segments_flag(&bottom).unwrap());

        assert!(f.slices.guarantee_block(&top).unwrap().is_empty());
        assert!(f.segments.guarantee(&bottom).unwrap().is_empty());
        // The top block has no neighbour and only depends on itself
        assert!(f.segments.guarantee(&top).unwrap().is_empty());
    }

    #[test]
    fn test_intervals_cover_the_stack_once() {
        let f = fixture();
        assert!(f.slices.guarantee(&Box3::new(Point3::ZERO, Point3::new(20, 10, 4))).unwrap().is_empty());
        let blocks = f.block_manager.blocks_in_box(&f.block_manager.stack_box());
        for block in blocks.iter() {
            assert!(f.segments.guarantee(block).unwrap().is_empty());
        }

        let bottom = f.segment_store.get_segments_by_blocks(&Blocks::from_iter([blocks[0]]), &mut Blocks::new(), false).unwrap();
        let top = f.segment_store.get_segments_by_blocks(&Blocks::from_iter([blocks[1]]), &mut Blocks::new(), false).unwrap();
        let intervals = |d: &SegmentDescriptions| d.iter().map(|s| s.interval).collect::<std::collections::BTreeSet<_>>();
        assert_eq!(vec![0, 1, 2], intervals(&bottom).into_iter().collect::<Vec<_>>());
        assert_eq!(vec![3, 4], intervals(&top).into_iter().collect::<Vec<_>>());

        // Both objects run through all four sections, so each interval holds one continuation per object
        for interval in 1..4 {
            let all = bottom.iter().chain(top.iter()).filter(|d| d.interval == interval);
            assert_eq!(2, all.filter(|d| d.segment_type().unwrap() == SegmentType::Continuation).count());
        }
        let borders = bottom.iter().filter(|d| d.interval == 0).chain(top.iter().filter(|d| d.interval == 4));
        assert!(borders.clone().all(|d| d.segment_type().unwrap() == SegmentType::End));
        assert_eq!(4, borders.count());
        assert!(bottom.iter().all(|d| d.features.len() == GeometricFeatures::NUM_FEATURES));
    }
}
