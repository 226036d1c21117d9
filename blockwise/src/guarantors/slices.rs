use crate::{
    collaborators::{ImageTileSource, SliceExtractor},
    errors::GuarantorResult,
    stores::SliceStore,
};
use sopnet_blockwise_core::{
    block_manager::BlockManager,
    blocks::{Block, Blocks},
    config::ProjectConfig,
    conflict::{ConflictSet, ConflictSets},
    geometry::Box3,
    slice::Slices,
};
use sopnet_core::{debug, info};
use std::{collections::HashSet, sync::Arc};

/// Extracts the slices and conflict sets of blocks. The only dependency of a block is its image tile.
pub struct SliceGuarantor {
    block_manager: BlockManager,
    store: Arc<dyn SliceStore>,
    images: Arc<dyn ImageTileSource>,
    extractor: Arc<dyn SliceExtractor>,
}

impl SliceGuarantor {
    pub fn new(
        config: &ProjectConfig,
        store: Arc<dyn SliceStore>,
        images: Arc<dyn ImageTileSource>,
        extractor: Arc<dyn SliceExtractor>,
    ) -> GuarantorResult<Self> {
        Ok(Self { block_manager: BlockManager::from_config(config)?, store, images, extractor })
    }

    /// Guarantees slices for every block overlapping `region`. Returns the blocks whose image data is not available.
    pub fn guarantee(&self, region: &Box3) -> GuarantorResult<Blocks> {
        let mut missing = Blocks::new();
        for block in self.block_manager.blocks_in_box(region) {
            missing.extend(self.guarantee_block(&block)?);
        }
        Ok(missing)
    }

    pub fn guarantee_block(&self, block: &Block) -> GuarantorResult<Blocks> {
        if self.store.slices_flag(block)? {
            debug!("{} already has slices", block);
            return Ok(Blocks::new());
        }
        let Some(tile) = self.images.tile(&block.bounding_box())? else {
            debug!("no image data for {} yet", block);
            return Ok(Blocks::from_iter([*block]));
        };

        let mut slices = Slices::new();
        let mut conflict_sets = ConflictSets::new();
        for section in block.sections() {
            let (section_slices, section_conflicts) = self.extractor.extract(&tile, section)?;
            slices.extend(section_slices);
            conflict_sets.extend(section_conflicts);
        }

        // Every slice takes part in at least one conflict set, so that the solver bounds its usage
        let covered = conflict_sets.iter().flat_map(|c| c.slices().copied()).collect::<HashSet<_>>();
        let uncovered = slices.hashes().filter(|h| !covered.contains(h)).collect::<Vec<_>>();
        conflict_sets.extend(uncovered.into_iter().map(|h| ConflictSet::new([h])));

        let slices = slices.into_iter().collect::<Vec<_>>();
        let conflict_sets = conflict_sets.iter().cloned().collect::<Vec<_>>();
        self.store.associate_slices_to_block(&slices, block)?;
        self.store.associate_conflict_sets_to_block(&conflict_sets, block)?;
        self.store.set_slices_flag(block)?;

        info!("extracted {} slices and {} conflict sets in {}", slices.len(), conflict_sets.len(), block);
        Ok(Blocks::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        collaborators::InMemoryVolume,
        processes::label_slices::LabelSliceExtractor,
        stores::memory::MemorySliceStore,
        test_helpers::{CountingSliceExtractor, GatedTileSource, two_objects_volume},
    };
    use sopnet_blockwise_core::geometry::Point3;

    fn config() -> ProjectConfig {
        ProjectConfig::new(Point3::new(20, 10, 4), Point3::new(10, 10, 2), Point3::ONE)
    }

    #[test]
    fn test_slices_are_extracted_once() {
        let store = Arc::new(MemorySliceStore::new());
        let extractor = Arc::new(CountingSliceExtractor::new(LabelSliceExtractor));
        let guarantor = SliceGuarantor::new(&config(), store.clone(), Arc::new(two_objects_volume(Point3::new(20, 10, 4))), extractor.clone())
            .unwrap();
        let block = BlockManager::from_config(&config()).unwrap().block_at_location(Point3::ZERO).unwrap();

        assert!(guarantor.guarantee_block(&block).unwrap().is_empty());
        assert_eq!(2, extractor.calls());
        let mut missing = Blocks::new();
        let first = store.get_slices_by_blocks(&Blocks::from_iter([block]), &mut missing).unwrap();
        assert!(missing.is_empty());
        assert!(!first.is_empty());

        assert!(guarantor.guarantee_block(&block).unwrap().is_empty());
        assert_eq!(2, extractor.calls());
        let second = store.get_slices_by_blocks(&Blocks::from_iter([block]), &mut missing).unwrap();
        assert_eq!(first.hashes().collect::<Vec<_>>(), second.hashes().collect::<Vec<_>>());

        // Every slice is bounded by some conflict set
        let conflict_sets = store.get_conflict_sets_by_blocks(&Blocks::from_iter([block]), &mut missing).unwrap();
        assert!(first.hashes().all(|h| conflict_sets.iter().any(|c| c.contains(&h))));
    }

    #[test]
    fn test_unavailable_images_are_missing() {
        let store = Arc::new(MemorySliceStore::new());
        let images = Arc::new(GatedTileSource::new(InMemoryVolume::from_fn(Point3::new(20, 10, 4), |_| 1.0)));
        let guarantor = SliceGuarantor::new(&config(), store.clone(), images.clone(), Arc::new(LabelSliceExtractor)).unwrap();
        let stack = BlockManager::from_config(&config()).unwrap().stack_box();

        let missing = guarantor.guarantee(&stack).unwrap();
        assert_eq!(4, missing.len());
        assert!(missing.iter().all(|b| !store.slices_flag(b).unwrap()));

        images.open();
        assert!(guarantor.guarantee(&stack).unwrap().is_empty());
        assert!(missing.iter().all(|b| store.slices_flag(b).unwrap()));
    }
}
