mod common;

use common::{CONTINUATION_WEIGHTS, Pipeline, column_config, slice_usage};
use sopnet_blockwise::{
    processes::label_slices::LabelSliceExtractor,
    stores::{CoreSolution, factory::Stores},
    test_helpers::{CountingSliceExtractor, GatedTileSource, two_objects_volume},
};
use sopnet_blockwise_core::{blocks::Blocks, geometry::Point3};
use sopnet_database::{create_temp_db, prelude::ConnBuilder};
use std::sync::Arc;

fn run_pipeline(pipeline: &Pipeline) {
    pipeline.stores.segments.store_feature_weights(&CONTINUATION_WEIGHTS).unwrap();
    let volume = Arc::new(two_objects_volume(pipeline.config.stack_size));
    let report = pipeline.backfill(volume, Arc::new(LabelSliceExtractor)).run(&pipeline.block_manager.stack_box()).unwrap();
    assert!(report.is_complete());
    assert_eq!((4, 4, 0), (report.blocks, report.cores, report.dependencies));
}

fn assert_conserved(pipeline: &Pipeline) {
    let descriptions = pipeline.all_descriptions();
    let solutions = pipeline.all_solutions();
    let accepted = solutions.iter().flat_map(|s| s.segments.iter().copied()).collect::<Vec<_>>();

    // Two objects through four sections: one right end, three continuations and one left end each
    assert_eq!(10, accepted.len());
    let usage = slice_usage(&accepted, &descriptions);
    assert_eq!(8, usage.len());
    assert!(usage.values().all(|u| *u == (1, 1)), "{usage:?}");

    // Every single block core holds one object, hence one assembly
    assert!(solutions.iter().all(|s| s.assemblies.len() == 1));
}

#[test]
fn test_forced_explanation_conserves_slices() {
    let pipeline = Pipeline::in_memory(column_config());
    run_pipeline(&pipeline);
    assert_conserved(&pipeline);
}

#[test]
fn test_rocksdb_pipeline() {
    let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
    let config = column_config();
    let stores = Stores::in_db(db, &config.cache);
    let pipeline = Pipeline::new(config, stores.membrane.clone());
    run_pipeline(&pipeline);
    assert_conserved(&pipeline);

    // Ground truth data lives in its own namespace
    let mut missing = Blocks::new();
    stores.ground_truth.slices.get_slices_by_blocks(&pipeline.all_blocks(), &mut missing).unwrap();
    assert_eq!(4, missing.len());
}

#[test]
fn test_stored_descriptions_match_their_segments() {
    let pipeline = Pipeline::in_memory(column_config());
    run_pipeline(&pipeline);

    let mut missing = Blocks::new();
    let slices = pipeline.stores.slices.get_slices_by_blocks(&pipeline.all_blocks(), &mut missing).unwrap();
    let descriptions = pipeline.all_descriptions();
    assert!(!descriptions.is_empty());
    for description in descriptions.iter() {
        assert_eq!(description.hash, description.as_segment(&slices).unwrap().hash());
        assert_eq!(description.hash, description.compute_hash());
    }
}

#[test]
fn test_backfill_fills_padding_dependencies() {
    let pipeline = Pipeline::in_memory(column_config());
    pipeline.stores.segments.store_feature_weights(&CONTINUATION_WEIGHTS).unwrap();
    let volume = Arc::new(two_objects_volume(pipeline.config.stack_size));
    let backfill = pipeline.backfill(volume, Arc::new(LabelSliceExtractor));

    // The first core is padded by its x neighbour, and both need the slices of the blocks above for segments
    let first = pipeline.block_manager.core_at_location(Point3::ZERO).unwrap();
    let report = backfill.run(&first.bounding_box()).unwrap();
    assert!(report.is_complete());
    assert_eq!((1, 1, 3, 3), (report.blocks, report.cores, report.dependencies, report.rounds));
    assert!(pipeline.stores.segments.solution_flag(&first).unwrap());

    // Other cores were not requested
    let second = pipeline.block_manager.core_at_location(Point3::new(10, 0, 0)).unwrap();
    assert!(!pipeline.stores.segments.solution_flag(&second).unwrap());
}

#[test]
fn test_backfill_waits_for_images() {
    let pipeline = Pipeline::in_memory(column_config());
    pipeline.stores.segments.store_feature_weights(&CONTINUATION_WEIGHTS).unwrap();
    let images = Arc::new(GatedTileSource::new(two_objects_volume(pipeline.config.stack_size)));
    let extractor = Arc::new(CountingSliceExtractor::new(LabelSliceExtractor));
    let backfill = pipeline.backfill(images.clone(), extractor.clone());
    let stack = pipeline.block_manager.stack_box();

    let report = backfill.run(&stack).unwrap();
    assert!(!report.is_complete());
    assert_eq!(1, report.rounds);
    assert_eq!(pipeline.all_blocks(), report.missing);
    assert_eq!(0, extractor.calls());

    images.open();
    let report = backfill.run(&stack).unwrap();
    assert!(report.is_complete());
    // Two sections in each of the four blocks
    assert_eq!(8, extractor.calls());

    // Everything is flagged now, a third run extracts nothing
    assert!(backfill.run(&stack).unwrap().is_complete());
    assert_eq!(8, extractor.calls());
}

#[test]
fn test_solution_serialization() {
    let pipeline = Pipeline::in_memory(column_config());
    run_pipeline(&pipeline);
    for solution in pipeline.all_solutions() {
        let json = serde_json::to_string(&solution).unwrap();
        assert_eq!(solution, serde_json::from_str::<CoreSolution>(&json).unwrap());
    }
}
