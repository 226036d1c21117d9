use crate::collaborators::SegmentFeaturesExtractor;
use sopnet_blockwise_core::{
    geometry::Point2f,
    segment::{Segment, SegmentType},
    slice::Slice,
};
use std::sync::Arc;

const FEATURE_NAMES: [&str; 8] =
    ["is_end", "is_continuation", "is_branch", "size", "size_difference", "overlap_ratio", "center_distance", "bias"];

/// Shape features computed from the slices of a segment alone
#[derive(Clone, Copy, Debug, Default)]
pub struct GeometricFeatures;

impl GeometricFeatures {
    pub const NUM_FEATURES: usize = FEATURE_NAMES.len();
}

fn size_weighted_center<'a>(slices: impl Iterator<Item = &'a Arc<Slice>>) -> (f64, Point2f) {
    let (mut size, mut x, mut y) = (0f64, 0f64, 0f64);
    for slice in slices {
        let s = slice.size() as f64;
        size += s;
        x += slice.center().x * s;
        y += slice.center().y * s;
    }
    if size == 0.0 { (0.0, Point2f::default()) } else { (size, Point2f::new(x / size, y / size)) }
}

impl SegmentFeaturesExtractor for GeometricFeatures {
    fn features(&self, segment: &Segment) -> Vec<f64> {
        let left = segment.left_slices();
        let right = segment.right_slices();
        let (left_size, left_center) = size_weighted_center(left.iter().copied());
        let (right_size, right_center) = size_weighted_center(right.iter().copied());

        let (overlap_ratio, center_distance) = if left.is_empty() || right.is_empty() {
            (0.0, 0.0)
        } else {
            let overlap: usize = left.iter().flat_map(|l| right.iter().map(move |r| l.overlap(r))).sum();
            let union = left_size + right_size - overlap as f64;
            (if union > 0.0 { overlap as f64 / union } else { 0.0 }, left_center.distance(&right_center))
        };

        let segment_type = segment.segment_type();
        vec![
            (segment_type == SegmentType::End) as u8 as f64,
            (segment_type == SegmentType::Continuation) as u8 as f64,
            (segment_type == SegmentType::Branch) as u8 as f64,
            left_size + right_size,
            (left_size - right_size).abs(),
            overlap_ratio,
            center_distance,
            1.0,
        ]
    }

    fn feature_names(&self) -> Vec<String> {
        FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    }
}
