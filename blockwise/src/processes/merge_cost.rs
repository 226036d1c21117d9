use crate::collaborators::ImageTile;
use sopnet_blockwise_core::{
    SegmentHash,
    config::params::GoldStandardParams,
    geometry::Point3,
    segment::{Segment, SegmentType},
};
use std::collections::{HashMap, HashSet};

/// Scores segments against a ground truth label volume: segments covering a single label are rewarded by the
/// number of pixel pairs they merge correctly, segments merging too many pixels of foreign labels are penalized.
/// Label 0 is background and ignored. Segments equal to one of the ground truth segments, i.e. made of the very
/// same slices, are rewarded on top.
pub struct MergeCost {
    params: GoldStandardParams,
    ground_truth: HashSet<SegmentHash>,
}

impl MergeCost {
    pub fn new(params: GoldStandardParams) -> Self {
        Self { params, ground_truth: HashSet::new() }
    }

    pub fn with_ground_truth(self, segments: impl IntoIterator<Item = SegmentHash>) -> Self {
        Self { ground_truth: segments.into_iter().collect(), ..self }
    }

    pub fn reproduces_ground_truth(&self, segment: &Segment) -> bool {
        self.ground_truth.contains(&segment.hash())
    }

    /// Returns (correctly merged, incorrectly merged) pixel counts of `segment`
    pub fn merge_counts(&self, segment: &Segment, labels: &ImageTile) -> (u64, u64) {
        let mut counts: HashMap<u32, u64> = HashMap::new();
        for slice in segment.slices() {
            for p in slice.component().pixels() {
                match labels.value(Point3::new(p.x, p.y, slice.section())) {
                    Some(label) if label != 0.0 => *counts.entry(label.to_bits()).or_default() += 1,
                    _ => {}
                }
            }
        }
        let total: u64 = counts.values().sum();
        let correct = counts.values().copied().max().unwrap_or_default();
        (correct, total - correct)
    }

    pub fn cost(&self, segment: &Segment, labels: &ImageTile) -> f64 {
        let (correct, incorrect) = self.merge_counts(segment, labels);
        let mut cost = if incorrect > self.params.incorrectly_merged_threshold {
            self.params.false_merge_costs
        } else {
            self.params.correctly_merged_pair_reward * (correct as f64) * (correct as f64)
        };
        if segment.segment_type() != SegmentType::End {
            cost -= self.params.composite_segment_bonus;
        }
        if self.reproduces_ground_truth(segment) {
            cost -= self.params.ground_truth_reward;
        }
        cost
    }
}
