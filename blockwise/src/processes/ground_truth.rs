use crate::collaborators::SegmentExtractor;
use sopnet_blockwise_core::{
    conflict::ConflictSets,
    segment::{Segment, Side},
    slice::Slice,
};
use sopnet_core::debug;
use std::{collections::HashMap, sync::Arc};

/// Links the slices of a ground truth labelling: slices carrying the same label are continued into each other,
/// closest centers first, as long as one of the two is still unexplained.
pub struct GroundTruthSegmentExtractor {
    max_distance: f64,
}

impl GroundTruthSegmentExtractor {
    pub fn new(max_distance: f64) -> Self {
        Self { max_distance }
    }
}

impl SegmentExtractor for GroundTruthSegmentExtractor {
    fn extract(&self, interval: u32, left: &[Arc<Slice>], right: &[Arc<Slice>], _conflicts: &ConflictSets) -> Vec<Segment> {
        let mut right_by_label: HashMap<u64, Vec<usize>> = HashMap::new();
        for (j, r) in right.iter().enumerate() {
            right_by_label.entry(r.component().value().to_bits()).or_default().push(j);
        }

        let mut candidates = Vec::new();
        for (i, l) in left.iter().enumerate() {
            for &j in right_by_label.get(&l.component().value().to_bits()).into_iter().flatten() {
                let distance = l.center().distance(&right[j].center());
                if distance <= self.max_distance {
                    candidates.push((distance, i, j));
                }
            }
        }
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

        let mut left_explained = vec![false; left.len()];
        let mut right_explained = vec![false; right.len()];
        let mut segments = Vec::new();
        for (_, i, j) in candidates {
            if left_explained[i] && right_explained[j] {
                continue;
            }
            left_explained[i] = true;
            right_explained[j] = true;
            segments.push(Segment::continuation(left[i].clone(), right[j].clone()));
        }
        let num_continuations = segments.len();

        segments.extend(left.iter().zip(&left_explained).filter(|(_, e)| !**e).map(|(l, _)| Segment::end(l.clone(), Side::Left)));
        segments.extend(right.iter().zip(&right_explained).filter(|(_, e)| !**e).map(|(r, _)| Segment::end(r.clone(), Side::Right)));

        debug!("Interval {interval}: {num_continuations} ground truth continuations, {} ends", segments.len() - num_continuations);
        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::labelled_square_slice;
    use sopnet_blockwise_core::segment::SegmentType;

    #[test]
    fn test_ground_truth_linking() {
        // Label 1 splits into two slices, label 2 ends, label 3 starts
        let left = [labelled_square_slice(0, 1.0, 0, 0, 4), labelled_square_slice(0, 2.0, 20, 0, 4)];
        let right = [
            labelled_square_slice(1, 1.0, 0, 0, 2),
            labelled_square_slice(1, 1.0, 3, 0, 2),
            labelled_square_slice(1, 3.0, 20, 0, 4),
        ];
        let segments = GroundTruthSegmentExtractor::new(100.0).extract(1, &left, &right, &ConflictSets::new());

        let continuations = segments.iter().filter(|s| s.segment_type() == SegmentType::Continuation).count();
        let ends = segments.iter().filter(|s| s.segment_type() == SegmentType::End).collect::<Vec<_>>();
        assert_eq!(2, continuations);
        assert_eq!(2, ends.len());
        assert!(ends.iter().any(|s| s.left_hashes().first() == Some(&left[1].hash())));
        assert!(ends.iter().any(|s| s.right_hashes().first() == Some(&right[2].hash())));

        // Too far apart to be linked
        let segments = GroundTruthSegmentExtractor::new(1.0).extract(1, &left[..1], &right[1..2], &ConflictSets::new());
        assert_eq!(2, segments.len());
        assert!(segments.iter().all(|s| s.segment_type() == SegmentType::End));
    }
}
