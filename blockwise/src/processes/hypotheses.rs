use crate::{
    collaborators::SegmentExtractor,
    processes::overlap::{OverlapMap, normalized_overlap},
};
use itertools::Itertools;
use sopnet_blockwise_core::{
    config::params::SegmentExtractionParams,
    conflict::ConflictSets,
    segment::{Segment, Side},
    slice::Slice,
};
use sopnet_core::{debug, trace};
use std::{collections::HashSet, sync::Arc};

/// Builds end, continuation and branch hypotheses from slice overlaps
pub struct SegmentHypothesisExtractor {
    params: SegmentExtractionParams,
}

impl SegmentHypothesisExtractor {
    pub fn new(params: SegmentExtractionParams) -> Self {
        Self { params }
    }

    fn try_branch(&self, single: &Arc<Slice>, targets: [&Arc<Slice>; 2], overlaps: [u64; 2], single_side: Side) -> Option<Segment> {
        let [a, b] = targets;
        let normalized = normalized_overlap(&[a.size(), b.size(), single.size()], overlaps[0] + overlaps[1]);
        if normalized > 1.0 {
            trace!(
                "Branch normalized overlap {normalized} > 1 (overlaps {} and {}, sizes {}, {} and {})",
                overlaps[0],
                overlaps[1],
                a.size(),
                b.size(),
                single.size()
            );
        }
        if normalized < self.params.branch_overlap_threshold {
            return None;
        }
        let size_ratio = a.size().min(b.size()) as f64 / a.size().max(b.size()).max(1) as f64;
        if size_ratio < self.params.branch_size_ratio_threshold {
            return None;
        }
        Some(Segment::branch(single.clone(), [a.clone(), b.clone()], single_side))
    }
}

impl SegmentExtractor for SegmentHypothesisExtractor {
    fn extract(&self, interval: u32, left: &[Arc<Slice>], right: &[Arc<Slice>], conflicts: &ConflictSets) -> Vec<Segment> {
        let overlaps = OverlapMap::new(left, right, self.params.overlap_threshold);
        let mut segments = Vec::new();

        // Continuations over the normalized overlap threshold
        let mut partners: HashSet<(usize, usize)> = HashSet::new();
        for (i, l) in left.iter().enumerate() {
            for &(j, overlap) in overlaps.partners_of_left(i) {
                if normalized_overlap(&[l.size(), right[j].size()], overlap) >= self.params.continuation_overlap_threshold {
                    partners.insert((i, j));
                    segments.push(Segment::continuation(l.clone(), right[j].clone()));
                }
            }
        }

        // Top up slices with too few partners, best overlaps first
        let min_partners = self.params.min_continuation_partners;
        if min_partners > 0 {
            for i in 0..left.len() {
                let mut count = partners.iter().filter(|(l, _)| *l == i).count();
                for &(j, _) in overlaps.partners_of_left(i).iter().sorted_by(|a, b| b.1.cmp(&a.1)) {
                    if count >= min_partners {
                        break;
                    }
                    if partners.insert((i, j)) {
                        segments.push(Segment::continuation(left[i].clone(), right[j].clone()));
                        count += 1;
                    }
                }
            }
            for j in 0..right.len() {
                let mut count = partners.iter().filter(|(_, r)| *r == j).count();
                for &(i, _) in overlaps.partners_of_right(j).iter().sorted_by(|a, b| b.1.cmp(&a.1)) {
                    if count >= min_partners {
                        break;
                    }
                    if partners.insert((i, j)) {
                        segments.push(Segment::continuation(left[i].clone(), right[j].clone()));
                        count += 1;
                    }
                }
            }
        }
        let num_continuations = segments.len();

        if self.params.enable_branches {
            for (i, l) in left.iter().enumerate() {
                for (&(a, oa), &(b, ob)) in overlaps.partners_of_left(i).iter().tuple_combinations() {
                    if conflicts.in_conflict(&right[a].hash(), &right[b].hash()) {
                        continue;
                    }
                    segments.extend(self.try_branch(l, [&right[a], &right[b]], [oa, ob], Side::Left));
                }
            }
            for (j, r) in right.iter().enumerate() {
                for (&(a, oa), &(b, ob)) in overlaps.partners_of_right(j).iter().tuple_combinations() {
                    if conflicts.in_conflict(&left[a].hash(), &left[b].hash()) {
                        continue;
                    }
                    segments.extend(self.try_branch(r, [&left[a], &left[b]], [oa, ob], Side::Right));
                }
            }
        }
        let num_branches = segments.len() - num_continuations;

        // Every slice may end on either side
        segments.extend(left.iter().map(|l| Segment::end(l.clone(), Side::Left)));
        segments.extend(right.iter().map(|r| Segment::end(r.clone(), Side::Right)));

        debug!(
            "Interval {interval}: {} overlapping pairs, {num_continuations} continuations, {num_branches} branches, {} ends",
            overlaps.num_pairs(),
            left.len() + right.len()
        );
        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{rect_slice, square_slice};
    use sopnet_blockwise_core::{conflict::ConflictSet, segment::SegmentType};

    fn count(segments: &[Segment], segment_type: SegmentType) -> usize {
        segments.iter().filter(|s| s.segment_type() == segment_type).count()
    }

    #[test]
    fn test_continuations_and_ends() {
        let left = [square_slice(0, 0, 0, 4), square_slice(0, 20, 20, 4)];
        // Identical to the first, and barely touching the second
        let right = [square_slice(1, 0, 0, 4), square_slice(1, 23, 23, 4)];
        let extractor = SegmentHypothesisExtractor::new(SegmentExtractionParams::default());
        let segments = extractor.extract(1, &left, &right, &ConflictSets::new());

        assert_eq!(1, count(&segments, SegmentType::Continuation));
        assert_eq!(4, count(&segments, SegmentType::End));
        assert_eq!(0, count(&segments, SegmentType::Branch));
        assert!(segments.iter().all(|s| s.interval() == 1));
    }

    #[test]
    fn test_min_partner_top_up() {
        let left = [square_slice(0, 0, 0, 4)];
        let right = [square_slice(1, 3, 3, 4), square_slice(1, 2, 2, 4)];
        let params = SegmentExtractionParams { min_continuation_partners: 1, enable_branches: false, ..Default::default() };
        let segments = SegmentHypothesisExtractor::new(params).extract(1, &left, &right, &ConflictSets::new());

        let continuations = segments.iter().filter(|s| s.segment_type() == SegmentType::Continuation).collect::<Vec<_>>();
        // The left slice gets its best partner. The weaker right slice then tops up with the only left slice.
        assert_eq!(2, continuations.len());
        assert_eq!(right[1].hash(), continuations[0].right_hashes()[0]);
    }

    #[test]
    fn test_branches() {
        let left = [rect_slice(0, 0, 0, 8, 4)];
        let right = [rect_slice(1, 0, 0, 4, 4), rect_slice(1, 4, 0, 4, 4)];
        let extractor = SegmentHypothesisExtractor::new(SegmentExtractionParams::default());

        let segments = extractor.extract(1, &left, &right, &ConflictSets::new());
        assert_eq!(1, count(&segments, SegmentType::Branch));
        let branch = segments.iter().find(|s| s.segment_type() == SegmentType::Branch).unwrap();
        assert_eq!(1, branch.left_slices().len());

        // Conflicting targets never form a branch
        let conflicts: ConflictSets = [ConflictSet::new([right[0].hash(), right[1].hash()])].into_iter().collect();
        assert_eq!(0, count(&extractor.extract(1, &left, &right, &conflicts), SegmentType::Branch));

        // Targets of too different sizes
        let uneven = [rect_slice(1, 0, 0, 7, 4), rect_slice(1, 7, 0, 1, 4)];
        assert_eq!(0, count(&extractor.extract(1, &left, &uneven, &ConflictSets::new()), SegmentType::Branch));

        let params = SegmentExtractionParams { enable_branches: false, ..Default::default() };
        assert_eq!(0, count(&SegmentHypothesisExtractor::new(params).extract(1, &left, &right, &ConflictSets::new()), SegmentType::Branch));
    }

    #[test]
    fn test_stack_borders() {
        let slices = [square_slice(0, 0, 0, 4), square_slice(0, 10, 0, 4)];
        let extractor = SegmentHypothesisExtractor::new(SegmentExtractionParams::default());
        let segments = extractor.extract(0, &[], &slices, &ConflictSets::new());
        assert_eq!(2, segments.len());
        assert!(segments.iter().all(|s| s.segment_type() == SegmentType::End && s.interval() == 0));
    }
}
