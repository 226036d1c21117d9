use sopnet_blockwise_core::{SegmentHash, SliceHash, description::SegmentDescriptions};
use std::collections::{BTreeMap, HashMap};

struct UnionFind {
    parents: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self { parents: (0..len).collect() }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parents[i] != i {
            self.parents[i] = self.parents[self.parents[i]];
            i = self.parents[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parents[ra.max(rb)] = ra.min(rb);
        }
    }
}

/// Groups the accepted segments into assemblies: maximal sets of segments connected through shared slices.
///
/// Each assembly is sorted, and assemblies are ordered by their first segment. Segments unknown to `descriptions`
/// are ignored.
pub fn extract_assemblies(accepted: &[SegmentHash], descriptions: &SegmentDescriptions) -> Vec<Vec<SegmentHash>> {
    let segments = accepted.iter().filter_map(|h| descriptions.get(h)).collect::<Vec<_>>();

    let mut slice_indices: HashMap<SliceHash, usize> = HashMap::new();
    for description in segments.iter() {
        for slice in description.slices() {
            let next = slice_indices.len();
            slice_indices.entry(*slice).or_insert(next);
        }
    }

    let mut sets = UnionFind::new(slice_indices.len());
    for description in segments.iter() {
        let mut slices = description.slices().map(|s| slice_indices[s]);
        if let Some(first) = slices.next() {
            for other in slices {
                sets.union(first, other);
            }
        }
    }

    let mut assemblies: BTreeMap<usize, Vec<SegmentHash>> = BTreeMap::new();
    for description in segments.iter() {
        let Some(first) = description.slices().next() else { continue };
        let root = sets.find(slice_indices[first]);
        assemblies.entry(root).or_default().push(description.hash);
    }

    let mut assemblies = assemblies.into_values().collect::<Vec<_>>();
    for assembly in assemblies.iter_mut() {
        assembly.sort_unstable();
        assembly.dedup();
    }
    assemblies.sort_unstable();
    assemblies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{continuation, end, square_slice};
    use sopnet_blockwise_core::{description::SegmentDescription, segment::Side};

    #[test]
    fn test_two_assemblies() {
        let (a0, a1) = (square_slice(0, 0, 0, 2), square_slice(1, 0, 0, 2));
        let (b0, b1) = (square_slice(0, 10, 0, 2), square_slice(1, 10, 0, 2));
        let segments = [
            end(&a0, Side::Right),
            continuation(&a0, &a1),
            end(&a1, Side::Left),
            end(&b0, Side::Right),
            continuation(&b0, &b1),
            end(&b1, Side::Left),
        ];
        let descriptions: SegmentDescriptions = segments.iter().map(SegmentDescription::from_segment).collect();
        let accepted = segments.iter().map(|s| s.hash()).collect::<Vec<_>>();

        let assemblies = extract_assemblies(&accepted, &descriptions);
        assert_eq!(2, assemblies.len());
        assert_eq!(6, assemblies.iter().map(Vec::len).sum::<usize>());
        let mut first = segments[..3].iter().map(|s| s.hash()).collect::<Vec<_>>();
        first.sort_unstable();
        assert!(assemblies.contains(&first));

        // Without the continuation, `a` falls apart into two assemblies
        let partial = [accepted[0], accepted[2]];
        assert_eq!(2, extract_assemblies(&partial, &descriptions).len());
        assert!(extract_assemblies(&[], &descriptions).is_empty());
    }
}
