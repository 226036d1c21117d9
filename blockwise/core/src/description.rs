use crate::{
    SegmentHash, SliceHash,
    errors::{ModelError, ModelResult},
    geometry::{Point2f, Rect},
    segment::{Direction, Segment, SegmentType, segment_hash},
    slice::{Slice, Slices},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use sopnet_utils::mem_size::MemSizeEstimator;
use std::{mem::size_of, sync::Arc};

/// The store-side projection of a [`Segment`]: slices are referenced by hash only, so a description can be read
/// and solved over without the slice pixels being available.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentDescription {
    pub hash: SegmentHash,
    pub interval: u32,
    pub left_slices: SmallVec<[SliceHash; 2]>,
    pub right_slices: SmallVec<[SliceHash; 2]>,
    pub bounding_box: Rect,
    pub center: Point2f,
    pub features: Vec<f64>,
    pub cost: Option<f64>,
}

impl SegmentDescription {
    pub fn from_segment(segment: &Segment) -> Self {
        Self {
            hash: segment.hash(),
            interval: segment.interval(),
            left_slices: segment.left_hashes(),
            right_slices: segment.right_hashes(),
            bounding_box: segment.bounding_box(),
            center: segment.center(),
            features: Vec::new(),
            cost: None,
        }
    }

    pub fn with_features(mut self, features: Vec<f64>) -> Self {
        self.features = features;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn segment_type(&self) -> ModelResult<SegmentType> {
        SegmentType::from_counts(self.left_slices.len(), self.right_slices.len())
    }

    pub fn direction(&self) -> ModelResult<Direction> {
        Direction::from_counts(self.left_slices.len(), self.right_slices.len())
    }

    /// The hash implied by the slice lists
    pub fn compute_hash(&self) -> SegmentHash {
        segment_hash(&self.left_slices, &self.right_slices)
    }

    /// Verifies that the slice lists reproduce the stored hash
    pub fn verify(&self) -> ModelResult<()> {
        let computed = self.compute_hash();
        if computed != self.hash {
            return Err(ModelError::HashMismatch { stored: self.hash, computed });
        }
        Ok(())
    }

    /// All slices referenced by this segment, left first
    pub fn slices(&self) -> impl Iterator<Item = &SliceHash> {
        self.left_slices.iter().chain(self.right_slices.iter())
    }

    /// Rebuilds the full segment from locally available slices. The rebuilt segment is guaranteed to carry the
    /// hash of this description.
    pub fn as_segment(&self, slices: &Slices) -> ModelResult<Segment> {
        self.verify()?;
        let resolve = |hashes: &[SliceHash]| -> ModelResult<SmallVec<[Arc<Slice>; 2]>> {
            hashes
                .iter()
                .map(|h| slices.get(h).cloned().ok_or(ModelError::MissingSlice { segment: self.hash, slice: *h }))
                .collect()
        };
        let segment = Segment::from_slices(self.interval, &resolve(&self.left_slices)?, &resolve(&self.right_slices)?)?;
        if segment.hash() != self.hash {
            return Err(ModelError::HashMismatch { stored: self.hash, computed: segment.hash() });
        }
        Ok(segment)
    }
}

impl MemSizeEstimator for SegmentDescription {
    fn estimate_mem_bytes(&self) -> usize {
        size_of::<Self>() + self.features.capacity() * size_of::<f64>()
    }
}

/// Segment descriptions deduplicated by hash, iterating in insertion order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SegmentDescriptions {
    inner: IndexMap<SegmentHash, SegmentDescription>,
}

impl SegmentDescriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `description` unless one of equal hash is present. Returns whether it was added.
    pub fn add(&mut self, description: SegmentDescription) -> bool {
        match self.inner.entry(description.hash) {
            indexmap::map::Entry::Occupied(_) => false,
            indexmap::map::Entry::Vacant(e) => {
                e.insert(description);
                true
            }
        }
    }

    pub fn get(&self, hash: &SegmentHash) -> Option<&SegmentDescription> {
        self.inner.get(hash)
    }

    pub fn get_mut(&mut self, hash: &SegmentHash) -> Option<&mut SegmentDescription> {
        self.inner.get_mut(hash)
    }

    pub fn contains(&self, hash: &SegmentHash) -> bool {
        self.inner.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SegmentDescription> {
        self.inner.values()
    }

    pub fn hashes(&self) -> impl Iterator<Item = SegmentHash> + '_ {
        self.inner.keys().copied()
    }

    /// Rebuilds all segments, failing on the first description whose slices are missing or whose hash does not
    /// re-derive
    pub fn as_segments(&self, slices: &Slices) -> ModelResult<Vec<Segment>> {
        self.inner.values().map(|d| d.as_segment(slices)).collect()
    }
}

impl Extend<SegmentDescription> for SegmentDescriptions {
    fn extend<T: IntoIterator<Item = SegmentDescription>>(&mut self, iter: T) {
        for description in iter {
            self.add(description);
        }
    }
}

impl FromIterator<SegmentDescription> for SegmentDescriptions {
    fn from_iter<T: IntoIterator<Item = SegmentDescription>>(iter: T) -> Self {
        let mut descriptions = SegmentDescriptions::new();
        descriptions.extend(iter);
        descriptions
    }
}

impl IntoIterator for SegmentDescriptions {
    type Item = SegmentDescription;
    type IntoIter = indexmap::map::IntoValues<SegmentHash, SegmentDescription>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::Point2,
        segment::Side,
        slice::{ConnectedComponent, Slice},
    };

    fn slice(section: u32, x: u32) -> Arc<Slice> {
        let pixels = (x..x + 3).flat_map(|x| (0..3).map(move |y| Point2::new(x, y))).collect();
        Arc::new(Slice::new(section, ConnectedComponent::new(1.0, pixels)))
    }

    #[test]
    fn test_round_trip_preserves_hash() {
        let (a, b, c) = (slice(0, 0), slice(1, 0), slice(1, 4));
        let slices: Slices = [a.clone(), b.clone(), c.clone()].into_iter().collect();

        for segment in [
            Segment::end(a.clone(), Side::Left),
            Segment::end(b.clone(), Side::Right),
            Segment::continuation(a.clone(), c.clone()),
            Segment::branch(a.clone(), [c.clone(), b.clone()], Side::Left),
        ] {
            let description = SegmentDescription::from_segment(&segment);
            assert_eq!(segment.segment_type(), description.segment_type().unwrap());
            assert_eq!(segment.direction(), description.direction().unwrap());
            assert_eq!(segment.hash(), description.as_segment(&slices).unwrap().hash());
        }
    }

    #[test]
    fn test_integrity_violations() {
        let (a, b) = (slice(0, 0), slice(1, 0));
        let segment = Segment::continuation(a.clone(), b.clone());
        let mut description = SegmentDescription::from_segment(&segment);

        let only_a: Slices = [a.clone()].into_iter().collect();
        assert_eq!(
            Err(ModelError::MissingSlice { segment: segment.hash(), slice: b.hash() }),
            description.as_segment(&only_a).map(|s| s.hash())
        );

        // A tampered slice list no longer reproduces the stored hash
        description.right_slices.clear();
        let slices: Slices = [a, b].into_iter().collect();
        assert!(matches!(description.as_segment(&slices), Err(ModelError::HashMismatch { .. })));
    }

    #[test]
    fn test_descriptions_dedup() {
        let (a, b) = (slice(0, 0), slice(1, 0));
        let first = SegmentDescription::from_segment(&Segment::continuation(a.clone(), b.clone())).with_cost(2.0);
        let second = SegmentDescription::from_segment(&Segment::continuation(a, b));
        let descriptions: SegmentDescriptions = [first, second].into_iter().collect();
        assert_eq!(1, descriptions.len());
        assert_eq!(Some(2.0), descriptions.iter().next().unwrap().cost);
    }
}
