use crate::{
    SliceHash,
    geometry::{Point2, Point2f, Rect},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sopnet_hashes::{HasherBase, HasherExtensions, SliceHasher};
use sopnet_utils::mem_size::MemSizeEstimator;
use std::{cmp::Ordering, mem::size_of, sync::Arc};

/// A 2D set of pixels within one section, as found by a slice extractor.
///
/// Pixels are kept sorted and free of duplicates, which makes the pixel list a canonical identity of the component
/// and allows intersections to be computed with a linear merge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectedComponent {
    /// The image value (threshold or label) the component was extracted at
    value: f64,
    pixels: Arc<Vec<Point2>>,
    bounding_box: Rect,
    center: Point2f,
}

impl ConnectedComponent {
    pub fn new(value: f64, mut pixels: Vec<Point2>) -> Self {
        pixels.sort_unstable_by_key(|p| (p.y, p.x));
        pixels.dedup();

        let mut bounding_box = Rect::empty();
        let (mut sx, mut sy) = (0f64, 0f64);
        for p in pixels.iter() {
            bounding_box.fit_pixel(*p);
            sx += p.x as f64;
            sy += p.y as f64;
        }
        let center = if pixels.is_empty() {
            Point2f::default()
        } else {
            Point2f::new(sx / pixels.len() as f64, sy / pixels.len() as f64)
        };

        Self { value, pixels: Arc::new(pixels), bounding_box, center }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn pixels(&self) -> &[Point2] {
        &self.pixels
    }

    pub fn size(&self) -> usize {
        self.pixels.len()
    }

    pub fn bounding_box(&self) -> Rect {
        self.bounding_box
    }

    pub fn center(&self) -> Point2f {
        self.center
    }

    /// Number of pixels shared with `other`
    pub fn intersection_count(&self, other: &ConnectedComponent) -> usize {
        if !self.bounding_box.intersects(&other.bounding_box) {
            return 0;
        }
        let (mut a, mut b) = (self.pixels.iter().peekable(), other.pixels.iter().peekable());
        let mut count = 0;
        while let (Some(p), Some(q)) = (a.peek(), b.peek()) {
            match (p.y, p.x).cmp(&(q.y, q.x)) {
                Ordering::Less => {
                    a.next();
                }
                Ordering::Greater => {
                    b.next();
                }
                Ordering::Equal => {
                    count += 1;
                    a.next();
                    b.next();
                }
            }
        }
        count
    }
}

/// A connected component within a section, addressed by the hash of its section and pixels
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Slice {
    hash: SliceHash,
    section: u32,
    component: ConnectedComponent,
}

impl Slice {
    pub fn new(section: u32, component: ConnectedComponent) -> Self {
        Self { hash: Self::compute_hash(section, &component), section, component }
    }

    pub fn compute_hash(section: u32, component: &ConnectedComponent) -> SliceHash {
        let mut hasher = SliceHasher::new();
        hasher.write_u32(section).write_u64(component.size() as u64);
        for p in component.pixels() {
            hasher.write_u32(p.x).write_u32(p.y);
        }
        hasher.finalize()
    }

    pub fn hash(&self) -> SliceHash {
        self.hash
    }

    pub fn section(&self) -> u32 {
        self.section
    }

    pub fn component(&self) -> &ConnectedComponent {
        &self.component
    }

    pub fn size(&self) -> usize {
        self.component.size()
    }

    pub fn bounding_box(&self) -> Rect {
        self.component.bounding_box()
    }

    pub fn center(&self) -> Point2f {
        self.component.center()
    }

    /// Pixel overlap with a slice of any section
    pub fn overlap(&self, other: &Slice) -> usize {
        self.component.intersection_count(&other.component)
    }
}

impl PartialEq for Slice {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Slice {}

impl std::hash::Hash for Slice {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl MemSizeEstimator for Slice {
    fn estimate_mem_bytes(&self) -> usize {
        size_of::<Self>() + self.component.size() * size_of::<Point2>()
    }
}

/// A collection of slices, deduplicated by hash, iterating in insertion order
#[derive(Clone, Debug, Default)]
pub struct Slices {
    inner: IndexMap<SliceHash, Arc<Slice>>,
}

impl Slices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `slice` unless a slice of equal hash is already present. Returns whether it was added.
    pub fn add(&mut self, slice: Arc<Slice>) -> bool {
        match self.inner.entry(slice.hash()) {
            indexmap::map::Entry::Occupied(_) => false,
            indexmap::map::Entry::Vacant(e) => {
                e.insert(slice);
                true
            }
        }
    }

    pub fn get(&self, hash: &SliceHash) -> Option<&Arc<Slice>> {
        self.inner.get(hash)
    }

    pub fn contains(&self, hash: &SliceHash) -> bool {
        self.inner.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Slice>> {
        self.inner.values()
    }

    pub fn hashes(&self) -> impl Iterator<Item = SliceHash> + '_ {
        self.inner.keys().copied()
    }

    /// The slices of one section
    pub fn in_section(&self, section: u32) -> impl Iterator<Item = &Arc<Slice>> {
        self.inner.values().filter(move |s| s.section() == section)
    }
}

impl Extend<Arc<Slice>> for Slices {
    fn extend<T: IntoIterator<Item = Arc<Slice>>>(&mut self, iter: T) {
        for slice in iter {
            self.add(slice);
        }
    }
}

impl FromIterator<Arc<Slice>> for Slices {
    fn from_iter<T: IntoIterator<Item = Arc<Slice>>>(iter: T) -> Self {
        let mut slices = Slices::new();
        slices.extend(iter);
        slices
    }
}

impl IntoIterator for Slices {
    type Item = Arc<Slice>;
    type IntoIter = indexmap::map::IntoValues<SliceHash, Arc<Slice>>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: u32, y: u32, side: u32) -> Vec<Point2> {
        (y..y + side).flat_map(|y| (x..x + side).map(move |x| Point2::new(x, y))).collect()
    }

    #[test]
    fn test_component_geometry() {
        let c = ConnectedComponent::new(1.0, square(2, 4, 3));
        assert_eq!(9, c.size());
        assert_eq!(Rect::new(2, 4, 5, 7), c.bounding_box());
        assert_eq!(Point2f::new(3.0, 5.0), c.center());

        let d = ConnectedComponent::new(1.0, square(4, 6, 3));
        assert_eq!(1, c.intersection_count(&d));
        assert_eq!(9, c.intersection_count(&c));
        assert_eq!(0, c.intersection_count(&ConnectedComponent::new(1.0, square(10, 10, 2))));
    }

    #[test]
    fn test_slice_identity() {
        let mut pixels = square(0, 0, 4);
        let a = Slice::new(3, ConnectedComponent::new(1.0, pixels.clone()));
        pixels.reverse();
        pixels.push(Point2::new(0, 0));
        // Pixel order, duplicates and the component value do not affect identity
        let b = Slice::new(3, ConnectedComponent::new(7.0, pixels.clone()));
        assert_eq!(a, b);
        assert_eq!(a.hash(), b.hash());

        let c = Slice::new(4, ConnectedComponent::new(1.0, pixels));
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn test_slices_dedup() {
        let a = Arc::new(Slice::new(0, ConnectedComponent::new(1.0, square(0, 0, 2))));
        let b = Arc::new(Slice::new(1, ConnectedComponent::new(1.0, square(0, 0, 2))));
        let mut slices = Slices::new();
        assert!(slices.add(a.clone()));
        assert!(!slices.add(Arc::new((*a).clone())));
        slices.extend([b.clone()]);
        assert_eq!(2, slices.len());
        assert_eq!(vec![b.hash()], slices.in_section(1).map(|s| s.hash()).collect::<Vec<_>>());
        assert!(slices.contains(&a.hash()));
    }
}
