use crate::{
    SegmentHash, SliceHash,
    errors::{ModelError, ModelResult},
    geometry::{Point2f, Rect},
    slice::Slice,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use sopnet_hashes::{HasherExtensions, SegmentHasher};
use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentType {
    End,
    Continuation,
    Branch,
}

/// The side of an interval a slice lies on. Left is the lower section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
}

impl SegmentType {
    /// The segment type of a shape with the given slice counts per side
    pub fn from_counts(left: usize, right: usize) -> ModelResult<Self> {
        match (left, right) {
            (1, 0) | (0, 1) => Ok(SegmentType::End),
            (1, 1) => Ok(SegmentType::Continuation),
            (1, 2) | (2, 1) => Ok(SegmentType::Branch),
            _ => Err(ModelError::InvalidShape { left, right }),
        }
    }
}

impl Direction {
    /// An end points away from its slice, a branch points towards its pair and continuations point left
    pub fn from_counts(left: usize, right: usize) -> ModelResult<Self> {
        match (left, right) {
            (1, 0) => Ok(Direction::Right),
            (0, 1) | (1, 1) | (2, 1) => Ok(Direction::Left),
            (1, 2) => Ok(Direction::Right),
            _ => Err(ModelError::InvalidShape { left, right }),
        }
    }
}

#[derive(Clone, Debug)]
pub enum SegmentShape {
    End { slice: Arc<Slice>, side: Side },
    Continuation { left: Arc<Slice>, right: Arc<Slice> },
    Branch { single: Arc<Slice>, pair: [Arc<Slice>; 2], single_side: Side },
}

/// A hypothesis linking slices of two adjacent sections.
///
/// The interval of a segment is the boundary between sections `interval - 1` (left) and `interval` (right). Interval
/// 0 and the interval past the last section border the stack and only ever hold ends.
#[derive(Clone, Debug)]
pub struct Segment {
    hash: SegmentHash,
    interval: u32,
    shape: SegmentShape,
}

/// The content hash of a segment with the given left and right slices, in any order
pub fn segment_hash(left: &[SliceHash], right: &[SliceHash]) -> SegmentHash {
    let mut left: SmallVec<[SliceHash; 2]> = SmallVec::from_slice(left);
    let mut right: SmallVec<[SliceHash; 2]> = SmallVec::from_slice(right);
    left.sort_unstable();
    right.sort_unstable();
    let mut hasher = SegmentHasher::new();
    hasher.write_hashes(left.iter()).write_hashes(right.iter());
    hasher.finalize()
}

impl Segment {
    pub fn end(slice: Arc<Slice>, side: Side) -> Self {
        let interval = match side {
            Side::Left => slice.section() + 1,
            Side::Right => slice.section(),
        };
        Self::with_shape(interval, SegmentShape::End { slice, side })
    }

    pub fn continuation(left: Arc<Slice>, right: Arc<Slice>) -> Self {
        Self::with_shape(right.section(), SegmentShape::Continuation { left, right })
    }

    pub fn branch(single: Arc<Slice>, pair: [Arc<Slice>; 2], single_side: Side) -> Self {
        let interval = match single_side {
            Side::Left => pair[0].section(),
            Side::Right => single.section(),
        };
        Self::with_shape(interval, SegmentShape::Branch { single, pair, single_side })
    }

    /// Builds a segment from its slices per side, validating the shape and the sections against `interval`
    pub fn from_slices(interval: u32, left: &[Arc<Slice>], right: &[Arc<Slice>]) -> ModelResult<Self> {
        SegmentType::from_counts(left.len(), right.len())?;
        for slice in left {
            if slice.section() + 1 != interval {
                return Err(ModelError::NonAdjacentSections(slice.section(), interval));
            }
        }
        for slice in right {
            if slice.section() != interval {
                return Err(ModelError::NonAdjacentSections(interval.saturating_sub(1), slice.section()));
            }
        }
        let shape = match (left, right) {
            ([slice], []) => SegmentShape::End { slice: slice.clone(), side: Side::Left },
            ([], [slice]) => SegmentShape::End { slice: slice.clone(), side: Side::Right },
            ([l], [r]) => SegmentShape::Continuation { left: l.clone(), right: r.clone() },
            ([single], [a, b]) => SegmentShape::Branch { single: single.clone(), pair: [a.clone(), b.clone()], single_side: Side::Left },
            ([a, b], [single]) => {
                SegmentShape::Branch { single: single.clone(), pair: [a.clone(), b.clone()], single_side: Side::Right }
            }
            _ => return Err(ModelError::InvalidShape { left: left.len(), right: right.len() }),
        };
        Ok(Self::with_shape(interval, shape))
    }

    fn with_shape(interval: u32, shape: SegmentShape) -> Self {
        let mut segment = Self { hash: SegmentHash::default(), interval, shape };
        segment.hash = segment_hash(&segment.left_hashes(), &segment.right_hashes());
        segment
    }

    pub fn hash(&self) -> SegmentHash {
        self.hash
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn shape(&self) -> &SegmentShape {
        &self.shape
    }

    pub fn left_slices(&self) -> SmallVec<[&Arc<Slice>; 2]> {
        match &self.shape {
            SegmentShape::End { slice, side: Side::Left } => smallvec::smallvec![slice],
            SegmentShape::End { side: Side::Right, .. } => SmallVec::new(),
            SegmentShape::Continuation { left, .. } => smallvec::smallvec![left],
            SegmentShape::Branch { single, single_side: Side::Left, .. } => smallvec::smallvec![single],
            SegmentShape::Branch { pair, single_side: Side::Right, .. } => pair.iter().collect(),
        }
    }

    pub fn right_slices(&self) -> SmallVec<[&Arc<Slice>; 2]> {
        match &self.shape {
            SegmentShape::End { slice, side: Side::Right } => smallvec::smallvec![slice],
            SegmentShape::End { side: Side::Left, .. } => SmallVec::new(),
            SegmentShape::Continuation { right, .. } => smallvec::smallvec![right],
            SegmentShape::Branch { single, single_side: Side::Right, .. } => smallvec::smallvec![single],
            SegmentShape::Branch { pair, single_side: Side::Left, .. } => pair.iter().collect(),
        }
    }

    pub fn left_hashes(&self) -> SmallVec<[SliceHash; 2]> {
        self.left_slices().iter().map(|s| s.hash()).collect()
    }

    pub fn right_hashes(&self) -> SmallVec<[SliceHash; 2]> {
        self.right_slices().iter().map(|s| s.hash()).collect()
    }

    pub fn slices(&self) -> impl Iterator<Item = &Arc<Slice>> {
        self.left_slices().into_iter().chain(self.right_slices())
    }

    pub fn segment_type(&self) -> SegmentType {
        match self.shape {
            SegmentShape::End { .. } => SegmentType::End,
            SegmentShape::Continuation { .. } => SegmentType::Continuation,
            SegmentShape::Branch { .. } => SegmentType::Branch,
        }
    }

    pub fn direction(&self) -> Direction {
        match self.shape {
            SegmentShape::End { side: Side::Left, .. } => Direction::Right,
            SegmentShape::End { side: Side::Right, .. } => Direction::Left,
            SegmentShape::Continuation { .. } => Direction::Left,
            SegmentShape::Branch { single_side: Side::Right, .. } => Direction::Left,
            SegmentShape::Branch { single_side: Side::Left, .. } => Direction::Right,
        }
    }

    /// The union of the slice bounding boxes
    pub fn bounding_box(&self) -> Rect {
        let mut bounding_box = Rect::empty();
        for slice in self.slices() {
            bounding_box.fit(&slice.bounding_box());
        }
        bounding_box
    }

    /// The size weighted mean of the slice centers
    pub fn center(&self) -> Point2f {
        let (mut x, mut y, mut total) = (0f64, 0f64, 0f64);
        for slice in self.slices() {
            let size = slice.size() as f64;
            let center = slice.center();
            x += center.x * size;
            y += center.y * size;
            total += size;
        }
        if total == 0.0 { Point2f::default() } else { Point2f::new(x / total, y / total) }
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Segment {}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} segment {} at interval {}", self.segment_type(), self.hash.short(), self.interval)
    }
}
