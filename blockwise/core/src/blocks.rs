use crate::geometry::{Box3, Point3};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    ops::Range,
};

/// A fixed-size store key derived from grid coordinates (big endian, so keys sort in z, y, x order)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridKey([u8; 12]);

impl GridKey {
    pub fn new(coordinates: Point3) -> Self {
        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&coordinates.z.to_be_bytes());
        bytes[4..8].copy_from_slice(&coordinates.y.to_be_bytes());
        bytes[8..12].copy_from_slice(&coordinates.x.to_be_bytes());
        Self(bytes)
    }
}

impl AsRef<[u8]> for GridKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The unit of slice and segment extraction.
///
/// Blocks are only handed out by the [`BlockManager`](crate::block_manager::BlockManager), which guarantees
/// that equal grid coordinates always yield equal blocks. Completion flags are kept by the stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    coordinates: Point3,
    bounding_box: Box3,
}

impl Block {
    pub(crate) fn new(coordinates: Point3, bounding_box: Box3) -> Self {
        Self { coordinates, bounding_box }
    }

    pub fn coordinates(&self) -> Point3 {
        self.coordinates
    }

    /// The world region of this block, clipped to the stack
    pub fn bounding_box(&self) -> Box3 {
        self.bounding_box
    }

    pub fn location(&self) -> Point3 {
        self.bounding_box.location
    }

    pub fn size(&self) -> Point3 {
        self.bounding_box.size
    }

    /// The sections covered by this block
    pub fn sections(&self) -> Range<u32> {
        self.bounding_box.location.z..self.bounding_box.end().z
    }

    pub fn key(&self) -> GridKey {
        GridKey::new(self.coordinates)
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "block {} at {}", self.coordinates, self.bounding_box)
    }
}

/// The unit of solving: a rectangular aggregate of blocks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Core {
    coordinates: Point3,
    bounding_box: Box3,
}

impl Core {
    pub(crate) fn new(coordinates: Point3, bounding_box: Box3) -> Self {
        Self { coordinates, bounding_box }
    }

    pub fn coordinates(&self) -> Point3 {
        self.coordinates
    }

    pub fn bounding_box(&self) -> Box3 {
        self.bounding_box
    }

    pub fn location(&self) -> Point3 {
        self.bounding_box.location
    }

    pub fn size(&self) -> Point3 {
        self.bounding_box.size
    }

    pub fn key(&self) -> GridKey {
        GridKey::new(self.coordinates)
    }
}

impl Display for Core {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "core {} at {}", self.coordinates, self.bounding_box)
    }
}

/// An ordered, duplicate free collection of blocks. Iteration follows insertion order.
pub type Blocks = IndexSet<Block>;

/// An ordered, duplicate free collection of cores
pub type Cores = IndexSet<Core>;
