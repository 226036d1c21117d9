//! The seams towards the components this crate does not implement itself: image access, pixel level slice
//! extraction, segment features and the ILP solver.

use crate::{
    errors::GuarantorResult,
    processes::problem::{LinearConstraints, LinearObjective},
};
use sopnet_blockwise_core::{
    conflict::{ConflictSet, ConflictSets},
    geometry::{Box3, Point3},
    segment::Segment,
    slice::Slice,
};
use std::sync::Arc;
use thiserror::Error;

/// A dense image crop, stored x fastest, then y, then z
#[derive(Clone, Debug, PartialEq)]
pub struct ImageTile {
    region: Box3,
    data: Vec<f32>,
}

impl ImageTile {
    /// Returns `None` if `data` does not hold exactly one value per voxel of `region`
    pub fn new(region: Box3, data: Vec<f32>) -> Option<Self> {
        (data.len() as u64 == region.size.volume()).then_some(Self { region, data })
    }

    pub fn from_fn(region: Box3, f: impl Fn(Point3) -> f32) -> Self {
        let end = region.end();
        let mut data = Vec::with_capacity(region.size.volume() as usize);
        for z in region.location.z..end.z {
            for y in region.location.y..end.y {
                for x in region.location.x..end.x {
                    data.push(f(Point3::new(x, y, z)));
                }
            }
        }
        Self { region, data }
    }

    pub fn region(&self) -> Box3 {
        self.region
    }

    /// The value at world location `p`
    pub fn value(&self, p: Point3) -> Option<f32> {
        if !self.region.contains(p) {
            return None;
        }
        let (w, h) = (self.region.size.x as usize, self.region.size.y as usize);
        let (x, y, z) = ((p.x - self.region.location.x) as usize, (p.y - self.region.location.y) as usize, (p.z - self.region.location.z) as usize);
        self.data.get(x + y * w + z * w * h).copied()
    }

    /// The values of world section `z`, row by row
    pub fn section(&self, z: u32) -> Option<&[f32]> {
        if z < self.region.location.z || z >= self.region.end().z {
            return None;
        }
        let plane = (self.region.size.x * self.region.size.y) as usize;
        let offset = (z - self.region.location.z) as usize * plane;
        self.data.get(offset..offset + plane)
    }
}

/// Provides image data for a region. `Ok(None)` means the data is not available yet; blocks depending on it are
/// reported missing.
pub trait ImageTileSource: Send + Sync {
    fn tile(&self, region: &Box3) -> GuarantorResult<Option<ImageTile>>;
}

/// An image volume held in memory, covering `[0, size)`
pub struct InMemoryVolume {
    tile: ImageTile,
}

impl InMemoryVolume {
    pub fn new(size: Point3, data: Vec<f32>) -> Option<Self> {
        ImageTile::new(Box3::new(Point3::ZERO, size), data).map(|tile| Self { tile })
    }

    pub fn from_fn(size: Point3, f: impl Fn(Point3) -> f32) -> Self {
        Self { tile: ImageTile::from_fn(Box3::new(Point3::ZERO, size), f) }
    }
}

impl ImageTileSource for InMemoryVolume {
    fn tile(&self, region: &Box3) -> GuarantorResult<Option<ImageTile>> {
        let Some(clipped) = region.intersection(&self.tile.region()) else {
            return Ok(None);
        };
        Ok(Some(ImageTile::from_fn(clipped, |p| self.tile.value(p).unwrap_or_default())))
    }
}

/// Extracts the slices of one section of a tile, together with the sets of mutually exclusive slices among them
pub trait SliceExtractor: Send + Sync {
    fn extract(&self, tile: &ImageTile, section: u32) -> GuarantorResult<(Vec<Arc<Slice>>, Vec<ConflictSet>)>;
}

/// Builds segment hypotheses between the slices of two adjacent sections. Either side may be empty at the stack
/// borders.
pub trait SegmentExtractor: Send + Sync {
    fn extract(&self, interval: u32, left: &[Arc<Slice>], right: &[Arc<Slice>], conflicts: &ConflictSets) -> Vec<Segment>;
}

pub trait SegmentFeaturesExtractor: Send + Sync {
    fn features(&self, segment: &Segment) -> Vec<f64>;

    fn feature_names(&self) -> Vec<String>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    #[error("infeasible")]
    Infeasible,

    #[error("{0}")]
    Failed(String),
}

/// A binary assignment indexed like the objective coefficients
pub type Solution = Vec<bool>;

/// Minimizes a linear objective over binary variables subject to linear constraints
pub trait LinearSolver: Send + Sync {
    fn solve(&self, constraints: &LinearConstraints, objective: &LinearObjective) -> Result<Solution, SolverError>;
}
