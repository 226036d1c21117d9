use crate::{SegmentHash, SliceHash, geometry::Point3};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("segment {stored} re-derives to hash {computed}: stored data is corrupt or was written with a different hashing policy")]
    HashMismatch { stored: SegmentHash, computed: SegmentHash },

    #[error("segment {segment} references slice {slice} which is not available")]
    MissingSlice { segment: SegmentHash, slice: SliceHash },

    #[error("a segment cannot have {left} left and {right} right slices")]
    InvalidShape { left: usize, right: usize },

    #[error("segment slices span sections {0} and {1} which are not adjacent")]
    NonAdjacentSections(u32, u32),

    #[error("invalid grid: stack {stack}, block {block}, core size in blocks {core}")]
    InvalidGrid { stack: Point3, block: Point3, core: Point3 },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type ModelResult<T> = std::result::Result<T, ModelError>;
