use sopnet_blockwise_core::{
    SegmentHash,
    blocks::{Block, Core},
    errors::ModelError,
    geometry::Point3,
};
use sopnet_database::prelude::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuarantorError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("no feature weights are stored, cannot weight the segments of {0}")]
    MissingFeatureWeights(Core),

    #[error("stored feature weights have {found} entries but segment {segment} has {expected} features")]
    FeatureWeightsMismatch { segment: SegmentHash, expected: usize, found: usize },

    #[error("segment {segment} has no stored cost but {core} is solved over stored costs")]
    MissingSegmentCost { core: Core, segment: SegmentHash },

    #[error("the problem of {core} is infeasible")]
    Infeasible { core: Core },

    #[error("solver failed on {core}: {reason}")]
    Solver { core: Core, reason: String },

    #[error("extraction failed in {block}: {reason}")]
    Extraction { block: Block, reason: String },

    #[error("location {0} is not within the stack")]
    NoSuchBlock(Point3),

    #[error("location {0} is not within any core")]
    NoSuchCore(Point3),
}

pub type GuarantorResult<T> = std::result::Result<T, GuarantorError>;
