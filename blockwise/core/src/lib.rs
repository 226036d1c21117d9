//! The data model of the blockwise pipeline: the spatial grid (blocks and cores), content-addressed slices and
//! segments, their store-agnostic descriptions, and the project configuration.

pub mod block_manager;
pub mod blocks;
pub mod config;
pub mod conflict;
pub mod constraint;
pub mod description;
pub mod errors;
pub mod geometry;
pub mod segment;
pub mod slice;

pub use sopnet_hashes::Hash;

/// Content hash of a [`slice::Slice`]
pub type SliceHash = Hash;

/// Content hash of a [`segment::Segment`]
pub type SegmentHash = Hash;

/// Content hash of a [`conflict::ConflictSet`]
pub type ConflictSetHash = Hash;
