//! # Blockwise guarantees
//!
//! The stack is processed in blocks and solved in cores (see [`sopnet_blockwise_core::block_manager`]). Derived
//! data is produced in three stages, each owned by a guarantor:
//!
//! ```text
//! image tile --slices--> Slices + ConflictSets --segments--> SegmentDescriptions --solution--> CoreSolution
//! ```
//!
//! ## Invariants
//!
//! - A completion flag (slices or segments per block, solution per core) is raised only after all data of its
//!   region has been written. A raised flag therefore implies complete data, and readers never need to look at
//!   data of unflagged regions.
//! - Slices and segments are addressed by content hash. Independent writers producing the same hash produce the
//!   same value, so shared buckets are written idempotently and need no locking.
//! - A guarantee either completes its region or writes nothing and returns the blocks it waits for. Callers
//!   drive the computation by fulfilling those blocks and retrying, see [`backfill::Backfill`].

pub mod backfill;
pub mod collaborators;
pub mod errors;
pub mod fill;
pub mod guarantors;
pub mod processes;
pub mod stores;
pub mod test_helpers;
