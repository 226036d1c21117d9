use serde::{Deserialize, Serialize};

/// Thresholds of the segment hypothesis extraction policy
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentExtractionParams {
    /// Minimal pixel overlap (exclusive) for two slices of adjacent sections to be considered partners
    pub overlap_threshold: u64,

    /// Minimal intersection-over-union for a continuation
    pub continuation_overlap_threshold: f64,

    /// Every slice is given at least this many continuation partners (best overlaps first), regardless of the
    /// continuation threshold
    pub min_continuation_partners: usize,

    /// Minimal combined normalized overlap of a branch
    pub branch_overlap_threshold: f64,

    /// Minimal ratio between the smaller and the larger of the two branch targets
    pub branch_size_ratio_threshold: f64,

    pub enable_branches: bool,

    /// Maximal center distance between two ground truth slices of equal label to be linked
    pub max_ground_truth_distance: f64,
}

impl Default for SegmentExtractionParams {
    fn default() -> Self {
        Self {
            overlap_threshold: 0,
            continuation_overlap_threshold: 0.5,
            min_continuation_partners: 0,
            branch_overlap_threshold: 0.5,
            branch_size_ratio_threshold: 0.5,
            enable_branches: true,
            max_ground_truth_distance: 100.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolutionParams {
    /// Number of blocks a core is dilated by (in x and y) before solving
    pub core_padding: u32,

    /// Require every slice to be explained by exactly one segment instead of at most one
    pub force_explanation: bool,

    /// Use the per segment costs kept by the store instead of weighting features
    pub read_costs: bool,

    /// Persist the per segment costs computed while solving
    pub store_costs: bool,
}

impl Default for SolutionParams {
    fn default() -> Self {
        Self { core_padding: 1, force_explanation: false, read_costs: false, store_costs: false }
    }
}

/// Parameters of the merge cost used to solve against a ground truth labelling
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoldStandardParams {
    pub correctly_merged_pair_reward: f64,

    /// Number of incorrectly merged pixels above which a segment is considered a false merge
    pub incorrectly_merged_threshold: u64,

    pub false_merge_costs: f64,

    /// Subtracted from the cost of continuations and branches
    pub composite_segment_bonus: f64,

    /// Subtracted from the cost of membrane segments that reproduce a ground truth segment exactly
    pub ground_truth_reward: f64,
}

impl Default for GoldStandardParams {
    fn default() -> Self {
        Self {
            correctly_merged_pair_reward: -1.0,
            incorrectly_merged_threshold: 100,
            false_merge_costs: 1e6,
            composite_segment_bonus: 0.5,
            ground_truth_reward: 1.0,
        }
    }
}

/// Cache bounds of the database backed stores. Slices and segment descriptions vary in size and are bounded in
/// bytes, all other caches in entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheParams {
    pub slice_bytes: usize,
    pub segment_bytes: usize,
    pub costs: usize,
    pub block_entries: usize,
}

impl Default for CacheParams {
    fn default() -> Self {
        Self { slice_bytes: 256 << 20, segment_bytes: 64 << 20, costs: 100_000, block_entries: 4096 }
    }
}
