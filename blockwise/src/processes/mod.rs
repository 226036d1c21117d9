pub mod assemblies;
pub mod features;
pub mod ground_truth;
pub mod hypotheses;
pub mod label_slices;
pub mod merge_cost;
pub mod overlap;
pub mod problem;
