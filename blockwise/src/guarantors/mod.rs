//! Guarantors make sure the derived data of a region exists. A guarantee either completes, or returns the blocks
//! whose dependencies are not available yet, in which case nothing was written.

pub mod gold_standard;
pub mod segments;
pub mod slices;
pub mod solution;

use crate::{
    collaborators::{LinearSolver, SolverError},
    errors::{GuarantorError, GuarantorResult},
    processes::{assemblies::extract_assemblies, problem::Problem},
    stores::{CoreSolution, SegmentStore},
};
use sopnet_blockwise_core::{
    SegmentHash,
    blocks::{Blocks, Core},
    description::SegmentDescriptions,
};
use sopnet_core::debug;
use std::collections::HashSet;

/// Solves `problem` and returns the accepted segments
pub(crate) fn solve(solver: &dyn LinearSolver, problem: &Problem, core: &Core) -> GuarantorResult<Vec<SegmentHash>> {
    debug!("solving {} with {} variables and {} constraints", core, problem.num_variables(), problem.constraints.len());
    let solution = solver.solve(&problem.constraints, &problem.objective).map_err(|err| match err {
        SolverError::Infeasible => GuarantorError::Infeasible { core: *core },
        SolverError::Failed(reason) => GuarantorError::Solver { core: *core, reason },
    })?;
    if solution.len() != problem.num_variables() {
        return Err(GuarantorError::Solver {
            core: *core,
            reason: format!("expected {} values, got {}", problem.num_variables(), solution.len()),
        });
    }
    Ok(problem.accepted(&solution))
}

/// The part of `accepted` belonging to the blocks of `core`, grouped into assemblies
pub(crate) fn core_solution(
    store: &dyn SegmentStore,
    core: &Core,
    core_blocks: &Blocks,
    accepted: &[SegmentHash],
    descriptions: &SegmentDescriptions,
) -> GuarantorResult<CoreSolution> {
    let mut ignored = Blocks::new();
    let own = store.get_segments_by_blocks(core_blocks, &mut ignored, false)?.hashes().collect::<HashSet<_>>();
    let segments = accepted.iter().copied().filter(|hash| own.contains(hash)).collect::<Vec<_>>();
    let assemblies = extract_assemblies(&segments, descriptions);
    debug!(
        "{}: {} of {} accepted segments lie in the core, forming {} assemblies",
        core,
        segments.len(),
        accepted.len(),
        assemblies.len()
    );
    Ok(CoreSolution { segments, assemblies })
}
