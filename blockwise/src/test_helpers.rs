//! Builders and collaborator doubles shared by the unit and integration tests.

use crate::{
    collaborators::{ImageTile, ImageTileSource, InMemoryVolume, LinearSolver, Solution, SliceExtractor, SolverError},
    errors::GuarantorResult,
    processes::{
        label_slices::LabelSliceExtractor,
        problem::{LinearConstraints, LinearObjective, Relation},
    },
};
use sopnet_blockwise_core::{
    block_manager::BlockManager,
    blocks::{Blocks, Cores},
    conflict::ConflictSet,
    geometry::{Box3, Point2, Point3},
    segment::{Segment, Side},
    slice::{ConnectedComponent, Slice},
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

pub fn rect_slice(section: u32, x: u32, y: u32, width: u32, height: u32) -> Arc<Slice> {
    labelled_rect_slice(section, 1.0, x, y, width, height)
}

pub fn square_slice(section: u32, x: u32, y: u32, side: u32) -> Arc<Slice> {
    rect_slice(section, x, y, side, side)
}

pub fn labelled_square_slice(section: u32, value: f64, x: u32, y: u32, side: u32) -> Arc<Slice> {
    labelled_rect_slice(section, value, x, y, side, side)
}

fn labelled_rect_slice(section: u32, value: f64, x: u32, y: u32, width: u32, height: u32) -> Arc<Slice> {
    let pixels = (y..y + height).flat_map(|py| (x..x + width).map(move |px| Point2::new(px, py))).collect();
    Arc::new(Slice::new(section, ConnectedComponent::new(value, pixels)))
}

pub fn end(slice: &Arc<Slice>, side: Side) -> Segment {
    Segment::end(slice.clone(), side)
}

pub fn continuation(left: &Arc<Slice>, right: &Arc<Slice>) -> Segment {
    Segment::continuation(left.clone(), right.clone())
}

/// A column of `n` blocks of size (10, 10, 2), stacked in z
pub fn grid_blocks(n: u32) -> Blocks {
    let manager = column_manager(n);
    manager.blocks_in_box(&manager.stack_box())
}

/// A column of `n` single block cores, stacked in z
pub fn grid_cores(n: u32) -> Cores {
    let manager = column_manager(n);
    manager.cores_in_box(&manager.stack_box())
}

fn column_manager(n: u32) -> BlockManager {
    BlockManager::new(Point3::new(10, 10, 2 * n), Point3::new(10, 10, 2), Point3::ONE).unwrap()
}

/// Two square objects running through all sections: label 1 at (2..6, 2..6) and label 2 at (12..16, 2..6)
pub fn two_objects_volume(size: Point3) -> InMemoryVolume {
    InMemoryVolume::from_fn(size, |p| match (p.x, p.y) {
        (2..6, 2..6) => 1.0,
        (12..16, 2..6) => 2.0,
        _ => 0.0,
    })
}

/// Counts the calls made to the wrapped extractor
pub struct CountingSliceExtractor<E> {
    inner: E,
    calls: AtomicUsize,
}

impl<E> CountingSliceExtractor<E> {
    pub fn new(inner: E) -> Self {
        Self { inner, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<E: SliceExtractor> SliceExtractor for CountingSliceExtractor<E> {
    fn extract(&self, tile: &ImageTile, section: u32) -> GuarantorResult<(Vec<Arc<Slice>>, Vec<ConflictSet>)> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.extract(tile, section)
    }
}

/// Holds back all tiles until opened
pub struct GatedTileSource<S> {
    inner: S,
    open: AtomicBool,
}

impl<S> GatedTileSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, open: AtomicBool::new(false) }
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }
}

impl<S: ImageTileSource> ImageTileSource for GatedTileSource<S> {
    fn tile(&self, region: &Box3) -> GuarantorResult<Option<ImageTile>> {
        if self.open.load(Ordering::SeqCst) { self.inner.tile(region) } else { Ok(None) }
    }
}

/// Extracts the label regions of a section plus, if there are several, one slice merging all of them. The merged
/// slice conflicts with each region, mimicking the competing hypotheses of a component tree.
#[derive(Clone, Copy, Debug, Default)]
pub struct MergingSliceExtractor;

impl SliceExtractor for MergingSliceExtractor {
    fn extract(&self, tile: &ImageTile, section: u32) -> GuarantorResult<(Vec<Arc<Slice>>, Vec<ConflictSet>)> {
        let regions = LabelSliceExtractor::regions(tile, section);
        let mut slices = regions
            .iter()
            .map(|(_, pixels)| Arc::new(Slice::new(section, ConnectedComponent::new(1.0, pixels.clone()))))
            .collect::<Vec<_>>();
        if slices.len() < 2 {
            return Ok((slices, Vec::new()));
        }
        let merged = Arc::new(Slice::new(section, ConnectedComponent::new(1.0, regions.into_iter().flat_map(|(_, p)| p).collect())));
        let conflict_sets = slices.iter().map(|s| ConflictSet::new([s.hash(), merged.hash()])).collect();
        slices.push(merged);
        Ok((slices, conflict_sets))
    }
}

/// Exact solver for small binary programs: depth first search over the variables, pruned by constraint bounds
/// and by the best objective found so far
#[derive(Clone, Copy, Debug, Default)]
pub struct BranchAndBoundSolver;

struct Search<'a> {
    constraints: &'a LinearConstraints,
    costs: &'a [f64],
    // Per variable: (constraint, coefficient)
    occurrences: Vec<Vec<(usize, f64)>>,
    assigned: Vec<f64>,
    open_positive: Vec<f64>,
    open_negative: Vec<f64>,
    open_cost_bound: Vec<f64>,
    current: Vec<bool>,
    best: Option<(f64, Vec<bool>)>,
}

impl Search<'_> {
    fn feasible(&self, constraint: usize) -> bool {
        let c = &self.constraints[constraint];
        let min = self.assigned[constraint] + self.open_negative[constraint];
        let max = self.assigned[constraint] + self.open_positive[constraint];
        match c.relation {
            Relation::LessEqual => min <= c.value + 1e-9,
            Relation::Equal => min <= c.value + 1e-9 && max + 1e-9 >= c.value,
            Relation::GreaterEqual => max + 1e-9 >= c.value,
        }
    }

    fn assign(&mut self, variable: usize, value: bool, sign: f64) {
        for &(k, a) in self.occurrences[variable].iter() {
            if a > 0.0 {
                self.open_positive[k] -= sign * a;
            } else {
                self.open_negative[k] -= sign * a;
            }
            if value {
                self.assigned[k] += sign * a;
            }
        }
    }

    fn visit(&mut self, variable: usize, cost: f64) {
        if let Some((best, _)) = &self.best
            && cost + self.open_cost_bound[variable] >= *best
        {
            return;
        }
        if variable == self.costs.len() {
            self.best = Some((cost, self.current.clone()));
            return;
        }
        let order = if self.costs[variable] < 0.0 { [true, false] } else { [false, true] };
        for value in order {
            self.assign(variable, value, 1.0);
            self.current[variable] = value;
            if self.occurrences[variable].iter().all(|&(k, _)| self.feasible(k)) {
                let step = if value { self.costs[variable] } else { 0.0 };
                self.visit(variable + 1, cost + step);
            }
            self.assign(variable, value, -1.0);
        }
        self.current[variable] = false;
    }
}

impl LinearSolver for BranchAndBoundSolver {
    fn solve(&self, constraints: &LinearConstraints, objective: &LinearObjective) -> Result<Solution, SolverError> {
        let n = objective.coefficients.len();
        let mut occurrences = vec![Vec::new(); n];
        let mut open_positive = vec![0.0; constraints.len()];
        let mut open_negative = vec![0.0; constraints.len()];
        for (k, constraint) in constraints.iter().enumerate() {
            for &(variable, a) in constraint.coefficients.iter() {
                if variable >= n {
                    return Err(SolverError::Failed(format!("constraint {k} refers to unknown variable {variable}")));
                }
                occurrences[variable].push((k, a));
                if a > 0.0 {
                    open_positive[k] += a;
                } else {
                    open_negative[k] += a;
                }
            }
        }
        // The lowest cost still obtainable from the variables from index i on
        let mut open_cost_bound = vec![0.0; n + 1];
        for i in (0..n).rev() {
            open_cost_bound[i] = open_cost_bound[i + 1] + objective.coefficients[i].min(0.0);
        }

        let mut search = Search {
            constraints,
            costs: &objective.coefficients,
            occurrences,
            assigned: vec![0.0; constraints.len()],
            open_positive,
            open_negative,
            open_cost_bound,
            current: vec![false; n],
            best: None,
        };
        // Constraints without variables are checked once up front
        if !(0..constraints.len()).all(|k| search.feasible(k)) {
            return Err(SolverError::Infeasible);
        }
        search.visit(0, 0.0);
        search.best.map(|(_, solution)| solution).ok_or(SolverError::Infeasible)
    }
}
