use sopnet_blockwise_core::{
    SegmentHash, SliceHash,
    conflict::ConflictSets,
    constraint::{SegmentConstraint, SegmentConstraints},
    description::SegmentDescriptions,
};
use sopnet_core::warn;
use std::collections::{BTreeMap, HashMap};

pub use sopnet_blockwise_core::constraint::Relation;

const EPSILON: f64 = 1e-9;

/// `sum(coefficient * x[variable]) <relation> value` over binary variables
#[derive(Clone, Debug, PartialEq)]
pub struct LinearConstraint {
    pub coefficients: Vec<(usize, f64)>,
    pub relation: Relation,
    pub value: f64,
}

impl LinearConstraint {
    pub fn new(coefficients: Vec<(usize, f64)>, relation: Relation, value: f64) -> Self {
        Self { coefficients, relation, value }
    }

    pub fn lhs(&self, assignment: &[bool]) -> f64 {
        self.coefficients.iter().filter(|(i, _)| assignment.get(*i).copied().unwrap_or(false)).map(|(_, c)| c).sum()
    }

    pub fn is_satisfied(&self, assignment: &[bool]) -> bool {
        let lhs = self.lhs(assignment);
        match self.relation {
            Relation::LessEqual => lhs <= self.value + EPSILON,
            Relation::Equal => (lhs - self.value).abs() <= EPSILON,
            Relation::GreaterEqual => lhs + EPSILON >= self.value,
        }
    }
}

pub type LinearConstraints = Vec<LinearConstraint>;

/// Minimized objective, one coefficient per variable
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinearObjective {
    pub coefficients: Vec<f64>,
}

impl LinearObjective {
    pub fn value(&self, assignment: &[bool]) -> f64 {
        self.coefficients.iter().zip(assignment).filter(|(_, x)| **x).map(|(c, _)| c).sum()
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }
}

/// An assembled problem along with the mapping between variables and segments
#[derive(Clone, Debug)]
pub struct Problem {
    variables: Vec<SegmentHash>,
    pub constraints: LinearConstraints,
    pub objective: LinearObjective,
}

impl Problem {
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn segment(&self, variable: usize) -> Option<SegmentHash> {
        self.variables.get(variable).copied()
    }

    pub fn variable(&self, segment: &SegmentHash) -> Option<usize> {
        self.variables.binary_search(segment).ok()
    }

    /// The segments assigned `true`
    pub fn accepted(&self, solution: &[bool]) -> Vec<SegmentHash> {
        self.variables.iter().zip(solution).filter(|(_, x)| **x).map(|(h, _)| *h).collect()
    }
}

/// Translates segment hypotheses and slice conflicts into a binary linear program.
///
/// Every segment becomes one variable, numbered in hash order. Each conflict set bounds the number of selected
/// segments using one of its slices as a left slice, and every slice used on both sides has to be continued by as
/// many selected segments on its right as on its left. Explicit segment constraints are appended as they are.
pub struct ProblemAssembler {
    force_explanation: bool,
}

impl ProblemAssembler {
    pub fn new(force_explanation: bool) -> Self {
        Self { force_explanation }
    }

    pub fn assemble(
        &self,
        descriptions: &SegmentDescriptions,
        conflict_sets: &ConflictSets,
        explicit: &SegmentConstraints,
        costs: &HashMap<SegmentHash, f64>,
    ) -> Problem {
        let mut variables = descriptions.hashes().collect::<Vec<_>>();
        variables.sort_unstable();

        // Slice -> (variables using it as left slice, variables using it as right slice)
        let mut usage: HashMap<SliceHash, (Vec<usize>, Vec<usize>)> = HashMap::new();
        for (variable, hash) in variables.iter().enumerate() {
            let Some(description) = descriptions.get(hash) else { continue };
            for slice in description.left_slices.iter() {
                usage.entry(*slice).or_default().0.push(variable);
            }
            for slice in description.right_slices.iter() {
                usage.entry(*slice).or_default().1.push(variable);
            }
        }

        let mut constraints = LinearConstraints::new();
        let relation = if self.force_explanation { Relation::Equal } else { Relation::LessEqual };
        for conflict_set in conflict_sets.iter() {
            let mut coefficients = BTreeMap::<usize, f64>::new();
            for slice in conflict_set.slices() {
                for variable in usage.get(slice).map(|(left, _)| left.as_slice()).unwrap_or_default() {
                    *coefficients.entry(*variable).or_default() += 1.0;
                }
            }
            // Slices without any segment on their right lie outside of the problem's sections
            if !coefficients.is_empty() {
                constraints.push(LinearConstraint::new(coefficients.into_iter().collect(), relation, 1.0));
            }
        }

        let mut continued = usage.iter().filter(|(_, (left, right))| !left.is_empty() && !right.is_empty()).collect::<Vec<_>>();
        continued.sort_unstable_by_key(|(slice, _)| **slice);
        for (_, (left, right)) in continued {
            let coefficients = left.iter().map(|v| (*v, 1.0)).chain(right.iter().map(|v| (*v, -1.0))).collect();
            constraints.push(LinearConstraint::new(coefficients, Relation::Equal, 0.0));
        }

        let objective = LinearObjective { coefficients: variables.iter().map(|h| costs.get(h).copied().unwrap_or_default()).collect() };
        let mut problem = Problem { variables, constraints, objective };
        for constraint in explicit.iter() {
            match problem.translate(constraint) {
                Some(translated) => problem.constraints.push(translated),
                None => warn!("ignoring explicit constraint {}, it refers to segments outside of the problem", constraint),
            }
        }
        problem
    }
}

impl Problem {
    /// `constraint` over the variables of this problem, or `None` if one of its segments is not a variable
    fn translate(&self, constraint: &SegmentConstraint) -> Option<LinearConstraint> {
        let coefficients = constraint.coefficients.iter().map(|(segment, c)| self.variable(segment).map(|v| (v, *c))).collect::<Option<_>>()?;
        Some(LinearConstraint::new(coefficients, constraint.relation, constraint.value))
    }
}
