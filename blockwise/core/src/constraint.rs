use crate::SegmentHash;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    LessEqual,
    Equal,
    GreaterEqual,
}

impl Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Relation::LessEqual => "<=",
            Relation::Equal => "=",
            Relation::GreaterEqual => ">=",
        })
    }
}

/// An explicit linear constraint over segments, such as a user annotation that a segment must be part of the
/// solution (`1 * s = 1`). Constraints are associated to blocks and merged into the problems of every core
/// whose blocks they belong to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentConstraint {
    pub coefficients: Vec<(SegmentHash, f64)>,
    pub relation: Relation,
    pub value: f64,
}

impl SegmentConstraint {
    pub fn new(coefficients: Vec<(SegmentHash, f64)>, relation: Relation, value: f64) -> Self {
        Self { coefficients, relation, value }
    }

    /// Requires `segment` to be part of the solution
    pub fn force(segment: SegmentHash) -> Self {
        Self::new(vec![(segment, 1.0)], Relation::Equal, 1.0)
    }

    /// Excludes `segment` from the solution
    pub fn forbid(segment: SegmentHash) -> Self {
        Self::new(vec![(segment, 1.0)], Relation::Equal, 0.0)
    }

    pub fn segments(&self) -> impl Iterator<Item = &SegmentHash> {
        self.coefficients.iter().map(|(segment, _)| segment)
    }
}

impl Display for SegmentConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (segment, coefficient)) in self.coefficients.iter().enumerate() {
            if i > 0 {
                f.write_str(" + ")?;
            }
            write!(f, "{coefficient}*{segment}")?;
        }
        write!(f, " {} {}", self.relation, self.value)
    }
}

/// Explicit constraints of a set of blocks, without duplicates
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SegmentConstraints {
    inner: Vec<SegmentConstraint>,
}

impl SegmentConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `constraint` unless an equal one is present. A constraint shared by several blocks is read once
    /// per block.
    pub fn add(&mut self, constraint: SegmentConstraint) -> bool {
        if self.inner.contains(&constraint) {
            return false;
        }
        self.inner.push(constraint);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &SegmentConstraint> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Extend<SegmentConstraint> for SegmentConstraints {
    fn extend<T: IntoIterator<Item = SegmentConstraint>>(&mut self, iter: T) {
        for constraint in iter {
            self.add(constraint);
        }
    }
}

impl FromIterator<SegmentConstraint> for SegmentConstraints {
    fn from_iter<T: IntoIterator<Item = SegmentConstraint>>(iter: T) -> Self {
        let mut constraints = Self::new();
        constraints.extend(iter);
        constraints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraints_are_deduplicated() {
        let (a, b) = (SegmentHash::from_u64_word(1), SegmentHash::from_u64_word(2));
        let constraints: SegmentConstraints =
            [SegmentConstraint::force(a), SegmentConstraint::forbid(b), SegmentConstraint::force(a)].into_iter().collect();
        assert_eq!(2, constraints.len());
        assert_eq!(vec![&a, &b], constraints.iter().flat_map(|c| c.segments()).collect::<Vec<_>>());
        assert!(SegmentConstraint::new(vec![(a, 1.0), (b, -1.0)], Relation::GreaterEqual, 0.0).to_string().ends_with(">= 0"));
    }
}
