use crate::{ConflictSetHash, SliceHash};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sopnet_hashes::{ConflictSetHasher, HasherExtensions};
use std::collections::BTreeSet;

/// A set of mutually exclusive slices: at most one of them (exactly one, when explanation is forced) may be
/// used by a solution on each side.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConflictSet {
    slices: BTreeSet<SliceHash>,
}

impl ConflictSet {
    pub fn new(slices: impl IntoIterator<Item = SliceHash>) -> Self {
        Self { slices: slices.into_iter().collect() }
    }

    pub fn add(&mut self, slice: SliceHash) {
        self.slices.insert(slice);
    }

    pub fn contains(&self, slice: &SliceHash) -> bool {
        self.slices.contains(slice)
    }

    pub fn slices(&self) -> impl ExactSizeIterator<Item = &SliceHash> {
        self.slices.iter()
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn hash(&self) -> ConflictSetHash {
        let mut hasher = ConflictSetHasher::new();
        hasher.write_hashes(self.slices.iter());
        hasher.finalize()
    }
}

/// Conflict sets deduplicated by content
#[derive(Clone, Debug, Default)]
pub struct ConflictSets {
    inner: IndexMap<ConflictSetHash, ConflictSet>,
}

impl ConflictSets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conflict_set: ConflictSet) -> bool {
        let hash = conflict_set.hash();
        if self.inner.contains_key(&hash) {
            return false;
        }
        self.inner.insert(hash, conflict_set);
        true
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConflictSet> {
        self.inner.values()
    }

    /// Whether both slices are members of a common conflict set
    pub fn in_conflict(&self, a: &SliceHash, b: &SliceHash) -> bool {
        self.inner.values().any(|cs| cs.contains(a) && cs.contains(b))
    }
}

impl Extend<ConflictSet> for ConflictSets {
    fn extend<T: IntoIterator<Item = ConflictSet>>(&mut self, iter: T) {
        for conflict_set in iter {
            self.add(conflict_set);
        }
    }
}

impl FromIterator<ConflictSet> for ConflictSets {
    fn from_iter<T: IntoIterator<Item = ConflictSet>>(iter: T) -> Self {
        let mut sets = ConflictSets::new();
        sets.extend(iter);
        sets
    }
}
