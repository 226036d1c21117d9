use sopnet_blockwise_core::slice::Slice;
use std::sync::Arc;

/// Pixel overlaps between the slices of two adjacent sections, kept as partner lists per slice
pub struct OverlapMap {
    left_partners: Vec<Vec<(usize, u64)>>,
    right_partners: Vec<Vec<(usize, u64)>>,
}

impl OverlapMap {
    /// Records every pair whose overlap exceeds `threshold`
    pub fn new(left: &[Arc<Slice>], right: &[Arc<Slice>], threshold: u64) -> Self {
        let mut left_partners = vec![Vec::new(); left.len()];
        let mut right_partners = vec![Vec::new(); right.len()];
        for (i, l) in left.iter().enumerate() {
            for (j, r) in right.iter().enumerate() {
                let overlap = l.overlap(r) as u64;
                if overlap > threshold {
                    left_partners[i].push((j, overlap));
                    right_partners[j].push((i, overlap));
                }
            }
        }
        Self { left_partners, right_partners }
    }

    /// The right slices overlapping left slice `i`, with their overlaps
    pub fn partners_of_left(&self, i: usize) -> &[(usize, u64)] {
        self.left_partners.get(i).map(Vec::as_slice).unwrap_or_default()
    }

    /// The left slices overlapping right slice `j`, with their overlaps
    pub fn partners_of_right(&self, j: usize) -> &[(usize, u64)] {
        self.right_partners.get(j).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn num_pairs(&self) -> usize {
        self.left_partners.iter().map(Vec::len).sum()
    }
}

/// The overlap of a group of slices relative to their union, assuming `overlap` is the total pairwise overlap
pub fn normalized_overlap(sizes: &[usize], overlap: u64) -> f64 {
    let total = sizes.iter().sum::<usize>() as f64 - overlap as f64;
    if total <= 0.0 { 0.0 } else { overlap as f64 / total }
}
