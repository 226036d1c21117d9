use crate::{
    collaborators::{ImageTile, SliceExtractor},
    errors::GuarantorResult,
};
use sopnet_blockwise_core::{
    conflict::ConflictSet,
    geometry::Point2,
    slice::{ConnectedComponent, Slice},
};
use std::sync::Arc;

/// Extracts one slice per 4-connected region of equal, non-zero value. Meant for label images (such as a ground
/// truth), where regions never overlap and hence never conflict.
#[derive(Clone, Copy, Debug, Default)]
pub struct LabelSliceExtractor;

impl LabelSliceExtractor {
    /// The connected regions of one section, as (value, world pixels)
    pub fn regions(tile: &ImageTile, section: u32) -> Vec<(f32, Vec<Point2>)> {
        let Some(plane) = tile.section(section) else {
            return Vec::new();
        };
        let region = tile.region();
        let (w, h) = (region.size.x as usize, region.size.y as usize);
        let mut visited = vec![false; plane.len()];
        let mut regions = Vec::new();
        let mut stack = Vec::new();

        for start in 0..plane.len() {
            let value = plane[start];
            if visited[start] || value == 0.0 {
                continue;
            }
            visited[start] = true;
            stack.push(start);
            let mut pixels = Vec::new();
            while let Some(i) = stack.pop() {
                let (x, y) = (i % w, i / w);
                pixels.push(Point2::new(region.location.x + x as u32, region.location.y + y as u32));
                let neighbours = [
                    (x > 0).then(|| i - 1),
                    (x + 1 < w).then_some(i + 1),
                    (y > 0).then(|| i - w),
                    (y + 1 < h).then_some(i + w),
                ];
                for n in neighbours.into_iter().flatten() {
                    if !visited[n] && plane[n] == value {
                        visited[n] = true;
                        stack.push(n);
                    }
                }
            }
            regions.push((value, pixels));
        }
        regions
    }
}

impl SliceExtractor for LabelSliceExtractor {
    fn extract(&self, tile: &ImageTile, section: u32) -> GuarantorResult<(Vec<Arc<Slice>>, Vec<ConflictSet>)> {
        let slices = Self::regions(tile, section)
            .into_iter()
            .map(|(value, pixels)| Arc::new(Slice::new(section, ConnectedComponent::new(value as f64, pixels))))
            .collect();
        Ok((slices, Vec::new()))
    }
}
