use crate::{
    blocks::{Block, Blocks, Core, Cores},
    config::ProjectConfig,
    errors::{ModelError, ModelResult},
    geometry::{Box3, Offset3, Point3},
};
use sopnet_core::trace;

/// Partitions a stack into a grid of blocks and a coarser grid of cores.
///
/// The grid is a pure function of the stack size, the block size and the core size (in blocks), so independently
/// constructed managers with equal parameters address identical blocks. All lookups outside of the grid yield
/// `None` or an empty collection: probing the stack boundary is a regular operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockManager {
    stack_size: Point3,
    block_size: Point3,
    core_size_in_blocks: Point3,
    core_size: Point3,
    max_block_coordinates: Point3,
    max_core_coordinates: Point3,
}

impl BlockManager {
    pub fn new(stack_size: Point3, block_size: Point3, core_size_in_blocks: Point3) -> ModelResult<Self> {
        if block_size.any_zero() || core_size_in_blocks.any_zero() {
            return Err(ModelError::InvalidGrid { stack: stack_size, block: block_size, core: core_size_in_blocks });
        }
        let core_size = core_size_in_blocks.scale(block_size);
        let manager = Self {
            stack_size,
            block_size,
            core_size_in_blocks,
            core_size,
            max_block_coordinates: stack_size.div_ceil(block_size),
            max_core_coordinates: stack_size.div_ceil(core_size),
        };
        trace!(
            "Block grid for stack {}: block size {}, max block coordinates {}, max core coordinates {}",
            stack_size, block_size, manager.max_block_coordinates, manager.max_core_coordinates
        );
        Ok(manager)
    }

    pub fn from_config(config: &ProjectConfig) -> ModelResult<Self> {
        Self::new(config.stack_size, config.block_size, config.core_size_in_blocks)
    }

    pub fn stack_size(&self) -> Point3 {
        self.stack_size
    }

    pub fn block_size(&self) -> Point3 {
        self.block_size
    }

    pub fn core_size_in_blocks(&self) -> Point3 {
        self.core_size_in_blocks
    }

    pub fn core_size(&self) -> Point3 {
        self.core_size
    }

    pub fn max_block_coordinates(&self) -> Point3 {
        self.max_block_coordinates
    }

    pub fn max_core_coordinates(&self) -> Point3 {
        self.max_core_coordinates
    }

    /// The whole stack as a box
    pub fn stack_box(&self) -> Box3 {
        Box3::new(Point3::ZERO, self.stack_size)
    }

    pub fn is_valid_location(&self, location: Point3) -> bool {
        location.all_lt(self.stack_size)
    }

    pub fn block_at_location(&self, location: Point3) -> Option<Block> {
        if !self.is_valid_location(location) {
            return None;
        }
        self.block_at_coordinates(location.div_floor(self.block_size))
    }

    pub fn block_at_coordinates(&self, coordinates: Point3) -> Option<Block> {
        coordinates
            .all_lt(self.max_block_coordinates)
            .then(|| Block::new(coordinates, self.cell_box(coordinates, self.block_size)))
    }

    /// The block `offset` grid steps away from `block`, or `None` beyond the grid
    pub fn block_at_offset(&self, block: &Block, offset: Offset3) -> Option<Block> {
        self.block_at_coordinates(block.coordinates().checked_offset(offset)?)
    }

    pub fn core_at_location(&self, location: Point3) -> Option<Core> {
        if !self.is_valid_location(location) {
            return None;
        }
        self.core_at_coordinates(location.div_floor(self.core_size))
    }

    pub fn core_at_coordinates(&self, coordinates: Point3) -> Option<Core> {
        coordinates.all_lt(self.max_core_coordinates).then(|| Core::new(coordinates, self.cell_box(coordinates, self.core_size)))
    }

    /// All blocks overlapping `region`, in row-major order (x fastest, then y, then z)
    pub fn blocks_in_box(&self, region: &Box3) -> Blocks {
        self.cells_in_box(region, self.block_size, self.max_block_coordinates).filter_map(|c| self.block_at_coordinates(c)).collect()
    }

    /// All cores overlapping `region`, in row-major order (x fastest, then y, then z)
    pub fn cores_in_box(&self, region: &Box3) -> Cores {
        self.cells_in_box(region, self.core_size, self.max_core_coordinates).filter_map(|c| self.core_at_coordinates(c)).collect()
    }

    /// The blocks making up `core`
    pub fn core_blocks(&self, core: &Core) -> Blocks {
        self.blocks_in_box(&core.bounding_box())
    }

    /// The blocks of `core` dilated by `padding` blocks in x and y, clipped to the grid
    pub fn padded_core_blocks(&self, core: &Core, padding: u32) -> Blocks {
        let first = core.coordinates().scale(self.core_size_in_blocks);
        let last = core.coordinates().translate(Point3::ONE).scale(self.core_size_in_blocks);
        let min = Point3::new(first.x.saturating_sub(padding), first.y.saturating_sub(padding), first.z);
        let max = Point3::new(last.x.saturating_add(padding), last.y.saturating_add(padding), last.z).min(self.max_block_coordinates);
        Self::grid_range(min, max).filter_map(|c| self.block_at_coordinates(c)).collect()
    }

    /// The smallest box containing all given blocks
    pub fn bounding_box<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> Box3 {
        blocks.into_iter().fold(Box3::default(), |acc, block| acc.union(&block.bounding_box()))
    }

    fn cell_box(&self, coordinates: Point3, cell_size: Point3) -> Box3 {
        let location = coordinates.scale(cell_size);
        Box3::from_bounds(location, location.translate(cell_size).min(self.stack_size))
    }

    fn cells_in_box(&self, region: &Box3, cell_size: Point3, max_coordinates: Point3) -> impl Iterator<Item = Point3> + use<> {
        let clipped = region.intersection(&self.stack_box()).unwrap_or_default();
        let (min, max) = if clipped.is_empty() {
            (Point3::ZERO, Point3::ZERO)
        } else {
            (clipped.location.div_floor(cell_size), clipped.end().div_ceil(cell_size).min(max_coordinates))
        };
        Self::grid_range(min, max)
    }

    fn grid_range(min: Point3, max: Point3) -> impl Iterator<Item = Point3> {
        (min.z..max.z).flat_map(move |z| (min.y..max.y).flat_map(move |y| (min.x..max.x).map(move |x| Point3::new(x, y, z))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn manager(stack: (u32, u32, u32), block: (u32, u32, u32), core: (u32, u32, u32)) -> BlockManager {
        BlockManager::new(stack.into(), block.into(), core.into()).unwrap()
    }

    #[test]
    fn test_small_stack_example() {
        let bm = manager((10, 10, 4), (10, 10, 2), (1, 1, 1));
        assert_eq!(Point3::new(1, 1, 2), bm.max_block_coordinates());
        assert_eq!(2, bm.blocks_in_box(&bm.stack_box()).len());
        assert_eq!(2, bm.cores_in_box(&bm.stack_box()).len());
    }

    #[test]
    fn test_boundary_absence() {
        let bm = manager((100, 80, 10), (32, 32, 4), (2, 2, 1));
        assert!(bm.block_at_location(bm.stack_size()).is_none());
        assert!(bm.block_at_location(Point3::new(100, 0, 0)).is_none());
        assert!(bm.core_at_location(Point3::new(0, 0, 10)).is_none());

        let last = bm.block_at_location(Point3::new(99, 79, 9)).unwrap();
        assert_eq!(Point3::new(3, 2, 2), last.coordinates());
        assert_eq!(bm.max_block_coordinates().saturating_sub(Point3::ONE), last.coordinates());
        // The last block is clipped to the stack
        assert_eq!(Point3::new(4, 16, 2), last.size());
        assert!(bm.block_at_offset(&last, Offset3::new(1, 0, 0)).is_none());
        assert!(bm.block_at_offset(&last, Offset3::new(0, 0, 1)).is_none());
        assert_eq!(
            Some(Point3::new(2, 2, 2)),
            bm.block_at_offset(&last, Offset3::new(-1, 0, 0)).map(|b| b.coordinates())
        );

        let first = bm.block_at_coordinates(Point3::ZERO).unwrap();
        assert!(bm.block_at_offset(&first, Offset3::new(0, -1, 0)).is_none());
    }

    #[test]
    fn test_grid_determinism() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let stack = Point3::new(rng.gen_range(1..60), rng.gen_range(1..60), rng.gen_range(1..20));
            let block = Point3::new(rng.gen_range(1..16), rng.gen_range(1..16), rng.gen_range(1..6));
            let core = Point3::new(rng.gen_range(1..4), rng.gen_range(1..4), rng.gen_range(1..4));
            let bm = BlockManager::new(stack, block, core).unwrap();
            let max = bm.max_block_coordinates();

            let blocks = bm.blocks_in_box(&bm.stack_box());
            assert_eq!(max.volume() as usize, blocks.len());

            for block in blocks.iter() {
                assert_eq!(Some(*block), bm.block_at_coordinates(block.coordinates()));
                // Every world point inside a block maps back to it
                let b = block.bounding_box();
                for p in [b.location, b.end().saturating_sub(Point3::ONE)] {
                    assert_eq!(Some(*block), bm.block_at_location(p));
                }
            }

            // Blocks tile the stack exactly
            let volume: u64 = blocks.iter().map(|b| b.size().volume()).sum();
            assert_eq!(stack.volume(), volume);

            let cores = bm.cores_in_box(&bm.stack_box());
            assert_eq!(bm.max_core_coordinates().volume() as usize, cores.len());
            let core_blocks: usize = cores.iter().map(|c| bm.core_blocks(c).len()).sum();
            assert_eq!(blocks.len(), core_blocks);
        }
    }

    #[test]
    fn test_blocks_in_box_order_and_overlap() {
        let bm = manager((40, 40, 8), (10, 10, 4), (2, 2, 1));
        // An unaligned box touching 2x2x1 blocks
        let region = Box3::new(Point3::new(5, 15, 1), Point3::new(10, 10, 2));
        let coords = bm.blocks_in_box(&region).iter().map(|b| b.coordinates()).collect::<Vec<_>>();
        assert_eq!(
            vec![Point3::new(0, 1, 0), Point3::new(1, 1, 0), Point3::new(0, 2, 0), Point3::new(1, 2, 0)],
            coords
        );
        assert!(bm.blocks_in_box(&Box3::new(Point3::new(40, 0, 0), Point3::new(5, 5, 5))).is_empty());
        assert!(bm.blocks_in_box(&Box3::new(Point3::new(0, 0, 0), Point3::new(5, 0, 5))).is_empty());
    }

    #[test]
    fn test_padded_core_blocks() {
        let bm = manager((60, 60, 8), (10, 10, 4), (2, 2, 1));
        let core = bm.core_at_coordinates(Point3::new(1, 0, 1)).unwrap();
        assert_eq!(4, bm.core_blocks(&core).len());

        let padded = bm.padded_core_blocks(&core, 1);
        // x: blocks 1..=4 clipped to 6, y: blocks 0..=2 (clipped below), z: only the core's layer
        assert_eq!(4 * 3, padded.len());
        assert!(padded.iter().all(|b| b.coordinates().z == 1));
        assert!(bm.core_blocks(&core).iter().all(|b| padded.contains(b)));
        assert_eq!(bm.core_blocks(&core), bm.padded_core_blocks(&core, 0));

        let bounds = BlockManager::bounding_box(&padded);
        assert_eq!(Box3::new(Point3::new(10, 0, 4), Point3::new(40, 30, 4)), bounds);
    }

    #[test]
    fn test_invalid_grid() {
        assert!(BlockManager::new(Point3::new(10, 10, 10), Point3::new(0, 1, 1), Point3::ONE).is_err());
        assert!(BlockManager::new(Point3::new(10, 10, 10), Point3::ONE, Point3::new(1, 0, 1)).is_err());
    }
}
