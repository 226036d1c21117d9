//! Defines the [`MemSizeEstimator`] trait and the accompanying [`MemMode`], used by the store caches to bound
//! their memory. Values are either counted as logical units (entries of a fixed-size type, or items of a
//! container) or estimated in bytes including their deep heap allocations.

use std::{
    mem::{size_of, size_of_val},
    sync::Arc,
};

/// The memory mode of the tracked object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemMode {
    Bytes,
    Units,
}

/// The contract for estimating the memory owned by a cached value. Implementors provide the estimation
/// mode that suits them; the other one falls back to a unit count of 1 or to the shallow size.
pub trait MemSizeEstimator {
    /// Estimates the size of this object depending on the passed mem mode
    fn estimate_size(&self, mem_mode: MemMode) -> usize {
        match mem_mode {
            MemMode::Bytes => self.estimate_mem_bytes(),
            MemMode::Units => self.estimate_mem_units(),
        }
    }

    /// Estimates the (deep) size of this object in bytes, including heap owned inner data
    fn estimate_mem_bytes(&self) -> usize {
        size_of_val(self)
    }

    /// Estimates the number of logical units this object holds
    fn estimate_mem_units(&self) -> usize {
        1
    }
}

macro_rules! unit_sized {
    ($($t:ty),+ $(,)?) => {$(
        impl MemSizeEstimator for $t {}
    )+};
}

unit_sized!(bool, u32, u64, f64);

impl<T> MemSizeEstimator for Vec<T> {
    fn estimate_mem_bytes(&self) -> usize {
        size_of::<Self>() + self.capacity() * size_of::<T>()
    }

    fn estimate_mem_units(&self) -> usize {
        self.len()
    }
}

impl<T: MemSizeEstimator> MemSizeEstimator for Arc<T> {
    fn estimate_mem_bytes(&self) -> usize {
        self.as_ref().estimate_mem_bytes() + size_of::<Self>()
    }

    fn estimate_mem_units(&self) -> usize {
        self.as_ref().estimate_mem_units()
    }
}
