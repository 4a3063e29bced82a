//! Device buffers.
//!
//! A [`Buffer`] is a named, fixed-length array of 32-bit words. Kernels in
//! different work-groups write disjoint cells of the same buffer through a
//! shared reference, so each cell is a relaxed atomic. Ordering between
//! stages comes from [`ExecutionContext::dispatch`](crate::device::ExecutionContext::dispatch)
//! returning only after every group has finished.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Result, SortError};

pub struct Buffer {
    name: &'static str,
    cells: Box<[AtomicU32]>,
}

impl Buffer {
    /// Allocate a zero-filled buffer of `len` words.
    pub fn new(name: &'static str, len: usize) -> Self {
        let cells = (0..len).map(|_| AtomicU32::new(0)).collect();
        Self { name, cells }
    }

    /// Allocate a buffer holding a copy of `data`.
    pub fn from_slice(name: &'static str, data: &[u32]) -> Self {
        let cells = data.iter().map(|&v| AtomicU32::new(v)).collect();
        Self { name, cells }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn load(&self, index: usize) -> u32 {
        self.cells[index].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn store(&self, index: usize, value: u32) {
        self.cells[index].store(value, Ordering::Relaxed);
    }

    /// Overwrite the whole buffer from host memory.
    ///
    /// `data` must have exactly `self.len()` elements.
    pub fn upload(&self, data: &[u32]) -> Result<()> {
        if data.len() != self.len() {
            return Err(SortError::LengthMismatch {
                expected: self.len(),
                actual: data.len(),
            });
        }
        for (cell, &value) in self.cells.iter().zip(data) {
            cell.store(value, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Copy the buffer back to host memory.
    pub fn to_vec(&self) -> Vec<u32> {
        self.cells.iter().map(|c| c.load(Ordering::Relaxed)).collect()
    }

    /// Copy the buffer into `out`, which must have the same length.
    pub fn download_into(&self, out: &mut [u32]) -> Result<()> {
        if out.len() != self.len() {
            return Err(SortError::LengthMismatch {
                expected: self.len(),
                actual: out.len(),
            });
        }
        for (dst, cell) in out.iter_mut().zip(self.cells.iter()) {
            *dst = cell.load(Ordering::Relaxed);
        }
        Ok(())
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("name", &self.name)
            .field("len", &self.len())
            .finish()
    }
}
