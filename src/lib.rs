//! Parallel LSD radix sort and prefix sum built from work-group kernels.
//!
//! The sort runs `key_bits / bits_per_radix` passes (4 for 32-bit keys with
//! 8-bit digits), each made of four dispatches:
//!
//! 1. **Count**: per batch, digit histogram and each element's local offset
//! 2. **Batch prefix**: per digit, exclusive scan across batches + digit total
//! 3. **Global prefix**: exclusive scan of the digit totals
//! 4. **Scatter**: write each element to `global + batch_prefix + local_offset`
//!
//! Kernels are dispatched through an explicit [`device::ExecutionContext`];
//! there is no process-wide device.
//!
//! ```
//! use gpu_radix_sort::GpuRadixSorter;
//!
//! let sorter = GpuRadixSorter::new().unwrap();
//! let mut keys = vec![5, 3, 3, 1, 4, 1, 5, 2];
//! sorter.sort(&mut keys).unwrap();
//! assert_eq!(keys, vec![1, 1, 2, 3, 3, 4, 5, 5]);
//! ```

pub mod buffer;
pub mod cpu_radix_sort;
pub mod device;
pub mod error;
pub mod gpu_radix_sort;
pub mod prefix_sum;
pub mod radix_sort;

pub use buffer::Buffer;
pub use device::{ContextConfig, ExecutionContext};
pub use error::{Result, SortError};
pub use gpu_radix_sort::{gather, GpuRadixSorter};
pub use prefix_sum::ScanMode;
pub use radix_sort::{SortArgs, SortConfig, SortOutput};
