//! High-level sorter over host slices.
//!
//! [`GpuRadixSorter`] owns an [`ExecutionContext`] and a [`SortConfig`] and
//! wraps the allocate / upload / run / download sequence:
//!
//! - [`GpuRadixSorter::sort`] sorts keys in place (value mode),
//! - [`GpuRadixSorter::argsort`] returns the stable sorting permutation
//!   (ordering mode) and leaves the input untouched,
//! - [`GpuRadixSorter::prefix_sum`] runs the standalone scan.
//!
//! Buffers are allocated per call, so one sorter can serve inputs of any
//! length.

use crate::buffer::Buffer;
use crate::device::{ContextConfig, ExecutionContext};
use crate::error::Result;
use crate::prefix_sum::{self, ScanMode};
use crate::radix_sort::{self, SortConfig};

pub struct GpuRadixSorter {
    context: ExecutionContext,
    config: SortConfig,
}

impl GpuRadixSorter {
    /// Create a sorter with a default context and the canonical configuration
    /// (32-bit keys, 8-bit digits, 1024-element batches).
    pub fn new() -> Result<Self> {
        Self::with_context(
            ExecutionContext::new(ContextConfig::default())?,
            SortConfig::default(),
        )
    }

    pub fn with_context(context: ExecutionContext, config: SortConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { context, config })
    }

    /// Same context, different sort shape.
    pub fn with_config(self, config: SortConfig) -> Result<Self> {
        Self::with_context(self.context, config)
    }

    pub fn device_name(&self) -> String {
        self.context.name()
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Sort `data` in place.
    ///
    /// Only the low `config.key_bits` bits of each key take part in the
    /// ordering.
    pub fn sort(&self, data: &mut [u32]) -> Result<()> {
        if data.len() <= 1 {
            return Ok(());
        }
        let input = Buffer::from_slice("inputBuffer", data);
        let mut args = radix_sort::allocate(&self.config, data.len(), false)?;
        let sorted = radix_sort::run(&self.context, &input, &mut args)?;
        sorted.output.download_into(data)
    }

    /// Indices that sort `data`; equal keys keep their input order.
    pub fn argsort(&self, data: &[u32]) -> Result<Vec<u32>> {
        let input = Buffer::from_slice("inputBuffer", data);
        let mut args = radix_sort::allocate(&self.config, data.len(), true)?;
        let sorted = radix_sort::run(&self.context, &input, &mut args)?;
        Ok(sorted.output.to_vec())
    }

    pub fn prefix_sum(&self, data: &[u32], mode: ScanMode) -> Result<Vec<u32>> {
        let input = Buffer::from_slice("inputBuffer", data);
        let mut args = prefix_sum::allocate(data.len())?;
        let output = prefix_sum::run(&self.context, &input, &mut args, mode)?;
        Ok(output.to_vec())
    }
}

/// Sorted values from a permutation: `values[permutation[i]]`.
pub fn gather(values: &[u32], permutation: &[u32]) -> Vec<u32> {
    permutation.iter().map(|&i| values[i as usize]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu_radix_sort::is_sorted;
    use crate::error::SortError;
    use rand::Rng;

    fn sorter() -> GpuRadixSorter {
        let context = ExecutionContext::new(ContextConfig {
            threads: 4,
            ..ContextConfig::default()
        })
        .unwrap();
        GpuRadixSorter::with_context(context, SortConfig::default()).unwrap()
    }

    #[test]
    fn test_radix_sort_small() {
        let mut data = vec![4, 2, 1, 3, 8, 6, 5, 7];
        sorter().sort(&mut data).unwrap();
        assert_eq!(data, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_radix_sort_non_power_of_two() {
        let mut rng = rand::thread_rng();
        let mut data: Vec<u32> = (0..5000).map(|_| rng.gen()).collect();
        let mut expected = data.clone();
        expected.sort_unstable();

        sorter().sort(&mut data).unwrap();
        assert!(is_sorted(&data));
        assert_eq!(data, expected);
    }

    #[test]
    fn test_radix_sort_empty_and_single() {
        let sorter = sorter();
        let mut empty: Vec<u32> = vec![];
        sorter.sort(&mut empty).unwrap();
        assert!(empty.is_empty());

        let mut single = vec![42u32];
        sorter.sort(&mut single).unwrap();
        assert_eq!(single, vec![42]);
    }

    #[test]
    fn test_radix_sort_all_same() {
        let mut data: Vec<u32> = vec![42; 4096];
        sorter().sort(&mut data).unwrap();
        assert!(data.iter().all(|&v| v == 42));
    }

    #[test]
    fn test_radix_sort_max_values() {
        let mut data = vec![u32::MAX, 0, u32::MAX / 2, 1, u32::MAX - 1];
        sorter().sort(&mut data).unwrap();
        assert_eq!(data, vec![0, 1, u32::MAX / 2, u32::MAX - 1, u32::MAX]);
    }

    #[test]
    fn test_argsort_and_gather() {
        let data = vec![30u32, 10, 20, 10];
        let p = sorter().argsort(&data).unwrap();
        assert_eq!(p, vec![1, 3, 2, 0]);
        assert_eq!(gather(&data, &p), vec![10, 10, 20, 30]);
    }

    #[test]
    fn test_prefix_sum() {
        let sorter = sorter();
        assert_eq!(
            sorter.prefix_sum(&[3, 1, 2, 0], ScanMode::Exclusive).unwrap(),
            vec![0, 3, 4, 6]
        );
        assert_eq!(
            sorter.prefix_sum(&[3, 1, 2, 0], ScanMode::Inclusive).unwrap(),
            vec![3, 4, 6, 6]
        );
    }

    #[test]
    fn test_with_config_validates() {
        let err = sorter()
            .with_config(SortConfig {
                bits_per_radix: 7,
                ..SortConfig::default()
            })
            .err()
            .unwrap();
        assert!(matches!(err, SortError::InvalidConfig(_)));
    }
}
