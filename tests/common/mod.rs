#![allow(dead_code)]

use gpu_radix_sort::{ContextConfig, ExecutionContext, GpuRadixSorter, SortConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

pub fn random_keys(seed: u64, n: usize) -> Vec<u32> {
    let mut rng = seeded_rng(seed);
    (0..n).map(|_| rng.gen()).collect()
}

/// Keys drawn from `0..bound`, so duplicates are common.
pub fn random_keys_below(seed: u64, n: usize, bound: u32) -> Vec<u32> {
    let mut rng = seeded_rng(seed);
    (0..n).map(|_| rng.gen_range(0..bound)).collect()
}

pub fn sorter() -> GpuRadixSorter {
    sorter_with(SortConfig::default())
}

pub fn sorter_with(config: SortConfig) -> GpuRadixSorter {
    let context = ExecutionContext::new(ContextConfig {
        threads: 4,
        ..ContextConfig::default()
    })
    .unwrap();
    GpuRadixSorter::with_context(context, config).unwrap()
}

/// Verify that `indices` is a valid permutation of 0..n.
pub fn verify_permutation(indices: &[u32], n: usize) -> bool {
    if indices.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    for &idx in indices {
        let i = idx as usize;
        if i >= n || seen[i] {
            return false;
        }
        seen[i] = true;
    }
    true
}

/// Verify that data[indices[i]] <= data[indices[i+1]] for all consecutive pairs.
pub fn verify_sorted_by_indices<T: Ord>(data: &[T], indices: &[u32]) -> bool {
    indices
        .windows(2)
        .all(|w| data[w[0] as usize] <= data[w[1] as usize])
}

/// Equal keys appear in increasing index order.
pub fn verify_stable(data: &[u32], indices: &[u32]) -> bool {
    indices
        .windows(2)
        .all(|w| data[w[0] as usize] != data[w[1] as usize] || w[0] < w[1])
}

/// Stable sort of indices by key, the expected ordering-mode output.
pub fn expected_ordering(data: &[u32]) -> Vec<u32> {
    let mut order: Vec<u32> = (0..data.len() as u32).collect();
    order.sort_by_key(|&i| data[i as usize]);
    order
}
