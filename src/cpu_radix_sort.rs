//! CPU reference implementations.
//!
//! Serial versions of the device pipeline used to cross-check results and as
//! the baseline in benchmarks. The radix sort uses the same decomposition as
//! the kernels with a single batch: count each digit while recording local
//! offsets, exclusive-scan the counts, then place each element at
//! `base[digit] + local_offset`.
//!
//! Complexity: O(n * k) where k = 4 (number of passes for 32-bit integers with 8-bit digits)

use crate::prefix_sum::ScanMode;

/// Number of bits per digit (radix)
const RADIX_BITS: usize = 8;
/// Number of buckets (2^RADIX_BITS)
const NUM_BUCKETS: usize = 1 << RADIX_BITS;
/// Mask for extracting a digit
const RADIX_MASK: u32 = (NUM_BUCKETS - 1) as u32;
/// Number of passes needed for 32-bit integers
const NUM_PASSES: usize = 32 / RADIX_BITS;

/// Sort a slice in-place using LSD radix sort.
pub fn sort(data: &mut [u32]) {
    if data.len() <= 1 {
        return;
    }
    let mut temp = vec![0u32; data.len()];
    lsd_passes(data, &mut temp, |v| v);
}

/// Stable argsort: `data[p[0]] <= data[p[1]] <= ...`, ties in input order.
pub fn argsort(data: &[u32]) -> Vec<u32> {
    let mut order: Vec<u32> = (0..data.len() as u32).collect();
    if order.len() <= 1 {
        return order;
    }
    let mut temp = vec![0u32; order.len()];
    lsd_passes(&mut order, &mut temp, |i| data[i as usize]);
    order
}

/// Sort `items` by `key(item)`, one stable counting pass per digit.
fn lsd_passes<F: Fn(u32) -> u32>(items: &mut [u32], temp: &mut [u32], key: F) {
    let mut local_offsets = vec![0u32; items.len()];
    let mut counts = [0u32; NUM_BUCKETS];

    for pass in 0..NUM_PASSES {
        let shift = pass * RADIX_BITS;

        // Count, remembering each element's rank within its bucket
        counts.fill(0);
        for (offset, &item) in local_offsets.iter_mut().zip(items.iter()) {
            let digit = ((key(item) >> shift) & RADIX_MASK) as usize;
            *offset = counts[digit];
            counts[digit] += 1;
        }

        // Counts become bucket bases (exclusive scan)
        let mut sum = 0u32;
        for count in counts.iter_mut() {
            let c = *count;
            *count = sum;
            sum += c;
        }

        // Scatter elements to their sorted positions
        for (&item, &offset) in items.iter().zip(local_offsets.iter()) {
            let digit = ((key(item) >> shift) & RADIX_MASK) as usize;
            temp[(counts[digit] + offset) as usize] = item;
        }

        items.copy_from_slice(temp);
    }
}

/// Serial prefix sum with wrapping arithmetic.
pub fn prefix_sum(data: &[u32], mode: ScanMode) -> Vec<u32> {
    let mut accumulator = 0u32;
    data.iter()
        .map(|&v| {
            let before = accumulator;
            accumulator = accumulator.wrapping_add(v);
            match mode {
                ScanMode::Exclusive => before,
                ScanMode::Inclusive => accumulator,
            }
        })
        .collect()
}

/// Check if a slice is sorted in ascending order.
#[inline]
pub fn is_sorted(data: &[u32]) -> bool {
    data.windows(2).all(|w| w[0] <= w[1])
}
