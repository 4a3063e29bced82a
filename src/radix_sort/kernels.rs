//! The four per-pass kernels.
//!
//! 1. [`CountScatterBuckets`]: per batch, digit counts and each element's
//!    rank among same-digit batch-mates (local offset).
//! 2. [`PrefixCountTable`]: per digit, exclusive scan of the batch counts and
//!    the digit total.
//! 3. [`PrefixGlobalTable`]: exclusive scan of the digit totals.
//! 4. [`ScatterOutput`]: `global[d] + batch_prefix[d][b] + local_offset[i]`.
//!
//! Each kernel reads the pass constants from the constant buffer, so the
//! same structs serve the value and the ordering mode.

use crate::buffer::Buffer;
use crate::device::{Kernel, WorkGroup};
use crate::prefix_sum::{group_scan, group_scan_chunked, ScanMode};

use super::args::PassConstants;

/// Lanes that rank against each other directly in the counter kernel.
pub const SUBGROUP_SIZE: usize = 32;
/// Lanes per group of the batch-prefix kernel.
pub const PREFIX_TABLE_GROUP_SIZE: usize = 256;

const NO_DIGIT: u32 = u32::MAX;

/// Key used for digit extraction and the word written by the scatter.
///
/// Value mode permutes keys, so both are the key. Ordering mode permutes
/// indices into the original input: identity on the first pass, the previous
/// pass's permutation afterwards.
#[inline]
fn fetch(constants: &PassConstants, source: &Buffer, ordering: &Buffer, i: usize) -> (u32, u32) {
    if constants.output_ordering() {
        let index = if constants.is_first_pass() {
            i as u32
        } else {
            ordering.load(i)
        };
        (source.load(index as usize), index)
    } else {
        let key = source.load(i);
        (key, key)
    }
}

/// One group per batch, one lane per element.
pub struct CountScatterBuckets<'a> {
    pub source: &'a Buffer,
    pub ordering: &'a Buffer,
    pub local_offsets: &'a Buffer,
    pub count_table: &'a Buffer,
    pub constants: &'a Buffer,
}

impl Kernel for CountScatterBuckets<'_> {
    fn name(&self) -> &'static str {
        "count_scatter"
    }

    fn group_size(&self) -> usize {
        PassConstants::load(self.constants).batch_size as usize
    }

    fn execute(&self, group: &WorkGroup) {
        let c = PassConstants::load(self.constants);
        let n = c.input_count as usize;
        let batch_count = c.batch_count as usize;
        let radix_counts = c.radix_counts();
        let batch = group.id();
        let base = batch * group.size();
        let lanes = group.size();
        let subgroups = lanes.div_ceil(SUBGROUP_SIZE);

        let mut digits = vec![NO_DIGIT; lanes];
        let mut ranks = vec![0u32; lanes];
        // [subgroup][digit]: count, then exclusive prefix across subgroups
        let mut subgroup_counts = vec![0u32; subgroups * radix_counts];

        group.phase(|lane| {
            let i = base + lane;
            if i < n {
                let (key, _) = fetch(&c, self.source, self.ordering, i);
                digits[lane] = c.digit(key) as u32;
            }
        });

        // Match within the subgroup: rank = earlier lanes with the same digit.
        // The last lane holding a digit publishes the subgroup's count.
        group.phase(|lane| {
            let digit = digits[lane];
            if digit == NO_DIGIT {
                return;
            }
            let first = lane - lane % SUBGROUP_SIZE;
            let end = (first + SUBGROUP_SIZE).min(lanes);
            let rank = digits[first..lane].iter().filter(|&&d| d == digit).count() as u32;
            ranks[lane] = rank;
            if !digits[lane + 1..end].contains(&digit) {
                subgroup_counts[(lane / SUBGROUP_SIZE) * radix_counts + digit as usize] = rank + 1;
            }
        });

        // One lane per digit scans that digit across subgroups.
        group.phase(|lane| {
            let mut digit = lane;
            while digit < radix_counts {
                let mut running = 0u32;
                for subgroup in 0..subgroups {
                    let slot = subgroup * radix_counts + digit;
                    let count = subgroup_counts[slot];
                    subgroup_counts[slot] = running;
                    running += count;
                }
                self.count_table.store(digit * batch_count + batch, running);
                digit += lanes;
            }
        });

        group.phase(|lane| {
            let i = base + lane;
            if i < n {
                let digit = digits[lane] as usize;
                let subgroup_base = subgroup_counts[(lane / SUBGROUP_SIZE) * radix_counts + digit];
                self.local_offsets.store(i, subgroup_base + ranks[lane]);
            }
        });
    }
}

/// One group per digit; scans that digit's column of batch counts.
pub struct PrefixCountTable<'a> {
    pub count_table: &'a Buffer,
    pub batch_prefix: &'a Buffer,
    pub radix_totals: &'a Buffer,
    pub constants: &'a Buffer,
    pub lanes: usize,
}

impl Kernel for PrefixCountTable<'_> {
    fn name(&self) -> &'static str {
        "prefix_batch_table"
    }

    fn group_size(&self) -> usize {
        self.lanes
    }

    fn execute(&self, group: &WorkGroup) {
        let c = PassConstants::load(self.constants);
        let batch_count = c.batch_count as usize;
        let digit = group.id();
        let column = digit * batch_count..(digit + 1) * batch_count;

        let total = group_scan_chunked(group, self.count_table, column, self.batch_prefix);

        group.phase(|lane| {
            if lane == 0 {
                self.radix_totals.store(digit, total);
            }
        });
    }
}

/// Single group, one lane per digit.
pub struct PrefixGlobalTable<'a> {
    pub radix_totals: &'a Buffer,
    pub global_offsets: &'a Buffer,
}

impl Kernel for PrefixGlobalTable<'_> {
    fn name(&self) -> &'static str {
        "prefix_global_table"
    }

    fn group_size(&self) -> usize {
        self.radix_totals.len()
    }

    fn execute(&self, group: &WorkGroup) {
        let mut scratch = vec![0u32; group.size()];
        group.phase(|lane| scratch[lane] = self.radix_totals.load(lane));

        group_scan(group, &mut scratch, ScanMode::Exclusive);

        group.phase(|lane| self.global_offsets.store(lane, scratch[lane]));
    }
}

/// One group per batch, one lane per element.
pub struct ScatterOutput<'a> {
    pub source: &'a Buffer,
    pub ordering: &'a Buffer,
    pub local_offsets: &'a Buffer,
    pub batch_prefix: &'a Buffer,
    pub global_offsets: &'a Buffer,
    pub output: &'a Buffer,
    pub constants: &'a Buffer,
}

impl Kernel for ScatterOutput<'_> {
    fn name(&self) -> &'static str {
        "scatter_output"
    }

    fn group_size(&self) -> usize {
        PassConstants::load(self.constants).batch_size as usize
    }

    fn execute(&self, group: &WorkGroup) {
        let c = PassConstants::load(self.constants);
        let n = c.input_count as usize;
        let batch_count = c.batch_count as usize;
        let batch = group.id();
        let base = batch * group.size();

        group.phase(|lane| {
            let i = base + lane;
            if i >= n {
                return;
            }
            let (key, word) = fetch(&c, self.source, self.ordering, i);
            let digit = c.digit(key);
            let position = self.global_offsets.load(digit)
                + self.batch_prefix.load(digit * batch_count + batch)
                + self.local_offsets.load(i);
            self.output.store(position as usize, word);
        });
    }
}
