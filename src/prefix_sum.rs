//! Parallel prefix sum.
//!
//! Two group-level building blocks, shared with the radix sort:
//!
//! - [`group_scan`]: Hillis–Steele ladder over one value per lane. Each rung
//!   reads the neighbour `offset` lanes back and writes into the other half of
//!   a double-buffered scratch, with a barrier between rungs.
//! - [`group_scan_chunked`]: three-phase scan of a range of any length by a
//!   single group. Lanes reduce contiguous chunks serially, the lane sums are
//!   ladder-scanned, then each lane rewrites its chunk starting from its
//!   carried-in prefix.
//!
//! The standalone [`run`] composes them across groups:
//! 1. every block of `group_size` elements is scanned locally and its total
//!    written to `block_sums`,
//! 2. one group exclusive-scans `block_sums` into `block_offsets`,
//! 3. every block adds its offset to its elements.
//!
//! All arithmetic wraps at 32 bits; overflow is not reported.

use std::ops::Range;

use log::debug;

use crate::buffer::Buffer;
use crate::device::{ExecutionContext, Kernel, WorkGroup};
use crate::error::{Result, SortError};

/// Lanes per block for the standalone scan.
pub const PREFIX_SUM_GROUP_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// `out[i] = in[0] + .. + in[i - 1]`, `out[0] = 0`
    Exclusive,
    /// `out[i] = in[0] + .. + in[i]`
    Inclusive,
}

/// Scan `scratch` (one value per lane) in place and return the group total.
pub fn group_scan(group: &WorkGroup, scratch: &mut [u32], mode: ScanMode) -> u32 {
    let lanes = group.size();
    debug_assert_eq!(scratch.len(), lanes);
    if lanes == 0 {
        return 0;
    }

    let mut current = scratch.to_vec();
    let mut next = vec![0u32; lanes];
    let mut offset = 1;
    while offset < lanes {
        group.phase(|lane| {
            next[lane] = if lane >= offset {
                current[lane].wrapping_add(current[lane - offset])
            } else {
                current[lane]
            };
        });
        std::mem::swap(&mut current, &mut next);
        offset <<= 1;
    }

    let total = current[lanes - 1];
    group.phase(|lane| {
        scratch[lane] = match mode {
            ScanMode::Inclusive => current[lane],
            ScanMode::Exclusive if lane == 0 => 0,
            ScanMode::Exclusive => current[lane - 1],
        };
    });
    total
}

/// Exclusive scan of `input[range]` into `output[range]` by one group;
/// returns the sum of the range. `input` and `output` may be the same buffer.
pub fn group_scan_chunked(
    group: &WorkGroup,
    input: &Buffer,
    range: Range<usize>,
    output: &Buffer,
) -> u32 {
    let lanes = group.size();
    let chunk = range.len().div_ceil(lanes.max(1));
    let lane_range = |lane: usize| {
        let begin = (range.start + lane * chunk).min(range.end);
        let end = (begin + chunk).min(range.end);
        begin..end
    };

    let mut sums = vec![0u32; lanes];
    group.phase(|lane| {
        sums[lane] = lane_range(lane).fold(0u32, |acc, i| acc.wrapping_add(input.load(i)));
    });

    let total = group_scan(group, &mut sums, ScanMode::Exclusive);

    group.phase(|lane| {
        let mut running = sums[lane];
        for i in lane_range(lane) {
            let value = input.load(i);
            output.store(i, running);
            running = running.wrapping_add(value);
        }
    });
    total
}

/// Buffers for one standalone prefix sum of `n` elements.
#[derive(Debug)]
pub struct PrefixSumArgs {
    input_count: usize,
    group_size: usize,
    /// length `n`
    output: Buffer,
    /// length `block_count`, per-block totals
    block_sums: Buffer,
    /// length `block_count`, exclusive scan of `block_sums`
    block_offsets: Buffer,
}

impl PrefixSumArgs {
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn block_count(&self) -> usize {
        self.block_sums.len()
    }

    pub fn output(&self) -> &Buffer {
        &self.output
    }
}

/// Allocate scan buffers for `n` elements with the default block size.
pub fn allocate(n: usize) -> Result<PrefixSumArgs> {
    allocate_with_group_size(n, PREFIX_SUM_GROUP_SIZE)
}

pub fn allocate_with_group_size(n: usize, group_size: usize) -> Result<PrefixSumArgs> {
    if group_size == 0 {
        return Err(SortError::InvalidConfig(
            "prefix sum group size must be non-zero".to_string(),
        ));
    }
    let block_count = n.div_ceil(group_size);
    Ok(PrefixSumArgs {
        input_count: n,
        group_size,
        output: Buffer::new("prefixSumOutput", n),
        block_sums: Buffer::new("prefixSumBlockSums", block_count),
        block_offsets: Buffer::new("prefixSumBlockOffsets", block_count),
    })
}

/// Scan `input` and return the buffer holding the result.
pub fn run<'a>(
    ctx: &ExecutionContext,
    input: &Buffer,
    args: &'a mut PrefixSumArgs,
    mode: ScanMode,
) -> Result<&'a Buffer> {
    let args: &'a PrefixSumArgs = args;
    let n = args.input_count;
    if input.len() != n {
        return Err(SortError::LengthMismatch {
            expected: n,
            actual: input.len(),
        });
    }

    let block_count = args.block_count();
    ctx.check_group_size(args.group_size)?;
    ctx.check_grid(block_count)?;
    if n == 0 {
        return Ok(&args.output);
    }
    debug!("prefix sum: n={n}, blocks={block_count}, mode={mode:?}");

    ctx.dispatch(
        &ScanBlocks {
            input,
            output: &args.output,
            block_sums: &args.block_sums,
            input_count: n,
            lanes: args.group_size,
            mode,
        },
        block_count,
    )?;

    if block_count > 1 {
        ctx.dispatch(
            &ScanBlockSums {
                block_sums: &args.block_sums,
                block_offsets: &args.block_offsets,
                lanes: args.group_size,
            },
            1,
        )?;
        ctx.dispatch(
            &AddBlockOffsets {
                output: &args.output,
                block_offsets: &args.block_offsets,
                input_count: n,
                lanes: args.group_size,
            },
            block_count,
        )?;
    }
    Ok(&args.output)
}

struct ScanBlocks<'a> {
    input: &'a Buffer,
    output: &'a Buffer,
    block_sums: &'a Buffer,
    input_count: usize,
    lanes: usize,
    mode: ScanMode,
}

impl Kernel for ScanBlocks<'_> {
    fn name(&self) -> &'static str {
        "scan_blocks"
    }

    fn group_size(&self) -> usize {
        self.lanes
    }

    fn execute(&self, group: &WorkGroup) {
        let base = group.id() * group.size();
        let mut scratch = vec![0u32; group.size()];
        group.phase(|lane| {
            let i = base + lane;
            if i < self.input_count {
                scratch[lane] = self.input.load(i);
            }
        });

        let total = group_scan(group, &mut scratch, self.mode);

        group.phase(|lane| {
            let i = base + lane;
            if i < self.input_count {
                self.output.store(i, scratch[lane]);
            }
            if lane == 0 {
                self.block_sums.store(group.id(), total);
            }
        });
    }
}

struct ScanBlockSums<'a> {
    block_sums: &'a Buffer,
    block_offsets: &'a Buffer,
    lanes: usize,
}

impl Kernel for ScanBlockSums<'_> {
    fn name(&self) -> &'static str {
        "scan_block_sums"
    }

    fn group_size(&self) -> usize {
        self.lanes
    }

    fn execute(&self, group: &WorkGroup) {
        group_scan_chunked(
            group,
            self.block_sums,
            0..self.block_sums.len(),
            self.block_offsets,
        );
    }
}

struct AddBlockOffsets<'a> {
    output: &'a Buffer,
    block_offsets: &'a Buffer,
    input_count: usize,
    lanes: usize,
}

impl Kernel for AddBlockOffsets<'_> {
    fn name(&self) -> &'static str {
        "add_block_offsets"
    }

    fn group_size(&self) -> usize {
        self.lanes
    }

    fn execute(&self, group: &WorkGroup) {
        let base = group.id() * group.size();
        let carry = self.block_offsets.load(group.id());
        group.phase(|lane| {
            let i = base + lane;
            if i < self.input_count {
                self.output.store(i, self.output.load(i).wrapping_add(carry));
            }
        });
    }
}
