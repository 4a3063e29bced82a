//! Multi-pass LSD radix sort.
//!
//! Each pass sorts stably by one `bits_per_radix`-wide digit, least
//! significant first, with four dispatches in strict order:
//!
//! ```text
//! count_scatter -> prefix_batch_table -> prefix_global_table -> scatter_output
//! ```
//!
//! Two buffers alternate as pass input and pass output. On the first pass
//! the keys come from the caller's input buffer, which is never written.
//!
//! In ordering mode the passes permute indices into the original input
//! instead of the keys themselves, and the result is a permutation `p` with
//! `input[p[0]] <= input[p[1]] <= ...`; ties keep their input order.
//!
//! # Example
//!
//! ```
//! use gpu_radix_sort::buffer::Buffer;
//! use gpu_radix_sort::device::ExecutionContext;
//! use gpu_radix_sort::radix_sort::{allocate, run, SortConfig};
//!
//! let ctx = ExecutionContext::new(Default::default()).unwrap();
//! let input = Buffer::from_slice("input", &[5, 3, 3, 1, 4, 1, 5, 2]);
//! let mut args = allocate(&SortConfig::default(), input.len(), false).unwrap();
//! let sorted = run(&ctx, &input, &mut args).unwrap();
//! assert_eq!(sorted.output.to_vec(), vec![1, 1, 2, 3, 3, 4, 5, 5]);
//! ```

mod args;
pub mod kernels;

use log::debug;

use crate::buffer::Buffer;
use crate::device::ExecutionContext;
use crate::error::{Result, SortError};

pub use args::{
    allocate, PassConstants, SortArgs, SortConfig, CONSTANT_WORDS, DEFAULT_BATCH_SIZE,
    DEFAULT_BITS_PER_RADIX, FLAGS_IS_FIRST_PASS, FLAGS_OUTPUT_ORDERING, KEY_BITS,
    MAX_BITS_PER_RADIX,
};
use kernels::{
    CountScatterBuckets, PrefixCountTable, PrefixGlobalTable, ScatterOutput,
    PREFIX_TABLE_GROUP_SIZE,
};

/// Result of [`run`], borrowed from the [`SortArgs`] it ran on.
#[derive(Debug)]
pub struct SortOutput<'a> {
    /// Sorted keys, or the sorting permutation in ordering mode.
    pub output: &'a Buffer,
    /// Per-digit totals of the last pass.
    pub radix_totals: &'a Buffer,
}

/// Sort `input` with the buffers in `args`.
///
/// All capacity checks happen before the first dispatch. A sort that fails
/// part-way leaves the buffers in `args` in an unspecified state.
pub fn run<'a>(
    ctx: &ExecutionContext,
    input: &Buffer,
    args: &'a mut SortArgs,
) -> Result<SortOutput<'a>> {
    let args: &'a SortArgs = args;
    let n = args.input_count;
    if input.len() != n {
        return Err(SortError::LengthMismatch {
            expected: n,
            actual: input.len(),
        });
    }

    let config = args.config;
    let radix_counts = config.radix_counts();
    let batch_count = config.batch_count(n);
    let table_lanes = PREFIX_TABLE_GROUP_SIZE.min(ctx.limits().max_group_size);
    ctx.check_group_size(config.batch_size)?;
    ctx.check_group_size(radix_counts)?;
    ctx.check_grid(batch_count)?;
    ctx.check_grid(radix_counts)?;

    let mut pass_input = &args.ping;
    let mut pass_output = &args.pong;
    if n == 0 {
        return Ok(SortOutput {
            output: pass_input,
            radix_totals: &args.radix_totals,
        });
    }

    for pass in 0..config.radix_iterations() {
        std::mem::swap(&mut pass_input, &mut pass_output);

        let mut flags = if pass == 0 { FLAGS_IS_FIRST_PASS } else { 0 };
        if args.output_ordering {
            flags |= FLAGS_OUTPUT_ORDERING;
        }
        let constants = PassConstants {
            input_count: n as u32,
            batch_count: batch_count as u32,
            radix_mask: config.radix_mask(),
            radix_shift: config.bits_per_radix * pass,
            batch_size: config.batch_size as u32,
            flags,
        };
        args.constants.upload(&constants.to_words())?;
        debug!(
            "radix pass {pass}: shift={} flags={flags:#04b} {} -> {}",
            constants.radix_shift,
            pass_input.name(),
            pass_output.name()
        );

        // Keys always come from the original input in ordering mode; the
        // permutation so far rides in `pass_input`.
        let (source, ordering) = if args.output_ordering {
            (input, pass_input)
        } else if pass == 0 {
            (input, input)
        } else {
            (pass_input, pass_input)
        };

        ctx.dispatch(
            &CountScatterBuckets {
                source,
                ordering,
                local_offsets: &args.local_offsets,
                count_table: &args.count_table,
                constants: &args.constants,
            },
            batch_count,
        )?;

        ctx.dispatch(
            &PrefixCountTable {
                count_table: &args.count_table,
                batch_prefix: &args.batch_prefix,
                radix_totals: &args.radix_totals,
                constants: &args.constants,
                lanes: table_lanes,
            },
            radix_counts,
        )?;

        ctx.dispatch(
            &PrefixGlobalTable {
                radix_totals: &args.radix_totals,
                global_offsets: &args.global_offsets,
            },
            1,
        )?;

        ctx.dispatch(
            &ScatterOutput {
                source,
                ordering,
                local_offsets: &args.local_offsets,
                batch_prefix: &args.batch_prefix,
                global_offsets: &args.global_offsets,
                output: pass_output,
                constants: &args.constants,
            },
            batch_count,
        )?;
    }

    Ok(SortOutput {
        output: pass_output,
        radix_totals: &args.radix_totals,
    })
}
