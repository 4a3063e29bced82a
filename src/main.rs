//! Radix sort benchmark
//!
//! Compares the work-group radix sort against CPU baselines:
//! - **std sort_unstable**: pattern-defeating quicksort
//! - **CPU radix sort**: serial LSD reference with the same pass structure
//! - **Device radix sort**: the four-kernel pipeline, value or ordering mode
//!
//! With `--prefix-sum` it benchmarks the standalone scan instead.

use std::time::Instant;

use clap::Parser;
use gpu_radix_sort::buffer::Buffer;
use gpu_radix_sort::cpu_radix_sort;
use gpu_radix_sort::device::{ContextConfig, ExecutionContext, Marker};
use gpu_radix_sort::prefix_sum::{self, ScanMode};
use gpu_radix_sort::radix_sort::{self, SortConfig};
use gpu_radix_sort::Result;
use log::error;
use rand::Rng;

/// Default array size for benchmarking
const DEFAULT_ARRAY_SIZE: usize = 1 << 20; // 1 million elements

/// Benchmark tool for the parallel radix sort and prefix sum
#[derive(Parser, Debug)]
#[command(name = "gpu-radix-sort", version, about)]
struct Args {
    /// Number of keys to sort
    #[arg(short, long, default_value_t = DEFAULT_ARRAY_SIZE)]
    size: usize,

    /// Worker threads (0 = one per core)
    #[arg(short, long, default_value_t = 0)]
    threads: usize,

    /// Return the sorting permutation instead of sorted keys
    #[arg(long)]
    ordering: bool,

    /// Benchmark the prefix sum instead of the sort
    #[arg(long)]
    prefix_sum: bool,

    /// Sweep array sizes from 1K to 4M
    #[arg(long)]
    benchmark: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let ctx = match ExecutionContext::new(ContextConfig {
        threads: args.threads,
        ..ContextConfig::default()
    }) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("failed to create compute context: {e}");
            std::process::exit(1);
        }
    };

    let outcome = if args.prefix_sum {
        benchmark_prefix_sum(&ctx, args.size)
    } else {
        compare_sorts(&ctx, args.size, args.ordering).and_then(|()| {
            if args.benchmark {
                run_benchmark(&ctx, args.ordering)
            } else {
                Ok(())
            }
        })
    };

    if let Err(e) = outcome {
        error!("{e}");
        std::process::exit(1);
    }
}

fn random_keys(size: usize) -> Vec<u32> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

fn print_markers(markers: &[Marker]) {
    for marker in markers {
        println!(
            "  {:<22} {:>6} groups {:>10.3} ms",
            marker.name,
            marker.groups,
            marker.elapsed_ms()
        );
    }
}

/// Sort with the device pipeline and return (elapsed ms, verified).
fn device_sort(ctx: &ExecutionContext, data: &[u32], ordering: bool) -> Result<(f64, bool)> {
    let input = Buffer::from_slice("inputBuffer", data);
    let mut sort_args = radix_sort::allocate(&SortConfig::default(), data.len(), ordering)?;

    let start = Instant::now();
    let sorted = radix_sort::run(ctx, &input, &mut sort_args)?;
    let ms = start.elapsed().as_secs_f64() * 1000.0;

    let output = sorted.output.to_vec();
    let verified = if ordering {
        let expected = cpu_radix_sort::argsort(data);
        output == expected
    } else {
        cpu_radix_sort::is_sorted(&output) && output.len() == data.len()
    };
    Ok((ms, verified))
}

fn compare_sorts(ctx: &ExecutionContext, size: usize, ordering: bool) -> Result<()> {
    println!("Parallel Radix Sort");
    println!("===================\n");
    println!("Device: {}", ctx.name());
    println!(
        "Array size: {} elements ({} MB), mode: {}",
        size,
        size * 4 / 1_000_000,
        if ordering { "ordering" } else { "values" }
    );

    println!("\nGenerating random data...");
    let data = random_keys(size);

    println!("\n--- CPU Sorting (std::sort unstable / pdqsort) ---");
    let mut cpu_data = data.clone();
    let cpu_start = Instant::now();
    cpu_data.sort_unstable();
    let cpu_ms = cpu_start.elapsed().as_secs_f64() * 1000.0;
    println!("CPU sort time: {:.3} ms", cpu_ms);

    println!("\n--- CPU Sorting (serial LSD radix) ---");
    let mut radix_data = data.clone();
    let radix_start = Instant::now();
    cpu_radix_sort::sort(&mut radix_data);
    let radix_ms = radix_start.elapsed().as_secs_f64() * 1000.0;
    println!("CPU radix sort time: {:.3} ms", radix_ms);
    if radix_data == cpu_data {
        println!("CPU radix sort verified: OK");
    } else {
        println!("ERROR: CPU radix sort failed verification!");
    }

    println!("\n--- Device Sorting (4-kernel radix sort) ---");
    ctx.begin_collect_markers();
    let (device_ms, verified) = device_sort(ctx, &data, ordering)?;
    let markers = ctx.end_collect_markers();
    println!("Device radix sort time: {:.3} ms", device_ms);
    if verified {
        println!("Device radix sort verified: OK");
    } else {
        println!("ERROR: Device radix sort failed verification!");
    }
    print_markers(&markers);

    println!("\n--- Performance Comparison ---");
    let speedup = cpu_ms / device_ms;
    if speedup > 1.0 {
        println!("Device Radix vs CPU: Device is {:.2}x faster", speedup);
    } else {
        println!("Device Radix vs CPU: CPU is {:.2}x faster", 1.0 / speedup);
    }
    println!("Device Radix vs CPU Radix: {:.2}x", radix_ms / device_ms);
    Ok(())
}

/// Run benchmarks across multiple array sizes
fn run_benchmark(ctx: &ExecutionContext, ordering: bool) -> Result<()> {
    println!("\n\n====================================");
    println!("Running comprehensive benchmark...");
    println!("====================================\n");

    let sizes: Vec<usize> = vec![
        1 << 10, // 1K
        1 << 12, // 4K
        1 << 14, // 16K
        1 << 16, // 64K
        1 << 18, // 256K
        1 << 20, // 1M
        1 << 22, // 4M
    ];

    println!(
        "{:>12} | {:>12} | {:>14} | {:>14} | {:>12}",
        "Size", "CPU (ms)", "CPU Radix", "Device Radix", "Device/CPU"
    );
    println!("{:-<12}-+-{:-<12}-+-{:-<14}-+-{:-<14}-+-{:-<12}", "", "", "", "", "");

    for &size in &sizes {
        let data = random_keys(size);

        let mut cpu_data = data.clone();
        let cpu_start = Instant::now();
        cpu_data.sort_unstable();
        let cpu_ms = cpu_start.elapsed().as_secs_f64() * 1000.0;

        let mut radix_data = data.clone();
        let radix_start = Instant::now();
        cpu_radix_sort::sort(&mut radix_data);
        let radix_ms = radix_start.elapsed().as_secs_f64() * 1000.0;

        let (device_ms, speedup) = match device_sort(ctx, &data, ordering)? {
            (ms, true) => (format!("{:.3}", ms), format!("{:.2}x", cpu_ms / ms)),
            (_, false) => ("ERROR".to_string(), "N/A".to_string()),
        };

        println!(
            "{:>12} | {:>12.3} | {:>14.3} | {:>14} | {:>12}",
            size, cpu_ms, radix_ms, device_ms, speedup
        );
    }

    println!("\nNote: Speedup > 1.0x means the device pipeline is faster than CPU");
    Ok(())
}

fn benchmark_prefix_sum(ctx: &ExecutionContext, size: usize) -> Result<()> {
    println!("Prefix sum benchmark: {} elements on {}", size, ctx.name());
    let mut rng = rand::thread_rng();
    let bound = u32::try_from(size.max(1)).unwrap_or(u32::MAX);
    let data: Vec<u32> = (0..size).map(|_| rng.gen_range(0..bound)).collect();

    let input = Buffer::from_slice("input_buffer", &data);
    let mut scan_args = prefix_sum::allocate(size)?;

    ctx.begin_collect_markers();
    let start = Instant::now();
    let output = prefix_sum::run(ctx, &input, &mut scan_args, ScanMode::Exclusive)?.to_vec();
    let device_ms = start.elapsed().as_secs_f64() * 1000.0;
    let markers = ctx.end_collect_markers();

    let cpu_start = Instant::now();
    let expected = cpu_radix_sort::prefix_sum(&data, ScanMode::Exclusive);
    let cpu_ms = cpu_start.elapsed().as_secs_f64() * 1000.0;

    println!("Device scan time: {:.3} ms", device_ms);
    print_markers(&markers);
    println!("CPU scan time: {:.3} ms", cpu_ms);
    if output == expected {
        println!("Prefix sum verified: OK");
    } else {
        println!("ERROR: prefix sum differs from CPU result!");
    }
    Ok(())
}
