//! Sample sort driver.
//!
//! Generates (or reads) a collection, sorts it through the scatter/sort/gather
//! pipeline, verifies the result and prints a summary. `--benchmark` compares
//! the pipeline over each transport against single-call sorts across a range
//! of sizes.
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sample_sort::config::default_worker_count;
use sample_sort::cpu_sort::is_sorted;
use sample_sort::input::{
    generate_array, parse_typed, ParsedValues, ValueType, DEFAULT_LEN, DEFAULT_MAX_VALUE,
};
use sample_sort::report::{RunRecord, RunReport, REFERENCE_BASELINE};
use sample_sort::{cpu_parallel_sort, cpu_sort};
use sample_sort::{Coordinator, LocalSort, PipelineConfig, SortKey, TransportKind};

/// Sizes covered by `--benchmark`.
const BENCHMARK_SIZES: [usize; 7] = [
    1 << 10, // 1K
    1 << 12, // 4K
    1 << 14, // 16K
    1 << 16, // 64K
    1 << 18, // 256K
    1 << 20, // 1M
    1 << 22, // 4M
];

#[derive(Debug, Parser)]
#[command(name = "sample-sort", version, about = "Range-partitioned sample sort")]
struct Args {
    /// Number of buckets, one worker each (at least 2)
    #[arg(short, long, env = "SAMPLE_SORT_WORKERS", default_value_t = default_worker_count())]
    workers: usize,

    /// Number of values to generate
    #[arg(short, long, default_value_t = DEFAULT_LEN)]
    size: usize,

    /// Generated values fall in [0, max_value)
    #[arg(long, default_value_t = DEFAULT_MAX_VALUE)]
    max_value: u32,

    /// Seed for reproducible input
    #[arg(long)]
    seed: Option<u64>,

    /// Read numbers from a file instead of generating them ("-" for stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Element type for --input: auto, i64, u64 or f64
    #[arg(long, default_value_t = ValueType::Auto)]
    value_type: ValueType,

    /// How buckets reach their workers
    #[arg(short, long, env = "SAMPLE_SORT_TRANSPORT", default_value_t = TransportKind::Channel)]
    transport: TransportKind,

    /// Local sort each worker applies
    #[arg(short, long, default_value_t = LocalSort::Unstable)]
    algorithm: LocalSort,

    /// Fail the run if a worker has not replied within this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print the sorted sequence
    #[arg(long)]
    print: bool,

    /// Write a Links Notation report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Run the multi-size comparison instead of a single sort
    #[arg(long)]
    benchmark: bool,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(self.workers)
            .with_transport(self.transport)
            .with_algorithm(self.algorithm);
        if let Some(ms) = self.timeout_ms {
            config = config.with_gather_timeout(Duration::from_millis(ms));
        }
        config
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.benchmark { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_names(true)
        .init();

    if args.benchmark {
        return run_benchmark(&args);
    }

    println!("Sample Sort");
    println!("===========\n");

    match &args.input {
        Some(path) => {
            let text = read_input(path)?;
            let values = parse_typed(&text, args.value_type)
                .with_context(|| format!("cannot read numbers from {}", path.display()))?;
            println!(
                "Input: {} {} values from {}",
                values.len(),
                values.value_type(),
                path.display()
            );
            match values {
                ParsedValues::I64(values) => sort_once(&args, values),
                ParsedValues::U64(values) => sort_once(&args, values),
                ParsedValues::F64(values) => sort_once(&args, values),
            }
        }
        None => {
            let values = generate_array(args.size, args.max_value, args.seed);
            match args.seed {
                Some(seed) => println!(
                    "Input: {} random values below {} (seed {})",
                    values.len(),
                    args.max_value,
                    seed
                ),
                None => println!("Input: {} random values below {}", values.len(), args.max_value),
            }
            sort_once(&args, values)
        }
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("cannot read stdin")?;
        Ok(text)
    } else {
        fs::read_to_string(path).with_context(|| format!("cannot open {}", path.display()))
    }
}

fn sort_once<T: SortKey>(args: &Args, values: Vec<T>) -> Result<()> {
    let coordinator = Coordinator::from_config(args.pipeline_config())?;
    let config = coordinator.config();
    println!(
        "Workers: {}  Transport: {}  Local sort: {}",
        config.worker_count, config.transport, config.algorithm
    );
    if let Some(timeout) = config.gather_timeout {
        println!("Gather timeout: {} ms", timeout.as_millis());
    }

    let input_len = values.len();
    let output = coordinator.run(values)?;
    let stats = &output.stats;

    println!("\n--- Buckets ---");
    for (index, (size, time)) in stats.bucket_sizes.iter().zip(&stats.worker_times).enumerate() {
        println!(
            "bucket {:>3}: {:>10} values  sorted in {:.3} ms",
            index,
            size,
            time.as_secs_f64() * 1000.0
        );
    }
    println!("imbalance: {:.2}x of an even split", stats.imbalance());

    println!("\n--- Timing ---");
    println!("partition: {:.3} ms", stats.partition_time.as_secs_f64() * 1000.0);
    println!("exchange:  {:.3} ms", stats.exchange_time.as_secs_f64() * 1000.0);
    println!("total:     {:.3} ms", stats.total_time.as_secs_f64() * 1000.0);

    let verified = output.values.len() == input_len && is_sorted(&output.values);
    if !verified {
        bail!("pipeline output failed verification");
    }
    println!("\nSort verified: OK");

    if args.print {
        println!("\n{:?}", output.values);
    }

    if let Some(path) = &args.report {
        let mut report = RunReport::new("single sample sort run");
        report.add_run(RunRecord::from_stats(stats, verified));
        report
            .save_lino(path)
            .with_context(|| format!("cannot write report to {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }

    Ok(())
}

/// Time one closure over a fresh copy of `data`, returning milliseconds and
/// whether the result came out sorted.
fn time_baseline(data: &[u32], sort: impl Fn(&mut [u32])) -> (f64, bool) {
    let mut copy = data.to_vec();
    let start = Instant::now();
    sort(&mut copy);
    let ms = start.elapsed().as_secs_f64() * 1000.0;
    (ms, is_sorted(&copy))
}

/// Run benchmarks across multiple array sizes
fn run_benchmark(args: &Args) -> Result<()> {
    println!("====================================");
    println!("Sample sort benchmark ({} workers, {} local sort)", args.workers, args.algorithm);
    println!("====================================\n");

    let coordinators = TransportKind::ALL
        .into_iter()
        .map(|kind| {
            let config = PipelineConfig::new(args.workers)
                .with_transport(kind)
                .with_algorithm(args.algorithm);
            Coordinator::from_config(config).map(|c| (kind, c))
        })
        .collect::<sample_sort::Result<Vec<_>>>()?;

    println!(
        "{:>10} | {:>12} | {:>12} | {:>12} | {:>12} | {:>12}",
        "Size", "std (ms)", "rayon (ms)", "channel", "rayon pool", "inline"
    );
    println!(
        "{:-<10}-+-{:-<12}-+-{:-<12}-+-{:-<12}-+-{:-<12}-+-{:-<12}",
        "", "", "", "", "", ""
    );

    let mut report = RunReport::new("sample sort benchmark");
    let mut rng = rand::thread_rng();

    for &size in &BENCHMARK_SIZES {
        let data: Vec<u32> = (0..size).map(|_| rng.gen()).collect();

        let (std_ms, std_ok) = time_baseline(&data, cpu_sort::sort_unstable::<u32>);
        report.add_run(RunRecord::baseline(REFERENCE_BASELINE, size, std_ms, std_ok));

        let (rayon_ms, rayon_ok) = time_baseline(&data, cpu_parallel_sort::parallel_sort::<u32>);
        report.add_run(RunRecord::baseline("rayon_parallel", size, rayon_ms, rayon_ok));

        let mut cells = Vec::with_capacity(coordinators.len());
        for (kind, coordinator) in &coordinators {
            match coordinator.run(data.clone()) {
                Ok(output) => {
                    let verified = output.values.len() == size && is_sorted(&output.values);
                    let record = RunRecord::from_stats(&output.stats, verified);
                    cells.push(if verified {
                        format!("{:.3}", record.total_ms)
                    } else {
                        "ERROR".to_string()
                    });
                    report.add_run(record);
                }
                Err(err) => {
                    warn!(transport = %kind, size, error = %err, "benchmark run failed");
                    cells.push("ERROR".to_string());
                }
            }
        }

        println!(
            "{:>10} | {:>12.3} | {:>12.3} | {:>12} | {:>12} | {:>12}",
            size, std_ms, rayon_ms, cells[0], cells[1], cells[2]
        );
    }

    println!("\nPipeline columns include partitioning, transport and concatenation.");

    if let Some(path) = &args.report {
        report
            .save_lino(path)
            .with_context(|| format!("cannot write report to {}", path.display()))?;
        println!("Report written to: {}", path.display());
    }

    Ok(())
}
