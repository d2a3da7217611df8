//! Clockpool Benchmark Tool
//!
//! Runs independent buffer pools in parallel, each over its own in-memory
//! store, and reports hit ratio, eviction counts and operation latency.

use clap::Parser;
use clockpool::buffer::{BufferError, BufferPool, PoolStats, StoreRef};
use clockpool::infrastructure::setup_logger_with;
use clockpool::store::MemStore;
use clockpool::types::{BufferPoolConfig, LogLevel};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

mod metrics;
mod scenarios;

use metrics::Metrics;
use scenarios::Scenario;

#[derive(Parser, Debug, Clone)]
#[command(name = "clockpool-bench")]
#[command(about = "Clock buffer pool benchmark tool")]
struct Args {
    #[arg(short = 'f', long, default_value = "1024")]
    frames: usize,

    #[arg(short = 'p', long, default_value = "8192")]
    pages: u64,

    #[arg(short = 'n', long, default_value = "1000000")]
    ops: u64,

    #[arg(short = 'w', long, default_value = "0.2")]
    write_ratio: f64,

    #[arg(long, default_value = "1")]
    pools: usize,

    #[arg(short = 's', long, default_value = "hot_cold")]
    scenario: String,

    #[arg(long, default_value = "0")]
    seed: u64,

    #[arg(short = 'v', long)]
    verbose: bool,
}

struct PoolReport {
    pool_id: usize,
    stats: PoolStats,
    elapsed: Duration,
}

fn run_pool(
    pool_id: usize,
    scenario: &dyn Scenario,
    metrics: &Metrics,
    args: &Args,
) -> Result<PoolReport, BufferError> {
    let seed = args.seed.wrapping_add(pool_id as u64 * 0x9e3779b97f4a7c15);
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let store: StoreRef = Arc::new(MemStore::with_pages(&format!("bench-{}", pool_id), args.pages));
    let mut pool = BufferPool::new(BufferPoolConfig::with_frames(args.frames))?;

    let start_time = Instant::now();
    for step in 0..args.ops {
        let page_id = scenario.next_page(step, &mut rng);
        let dirty = rng.gen_bool(args.write_ratio);

        let start = Instant::now();
        let result = pool.fetch_page(&store, page_id).and_then(|handle| {
            if dirty {
                pool.page_mut(&handle)?.write_at(8, &step.to_le_bytes());
            }
            pool.release_page(&store, page_id, dirty)
        });
        match result {
            Ok(()) => metrics.record_op(start.elapsed().as_nanos() as u64),
            Err(err) => {
                log::warn!("pool {} step {}: {}", pool_id, step, err);
                metrics.record_error();
            }
        }
    }
    pool.flush_all()?;
    let elapsed = start_time.elapsed();

    if args.verbose {
        pool.log_dump();
    }
    let stats = pool.stats();
    pool.close()?;
    Ok(PoolReport {
        pool_id,
        stats,
        elapsed,
    })
}

fn main() {
    let args = Args::parse();

    let mut log_config = BufferPoolConfig::with_frames(args.frames);
    log_config.log_level = if args.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    };
    setup_logger_with(&log_config);

    let Some(scenario) = scenarios::from_name(&args.scenario, args.pages) else {
        eprintln!("Unknown scenario: {}", args.scenario);
        std::process::exit(1);
    };
    if !(0.0..=1.0).contains(&args.write_ratio) {
        eprintln!("write ratio must be within [0, 1], got {}", args.write_ratio);
        std::process::exit(1);
    }

    println!("Clockpool Benchmark Tool");
    println!("========================");
    println!("Started: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("Scenario: {}", scenario.name());
    println!("Pools: {}", args.pools);
    println!("Frames per pool: {}", args.frames);
    println!("Pages per store: {}", args.pages);
    println!("Operations per pool: {}", args.ops);
    println!("Write ratio: {:.2}", args.write_ratio);
    println!();

    println!("Running benchmark...");
    let metrics = Metrics::new();
    let reports = Mutex::new(Vec::with_capacity(args.pools));
    let start_time = Instant::now();

    (0..args.pools).into_par_iter().for_each(|pool_id| {
        match run_pool(pool_id, scenario.as_ref(), &metrics, &args) {
            Ok(report) => reports.lock().push(report),
            Err(err) => {
                eprintln!("pool {} failed: {}", pool_id, err);
                metrics.record_error();
            }
        }
    });

    let elapsed = start_time.elapsed();
    let mut reports = reports.into_inner();
    reports.sort_by_key(|report| report.pool_id);

    let mut total = PoolStats::default();
    println!();
    println!("Pool statistics:");
    for report in &reports {
        let stats = report.stats;
        println!(
            "    pool {:>3}: hits {:>10} misses {:>10} ratio {:5.1}% evictions {:>10} writebacks {:>10} ({:.2}s)",
            report.pool_id,
            stats.hits,
            stats.misses,
            stats.hit_ratio() * 100.0,
            stats.evictions,
            stats.writebacks,
            report.elapsed.as_secs_f64()
        );
        total.hits += stats.hits;
        total.misses += stats.misses;
        total.evictions += stats.evictions;
        total.writebacks += stats.writebacks;
    }

    let total_ops = metrics.total_ops();
    let ops_per_sec = total_ops as f64 / elapsed.as_secs_f64();
    println!();
    println!("Totals:");
    println!("    operations:        {:>12} ({:.1} ops/s)", total_ops, ops_per_sec);
    println!("    hit ratio:         {:>11.1}%", total.hit_ratio() * 100.0);
    println!("    evictions:         {:>12}", total.evictions);
    println!("    writebacks:        {:>12}", total.writebacks);
    println!(
        "    op latency:        {:8.2} us (avg), {:8.2} us (max)",
        metrics.avg_latency_us(),
        metrics.max_latency_us()
    );
    println!("    errors:            {:>12}", metrics.total_errors());
}
