use std::time::{Duration, Instant};

use clap::Parser;
use clob_engine::{Engine, EngineConfig, Side};
use hdrhistogram::Histogram;
use rust_decimal::Decimal;

/// Measure per-call latency of `Engine::submit` on a churning book.
#[derive(Parser, Debug)]
#[command(name = "latency-report")]
struct Args {
    /// Number of submissions to time
    #[arg(short = 'n', long, default_value_t = 1_000_000)]
    iterations: u64,

    /// Arena nodes pre-allocated (defaults to CLOB_INITIAL_CAPACITY or 1M)
    #[arg(long)]
    capacity: Option<u32>,

    /// Pin this thread to the last core before measuring
    #[arg(long)]
    pin: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = EngineConfig::from_env()?;
    if let Some(capacity) = args.capacity {
        config.initial_capacity = capacity;
    }
    config.pin_to_core |= args.pin;

    println!("Preparing Latency Benchmark...");

    let mut engine = Engine::new(config);
    if engine.config().pin_to_core {
        engine.pin_to_core();
    }
    engine.warm_up();

    let mut histogram = Histogram::<u64>::new_with_bounds(1, 1_000_000, 3)?;

    println!("Running {} iterations...", args.iterations);

    let mut total_duration = Duration::ZERO;

    for i in 0..args.iterations {
        // Bids at 99.00..99.49, asks at 99.50..99.99: alternating sides
        // that occasionally cross, so the book both grows and trades.
        let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
        let price = Decimal::new(9900 + (i % 100) as i64, 2);

        // Critical measurement section
        let start = Instant::now();
        let result = engine.submit_limit(side, price, 10);
        let elapsed = start.elapsed();
        std::hint::black_box(result)?;

        // Saturate instead of failing on outliers beyond the upper bound
        histogram.saturating_record(elapsed.as_nanos() as u64);
        total_duration += elapsed;
    }

    println!("\n=== Latency Report (ns) ===");
    println!("Total Ops:  {}", args.iterations);
    println!("Throughput: {:.2} ops/sec", args.iterations as f64 / total_duration.as_secs_f64());
    println!("Trades:     {}", engine.trade_count());
    println!("Resting:    {}", engine.order_count());
    println!("---------------------------");
    println!("Min:    {:6} ns", histogram.min());
    println!("P50:    {:6} ns", histogram.value_at_quantile(0.50));
    println!("P90:    {:6} ns", histogram.value_at_quantile(0.90));
    println!("P99:    {:6} ns", histogram.value_at_quantile(0.99));
    println!("P99.9:  {:6} ns", histogram.value_at_quantile(0.999));
    println!("P99.99: {:6} ns", histogram.value_at_quantile(0.9999));
    println!("Max:    {:6} ns", histogram.max());
    println!("---------------------------");

    println!("\nDistribution:");
    let mut lower = 0;
    for v in histogram.iter_log(100, 2.0) {
        let upper = v.value_iterated_to();
        let count = v.count_since_last_iteration();
        if count > 0 {
            println!("{:8} ns - {:8} ns: {:10} count", lower, upper, count);
        }
        lower = upper + 1;
    }

    Ok(())
}
