//! Benchmark runner
//!
//! Classifies random images through any [`Classifier`] and reports latency,
//! optionally writing the result as JSON.

use colored::Colorize;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use super::benchmark::{BenchmarkConfig, BenchmarkResult, Timer};
use super::classifier::Classifier;
use crate::acquisition::noise_image;
use crate::utils::error::Result;

/// Target per-image latency for a usable live feed (milliseconds)
pub const TARGET_LATENCY_MS: f64 = 100.0;

/// Run a benchmark on a classifier with random input
///
/// Warmup iterations run first and are not recorded. Each timed iteration is
/// one `classify` call, so preprocessing and ranking are included.
pub fn run_benchmark<C: Classifier + ?Sized>(
    classifier: &C,
    config: BenchmarkConfig,
    backend: &str,
) -> Result<BenchmarkResult> {
    println!("{}", "Initializing Benchmark...".green().bold());
    println!("  Classifier: {}", classifier.describe());
    println!("  Backend: {}", backend);
    println!("  Input image: {}x{}", config.image_size, config.image_size);
    println!("  Warmup iterations: {}", config.warmup_iterations);
    println!("  Benchmark iterations: {}", config.iterations);

    let mut rng = StdRng::seed_from_u64(7);
    let image = noise_image(config.image_size, config.image_size, &mut rng);

    println!();
    println!("{}", "Running warmup...".yellow());
    for _ in 0..config.warmup_iterations {
        classifier.classify(&image)?;
    }

    println!("{}", "Running benchmark...".green().bold());
    let mut timer = Timer::new();
    for i in 0..config.iterations {
        timer.start();
        classifier.classify(&image)?;
        timer.stop();

        if config.verbose && (i + 1) % 20 == 0 {
            println!("  Iteration {}/{}", i + 1, config.iterations);
        }
    }

    let output_path = config.output_path.clone();
    let result = BenchmarkResult::from_timings(
        timer.times(),
        config,
        classifier.describe(),
        backend.to_string(),
    );
    info!("{}", result.summary());

    println!();
    println!("{}", "Benchmark Results:".cyan().bold());
    println!(
        "  {} {} ± {} ms",
        "Mean latency:".green(),
        format!("{:.2}", result.latency.mean_ms).bold(),
        format!("{:.2}", result.latency.std_ms)
    );
    println!(
        "  P50/P95/P99: {:.2}/{:.2}/{:.2} ms",
        result.latency.p50_ms, result.latency.p95_ms, result.latency.p99_ms
    );
    println!("  Min/Max: {:.2}/{:.2} ms", result.latency.min_ms, result.latency.max_ms);
    println!(
        "  {} {} FPS",
        "Throughput:".green(),
        format!("{:.1}", result.throughput).bold()
    );

    println!();
    if result.meets_latency_target(TARGET_LATENCY_MS) {
        println!(
            "{} Meets target latency of {} ms",
            "✓".green().bold(),
            TARGET_LATENCY_MS
        );
    } else {
        println!(
            "{} Exceeds target latency of {} ms by {:.1} ms",
            "⚠".yellow().bold(),
            TARGET_LATENCY_MS,
            result.latency.p95_ms - TARGET_LATENCY_MS
        );
    }

    if let Some(path) = output_path {
        result.save(&path)?;
        println!("  Saved results to: {}", path.display());
    }

    Ok(result)
}
