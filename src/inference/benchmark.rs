//! Latency benchmarking for the classification path
//!
//! Measures the full per-image cost the live feed pays: preprocessing, the
//! forward pass and ranking.
//!
//! ## Key Metrics
//!
//! - **Latency**: time per classification (ms), with percentiles
//! - **Throughput**: images classified per second, the ceiling for live FPS

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::utils::error::{Result, VisionError};

/// Configuration for benchmarking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Number of warmup iterations (excluded from measurements)
    pub warmup_iterations: usize,

    /// Number of benchmark iterations
    pub iterations: usize,

    /// Side length of the random input image, before resizing
    pub image_size: u32,

    /// Whether to keep individual iteration times
    pub verbose: bool,

    /// Output file for results (optional)
    pub output_path: Option<PathBuf>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            warmup_iterations: 10,
            iterations: 100,
            image_size: 480,
            verbose: false,
            output_path: None,
        }
    }
}

impl BenchmarkConfig {
    /// Create a quick benchmark config for testing
    pub fn quick() -> Self {
        Self {
            warmup_iterations: 2,
            iterations: 10,
            image_size: 240,
            verbose: false,
            output_path: None,
        }
    }
}

/// Results from a benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Classifier description
    pub classifier: String,

    /// Compute backend name
    pub backend: String,

    /// Latency statistics
    pub latency: LatencyStats,

    /// Throughput (images per second)
    pub throughput: f64,

    /// Individual iteration times (if verbose)
    pub iteration_times_ms: Vec<f64>,

    /// Configuration used for this benchmark
    pub config: BenchmarkConfig,

    /// Timestamp of when benchmark was run
    pub timestamp: String,
}

impl BenchmarkResult {
    /// Create a new benchmark result from timing data
    pub fn from_timings(
        timings: &[Duration],
        config: BenchmarkConfig,
        classifier: String,
        backend: String,
    ) -> Self {
        let latency = LatencyStats::from_durations(timings);
        let throughput = if latency.mean_ms > 0.0 {
            1000.0 / latency.mean_ms
        } else {
            0.0
        };

        let iteration_times_ms = if config.verbose {
            timings.iter().map(|d| d.as_secs_f64() * 1000.0).collect()
        } else {
            Vec::new()
        };

        Self {
            classifier,
            backend,
            latency,
            throughput,
            iteration_times_ms,
            config,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Save results to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load results from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VisionError::PathNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Check if p95 latency meets the target (in milliseconds)
    pub fn meets_latency_target(&self, target_ms: f64) -> bool {
        self.latency.p95_ms <= target_ms
    }

    /// Get a summary string
    pub fn summary(&self) -> String {
        format!(
            "Latency: {:.2}ms (mean), {:.2}ms (p95), {:.2}ms (p99) | Throughput: {:.1} img/s",
            self.latency.mean_ms, self.latency.p95_ms, self.latency.p99_ms, self.throughput
        )
    }
}

/// Latency statistics from benchmark
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    /// Mean latency in milliseconds
    pub mean_ms: f64,
    /// Standard deviation in milliseconds
    pub std_ms: f64,
    /// Minimum latency
    pub min_ms: f64,
    /// Maximum latency
    pub max_ms: f64,
    /// Median (50th percentile)
    pub p50_ms: f64,
    /// 95th percentile
    pub p95_ms: f64,
    /// 99th percentile
    pub p99_ms: f64,
}

impl LatencyStats {
    /// Calculate statistics from a list of durations
    pub fn from_durations(durations: &[Duration]) -> Self {
        if durations.is_empty() {
            return Self::default();
        }

        let mut times_ms: Vec<f64> = durations.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        times_ms.sort_by(|a, b| a.total_cmp(b));

        let n = times_ms.len();
        let mean = times_ms.iter().sum::<f64>() / n as f64;
        let variance = times_ms.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n as f64;

        Self {
            mean_ms: mean,
            std_ms: variance.sqrt(),
            min_ms: times_ms[0],
            max_ms: times_ms[n - 1],
            p50_ms: percentile(&times_ms, 50.0),
            p95_ms: percentile(&times_ms, 95.0),
            p99_ms: percentile(&times_ms, 99.0),
        }
    }
}

/// Calculate percentile from sorted data
fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_data.len() - 1) as f64).round() as usize;
    sorted_data[idx.min(sorted_data.len() - 1)]
}

/// Timer utility for benchmarking
pub struct Timer {
    start: Instant,
    times: Vec<Duration>,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            times: Vec::new(),
        }
    }

    pub fn start(&mut self) {
        self.start = Instant::now();
    }

    /// Stop timing and record the duration
    pub fn stop(&mut self) -> Duration {
        let elapsed = self.start.elapsed();
        self.times.push(elapsed);
        elapsed
    }

    pub fn times(&self) -> &[Duration] {
        &self.times
    }

    pub fn stats(&self) -> LatencyStats {
        LatencyStats::from_durations(&self.times)
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_latency_stats() {
        let durations: Vec<Duration> = vec![
            Duration::from_millis(10),
            Duration::from_millis(12),
            Duration::from_millis(11),
            Duration::from_millis(15),
            Duration::from_millis(9),
        ];

        let stats = LatencyStats::from_durations(&durations);

        assert!((stats.mean_ms - 11.4).abs() < 0.1);
        assert_eq!(stats.min_ms, 9.0);
        assert_eq!(stats.max_ms, 15.0);
        assert_eq!(stats.p50_ms, 11.0);
    }

    #[test]
    fn test_empty_durations() {
        assert_eq!(LatencyStats::from_durations(&[]), LatencyStats::default());
    }

    #[test]
    fn test_timer() {
        let mut timer = Timer::new();

        for _ in 0..5 {
            timer.start();
            std::thread::sleep(Duration::from_millis(1));
            timer.stop();
        }

        assert_eq!(timer.times().len(), 5);
        assert!(timer.stats().mean_ms >= 1.0);
    }

    #[test]
    fn test_meets_latency_target() {
        let timings = vec![
            Duration::from_millis(100),
            Duration::from_millis(120),
            Duration::from_millis(110),
        ];
        let result = BenchmarkResult::from_timings(
            &timings,
            BenchmarkConfig::quick(),
            "stub".to_string(),
            "cpu".to_string(),
        );

        assert!(result.meets_latency_target(200.0));
        assert!(!result.meets_latency_target(50.0));
        assert!(result.throughput > 8.0 && result.throughput < 10.0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("bench.json");

        let mut config = BenchmarkConfig::quick();
        config.verbose = true;
        let result = BenchmarkResult::from_timings(
            &[Duration::from_millis(4), Duration::from_millis(6)],
            config,
            "stub".to_string(),
            "cpu".to_string(),
        );
        result.save(&path).unwrap();

        let loaded = BenchmarkResult::load(&path).unwrap();
        assert_eq!(loaded.iteration_times_ms.len(), 2);
        assert_eq!(loaded.latency, result.latency);
    }
}
