//! Inference module: classification, off-thread dispatch and benchmarking
//!
//! This module provides:
//! - The [`Classifier`] seam and its burn-backed implementation
//! - Ranking of class scores into labelled observations
//! - A worker thread that owns the classifier and reports timestamped completions
//! - Instantaneous FPS and latency benchmarking

pub mod benchmark;
pub mod classifier;
pub mod fps;
pub mod predictor;
pub mod runner;
pub mod worker;

pub use benchmark::{BenchmarkConfig, BenchmarkResult, LatencyStats, Timer};
pub use classifier::{BurnClassifier, Classifier};
pub use fps::{fps_from_duration, fps_from_interval, instantaneous_fps};
pub use predictor::{BatchPredictionStats, ClassificationResult, Observation, TOP_K};
pub use runner::{run_benchmark, TARGET_LATENCY_MS};
pub use worker::{Completion, InferenceJob, InferenceWorker, JobSender, Offer, COMPLETION_CAPACITY};
