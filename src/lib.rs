//! # visionlabel
//!
//! Image classification for still photos and live frame feeds, built on the
//! Burn framework.
//!
//! ## Features
//!
//! - **Three inputs**: a picked image file, a shutter capture, or a continuous frame feed
//! - **Ranked results**: `(label, confidence)` pairs sorted by descending confidence
//! - **Drop-while-busy live feed**: frames that arrive during inference are discarded, never queued
//! - **Explicit handoff**: results reach the screen state over a single-consumer channel
//!
//! ## Modules
//!
//! - `acquisition`: still image loading and frame sources
//! - `inference`: the `Classifier` seam, burn classifier, worker thread, FPS and benchmarks
//! - `model`: CNN architecture, model variants and label tables
//! - `feed`: capture session lifecycle
//! - `presentation`: headline, rows and FPS text
//! - `controller`: wires inputs, inference and presentation together
//! - `config`, `utils`: configuration, errors and logging
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use visionlabel::backend::{default_device, DefaultBackend};
//! use visionlabel::{BurnClassifier, Labels, ModelConfig, ResultsView, ScreenController};
//!
//! let device = default_device();
//! let classifier = BurnClassifier::<DefaultBackend>::load(
//!     &ModelConfig::default(), Some(weights), Labels::load(labels)?, &device)?;
//! let mut screen = ScreenController::new(classifier, ResultsView::new(variant), capture)?;
//! screen.pick_image(path)?;
//! screen.wait_for_update(timeout)?;
//! println!("{}", screen.view().headline());
//! ```

pub mod acquisition;
pub mod backend;
pub mod config;
pub mod controller;
pub mod feed;
pub mod inference;
pub mod model;
pub mod presentation;
pub mod utils;

pub use acquisition::{DirectoryFrameSource, Frame, FrameSource, ImageSource, SyntheticFrameSource};
pub use config::AppConfig;
pub use controller::{Mode, ScreenController};
pub use feed::{CaptureSession, CaptureSessionConfig, SessionState};
pub use inference::{BurnClassifier, ClassificationResult, Classifier, InferenceWorker, Observation};
pub use model::{Labels, ModelConfig, ModelVariant};
pub use presentation::{ResultsView, RowPolicy, ScreenVariant};
pub use utils::error::{Result, VisionError};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
