//! Prediction types and image preprocessing
//!
//! Turns a decoded image into the normalised CHW buffer the network expects,
//! and turns a probability vector back into a ranked list of labelled
//! observations.

use std::path::PathBuf;
use std::time::Duration;

use image::{imageops::FilterType, DynamicImage};
use serde::{Deserialize, Serialize};

use crate::model::{Labels, IMAGENET_MEAN, IMAGENET_STD};
use crate::utils::error::{Result, VisionError};

/// Number of ranked rows shown by capped result views
pub const TOP_K: usize = 5;

/// Resize an image to the target dimensions
pub fn resize_image(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    image.resize_exact(width, height, FilterType::Triangle)
}

/// Normalize an image to a flat vector with ImageNet normalization
/// Returns CHW layout: [C, H, W] flattened
pub fn normalize_image(image: &DynamicImage) -> Vec<f32> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let num_pixels = (width * height) as usize;

    let mut normalized = vec![0.0f32; 3 * num_pixels];

    for (i, pixel) in rgb.pixels().enumerate() {
        normalized[i] = (pixel[0] as f32 / 255.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        normalized[num_pixels + i] = (pixel[1] as f32 / 255.0 - IMAGENET_MEAN[1]) / IMAGENET_STD[1];
        normalized[2 * num_pixels + i] =
            (pixel[2] as f32 / 255.0 - IMAGENET_MEAN[2]) / IMAGENET_STD[2];
    }

    normalized
}

/// Resize and normalize in one step, for a square network input
pub fn preprocess(image: &DynamicImage, input_size: usize) -> Vec<f32> {
    let resized = resize_image(image, input_size as u32, input_size as u32);
    normalize_image(&resized)
}

/// One labelled class score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub label: String,
    /// Probability in [0, 1]
    pub confidence: f32,
}

impl Observation {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Ranked output of one classification call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Observations sorted by descending confidence
    pub observations: Vec<Observation>,

    /// Time spent in preprocessing and the forward pass
    pub inference_time_ms: f64,

    /// Source image path, for library picks
    pub image_path: Option<PathBuf>,
}

impl ClassificationResult {
    /// Rank a probability vector into labelled observations
    ///
    /// An empty vector is the "unexpected result shape" case and is reported
    /// as an inference error.
    pub fn from_probabilities(
        probabilities: &[f32],
        labels: &Labels,
        inference_time: Duration,
    ) -> Result<Self> {
        if probabilities.is_empty() {
            return Err(VisionError::Inference(
                "classifier returned no class scores".to_string(),
            ));
        }

        let mut indexed: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| b.1.total_cmp(&a.1));

        let observations = indexed
            .into_iter()
            .map(|(idx, p)| Observation::new(labels.name(idx), p))
            .collect();

        Ok(Self {
            observations,
            inference_time_ms: inference_time.as_secs_f64() * 1000.0,
            image_path: None,
        })
    }

    /// Build from observations that are already ranked
    pub fn from_ranked(observations: Vec<Observation>, inference_time: Duration) -> Result<Self> {
        if observations.is_empty() {
            return Err(VisionError::Inference(
                "classifier returned no observations".to_string(),
            ));
        }
        let result = Self {
            observations,
            inference_time_ms: inference_time.as_secs_f64() * 1000.0,
            image_path: None,
        };
        if !result.is_ranked() {
            return Err(VisionError::Inference(
                "observations are not sorted by confidence".to_string(),
            ));
        }
        Ok(result)
    }

    pub fn with_image_path(mut self, path: PathBuf) -> Self {
        self.image_path = Some(path);
        self
    }

    /// Highest-confidence observation
    pub fn top(&self) -> Option<&Observation> {
        self.observations.first()
    }

    /// First `k` observations (fewer if there are not that many classes)
    pub fn top_k(&self, k: usize) -> &[Observation] {
        &self.observations[..k.min(self.observations.len())]
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Whether observations are in non-increasing confidence order
    pub fn is_ranked(&self) -> bool {
        self.observations
            .windows(2)
            .all(|pair| pair[0].confidence >= pair[1].confidence)
    }
}

/// Batch prediction statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchPredictionStats {
    /// Total number of images processed
    pub total_images: usize,

    /// Total inference time
    pub total_time_ms: f64,

    /// Average inference time per image
    pub avg_time_per_image_ms: f64,

    /// Minimum inference time
    pub min_time_ms: f64,

    /// Maximum inference time
    pub max_time_ms: f64,

    /// Throughput (images per second)
    pub throughput: f64,

    /// Number of predictions whose top confidence reached the threshold
    pub high_confidence_count: usize,

    /// Confidence threshold used
    pub confidence_threshold: f32,
}

impl BatchPredictionStats {
    /// Calculate statistics from a batch of results
    pub fn from_results(results: &[ClassificationResult], confidence_threshold: f32) -> Self {
        if results.is_empty() {
            return Self::default();
        }

        let times: Vec<f64> = results.iter().map(|r| r.inference_time_ms).collect();
        let total_time_ms: f64 = times.iter().sum();
        let total_images = results.len();

        let high_confidence_count = results
            .iter()
            .filter_map(|r| r.top())
            .filter(|top| top.confidence >= confidence_threshold)
            .count();

        let throughput = if total_time_ms > 0.0 {
            total_images as f64 / (total_time_ms / 1000.0)
        } else {
            0.0
        };

        Self {
            total_images,
            total_time_ms,
            avg_time_per_image_ms: total_time_ms / total_images as f64,
            min_time_ms: times.iter().cloned().fold(f64::INFINITY, f64::min),
            max_time_ms: times.iter().cloned().fold(0.0, f64::max),
            throughput,
            high_confidence_count,
            confidence_threshold,
        }
    }
}

impl std::fmt::Display for BatchPredictionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Batch Prediction Statistics:")?;
        writeln!(f, "  Total images: {}", self.total_images)?;
        writeln!(f, "  Total time: {:.2} ms", self.total_time_ms)?;
        writeln!(f, "  Average time/image: {:.2} ms", self.avg_time_per_image_ms)?;
        writeln!(f, "  Min time: {:.2} ms", self.min_time_ms)?;
        writeln!(f, "  Max time: {:.2} ms", self.max_time_ms)?;
        writeln!(f, "  Throughput: {:.2} images/sec", self.throughput)?;
        writeln!(
            f,
            "  High confidence (>={:.0}%): {} ({:.1}%)",
            self.confidence_threshold * 100.0,
            self.high_confidence_count,
            100.0 * self.high_confidence_count as f64 / self.total_images.max(1) as f64
        )?;
        Ok(())
    }
}
