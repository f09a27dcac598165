//! Classifier seam
//!
//! Acquisition and the capture session only see [`Classifier`]; the burn
//! network is one implementation of it. The network is built once and reused
//! for every still image and live frame.

use std::path::Path;
use std::time::Instant;

use burn::{
    module::Module,
    record::CompactRecorder,
    tensor::{backend::Backend, Tensor, TensorData},
};
use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::inference::predictor::{preprocess, ClassificationResult};
use crate::model::{ClassifierNet, Labels, ModelConfig};
use crate::utils::error::{Result, VisionError};

/// Anything that turns one image into a ranked label list
pub trait Classifier: Send {
    /// Classify a single image of any size and pixel format
    fn classify(&self, image: &DynamicImage) -> Result<ClassificationResult>;

    /// Short description for logs
    fn describe(&self) -> String {
        "classifier".to_string()
    }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn classify(&self, image: &DynamicImage) -> Result<ClassificationResult> {
        (**self).classify(image)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// burn-backed classifier holding a loaded network
pub struct BurnClassifier<B: Backend> {
    model: ClassifierNet<B>,
    labels: Labels,
    config: ModelConfig,
    device: B::Device,
}

impl<B: Backend> BurnClassifier<B> {
    /// Build the network and load weights when a path is given
    ///
    /// Without weights the network keeps its random initialisation, which is
    /// enough for benchmarking and exercising the pipeline.
    pub fn load(
        config: &ModelConfig,
        weights: Option<&Path>,
        labels: Labels,
        device: &B::Device,
    ) -> Result<Self> {
        config.validate()?;

        if !labels.is_empty() && labels.len() != config.num_classes {
            warn!(
                "Label table has {} entries but the model predicts {} classes",
                labels.len(),
                config.num_classes
            );
        }

        let model = ClassifierNet::<B>::new(&config.to_net_config(), device);
        let model = match weights {
            Some(path) => {
                if !path.exists() {
                    return Err(VisionError::PathNotFound(path.to_path_buf()));
                }
                info!("Loading weights from {}", path.display());
                let recorder = CompactRecorder::new();
                model
                    .load_file(path.to_path_buf(), &recorder, device)
                    .map_err(|e| VisionError::Model(format!("Failed to load model: {:?}", e)))?
            }
            None => {
                warn!("No weights file given; using a randomly initialised network");
                model
            }
        };

        Ok(Self {
            model,
            labels,
            config: config.clone(),
            device: device.clone(),
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }
}

impl<B: Backend> Classifier for BurnClassifier<B> {
    fn classify(&self, image: &DynamicImage) -> Result<ClassificationResult> {
        let start = Instant::now();
        let size = self.config.input_size();

        let data = preprocess(image, size);
        let input =
            Tensor::<B, 4>::from_data(TensorData::new(data, [1, 3, size, size]), &self.device);

        let probs: Vec<f32> = self
            .model
            .forward_softmax(input)
            .into_data()
            .to_vec()
            .map_err(|e| VisionError::Inference(format!("unexpected output tensor: {:?}", e)))?;

        let result = ClassificationResult::from_probabilities(&probs, &self.labels, start.elapsed())?;
        debug!(
            "Classified {}x{} image in {:.2} ms",
            image.width(),
            image.height(),
            result.inference_time_ms
        );
        Ok(result)
    }

    fn describe(&self) -> String {
        format!("{} ({} classes)", self.config.variant, self.config.num_classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    use crate::model::ModelVariant;

    fn tiny_config() -> ModelConfig {
        ModelConfig {
            variant: ModelVariant::MobileNet050_160,
            num_classes: 4,
            dropout_rate: 0.0,
        }
    }

    #[test]
    fn test_burn_classifier_ranks_all_labels() {
        let device = Default::default();
        let labels = Labels::parse("cat\ndog\nbird\nfish\n");
        let classifier =
            BurnClassifier::<NdArray>::load(&tiny_config(), None, labels, &device).unwrap();

        let image = DynamicImage::new_rgb8(64, 48);
        let result = classifier.classify(&image).unwrap();

        assert_eq!(result.len(), 4);
        assert!(result.is_ranked());
        let total: f32 = result.observations.iter().map(|o| o.confidence).sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_missing_weights_is_recoverable() {
        let device = Default::default();
        let result = BurnClassifier::<NdArray>::load(
            &tiny_config(),
            Some(Path::new("/nonexistent/weights.mpk")),
            Labels::generic(4),
            &device,
        );
        assert!(matches!(result, Err(VisionError::PathNotFound(_))));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let device = Default::default();
        let mut config = tiny_config();
        config.num_classes = 0;
        let result = BurnClassifier::<NdArray>::load(&config, None, Labels::default(), &device);
        assert!(matches!(result, Err(VisionError::Config(_))));
    }
}
