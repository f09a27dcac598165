//! Model Configuration Module
//!
//! Model variants mirror the networks the classifier is usually deployed with:
//! Inception V3 at 299px and MobileNet at 224px or its 0.50-width 160px form.
//! A variant fixes the preprocessing input size and the network width.

use serde::{Deserialize, Serialize};

use crate::model::cnn::ClassifierNetConfig;
use crate::utils::error::{Result, VisionError};

/// Classification network variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelVariant {
    /// Inception V3, 299x299 input
    InceptionV3,
    /// MobileNet 1.0, 224x224 input
    MobileNet,
    /// MobileNet 0.50 width multiplier, 160x160 input
    MobileNet050_160,
}

impl ModelVariant {
    /// Square input edge in pixels
    pub fn input_size(&self) -> usize {
        match self {
            ModelVariant::InceptionV3 => 299,
            ModelVariant::MobileNet => 224,
            ModelVariant::MobileNet050_160 => 160,
        }
    }

    /// Stem channels; the 0.50 MobileNet halves them
    pub fn base_filters(&self) -> usize {
        match self {
            ModelVariant::InceptionV3 | ModelVariant::MobileNet => 32,
            ModelVariant::MobileNet050_160 => 16,
        }
    }

    /// Downsampling stages after the stem
    pub fn stages(&self) -> usize {
        match self {
            ModelVariant::InceptionV3 | ModelVariant::MobileNet => 5,
            ModelVariant::MobileNet050_160 => 4,
        }
    }

    /// MobileNets use depthwise separable convolutions
    pub fn separable(&self) -> bool {
        !matches!(self, ModelVariant::InceptionV3)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelVariant::InceptionV3 => "inception-v3",
            ModelVariant::MobileNet => "mobile-net",
            ModelVariant::MobileNet050_160 => "mobile-net050-160",
        }
    }

    /// Parse a variant from a CLI-style name
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().replace('_', "-").as_str() {
            "inception-v3" | "inceptionv3" | "inception" => Ok(ModelVariant::InceptionV3),
            "mobile-net" | "mobilenet" => Ok(ModelVariant::MobileNet),
            "mobile-net050-160" | "mobilenet-050-160" | "mobilenet050-160" => {
                Ok(ModelVariant::MobileNet050_160)
            }
            other => Err(VisionError::Config(format!("unknown model variant '{}'", other))),
        }
    }
}

impl Default for ModelVariant {
    fn default() -> Self {
        ModelVariant::MobileNet050_160
    }
}

impl std::fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Configuration for building the classifier network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Network variant
    pub variant: ModelVariant,

    /// Number of output classes
    pub num_classes: usize,

    /// Dropout rate before the classifier (0.0 to 1.0)
    pub dropout_rate: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            variant: ModelVariant::default(),
            num_classes: 1000,
            dropout_rate: 0.2,
        }
    }
}

impl ModelConfig {
    pub fn new(variant: ModelVariant, num_classes: usize) -> Self {
        Self {
            variant,
            num_classes,
            ..Default::default()
        }
    }

    /// Input size implied by the variant
    pub fn input_size(&self) -> usize {
        self.variant.input_size()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.num_classes == 0 {
            return Err(VisionError::Config(
                "num_classes must be greater than 0".to_string(),
            ));
        }

        if self.dropout_rate < 0.0 || self.dropout_rate >= 1.0 {
            return Err(VisionError::Config(
                "dropout_rate must be in range [0.0, 1.0)".to_string(),
            ));
        }

        Ok(())
    }

    /// Network configuration for burn
    pub fn to_net_config(&self) -> ClassifierNetConfig {
        ClassifierNetConfig::new()
            .with_num_classes(self.num_classes)
            .with_input_size(self.variant.input_size())
            .with_base_filters(self.variant.base_filters())
            .with_stages(self.variant.stages())
            .with_separable(self.variant.separable())
            .with_dropout_rate(self.dropout_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_input_sizes() {
        assert_eq!(ModelVariant::InceptionV3.input_size(), 299);
        assert_eq!(ModelVariant::MobileNet.input_size(), 224);
        assert_eq!(ModelVariant::MobileNet050_160.input_size(), 160);
    }

    #[test]
    fn test_variant_parse() {
        assert_eq!(
            ModelVariant::parse("inception-v3").unwrap(),
            ModelVariant::InceptionV3
        );
        assert_eq!(
            ModelVariant::parse("MobileNet_050_160").unwrap(),
            ModelVariant::MobileNet050_160
        );
        assert!(ModelVariant::parse("resnet").is_err());
    }

    #[test]
    fn test_model_config_validation() {
        let mut config = ModelConfig::default();
        assert!(config.validate().is_ok());

        config.num_classes = 0;
        assert!(config.validate().is_err());

        config = ModelConfig::default();
        config.dropout_rate = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_net_config_follows_variant() {
        let config = ModelConfig::new(ModelVariant::InceptionV3, 10);
        let net = config.to_net_config();
        assert_eq!(net.input_size, 299);
        assert_eq!(net.num_classes, 10);
        assert_eq!(net.base_filters, 32);
        assert!(!net.separable);

        let mobile = ModelConfig::new(ModelVariant::MobileNet050_160, 10).to_net_config();
        assert!(mobile.separable);
        assert_eq!(mobile.stages, 4);
        assert_eq!(mobile.feature_channels(), 256);
    }

    #[test]
    fn test_variant_serde_name() {
        let json = serde_json::to_string(&ModelVariant::MobileNet050_160).unwrap();
        assert_eq!(json, "\"mobile-net050-160\"");
    }
}
