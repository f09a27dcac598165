//! Model module: the burn CNN, its variants and the label table
//!
//! The network is loaded once per process and shared by every inference
//! request; nothing here reconstructs a model per frame.

pub mod cnn;
pub mod config;
pub mod labels;

pub use cnn::{ClassifierNet, ClassifierNetConfig};
pub use config::{ModelConfig, ModelVariant};
pub use labels::Labels;

/// ImageNet normalization mean values (RGB)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet normalization std values (RGB)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];
