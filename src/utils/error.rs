//! Error Handling Module
//!
//! Defines the error type shared by acquisition, inference, the capture
//! session and presentation. Every failure the demo app used to treat as
//! fatal (no picked image, malformed inference output, model load failure)
//! surfaces here as a recoverable variant.

use std::path::PathBuf;

use thiserror::Error;

use crate::feed::SessionError;

/// Main error type for visionlabel operations
#[derive(Error, Debug)]
pub enum VisionError {
    /// Error loading or decoding an image
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoad(PathBuf, String),

    /// No image could be produced by an acquisition path
    #[error("Acquisition error: {0}")]
    Acquisition(String),

    /// Error constructing or loading the model
    #[error("Model error: {0}")]
    Model(String),

    /// Error while running a classification
    #[error("Inference error: {0}")]
    Inference(String),

    /// Label table could not be read or parsed
    #[error("Labels error: {0}")]
    Labels(String),

    /// Capture session lifecycle error
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

impl From<serde_json::Error> for VisionError {
    fn from(err: serde_json::Error) -> Self {
        VisionError::Serialization(err.to_string())
    }
}

/// Convenience Result type for visionlabel operations
pub type Result<T> = std::result::Result<T, VisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VisionError::Inference("empty output".to_string());
        assert_eq!(format!("{}", err), "Inference error: empty output");
    }

    #[test]
    fn test_image_load_error() {
        let path = PathBuf::from("/photos/cat.jpg");
        let err = VisionError::ImageLoad(path, "file not found".to_string());
        assert!(format!("{}", err).contains("cat.jpg"));
    }

    #[test]
    fn test_json_error_converts() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: VisionError = parse.unwrap_err().into();
        assert!(matches!(err, VisionError::Serialization(_)));
    }
}
