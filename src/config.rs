//! Application configuration
//!
//! Stored as pretty-printed JSON. Every field has a default, so a config file
//! only needs the values it changes. Command-line flags override file values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::feed::CaptureSessionConfig;
use crate::model::ModelConfig;
use crate::presentation::{RowPolicy, ScreenVariant};
use crate::utils::error::{Result, VisionError};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "visionlabel.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Network variant and head settings
    pub model: ModelConfig,

    /// Trained weights; random initialisation when absent
    pub weights: Option<PathBuf>,

    /// Label file, one label per line
    pub labels: Option<PathBuf>,

    /// Screen layout
    pub variant: ScreenVariant,

    /// Row policy override; the variant decides when absent
    pub row_policy: Option<RowPolicy>,

    /// Live capture settings
    pub capture: CaptureSessionConfig,

    /// Frame rate of live frame sources, 0 for unpaced
    pub live_fps: f64,

    /// Log level name (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            weights: None,
            labels: None,
            variant: ScreenVariant::default(),
            row_policy: None,
            capture: CaptureSessionConfig::default(),
            live_fps: 30.0,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VisionError::PathNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load a config file if it exists, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;

        if let Some(RowPolicy::Capped(0)) = self.row_policy {
            return Err(VisionError::Config(
                "row_policy cap must be at least 1".to_string(),
            ));
        }

        if !self.live_fps.is_finite() || self.live_fps < 0.0 {
            return Err(VisionError::Config(format!(
                "live_fps must be a non-negative number, got {}",
                self.live_fps
            )));
        }

        Ok(())
    }

    /// Row policy in effect
    pub fn effective_row_policy(&self) -> RowPolicy {
        self.row_policy.unwrap_or_else(|| self.variant.row_policy())
    }
}
