use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::face::DEFAULT_TOLERANCE;
use crate::validation;
use crate::voice::{CostNormalization, DEFAULT_THRESHOLD};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub face: FaceConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceConfig {
    /// Maximum embedding distance accepted as a match
    pub tolerance: f64,
    /// Run face analysis on every n-th stream frame
    pub sample_interval: u32,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            sample_interval: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// DTW cost below which a voice matches
    pub threshold: f64,
    #[serde(default)]
    pub cost_normalization: CostNormalization,
    /// Keep a WAV copy of the last enrollment recording
    #[serde(default)]
    pub keep_last_recording: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            cost_normalization: CostNormalization::None,
            keep_last_recording: false,
        }
    }
}

impl AppConfig {
    /// Load config from file or create default
    pub fn load_or_create(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: AppConfig = toml::from_str(&content)?;
            config.validate()?;
            log::info!("Config loaded from: {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let toml_str = toml::to_string_pretty(&config)?;
            fs::write(path, toml_str)?;
            log::info!("Default config created at: {}", path.display());
            Ok(config)
        }
    }

    pub fn validate(&self) -> Result<()> {
        validation::validate_tolerance(self.face.tolerance)?;
        validation::validate_sample_interval(self.face.sample_interval)?;
        validation::validate_threshold(self.voice.threshold)?;
        Ok(())
    }
}
