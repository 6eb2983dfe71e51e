use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

use crate::vault::Modality;

/// Application paths following OS conventions
#[derive(Clone, Debug)]
pub struct AppPaths {
    /// Configuration directory (tolerances, thresholds)
    pub config: PathBuf,
    /// Data directory (keys, encrypted templates)
    pub data: PathBuf,
}

impl AppPaths {
    /// Resolve OS-specific paths for Biolock
    ///
    /// # Platform Paths
    ///
    /// ## Linux
    /// - Config: `~/.config/Biolock/`
    /// - Data: `~/.local/share/Biolock/` → keys/, face_encodings/, voice_samples/
    ///
    /// ## macOS
    /// - Config: `~/Library/Preferences/Biolock/`
    /// - Data: `~/Library/Application Support/Biolock/`
    ///
    /// ## Windows
    /// - Config: `%APPDATA%\Biolock\config\`
    /// - Data: `%LOCALAPPDATA%\Biolock\`
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "LotusEmberLabs", "Biolock")
            .context("Failed to determine project directories")?;

        Ok(Self {
            config: proj_dirs.config_dir().to_path_buf(),
            data: proj_dirs.data_dir().to_path_buf(),
        })
    }

    /// Root the whole layout under a single directory
    pub fn at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            config: root.join("config"),
            data: root.join("data"),
        }
    }

    /// Create all necessary directories with subdirectories
    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.config).context("Failed to create config directory")?;
        fs::create_dir_all(self.keys_dir()).context("Failed to create keys directory")?;
        fs::create_dir_all(self.face_dir()).context("Failed to create face_encodings directory")?;
        fs::create_dir_all(self.voice_dir()).context("Failed to create voice_samples directory")?;

        log::info!("Application directories initialized");
        log::debug!("  Config: {}", self.config.display());
        log::debug!("  Data:   {}", self.data.display());

        Ok(())
    }

    /// Get path to config file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }

    /// Get path to keys directory
    pub fn keys_dir(&self) -> PathBuf {
        self.data.join("keys")
    }

    pub fn face_dir(&self) -> PathBuf {
        self.data.join("face_encodings")
    }

    pub fn voice_dir(&self) -> PathBuf {
        self.data.join("voice_samples")
    }

    /// Encrypted template location for a modality
    pub fn template_file(&self, modality: Modality) -> PathBuf {
        match modality {
            Modality::Face => self.face_dir().join("user_face.tpl.enc"),
            Modality::Voice => self.voice_dir().join("encrypted_voice.tpl.enc"),
        }
    }

    /// Debug copy of the last voice enrollment recording
    pub fn last_recording(&self) -> PathBuf {
        self.voice_dir().join("last_record.wav")
    }
}
