//! Error taxonomy shared by the key manager, vault, matchers and stream session.

use serde::Serialize;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BiometricError>;

#[derive(Error, Debug)]
pub enum BiometricError {
    /// Missing key or template
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Authentication tag did not verify (tampering or wrong key)
    #[error("Integrity check failed: {0}")]
    Integrity(String),

    /// Malformed stored key, template encoding or audio container
    #[error("Invalid format: {0}")]
    Format(String),

    /// Empty or degenerate extracted features
    #[error("Processing failed: {0}")]
    Processing(String),

    /// Key or template storage cannot be written, or exists but cannot be read
    #[error("Storage error: {0}")]
    Storage(String),

    /// Capture resource unavailable
    #[error("Capture device error: {0}")]
    Device(String),

    /// Refused to overwrite key material
    #[error("Key already exists: {}", .0.display())]
    KeyExists(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse error category, safe to hand to a presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Integrity,
    Format,
    Processing,
    Storage,
    Device,
    KeyExists,
    InvalidConfig,
}

impl BiometricError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BiometricError::NotFound(_) => ErrorKind::NotFound,
            BiometricError::Integrity(_) => ErrorKind::Integrity,
            BiometricError::Format(_) => ErrorKind::Format,
            BiometricError::Processing(_) => ErrorKind::Processing,
            BiometricError::Storage(_) => ErrorKind::Storage,
            BiometricError::Device(_) => ErrorKind::Device,
            BiometricError::KeyExists(_) => ErrorKind::KeyExists,
            BiometricError::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    /// Map an I/O failure on `path`. Absence is `NotFound`; any other read or
    /// write failure is `Storage`, never `Format`, since the bytes were not seen.
    pub fn from_io(err: io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => BiometricError::NotFound(path),
            _ => BiometricError::Storage(format!("{}: {}", path.display(), err)),
        }
    }
}

impl From<hound::Error> for BiometricError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => BiometricError::Format(format!("audio read failed: {}", e)),
            other => BiometricError::Format(format!("audio container: {}", other)),
        }
    }
}
