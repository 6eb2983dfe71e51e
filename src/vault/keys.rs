use chacha20poly1305::aead::OsRng;
use rand_core::RngCore;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use super::Modality;
use crate::error::{BiometricError, Result};

/// XChaCha20-Poly1305 key length
pub const KEY_LEN: usize = 32;

/// Symmetric key material, wiped from memory on drop
#[derive(Clone)]
pub struct SymmetricKey(Zeroizing<[u8; KEY_LEN]>);

impl SymmetricKey {
    fn random() -> Self {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut *key);
        Self(key)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != KEY_LEN {
            return None;
        }
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(bytes);
        Some(Self(key))
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// Generates, loads and persists one key per modality
#[derive(Debug, Clone)]
pub struct KeyManager {
    keys_dir: PathBuf,
}

impl KeyManager {
    pub fn new(keys_dir: impl Into<PathBuf>) -> Self {
        Self {
            keys_dir: keys_dir.into(),
        }
    }

    pub fn key_path(&self, modality: Modality) -> PathBuf {
        self.keys_dir.join(format!("{}.key", modality))
    }

    pub fn exists(&self, modality: Modality) -> bool {
        self.key_path(modality).exists()
    }

    /// Generate and persist a fresh key.
    ///
    /// Never overwrites: an existing key file yields `KeyExists`, since every
    /// template encrypted under it would become undecryptable.
    pub fn generate(&self, modality: Modality) -> Result<SymmetricKey> {
        let path = self.key_path(modality);
        fs::create_dir_all(&self.keys_dir)
            .map_err(|e| BiometricError::Storage(format!("{}: {}", self.keys_dir.display(), e)))?;

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = match options.open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(BiometricError::KeyExists(path));
            }
            Err(e) => return Err(BiometricError::Storage(format!("{}: {}", path.display(), e))),
        };

        let key = SymmetricKey::random();
        if let Err(e) = file.write_all(key.as_bytes()).and_then(|_| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(BiometricError::Storage(format!("{}: {}", path.display(), e)));
        }

        log::info!("Generated new {} key at {}", modality, path.display());
        Ok(key)
    }

    pub fn load(&self, modality: Modality) -> Result<SymmetricKey> {
        Self::load_from(&self.key_path(modality))
    }

    /// Load key material from an explicit path
    pub fn load_from(path: &Path) -> Result<SymmetricKey> {
        let bytes = Zeroizing::new(fs::read(path).map_err(|e| BiometricError::from_io(e, path))?);
        SymmetricKey::from_slice(&bytes).ok_or_else(|| {
            BiometricError::Format(format!(
                "key file {} holds {} bytes, expected {}",
                path.display(),
                bytes.len(),
                KEY_LEN
            ))
        })
    }

    /// Remove a key file; absent keys are not an error
    pub fn remove(&self, modality: Modality) -> Result<()> {
        let path = self.key_path(modality);
        match fs::remove_file(&path) {
            Ok(()) => {
                log::info!("Removed {} key", modality);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BiometricError::from_io(e, path)),
        }
    }

    /// Key to encrypt a new enrollment under.
    ///
    /// Reuses the existing key when it loads. A malformed key is replaced only
    /// when no template is backed by it.
    pub fn key_for_enrollment(
        &self,
        modality: Modality,
        template_exists: bool,
    ) -> Result<SymmetricKey> {
        match self.load(modality) {
            Ok(key) => Ok(key),
            Err(BiometricError::NotFound(_)) => self.generate(modality),
            Err(BiometricError::Format(reason)) if !template_exists => {
                log::warn!("Replacing malformed {} key ({})", modality, reason);
                self.remove(modality)?;
                self.generate(modality)
            }
            Err(e) => Err(e),
        }
    }
}
