use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use super::codec::{NumericArray, Template};
use super::envelope::EncryptedEnvelope;
use super::keys::SymmetricKey;
use crate::error::{BiometricError, Result};

/// Encrypt `template` under `key` and write it atomically to `destination`
pub fn store<T: Template>(template: &T, key: &SymmetricKey, destination: &Path) -> Result<()> {
    let plaintext = Zeroizing::new(template.to_array().encode()?);
    let envelope = EncryptedEnvelope::seal(key, &plaintext)?;
    write_atomic(destination, &envelope.to_bytes())?;

    log::info!(
        "Stored encrypted template ({} bytes) at {}",
        plaintext.len(),
        destination.display()
    );
    Ok(())
}

/// Decrypt the envelope at `source` into an in-memory template
pub fn load<T: Template>(source: &Path, key: &SymmetricKey) -> Result<T> {
    let plaintext = decrypt_file(source, key)?;
    T::from_array(NumericArray::decode(&plaintext)?)
}

/// Decrypt the envelope at `source` into a byte-identical copy of the
/// canonical template encoding at `out`
pub fn load_to_file(source: &Path, key: &SymmetricKey, out: &Path) -> Result<()> {
    let plaintext = decrypt_file(source, key)?;
    NumericArray::decode(&plaintext)?;
    write_atomic(out, &plaintext)?;

    log::info!("Exported decrypted template to {}", out.display());
    Ok(())
}

fn decrypt_file(source: &Path, key: &SymmetricKey) -> Result<Zeroizing<Vec<u8>>> {
    let bytes = fs::read(source).map_err(|e| BiometricError::from_io(e, source))?;
    let plaintext = EncryptedEnvelope::from_bytes(&bytes)?.open(key).map_err(|e| {
        log::warn!("Template at {} failed authentication", source.display());
        e
    })?;
    log::debug!(
        "Decrypted {} ({} plaintext bytes)",
        source.display(),
        plaintext.len()
    );
    Ok(plaintext)
}

/// Write via a temporary sibling and rename, so a crash never leaves a
/// truncated file in place of a valid one
pub(crate) fn write_atomic(destination: &Path, bytes: &[u8]) -> Result<()> {
    let storage_err = |e: std::io::Error, path: &Path| {
        BiometricError::Storage(format!("{}: {}", path.display(), e))
    };

    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| storage_err(e, parent))?;
    }

    let tmp = temp_path(destination);
    let result = (|| {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, destination)
    })();

    result.map_err(|e| {
        let _ = fs::remove_file(&tmp);
        storage_err(e, destination)
    })
}

fn temp_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}.tmp", name))
}

/// Remove a stored template; absent templates are not an error
pub fn remove(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BiometricError::from_io(e, path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::vault::{KeyManager, Modality};

    #[derive(Debug, PartialEq)]
    struct Row(Vec<f64>);

    impl Template for Row {
        fn to_array(&self) -> NumericArray {
            NumericArray::from_f64(vec![self.0.len()], self.0.iter().copied())
        }

        fn from_array(array: NumericArray) -> Result<Self> {
            Ok(Row(array.to_f64()?))
        }
    }

    fn setup() -> (tempfile::TempDir, SymmetricKey) {
        let dir = tempfile::tempdir().unwrap();
        let key = KeyManager::new(dir.path().join("keys"))
            .generate(Modality::Face)
            .unwrap();
        (dir, key)
    }

    #[test]
    fn test_store_load() {
        let (dir, key) = setup();
        let path = dir.path().join("tpl").join("row.enc");
        let row = Row(vec![0.25, -1.5, 3.0]);

        store(&row, &key, &path).unwrap();
        assert_eq!(load::<Row>(&path, &key).unwrap(), row);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let (dir, key) = setup();
        let path = dir.path().join("row.enc");
        store(&Row(vec![1.0]), &key, &path).unwrap();
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_overwrite_replaces_template() {
        let (dir, key) = setup();
        let path = dir.path().join("row.enc");
        store(&Row(vec![1.0]), &key, &path).unwrap();
        store(&Row(vec![2.0, 3.0]), &key, &path).unwrap();
        assert_eq!(load::<Row>(&path, &key).unwrap(), Row(vec![2.0, 3.0]));
    }

    #[test]
    fn test_missing_source_is_not_found() {
        let (dir, key) = setup();
        let err = load::<Row>(&dir.path().join("absent.enc"), &key).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_unreadable_source_is_storage_error() {
        let (dir, key) = setup();
        let path = dir.path().join("row.enc");
        fs::create_dir_all(&path).unwrap();
        let err = load::<Row>(&path, &key).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_load_to_file_matches_canonical_encoding() {
        let (dir, key) = setup();
        let path = dir.path().join("row.enc");
        let out = dir.path().join("export").join("row.tpl");
        let row = Row(vec![4.0, 5.0]);

        store(&row, &key, &path).unwrap();
        load_to_file(&path, &key, &out).unwrap();

        assert_eq!(fs::read(&out).unwrap(), row.to_array().encode().unwrap());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (dir, key) = setup();
        let path = dir.path().join("row.enc");
        store(&Row(vec![1.0]), &key, &path).unwrap();
        remove(&path).unwrap();
        remove(&path).unwrap();
        assert!(!path.exists());
    }
}
