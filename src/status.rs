/**
 * Registration status checks
 *
 * Inspects the key/template slot of each modality without decrypting
 * anything. A key without a template (or the reverse) is reported as
 * "not registered", never as damage to repair.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::BiometricError;
use crate::paths::AppPaths;
use crate::vault::{KeyManager, Modality};

/// Status of an individual check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Per-modality status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusItem {
    pub modality: Modality,
    pub registered: bool,
    pub status: CheckStatus,
    pub message: String,
    pub fix_hint: Option<String>,
    /// Last template write (RFC 3339)
    pub registered_at: Option<String>,
}

/// Complete status report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub items: Vec<StatusItem>,
    pub overall: CheckStatus,
}

impl StatusReport {
    /// Determine overall status from individual checks
    fn compute_overall(items: &[StatusItem]) -> CheckStatus {
        if items.iter().any(|i| i.status == CheckStatus::Fail) {
            CheckStatus::Fail
        } else if items.iter().any(|i| i.status == CheckStatus::Warn) {
            CheckStatus::Warn
        } else {
            CheckStatus::Pass
        }
    }

    pub fn item(&self, modality: Modality) -> Option<&StatusItem> {
        self.items.iter().find(|i| i.modality == modality)
    }
}

/// Check every modality slot
pub fn run_status(paths: &AppPaths, keys: &KeyManager) -> StatusReport {
    let items: Vec<StatusItem> = Modality::ALL
        .iter()
        .map(|&modality| check_modality(modality, paths, keys))
        .collect();

    let overall = StatusReport::compute_overall(&items);
    log::info!("Status check complete: {:?}", overall);

    StatusReport { items, overall }
}

fn check_modality(modality: Modality, paths: &AppPaths, keys: &KeyManager) -> StatusItem {
    let template_path = paths.template_file(modality);
    let template_exists = template_path.exists();
    let key_exists = keys.exists(modality);

    let item = |registered, status, message: String, fix_hint: Option<String>| StatusItem {
        modality,
        registered,
        status,
        message,
        fix_hint,
        registered_at: None,
    };

    match (key_exists, template_exists) {
        (false, false) => item(
            false,
            CheckStatus::Warn,
            "Not registered".to_string(),
            Some(format!("Register a {} template first", modality)),
        ),
        (true, false) => item(
            false,
            CheckStatus::Warn,
            "Not registered (key present, no template)".to_string(),
            Some(format!(
                "Register a {} template; the existing key will be reused",
                modality
            )),
        ),
        (false, true) => item(
            false,
            CheckStatus::Warn,
            "Not registered (template present, key missing)".to_string(),
            Some(format!(
                "The template cannot be decrypted. Run `biolock reset {}` and register again",
                modality
            )),
        ),
        (true, true) => match keys.load(modality) {
            Ok(_) => StatusItem {
                registered_at: modified_rfc3339(&template_path),
                ..item(true, CheckStatus::Pass, "Registered".to_string(), None)
            },
            Err(BiometricError::Format(reason)) => item(
                false,
                CheckStatus::Fail,
                format!("Key file is malformed: {}", reason),
                Some(format!(
                    "Run `biolock reset {}` and register again",
                    modality
                )),
            ),
            Err(e) => item(
                false,
                CheckStatus::Fail,
                format!("Cannot read key: {}", e),
                Some("Check permissions on the keys directory".to_string()),
            ),
        },
    }
}

fn modified_rfc3339(path: &Path) -> Option<String> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Utc>::from(modified).to_rfc3339())
}
