//! Job files
//!
//! A job file holds one face milling request as the operator entered it,
//! in JSON or TOML. Loading never fills in missing values; that is left to
//! the validator to report.

use crate::config::FileFormat;
use crate::error::{SettingsError, SettingsResult};
use facemill_camtools::face_milling::FaceMillingInput;
use std::path::Path;
use tracing::debug;

/// Load a job file (JSON or TOML)
pub fn load_job(path: &Path) -> SettingsResult<FaceMillingInput> {
    let format = FileFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| {
        SettingsError::LoadError(format!("Failed to read job {}: {}", path.display(), e))
    })?;

    let job = match format {
        FileFormat::Json => serde_json::from_str(&content)?,
        FileFormat::Toml => toml::from_str(&content)?,
    };
    debug!("Loaded job from {}", path.display());
    Ok(job)
}

/// Save a job file (JSON or TOML)
pub fn save_job(job: &FaceMillingInput, path: &Path) -> SettingsResult<()> {
    let content = match FileFormat::from_path(path)? {
        FileFormat::Json => serde_json::to_string_pretty(job)?,
        FileFormat::Toml => toml::to_string_pretty(job)?,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content).map_err(|e| {
        SettingsError::SaveError(format!("Failed to write job {}: {}", path.display(), e))
    })?;
    Ok(())
}
