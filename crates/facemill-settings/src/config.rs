//! Configuration management for FaceMill
//!
//! Provides configuration file handling and validation. Supports JSON and
//! TOML file formats, by default stored in the platform config directory.
//!
//! Configuration is organized into logical sections:
//! - Machine settings (clearance, plunge feed, lead-in, corner arcs, table reference)
//! - Coolant options (mode name to on/off M-codes)
//! - Output settings (directory, program name, timestamp suffix)
//! - Default job values used to prefill operator input

use crate::error::{ConfigError, SettingsError, SettingsResult};
use chrono::NaiveDateTime;
use facemill_camtools::face_milling::{
    CoolantCodes, CoolantInput, CoolantMode, FaceMillingInput, FinishingInput, MachineSettings,
    ParameterValidator, PositionInput, RoughingInput, StockInput,
};
use facemill_camtools::ParameterError;
use facemill_core::LengthUnit;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name used for the configuration in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Machine settings as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Program units
    pub units: LengthUnit,
    /// Retract height above the stock top (mm)
    pub clearance_height: f64,
    /// Feed for Z plunges (mm/min)
    pub plunge_feedrate: f64,
    /// Gap between the cutter's edge and the stock when plunging (mm)
    pub lead_in_length: f64,
    /// Radius of the arcs rounding spiral corners (mm); 0 for sharp corners
    pub corner_radius: f64,
    /// How far the last pass reaches past the far edge (mm)
    pub last_cut_overlap: f64,
    /// Machine X of the table origin
    pub table_reference_x: f64,
    /// Machine Y of the table origin
    pub table_reference_y: f64,
    /// Machine Z of the table surface
    pub table_reference_z: f64,
}

impl Default for MachineConfig {
    fn default() -> Self {
        let machine = MachineSettings::default();
        Self {
            units: machine.units,
            clearance_height: machine.clearance_height,
            plunge_feedrate: machine.plunge_feedrate,
            lead_in_length: machine.lead_in_length,
            corner_radius: machine.corner_radius,
            last_cut_overlap: machine.last_cut_overlap,
            table_reference_x: machine.table_reference_x,
            table_reference_y: machine.table_reference_y,
            table_reference_z: machine.table_reference_z,
        }
    }
}

/// Where and under which name generated programs are saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Directory programs are written to
    pub directory: PathBuf,
    /// Base file name, written without an extension
    pub program_name: String,
    /// Append `_YYYYMMDD_HHMMSS` to the file name
    pub append_timestamp: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            program_name: "FACEMILLING".to_string(),
            append_timestamp: true,
        }
    }
}

impl OutputSettings {
    /// Program name up to the first '.'; programs are saved without an extension.
    pub fn base_name(&self) -> &str {
        self.program_name
            .split('.')
            .next()
            .unwrap_or_default()
            .trim()
    }

    /// File name for a program generated at `now`.
    pub fn file_name(&self, now: NaiveDateTime) -> String {
        let base = self.base_name();
        if self.append_timestamp {
            format!("{}_{}", base, now.format("%Y%m%d_%H%M%S"))
        } else {
            base.to_string()
        }
    }

    /// Write `program` to the output directory, creating it if needed.
    pub fn save_program(&self, program: &str, now: NaiveDateTime) -> SettingsResult<PathBuf> {
        std::fs::create_dir_all(&self.directory).map_err(|e| {
            SettingsError::SaveError(format!(
                "Failed to create output directory {}: {}",
                self.directory.display(),
                e
            ))
        })?;

        let path = self.directory.join(self.file_name(now));
        std::fs::write(&path, program).map_err(|e| {
            SettingsError::SaveError(format!(
                "Failed to write program {}: {}",
                path.display(),
                e
            ))
        })?;

        info!("Saved program to {}", path.display());
        Ok(path)
    }
}

/// Complete application configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Machine settings
    pub machine: MachineConfig,
    /// Coolant mode name to on/off M-codes
    pub coolant_options: BTreeMap<String, CoolantCodes>,
    /// Program output settings
    pub output: OutputSettings,
    /// Default job values
    pub defaults: FaceMillingInput,
}

impl Default for Config {
    fn default() -> Self {
        let mut coolant_options = BTreeMap::new();
        coolant_options.insert(
            "air".to_string(),
            CoolantCodes {
                on_code: 81,
                off_code: 82,
            },
        );
        coolant_options.insert(
            "internal_air".to_string(),
            CoolantCodes {
                on_code: 79,
                off_code: 80,
            },
        );
        coolant_options.insert(
            "cold_air".to_string(),
            CoolantCodes {
                on_code: 83,
                off_code: 84,
            },
        );
        coolant_options.insert(
            "oil_mist".to_string(),
            CoolantCodes {
                on_code: 8,
                off_code: 9,
            },
        );

        Self {
            machine: MachineConfig::default(),
            coolant_options,
            output: OutputSettings::default(),
            defaults: default_job(),
        }
    }
}

/// Job values used to prefill a new job file.
fn default_job() -> FaceMillingInput {
    FaceMillingInput {
        position: Some(PositionInput {
            reference: Some("table".to_string()),
            x: Some(0.0),
            y: Some(0.0),
        }),
        stock: Some(StockInput {
            width: Some(400.0),
            length: Some(300.0),
            height: Some(150.0),
            finished_height: Some(140.0),
            offset: Some(0.0),
        }),
        roughing: Some(RoughingInput {
            tool_number: Some(55),
            tool_diameter: Some(63.0),
            strategy: Some("spiral_in".to_string()),
            width_of_cut: Some(30.0),
            depth_of_cut: Some(5.0),
            leave_for_finishing: Some(1.0),
            rpm: Some(6500.0),
            feedrate: Some(7000.0),
        }),
        finishing: Some(FinishingInput {
            tool_number: Some(1),
            tool_diameter: Some(80.0),
            strategy: Some("spiral_in".to_string()),
            width_of_cut: Some(53.0),
            rpm: Some(4000.0),
            feedrate: Some(3000.0),
        }),
        coolant: Some(CoolantInput {
            mode: Some("none".to_string()),
            on_code: None,
            off_code: None,
        }),
    }
}

/// Serialization format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub(crate) fn from_path(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )
            .into()),
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config location in the platform config directory
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("facemill").join(CONFIG_FILE_NAME))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no configuration directory on this platform".into())
            })
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = FileFormat::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Self = match format {
            FileFormat::Json => serde_json::from_str(&content)?,
            FileFormat::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `path` when given, else the default location when it exists,
    /// else built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> SettingsResult<Self> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }
        match Self::default_path() {
            Ok(path) if path.exists() => Self::load_from_file(&path),
            _ => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match FileFormat::from_path(path)? {
            FileFormat::Json => serde_json::to_string_pretty(self)?,
            FileFormat::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content).map_err(|e| {
            SettingsError::SaveError(format!("Failed to write {}: {}", path.display(), e))
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        // Same rules the generator applies, reported one at a time
        let violations = ParameterValidator::validate_machine(&self.machine_settings());
        if let Some(violation) = violations.into_iter().next() {
            return Err(match violation.error {
                ParameterError::OutOfRange { value, min, max } => ConfigError::ValueOutOfRange {
                    key: violation.field,
                    value: format!("{} (expected {} to {})", value, min, max),
                }
                .into(),
                _ => SettingsError::invalid(violation.field.clone(), violation.reason()),
            });
        }

        for (name, codes) in &self.coolant_options {
            match name.parse::<CoolantMode>() {
                Ok(CoolantMode::None) => {
                    return Err(ConfigError::InvalidCoolant {
                        name: name.clone(),
                        reason: "the 'none' mode takes no codes".to_string(),
                    }
                    .into());
                }
                Err(e) => {
                    return Err(ConfigError::InvalidCoolant {
                        name: name.clone(),
                        reason: e,
                    }
                    .into());
                }
                Ok(_) => {}
            }
            if codes.on_code == codes.off_code {
                return Err(ConfigError::InvalidCoolant {
                    name: name.clone(),
                    reason: format!("on and off codes are both M{}", codes.on_code),
                }
                .into());
            }
        }

        if self.output.base_name().is_empty() {
            return Err(SettingsError::invalid("output.program_name", "must not be empty"));
        }

        Ok(())
    }

    /// Machine settings handed to the generator
    pub fn machine_settings(&self) -> MachineSettings {
        MachineSettings {
            units: self.machine.units,
            clearance_height: self.machine.clearance_height,
            plunge_feedrate: self.machine.plunge_feedrate,
            lead_in_length: self.machine.lead_in_length,
            corner_radius: self.machine.corner_radius,
            last_cut_overlap: self.machine.last_cut_overlap,
            table_reference_x: self.machine.table_reference_x,
            table_reference_y: self.machine.table_reference_y,
            table_reference_z: self.machine.table_reference_z,
        }
    }

    /// Codes configured for `mode`, if any.
    pub fn coolant_codes(&self, mode: CoolantMode) -> Option<CoolantCodes> {
        self.coolant_options
            .iter()
            .find(|(name, _)| name.parse::<CoolantMode>() == Ok(mode))
            .map(|(_, codes)| *codes)
    }

    /// Fill in missing coolant codes from the coolant table.
    ///
    /// Codes given in the job win. Unknown modes are left untouched for the
    /// validator to report.
    pub fn resolve_coolant(&self, input: &mut FaceMillingInput) {
        let Some(coolant) = input.coolant.as_mut() else {
            return;
        };
        let Some(mode) = coolant
            .mode
            .as_deref()
            .and_then(|m| m.parse::<CoolantMode>().ok())
        else {
            return;
        };
        if mode == CoolantMode::None {
            return;
        }

        if let Some(codes) = self.coolant_codes(mode) {
            coolant.on_code.get_or_insert(i64::from(codes.on_code));
            coolant.off_code.get_or_insert(i64::from(codes.off_code));
            debug!(
                "Resolved coolant {} to M{}/M{}",
                mode, codes.on_code, codes.off_code
            );
        }
    }
}
