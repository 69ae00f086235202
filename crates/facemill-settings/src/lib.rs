//! FaceMill Settings Crate
//!
//! Machine configuration, the coolant code table, program output options,
//! the default job used to prefill operator input, and job files.

pub mod config;
pub mod error;
pub mod job;

pub use config::{Config, MachineConfig, OutputSettings};
pub use error::{ConfigError, SettingsError, SettingsResult};
pub use job::{load_job, save_job};
