//! # FaceMill
//!
//! Face milling program generator for CNC mills.
//!
//! ## Architecture
//!
//! FaceMill is organized as a workspace with multiple crates:
//!
//! 1. **facemill-core** - Shared error types and machine number formatting
//! 2. **facemill-camtools** - Validation, toolpath planning and G-code emission
//! 3. **facemill-settings** - Machine configuration, coolant table, job files
//! 4. **facemill** - Command line binary that ties them together

pub use facemill_camtools::{
    generate_program, FaceMillingGenerator, FaceMillingInput, GenerateError, GeneratedProgram,
    MachineSettings, ParameterValidator, ValidationResult, Violation,
};
pub use facemill_core::{Error, Result};
pub use facemill_settings::{load_job, save_job, Config, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Output on stderr, so a program written to stdout stays clean
/// - RUST_LOG environment variable support (default level INFO)
/// - JSON lines instead of text when `json` is set
pub fn init_logging(json: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}
