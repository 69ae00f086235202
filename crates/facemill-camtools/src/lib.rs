//! # FaceMill CAM Tools
//!
//! Face milling program generation for CNC mills.
//!
//! ## Pipeline
//!
//! - **Validator**: checks operator input and collects every violation
//! - **Path Calculator**: lays a radius-compensated spiral or zigzag over the stock at each Z level
//! - **Program Emitter**: serializes toolpaths into Fanuc-style G-code
//! - **Generator**: runs the three in order for one request
//!
//! Everything here is pure: configuration arrives as [`MachineSettings`] and
//! the program comes back as text.

pub mod error;
pub mod face_milling;

// Re-export commonly used items
pub use error::{GenerateError, GenerateResult, ParameterError, ValidationReport, Violation};
pub use face_milling::{
    generate_program, FaceMillingGenerator, FaceMillingInput, GeneratedProgram, MachineSettings,
    ParameterLimits, ParameterValidator, PathPlanner, ProgramEmitter, ProgramParameters,
    SpiralPathCalculator, Toolpath, ValidationResult,
};
