//! Face Milling
//!
//! Turns operator input for a face milling job into a machine program:
//! validation, toolpath planning (roughing, then an optional finishing pass)
//! and G-code emission.

pub mod emitter;
pub mod generator;
pub mod path_calculator;
pub mod types;
pub mod validator;

pub use emitter::ProgramEmitter;
pub use generator::{generate_program, FaceMillingGenerator, GeneratedProgram, GenerationStage};
pub use path_calculator::{
    balanced_stepover, depth_levels, pass_count, CutMove, DepthPass, LanePattern,
    MillingOperation, Motion, PathPlanner, PlanarMove, Point3, SpiralPathCalculator, Toolpath,
    ToolpathSegment,
};
pub use types::*;
pub use validator::{
    ParameterLimits, ParameterValidator, ValidationResult, MAX_DEPTH_PASSES, MAX_LANES_PER_LEVEL,
};
