//! # FaceMill Core
//!
//! Shared error types and the fixed-precision number formatting used when
//! writing machine programs.

pub mod error;
pub mod units;

pub use error::{Error, Result, ToolpathError};
pub use units::{
    format_coordinate, format_feed_rate, format_spindle_speed, LengthUnit, COORDINATE_DECIMALS,
    MM_PER_INCH,
};
