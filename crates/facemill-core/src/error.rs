//! Error handling for FaceMill
//!
//! Provides the error types shared by every crate in the workspace:
//! - Toolpath errors (geometric invariants broken between planning and emission)
//! - Unit errors (unknown measurement units)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Toolpath consistency error
///
/// Raised when a computed toolpath breaks one of the invariants the program
/// emitter relies on. These indicate a defect in validation or planning,
/// never bad operator input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolpathError {
    /// A toolpath or one of its depth passes contains no segments
    #[error("Toolpath for {operation} has no segments")]
    EmptyToolpath {
        /// The operation name.
        operation: String,
    },

    /// A segment contains no moves
    #[error("Segment {segment} of {operation} has no moves")]
    EmptySegment {
        /// The operation name.
        operation: String,
        /// Index of the segment within the toolpath.
        segment: usize,
    },

    /// Two consecutive coordinates are identical
    #[error("Zero-length move in segment {segment} of {operation} at point {point}")]
    ZeroLengthMove {
        /// The operation name.
        operation: String,
        /// Index of the segment within the toolpath.
        segment: usize,
        /// Index of the move within the segment.
        point: usize,
    },

    /// A move leaves the area the cutter may reach around the stock
    #[error("Coordinate ({x}, {y}) of {operation} lies outside the machining envelope")]
    OutOfBounds {
        /// The operation name.
        operation: String,
        /// X coordinate.
        x: f64,
        /// Y coordinate.
        y: f64,
    },

    /// A plunge point is not clear of the stock
    #[error("Pass {pass} of {operation} plunges at ({x}, {y}), less than {clearance} from the stock")]
    UnsafeEntry {
        /// The operation name.
        operation: String,
        /// Index of the depth pass.
        pass: usize,
        /// X of the plunge point.
        x: f64,
        /// Y of the plunge point.
        y: f64,
        /// Required distance from the stock edge.
        clearance: f64,
    },

    /// An arc whose end points do not lie on one circle
    #[error("Malformed arc in segment {segment} of {operation} at move {point}")]
    InvalidArc {
        /// The operation name.
        operation: String,
        /// Index of the segment within the toolpath.
        segment: usize,
        /// Index of the arc within the segment.
        point: usize,
    },

    /// A coordinate is NaN or infinite
    #[error("Non-finite coordinate in segment {segment} of {operation}")]
    NonFinite {
        /// The operation name.
        operation: String,
        /// Index of the segment within the toolpath.
        segment: usize,
    },
}

/// Main error type for FaceMill
#[derive(Error, Debug)]
pub enum Error {
    /// Toolpath invariant violation
    #[error(transparent)]
    Toolpath(#[from] ToolpathError),

    /// Unknown measurement unit
    #[error("Unknown length unit: {unit}")]
    InvalidUnit {
        /// The unit text that could not be parsed.
        unit: String,
    },
}

impl Error {
    /// Check if this is a toolpath consistency error
    pub fn is_toolpath_error(&self) -> bool {
        matches!(self, Error::Toolpath(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
