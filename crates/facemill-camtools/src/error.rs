//! Error types for the CAM tools crate.
//!
//! A generate request ends in one of two errors: the operator's parameters
//! were rejected (recoverable, carries every violation), or a computed
//! toolpath broke an invariant (a defect, fatal for that request only).

use facemill_core::ToolpathError;
use std::fmt;
use thiserror::Error;

/// Errors returned by the face milling generator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerateError {
    /// The validator found one or more constraint violations.
    #[error("Invalid parameters: {0}")]
    Rejected(ValidationReport),

    /// A toolpath reaching the emitter broke a geometric invariant.
    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(#[from] ToolpathError),
}

impl GenerateError {
    /// Violations carried by a rejection, if this is one.
    pub fn violations(&self) -> Option<&[Violation]> {
        match self {
            Self::Rejected(report) => Some(report.violations()),
            Self::InternalInconsistency(_) => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Reasons a single parameter can be rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// A required section is absent.
    #[error("required section is missing")]
    MissingSection,

    /// A required value is absent.
    #[error("required value is missing")]
    Missing,

    /// The value is NaN or infinite.
    #[error("must be a finite number")]
    NotFinite,

    /// The value must be strictly positive.
    #[error("must be greater than zero, got {value}")]
    NotPositive { value: f64 },

    /// The value must not be negative.
    #[error("must not be negative, got {value}")]
    Negative { value: f64 },

    /// The value must be a positive integer.
    #[error("must be a positive integer, got {value}")]
    NotPositiveInteger { value: i64 },

    /// The value is an integer outside the accepted range.
    #[error("must be between {min} and {max}, got {value}")]
    IntegerOutOfRange { value: i64, min: i64, max: i64 },

    /// The value lies outside the accepted range.
    #[error("must be between {min} and {max}, got {value}")]
    OutOfRange { value: f64, min: f64, max: f64 },

    /// The depth of cut would need more Z passes than a program may hold.
    #[error("would need {count} depth passes (limit {limit})")]
    TooManyPasses { count: u64, limit: usize },

    /// The width of cut would need more passes per level than a program may hold.
    #[error("would need {count} passes per depth level (limit {limit})")]
    TooManyLanes { count: u64, limit: usize },

    /// The value is not a member of the supported set.
    #[error("unrecognized value '{value}' (expected one of: {expected})")]
    Unrecognized { value: String, expected: String },

    /// The value conflicts with another parameter.
    #[error("{0}")]
    Incompatible(String),
}

/// A rejected field and why.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Dotted path of the field, e.g. `roughing.tool_number`
    pub field: String,
    pub error: ParameterError,
}

impl Violation {
    pub fn new(field: impl Into<String>, error: ParameterError) -> Self {
        Self {
            field: field.into(),
            error,
        }
    }

    /// Human-readable reason
    pub fn reason(&self) -> String {
        self.error.to_string()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.error)
    }
}

/// Every violation found in one validation run, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    pub fn extend(&mut self, violations: impl IntoIterator<Item = Violation>) {
        self.violations.extend(violations);
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Whether any violation refers to `field`
    pub fn contains_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{}", joined)
    }
}

impl IntoIterator for ValidationReport {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}

/// Result type alias for generate requests.
pub type GenerateResult<T> = Result<T, GenerateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_error_display() {
        let err = ParameterError::NotPositive { value: -5.0 };
        assert_eq!(err.to_string(), "must be greater than zero, got -5");

        let err = ParameterError::Unrecognized {
            value: "trochoidal".to_string(),
            expected: "spiral_in, spiral_out".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unrecognized value 'trochoidal' (expected one of: spiral_in, spiral_out)"
        );
    }

    #[test]
    fn test_report_display_joins_all_violations() {
        let mut report = ValidationReport::new();
        report.push(Violation::new(
            "roughing.tool_number",
            ParameterError::NotPositiveInteger { value: -1 },
        ));
        report.push(Violation::new("coolant", ParameterError::MissingSection));

        assert_eq!(report.len(), 2);
        assert!(report.contains_field("coolant"));
        assert_eq!(
            report.to_string(),
            "roughing.tool_number: must be a positive integer, got -1; coolant: required section is missing"
        );
    }

    #[test]
    fn test_error_conversion() {
        let err: GenerateError = ToolpathError::EmptyToolpath {
            operation: "Roughing".to_string(),
        }
        .into();
        assert!(!err.is_rejected());
        assert!(err.violations().is_none());

        let err = GenerateError::Rejected(ValidationReport::new());
        assert!(err.is_rejected());
        assert_eq!(err.violations().map(|v| v.len()), Some(0));
    }
}
