//! Unit and number formatting utilities
//!
//! Machine programs are read by controllers, not people, so every number is
//! written with a fixed number of decimals using Rust's own formatter, which
//! never consults the process locale.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decimal places used for X/Y/Z words.
pub const COORDINATE_DECIMALS: usize = 3;

/// Millimeters per inch
pub const MM_PER_INCH: f64 = 25.4;

/// Length unit a program is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    /// Millimeters (G21)
    #[default]
    Millimeters,
    /// Inches (G20)
    Inches,
}

impl LengthUnit {
    /// The modal G-code selecting this unit.
    pub fn gcode(&self) -> &'static str {
        match self {
            Self::Millimeters => "G21",
            Self::Inches => "G20",
        }
    }

    /// Short label ("mm" or "in")
    pub fn label(&self) -> &'static str {
        match self {
            Self::Millimeters => "mm",
            Self::Inches => "in",
        }
    }

    /// Express a length (or a per-minute feed) given in millimeters in this
    /// unit, rounded to coordinate precision.
    pub fn length_from_mm(&self, mm: f64) -> f64 {
        match self {
            Self::Millimeters => mm,
            Self::Inches => {
                let scale = 10f64.powi(COORDINATE_DECIMALS as i32);
                (mm / MM_PER_INCH * scale).round() / scale
            }
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Millimeters => write!(f, "Millimeters"),
            Self::Inches => write!(f, "Inches"),
        }
    }
}

impl FromStr for LengthUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mm" | "millimeters" | "metric" => Ok(Self::Millimeters),
            "in" | "inch" | "inches" | "imperial" => Ok(Self::Inches),
            _ => Err(Error::InvalidUnit {
                unit: s.to_string(),
            }),
        }
    }
}

/// Collapse `-0.0` (and values that round to it) onto `+0.0`.
fn normalize(value: f64, decimals: usize) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    if (value * scale).round() == 0.0 {
        0.0
    } else {
        value
    }
}

/// Format a coordinate for an X/Y/Z word
pub fn format_coordinate(value: f64) -> String {
    format!(
        "{:.*}",
        COORDINATE_DECIMALS,
        normalize(value, COORDINATE_DECIMALS)
    )
}

/// Format a feed rate for an F word (whole units per minute)
pub fn format_feed_rate(value: f64) -> String {
    format!("{:.0}", normalize(value, 0))
}

/// Format a spindle speed for an S word (whole RPM)
pub fn format_spindle_speed(value: f64) -> String {
    format!("{:.0}", normalize(value, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_precision() {
        assert_eq!(format_coordinate(10.5), "10.500");
        assert_eq!(format_coordinate(0.0004), "0.000");
        assert_eq!(format_coordinate(-12.3456), "-12.346");
        assert_eq!(format_coordinate(300.0), "300.000");
    }

    #[test]
    fn test_negative_zero_is_normalized() {
        assert_eq!(format_coordinate(-0.0), "0.000");
        assert_eq!(format_coordinate(-0.0001), "0.000");
        assert_eq!(format_feed_rate(-0.2), "0");
    }

    #[test]
    fn test_feed_and_speed() {
        assert_eq!(format_feed_rate(1500.0), "1500");
        assert_eq!(format_spindle_speed(3000.4), "3000");
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!("mm".parse::<LengthUnit>().unwrap(), LengthUnit::Millimeters);
        assert_eq!(" Inch ".parse::<LengthUnit>().unwrap(), LengthUnit::Inches);
        assert!("furlong".parse::<LengthUnit>().is_err());
        assert_eq!(LengthUnit::Inches.gcode(), "G20");
        assert_eq!(LengthUnit::default().label(), "mm");
    }

    #[test]
    fn test_length_from_mm() {
        assert_eq!(LengthUnit::Millimeters.length_from_mm(50.0), 50.0);
        assert_eq!(LengthUnit::Inches.length_from_mm(25.4), 1.0);
        assert_eq!(LengthUnit::Inches.length_from_mm(50.0), 1.969);
        assert_eq!(LengthUnit::Inches.length_from_mm(100.0), 3.937);
    }
}
