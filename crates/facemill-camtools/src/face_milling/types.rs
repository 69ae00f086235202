//! Type definitions for face milling
//!
//! Two layers live here. The `*Input` structs mirror what an operator types
//! into a form: every section and every field is optional and nothing is
//! defaulted. The validator turns a complete, consistent input into
//! [`ProgramParameters`], which the planner and emitter consume.

use facemill_core::LengthUnit;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowercase and strip separators so "Spiral In", "spiral_in" and
/// "SPIRAL-IN" compare equal.
fn normalize_key(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

// ============================================================================
// Operator input
// ============================================================================

/// Work position as entered by the operator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionInput {
    /// Reference frame name (table, fixture1..3 or G55..G57)
    pub reference: Option<String>,
    /// X offset of the stock origin within the frame (mm)
    pub x: Option<f64>,
    /// Y offset of the stock origin within the frame (mm)
    pub y: Option<f64>,
}

/// Raw stock dimensions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockInput {
    /// Size along X (mm)
    pub width: Option<f64>,
    /// Size along Y (mm)
    pub length: Option<f64>,
    /// Size along Z before machining (mm)
    pub height: Option<f64>,
    /// Target Z after finishing (mm)
    pub finished_height: Option<f64>,
    /// Margin machined around the stock on every side (mm); absent means none
    pub offset: Option<f64>,
}

/// Roughing operation as entered
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoughingInput {
    pub tool_number: Option<i64>,
    /// Cutter diameter (mm)
    pub tool_diameter: Option<f64>,
    pub strategy: Option<String>,
    /// Stepover between lanes (mm)
    pub width_of_cut: Option<f64>,
    /// Maximum material removed per Z pass (mm)
    pub depth_of_cut: Option<f64>,
    /// Stock left for the finishing pass (mm); 0 disables finishing
    pub leave_for_finishing: Option<f64>,
    pub rpm: Option<f64>,
    /// Cutting feed (mm/min)
    pub feedrate: Option<f64>,
}

/// Finishing operation as entered
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinishingInput {
    pub tool_number: Option<i64>,
    pub tool_diameter: Option<f64>,
    pub strategy: Option<String>,
    pub width_of_cut: Option<f64>,
    pub rpm: Option<f64>,
    pub feedrate: Option<f64>,
}

/// Coolant selection, with the M-codes resolved from the machine's coolant table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoolantInput {
    pub mode: Option<String>,
    pub on_code: Option<i64>,
    pub off_code: Option<i64>,
}

/// Everything the operator supplied for one "generate" request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceMillingInput {
    pub position: Option<PositionInput>,
    pub stock: Option<StockInput>,
    pub roughing: Option<RoughingInput>,
    pub finishing: Option<FinishingInput>,
    pub coolant: Option<CoolantInput>,
}

// ============================================================================
// Validated parameters
// ============================================================================

/// Work coordinate system the program runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameKind {
    /// Table reference; G55 is programmed from the table origin
    Table,
    Fixture1,
    Fixture2,
    Fixture3,
}

impl FrameKind {
    pub const EXPECTED: &'static str = "table, fixture1, fixture2, fixture3";

    /// Work offset selected by this frame.
    pub fn work_offset(&self) -> &'static str {
        match self {
            Self::Table | Self::Fixture1 => "G55",
            Self::Fixture2 => "G56",
            Self::Fixture3 => "G57",
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "Table"),
            Self::Fixture1 => write!(f, "Fixture 1"),
            Self::Fixture2 => write!(f, "Fixture 2"),
            Self::Fixture3 => write!(f, "Fixture 3"),
        }
    }
}

impl FromStr for FrameKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_key(s).as_str() {
            "table" => Ok(Self::Table),
            "fixture1" | "g55" => Ok(Self::Fixture1),
            "fixture2" | "g56" => Ok(Self::Fixture2),
            "fixture3" | "g57" => Ok(Self::Fixture3),
            _ => Err(format!("Unknown reference frame: {}", s)),
        }
    }
}

/// Reference frame plus the stock origin's offset inside it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceFrame {
    pub kind: FrameKind,
    pub x_offset: f64,
    pub y_offset: f64,
}

impl ReferenceFrame {
    /// XY shift applied to emitted coordinates. Table offsets are folded into
    /// the G55 setup instead, so coordinates stay part-local.
    pub fn coordinate_shift(&self) -> (f64, f64) {
        match self.kind {
            FrameKind::Table => (0.0, 0.0),
            _ => (self.x_offset, self.y_offset),
        }
    }
}

/// Axis-aligned rectangle in the XY plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Rect {
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// The rectangle pushed out by `margin` on every side.
    pub fn grown(&self, margin: f64) -> Self {
        Self {
            x_min: self.x_min - margin,
            y_min: self.y_min - margin,
            x_max: self.x_max + margin,
            y_max: self.y_max + margin,
        }
    }

    /// Whether `(x, y)` lies on or inside the rectangle, within `tolerance`.
    pub fn contains(&self, x: f64, y: f64, tolerance: f64) -> bool {
        x >= self.x_min - tolerance
            && y >= self.y_min - tolerance
            && x <= self.x_max + tolerance
            && y <= self.y_max + tolerance
    }

    /// Euclidean distance from `(x, y)` to the rectangle; zero inside it.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        let dx = (self.x_min - x).max(x - self.x_max).max(0.0);
        let dy = (self.y_min - y).max(y - self.y_max).max(0.0);
        dx.hypot(dy)
    }
}

/// Raw block before machining and its target height
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StockGeometry {
    pub width: f64,
    pub length: f64,
    pub height: f64,
    pub finished_height: f64,
    /// Margin machined around the block on every side
    pub offset: f64,
}

impl StockGeometry {
    /// Smaller of the two plan extents
    pub fn min_extent(&self) -> f64 {
        self.width.min(self.length)
    }

    /// Plan area the cutter must clear: the block grown by its offset, in
    /// part-local coordinates with the block's corner at the origin.
    pub fn work_area(&self) -> Rect {
        Rect {
            x_min: 0.0,
            y_min: 0.0,
            x_max: self.width,
            y_max: self.length,
        }
        .grown(self.offset)
    }
}

/// Cutting strategy for laying lanes over the stock rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CutStrategy {
    /// Continuous clockwise spiral from the outside in
    SpiralIn,
    /// The inward spiral run backwards, from the centre out
    SpiralOut,
    /// Parallel lanes along X, alternating direction
    Zigzag,
}

impl CutStrategy {
    pub const EXPECTED: &'static str = "spiral_in, spiral_out, zigzag";
}

impl fmt::Display for CutStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpiralIn => write!(f, "spiral in"),
            Self::SpiralOut => write!(f, "spiral out"),
            Self::Zigzag => write!(f, "zigzag"),
        }
    }
}

impl FromStr for CutStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_key(s).as_str() {
            "spiralin" => Ok(Self::SpiralIn),
            "spiralout" => Ok(Self::SpiralOut),
            "zigzag" => Ok(Self::Zigzag),
            _ => Err(format!("Unknown cutting strategy: {}", s)),
        }
    }
}

/// One tool's cutting data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolOperation {
    pub tool_number: u32,
    pub tool_diameter: f64,
    pub strategy: CutStrategy,
    pub width_of_cut: f64,
    pub rpm: f64,
    pub feedrate: f64,
}

impl ToolOperation {
    pub fn tool_radius(&self) -> f64 {
        self.tool_diameter / 2.0
    }
}

/// Roughing tool data plus its Z stepping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoughingOperation {
    pub tool: ToolOperation,
    pub depth_of_cut: f64,
    pub leave_for_finishing: f64,
}

impl RoughingOperation {
    /// Height roughing stops at
    pub fn target_height(&self, stock: &StockGeometry) -> f64 {
        stock.finished_height + self.leave_for_finishing
    }

    /// Total material removed by roughing
    pub fn total_depth(&self, stock: &StockGeometry) -> f64 {
        stock.height - self.target_height(stock)
    }

    pub fn has_finishing(&self) -> bool {
        self.leave_for_finishing > 0.0
    }
}

/// Coolant mode selected for the job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CoolantMode {
    None,
    Air,
    InternalAir,
    ColdAir,
    OilMist,
}

impl CoolantMode {
    pub const EXPECTED: &'static str = "none, air, internal_air, cold_air, oil_mist";
}

impl fmt::Display for CoolantMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Air => write!(f, "Air"),
            Self::InternalAir => write!(f, "Internal air"),
            Self::ColdAir => write!(f, "Cold air"),
            Self::OilMist => write!(f, "Oil mist"),
        }
    }
}

impl FromStr for CoolantMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_key(s).as_str() {
            "none" | "off" => Ok(Self::None),
            "air" => Ok(Self::Air),
            "internalair" => Ok(Self::InternalAir),
            "coldair" => Ok(Self::ColdAir),
            "oilmist" => Ok(Self::OilMist),
            _ => Err(format!("Unknown coolant mode: {}", s)),
        }
    }
}

/// M-code numbers switching a coolant on and off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoolantCodes {
    pub on_code: u32,
    pub off_code: u32,
}

/// Resolved coolant choice; `codes` is present for every mode except `None`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoolantSetting {
    pub mode: CoolantMode,
    pub codes: Option<CoolantCodes>,
}

impl CoolantSetting {
    pub fn off() -> Self {
        Self {
            mode: CoolantMode::None,
            codes: None,
        }
    }

    /// Codes to emit, if coolant is switched on at all.
    pub fn active_codes(&self) -> Option<CoolantCodes> {
        match self.mode {
            CoolantMode::None => None,
            _ => self.codes,
        }
    }
}

/// Validated, immutable parameters for one program
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramParameters {
    pub frame: ReferenceFrame,
    pub stock: StockGeometry,
    pub roughing: RoughingOperation,
    /// Present iff `roughing.leave_for_finishing > 0`
    pub finishing: Option<ToolOperation>,
    pub coolant: CoolantSetting,
}

/// Machine-level settings resolved from configuration by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSettings {
    pub units: LengthUnit,
    /// Retract height above the stock top (mm)
    pub clearance_height: f64,
    /// Feed for Z plunges (mm/min)
    pub plunge_feedrate: f64,
    /// Distance the cutter's edge stays clear of the stock when plunging (mm)
    pub lead_in_length: f64,
    /// Radius of the arcs rounding spiral corners (mm); 0 gives sharp corners
    pub corner_radius: f64,
    /// How far the last pass reaches past the far edge (mm)
    pub last_cut_overlap: f64,
    /// Machine coordinates of the table origin, used for the Table frame
    pub table_reference_x: f64,
    pub table_reference_y: f64,
    pub table_reference_z: f64,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            units: LengthUnit::Millimeters,
            clearance_height: 50.0,
            plunge_feedrate: 500.0,
            lead_in_length: 10.0,
            corner_radius: 4.0,
            last_cut_overlap: 10.0,
            table_reference_x: -2600.0,
            table_reference_y: -1500.0,
            table_reference_z: -1171.193,
        }
    }
}

impl MachineSettings {
    /// Absolute retract height for a given stock
    pub fn retract_height(&self, stock: &StockGeometry) -> f64 {
        stock.height + self.clearance_height
    }

    /// Distance every plunge point keeps from the work area for a cutter
    /// of `tool_radius`.
    pub fn entry_clearance(&self, tool_radius: f64) -> f64 {
        tool_radius + self.lead_in_length
    }
}

/// The two operations a program can contain, in machining order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationKind {
    Roughing,
    Finishing,
}

impl OperationKind {
    /// Sequence number of the operation block
    pub fn block_number(&self) -> u32 {
        match self {
            Self::Roughing => 1,
            Self::Finishing => 2,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Roughing => write!(f, "Roughing"),
            Self::Finishing => write!(f, "Finishing"),
        }
    }
}
