//! Parameter validation for face milling.
//!
//! Checks every reachable field of a [`FaceMillingInput`] and collects all
//! violations before answering, so an operator can fix the whole form in
//! one pass. Each field contributes at most one violation; cross-field rules
//! only run once the fields they compare are individually valid. Nothing is
//! ever defaulted: a missing value is reported, not substituted.
//!
//! Numeric ranges follow [`ParameterLimits`] for the machine's unit. Pass and
//! lane counts are estimated without planning, so a job that would need an
//! unreasonable program is rejected before any geometry is allocated.

use super::path_calculator::{pass_count, SpiralPathCalculator};
use super::types::{
    CoolantCodes, CoolantInput, CoolantMode, CoolantSetting, CutStrategy, FaceMillingInput,
    FinishingInput, FrameKind, MachineSettings, PositionInput, ProgramParameters, Rect,
    ReferenceFrame, RoughingInput, RoughingOperation, StockGeometry, StockInput, ToolOperation,
};
use crate::error::{ParameterError, ValidationReport, Violation};
use facemill_core::LengthUnit;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Most Z passes a roughing operation may take.
pub const MAX_DEPTH_PASSES: usize = 500;

/// Most passes cut at a single depth level.
pub const MAX_LANES_PER_LEVEL: usize = 500;

/// Accepted ranges for numeric parameters, in the machine's program unit
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterLimits {
    /// Width, length and height of the stock
    pub stock_size: RangeInclusive<f64>,
    pub stock_offset: RangeInclusive<f64>,
    pub tool_diameter: RangeInclusive<f64>,
    pub depth_of_cut: RangeInclusive<f64>,
    pub rpm: RangeInclusive<f64>,
    pub feedrate: RangeInclusive<f64>,
    pub clearance_height: RangeInclusive<f64>,
    pub plunge_feedrate: RangeInclusive<f64>,
    pub corner_radius: RangeInclusive<f64>,
}

impl ParameterLimits {
    /// Limits for a machine programmed in `unit`. Lengths and feeds are
    /// defined in millimeters and converted; spindle speed has no unit.
    pub fn for_unit(unit: LengthUnit) -> Self {
        let length = |min: f64, max: f64| unit.length_from_mm(min)..=unit.length_from_mm(max);
        Self {
            stock_size: length(50.0, 1000.0),
            stock_offset: length(0.0, 1000.0),
            tool_diameter: length(5.0, 300.0),
            depth_of_cut: length(0.1, 100.0),
            rpm: 800.0..=20000.0,
            feedrate: length(100.0, 15000.0),
            clearance_height: length(5.0, 500.0),
            plunge_feedrate: length(100.0, 15000.0),
            corner_radius: length(0.0, 25.0),
        }
    }
}

impl Default for ParameterLimits {
    fn default() -> Self {
        Self::for_unit(LengthUnit::Millimeters)
    }
}

/// Outcome of validating operator input
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Valid(ProgramParameters),
    Invalid(ValidationReport),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Violations found; empty when valid.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Valid(_) => &[],
            Self::Invalid(report) => report.violations(),
        }
    }

    pub fn into_result(self) -> Result<ProgramParameters, ValidationReport> {
        match self {
            Self::Valid(params) => Ok(params),
            Self::Invalid(report) => Err(report),
        }
    }
}

/// Accumulates violations while extracting typed values.
#[derive(Debug, Default)]
struct Checker {
    report: ValidationReport,
}

impl Checker {
    fn reject(&mut self, field: &str, error: ParameterError) {
        self.report.push(Violation::new(field, error));
    }

    fn section<'a, T>(&mut self, field: &str, section: Option<&'a T>) -> Option<&'a T> {
        if section.is_none() {
            self.reject(field, ParameterError::MissingSection);
        }
        section
    }

    fn finite(&mut self, field: &str, value: Option<f64>) -> Option<f64> {
        match value {
            None => {
                self.reject(field, ParameterError::Missing);
                None
            }
            Some(v) if !v.is_finite() => {
                self.reject(field, ParameterError::NotFinite);
                None
            }
            Some(v) => Some(v),
        }
    }

    fn positive(&mut self, field: &str, value: Option<f64>) -> Option<f64> {
        let v = self.finite(field, value)?;
        if v <= 0.0 {
            self.reject(field, ParameterError::NotPositive { value: v });
            return None;
        }
        Some(v)
    }

    fn non_negative(&mut self, field: &str, value: Option<f64>) -> Option<f64> {
        let v = self.finite(field, value)?;
        if v < 0.0 {
            self.reject(field, ParameterError::Negative { value: v });
            return None;
        }
        Some(v)
    }

    fn in_range(
        &mut self,
        field: &str,
        value: Option<f64>,
        range: &RangeInclusive<f64>,
    ) -> Option<f64> {
        let v = self.finite(field, value)?;
        if !range.contains(&v) {
            self.reject(
                field,
                ParameterError::OutOfRange {
                    value: v,
                    min: *range.start(),
                    max: *range.end(),
                },
            );
            return None;
        }
        Some(v)
    }

    /// Like `in_range`, but an absent value is acceptable.
    fn optional_in_range(
        &mut self,
        field: &str,
        value: Option<f64>,
        range: &RangeInclusive<f64>,
    ) -> Option<Option<f64>> {
        match value {
            None => Some(None),
            Some(_) => self.in_range(field, value, range).map(Some),
        }
    }

    fn tool_number(&mut self, field: &str, value: Option<i64>) -> Option<u32> {
        match value {
            None => {
                self.reject(field, ParameterError::Missing);
                None
            }
            Some(v) if v < 1 => {
                self.reject(field, ParameterError::NotPositiveInteger { value: v });
                None
            }
            Some(v) => match u32::try_from(v) {
                Ok(n) => Some(n),
                Err(_) => {
                    self.reject(
                        field,
                        ParameterError::IntegerOutOfRange {
                            value: v,
                            min: 1,
                            max: i64::from(u32::MAX),
                        },
                    );
                    None
                }
            },
        }
    }

    fn m_code(&mut self, field: &str, value: Option<i64>) -> Option<u32> {
        match value {
            None => {
                self.reject(field, ParameterError::Missing);
                None
            }
            Some(v) => match u32::try_from(v) {
                Ok(n) => Some(n),
                Err(_) => {
                    self.reject(
                        field,
                        ParameterError::IntegerOutOfRange {
                            value: v,
                            min: 0,
                            max: i64::from(u32::MAX),
                        },
                    );
                    None
                }
            },
        }
    }

    fn member<T: FromStr>(
        &mut self,
        field: &str,
        value: Option<&String>,
        expected: &str,
    ) -> Option<T> {
        let Some(raw) = value else {
            self.reject(field, ParameterError::Missing);
            return None;
        };
        match raw.parse::<T>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                self.reject(
                    field,
                    ParameterError::Unrecognized {
                        value: raw.clone(),
                        expected: expected.to_string(),
                    },
                );
                None
            }
        }
    }
}

/// Machine-dependent inputs to the job rules
#[derive(Debug, Clone)]
struct Rules {
    limits: ParameterLimits,
    last_cut_overlap: f64,
}

impl Rules {
    fn for_machine(machine: &MachineSettings) -> Self {
        // A bad overlap is reported by the machine checks; estimate without it.
        let overlap = machine.last_cut_overlap;
        Self {
            limits: ParameterLimits::for_unit(machine.units),
            last_cut_overlap: if overlap.is_finite() && overlap > 0.0 {
                overlap
            } else {
                0.0
            },
        }
    }
}

/// Stock values that passed their own checks, used by cross-field rules.
#[derive(Debug, Clone, Copy, Default)]
struct KnownStock {
    width: Option<f64>,
    length: Option<f64>,
    height: Option<f64>,
    finished_height: Option<f64>,
    offset: Option<f64>,
}

impl KnownStock {
    fn min_extent(&self) -> Option<f64> {
        Some(self.width?.min(self.length?))
    }

    fn work_area(&self) -> Option<Rect> {
        let block = Rect {
            x_min: 0.0,
            y_min: 0.0,
            x_max: self.width?,
            y_max: self.length?,
        };
        Some(block.grown(self.offset?))
    }
}

/// Fields both operations share
struct ToolFields<'a> {
    prefix: &'static str,
    tool_number: Option<i64>,
    tool_diameter: Option<f64>,
    strategy: Option<&'a String>,
    width_of_cut: Option<f64>,
    rpm: Option<f64>,
    feedrate: Option<f64>,
}

impl<'a> From<&'a RoughingInput> for ToolFields<'a> {
    fn from(roughing: &'a RoughingInput) -> Self {
        Self {
            prefix: "roughing",
            tool_number: roughing.tool_number,
            tool_diameter: roughing.tool_diameter,
            strategy: roughing.strategy.as_ref(),
            width_of_cut: roughing.width_of_cut,
            rpm: roughing.rpm,
            feedrate: roughing.feedrate,
        }
    }
}

impl<'a> From<&'a FinishingInput> for ToolFields<'a> {
    fn from(finishing: &'a FinishingInput) -> Self {
        Self {
            prefix: "finishing",
            tool_number: finishing.tool_number,
            tool_diameter: finishing.tool_diameter,
            strategy: finishing.strategy.as_ref(),
            width_of_cut: finishing.width_of_cut,
            rpm: finishing.rpm,
            feedrate: finishing.feedrate,
        }
    }
}

/// Validates face milling input and machine settings.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParameterValidator;

impl ParameterValidator {
    /// Validate operator input against a default millimeter machine.
    pub fn validate(input: &FaceMillingInput) -> ValidationResult {
        Self::validate_with(input, &MachineSettings::default())
    }

    /// Validate operator input for `machine`, returning typed parameters or
    /// every violation. Machine settings themselves are checked by
    /// [`ParameterValidator::validate_machine`].
    pub fn validate_with(input: &FaceMillingInput, machine: &MachineSettings) -> ValidationResult {
        let mut checker = Checker::default();
        let rules = Rules::for_machine(machine);

        let frame = checker
            .section("position", input.position.as_ref())
            .and_then(|p| Self::validate_position(&mut checker, p));

        let mut known = KnownStock::default();
        let stock = checker
            .section("stock", input.stock.as_ref())
            .and_then(|s| Self::validate_stock(&mut checker, s, &mut known, &rules));

        let roughing = checker
            .section("roughing", input.roughing.as_ref())
            .and_then(|r| Self::validate_roughing(&mut checker, r, &known, &rules));

        // Finishing is only demanded once we know roughing leaves material for it.
        let leave = input
            .roughing
            .as_ref()
            .and_then(|r| r.leave_for_finishing)
            .filter(|l| l.is_finite() && *l >= 0.0);
        let finishing_required = leave.is_some_and(|l| l > 0.0);
        let finishing = match leave {
            Some(l) if l > 0.0 => checker
                .section("finishing", input.finishing.as_ref())
                .and_then(|f| Self::validate_tool(&mut checker, f.into(), &known, &rules)),
            Some(_) => None,
            None => input
                .finishing
                .as_ref()
                .and_then(|f| Self::validate_tool(&mut checker, f.into(), &known, &rules)),
        };

        let coolant = checker
            .section("coolant", input.coolant.as_ref())
            .and_then(|c| Self::validate_coolant(&mut checker, c));

        if !checker.report.is_empty() {
            return ValidationResult::Invalid(checker.report);
        }

        // Every None above recorded a violation, so this only matches complete input.
        match (frame, stock, roughing, coolant) {
            (Some(frame), Some(stock), Some(roughing), Some(coolant))
                if finishing.is_some() || !finishing_required =>
            {
                ValidationResult::Valid(ProgramParameters {
                    frame,
                    stock,
                    roughing,
                    finishing: if finishing_required { finishing } else { None },
                    coolant,
                })
            }
            _ => ValidationResult::Invalid(checker.report),
        }
    }

    /// Validate machine settings resolved from configuration.
    pub fn validate_machine(machine: &MachineSettings) -> Vec<Violation> {
        let mut checker = Checker::default();
        let limits = ParameterLimits::for_unit(machine.units);
        checker.in_range(
            "machine.clearance_height",
            Some(machine.clearance_height),
            &limits.clearance_height,
        );
        checker.in_range(
            "machine.plunge_feedrate",
            Some(machine.plunge_feedrate),
            &limits.plunge_feedrate,
        );
        checker.non_negative("machine.lead_in_length", Some(machine.lead_in_length));
        checker.in_range(
            "machine.corner_radius",
            Some(machine.corner_radius),
            &limits.corner_radius,
        );
        checker.non_negative("machine.last_cut_overlap", Some(machine.last_cut_overlap));
        checker.finite("machine.table_reference_x", Some(machine.table_reference_x));
        checker.finite("machine.table_reference_y", Some(machine.table_reference_y));
        checker.finite("machine.table_reference_z", Some(machine.table_reference_z));
        checker.report.into_iter().collect()
    }

    fn validate_position(checker: &mut Checker, position: &PositionInput) -> Option<ReferenceFrame> {
        let kind = checker.member::<FrameKind>(
            "position.reference",
            position.reference.as_ref(),
            FrameKind::EXPECTED,
        );
        let x = checker.finite("position.x", position.x);
        let y = checker.finite("position.y", position.y);
        Some(ReferenceFrame {
            kind: kind?,
            x_offset: x?,
            y_offset: y?,
        })
    }

    fn validate_stock(
        checker: &mut Checker,
        stock: &StockInput,
        known: &mut KnownStock,
        rules: &Rules,
    ) -> Option<StockGeometry> {
        let size = &rules.limits.stock_size;
        known.width = checker.in_range("stock.width", stock.width, size);
        known.length = checker.in_range("stock.length", stock.length, size);
        known.height = checker.in_range("stock.height", stock.height, size);
        known.finished_height =
            checker.non_negative("stock.finished_height", stock.finished_height);
        known.offset = checker
            .optional_in_range("stock.offset", stock.offset, &rules.limits.stock_offset)
            .map(|offset| offset.unwrap_or(0.0));

        if let (Some(height), Some(finished)) = (known.height, known.finished_height) {
            if finished >= height {
                checker.reject(
                    "stock.finished_height",
                    ParameterError::Incompatible(format!(
                        "must be below the stock height ({}), got {}",
                        height, finished
                    )),
                );
                known.finished_height = None;
            }
        }

        Some(StockGeometry {
            width: known.width?,
            length: known.length?,
            height: known.height?,
            finished_height: known.finished_height?,
            offset: known.offset?,
        })
    }

    /// Checks shared by both operations.
    fn validate_tool(
        checker: &mut Checker,
        tool: ToolFields<'_>,
        known: &KnownStock,
        rules: &Rules,
    ) -> Option<ToolOperation> {
        let limits = &rules.limits;
        let field = |name: &str| format!("{}.{}", tool.prefix, name);

        let tool_number = checker.tool_number(&field("tool_number"), tool.tool_number);
        let tool_diameter =
            checker.in_range(&field("tool_diameter"), tool.tool_diameter, &limits.tool_diameter);
        let strategy =
            checker.member::<CutStrategy>(&field("strategy"), tool.strategy, CutStrategy::EXPECTED);
        let mut width_of_cut = checker.positive(&field("width_of_cut"), tool.width_of_cut);
        let rpm = checker.in_range(&field("rpm"), tool.rpm, &limits.rpm);
        let feedrate = checker.in_range(&field("feedrate"), tool.feedrate, &limits.feedrate);

        if let (Some(width), Some(extent)) = (width_of_cut, known.min_extent()) {
            if width > extent {
                checker.reject(
                    &field("width_of_cut"),
                    ParameterError::Incompatible(format!(
                        "must not exceed the smaller stock extent ({}), got {}",
                        extent, width
                    )),
                );
                width_of_cut = None;
            }
        }
        if let (Some(width), Some(diameter)) = (width_of_cut, tool_diameter) {
            if width > diameter {
                checker.reject(
                    &field("width_of_cut"),
                    ParameterError::Incompatible(format!(
                        "must not exceed the tool diameter ({}), got {}",
                        diameter, width
                    )),
                );
                width_of_cut = None;
            }
        }
        if let (Some(width), Some(diameter), Some(strategy), Some(area)) =
            (width_of_cut, tool_diameter, strategy, known.work_area())
        {
            let count = SpiralPathCalculator::lane_count(
                strategy,
                diameter,
                width,
                &area,
                rules.last_cut_overlap,
            );
            if count > MAX_LANES_PER_LEVEL as f64 {
                checker.reject(
                    &field("width_of_cut"),
                    ParameterError::TooManyLanes {
                        count: count as u64,
                        limit: MAX_LANES_PER_LEVEL,
                    },
                );
                width_of_cut = None;
            }
        }

        Some(ToolOperation {
            tool_number: tool_number?,
            tool_diameter: tool_diameter?,
            strategy: strategy?,
            width_of_cut: width_of_cut?,
            rpm: rpm?,
            feedrate: feedrate?,
        })
    }

    fn validate_roughing(
        checker: &mut Checker,
        roughing: &RoughingInput,
        known: &KnownStock,
        rules: &Rules,
    ) -> Option<RoughingOperation> {
        let tool = Self::validate_tool(checker, roughing.into(), known, rules);
        let mut depth_of_cut = checker.in_range(
            "roughing.depth_of_cut",
            roughing.depth_of_cut,
            &rules.limits.depth_of_cut,
        );
        let mut leave =
            checker.non_negative("roughing.leave_for_finishing", roughing.leave_for_finishing);

        if let (Some(l), Some(height), Some(finished)) =
            (leave, known.height, known.finished_height)
        {
            if height - finished - l <= 0.0 {
                checker.reject(
                    "roughing.leave_for_finishing",
                    ParameterError::Incompatible(format!(
                        "must be less than the material to remove ({}), got {}",
                        height - finished,
                        l
                    )),
                );
                leave = None;
            }
        }
        if let (Some(step), Some(l), Some(height), Some(finished)) =
            (depth_of_cut, leave, known.height, known.finished_height)
        {
            let count = pass_count(height - finished - l, step);
            if count > MAX_DEPTH_PASSES as f64 {
                checker.reject(
                    "roughing.depth_of_cut",
                    ParameterError::TooManyPasses {
                        count: count as u64,
                        limit: MAX_DEPTH_PASSES,
                    },
                );
                depth_of_cut = None;
            }
        }

        Some(RoughingOperation {
            tool: tool?,
            depth_of_cut: depth_of_cut?,
            leave_for_finishing: leave?,
        })
    }

    fn validate_coolant(checker: &mut Checker, coolant: &CoolantInput) -> Option<CoolantSetting> {
        let mode = checker.member::<CoolantMode>(
            "coolant.mode",
            coolant.mode.as_ref(),
            CoolantMode::EXPECTED,
        )?;
        if mode == CoolantMode::None {
            return Some(CoolantSetting::off());
        }

        let on_code = checker.m_code("coolant.on_code", coolant.on_code);
        let off_code = checker.m_code("coolant.off_code", coolant.off_code);
        let (on_code, off_code) = (on_code?, off_code?);
        if on_code == off_code {
            checker.reject(
                "coolant.off_code",
                ParameterError::Incompatible(format!(
                    "must differ from the on code (M{})",
                    on_code
                )),
            );
            return None;
        }

        Some(CoolantSetting {
            mode,
            codes: Some(CoolantCodes { on_code, off_code }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> FaceMillingInput {
        FaceMillingInput {
            position: Some(PositionInput {
                reference: Some("table".to_string()),
                x: Some(0.0),
                y: Some(0.0),
            }),
            stock: Some(StockInput {
                width: Some(300.0),
                length: Some(200.0),
                height: Some(50.0),
                finished_height: Some(45.0),
                offset: None,
            }),
            roughing: Some(RoughingInput {
                tool_number: Some(1),
                tool_diameter: Some(50.0),
                strategy: Some("spiral_in".to_string()),
                width_of_cut: Some(40.0),
                depth_of_cut: Some(2.0),
                leave_for_finishing: Some(0.0),
                rpm: Some(3000.0),
                feedrate: Some(1500.0),
            }),
            finishing: None,
            coolant: Some(CoolantInput {
                mode: Some("none".to_string()),
                on_code: None,
                off_code: None,
            }),
        }
    }

    fn finishing_input() -> FinishingInput {
        FinishingInput {
            tool_number: Some(2),
            tool_diameter: Some(80.0),
            strategy: Some("spiral_out".to_string()),
            width_of_cut: Some(50.0),
            rpm: Some(4000.0),
            feedrate: Some(3000.0),
        }
    }

    fn fields(result: &ValidationResult) -> Vec<&str> {
        result.violations().iter().map(|v| v.field.as_str()).collect()
    }

    #[test]
    fn test_valid_input_without_finishing() {
        let result = ParameterValidator::validate(&valid_input());
        let params = result.into_result().expect("input should be valid");
        assert_eq!(params.frame.kind, FrameKind::Table);
        assert_eq!(params.roughing.tool.tool_number, 1);
        assert!(params.finishing.is_none());
        assert_eq!(params.coolant.mode, CoolantMode::None);
    }

    #[test]
    fn test_finishing_required_when_leaving_stock() {
        let mut input = valid_input();
        if let Some(r) = input.roughing.as_mut() {
            r.leave_for_finishing = Some(0.5);
        }
        let result = ParameterValidator::validate(&input);
        assert_eq!(fields(&result), vec!["finishing"]);

        input.finishing = Some(finishing_input());
        let params = ParameterValidator::validate(&input)
            .into_result()
            .expect("finishing supplied");
        assert_eq!(params.finishing.map(|f| f.tool_number), Some(2));
    }

    #[test]
    fn test_finishing_ignored_without_leave() {
        let mut input = valid_input();
        input.finishing = Some(FinishingInput::default());
        let params = ParameterValidator::validate(&input)
            .into_result()
            .expect("finishing not needed");
        assert!(params.finishing.is_none());
    }

    #[test]
    fn test_negative_tool_number_and_missing_coolant_both_reported() {
        let mut input = valid_input();
        if let Some(r) = input.roughing.as_mut() {
            r.tool_number = Some(-1);
        }
        input.coolant = None;

        let result = ParameterValidator::validate(&input);
        assert!(!result.is_valid());
        assert_eq!(fields(&result), vec!["roughing.tool_number", "coolant"]);
    }

    #[test]
    fn test_every_missing_field_is_reported() {
        let input = FaceMillingInput {
            stock: Some(StockInput::default()),
            ..FaceMillingInput::default()
        };
        let result = ParameterValidator::validate(&input);
        assert_eq!(
            fields(&result),
            vec![
                "position",
                "stock.width",
                "stock.length",
                "stock.height",
                "stock.finished_height",
                "roughing",
                "coolant",
            ]
        );
    }

    #[test]
    fn test_unknown_strategy_is_a_violation() {
        let mut input = valid_input();
        if let Some(r) = input.roughing.as_mut() {
            r.strategy = Some("trochoidal".to_string());
        }
        let result = ParameterValidator::validate(&input);
        assert_eq!(fields(&result), vec!["roughing.strategy"]);
        assert!(matches!(
            result.violations()[0].error,
            ParameterError::Unrecognized { .. }
        ));
    }

    #[test]
    fn test_finished_height_must_be_below_height() {
        let mut input = valid_input();
        if let Some(s) = input.stock.as_mut() {
            s.finished_height = Some(50.0);
        }
        let result = ParameterValidator::validate(&input);
        // The roughing depth rule needs a valid finished height, so it stays quiet.
        assert_eq!(fields(&result), vec!["stock.finished_height"]);
    }

    #[test]
    fn test_width_of_cut_limited_by_stock_and_tool() {
        let mut input = valid_input();
        if let Some(r) = input.roughing.as_mut() {
            r.width_of_cut = Some(250.0);
        }
        assert_eq!(
            fields(&ParameterValidator::validate(&input)),
            vec!["roughing.width_of_cut"]
        );

        if let Some(r) = input.roughing.as_mut() {
            r.width_of_cut = Some(40.0);
            r.tool_diameter = Some(32.0);
        }
        assert_eq!(
            fields(&ParameterValidator::validate(&input)),
            vec!["roughing.width_of_cut"]
        );
    }

    #[test]
    fn test_leave_must_not_consume_all_material() {
        let mut input = valid_input();
        if let Some(r) = input.roughing.as_mut() {
            r.leave_for_finishing = Some(5.0);
        }
        input.finishing = Some(finishing_input());
        let result = ParameterValidator::validate(&input);
        assert_eq!(fields(&result), vec!["roughing.leave_for_finishing"]);
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let mut input = valid_input();
        if let Some(r) = input.roughing.as_mut() {
            r.rpm = Some(f64::NAN);
            r.feedrate = Some(f64::INFINITY);
        }
        let result = ParameterValidator::validate(&input);
        assert_eq!(fields(&result), vec!["roughing.rpm", "roughing.feedrate"]);
        assert!(result
            .violations()
            .iter()
            .all(|v| v.error == ParameterError::NotFinite));
    }

    #[test]
    fn test_active_coolant_needs_codes() {
        let mut input = valid_input();
        input.coolant = Some(CoolantInput {
            mode: Some("air".to_string()),
            on_code: Some(81),
            off_code: None,
        });
        assert_eq!(
            fields(&ParameterValidator::validate(&input)),
            vec!["coolant.off_code"]
        );

        input.coolant = Some(CoolantInput {
            mode: Some("air".to_string()),
            on_code: Some(81),
            off_code: Some(81),
        });
        assert_eq!(
            fields(&ParameterValidator::validate(&input)),
            vec!["coolant.off_code"]
        );

        input.coolant = Some(CoolantInput {
            mode: Some("air".to_string()),
            on_code: Some(81),
            off_code: Some(82),
        });
        let params = ParameterValidator::validate(&input)
            .into_result()
            .expect("coolant resolved");
        assert_eq!(
            params.coolant.active_codes(),
            Some(CoolantCodes {
                on_code: 81,
                off_code: 82
            })
        );
    }

    #[test]
    fn test_machine_settings() {
        assert!(ParameterValidator::validate_machine(&MachineSettings::default()).is_empty());

        let machine = MachineSettings {
            clearance_height: 0.0,
            lead_in_length: -1.0,
            ..MachineSettings::default()
        };
        let violations = ParameterValidator::validate_machine(&machine);
        let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["machine.clearance_height", "machine.lead_in_length"]
        );
    }

    #[test]
    fn test_tool_diameter_is_required() {
        let mut input = valid_input();
        if let Some(r) = input.roughing.as_mut() {
            r.tool_diameter = None;
        }
        let result = ParameterValidator::validate(&input);
        assert_eq!(fields(&result), vec!["roughing.tool_diameter"]);
        assert_eq!(result.violations()[0].error, ParameterError::Missing);
    }

    #[test]
    fn test_values_outside_machine_ranges() {
        let mut input = valid_input();
        if let Some(s) = input.stock.as_mut() {
            s.width = Some(20.0);
        }
        if let Some(r) = input.roughing.as_mut() {
            r.rpm = Some(0.4);
            r.feedrate = Some(0.4);
            r.depth_of_cut = Some(1e-13);
        }
        let result = ParameterValidator::validate(&input);
        assert_eq!(
            fields(&result),
            vec![
                "stock.width",
                "roughing.rpm",
                "roughing.feedrate",
                "roughing.depth_of_cut"
            ]
        );
        assert_eq!(
            result.violations()[1].error,
            ParameterError::OutOfRange {
                value: 0.4,
                min: 800.0,
                max: 20000.0
            }
        );
        assert_eq!(
            result.violations()[2].reason(),
            "must be between 100 and 15000, got 0.4"
        );
    }

    #[test]
    fn test_smallest_speed_and_feed_accepted() {
        let mut input = valid_input();
        if let Some(r) = input.roughing.as_mut() {
            r.rpm = Some(800.0);
            r.feedrate = Some(100.0);
        }
        assert!(ParameterValidator::validate(&input).is_valid());
    }

    #[test]
    fn test_inch_machine_scales_limits() {
        let input = FaceMillingInput {
            stock: Some(StockInput {
                width: Some(12.0),
                length: Some(8.0),
                height: Some(2.0),
                finished_height: Some(1.8),
                offset: None,
            }),
            roughing: Some(RoughingInput {
                tool_diameter: Some(2.0),
                width_of_cut: Some(1.5),
                depth_of_cut: Some(0.1),
                feedrate: Some(60.0),
                ..valid_input().roughing.unwrap_or_default()
            }),
            ..valid_input()
        };
        let machine = MachineSettings {
            units: LengthUnit::Inches,
            clearance_height: 2.0,
            plunge_feedrate: 20.0,
            lead_in_length: 0.4,
            corner_radius: 0.15,
            last_cut_overlap: 0.4,
            ..MachineSettings::default()
        };
        assert!(ParameterValidator::validate_with(&input, &machine).is_valid());
        assert!(ParameterValidator::validate_machine(&machine).is_empty());

        assert_eq!(
            fields(&ParameterValidator::validate(&input)),
            vec![
                "stock.width",
                "stock.length",
                "stock.height",
                "roughing.tool_diameter",
                "roughing.feedrate"
            ]
        );
        assert_eq!(ParameterLimits::for_unit(LengthUnit::Inches).stock_size, 1.969..=39.37);
    }

    #[test]
    fn test_depth_pass_count_is_capped() {
        let mut input = valid_input();
        if let Some(s) = input.stock.as_mut() {
            s.height = Some(200.0);
            s.finished_height = Some(100.0);
        }
        if let Some(r) = input.roughing.as_mut() {
            r.depth_of_cut = Some(0.2);
        }
        assert!(ParameterValidator::validate(&input).is_valid());

        if let Some(r) = input.roughing.as_mut() {
            r.depth_of_cut = Some(0.19);
        }
        let result = ParameterValidator::validate(&input);
        assert_eq!(fields(&result), vec!["roughing.depth_of_cut"]);
        assert_eq!(
            result.violations()[0].error,
            ParameterError::TooManyPasses {
                count: 527,
                limit: MAX_DEPTH_PASSES
            }
        );
    }

    #[test]
    fn test_lane_count_is_capped() {
        let mut input = valid_input();
        if let Some(r) = input.roughing.as_mut() {
            r.strategy = Some("zigzag".to_string());
            r.width_of_cut = Some(0.5);
        }
        assert!(ParameterValidator::validate(&input).is_valid());

        if let Some(r) = input.roughing.as_mut() {
            r.width_of_cut = Some(0.3);
        }
        let result = ParameterValidator::validate(&input);
        assert_eq!(fields(&result), vec!["roughing.width_of_cut"]);
        assert!(matches!(
            result.violations()[0].error,
            ParameterError::TooManyLanes {
                limit: MAX_LANES_PER_LEVEL,
                ..
            }
        ));
    }

    #[test]
    fn test_stock_offset_is_optional() {
        let mut input = valid_input();
        if let Some(s) = input.stock.as_mut() {
            s.offset = Some(5.0);
        }
        let params = ParameterValidator::validate(&input)
            .into_result()
            .expect("offset accepted");
        assert_eq!(params.stock.offset, 5.0);

        if let Some(s) = input.stock.as_mut() {
            s.offset = Some(-1.0);
        }
        assert_eq!(
            fields(&ParameterValidator::validate(&input)),
            vec!["stock.offset"]
        );
    }

    #[test]
    fn test_machine_corner_radius_and_overlap() {
        let machine = MachineSettings {
            corner_radius: 30.0,
            last_cut_overlap: -1.0,
            ..MachineSettings::default()
        };
        let violations = ParameterValidator::validate_machine(&machine);
        let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["machine.corner_radius", "machine.last_cut_overlap"]
        );

        // a broken overlap does not disturb the job rules
        assert!(ParameterValidator::validate_with(&valid_input(), &machine).is_valid());
    }
}
