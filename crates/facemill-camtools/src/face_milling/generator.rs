//! Face milling program generation.
//!
//! Runs validation, planning and emission in that order, once per request.
//! Invalid input stops the pipeline before any geometry is computed.

use super::emitter::ProgramEmitter;
use super::path_calculator::{MillingOperation, PathPlanner, SpiralPathCalculator, Toolpath};
use super::types::{FaceMillingInput, MachineSettings, ProgramParameters};
use super::validator::{ParameterValidator, ValidationResult};
use crate::error::{GenerateError, GenerateResult, ValidationReport};
use std::fmt;
use tracing::{debug, warn};

/// Where a generate request is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Start,
    Validating,
    Rejected,
    Computing,
    Emitting,
    Done,
}

impl GenerationStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Done)
    }
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Validating => write!(f, "validating"),
            Self::Rejected => write!(f, "rejected"),
            Self::Computing => write!(f, "computing"),
            Self::Emitting => write!(f, "emitting"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// A finished program and what it was built from
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedProgram {
    /// Program text, one instruction per line
    pub text: String,
    /// Roughing, then finishing when present
    pub toolpaths: Vec<Toolpath>,
    pub parameters: ProgramParameters,
}

impl GeneratedProgram {
    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }
}

/// Face milling program generator
pub struct FaceMillingGenerator<P: PathPlanner = SpiralPathCalculator> {
    planner: P,
}

impl FaceMillingGenerator<SpiralPathCalculator> {
    pub fn new() -> Self {
        Self {
            planner: SpiralPathCalculator,
        }
    }
}

impl Default for FaceMillingGenerator<SpiralPathCalculator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PathPlanner> FaceMillingGenerator<P> {
    /// Generator using a custom planner.
    pub fn with_planner(planner: P) -> Self {
        Self { planner }
    }

    pub fn planner(&self) -> &P {
        &self.planner
    }

    /// Validate `input`, plan every operation and emit the program.
    pub fn generate(
        &self,
        input: &FaceMillingInput,
        machine: &MachineSettings,
    ) -> GenerateResult<GeneratedProgram> {
        let mut stage = GenerationStage::Start;
        Self::advance(&mut stage, GenerationStage::Validating);

        let (parameters, mut report) = match ParameterValidator::validate_with(input, machine) {
            ValidationResult::Valid(parameters) => (Some(parameters), ValidationReport::new()),
            ValidationResult::Invalid(report) => (None, report),
        };
        report.extend(ParameterValidator::validate_machine(machine));

        let parameters = match parameters {
            Some(parameters) if report.is_empty() => parameters,
            _ => {
                Self::advance(&mut stage, GenerationStage::Rejected);
                warn!("Face milling input rejected with {} violation(s)", report.len());
                return Err(GenerateError::Rejected(report));
            }
        };

        Self::advance(&mut stage, GenerationStage::Computing);
        let toolpaths = self.plan(&parameters, machine)?;

        Self::advance(&mut stage, GenerationStage::Emitting);
        let text = ProgramEmitter::new(&parameters, machine).emit(&toolpaths);

        Self::advance(&mut stage, GenerationStage::Done);
        debug!(
            "Generated face milling program: {} lines, {} operation(s)",
            text.lines().count(),
            toolpaths.len()
        );

        Ok(GeneratedProgram {
            text,
            toolpaths,
            parameters,
        })
    }

    /// Roughing, then finishing when present, each checked before emission.
    fn plan(
        &self,
        parameters: &ProgramParameters,
        machine: &MachineSettings,
    ) -> GenerateResult<Vec<Toolpath>> {
        let mut operations = vec![MillingOperation::Roughing(&parameters.roughing)];
        if let Some(finishing) = &parameters.finishing {
            operations.push(MillingOperation::Finishing(finishing));
        }

        operations
            .into_iter()
            .map(|operation| {
                let toolpath = self.planner.compute_path(operation, &parameters.stock, machine);
                toolpath.check_invariants(&parameters.stock, machine)?;
                Ok(toolpath)
            })
            .collect()
    }

    fn advance(stage: &mut GenerationStage, next: GenerationStage) {
        debug!("Face milling generation: {} -> {}", stage, next);
        *stage = next;
    }
}

/// Generate a program with the default planner.
pub fn generate_program(
    input: &FaceMillingInput,
    machine: &MachineSettings,
) -> GenerateResult<GeneratedProgram> {
    FaceMillingGenerator::new().generate(input, machine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face_milling::path_calculator::{CutMove, DepthPass, Motion, Point3, ToolpathSegment};
    use crate::face_milling::types::{
        CoolantInput, OperationKind, PositionInput, RoughingInput, StockGeometry, StockInput,
    };
    use facemill_core::ToolpathError;

    fn input() -> FaceMillingInput {
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

    /// Planner plunging at `entry` and cutting straight to `to`.
    struct StrayPlanner {
        entry: (f64, f64),
        to: (f64, f64),
    }

    impl PathPlanner for StrayPlanner {
        fn compute_path(
            &self,
            operation: MillingOperation<'_>,
            _stock: &StockGeometry,
            _machine: &MachineSettings,
        ) -> Toolpath {
            Toolpath {
                operation: operation.kind(),
                tool_number: operation.tool().tool_number,
                tool_radius: operation.tool().tool_radius(),
                passes: vec![DepthPass {
                    z: 45.0,
                    entry: self.entry,
                    segments: vec![ToolpathSegment {
                        moves: vec![CutMove {
                            to: Point3::new(self.to.0, self.to.1, 45.0),
                            motion: Motion::Linear,
                        }],
                        feed_rate: 1.0,
                        spindle_speed: 1.0,
                    }],
                }],
            }
        }
    }

    #[test]
    fn test_generate_roughing_only() {
        let program = generate_program(&input(), &MachineSettings::default())
            .expect("valid input generates");
        assert_eq!(program.toolpaths.len(), 1);
        assert_eq!(program.toolpaths[0].operation, OperationKind::Roughing);
        assert!(program.line_count() > 10);
        assert!(program.text.starts_with("(Face milling program)\n"));
    }

    #[test]
    fn test_machine_violations_reject() {
        let machine = MachineSettings {
            plunge_feedrate: 0.0,
            ..MachineSettings::default()
        };
        let err = generate_program(&input(), &machine).unwrap_err();
        let violations = err.violations().map(|v| v.to_vec()).unwrap_or_default();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "machine.plunge_feedrate");
    }

    #[test]
    fn test_invariant_failure_is_internal_inconsistency() {
        // radius 25 plus lead-in 10 puts the envelope at x = -35
        let generator = FaceMillingGenerator::with_planner(StrayPlanner {
            entry: (-35.0, 0.0),
            to: (-40.0, 0.0),
        });
        let err = generator
            .generate(&input(), &MachineSettings::default())
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::InternalInconsistency(ToolpathError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_plunge_inside_clearance_is_internal_inconsistency() {
        let generator = FaceMillingGenerator::with_planner(StrayPlanner {
            entry: (-10.0, 0.0),
            to: (150.0, 0.0),
        });
        let err = generator
            .generate(&input(), &MachineSettings::default())
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::InternalInconsistency(ToolpathError::UnsafeEntry { pass: 0, .. })
        ));
    }

    #[test]
    fn test_inch_machine_accepts_inch_job() {
        let mut input = input();
        input.stock = Some(StockInput {
            width: Some(12.0),
            length: Some(8.0),
            height: Some(2.0),
            finished_height: Some(1.9),
            offset: None,
        });
        if let Some(r) = input.roughing.as_mut() {
            r.tool_diameter = Some(2.0);
            r.width_of_cut = Some(1.5);
            r.depth_of_cut = Some(0.05);
            r.feedrate = Some(60.0);
        }
        let machine = MachineSettings {
            units: facemill_core::LengthUnit::Inches,
            clearance_height: 2.0,
            plunge_feedrate: 20.0,
            lead_in_length: 0.4,
            corner_radius: 0.15,
            last_cut_overlap: 0.4,
            ..MachineSettings::default()
        };
        let program = generate_program(&input, &machine).expect("inch job generates");
        assert!(program.text.contains("\nG20\n"));
        assert_eq!(program.toolpaths[0].depth_levels().len(), 2);
        assert!(generate_program(&input, &MachineSettings::default()).is_err());
    }

    #[test]
    fn test_stage_terminal_states() {
        assert!(GenerationStage::Rejected.is_terminal());
        assert!(GenerationStage::Done.is_terminal());
        assert!(!GenerationStage::Computing.is_terminal());
    }
}
