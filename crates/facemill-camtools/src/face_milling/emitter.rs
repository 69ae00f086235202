//! G-code emission for face milling toolpaths.
//!
//! The dialect is fixed (Fanuc-style, G55..G57 work offsets, `#524x` system
//! variables for the table reference). Coordinates are printed with three
//! decimals, feeds and spindle speeds with none. Feed and spindle words are
//! only written when they change from the running modal value. Corner arcs
//! are written as G2/G3 with an R word.

use super::path_calculator::{Motion, Toolpath};
use super::types::{FrameKind, MachineSettings, OperationKind, ProgramParameters, ToolOperation};
use facemill_core::{format_coordinate, format_feed_rate, format_spindle_speed};

/// Lines every tool change is followed by: smoothing on, rotary axes homed
/// and clamped.
const TOOL_SETUP: [&str; 4] = ["G5.1 Q1 R5", "G0 G90 B0 C0", "M32 (Clamp C)", "M34 (Clamp B)"];

/// Accumulates program lines and the modal state they leave behind.
#[derive(Debug, Default)]
struct ProgramWriter {
    text: String,
    position: Option<(String, String)>,
    feed: Option<String>,
    spindle: Option<String>,
}

impl ProgramWriter {
    fn line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }

    /// Rapid in XY; skipped when already there.
    fn rapid(&mut self, x: f64, y: f64) {
        let target = (format_coordinate(x), format_coordinate(y));
        if self.position.as_ref() == Some(&target) {
            return;
        }
        self.line(&format!("G0 X{} Y{}", target.0, target.1));
        self.position = Some(target);
    }

    /// Plunge to `z` at `feed` without moving in XY.
    fn plunge(&mut self, z: f64, feed: f64) {
        let feed = format_feed_rate(feed);
        self.line(&format!("G1 Z{} F{}", format_coordinate(z), feed));
        self.feed = Some(feed);
    }

    /// Cutting move, straight or circular with the given radius; coincident
    /// targets produce no line.
    fn cut(&mut self, word: &str, x: f64, y: f64, radius: Option<f64>, feed: f64, spindle: f64) {
        let target = (format_coordinate(x), format_coordinate(y));
        if self.position.as_ref() == Some(&target) {
            return;
        }

        let mut line = format!("{} X{} Y{}", word, target.0, target.1);
        if let Some(radius) = radius {
            line.push_str(&format!(" R{}", format_coordinate(radius)));
        }
        let feed = format_feed_rate(feed);
        if self.feed.as_ref() != Some(&feed) {
            line.push_str(&format!(" F{}", feed));
            self.feed = Some(feed);
        }
        let spindle = format_spindle_speed(spindle);
        if self.spindle.as_ref() != Some(&spindle) {
            line.push_str(&format!(" S{}", spindle));
            self.spindle = Some(spindle);
        }
        self.line(&line);
        self.position = Some(target);
    }

    fn retract(&mut self, z: &str) {
        self.line(&format!("G0 Z{}", z));
    }
}

/// Serializes toolpaths into program text for one set of parameters.
pub struct ProgramEmitter<'a> {
    params: &'a ProgramParameters,
    machine: &'a MachineSettings,
}

impl<'a> ProgramEmitter<'a> {
    pub fn new(params: &'a ProgramParameters, machine: &'a MachineSettings) -> Self {
        Self { params, machine }
    }

    /// Emit the complete program for `toolpaths`, in the order given.
    pub fn emit(&self, toolpaths: &[Toolpath]) -> String {
        let mut program = ProgramWriter::default();

        self.write_header(&mut program);
        for toolpath in toolpaths {
            self.write_operation(&mut program, toolpath);
        }
        Self::write_footer(&mut program);

        program.text
    }

    fn write_header(&self, program: &mut ProgramWriter) {
        let stock = &self.params.stock;
        let unit = self.machine.units.label();

        program.line("(Face milling program)");
        program.line(&format!(
            "(Stock: X{} Y{} Z{} {})",
            format_coordinate(stock.width),
            format_coordinate(stock.length),
            format_coordinate(stock.height),
            unit
        ));
        if stock.offset > 0.0 {
            program.line(&format!(
                "(Stock offset: {} {})",
                format_coordinate(stock.offset),
                unit
            ));
        }
        program.line(&format!(
            "(Finished Z: {} {})",
            format_coordinate(stock.finished_height),
            unit
        ));
        program.line(self.machine.units.gcode());

        let frame = &self.params.frame;
        if frame.kind == FrameKind::Table {
            program.line("(Set G55 from table reference)");
            program.line(&format!(
                "#5241 = {}",
                format_coordinate(self.machine.table_reference_x + frame.x_offset)
            ));
            program.line(&format!(
                "#5242 = {}",
                format_coordinate(self.machine.table_reference_y + frame.y_offset)
            ));
            program.line(&format!(
                "#5243 = {}",
                format_coordinate(self.machine.table_reference_z)
            ));
            program.line("G28 G91 Z0");
        }
    }

    fn write_operation(&self, program: &mut ProgramWriter, toolpath: &Toolpath) {
        let kind = toolpath.operation;
        let retract = format_coordinate(self.machine.retract_height(&self.params.stock));
        let spindle = toolpath
            .segments()
            .next()
            .map(|s| s.spindle_speed)
            .or_else(|| self.tool(kind).map(|t| t.rpm))
            .unwrap_or_default();

        program.line(&format!("N{} ({})", kind.block_number(), kind));
        if kind == OperationKind::Finishing {
            program.line("M1");
        }
        program.line(&format!("M06 T{}", toolpath.tool_number));
        program.line(self.params.frame.kind.work_offset());
        for line in TOOL_SETUP {
            program.line(line);
        }

        let speed = format_spindle_speed(spindle);
        program.line(&format!("M3 S{}", speed));
        program.spindle = Some(speed);

        if let Some(pass) = toolpath.passes.first() {
            let (x, y) = self.shift(pass.entry.0, pass.entry.1);
            program.rapid(x, y);
        }
        program.line(&format!("G43 H{} Z{}", toolpath.tool_number, retract));

        let coolant = self.params.coolant;
        if let Some(codes) = coolant.active_codes() {
            program.line(&format!("M{} (Turn on {})", codes.on_code, coolant.mode));
        }

        for pass in &toolpath.passes {
            let (x, y) = self.shift(pass.entry.0, pass.entry.1);
            program.line(&format!("(Depth: {})", format_coordinate(pass.z)));
            program.rapid(x, y);
            program.plunge(pass.z, self.machine.plunge_feedrate);

            let mut from = pass.entry;
            for segment in &pass.segments {
                for cut in &segment.moves {
                    let (x, y) = self.shift(cut.to.x, cut.to.y);
                    let (word, radius) = match cut.motion {
                        Motion::Linear => ("G1", None),
                        Motion::Arc { centre, clockwise } => (
                            if clockwise { "G2" } else { "G3" },
                            Some((from.0 - centre.0).hypot(from.1 - centre.1)),
                        ),
                    };
                    program.cut(word, x, y, radius, segment.feed_rate, segment.spindle_speed);
                    from = (cut.to.x, cut.to.y);
                }
            }
            program.retract(&retract);
        }

        if let Some(codes) = coolant.active_codes() {
            program.line(&format!("M{} (Turn off {})", codes.off_code, coolant.mode));
        }
        program.line("M5");
        program.spindle = None;
        if kind == OperationKind::Roughing {
            program.line("G28 G91 Z0");
            program.position = None;
        }
    }

    fn write_footer(program: &mut ProgramWriter) {
        program.line("G49");
        program.line("G28 G91 Z0");
        program.line("G28 G91 X0 Y0");
        program.line("M30");
        program.line("%");
    }

    fn tool(&self, kind: OperationKind) -> Option<&ToolOperation> {
        match kind {
            OperationKind::Roughing => Some(&self.params.roughing.tool),
            OperationKind::Finishing => self.params.finishing.as_ref(),
        }
    }

    /// Frame-shifted XY.
    fn shift(&self, x: f64, y: f64) -> (f64, f64) {
        let (dx, dy) = self.params.frame.coordinate_shift();
        (x + dx, y + dy)
    }
}
