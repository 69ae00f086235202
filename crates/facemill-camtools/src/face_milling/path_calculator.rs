//! Toolpath planning for face milling.
//!
//! Coordinates are the cutter centre in part-local space, the stock's lower
//! left corner at the origin; the emitter applies any frame shift. Passes
//! are radius compensated: the cutter's edge steps across the work area (the
//! stock grown by its offset), so the first pass on each side runs with the
//! centre outside the material and takes a cut one stepover wide.
//!
//! The spiral is one continuous clockwise path: right to left along the
//! bottom, up the left side, along the top, down the right side, each lap one
//! stepover further in, corners rounded with arcs. It stops once either axis
//! is cleared, the final pass running on until the cutter is clear of the
//! work area. Zigzag lays passes along X one stepover apart, alternating
//! direction.
//!
//! Every depth pass plunges at least the tool radius plus the lead-in away
//! from the work area.

use super::types::{
    CutStrategy, MachineSettings, OperationKind, Rect, RoughingOperation, StockGeometry,
    ToolOperation,
};
use facemill_core::ToolpathError;

/// Relative tolerance absorbing floating-point noise in pass and lane counts.
const STEP_EPSILON: f64 = 1e-9;

/// Coordinates closer than this are treated as the same point.
const COINCIDENT_TOLERANCE: f64 = 1e-9;

/// Slack allowed when checking positions against the envelope.
const BOUNDS_TOLERANCE: f64 = 1e-6;

/// Widest spiral stepover as a fraction of the cutter diameter. Wider laps
/// leave material in the corners.
pub const SPIRAL_MAX_ENGAGEMENT: f64 = 0.8;

/// Largest corner arc as a fraction of the tool radius.
const MAX_CORNER_FRACTION: f64 = 1.0 / 3.0;

/// Corner arcs smaller than this are cut as sharp corners.
const MIN_ARC_RADIUS: f64 = 0.01;

/// A cutter-centre position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    fn coincides_with(&self, other: &Point3) -> bool {
        (self.x - other.x).abs() <= COINCIDENT_TOLERANCE
            && (self.y - other.y).abs() <= COINCIDENT_TOLERANCE
            && (self.z - other.z).abs() <= COINCIDENT_TOLERANCE
    }
}

/// How the cutter travels to the end of a move
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    /// Straight feed
    Linear,
    /// Circular feed about `centre`
    Arc { centre: (f64, f64), clockwise: bool },
}

impl Motion {
    /// The same motion travelled backwards.
    pub fn reversed(self) -> Self {
        match self {
            Self::Linear => Self::Linear,
            Self::Arc { centre, clockwise } => Self::Arc {
                centre,
                clockwise: !clockwise,
            },
        }
    }
}

/// A feed move in the XY plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarMove {
    pub x: f64,
    pub y: f64,
    pub motion: Motion,
}

impl PlanarMove {
    pub fn linear(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            motion: Motion::Linear,
        }
    }
}

/// A feed move ending at `to`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutMove {
    pub to: Point3,
    pub motion: Motion,
}

/// One pass of the cutter, continuing from where the previous one ended
#[derive(Debug, Clone, PartialEq)]
pub struct ToolpathSegment {
    pub moves: Vec<CutMove>,
    /// Cutting feed (mm/min)
    pub feed_rate: f64,
    pub spindle_speed: f64,
}

impl ToolpathSegment {
    pub fn end(&self) -> Option<Point3> {
        self.moves.last().map(|m| m.to)
    }
}

/// Everything cut at one Z level, starting from a plunge at `entry`
#[derive(Debug, Clone, PartialEq)]
pub struct DepthPass {
    pub z: f64,
    pub entry: (f64, f64),
    pub segments: Vec<ToolpathSegment>,
}

/// Depth passes for one operation, in machining order
#[derive(Debug, Clone, PartialEq)]
pub struct Toolpath {
    pub operation: OperationKind,
    pub tool_number: u32,
    pub tool_radius: f64,
    pub passes: Vec<DepthPass>,
}

impl Toolpath {
    /// Z levels, in machining order.
    pub fn depth_levels(&self) -> Vec<f64> {
        self.passes.iter().map(|pass| pass.z).collect()
    }

    pub fn segments(&self) -> impl Iterator<Item = &ToolpathSegment> {
        self.passes.iter().flat_map(|pass| pass.segments.iter())
    }

    pub fn move_count(&self) -> usize {
        self.segments().map(|s| s.moves.len()).sum()
    }

    /// Check the invariants the emitter depends on: at least one pass, no
    /// empty pass or segment, finite coordinates, plunges clear of the work
    /// area, every move inside the envelope the entries define, no
    /// zero-length moves and arcs that keep their radius.
    pub fn check_invariants(
        &self,
        stock: &StockGeometry,
        machine: &MachineSettings,
    ) -> Result<(), ToolpathError> {
        let operation = self.operation.to_string();
        if self.passes.is_empty() {
            return Err(ToolpathError::EmptyToolpath { operation });
        }

        let area = stock.work_area();
        let clearance = machine.entry_clearance(self.tool_radius);
        let envelope = area.grown(clearance);
        let mut index = 0;

        for (pass_index, pass) in self.passes.iter().enumerate() {
            let (x, y) = pass.entry;
            if !(x.is_finite() && y.is_finite() && pass.z.is_finite()) {
                return Err(ToolpathError::NonFinite {
                    operation,
                    segment: index,
                });
            }
            if area.distance_to(x, y) < clearance - BOUNDS_TOLERANCE {
                return Err(ToolpathError::UnsafeEntry {
                    operation,
                    pass: pass_index,
                    x,
                    y,
                    clearance,
                });
            }
            if pass.segments.is_empty() {
                return Err(ToolpathError::EmptyToolpath { operation });
            }

            let mut position = Point3::new(x, y, pass.z);
            for segment in &pass.segments {
                if segment.moves.is_empty() {
                    return Err(ToolpathError::EmptySegment {
                        operation,
                        segment: index,
                    });
                }

                for (point, cut) in segment.moves.iter().enumerate() {
                    let to = cut.to;
                    if !(to.x.is_finite() && to.y.is_finite() && to.z.is_finite()) {
                        return Err(ToolpathError::NonFinite {
                            operation,
                            segment: index,
                        });
                    }
                    if !envelope.contains(to.x, to.y, BOUNDS_TOLERANCE) {
                        return Err(ToolpathError::OutOfBounds {
                            operation,
                            x: to.x,
                            y: to.y,
                        });
                    }
                    if to.coincides_with(&position) {
                        return Err(ToolpathError::ZeroLengthMove {
                            operation,
                            segment: index,
                            point,
                        });
                    }
                    if let Motion::Arc { centre, .. } = cut.motion {
                        let start = (position.x - centre.0).hypot(position.y - centre.1);
                        let end = (to.x - centre.0).hypot(to.y - centre.1);
                        let round = start > COINCIDENT_TOLERANCE
                            && (start - end).abs() <= BOUNDS_TOLERANCE
                            && (to.z - position.z).abs() <= COINCIDENT_TOLERANCE;
                        if !round {
                            return Err(ToolpathError::InvalidArc {
                                operation,
                                segment: index,
                                point,
                            });
                        }
                    }
                    position = to;
                }
                index += 1;
            }
        }
        Ok(())
    }
}

/// An operation handed to a planner
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MillingOperation<'a> {
    Roughing(&'a RoughingOperation),
    Finishing(&'a ToolOperation),
}

impl MillingOperation<'_> {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Roughing(_) => OperationKind::Roughing,
            Self::Finishing(_) => OperationKind::Finishing,
        }
    }

    pub fn tool(&self) -> &ToolOperation {
        match self {
            Self::Roughing(roughing) => &roughing.tool,
            Self::Finishing(tool) => tool,
        }
    }
}

/// Turns one operation into a toolpath over the stock.
///
/// Implementations must be pure: the same operation, stock and machine
/// always give the same toolpath.
pub trait PathPlanner {
    fn compute_path(
        &self,
        operation: MillingOperation<'_>,
        stock: &StockGeometry,
        machine: &MachineSettings,
    ) -> Toolpath;
}

impl<P: PathPlanner + ?Sized> PathPlanner for &P {
    fn compute_path(
        &self,
        operation: MillingOperation<'_>,
        stock: &StockGeometry,
        machine: &MachineSettings,
    ) -> Toolpath {
        (**self).compute_path(operation, stock, machine)
    }
}

/// Number of Z passes removing `total` at most `depth_of_cut` at a time.
///
/// Computed without allocating, so callers can bound it before planning.
pub fn pass_count(total: f64, depth_of_cut: f64) -> f64 {
    if total <= 0.0 || depth_of_cut <= 0.0 {
        return 1.0;
    }
    ((total / depth_of_cut) - STEP_EPSILON).ceil().max(1.0)
}

/// Z levels stepping from `top` down to `target` by at most `depth_of_cut`.
///
/// The last level is exactly `target`; every step but the last is exactly
/// `depth_of_cut`. Returns `[target]` when there is nothing to remove.
pub fn depth_levels(top: f64, target: f64, depth_of_cut: f64) -> Vec<f64> {
    let count = pass_count(top - target, depth_of_cut) as usize;
    let mut levels: Vec<f64> = (1..count).map(|i| top - i as f64 * depth_of_cut).collect();
    levels.push(target);
    levels
}

/// Stepover no wider than `width_of_cut` spreading an equal number of passes
/// over `extent`, so the last one reaches `overlap` past the far edge.
pub fn balanced_stepover(extent: f64, width_of_cut: f64, overlap: f64) -> f64 {
    let span = extent + overlap;
    let cuts = (span / width_of_cut).floor() + 1.0;
    span / cuts
}

/// Passes one `stepover` apart needed to sweep the cutter edge over `extent`.
fn passes_to_clear(extent: f64, stepover: f64) -> f64 {
    ((extent / stepover) - STEP_EPSILON).ceil().max(1.0)
}

/// XY moves cut at every level of an operation
#[derive(Debug, Clone, PartialEq)]
pub struct LanePattern {
    /// Plunge point, clear of the work area
    pub entry: (f64, f64),
    /// Passes in cutting order, each continuing from where the last ended
    pub lanes: Vec<Vec<PlanarMove>>,
}

impl LanePattern {
    /// The same path cut from its far end back to the entry.
    pub fn reversed(&self) -> Self {
        let mut start = self.entry;
        let mut lanes: Vec<Vec<PlanarMove>> = Vec::with_capacity(self.lanes.len());
        for lane in &self.lanes {
            let mut backwards = Vec::with_capacity(lane.len());
            for step in lane {
                backwards.push(PlanarMove {
                    x: start.0,
                    y: start.1,
                    motion: step.motion.reversed(),
                });
                start = (step.x, step.y);
            }
            backwards.reverse();
            lanes.push(backwards);
        }
        lanes.reverse();

        Self { entry: start, lanes }
    }

    /// The pattern cut at `z` with `tool`'s feed and speed.
    pub fn at_depth(&self, z: f64, tool: &ToolOperation) -> DepthPass {
        let segments = self
            .lanes
            .iter()
            .map(|lane| ToolpathSegment {
                moves: lane
                    .iter()
                    .map(|step| CutMove {
                        to: Point3::new(step.x, step.y, z),
                        motion: step.motion,
                    })
                    .collect(),
                feed_rate: tool.feedrate,
                spindle_speed: tool.rpm,
            })
            .collect();

        DepthPass {
            z,
            entry: self.entry,
            segments,
        }
    }
}

/// Side of a spiral lap, in cutting order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Bottom,
    Left,
    Top,
    Right,
}

impl Side {
    fn of_lane(index: usize) -> Self {
        match index % 4 {
            0 => Self::Bottom,
            1 => Self::Left,
            2 => Self::Top,
            _ => Self::Right,
        }
    }

    /// Unit direction of travel
    fn direction(self) -> (f64, f64) {
        match self {
            Self::Bottom => (-1.0, 0.0),
            Self::Left => (0.0, 1.0),
            Self::Top => (1.0, 0.0),
            Self::Right => (0.0, -1.0),
        }
    }

    fn is_horizontal(self) -> bool {
        matches!(self, Self::Bottom | Self::Top)
    }
}

/// Spiral and zigzag planner.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpiralPathCalculator;

impl SpiralPathCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Distance between neighbouring passes over `area`.
    pub fn stepover(
        strategy: CutStrategy,
        tool_diameter: f64,
        width_of_cut: f64,
        area: &Rect,
        overlap: f64,
    ) -> f64 {
        match strategy {
            CutStrategy::SpiralIn | CutStrategy::SpiralOut => {
                let width = width_of_cut.min(SPIRAL_MAX_ENGAGEMENT * tool_diameter);
                balanced_stepover(area.width().min(area.height()), width, overlap)
            }
            CutStrategy::Zigzag => balanced_stepover(area.height(), width_of_cut, overlap),
        }
    }

    /// Passes cut at each depth level, counted without laying them out.
    pub fn lane_count(
        strategy: CutStrategy,
        tool_diameter: f64,
        width_of_cut: f64,
        area: &Rect,
        overlap: f64,
    ) -> f64 {
        let stepover = Self::stepover(strategy, tool_diameter, width_of_cut, area, overlap);
        let across = passes_to_clear(area.height(), stepover);
        match strategy {
            CutStrategy::SpiralIn | CutStrategy::SpiralOut => {
                (2.0 * across - 1.0).min(2.0 * passes_to_clear(area.width(), stepover))
            }
            CutStrategy::Zigzag => across,
        }
    }

    /// XY pattern cut at every level of an operation with `tool`.
    pub fn pattern(
        tool: &ToolOperation,
        stock: &StockGeometry,
        machine: &MachineSettings,
    ) -> LanePattern {
        let area = stock.work_area();
        let radius = tool.tool_radius();
        let clearance = machine.entry_clearance(radius);
        let stepover = Self::stepover(
            tool.strategy,
            tool.tool_diameter,
            tool.width_of_cut,
            &area,
            machine.last_cut_overlap,
        );
        let count = Self::lane_count(
            tool.strategy,
            tool.tool_diameter,
            tool.width_of_cut,
            &area,
            machine.last_cut_overlap,
        ) as usize;

        match tool.strategy {
            CutStrategy::SpiralIn => {
                Self::spiral(&area, radius, stepover, count, machine.corner_radius, clearance)
            }
            CutStrategy::SpiralOut => {
                Self::spiral(&area, radius, stepover, count, machine.corner_radius, clearance)
                    .reversed()
            }
            CutStrategy::Zigzag => Self::zigzag(&area, radius, stepover, count, clearance),
        }
    }

    fn spiral(
        area: &Rect,
        radius: f64,
        stepover: f64,
        count: usize,
        corner_radius: f64,
        clearance: f64,
    ) -> LanePattern {
        let lines: Vec<(Side, f64)> = (0..count)
            .map(|i| {
                let side = Side::of_lane(i);
                let inset = (i / 4 + 1) as f64 * stepover;
                let line = match side {
                    Side::Bottom => area.y_min - radius + inset,
                    Side::Left => area.x_min - radius + inset,
                    Side::Top => area.y_max + radius - inset,
                    Side::Right => area.x_max + radius - inset,
                };
                (side, line)
            })
            .collect();

        let first_line = lines.first().map_or(area.y_min, |&(_, line)| line);
        let entry = (area.x_max + clearance, first_line);

        // Lane i runs from corners[i] to corners[i + 1]
        let mut corners = Vec::with_capacity(count + 1);
        corners.push(entry);
        for pair in lines.windows(2) {
            let ((side, line), (_, next)) = (pair[0], pair[1]);
            corners.push(if side.is_horizontal() {
                (next, line)
            } else {
                (line, next)
            });
        }
        if let Some(&(side, line)) = lines.last() {
            corners.push(match side {
                Side::Bottom => (area.x_min - clearance, line),
                Side::Left => (line, area.y_max + clearance),
                Side::Top => (area.x_max + clearance, line),
                Side::Right => (line, area.y_min - clearance),
            });
        }

        let lengths: Vec<f64> = corners
            .windows(2)
            .map(|pair| (pair[1].0 - pair[0].0).abs() + (pair[1].1 - pair[0].1).abs())
            .collect();
        let limit = corner_radius.min(radius * MAX_CORNER_FRACTION);
        // Arc radius at the corner ending lane i
        let arcs: Vec<f64> = lengths
            .windows(2)
            .map(|pair| {
                let arc = limit.min(pair[0] / 2.0).min(pair[1] / 2.0);
                if arc < MIN_ARC_RADIUS {
                    0.0
                } else {
                    arc
                }
            })
            .collect();

        let mut lanes = Vec::with_capacity(count);
        let mut position = entry;
        for (i, &(side, _)) in lines.iter().enumerate() {
            let direction = side.direction();
            let mut moves = Vec::with_capacity(2);

            if i > 0 && arcs[i - 1] > 0.0 {
                let arc = arcs[i - 1];
                let corner = corners[i];
                let before = lines[i - 1].0.direction();
                let centre = (
                    corner.0 + arc * (direction.0 - before.0),
                    corner.1 + arc * (direction.1 - before.1),
                );
                position = (corner.0 + arc * direction.0, corner.1 + arc * direction.1);
                moves.push(PlanarMove {
                    x: position.0,
                    y: position.1,
                    motion: Motion::Arc {
                        centre,
                        clockwise: true,
                    },
                });
            }

            let trim = arcs.get(i).copied().unwrap_or(0.0);
            let corner = corners[i + 1];
            let end = (corner.0 - trim * direction.0, corner.1 - trim * direction.1);
            if (end.0 - position.0).abs() + (end.1 - position.1).abs() > COINCIDENT_TOLERANCE {
                moves.push(PlanarMove::linear(end.0, end.1));
                position = end;
            }
            lanes.push(moves);
        }

        LanePattern { entry, lanes }
    }

    fn zigzag(
        area: &Rect,
        radius: f64,
        stepover: f64,
        count: usize,
        clearance: f64,
    ) -> LanePattern {
        let lane_y = |k: usize| area.y_min - radius + (k + 1) as f64 * stepover;
        let entry = (area.x_min - clearance, lane_y(0));

        let mut x = entry.0;
        let mut lanes = Vec::with_capacity(count);
        for k in 0..count {
            let y = lane_y(k);
            let margin = if k + 1 == count { clearance } else { radius };
            let end = if k % 2 == 0 {
                area.x_max + margin
            } else {
                area.x_min - margin
            };

            let mut lane = Vec::with_capacity(2);
            if k > 0 {
                lane.push(PlanarMove::linear(x, y));
            }
            lane.push(PlanarMove::linear(end, y));
            lanes.push(lane);
            x = end;
        }

        LanePattern { entry, lanes }
    }
}

impl PathPlanner for SpiralPathCalculator {
    fn compute_path(
        &self,
        operation: MillingOperation<'_>,
        stock: &StockGeometry,
        machine: &MachineSettings,
    ) -> Toolpath {
        let tool = operation.tool();
        let levels = match operation {
            MillingOperation::Roughing(roughing) => depth_levels(
                stock.height,
                roughing.target_height(stock),
                roughing.depth_of_cut,
            ),
            MillingOperation::Finishing(_) => vec![stock.finished_height],
        };
        let pattern = Self::pattern(tool, stock, machine);
        let passes: Vec<DepthPass> = levels
            .iter()
            .map(|&z| pattern.at_depth(z, tool))
            .collect();

        tracing::debug!(
            "Planned {} {}: {} levels x {} lanes, entry ({:.3}, {:.3})",
            operation.kind(),
            tool.strategy,
            passes.len(),
            pattern.lanes.len(),
            pattern.entry.0,
            pattern.entry.1
        );

        Toolpath {
            operation: operation.kind(),
            tool_number: tool.tool_number,
            tool_radius: tool.tool_radius(),
            passes,
        }
    }
}
