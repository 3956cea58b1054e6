use std::f64::consts::{PI, TAU};

use serde::Deserialize;

use crate::curve::{distance, polar, PlanarCurve, Point2};
use crate::error::SynthError;

use super::check_repeat;

// ── Parameters ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RectangleParams {
    pub width: f64,
    pub height: f64,
    pub center: Point2,
}

impl Default for RectangleParams {
    fn default() -> Self {
        Self {
            width: 10.0,
            height: 10.0,
            center: [0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CircleParams {
    pub radius: f64,
    pub center: Point2,
}

impl Default for CircleParams {
    fn default() -> Self {
        Self {
            radius: 5.0,
            center: [0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LineParams {
    pub points: Vec<Point2>,
    pub close: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ArcKind {
    #[serde(rename = "center_radius")]
    CenterRadius,
    #[serde(rename = "3_point")]
    ThreePoint,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArcParams {
    #[serde(rename = "type")]
    pub kind: ArcKind,
    pub center: Point2,
    pub radius: f64,
    /// Degrees.
    pub start_angle: f64,
    /// Degrees.
    pub end_angle: f64,
    pub start: Point2,
    pub end: Point2,
    pub point_on_arc: Point2,
}

impl Default for ArcParams {
    fn default() -> Self {
        Self {
            kind: ArcKind::CenterRadius,
            center: [0.0, 0.0],
            radius: 10.0,
            start_angle: 0.0,
            end_angle: 90.0,
            start: [0.0, 0.0],
            end: [10.0, 0.0],
            point_on_arc: [5.0, 5.0],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolygonParams {
    pub sides: u32,
    /// Circumradius.
    pub radius: f64,
    pub center: Point2,
}

impl Default for PolygonParams {
    fn default() -> Self {
        Self {
            sides: 6,
            radius: 10.0,
            center: [0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HexagonParams {
    /// Across-flats width.
    pub width: f64,
    pub center: Point2,
}

impl Default for HexagonParams {
    fn default() -> Self {
        Self {
            width: 15.0,
            center: [0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SlotParams {
    pub start: Point2,
    pub end: Point2,
    pub diameter: f64,
}

impl Default for SlotParams {
    fn default() -> Self {
        Self {
            start: [-10.0, 0.0],
            end: [10.0, 0.0],
            diameter: 5.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SplineParams {
    pub points: Vec<Point2>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PointParams {
    pub center: Point2,
}

// ── Families ────────────────────────────────────────────────────────────────

/// Four lines, counter-clockwise from the lower-left corner.
pub fn rectangle(p: &RectangleParams) -> Result<Vec<PlanarCurve>, SynthError> {
    if p.width <= 0.0 || p.height <= 0.0 {
        return Err(SynthError::degenerate(
            "rectangle",
            format!("width {} and height {} must be positive", p.width, p.height),
        ));
    }
    let (hw, hh) = (p.width / 2.0, p.height / 2.0);
    let [cx, cy] = p.center;
    let corners = [
        [cx - hw, cy - hh],
        [cx + hw, cy - hh],
        [cx + hw, cy + hh],
        [cx - hw, cy + hh],
    ];
    Ok(closed_polyline(&corners))
}

pub fn circle(p: &CircleParams) -> Result<Vec<PlanarCurve>, SynthError> {
    if p.radius <= 0.0 {
        return Err(SynthError::degenerate(
            "circle",
            format!("radius {} must be positive", p.radius),
        ));
    }
    Ok(vec![PlanarCurve::circle(p.center, p.radius)])
}

pub fn polyline(p: &LineParams) -> Result<Vec<PlanarCurve>, SynthError> {
    if p.points.len() < 2 {
        return Err(SynthError::degenerate(
            "line",
            format!("needs at least 2 points, got {}", p.points.len()),
        ));
    }
    let mut curves: Vec<PlanarCurve> = p
        .points
        .windows(2)
        .map(|w| PlanarCurve::line(w[0], w[1]))
        .collect();
    if p.close {
        curves.push(PlanarCurve::line(p.points[p.points.len() - 1], p.points[0]));
    }
    Ok(curves)
}

pub fn arc(p: &ArcParams) -> Result<Vec<PlanarCurve>, SynthError> {
    match p.kind {
        ArcKind::CenterRadius => {
            if p.radius <= 0.0 {
                return Err(SynthError::degenerate(
                    "arc",
                    format!("radius {} must be positive", p.radius),
                ));
            }
            let start_angle = p.start_angle.to_radians();
            let sweep = (p.end_angle - p.start_angle).to_radians();
            Ok(vec![PlanarCurve::Arc {
                center: p.center,
                radius: p.radius,
                start_angle,
                sweep,
            }])
        }
        ArcKind::ThreePoint => three_point_arc(p.start, p.point_on_arc, p.end).map(|a| vec![a]),
    }
}

/// Arc from `start` through `via` to `end`.
fn three_point_arc(start: Point2, via: Point2, end: Point2) -> Result<PlanarCurve, SynthError> {
    let (ax, ay) = (start[0], start[1]);
    let (bx, by) = (via[0], via[1]);
    let (cx, cy) = (end[0], end[1]);
    let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
    if d.abs() < 1e-12 {
        return Err(SynthError::degenerate("arc", "three points are collinear"));
    }
    let a2 = ax * ax + ay * ay;
    let b2 = bx * bx + by * by;
    let c2 = cx * cx + cy * cy;
    let center = [
        (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d,
        (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d,
    ];
    let radius = distance(center, start);

    let angle_of = |p: Point2| (p[1] - center[1]).atan2(p[0] - center[0]);
    let a_start = angle_of(start);
    let ccw = |a: f64| (a - a_start).rem_euclid(TAU);
    let to_via = ccw(angle_of(via));
    let to_end = ccw(angle_of(end));

    // Counter-clockwise sweep if it passes the via point first, otherwise
    // the arc runs clockwise and is stored from `end`.
    if to_via < to_end {
        Ok(PlanarCurve::Arc {
            center,
            radius,
            start_angle: a_start,
            sweep: to_end,
        })
    } else {
        Ok(PlanarCurve::Arc {
            center,
            radius,
            start_angle: angle_of(end),
            sweep: TAU - to_end,
        })
    }
}

/// Regular N-gon by circumradius, first vertex on the +X side.
pub fn polygon(p: &PolygonParams) -> Result<Vec<PlanarCurve>, SynthError> {
    if p.sides < 3 {
        return Err(SynthError::degenerate(
            "polygon",
            format!("needs at least 3 sides, got {}", p.sides),
        ));
    }
    check_repeat("polygon", "sides", p.sides)?;
    if p.radius <= 0.0 {
        return Err(SynthError::degenerate(
            "polygon",
            format!("radius {} must be positive", p.radius),
        ));
    }
    Ok(closed_polyline(&regular_vertices(p.center, p.radius, p.sides)))
}

/// Regular hexagon with horizontal flats `width` apart.
pub fn hexagon(p: &HexagonParams) -> Result<Vec<PlanarCurve>, SynthError> {
    if p.width <= 0.0 {
        return Err(SynthError::degenerate(
            "hexagon",
            format!("width {} must be positive", p.width),
        ));
    }
    let circumradius = p.width / 3f64.sqrt();
    Ok(closed_polyline(&regular_vertices(p.center, circumradius, 6)))
}

/// Stadium: two straight sides plus two outward semicircular caps.
pub fn slot(p: &SlotParams) -> Result<Vec<PlanarCurve>, SynthError> {
    let length = distance(p.start, p.end);
    if length < 0.01 {
        return Err(SynthError::degenerate("slot", "start and end coincide"));
    }
    if p.diameter <= 0.0 {
        return Err(SynthError::degenerate(
            "slot",
            format!("diameter {} must be positive", p.diameter),
        ));
    }
    let radius = p.diameter / 2.0;
    let dir = [(p.end[0] - p.start[0]) / length, (p.end[1] - p.start[1]) / length];
    let offset = [-dir[1] * radius, dir[0] * radius];
    let heading = dir[1].atan2(dir[0]);

    let left_start = [p.start[0] + offset[0], p.start[1] + offset[1]];
    let left_end = [p.end[0] + offset[0], p.end[1] + offset[1]];
    let right_end = [p.end[0] - offset[0], p.end[1] - offset[1]];
    let right_start = [p.start[0] - offset[0], p.start[1] - offset[1]];

    Ok(vec![
        PlanarCurve::line(left_start, left_end),
        PlanarCurve::line(right_end, right_start),
        // Cap at `end` bulges along the heading.
        PlanarCurve::Arc {
            center: p.end,
            radius,
            start_angle: heading - PI / 2.0,
            sweep: PI,
        },
        // Cap at `start` bulges against it.
        PlanarCurve::Arc {
            center: p.start,
            radius,
            start_angle: heading + PI / 2.0,
            sweep: PI,
        },
    ])
}

pub fn spline(p: &SplineParams) -> Result<Vec<PlanarCurve>, SynthError> {
    if p.points.len() < 2 {
        return Err(SynthError::degenerate(
            "spline",
            format!("needs at least 2 points, got {}", p.points.len()),
        ));
    }
    Ok(vec![PlanarCurve::Spline {
        fit_points: p.points.clone(),
        closed: false,
    }])
}

pub fn point(p: &PointParams) -> Result<Vec<PlanarCurve>, SynthError> {
    Ok(vec![PlanarCurve::Point { at: p.center }])
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn regular_vertices(center: Point2, radius: f64, sides: u32) -> Vec<Point2> {
    (0..sides)
        .map(|i| polar(center, radius, TAU * i as f64 / sides as f64))
        .collect()
}

/// Lines joining consecutive points, closing back to the first.
pub(crate) fn closed_polyline(points: &[Point2]) -> Vec<PlanarCurve> {
    let n = points.len();
    (0..n)
        .map(|i| PlanarCurve::line(points[i], points[(i + 1) % n]))
        .collect()
}
