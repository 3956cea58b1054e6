use serde::{Deserialize, Serialize};

/// A 2D point in sketch coordinates.
pub type Point2 = [f64; 2];

/// A planar sketch element produced by a synthesizer.
///
/// Angles are radians, measured counter-clockwise from the sketch +X axis.
/// Arcs always sweep counter-clockwise from `start_angle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanarCurve {
    Line {
        start: Point2,
        end: Point2,
    },
    Circle {
        center: Point2,
        radius: f64,
    },
    Arc {
        center: Point2,
        radius: f64,
        start_angle: f64,
        sweep: f64,
    },
    /// Interpolating spline through `fit_points`.
    Spline {
        fit_points: Vec<Point2>,
        closed: bool,
    },
    Point {
        at: Point2,
    },
}

impl PlanarCurve {
    pub fn line(start: Point2, end: Point2) -> Self {
        PlanarCurve::Line { start, end }
    }

    pub fn circle(center: Point2, radius: f64) -> Self {
        PlanarCurve::Circle { center, radius }
    }

    /// Whether this element bounds area on its own or as part of a loop.
    /// Points do not.
    pub fn is_curve(&self) -> bool {
        !matches!(self, PlanarCurve::Point { .. })
    }

    /// Endpoints of an open element. `None` for circles, closed splines
    /// and points.
    pub fn endpoints(&self) -> Option<(Point2, Point2)> {
        match self {
            PlanarCurve::Line { start, end } => Some((*start, *end)),
            PlanarCurve::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => {
                let end_angle = start_angle + sweep;
                Some((
                    polar(*center, *radius, *start_angle),
                    polar(*center, *radius, end_angle),
                ))
            }
            PlanarCurve::Spline { fit_points, closed } if !closed && fit_points.len() >= 2 => {
                Some((fit_points[0], fit_points[fit_points.len() - 1]))
            }
            _ => None,
        }
    }

    /// Length of the element. Splines use their fit-point polyline.
    pub fn length(&self) -> f64 {
        match self {
            PlanarCurve::Line { start, end } => distance(*start, *end),
            PlanarCurve::Circle { radius, .. } => std::f64::consts::TAU * radius,
            PlanarCurve::Arc { radius, sweep, .. } => radius * sweep.abs(),
            PlanarCurve::Spline { fit_points, closed } => {
                let mut total: f64 = fit_points.windows(2).map(|w| distance(w[0], w[1])).sum();
                if *closed && fit_points.len() > 2 {
                    total += distance(fit_points[fit_points.len() - 1], fit_points[0]);
                }
                total
            }
            PlanarCurve::Point { .. } => 0.0,
        }
    }

    /// Every coordinate in this element multiplied by `factor`. Angles are
    /// unchanged.
    pub fn scaled(&self, factor: f64) -> Self {
        let s = |p: Point2| [p[0] * factor, p[1] * factor];
        match self {
            PlanarCurve::Line { start, end } => PlanarCurve::Line {
                start: s(*start),
                end: s(*end),
            },
            PlanarCurve::Circle { center, radius } => PlanarCurve::Circle {
                center: s(*center),
                radius: radius * factor,
            },
            PlanarCurve::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => PlanarCurve::Arc {
                center: s(*center),
                radius: radius * factor,
                start_angle: *start_angle,
                sweep: *sweep,
            },
            PlanarCurve::Spline { fit_points, closed } => PlanarCurve::Spline {
                fit_points: fit_points.iter().copied().map(s).collect(),
                closed: *closed,
            },
            PlanarCurve::Point { at } => PlanarCurve::Point { at: s(*at) },
        }
    }

    pub fn translated(&self, offset: Point2) -> Self {
        let t = |p: Point2| [p[0] + offset[0], p[1] + offset[1]];
        match self {
            PlanarCurve::Line { start, end } => PlanarCurve::Line {
                start: t(*start),
                end: t(*end),
            },
            PlanarCurve::Circle { center, radius } => PlanarCurve::Circle {
                center: t(*center),
                radius: *radius,
            },
            PlanarCurve::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => PlanarCurve::Arc {
                center: t(*center),
                radius: *radius,
                start_angle: *start_angle,
                sweep: *sweep,
            },
            PlanarCurve::Spline { fit_points, closed } => PlanarCurve::Spline {
                fit_points: fit_points.iter().copied().map(t).collect(),
                closed: *closed,
            },
            PlanarCurve::Point { at } => PlanarCurve::Point { at: t(*at) },
        }
    }

    /// Axis-aligned bounds `(min, max)` of the element. Arcs use their full
    /// circle, splines their fit points.
    pub fn bounds(&self) -> (Point2, Point2) {
        match self {
            PlanarCurve::Line { start, end } => (
                [start[0].min(end[0]), start[1].min(end[1])],
                [start[0].max(end[0]), start[1].max(end[1])],
            ),
            PlanarCurve::Circle { center, radius } | PlanarCurve::Arc { center, radius, .. } => (
                [center[0] - radius, center[1] - radius],
                [center[0] + radius, center[1] + radius],
            ),
            PlanarCurve::Spline { fit_points, .. } => {
                let mut min = [f64::INFINITY; 2];
                let mut max = [f64::NEG_INFINITY; 2];
                for p in fit_points {
                    for i in 0..2 {
                        min[i] = min[i].min(p[i]);
                        max[i] = max[i].max(p[i]);
                    }
                }
                (min, max)
            }
            PlanarCurve::Point { at } => (*at, *at),
        }
    }
}

/// Point at `angle` on the circle around `center`.
pub fn polar(center: Point2, radius: f64, angle: f64) -> Point2 {
    [
        center[0] + radius * angle.cos(),
        center[1] + radius * angle.sin(),
    ]
}

pub fn distance(a: Point2, b: Point2) -> f64 {
    ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt()
}

/// Rotate `p` counter-clockwise about `pivot`.
pub fn rotate_about(p: Point2, pivot: Point2, angle: f64) -> Point2 {
    let (sin, cos) = angle.sin_cos();
    let rel = [p[0] - pivot[0], p[1] - pivot[1]];
    [
        pivot[0] + rel[0] * cos - rel[1] * sin,
        pivot[1] + rel[0] * sin + rel[1] * cos,
    ]
}
