use std::f64::consts::TAU;

use serde::Deserialize;
use serde_json::Value;

use crate::curve::{rotate_about, PlanarCurve, Point2};
use crate::error::SynthError;

use super::{check_repeat, GeometryFamily, SynthOptions, MAX_PATTERN_CURVES};

/// How a pattern reads the `center` of its base shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseFrame {
    /// Base centre is in sketch coordinates.
    #[default]
    Absolute,
    /// Base centre is an offset from the pattern's own origin.
    Relative,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CircularPatternParams {
    pub count: u32,
    pub center: Point2,
    /// Degrees.
    pub angle: f64,
    pub base_type: String,
    pub base_params: Value,
    pub base_frame: BaseFrame,
}

impl Default for CircularPatternParams {
    fn default() -> Self {
        Self {
            count: 4,
            center: [0.0, 0.0],
            angle: 360.0,
            base_type: "circle".to_string(),
            base_params: Value::Null,
            base_frame: BaseFrame::Absolute,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinearPatternParams {
    pub count: u32,
    pub dx: f64,
    pub dy: f64,
    /// Pattern origin, only read in the relative frame.
    pub start: Point2,
    pub base_type: String,
    pub base_params: Value,
    pub base_frame: BaseFrame,
}

impl Default for LinearPatternParams {
    fn default() -> Self {
        Self {
            count: 3,
            dx: 10.0,
            dy: 0.0,
            start: [0.0, 0.0],
            base_type: "circle".to_string(),
            base_params: Value::Null,
            base_frame: BaseFrame::Absolute,
        }
    }
}

/// Angle between consecutive instances of a circular pattern, radians.
///
/// A full turn divides evenly among `count` instances. A partial sweep puts
/// the first and last instance on its ends. A single instance never moves.
pub fn angular_step(total: f64, count: u32, full_turn_tolerance: f64) -> f64 {
    if count <= 1 {
        return 0.0;
    }
    if (total.abs() - TAU).abs() < full_turn_tolerance {
        total / count as f64
    } else {
        total / (count - 1) as f64
    }
}

pub fn circular_pattern(
    p: &CircularPatternParams,
    opts: &SynthOptions,
) -> Result<Vec<PlanarCurve>, SynthError> {
    if p.count == 0 {
        return Err(SynthError::degenerate("circular_pattern", "count must be at least 1"));
    }
    check_repeat("circular_pattern", "instances", p.count)?;
    let base = Base::resolve("circular_pattern", &p.base_type, &p.base_params, opts)?;
    base.check_total("circular_pattern", p.count)?;
    let anchor = match p.base_frame {
        BaseFrame::Absolute => base.center,
        BaseFrame::Relative => [p.center[0] + base.center[0], p.center[1] + base.center[1]],
    };
    let step = angular_step(p.angle.to_radians(), p.count, opts.full_turn_tolerance);

    let mut curves = Vec::with_capacity(base.curves.len() * p.count as usize);
    for i in 0..p.count {
        let target = rotate_about(anchor, p.center, step * i as f64);
        curves.extend(base.placed_at(target));
    }
    Ok(curves)
}

pub fn linear_pattern(
    p: &LinearPatternParams,
    opts: &SynthOptions,
) -> Result<Vec<PlanarCurve>, SynthError> {
    if p.count == 0 {
        return Err(SynthError::degenerate("linear_pattern", "count must be at least 1"));
    }
    check_repeat("linear_pattern", "instances", p.count)?;
    let base = Base::resolve("linear_pattern", &p.base_type, &p.base_params, opts)?;
    base.check_total("linear_pattern", p.count)?;
    let anchor = match p.base_frame {
        BaseFrame::Absolute => base.center,
        BaseFrame::Relative => [p.start[0] + base.center[0], p.start[1] + base.center[1]],
    };

    let mut curves = Vec::with_capacity(base.curves.len() * p.count as usize);
    for i in 0..p.count {
        let target = [anchor[0] + p.dx * i as f64, anchor[1] + p.dy * i as f64];
        curves.extend(base.placed_at(target));
    }
    Ok(curves)
}

/// The synthesized base shape of a pattern and the centre it was drawn at.
struct Base {
    center: Point2,
    curves: Vec<PlanarCurve>,
}

impl Base {
    fn resolve(
        pattern: &'static str,
        base_type: &str,
        base_params: &Value,
        opts: &SynthOptions,
    ) -> Result<Self, SynthError> {
        let family = GeometryFamily::from_name(base_type).ok_or_else(|| {
            SynthError::degenerate(pattern, format!("unknown base_type '{}'", base_type))
        })?;
        if family.is_pattern() {
            return Err(SynthError::degenerate(pattern, "patterns cannot be nested"));
        }
        let center = match base_params.get("center") {
            Some(value) => serde_json::from_value::<Point2>(value.clone()).map_err(|e| {
                SynthError::InvalidParams {
                    family: pattern,
                    reason: format!("base_params.center: {}", e),
                }
            })?,
            None => [0.0, 0.0],
        };
        let curves = family.synthesize(base_params, opts)?;
        Ok(Base { center, curves })
    }

    /// Reject patterns whose instances would add up to too many curves.
    fn check_total(&self, pattern: &'static str, count: u32) -> Result<(), SynthError> {
        let total = self.curves.len().saturating_mul(count as usize);
        if total > MAX_PATTERN_CURVES {
            return Err(SynthError::degenerate(
                pattern,
                format!("{total} curves exceeds the limit of {MAX_PATTERN_CURVES}"),
            ));
        }
        Ok(())
    }

    /// The base shape translated so its centre lands on `target`.
    fn placed_at(&self, target: Point2) -> impl Iterator<Item = PlanarCurve> + '_ {
        let offset = [target[0] - self.center[0], target[1] - self.center[1]];
        self.curves.iter().map(move |c| c.translated(offset))
    }
}
