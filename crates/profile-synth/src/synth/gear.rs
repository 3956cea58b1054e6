use std::f64::consts::TAU;

use serde::Deserialize;

use crate::curve::{polar, PlanarCurve, Point2};
use crate::error::SynthError;

use super::basic::closed_polyline;
use super::check_repeat;

/// Angular-pitch fractions at which each tooth turns: root start, tip
/// start, tip end, root end.
const TOOTH_FRACTIONS: [f64; 4] = [-0.25, -0.15, 0.15, 0.25];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GearParams {
    pub module: f64,
    pub teeth: u32,
    /// Bore diameter. Zero means no bore.
    pub bore: f64,
}

impl Default for GearParams {
    fn default() -> Self {
        Self {
            module: 2.0,
            teeth: 20,
            bore: 0.0,
        }
    }
}

/// Trapezoidal-tooth outline of a spur gear.
#[derive(Debug, Clone, PartialEq)]
pub struct GearOutline {
    pub pitch_diameter: f64,
    pub outer_radius: f64,
    pub root_radius: f64,
    /// Closed boundary, four points per tooth.
    pub points: Vec<Point2>,
}

/// Tooth outline for `teeth` teeth of the given module, centred on the
/// origin.
pub fn gear_outline(module: f64, teeth: u32) -> GearOutline {
    let pitch_diameter = module * teeth as f64;
    let addendum = module;
    let dedendum = 1.25 * module;
    let outer_radius = pitch_diameter / 2.0 + addendum;
    let root_radius = pitch_diameter / 2.0 - dedendum;

    let pitch = TAU / teeth as f64;
    let mut points = Vec::with_capacity(teeth as usize * 4);
    for i in 0..teeth {
        let base = i as f64 * pitch;
        for (k, fraction) in TOOTH_FRACTIONS.iter().enumerate() {
            let radius = if k == 1 || k == 2 {
                outer_radius
            } else {
                root_radius
            };
            points.push(polar([0.0, 0.0], radius, base + pitch * fraction));
        }
    }

    GearOutline {
        pitch_diameter,
        outer_radius,
        root_radius,
        points,
    }
}

pub fn gear_profile(p: &GearParams) -> Result<Vec<PlanarCurve>, SynthError> {
    if p.teeth < 3 {
        return Err(SynthError::degenerate(
            "gear_profile",
            format!("needs at least 3 teeth, got {}", p.teeth),
        ));
    }
    check_repeat("gear_profile", "teeth", p.teeth)?;
    if p.module <= 0.0 {
        return Err(SynthError::degenerate(
            "gear_profile",
            format!("module {} must be positive", p.module),
        ));
    }
    let outline = gear_outline(p.module, p.teeth);
    if outline.root_radius <= 0.0 {
        return Err(SynthError::degenerate(
            "gear_profile",
            "root circle collapses for so few teeth",
        ));
    }

    let mut curves = closed_polyline(&outline.points);
    if p.bore > 0.0 {
        let bore_radius = p.bore / 2.0;
        if bore_radius >= outline.root_radius {
            return Err(SynthError::degenerate(
                "gear_profile",
                format!(
                    "bore {} does not fit inside root diameter {}",
                    p.bore,
                    2.0 * outline.root_radius
                ),
            ));
        }
        curves.push(PlanarCurve::circle([0.0, 0.0], bore_radius));
    }
    Ok(curves)
}
