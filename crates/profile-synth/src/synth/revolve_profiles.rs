//! Closed polylines meant to be extruded or revolved.

use serde::Deserialize;

use crate::curve::PlanarCurve;
use crate::error::SynthError;

use super::basic::closed_polyline;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LShapeParams {
    pub length: f64,
    pub height: f64,
    pub thickness: f64,
}

impl Default for LShapeParams {
    fn default() -> Self {
        Self {
            length: 50.0,
            height: 40.0,
            thickness: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BottleParams {
    pub height: f64,
    pub base_radius: f64,
    pub neck_radius: f64,
}

impl Default for BottleParams {
    fn default() -> Self {
        Self {
            height: 100.0,
            base_radius: 25.0,
            neck_radius: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShaftParams {
    pub length: f64,
    pub d1: f64,
    pub d2: f64,
    pub d3: f64,
}

impl Default for ShaftParams {
    fn default() -> Self {
        Self {
            length: 80.0,
            d1: 25.0,
            d2: 15.0,
            d3: 20.0,
        }
    }
}

/// L-bracket cross-section with its outer corner at the origin.
pub fn l_shape(p: &LShapeParams) -> Result<Vec<PlanarCurve>, SynthError> {
    if p.thickness <= 0.0 || p.thickness >= p.length || p.thickness >= p.height {
        return Err(SynthError::degenerate(
            "l_shape",
            format!(
                "thickness {} must be positive and less than length {} and height {}",
                p.thickness, p.length, p.height
            ),
        ));
    }
    let t = p.thickness;
    Ok(closed_polyline(&[
        [0.0, 0.0],
        [p.length, 0.0],
        [p.length, t],
        [t, t],
        [t, p.height],
        [0.0, p.height],
    ]))
}

/// Bottle half-section in the +X half plane, axis along Y.
pub fn bottle_profile(p: &BottleParams) -> Result<Vec<PlanarCurve>, SynthError> {
    if p.height <= 0.0 || p.base_radius <= 0.0 || p.neck_radius <= 0.0 {
        return Err(SynthError::degenerate(
            "bottle_profile",
            "height and radii must be positive",
        ));
    }
    let h = p.height;
    Ok(closed_polyline(&[
        [0.0, 0.0],
        [p.base_radius, 0.0],
        [p.base_radius, h * 0.6],
        [p.neck_radius, h * 0.8],
        [p.neck_radius, h],
        [0.0, h],
    ]))
}

/// Three-step shaft half-section above the X axis, axis along X.
pub fn shaft_profile(p: &ShaftParams) -> Result<Vec<PlanarCurve>, SynthError> {
    if p.length <= 0.0 || p.d1 <= 0.0 || p.d2 <= 0.0 || p.d3 <= 0.0 {
        return Err(SynthError::degenerate(
            "shaft_profile",
            "length and diameters must be positive",
        ));
    }
    let seg = p.length / 3.0;
    let (r1, r2, r3) = (p.d1 / 2.0, p.d2 / 2.0, p.d3 / 2.0);
    Ok(closed_polyline(&[
        [0.0, 0.0],
        [p.length, 0.0],
        [p.length, r3],
        [seg * 2.0, r3],
        [seg * 2.0, r2],
        [seg, r2],
        [seg, r1],
        [0.0, r1],
    ]))
}
