//! Millimetre ↔ internal-unit conversion.
//!
//! Tasks and results speak millimetres. The CAD authority works in its own
//! internal length unit (centimetres), so every length crosses this module
//! exactly once on the way in and once on the way out.

use crate::curve::{PlanarCurve, Point2};

/// Millimetres per internal length unit.
pub const MM_PER_INTERNAL: f64 = 10.0;

pub fn mm_to_internal(mm: f64) -> f64 {
    mm / MM_PER_INTERNAL
}

pub fn internal_to_mm(internal: f64) -> f64 {
    internal * MM_PER_INTERNAL
}

pub fn point_to_internal(p: Point2) -> Point2 {
    [mm_to_internal(p[0]), mm_to_internal(p[1])]
}

pub fn point3_to_internal(p: [f64; 3]) -> [f64; 3] {
    [
        mm_to_internal(p[0]),
        mm_to_internal(p[1]),
        mm_to_internal(p[2]),
    ]
}

/// Internal area (cm²) to mm².
pub fn area_to_mm2(internal: f64) -> f64 {
    internal * MM_PER_INTERNAL * MM_PER_INTERNAL
}

/// Internal volume (cm³) to mm³.
pub fn volume_to_mm3(internal: f64) -> f64 {
    internal * MM_PER_INTERNAL.powi(3)
}

/// A curve whose coordinates are in internal units.
///
/// Only this module produces one, so a millimetre curve cannot reach the
/// authority by accident.
#[derive(Debug, Clone, PartialEq)]
pub struct InternalCurve(PlanarCurve);

impl InternalCurve {
    pub fn from_mm(curve: &PlanarCurve) -> Self {
        InternalCurve(curve.scaled(1.0 / MM_PER_INTERNAL))
    }

    pub fn to_mm(&self) -> PlanarCurve {
        self.0.scaled(MM_PER_INTERNAL)
    }

    pub fn curve(&self) -> &PlanarCurve {
        &self.0
    }

    pub fn into_curve(self) -> PlanarCurve {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn lengths_round_trip() {
        assert_relative_eq!(mm_to_internal(25.0), 2.5);
        assert_relative_eq!(internal_to_mm(mm_to_internal(37.5)), 37.5);
    }

    #[test]
    fn derived_units_scale_by_power() {
        assert_relative_eq!(area_to_mm2(1.0), 100.0);
        assert_relative_eq!(volume_to_mm3(2.0), 2000.0);
    }

    #[test]
    fn internal_curve_keeps_angles() {
        let arc = PlanarCurve::Arc {
            center: [10.0, 0.0],
            radius: 5.0,
            start_angle: 0.5,
            sweep: 1.0,
        };
        let internal = InternalCurve::from_mm(&arc);
        match internal.curve() {
            PlanarCurve::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => {
                assert_relative_eq!(center[0], 1.0);
                assert_relative_eq!(*radius, 0.5);
                assert_relative_eq!(*start_angle, 0.5);
                assert_relative_eq!(*sweep, 1.0);
            }
            other => panic!("expected arc, got {:?}", other),
        }
        assert_eq!(internal.to_mm(), arc);
    }
}
