//! Geometry synthesizers.
//!
//! Each family turns a JSON parameter object into an ordered list of
//! planar curves in millimetres. Synthesis is pure: the same parameters
//! always yield the same curves.

mod basic;
mod gear;
mod pattern;
mod revolve_profiles;

pub use gear::{gear_outline, GearOutline};
pub use pattern::angular_step;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::curve::PlanarCurve;
use crate::error::SynthError;

/// Tolerance, in radians, within which a pattern angle counts as a full turn.
pub const FULL_TURN_TOLERANCE: f64 = 0.001;

/// Most repetitions one family may draw: gear teeth, polygon sides or
/// pattern instances.
pub const MAX_REPEAT: u32 = 360;

/// Most curves a single sketch pattern may produce.
pub const MAX_PATTERN_CURVES: usize = 4096;

/// Reject a repetition count above [`MAX_REPEAT`] before anything is
/// allocated for it.
pub(crate) fn check_repeat(family: &'static str, what: &str, n: u32) -> Result<(), SynthError> {
    if n > MAX_REPEAT {
        return Err(SynthError::degenerate(
            family,
            format!("{n} {what} exceeds the limit of {MAX_REPEAT}"),
        ));
    }
    Ok(())
}

/// Knobs that affect synthesis but are not part of a task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthOptions {
    pub full_turn_tolerance: f64,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            full_turn_tolerance: FULL_TURN_TOLERANCE,
        }
    }
}

/// The closed set of shape families a sketch can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryFamily {
    Rectangle,
    Circle,
    Line,
    Arc,
    Polygon,
    Hexagon,
    Slot,
    Spline,
    GearProfile,
    LShape,
    BottleProfile,
    ShaftProfile,
    CircularPattern,
    LinearPattern,
    Point,
}

impl GeometryFamily {
    pub const ALL: [GeometryFamily; 15] = [
        GeometryFamily::Rectangle,
        GeometryFamily::Circle,
        GeometryFamily::Line,
        GeometryFamily::Arc,
        GeometryFamily::Polygon,
        GeometryFamily::Hexagon,
        GeometryFamily::Slot,
        GeometryFamily::Spline,
        GeometryFamily::GearProfile,
        GeometryFamily::LShape,
        GeometryFamily::BottleProfile,
        GeometryFamily::ShaftProfile,
        GeometryFamily::CircularPattern,
        GeometryFamily::LinearPattern,
        GeometryFamily::Point,
    ];

    /// The name used for this family in task files.
    pub fn name(self) -> &'static str {
        match self {
            GeometryFamily::Rectangle => "rectangle",
            GeometryFamily::Circle => "circle",
            GeometryFamily::Line => "line",
            GeometryFamily::Arc => "arc",
            GeometryFamily::Polygon => "polygon",
            GeometryFamily::Hexagon => "hexagon",
            GeometryFamily::Slot => "slot",
            GeometryFamily::Spline => "spline",
            GeometryFamily::GearProfile => "gear_profile",
            GeometryFamily::LShape => "l_shape",
            GeometryFamily::BottleProfile => "bottle_profile",
            GeometryFamily::ShaftProfile => "shaft_profile",
            GeometryFamily::CircularPattern => "circular_pattern",
            GeometryFamily::LinearPattern => "linear_pattern",
            GeometryFamily::Point => "point",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    pub fn is_pattern(self) -> bool {
        matches!(
            self,
            GeometryFamily::CircularPattern | GeometryFamily::LinearPattern
        )
    }

    /// Synthesize this family from a JSON parameter object. `null` is
    /// treated as an empty object, so every parameter takes its default.
    pub fn synthesize(
        self,
        params: &Value,
        opts: &SynthOptions,
    ) -> Result<Vec<PlanarCurve>, SynthError> {
        match self {
            GeometryFamily::Rectangle => basic::rectangle(&decode(self, params)?),
            GeometryFamily::Circle => basic::circle(&decode(self, params)?),
            GeometryFamily::Line => basic::polyline(&decode(self, params)?),
            GeometryFamily::Arc => basic::arc(&decode(self, params)?),
            GeometryFamily::Polygon => basic::polygon(&decode(self, params)?),
            GeometryFamily::Hexagon => basic::hexagon(&decode(self, params)?),
            GeometryFamily::Slot => basic::slot(&decode(self, params)?),
            GeometryFamily::Spline => basic::spline(&decode(self, params)?),
            GeometryFamily::Point => basic::point(&decode(self, params)?),
            GeometryFamily::GearProfile => gear::gear_profile(&decode(self, params)?),
            GeometryFamily::LShape => revolve_profiles::l_shape(&decode(self, params)?),
            GeometryFamily::BottleProfile => {
                revolve_profiles::bottle_profile(&decode(self, params)?)
            }
            GeometryFamily::ShaftProfile => revolve_profiles::shaft_profile(&decode(self, params)?),
            GeometryFamily::CircularPattern => {
                pattern::circular_pattern(&decode(self, params)?, opts)
            }
            GeometryFamily::LinearPattern => pattern::linear_pattern(&decode(self, params)?, opts),
        }
    }
}

/// Synthesize by family name.
pub fn synthesize(
    name: &str,
    params: &Value,
    opts: &SynthOptions,
) -> Result<Vec<PlanarCurve>, SynthError> {
    let family = GeometryFamily::from_name(name).ok_or_else(|| SynthError::UnknownFamily {
        name: name.to_string(),
    })?;
    family.synthesize(params, opts)
}

fn decode<T: DeserializeOwned>(family: GeometryFamily, params: &Value) -> Result<T, SynthError> {
    let params = match params {
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    };
    serde_json::from_value(params).map_err(|e| SynthError::InvalidParams {
        family: family.name(),
        reason: e.to_string(),
    })
}
