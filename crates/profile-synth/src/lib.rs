pub mod curve;
pub mod error;
pub mod synth;
pub mod units;

pub use curve::{PlanarCurve, Point2};
pub use error::SynthError;
pub use synth::{
    angular_step, gear_outline, synthesize, GearOutline, GeometryFamily, SynthOptions,
    FULL_TURN_TOLERANCE, MAX_PATTERN_CURVES, MAX_REPEAT,
};
pub use units::{InternalCurve, MM_PER_INTERNAL};
