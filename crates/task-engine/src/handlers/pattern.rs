use cad_authority::Axis;
use profile_synth::units::mm_to_internal;
use profile_synth::MAX_REPEAT;
use replay_types::RawOperation;
use serde::Deserialize;

use super::axis_or;
use crate::error::OperationError;
use crate::interpreter::Interpreter;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CircularPatternParams {
    count: u32,
    angle: f64,
    axis: String,
}

impl Default for CircularPatternParams {
    fn default() -> Self {
        Self {
            count: 4,
            angle: 360.0,
            axis: "Z".to_string(),
        }
    }
}

/// Repeat the last feature about an origin axis.
pub(crate) fn circular_pattern(
    it: &mut Interpreter<'_>,
    op: &RawOperation,
) -> Result<(), OperationError> {
    let p: CircularPatternParams = op.decode()?;
    check_count(p.count)?;
    let seed = it.design.last_feature()?;
    let axis = axis_or(it, &p.axis, Axis::Z);

    let feature = it.kb.circular_pattern(
        it.design.active_id(),
        seed,
        axis,
        p.count,
        p.angle.to_radians(),
    )?;
    it.design.record_feature(feature);
    it.journal.info(format!(
        "Created circular pattern: {} instances over {}°",
        p.count, p.angle
    ));
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct LinearPatternParams {
    count: u32,
    spacing: f64,
    direction: String,
}

impl Default for LinearPatternParams {
    fn default() -> Self {
        Self {
            count: 3,
            spacing: 10.0,
            direction: "X".to_string(),
        }
    }
}

/// Repeat the last feature along an origin axis.
pub(crate) fn linear_pattern(
    it: &mut Interpreter<'_>,
    op: &RawOperation,
) -> Result<(), OperationError> {
    let p: LinearPatternParams = op.decode()?;
    check_count(p.count)?;
    let seed = it.design.last_feature()?;
    let direction = axis_or(it, &p.direction, Axis::Z);

    let feature = it.kb.rectangular_pattern(
        it.design.active_id(),
        seed,
        direction,
        p.count,
        mm_to_internal(p.spacing),
    )?;
    it.design.record_feature(feature);
    it.journal.info(format!(
        "Created linear pattern: {} instances, {}mm along {:?}",
        p.count, p.spacing, direction
    ));
    Ok(())
}

fn check_count(count: u32) -> Result<(), OperationError> {
    if count > MAX_REPEAT {
        return Err(OperationError::invalid(format!(
            "pattern count {count} exceeds the limit of {MAX_REPEAT}"
        )));
    }
    Ok(())
}
