use cad_authority::{Axis, FeatureOperation, PlaneRef, PrincipalPlane};
use profile_synth::units::mm_to_internal;
use profile_synth::{InternalCurve, PlanarCurve, Point2};
use replay_types::RawOperation;
use serde::Deserialize;

use super::axis_or;
use crate::error::OperationError;
use crate::interpreter::Interpreter;
use crate::resolve::{
    all_profiles, profile_at, resolve_profile, sketch_number, ProfileRef,
};
use crate::table::Tuning;

// ── Extrude ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ExtrudeParams {
    distance: f64,
    operation: String,
    profile: Option<ProfileRef>,
}

impl Default for ExtrudeParams {
    fn default() -> Self {
        Self {
            distance: 10.0,
            operation: "new".to_string(),
            profile: None,
        }
    }
}

/// Extrude one referenced profile, or every profile of the last sketch.
pub(crate) fn extrude(it: &mut Interpreter<'_>, op: &RawOperation) -> Result<(), OperationError> {
    let p: ExtrudeParams = op.decode()?;
    let profiles = match &p.profile {
        Some(reference) => vec![resolve_profile(
            &it.design,
            it.kb.as_introspect(),
            reference,
        )?],
        None => all_profiles(it.kb.as_introspect(), it.design.last_sketch()?)?,
    };
    let operation = FeatureOperation::from_name(&p.operation);

    let feature = it.kb.extrude(
        it.design.active_id(),
        &profiles,
        mm_to_internal(p.distance),
        operation,
    )?;
    it.design.record_feature(feature);
    it.journal.info(format!(
        "Extrude: {} profile(s), {}mm, {:?}",
        profiles.len(),
        p.distance,
        operation
    ));
    Ok(())
}

// ── Revolve ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RevolveParams {
    axis: String,
    angle: f64,
    operation: String,
    profile: Option<ProfileRef>,
}

impl Default for RevolveParams {
    fn default() -> Self {
        Self {
            axis: "Z".to_string(),
            angle: 360.0,
            operation: "new".to_string(),
            profile: None,
        }
    }
}

pub(crate) fn revolve(it: &mut Interpreter<'_>, op: &RawOperation) -> Result<(), OperationError> {
    let p: RevolveParams = op.decode()?;
    let profile = match &p.profile {
        Some(reference) => resolve_profile(&it.design, it.kb.as_introspect(), reference)?,
        None => profile_at(it.kb.as_introspect(), it.design.last_sketch()?, 0)?,
    };
    let axis = axis_or(it, &p.axis, Axis::Z);

    let feature = it.kb.revolve(
        it.design.active_id(),
        profile,
        axis,
        p.angle.to_radians(),
        FeatureOperation::from_name(&p.operation),
    )?;
    it.design.record_feature(feature);
    it.journal
        .info(format!("Revolve: {}° about {:?}", p.angle, axis));
    Ok(())
}

// ── Loft ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(default)]
struct LoftParams {
    profiles: Vec<ProfileRef>,
    solid: bool,
    operation: String,
}

impl Default for LoftParams {
    fn default() -> Self {
        Self {
            profiles: vec![ProfileRef::Index(1), ProfileRef::Index(2)],
            solid: true,
            operation: "new".to_string(),
        }
    }
}

/// Loft through the referenced sections. Sections that do not resolve are
/// skipped; at least two must remain.
pub(crate) fn loft(it: &mut Interpreter<'_>, op: &RawOperation) -> Result<(), OperationError> {
    let p: LoftParams = op.decode()?;
    let mut sections = Vec::new();
    for reference in &p.profiles {
        match resolve_profile(&it.design, it.kb.as_introspect(), reference) {
            Ok(profile) => sections.push(profile),
            Err(e) => it
                .journal
                .warn(format!("Loft: skipped section {reference:?}: {e}")),
        }
    }
    if sections.len() < 2 {
        return Err(OperationError::ResolutionFailed {
            reason: format!("loft needs at least 2 profiles, got {}", sections.len()),
        });
    }

    let feature = it.kb.loft(
        it.design.active_id(),
        &sections,
        p.solid,
        FeatureOperation::from_name(&p.operation),
    )?;
    it.design.record_feature(feature);
    it.journal
        .info(format!("Loft: {} sections", sections.len()));
    Ok(())
}

// ── Sweep ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SweepParams {
    /// 1-based.
    profile_sketch: i64,
    /// 1-based.
    path_sketch: i64,
    operation: String,
}

impl Default for SweepParams {
    fn default() -> Self {
        Self {
            profile_sketch: 1,
            path_sketch: 2,
            operation: "new".to_string(),
        }
    }
}

pub(crate) fn sweep(it: &mut Interpreter<'_>, op: &RawOperation) -> Result<(), OperationError> {
    let p: SweepParams = op.decode()?;
    let profile_sketch = sketch_number(&it.design, p.profile_sketch)?;
    let path_sketch = sketch_number(&it.design, p.path_sketch)?;
    let profile = profile_at(it.kb.as_introspect(), profile_sketch, 0)?;
    let path = it.kb.sketch_curves(path_sketch);
    if path.is_empty() {
        return Err(OperationError::ResolutionFailed {
            reason: format!("path sketch {} has no curves", p.path_sketch),
        });
    }

    let feature = it.kb.sweep(
        it.design.active_id(),
        profile,
        &path,
        FeatureOperation::from_name(&p.operation),
    )?;
    it.design.record_feature(feature);
    it.journal
        .info(format!("Sweep: path of {} curves", path.len()));
    Ok(())
}

// ── Hole ────────────────────────────────────────────────────────────────────

/// Either a depth in millimetres or the keyword `"through"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum HoleDepth {
    Millimetres(f64),
    Keyword(String),
}

impl HoleDepth {
    fn millimetres(&self, tuning: &Tuning) -> Result<f64, OperationError> {
        match self {
            HoleDepth::Millimetres(mm) => Ok(*mm),
            HoleDepth::Keyword(k) if k == "through" => Ok(tuning.through_cut_depth_mm),
            HoleDepth::Keyword(k) => k
                .trim()
                .parse::<f64>()
                .map_err(|_| OperationError::invalid(format!("hole depth '{k}' is not a number"))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct HoleParams {
    diameter: f64,
    center: Point2,
    plane: String,
    depth: HoleDepth,
}

impl Default for HoleParams {
    fn default() -> Self {
        Self {
            diameter: 5.0,
            center: [0.0, 0.0],
            plane: "XY".to_string(),
            depth: HoleDepth::Keyword("through".to_string()),
        }
    }
}

/// A round cut: a new sketch with one circle, extruded as a cut.
pub(crate) fn hole(it: &mut Interpreter<'_>, op: &RawOperation) -> Result<(), OperationError> {
    let p: HoleParams = op.decode()?;
    let depth = p.depth.millimetres(&it.table.tuning)?;
    it.design.last_body()?;
    let plane = PrincipalPlane::from_name(&p.plane).unwrap_or_else(|| {
        it.journal
            .warn(format!("Unknown hole plane '{}', using XY", p.plane));
        PrincipalPlane::XY
    });
    it.journal.info(format!(
        "Hole: D={}mm at {:?}, depth {}mm",
        p.diameter, p.center, depth
    ));

    let component = it.design.active_id();
    let sketch = it.kb.add_sketch(component, PlaneRef::Principal(plane))?;
    it.design.record_sketch(sketch);
    let circle = PlanarCurve::circle(p.center, p.diameter / 2.0);
    it.kb
        .add_curve(sketch, &InternalCurve::from_mm(&circle), false)?;
    let profile = profile_at(it.kb.as_introspect(), sketch, 0)?;

    let feature = it.kb.extrude(
        component,
        &[profile],
        mm_to_internal(depth),
        FeatureOperation::Cut,
    )?;
    it.design.record_feature(feature);
    Ok(())
}
