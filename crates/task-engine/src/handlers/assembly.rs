use profile_synth::units::point3_to_internal;
use replay_types::{JointKind, RawOperation};
use serde::Deserialize;

use crate::error::OperationError;
use crate::interpreter::Interpreter;

#[derive(Debug, Deserialize)]
struct CreateComponentParams {
    #[serde(default = "default_component_name")]
    name: String,
}

fn default_component_name() -> String {
    "Component".to_string()
}

pub(crate) fn create_component(
    it: &mut Interpreter<'_>,
    op: &RawOperation,
) -> Result<(), OperationError> {
    let p: CreateComponentParams = op.decode()?;
    let id = it.design.create_component(&mut *it.kb, &p.name)?;
    it.journal
        .info(format!("Created component: {} ({})", p.name, id.0));
    Ok(())
}

#[derive(Debug, Deserialize)]
struct NameParams {
    name: String,
}

pub(crate) fn activate_component(
    it: &mut Interpreter<'_>,
    op: &RawOperation,
) -> Result<(), OperationError> {
    let p: NameParams = op.decode()?;
    it.design.activate(&p.name)?;
    it.journal.info(format!("Activated component: {}", p.name));
    Ok(())
}

#[derive(Debug, Deserialize)]
struct JointParams {
    component_1: String,
    component_2: String,
    #[serde(default = "default_joint")]
    joint_type: JointKind,
}

fn default_joint() -> JointKind {
    JointKind::Rigid
}

/// Joint the origin points of two components.
pub(crate) fn create_joint(
    it: &mut Interpreter<'_>,
    op: &RawOperation,
) -> Result<(), OperationError> {
    let p: JointParams = op.decode()?;
    let first = it.design.resolve(&p.component_1)?;
    let second = it.design.resolve(&p.component_2)?;
    it.kb.add_joint(first, second, p.joint_type)?;
    it.journal.info(format!(
        "Created {} joint between {} and {}",
        p.joint_type.as_str(),
        p.component_1,
        p.component_2
    ));
    Ok(())
}

#[derive(Debug, Deserialize)]
struct TransformParams {
    name: String,
    /// Millimetres.
    #[serde(default)]
    offset: [f64; 3],
}

pub(crate) fn transform_component(
    it: &mut Interpreter<'_>,
    op: &RawOperation,
) -> Result<(), OperationError> {
    let p: TransformParams = op.decode()?;
    let component = it.design.resolve(&p.name)?;
    it.kb
        .set_transform(component, point3_to_internal(p.offset))?;
    it.journal
        .info(format!("Transformed {} by offset {:?}mm", p.name, p.offset));
    Ok(())
}
