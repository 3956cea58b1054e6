//! Built-in operation handlers.
//!
//! Each handler decodes its own parameter struct from the raw operation,
//! with defaults for everything optional, converts millimetres and degrees
//! to authority units, and records what it built in the design context.

mod assembly;
mod finish;
mod pattern;
mod sketch;
mod solid;

use cad_authority::Axis;

use crate::interpreter::{Handler, Interpreter};
use crate::table::OperationKind;

pub(crate) fn handler_for(kind: OperationKind) -> Handler {
    match kind {
        OperationKind::Sketch => sketch::sketch,
        OperationKind::Extrude => solid::extrude,
        OperationKind::Revolve => solid::revolve,
        OperationKind::Loft => solid::loft,
        OperationKind::Sweep => solid::sweep,
        OperationKind::Hole => solid::hole,
        OperationKind::CircularPattern => pattern::circular_pattern,
        OperationKind::LinearPattern => pattern::linear_pattern,
        OperationKind::Shell => finish::shell,
        OperationKind::Fillet => finish::fillet,
        OperationKind::Chamfer => finish::chamfer,
        OperationKind::Combine => finish::combine,
        OperationKind::CreateComponent => assembly::create_component,
        OperationKind::ActivateComponent => assembly::activate_component,
        OperationKind::CreateJoint => assembly::create_joint,
        OperationKind::TransformComponent => assembly::transform_component,
    }
}

/// Parse an axis name, falling back (with a warning) on anything else.
fn axis_or(it: &mut Interpreter<'_>, name: &str, fallback: Axis) -> Axis {
    Axis::from_name(name).unwrap_or_else(|| {
        it.journal
            .warn(format!("Unknown axis '{name}', using {fallback:?}"));
        fallback
    })
}
