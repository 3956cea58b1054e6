use cad_authority::{BodyId, CombineOperation, EdgeId, FaceInfo};
use profile_synth::units::mm_to_internal;
use replay_types::RawOperation;
use serde::Deserialize;

use crate::error::OperationError;
use crate::interpreter::Interpreter;

// ── Shell ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ShellParams {
    thickness: f64,
}

impl Default for ShellParams {
    fn default() -> Self {
        Self { thickness: 2.0 }
    }
}

/// Hollow the last body, opening its top-most face.
pub(crate) fn shell(it: &mut Interpreter<'_>, op: &RawOperation) -> Result<(), OperationError> {
    let p: ShellParams = op.decode()?;
    let body = it.design.last_body()?;
    let faces = it.kb.body_faces(body);
    let top = top_face(&faces).ok_or_else(|| OperationError::ResolutionFailed {
        reason: format!("body {} has no faces", body.0),
    })?;

    let feature = it.kb.shell(
        it.design.active_id(),
        body,
        &[top.id],
        mm_to_internal(p.thickness),
    )?;
    it.design.record_feature(feature);
    it.journal
        .info(format!("Created shell with {}mm wall thickness", p.thickness));
    Ok(())
}

/// Face whose bounding box reaches highest along Z. The first wins a tie.
fn top_face(faces: &[FaceInfo]) -> Option<&FaceInfo> {
    faces.iter().fold(None, |best: Option<&FaceInfo>, face| match best {
        Some(b) if b.bbox.max[2] >= face.bbox.max[2] => Some(b),
        _ => Some(face),
    })
}

// ── Fillet & chamfer ────────────────────────────────────────────────────────

/// Which edges of the last body a fillet or chamfer touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum EdgeSelection {
    /// Every edge longer than the minimum edge length.
    #[default]
    All,
    /// Edges that rise along Z.
    AllOuterVertical,
}

fn select_edges(
    it: &Interpreter<'_>,
    body: BodyId,
    selection: EdgeSelection,
) -> Result<Vec<EdgeId>, OperationError> {
    let tuning = it.table.tuning;
    let min_length = mm_to_internal(tuning.min_edge_length_mm);
    let rise = mm_to_internal(tuning.vertical_edge_tolerance_mm);
    let edges: Vec<EdgeId> = it
        .kb
        .body_edges(body)
        .into_iter()
        .filter(|e| match selection {
            EdgeSelection::All => e.length > min_length,
            EdgeSelection::AllOuterVertical => e.is_vertical(rise),
        })
        .map(|e| e.id)
        .collect();
    if edges.is_empty() {
        return Err(OperationError::ResolutionFailed {
            reason: format!("no edges of body {} match {:?}", body.0, selection),
        });
    }
    Ok(edges)
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FilletParams {
    radius: f64,
    edges: EdgeSelection,
}

impl Default for FilletParams {
    fn default() -> Self {
        Self {
            radius: 1.0,
            edges: EdgeSelection::All,
        }
    }
}

pub(crate) fn fillet(it: &mut Interpreter<'_>, op: &RawOperation) -> Result<(), OperationError> {
    let p: FilletParams = op.decode()?;
    let body = it.design.last_body()?;
    let edges = select_edges(it, body, p.edges)?;

    let feature = it
        .kb
        .fillet(it.design.active_id(), &edges, mm_to_internal(p.radius))?;
    it.design.record_feature(feature);
    it.journal
        .info(format!("Applied fillet to {} edges", edges.len()));
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ChamferParams {
    distance: f64,
    edges: EdgeSelection,
}

impl Default for ChamferParams {
    fn default() -> Self {
        Self {
            distance: 1.0,
            edges: EdgeSelection::All,
        }
    }
}

pub(crate) fn chamfer(it: &mut Interpreter<'_>, op: &RawOperation) -> Result<(), OperationError> {
    let p: ChamferParams = op.decode()?;
    let body = it.design.last_body()?;
    let edges = select_edges(it, body, p.edges)?;

    let feature = it
        .kb
        .chamfer(it.design.active_id(), &edges, mm_to_internal(p.distance))?;
    it.design.record_feature(feature);
    it.journal
        .info(format!("Applied chamfer to {} edges", edges.len()));
    Ok(())
}

// ── Combine ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CombineParams {
    operation: String,
    target_body: i64,
    tool_body: i64,
    keep_tools: bool,
}

impl Default for CombineParams {
    fn default() -> Self {
        Self {
            operation: "join".to_string(),
            target_body: 0,
            tool_body: 1,
            keep_tools: false,
        }
    }
}

/// Boolean of two bodies of the active component, by position.
pub(crate) fn combine(it: &mut Interpreter<'_>, op: &RawOperation) -> Result<(), OperationError> {
    let p: CombineParams = op.decode()?;
    let operation = CombineOperation::from_name(&p.operation).ok_or_else(|| {
        OperationError::invalid(format!("Unknown combine operation: {}", p.operation))
    })?;
    let available = it.design.active().bodies.len();
    if available < 2 {
        return Err(OperationError::ResolutionFailed {
            reason: format!("combine needs at least 2 bodies, found {available}"),
        });
    }
    let target = it.design.body_at(p.target_body)?;
    let tool = it.design.body_at(p.tool_body)?;

    let feature = it.kb.combine(
        it.design.active_id(),
        target,
        &[tool],
        operation,
        p.keep_tools,
    )?;
    it.design.record_feature(feature);
    it.journal.info(format!(
        "Combine: {:?} body {} with body {}",
        operation, p.target_body, p.tool_body
    ));
    Ok(())
}
