//! Measurements of the finished design.

use cad_authority::{AuthorityBundle, AuthorityError, AuthorityIntrospect, BoundingBox3, MeshRefinement};
use profile_synth::units::{area_to_mm2, internal_to_mm, volume_to_mm3};
use replay_types::{Extents, Metadata};
use task_engine::{DesignContext, Journal};
use tracing::debug;

/// Sum mesh counts, volume and area over every body of every component and
/// combine their world bounding boxes. A body whose query fails adds
/// nothing.
pub fn gather_metadata(kb: &dyn AuthorityIntrospect, design: &DesignContext) -> Metadata {
    let mut metadata = Metadata::default();
    let mut bounds: Option<BoundingBox3> = None;

    for component in design.components() {
        for body in kb.bodies(component.id) {
            metadata.body_count += 1;
            match kb.mesh_stats(body, MeshRefinement::Medium) {
                Ok(mesh) => {
                    metadata.vertex_count += mesh.node_count;
                    metadata.face_count += mesh.triangle_count;
                }
                Err(e) => debug!(body = body.0, error = %e, "no mesh stats"),
            }
            match kb.physical_properties(body) {
                Ok(props) => {
                    metadata.volume += volume_to_mm3(props.volume);
                    metadata.surface_area += area_to_mm2(props.area);
                }
                Err(e) => debug!(body = body.0, error = %e, "no physical properties"),
            }
            match kb.bounding_box(body) {
                Ok(bb) => bounds = Some(bounds.map_or(bb, |acc| acc.union(&bb))),
                Err(e) => debug!(body = body.0, error = %e, "no bounding box"),
            }
        }
    }

    if let Some(bb) = bounds {
        let [x, y, z] = bb.extents().map(internal_to_mm);
        metadata.bounding_box = Extents { x, y, z };
    }
    metadata
}

/// Count interfering pairs among the bodies of the created components.
///
/// A non-zero count is logged as a warning, never as an error. A failed
/// check counts as zero unless the host itself failed.
pub fn check_interference(
    kb: &mut dyn AuthorityBundle,
    design: &DesignContext,
    journal: &mut Journal<'_>,
) -> Result<usize, AuthorityError> {
    let bodies = design.occurrence_bodies();
    if bodies.len() < 2 {
        return Ok(0);
    }
    match kb.analyze_interference(&bodies) {
        Ok(0) => Ok(0),
        Ok(count) => {
            journal.warn(format!("Found {count} interference(s) between components"));
            Ok(count)
        }
        Err(e) if e.is_host_fatal() => Err(e),
        Err(e) => {
            journal.warn(format!("Interference check failed: {e}"));
            Ok(0)
        }
    }
}
