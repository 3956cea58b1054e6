use std::path::Path;

use profile_synth::InternalCurve;
use replay_types::JointKind;

use crate::types::*;

/// Mutating surface of the CAD authority.
///
/// All lengths are internal units and all angles radians. Implemented by
/// host bindings and by `MockAuthority` (deterministic test double).
/// Calls must be made from the thread that owns the authority.
pub trait CadAuthority {
    /// Open a fresh design document whose root component is named `name`.
    /// Any open document is discarded first.
    fn new_document(&mut self, name: &str) -> Result<(), AuthorityError>;

    /// Close the open document without saving.
    fn close_document(&mut self) -> Result<(), AuthorityError>;

    /// Let the host process pending UI events.
    fn pump_events(&mut self);

    /// Construction plane parallel to `base` at signed distance `offset`.
    fn add_offset_plane(
        &mut self,
        component: ComponentId,
        base: PrincipalPlane,
        offset: f64,
    ) -> Result<PlaneId, AuthorityError>;

    fn add_sketch(
        &mut self,
        component: ComponentId,
        plane: PlaneRef,
    ) -> Result<SketchId, AuthorityError>;

    /// Add a curve to a sketch. Construction curves never bound profiles.
    /// Point curves become sketch points.
    fn add_curve(
        &mut self,
        sketch: SketchId,
        curve: &InternalCurve,
        construction: bool,
    ) -> Result<CurveId, AuthorityError>;

    fn add_constraint(
        &mut self,
        sketch: SketchId,
        constraint: SketchConstraint,
    ) -> Result<(), AuthorityError>;

    /// Extrude profiles by a signed distance along their sketch normal.
    fn extrude(
        &mut self,
        component: ComponentId,
        profiles: &[Profile],
        distance: f64,
        operation: FeatureOperation,
    ) -> Result<FeatureId, AuthorityError>;

    /// Revolve a profile about an origin axis by `angle`.
    fn revolve(
        &mut self,
        component: ComponentId,
        profile: Profile,
        axis: Axis,
        angle: f64,
        operation: FeatureOperation,
    ) -> Result<FeatureId, AuthorityError>;

    fn loft(
        &mut self,
        component: ComponentId,
        sections: &[Profile],
        solid: bool,
        operation: FeatureOperation,
    ) -> Result<FeatureId, AuthorityError>;

    /// Sweep a profile along a path made of sketch curves.
    fn sweep(
        &mut self,
        component: ComponentId,
        profile: Profile,
        path: &[CurveId],
        operation: FeatureOperation,
    ) -> Result<FeatureId, AuthorityError>;

    /// Repeat a feature `count` times about an origin axis over `total_angle`.
    fn circular_pattern(
        &mut self,
        component: ComponentId,
        feature: FeatureId,
        axis: Axis,
        count: u32,
        total_angle: f64,
    ) -> Result<FeatureId, AuthorityError>;

    /// Repeat a feature `count` times along an origin axis, `spacing` apart.
    fn rectangular_pattern(
        &mut self,
        component: ComponentId,
        feature: FeatureId,
        direction: Axis,
        count: u32,
        spacing: f64,
    ) -> Result<FeatureId, AuthorityError>;

    /// Hollow a body, removing the given faces, walls `thickness` thick.
    fn shell(
        &mut self,
        component: ComponentId,
        body: BodyId,
        faces_to_remove: &[FaceId],
        thickness: f64,
    ) -> Result<FeatureId, AuthorityError>;

    fn fillet(
        &mut self,
        component: ComponentId,
        edges: &[EdgeId],
        radius: f64,
    ) -> Result<FeatureId, AuthorityError>;

    /// Equal-distance chamfer.
    fn chamfer(
        &mut self,
        component: ComponentId,
        edges: &[EdgeId],
        distance: f64,
    ) -> Result<FeatureId, AuthorityError>;

    fn combine(
        &mut self,
        component: ComponentId,
        target: BodyId,
        tools: &[BodyId],
        operation: CombineOperation,
        keep_tools: bool,
    ) -> Result<FeatureId, AuthorityError>;

    /// New component with its own occurrence under the root, identity
    /// transform.
    fn add_component(&mut self, name: &str) -> Result<ComponentId, AuthorityError>;

    /// Set the translation of a component's occurrence.
    fn set_transform(
        &mut self,
        component: ComponentId,
        translation: [f64; 3],
    ) -> Result<(), AuthorityError>;

    /// Joint between the origin points of two components' occurrences.
    /// Revolute and slider joints move about/along Z.
    fn add_joint(
        &mut self,
        first: ComponentId,
        second: ComponentId,
        kind: JointKind,
    ) -> Result<JointId, AuthorityError>;

    /// Number of interfering pairs among `bodies`.
    fn analyze_interference(&mut self, bodies: &[BodyId]) -> Result<usize, AuthorityError>;

    /// Write the whole design to `path`.
    fn export(
        &mut self,
        format: ExportFormat,
        path: &Path,
        refinement: MeshRefinement,
    ) -> Result<(), AuthorityError>;
}

/// Read-only queries on the open document.
pub trait AuthorityIntrospect {
    fn root_component(&self) -> ComponentId {
        ComponentId::ROOT
    }

    /// Every component, root first.
    fn components(&self) -> Vec<ComponentId>;

    fn component_name(&self, component: ComponentId) -> Option<String>;

    /// Occurrence translation. Zero for the root.
    fn component_transform(&self, component: ComponentId) -> [f64; 3];

    /// Closed regions of a sketch, in a stable order.
    fn sketch_profiles(&self, sketch: SketchId) -> Vec<Profile>;

    fn profile_area(&self, profile: Profile) -> Result<f64, AuthorityError>;

    /// Every curve of a sketch in creation order, construction included.
    fn sketch_curves(&self, sketch: SketchId) -> Vec<CurveId>;

    /// Bodies owned by a component, in creation order.
    fn bodies(&self, component: ComponentId) -> Vec<BodyId>;

    fn body_edges(&self, body: BodyId) -> Vec<EdgeInfo>;

    fn body_faces(&self, body: BodyId) -> Vec<FaceInfo>;

    fn physical_properties(&self, body: BodyId) -> Result<PhysicalProperties, AuthorityError>;

    /// Bounding box in world coordinates.
    fn bounding_box(&self, body: BodyId) -> Result<BoundingBox3, AuthorityError>;

    fn mesh_stats(
        &self,
        body: BodyId,
        refinement: MeshRefinement,
    ) -> Result<MeshStats, AuthorityError>;
}

/// Combined trait for callers that need both mutable and read-only access
/// to the same authority.
pub trait AuthorityBundle: CadAuthority + AuthorityIntrospect {
    fn as_introspect(&self) -> &dyn AuthorityIntrospect;
}

impl<T: CadAuthority + AuthorityIntrospect> AuthorityBundle for T {
    fn as_introspect(&self) -> &dyn AuthorityIntrospect {
        self
    }
}
