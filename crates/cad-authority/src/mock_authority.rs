//! Deterministic in-memory CAD authority.
//!
//! Implements `CadAuthority` + `AuthorityIntrospect` without a host
//! application. Sketch profiles are found from the actual curves, bodies
//! are bounding boxes with tracked volume, area, edges and faces, and
//! exports write real files. Used by the engine and runner tests and by the
//! host binary's dry-run mode.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use profile_synth::units::internal_to_mm;
use profile_synth::{angular_step, InternalCurve, PlanarCurve, FULL_TURN_TOLERANCE};
use replay_types::JointKind;
use tracing::debug;
use uuid::Uuid;

use crate::archive::{
    write_archive, ArchiveFile, ArchivedBody, ArchivedComponent, ArchivedJoint, ARCHIVE_FORMAT,
    ARCHIVE_VERSION,
};
use crate::profiles::{curve_points, find_profiles, ProfileShape};
use crate::solid::{self, add, rotate_about_axis, scale, Blend, Frame, IdAlloc, MockBody};
use crate::stl::encode_binary_stl;
use crate::tessellation::{box_mesh_stats, tessellate_box};
use crate::traits::{AuthorityIntrospect, CadAuthority};
use crate::types::*;

/// Misbehavior injected into the next call of a named authority method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The call fails with `AuthorityError::HostFatal`.
    HostFatal,
    /// The call panics.
    Panic,
}

#[derive(Debug, Clone)]
struct ComponentRecord {
    name: String,
    transform: [f64; 3],
    sketches: Vec<SketchId>,
    features: Vec<FeatureId>,
}

#[derive(Debug, Clone)]
struct SketchRecord {
    frame: Frame,
    curves: Vec<CurveId>,
}

#[derive(Debug, Clone)]
struct CurveRecord {
    sketch: SketchId,
    curve: PlanarCurve,
    construction: bool,
}

/// What a feature added, kept so patterns can repeat it.
#[derive(Debug, Clone)]
struct FeatureRecord {
    seeds: Vec<MockBody>,
    operation: FeatureOperation,
}

#[derive(Debug, Clone)]
struct JointRecord {
    id: JointId,
    first: ComponentId,
    second: ComponentId,
    kind: JointKind,
}

struct Document {
    id: Uuid,
    ids: IdAlloc,
    components: BTreeMap<ComponentId, ComponentRecord>,
    planes: HashMap<PlaneId, Frame>,
    sketches: BTreeMap<SketchId, SketchRecord>,
    curves: HashMap<CurveId, CurveRecord>,
    bodies: BTreeMap<BodyId, MockBody>,
    features: BTreeMap<FeatureId, FeatureRecord>,
    joints: Vec<JointRecord>,
}

impl Document {
    fn new(name: &str) -> Self {
        let mut components = BTreeMap::new();
        components.insert(
            ComponentId::ROOT,
            ComponentRecord {
                name: name.to_string(),
                transform: [0.0; 3],
                sketches: Vec::new(),
                features: Vec::new(),
            },
        );
        Self {
            id: Uuid::new_v4(),
            ids: IdAlloc::new(),
            components,
            planes: HashMap::new(),
            sketches: BTreeMap::new(),
            curves: HashMap::new(),
            bodies: BTreeMap::new(),
            features: BTreeMap::new(),
            joints: Vec::new(),
        }
    }

    fn component(&self, id: ComponentId) -> Result<&ComponentRecord, AuthorityError> {
        self.components.get(&id).ok_or(AuthorityError::NotFound {
            kind: "component",
            id: id.0,
        })
    }

    fn component_mut(&mut self, id: ComponentId) -> Result<&mut ComponentRecord, AuthorityError> {
        self.components.get_mut(&id).ok_or(AuthorityError::NotFound {
            kind: "component",
            id: id.0,
        })
    }

    fn sketch(&self, id: SketchId) -> Result<&SketchRecord, AuthorityError> {
        self.sketches.get(&id).ok_or(AuthorityError::NotFound {
            kind: "sketch",
            id: id.0,
        })
    }

    fn body(&self, id: BodyId) -> Result<&MockBody, AuthorityError> {
        self.bodies.get(&id).ok_or(AuthorityError::NotFound {
            kind: "body",
            id: id.0,
        })
    }

    /// A body owned by `component`.
    fn owned_body(&self, component: ComponentId, id: BodyId) -> Result<&MockBody, AuthorityError> {
        let body = self.body(id)?;
        if body.component != component {
            return Err(AuthorityError::invalid(format!(
                "body {} does not belong to component {}",
                id.0, component.0
            )));
        }
        Ok(body)
    }

    fn shapes(&self, sketch: SketchId) -> Result<(Frame, Vec<ProfileShape>), AuthorityError> {
        let record = self.sketch(sketch)?;
        let curves: Vec<(PlanarCurve, bool)> = record
            .curves
            .iter()
            .filter_map(|id| self.curves.get(id))
            .filter(|c| c.curve.is_curve())
            .map(|c| (c.curve.clone(), c.construction))
            .collect();
        Ok((record.frame, find_profiles(&curves)))
    }

    fn shape(&self, profile: Profile) -> Result<(Frame, ProfileShape), AuthorityError> {
        let (frame, mut shapes) = self.shapes(profile.sketch)?;
        if profile.index >= shapes.len() {
            return Err(AuthorityError::NotFound {
                kind: "profile",
                id: profile.index as u64,
            });
        }
        Ok((frame, shapes.swap_remove(profile.index)))
    }

    fn offset_of(&self, component: ComponentId) -> [f64; 3] {
        self.components
            .get(&component)
            .map(|c| c.transform)
            .unwrap_or([0.0; 3])
    }

    fn world_bbox(&self, body: &MockBody) -> BoundingBox3 {
        body.bbox.translated(self.offset_of(body.component))
    }

    /// Run `f` against the body set, restoring it if `f` fails.
    fn transaction<T>(
        &mut self,
        f: impl FnOnce(&mut Document) -> Result<T, AuthorityError>,
    ) -> Result<T, AuthorityError> {
        let saved = self.bodies.clone();
        let out = f(self);
        if out.is_err() {
            self.bodies = saved;
        }
        out
    }

    /// Combine a freshly built tool body with the component's bodies.
    fn apply_tool(
        &mut self,
        component: ComponentId,
        mut tool: MockBody,
        operation: FeatureOperation,
        feature: &'static str,
    ) -> Result<(), AuthorityError> {
        tool.component = component;
        let owned: Vec<BodyId> = self
            .bodies
            .values()
            .filter(|b| b.component == component)
            .map(|b| b.id)
            .collect();

        match operation {
            FeatureOperation::NewBody => {
                self.bodies.insert(tool.id, tool);
            }
            FeatureOperation::Join => {
                let target = owned
                    .iter()
                    .copied()
                    .find(|id| self.bodies.get(id).is_some_and(|b| b.touches(&tool)));
                match target.and_then(|id| self.bodies.get_mut(&id)) {
                    Some(body) => body.join(&tool),
                    None => {
                        self.bodies.insert(tool.id, tool);
                    }
                }
            }
            FeatureOperation::Cut | FeatureOperation::Intersect => {
                let targets: Vec<BodyId> = owned
                    .into_iter()
                    .filter(|id| {
                        self.bodies
                            .get(id)
                            .is_some_and(|b| b.bbox.intersection(&tool.bbox, 1e-9).is_some())
                    })
                    .collect();
                if targets.is_empty() {
                    let reason = if operation == FeatureOperation::Cut {
                        "no body intersects the cut"
                    } else {
                        "no body intersects the tool"
                    };
                    return Err(AuthorityError::feature(feature, reason));
                }
                for id in targets {
                    if let Some(body) = self.bodies.get_mut(&id) {
                        if operation == FeatureOperation::Cut {
                            body.cut(&tool, feature)?;
                        } else {
                            body.intersect(&tool, feature)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn record_feature(
        &mut self,
        component: ComponentId,
        seeds: Vec<MockBody>,
        operation: FeatureOperation,
    ) -> Result<FeatureId, AuthorityError> {
        let id = FeatureId(self.ids.next());
        self.component_mut(component)?.features.push(id);
        self.features.insert(id, FeatureRecord { seeds, operation });
        Ok(id)
    }

    /// Build tools with `build`, apply them, and record the feature.
    fn solid_feature(
        &mut self,
        component: ComponentId,
        operation: FeatureOperation,
        feature: &'static str,
        tools: Vec<MockBody>,
    ) -> Result<FeatureId, AuthorityError> {
        self.component(component)?;
        self.transaction(|doc| {
            for tool in &tools {
                doc.apply_tool(component, tool.clone(), operation, feature)?;
            }
            Ok(())
        })?;
        self.record_feature(component, tools, operation)
    }

    /// Repeat a feature's seed bodies through `place(instance, point)`.
    fn pattern(
        &mut self,
        component: ComponentId,
        feature: FeatureId,
        count: u32,
        name: &'static str,
        place: impl Fn(u32, [f64; 3]) -> [f64; 3],
    ) -> Result<FeatureId, AuthorityError> {
        if count == 0 {
            return Err(AuthorityError::invalid("pattern count must be at least 1"));
        }
        if count > profile_synth::MAX_REPEAT {
            return Err(AuthorityError::invalid(format!(
                "pattern count {count} exceeds the limit of {}",
                profile_synth::MAX_REPEAT
            )));
        }
        self.component(component)?;
        let source = self
            .features
            .get(&feature)
            .cloned()
            .ok_or(AuthorityError::NotFound {
                kind: "feature",
                id: feature.0,
            })?;
        if source.seeds.is_empty() {
            return Err(AuthorityError::feature(
                name,
                "the feature has no geometry to repeat",
            ));
        }

        let mut copies = Vec::new();
        for instance in 1..count {
            for seed in &source.seeds {
                copies.push(seed.transformed(&mut self.ids, |p| place(instance, p)));
            }
        }
        self.transaction(|doc| {
            for copy in &copies {
                doc.apply_tool(component, copy.clone(), source.operation, name)?;
            }
            Ok(())
        })?;
        self.record_feature(component, copies, source.operation)
    }

    /// Apply an edge blend to every body owning one of `edges`.
    fn blend(
        &mut self,
        component: ComponentId,
        edges: &[EdgeId],
        size: f64,
        blend: Blend,
    ) -> Result<FeatureId, AuthorityError> {
        if edges.is_empty() {
            return Err(AuthorityError::invalid("no edges selected"));
        }
        self.component(component)?;
        let mut groups: Vec<(BodyId, Vec<EdgeId>)> = Vec::new();
        for edge in edges {
            let owner = self
                .bodies
                .values()
                .find(|b| b.component == component && b.edges.iter().any(|e| e.id == *edge))
                .map(|b| b.id)
                .ok_or(AuthorityError::NotFound {
                    kind: "edge",
                    id: edge.0,
                })?;
            match groups.iter_mut().find(|(b, _)| *b == owner) {
                Some((_, list)) => list.push(*edge),
                None => groups.push((owner, vec![*edge])),
            }
        }
        self.transaction(|doc| {
            for (body, list) in &groups {
                let mut updated = doc.body(*body)?.clone();
                updated.blend(&mut doc.ids, list, size, blend)?;
                doc.bodies.insert(*body, updated);
            }
            Ok(())
        })?;
        self.record_feature(component, Vec::new(), FeatureOperation::Join)
    }

    fn archive(&self) -> ArchiveFile {
        let name = self
            .components
            .get(&ComponentId::ROOT)
            .map(|c| c.name.clone())
            .unwrap_or_default();
        let components = self
            .components
            .iter()
            .map(|(id, c)| ArchivedComponent {
                id: *id,
                name: c.name.clone(),
                transform: c.transform,
                sketch_count: c.sketches.len(),
                feature_count: c.features.len(),
                bodies: self
                    .bodies
                    .values()
                    .filter(|b| b.component == *id)
                    .map(|b| ArchivedBody {
                        id: b.id,
                        bbox: b.bbox,
                        volume: b.volume,
                        area: b.area,
                        edge_count: b.edges.len(),
                        face_count: b.faces.len(),
                    })
                    .collect(),
            })
            .collect();
        let joints = self
            .joints
            .iter()
            .map(|j| ArchivedJoint {
                id: j.id,
                first: j.first,
                second: j.second,
                kind: j.kind,
            })
            .collect();
        ArchiveFile {
            format: ARCHIVE_FORMAT.to_string(),
            version: ARCHIVE_VERSION,
            document: self.id,
            name,
            components,
            joints,
        }
    }
}

/// Deterministic in-memory CAD authority.
pub struct MockAuthority {
    doc: Option<Document>,
    faults: HashMap<String, Fault>,
    events_pumped: u64,
    documents_opened: u64,
}

impl MockAuthority {
    pub fn new() -> Self {
        Self {
            doc: None,
            faults: HashMap::new(),
            events_pumped: 0,
            documents_opened: 0,
        }
    }

    /// Make the next call of `call` (a `CadAuthority` method name) misbehave.
    pub fn inject_fault(&mut self, call: &str, fault: Fault) {
        self.faults.insert(call.to_string(), fault);
    }

    pub fn events_pumped(&self) -> u64 {
        self.events_pumped
    }

    pub fn documents_opened(&self) -> u64 {
        self.documents_opened
    }

    pub fn has_document(&self) -> bool {
        self.doc.is_some()
    }

    /// A curve as stored, in internal units, with its construction flag.
    pub fn curve(&self, id: CurveId) -> Option<(PlanarCurve, bool)> {
        let doc = self.doc.as_ref()?;
        doc.curves
            .get(&id)
            .map(|c| (c.curve.clone(), c.construction))
    }

    /// Joints of the open document as `(first, second, kind)`.
    pub fn joints(&self) -> Vec<(ComponentId, ComponentId, JointKind)> {
        self.doc
            .as_ref()
            .map(|d| d.joints.iter().map(|j| (j.first, j.second, j.kind)).collect())
            .unwrap_or_default()
    }

    /// Features recorded for a component, in order.
    pub fn features(&self, component: ComponentId) -> Vec<FeatureId> {
        self.doc
            .as_ref()
            .and_then(|d| d.components.get(&component))
            .map(|c| c.features.clone())
            .unwrap_or_default()
    }

    fn trip(&mut self, call: &'static str) -> Result<(), AuthorityError> {
        match self.faults.remove(call) {
            Some(Fault::HostFatal) => Err(AuthorityError::HostFatal {
                reason: format!("host stopped responding during {call}"),
            }),
            Some(Fault::Panic) => panic!("injected panic during {call}"),
            None => Ok(()),
        }
    }

    fn doc(&self) -> Result<&Document, AuthorityError> {
        self.doc.as_ref().ok_or(AuthorityError::NoDocument)
    }

    fn doc_mut(&mut self) -> Result<&mut Document, AuthorityError> {
        self.doc.as_mut().ok_or(AuthorityError::NoDocument)
    }

    /// Check faults, then hand out the open document.
    fn enter(&mut self, call: &'static str) -> Result<&mut Document, AuthorityError> {
        self.trip(call)?;
        self.doc_mut()
    }
}

impl Default for MockAuthority {
    fn default() -> Self {
        Self::new()
    }
}

fn check_curve(curve: &PlanarCurve) -> Result<(), AuthorityError> {
    let finite = |p: &[f64; 2]| p[0].is_finite() && p[1].is_finite();
    match curve {
        PlanarCurve::Line { start, end } => {
            if !finite(start) || !finite(end) {
                return Err(AuthorityError::invalid("line has non-finite coordinates"));
            }
            if (start[0] - end[0]).abs() < 1e-12 && (start[1] - end[1]).abs() < 1e-12 {
                return Err(AuthorityError::invalid("line has zero length"));
            }
        }
        PlanarCurve::Circle { radius, .. } | PlanarCurve::Arc { radius, .. } => {
            if !(*radius > 0.0) {
                return Err(AuthorityError::invalid("radius must be positive"));
            }
        }
        PlanarCurve::Spline { fit_points, .. } => {
            if fit_points.len() < 2 {
                return Err(AuthorityError::invalid("spline needs at least two points"));
            }
        }
        PlanarCurve::Point { at } => {
            if !finite(at) {
                return Err(AuthorityError::invalid("point has non-finite coordinates"));
            }
        }
    }
    Ok(())
}

impl CadAuthority for MockAuthority {
    fn new_document(&mut self, name: &str) -> Result<(), AuthorityError> {
        self.trip("new_document")?;
        self.doc = Some(Document::new(name));
        self.documents_opened += 1;
        debug!(name, "mock document opened");
        Ok(())
    }

    fn close_document(&mut self) -> Result<(), AuthorityError> {
        self.trip("close_document")?;
        self.doc.take().map(|_| ()).ok_or(AuthorityError::NoDocument)
    }

    fn pump_events(&mut self) {
        self.events_pumped += 1;
    }

    fn add_offset_plane(
        &mut self,
        component: ComponentId,
        base: PrincipalPlane,
        offset: f64,
    ) -> Result<PlaneId, AuthorityError> {
        let doc = self.enter("add_offset_plane")?;
        doc.component(component)?;
        let id = PlaneId(doc.ids.next());
        doc.planes.insert(id, Frame::on_plane(base, offset));
        Ok(id)
    }

    fn add_sketch(
        &mut self,
        component: ComponentId,
        plane: PlaneRef,
    ) -> Result<SketchId, AuthorityError> {
        let doc = self.enter("add_sketch")?;
        doc.component(component)?;
        let frame = match plane {
            PlaneRef::Principal(p) => Frame::on_plane(p, 0.0),
            PlaneRef::Construction(id) => *doc.planes.get(&id).ok_or(AuthorityError::NotFound {
                kind: "plane",
                id: id.0,
            })?,
        };
        let id = SketchId(doc.ids.next());
        doc.sketches.insert(
            id,
            SketchRecord {
                frame,
                curves: Vec::new(),
            },
        );
        doc.component_mut(component)?.sketches.push(id);
        Ok(id)
    }

    fn add_curve(
        &mut self,
        sketch: SketchId,
        curve: &InternalCurve,
        construction: bool,
    ) -> Result<CurveId, AuthorityError> {
        let doc = self.enter("add_curve")?;
        doc.sketch(sketch)?;
        check_curve(curve.curve())?;
        let id = CurveId(doc.ids.next());
        doc.curves.insert(
            id,
            CurveRecord {
                sketch,
                curve: curve.curve().clone(),
                construction,
            },
        );
        if let Some(record) = doc.sketches.get_mut(&sketch) {
            record.curves.push(id);
        }
        Ok(id)
    }

    fn add_constraint(
        &mut self,
        sketch: SketchId,
        constraint: SketchConstraint,
    ) -> Result<(), AuthorityError> {
        let doc = self.enter("add_constraint")?;
        let curve_id = match constraint {
            SketchConstraint::HorizontalOrVertical { curve } => curve,
            SketchConstraint::Diameter { curve, .. } => curve,
        };
        let record = doc
            .curves
            .get_mut(&curve_id)
            .filter(|c| c.sketch == sketch)
            .ok_or(AuthorityError::NotFound {
                kind: "curve",
                id: curve_id.0,
            })?;

        match (constraint, &mut record.curve) {
            (SketchConstraint::HorizontalOrVertical { .. }, PlanarCurve::Line { start, end }) => {
                if (end[0] - start[0]).abs() >= (end[1] - start[1]).abs() {
                    end[1] = start[1];
                } else {
                    end[0] = start[0];
                }
                Ok(())
            }
            (SketchConstraint::HorizontalOrVertical { .. }, _) => Err(AuthorityError::invalid(
                "horizontal/vertical constraint needs a line",
            )),
            (SketchConstraint::Diameter { value, .. }, _) if !(value > 0.0) => {
                Err(AuthorityError::invalid("diameter must be positive"))
            }
            (
                SketchConstraint::Diameter { value, .. },
                PlanarCurve::Circle { radius, .. } | PlanarCurve::Arc { radius, .. },
            ) => {
                *radius = value / 2.0;
                Ok(())
            }
            (SketchConstraint::Diameter { .. }, _) => Err(AuthorityError::invalid(
                "diameter constraint needs a circle or arc",
            )),
        }
    }

    fn extrude(
        &mut self,
        component: ComponentId,
        profiles: &[Profile],
        distance: f64,
        operation: FeatureOperation,
    ) -> Result<FeatureId, AuthorityError> {
        let doc = self.enter("extrude")?;
        if profiles.is_empty() {
            return Err(AuthorityError::invalid("no profiles to extrude"));
        }

        // Regions of one sketch that nest inside each other form one body.
        let mut groups: Vec<(SketchId, usize, Frame, Vec<ProfileShape>)> = Vec::new();
        for profile in profiles {
            let (frame, shape) = doc.shape(*profile)?;
            match groups
                .iter_mut()
                .find(|(s, root, _, _)| *s == profile.sketch && *root == shape.root)
            {
                Some((_, _, _, shapes)) => shapes.push(shape),
                None => groups.push((profile.sketch, shape.root, frame, vec![shape])),
            }
        }

        let mut tools = Vec::new();
        for (_, _, frame, shapes) in &groups {
            let refs: Vec<&ProfileShape> = shapes.iter().collect();
            tools.push(solid::prism(&mut doc.ids, component, frame, &refs, distance)?);
        }
        let id = doc.solid_feature(component, operation, "extrude", tools)?;
        debug!(feature = id.0, ?operation, distance, "mock extrude");
        Ok(id)
    }

    fn revolve(
        &mut self,
        component: ComponentId,
        profile: Profile,
        axis: Axis,
        angle: f64,
        operation: FeatureOperation,
    ) -> Result<FeatureId, AuthorityError> {
        let doc = self.enter("revolve")?;
        let (frame, shape) = doc.shape(profile)?;
        let tool = solid::revolution(&mut doc.ids, component, &frame, &shape, axis, angle)?;
        doc.solid_feature(component, operation, "revolve", vec![tool])
    }

    fn loft(
        &mut self,
        component: ComponentId,
        sections: &[Profile],
        solid: bool,
        operation: FeatureOperation,
    ) -> Result<FeatureId, AuthorityError> {
        let doc = self.enter("loft")?;
        let resolved = sections
            .iter()
            .map(|p| doc.shape(*p))
            .collect::<Result<Vec<_>, _>>()?;
        let refs: Vec<(Frame, &ProfileShape)> = resolved.iter().map(|(f, s)| (*f, s)).collect();
        let tool = solid::loft(&mut doc.ids, component, &refs, solid)?;
        doc.solid_feature(component, operation, "loft", vec![tool])
    }

    fn sweep(
        &mut self,
        component: ComponentId,
        profile: Profile,
        path: &[CurveId],
        operation: FeatureOperation,
    ) -> Result<FeatureId, AuthorityError> {
        let doc = self.enter("sweep")?;
        if path.is_empty() {
            return Err(AuthorityError::invalid("sweep path is empty"));
        }
        let (frame, shape) = doc.shape(profile)?;

        let mut points = Vec::new();
        let mut length = 0.0;
        for id in path {
            let record = doc.curves.get(id).ok_or(AuthorityError::NotFound {
                kind: "curve",
                id: id.0,
            })?;
            let path_frame = doc.sketch(record.sketch)?.frame;
            length += record.curve.length();
            points.extend(
                curve_points(&record.curve)
                    .into_iter()
                    .map(|p| path_frame.to_world(p)),
            );
        }
        let tool = solid::sweep(&mut doc.ids, component, &frame, &shape, &points, length)?;
        doc.solid_feature(component, operation, "sweep", vec![tool])
    }

    fn circular_pattern(
        &mut self,
        component: ComponentId,
        feature: FeatureId,
        axis: Axis,
        count: u32,
        total_angle: f64,
    ) -> Result<FeatureId, AuthorityError> {
        let doc = self.enter("circular_pattern")?;
        let step = angular_step(total_angle, count, FULL_TURN_TOLERANCE);
        doc.pattern(component, feature, count, "circular pattern", |i, p| {
            rotate_about_axis(p, axis, step * i as f64)
        })
    }

    fn rectangular_pattern(
        &mut self,
        component: ComponentId,
        feature: FeatureId,
        direction: Axis,
        count: u32,
        spacing: f64,
    ) -> Result<FeatureId, AuthorityError> {
        let doc = self.enter("rectangular_pattern")?;
        let along = direction.direction();
        doc.pattern(component, feature, count, "rectangular pattern", |i, p| {
            add(p, scale(along, spacing * i as f64))
        })
    }

    fn shell(
        &mut self,
        component: ComponentId,
        body: BodyId,
        faces_to_remove: &[FaceId],
        thickness: f64,
    ) -> Result<FeatureId, AuthorityError> {
        let doc = self.enter("shell")?;
        let mut updated = doc.owned_body(component, body)?.clone();
        updated.shell(&mut doc.ids, faces_to_remove, thickness)?;
        doc.bodies.insert(body, updated);
        doc.record_feature(component, Vec::new(), FeatureOperation::Join)
    }

    fn fillet(
        &mut self,
        component: ComponentId,
        edges: &[EdgeId],
        radius: f64,
    ) -> Result<FeatureId, AuthorityError> {
        self.enter("fillet")?
            .blend(component, edges, radius, Blend::Fillet)
    }

    fn chamfer(
        &mut self,
        component: ComponentId,
        edges: &[EdgeId],
        distance: f64,
    ) -> Result<FeatureId, AuthorityError> {
        self.enter("chamfer")?
            .blend(component, edges, distance, Blend::Chamfer)
    }

    fn combine(
        &mut self,
        component: ComponentId,
        target: BodyId,
        tools: &[BodyId],
        operation: CombineOperation,
        keep_tools: bool,
    ) -> Result<FeatureId, AuthorityError> {
        let doc = self.enter("combine")?;
        if tools.is_empty() {
            return Err(AuthorityError::invalid("combine needs at least one tool body"));
        }
        if tools.contains(&target) {
            return Err(AuthorityError::invalid(
                "the target body cannot also be a tool",
            ));
        }
        let mut updated = doc.owned_body(component, target)?.clone();
        for tool in tools {
            let tool = doc.owned_body(component, *tool)?.clone();
            match operation {
                CombineOperation::Join => updated.join(&tool),
                CombineOperation::Cut => {
                    if updated.bbox.intersection(&tool.bbox, 1e-9).is_some() {
                        updated.cut(&tool, "combine")?;
                    }
                }
                CombineOperation::Intersect => updated.intersect(&tool, "combine")?,
            }
        }
        doc.bodies.insert(target, updated);
        if !keep_tools {
            for tool in tools {
                doc.bodies.remove(tool);
            }
        }
        doc.record_feature(component, Vec::new(), FeatureOperation::Join)
    }

    fn add_component(&mut self, name: &str) -> Result<ComponentId, AuthorityError> {
        let doc = self.enter("add_component")?;
        let id = ComponentId(doc.ids.next());
        doc.components.insert(
            id,
            ComponentRecord {
                name: name.to_string(),
                transform: [0.0; 3],
                sketches: Vec::new(),
                features: Vec::new(),
            },
        );
        Ok(id)
    }

    fn set_transform(
        &mut self,
        component: ComponentId,
        translation: [f64; 3],
    ) -> Result<(), AuthorityError> {
        let doc = self.enter("set_transform")?;
        if component.is_root() {
            return Err(AuthorityError::invalid(
                "the root component has no occurrence to move",
            ));
        }
        doc.component_mut(component)?.transform = translation;
        Ok(())
    }

    fn add_joint(
        &mut self,
        first: ComponentId,
        second: ComponentId,
        kind: JointKind,
    ) -> Result<JointId, AuthorityError> {
        let doc = self.enter("add_joint")?;
        if first.is_root() || second.is_root() {
            return Err(AuthorityError::invalid("joints need two occurrences"));
        }
        if first == second {
            return Err(AuthorityError::invalid(
                "cannot joint a component to itself",
            ));
        }
        let anchor = doc.component(first)?.transform;
        // Joining origin points snaps the second occurrence onto the first.
        doc.component_mut(second)?.transform = anchor;
        let id = JointId(doc.ids.next());
        doc.joints.push(JointRecord {
            id,
            first,
            second,
            kind,
        });
        Ok(id)
    }

    fn analyze_interference(&mut self, bodies: &[BodyId]) -> Result<usize, AuthorityError> {
        let doc = self.enter("analyze_interference")?;
        let boxes = bodies
            .iter()
            .map(|id| doc.body(*id).map(|b| doc.world_bbox(b)))
            .collect::<Result<Vec<_>, _>>()?;
        let mut count = 0;
        for i in 0..boxes.len() {
            for j in (i + 1)..boxes.len() {
                if boxes[i].intersection(&boxes[j], 1e-9).is_some() {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    fn export(
        &mut self,
        format: ExportFormat,
        path: &Path,
        refinement: MeshRefinement,
    ) -> Result<(), AuthorityError> {
        let doc = self.enter("export")?;
        let bytes = match format {
            ExportFormat::Stl => {
                if doc.bodies.is_empty() {
                    return Err(AuthorityError::ExportFailed {
                        reason: "the design has no bodies".to_string(),
                    });
                }
                let mut mesh = RenderMesh::default();
                for body in doc.bodies.values() {
                    let world = doc.world_bbox(body);
                    let mm = BoundingBox3::new(
                        world.min.map(internal_to_mm),
                        world.max.map(internal_to_mm),
                    );
                    mesh.append(&tessellate_box(&mm, refinement.subdivisions()));
                }
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                encode_binary_stl(&mesh, &name)?
            }
            ExportFormat::Archive => write_archive(&doc.archive())?.into_bytes(),
        };
        std::fs::write(path, bytes).map_err(|e| AuthorityError::ExportFailed {
            reason: format!("{}: {}", path.display(), e),
        })?;
        debug!(path = %path.display(), ?format, "mock export written");
        Ok(())
    }
}

impl AuthorityIntrospect for MockAuthority {
    fn components(&self) -> Vec<ComponentId> {
        self.doc
            .as_ref()
            .map(|d| d.components.keys().copied().collect())
            .unwrap_or_default()
    }

    fn component_name(&self, component: ComponentId) -> Option<String> {
        self.doc
            .as_ref()?
            .components
            .get(&component)
            .map(|c| c.name.clone())
    }

    fn component_transform(&self, component: ComponentId) -> [f64; 3] {
        self.doc
            .as_ref()
            .map(|d| d.offset_of(component))
            .unwrap_or([0.0; 3])
    }

    fn sketch_profiles(&self, sketch: SketchId) -> Vec<Profile> {
        let Ok((_, shapes)) = self.doc().and_then(|d| d.shapes(sketch)) else {
            return Vec::new();
        };
        (0..shapes.len())
            .map(|index| Profile { sketch, index })
            .collect()
    }

    fn profile_area(&self, profile: Profile) -> Result<f64, AuthorityError> {
        self.doc()?.shape(profile).map(|(_, s)| s.area)
    }

    fn sketch_curves(&self, sketch: SketchId) -> Vec<CurveId> {
        self.doc()
            .and_then(|d| d.sketch(sketch))
            .map(|s| s.curves.clone())
            .unwrap_or_default()
    }

    fn bodies(&self, component: ComponentId) -> Vec<BodyId> {
        self.doc
            .as_ref()
            .map(|d| {
                d.bodies
                    .values()
                    .filter(|b| b.component == component)
                    .map(|b| b.id)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn body_edges(&self, body: BodyId) -> Vec<EdgeInfo> {
        self.doc()
            .and_then(|d| d.body(body).map(|b| b.edge_infos(d.offset_of(b.component))))
            .unwrap_or_default()
    }

    fn body_faces(&self, body: BodyId) -> Vec<FaceInfo> {
        self.doc()
            .and_then(|d| d.body(body).map(|b| b.face_infos(d.offset_of(b.component))))
            .unwrap_or_default()
    }

    fn physical_properties(&self, body: BodyId) -> Result<PhysicalProperties, AuthorityError> {
        self.doc()?.body(body).map(|b| b.physical())
    }

    fn bounding_box(&self, body: BodyId) -> Result<BoundingBox3, AuthorityError> {
        let doc = self.doc()?;
        doc.body(body).map(|b| doc.world_bbox(b))
    }

    fn mesh_stats(
        &self,
        body: BodyId,
        refinement: MeshRefinement,
    ) -> Result<MeshStats, AuthorityError> {
        self.doc()?.body(body)?;
        Ok(box_mesh_stats(refinement.subdivisions()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn internal(curve: PlanarCurve) -> InternalCurve {
        InternalCurve::from_mm(&curve)
    }

    /// Document with one sketch on XY holding the given millimetre curves.
    fn sketch_with(curves: Vec<PlanarCurve>) -> (MockAuthority, SketchId) {
        let mut mock = MockAuthority::new();
        mock.new_document("test").unwrap();
        let sketch = mock
            .add_sketch(ComponentId::ROOT, PlaneRef::Principal(PrincipalPlane::XY))
            .unwrap();
        for c in curves {
            mock.add_curve(sketch, &internal(c), false).unwrap();
        }
        (mock, sketch)
    }

    fn rect_mm(w: f64, h: f64) -> Vec<PlanarCurve> {
        let (x, y) = (w / 2.0, h / 2.0);
        vec![
            PlanarCurve::line([-x, -y], [x, -y]),
            PlanarCurve::line([x, -y], [x, y]),
            PlanarCurve::line([x, y], [-x, y]),
            PlanarCurve::line([-x, y], [-x, -y]),
        ]
    }

    #[test]
    fn calls_without_document_fail() {
        let mut mock = MockAuthority::new();
        let err = mock
            .add_sketch(ComponentId::ROOT, PlaneRef::Principal(PrincipalPlane::XY))
            .unwrap_err();
        assert!(matches!(err, AuthorityError::NoDocument));
        assert!(mock.components().is_empty());
    }

    #[test]
    fn rectangle_profile_area_in_internal_units() {
        let (mock, sketch) = sketch_with(rect_mm(20.0, 10.0));
        let profiles = mock.sketch_profiles(sketch);
        assert_eq!(profiles.len(), 1);
        assert_relative_eq!(mock.profile_area(profiles[0]).unwrap(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn extrude_creates_one_body() {
        let (mut mock, sketch) = sketch_with(rect_mm(20.0, 10.0));
        let profiles = mock.sketch_profiles(sketch);
        mock.extrude(ComponentId::ROOT, &profiles, 1.0, FeatureOperation::NewBody)
            .unwrap();
        let bodies = mock.bodies(ComponentId::ROOT);
        assert_eq!(bodies.len(), 1);
        let bb = mock.bounding_box(bodies[0]).unwrap();
        assert_relative_eq!(bb.extents()[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(bb.extents()[2], 1.0, epsilon = 1e-9);
        assert_relative_eq!(mock.physical_properties(bodies[0]).unwrap().volume, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn failed_cut_leaves_bodies_untouched() {
        let (mut mock, sketch) = sketch_with(vec![PlanarCurve::circle([0.0, 0.0], 5.0)]);
        let profiles = mock.sketch_profiles(sketch);
        mock.extrude(ComponentId::ROOT, &profiles, 1.0, FeatureOperation::NewBody)
            .unwrap();
        let body = mock.bodies(ComponentId::ROOT)[0];
        let before = mock.physical_properties(body).unwrap();

        let hole = mock
            .add_sketch(ComponentId::ROOT, PlaneRef::Principal(PrincipalPlane::XY))
            .unwrap();
        mock.add_curve(hole, &internal(PlanarCurve::circle([0.0, 0.0], 500.0)), false)
            .unwrap();
        let err = mock
            .extrude(ComponentId::ROOT, &mock.sketch_profiles(hole), 100.0, FeatureOperation::Cut)
            .unwrap_err();
        assert!(matches!(err, AuthorityError::FeatureFailed { .. }));
        assert_eq!(mock.physical_properties(body).unwrap(), before);
        assert_eq!(mock.features(ComponentId::ROOT).len(), 1);
    }

    #[test]
    fn construction_curves_do_not_make_profiles() {
        let mut mock = MockAuthority::new();
        mock.new_document("test").unwrap();
        let sketch = mock
            .add_sketch(ComponentId::ROOT, PlaneRef::Principal(PrincipalPlane::XY))
            .unwrap();
        for c in rect_mm(10.0, 10.0) {
            mock.add_curve(sketch, &internal(c), true).unwrap();
        }
        assert!(mock.sketch_profiles(sketch).is_empty());
        assert_eq!(mock.sketch_curves(sketch).len(), 4);
    }

    #[test]
    fn diameter_constraint_resizes_circle() {
        let (mut mock, sketch) = sketch_with(vec![PlanarCurve::circle([0.0, 0.0], 5.0)]);
        let curve = mock.sketch_curves(sketch)[0];
        mock.add_constraint(sketch, SketchConstraint::Diameter { curve, value: 4.0 })
            .unwrap();
        assert_eq!(mock.curve(curve).unwrap().0, PlanarCurve::circle([0.0, 0.0], 2.0));
        let err = mock.add_constraint(sketch, SketchConstraint::HorizontalOrVertical { curve });
        assert!(err.is_err());
    }

    #[test]
    fn offset_plane_lifts_the_body() {
        let mut mock = MockAuthority::new();
        mock.new_document("test").unwrap();
        let plane = mock
            .add_offset_plane(ComponentId::ROOT, PrincipalPlane::XY, 3.0)
            .unwrap();
        let sketch = mock
            .add_sketch(ComponentId::ROOT, PlaneRef::Construction(plane))
            .unwrap();
        for c in rect_mm(10.0, 10.0) {
            mock.add_curve(sketch, &internal(c), false).unwrap();
        }
        let profiles = mock.sketch_profiles(sketch);
        mock.extrude(ComponentId::ROOT, &profiles, 1.0, FeatureOperation::NewBody)
            .unwrap();
        let bb = mock.bounding_box(mock.bodies(ComponentId::ROOT)[0]).unwrap();
        assert_relative_eq!(bb.min[2], 3.0, epsilon = 1e-9);
    }

    #[test]
    fn injected_host_fatal_fires_once() {
        let mut mock = MockAuthority::new();
        mock.inject_fault("new_document", Fault::HostFatal);
        assert!(mock.new_document("a").unwrap_err().is_host_fatal());
        assert!(mock.new_document("a").is_ok());
    }

    #[test]
    fn mesh_stats_follow_refinement() {
        let (mut mock, sketch) = sketch_with(rect_mm(10.0, 10.0));
        let profiles = mock.sketch_profiles(sketch);
        mock.extrude(ComponentId::ROOT, &profiles, 1.0, FeatureOperation::NewBody)
            .unwrap();
        let body = mock.bodies(ComponentId::ROOT)[0];
        let low = mock.mesh_stats(body, MeshRefinement::Low).unwrap();
        let high = mock.mesh_stats(body, MeshRefinement::High).unwrap();
        assert_eq!(low.triangle_count, 12);
        assert!(high.triangle_count > low.triangle_count);
    }
}
