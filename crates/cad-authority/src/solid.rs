//! Mock solid bodies.
//!
//! A body is an axis-aligned box in component space carrying the volume,
//! area, edges and faces a real solid of the same recipe would roughly
//! have. Feature builders produce bodies from sketch profiles; modifiers
//! apply booleans, blends and shells to them in place.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, SQRT_2, TAU};

use profile_synth::Point2;

use crate::profiles::{ProfileShape, SketchLoop};
use crate::types::*;

const EPS: f64 = 1e-9;

/// Angular samples used to bound revolved geometry.
const REVOLVE_SAMPLES: usize = 64;

/// Sequential id source shared by every entity in a document.
#[derive(Debug)]
pub(crate) struct IdAlloc {
    next: u64,
}

impl IdAlloc {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

// ── Vector helpers ──────────────────────────────────────────────────────────

pub(crate) fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub(crate) fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub(crate) fn scale(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

pub(crate) fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub(crate) fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

/// Rotate `p` about an origin axis by `angle` radians.
pub(crate) fn rotate_about_axis(p: [f64; 3], axis: Axis, angle: f64) -> [f64; 3] {
    let (s, c) = angle.sin_cos();
    match axis {
        Axis::X => [p[0], p[1] * c - p[2] * s, p[1] * s + p[2] * c],
        Axis::Y => [p[0] * c + p[2] * s, p[1], -p[0] * s + p[2] * c],
        Axis::Z => [p[0] * c - p[1] * s, p[0] * s + p[1] * c, p[2]],
    }
}

fn bounds(points: impl IntoIterator<Item = [f64; 3]>) -> BoundingBox3 {
    let mut bb = BoundingBox3::new([f64::INFINITY; 3], [f64::NEG_INFINITY; 3]);
    for p in points {
        bb = bb.including(p);
    }
    bb
}

fn contains_point(bb: &BoundingBox3, p: [f64; 3]) -> bool {
    bb.contains(&BoundingBox3::new(p, p), 1e-7)
}

// ── Sketch frames ───────────────────────────────────────────────────────────

/// Placement of a sketch plane in component space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Frame {
    pub origin: [f64; 3],
    pub u: [f64; 3],
    pub v: [f64; 3],
    pub normal: [f64; 3],
}

impl Frame {
    pub fn on_plane(plane: PrincipalPlane, offset: f64) -> Self {
        let (u, v) = plane.axes();
        let normal = cross(u, v);
        Frame {
            origin: scale(normal, offset),
            u,
            v,
            normal,
        }
    }

    pub fn to_world(&self, p: Point2) -> [f64; 3] {
        add(self.origin, add(scale(self.u, p[0]), scale(self.v, p[1])))
    }

    /// Signed distance of the plane from the origin along its normal.
    pub fn offset(&self) -> f64 {
        dot(self.origin, self.normal)
    }
}

// ── Bodies ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub(crate) struct MockEdge {
    pub id: EdgeId,
    pub start: [f64; 3],
    pub end: [f64; 3],
    pub length: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct MockFace {
    pub id: FaceId,
    pub area: f64,
    pub bbox: BoundingBox3,
}

#[derive(Debug, Clone)]
pub(crate) struct MockBody {
    pub id: BodyId,
    pub component: ComponentId,
    /// Component-space bounds.
    pub bbox: BoundingBox3,
    pub volume: f64,
    pub area: f64,
    /// Area of one planar end cap, for prisms. Zero otherwise.
    pub cap_area: f64,
    pub edges: Vec<MockEdge>,
    pub faces: Vec<MockFace>,
}

/// Collects edges and faces while a body is being built.
struct Topology<'a> {
    ids: &'a mut IdAlloc,
    edges: Vec<MockEdge>,
    faces: Vec<MockFace>,
}

impl<'a> Topology<'a> {
    fn new(ids: &'a mut IdAlloc) -> Self {
        Self {
            ids,
            edges: Vec::new(),
            faces: Vec::new(),
        }
    }

    fn edge(&mut self, start: [f64; 3], end: [f64; 3], length: f64) {
        let id = EdgeId(self.ids.next());
        self.edges.push(MockEdge {
            id,
            start,
            end,
            length,
        });
    }

    fn face(&mut self, area: f64, bbox: BoundingBox3) {
        let id = FaceId(self.ids.next());
        self.faces.push(MockFace { id, area, bbox });
    }

    /// Edges along every curve of `lp`, placed by `place`.
    fn loop_edges(&mut self, lp: &SketchLoop, place: impl Fn(Point2) -> [f64; 3]) {
        if lp.corners.is_empty() {
            let p = place(lp.polygon[0]);
            self.edge(p, p, lp.perimeter);
            return;
        }
        let k = lp.corners.len();
        for i in 0..k {
            let a = place(lp.corners[i]);
            let b = place(lp.corners[(i + 1) % k]);
            self.edge(a, b, lp.lengths[i]);
        }
    }

    fn finish(
        self,
        component: ComponentId,
        bbox: BoundingBox3,
        volume: f64,
        area: f64,
        cap_area: f64,
    ) -> MockBody {
        let id = BodyId(self.ids.next());
        MockBody {
            id,
            component,
            bbox,
            volume,
            area,
            cap_area,
            edges: self.edges,
            faces: self.faces,
        }
    }
}

/// Loops bounding `shapes`, each once.
fn unique_loops<'s>(shapes: &[&'s ProfileShape]) -> Vec<&'s SketchLoop> {
    let mut out: Vec<&SketchLoop> = Vec::new();
    for &shape in shapes {
        for lp in shape.loops() {
            if !out.iter().any(|seen| seen.curves == lp.curves) {
                out.push(lp);
            }
        }
    }
    out
}

/// Prism swept from `shapes` along the frame normal by a signed distance.
pub(crate) fn prism(
    ids: &mut IdAlloc,
    component: ComponentId,
    frame: &Frame,
    shapes: &[&ProfileShape],
    distance: f64,
) -> Result<MockBody, AuthorityError> {
    if distance.abs() < EPS {
        return Err(AuthorityError::feature(
            "extrude",
            "extent distance must be non-zero",
        ));
    }
    let depth = distance.abs();
    let shift = scale(frame.normal, distance);
    let at_top = |p: Point2| add(frame.to_world(p), shift);

    let outline: Vec<[f64; 3]> = shapes
        .iter()
        .flat_map(|s| s.outer.polygon.iter().map(|p| frame.to_world(*p)))
        .collect();
    let bbox = bounds(outline.iter().flat_map(|p| [*p, add(*p, shift)]));

    let cap_area: f64 = shapes.iter().map(|s| s.area).sum();
    let loops = unique_loops(shapes);
    let perimeter: f64 = loops.iter().map(|l| l.perimeter).sum();

    let mut topo = Topology::new(ids);
    topo.face(cap_area, bounds(outline.iter().map(|p| add(*p, shift))));
    topo.face(cap_area, bounds(outline.iter().copied()));
    for lp in &loops {
        topo.loop_edges(lp, |p| frame.to_world(p));
        topo.loop_edges(lp, &at_top);
        let k = lp.corners.len();
        for i in 0..k {
            let a = frame.to_world(lp.corners[i]);
            topo.edge(a, add(a, shift), depth);
        }
        if k == 0 {
            let ring: Vec<[f64; 3]> = lp.polygon.iter().map(|p| frame.to_world(*p)).collect();
            topo.face(
                lp.perimeter * depth,
                bounds(ring.iter().flat_map(|p| [*p, add(*p, shift)])),
            );
        } else {
            for i in 0..k {
                let a = frame.to_world(lp.corners[i]);
                let b = frame.to_world(lp.corners[(i + 1) % k]);
                topo.face(
                    lp.lengths[i] * depth,
                    bounds([a, b, add(a, shift), add(b, shift)]),
                );
            }
        }
    }

    Ok(topo.finish(
        component,
        bbox,
        cap_area * depth,
        2.0 * cap_area + perimeter * depth,
        cap_area,
    ))
}

/// Solid of revolution of one profile about an origin axis lying in the
/// sketch plane.
pub(crate) fn revolution(
    ids: &mut IdAlloc,
    component: ComponentId,
    frame: &Frame,
    shape: &ProfileShape,
    axis: Axis,
    angle: f64,
) -> Result<MockBody, AuthorityError> {
    if angle <= EPS {
        return Err(AuthorityError::feature("revolve", "angle must be positive"));
    }
    let angle = angle.min(TAU);
    let dir = axis.direction();
    if dot(dir, frame.normal).abs() > EPS || frame.offset().abs() > EPS {
        return Err(AuthorityError::feature(
            "revolve",
            "axis does not lie in the sketch plane",
        ));
    }

    let axial2 = [dot(dir, frame.u), dot(dir, frame.v)];
    let signed_radius = |p: Point2| axial2[0] * p[1] - axial2[1] * p[0];
    let (lo, hi) = shape
        .outer
        .polygon
        .iter()
        .map(|p| signed_radius(*p))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
            (lo.min(r), hi.max(r))
        });
    if lo < -EPS && hi > EPS {
        return Err(AuthorityError::feature(
            "revolve",
            "profile crosses the revolve axis",
        ));
    }
    let side = if hi > EPS { 1.0 } else { -1.0 };
    let radius = |p: Point2| side * signed_radius(p);

    let e1 = scale(
        add(scale(frame.u, -axial2[1]), scale(frame.v, axial2[0])),
        side,
    );
    let e2 = cross(dir, e1);
    let place = |p: Point2, theta: f64| {
        let along = axial2[0] * p[0] + axial2[1] * p[1];
        let (s, c) = theta.sin_cos();
        add(
            scale(dir, along),
            scale(add(scale(e1, c), scale(e2, s)), radius(p)),
        )
    };
    let sweep_bounds = |pts: &[Point2]| {
        bounds((0..=REVOLVE_SAMPLES).flat_map(|k| {
            let theta = angle * k as f64 / REVOLVE_SAMPLES as f64;
            pts.iter().map(|p| place(*p, theta)).collect::<Vec<_>>()
        }))
    };

    let full_turn = angle > TAU - 1e-3;
    let centroid_radius = radius(shape.centroid);
    let volume = shape.area * centroid_radius * angle;
    let mut area = shape.perimeter * centroid_radius * angle;
    if !full_turn {
        area += 2.0 * shape.area;
    }

    let bbox = sweep_bounds(&shape.outer.polygon);
    let mut topo = Topology::new(ids);
    for lp in shape.loops() {
        let k = lp.corners.len();
        if k == 0 {
            topo.face(lp.perimeter * radius(lp.centroid) * angle, sweep_bounds(&lp.polygon));
            continue;
        }
        for i in 0..k {
            let a = lp.corners[i];
            let b = lp.corners[(i + 1) % k];
            let r = radius(a);
            if r > EPS {
                let end = if full_turn { 0.0 } else { angle };
                topo.edge(place(a, 0.0), place(a, end), r * angle);
            }
            if radius(a) <= EPS && radius(b) <= EPS {
                continue;
            }
            let mean = (radius(a) + radius(b)) / 2.0;
            topo.face(lp.lengths[i] * mean * angle, sweep_bounds(&[a, b]));
            if !full_turn {
                topo.edge(place(a, 0.0), place(b, 0.0), lp.lengths[i]);
                topo.edge(place(a, angle), place(b, angle), lp.lengths[i]);
            }
        }
    }
    if !full_turn {
        let start: Vec<[f64; 3]> = shape.outer.polygon.iter().map(|p| place(*p, 0.0)).collect();
        let end: Vec<[f64; 3]> = shape
            .outer
            .polygon
            .iter()
            .map(|p| place(*p, angle))
            .collect();
        topo.face(shape.area, bounds(start));
        topo.face(shape.area, bounds(end));
    }

    Ok(topo.finish(component, bbox, volume, area, 0.0))
}

/// Loft through two or more planar sections, in order.
pub(crate) fn loft(
    ids: &mut IdAlloc,
    component: ComponentId,
    sections: &[(Frame, &ProfileShape)],
    solid: bool,
) -> Result<MockBody, AuthorityError> {
    if sections.len() < 2 {
        return Err(AuthorityError::feature(
            "loft",
            "at least two sections are required",
        ));
    }
    let (f0, _) = sections[0];
    let coplanar = sections.iter().all(|(f, _)| {
        norm(cross(f.normal, f0.normal)) < EPS
            && (dot(f.origin, f0.normal) - dot(f0.origin, f0.normal)).abs() < EPS
    });
    if coplanar {
        return Err(AuthorityError::feature("loft", "sections are coplanar"));
    }

    let outlines: Vec<Vec<[f64; 3]>> = sections
        .iter()
        .map(|(f, s)| s.outer.polygon.iter().map(|p| f.to_world(*p)).collect())
        .collect();
    let bbox = bounds(outlines.iter().flatten().copied());

    let mut topo = Topology::new(ids);
    let mut volume = 0.0;
    let mut lateral = 0.0;
    for (i, pair) in sections.windows(2).enumerate() {
        let (fa, a) = pair[0];
        let (fb, b) = pair[1];
        let h = norm(sub(fb.to_world(b.centroid), fa.to_world(a.centroid)));
        volume += h / 3.0 * (a.area + b.area + (a.area * b.area).sqrt());
        let span = (a.perimeter + b.perimeter) / 2.0 * h;
        lateral += span;
        topo.face(
            span,
            bounds(outlines[i].iter().chain(outlines[i + 1].iter()).copied()),
        );
    }
    for (frame, shape) in sections {
        for lp in shape.loops() {
            topo.loop_edges(lp, |p| frame.to_world(p));
        }
    }

    let (first, last) = (sections[0].1, sections[sections.len() - 1].1);
    let (volume, area) = if solid {
        topo.face(first.area, bounds(outlines[0].iter().copied()));
        topo.face(
            last.area,
            bounds(outlines[outlines.len() - 1].iter().copied()),
        );
        (volume, lateral + first.area + last.area)
    } else {
        (0.0, lateral)
    };

    Ok(topo.finish(component, bbox, volume, area, 0.0))
}

/// Sweep one profile along a sampled path.
pub(crate) fn sweep(
    ids: &mut IdAlloc,
    component: ComponentId,
    frame: &Frame,
    shape: &ProfileShape,
    path: &[[f64; 3]],
    path_length: f64,
) -> Result<MockBody, AuthorityError> {
    if path.len() < 2 || path_length < EPS {
        return Err(AuthorityError::feature("sweep", "path has no length"));
    }
    let reach = shape
        .outer
        .polygon
        .iter()
        .map(|p| ((p[0] - shape.centroid[0]).powi(2) + (p[1] - shape.centroid[1]).powi(2)).sqrt())
        .fold(0.0, f64::max);
    let profile: Vec<[f64; 3]> = shape.outer.polygon.iter().map(|p| frame.to_world(*p)).collect();
    let tube = path.iter().flat_map(|p| {
        [
            sub(*p, [reach, reach, reach]),
            add(*p, [reach, reach, reach]),
        ]
    });
    let bbox = bounds(profile.iter().copied().chain(tube));
    let travel = sub(path[path.len() - 1], path[0]);

    let mut topo = Topology::new(ids);
    topo.face(shape.area, bounds(profile.iter().copied()));
    topo.face(shape.area, bounds(profile.iter().map(|p| add(*p, travel))));
    for lp in shape.loops() {
        topo.loop_edges(lp, |p| frame.to_world(p));
        topo.loop_edges(lp, |p| add(frame.to_world(p), travel));
        for len in &lp.lengths {
            topo.face(len * path_length, bbox);
        }
    }

    Ok(topo.finish(
        component,
        bbox,
        shape.area * path_length,
        shape.perimeter * path_length + 2.0 * shape.area,
        0.0,
    ))
}

// ── Modifiers ───────────────────────────────────────────────────────────────

/// Edge treatments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Blend {
    Fillet,
    Chamfer,
}

impl Blend {
    fn name(self) -> &'static str {
        match self {
            Blend::Fillet => "fillet",
            Blend::Chamfer => "chamfer",
        }
    }

    /// Material removed per unit length per size².
    fn volume_factor(self) -> f64 {
        match self {
            Blend::Fillet => 1.0 - FRAC_PI_4,
            Blend::Chamfer => 0.5,
        }
    }

    /// Area of the new face per unit length per size.
    fn face_factor(self) -> f64 {
        match self {
            Blend::Fillet => FRAC_PI_2,
            Blend::Chamfer => SQRT_2,
        }
    }
}

impl MockBody {
    pub fn physical(&self) -> PhysicalProperties {
        PhysicalProperties {
            volume: self.volume,
            area: self.area,
        }
    }

    /// Fraction of the bounding box the body fills.
    fn fill(&self) -> f64 {
        let bv = self.bbox.volume();
        if bv > EPS {
            (self.volume / bv).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Estimated shared volume with `other`.
    pub fn overlap(&self, other: &MockBody) -> f64 {
        self.bbox
            .intersection(&other.bbox, EPS)
            .map(|i| i.volume() * self.fill().min(other.fill()))
            .unwrap_or(0.0)
    }

    pub fn touches(&self, other: &MockBody) -> bool {
        self.bbox.touches(&other.bbox, 1e-7)
    }

    /// Copy with fresh ids and every point mapped through `map`.
    pub fn transformed(
        &self,
        ids: &mut IdAlloc,
        map: impl Fn([f64; 3]) -> [f64; 3],
    ) -> MockBody {
        let remap_box = |bb: &BoundingBox3| bounds(bb.corners().iter().map(|c| map(*c)));
        let edges = self
            .edges
            .iter()
            .map(|e| MockEdge {
                id: EdgeId(ids.next()),
                start: map(e.start),
                end: map(e.end),
                length: e.length,
            })
            .collect();
        let faces = self
            .faces
            .iter()
            .map(|f| MockFace {
                id: FaceId(ids.next()),
                area: f.area,
                bbox: remap_box(&f.bbox),
            })
            .collect();
        MockBody {
            id: BodyId(ids.next()),
            component: self.component,
            bbox: remap_box(&self.bbox),
            volume: self.volume,
            area: self.area,
            cap_area: self.cap_area,
            edges,
            faces,
        }
    }

    /// Union `tool` into this body.
    pub fn join(&mut self, tool: &MockBody) {
        let shared = self.overlap(tool);
        let hidden = if tool.volume > EPS {
            (shared / tool.volume).min(1.0)
        } else {
            0.0
        };
        self.volume += tool.volume - shared;
        self.area += tool.area * (1.0 - hidden);
        self.bbox = self.bbox.union(&tool.bbox);
        self.edges.extend(tool.edges.iter().cloned());
        self.faces.extend(tool.faces.iter().cloned());
    }

    /// Subtract `tool`. The body must survive the cut.
    pub fn cut(&mut self, tool: &MockBody, feature: &'static str) -> Result<(), AuthorityError> {
        if tool.bbox.contains(&self.bbox, EPS) {
            return Err(AuthorityError::feature(
                feature,
                "cut would remove the entire body",
            ));
        }
        let removed = self.overlap(tool);
        if removed >= self.volume - EPS {
            return Err(AuthorityError::feature(
                feature,
                "cut would remove the entire body",
            ));
        }
        let inside = match self.bbox.intersection(&tool.bbox, EPS) {
            Some(i) if tool.bbox.volume() > EPS => i.volume() / tool.bbox.volume(),
            _ => 0.0,
        };
        self.volume -= removed;
        self.area += (tool.area - 2.0 * tool.cap_area).max(0.0) * inside;
        let bbox = self.bbox;
        self.edges.extend(
            tool.edges
                .iter()
                .filter(|e| contains_point(&bbox, e.start) && contains_point(&bbox, e.end))
                .cloned(),
        );
        self.faces.extend(
            tool.faces
                .iter()
                .filter(|f| f.bbox.touches(&bbox, 1e-7))
                .cloned(),
        );
        Ok(())
    }

    /// Keep only the region shared with `tool`.
    pub fn intersect(&mut self, tool: &MockBody, feature: &'static str) -> Result<(), AuthorityError> {
        let Some(common) = self.bbox.intersection(&tool.bbox, EPS) else {
            return Err(AuthorityError::feature(feature, "bodies do not overlap"));
        };
        let shared = self.overlap(tool);
        let ratio = if self.volume > EPS { shared / self.volume } else { 0.0 };
        self.volume = shared;
        self.area *= ratio.cbrt().powi(2);
        self.bbox = common;
        self.edges
            .retain(|e| contains_point(&common, e.start) && contains_point(&common, e.end));
        self.faces.retain(|f| f.bbox.touches(&common, 1e-7));
        Ok(())
    }

    /// Round or bevel the listed edges of this body.
    pub fn blend(
        &mut self,
        ids: &mut IdAlloc,
        edges: &[EdgeId],
        size: f64,
        blend: Blend,
    ) -> Result<(), AuthorityError> {
        let name = blend.name();
        if size <= 0.0 {
            return Err(AuthorityError::feature(name, "size must be positive"));
        }
        let min_extent = self.bbox.extents().iter().copied().fold(f64::INFINITY, f64::min);
        if 2.0 * size >= min_extent {
            return Err(AuthorityError::feature(
                name,
                format!("size {size} is too large for the body"),
            ));
        }

        let mut total = 0.0;
        let mut replaced = Vec::new();
        for id in edges {
            let pos = self
                .edges
                .iter()
                .position(|e| e.id == *id)
                .ok_or(AuthorityError::NotFound {
                    kind: "edge",
                    id: id.0,
                })?;
            let edge = self.edges.remove(pos);
            total += edge.length;
            replaced.push(edge);
        }

        let removed = blend.volume_factor() * size * size * total;
        if removed >= self.volume {
            return Err(AuthorityError::feature(name, "blend consumes the body"));
        }
        self.volume -= removed;
        self.area = (self.area + (blend.face_factor() - 2.0) * size * total).max(0.0);
        for edge in replaced {
            for _ in 0..2 {
                self.edges.push(MockEdge {
                    id: EdgeId(ids.next()),
                    ..edge.clone()
                });
            }
            self.faces.push(MockFace {
                id: FaceId(ids.next()),
                area: blend.face_factor() * size * edge.length,
                bbox: bounds([edge.start, edge.end]),
            });
        }
        Ok(())
    }

    /// Hollow the body with walls `thickness` thick, opening the listed faces.
    pub fn shell(
        &mut self,
        ids: &mut IdAlloc,
        remove: &[FaceId],
        thickness: f64,
    ) -> Result<(), AuthorityError> {
        if thickness <= 0.0 {
            return Err(AuthorityError::feature("shell", "thickness must be positive"));
        }
        let ext = self.bbox.extents();
        let min_extent = ext.iter().copied().fold(f64::INFINITY, f64::min);
        if 2.0 * thickness >= min_extent {
            return Err(AuthorityError::feature(
                "shell",
                format!("thickness {thickness} is too large for the body"),
            ));
        }

        let mut inner = [
            ext[0] - 2.0 * thickness,
            ext[1] - 2.0 * thickness,
            ext[2] - 2.0 * thickness,
        ];
        let mut removed_area = 0.0;
        for id in remove {
            let face = self
                .faces
                .iter()
                .find(|f| f.id == *id)
                .ok_or(AuthorityError::NotFound {
                    kind: "face",
                    id: id.0,
                })?;
            removed_area += face.area;
            let fe = face.bbox.extents();
            for i in 0..3 {
                let on_side = (face.bbox.max[i] - self.bbox.max[i]).abs() < 1e-7
                    || (face.bbox.min[i] - self.bbox.min[i]).abs() < 1e-7;
                if fe[i] < 1e-7 && on_side {
                    inner[i] = ext[i] - thickness;
                }
            }
        }

        let ratio: f64 = (0..3).map(|i| inner[i] / ext[i]).product();
        let area_ratio = ratio.cbrt().powi(2);
        self.volume -= self.volume * ratio;
        let outer_area = (self.area - removed_area).max(0.0);
        self.area = outer_area + outer_area * area_ratio;

        self.faces.retain(|f| !remove.contains(&f.id));
        let inner_faces: Vec<MockFace> = self
            .faces
            .iter()
            .map(|f| MockFace {
                id: FaceId(ids.next()),
                area: f.area * area_ratio,
                bbox: f.bbox,
            })
            .collect();
        self.faces.extend(inner_faces);
        let inner_edges: Vec<MockEdge> = self
            .edges
            .iter()
            .map(|e| MockEdge {
                id: EdgeId(ids.next()),
                ..e.clone()
            })
            .collect();
        self.edges.extend(inner_edges);
        Ok(())
    }

    pub fn edge_infos(&self, offset: [f64; 3]) -> Vec<EdgeInfo> {
        self.edges
            .iter()
            .map(|e| EdgeInfo {
                id: e.id,
                start: add(e.start, offset),
                end: add(e.end, offset),
                length: e.length,
            })
            .collect()
    }

    pub fn face_infos(&self, offset: [f64; 3]) -> Vec<FaceInfo> {
        self.faces
            .iter()
            .map(|f| FaceInfo {
                id: f.id,
                area: f.area,
                bbox: f.bbox.translated(offset),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::find_profiles;
    use approx::assert_relative_eq;
    use profile_synth::PlanarCurve;

    fn shapes(curves: Vec<PlanarCurve>) -> Vec<ProfileShape> {
        let tagged: Vec<(PlanarCurve, bool)> = curves.into_iter().map(|c| (c, false)).collect();
        find_profiles(&tagged)
    }

    fn unit_square() -> Vec<ProfileShape> {
        shapes(vec![
            PlanarCurve::line([0.0, 0.0], [1.0, 0.0]),
            PlanarCurve::line([1.0, 0.0], [1.0, 1.0]),
            PlanarCurve::line([1.0, 1.0], [0.0, 1.0]),
            PlanarCurve::line([0.0, 1.0], [0.0, 0.0]),
        ])
    }

    fn cube(ids: &mut IdAlloc, size: f64) -> MockBody {
        let sq = unit_square();
        let frame = Frame::on_plane(PrincipalPlane::XY, 0.0);
        let mut body = prism(ids, ComponentId::ROOT, &frame, &[&sq[0]], size).unwrap();
        if size != 1.0 {
            body = body.transformed(ids, |p| [p[0] * size, p[1] * size, p[2]]);
            body.volume = size.powi(3);
        }
        body
    }

    #[test]
    fn unit_cube_prism() {
        let mut ids = IdAlloc::new();
        let body = cube(&mut ids, 1.0);
        assert_relative_eq!(body.volume, 1.0, epsilon = 1e-9);
        assert_relative_eq!(body.area, 6.0, epsilon = 1e-9);
        assert_eq!(body.edges.len(), 12);
        assert_eq!(body.faces.len(), 6);
        assert_relative_eq!(body.bbox.max[2], 1.0);
    }

    #[test]
    fn negative_extrude_goes_below_the_plane() {
        let mut ids = IdAlloc::new();
        let sq = unit_square();
        let frame = Frame::on_plane(PrincipalPlane::XY, 0.0);
        let body = prism(&mut ids, ComponentId::ROOT, &frame, &[&sq[0]], -2.0).unwrap();
        assert_relative_eq!(body.bbox.min[2], -2.0);
        assert_relative_eq!(body.volume, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn xz_frame_extrudes_along_negative_y() {
        let frame = Frame::on_plane(PrincipalPlane::XZ, 0.0);
        assert_eq!(frame.normal, [0.0, -1.0, 0.0]);
        assert_eq!(frame.to_world([1.0, 2.0]), [1.0, 0.0, 2.0]);
    }

    #[test]
    fn cylinder_has_two_circular_edges() {
        let mut ids = IdAlloc::new();
        let disk = shapes(vec![PlanarCurve::circle([0.0, 0.0], 0.5)]);
        let frame = Frame::on_plane(PrincipalPlane::XY, 0.0);
        let body = prism(&mut ids, ComponentId::ROOT, &frame, &[&disk[0]], 1.0).unwrap();
        assert_eq!(body.edges.len(), 2);
        assert_relative_eq!(body.edges[0].length, TAU * 0.5, epsilon = 1e-9);
        assert_relative_eq!(body.volume, disk[0].area, epsilon = 1e-9);
    }

    #[test]
    fn revolve_rectangle_about_y_is_a_tube() {
        let mut ids = IdAlloc::new();
        let ring = shapes(vec![
            PlanarCurve::line([1.0, 0.0], [2.0, 0.0]),
            PlanarCurve::line([2.0, 0.0], [2.0, 1.0]),
            PlanarCurve::line([2.0, 1.0], [1.0, 1.0]),
            PlanarCurve::line([1.0, 1.0], [1.0, 0.0]),
        ]);
        let frame = Frame::on_plane(PrincipalPlane::XY, 0.0);
        let body = revolution(&mut ids, ComponentId::ROOT, &frame, &ring[0], Axis::Y, TAU).unwrap();
        // Pappus: area 1 at centroid radius 1.5.
        assert_relative_eq!(body.volume, TAU * 1.5, epsilon = 1e-9);
        assert_relative_eq!(body.bbox.max[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(body.bbox.min[2], -2.0, epsilon = 1e-2);
        assert_relative_eq!(body.bbox.max[1], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn revolve_rejects_out_of_plane_axis_and_crossing_profile() {
        let mut ids = IdAlloc::new();
        let sq = unit_square();
        let frame = Frame::on_plane(PrincipalPlane::XY, 0.0);
        assert!(revolution(&mut ids, ComponentId::ROOT, &frame, &sq[0], Axis::Z, TAU).is_err());

        let straddle = shapes(vec![PlanarCurve::circle([0.0, 0.0], 1.0)]);
        assert!(
            revolution(&mut ids, ComponentId::ROOT, &frame, &straddle[0], Axis::X, TAU).is_err()
        );
    }

    #[test]
    fn loft_between_offset_squares_is_a_prism() {
        let mut ids = IdAlloc::new();
        let sq = unit_square();
        let bottom = Frame::on_plane(PrincipalPlane::XY, 0.0);
        let top = Frame::on_plane(PrincipalPlane::XY, 3.0);
        let body = loft(&mut ids, ComponentId::ROOT, &[(bottom, &sq[0]), (top, &sq[0])], true).unwrap();
        assert_relative_eq!(body.volume, 3.0, epsilon = 1e-9);
        assert!(loft(&mut ids, ComponentId::ROOT, &[(bottom, &sq[0]), (bottom, &sq[0])], true).is_err());
    }

    #[test]
    fn cut_through_the_middle_keeps_the_body() {
        let mut ids = IdAlloc::new();
        let mut plate = cube(&mut ids, 10.0);
        let hole = shapes(vec![PlanarCurve::circle([5.0, 5.0], 1.0)]);
        let frame = Frame::on_plane(PrincipalPlane::XY, 0.0);
        let tool = prism(&mut ids, ComponentId::ROOT, &frame, &[&hole[0]], 100.0).unwrap();
        let before = plate.volume;
        plate.cut(&tool, "extrude").unwrap();
        assert!(plate.volume < before);
        assert!(plate.volume > before * 0.9);
    }

    #[test]
    fn cut_covering_the_body_fails() {
        let mut ids = IdAlloc::new();
        let mut plate = cube(&mut ids, 1.0);
        let big = shapes(vec![PlanarCurve::circle([0.0, 0.0], 50.0)]);
        let frame = Frame::on_plane(PrincipalPlane::XY, 0.0);
        let tool = prism(&mut ids, ComponentId::ROOT, &frame, &[&big[0]], 100.0).unwrap();
        let err = plate.cut(&tool, "hole").unwrap_err();
        assert!(err.to_string().contains("entire body"));
    }

    #[test]
    fn chamfer_replaces_edges_and_adds_faces() {
        let mut ids = IdAlloc::new();
        let mut body = cube(&mut ids, 1.0);
        let edge = body.edges[0].id;
        body.blend(&mut ids, &[edge], 0.1, Blend::Chamfer).unwrap();
        assert_eq!(body.edges.len(), 13);
        assert_eq!(body.faces.len(), 7);
        assert_relative_eq!(body.volume, 1.0 - 0.5 * 0.01, epsilon = 1e-9);
        assert!(body.blend(&mut ids, &[EdgeId(9999)], 0.1, Blend::Fillet).is_err());
        let other = body.edges[1].id;
        assert!(body.blend(&mut ids, &[other], 0.6, Blend::Fillet).is_err());
    }

    #[test]
    fn shell_open_top_keeps_floor() {
        let mut ids = IdAlloc::new();
        let mut body = cube(&mut ids, 10.0);
        let top = body.faces[0].id;
        body.shell(&mut ids, &[top], 1.0).unwrap();
        // Inner cavity 8 x 8 x 9.
        assert_relative_eq!(body.volume, 1000.0 - 576.0, epsilon = 1e-6);
        assert!(!body.faces.iter().any(|f| f.id == top));
        assert!(body.shell(&mut ids, &[], 6.0).is_err());
    }

    #[test]
    fn rotation_about_z_quarter_turn() {
        let p = rotate_about_axis([1.0, 0.0, 0.0], Axis::Z, FRAC_PI_2);
        assert_relative_eq!(p[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(p[1], 1.0, epsilon = 1e-12);
    }
}
