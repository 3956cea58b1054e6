use serde::{Deserialize, Serialize};

// ── Handles ─────────────────────────────────────────────────────────────────

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);
    };
}

handle!(
    /// A component of the open document. The root component is always 0.
    ComponentId
);
handle!(
    /// A user construction plane.
    PlaneId
);
handle!(SketchId);
handle!(CurveId);
handle!(FeatureId);
handle!(BodyId);
handle!(EdgeId);
handle!(FaceId);
handle!(JointId);

impl ComponentId {
    pub const ROOT: ComponentId = ComponentId(0);

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

/// One closed region of a sketch, addressed by position in the sketch's
/// profile list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Profile {
    pub sketch: SketchId,
    pub index: usize,
}

// ── Enumerations ────────────────────────────────────────────────────────────

/// The three origin construction planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrincipalPlane {
    XY,
    XZ,
    YZ,
}

impl PrincipalPlane {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "XY" => Some(PrincipalPlane::XY),
            "XZ" => Some(PrincipalPlane::XZ),
            "YZ" => Some(PrincipalPlane::YZ),
            _ => None,
        }
    }

    /// In-plane axes `(u, v)`. The plane normal is `u × v`.
    pub fn axes(self) -> ([f64; 3], [f64; 3]) {
        match self {
            PrincipalPlane::XY => ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            PrincipalPlane::XZ => ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            PrincipalPlane::YZ => ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        }
    }
}

/// Where a sketch lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaneRef {
    Principal(PrincipalPlane),
    Construction(PlaneId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "X" => Some(Axis::X),
            "Y" => Some(Axis::Y),
            "Z" => Some(Axis::Z),
            _ => None,
        }
    }

    pub fn direction(self) -> [f64; 3] {
        match self {
            Axis::X => [1.0, 0.0, 0.0],
            Axis::Y => [0.0, 1.0, 0.0],
            Axis::Z => [0.0, 0.0, 1.0],
        }
    }

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// How a new solid feature combines with existing bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureOperation {
    NewBody,
    Join,
    Cut,
    Intersect,
}

impl FeatureOperation {
    /// Parse a task-file operation name. Unrecognized names mean a new body.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "join" => FeatureOperation::Join,
            "cut" => FeatureOperation::Cut,
            "intersect" => FeatureOperation::Intersect,
            _ => FeatureOperation::NewBody,
        }
    }
}

/// Boolean combination of existing bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombineOperation {
    Join,
    Cut,
    Intersect,
}

impl CombineOperation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "join" | "union" => Some(CombineOperation::Join),
            "cut" | "subtract" => Some(CombineOperation::Cut),
            "intersect" | "intersection" => Some(CombineOperation::Intersect),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportFormat {
    Stl,
    /// Native design archive.
    Archive,
}

impl ExportFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "stl" => Some(ExportFormat::Stl),
            "f3d" => Some(ExportFormat::Archive),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Stl => "stl",
            ExportFormat::Archive => "f3d",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MeshRefinement {
    Low,
    #[default]
    Medium,
    High,
}

impl MeshRefinement {
    /// Grid subdivisions per face edge.
    pub fn subdivisions(self) -> u32 {
        match self {
            MeshRefinement::Low => 1,
            MeshRefinement::Medium => 2,
            MeshRefinement::High => 4,
        }
    }
}

/// Sketch constraints the engine knows how to request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SketchConstraint {
    HorizontalOrVertical { curve: CurveId },
    /// Drive a circle or arc to `value` diameter (internal units).
    Diameter { curve: CurveId, value: f64 },
}

// ── Query results ───────────────────────────────────────────────────────────

/// Axis-aligned box in internal units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox3 {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox3 {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self { min, max }
    }

    /// Smallest box holding every point. `None` for no points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f64; 3]>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bb = BoundingBox3::new(first, first);
        for p in iter {
            bb = bb.including(*p);
        }
        Some(bb)
    }

    pub fn including(&self, p: [f64; 3]) -> Self {
        let mut out = *self;
        for i in 0..3 {
            out.min[i] = out.min[i].min(p[i]);
            out.max[i] = out.max[i].max(p[i]);
        }
        out
    }

    pub fn union(&self, other: &BoundingBox3) -> Self {
        self.including(other.min).including(other.max)
    }

    /// Overlapping region, `None` when the boxes are disjoint or only touch
    /// within `eps`.
    pub fn intersection(&self, other: &BoundingBox3, eps: f64) -> Option<Self> {
        let mut out = *self;
        for i in 0..3 {
            out.min[i] = self.min[i].max(other.min[i]);
            out.max[i] = self.max[i].min(other.max[i]);
            if out.max[i] - out.min[i] <= eps {
                return None;
            }
        }
        Some(out)
    }

    /// Whether the boxes overlap or touch within `eps`.
    pub fn touches(&self, other: &BoundingBox3, eps: f64) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] + eps && other.min[i] <= self.max[i] + eps)
    }

    /// Whether `other` lies entirely inside this box, within `eps`.
    pub fn contains(&self, other: &BoundingBox3, eps: f64) -> bool {
        (0..3).all(|i| self.min[i] <= other.min[i] + eps && other.max[i] <= self.max[i] + eps)
    }

    pub fn extents(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    pub fn center(&self) -> [f64; 3] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }

    pub fn volume(&self) -> f64 {
        let e = self.extents();
        e[0] * e[1] * e[2]
    }

    pub fn translated(&self, t: [f64; 3]) -> Self {
        BoundingBox3 {
            min: [self.min[0] + t[0], self.min[1] + t[1], self.min[2] + t[2]],
            max: [self.max[0] + t[0], self.max[1] + t[1], self.max[2] + t[2]],
        }
    }

    pub fn corners(&self) -> [[f64; 3]; 8] {
        let (a, b) = (self.min, self.max);
        [
            [a[0], a[1], a[2]],
            [b[0], a[1], a[2]],
            [b[0], b[1], a[2]],
            [a[0], b[1], a[2]],
            [a[0], a[1], b[2]],
            [b[0], a[1], b[2]],
            [b[0], b[1], b[2]],
            [a[0], b[1], b[2]],
        ]
    }
}

/// Mass properties of a body, internal units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalProperties {
    pub volume: f64,
    pub area: f64,
}

/// Display-mesh counts of a body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshStats {
    pub node_count: u64,
    pub triangle_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeInfo {
    pub id: EdgeId,
    pub start: [f64; 3],
    pub end: [f64; 3],
    pub length: f64,
}

impl EdgeInfo {
    /// Whether the edge runs mostly along Z.
    pub fn is_vertical(&self, tolerance: f64) -> bool {
        (self.start[2] - self.end[2]).abs() > tolerance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceInfo {
    pub id: FaceId,
    pub area: f64,
    pub bbox: BoundingBox3,
}

/// Tessellated triangle mesh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderMesh {
    /// Flat array of vertex positions [x0, y0, z0, x1, y1, z1, ...].
    pub vertices: Vec<f32>,
    /// Triangle indices into the vertex array.
    pub indices: Vec<u32>,
}

impl RenderMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Append another mesh, offsetting its indices.
    pub fn append(&mut self, other: &RenderMesh) {
        let base = self.vertex_count() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }
}

// ── Errors ──────────────────────────────────────────────────────────────────

/// Errors from authority calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthorityError {
    #[error("no document is open")]
    NoDocument,

    #[error("document error: {reason}")]
    Document { reason: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: u64 },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("{feature} failed: {reason}")]
    FeatureFailed {
        feature: &'static str,
        reason: String,
    },

    #[error("export failed: {reason}")]
    ExportFailed { reason: String },

    /// The host application itself is in a broken state. Nothing further
    /// should be attempted for the current task.
    #[error("host fatal error: {reason}")]
    HostFatal { reason: String },
}

impl AuthorityError {
    pub fn is_host_fatal(&self) -> bool {
        matches!(self, AuthorityError::HostFatal { .. })
    }

    pub(crate) fn feature(feature: &'static str, reason: impl Into<String>) -> Self {
        AuthorityError::FeatureFailed {
            feature,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        AuthorityError::InvalidInput {
            reason: reason.into(),
        }
    }
}
