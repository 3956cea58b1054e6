use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::task::RawOperation;

/// Semantic kind of a connection point on a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    ThreadedHole,
    Bolt,
    Screw,
    ClearanceHole,
    Shaft,
    Bore,
    Bearing,
    MountingPattern,
    FlatFace,
}

impl ConnectionKind {
    /// Kinds this kind can mate with. Kinds that only appear as mate
    /// targets (screw, clearance hole, bearing) mate with nothing.
    pub fn mates(self) -> &'static [ConnectionKind] {
        use ConnectionKind::*;
        match self {
            ThreadedHole => &[Bolt, Screw],
            Bolt => &[ThreadedHole, ClearanceHole],
            Shaft => &[Bore, Bearing],
            Bore => &[Shaft],
            MountingPattern => &[MountingPattern],
            FlatFace => &[FlatFace],
            Screw | ClearanceHole | Bearing => &[],
        }
    }

    fn is_rotational(self) -> bool {
        matches!(
            self,
            ConnectionKind::Shaft | ConnectionKind::Bore | ConnectionKind::Bearing
        )
    }

    fn tag(self) -> &'static str {
        use ConnectionKind::*;
        match self {
            ThreadedHole => "threaded_hole",
            Bolt => "bolt",
            Screw => "screw",
            ClearanceHole => "clearance_hole",
            Shaft => "shaft",
            Bore => "bore",
            Bearing => "bearing",
            MountingPattern => "mounting_pattern",
            FlatFace => "flat_face",
        }
    }
}

/// Kinematic joint kinds the engine can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointKind {
    Rigid,
    Revolute,
    Slider,
}

impl JointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JointKind::Rigid => "rigid",
            JointKind::Revolute => "revolute",
            JointKind::Slider => "slider",
        }
    }
}

/// A mating location on a component, used by assembly planners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionPoint {
    pub id: String,
    pub kind: ConnectionKind,
    /// Position in millimetres, in the owning component's frame.
    pub position: [f64; 3],
    pub owning_component: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl ConnectionPoint {
    pub fn new(
        kind: ConnectionKind,
        position: [f64; 3],
        owning_component: impl Into<String>,
    ) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("{}_{}", kind.tag(), &suffix[..8]),
            kind,
            position,
            owning_component: owning_component.into(),
            properties: Map::new(),
        }
    }

    /// Whether `other` is in this point's mating table.
    pub fn can_mate_with(&self, other: &ConnectionPoint) -> bool {
        self.kind.mates().contains(&other.kind)
    }
}

/// A joint suggested by pairing two compatible connection points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointProposal {
    pub component_1: String,
    pub component_2: String,
    pub joint_type: JointKind,
    pub point_1: String,
    pub point_2: String,
}

impl JointProposal {
    /// The `create_joint` operation that realizes this proposal.
    pub fn to_operation(&self) -> RawOperation {
        RawOperation::new(
            "create_joint",
            json!({
                "component_1": self.component_1,
                "component_2": self.component_2,
                "joint_type": self.joint_type.as_str(),
            }),
        )
    }
}

/// Pair compatible connection points on different components.
///
/// Points are consumed greedily in input order; each point joins at most
/// one proposal. Shaft/bore/bearing pairs become revolute joints, all
/// other pairs rigid.
pub fn propose_joints(points: &[ConnectionPoint]) -> Vec<JointProposal> {
    let mut used = vec![false; points.len()];
    let mut proposals = Vec::new();

    for i in 0..points.len() {
        if used[i] {
            continue;
        }
        for j in (i + 1)..points.len() {
            if used[j] {
                continue;
            }
            let (a, b) = (&points[i], &points[j]);
            if a.owning_component == b.owning_component {
                continue;
            }
            if !(a.can_mate_with(b) || b.can_mate_with(a)) {
                continue;
            }
            let joint_type = if a.kind.is_rotational() && b.kind.is_rotational() {
                JointKind::Revolute
            } else {
                JointKind::Rigid
            };
            proposals.push(JointProposal {
                component_1: a.owning_component.clone(),
                component_2: b.owning_component.clone(),
                joint_type,
                point_1: a.id.clone(),
                point_2: b.id.clone(),
            });
            used[i] = true;
            used[j] = true;
            break;
        }
    }

    proposals
}
