//! Turning task-file references into authority handles.
//!
//! Every index is checked against the container it addresses. There is no
//! negative (from-the-end) indexing.

use cad_authority::{AuthorityIntrospect, PrincipalPlane, Profile, SketchId};
use serde::{Deserialize, Serialize};

use crate::context::DesignContext;
use crate::error::OperationError;

/// A reference to one profile, as written in a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileRef {
    /// 0-based sketch index, profile 0.
    Index(i64),
    /// Exact sketch and profile, both 0-based.
    Pair {
        #[serde(default)]
        sketch_index: i64,
        #[serde(default)]
        profile_index: i64,
    },
    /// `"sketch_N"`, the 1-based sketch N, profile 0.
    Label(String),
}

impl ProfileRef {
    /// 0-based sketch and profile positions this reference names.
    pub fn positions(&self) -> Result<(i64, i64), OperationError> {
        match self {
            ProfileRef::Index(i) => Ok((*i, 0)),
            ProfileRef::Pair {
                sketch_index,
                profile_index,
            } => Ok((*sketch_index, *profile_index)),
            ProfileRef::Label(label) => Ok((sketch_label(label)? - 1, 0)),
        }
    }
}

/// Parse `"sketch_N"` into `N` (1-based, at least 1).
pub fn sketch_label(label: &str) -> Result<i64, OperationError> {
    label
        .strip_prefix("sketch_")
        .and_then(|n| n.parse::<i64>().ok())
        .filter(|n| *n >= 1)
        .ok_or_else(|| OperationError::ResolutionFailed {
            reason: format!("'{label}' is not a sketch reference (expected sketch_N, N >= 1)"),
        })
}

/// Resolve a profile reference in the active component.
pub fn resolve_profile(
    design: &DesignContext,
    kb: &dyn AuthorityIntrospect,
    reference: &ProfileRef,
) -> Result<Profile, OperationError> {
    let (sketch_index, profile_index) = reference.positions()?;
    let sketch = design.sketch_at(sketch_index)?;
    profile_at(kb, sketch, profile_index)
}

/// The 1-based sketch `number` of the active component.
pub fn sketch_number(design: &DesignContext, number: i64) -> Result<SketchId, OperationError> {
    design.sketch_at(number - 1).map_err(|e| match e {
        OperationError::OutOfRange { what, count, .. } => OperationError::OutOfRange {
            what,
            index: number,
            count,
        },
        other => other,
    })
}

/// Profile `index` of `sketch`.
pub fn profile_at(
    kb: &dyn AuthorityIntrospect,
    sketch: SketchId,
    index: i64,
) -> Result<Profile, OperationError> {
    let profiles = all_profiles(kb, sketch)?;
    let count = profiles.len();
    usize::try_from(index)
        .ok()
        .and_then(|i| profiles.get(i).copied())
        .ok_or(OperationError::OutOfRange {
            what: "profile",
            index,
            count,
        })
}

/// Every profile of `sketch`. A sketch without closed regions is an error.
pub fn all_profiles(
    kb: &dyn AuthorityIntrospect,
    sketch: SketchId,
) -> Result<Vec<Profile>, OperationError> {
    let profiles = kb.sketch_profiles(sketch);
    if profiles.is_empty() {
        return Err(OperationError::ResolutionFailed {
            reason: format!("sketch {} has no closed profiles", sketch.0),
        });
    }
    Ok(profiles)
}

/// A sketch plane name. Only the three origin planes exist.
pub fn sketch_plane(name: &str) -> Result<PrincipalPlane, OperationError> {
    PrincipalPlane::from_name(name).ok_or_else(|| OperationError::InvalidParams {
        reason: format!("Unknown plane: {name}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: serde_json::Value) -> ProfileRef {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn three_reference_shapes() {
        assert_eq!(parse(json!(2)), ProfileRef::Index(2));
        assert_eq!(
            parse(json!({"sketch_index": 1, "profile_index": 3})),
            ProfileRef::Pair {
                sketch_index: 1,
                profile_index: 3
            }
        );
        assert_eq!(parse(json!("sketch_4")), ProfileRef::Label("sketch_4".into()));
    }

    #[test]
    fn positions_follow_each_convention() {
        assert_eq!(ProfileRef::Index(0).positions().unwrap(), (0, 0));
        assert_eq!(
            parse(json!({"profile_index": 2})).positions().unwrap(),
            (0, 2)
        );
        assert_eq!(ProfileRef::Label("sketch_1".into()).positions().unwrap(), (0, 0));
    }

    #[test]
    fn bad_labels_are_rejected() {
        assert!(sketch_label("sketch_0").is_err());
        assert!(sketch_label("profile_2").is_err());
        assert!(sketch_label("sketch_x").is_err());
        assert_eq!(sketch_label("sketch_12").unwrap(), 12);
    }

    #[test]
    fn planes() {
        assert_eq!(sketch_plane("XZ").unwrap(), PrincipalPlane::XZ);
        let err = sketch_plane("ZX").unwrap_err();
        assert!(err.to_string().contains("Unknown plane: ZX"));
    }
}
