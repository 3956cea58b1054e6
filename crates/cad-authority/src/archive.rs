//! Native design archive written by the mock authority.
//!
//! A pretty-printed JSON snapshot of the document: components with their
//! occurrence transforms and bodies, plus joints.

use replay_types::JointKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::*;

/// Format identifier written into every archive.
pub const ARCHIVE_FORMAT: &str = "cad-replay-archive";

/// Current archive version.
pub const ARCHIVE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveFile {
    pub format: String,
    pub version: u32,
    pub document: Uuid,
    pub name: String,
    pub components: Vec<ArchivedComponent>,
    #[serde(default)]
    pub joints: Vec<ArchivedJoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedComponent {
    pub id: ComponentId,
    pub name: String,
    pub transform: [f64; 3],
    pub sketch_count: usize,
    pub feature_count: usize,
    pub bodies: Vec<ArchivedBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedBody {
    pub id: BodyId,
    pub bbox: BoundingBox3,
    pub volume: f64,
    pub area: f64,
    pub edge_count: usize,
    pub face_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedJoint {
    pub id: JointId,
    pub first: ComponentId,
    pub second: ComponentId,
    pub kind: JointKind,
}

/// Serialize an archive to pretty-printed JSON.
pub fn write_archive(file: &ArchiveFile) -> Result<String, AuthorityError> {
    serde_json::to_string_pretty(file).map_err(|e| AuthorityError::ExportFailed {
        reason: e.to_string(),
    })
}

/// Parse an archive, checking its format identifier and version.
pub fn read_archive(json: &str) -> Result<ArchiveFile, AuthorityError> {
    let file: ArchiveFile = serde_json::from_str(json).map_err(|e| AuthorityError::Document {
        reason: format!("unreadable archive: {e}"),
    })?;
    if file.format != ARCHIVE_FORMAT {
        return Err(AuthorityError::Document {
            reason: format!("unknown archive format: {}", file.format),
        });
    }
    if file.version > ARCHIVE_VERSION {
        return Err(AuthorityError::Document {
            reason: format!(
                "archive version {} is newer than supported version {}",
                file.version, ARCHIVE_VERSION
            ),
        });
    }
    Ok(file)
}
