//! Binary STL encoding.

use crate::types::{AuthorityError, BoundingBox3, RenderMesh};

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;

/// Encode a mesh as binary STL.
///
/// Layout:
/// - 80-byte header (arbitrary text)
/// - u32 triangle count (little-endian)
/// - per triangle: 3×f32 normal, 3×(3×f32) vertices, u16 attribute
pub fn encode_binary_stl(mesh: &RenderMesh, name: &str) -> Result<Vec<u8>, AuthorityError> {
    let tri_count = mesh.indices.len() / 3;
    if tri_count == 0 {
        return Err(AuthorityError::ExportFailed {
            reason: "mesh has no triangles".to_string(),
        });
    }

    let vertex_count = mesh.vertex_count();
    if let Some(&bad) = mesh.indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(AuthorityError::ExportFailed {
            reason: format!("index {} out of range (vertex count = {})", bad, vertex_count),
        });
    }

    let mut buf = Vec::with_capacity(HEADER_LEN + 4 + tri_count * TRIANGLE_LEN);
    let header = format!("binary STL: {}", name);
    let header_bytes = header.as_bytes();
    buf.extend_from_slice(&header_bytes[..header_bytes.len().min(HEADER_LEN)]);
    buf.resize(HEADER_LEN, 0u8);
    buf.extend_from_slice(&(tri_count as u32).to_le_bytes());

    let vertex = |i: u32| {
        let k = i as usize * 3;
        [mesh.vertices[k], mesh.vertices[k + 1], mesh.vertices[k + 2]]
    };

    for tri in mesh.indices.chunks(3) {
        let (p0, p1, p2) = (vertex(tri[0]), vertex(tri[1]), vertex(tri[2]));
        let a = [p1[0] - p0[0], p1[1] - p0[1], p1[2] - p0[2]];
        let b = [p2[0] - p0[0], p2[1] - p0[1], p2[2] - p0[2]];
        let n = [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ];
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        let n = if len > 1e-12 {
            [n[0] / len, n[1] / len, n[2] / len]
        } else {
            [0.0f32, 0.0, 1.0]
        };

        for value in n.iter().chain(p0.iter()).chain(p1.iter()).chain(p2.iter()) {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        buf.extend_from_slice(&0u16.to_le_bytes());
    }

    Ok(buf)
}

/// Triangle count and vertex bounds of a binary STL payload.
pub fn inspect_binary_stl(bytes: &[u8]) -> Result<(usize, BoundingBox3), AuthorityError> {
    let malformed = |reason: &str| AuthorityError::Document {
        reason: format!("malformed STL: {reason}"),
    };
    if bytes.len() < HEADER_LEN + 4 {
        return Err(malformed("truncated header"));
    }
    let mut count = [0u8; 4];
    count.copy_from_slice(&bytes[HEADER_LEN..HEADER_LEN + 4]);
    let tri_count = u32::from_le_bytes(count) as usize;
    if bytes.len() != HEADER_LEN + 4 + tri_count * TRIANGLE_LEN {
        return Err(malformed("length does not match triangle count"));
    }

    let read = |at: usize| {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes[at..at + 4]);
        f32::from_le_bytes(raw) as f64
    };
    let mut bbox: Option<BoundingBox3> = None;
    for t in 0..tri_count {
        let base = HEADER_LEN + 4 + t * TRIANGLE_LEN + 12;
        for v in 0..3 {
            let at = base + v * 12;
            let p = [read(at), read(at + 4), read(at + 8)];
            bbox = Some(match bbox {
                Some(bb) => bb.including(p),
                None => BoundingBox3::new(p, p),
            });
        }
    }
    let bbox = bbox.ok_or_else(|| malformed("no triangles"))?;
    Ok((tri_count, bbox))
}
