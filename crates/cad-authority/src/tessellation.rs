//! Grid tessellation of axis-aligned boxes.

use crate::types::{BoundingBox3, MeshStats, RenderMesh};

/// Triangulate the six faces of `bbox`, each as an `n × n` grid of quads
/// with outward winding.
pub fn tessellate_box(bbox: &BoundingBox3, subdivisions: u32) -> RenderMesh {
    let n = subdivisions.max(1);
    let mut mesh = RenderMesh::default();

    for axis in 0..3 {
        for high in [false, true] {
            // (b, c) ordered so b × c points away from the box.
            let (b, c) = if high {
                ((axis + 1) % 3, (axis + 2) % 3)
            } else {
                ((axis + 2) % 3, (axis + 1) % 3)
            };
            let level = if high { bbox.max[axis] } else { bbox.min[axis] };
            let base = mesh.vertex_count() as u32;

            for j in 0..=n {
                for i in 0..=n {
                    let mut p = [0.0f64; 3];
                    p[axis] = level;
                    p[b] = bbox.min[b] + (bbox.max[b] - bbox.min[b]) * i as f64 / n as f64;
                    p[c] = bbox.min[c] + (bbox.max[c] - bbox.min[c]) * j as f64 / n as f64;
                    mesh.vertices
                        .extend_from_slice(&[p[0] as f32, p[1] as f32, p[2] as f32]);
                }
            }

            let row = n + 1;
            for j in 0..n {
                for i in 0..n {
                    let a = base + j * row + i;
                    let b = a + 1;
                    let c = a + row + 1;
                    let d = a + row;
                    mesh.indices.extend_from_slice(&[a, b, c, a, c, d]);
                }
            }
        }
    }

    mesh
}

/// Counts `tessellate_box` produces for a given subdivision.
pub fn box_mesh_stats(subdivisions: u32) -> MeshStats {
    let n = subdivisions.max(1) as u64;
    MeshStats {
        node_count: 6 * (n + 1) * (n + 1),
        triangle_count: 12 * n * n,
    }
}
