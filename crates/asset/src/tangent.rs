//! Per-vertex tangent basis from position and UV gradients.

use glam::{Vec2, Vec3};

use crate::mesh::Vertex;

#[inline]
fn cross2(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - b.x * a.y
}

/// Accumulate a tangent and bitangent for every vertex referenced by the
/// triangle list `indices`, then normalize.
///
/// Triangles with zero area or a degenerate UV mapping contribute nothing.
/// Vertices with no contribution keep a zero basis. When only one of the
/// two accumulators is non-zero, the other is rebuilt from the vertex normal.
pub fn derive_tangents(vertices: &mut [Vertex], indices: &[u32]) {
    for v in vertices.iter_mut() {
        v.tangent = [0.0; 3];
        v.bitangent = [0.0; 3];
    }

    let mut tangents = vec![Vec3::ZERO; vertices.len()];
    let mut bitangents = vec![Vec3::ZERO; vertices.len()];

    for tri in indices.chunks_exact(3) {
        let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (v0, v1, v2) = (&vertices[i0], &vertices[i1], &vertices[i2]);

        let p0 = Vec3::from(v0.position);
        let p1 = Vec3::from(v1.position) - p0;
        let p2 = Vec3::from(v2.position) - p0;

        let normal = p1.cross(p2);
        if normal == Vec3::ZERO {
            continue;
        }
        let normal = normal.normalize();

        let uv0 = Vec2::from(v0.uv);
        let t1 = Vec2::from(v1.uv) - uv0;
        let t2 = Vec2::from(v2.uv) - uv0;

        let r = 1.0 / cross2(t1, t2);
        if !r.is_finite() {
            continue;
        }

        let pu = (t2.y * p1 - t1.y * p2) * r;
        let pv = (t1.x * p2 - t2.x * p1) * r;

        // Project the UV gradients into the face plane.
        let tan = pv.cross(normal);
        let btn = normal.cross(pu);
        if !tan.is_finite() || !btn.is_finite() {
            continue;
        }

        for i in [i0, i1, i2] {
            tangents[i] += tan;
            bitangents[i] += btn;
        }
    }

    for ((v, t), b) in vertices.iter_mut().zip(tangents).zip(bitangents) {
        let n = Vec3::from(v.normal);
        let (t, b) = match (t == Vec3::ZERO, b == Vec3::ZERO) {
            (true, true) => continue,
            (false, true) => {
                let t = t.normalize_or_zero();
                (t, n.cross(t).normalize_or_zero())
            }
            (true, false) => {
                let b = b.normalize_or_zero();
                (b.cross(n).normalize_or_zero(), b)
            }
            (false, false) => (t.normalize_or_zero(), b.normalize_or_zero()),
        };
        v.tangent = t.to_array();
        v.bitangent = b.to_array();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn tri(positions: [[f32; 3]; 3], uvs: [[f32; 2]; 3]) -> Vec<Vertex> {
        (0..3)
            .map(|i| Vertex::new(positions[i], [0.0, 0.0, 1.0], uvs[i]))
            .collect()
    }

    fn face_normal(v: &[Vertex]) -> Vec3 {
        let p0 = Vec3::from(v[0].position);
        (Vec3::from(v[1].position) - p0)
            .cross(Vec3::from(v[2].position) - p0)
            .normalize()
    }

    #[test]
    fn basis_is_unit_and_perpendicular_to_face() {
        let mut verts = tri(
            [[0.0, 0.0, 0.0], [2.0, 0.3, 0.5], [0.4, 1.5, -0.2]],
            [[0.1, 0.1], [0.9, 0.2], [0.3, 0.8]],
        );
        derive_tangents(&mut verts, &[0, 1, 2]);
        let n = face_normal(&verts);
        for v in &verts {
            let t = Vec3::from(v.tangent);
            let b = Vec3::from(v.bitangent);
            assert!((t.length() - 1.0).abs() < EPS, "tangent {t}");
            assert!((b.length() - 1.0).abs() < EPS, "bitangent {b}");
            assert!(t.dot(n).abs() < EPS);
            assert!(b.dot(n).abs() < EPS);
        }
    }

    #[test]
    fn axis_aligned_quad_matches_uv_axes() {
        let mut verts = vec![
            Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            Vertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new([1.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
            Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ];
        derive_tangents(&mut verts, &[0, 1, 2, 0, 2, 3]);
        for v in &verts {
            assert!((Vec3::from(v.tangent) - Vec3::X).length() < EPS);
            assert!((Vec3::from(v.bitangent) - Vec3::Y).length() < EPS);
        }
    }

    #[test]
    fn degenerate_triangles_contribute_nothing() {
        // Collinear positions.
        let mut verts = tri(
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
            [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
        );
        derive_tangents(&mut verts, &[0, 1, 2]);
        assert!(verts.iter().all(|v| v.tangent == [0.0; 3] && v.bitangent == [0.0; 3]));

        // All corners share one UV.
        let mut verts = tri(
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            [[0.5, 0.5]; 3],
        );
        derive_tangents(&mut verts, &[0, 1, 2]);
        assert!(verts.iter().all(|v| v.tangent == [0.0; 3] && v.bitangent == [0.0; 3]));
    }

    #[test]
    fn cancelled_tangent_is_rebuilt_from_bitangent() {
        // Second triangle mirrors U, so tangents at the shared corner cancel.
        let n = [0.0, 0.0, 1.0];
        let mut verts = vec![
            Vertex::new([0.0, 0.0, 0.0], n, [0.0, 0.0]),
            Vertex::new([1.0, 0.0, 0.0], n, [1.0, 0.0]),
            Vertex::new([0.0, 1.0, 0.0], n, [0.0, 1.0]),
            Vertex::new([-1.0, 0.0, 0.0], n, [1.0, 0.0]),
        ];
        derive_tangents(&mut verts, &[0, 1, 2, 0, 3, 2]);
        assert!((Vec3::from(verts[0].tangent) - Vec3::X).length() < EPS);
        assert!((Vec3::from(verts[0].bitangent) - Vec3::Y).length() < EPS);
    }

    #[test]
    fn cancelled_bitangent_is_rebuilt_from_tangent() {
        // Second triangle mirrors V, so bitangents at the shared corner cancel.
        let n = [0.0, 0.0, 1.0];
        let mut verts = vec![
            Vertex::new([0.0, 0.0, 0.0], n, [0.0, 0.0]),
            Vertex::new([1.0, 0.0, 0.0], n, [1.0, 0.0]),
            Vertex::new([0.0, 1.0, 0.0], n, [0.0, 1.0]),
            Vertex::new([0.0, -1.0, 0.0], n, [0.0, 1.0]),
        ];
        derive_tangents(&mut verts, &[0, 1, 2, 0, 1, 3]);
        assert!((Vec3::from(verts[0].tangent) - Vec3::X).length() < EPS);
        assert!((Vec3::from(verts[0].bitangent) - Vec3::Y).length() < EPS);
    }

    #[test]
    fn unreferenced_vertices_stay_zero() {
        let mut verts = tri(
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
        );
        verts.push(Vertex::new([5.0, 5.0, 5.0], [0.0, 1.0, 0.0], [0.0, 0.0]));
        derive_tangents(&mut verts, &[0, 1, 2]);
        assert_eq!(verts[3].tangent, [0.0; 3]);
        assert_ne!(verts[0].tangent, [0.0; 3]);
    }
}
