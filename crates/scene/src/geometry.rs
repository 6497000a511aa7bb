use foundation::bounds::Aabb3;
use foundation::math::Vec3;

/// CPU-side triangle list for one primitive.
///
/// Attribute arrays are parallel: `normals` and `uvs` always hold one entry
/// per position once built through [`Geometry::new`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Builds a triangle list, filling in whatever the source omitted.
    ///
    /// Missing indices become `0..n`. Missing or mismatched normals are
    /// recomputed from the faces, missing UVs are zeroed. Triangles that
    /// reference vertices past the end are dropped.
    pub fn new(
        positions: Vec<[f32; 3]>,
        normals: Option<Vec<[f32; 3]>>,
        uvs: Option<Vec<[f32; 2]>>,
        indices: Option<Vec<u32>>,
    ) -> Self {
        let n = positions.len();
        let mut indices = indices.unwrap_or_else(|| (0..n as u32).collect());
        indices.truncate(indices.len() - indices.len() % 3);
        let indices: Vec<u32> = indices
            .chunks_exact(3)
            .filter(|t| t.iter().all(|&i| (i as usize) < n))
            .flatten()
            .copied()
            .collect();

        let normals = match normals {
            Some(v) if v.len() == n => v,
            _ => face_normals(&positions, &indices),
        };
        let uvs = match uvs {
            Some(v) if v.len() == n => v,
            _ => vec![[0.0, 0.0]; n],
        };
        Self {
            positions,
            normals,
            uvs,
            indices,
        }
    }

    /// Axis-aligned box with per-face normals and a unit UV square per face.
    pub fn cuboid(min: [f32; 3], max: [f32; 3]) -> Self {
        let [x0, y0, z0] = min;
        let [x1, y1, z1] = max;
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([1.0, 0.0, 0.0], [[x1, y0, z1], [x1, y0, z0], [x1, y1, z0], [x1, y1, z1]]),
            ([-1.0, 0.0, 0.0], [[x0, y0, z0], [x0, y0, z1], [x0, y1, z1], [x0, y1, z0]]),
            ([0.0, 1.0, 0.0], [[x0, y1, z1], [x1, y1, z1], [x1, y1, z0], [x0, y1, z0]]),
            ([0.0, -1.0, 0.0], [[x0, y0, z0], [x1, y0, z0], [x1, y0, z1], [x0, y0, z1]]),
            ([0.0, 0.0, 1.0], [[x0, y0, z1], [x1, y0, z1], [x1, y1, z1], [x0, y1, z1]]),
            ([0.0, 0.0, -1.0], [[x1, y0, z0], [x0, y0, z0], [x0, y1, z0], [x1, y1, z0]]),
        ];
        let mut g = Geometry::default();
        for (normal, corners) in faces {
            let base = g.positions.len() as u32;
            g.positions.extend(corners);
            g.normals.extend([normal; 4]);
            g.uvs.extend([[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]);
            g.indices
                .extend([base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        g
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounds(&self) -> Aabb3 {
        let mut b = Aabb3::empty();
        for p in &self.positions {
            b.include_point(Vec3::from(*p));
        }
        b
    }

    /// Position, normal, uv per vertex: 8 floats.
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.positions.len() * 8);
        for i in 0..self.positions.len() {
            out.extend_from_slice(&self.positions[i]);
            out.extend_from_slice(&self.normals[i]);
            out.extend_from_slice(&self.uvs[i]);
        }
        out
    }
}

fn face_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut acc = vec![Vec3::ZERO; positions.len()];
    let at = |i: u32| Vec3::from(positions[i as usize]);
    for t in indices.chunks_exact(3) {
        let (a, b, c) = (at(t[0]), at(t[1]), at(t[2]));
        let n = (b - a).cross(c - a);
        for &i in t {
            acc[i as usize] = acc[i as usize] + n;
        }
    }
    acc.into_iter()
        .map(|n| {
            let len = n.length();
            if len > 0.0 {
                let n = n * (1.0 / len);
                [n.x as f32, n.y as f32, n.z as f32]
            } else {
                [0.0, 1.0, 0.0]
            }
        })
        .collect()
}
