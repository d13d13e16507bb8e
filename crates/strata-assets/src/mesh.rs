use glam::Vec3;

/// A decoded mesh (renderer-agnostic). Vertex streams are extracted from the
/// document's accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshAsset {
    pub name: Option<String>,
    pub primitives: Vec<MeshPrimitive>,
    /// Default morph target weights.
    pub weights: Vec<f32>,
}

/// A single draw primitive within a mesh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshPrimitive {
    /// Topology as the glTF `mode` code (4 = triangles).
    pub mode: u32,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tangents: Vec<[f32; 4]>,
    /// One set per `TEXCOORD_n`, in order.
    pub tex_coords: Vec<Vec<[f32; 2]>>,
    pub colors: Option<Vec<[f32; 4]>>,
    pub joints: Option<Vec<[u32; 4]>>,
    pub weights: Option<Vec<[f32; 4]>>,
    pub indices: Option<Vec<u32>>,
    pub material: Option<usize>,
    pub targets: Vec<MorphTarget>,
}

impl MeshPrimitive {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// Per-vertex displacements of one morph target.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MorphTarget {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tangents: Vec<[f32; 3]>,
}

/// Area-weighted smooth normals for a triangle list.
///
/// Without `indices`, consecutive vertex triples form the triangles.
pub fn generate_smooth_normals(positions: &[[f32; 3]], indices: Option<&[u32]>) -> Vec<[f32; 3]> {
    let mut accum = vec![Vec3::ZERO; positions.len()];

    let sequential: Vec<u32>;
    let indices = match indices {
        Some(indices) => indices,
        None => {
            sequential = (0..positions.len() as u32).collect();
            &sequential
        }
    };

    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let pa = Vec3::from(positions[a]);
        let pb = Vec3::from(positions[b]);
        let pc = Vec3::from(positions[c]);
        // Unnormalized cross product: its length is twice the triangle area.
        let face = (pb - pa).cross(pc - pa);
        accum[a] += face;
        accum[b] += face;
        accum[c] += face;
    }

    accum.into_iter().map(|n| n.normalize_or_zero().to_array()).collect()
}
