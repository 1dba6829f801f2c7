//! Tangent-space generation over an expanded triangle soup.
//!
//! The indexed mesh is re-expanded before the tangent pass and the index
//! buffer is discarded: a corner shared between differently wound
//! triangles may receive two different tangents, so the baked output is
//! one vertex per index slot with no index buffer.

use mikktspace::{Geometry, generate_tangents};

use crate::error::{AssetError, AssetResult};
use crate::mesh::{BakedVertex, MeshData};

/// Triangle soup view handed to the tangent algorithm: corner `c` of
/// face `f` lives at `f * 3 + c`.
struct TriangleSoup<'a> {
    vertices: &'a mut [BakedVertex],
}

impl Geometry for TriangleSoup<'_> {
    fn num_faces(&self) -> usize {
        self.vertices.len() / 3
    }

    fn num_vertices_of_face(&self, _face: usize) -> usize {
        3
    }

    fn position(&self, face: usize, vert: usize) -> [f32; 3] {
        self.vertices[face * 3 + vert].position
    }

    fn normal(&self, face: usize, vert: usize) -> [f32; 3] {
        self.vertices[face * 3 + vert].normal
    }

    fn tex_coord(&self, face: usize, vert: usize) -> [f32; 2] {
        self.vertices[face * 3 + vert].uv
    }

    fn set_tangent_encoded(&mut self, tangent: [f32; 4], face: usize, vert: usize) {
        self.vertices[face * 3 + vert].tangent = tangent;
    }
}

/// Expand an indexed mesh into a triangle soup and compute one tangent
/// per corner. Output length always equals `mesh.indices.len()`.
pub fn bake_tangents(mesh: &MeshData) -> AssetResult<Vec<BakedVertex>> {
    if mesh.indices.len() % 3 != 0 {
        return Err(AssetError::TangentGeneration(format!(
            "index count {} is not a multiple of 3",
            mesh.indices.len()
        )));
    }

    let mut soup = Vec::with_capacity(mesh.indices.len());
    for &index in &mesh.indices {
        let vertex = mesh.vertices.get(index as usize).ok_or_else(|| {
            AssetError::TangentGeneration(format!(
                "index {index} out of range ({} vertices)",
                mesh.vertices.len()
            ))
        })?;
        soup.push(BakedVertex::new(*vertex, [0.0; 4]));
    }

    let mut geometry = TriangleSoup {
        vertices: &mut soup,
    };
    if !generate_tangents(&mut geometry) {
        return Err(AssetError::TangentGeneration(
            "mikktspace rejected the mesh".into(),
        ));
    }

    Ok(soup)
}
