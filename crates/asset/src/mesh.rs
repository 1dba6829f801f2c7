//! CPU-side mesh representations shared by the parsers and the baker.

use bytemuck::{Pod, Zeroable};

/// Vertex with position/normal/uv. Values are in object space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Tangent-augmented vertex as stored in the bake artifact, one entry per
/// triangle corner, never deduplicated.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BakedVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    /// xyz = tangent direction, w = handedness sign (-1 or +1).
    pub tangent: [f32; 4],
}

const _: () = assert!(size_of::<BakedVertex>() == 48);

impl BakedVertex {
    pub fn new(vertex: MeshVertex, tangent: [f32; 4]) -> Self {
        Self {
            position: vertex.position,
            normal: vertex.normal,
            uv: vertex.uv,
            tangent,
        }
    }
}

/// Contiguous run of index-array slots claimed by one `o` or `g` marker.
/// Bounds are inclusive; a scope declared with no following faces has
/// `end == start - 1`, which can be `-1`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubRange {
    pub name: String,
    pub start: i32,
    pub end: i32,
    /// Most recent `usemtl` before the range closed, `""` if none.
    pub material: String,
}

impl SubRange {
    /// Number of index slots covered.
    pub fn len(&self) -> usize {
        (self.end - self.start + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// A `g` scope. Also remembers which object was open when the marker
/// appeared; objects and groups close independently and need not nest.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupRange {
    pub name: String,
    /// Ordinal of the most recently opened object, `None` before any `o`.
    pub object: Option<u32>,
    pub start: i32,
    pub end: i32,
    pub material: String,
}

impl GroupRange {
    /// Strip the parse-time object ordinal; the bake format does not
    /// carry it.
    pub fn into_range(self) -> SubRange {
        SubRange {
            name: self.name,
            start: self.start,
            end: self.end,
            material: self.material,
        }
    }
}

/// Indexed triangle mesh with deduplicated vertices, named sub-ranges and
/// the declared material library.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub objects: Vec<SubRange>,
    pub groups: Vec<GroupRange>,
    pub mtllib: Option<String>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Returns `true` if both buffers are non-empty and every index is
    /// in bounds.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty()
            && !self.indices.is_empty()
            && self
                .indices
                .iter()
                .all(|&index| (index as usize) < self.vertices.len())
    }
}
