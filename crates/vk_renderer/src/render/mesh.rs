//! CPU-side mesh data
//!
//! [`Vertex`] matches the vertex shader inputs byte for byte; [`Mesh`] is the
//! deduplicated vertex list plus 32-bit indices that get uploaded once at
//! startup.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Vertex layout consumed by `shader.vert`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Per-vertex colour, multiplied with the texture sample
    pub colour: [f32; 3],
    /// Texture coordinate with V already flipped for Vulkan
    pub tex_coord: [f32; 2],
}

unsafe impl bytemuck::Pod for Vertex {}
unsafe impl bytemuck::Zeroable for Vertex {}

impl Vertex {
    /// Create a vertex
    pub const fn new(position: [f32; 3], colour: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self { position, colour, tex_coord }
    }

    fn bits(&self) -> [u32; 8] {
        [
            self.position[0].to_bits(),
            self.position[1].to_bits(),
            self.position[2].to_bits(),
            self.colour[0].to_bits(),
            self.colour[1].to_bits(),
            self.colour[2].to_bits(),
            self.tex_coord[0].to_bits(),
            self.tex_coord[1].to_bits(),
        ]
    }
}

// Equality is exact bit equality so the type can key a HashMap. This keeps
// 0.0 and -0.0 apart, which is fine for deduplicating parsed file data.
impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for Vertex {}

impl Hash for Vertex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

/// Indexed triangle mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Unique vertices
    pub vertices: Vec<Vertex>,
    /// Triangle list indices into `vertices`
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Number of indices to draw
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Whether there is anything to draw
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Builds a [`Mesh`] from a stream of unindexed vertices, merging exact duplicates
#[derive(Debug, Default)]
pub struct MeshBuilder {
    mesh: Mesh,
    unique: HashMap<Vertex, u32>,
}

impl MeshBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one vertex reference to the index list, reusing an existing entry if identical
    pub fn push(&mut self, vertex: Vertex) -> u32 {
        let next = self.mesh.vertices.len() as u32;
        let index = *self.unique.entry(vertex).or_insert_with(|| {
            self.mesh.vertices.push(vertex);
            next
        });
        self.mesh.indices.push(index);
        index
    }

    /// Finish building
    pub fn build(self) -> Mesh {
        self.mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

    #[test]
    fn test_vertex_size_matches_shader_layout() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
        assert_eq!(std::mem::offset_of!(Vertex, colour), 12);
        assert_eq!(std::mem::offset_of!(Vertex, tex_coord), 24);
    }

    #[test]
    fn test_identical_vertices_collapse() {
        let mut builder = MeshBuilder::new();
        let a = Vertex::new([0.0, 1.0, 2.0], WHITE, [0.5, 0.5]);

        let first = builder.push(a);
        let second = builder.push(a);
        let mesh = builder.build();

        assert_eq!(first, second);
        assert_eq!(mesh.vertices.len(), 1);
        assert_eq!(mesh.indices, vec![0, 0]);
    }

    #[test]
    fn test_any_attribute_difference_keeps_vertices_apart() {
        let base = Vertex::new([0.0, 0.0, 0.0], WHITE, [0.0, 0.0]);
        let moved = Vertex::new([0.0, 0.0, 1.0], WHITE, [0.0, 0.0]);
        let tinted = Vertex::new([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0]);
        let remapped = Vertex::new([0.0, 0.0, 0.0], WHITE, [0.0, 1.0]);

        let mut builder = MeshBuilder::new();
        for v in [base, moved, tinted, remapped, base] {
            builder.push(v);
        }
        let mesh = builder.build();

        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 0]);
        assert_eq!(mesh.index_count(), 5);
    }

    #[test]
    fn test_vertex_bytes_cast() {
        let v = Vertex::new([1.0, 2.0, 3.0], WHITE, [0.25, 0.75]);
        let bytes: &[u8] = bytemuck::bytes_of(&v);
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[0..4], &1.0_f32.to_ne_bytes());
    }
}
