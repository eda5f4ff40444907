//! Vulkan vertex input description for [`Vertex`]
//!
//! Keeps the mesh types free of Vulkan; the pipeline pulls its vertex input
//! state from here.

use ash::vk;
use std::mem::{offset_of, size_of};

use crate::render::mesh::Vertex;

/// Vertex buffer binding index
pub const VERTEX_BINDING: u32 = 0;

/// Vulkan vertex layout implementation for the renderer's Vertex type
pub struct VulkanVertexLayout;

impl VulkanVertexLayout {
    /// One interleaved per-vertex binding
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: VERTEX_BINDING,
            stride: size_of::<Vertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Position, colour and texture coordinate at shader locations 0, 1 and 2
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
        [
            vk::VertexInputAttributeDescription {
                binding: VERTEX_BINDING,
                location: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Vertex, position) as u32,
            },
            vk::VertexInputAttributeDescription {
                binding: VERTEX_BINDING,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Vertex, colour) as u32,
            },
            vk::VertexInputAttributeDescription {
                binding: VERTEX_BINDING,
                location: 2,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Vertex, tex_coord) as u32,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_covers_interleaved_vertex() {
        let binding = VulkanVertexLayout::binding_description();
        assert_eq!(binding.stride, 32);
        assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);
    }

    #[test]
    fn test_attribute_locations_and_offsets() {
        let attributes = VulkanVertexLayout::attribute_descriptions();
        let summary: Vec<_> = attributes.iter().map(|a| (a.location, a.offset, a.format)).collect();
        assert_eq!(
            summary,
            vec![
                (0, 0, vk::Format::R32G32B32_SFLOAT),
                (1, 12, vk::Format::R32G32B32_SFLOAT),
                (2, 24, vk::Format::R32G32_SFLOAT),
            ]
        );
    }
}
