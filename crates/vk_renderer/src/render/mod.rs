//! Rendering: CPU-side mesh data and the Vulkan backend

pub mod mesh;
pub mod vulkan;

pub use mesh::{Mesh, MeshBuilder, Vertex};
pub use vulkan::VulkanRenderer;
