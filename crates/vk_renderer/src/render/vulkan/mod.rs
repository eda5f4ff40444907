//! Vulkan rendering backend
//!
//! `core` holds one RAII wrapper per Vulkan object class; `system` drives
//! them: the frame scheduler, swapchain generation rebuilds and the renderer
//! that ties both together.

/// Core Vulkan wrappers and primitives
pub mod core;
/// Frame loop orchestration
pub mod system;

// Re-export commonly used core types
pub use core::{
    buffer::{Buffer, IndexBuffer, UniformBuffer, VertexBuffer},
    commands::{ActiveRenderPass, CommandBuffers, CommandPool, CommandRecorder},
    context::{LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanInstance, VulkanResult},
    descriptor_set::{DescriptorPool, DescriptorSetLayout, DescriptorSetLayoutBuilder, DescriptorSetWriter},
    framebuffer::Framebuffer,
    image::Image,
    render_pass::RenderPass,
    shader::{GraphicsPipeline, ShaderCode, ShaderModule},
    swapchain::{AcquireOutcome, PresentOutcome, SwapchainManager, SwapchainSettings},
    sync::{Fence, FrameSync, FrameSynchronizer, Semaphore},
    texture::Texture,
    uniform_buffer::UniformBufferObject,
    vertex_layout::VulkanVertexLayout,
    window::{ResizeSignal, Window, WindowError},
};

// Re-export system types
pub use system::{
    recreation::{RecreationController, SwapchainGeneration},
    renderer::VulkanRenderer,
    scheduler::{FrameBackend, FrameOutcome, FrameScheduler, FrameState, SurfaceSize},
};
