pub mod buffer;
pub mod commands;
pub mod context;
pub mod descriptor_set;
pub mod device_selection;
pub mod framebuffer;
pub mod image;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod texture;
/// Uniform buffer contents for the model-view-projection transform
pub mod uniform_buffer;
pub mod vertex_layout;
pub mod window;

// Re-export commonly used types
pub use context::{LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanInstance, VulkanResult};
pub use window::{ResizeSignal, Window, WindowError};
