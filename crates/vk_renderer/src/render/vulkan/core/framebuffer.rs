//! Framebuffer management
//!
//! One framebuffer per swapchain image, all sharing the depth buffer and
//! (with MSAA) the multisampled colour target.

use ash::{vk, Device};

use super::context::{VulkanError, VulkanResult};
use super::render_pass::{framebuffer_attachments, RenderPass};

/// Framebuffer wrapper with RAII cleanup
pub struct Framebuffer {
    device: Device,
    framebuffer: vk::Framebuffer,
}

impl Framebuffer {
    /// Create a new framebuffer
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let framebuffer_create_info = vk::FramebufferCreateInfo::builder()
            .render_pass(render_pass)
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe {
            device.create_framebuffer(&framebuffer_create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, framebuffer })
    }

    /// One framebuffer per swapchain image view
    pub fn for_swapchain(
        device: &Device,
        render_pass: &RenderPass,
        swapchain_views: &[vk::ImageView],
        depth_view: vk::ImageView,
        color_target: Option<vk::ImageView>,
        extent: vk::Extent2D,
    ) -> VulkanResult<Vec<Self>> {
        swapchain_views
            .iter()
            .map(|&view| {
                let attachments = framebuffer_attachments(view, depth_view, color_target);
                Self::new(device.clone(), render_pass.handle(), &attachments, extent)
            })
            .collect()
    }

    /// Get the framebuffer handle
    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}
