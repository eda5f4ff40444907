//! Vulkan swapchain management
//!
//! Format, present mode, extent and image count are negotiated by pure
//! functions over the queried surface support; [`SwapchainManager`] owns the
//! resulting swapchain and one image view per presentable image.
//!
//! Acquire and present report out-of-date and suboptimal surfaces as
//! values ([`AcquireOutcome`], [`PresentOutcome`]); only real failures are
//! errors.

use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device};

use super::context::{VulkanContext, VulkanError, VulkanResult};

/// Preferred colour format for presentation
pub const PREFERRED_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Result of asking the swapchain for the next image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image was acquired; `suboptimal` means it still works but the
    /// swapchain should be rebuilt after this frame
    Acquired {
        /// Index into the swapchain images
        image_index: u32,
        /// The surface no longer matches the swapchain exactly
        suboptimal: bool,
    },
    /// The swapchain can no longer be used; nothing was acquired
    OutOfDate,
}

/// Result of queueing an image for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Presented and the swapchain still matches the surface
    Optimal,
    /// Presented, but the swapchain should be rebuilt
    Suboptimal,
    /// Not usable any more; the swapchain must be rebuilt
    OutOfDate,
}

/// Surface support as reported by the driver
#[derive(Debug, Clone, Default)]
pub struct SwapchainSupport {
    /// Image count, extent and transform limits
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported format/colour space pairs
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    /// Query the surface support of a physical device
    pub fn query(
        surface_loader: &Surface,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VulkanResult<Self> {
        unsafe {
            Ok(Self {
                capabilities: surface_loader
                    .get_physical_device_surface_capabilities(physical_device, surface)
                    .map_err(VulkanError::Api)?,
                formats: surface_loader
                    .get_physical_device_surface_formats(physical_device, surface)
                    .map_err(VulkanError::Api)?,
                present_modes: surface_loader
                    .get_physical_device_surface_present_modes(physical_device, surface)
                    .map_err(VulkanError::Api)?,
            })
        }
    }
}

/// Preferred sRGB pair if offered, otherwise the first entry
pub fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|sf| sf.format == PREFERRED_FORMAT.format && sf.color_space == PREFERRED_FORMAT.color_space)
        .or_else(|| available.first())
        .copied()
}

/// MAILBOX whenever it is offered, otherwise FIFO, which every driver supports
///
/// `prefer_mailbox = false` opts out of MAILBOX and always yields FIFO, even
/// when MAILBOX is offered. The config default is `true`.
pub fn select_present_mode(available: &[vk::PresentModeKHR], prefer_mailbox: bool) -> vk::PresentModeKHR {
    if prefer_mailbox && available.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// The surface's fixed extent, or the framebuffer size clamped to its limits
///
/// A `current_extent.width` of `u32::MAX` means the surface lets the
/// swapchain decide.
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, framebuffer_size: (u32, u32)) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    vk::Extent2D {
        width: framebuffer_size.0.clamp(min.width, max.width),
        height: framebuffer_size.1.clamp(min.height, max.height),
    }
}

/// One more than the minimum, capped by the maximum when there is one
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        desired.min(capabilities.max_image_count)
    } else {
        desired
    }
}

/// The negotiated parameters a swapchain is created with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainSettings {
    /// Colour format and colour space
    pub surface_format: vk::SurfaceFormatKHR,
    /// Presentation mode
    pub present_mode: vk::PresentModeKHR,
    /// Image size in pixels
    pub extent: vk::Extent2D,
    /// Requested minimum image count
    pub image_count: u32,
    /// Surface transform to apply
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

impl SwapchainSettings {
    /// Combine the selection rules; identical inputs give identical settings
    pub fn negotiate(support: &SwapchainSupport, framebuffer_size: (u32, u32), prefer_mailbox: bool) -> VulkanResult<Self> {
        let surface_format = select_surface_format(&support.formats)
            .ok_or_else(|| VulkanError::Setup("Surface offers no formats".to_string()))?;

        Ok(Self {
            surface_format,
            present_mode: select_present_mode(&support.present_modes, prefer_mailbox),
            extent: choose_extent(&support.capabilities, framebuffer_size),
            image_count: choose_image_count(&support.capabilities),
            pre_transform: support.capabilities.current_transform,
        })
    }
}

/// Swapchain plus one image view per presentable image
pub struct SwapchainManager {
    device: Device,
    loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    settings: SwapchainSettings,
}

impl SwapchainManager {
    /// Create a swapchain sized for `framebuffer_size`
    pub fn new(context: &VulkanContext, framebuffer_size: (u32, u32), prefer_mailbox: bool) -> VulkanResult<Self> {
        let physical = &context.physical_device;
        let support = SwapchainSupport::query(&context.surface_loader, physical.device, context.surface)?;
        let settings = SwapchainSettings::negotiate(&support, framebuffer_size, prefer_mailbox)?;

        let family_indices = [physical.graphics_family, physical.present_family];
        let mut create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(context.surface)
            .min_image_count(settings.image_count)
            .image_format(settings.surface_format.format)
            .image_color_space(settings.surface_format.color_space)
            .image_extent(settings.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(settings.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(settings.present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        create_info = if physical.graphics_family == physical.present_family {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        } else {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&family_indices)
        };

        let loader = context.device.swapchain_loader.clone();
        let swapchain = unsafe {
            loader
                .create_swapchain(&create_info, None)
                .map_err(VulkanError::SwapchainCreation)?
        };

        let device = context.raw_device();
        let mut manager = Self {
            device,
            loader,
            swapchain,
            images: Vec::new(),
            image_views: Vec::new(),
            settings,
        };

        // From here on `manager`'s Drop cleans up whatever was created
        manager.images = unsafe {
            manager
                .loader
                .get_swapchain_images(manager.swapchain)
                .map_err(VulkanError::Api)?
        };
        for &image in &manager.images {
            let view = create_image_view(&manager.device, image, settings.surface_format.format)?;
            manager.image_views.push(view);
        }

        log::info!(
            "Created swapchain: {}x{}, {:?}, {:?}, {} images",
            settings.extent.width,
            settings.extent.height,
            settings.surface_format.format,
            settings.present_mode,
            manager.images.len()
        );

        Ok(manager)
    }

    /// Acquire the next image, signalling `image_available` when it is ready
    pub fn acquire_next_image(&self, image_available: vk::Semaphore) -> VulkanResult<AcquireOutcome> {
        let result = unsafe {
            self.loader
                .acquire_next_image(self.swapchain, u64::MAX, image_available, vk::Fence::null())
        };
        match result {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired { image_index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(VulkanError::Acquire(e)),
        }
    }

    /// Queue `image_index` for presentation once `render_finished` is signalled
    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        render_finished: vk::Semaphore,
    ) -> VulkanResult<PresentOutcome> {
        let wait_semaphores = [render_finished];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { self.loader.queue_present(queue, &present_info) } {
            Ok(false) => Ok(PresentOutcome::Optimal),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(VulkanError::Present(e)),
        }
    }

    /// Negotiated parameters
    pub fn settings(&self) -> &SwapchainSettings {
        &self.settings
    }

    /// Get swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.settings.extent
    }

    /// Get colour format
    pub fn format(&self) -> vk::Format {
        self.settings.surface_format.format
    }

    /// Get image views, one per swapchain image
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Number of images the driver actually created
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

impl Drop for SwapchainManager {
    fn drop(&mut self) {
        unsafe {
            for &image_view in &self.image_views {
                self.device.destroy_image_view(image_view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

fn create_image_view(device: &Device, image: vk::Image, format: vk::Format) -> VulkanResult<vk::ImageView> {
    let create_info = vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping::default())
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });

    unsafe { device.create_image_view(&create_info, None) }.map_err(VulkanError::Api)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space }
    }

    fn capabilities(current: (u32, u32), min_count: u32, max_count: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min_count,
            max_image_count: max_count,
            current_extent: vk::Extent2D { width: current.0, height: current.1 },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 2048 },
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            ..Default::default()
        }
    }

    #[test]
    fn test_preferred_format_wins_wherever_it_is() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            PREFERRED_FORMAT,
        ];
        assert_eq!(select_surface_format(&formats), Some(PREFERRED_FORMAT));
    }

    #[test]
    fn test_format_falls_back_to_first() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            // right format, wrong colour space
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT),
        ];
        assert_eq!(select_surface_format(&formats), Some(formats[0]));
        assert_eq!(select_surface_format(&[]), None);
    }

    #[test]
    fn test_present_mode_is_mailbox_or_fifo() {
        let all = [
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::FIFO_RELAXED,
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::FIFO,
        ];
        assert_eq!(select_present_mode(&all, true), vk::PresentModeKHR::MAILBOX);
        assert_eq!(select_present_mode(&all, false), vk::PresentModeKHR::FIFO);
        assert_eq!(
            select_present_mode(&[vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO_RELAXED], true),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn test_fixed_extent_is_used_as_is() {
        let caps = capabilities((1280, 720), 2, 8);
        assert_eq!(choose_extent(&caps, (10, 10)), vk::Extent2D { width: 1280, height: 720 });
    }

    #[test]
    fn test_flexible_extent_clamps_framebuffer() {
        let caps = capabilities((u32::MAX, u32::MAX), 2, 8);
        assert_eq!(choose_extent(&caps, (800, 600)), vk::Extent2D { width: 800, height: 600 });
        assert_eq!(choose_extent(&caps, (8000, 0)), vk::Extent2D { width: 4096, height: 1 });
    }

    #[test]
    fn test_image_count_respects_maximum() {
        assert_eq!(choose_image_count(&capabilities((1, 1), 2, 8)), 3);
        assert_eq!(choose_image_count(&capabilities((1, 1), 3, 3)), 3);
        // zero maximum means unbounded
        assert_eq!(choose_image_count(&capabilities((1, 1), 4, 0)), 5);
    }

    #[test]
    fn test_negotiation_is_deterministic() {
        let support = SwapchainSupport {
            capabilities: capabilities((u32::MAX, u32::MAX), 2, 3),
            formats: vec![format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR), PREFERRED_FORMAT],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        };

        let first = SwapchainSettings::negotiate(&support, (1024, 768), true).unwrap();
        let second = SwapchainSettings::negotiate(&support, (1024, 768), true).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.surface_format, PREFERRED_FORMAT);
        assert_eq!(first.present_mode, vk::PresentModeKHR::MAILBOX);
        assert_eq!(first.extent, vk::Extent2D { width: 1024, height: 768 });
        assert_eq!(first.image_count, 3);
    }

    #[test]
    fn test_negotiation_without_formats_fails() {
        let support = SwapchainSupport {
            capabilities: capabilities((640, 480), 2, 3),
            formats: Vec::new(),
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        assert!(matches!(
            SwapchainSettings::negotiate(&support, (640, 480), true),
            Err(VulkanError::Setup(_))
        ));
    }
}
