//! Device-local images: the texture, the depth buffer and the MSAA colour target
//!
//! [`Image`] owns the image, its memory and one view over all of its mip
//! levels. Layout transitions are limited to the pairs the viewer actually
//! needs; anything else is reported instead of guessed at.

use ash::{vk, Device, Instance};

use super::buffer::allocate_memory;
use super::commands::{CommandPool, CommandRecorder};
use super::context::{VulkanContext, VulkanError, VulkanResult};
use super::device_selection;

/// Creation parameters for [`Image::new`]
#[derive(Debug, Clone, Copy)]
pub struct ImageDesc {
    /// Size of mip level 0
    pub extent: vk::Extent2D,
    /// Number of mip levels
    pub mip_levels: u32,
    /// Samples per pixel
    pub samples: vk::SampleCountFlags,
    /// Texel format
    pub format: vk::Format,
    /// How the image will be used
    pub usage: vk::ImageUsageFlags,
    /// Aspect of the created view
    pub aspect: vk::ImageAspectFlags,
}

/// Image + memory + view with RAII cleanup
pub struct Image {
    device: Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
    view: vk::ImageView,
    desc: ImageDesc,
}

impl Image {
    /// Create an optimally tiled, device-local image and a view over it
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        desc: ImageDesc,
    ) -> VulkanResult<Self> {
        let image_create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: desc.extent.width,
                height: desc.extent.height,
                depth: 1,
            })
            .mip_levels(desc.mip_levels)
            .array_layers(1)
            .format(desc.format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(desc.usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(desc.samples);

        let image = unsafe {
            device.create_image(&image_create_info, None)
                .map_err(VulkanError::Api)?
        };

        let requirements = unsafe { device.get_image_memory_requirements(image) };
        let memory = match allocate_memory(&device, memory_properties, requirements, vk::MemoryPropertyFlags::DEVICE_LOCAL) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_image(image, None) };
                return Err(e);
            }
        };

        let mut created = Self {
            device,
            image,
            memory,
            view: vk::ImageView::null(),
            desc,
        };

        unsafe {
            created.device
                .bind_image_memory(image, memory, 0)
                .map_err(VulkanError::Api)?;
        }

        let view_create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(desc.format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: desc.aspect,
                base_mip_level: 0,
                level_count: desc.mip_levels,
                base_array_layer: 0,
                layer_count: 1,
            });
        created.view = unsafe {
            created.device
                .create_image_view(&view_create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(created)
    }

    /// Multisampled colour target that the render pass resolves into the swapchain image
    pub fn color_target(
        context: &VulkanContext,
        extent: vk::Extent2D,
        format: vk::Format,
        samples: vk::SampleCountFlags,
    ) -> VulkanResult<Self> {
        Self::new(
            context.raw_device(),
            &context.physical_device.memory_properties,
            ImageDesc {
                extent,
                mip_levels: 1,
                samples,
                format,
                usage: vk::ImageUsageFlags::TRANSIENT_ATTACHMENT | vk::ImageUsageFlags::COLOR_ATTACHMENT,
                aspect: vk::ImageAspectFlags::COLOR,
            },
        )
    }

    /// Depth buffer in the device's chosen depth format, already in attachment layout
    pub fn depth_buffer(context: &VulkanContext, command_pool: &CommandPool, extent: vk::Extent2D) -> VulkanResult<Self> {
        let physical = &context.physical_device;
        let depth = Self::new(
            context.raw_device(),
            &physical.memory_properties,
            ImageDesc {
                extent,
                mip_levels: 1,
                samples: physical.msaa_samples,
                format: physical.depth_format,
                usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
                aspect: vk::ImageAspectFlags::DEPTH,
            },
        )?;

        command_pool.submit_single_time(context.graphics_queue(), |recorder| {
            depth.record_transition(
                recorder,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            )
        })?;

        Ok(depth)
    }

    /// Record a layout transition covering every mip level
    pub fn record_transition(
        &self,
        recorder: &mut CommandRecorder,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    ) -> VulkanResult<()> {
        let plan = TransitionPlan::for_layouts(self.desc.format, old_layout, new_layout)?;
        let barrier = vk::ImageMemoryBarrier::builder()
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.image)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: plan.aspect,
                base_mip_level: 0,
                level_count: self.desc.mip_levels,
                base_array_layer: 0,
                layer_count: 1,
            })
            .src_access_mask(plan.src_access)
            .dst_access_mask(plan.dst_access)
            .build();

        recorder.image_barrier(plan.src_stage, plan.dst_stage, &[barrier])
    }

    /// Fill the mip chain from level 0 with linear blits
    ///
    /// Expects every level in TRANSFER_DST layout and leaves every level in
    /// SHADER_READ_ONLY layout.
    pub fn record_mipmap_generation(
        &self,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        recorder: &mut CommandRecorder,
    ) -> VulkanResult<()> {
        let format_properties = unsafe { instance.get_physical_device_format_properties(physical_device, self.desc.format) };
        if !format_properties
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR)
        {
            return Err(VulkanError::Setup(format!(
                "Texture image format {:?} does not support linear blitting",
                self.desc.format
            )));
        }

        let level_barrier = |level: u32,
                             old_layout: vk::ImageLayout,
                             new_layout: vk::ImageLayout,
                             src_access: vk::AccessFlags,
                             dst_access: vk::AccessFlags| {
            vk::ImageMemoryBarrier::builder()
                .image(self.image)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: level,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .old_layout(old_layout)
                .new_layout(new_layout)
                .src_access_mask(src_access)
                .dst_access_mask(dst_access)
                .build()
        };

        let mut width = self.desc.extent.width as i32;
        let mut height = self.desc.extent.height as i32;

        for level in 1..self.desc.mip_levels {
            let src = level - 1;

            recorder.image_barrier(
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::TRANSFER,
                &[level_barrier(
                    src,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    vk::AccessFlags::TRANSFER_WRITE,
                    vk::AccessFlags::TRANSFER_READ,
                )],
            )?;

            let next_width = (width / 2).max(1);
            let next_height = (height / 2).max(1);
            let blit = vk::ImageBlit {
                src_subresource: color_layers(src),
                src_offsets: [vk::Offset3D::default(), vk::Offset3D { x: width, y: height, z: 1 }],
                dst_subresource: color_layers(level),
                dst_offsets: [
                    vk::Offset3D::default(),
                    vk::Offset3D { x: next_width, y: next_height, z: 1 },
                ],
            };
            recorder.blit_image(self.image, blit)?;

            recorder.image_barrier(
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                &[level_barrier(
                    src,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    vk::AccessFlags::TRANSFER_READ,
                    vk::AccessFlags::SHADER_READ,
                )],
            )?;

            width = next_width;
            height = next_height;
        }

        // The last level was only ever written to
        recorder.image_barrier(
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            &[level_barrier(
                self.desc.mip_levels - 1,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                vk::AccessFlags::TRANSFER_WRITE,
                vk::AccessFlags::SHADER_READ,
            )],
        )
    }

    /// Image handle
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    /// View over all mip levels
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    /// Creation parameters
    pub fn desc(&self) -> &ImageDesc {
        &self.desc
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.device.destroy_image_view(self.view, None);
            }
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

fn color_layers(mip_level: u32) -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        mip_level,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// Access masks, stages and aspect for one supported layout transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    /// Accesses that must complete before the transition
    pub src_access: vk::AccessFlags,
    /// Accesses that wait for the transition
    pub dst_access: vk::AccessFlags,
    /// Stage the barrier waits on
    pub src_stage: vk::PipelineStageFlags,
    /// Stage that waits on the barrier
    pub dst_stage: vk::PipelineStageFlags,
    /// Aspect of the affected subresources
    pub aspect: vk::ImageAspectFlags,
}

impl TransitionPlan {
    /// Plan a transition, rejecting layout pairs the viewer never performs
    pub fn for_layouts(format: vk::Format, old: vk::ImageLayout, new: vk::ImageLayout) -> VulkanResult<Self> {
        use vk::ImageLayout as L;

        match (old, new) {
            (L::UNDEFINED, L::TRANSFER_DST_OPTIMAL) => Ok(Self {
                src_access: vk::AccessFlags::empty(),
                dst_access: vk::AccessFlags::TRANSFER_WRITE,
                src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
                dst_stage: vk::PipelineStageFlags::TRANSFER,
                aspect: vk::ImageAspectFlags::COLOR,
            }),
            (L::TRANSFER_DST_OPTIMAL, L::SHADER_READ_ONLY_OPTIMAL) => Ok(Self {
                src_access: vk::AccessFlags::TRANSFER_WRITE,
                dst_access: vk::AccessFlags::SHADER_READ,
                src_stage: vk::PipelineStageFlags::TRANSFER,
                dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
                aspect: vk::ImageAspectFlags::COLOR,
            }),
            (L::UNDEFINED, L::DEPTH_STENCIL_ATTACHMENT_OPTIMAL) => Ok(Self {
                src_access: vk::AccessFlags::empty(),
                dst_access: vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
                dst_stage: vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
                aspect: device_selection::depth_aspect(format),
            }),
            _ => Err(VulkanError::InvalidOperation {
                reason: format!("Unsupported layout transition {old:?} -> {new:?}"),
            }),
        }
    }
}
