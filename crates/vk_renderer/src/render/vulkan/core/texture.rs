//! Vulkan texture management
//!
//! A mipmapped RGBA8 image plus the sampler the fragment shader reads it with.
//!
//! Texels are uploaded as `R8G8B8A8_SRGB` rather than `R8G8B8A8_UNORM`, so
//! sampling decodes them to linear colour and the sRGB swapchain encodes the
//! result again on write.

use ash::{vk, Device};

use super::buffer::Buffer;
use super::commands::CommandPool;
use super::context::{VulkanContext, VulkanError, VulkanResult};
use super::image::{Image, ImageDesc};
use crate::assets::ImageData;

/// Texel format every texture is uploaded as
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

/// Sampled texture with image, view and sampler
pub struct Texture {
    device: Device,
    sampler: vk::Sampler,
    image: Image,
}

impl Texture {
    /// Upload `data` through a staging buffer and build its full mip chain
    pub fn from_image_data(context: &VulkanContext, command_pool: &CommandPool, data: &ImageData) -> VulkanResult<Self> {
        data.validate()
            .map_err(|e| VulkanError::Setup(format!("Texture data rejected: {e}")))?;

        let memory_properties = &context.physical_device.memory_properties;
        let staging = Buffer::new(
            context.raw_device(),
            memory_properties,
            data.size_bytes() as vk::DeviceSize,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        staging.write(&data.data)?;

        let extent = vk::Extent2D {
            width: data.width,
            height: data.height,
        };
        let mip_levels = data.mip_levels();
        let image = Image::new(
            context.raw_device(),
            memory_properties,
            ImageDesc {
                extent,
                mip_levels,
                samples: vk::SampleCountFlags::TYPE_1,
                format: TEXTURE_FORMAT,
                usage: vk::ImageUsageFlags::TRANSFER_SRC
                    | vk::ImageUsageFlags::TRANSFER_DST
                    | vk::ImageUsageFlags::SAMPLED,
                aspect: vk::ImageAspectFlags::COLOR,
            },
        )?;

        command_pool.submit_single_time(context.graphics_queue(), |recorder| {
            image.record_transition(
                recorder,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            )?;
            recorder.copy_buffer_to_image(staging.handle(), image.handle(), extent)?;
            image.record_mipmap_generation(context.instance(), context.physical_device.device, recorder)
        })?;

        let sampler = create_sampler(context, mip_levels)?;
        log::debug!("Uploaded {}x{} texture with {} mip levels", data.width, data.height, mip_levels);

        Ok(Self {
            device: context.raw_device(),
            sampler,
            image,
        })
    }

    /// Get the image view for descriptor set binding
    pub fn image_view(&self) -> vk::ImageView {
        self.image.view()
    }

    /// Get the sampler for descriptor set binding
    pub fn sampler(&self) -> vk::Sampler {
        self.sampler
    }

    /// Number of mip levels
    pub fn mip_levels(&self) -> u32 {
        self.image.desc().mip_levels
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
        }
    }
}

fn create_sampler(context: &VulkanContext, mip_levels: u32) -> VulkanResult<vk::Sampler> {
    let max_anisotropy = context.physical_device.properties.limits.max_sampler_anisotropy;

    let sampler_create_info = vk::SamplerCreateInfo::builder()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::REPEAT)
        .address_mode_v(vk::SamplerAddressMode::REPEAT)
        .address_mode_w(vk::SamplerAddressMode::REPEAT)
        .anisotropy_enable(true)
        .max_anisotropy(max_anisotropy)
        .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
        .unnormalized_coordinates(false)
        .compare_enable(false)
        .compare_op(vk::CompareOp::ALWAYS)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .mip_lod_bias(0.0)
        .min_lod(0.0)
        .max_lod(mip_levels as f32);

    unsafe { context.device.device.create_sampler(&sampler_create_info, None) }.map_err(VulkanError::Api)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::vulkan::core::swapchain::PREFERRED_FORMAT;

    #[test]
    fn test_texture_and_swapchain_both_use_srgb_formats() {
        assert_eq!(TEXTURE_FORMAT, vk::Format::R8G8B8A8_SRGB);
        assert_eq!(PREFERRED_FORMAT.format, vk::Format::B8G8R8A8_SRGB);
    }
}
