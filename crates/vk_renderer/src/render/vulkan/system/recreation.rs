//! Swapchain generations and their rebuild
//!
//! Everything whose size or count follows the surface lives in one
//! [`SwapchainGeneration`]. A generation is only ever built or dropped as a
//! whole; [`RecreationController`] waits for the device to go idle, drops the
//! old one and builds its replacement.

use ash::{vk, Device};

use crate::render::vulkan::core::buffer::{IndexBuffer, UniformBuffer, VertexBuffer};
use crate::render::vulkan::core::commands::{CommandBuffers, CommandPool};
use crate::render::vulkan::core::context::{VulkanContext, VulkanError, VulkanResult};
use crate::render::vulkan::core::descriptor_set::{
    DescriptorPool, DescriptorSetLayout, DescriptorSetWriter, TEXTURE_SAMPLER_BINDING, UNIFORM_BUFFER_BINDING,
};
use crate::render::vulkan::core::framebuffer::Framebuffer;
use crate::render::vulkan::core::image::Image;
use crate::render::vulkan::core::render_pass::RenderPass;
use crate::render::vulkan::core::shader::{GraphicsPipeline, ShaderCode, ShaderModule};
use crate::render::vulkan::core::swapchain::SwapchainManager;
use crate::render::vulkan::core::sync::FrameSynchronizer;
use crate::render::vulkan::core::texture::Texture;
use crate::render::vulkan::core::uniform_buffer::UniformBufferObject;

/// Background colour every frame is cleared to
const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Members of a generation, for reasoning about build and teardown order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationResource {
    /// The swapchain and its images
    Swapchain,
    /// One view per swapchain image
    ImageViews,
    /// Forward render pass in the swapchain format
    RenderPass,
    /// Graphics pipeline with the extent baked in
    Pipeline,
    /// Multisampled colour image, absent without MSAA
    ColorTarget,
    /// Depth image
    DepthBuffer,
    /// One framebuffer per image view
    Framebuffers,
    /// One transform buffer per swapchain image
    UniformBuffers,
    /// Descriptor pool and the per-image sets it owns
    DescriptorSets,
    /// Prerecorded draw commands, one per swapchain image
    CommandBuffers,
}

impl GenerationResource {
    /// Order the members are created in
    pub const BUILD_ORDER: [Self; 10] = [
        Self::Swapchain,
        Self::ImageViews,
        Self::RenderPass,
        Self::Pipeline,
        Self::ColorTarget,
        Self::DepthBuffer,
        Self::Framebuffers,
        Self::UniformBuffers,
        Self::DescriptorSets,
        Self::CommandBuffers,
    ];

    /// Order the members are destroyed in
    ///
    /// The descriptor pool goes before the uniform buffers its sets point at,
    /// so nothing is destroyed while a live object still references it.
    ///
    /// This table only describes the order. The actual drop order is the
    /// field order of [`SwapchainGeneration`], so change both together.
    pub const TEARDOWN_ORDER: [Self; 10] = [
        Self::CommandBuffers,
        Self::Framebuffers,
        Self::Pipeline,
        Self::RenderPass,
        Self::DepthBuffer,
        Self::ColorTarget,
        Self::DescriptorSets,
        Self::UniformBuffers,
        Self::ImageViews,
        Self::Swapchain,
    ];

    /// Members that must exist before this one is created
    pub fn dependencies(self) -> &'static [Self] {
        match self {
            Self::Swapchain => &[],
            Self::ImageViews | Self::RenderPass | Self::ColorTarget | Self::DepthBuffer | Self::UniformBuffers => {
                &[Self::Swapchain]
            }
            Self::Pipeline => &[Self::Swapchain, Self::RenderPass],
            Self::Framebuffers => &[Self::ImageViews, Self::RenderPass, Self::ColorTarget, Self::DepthBuffer],
            Self::DescriptorSets => &[Self::Swapchain, Self::UniformBuffers],
            Self::CommandBuffers => &[Self::RenderPass, Self::Pipeline, Self::Framebuffers, Self::DescriptorSets],
        }
    }
}

/// Long-lived resources a generation is built from
pub struct GenerationInputs<'a> {
    /// Device, surface and queues
    pub context: &'a VulkanContext,
    /// Pool for per-image command buffers and one-off uploads
    pub command_pool: &'a CommandPool,
    /// Layout every per-image descriptor set uses
    pub descriptor_layout: &'a DescriptorSetLayout,
    /// Texture bound into every descriptor set
    pub texture: &'a Texture,
    /// Mesh vertices
    pub vertex_buffer: &'a VertexBuffer,
    /// Mesh indices
    pub index_buffer: &'a IndexBuffer,
    /// Shader stages, read once at startup
    pub shaders: &'a ShaderCode,
    /// Ask for MAILBOX presentation when available
    pub prefer_mailbox: bool,
}

/// All extent-dependent resources of one swapchain
///
/// Field order is drop order. Keep it in step with
/// [`GenerationResource::TEARDOWN_ORDER`], which is what the ordering tests
/// check; the image views are dropped inside `swapchain`.
pub struct SwapchainGeneration {
    command_buffers: CommandBuffers,
    framebuffers: Vec<Framebuffer>,
    pipeline: GraphicsPipeline,
    render_pass: RenderPass,
    // Only referenced through framebuffers and descriptor sets; held for drop
    #[allow(dead_code)]
    depth: Image,
    #[allow(dead_code)]
    color_target: Option<Image>,
    #[allow(dead_code)]
    descriptor_pool: DescriptorPool,
    descriptor_sets: Vec<vk::DescriptorSet>,
    uniform_buffers: Vec<UniformBuffer<UniformBufferObject>>,
    swapchain: SwapchainManager,
}

impl SwapchainGeneration {
    /// Build a complete generation for `framebuffer_size`
    pub fn build(inputs: &GenerationInputs<'_>, framebuffer_size: (u32, u32)) -> VulkanResult<Self> {
        let context = inputs.context;
        let device = context.raw_device();
        let physical = &context.physical_device;

        let swapchain = SwapchainManager::new(context, framebuffer_size, inputs.prefer_mailbox)?;
        let extent = swapchain.extent();
        let image_count = swapchain.image_count();

        let render_pass = RenderPass::new_forward_pass(
            device.clone(),
            swapchain.format(),
            physical.depth_format,
            physical.msaa_samples,
        )?;

        let pipeline = {
            let vertex_shader = ShaderModule::from_spirv(device.clone(), &inputs.shaders.vertex)?;
            let fragment_shader = ShaderModule::from_spirv(device.clone(), &inputs.shaders.fragment)?;
            GraphicsPipeline::new(
                device.clone(),
                render_pass.handle(),
                inputs.descriptor_layout.handle(),
                &vertex_shader,
                &fragment_shader,
                extent,
                render_pass.samples(),
            )?
        };

        let color_target = if render_pass.is_multisampled() {
            Some(Image::color_target(context, extent, swapchain.format(), render_pass.samples())?)
        } else {
            None
        };
        let depth = Image::depth_buffer(context, inputs.command_pool, extent)?;

        let framebuffers = Framebuffer::for_swapchain(
            &device,
            &render_pass,
            swapchain.image_views(),
            depth.view(),
            color_target.as_ref().map(Image::view),
            extent,
        )?;

        let uniform_buffers = (0..image_count)
            .map(|_| UniformBuffer::new(device.clone(), &physical.memory_properties))
            .collect::<VulkanResult<Vec<_>>>()?;

        let descriptor_pool = DescriptorPool::new(device.clone(), image_count as u32)?;
        let descriptor_sets = descriptor_pool.allocate_descriptor_sets(inputs.descriptor_layout.handle(), image_count)?;
        write_descriptor_sets(&device, &descriptor_sets, &uniform_buffers, inputs.texture);

        let command_buffers = inputs.command_pool.allocate(image_count as u32)?;

        let generation = Self {
            command_buffers,
            framebuffers,
            pipeline,
            render_pass,
            depth,
            color_target,
            descriptor_pool,
            descriptor_sets,
            uniform_buffers,
            swapchain,
        };
        generation.record_draw_commands(inputs)?;

        log::debug!(
            "Built swapchain generation: {} images, {}x{}, {:?} samples",
            image_count,
            extent.width,
            extent.height,
            generation.render_pass.samples()
        );
        Ok(generation)
    }

    fn record_draw_commands(&self, inputs: &GenerationInputs<'_>) -> VulkanResult<()> {
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: self.extent(),
        };
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue { float32: CLEAR_COLOR },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            },
        ];

        for (index, framebuffer) in self.framebuffers.iter().enumerate() {
            let descriptor_set = self.descriptor_sets.get(index).copied().ok_or_else(|| {
                VulkanError::InvalidOperation {
                    reason: format!("No descriptor set for swapchain image {index}"),
                }
            })?;

            let mut recorder = self.command_buffers.recorder(index)?;
            recorder.begin(vk::CommandBufferUsageFlags::empty())?;
            {
                let mut pass = recorder.begin_render_pass(
                    self.render_pass.handle(),
                    framebuffer.handle(),
                    render_area,
                    &clear_values,
                )?;
                pass.bind_pipeline(self.pipeline.handle());
                pass.bind_vertex_buffer(inputs.vertex_buffer.handle());
                pass.bind_index_buffer(inputs.index_buffer.handle());
                pass.bind_descriptor_sets(self.pipeline.layout(), &[descriptor_set]);
                pass.draw_indexed(inputs.index_buffer.index_count(), 1);
            }
            recorder.end()?;
        }
        Ok(())
    }

    /// The swapchain of this generation
    pub fn swapchain(&self) -> &SwapchainManager {
        &self.swapchain
    }

    /// Swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    /// Number of swapchain images
    pub fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    /// Prerecorded draw commands for `image_index`
    pub fn command_buffer(&self, image_index: u32) -> VulkanResult<vk::CommandBuffer> {
        self.command_buffers.get(image_index as usize)
    }

    /// Uniform buffer read by the commands of `image_index`
    pub fn uniform_buffer(&self, image_index: u32) -> VulkanResult<&UniformBuffer<UniformBufferObject>> {
        self.uniform_buffers
            .get(image_index as usize)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("No uniform buffer for swapchain image {image_index}"),
            })
    }
}

fn write_descriptor_sets(
    device: &Device,
    descriptor_sets: &[vk::DescriptorSet],
    uniform_buffers: &[UniformBuffer<UniformBufferObject>],
    texture: &Texture,
) {
    descriptor_sets
        .iter()
        .zip(uniform_buffers)
        .fold(DescriptorSetWriter::new(), |writer, (&set, uniform_buffer)| {
            writer
                .write_buffer(set, UNIFORM_BUFFER_BINDING, uniform_buffer.handle(), uniform_buffer.range())
                .write_image(set, TEXTURE_SAMPLER_BINDING, texture.image_view(), texture.sampler())
        })
        .update(device);
}

/// Owns the current generation and replaces it on demand
pub struct RecreationController {
    generation: Option<SwapchainGeneration>,
}

impl RecreationController {
    /// Build the first generation
    pub fn new(inputs: &GenerationInputs<'_>, framebuffer_size: (u32, u32)) -> VulkanResult<Self> {
        let generation = SwapchainGeneration::build(inputs, framebuffer_size)?;
        log_generation("Created", &generation);
        Ok(Self {
            generation: Some(generation),
        })
    }

    /// The live generation
    ///
    /// Only missing after a rebuild failed, which is fatal for the renderer.
    pub fn generation(&self) -> VulkanResult<&SwapchainGeneration> {
        self.generation.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "No swapchain generation; the last rebuild failed".to_string(),
        })
    }

    /// Idle the device, drop the old generation and build a new one
    ///
    /// Frame slots are left alone apart from forgetting which image each one
    /// last rendered to.
    pub fn recreate(
        &mut self,
        inputs: &GenerationInputs<'_>,
        sync: &mut FrameSynchronizer,
        framebuffer_size: (u32, u32),
    ) -> VulkanResult<()> {
        inputs.context.wait_idle()?;

        // The old swapchain must be gone before its replacement is created
        drop(self.generation.take());

        let generation = SwapchainGeneration::build(inputs, framebuffer_size)?;
        sync.reset_image_tracking(generation.image_count());
        log_generation("Recreated", &generation);
        self.generation = Some(generation);
        Ok(())
    }
}

fn log_generation(action: &str, generation: &SwapchainGeneration) {
    let settings = generation.swapchain().settings();
    log::info!(
        "{} swapchain: {}x{}, {:?}, {:?}, {} images",
        action,
        settings.extent.width,
        settings.extent.height,
        settings.surface_format.format,
        settings.present_mode,
        generation.image_count()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn position(order: &[GenerationResource], resource: GenerationResource) -> usize {
        order.iter().position(|&r| r == resource).unwrap()
    }

    #[test]
    fn test_orders_cover_every_resource_once() {
        for order in [GenerationResource::BUILD_ORDER, GenerationResource::TEARDOWN_ORDER] {
            let unique: HashSet<_> = order.iter().collect();
            assert_eq!(unique.len(), order.len());
        }
        let build: HashSet<_> = GenerationResource::BUILD_ORDER.iter().collect();
        let teardown: HashSet<_> = GenerationResource::TEARDOWN_ORDER.iter().collect();
        assert_eq!(build, teardown);
    }

    #[test]
    fn test_build_order_is_topological() {
        let order = GenerationResource::BUILD_ORDER;
        for resource in order {
            for &dependency in resource.dependencies() {
                assert!(
                    position(&order, dependency) < position(&order, resource),
                    "{resource:?} built before its dependency {dependency:?}"
                );
            }
        }
    }

    #[test]
    fn test_teardown_never_precedes_a_dependant() {
        let order = GenerationResource::TEARDOWN_ORDER;
        for resource in order {
            for &dependency in resource.dependencies() {
                assert!(
                    position(&order, resource) < position(&order, dependency),
                    "{dependency:?} destroyed while {resource:?} still uses it"
                );
            }
        }
    }

    #[test]
    fn test_descriptor_pool_is_torn_down_before_uniform_buffers() {
        let order = GenerationResource::TEARDOWN_ORDER;
        assert!(
            position(&order, GenerationResource::DescriptorSets)
                < position(&order, GenerationResource::UniformBuffers)
        );
    }

    #[test]
    fn test_command_buffers_go_first_and_swapchain_last() {
        assert_eq!(GenerationResource::TEARDOWN_ORDER[0], GenerationResource::CommandBuffers);
        assert_eq!(GenerationResource::TEARDOWN_ORDER[9], GenerationResource::Swapchain);
        assert_eq!(GenerationResource::BUILD_ORDER[0], GenerationResource::Swapchain);
        assert_eq!(GenerationResource::BUILD_ORDER[9], GenerationResource::CommandBuffers);
    }
}
