//! Vulkan renderer
//!
//! Owns every GPU object the viewer needs and exposes the per-frame steps to
//! [`FrameScheduler`](super::scheduler::FrameScheduler) through [`FrameBackend`].
//! Extent-independent resources are created once here; the rest lives in the
//! current swapchain generation.

use ash::vk;

use super::recreation::{GenerationInputs, RecreationController};
use super::scheduler::FrameBackend;
use crate::assets::ImageData;
use crate::core::config::VulkanRendererConfig;
use crate::render::mesh::Mesh;
use crate::render::vulkan::core::buffer::{IndexBuffer, VertexBuffer};
use crate::render::vulkan::core::commands::CommandPool;
use crate::render::vulkan::core::context::{VulkanContext, VulkanError, VulkanResult};
use crate::render::vulkan::core::descriptor_set::{DescriptorSetLayout, DescriptorSetLayoutBuilder};
use crate::render::vulkan::core::shader::ShaderCode;
use crate::render::vulkan::core::swapchain::{AcquireOutcome, PresentOutcome};
use crate::render::vulkan::core::sync::FrameSynchronizer;
use crate::render::vulkan::core::texture::Texture;
use crate::render::vulkan::core::uniform_buffer::UniformBufferObject;
use crate::render::vulkan::core::window::Window;

/// Vulkan renderer drawing one textured mesh
///
/// Field order is drop order: the swapchain generation goes first and the
/// context (device, surface, instance) last.
pub struct VulkanRenderer {
    recreation: RecreationController,
    sync: FrameSynchronizer,
    texture: Texture,
    index_buffer: IndexBuffer,
    vertex_buffer: VertexBuffer,
    descriptor_layout: DescriptorSetLayout,
    command_pool: CommandPool,
    shaders: ShaderCode,
    prefer_mailbox: bool,
    animation_secs: f32,
    context: VulkanContext,
}

impl VulkanRenderer {
    /// Set up Vulkan for `window` and upload the mesh and texture
    pub fn new(window: &Window, config: &VulkanRendererConfig, mesh: &Mesh, image: &ImageData) -> VulkanResult<Self> {
        log::info!("Initializing Vulkan renderer...");
        if mesh.is_empty() {
            return Err(VulkanError::Setup("Mesh has no triangles to draw".to_string()));
        }

        let shaders = ShaderCode::load(&config.shaders)?;
        let context = VulkanContext::new(window, config)?;

        let command_pool = CommandPool::new(context.raw_device(), context.graphics_queue_family())?;
        let descriptor_layout = DescriptorSetLayoutBuilder::textured_mesh().build(&context.device.device)?;
        let vertex_buffer = VertexBuffer::new(&context, &command_pool, &mesh.vertices)?;
        let index_buffer = IndexBuffer::new(&context, &command_pool, &mesh.indices)?;
        let texture = Texture::from_image_data(&context, &command_pool, image)?;
        log::debug!(
            "Uploaded {} vertices, {} indices and a texture with {} mip levels",
            vertex_buffer.vertex_count(),
            index_buffer.index_count(),
            texture.mip_levels()
        );

        let mut sync = FrameSynchronizer::new(&context.device.device, config.max_frames_in_flight)?;

        let recreation = RecreationController::new(
            &GenerationInputs {
                context: &context,
                command_pool: &command_pool,
                descriptor_layout: &descriptor_layout,
                texture: &texture,
                vertex_buffer: &vertex_buffer,
                index_buffer: &index_buffer,
                shaders: &shaders,
                prefer_mailbox: config.prefer_mailbox,
            },
            window.framebuffer_size(),
        )?;
        sync.reset_image_tracking(recreation.generation()?.image_count());

        log::info!(
            "Vulkan renderer ready with {} frames in flight",
            sync.frames_in_flight()
        );

        Ok(Self {
            recreation,
            sync,
            texture,
            index_buffer,
            vertex_buffer,
            descriptor_layout,
            command_pool,
            shaders,
            prefer_mailbox: config.prefer_mailbox,
            animation_secs: 0.0,
            context,
        })
    }

    /// Seconds of animation the next uniform update renders
    pub fn set_animation_time(&mut self, secs: f32) {
        self.animation_secs = secs;
    }

    /// Number of in-flight frame slots
    pub fn frames_in_flight(&self) -> usize {
        self.sync.frames_in_flight()
    }

    /// Current swapchain extent
    pub fn swapchain_extent(&self) -> VulkanResult<vk::Extent2D> {
        Ok(self.recreation.generation()?.extent())
    }

    /// Block until the GPU has finished all submitted work
    pub fn wait_idle(&self) -> VulkanResult<()> {
        self.context.wait_idle()
    }
}

impl FrameBackend for VulkanRenderer {
    fn wait_for_slot(&mut self, slot: usize) -> VulkanResult<()> {
        self.sync.wait(slot)
    }

    fn acquire(&mut self, slot: usize) -> VulkanResult<AcquireOutcome> {
        let image_available = self.sync.slot(slot)?.image_available.handle();
        self.recreation
            .generation()?
            .swapchain()
            .acquire_next_image(image_available)
    }

    fn claim_image(&mut self, slot: usize, image_index: u32) -> VulkanResult<()> {
        self.sync.claim_image(slot, image_index)
    }

    fn update_uniforms(&mut self, image_index: u32) -> VulkanResult<()> {
        let generation = self.recreation.generation()?;
        let ubo = UniformBufferObject::spinning(self.animation_secs, generation.extent());
        generation.uniform_buffer(image_index)?.update(&ubo)
    }

    fn submit(&mut self, slot: usize, image_index: u32) -> VulkanResult<()> {
        // Reset only right before the submission that will signal it again
        self.sync.wait_and_reset(slot)?;

        let frame = self.sync.slot(slot)?;
        let command_buffers = [self.recreation.generation()?.command_buffer(image_index)?];
        let wait_semaphores = [frame.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [frame.render_finished.handle()];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe {
            self.context
                .device
                .device
                .queue_submit(self.context.graphics_queue(), &[submit_info], frame.in_flight.handle())
                .map_err(VulkanError::Submit)
        }
    }

    fn present(&mut self, slot: usize, image_index: u32) -> VulkanResult<PresentOutcome> {
        let render_finished = self.sync.slot(slot)?.render_finished.handle();
        self.recreation.generation()?.swapchain().present(
            self.context.present_queue(),
            image_index,
            render_finished,
        )
    }

    fn recreate(&mut self, framebuffer_size: (u32, u32)) -> VulkanResult<()> {
        let inputs = GenerationInputs {
            context: &self.context,
            command_pool: &self.command_pool,
            descriptor_layout: &self.descriptor_layout,
            texture: &self.texture,
            vertex_buffer: &self.vertex_buffer,
            index_buffer: &self.index_buffer,
            shaders: &self.shaders,
            prefer_mailbox: self.prefer_mailbox,
        };
        self.recreation.recreate(&inputs, &mut self.sync, framebuffer_size)
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        log::debug!("Shutting down Vulkan renderer");
        if let Err(e) = self.context.wait_idle() {
            log::error!("Device wait failed during shutdown: {e}");
        }
    }
}
