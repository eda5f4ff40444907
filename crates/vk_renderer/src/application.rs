//! Viewer application
//!
//! Loads the model and texture, brings up the renderer and pumps window
//! events and frames until the window closes.

use thiserror::Error;

use crate::assets::{AssetError, ImageData, ObjLoader};
use crate::core::config::ApplicationConfig;
use crate::config::ConfigError;
use crate::foundation::time::FrameTimer;
use crate::render::vulkan::core::context::VulkanError;
use crate::render::vulkan::core::window::{Window, WindowError};
use crate::render::vulkan::system::renderer::VulkanRenderer;
use crate::render::vulkan::system::scheduler::{FrameOutcome, FrameScheduler};

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration could not be used
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Window setup failed
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Vulkan setup or a frame failed
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] VulkanError),

    /// Model or texture could not be loaded
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
}

/// Window, renderer and frame pacing wired together
///
/// Field order is drop order: the renderer releases the surface before the
/// window it was created from goes away.
pub struct Application {
    scheduler: FrameScheduler,
    renderer: VulkanRenderer,
    timer: FrameTimer,
    window: Window,
}

impl Application {
    /// Create the window, load assets and initialise Vulkan
    pub fn new(config: &ApplicationConfig) -> Result<Self, AppError> {
        config.validate()?;
        config.renderer.shaders.validate().map_err(ConfigError::Invalid)?;

        let window = Window::new(&config.window)?;

        let mesh = ObjLoader::load_obj(&config.assets.model_path).map_err(AssetError::from)?;
        log::info!(
            "Loaded model {} with {} vertices and {} indices",
            config.assets.model_path,
            mesh.vertices.len(),
            mesh.indices.len()
        );

        let image = ImageData::from_file(&config.assets.texture_path)?;
        log::info!(
            "Loaded texture {} ({}x{}, {} mip levels)",
            config.assets.texture_path,
            image.width,
            image.height,
            image.mip_levels()
        );

        let renderer = VulkanRenderer::new(&window, &config.renderer, &mesh, &image)?;
        let scheduler = FrameScheduler::new(renderer.frames_in_flight(), window.resize_signal())?;

        let extent = renderer.swapchain_extent()?;
        log::info!("Rendering at {}x{}", extent.width, extent.height);

        Ok(Self {
            scheduler,
            renderer,
            timer: FrameTimer::default(),
            window,
        })
    }

    /// Draw frames until the window is closed
    pub fn run(&mut self) -> Result<(), AppError> {
        log::info!("Entering render loop");

        while !self.window.should_close() {
            self.window.poll_events();
            self.renderer.set_animation_time(self.timer.elapsed_secs());

            let outcome = self.scheduler.draw_frame(&mut self.renderer, &mut self.window)?;
            if outcome == FrameOutcome::Presented {
                if let Some(fps) = self.timer.frame_presented() {
                    log::info!("{fps:.1} FPS");
                }
            }
        }

        self.renderer.wait_idle()?;
        log::info!(
            "Render loop finished: {} frames presented, {} swapchain rebuilds",
            self.scheduler.frames_presented(),
            self.scheduler.recreations()
        );
        Ok(())
    }
}
