//! # vk_renderer
//!
//! A small Vulkan model viewer: one textured mesh, spinning, drawn with
//! depth testing, MSAA and mipmapped sampling.
//!
//! The interesting part is the frame loop. Up to `max_frames_in_flight`
//! frames are in flight at once, each slot guarded by its own fence and
//! semaphores, and the swapchain with everything sized from it is rebuilt
//! whenever the window is resized or the surface reports it as stale.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vk_renderer::prelude::*;
//!
//! fn main() -> Result<(), AppError> {
//!     let config = ApplicationConfig::load_or_default("viewer.toml")?;
//!     vk_renderer::foundation::logging::init_with_level(&config.logging.level);
//!     Application::new(&config)?.run()
//! }
//! ```

pub mod application;
pub mod assets;
pub mod config;
pub mod core;
pub mod foundation;
pub mod render;

pub use application::{AppError, Application};

/// Common imports for viewer users
pub mod prelude {
    pub use crate::{
        application::{AppError, Application},
        assets::{ImageData, ObjLoader},
        config::{Config, ConfigError},
        core::config::{ApplicationConfig, AssetConfig, ShaderConfig, VulkanRendererConfig, WindowConfig},
        render::{Mesh, Vertex, VulkanRenderer},
    };
}
