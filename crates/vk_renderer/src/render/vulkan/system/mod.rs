//! Frame loop orchestration
//!
//! - [`scheduler`]: per-frame state machine and frame pacing
//! - [`recreation`]: building and tearing down extent-dependent resources
//! - [`renderer`]: the Vulkan implementation of the scheduler's backend

pub mod recreation;
pub mod renderer;
pub mod scheduler;

pub use recreation::{RecreationController, SwapchainGeneration};
pub use renderer::VulkanRenderer;
pub use scheduler::{FrameBackend, FrameOutcome, FrameScheduler, FrameState, SurfaceSize};
