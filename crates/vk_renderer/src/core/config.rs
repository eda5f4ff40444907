//! # Viewer Configuration
//!
//! Every knob the viewer reads at startup lives here: window geometry,
//! renderer tuning (frames in flight, validation layers, MSAA cap, present
//! mode preference), shader and asset paths, and the log level.
//!
//! The whole tree is serde-serializable and loads from TOML or RON through
//! the [`Config`] trait, so `viewer.toml` next to the binary is enough to
//! change behaviour without recompiling.

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use crate::config::{Config, ConfigError};

/// Largest supported number of in-flight frames
pub const MAX_FRAMES_IN_FLIGHT_LIMIT: usize = 8;

/// # Shader Configuration
///
/// Paths to the precompiled SPIR-V blobs. The build script writes them to
/// `target/shaders/`, but the viewer may be started from other directories,
/// so a few common locations are searched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// Path to the vertex shader SPIR-V file
    pub vertex_shader_path: String,
    /// Path to the fragment shader SPIR-V file
    pub fragment_shader_path: String,
}

impl ShaderConfig {
    /// Create a new shader configuration
    pub fn new(vertex_path: impl Into<String>, fragment_path: impl Into<String>) -> Self {
        Self {
            vertex_shader_path: vertex_path.into(),
            fragment_shader_path: fragment_path.into(),
        }
    }

    /// Create shader config with automatic path resolution
    pub fn with_path_resolution(base_vertex: &str, base_fragment: &str) -> Self {
        const SHADER_DIRS: [&str; 4] = ["target/shaders/", "shaders/", "resources/shaders/", "../target/shaders/"];

        let resolve = |file: &str| {
            SHADER_DIRS
                .iter()
                .map(|dir| format!("{dir}{file}"))
                .find(|candidate| Path::new(candidate).exists())
                .unwrap_or_else(|| format!("target/shaders/{file}"))
        };

        Self {
            vertex_shader_path: resolve(base_vertex),
            fragment_shader_path: resolve(base_fragment),
        }
    }

    /// Validate that shader files exist
    pub fn validate(&self) -> Result<(), String> {
        for path in [&self.vertex_shader_path, &self.fragment_shader_path] {
            if !Path::new(path).exists() {
                return Err(format!("Shader not found: {path}"));
            }
        }
        Ok(())
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::with_path_resolution("vert.spv", "frag.spv")
    }
}

/// Window creation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial width in screen coordinates
    pub width: u32,
    /// Initial height in screen coordinates
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// # Vulkan Renderer Configuration
///
/// Startup-time renderer settings. Validation is decided here rather than
/// by a compile-time switch so a release build can still be debugged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulkanRendererConfig {
    /// Application name for Vulkan instance creation
    pub application_name: String,
    /// Application version (major, minor, patch)
    pub application_version: (u32, u32, u32),
    /// Shader configuration
    pub shaders: ShaderConfig,
    /// Number of frames the CPU may record ahead of the GPU
    pub max_frames_in_flight: usize,
    /// Whether to enable Vulkan validation layers (`None` = debug builds only)
    pub enable_validation: Option<bool>,
    /// Prefer MAILBOX presentation when the surface offers it
    pub prefer_mailbox: bool,
    /// Upper bound on MSAA samples (`None` = highest the device supports)
    pub max_msaa_samples: Option<u32>,
}

impl VulkanRendererConfig {
    /// Create a new renderer configuration
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            application_version: (1, 0, 0),
            shaders: ShaderConfig::default(),
            max_frames_in_flight: 2,
            enable_validation: None,
            prefer_mailbox: true,
            max_msaa_samples: None,
        }
    }

    /// Set maximum frames in flight
    #[must_use]
    pub fn with_max_frames_in_flight(mut self, frames: usize) -> Self {
        self.max_frames_in_flight = frames;
        self
    }

    /// Enable or disable validation layers
    #[must_use]
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Cap the MSAA sample count
    #[must_use]
    pub fn with_max_msaa_samples(mut self, samples: u32) -> Self {
        self.max_msaa_samples = Some(samples);
        self
    }

    /// Whether validation layers should be requested
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Check ranges; shader files are checked separately since tests run without them
    pub fn validate(&self) -> Result<(), String> {
        if self.application_name.is_empty() {
            return Err("Application name cannot be empty".to_string());
        }

        if self.max_frames_in_flight == 0 {
            return Err("Max frames in flight must be at least 1".to_string());
        }

        if self.max_frames_in_flight > MAX_FRAMES_IN_FLIGHT_LIMIT {
            return Err(format!(
                "Max frames in flight must not exceed {MAX_FRAMES_IN_FLIGHT_LIMIT}"
            ));
        }

        if let Some(samples) = self.max_msaa_samples {
            if !samples.is_power_of_two() || samples > 64 {
                return Err(format!("MSAA sample cap must be a power of two up to 64, got {samples}"));
            }
        }

        Ok(())
    }
}

impl Default for VulkanRendererConfig {
    fn default() -> Self {
        Self::new("Vulkan Model Viewer")
    }
}

/// Model and texture locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Wavefront OBJ model to display
    pub model_path: String,
    /// Texture applied to the model
    pub texture_path: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            model_path: "resources/models/viking_room.obj".to_string(),
            texture_path: "resources/textures/viking_room.png".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level; `RUST_LOG` takes precedence when set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration loaded by the viewer binary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Window parameters
    pub window: WindowConfig,
    /// Rendering system configuration
    pub renderer: VulkanRendererConfig,
    /// Asset locations
    pub assets: AssetConfig,
    /// Log settings
    pub logging: LoggingConfig,
}

impl ApplicationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid("Window size must be nonzero".to_string()));
        }
        self.renderer.validate().map_err(ConfigError::Invalid)
    }
}

impl Config for ApplicationConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;

    #[test]
    fn test_defaults_describe_a_two_frame_viewer() {
        let config = ApplicationConfig::default();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.renderer.max_frames_in_flight, 2);
        assert!(config.renderer.prefer_mailbox);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shader_validation_reports_missing_file() {
        let existing = concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml");
        assert!(ShaderConfig::new(existing, existing).validate().is_ok());

        let err = ShaderConfig::new(existing, "no/such/frag.spv").validate().unwrap_err();
        assert!(err.contains("no/such/frag.spv"));
    }

    #[test]
    fn test_frames_in_flight_bounds() {
        let zero = VulkanRendererConfig::default().with_max_frames_in_flight(0);
        assert!(zero.validate().is_err());

        let too_many = VulkanRendererConfig::default().with_max_frames_in_flight(9);
        assert!(too_many.validate().is_err());

        for frames in 1..=MAX_FRAMES_IN_FLIGHT_LIMIT {
            let config = VulkanRendererConfig::default().with_max_frames_in_flight(frames);
            assert!(config.validate().is_ok(), "{frames} frames should be valid");
        }
    }

    #[test]
    fn test_msaa_cap_must_be_power_of_two() {
        assert!(VulkanRendererConfig::default().with_max_msaa_samples(4).validate().is_ok());
        assert!(VulkanRendererConfig::default().with_max_msaa_samples(3).validate().is_err());
        assert!(VulkanRendererConfig::default().with_max_msaa_samples(128).validate().is_err());
    }

    #[test]
    fn test_validation_toggle_is_explicit_when_set() {
        assert!(VulkanRendererConfig::default().with_validation(true).validation_enabled());
        assert!(!VulkanRendererConfig::default().with_validation(false).validation_enabled());
        assert_eq!(
            VulkanRendererConfig::default().validation_enabled(),
            cfg!(debug_assertions)
        );
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = ApplicationConfig::default();
        config.window.height = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let text = "[window]\ntitle = \"Room\"\nwidth = 1024\nheight = 768\n";
        let config = ApplicationConfig::from_str_with_format(text, ConfigFormat::Toml).unwrap();
        assert_eq!(config.window.title, "Room");
        assert_eq!(config.window.width, 1024);
        assert_eq!(config.renderer, VulkanRendererConfig::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_full_config_round_trips_through_ron() {
        let mut config = ApplicationConfig::default();
        config.renderer = config.renderer.with_max_frames_in_flight(3).with_validation(false);
        config.renderer.shaders = ShaderConfig::new("a.spv", "b.spv");

        let text = config.to_string_with_format(ConfigFormat::Ron).unwrap();
        let back = ApplicationConfig::from_str_with_format(&text, ConfigFormat::Ron).unwrap();
        assert_eq!(back, config);
    }
}
