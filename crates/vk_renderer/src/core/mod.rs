//! Core viewer types shared by every layer

pub mod config;

pub use config::{
    ApplicationConfig, AssetConfig, LoggingConfig, ShaderConfig, VulkanRendererConfig, WindowConfig,
};
