//! Asset loading: OBJ models and RGBA8 textures

pub mod image_loader;
pub mod obj_loader;

pub use image_loader::{mip_level_count, ImageData};
pub use obj_loader::{ObjError, ObjLoader};

use thiserror::Error;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Failed to load asset
    #[error("Failed to load asset: {0}")]
    LoadFailed(String),

    /// Invalid asset data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Model parsing failed
    #[error("Model error: {0}")]
    Obj(#[from] ObjError),
}
