//! Image loading utilities for texture data
//!
//! Decodes to tightly packed RGBA8, which is what the texture upload path
//! copies into an `R8G8B8A8_SRGB` image.

use crate::assets::AssetError;
use std::path::Path;

/// Number of mip levels for a full chain down to 1x1: `floor(log2(max(w, h))) + 1`
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    let largest = width.max(height).max(1);
    largest.ilog2() + 1
}

/// Loaded image data ready for GPU upload
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageData {
    /// Load an image from a file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path_ref = path.as_ref();

        let img = image::open(path_ref)
            .map_err(|e| AssetError::LoadFailed(format!("{}: {}", path_ref.display(), e)))?;
        let image = Self::from_rgba(img.to_rgba8());

        log::info!(
            "Loaded texture {}x{} ({} mip levels) from {}",
            image.width,
            image.height,
            image.mip_levels(),
            path_ref.display()
        );
        Ok(image)
    }

    /// Load image from memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to decode image from bytes: {e}")))?;
        Ok(Self::from_rgba(img.to_rgba8()))
    }

    fn from_rgba(rgba: image::RgbaImage) -> Self {
        let (width, height) = rgba.dimensions();
        Self {
            data: rgba.into_raw(),
            width,
            height,
        }
    }

    /// Create a solid color image
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        Self {
            data: color.repeat(pixel_count),
            width,
            height,
        }
    }

    /// Get the size of the image data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Mip chain length for this image
    pub fn mip_levels(&self) -> u32 {
        mip_level_count(self.width, self.height)
    }

    /// Reject images the upload path cannot handle
    pub fn validate(&self) -> Result<(), AssetError> {
        if self.width == 0 || self.height == 0 {
            return Err(AssetError::InvalidData("Image has zero size".to_string()));
        }
        let expected = self.width as usize * self.height as usize * 4;
        if self.data.len() != expected {
            return Err(AssetError::InvalidData(format!(
                "Expected {expected} bytes of RGBA data, got {}",
                self.data.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_color_image() {
        let img = ImageData::solid_color(4, 4, [255, 0, 0, 255]);
        assert_eq!(img.width, 4);
        assert_eq!(img.height, 4);
        assert_eq!(img.size_bytes(), 4 * 4 * 4);
        assert_eq!(&img.data[0..4], &[255, 0, 0, 255]);
        assert!(img.validate().is_ok());
    }

    #[test]
    fn test_mip_level_count() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 1), 2);
        assert_eq!(mip_level_count(1024, 1024), 11);
        assert_eq!(mip_level_count(1024, 512), 11);
        assert_eq!(mip_level_count(1000, 10), 10);
        assert_eq!(mip_level_count(300, 1025), 11);
    }

    #[test]
    fn test_mip_levels_for_image() {
        let img = ImageData::solid_color(256, 64, [0, 0, 0, 255]);
        assert_eq!(img.mip_levels(), 9);
    }

    #[test]
    fn test_validate_rejects_truncated_data() {
        let mut img = ImageData::solid_color(2, 2, [1, 2, 3, 4]);
        img.data.pop();
        assert!(matches!(img.validate(), Err(AssetError::InvalidData(_))));
    }

    #[test]
    fn test_png_decodes_to_rgba() {
        let mut png = Vec::new();
        image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let img = ImageData::from_bytes(&png).unwrap();
        assert_eq!((img.width, img.height), (3, 2));
        assert_eq!(&img.data[0..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        assert!(matches!(
            ImageData::from_bytes(&[0, 1, 2, 3]),
            Err(AssetError::LoadFailed(_))
        ));
    }
}
