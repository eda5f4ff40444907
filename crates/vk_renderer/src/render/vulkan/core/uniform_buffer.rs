//! Per-image transform uniform data
//!
//! The mesh spins about +Z at a quarter turn per second, viewed from
//! (2, 2, 2) towards the origin with +Z up.

use ash::vk;
use std::f32::consts::FRAC_PI_2;

use crate::foundation::math::{look_at, perspective_vulkan, rotation_z, to_column_arrays, Point3, Vec3};

/// Vertical field of view in radians
pub const FIELD_OF_VIEW: f32 = std::f32::consts::FRAC_PI_4;

/// Near clip plane distance
pub const NEAR_PLANE: f32 = 0.1;

/// Far clip plane distance
pub const FAR_PLANE: f32 = 10.0;

/// Model, view and projection matrices, column-major as GLSL reads them
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformBufferObject {
    /// Object to world
    pub model: [[f32; 4]; 4],
    /// World to camera
    pub view: [[f32; 4]; 4],
    /// Camera to clip space
    pub proj: [[f32; 4]; 4],
}

unsafe impl bytemuck::Pod for UniformBufferObject {}
unsafe impl bytemuck::Zeroable for UniformBufferObject {}

impl UniformBufferObject {
    /// Transforms for `elapsed_secs` since startup at the given swapchain extent
    pub fn spinning(elapsed_secs: f32, extent: vk::Extent2D) -> Self {
        let model = rotation_z(elapsed_secs * FRAC_PI_2);
        let view = look_at(Point3::new(2.0, 2.0, 2.0), Point3::origin(), Vec3::z());
        // extent is never zero here, recreation waits out minimized windows
        let aspect = extent.width as f32 / extent.height.max(1) as f32;
        let proj = perspective_vulkan(FIELD_OF_VIEW, aspect, NEAR_PLANE, FAR_PLANE);

        Self {
            model: to_column_arrays(&model),
            view: to_column_arrays(&view),
            proj: to_column_arrays(&proj),
        }
    }
}
