//! Math utilities and types
//!
//! nalgebra aliases plus the few camera helpers the viewer needs.

pub use nalgebra::{Matrix4, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Right-handed view matrix looking from `eye` at `target`
pub fn look_at(eye: Point3, target: Point3, up: Vec3) -> Mat4 {
    Mat4::look_at_rh(&eye, &target, &up)
}

/// Perspective projection for Vulkan clip space
///
/// `fov_y` is in radians. Vulkan's clip space has +Y pointing down and depth
/// in `[0, 1]`, both different from the GL convention nalgebra follows.
pub fn perspective_vulkan(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let mut proj = Mat4::new_perspective(aspect, fov_y, near, far);
    proj[(1, 1)] *= -1.0;
    proj[(2, 2)] = far / (near - far);
    proj[(2, 3)] = far * near / (near - far);
    proj
}

/// Rotation about +Z
pub fn rotation_z(angle: f32) -> Mat4 {
    Mat4::from_axis_angle(&Vec3::z_axis(), angle)
}

/// Column-major array layout as GLSL `mat4` expects it
pub fn to_column_arrays(m: &Mat4) -> [[f32; 4]; 4] {
    let mut cols = [[0.0; 4]; 4];
    for (c, col) in cols.iter_mut().enumerate() {
        for (r, value) in col.iter_mut().enumerate() {
            *value = m[(r, c)];
        }
    }
    cols
}
