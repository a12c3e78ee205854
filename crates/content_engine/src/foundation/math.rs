//! Math types shared by content readers

pub use nalgebra::Vector3;

/// 3D vector type (colors and directions)
pub type Vec3 = Vector3<f32>;
