pub use glam::*;

/// Builds a matrix from the 16 column-major floats of a glTF `matrix`.
pub fn mat4_from_gltf(m: &[f32; 16]) -> Mat4 {
	Mat4::from_cols_array(m)
}

/// Splits a transform into scale, rotation and translation.
pub fn decompose(m: Mat4) -> (Vec3, Quat, Vec3) {
	m.to_scale_rotation_translation()
}
