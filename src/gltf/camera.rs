use serde_json::Value;

use super::json::*;
use super::*;
use crate::math::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
	Perspective {
		yfov: f32,
		znear: f32,
		/// None for an infinite projection.
		zfar: Option<f32>,
		aspect_ratio: Option<f32>,
	},
	Orthographic {
		xmag: f32,
		ymag: f32,
		znear: f32,
		zfar: f32,
	},
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
	pub name: Option<String>,
	pub projection: Projection,
}

impl Camera {
	/// Right handed projection matrix. `aspect_ratio` is used when the camera
	/// doesn't declare its own.
	pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
		match self.projection {
			Projection::Perspective { yfov, znear, zfar, aspect_ratio: own } => {
				let aspect = own.unwrap_or(aspect_ratio);
				match zfar {
					Some(zfar) => Mat4::perspective_rh(yfov, aspect, znear, zfar),
					None => Mat4::perspective_infinite_rh(yfov, aspect, znear),
				}
			},
			Projection::Orthographic { xmag, ymag, znear, zfar } => {
				Mat4::orthographic_rh(-xmag, xmag, -ymag, ymag, znear, zfar)
			},
		}
	}
}

fn invalid(field: &'static str, value: f32) -> GltfError {
	GltfError::InvalidValue { field, value: value.to_string() }
}

/// Parses the `cameras` array.
pub struct CameraParser;

impl CameraParser {
	fn parse_camera(camera: JSONCamera) -> Result<Camera, GltfError> {
		let projection = match camera.ty.as_str() {
			"perspective" => {
				let p = camera.perspective.ok_or(GltfError::InvalidValue { field: "perspective", value: "missing".into() })?;
				if p.yfov <= 0.0 {
					return Err(invalid("yfov", p.yfov));
				}
				if p.znear <= 0.0 {
					return Err(invalid("znear", p.znear));
				}
				if let Some(zfar) = p.zfar.filter(|zfar| *zfar <= p.znear) {
					return Err(invalid("zfar", zfar));
				}
				if let Some(aspect) = p.aspect_ratio.filter(|a| *a <= 0.0) {
					return Err(invalid("aspectRatio", aspect));
				}
				Projection::Perspective { yfov: p.yfov, znear: p.znear, zfar: p.zfar, aspect_ratio: p.aspect_ratio }
			},
			"orthographic" => {
				let o = camera.orthographic.ok_or(GltfError::InvalidValue { field: "orthographic", value: "missing".into() })?;
				if o.znear < 0.0 {
					return Err(invalid("znear", o.znear));
				}
				if o.zfar <= o.znear {
					return Err(invalid("zfar", o.zfar));
				}
				Projection::Orthographic { xmag: o.xmag, ymag: o.ymag, znear: o.znear, zfar: o.zfar }
			},
			_ => return Err(GltfError::InvalidValue { field: "type", value: camera.ty }),
		};
		Ok(Camera { name: camera.name, projection })
	}

	pub fn parse(&self, json: &Value, ctx: &mut GLTF2Context) -> Result<(), GltfError> {
		let cameras = parse_array::<JSONCamera>(json, "cameras")?
			.into_iter()
			.map(Self::parse_camera)
			.collect::<Result<Vec<_>, GltfError>>()?;

		log::debug!("parsed {} cameras", cameras.len());
		ctx.cameras.extend(cameras);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn parses_both_projections() {
		let mut ctx = GLTF2Context::new();
		CameraParser.parse(&json!([
			{ "type": "perspective", "name": "main", "perspective": { "yfov": 0.8, "znear": 0.1, "zfar": 100 } },
			{ "type": "perspective", "perspective": { "yfov": 0.8, "znear": 0.1, "aspectRatio": 1.5 } },
			{ "type": "orthographic", "orthographic": { "xmag": 2, "ymag": 1, "znear": 0, "zfar": 10 } },
		]), &mut ctx).unwrap();

		assert_eq!(ctx.camera_count(), 3);
		assert_eq!(ctx.camera(0).unwrap().name.as_deref(), Some("main"));
		assert_eq!(ctx.camera(0).unwrap().projection, Projection::Perspective {
			yfov: 0.8,
			znear: 0.1,
			zfar: Some(100.0),
			aspect_ratio: None,
		});
		assert!(matches!(ctx.camera(1).unwrap().projection, Projection::Perspective { zfar: None, aspect_ratio: Some(_), .. }));
		assert_eq!(ctx.camera(2).unwrap().projection, Projection::Orthographic { xmag: 2.0, ymag: 1.0, znear: 0.0, zfar: 10.0 });
	}

	#[test]
	fn projection_matrices() {
		let ortho = Camera {
			name: None,
			projection: Projection::Orthographic { xmag: 2.0, ymag: 1.0, znear: 0.0, zfar: 10.0 },
		};
		let p = ortho.projection_matrix(1.0).project_point3(Vec3::new(2.0, 1.0, 0.0));
		assert!((p.x - 1.0).abs() < 1e-5 && (p.y - 1.0).abs() < 1e-5);

		let infinite = Camera {
			name: None,
			projection: Projection::Perspective { yfov: 1.0, znear: 0.1, zfar: None, aspect_ratio: Some(2.0) },
		};
		assert_eq!(infinite.projection_matrix(1.0), Mat4::perspective_infinite_rh(1.0, 2.0, 0.1));
	}

	#[test]
	fn rejects_invalid_cameras() {
		let mut ctx = GLTF2Context::new();
		let cases = [
			json!([{ "type": "perspective" }]),
			json!([{ "type": "perspective", "perspective": { "yfov": 0, "znear": 0.1 } }]),
			json!([{ "type": "perspective", "perspective": { "yfov": 1, "znear": 1, "zfar": 0.5 } }]),
			json!([{ "type": "orthographic", "orthographic": { "xmag": 1, "ymag": 1, "znear": 1, "zfar": 1 } }]),
			json!([{ "type": "fisheye" }]),
		];
		for case in cases {
			assert!(CameraParser.parse(&case, &mut ctx).is_err(), "{case}");
		}
		assert_eq!(ctx.camera_count(), 0);
	}
}
