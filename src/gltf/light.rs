use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};
use std::str::FromStr;

use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

use super::json::*;
use super::*;
use crate::math::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum LightType {
	Directional,
	Point,
	Spot,
}

/// `KDAB_kuesa_shadows` settings of a light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowInfo {
	pub casts_shadows: bool,
	pub soft_shadows: bool,
	pub shadow_map_bias: f32,
	pub near_plane: f32,
	pub texture_size: UVec2,
}

impl Default for ShadowInfo {
	fn default() -> Self {
		Self {
			casts_shadows: false,
			soft_shadows: false,
			shadow_map_bias: 0.005,
			near_plane: 0.0,
			texture_size: UVec2::splat(512),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
	pub name: Option<String>,
	pub ty: LightType,
	pub color: Vec3,
	pub intensity: f32,
	/// None means infinite range.
	pub range: Option<f32>,
	pub inner_cone_angle: f32,
	pub outer_cone_angle: f32,
	pub shadows: ShadowInfo,
}

impl Light {
	pub fn new(ty: LightType) -> Self {
		Self {
			name: None,
			ty,
			color: Vec3::ONE,
			intensity: 1.0,
			range: None,
			inner_cone_angle: 0.0,
			outer_cone_angle: FRAC_PI_4,
			shadows: ShadowInfo::default(),
		}
	}
}

/// Parses `extensions.KHR_lights_punctual.lights`.
pub struct LightParser;

impl LightParser {
	fn parse_shadows(shadows: &JSONShadows) -> ShadowInfo {
		let defaults = ShadowInfo::default();
		ShadowInfo {
			casts_shadows: shadows.casts_shadows.unwrap_or(defaults.casts_shadows),
			soft_shadows: shadows.soft_shadows.unwrap_or(defaults.soft_shadows),
			shadow_map_bias: shadows.shadow_map_bias.unwrap_or(defaults.shadow_map_bias),
			near_plane: shadows.near_plane.unwrap_or(defaults.near_plane),
			texture_size: match shadows.shadow_map_texture_size {
				Some(JSONTextureSize::Square(n)) => UVec2::splat(n),
				Some(JSONTextureSize::Size(size)) => UVec2::from(size),
				None => defaults.texture_size,
			},
		}
	}

	fn parse_light(light: JSONLight) -> Result<Light, GltfError> {
		let ty = LightType::from_str(&light.ty).map_err(|_| GltfError::InvalidValue { field: "type", value: light.ty.clone() })?;
		let mut out = Light::new(ty);
		out.name = light.name;
		if let Some(color) = light.color {
			out.color = Vec3::from(color);
		}
		if let Some(intensity) = light.intensity {
			out.intensity = intensity;
		}
		if let Some(range) = light.range {
			if range <= 0.0 {
				return Err(GltfError::InvalidValue { field: "range", value: range.to_string() });
			}
			out.range = Some(range);
		}
		if let Some(spot) = light.spot {
			out.inner_cone_angle = spot.inner_cone_angle.unwrap_or(out.inner_cone_angle);
			out.outer_cone_angle = spot.outer_cone_angle.unwrap_or(out.outer_cone_angle);
		}
		if ty == LightType::Spot
			&& !(0.0 <= out.inner_cone_angle && out.inner_cone_angle < out.outer_cone_angle && out.outer_cone_angle <= FRAC_PI_2)
		{
			return Err(GltfError::InvalidValue {
				field: "spot",
				value: format!("inner {} outer {}", out.inner_cone_angle, out.outer_cone_angle),
			});
		}

		// extension object first, then fields placed directly on the light
		let shadows = light.extensions.and_then(|e| e.shadows);
		out.shadows = match &shadows {
			Some(shadows) => Self::parse_shadows(shadows),
			None => Self::parse_shadows(&light.shadows),
		};
		if shadows.is_none() && !light.shadows.is_empty() {
			log::debug!("light uses the deprecated inline shadow fields");
		}
		Ok(out)
	}

	pub fn parse(&self, json: &Value, ctx: &mut GLTF2Context) -> Result<(), GltfError> {
		let lights = parse_array::<JSONLight>(json, "lights")?
			.into_iter()
			.map(Self::parse_light)
			.collect::<Result<Vec<_>, GltfError>>()?;

		log::debug!("parsed {} lights", lights.len());
		ctx.lights.extend(lights);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn spot_light_defaults() {
		let mut ctx = GLTF2Context::new();
		LightParser.parse(&json!([{ "type": "spot" }]), &mut ctx).unwrap();
		let light = ctx.light(0).unwrap();
		assert_eq!(light.ty, LightType::Spot);
		assert_eq!(light.color, Vec3::ONE);
		assert_eq!(light.intensity, 1.0);
		assert_eq!(light.range, None);
		assert_eq!(light.inner_cone_angle, 0.0);
		assert_eq!(light.outer_cone_angle, FRAC_PI_4);
		assert!(!light.shadows.casts_shadows);
		assert!(!light.shadows.soft_shadows);
		assert_eq!(light.shadows.shadow_map_bias, 0.005);
		assert_eq!(light.shadows.near_plane, 0.0);
		assert_eq!(light.shadows.texture_size, UVec2::new(512, 512));
	}

	#[test]
	fn explicit_zero_is_kept() {
		let mut ctx = GLTF2Context::new();
		LightParser.parse(&json!([{ "type": "point", "intensity": 0, "range": 0.25, "color": [1, 0, 0] }]), &mut ctx).unwrap();
		let light = ctx.light(0).unwrap();
		assert_eq!(light.intensity, 0.0);
		assert_eq!(light.range, Some(0.25));
		assert_eq!(light.color, Vec3::X);
	}

	#[test]
	fn both_shadow_shapes_parse_the_same() {
		let mut ctx = GLTF2Context::new();
		LightParser.parse(&json!([
			{
				"type": "directional",
				"castsShadows": true,
				"softShadows": true,
				"shadowMapBias": 0.01,
				"nearPlane": 0.5,
				"shadowMapTextureSize": 1024,
			},
			{
				"type": "directional",
				"extensions": {
					"KDAB_kuesa_shadows": {
						"castsShadows": true,
						"softShadows": true,
						"shadowMapBias": 0.01,
						"nearPlane": 0.5,
						"shadowMapTextureSize": [1024, 1024],
					},
				},
			},
		]), &mut ctx).unwrap();
		assert_eq!(ctx.light(0), ctx.light(1));
		assert!(ctx.light(0).unwrap().shadows.casts_shadows);
		assert_eq!(ctx.light(1).unwrap().shadows.texture_size, UVec2::splat(1024));
	}

	#[test]
	fn rejects_invalid_lights() {
		let mut ctx = GLTF2Context::new();
		let cases = [
			json!([{ "type": "area" }]),
			json!([{ "color": [1, 1, 1] }]),
			json!([{ "type": "point", "range": 0 }]),
			json!([{ "type": "spot", "spot": { "innerConeAngle": 1.0, "outerConeAngle": 0.5 } }]),
			json!([{ "type": "point", "color": [1, 1] }]),
		];
		for case in cases {
			assert!(LightParser.parse(&case, &mut ctx).is_err(), "{case}");
		}
		assert_eq!(ctx.light_count(), 0);
	}
}
