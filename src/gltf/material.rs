use std::str::FromStr;

use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

use super::json::*;
use super::*;
use crate::math::*;

/// Which family of material a record describes. Everything the engine needs
/// beyond the tag is in the factor fields or the property bag.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum MaterialKind {
	#[default]
	MetallicRoughness,
	SpecularGlossiness,
	Unlit,
	/// A `KDAB_custom_material` type name, e.g. `"Iro2Diffuse"`.
	Custom(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum AlphaMode {
	#[default]
	Opaque,
	Mask,
	Blend,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureTransform {
	pub offset: Vec2,
	pub rotation: f32,
	pub scale: Vec2,
	pub tex_coord: Option<u32>,
}

impl Default for TextureTransform {
	fn default() -> Self {
		Self { offset: Vec2::ZERO, rotation: 0.0, scale: Vec2::ONE, tex_coord: None }
	}
}

impl TextureTransform {
	/// The 3x3 uv matrix: translation * rotation * scale.
	pub fn matrix(&self) -> Mat3 {
		Mat3::from_translation(self.offset) * Mat3::from_angle(-self.rotation) * Mat3::from_scale(self.scale)
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureInfo {
	pub index: usize,
	/// Which `TEXCOORD_n` set the texture is sampled with.
	pub tex_coord: u32,
	pub transform: Option<TextureTransform>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpecularGlossiness {
	pub diffuse_factor: Vec4,
	pub diffuse_texture: Option<TextureInfo>,
	pub specular_factor: Vec3,
	pub glossiness_factor: f32,
	pub specular_glossiness_texture: Option<TextureInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transmission {
	pub factor: f32,
	pub texture: Option<TextureInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
	pub name: Option<String>,
	pub kind: MaterialKind,
	pub base_color_factor: Vec4,
	pub base_color_texture: Option<TextureInfo>,
	pub metallic_factor: f32,
	pub roughness_factor: f32,
	pub metallic_roughness_texture: Option<TextureInfo>,
	pub normal_texture: Option<TextureInfo>,
	pub normal_scale: f32,
	pub occlusion_texture: Option<TextureInfo>,
	pub occlusion_strength: f32,
	pub emissive_texture: Option<TextureInfo>,
	pub emissive_factor: Vec3,
	pub emissive_strength: f32,
	pub alpha_mode: AlphaMode,
	pub alpha_cutoff: f32,
	pub double_sided: bool,
	pub specular_glossiness: Option<SpecularGlossiness>,
	pub ior: f32,
	pub transmission: Option<Transmission>,
	/// Named parameters of a custom material, in declaration order.
	pub properties: Vec<(String, Value)>,
	pub extras: Vec<(String, Value)>,
}

impl Default for Material {
	fn default() -> Self {
		Self {
			name: None,
			kind: MaterialKind::MetallicRoughness,
			base_color_factor: Vec4::ONE,
			base_color_texture: None,
			metallic_factor: 1.0,
			roughness_factor: 1.0,
			metallic_roughness_texture: None,
			normal_texture: None,
			normal_scale: 1.0,
			occlusion_texture: None,
			occlusion_strength: 1.0,
			emissive_texture: None,
			emissive_factor: Vec3::ZERO,
			emissive_strength: 1.0,
			alpha_mode: AlphaMode::Opaque,
			alpha_cutoff: 0.5,
			double_sided: false,
			specular_glossiness: None,
			ior: 1.5,
			transmission: None,
			properties: Vec::new(),
			extras: Vec::new(),
		}
	}
}

impl Material {
	/// Looks up a custom material parameter by name.
	pub fn property(&self, name: &str) -> Option<&Value> {
		self.properties.iter().find(|(k, _)| k == name).map(|(_, v)| v)
	}
}

/// Parses the `materials` array against the parsed textures.
pub struct MaterialParser;

impl MaterialParser {
	fn texture_info(ctx: &GLTF2Context, info: Option<JSONTextureInfo>) -> Result<Option<TextureInfo>, GltfError> {
		info.map(|info| {
			let transform = info.extensions.and_then(|e| e.transform).map(|t| TextureTransform {
				offset: t.offset.map(Vec2::from).unwrap_or(Vec2::ZERO),
				rotation: t.rotation.unwrap_or(0.0),
				scale: t.scale.map(Vec2::from).unwrap_or(Vec2::ONE),
				tex_coord: t.tex_coord,
			});
			Ok(TextureInfo {
				index: ctx.check_index::<Texture>(info.index)?,
				tex_coord: info.tex_coord.unwrap_or(0),
				transform,
			})
		}).transpose()
	}

	fn parse_material(ctx: &GLTF2Context, material: JSONMaterial) -> Result<Material, GltfError> {
		let defaults = Material::default();
		let extensions = material.extensions.unwrap_or_default();
		let normal_scale = material.normal_texture.as_ref().and_then(|t| t.scale).unwrap_or(defaults.normal_scale);
		let occlusion_strength = material.occlusion_texture.as_ref().and_then(|t| t.strength).unwrap_or(defaults.occlusion_strength);

		let alpha_mode = material.alpha_mode
			.map(|mode| AlphaMode::from_str(&mode).map_err(|_| GltfError::InvalidValue { field: "alphaMode", value: mode }))
			.transpose()?
			.unwrap_or_default();
		let alpha_cutoff = material.alpha_cutoff.unwrap_or(defaults.alpha_cutoff);
		if alpha_cutoff < 0.0 {
			return Err(GltfError::InvalidValue { field: "alphaCutoff", value: alpha_cutoff.to_string() });
		}

		let specular_glossiness = extensions.specular_glossiness.map(|sg| {
			Ok::<_, GltfError>(SpecularGlossiness {
				diffuse_factor: sg.diffuse_factor.map(Vec4::from).unwrap_or(Vec4::ONE),
				diffuse_texture: Self::texture_info(ctx, sg.diffuse_texture)?,
				specular_factor: sg.specular_factor.map(Vec3::from).unwrap_or(Vec3::ONE),
				glossiness_factor: sg.glossiness_factor.unwrap_or(1.0),
				specular_glossiness_texture: Self::texture_info(ctx, sg.specular_glossiness_texture)?,
			})
		}).transpose()?;

		let transmission = extensions.transmission.map(|t| {
			Ok::<_, GltfError>(Transmission {
				factor: t.transmission_factor.unwrap_or(0.0),
				texture: Self::texture_info(ctx, t.transmission_texture)?,
			})
		}).transpose()?;

		let (kind, properties) = if let Some(custom) = extensions.custom {
			let properties = custom.properties.unwrap_or_default().into_iter().collect();
			(MaterialKind::Custom(custom.ty), properties)
		} else if extensions.unlit.is_some() {
			(MaterialKind::Unlit, Vec::new())
		} else if specular_glossiness.is_some() {
			(MaterialKind::SpecularGlossiness, Vec::new())
		} else {
			(MaterialKind::MetallicRoughness, Vec::new())
		};

		let pbr = material.pbr_metallic_roughness;
		let (base_color_factor, base_color_texture, metallic_factor, roughness_factor, metallic_roughness_texture) = match pbr {
			Some(pbr) => (
				pbr.base_color_factor.map(Vec4::from).unwrap_or(defaults.base_color_factor),
				Self::texture_info(ctx, pbr.base_color_texture)?,
				pbr.metallic_factor.unwrap_or(defaults.metallic_factor),
				pbr.roughness_factor.unwrap_or(defaults.roughness_factor),
				Self::texture_info(ctx, pbr.metallic_roughness_texture)?,
			),
			None => (defaults.base_color_factor, None, defaults.metallic_factor, defaults.roughness_factor, None),
		};

		Ok(Material {
			name: material.name,
			kind,
			base_color_factor,
			base_color_texture,
			metallic_factor,
			roughness_factor,
			metallic_roughness_texture,
			normal_texture: Self::texture_info(ctx, material.normal_texture)?,
			normal_scale,
			occlusion_texture: Self::texture_info(ctx, material.occlusion_texture)?,
			occlusion_strength,
			emissive_texture: Self::texture_info(ctx, material.emissive_texture)?,
			emissive_factor: material.emissive_factor.map(Vec3::from).unwrap_or(defaults.emissive_factor),
			emissive_strength: extensions.emissive_strength.and_then(|e| e.emissive_strength).unwrap_or(defaults.emissive_strength),
			alpha_mode,
			alpha_cutoff,
			double_sided: material.double_sided.unwrap_or(false),
			specular_glossiness,
			ior: extensions.ior.and_then(|e| e.ior).unwrap_or(defaults.ior),
			transmission,
			properties,
			extras: extras_pairs(&material.extras),
		})
	}

	pub fn parse(&self, json: &Value, ctx: &mut GLTF2Context) -> Result<(), GltfError> {
		let materials = parse_array::<JSONMaterial>(json, "materials")?
			.into_iter()
			.map(|material| Self::parse_material(ctx, material))
			.collect::<Result<Vec<_>, GltfError>>()?;

		log::debug!("parsed {} materials", materials.len());
		ctx.materials.extend(materials);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::path::Path;

	use serde_json::json;

	use super::*;

	fn ctx_with_textures(n: usize) -> GLTF2Context {
		let mut ctx = GLTF2Context::new();
		ImageParser::new(Path::new("/")).parse(&json!([{ "uri": "a.png" }]), &mut ctx).unwrap();
		let textures = (0..n).map(|_| json!({ "source": 0 })).collect::<Vec<_>>();
		TextureParser.parse(&Value::Array(textures), &mut ctx).unwrap();
		ctx
	}

	#[test]
	fn empty_material_gets_gltf_defaults() {
		let mut ctx = GLTF2Context::new();
		MaterialParser.parse(&json!([{}]), &mut ctx).unwrap();
		assert_eq!(ctx.asset_at::<Material>(0).unwrap(), Material::default());
	}

	#[test]
	fn parses_pbr_factors_and_textures() {
		let mut ctx = ctx_with_textures(4);
		MaterialParser.parse(&json!([{
			"name": "paint",
			"pbrMetallicRoughness": {
				"baseColorFactor": [0.5, 0.25, 1.0, 1.0],
				"baseColorTexture": { "index": 1, "texCoord": 1 },
				"metallicFactor": 0.0,
				"roughnessFactor": 0.3,
			},
			"normalTexture": { "index": 2, "scale": 0.5 },
			"occlusionTexture": { "index": 3, "strength": 0.25 },
			"emissiveFactor": [1, 0, 0],
			"alphaMode": "MASK",
			"alphaCutoff": 0.3,
			"doubleSided": true,
			"extras": { "b": 1, "a": "two" },
		}]), &mut ctx).unwrap();

		let material = ctx.material(0).unwrap();
		assert_eq!(material.name.as_deref(), Some("paint"));
		assert_eq!(material.kind, MaterialKind::MetallicRoughness);
		assert_eq!(material.base_color_factor, Vec4::new(0.5, 0.25, 1.0, 1.0));
		assert_eq!(material.base_color_texture.unwrap().index, 1);
		assert_eq!(material.base_color_texture.unwrap().tex_coord, 1);
		assert_eq!(material.metallic_factor, 0.0);
		assert_eq!(material.normal_scale, 0.5);
		assert_eq!(material.occlusion_strength, 0.25);
		assert_eq!(material.emissive_factor, Vec3::X);
		assert_eq!(material.alpha_mode, AlphaMode::Mask);
		assert!(material.double_sided);
		assert_eq!(material.extras[0].0, "b");
		assert_eq!(material.extras[1].0, "a");
	}

	#[test]
	fn extensions_select_the_kind() {
		let mut ctx = ctx_with_textures(1);
		MaterialParser.parse(&json!([
			{ "extensions": { "KHR_materials_unlit": {} } },
			{ "extensions": { "KHR_materials_pbrSpecularGlossiness": { "glossinessFactor": 0.2, "diffuseTexture": { "index": 0 } } } },
			{ "extensions": { "KDAB_custom_material": { "type": "Iro2Diffuse", "properties": { "reflectionGain": 0.5, "usesDiffuseMap": true } } } },
			{ "extensions": { "KHR_materials_ior": { "ior": 1.33 }, "KHR_materials_transmission": { "transmissionFactor": 0.9 } } },
		]), &mut ctx).unwrap();

		assert_eq!(ctx.material(0).unwrap().kind, MaterialKind::Unlit);
		let sg = ctx.material(1).unwrap();
		assert_eq!(sg.kind, MaterialKind::SpecularGlossiness);
		assert_eq!(sg.specular_glossiness.as_ref().unwrap().glossiness_factor, 0.2);
		let custom = ctx.material(2).unwrap();
		assert_eq!(custom.kind, MaterialKind::Custom("Iro2Diffuse".into()));
		assert_eq!(custom.property("reflectionGain"), Some(&json!(0.5)));
		assert_eq!(custom.properties[1].0, "usesDiffuseMap");
		let glass = ctx.material(3).unwrap();
		assert_eq!(glass.ior, 1.33);
		assert_eq!(glass.transmission.as_ref().unwrap().factor, 0.9);
	}

	#[test]
	fn texture_transform_is_read() {
		let mut ctx = ctx_with_textures(1);
		MaterialParser.parse(&json!([{
			"emissiveTexture": { "index": 0, "extensions": { "KHR_texture_transform": { "offset": [0.5, 0], "scale": [2, 2] } } },
		}]), &mut ctx).unwrap();
		let transform = ctx.material(0).unwrap().emissive_texture.unwrap().transform.unwrap();
		assert_eq!(transform.offset, Vec2::new(0.5, 0.0));
		assert_eq!(transform.scale, Vec2::splat(2.0));
		assert_eq!(transform.rotation, 0.0);
		assert_eq!(transform.matrix().transform_point2(Vec2::ONE), Vec2::new(2.5, 2.0));
	}

	#[test]
	fn invalid_materials_fail_the_section() {
		let mut ctx = ctx_with_textures(1);
		let result = MaterialParser.parse(&json!([{}, { "normalTexture": { "index": 5 } }]), &mut ctx);
		assert!(matches!(result, Err(GltfError::InvalidIndex { kind: "texture", index: 5, count: 1 })));
		let result = MaterialParser.parse(&json!([{ "alphaMode": "SOMETIMES" }]), &mut ctx);
		assert!(matches!(result, Err(GltfError::InvalidValue { field: "alphaMode", .. })));
		assert_eq!(ctx.material_count(), 0);
	}

	#[test]
	fn materials_stay_mutable() {
		let mut ctx = GLTF2Context::new();
		MaterialParser.parse(&json!([{}]), &mut ctx).unwrap();
		ctx.material_mut(0).unwrap().double_sided = true;
		assert!(ctx.material(0).unwrap().double_sided);
	}
}
