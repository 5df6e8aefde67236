//! Writes a [GLTF2Context] back out as a glTF 2.0 document.
//!
//! Buffers and embedded images become base64 `data:` uris, so the result is
//! a single self-contained JSON document. Extensions are always written in
//! their current shape.

use base64::Engine;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::{json, Map, Value};

use super::importer::{GLB_CHUNK_BIN, GLB_CHUNK_JSON, GLB_MAGIC};
use super::*;
use crate::util::align_up;

/// Characters that would change meaning when a path is read back as a uri.
const PATH_ESCAPE: &AsciiSet = &CONTROLS.add(b' ').add(b'%').add(b'#').add(b'?');

fn base64_uri(mime_type: Option<&str>, data: &[u8]) -> String {
	format!(
		"data:{};base64,{}",
		mime_type.unwrap_or_default(),
		base64::engine::general_purpose::STANDARD.encode(data)
	)
}

fn object(pairs: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
	Value::Object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

fn extras_object(extras: &[(String, Value)]) -> Value {
	Value::Object(extras.iter().cloned().collect())
}

/// Accumulates the members of one JSON object, skipping absent values.
#[derive(Default)]
struct ObjectWriter(Map<String, Value>);

impl ObjectWriter {
	fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
		self.0.insert(key.to_string(), value.into());
		self
	}

	fn opt<T: Into<Value>>(self, key: &str, value: Option<T>) -> Self {
		match value {
			Some(v) => self.set(key, v),
			None => self,
		}
	}

	fn non_empty(self, key: &str, value: Value) -> Self {
		let empty = match &value {
			Value::Array(a) => a.is_empty(),
			Value::Object(o) => o.is_empty(),
			_ => false,
		};
		if empty { self } else { self.set(key, value) }
	}

	fn build(self) -> Value {
		Value::Object(self.0)
	}
}

#[derive(Debug, Clone)]
pub struct GLTF2Exporter {
	/// Written as `asset.generator` when the context doesn't carry one.
	pub generator: String,
}

impl Default for GLTF2Exporter {
	fn default() -> Self {
		Self { generator: concat!("kuesa-rs ", env!("CARGO_PKG_VERSION")).to_string() }
	}
}

impl GLTF2Exporter {
	pub fn new() -> Self {
		Self::default()
	}

	fn texture_info(info: &Option<TextureInfo>, extra: Option<(&str, f32)>) -> Option<Value> {
		info.as_ref().map(|info| {
			let transform = info.transform.map(|t| {
				ObjectWriter::default()
					.set("offset", t.offset.to_array().to_vec())
					.set("rotation", t.rotation)
					.set("scale", t.scale.to_array().to_vec())
					.opt("texCoord", t.tex_coord)
					.build()
			});
			let mut writer = ObjectWriter::default().set("index", info.index).set("texCoord", info.tex_coord);
			if let Some((key, value)) = extra {
				writer = writer.set(key, value);
			}
			writer.opt("extensions", transform.map(|t| object([(EXT_TEXTURE_TRANSFORM, t)]))).build()
		})
	}

	fn buffers(ctx: &GLTF2Context) -> Value {
		ctx.buffers().iter().map(|buffer| {
			ObjectWriter::default()
				.set("byteLength", buffer.data.len())
				.set("uri", base64_uri(Some("application/octet-stream"), &buffer.data))
				.opt("name", buffer.name.clone())
				.build()
		}).collect()
	}

	fn buffer_views(ctx: &GLTF2Context) -> Value {
		ctx.buffer_views().iter().map(|view| {
			ObjectWriter::default()
				.set("buffer", view.buffer)
				.set("byteOffset", view.byte_offset)
				.set("byteLength", view.byte_length)
				.opt("byteStride", view.byte_stride)
				.opt("target", view.target)
				.opt("name", view.name.clone())
				.build()
		}).collect()
	}

	fn accessors(ctx: &GLTF2Context) -> Value {
		ctx.accessors().iter().map(|accessor| {
			let sparse = accessor.sparse.as_ref().map(|sparse| json!({
				"count": sparse.count,
				"indices": {
					"bufferView": sparse.indices_buffer_view,
					"byteOffset": sparse.indices_offset,
					"componentType": sparse.indices_component_type.gl(),
				},
				"values": {
					"bufferView": sparse.values_buffer_view,
					"byteOffset": sparse.values_offset,
				},
			}));
			ObjectWriter::default()
				.opt("bufferView", accessor.buffer_view)
				.set("byteOffset", accessor.offset)
				.set("componentType", accessor.component_type.gl())
				.set("type", accessor.element_type.to_string())
				.set("count", accessor.count)
				.set("normalized", accessor.normalized)
				.non_empty("min", json!(accessor.min))
				.non_empty("max", json!(accessor.max))
				.opt("sparse", sparse)
				.opt("name", accessor.name.clone())
				.build()
		}).collect()
	}

	fn images(ctx: &GLTF2Context) -> Result<Value, GltfError> {
		ctx.images().iter().map(|image| {
			let uri = match &image.source {
				ImageSource::File(path) => {
					let path = path.to_str().ok_or_else(|| GltfError::InvalidURI(path.display().to_string()))?;
					utf8_percent_encode(path, PATH_ESCAPE).to_string()
				},
				ImageSource::Resource(path) => path.clone(),
				ImageSource::Embedded(data) => base64_uri(image.mime_type.as_deref(), data),
			};
			Ok::<_, GltfError>(ObjectWriter::default()
				.set("uri", uri)
				.opt("mimeType", image.mime_type.clone())
				.opt("name", image.name.clone())
				.build())
		}).collect()
	}

	fn samplers(ctx: &GLTF2Context) -> Value {
		ctx.samplers().iter().map(|sampler| {
			ObjectWriter::default()
				.opt("magFilter", sampler.mag_filter.map(MagFilter::gl))
				.opt("minFilter", sampler.min_filter.map(MinFilter::gl))
				.set("wrapS", sampler.wrap_s.gl())
				.set("wrapT", sampler.wrap_t.gl())
				.opt("name", sampler.name.clone())
				.build()
		}).collect()
	}

	fn textures(ctx: &GLTF2Context) -> Value {
		ctx.textures().iter().map(|texture| {
			ObjectWriter::default()
				.opt("source", texture.source)
				.opt("sampler", texture.sampler)
				.opt("name", texture.name.clone())
				.build()
		}).collect()
	}

	fn material(material: &Material, used: &mut Vec<&'static str>) -> Value {
		let defaults = Material::default();
		let mut extensions = ObjectWriter::default();

		match &material.kind {
			MaterialKind::Unlit => {
				used.push(EXT_UNLIT);
				extensions = extensions.set(EXT_UNLIT, json!({}));
			},
			MaterialKind::Custom(ty) => {
				used.push(EXT_CUSTOM_MATERIAL);
				extensions = extensions.set(EXT_CUSTOM_MATERIAL, json!({
					"type": ty,
					"properties": extras_object(&material.properties),
				}));
			},
			MaterialKind::MetallicRoughness | MaterialKind::SpecularGlossiness => {},
		}
		if let Some(sg) = &material.specular_glossiness {
			used.push(EXT_SPECULAR_GLOSSINESS);
			extensions = extensions.set(EXT_SPECULAR_GLOSSINESS, ObjectWriter::default()
				.set("diffuseFactor", sg.diffuse_factor.to_array().to_vec())
				.opt("diffuseTexture", Self::texture_info(&sg.diffuse_texture, None))
				.set("specularFactor", sg.specular_factor.to_array().to_vec())
				.set("glossinessFactor", sg.glossiness_factor)
				.opt("specularGlossinessTexture", Self::texture_info(&sg.specular_glossiness_texture, None))
				.build());
		}
		if material.ior != defaults.ior {
			used.push(EXT_IOR);
			extensions = extensions.set(EXT_IOR, json!({ "ior": material.ior }));
		}
		if let Some(transmission) = &material.transmission {
			used.push(EXT_TRANSMISSION);
			extensions = extensions.set(EXT_TRANSMISSION, ObjectWriter::default()
				.set("transmissionFactor", transmission.factor)
				.opt("transmissionTexture", Self::texture_info(&transmission.texture, None))
				.build());
		}
		if material.emissive_strength != defaults.emissive_strength {
			used.push(EXT_EMISSIVE_STRENGTH);
			extensions = extensions.set(EXT_EMISSIVE_STRENGTH, json!({ "emissiveStrength": material.emissive_strength }));
		}
		let textures = [
			&material.base_color_texture,
			&material.metallic_roughness_texture,
			&material.normal_texture,
			&material.occlusion_texture,
			&material.emissive_texture,
		];
		if textures.iter().any(|t| t.is_some_and(|t| t.transform.is_some())) {
			used.push(EXT_TEXTURE_TRANSFORM);
		}

		let pbr = ObjectWriter::default()
			.set("baseColorFactor", material.base_color_factor.to_array().to_vec())
			.opt("baseColorTexture", Self::texture_info(&material.base_color_texture, None))
			.set("metallicFactor", material.metallic_factor)
			.set("roughnessFactor", material.roughness_factor)
			.opt("metallicRoughnessTexture", Self::texture_info(&material.metallic_roughness_texture, None))
			.build();

		ObjectWriter::default()
			.opt("name", material.name.clone())
			.set("pbrMetallicRoughness", pbr)
			.opt("normalTexture", Self::texture_info(&material.normal_texture, Some(("scale", material.normal_scale))))
			.opt("occlusionTexture", Self::texture_info(&material.occlusion_texture, Some(("strength", material.occlusion_strength))))
			.opt("emissiveTexture", Self::texture_info(&material.emissive_texture, None))
			.set("emissiveFactor", material.emissive_factor.to_array().to_vec())
			.set("alphaMode", material.alpha_mode.to_string())
			.set("alphaCutoff", material.alpha_cutoff)
			.set("doubleSided", material.double_sided)
			.non_empty("extensions", extensions.build())
			.non_empty("extras", extras_object(&material.extras))
			.build()
	}

	fn meshes(ctx: &GLTF2Context) -> Value {
		ctx.meshes().iter().map(|mesh| {
			let primitives = mesh.primitives.iter().map(|primitive| {
				ObjectWriter::default()
					.set("attributes", json!(primitive.attributes))
					.opt("indices", primitive.indices)
					.opt("material", primitive.material)
					.set("mode", primitive.mode.gl())
					.non_empty("targets", json!(primitive.targets))
					.build()
			}).collect::<Value>();
			ObjectWriter::default()
				.opt("name", mesh.name.clone())
				.set("primitives", primitives)
				.non_empty("weights", json!(mesh.weights))
				.non_empty("extras", extras_object(&mesh.extras))
				.build()
		}).collect()
	}

	fn cameras(ctx: &GLTF2Context) -> Value {
		ctx.cameras().iter().map(|camera| {
			let writer = ObjectWriter::default().opt("name", camera.name.clone());
			let writer = match camera.projection {
				Projection::Perspective { yfov, znear, zfar, aspect_ratio } => writer
					.set("type", "perspective")
					.set("perspective", ObjectWriter::default()
						.set("yfov", yfov)
						.set("znear", znear)
						.opt("zfar", zfar)
						.opt("aspectRatio", aspect_ratio)
						.build()),
				Projection::Orthographic { xmag, ymag, znear, zfar } => writer
					.set("type", "orthographic")
					.set("orthographic", json!({ "xmag": xmag, "ymag": ymag, "znear": znear, "zfar": zfar })),
			};
			writer.build()
		}).collect()
	}

	fn lights(ctx: &GLTF2Context, used: &mut Vec<&'static str>) -> Value {
		ctx.lights().iter().map(|light| {
			let defaults = Light::new(light.ty);
			let mut writer = ObjectWriter::default()
				.opt("name", light.name.clone())
				.set("type", light.ty.to_string())
				.set("color", light.color.to_array().to_vec())
				.set("intensity", light.intensity)
				.opt("range", light.range);
			if light.ty == LightType::Spot
				|| light.inner_cone_angle != defaults.inner_cone_angle
				|| light.outer_cone_angle != defaults.outer_cone_angle
			{
				writer = writer.set("spot", json!({
					"innerConeAngle": light.inner_cone_angle,
					"outerConeAngle": light.outer_cone_angle,
				}));
			}
			if light.shadows != ShadowInfo::default() {
				used.push(EXT_KUESA_SHADOWS);
				let shadows = json!({
					"castsShadows": light.shadows.casts_shadows,
					"softShadows": light.shadows.soft_shadows,
					"shadowMapBias": light.shadows.shadow_map_bias,
					"nearPlane": light.shadows.near_plane,
					"shadowMapTextureSize": light.shadows.texture_size.to_array(),
				});
				writer = writer.set("extensions", object([(EXT_KUESA_SHADOWS, shadows)]));
			}
			writer.build()
		}).collect()
	}

	fn node(node: &TreeNode, used: &mut Vec<&'static str>) -> Value {
		let transform = &node.transform;
		let mut writer = ObjectWriter::default()
			.opt("name", node.name.clone())
			.non_empty("children", json!(node.children))
			.opt("mesh", node.mesh)
			.opt("camera", node.camera)
			.opt("skin", node.skin);
		if transform.is_matrix() {
			writer = writer.set("matrix", transform.matrix.to_cols_array().to_vec());
		} else {
			let bits = transform.bits;
			writer = writer
				.opt("translation", bits.contains(TransformBits::TRANSLATION_SET).then(|| transform.translation.to_array().to_vec()))
				.opt("rotation", bits.contains(TransformBits::ROTATION_SET).then(|| transform.rotation.to_array().to_vec()))
				.opt("scale", bits.contains(TransformBits::SCALE_SET).then(|| transform.scale.to_array().to_vec()));
		}

		let mut extensions = ObjectWriter::default();
		if let Some(light) = node.light {
			extensions = extensions.set(EXT_LIGHTS, json!({ "light": light }));
		}
		if !node.layers.is_empty() {
			used.push(EXT_KUESA_LAYERS);
			extensions = extensions.set(EXT_KUESA_LAYERS, json!({ "layers": node.layers }));
		}
		if let Some(placeholder) = node.placeholder {
			used.push(EXT_KUESA_PLACEHOLDER);
			extensions = extensions.set(EXT_KUESA_PLACEHOLDER, ObjectWriter::default().opt("cameraNode", placeholder.camera_node).build());
		}
		if let Some(plane) = node.reflection_plane {
			used.push(EXT_KUESA_REFLECTION_PLANES);
			extensions = extensions.set(EXT_KUESA_REFLECTION_PLANES, json!({ "plane": plane.to_array() }));
		}

		writer
			.non_empty("weights", json!(node.morph_weights))
			.non_empty("extras", extras_object(&node.extras))
			.non_empty("extensions", extensions.build())
			.build()
	}

	fn skins(ctx: &GLTF2Context) -> Value {
		ctx.skins().iter().map(|skin| {
			ObjectWriter::default()
				.opt("name", skin.name.clone())
				.set("joints", json!(skin.joints))
				.opt("inverseBindMatrices", skin.inverse_bind_matrices)
				.opt("skeleton", skin.skeleton)
				.build()
		}).collect()
	}

	/// Core channels are written as long as they lead the channel list; from
	/// the first property channel on, everything goes to
	/// `EXT_property_animation` so a re-import sees the same order.
	fn animation(animation: &Animation, used: &mut Vec<&'static str>) -> Value {
		let samplers = animation.samplers.iter().map(|sampler| json!({
			"input": sampler.input,
			"output": sampler.output,
			"interpolation": sampler.interpolation.to_string(),
		})).collect::<Value>();

		let core_len = animation.channels.iter().take_while(|c| c.target.is_core()).count();
		let (core, property) = animation.channels.split_at(core_len);
		let core = core.iter().map(|channel| json!({
			"sampler": channel.sampler,
			"target": { "node": channel.target.index, "path": channel.target.path },
		})).collect::<Value>();

		let mut writer = ObjectWriter::default()
			.opt("name", animation.name.clone())
			.set("samplers", samplers)
			.set("channels", core);
		if !property.is_empty() {
			used.push(EXT_PROPERTY_ANIMATION);
			let channels = property.iter().map(|channel| json!({
				"sampler": channel.sampler,
				"target": channel.target.pointer(),
			})).collect::<Vec<_>>();
			writer = writer.set("extensions", object([(EXT_PROPERTY_ANIMATION, json!({ "channels": channels }))]));
		}
		writer.build()
	}

	pub fn export(&self, ctx: &GLTF2Context) -> Result<Value, GltfError> {
		let mut used = Vec::new();

		let materials = ctx.materials().iter().map(|m| Self::material(m, &mut used)).collect::<Value>();
		let nodes = ctx.nodes().iter().map(|n| Self::node(n, &mut used)).collect::<Value>();
		let animations = ctx.animations().iter().map(|a| Self::animation(a, &mut used)).collect::<Value>();
		let lights = Self::lights(ctx, &mut used);

		let mut extensions = ObjectWriter::default();
		if ctx.light_count() > 0 {
			used.push(EXT_LIGHTS);
			extensions = extensions.set(EXT_LIGHTS, json!({ "lights": lights }));
		}
		if ctx.layer_count() > 0 {
			used.push(EXT_KUESA_LAYERS);
			let layers = ctx.layers().iter().map(|l| json!({ "name": l.name })).collect::<Vec<_>>();
			extensions = extensions.set(EXT_KUESA_LAYERS, json!({ "layers": layers }));
		}

		let mut extensions_used = ctx.used_extensions().to_vec();
		for ext in used {
			if !extensions_used.iter().any(|e| e == ext) {
				extensions_used.push(ext.to_string());
			}
		}

		let asset = ObjectWriter::default()
			.set("version", "2.0")
			.set("generator", ctx.generator().unwrap_or(&self.generator))
			.build();

		let doc = ObjectWriter::default()
			.set("asset", asset)
			.non_empty("extensionsUsed", json!(extensions_used))
			.non_empty("extensionsRequired", json!(ctx.required_extensions()))
			.non_empty("buffers", Self::buffers(ctx))
			.non_empty("bufferViews", Self::buffer_views(ctx))
			.non_empty("accessors", Self::accessors(ctx))
			.non_empty("images", Self::images(ctx)?)
			.non_empty("samplers", Self::samplers(ctx))
			.non_empty("textures", Self::textures(ctx))
			.non_empty("materials", materials)
			.non_empty("meshes", Self::meshes(ctx))
			.non_empty("cameras", Self::cameras(ctx))
			.non_empty("nodes", nodes)
			.non_empty("skins", Self::skins(ctx))
			.non_empty("animations", animations)
			.non_empty("scenes", ctx.scenes().iter().map(|s| {
				ObjectWriter::default().opt("name", s.name.clone()).set("nodes", json!(s.nodes)).build()
			}).collect())
			.opt("scene", ctx.default_scene())
			.non_empty("extensions", extensions.build())
			.build();

		log::debug!("exported glTF document with {} nodes", ctx.node_count());
		Ok(doc)
	}
}

/// Packs a document and an optional binary chunk into a GLB container.
pub fn write_glb(json: &Value, bin: Option<&[u8]>) -> Result<Vec<u8>, GltfError> {
	let mut json_bytes = serde_json::to_vec(json)?;
	json_bytes.resize(align_up(json_bytes.len(), 4), b' ');
	let bin_len = bin.map(|b| 8 + align_up(b.len(), 4)).unwrap_or(0);
	let total = 12 + 8 + json_bytes.len() + bin_len;
	let total = u32::try_from(total).map_err(|_| GltfError::InvalidGlb)?;

	let mut out = Vec::with_capacity(total as usize);
	out.extend(GLB_MAGIC.to_le_bytes());
	out.extend(2u32.to_le_bytes());
	out.extend(total.to_le_bytes());
	out.extend((json_bytes.len() as u32).to_le_bytes());
	out.extend(GLB_CHUNK_JSON.to_le_bytes());
	out.extend(json_bytes);
	if let Some(bin) = bin {
		let padded = align_up(bin.len(), 4);
		out.extend((padded as u32).to_le_bytes());
		out.extend(GLB_CHUNK_BIN.to_le_bytes());
		out.extend(bin);
		out.resize(out.len() + padded - bin.len(), 0);
	}
	Ok(out)
}

#[cfg(test)]
mod tests {
	use std::path::Path;

	use super::*;
	use crate::gltf::importer::split_glb;
	use crate::gltf::test_util::*;
	use crate::math::*;

	#[test]
	fn exported_buffers_are_data_uris() {
		let ctx = context_with_buffer(4);
		let doc = GLTF2Exporter::new().export(&ctx).unwrap();
		assert_eq!(doc["asset"]["version"], "2.0");
		assert_eq!(doc["buffers"][0]["uri"], data_uri(&[0, 1, 2, 3]));
		assert_eq!(doc["bufferViews"][0]["byteLength"], 4);
		assert!(doc.get("nodes").is_none());
	}

	#[test]
	fn nodes_use_current_extension_shapes() {
		let mut ctx = GLTF2Context::new();
		NodeParser.parse(&json!([{
			"translation": [1, 2, 3],
			"extensions": { "KDAB_kuesa": { "layers": [0], "reflectionPlane": [0, 1, 0, 0] } },
		}]), &mut ctx).unwrap();

		let doc = GLTF2Exporter::new().export(&ctx).unwrap();
		let node = &doc["nodes"][0];
		assert_eq!(node["translation"], json!([1.0, 2.0, 3.0]));
		assert!(node.get("rotation").is_none());
		assert_eq!(node["extensions"]["KDAB_kuesa_layers"]["layers"], json!([0]));
		assert_eq!(node["extensions"]["KDAB_kuesa_reflection_planes"]["plane"], json!([0.0, 1.0, 0.0, 0.0]));
		assert!(node["extensions"].get("KDAB_kuesa").is_none());
		let used = doc["extensionsUsed"].as_array().unwrap();
		assert!(used.contains(&json!("KDAB_kuesa_layers")));
	}

	#[test]
	fn images_keep_their_source_kind() {
		let mut ctx = GLTF2Context::new();
		ImageParser::new(Path::new("/assets")).parse(&json!([
			{ "uri": "my texture.png" },
			{ "uri": "qrc:/env.png" },
			{ "uri": data_uri(&[9, 9]), "mimeType": "image/png" },
		]), &mut ctx).unwrap();
		let doc = GLTF2Exporter::new().export(&ctx).unwrap();
		assert_eq!(doc["images"][0]["uri"], "/assets/my%20texture.png");
		assert_eq!(doc["images"][1]["uri"], "qrc:/env.png");
		assert!(doc["images"][2]["uri"].as_str().unwrap().starts_with("data:image/png;base64,"));
	}

	#[test]
	fn shadows_are_written_only_when_set() {
		let mut ctx = GLTF2Context::new();
		LightParser.parse(&json!([{ "type": "point" }, { "type": "spot", "castsShadows": true }]), &mut ctx).unwrap();
		let doc = GLTF2Exporter::new().export(&ctx).unwrap();
		let lights = &doc["extensions"]["KHR_lights_punctual"]["lights"];
		assert!(lights[0].get("extensions").is_none());
		assert!(lights[0].get("spot").is_none());
		assert_eq!(lights[1]["extensions"]["KDAB_kuesa_shadows"]["castsShadows"], true);
		assert_eq!(lights[1]["extensions"]["KDAB_kuesa_shadows"]["shadowMapTextureSize"], json!([512, 512]));
	}

	#[test]
	fn glb_container_round_trips() {
		let json = json!({ "asset": { "version": "2.0" } });
		let glb = write_glb(&json, Some(&[1, 2, 3])).unwrap();
		assert_eq!(glb.len() % 4, 0);
		let (json_chunk, bin) = split_glb(&glb).unwrap().unwrap();
		assert_eq!(serde_json::from_slice::<Value>(json_chunk).unwrap(), json);
		assert_eq!(bin, Some(&[1u8, 2, 3, 0][..]));
	}

	#[test]
	fn matrix_nodes_export_the_matrix() {
		let mut ctx = GLTF2Context::new();
		NodeParser.parse(&json!([{ "matrix": [2, 0, 0, 0, 0, 3, 0, 0, 0, 0, 1, 0, 1, 3, 4, 1] }]), &mut ctx).unwrap();
		let doc = GLTF2Exporter::new().export(&ctx).unwrap();
		let matrix = serde_json::from_value::<[f32; 16]>(doc["nodes"][0]["matrix"].clone()).unwrap();
		assert_eq!(mat4_from_gltf(&matrix), ctx.node(0).unwrap().transform.matrix);
		assert!(doc["nodes"][0].get("scale").is_none());
	}
}
