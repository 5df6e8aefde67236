use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::GltfError;

/// Deserializes every element of a top-level glTF array, naming the failing
/// element on error.
pub fn parse_array<T: DeserializeOwned>(json: &Value, section: &'static str) -> Result<Vec<T>, GltfError> {
	let array = json.as_array().ok_or(GltfError::NotAnArray(section))?;
	array.iter().enumerate().map(|(index, element)| {
		T::deserialize(element).map_err(|source| GltfError::Malformed { section, index, source })
	}).collect()
}

/// Flattens a glTF `extras` value into ordered key/value pairs.
pub fn extras_pairs(extras: &Option<Value>) -> Vec<(String, Value)> {
	match extras {
		Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
		Some(Value::Null) | None => Vec::new(),
		Some(_) => {
			log::warn!("ignoring extras that are not a JSON object");
			Vec::new()
		},
	}
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONAsset {
	pub version: String,
	pub generator: Option<String>,
	#[serde(alias = "minVersion")]
	pub min_version: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONGltf {
	pub asset: Option<JSONAsset>,
	pub scene: Option<usize>,
	pub scenes: Option<Value>,
	pub nodes: Option<Value>,
	pub buffers: Option<Value>,
	#[serde(alias = "bufferViews")]
	pub buffer_views: Option<Value>,
	pub accessors: Option<Value>,
	pub images: Option<Value>,
	pub samplers: Option<Value>,
	pub textures: Option<Value>,
	pub materials: Option<Value>,
	pub meshes: Option<Value>,
	pub cameras: Option<Value>,
	pub skins: Option<Value>,
	pub animations: Option<Value>,
	#[serde(alias = "extensionsUsed")]
	pub extensions_used: Option<Vec<String>>,
	#[serde(alias = "extensionsRequired")]
	pub extensions_required: Option<Vec<String>>,
	pub extensions: Option<Map<String, Value>>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONBuffer {
	#[serde(alias = "byteLength")]
	pub byte_length: usize,
	pub uri: Option<String>,
	pub name: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONBufferView {
	pub buffer: usize,
	#[serde(alias = "byteLength")]
	pub byte_length: usize,
	#[serde(alias = "byteOffset")]
	pub byte_offset: Option<usize>,
	#[serde(alias = "byteStride")]
	pub byte_stride: Option<usize>,
	pub target: Option<u32>,
	pub name: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONSparseIndices {
	#[serde(alias = "bufferView")]
	pub buffer_view: usize,
	#[serde(alias = "byteOffset")]
	pub byte_offset: Option<usize>,
	#[serde(alias = "componentType")]
	pub component_type: u32,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONSparseValues {
	#[serde(alias = "bufferView")]
	pub buffer_view: usize,
	#[serde(alias = "byteOffset")]
	pub byte_offset: Option<usize>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONSparse {
	pub count: usize,
	pub indices: JSONSparseIndices,
	pub values: JSONSparseValues,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONAccessor {
	#[serde(alias = "bufferView")]
	pub buffer_view: Option<usize>,
	#[serde(alias = "byteOffset")]
	pub byte_offset: Option<usize>,
	#[serde(alias = "componentType")]
	pub component_type: u32,
	#[serde(alias = "type")]
	pub ty: String,
	pub count: usize,
	pub normalized: Option<bool>,
	pub max: Option<Vec<f32>>,
	pub min: Option<Vec<f32>>,
	pub sparse: Option<JSONSparse>,
	pub name: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONImage {
	pub uri: Option<String>,
	#[serde(alias = "mimeType")]
	pub mime_type: Option<String>,
	#[serde(alias = "bufferView")]
	pub buffer_view: Option<usize>,
	pub name: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONSampler {
	#[serde(alias = "magFilter")]
	pub mag_filter: Option<u32>,
	#[serde(alias = "minFilter")]
	pub min_filter: Option<u32>,
	#[serde(alias = "wrapS")]
	pub wrap_s: Option<u32>,
	#[serde(alias = "wrapT")]
	pub wrap_t: Option<u32>,
	pub name: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONTextureSource {
	pub source: usize,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct JSONTextureExtensions {
	#[serde(rename = "MSFT_texture_dds")]
	pub dds: Option<JSONTextureSource>,
	#[serde(rename = "KHR_texture_basisu")]
	pub basisu: Option<JSONTextureSource>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONTexture {
	pub source: Option<usize>,
	pub sampler: Option<usize>,
	pub name: Option<String>,
	pub extensions: Option<JSONTextureExtensions>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONTextureTransform {
	pub offset: Option<[f32; 2]>,
	pub rotation: Option<f32>,
	pub scale: Option<[f32; 2]>,
	#[serde(alias = "texCoord")]
	pub tex_coord: Option<u32>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct JSONTextureInfoExtensions {
	#[serde(rename = "KHR_texture_transform")]
	pub transform: Option<JSONTextureTransform>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONTextureInfo {
	pub index: usize,
	#[serde(alias = "texCoord")]
	pub tex_coord: Option<u32>,
	pub scale: Option<f32>,
	pub strength: Option<f32>,
	pub extensions: Option<JSONTextureInfoExtensions>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONPbrMetallicRoughness {
	#[serde(alias = "baseColorFactor")]
	pub base_color_factor: Option<[f32; 4]>,
	#[serde(alias = "baseColorTexture")]
	pub base_color_texture: Option<JSONTextureInfo>,
	#[serde(alias = "metallicFactor")]
	pub metallic_factor: Option<f32>,
	#[serde(alias = "roughnessFactor")]
	pub roughness_factor: Option<f32>,
	#[serde(alias = "metallicRoughnessTexture")]
	pub metallic_roughness_texture: Option<JSONTextureInfo>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONSpecularGlossiness {
	#[serde(alias = "diffuseFactor")]
	pub diffuse_factor: Option<[f32; 4]>,
	#[serde(alias = "diffuseTexture")]
	pub diffuse_texture: Option<JSONTextureInfo>,
	#[serde(alias = "specularFactor")]
	pub specular_factor: Option<[f32; 3]>,
	#[serde(alias = "glossinessFactor")]
	pub glossiness_factor: Option<f32>,
	#[serde(alias = "specularGlossinessTexture")]
	pub specular_glossiness_texture: Option<JSONTextureInfo>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONIor {
	pub ior: Option<f32>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONTransmission {
	#[serde(alias = "transmissionFactor")]
	pub transmission_factor: Option<f32>,
	#[serde(alias = "transmissionTexture")]
	pub transmission_texture: Option<JSONTextureInfo>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONEmissiveStrength {
	#[serde(alias = "emissiveStrength")]
	pub emissive_strength: Option<f32>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONCustomMaterial {
	#[serde(rename = "type")]
	pub ty: String,
	pub properties: Option<Map<String, Value>>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct JSONMaterialExtensions {
	#[serde(rename = "KHR_materials_unlit")]
	pub unlit: Option<Value>,
	#[serde(rename = "KHR_materials_pbrSpecularGlossiness")]
	pub specular_glossiness: Option<JSONSpecularGlossiness>,
	#[serde(rename = "KHR_materials_ior")]
	pub ior: Option<JSONIor>,
	#[serde(rename = "KHR_materials_transmission")]
	pub transmission: Option<JSONTransmission>,
	#[serde(rename = "KHR_materials_emissive_strength")]
	pub emissive_strength: Option<JSONEmissiveStrength>,
	#[serde(rename = "KDAB_custom_material")]
	pub custom: Option<JSONCustomMaterial>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONMaterial {
	pub name: Option<String>,
	#[serde(alias = "pbrMetallicRoughness")]
	pub pbr_metallic_roughness: Option<JSONPbrMetallicRoughness>,
	#[serde(alias = "normalTexture")]
	pub normal_texture: Option<JSONTextureInfo>,
	#[serde(alias = "occlusionTexture")]
	pub occlusion_texture: Option<JSONTextureInfo>,
	#[serde(alias = "emissiveTexture")]
	pub emissive_texture: Option<JSONTextureInfo>,
	#[serde(alias = "emissiveFactor")]
	pub emissive_factor: Option<[f32; 3]>,
	#[serde(alias = "alphaMode")]
	pub alpha_mode: Option<String>,
	#[serde(alias = "alphaCutoff")]
	pub alpha_cutoff: Option<f32>,
	#[serde(alias = "doubleSided")]
	pub double_sided: Option<bool>,
	pub extensions: Option<JSONMaterialExtensions>,
	pub extras: Option<Value>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONPrimitive {
	pub attributes: BTreeMap<String, usize>,
	pub indices: Option<usize>,
	pub material: Option<usize>,
	pub mode: Option<u32>,
	pub targets: Option<Vec<BTreeMap<String, usize>>>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONMesh {
	pub name: Option<String>,
	pub primitives: Vec<JSONPrimitive>,
	pub weights: Option<Vec<f32>>,
	pub extras: Option<Value>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONPerspective {
	#[serde(alias = "aspectRatio")]
	pub aspect_ratio: Option<f32>,
	pub yfov: f32,
	pub zfar: Option<f32>,
	pub znear: f32,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONOrthographic {
	pub xmag: f32,
	pub ymag: f32,
	pub zfar: f32,
	pub znear: f32,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONCamera {
	pub name: Option<String>,
	#[serde(rename = "type")]
	pub ty: String,
	pub perspective: Option<JSONPerspective>,
	pub orthographic: Option<JSONOrthographic>,
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(untagged)]
pub enum JSONTextureSize {
	Square(u32),
	Size([u32; 2]),
}

// also flattened into JSONLight, where serde only matches exact names
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JSONShadows {
	pub casts_shadows: Option<bool>,
	pub soft_shadows: Option<bool>,
	pub shadow_map_bias: Option<f32>,
	pub near_plane: Option<f32>,
	pub shadow_map_texture_size: Option<JSONTextureSize>,
}

impl JSONShadows {
	pub fn is_empty(&self) -> bool {
		self.casts_shadows.is_none()
			&& self.soft_shadows.is_none()
			&& self.shadow_map_bias.is_none()
			&& self.near_plane.is_none()
			&& self.shadow_map_texture_size.is_none()
	}
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONSpot {
	#[serde(alias = "innerConeAngle")]
	pub inner_cone_angle: Option<f32>,
	#[serde(alias = "outerConeAngle")]
	pub outer_cone_angle: Option<f32>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct JSONLightExtensions {
	#[serde(rename = "KDAB_kuesa_shadows")]
	pub shadows: Option<JSONShadows>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONLight {
	pub name: Option<String>,
	#[serde(rename = "type")]
	pub ty: String,
	pub color: Option<[f32; 3]>,
	pub intensity: Option<f32>,
	pub range: Option<f32>,
	pub spot: Option<JSONSpot>,
	pub extensions: Option<JSONLightExtensions>,
	// deprecated shape, shadow fields directly on the light
	#[serde(flatten)]
	pub shadows: JSONShadows,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONLayer {
	pub name: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct JSONPlaceholder {
	#[serde(alias = "cameraNode")]
	pub camera_node: Option<usize>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONNodeLight {
	pub light: usize,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONNodeLayers {
	pub layers: Vec<usize>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONReflectionPlane {
	pub plane: [f32; 4],
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONKuesaDeprecated {
	pub layers: Option<Vec<usize>>,
	pub placeholder: Option<JSONPlaceholder>,
	#[serde(alias = "reflectionPlane")]
	pub reflection_plane: Option<[f32; 4]>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct JSONNodeExtensions {
	#[serde(rename = "KHR_lights_punctual")]
	pub light: Option<JSONNodeLight>,
	#[serde(rename = "KDAB_kuesa_layers")]
	pub layers: Option<JSONNodeLayers>,
	#[serde(rename = "KDAB_kuesa_placeholder")]
	pub placeholder: Option<JSONPlaceholder>,
	#[serde(rename = "KDAB_kuesa_reflection_planes")]
	pub reflection_plane: Option<JSONReflectionPlane>,
	#[serde(rename = "KDAB_kuesa")]
	pub deprecated: Option<JSONKuesaDeprecated>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONNode {
	pub name: Option<String>,
	pub matrix: Option<[f32; 16]>,
	pub rotation: Option<[f32; 4]>,
	pub scale: Option<[f32; 3]>,
	pub translation: Option<[f32; 3]>,
	pub mesh: Option<i64>,
	pub camera: Option<i64>,
	pub skin: Option<i64>,
	pub children: Option<Vec<usize>>,
	pub weights: Option<Vec<f32>>,
	pub extras: Option<Value>,
	pub extensions: Option<JSONNodeExtensions>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONSkin {
	pub name: Option<String>,
	pub joints: Vec<usize>,
	#[serde(alias = "inverseBindMatrices")]
	pub inverse_bind_matrices: Option<usize>,
	pub skeleton: Option<usize>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONAnimationSampler {
	pub input: usize,
	pub output: usize,
	pub interpolation: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONChannelTarget {
	pub node: Option<usize>,
	pub path: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONChannel {
	pub sampler: usize,
	pub target: JSONChannelTarget,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONPropertyChannel {
	pub sampler: usize,
	pub target: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONPropertyAnimation {
	pub channels: Vec<JSONPropertyChannel>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct JSONAnimationExtensions {
	#[serde(rename = "EXT_property_animation")]
	pub property_animation: Option<JSONPropertyAnimation>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONAnimation {
	pub name: Option<String>,
	pub samplers: Vec<JSONAnimationSampler>,
	pub channels: Option<Vec<JSONChannel>>,
	pub extensions: Option<JSONAnimationExtensions>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JSONScene {
	pub name: Option<String>,
	pub nodes: Option<Vec<usize>>,
}
