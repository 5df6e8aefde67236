//! glTF 2.0 parsing into a [GLTF2Context].
//!
//! Each top-level array of the document has its own parser. Parsers run in
//! dependency order (buffers before views, views before accessors, and so on)
//! and every one of them either appends all of its records to the context or
//! none of them.

mod json;

pub mod accessor;
pub mod animation;
pub mod buffer;
pub mod camera;
pub mod context;
pub mod export;
pub mod image;
pub mod importer;
pub mod layer;
pub mod light;
pub mod material;
pub mod mesh;
pub mod node;
pub mod options;
pub mod scene;
pub mod skin;
pub mod texture;
pub mod uri;

pub use accessor::{Accessor, BufferAccessorParser, ComponentType, ElementType, SparseAccessor};
pub use animation::{
	Animation, AnimationChannel, AnimationParser, AnimationSampler, AnimationTarget, ClipChannel, ClipData,
	Interpolation, TargetType,
};
pub use buffer::{Buffer, BufferParser, BufferView, BufferViewsParser};
pub use camera::{Camera, CameraParser, Projection};
pub use context::{EntityHandle, GLTF2Context, GltfAsset};
pub use export::GLTF2Exporter;
pub use image::{Image, ImageParser, ImageSource};
pub use importer::GLTF2Importer;
pub use layer::{Layer, LayerParser};
pub use light::{Light, LightParser, LightType, ShadowInfo};
pub use material::{AlphaMode, Material, MaterialKind, MaterialParser, TextureInfo, TextureTransform};
pub use mesh::{Mesh, MeshParser, Primitive, PrimitiveMode};
pub use node::{NodeParser, PlaceholderInfo, TransformBits, TransformInfo, TreeNode};
pub use options::ImportOptions;
pub use scene::{Scene, SceneParser};
pub use skin::{Skin, SkinParser};
pub use texture::{MagFilter, MinFilter, Texture, TextureParser, TextureSampler, TextureSamplerParser, WrapMode};

#[derive(Debug, thiserror::Error)]
pub enum GltfError {
	#[error("io error")]
	IoError(#[from] std::io::Error),
	#[error("invalid json")]
	InvalidJSON(#[from] serde_json::error::Error),
	#[error("invalid import options")]
	InvalidOptions(#[from] ron::error::SpannedError),
	#[error("invalid base64 payload")]
	Base64Decode(#[from] base64::DecodeError),
	#[error("malformed {section}[{index}]: {source}")]
	Malformed {
		section: &'static str,
		index: usize,
		source: serde_json::error::Error,
	},
	#[error("\"{0}\" must be an array")]
	NotAnArray(&'static str),
	#[error("mandatory section \"{0}\" is missing or empty")]
	MissingSection(&'static str),
	#[error("{kind} index {index} is out of range (count {count})")]
	InvalidIndex {
		kind: &'static str,
		index: usize,
		count: usize,
	},
	#[error("invalid uri \"{0}\"")]
	InvalidURI(String),
	#[error("buffer {index} declares {declared} bytes but only {actual} are available")]
	BufferTooShort {
		index: usize,
		declared: usize,
		actual: usize,
	},
	#[error("buffer {0} has no uri and no binary chunk is available")]
	MissingBinaryChunk(usize),
	#[error("{kind} {index} does not fit in its buffer")]
	OutOfBounds {
		kind: &'static str,
		index: usize,
	},
	#[error("unknown accessor component type {0}")]
	UnknownComponentType(u32),
	#[error("unknown accessor type \"{0}\"")]
	UnknownAccessorType(String),
	#[error("invalid value {value} for {field}")]
	InvalidValue {
		field: &'static str,
		value: String,
	},
	#[error("image {0} must have exactly one of uri or bufferView")]
	ImageSource(usize),
	#[error("node {0} has both a matrix and a translation/rotation/scale")]
	ConflictingTransform(usize),
	#[error("primitive {primitive} of mesh {mesh} has attributes with differing vertex counts")]
	VertexCountMismatch {
		mesh: usize,
		primitive: usize,
	},
	#[error("invalid animation {index}: {reason}")]
	InvalidAnimation {
		index: usize,
		reason: String,
	},
	#[error("invalid animation target \"{0}\"")]
	InvalidTarget(String),
	#[error("invalid node tree: {0}")]
	InvalidTree(String),
	#[error("invalid glb container")]
	InvalidGlb,
	#[error("unsupported version \"{0}\", only version 2 is supported")]
	UnsupportedVersion(String),
	#[error("required extension \"{0}\" is not supported")]
	UnsupportedExtension(String),
}

pub const COMPONENT_I8: u32 = 5120;
pub const COMPONENT_U8: u32 = 5121;
pub const COMPONENT_I16: u32 = 5122;
pub const COMPONENT_U16: u32 = 5123;
pub const COMPONENT_U32: u32 = 5125;
pub const COMPONENT_F32: u32 = 5126;

pub const EXT_LIGHTS: &str = "KHR_lights_punctual";
pub const EXT_UNLIT: &str = "KHR_materials_unlit";
pub const EXT_SPECULAR_GLOSSINESS: &str = "KHR_materials_pbrSpecularGlossiness";
pub const EXT_IOR: &str = "KHR_materials_ior";
pub const EXT_TRANSMISSION: &str = "KHR_materials_transmission";
pub const EXT_EMISSIVE_STRENGTH: &str = "KHR_materials_emissive_strength";
pub const EXT_TEXTURE_TRANSFORM: &str = "KHR_texture_transform";
pub const EXT_TEXTURE_DDS: &str = "MSFT_texture_dds";
pub const EXT_TEXTURE_BASISU: &str = "KHR_texture_basisu";
pub const EXT_PROPERTY_ANIMATION: &str = "EXT_property_animation";
pub const EXT_KUESA_LAYERS: &str = "KDAB_kuesa_layers";
pub const EXT_KUESA_SHADOWS: &str = "KDAB_kuesa_shadows";
pub const EXT_KUESA_PLACEHOLDER: &str = "KDAB_kuesa_placeholder";
pub const EXT_KUESA_REFLECTION_PLANES: &str = "KDAB_kuesa_reflection_planes";
pub const EXT_KUESA_DEPRECATED: &str = "KDAB_kuesa";
pub const EXT_CUSTOM_MATERIAL: &str = "KDAB_custom_material";

/// Extensions this crate understands well enough to honor when required.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
	EXT_LIGHTS,
	EXT_UNLIT,
	EXT_SPECULAR_GLOSSINESS,
	EXT_IOR,
	EXT_TRANSMISSION,
	EXT_EMISSIVE_STRENGTH,
	EXT_TEXTURE_TRANSFORM,
	EXT_TEXTURE_DDS,
	EXT_TEXTURE_BASISU,
	EXT_PROPERTY_ANIMATION,
	EXT_KUESA_LAYERS,
	EXT_KUESA_SHADOWS,
	EXT_KUESA_PLACEHOLDER,
	EXT_KUESA_REFLECTION_PLANES,
	EXT_KUESA_DEPRECATED,
	EXT_CUSTOM_MATERIAL,
];

pub(crate) fn validate_index(kind: &'static str, index: usize, count: usize) -> Result<usize, GltfError> {
	if index >= count {
		Err(GltfError::InvalidIndex { kind, index, count })
	} else {
		Ok(index)
	}
}

#[cfg(test)]
pub(crate) mod test_util {
	use base64::Engine;

	use super::*;

	pub fn data_uri(bytes: &[u8]) -> String {
		format!(
			"data:application/octet-stream;base64,{}",
			base64::engine::general_purpose::STANDARD.encode(bytes)
		)
	}

	/// A context with one buffer of `len` bytes (byte `i` holds `i as u8`) and
	/// one view covering all of it.
	pub fn context_with_buffer(len: usize) -> GLTF2Context {
		let bytes = (0..len).map(|i| i as u8).collect::<Vec<_>>();
		let mut ctx = GLTF2Context::default();
		BufferParser::new(std::path::Path::new("."), None)
			.parse(&serde_json::json!([{ "byteLength": len, "uri": data_uri(&bytes) }]), &mut ctx)
			.unwrap();
		BufferViewsParser
			.parse(&serde_json::json!([{ "buffer": 0, "byteLength": len }]), &mut ctx)
			.unwrap();
		ctx
	}

	/// Context with a single buffer holding `floats` and a view over them.
	pub fn context_with_floats(floats: &[f32]) -> GLTF2Context {
		let bytes: &[u8] = bytemuck::cast_slice(floats);
		let mut ctx = GLTF2Context::default();
		BufferParser::new(std::path::Path::new("."), None)
			.parse(&serde_json::json!([{ "byteLength": bytes.len(), "uri": data_uri(bytes) }]), &mut ctx)
			.unwrap();
		BufferViewsParser
			.parse(&serde_json::json!([{ "buffer": 0, "byteLength": bytes.len() }]), &mut ctx)
			.unwrap();
		ctx
	}
}
