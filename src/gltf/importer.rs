use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::json::*;
use super::*;

pub(crate) const GLB_MAGIC: u32 = 0x46546C67;
pub(crate) const GLB_CHUNK_JSON: u32 = 0x4E4F534A;
pub(crate) const GLB_CHUNK_BIN: u32 = 0x004E4942;

fn read_u32(bytes: &[u8]) -> Option<(u32, &[u8])> {
	let (v, rest) = bytes.split_first_chunk::<4>()?;
	Some((u32::from_le_bytes(*v), rest))
}

/// Splits a GLB container into its JSON chunk and optional BIN chunk.
/// Returns None when `file` isn't a GLB container at all.
pub(crate) fn split_glb(file: &[u8]) -> Result<Option<(&[u8], Option<&[u8]>)>, GltfError> {
	let Some((magic, rest)) = read_u32(file) else {
		return Ok(None);
	};
	if magic != GLB_MAGIC {
		return Ok(None);
	}
	let (version, rest) = read_u32(rest).ok_or(GltfError::InvalidGlb)?;
	if version != 2 {
		return Err(GltfError::UnsupportedVersion(version.to_string()));
	}
	let (length, data) = read_u32(rest).ok_or(GltfError::InvalidGlb)?;
	if length as usize > file.len() {
		return Err(GltfError::InvalidGlb);
	}

	let (json_length, data) = read_u32(data).ok_or(GltfError::InvalidGlb)?;
	let (json_type, data) = read_u32(data).ok_or(GltfError::InvalidGlb)?;
	if json_type != GLB_CHUNK_JSON {
		return Err(GltfError::InvalidGlb);
	}
	let (json, data) = data.split_at_checked(json_length as usize).ok_or(GltfError::InvalidGlb)?;

	let bin = if data.is_empty() {
		None
	} else {
		let (bin_length, data) = read_u32(data).ok_or(GltfError::InvalidGlb)?;
		let (bin_type, data) = read_u32(data).ok_or(GltfError::InvalidGlb)?;
		if bin_type == GLB_CHUNK_BIN {
			let (bin, _) = data.split_at_checked(bin_length as usize).ok_or(GltfError::InvalidGlb)?;
			Some(bin)
		} else {
			// unknown chunk types are skipped
			None
		}
	};
	Ok(Some((json, bin)))
}

fn check_version(asset: &JSONAsset) -> Result<(), GltfError> {
	let major = |v: &str| v.split('.').next().and_then(|m| m.parse::<u32>().ok());
	let version = asset.min_version.as_deref().unwrap_or(&asset.version);
	if major(&asset.version) != Some(2) || major(version) != Some(2) {
		return Err(GltfError::UnsupportedVersion(version.to_string()));
	}
	Ok(())
}

/// Runs every section parser over a glTF document in dependency order and
/// returns the filled context.
#[derive(Debug, Default, Clone)]
pub struct GLTF2Importer {
	options: ImportOptions,
}

impl GLTF2Importer {
	pub fn new(options: ImportOptions) -> Self {
		Self { options }
	}

	pub fn options(&self) -> &ImportOptions {
		&self.options
	}

	/// Loads a `.gltf` or `.glb` file. Relative uris resolve against the
	/// file's directory.
	pub fn load_file(&self, path: impl AsRef<Path>) -> Result<GLTF2Context, GltfError> {
		let path = path.as_ref();
		let bytes = std::fs::read(path)?;
		let base_path = path.parent().unwrap_or(Path::new(""));
		log::debug!("loading {}", path.display());
		self.load_slice(&bytes, base_path)
	}

	/// Loads a document held in memory, GLB or plain JSON.
	pub fn load_slice(&self, bytes: &[u8], base_path: &Path) -> Result<GLTF2Context, GltfError> {
		match split_glb(bytes)? {
			Some((json, bin)) => {
				let json = serde_json::from_slice::<Value>(json)?;
				self.parse_document(&json, base_path, bin)
			},
			None => {
				let json = serde_json::from_slice::<Value>(bytes)?;
				self.parse_document(&json, base_path, None)
			},
		}
	}

	fn check_extensions(&self, ctx: &GLTF2Context) -> Result<(), GltfError> {
		for ext in ctx.used_extensions() {
			if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
				log::warn!("extension {ext} is not supported and will be ignored");
			}
		}
		for ext in ctx.required_extensions() {
			if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
				if self.options.reject_unsupported_required_extensions {
					return Err(GltfError::UnsupportedExtension(ext.clone()));
				}
				log::warn!("required extension {ext} is not supported, loading anyway");
			}
		}
		Ok(())
	}

	/// Parses an already decoded document. `glb_chunk` backs the first buffer
	/// without a uri.
	pub fn parse_document(&self, json: &Value, base_path: &Path, glb_chunk: Option<&[u8]>) -> Result<GLTF2Context, GltfError> {
		let doc = JSONGltf::deserialize(json)?;
		let mut ctx = GLTF2Context::new();

		match &doc.asset {
			Some(asset) => {
				check_version(asset)?;
				ctx.generator = asset.generator.clone();
			},
			None => log::warn!("document has no asset description, assuming glTF 2.0"),
		}

		ctx.used_extensions = doc.extensions_used.clone().unwrap_or_default();
		ctx.required_extensions = doc.extensions_required.clone().unwrap_or_default();
		self.check_extensions(&ctx)?;

		let extension_array = |ext: &str, key: &str| doc.extensions.as_ref().and_then(|e| e.get(ext)).and_then(|e| e.get(key));

		if let Some(buffers) = &doc.buffers {
			BufferParser::new(base_path, glb_chunk).parse(buffers, &mut ctx)?;
		}
		if let Some(views) = &doc.buffer_views {
			BufferViewsParser.parse(views, &mut ctx)?;
		}
		if let Some(accessors) = &doc.accessors {
			BufferAccessorParser::new(self.options.strict_component_types).parse(accessors, &mut ctx)?;
		}
		if let Some(images) = &doc.images {
			ImageParser::new(base_path).parse(images, &mut ctx)?;
		}
		if let Some(samplers) = &doc.samplers {
			TextureSamplerParser.parse(samplers, &mut ctx)?;
		}
		if let Some(textures) = &doc.textures {
			TextureParser.parse(textures, &mut ctx)?;
		}
		if let Some(materials) = &doc.materials {
			MaterialParser.parse(materials, &mut ctx)?;
		}
		if let Some(meshes) = &doc.meshes {
			MeshParser.parse(meshes, &mut ctx)?;
		}
		if let Some(cameras) = &doc.cameras {
			CameraParser.parse(cameras, &mut ctx)?;
		}
		if let Some(lights) = extension_array(EXT_LIGHTS, "lights") {
			LightParser.parse(lights, &mut ctx)?;
		}
		if let Some(layers) = extension_array(EXT_KUESA_LAYERS, "layers") {
			LayerParser.parse(layers, &mut ctx)?;
		}
		match &doc.nodes {
			Some(nodes) => NodeParser.parse(nodes, &mut ctx)?,
			None => log::debug!("document has no nodes"),
		}
		if let Some(skins) = &doc.skins {
			SkinParser.parse(skins, &mut ctx)?;
		}
		if let Some(animations) = &doc.animations {
			match AnimationParser.parse(animations, &mut ctx) {
				Err(e) if self.options.ignore_animation_errors => log::warn!("skipping animations: {e}"),
				result => result?,
			}
		}
		match (&doc.scenes, doc.scene) {
			(Some(scenes), default_scene) => SceneParser::new(default_scene).parse(scenes, &mut ctx)?,
			(None, Some(scene)) => return Err(GltfError::InvalidIndex { kind: "scene", index: scene, count: 0 }),
			(None, None) => {},
		}
		node::check_node_references(&ctx)?;

		log::info!(
			"imported glTF document: {} nodes, {} meshes, {} materials, {} animations",
			ctx.node_count(),
			ctx.mesh_count(),
			ctx.material_count(),
			ctx.animation_count(),
		);
		Ok(ctx)
	}
}
