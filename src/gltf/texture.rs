use serde_json::Value;

use super::json::*;
use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagFilter {
	Nearest,
	Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinFilter {
	Nearest,
	Linear,
	NearestMipmapNearest,
	LinearMipmapNearest,
	NearestMipmapLinear,
	LinearMipmapLinear,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
	ClampToEdge,
	MirroredRepeat,
	#[default]
	Repeat,
}

impl MagFilter {
	pub fn from_gl(v: u32) -> Option<Self> {
		match v {
			9728 => Some(Self::Nearest),
			9729 => Some(Self::Linear),
			_ => None,
		}
	}

	pub fn gl(self) -> u32 {
		match self {
			Self::Nearest => 9728,
			Self::Linear => 9729,
		}
	}
}

impl MinFilter {
	pub fn from_gl(v: u32) -> Option<Self> {
		match v {
			9728 => Some(Self::Nearest),
			9729 => Some(Self::Linear),
			9984 => Some(Self::NearestMipmapNearest),
			9985 => Some(Self::LinearMipmapNearest),
			9986 => Some(Self::NearestMipmapLinear),
			9987 => Some(Self::LinearMipmapLinear),
			_ => None,
		}
	}

	pub fn gl(self) -> u32 {
		match self {
			Self::Nearest => 9728,
			Self::Linear => 9729,
			Self::NearestMipmapNearest => 9984,
			Self::LinearMipmapNearest => 9985,
			Self::NearestMipmapLinear => 9986,
			Self::LinearMipmapLinear => 9987,
		}
	}
}

impl WrapMode {
	pub fn from_gl(v: u32) -> Option<Self> {
		match v {
			33071 => Some(Self::ClampToEdge),
			33648 => Some(Self::MirroredRepeat),
			10497 => Some(Self::Repeat),
			_ => None,
		}
	}

	pub fn gl(self) -> u32 {
		match self {
			Self::ClampToEdge => 33071,
			Self::MirroredRepeat => 33648,
			Self::Repeat => 10497,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureSampler {
	pub name: Option<String>,
	pub mag_filter: Option<MagFilter>,
	pub min_filter: Option<MinFilter>,
	pub wrap_s: WrapMode,
	pub wrap_t: WrapMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
	pub name: Option<String>,
	/// Image index. Compressed sources from `MSFT_texture_dds` or
	/// `KHR_texture_basisu` win over the core `source`.
	pub source: Option<usize>,
	pub sampler: Option<usize>,
}

fn gl_enum<T>(field: &'static str, value: Option<u32>, from_gl: fn(u32) -> Option<T>) -> Result<Option<T>, GltfError> {
	value.map(|v| from_gl(v).ok_or(GltfError::InvalidValue { field, value: v.to_string() })).transpose()
}

/// Parses the `samplers` array.
pub struct TextureSamplerParser;

impl TextureSamplerParser {
	pub fn parse(&self, json: &Value, ctx: &mut GLTF2Context) -> Result<(), GltfError> {
		let samplers = parse_array::<JSONSampler>(json, "samplers")?.into_iter().map(|sampler| {
			Ok(TextureSampler {
				name: sampler.name,
				mag_filter: gl_enum("magFilter", sampler.mag_filter, MagFilter::from_gl)?,
				min_filter: gl_enum("minFilter", sampler.min_filter, MinFilter::from_gl)?,
				wrap_s: gl_enum("wrapS", sampler.wrap_s, WrapMode::from_gl)?.unwrap_or_default(),
				wrap_t: gl_enum("wrapT", sampler.wrap_t, WrapMode::from_gl)?.unwrap_or_default(),
			})
		}).collect::<Result<Vec<_>, GltfError>>()?;

		log::debug!("parsed {} texture samplers", samplers.len());
		ctx.samplers.extend(samplers);
		Ok(())
	}
}

/// Parses the `textures` array against the parsed images and samplers.
pub struct TextureParser;

impl TextureParser {
	pub fn parse(&self, json: &Value, ctx: &mut GLTF2Context) -> Result<(), GltfError> {
		let textures = parse_array::<JSONTexture>(json, "textures")?.into_iter().map(|texture| {
			let extensions = texture.extensions.unwrap_or_default();
			let source = extensions.dds.or(extensions.basisu).map(|s| s.source).or(texture.source);
			Ok(Texture {
				name: texture.name,
				source: source.map(|i| ctx.check_index::<Image>(i)).transpose()?,
				sampler: texture.sampler.map(|i| ctx.check_index::<TextureSampler>(i)).transpose()?,
			})
		}).collect::<Result<Vec<_>, GltfError>>()?;

		log::debug!("parsed {} textures", textures.len());
		ctx.textures.extend(textures);
		Ok(())
	}
}
