//! `EXT_property_animation` targets.
//!
//! A property channel names what it animates with a pointer into the
//! document, e.g. `/materials/2/pbrMetallicRoughness/baseColorFactor` or
//! `/extensions/KHR_lights_punctual/lights/0/color`. The pointer is split into
//! the kind of object, its index and the property path below it. The path is
//! kept verbatim for whoever binds the animation to engine properties.

use super::super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
	Node,
	Camera,
	Material,
	Light,
}

impl TargetType {
	/// Pointer prefix of the array objects of this kind live in.
	pub fn collection(self) -> &'static str {
		match self {
			Self::Node => "/nodes",
			Self::Camera => "/cameras",
			Self::Material => "/materials",
			Self::Light => "/extensions/KHR_lights_punctual/lights",
		}
	}

	fn check_index(self, ctx: &GLTF2Context, i: usize) -> Result<usize, GltfError> {
		match self {
			Self::Node => ctx.check_index::<TreeNode>(i),
			Self::Camera => ctx.check_index::<Camera>(i),
			Self::Material => ctx.check_index::<Material>(i),
			Self::Light => ctx.check_index::<Light>(i),
		}
	}
}

/// Node properties core glTF channels can animate.
pub const CORE_PATHS: [&str; 4] = ["translation", "rotation", "scale", "weights"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnimationTarget {
	pub ty: TargetType,
	pub index: usize,
	/// Property path below the object, `/` separated.
	pub path: String,
}

impl AnimationTarget {
	pub fn node(index: usize, path: &str) -> Self {
		Self { ty: TargetType::Node, index, path: path.to_string() }
	}

	/// Parses a property animation pointer without looking at the context.
	pub fn from_pointer(pointer: &str) -> Result<Self, GltfError> {
		let invalid = || GltfError::InvalidTarget(pointer.to_string());

		let (ty, rest) = [TargetType::Node, TargetType::Camera, TargetType::Material, TargetType::Light]
			.into_iter()
			.find_map(|ty| pointer.strip_prefix(ty.collection()).and_then(|r| r.strip_prefix('/')).map(|r| (ty, r)))
			.ok_or_else(invalid)?;
		let (index, path) = rest.split_once('/').ok_or_else(invalid)?;
		let index = index.parse::<usize>().map_err(|_| invalid())?;
		if path.is_empty() || path.split('/').any(str::is_empty) {
			return Err(invalid());
		}
		Ok(Self { ty, index, path: path.to_string() })
	}

	/// Parses a pointer and checks the object it names exists.
	pub fn resolve(pointer: &str, ctx: &GLTF2Context) -> Result<Self, GltfError> {
		let target = Self::from_pointer(pointer)?;
		target.ty.check_index(ctx, target.index)?;
		Ok(target)
	}

	pub fn pointer(&self) -> String {
		format!("{}/{}/{}", self.ty.collection(), self.index, self.path)
	}

	/// Whether a core glTF channel can express this target.
	pub fn is_core(&self) -> bool {
		self.ty == TargetType::Node && CORE_PATHS.contains(&self.path.as_str())
	}

	/// Whether the channel drives one value per morph target.
	pub fn is_morph_weights(&self) -> bool {
		self.ty == TargetType::Node && self.path == "weights"
	}

	/// Name of the clip channel, before repeats are numbered.
	pub fn channel_base_name(&self) -> &str {
		match (self.ty, self.path.as_str()) {
			(TargetType::Node, "scale") => "scale3D",
			(TargetType::Node, "weights") => "morphWeights",
			(_, path) => path.rsplit('/').next().unwrap_or(path),
		}
	}
}
