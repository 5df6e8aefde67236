use std::path::Path;

use super::GltfError;

/// Knobs for [super::GLTF2Importer], usually read from a RON file:
///
/// ```ron
/// (
///     strict_component_types: true,
///     ignore_animation_errors: true,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct ImportOptions {
	/// Fail on an unknown accessor `componentType` instead of reading it as float.
	pub strict_component_types: bool,
	/// Abort when `extensionsRequired` names something this crate can't handle.
	pub reject_unsupported_required_extensions: bool,
	/// Keep importing when the animations section is invalid.
	pub ignore_animation_errors: bool,
}

impl Default for ImportOptions {
	fn default() -> Self {
		Self {
			strict_component_types: false,
			reject_unsupported_required_extensions: true,
			ignore_animation_errors: false,
		}
	}
}

impl ImportOptions {
	pub fn from_ron(s: &str) -> Result<Self, GltfError> {
		Ok(ron::from_str(s)?)
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self, GltfError> {
		let s = std::fs::read_to_string(path)?;
		Self::from_ron(&s)
	}

	pub fn to_ron(&self) -> String {
		// plain structs of bools always serialize
		ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_fields_take_defaults() {
		let options = ImportOptions::from_ron("(strict_component_types: true)").unwrap();
		assert!(options.strict_component_types);
		assert!(options.reject_unsupported_required_extensions);
		assert!(!options.ignore_animation_errors);
	}

	#[test]
	fn empty_struct_is_default() {
		assert_eq!(ImportOptions::from_ron("()").unwrap(), ImportOptions::default());
	}

	#[test]
	fn round_trips_through_ron() {
		let options = ImportOptions { ignore_animation_errors: true, ..Default::default() };
		assert_eq!(ImportOptions::from_ron(&options.to_ron()).unwrap(), options);
	}

	#[test]
	fn rejects_garbage() {
		assert!(matches!(ImportOptions::from_ron("(strict_component_types: 3)"), Err(GltfError::InvalidOptions(_))));
	}
}
