use serde_json::Value;

use super::json::*;
use super::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
	pub name: Option<String>,
	/// Root nodes.
	pub nodes: Vec<usize>,
}

/// Parses the `scenes` array and the top-level `scene` index.
pub struct SceneParser {
	pub default_scene: Option<usize>,
}

impl SceneParser {
	pub fn new(default_scene: Option<usize>) -> Self {
		Self { default_scene }
	}

	pub fn parse(&self, json: &Value, ctx: &mut GLTF2Context) -> Result<(), GltfError> {
		let scenes = parse_array::<JSONScene>(json, "scenes")?.into_iter().map(|scene| {
			let nodes = scene.nodes.unwrap_or_default();
			for &node in &nodes {
				ctx.check_index::<TreeNode>(node)?;
			}
			Ok(Scene { name: scene.name, nodes })
		}).collect::<Result<Vec<_>, GltfError>>()?;

		let default_scene = self.default_scene.map(|i| validate_index("scene", i, scenes.len())).transpose()?;

		log::debug!("parsed {} scenes", scenes.len());
		ctx.scenes.extend(scenes);
		ctx.default_scene = default_scene;
		Ok(())
	}
}
