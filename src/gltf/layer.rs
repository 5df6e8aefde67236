use serde_json::Value;

use super::json::*;
use super::*;

/// A named render layer nodes can be tagged with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
	pub name: String,
}

/// Parses `extensions.KDAB_kuesa_layers.layers`.
pub struct LayerParser;

impl LayerParser {
	pub fn parse(&self, json: &Value, ctx: &mut GLTF2Context) -> Result<(), GltfError> {
		let layers = parse_array::<JSONLayer>(json, "layers")?
			.into_iter()
			.map(|layer| Layer { name: layer.name })
			.collect::<Vec<_>>();

		log::debug!("parsed {} layers", layers.len());
		ctx.layers.extend(layers);
		Ok(())
	}
}

impl GLTF2Context {
	/// Index of the layer called `name`.
	pub fn layer_index(&self, name: &str) -> Option<usize> {
		self.layers.iter().position(|l| l.name == name)
	}
}
