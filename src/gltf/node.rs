use serde_json::Value;

use super::json::*;
use super::*;
use crate::math::*;

bitflags::bitflags! {
	/// Which transform properties a node declared. `MATRIX_SET` never appears
	/// together with any of the others.
	#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct TransformBits: u8 {
		const MATRIX_SET = 1 << 0;
		const TRANSLATION_SET = 1 << 1;
		const ROTATION_SET = 1 << 2;
		const SCALE_SET = 1 << 3;
	}
}

/// A node's local transform, in both matrix and decomposed form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformInfo {
	pub bits: TransformBits,
	pub matrix: Mat4,
	pub translation: Vec3,
	pub rotation: Quat,
	pub scale: Vec3,
}

impl Default for TransformInfo {
	fn default() -> Self {
		Self {
			bits: TransformBits::empty(),
			matrix: Mat4::IDENTITY,
			translation: Vec3::ZERO,
			rotation: Quat::IDENTITY,
			scale: Vec3::ONE,
		}
	}
}

impl TransformInfo {
	/// True when the node should get a plain matrix transform rather than a
	/// decomposed one.
	pub fn is_matrix(&self) -> bool {
		self.bits.contains(TransformBits::MATRIX_SET)
	}

	pub fn local_matrix(&self) -> Mat4 {
		if self.is_matrix() {
			self.matrix
		} else {
			Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderInfo {
	/// Node whose camera the placeholder is laid out against.
	pub camera_node: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
	pub name: Option<String>,
	pub children: Vec<usize>,
	pub mesh: Option<usize>,
	pub camera: Option<usize>,
	pub skin: Option<usize>,
	pub light: Option<usize>,
	pub transform: TransformInfo,
	pub morph_weights: Vec<f32>,
	/// `extras` in declaration order.
	pub extras: Vec<(String, Value)>,
	pub layers: Vec<usize>,
	/// Plane equation `ax + by + cz + d = 0`.
	pub reflection_plane: Option<Vec4>,
	pub placeholder: Option<PlaceholderInfo>,
	/// Filled in once the node is instantiated.
	pub entity: Option<EntityHandle>,
}

impl TreeNode {
	pub fn extra(&self, key: &str) -> Option<&Value> {
		self.extras.iter().find(|(k, _)| k == key).map(|(_, v)| v)
	}
}

fn optional_index(i: Option<i64>) -> Option<usize> {
	i.and_then(|i| usize::try_from(i).ok())
}

/// Parses the `nodes` array. Indices stored on nodes are only checked by
/// [check_node_references], once every section they point into is parsed.
pub struct NodeParser;

impl NodeParser {
	fn parse_transform(node: &JSONNode, index: usize) -> Result<TransformInfo, GltfError> {
		let mut transform = TransformInfo::default();

		if let Some(matrix) = &node.matrix {
			if node.translation.is_some() || node.rotation.is_some() || node.scale.is_some() {
				return Err(GltfError::ConflictingTransform(index));
			}
			transform.bits = TransformBits::MATRIX_SET;
			transform.matrix = mat4_from_gltf(matrix);
			(transform.scale, transform.rotation, transform.translation) = decompose(transform.matrix);
			return Ok(transform);
		}

		if let Some(translation) = node.translation {
			transform.bits |= TransformBits::TRANSLATION_SET;
			transform.translation = Vec3::from(translation);
		}
		if let Some(rotation) = node.rotation {
			transform.bits |= TransformBits::ROTATION_SET;
			transform.rotation = Quat::from_array(rotation);
		}
		if let Some(scale) = node.scale {
			transform.bits |= TransformBits::SCALE_SET;
			transform.scale = Vec3::from(scale);
		}
		transform.matrix = Mat4::from_scale_rotation_translation(transform.scale, transform.rotation, transform.translation);
		Ok(transform)
	}

	fn parse_node(node: JSONNode, index: usize) -> Result<TreeNode, GltfError> {
		let transform = Self::parse_transform(&node, index)?;

		// the separate extensions win over the bundled KDAB_kuesa object
		let extensions = node.extensions.unwrap_or_default();
		let deprecated = extensions.deprecated;
		let layers = extensions.layers
			.map(|l| l.layers)
			.or_else(|| deprecated.as_ref().and_then(|d| d.layers.clone()))
			.unwrap_or_default();
		let placeholder = extensions.placeholder
			.or_else(|| deprecated.as_ref().and_then(|d| d.placeholder.clone()))
			.map(|p| PlaceholderInfo { camera_node: p.camera_node });
		let reflection_plane = extensions.reflection_plane
			.map(|r| r.plane)
			.or_else(|| deprecated.as_ref().and_then(|d| d.reflection_plane))
			.map(Vec4::from);

		Ok(TreeNode {
			name: node.name,
			children: node.children.unwrap_or_default(),
			mesh: optional_index(node.mesh),
			camera: optional_index(node.camera),
			skin: optional_index(node.skin),
			light: extensions.light.map(|l| l.light),
			transform,
			morph_weights: node.weights.unwrap_or_default(),
			extras: extras_pairs(&node.extras),
			layers,
			reflection_plane,
			placeholder,
			entity: None,
		})
	}

	pub fn parse(&self, json: &Value, ctx: &mut GLTF2Context) -> Result<(), GltfError> {
		if json.as_array().map_or(true, |a| a.is_empty()) {
			return Err(GltfError::MissingSection("nodes"));
		}
		let nodes = parse_array::<JSONNode>(json, "nodes")?
			.into_iter()
			.enumerate()
			.map(|(index, node)| Self::parse_node(node, index))
			.collect::<Result<Vec<_>, GltfError>>()?;

		log::debug!("parsed {} nodes", nodes.len());
		ctx.nodes.extend(nodes);
		Ok(())
	}
}

/// Checks every index a node holds once meshes, cameras, skins, lights and
/// layers are all in the context, and that each node has at most one parent.
pub fn check_node_references(ctx: &GLTF2Context) -> Result<(), GltfError> {
	let mut parents: Vec<Option<usize>> = vec![None; ctx.node_count()];

	for (i, node) in ctx.nodes().iter().enumerate() {
		for &child in &node.children {
			ctx.check_index::<TreeNode>(child)?;
			if child == i {
				return Err(GltfError::InvalidTree(format!("node {i} is its own child")));
			}
			if let Some(parent) = parents[child].replace(i) {
				return Err(GltfError::InvalidTree(format!("node {child} has two parents, {parent} and {i}")));
			}
		}
		if let Some(mesh) = node.mesh {
			ctx.check_index::<Mesh>(mesh)?;
			let targets = ctx.meshes[mesh].morph_target_count();
			if !node.morph_weights.is_empty() && node.morph_weights.len() != targets {
				return Err(GltfError::InvalidValue {
					field: "weights",
					value: format!("node {i} has {} weights for {targets} morph targets", node.morph_weights.len()),
				});
			}
		}
		node.camera.map(|c| ctx.check_index::<Camera>(c)).transpose()?;
		node.skin.map(|s| ctx.check_index::<Skin>(s)).transpose()?;
		node.light.map(|l| ctx.check_index::<Light>(l)).transpose()?;
		for &layer in &node.layers {
			ctx.check_index::<Layer>(layer)?;
		}
		if let Some(camera_node) = node.placeholder.and_then(|p| p.camera_node) {
			ctx.check_index::<TreeNode>(camera_node)?;
		}
	}
	Ok(())
}

impl GLTF2Context {
	/// Nodes that are nobody's child, in index order.
	pub fn root_nodes(&self) -> Vec<usize> {
		let mut is_child = vec![false; self.nodes.len()];
		for child in self.nodes.iter().flat_map(|n| n.children.iter()) {
			if let Some(flag) = is_child.get_mut(*child) {
				*flag = true;
			}
		}
		is_child.iter().enumerate().filter(|(_, c)| !**c).map(|(i, _)| i).collect()
	}
}
