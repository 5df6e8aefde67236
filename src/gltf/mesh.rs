use std::collections::BTreeMap;

use serde_json::Value;

use super::json::*;
use super::*;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveMode {
	Points,
	Lines,
	LineLoop,
	LineStrip,
	#[default]
	Triangles,
	TriangleStrip,
	TriangleFan,
}

impl PrimitiveMode {
	pub fn from_gl(v: u32) -> Option<Self> {
		match v {
			0 => Some(Self::Points),
			1 => Some(Self::Lines),
			2 => Some(Self::LineLoop),
			3 => Some(Self::LineStrip),
			4 => Some(Self::Triangles),
			5 => Some(Self::TriangleStrip),
			6 => Some(Self::TriangleFan),
			_ => None,
		}
	}

	pub fn gl(self) -> u32 {
		self as u32
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
	/// Attribute semantic (`POSITION`, `TEXCOORD_0`, ...) to accessor index.
	pub attributes: BTreeMap<String, usize>,
	pub indices: Option<usize>,
	pub material: Option<usize>,
	pub mode: PrimitiveMode,
	/// Morph targets, each an attribute map like [Primitive::attributes].
	pub targets: Vec<BTreeMap<String, usize>>,
	/// Element count shared by every attribute accessor.
	pub vertex_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
	pub name: Option<String>,
	pub primitives: Vec<Primitive>,
	/// Default morph target weights.
	pub weights: Vec<f32>,
	pub extras: Vec<(String, Value)>,
}

impl Mesh {
	/// Every primitive declares the same number of targets.
	pub fn morph_target_count(&self) -> usize {
		self.primitives.first().map(|p| p.targets.len()).unwrap_or(0)
	}
}

/// Parses the `meshes` array against the parsed accessors and materials.
pub struct MeshParser;

impl MeshParser {
	fn vertex_count(ctx: &GLTF2Context, attributes: &BTreeMap<String, usize>, mesh: usize, primitive: usize) -> Result<usize, GltfError> {
		let mut count = None;
		for &accessor in attributes.values() {
			let accessor = ctx.accessor(accessor).ok_or(GltfError::InvalidIndex {
				kind: "accessor",
				index: accessor,
				count: ctx.accessor_count(),
			})?;
			match count {
				None => count = Some(accessor.count),
				Some(n) if n != accessor.count => return Err(GltfError::VertexCountMismatch { mesh, primitive }),
				Some(_) => {},
			}
		}
		count.ok_or(GltfError::InvalidValue { field: "attributes", value: "{}".into() })
	}

	fn parse_primitive(ctx: &GLTF2Context, json: JSONPrimitive, mesh: usize, primitive: usize) -> Result<Primitive, GltfError> {
		let vertex_count = Self::vertex_count(ctx, &json.attributes, mesh, primitive)?;

		let targets = json.targets.unwrap_or_default();
		for target in &targets {
			if !target.is_empty() && Self::vertex_count(ctx, target, mesh, primitive)? != vertex_count {
				return Err(GltfError::VertexCountMismatch { mesh, primitive });
			}
		}

		if let Some(indices) = json.indices {
			let accessor = ctx.accessor(indices).ok_or(GltfError::InvalidIndex {
				kind: "accessor",
				index: indices,
				count: ctx.accessor_count(),
			})?;
			if accessor.element_type != ElementType::Scalar || !accessor.component_type.is_unsigned_integer() {
				return Err(GltfError::InvalidValue {
					field: "indices",
					value: format!("{} {:?}", accessor.element_type, accessor.component_type),
				});
			}
		}

		let mode = match json.mode {
			Some(mode) => PrimitiveMode::from_gl(mode).ok_or(GltfError::InvalidValue { field: "mode", value: mode.to_string() })?,
			None => PrimitiveMode::Triangles,
		};

		Ok(Primitive {
			attributes: json.attributes,
			indices: json.indices,
			material: json.material.map(|i| ctx.check_index::<Material>(i)).transpose()?,
			mode,
			targets,
			vertex_count,
		})
	}

	pub fn parse(&self, json: &Value, ctx: &mut GLTF2Context) -> Result<(), GltfError> {
		let meshes_json = parse_array::<JSONMesh>(json, "meshes")?;

		let meshes = meshes_json.into_iter().enumerate().map(|(index, mesh)| {
			if mesh.primitives.is_empty() {
				return Err(GltfError::InvalidValue { field: "primitives", value: "[]".into() });
			}
			let primitives = mesh.primitives
				.into_iter()
				.enumerate()
				.map(|(p, primitive)| Self::parse_primitive(ctx, primitive, index, p))
				.collect::<Result<Vec<_>, GltfError>>()?;

			let target_counts = primitives.iter().map(|p| p.targets.len()).collect::<Vec<_>>();
			if target_counts.windows(2).any(|w| w[0] != w[1]) {
				return Err(GltfError::InvalidValue { field: "targets", value: format!("{target_counts:?} targets per primitive") });
			}
			let weights = mesh.weights.unwrap_or_default();
			if !weights.is_empty() && target_counts[0] != weights.len() {
				return Err(GltfError::InvalidValue {
					field: "weights",
					value: format!("{} weights for {} targets", weights.len(), target_counts[0]),
				});
			}

			Ok(Mesh { name: mesh.name, primitives, weights, extras: extras_pairs(&mesh.extras) })
		}).collect::<Result<Vec<_>, GltfError>>()?;

		log::debug!("parsed {} meshes", meshes.len());
		ctx.meshes.extend(meshes);
		Ok(())
	}
}
