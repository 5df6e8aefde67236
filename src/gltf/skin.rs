use serde_json::Value;

use super::json::*;
use super::*;
use crate::math::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Skin {
	pub name: Option<String>,
	/// Joint nodes, in the order the vertex `JOINTS_n` attributes index them.
	pub joints: Vec<usize>,
	/// MAT4 accessor with one matrix per joint.
	pub inverse_bind_matrices: Option<usize>,
	pub skeleton: Option<usize>,
}

/// Parses the `skins` array. Needs nodes and accessors.
pub struct SkinParser;

impl SkinParser {
	fn parse_skin(ctx: &GLTF2Context, skin: JSONSkin) -> Result<Skin, GltfError> {
		if skin.joints.is_empty() {
			return Err(GltfError::InvalidValue { field: "joints", value: "[]".into() });
		}
		for &joint in &skin.joints {
			ctx.check_index::<TreeNode>(joint)?;
		}
		if let Some(i) = skin.inverse_bind_matrices {
			let accessor = ctx.accessor(i).ok_or(GltfError::InvalidIndex {
				kind: "accessor",
				index: i,
				count: ctx.accessor_count(),
			})?;
			if accessor.element_type != ElementType::Mat4 || accessor.component_type != ComponentType::Float {
				return Err(GltfError::InvalidValue {
					field: "inverseBindMatrices",
					value: format!("{} {:?}", accessor.element_type, accessor.component_type),
				});
			}
			if accessor.count != skin.joints.len() {
				return Err(GltfError::InvalidValue {
					field: "inverseBindMatrices",
					value: format!("{} matrices for {} joints", accessor.count, skin.joints.len()),
				});
			}
		}
		let skeleton = skin.skeleton.map(|s| ctx.check_index::<TreeNode>(s)).transpose()?;

		Ok(Skin {
			name: skin.name,
			joints: skin.joints,
			inverse_bind_matrices: skin.inverse_bind_matrices,
			skeleton,
		})
	}

	pub fn parse(&self, json: &Value, ctx: &mut GLTF2Context) -> Result<(), GltfError> {
		let skins = parse_array::<JSONSkin>(json, "skins")?
			.into_iter()
			.map(|skin| Self::parse_skin(ctx, skin))
			.collect::<Result<Vec<_>, GltfError>>()?;

		log::debug!("parsed {} skins", skins.len());
		ctx.skins.extend(skins);
		Ok(())
	}
}

impl GLTF2Context {
	/// One inverse bind matrix per joint of skin `i`, identity when the skin
	/// has no accessor for them.
	pub fn inverse_bind_matrices(&self, i: usize) -> Result<Vec<Mat4>, GltfError> {
		let skin = self.skin(i).ok_or(GltfError::InvalidIndex { kind: "skin", index: i, count: self.skin_count() })?;
		match skin.inverse_bind_matrices {
			Some(accessor) => self.accessor_values::<Mat4>(accessor),
			None => Ok(vec![Mat4::IDENTITY; skin.joints.len()]),
		}
	}
}
