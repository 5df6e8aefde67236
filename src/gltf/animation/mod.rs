//! Animations, including `EXT_property_animation` channels.

use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

use super::json::*;
use super::*;
use crate::util::str_n;

mod target;

pub use target::{AnimationTarget, TargetType, CORE_PATHS};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
pub enum Interpolation {
	#[default]
	#[strum(serialize = "LINEAR")]
	Linear,
	#[strum(serialize = "STEP")]
	Step,
	#[strum(serialize = "CUBICSPLINE")]
	CubicSpline,
}

impl Interpolation {
	/// Output elements stored per keyframe.
	pub fn values_per_key(self) -> usize {
		match self {
			Self::CubicSpline => 3,
			Self::Linear | Self::Step => 1,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSampler {
	/// Keyframe times, a scalar float accessor.
	pub input: usize,
	pub output: usize,
	pub interpolation: Interpolation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationChannel {
	pub sampler: usize,
	pub target: AnimationTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipChannel {
	/// Unique within the clip, e.g. `translation`, `translation_1`.
	pub name: String,
	/// Floats per keyframe value.
	pub component_count: usize,
	pub sampler: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipData {
	pub name: Option<String>,
	/// Seconds, the last keyframe time over all samplers.
	pub duration: f32,
	/// One entry per animation channel, same order.
	pub channels: Vec<ClipChannel>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
	pub name: Option<String>,
	pub samplers: Vec<AnimationSampler>,
	/// Core channels in declaration order, then property channels in
	/// declaration order.
	pub channels: Vec<AnimationChannel>,
	pub clip: ClipData,
}

fn invalid(index: usize, reason: String) -> GltfError {
	GltfError::InvalidAnimation { index, reason }
}

/// Parses the `animations` array. Runs after every section a channel can
/// target. One invalid animation fails the whole section.
pub struct AnimationParser;

impl AnimationParser {
	fn parse_sampler(ctx: &GLTF2Context, sampler: JSONAnimationSampler, index: usize) -> Result<AnimationSampler, GltfError> {
		let input = ctx.accessor(sampler.input).ok_or(GltfError::InvalidIndex {
			kind: "accessor",
			index: sampler.input,
			count: ctx.accessor_count(),
		})?;
		if input.element_type != ElementType::Scalar || input.component_type != ComponentType::Float {
			return Err(invalid(index, format!("input accessor {} is not a scalar float accessor", sampler.input)));
		}
		let output = ctx.accessor(sampler.output).ok_or(GltfError::InvalidIndex {
			kind: "accessor",
			index: sampler.output,
			count: ctx.accessor_count(),
		})?;
		let interpolation = match sampler.interpolation {
			Some(s) => Interpolation::from_str(&s).map_err(|_| GltfError::InvalidValue { field: "interpolation", value: s })?,
			None => Interpolation::Linear,
		};

		// exact ratio depends on the target, see component_count
		let keys = Self::key_values(input, interpolation, index)?;
		if output.count == 0 || output.count % keys != 0 {
			return Err(invalid(index, format!(
				"{} output values for {} keyframes with {} interpolation",
				output.count, input.count, interpolation,
			)));
		}
		Ok(AnimationSampler { input: sampler.input, output: sampler.output, interpolation })
	}

	/// Output values one sampler needs per animated component.
	fn key_values(input: &Accessor, interpolation: Interpolation, index: usize) -> Result<usize, GltfError> {
		input
			.count
			.checked_mul(interpolation.values_per_key())
			.ok_or_else(|| invalid(index, format!("{} keyframes overflow", input.count)))
	}

	fn core_target(ctx: &GLTF2Context, channel: &JSONChannelTarget, index: usize) -> Result<AnimationTarget, GltfError> {
		let node = channel.node.ok_or_else(|| invalid(index, format!("channel for \"{}\" has no node", channel.path)))?;
		ctx.check_index::<TreeNode>(node)?;
		if !CORE_PATHS.contains(&channel.path.as_str()) {
			return Err(GltfError::InvalidTarget(channel.path.clone()));
		}
		Ok(AnimationTarget::node(node, &channel.path))
	}

	/// Floats per keyframe value, checking the sampler's accessors agree.
	fn component_count(ctx: &GLTF2Context, sampler: &AnimationSampler, target: &AnimationTarget, index: usize) -> Result<usize, GltfError> {
		let (Some(input), Some(output)) = (ctx.accessor(sampler.input), ctx.accessor(sampler.output)) else {
			return Err(invalid(index, "sampler accessors are missing".into()));
		};
		let keys = Self::key_values(input, sampler.interpolation, index)?;

		if target.is_morph_weights() {
			if output.data_size != 1 || output.count == 0 || output.count % keys != 0 {
				return Err(invalid(index, format!("{} weights do not fit {} keyframes", output.count, input.count)));
			}
			Ok(output.count / keys)
		} else {
			if output.count != keys {
				return Err(invalid(index, format!(
					"{} output values for {} keyframes with {} interpolation",
					output.count, input.count, sampler.interpolation,
				)));
			}
			Ok(output.data_size)
		}
	}

	fn last_keyframe(ctx: &GLTF2Context, sampler: &AnimationSampler) -> Result<f32, GltfError> {
		match ctx.accessor(sampler.input).and_then(|a| a.max.first()) {
			Some(max) => Ok(*max),
			None => Ok(ctx.accessor_values::<f32>(sampler.input)?.into_iter().fold(0.0, f32::max)),
		}
	}

	fn parse_animation(ctx: &GLTF2Context, animation: JSONAnimation, index: usize) -> Result<Animation, GltfError> {
		let samplers = animation.samplers
			.into_iter()
			.map(|sampler| Self::parse_sampler(ctx, sampler, index))
			.collect::<Result<Vec<_>, GltfError>>()?;

		let mut channels = Vec::new();
		for channel in animation.channels.unwrap_or_default() {
			let target = Self::core_target(ctx, &channel.target, index)?;
			channels.push(AnimationChannel { sampler: channel.sampler, target });
		}
		let property_channels = animation.extensions
			.and_then(|e| e.property_animation)
			.map(|p| p.channels)
			.unwrap_or_default();
		for channel in property_channels {
			let target = AnimationTarget::resolve(&channel.target, ctx)?;
			channels.push(AnimationChannel { sampler: channel.sampler, target });
		}
		if channels.is_empty() {
			return Err(invalid(index, "no channels".into()));
		}

		let mut repeats: FxHashMap<&str, usize> = FxHashMap::default();
		let mut clip_channels = Vec::with_capacity(channels.len());
		for channel in &channels {
			let sampler = samplers.get(channel.sampler).ok_or_else(|| {
				invalid(index, format!("channel uses sampler {} of {}", channel.sampler, samplers.len()))
			})?;
			let base = channel.target.channel_base_name();
			let seen = repeats.entry(base).or_insert(0);
			let name = match *seen {
				0 => base.to_string(),
				n => str_n(&format!("{base}_"), n),
			};
			*seen += 1;
			clip_channels.push(ClipChannel {
				name,
				component_count: Self::component_count(ctx, sampler, &channel.target, index)?,
				sampler: channel.sampler,
			});
		}

		let mut duration = 0.0f32;
		for sampler in &samplers {
			duration = duration.max(Self::last_keyframe(ctx, sampler)?);
		}

		Ok(Animation {
			clip: ClipData { name: animation.name.clone(), duration, channels: clip_channels },
			name: animation.name,
			samplers,
			channels,
		})
	}

	pub fn parse(&self, json: &Value, ctx: &mut GLTF2Context) -> Result<(), GltfError> {
		let animations = parse_array::<JSONAnimation>(json, "animations")?
			.into_iter()
			.enumerate()
			.map(|(index, animation)| Self::parse_animation(ctx, animation, index))
			.collect::<Result<Vec<_>, GltfError>>()?;

		log::debug!("parsed {} animations", animations.len());
		ctx.animations.extend(animations);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::gltf::test_util::*;

	/// Accessors: 0 keyframe times [0, 2.5], 1 VEC3 x2, 2 VEC4 x2, 3 SCALAR x2,
	/// 4 SCALAR x6, 5 keyframe times without max.
	/// Objects: 4 nodes, 1 camera, 2 materials, 2 lights.
	fn animatable_ctx() -> GLTF2Context {
		let mut floats = vec![0.0, 2.5];
		floats.extend((0..8).map(|i| i as f32));
		floats.extend([0.0, 4.0]);
		let mut ctx = context_with_floats(&floats);
		BufferAccessorParser::default().parse(&json!([
			{ "bufferView": 0, "componentType": COMPONENT_F32, "type": "SCALAR", "count": 2, "max": [2.5], "min": [0] },
			{ "bufferView": 0, "componentType": COMPONENT_F32, "type": "VEC3", "count": 2, "byteOffset": 8 },
			{ "bufferView": 0, "componentType": COMPONENT_F32, "type": "VEC4", "count": 2, "byteOffset": 8 },
			{ "bufferView": 0, "componentType": COMPONENT_F32, "type": "SCALAR", "count": 2, "byteOffset": 8 },
			{ "bufferView": 0, "componentType": COMPONENT_F32, "type": "SCALAR", "count": 6, "byteOffset": 8 },
			{ "bufferView": 0, "componentType": COMPONENT_F32, "type": "SCALAR", "count": 2, "byteOffset": 40 },
		]), &mut ctx).unwrap();
		NodeParser.parse(&json!([{}, {}, {}, {}]), &mut ctx).unwrap();
		CameraParser.parse(&json!([{ "type": "perspective", "perspective": { "yfov": 1, "znear": 0.1 } }]), &mut ctx).unwrap();
		MaterialParser.parse(&json!([{}, {}]), &mut ctx).unwrap();
		LightParser.parse(&json!([{ "type": "point" }, { "type": "spot" }]), &mut ctx).unwrap();
		ctx
	}

	#[test]
	fn property_channels_keep_input_order() {
		let table = [
			("/nodes/0/translation", TargetType::Node, 0, "translation", 1),
			("/nodes/1/rotation", TargetType::Node, 1, "rotation", 2),
			("/nodes/2/scale", TargetType::Node, 2, "scale", 1),
			("/cameras/0/perspective/yfov", TargetType::Camera, 0, "perspective/yfov", 3),
			("/cameras/0/perspective/znear", TargetType::Camera, 0, "perspective/znear", 3),
			("/materials/0/pbrMetallicRoughness/baseColorFactor", TargetType::Material, 0, "pbrMetallicRoughness/baseColorFactor", 2),
			(
				"/materials/1/extensions/KHR_materials_pbrSpecularGlossiness/diffuseFactor",
				TargetType::Material,
				1,
				"extensions/KHR_materials_pbrSpecularGlossiness/diffuseFactor",
				2,
			),
			("/materials/1/emissiveFactor", TargetType::Material, 1, "emissiveFactor", 1),
			("/extensions/KHR_lights_punctual/lights/0/color", TargetType::Light, 0, "color", 1),
			("/extensions/KHR_lights_punctual/lights/1/intensity", TargetType::Light, 1, "intensity", 3),
			("/nodes/3/translation", TargetType::Node, 3, "translation", 1),
			("/nodes/3/scale", TargetType::Node, 3, "scale", 1),
			("/extensions/KHR_lights_punctual/lights/1/spot/outerConeAngle", TargetType::Light, 1, "spot/outerConeAngle", 3),
		];
		let n = table.len() * 2;

		let mut samplers = vec![Value::Null; n];
		let mut channels = Vec::new();
		for i in 0..n {
			let (pointer, _, _, _, output) = table[i % table.len()];
			let sampler = n - 1 - i;
			samplers[sampler] = json!({ "input": 0, "output": output });
			channels.push(json!({ "sampler": sampler, "target": pointer }));
		}

		let mut ctx = animatable_ctx();
		AnimationParser.parse(&json!([{
			"name": "everything",
			"samplers": samplers,
			"extensions": { "EXT_property_animation": { "channels": channels } },
		}]), &mut ctx).unwrap();

		let animation = ctx.animation(0).unwrap();
		assert_eq!(animation.channels.len(), 26);
		for (i, channel) in animation.channels.iter().enumerate() {
			let (_, ty, index, path, _) = table[i % table.len()];
			assert_eq!(channel.sampler, 25 - i);
			assert_eq!((channel.target.ty, channel.target.index, channel.target.path.as_str()), (ty, index, path));
		}

		let clip = &animation.clip;
		assert_eq!(clip.name.as_deref(), Some("everything"));
		assert_eq!(clip.duration, 2.5);
		let names = clip.channels.iter().map(|c| c.name.as_str()).collect::<Vec<_>>();
		assert_eq!(&names[..4], ["translation", "rotation", "scale3D", "yfov"]);
		assert_eq!(&names[10..16], ["translation_1", "scale3D_1", "outerConeAngle", "translation_2", "rotation_1", "scale3D_2"]);
		let counts = clip.channels.iter().take(4).map(|c| c.component_count).collect::<Vec<_>>();
		assert_eq!(counts, [3, 4, 3, 1]);
		assert_eq!(clip.channels[0].sampler, 25);
	}

	#[test]
	fn core_channels_come_first() {
		let mut ctx = animatable_ctx();
		AnimationParser.parse(&json!([{
			"samplers": [{ "input": 0, "output": 1 }, { "input": 0, "output": 2, "interpolation": "STEP" }],
			"channels": [
				{ "sampler": 0, "target": { "node": 1, "path": "translation" } },
				{ "sampler": 1, "target": { "node": 1, "path": "rotation" } },
			],
			"extensions": { "EXT_property_animation": { "channels": [
				{ "sampler": 0, "target": "/materials/0/emissiveFactor" },
			] } },
		}]), &mut ctx).unwrap();

		let animation = ctx.animation(0).unwrap();
		assert_eq!(animation.samplers[0].interpolation, Interpolation::Linear);
		assert_eq!(animation.samplers[1].interpolation, Interpolation::Step);
		let pointers = animation.channels.iter().map(|c| c.target.pointer()).collect::<Vec<_>>();
		assert_eq!(pointers, ["/nodes/1/translation", "/nodes/1/rotation", "/materials/0/emissiveFactor"]);
		assert!(animation.channels[0].target.is_core());
		assert!(!animation.channels[2].target.is_core());
	}

	#[test]
	fn cubic_spline_and_morph_weights() {
		let mut ctx = animatable_ctx();
		AnimationParser.parse(&json!([{
			"samplers": [
				{ "input": 5, "output": 4, "interpolation": "CUBICSPLINE" },
				{ "input": 0, "output": 4 },
			],
			"channels": [
				{ "sampler": 0, "target": { "node": 0, "path": "weights" } },
				{ "sampler": 1, "target": { "node": 0, "path": "weights" } },
			],
		}]), &mut ctx).unwrap();

		let clip = &ctx.animation(0).unwrap().clip;
		assert_eq!(clip.channels[0].name, "morphWeights");
		assert_eq!(clip.channels[0].component_count, 1);
		assert_eq!(clip.channels[1].name, "morphWeights_1");
		assert_eq!(clip.channels[1].component_count, 3);
		// sampler 0 reads its last keyframe from data: [0, 4]
		assert_eq!(clip.duration, 4.0);
	}

	#[test]
	fn one_bad_animation_fails_the_section() {
		let good = json!({
			"samplers": [{ "input": 0, "output": 1 }],
			"channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }],
		});
		let cases = [
			// missing sampler
			json!({ "samplers": [{ "input": 0, "output": 1 }], "channels": [{ "sampler": 1, "target": { "node": 0, "path": "translation" } }] }),
			// output count doesn't match keyframes
			json!({ "samplers": [{ "input": 0, "output": 4 }], "channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }] }),
			// cubic spline needs three values per key
			json!({ "samplers": [{ "input": 0, "output": 1, "interpolation": "CUBICSPLINE" }], "channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }] }),
			// unknown node
			json!({ "samplers": [{ "input": 0, "output": 1 }], "channels": [{ "sampler": 0, "target": { "node": 9, "path": "translation" } }] }),
			// unknown core path
			json!({ "samplers": [{ "input": 0, "output": 1 }], "channels": [{ "sampler": 0, "target": { "node": 0, "path": "color" } }] }),
			// input must be scalar
			json!({ "samplers": [{ "input": 1, "output": 1 }], "channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }] }),
			// bad interpolation name
			json!({ "samplers": [{ "input": 0, "output": 1, "interpolation": "SMOOTH" }], "channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }] }),
			// property target out of range
			json!({ "samplers": [{ "input": 0, "output": 1 }], "extensions": { "EXT_property_animation": { "channels": [{ "sampler": 0, "target": "/materials/5/emissiveFactor" }] } } }),
			// no channels at all
			json!({ "samplers": [{ "input": 0, "output": 1 }], "channels": [] }),
			// unused sampler with too few cubic spline values
			json!({
				"samplers": [{ "input": 0, "output": 1 }, { "input": 0, "output": 3, "interpolation": "CUBICSPLINE" }],
				"channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }],
			}),
		];

		let mut ctx = animatable_ctx();
		for case in cases {
			let result = AnimationParser.parse(&json!([good.clone(), case.clone()]), &mut ctx);
			assert!(result.is_err(), "{case}");
			assert_eq!(ctx.animation_count(), 0);
		}
		AnimationParser.parse(&json!([good]), &mut ctx).unwrap();
		assert_eq!(ctx.animation_count(), 1);
	}

	#[test]
	fn huge_keyframe_counts_are_rejected() {
		let mut ctx = animatable_ctx();
		let mut times = ctx.accessor(0).unwrap().clone();
		times.buffer_view = None;
		times.count = 1usize << 63;
		ctx.accessors.push(times);
		let huge = ctx.accessor_count() - 1;

		let result = AnimationParser.parse(&json!([{
			"samplers": [{ "input": huge, "output": huge, "interpolation": "CUBICSPLINE" }],
			"channels": [{ "sampler": 0, "target": { "node": 0, "path": "weights" } }],
		}]), &mut ctx);
		assert!(matches!(result, Err(GltfError::InvalidAnimation { index: 0, .. })));
		assert_eq!(ctx.animation_count(), 0);
	}
}
