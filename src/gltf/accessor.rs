use std::str::FromStr;

use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use super::json::*;
use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
	Byte,
	UnsignedByte,
	Short,
	UnsignedShort,
	UnsignedInt,
	Float,
}

impl ComponentType {
	pub fn from_gl(v: u32) -> Option<Self> {
		match v {
			COMPONENT_I8 => Some(Self::Byte),
			COMPONENT_U8 => Some(Self::UnsignedByte),
			COMPONENT_I16 => Some(Self::Short),
			COMPONENT_U16 => Some(Self::UnsignedShort),
			COMPONENT_U32 => Some(Self::UnsignedInt),
			COMPONENT_F32 => Some(Self::Float),
			_ => None,
		}
	}

	pub fn gl(self) -> u32 {
		match self {
			Self::Byte => COMPONENT_I8,
			Self::UnsignedByte => COMPONENT_U8,
			Self::Short => COMPONENT_I16,
			Self::UnsignedShort => COMPONENT_U16,
			Self::UnsignedInt => COMPONENT_U32,
			Self::Float => COMPONENT_F32,
		}
	}

	/// Size of one component in bytes.
	pub fn size(self) -> usize {
		match self {
			Self::Byte | Self::UnsignedByte => 1,
			Self::Short | Self::UnsignedShort => 2,
			Self::UnsignedInt | Self::Float => 4,
		}
	}

	pub fn is_unsigned_integer(self) -> bool {
		matches!(self, Self::UnsignedByte | Self::UnsignedShort | Self::UnsignedInt)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr, EnumIter)]
pub enum ElementType {
	#[strum(serialize = "SCALAR")]
	Scalar,
	#[strum(serialize = "VEC2")]
	Vec2,
	#[strum(serialize = "VEC3")]
	Vec3,
	#[strum(serialize = "VEC4")]
	Vec4,
	#[strum(serialize = "MAT2")]
	Mat2,
	#[strum(serialize = "MAT3")]
	Mat3,
	#[strum(serialize = "MAT4")]
	Mat4,
}

impl ElementType {
	/// Number of components in one element.
	pub fn components(self) -> usize {
		match self {
			Self::Scalar => 1,
			Self::Vec2 => 2,
			Self::Vec3 => 3,
			Self::Vec4 | Self::Mat2 => 4,
			Self::Mat3 => 9,
			Self::Mat4 => 16,
		}
	}
}

/// Component count of a glTF accessor `type`, 0 when the type is unknown.
pub fn data_size_from_json(ty: &str) -> usize {
	ElementType::from_str(ty).map(ElementType::components).unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SparseAccessor {
	pub count: usize,
	pub indices_buffer_view: usize,
	pub indices_offset: usize,
	pub indices_component_type: ComponentType,
	pub values_buffer_view: usize,
	pub values_offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accessor {
	pub name: Option<String>,
	/// None for accessors that are all zeros plus their sparse substitutions.
	pub buffer_view: Option<usize>,
	pub offset: usize,
	pub component_type: ComponentType,
	pub element_type: ElementType,
	pub data_size: usize,
	pub count: usize,
	pub normalized: bool,
	pub min: Vec<f32>,
	pub max: Vec<f32>,
	pub sparse: Option<SparseAccessor>,
}

impl Accessor {
	/// Size of one element in bytes, without stride padding.
	pub fn element_size(&self) -> usize {
		self.component_type.size() * self.data_size
	}
}

/// Parses the `accessors` array.
#[derive(Default)]
pub struct BufferAccessorParser {
	/// Reject unknown `componentType` codes instead of reading them as float.
	pub strict_component_types: bool,
}

impl BufferAccessorParser {
	pub fn new(strict_component_types: bool) -> Self {
		Self { strict_component_types }
	}

	fn component_type(&self, code: u32) -> Result<ComponentType, GltfError> {
		match ComponentType::from_gl(code) {
			Some(ty) => Ok(ty),
			None if self.strict_component_types => Err(GltfError::UnknownComponentType(code)),
			None => {
				log::warn!("unknown accessor component type {code}, reading it as float");
				Ok(ComponentType::Float)
			},
		}
	}

	fn check_range(ctx: &GLTF2Context, view: usize, offset: usize, stride: usize, count: usize, element_size: usize, index: usize) -> Result<(), GltfError> {
		let view = ctx.buffer_view(view).ok_or(GltfError::InvalidIndex {
			kind: "buffer view",
			index: view,
			count: ctx.buffer_view_count(),
		})?;
		let end = stride
			.checked_mul(count - 1)
			.and_then(|v| v.checked_add(offset))
			.and_then(|v| v.checked_add(element_size));
		match end {
			Some(end) if end <= view.byte_length => Ok(()),
			_ => Err(GltfError::OutOfBounds { kind: "accessor", index }),
		}
	}

	fn parse_sparse(ctx: &GLTF2Context, sparse: JSONSparse, accessor_count: usize, element_size: usize, index: usize) -> Result<SparseAccessor, GltfError> {
		if sparse.count == 0 || sparse.count > accessor_count {
			return Err(GltfError::InvalidValue { field: "sparse.count", value: sparse.count.to_string() });
		}
		let indices_component_type = ComponentType::from_gl(sparse.indices.component_type)
			.filter(|ty| ty.is_unsigned_integer())
			.ok_or(GltfError::InvalidValue {
				field: "sparse.indices.componentType",
				value: sparse.indices.component_type.to_string(),
			})?;
		let indices_offset = sparse.indices.byte_offset.unwrap_or(0);
		let values_offset = sparse.values.byte_offset.unwrap_or(0);
		let index_size = indices_component_type.size();
		Self::check_range(ctx, sparse.indices.buffer_view, indices_offset, index_size, sparse.count, index_size, index)?;
		Self::check_range(ctx, sparse.values.buffer_view, values_offset, element_size, sparse.count, element_size, index)?;
		Ok(SparseAccessor {
			count: sparse.count,
			indices_buffer_view: sparse.indices.buffer_view,
			indices_offset,
			indices_component_type,
			values_buffer_view: sparse.values.buffer_view,
			values_offset,
		})
	}

	pub fn parse(&self, json: &Value, ctx: &mut GLTF2Context) -> Result<(), GltfError> {
		let accessors_json = parse_array::<JSONAccessor>(json, "accessors")?;

		let accessors = accessors_json.into_iter().enumerate().map(|(index, accessor)| {
			let component_type = self.component_type(accessor.component_type)?;
			let data_size = data_size_from_json(&accessor.ty);
			if data_size == 0 {
				return Err(GltfError::UnknownAccessorType(accessor.ty));
			}
			let element_type = ElementType::from_str(&accessor.ty).map_err(|_| GltfError::UnknownAccessorType(accessor.ty.clone()))?;
			if accessor.count == 0 {
				return Err(GltfError::InvalidValue { field: "count", value: "0".into() });
			}

			let min = accessor.min.unwrap_or_default();
			let max = accessor.max.unwrap_or_default();
			for (field, bound) in [("min", &min), ("max", &max)] {
				if !bound.is_empty() && bound.len() != data_size {
					return Err(GltfError::InvalidValue { field, value: format!("{} components for {}", bound.len(), accessor.ty) });
				}
			}

			let offset = accessor.byte_offset.unwrap_or(0);
			let element_size = component_type.size() * data_size;
			if let Some(view_index) = accessor.buffer_view {
				let stride = ctx.buffer_view(view_index).and_then(|v| v.byte_stride).unwrap_or(element_size);
				if stride < element_size {
					return Err(GltfError::OutOfBounds { kind: "accessor", index });
				}
				Self::check_range(ctx, view_index, offset, stride, accessor.count, element_size, index)?;
			} else if offset != 0 {
				return Err(GltfError::InvalidValue { field: "byteOffset", value: offset.to_string() });
			} else {
				// zero filled on read, so the logical size has to be allocatable
				match accessor.count.checked_mul(element_size) {
					Some(len) if len <= isize::MAX as usize => {},
					_ => return Err(GltfError::OutOfBounds { kind: "accessor", index }),
				}
			}

			let sparse = accessor.sparse
				.map(|sparse| Self::parse_sparse(ctx, sparse, accessor.count, element_size, index))
				.transpose()?;

			Ok(Accessor {
				name: accessor.name,
				buffer_view: accessor.buffer_view,
				offset,
				component_type,
				element_type,
				data_size,
				count: accessor.count,
				normalized: accessor.normalized.unwrap_or(false),
				min,
				max,
				sparse,
			})
		}).collect::<Result<Vec<_>, GltfError>>()?;

		log::debug!("parsed {} accessors", accessors.len());
		ctx.accessors.extend(accessors);
		Ok(())
	}
}

impl GLTF2Context {
	/// Reads accessor `i` into tightly packed element bytes, with byte
	/// strides removed and sparse substitutions applied.
	pub fn accessor_data(&self, i: usize) -> Result<Vec<u8>, GltfError> {
		let accessor = self.accessor(i).ok_or(GltfError::InvalidIndex {
			kind: "accessor",
			index: i,
			count: self.accessor_count(),
		})?;
		let element_size = accessor.element_size();
		let len = element_size.checked_mul(accessor.count).ok_or(GltfError::OutOfBounds { kind: "accessor", index: i })?;
		let mut out = vec![0u8; len];

		if let Some(view_index) = accessor.buffer_view {
			let stride = self.buffer_view(view_index).and_then(|v| v.byte_stride).unwrap_or(element_size);
			let data = self.buffer_view_data(view_index)?;
			for (n, element) in out.chunks_exact_mut(element_size).enumerate() {
				let start = accessor.offset + n * stride;
				let src = data.get(start..start + element_size).ok_or(GltfError::OutOfBounds { kind: "accessor", index: i })?;
				element.copy_from_slice(src);
			}
		}

		if let Some(sparse) = &accessor.sparse {
			let indices = self.buffer_view_data(sparse.indices_buffer_view)?;
			let values = self.buffer_view_data(sparse.values_buffer_view)?;
			let index_size = sparse.indices_component_type.size();
			for n in 0..sparse.count {
				let at = sparse.indices_offset + n * index_size;
				let raw = indices.get(at..at + index_size).ok_or(GltfError::OutOfBounds { kind: "accessor", index: i })?;
				let target = match raw {
					[a] => *a as usize,
					[a, b] => u16::from_le_bytes([*a, *b]) as usize,
					[a, b, c, d] => u32::from_le_bytes([*a, *b, *c, *d]) as usize,
					_ => return Err(GltfError::OutOfBounds { kind: "accessor", index: i }),
				};
				if target >= accessor.count {
					return Err(GltfError::OutOfBounds { kind: "accessor", index: i });
				}
				let from = sparse.values_offset + n * element_size;
				let src = values.get(from..from + element_size).ok_or(GltfError::OutOfBounds { kind: "accessor", index: i })?;
				out[target * element_size..(target + 1) * element_size].copy_from_slice(src);
			}
		}
		Ok(out)
	}

	/// Reads accessor `i` as a list of `T`, e.g. `f32`, `[f32; 3]` or `Mat4`.
	pub fn accessor_values<T: bytemuck::Pod>(&self, i: usize) -> Result<Vec<T>, GltfError> {
		let bytes = self.accessor_data(i)?;
		let size = std::mem::size_of::<T>();
		if size == 0 || bytes.len() % size != 0 {
			return Err(GltfError::InvalidValue { field: "accessor element size", value: size.to_string() });
		}
		Ok(bytes.chunks_exact(size).map(bytemuck::pod_read_unaligned).collect())
	}
}
