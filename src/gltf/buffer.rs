use std::path::Path;

use serde_json::Value;

use super::json::*;
use super::uri::{resolve_uri, ResolvedUri};
use super::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Buffer {
	pub name: Option<String>,
	pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BufferView {
	pub name: Option<String>,
	pub buffer: usize,
	pub byte_offset: usize,
	pub byte_length: usize,
	pub byte_stride: Option<usize>,
	pub target: Option<u32>,
}

/// Loads the `buffers` array. Buffers with a uri are read from disk or
/// decoded from `data:` uris, the first one without a uri takes the GLB
/// binary chunk.
pub struct BufferParser<'a> {
	base_path: &'a Path,
	glb_chunk: Option<&'a [u8]>,
}

impl<'a> BufferParser<'a> {
	pub fn new(base_path: &'a Path, glb_chunk: Option<&'a [u8]>) -> Self {
		Self { base_path, glb_chunk }
	}

	pub fn parse(&self, json: &Value, ctx: &mut GLTF2Context) -> Result<(), GltfError> {
		let buffers_json = parse_array::<JSONBuffer>(json, "buffers")?;
		let mut internal_buffer = self.glb_chunk;
		let mut local_files = vec![];

		let buffers = buffers_json.into_iter().enumerate().map(|(index, buffer)| {
			let mut data = if let Some(uri) = &buffer.uri {
				match resolve_uri(uri, self.base_path)? {
					ResolvedUri::Data { data, .. } => data,
					ResolvedUri::File(path) => {
						let data = std::fs::read(&path)?;
						local_files.push(path);
						data
					},
					ResolvedUri::Resource(_) => return Err(GltfError::InvalidURI(uri.clone())),
				}
			} else if let Some(chunk) = internal_buffer.take() {
				chunk.to_vec()
			} else {
				return Err(GltfError::MissingBinaryChunk(index));
			};

			// the glb chunk may carry up to 3 bytes of padding
			if data.len() < buffer.byte_length {
				return Err(GltfError::BufferTooShort {
					index,
					declared: buffer.byte_length,
					actual: data.len(),
				});
			}
			data.truncate(buffer.byte_length);
			Ok(Buffer { name: buffer.name, data })
		}).collect::<Result<Vec<_>, GltfError>>()?;

		log::debug!("parsed {} buffers", buffers.len());
		for path in &local_files {
			ctx.add_local_file(path);
		}
		ctx.buffers.extend(buffers);
		Ok(())
	}
}

/// Parses the `bufferViews` array against the buffers already in the context.
pub struct BufferViewsParser;

impl BufferViewsParser {
	pub fn parse(&self, json: &Value, ctx: &mut GLTF2Context) -> Result<(), GltfError> {
		let views_json = parse_array::<JSONBufferView>(json, "bufferViews")?;

		let views = views_json.into_iter().enumerate().map(|(index, view)| {
			let buffer = ctx.buffer(view.buffer).ok_or(GltfError::InvalidIndex {
				kind: "buffer",
				index: view.buffer,
				count: ctx.buffer_count(),
			})?;
			let byte_offset = view.byte_offset.unwrap_or(0);
			let end = byte_offset.checked_add(view.byte_length).ok_or(GltfError::OutOfBounds { kind: "buffer view", index })?;
			if view.byte_length == 0 || end > buffer.data.len() {
				return Err(GltfError::OutOfBounds { kind: "buffer view", index });
			}
			if let Some(stride) = view.byte_stride {
				if !(4..=252).contains(&stride) || stride % 4 != 0 {
					return Err(GltfError::InvalidValue { field: "byteStride", value: stride.to_string() });
				}
			}
			Ok(BufferView {
				name: view.name,
				buffer: view.buffer,
				byte_offset,
				byte_length: view.byte_length,
				byte_stride: view.byte_stride,
				target: view.target,
			})
		}).collect::<Result<Vec<_>, GltfError>>()?;

		log::debug!("parsed {} buffer views", views.len());
		ctx.buffer_views.extend(views);
		Ok(())
	}
}

impl GLTF2Context {
	/// The bytes a buffer view covers.
	pub fn buffer_view_data(&self, i: usize) -> Result<&[u8], GltfError> {
		let view = self.buffer_view(i).ok_or(GltfError::InvalidIndex {
			kind: "buffer view",
			index: i,
			count: self.buffer_view_count(),
		})?;
		let buffer = self.buffer(view.buffer).ok_or(GltfError::OutOfBounds { kind: "buffer view", index: i })?;
		buffer.data
			.get(view.byte_offset..view.byte_offset + view.byte_length)
			.ok_or(GltfError::OutOfBounds { kind: "buffer view", index: i })
	}
}
