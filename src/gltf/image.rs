use std::path::{Path, PathBuf};

use serde_json::Value;

use super::json::*;
use super::uri::{resolve_uri, ResolvedUri};
use super::*;

#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
	File(PathBuf),
	/// `qrc:/...` path into compiled-in resources.
	Resource(String),
	/// Encoded image bytes from a `data:` uri or a buffer view.
	Embedded(Vec<u8>),
}

impl ImageSource {
	/// Url scheme the source would be addressed with.
	pub fn scheme(&self) -> &'static str {
		match self {
			Self::File(_) => "file",
			Self::Resource(_) => "qrc",
			Self::Embedded(_) => "data",
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
	pub name: Option<String>,
	pub mime_type: Option<String>,
	pub source: ImageSource,
}

/// Parses the `images` array. Image files are only located, never read.
pub struct ImageParser<'a> {
	base_path: &'a Path,
}

impl<'a> ImageParser<'a> {
	pub fn new(base_path: &'a Path) -> Self {
		Self { base_path }
	}

	pub fn parse(&self, json: &Value, ctx: &mut GLTF2Context) -> Result<(), GltfError> {
		let images_json = parse_array::<JSONImage>(json, "images")?;

		let images = images_json.into_iter().enumerate().map(|(index, image)| {
			let (source, mime_type) = match (&image.uri, image.buffer_view) {
				(Some(uri), None) => match resolve_uri(uri, self.base_path)? {
					ResolvedUri::File(path) => (ImageSource::File(path), image.mime_type),
					ResolvedUri::Resource(path) => (ImageSource::Resource(path), image.mime_type),
					ResolvedUri::Data { mime_type, data } => (ImageSource::Embedded(data), image.mime_type.or(mime_type)),
				},
				(None, Some(view)) => {
					let data = ctx.buffer_view_data(view)?.to_vec();
					(ImageSource::Embedded(data), image.mime_type)
				},
				_ => return Err(GltfError::ImageSource(index)),
			};
			Ok(Image { name: image.name, mime_type, source })
		}).collect::<Result<Vec<_>, GltfError>>()?;

		log::debug!("parsed {} images", images.len());
		for image in &images {
			if let ImageSource::File(path) = &image.source {
				ctx.add_local_file(path);
			}
		}
		ctx.images.extend(images);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::gltf::test_util::*;

	#[test]
	fn each_uri_resolves_on_its_own() {
		let mut ctx = context_with_buffer(8);
		ImageParser::new(Path::new("/scenes/car")).parse(&json!([
			{ "uri": "diffuse.png" },
			{ "uri": "/opt/textures/normal.png" },
			{ "uri": "qrc:/textures/env.png" },
			{ "uri": "textures/../roughness.png" },
			{ "uri": "file:///tmp/ao.png" },
			{ "uri": data_uri(&[1, 2, 3]) },
			{ "bufferView": 0, "mimeType": "image/png" },
		]), &mut ctx).unwrap();

		let images = ctx.images();
		assert_eq!(images.len(), 7);
		assert_eq!(images[0].source, ImageSource::File(PathBuf::from("/scenes/car/diffuse.png")));
		assert_eq!(images[1].source, ImageSource::File(PathBuf::from("/opt/textures/normal.png")));
		assert_eq!(images[2].source, ImageSource::Resource("qrc:/textures/env.png".into()));
		assert_eq!(images[3].source, ImageSource::File(PathBuf::from("/scenes/car/textures/../roughness.png")));
		assert_eq!(images[4].source, ImageSource::File(PathBuf::from("/tmp/ao.png")));
		assert_eq!(images[5].source, ImageSource::Embedded(vec![1, 2, 3]));
		assert_eq!(images[5].mime_type.as_deref(), Some("application/octet-stream"));
		assert_eq!(images[6].source, ImageSource::Embedded((0..8).collect()));
		assert_eq!(images[6].mime_type.as_deref(), Some("image/png"));

		let schemes = images.iter().map(|i| i.source.scheme()).collect::<Vec<_>>();
		assert_eq!(schemes, ["file", "file", "qrc", "file", "file", "data", "data"]);
		assert_eq!(ctx.local_files().len(), 4);
	}

	#[test]
	fn uri_and_buffer_view_are_exclusive() {
		let mut ctx = context_with_buffer(8);
		let both = ImageParser::new(Path::new("/")).parse(&json!([{ "uri": "a.png", "bufferView": 0 }]), &mut ctx);
		assert!(matches!(both, Err(GltfError::ImageSource(0))));
		let neither = ImageParser::new(Path::new("/")).parse(&json!([{ "uri": "a.png" }, { "name": "empty" }]), &mut ctx);
		assert!(matches!(neither, Err(GltfError::ImageSource(1))));
		assert_eq!(ctx.image_count(), 0);
	}

	#[test]
	fn buffer_view_must_exist() {
		let mut ctx = context_with_buffer(8);
		let result = ImageParser::new(Path::new("/")).parse(&json!([{ "bufferView": 4 }]), &mut ctx);
		assert!(matches!(result, Err(GltfError::InvalidIndex { kind: "buffer view", index: 4, .. })));
	}
}
