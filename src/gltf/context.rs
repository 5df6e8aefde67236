use std::path::{Path, PathBuf};

use super::*;

/// Opaque handle to the engine entity created for a node by the
/// instantiation stage. The context never owns the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle(pub u64);

/// Everything parsed out of one glTF document.
///
/// Records are stored in glTF declaration order, so the index of a record in
/// its array is the index other records use to reference it. A context is
/// built by a single import and handed over whole once parsing is done.
#[derive(Debug, Default)]
pub struct GLTF2Context {
	pub(crate) buffers: Vec<Buffer>,
	pub(crate) buffer_views: Vec<BufferView>,
	pub(crate) accessors: Vec<Accessor>,
	pub(crate) images: Vec<Image>,
	pub(crate) samplers: Vec<TextureSampler>,
	pub(crate) textures: Vec<Texture>,
	pub(crate) materials: Vec<Material>,
	pub(crate) meshes: Vec<Mesh>,
	pub(crate) cameras: Vec<Camera>,
	pub(crate) lights: Vec<Light>,
	pub(crate) layers: Vec<Layer>,
	pub(crate) nodes: Vec<TreeNode>,
	pub(crate) skins: Vec<Skin>,
	pub(crate) animations: Vec<Animation>,
	pub(crate) scenes: Vec<Scene>,
	pub(crate) default_scene: Option<usize>,
	pub(crate) generator: Option<String>,
	pub(crate) used_extensions: Vec<String>,
	pub(crate) required_extensions: Vec<String>,
	pub(crate) local_files: Vec<PathBuf>,
}

/// A record kind stored in a [GLTF2Context].
pub trait GltfAsset: Clone + Sized {
	/// Name used in error messages.
	const KIND: &'static str;
	#[doc(hidden)]
	fn assets(ctx: &GLTF2Context) -> &[Self];
}

macro_rules! context_assets {
	($( $ty:ty => $field:ident, $single:ident );+ $(;)?) => {
		paste::paste! {
			impl GLTF2Context {
				$(
					pub fn [<$single _count>](&self) -> usize {
						self.$field.len()
					}

					pub fn $single(&self, i: usize) -> Option<&$ty> {
						self.$field.get(i)
					}

					pub fn $field(&self) -> &[$ty] {
						&self.$field
					}
				)+
			}

			$(
				impl GltfAsset for $ty {
					const KIND: &'static str = stringify!($single);
					fn assets(ctx: &GLTF2Context) -> &[Self] {
						&ctx.$field
					}
				}
			)+
		}
	};
}

context_assets! {
	Buffer => buffers, buffer;
	BufferView => buffer_views, buffer_view;
	Accessor => accessors, accessor;
	Image => images, image;
	TextureSampler => samplers, sampler;
	Texture => textures, texture;
	Material => materials, material;
	Mesh => meshes, mesh;
	Camera => cameras, camera;
	Light => lights, light;
	Layer => layers, layer;
	TreeNode => nodes, node;
	Skin => skins, skin;
	Animation => animations, animation;
	Scene => scenes, scene;
}

impl GLTF2Context {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of records of kind `T`.
	pub fn count<T: GltfAsset>(&self) -> usize {
		T::assets(self).len()
	}

	/// A copy of the `i`th record of kind `T`.
	pub fn asset_at<T: GltfAsset>(&self, i: usize) -> Option<T> {
		T::assets(self).get(i).cloned()
	}

	pub(crate) fn check_index<T: GltfAsset>(&self, i: usize) -> Result<usize, GltfError> {
		validate_index(T::KIND, i, self.count::<T>())
	}

	pub fn material_mut(&mut self, i: usize) -> Option<&mut Material> {
		self.materials.get_mut(i)
	}

	/// Records the entity created for node `i`.
	pub fn set_node_entity(&mut self, i: usize, entity: EntityHandle) -> Result<(), GltfError> {
		self.check_index::<TreeNode>(i)?;
		self.nodes[i].entity = Some(entity);
		Ok(())
	}

	pub fn default_scene(&self) -> Option<usize> {
		self.default_scene
	}

	pub fn generator(&self) -> Option<&str> {
		self.generator.as_deref()
	}

	/// `extensionsUsed` exactly as declared by the document.
	pub fn used_extensions(&self) -> &[String] {
		&self.used_extensions
	}

	/// `extensionsRequired` exactly as declared by the document.
	pub fn required_extensions(&self) -> &[String] {
		&self.required_extensions
	}

	/// Files on disk the document pulled data from or points at.
	pub fn local_files(&self) -> &[PathBuf] {
		&self.local_files
	}

	pub(crate) fn add_local_file(&mut self, path: &Path) {
		if !self.local_files.iter().any(|p| p == path) {
			self.local_files.push(path.to_path_buf());
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gltf::test_util::*;

	#[test]
	fn generic_accessors_match_typed_ones() {
		let ctx = context_with_buffer(16);
		assert_eq!(ctx.count::<Buffer>(), 1);
		assert_eq!(ctx.buffer_count(), 1);
		assert_eq!(ctx.count::<BufferView>(), ctx.buffer_view_count());
		assert_eq!(ctx.asset_at::<BufferView>(0).as_ref(), ctx.buffer_view(0));
		assert!(ctx.asset_at::<BufferView>(1).is_none());
		assert_eq!(ctx.count::<Mesh>(), 0);
	}

	#[test]
	fn check_index_reports_kind() {
		let ctx = context_with_buffer(4);
		match ctx.check_index::<Accessor>(0) {
			Err(GltfError::InvalidIndex { kind, index, count }) => {
				assert_eq!((kind, index, count), ("accessor", 0, 0));
			},
			other => panic!("unexpected {other:?}"),
		}
		assert_eq!(ctx.check_index::<Buffer>(0).unwrap(), 0);
	}

	#[test]
	fn local_files_are_deduplicated() {
		let mut ctx = GLTF2Context::new();
		ctx.add_local_file(Path::new("/a/b.bin"));
		ctx.add_local_file(Path::new("/a/b.bin"));
		assert_eq!(ctx.local_files().len(), 1);
	}
}
