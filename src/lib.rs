//! glTF 2.0 scene loading for the Kuesa runtime.
//!
//! The [gltf] module turns a glTF document and its buffers into a
//! [gltf::GLTF2Context], the flat, index-addressed description of a scene
//! that the instantiation stage walks to create engine entities.

pub mod gltf;
pub mod math;

pub use rustc_hash;
pub use serde_json;

mod util;
