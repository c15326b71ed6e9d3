//! Asset loading: Wavefront OBJ/MTL to a GPU-ready mesh.
//!
//! Pipeline: [`obj`] (+ [`mtl`]) → [`optimize`] → texture loading →
//! [`shading`] selection per part → [`tangent`] basis. Entry point is
//! [`load_model`].

pub mod error;
pub mod loader;
pub mod mesh;
pub mod mtl;
pub mod obj;
pub mod optimize;
pub mod shading;
pub mod source;
pub mod tangent;
pub mod texture;
pub mod tokenize;

pub use error::{LoadError, Result};
pub use loader::{LoadOptions, ModelLoader, load_model};
pub use mesh::{Material, MaterialFlags, Mesh, MeshPart, Vertex};
pub use shading::{ShaderCaps, ShaderKind, select_shader};
pub use source::{AssetSource, DirSource, MemorySource};
pub use texture::{
    FsImageLoader, ImageLoader, TextureData, TextureHandle, TextureSlot, TextureStatus,
    TextureTable,
};
