//! `load_model`: OBJ/MTL text to a finished [`Mesh`].

use std::path::Path;

use crate::error::{LoadError, Result};
use crate::mesh::{Material, Mesh};
use crate::obj::parse_obj;
use crate::optimize::optimize_parts;
use crate::shading::select_shader;
use crate::source::{AssetSource, DirSource};
use crate::tangent::derive_tangents;
use crate::texture::{FsImageLoader, ImageLoader};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadOptions {
    /// Abort when a `mtllib` file can't be read or parsed.
    pub require_materials: bool,
    /// Initial state of the viewer's bump-mapping toggle. Parts always cache
    /// their full tier; the renderer drops bump at draw time when this is off.
    pub bump_mapping: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            require_materials: true,
            bump_mapping: true,
        }
    }
}

/// Runs the whole pipeline against pluggable text and image sources.
pub struct ModelLoader<S, I> {
    source: S,
    images: I,
    options: LoadOptions,
}

impl<S: AssetSource, I: ImageLoader> ModelLoader<S, I> {
    pub fn new(source: S, images: I, options: LoadOptions) -> Self {
        Self {
            source,
            images,
            options,
        }
    }

    /// Parse, merge parts, load textures, pick shaders, derive tangents.
    pub fn load(&self, file: &str) -> Result<Mesh> {
        let reader = self.source.open(file).map_err(|e| LoadError::io(file, e))?;
        let mut obj = parse_obj(reader, file, &self.source, self.options.require_materials)?;
        log::info!(
            "Loaded {} materials, {} mesh parts, {} vertices and {} indices from {}",
            obj.materials.len(),
            obj.parts.len(),
            obj.vertices.len(),
            obj.indices.len(),
            file
        );

        optimize_parts(&mut obj.parts, &mut obj.indices);

        let mut materials: Vec<Material> = obj.materials.iter().map(Material::from).collect();
        if materials.is_empty() && !obj.indices.is_empty() {
            log::warn!("{} has no materials; using a default material", file);
            materials.push(Material::default());
        }

        let mut textures = obj.textures;
        let (loaded, failed) = textures.load_all(&self.images);
        log::info!("Textures: {} loaded, {} failed", loaded, failed);

        let mut parts = obj.parts;
        for part in &mut parts {
            if let Some(material) = materials.get(part.material as usize) {
                part.shader = select_shader(material, |h| textures.is_valid(h));
            }
            log::debug!(
                "Part @{}+{} material {} -> {:?}",
                part.offset,
                part.len,
                part.material,
                part.shader
            );
        }

        let mut vertices = obj.vertices;
        derive_tangents(&mut vertices, &obj.indices);

        Ok(Mesh {
            vertices,
            indices: obj.indices,
            materials,
            parts,
            textures,
        })
    }
}

/// Load `directory/filename` from disk; textures resolve relative to `directory`.
pub fn load_model(directory: impl AsRef<Path>, filename: &str, options: &LoadOptions) -> Result<Mesh> {
    let dir = directory.as_ref();
    ModelLoader::new(DirSource::new(dir), FsImageLoader::new(dir), *options).load(filename)
}
