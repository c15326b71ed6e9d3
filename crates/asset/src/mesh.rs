//! GPU-ready mesh representation produced by the loader.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

use crate::mtl::{MtlFields, MtlMaterial};
use crate::shading::ShaderKind;
use crate::texture::{TextureHandle, TextureTable};

/// Vertex with position/normal/uv and tangent basis. Values are in object space.
/// Field order and sizes are the vertex buffer layout.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
            ..Default::default()
        }
    }
}

bitflags! {
    /// Capabilities of a resolved material.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MaterialFlags: u16 {
        /// Opacity declared, either as a value or as a texture. Informational:
        /// the renderer draws opaque and only alpha-tests `map_d`.
        const TRANSPARENCY = 1 << 0;
        const AMBIENT_TEX = 1 << 1;
        const DIFFUSE_TEX = 1 << 2;
        const SPECULAR_TEX = 1 << 3;
        const EMISSIVE_TEX = 1 << 4;
        const SHININESS_TEX = 1 << 5;
        const TRANSPARENCY_TEX = 1 << 6;
        const NORMAL_TANGENT_TEX = 1 << 7;
    }
}

// Lighting, per light:
//   rgb = Tf * (Ke * map_Ke + Ka * map_Ka + Kd * map_Kd * diffuse + Ks * map_Ks * specular)
//   a   = d * map_d
/// Material with fallbacks applied to every undeclared field.
///
/// `d` below 1 without a `map_d` does not make a part translucent; pipelines
/// write color with `REPLACE` and only the opacity map is honored, as an
/// alpha test.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub ns: f32,
    pub d: f32,
    pub tf: [f32; 3],
    pub ka: [f32; 3],
    pub kd: [f32; 3],
    pub ks: [f32; 3],
    pub ke: [f32; 3],
    pub map_ka: Option<TextureHandle>,
    pub map_kd: Option<TextureHandle>,
    pub map_ks: Option<TextureHandle>,
    pub map_ke: Option<TextureHandle>,
    pub map_ns: Option<TextureHandle>,
    pub map_d: Option<TextureHandle>,
    pub map_bump: Option<TextureHandle>,
    pub flags: MaterialFlags,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::from("default"),
            ns: 1.0,
            d: 1.0,
            tf: [1.0; 3],
            ka: [1.0; 3],
            kd: [1.0; 3],
            ks: [0.0; 3],
            ke: [0.0; 3],
            map_ka: None,
            map_kd: None,
            map_ks: None,
            map_ke: None,
            map_ns: None,
            map_d: None,
            map_bump: None,
            flags: MaterialFlags::empty(),
        }
    }
}

impl From<&MtlMaterial> for Material {
    fn from(src: &MtlMaterial) -> Self {
        let fallback = Material::default();
        let pick = |field: MtlFields| src.declared.contains(field);
        let mut flags = MaterialFlags::empty();
        // A declared channel keeps its flag even without a file name, so
        // shader selection sees it as unusable rather than absent.
        let mut map = |field: MtlFields, flag: MaterialFlags, handle: Option<TextureHandle>| {
            if pick(field) {
                flags |= flag;
                handle
            } else {
                None
            }
        };

        let map_ka = map(MtlFields::MAP_KA, MaterialFlags::AMBIENT_TEX, src.map_ka);
        let map_kd = map(MtlFields::MAP_KD, MaterialFlags::DIFFUSE_TEX, src.map_kd);
        let map_ks = map(MtlFields::MAP_KS, MaterialFlags::SPECULAR_TEX, src.map_ks);
        let map_ke = map(MtlFields::MAP_KE, MaterialFlags::EMISSIVE_TEX, src.map_ke);
        let map_ns = map(MtlFields::MAP_NS, MaterialFlags::SHININESS_TEX, src.map_ns);
        let map_d = map(MtlFields::MAP_D, MaterialFlags::TRANSPARENCY_TEX, src.map_d);
        let map_bump = map(
            MtlFields::MAP_BUMP,
            MaterialFlags::NORMAL_TANGENT_TEX,
            src.map_bump,
        );

        if src.declared.intersects(MtlFields::D | MtlFields::MAP_D) {
            flags |= MaterialFlags::TRANSPARENCY;
        }

        Self {
            name: src.name.clone(),
            ns: if pick(MtlFields::NS) { src.ns } else { fallback.ns },
            d: if pick(MtlFields::D) { src.d } else { fallback.d },
            tf: if pick(MtlFields::TF) { src.tf } else { fallback.tf },
            ka: if pick(MtlFields::KA) { src.ka } else { fallback.ka },
            kd: if pick(MtlFields::KD) { src.kd } else { fallback.kd },
            ks: if pick(MtlFields::KS) { src.ks } else { fallback.ks },
            ke: if pick(MtlFields::KE) { src.ke } else { fallback.ke },
            map_ka,
            map_kd,
            map_ks,
            map_ke,
            map_ns,
            map_d,
            map_bump,
            flags,
        }
    }
}

/// Contiguous run of indices drawn with one material.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshPart {
    /// First index in the index buffer.
    pub offset: u32,
    /// Number of indices.
    pub len: u32,
    pub material: u16,
    pub shader: ShaderKind,
}

impl MeshPart {
    pub fn new(offset: u32, len: u32, material: u16) -> Self {
        Self {
            offset,
            len,
            material,
            shader: ShaderKind::Normal,
        }
    }

    #[inline]
    pub fn range(&self) -> std::ops::Range<u32> {
        self.offset..self.offset + self.len
    }
}

/// Fully loaded model. Immutable once handed to the renderer.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub materials: Vec<Material>,
    pub parts: Vec<MeshPart>,
    pub textures: TextureTable,
}

impl Mesh {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds of all vertex positions.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = self.vertices.first()?.position;
        Some(self.vertices.iter().fold((first, first), |(mut lo, mut hi), v| {
            for i in 0..3 {
                lo[i] = lo[i].min(v.position[i]);
                hi[i] = hi[i].max(v.position[i]);
            }
            (lo, hi)
        }))
    }

    pub fn material(&self, part: &MeshPart) -> Option<&Material> {
        self.materials.get(part.material as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_is_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 14 * 4);
    }

    #[test]
    fn undeclared_fields_use_fallbacks() {
        let mut raw = MtlMaterial {
            name: "m".into(),
            ks: [0.7; 3],
            kd: [0.1, 0.2, 0.3],
            declared: MtlFields::KD,
            ..Default::default()
        };
        raw.map_kd = Some(TextureHandle(3));

        let mat = Material::from(&raw);
        assert_eq!(mat.kd, [0.1, 0.2, 0.3]);
        assert_eq!(mat.ks, [0.0; 3]);
        assert_eq!(mat.ka, [1.0; 3]);
        assert_eq!(mat.d, 1.0);
        // Handle without its presence bit is ignored.
        assert_eq!(mat.map_kd, None);
        assert!(mat.flags.is_empty());
    }

    #[test]
    fn declared_map_without_file_keeps_flag() {
        let raw = MtlMaterial {
            declared: MtlFields::MAP_KD | MtlFields::MAP_BUMP,
            map_bump: Some(TextureHandle(2)),
            ..Default::default()
        };
        let mat = Material::from(&raw);
        assert_eq!(mat.map_kd, None);
        assert_eq!(
            mat.flags,
            MaterialFlags::DIFFUSE_TEX | MaterialFlags::NORMAL_TANGENT_TEX
        );
    }

    #[test]
    fn opacity_texture_sets_transparency() {
        let raw = MtlMaterial {
            map_d: Some(TextureHandle(0)),
            declared: MtlFields::MAP_D,
            ..Default::default()
        };
        let mat = Material::from(&raw);
        assert!(mat.flags.contains(MaterialFlags::TRANSPARENCY));
        assert!(mat.flags.contains(MaterialFlags::TRANSPARENCY_TEX));

        let raw = MtlMaterial {
            d: 0.5,
            declared: MtlFields::D,
            ..Default::default()
        };
        let mat = Material::from(&raw);
        assert_eq!(mat.flags, MaterialFlags::TRANSPARENCY);
    }

    #[test]
    fn bounds_cover_all_vertices() {
        let mesh = Mesh {
            vertices: vec![
                Vertex::new([1.0, -2.0, 0.0], [0.0; 3], [0.0; 2]),
                Vertex::new([-1.0, 5.0, 3.0], [0.0; 3], [0.0; 2]),
            ],
            ..Default::default()
        };
        assert_eq!(mesh.bounds(), Some(([-1.0, -2.0, 0.0], [1.0, 5.0, 3.0])));
        assert_eq!(Mesh::default().bounds(), None);
    }
}
