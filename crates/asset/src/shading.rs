//! Shader variant selection.
//!
//! Variants form a fixed lattice keyed by which texture channels a material
//! samples. Selection runs once per mesh part at load time; a material whose
//! declared texture failed to load never gets a variant that samples it.

use bitflags::bitflags;

use crate::mesh::{Material, MaterialFlags};
use crate::texture::TextureHandle;

/// Every shading program the renderer builds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderKind {
    /// Lit material colors, no textures.
    Fallback,
    /// Debug: texture coordinates as color.
    TexCoord,
    /// Debug: normals as color. Also the fallback for broken materials.
    Normal,
    Diffuse,
    DiffuseSpecular,
    DiffuseAlpha,
    DiffuseSpecularAlpha,
    DiffuseBump,
    DiffuseSpecularBump,
    DiffuseAlphaBump,
    DiffuseSpecularAlphaBump,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 11] = [
        ShaderKind::Fallback,
        ShaderKind::TexCoord,
        ShaderKind::Normal,
        ShaderKind::Diffuse,
        ShaderKind::DiffuseSpecular,
        ShaderKind::DiffuseAlpha,
        ShaderKind::DiffuseSpecularAlpha,
        ShaderKind::DiffuseBump,
        ShaderKind::DiffuseSpecularBump,
        ShaderKind::DiffuseAlphaBump,
        ShaderKind::DiffuseSpecularAlphaBump,
    ];

    /// Dense index, matches the position in [`ShaderKind::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Texture channels this variant samples.
    pub fn caps(self) -> ShaderCaps {
        use ShaderKind::*;
        let d = ShaderCaps::DIFFUSE_TEX;
        let s = ShaderCaps::SPECULAR_TEX;
        let a = ShaderCaps::ALPHA_TEX;
        let b = ShaderCaps::BUMP_TEX;
        match self {
            Fallback | TexCoord | Normal => ShaderCaps::empty(),
            Diffuse => d,
            DiffuseSpecular => d | s,
            DiffuseAlpha => d | a,
            DiffuseSpecularAlpha => d | s | a,
            DiffuseBump => d | b,
            DiffuseSpecularBump => d | s | b,
            DiffuseAlphaBump => d | a | b,
            DiffuseSpecularAlphaBump => d | s | a | b,
        }
    }

    /// Same tier without normal mapping.
    pub fn without_bump(self) -> ShaderKind {
        use ShaderKind::*;
        match self {
            DiffuseBump => Diffuse,
            DiffuseSpecularBump => DiffuseSpecular,
            DiffuseAlphaBump => DiffuseAlpha,
            DiffuseSpecularAlphaBump => DiffuseSpecularAlpha,
            other => other,
        }
    }

    pub fn uses_tangents(self) -> bool {
        self.caps().contains(ShaderCaps::BUMP_TEX)
    }
}

bitflags! {
    /// Optional texture channels a material asks the shader to sample.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ShaderCaps: u8 {
        const AMBIENT_TEX = 1 << 0;
        const DIFFUSE_TEX = 1 << 1;
        const SPECULAR_TEX = 1 << 2;
        const ALPHA_TEX = 1 << 3;
        const BUMP_TEX = 1 << 4;
    }
}

impl ShaderCaps {
    pub fn from_material(flags: MaterialFlags) -> Self {
        let mut caps = ShaderCaps::empty();
        caps.set(Self::AMBIENT_TEX, flags.contains(MaterialFlags::AMBIENT_TEX));
        caps.set(Self::DIFFUSE_TEX, flags.contains(MaterialFlags::DIFFUSE_TEX));
        caps.set(Self::SPECULAR_TEX, flags.contains(MaterialFlags::SPECULAR_TEX));
        caps.set(Self::ALPHA_TEX, flags.contains(MaterialFlags::TRANSPARENCY_TEX));
        caps.set(Self::BUMP_TEX, flags.contains(MaterialFlags::NORMAL_TANGENT_TEX));
        caps
    }
}

/// Pick the variant for `material`. `valid` reports whether a texture finished
/// loading; a declared channel with no texture name counts as not loaded.
///
/// The full tier is always chosen, bump included. Turning bump mapping off is
/// a draw-time decision (see [`ShaderKind::without_bump`]).
pub fn select_shader(material: &Material, valid: impl Fn(TextureHandle) -> bool) -> ShaderKind {
    let caps = ShaderCaps::from_material(material.flags);

    let channels = [
        (ShaderCaps::AMBIENT_TEX, material.map_ka),
        (ShaderCaps::DIFFUSE_TEX, material.map_kd),
        (ShaderCaps::SPECULAR_TEX, material.map_ks),
        (ShaderCaps::ALPHA_TEX, material.map_d),
        (ShaderCaps::BUMP_TEX, material.map_bump),
    ];
    for (cap, handle) in channels {
        if caps.contains(cap) && !handle.is_some_and(&valid) {
            return ShaderKind::Normal;
        }
    }

    if caps.is_empty() {
        return ShaderKind::Fallback;
    }
    if !caps.contains(ShaderCaps::DIFFUSE_TEX) {
        return ShaderKind::Normal;
    }

    // Ambient rides along with diffuse; it never selects a tier by itself.
    let wanted = caps - ShaderCaps::AMBIENT_TEX;
    ShaderKind::ALL
        .into_iter()
        .find(|k| k.caps() == wanted)
        .unwrap_or(ShaderKind::Normal)
}
