//! MTL (material library) reader.
//!
//! Produces raw material records exactly as declared: every field carries a
//! presence bit in [`MtlFields`], and texture names are interned into the
//! shared [`TextureTable`] so two materials naming the same file share a slot.

use std::io::BufRead;

use bitflags::bitflags;

use crate::error::{LoadError, Result};
use crate::texture::{TextureHandle, TextureTable};
use crate::tokenize::{TokenLine, read_floats, token_lines};

bitflags! {
    /// Which fields a material file declared.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MtlFields: u32 {
        const NS = 1 << 0;
        const NI = 1 << 1;
        const D = 1 << 2;
        const TF = 1 << 3;
        const ILLUM = 1 << 4;
        const KA = 1 << 5;
        const KD = 1 << 6;
        const KS = 1 << 7;
        const KE = 1 << 8;
        const MAP_KA = 1 << 9;
        const MAP_KD = 1 << 10;
        const MAP_KS = 1 << 11;
        const MAP_KE = 1 << 12;
        const MAP_NS = 1 << 13;
        const MAP_D = 1 << 14;
        const MAP_BUMP = 1 << 15;
    }
}

/// A material as written in the `.mtl` file. Values of undeclared fields are
/// meaningless; check [`MtlMaterial::declared`] first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MtlMaterial {
    pub name: String,
    /// Shininess.
    pub ns: f32,
    /// Index of refraction.
    pub ni: f32,
    /// Opacity (`d`, or `1 - Tr`).
    pub d: f32,
    /// Transmission filter.
    pub tf: [f32; 3],
    pub illum: u16,
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
    pub declared: MtlFields,
}

impl MtlMaterial {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            d: 1.0,
            ..Default::default()
        }
    }

    #[inline]
    pub fn has(&self, field: MtlFields) -> bool {
        self.declared.contains(field)
    }
}

/// Parse a material library. `file` names the source in diagnostics.
///
/// Fails only on I/O errors and on field lines before the first `newmtl`;
/// everything else is logged and skipped.
pub fn parse_mtl<R: BufRead>(
    reader: R,
    file: &str,
    textures: &mut TextureTable,
) -> Result<Vec<MtlMaterial>> {
    let mut materials: Vec<MtlMaterial> = Vec::new();

    for line in token_lines(reader, file) {
        let line = line?;
        log::trace!("{}:{}: {} {:?}", file, line.number, line.keyword, line.args);

        if line.keyword == "newmtl" {
            let name = line.arg(0).unwrap_or_default();
            if name.is_empty() {
                log::warn!("newmtl without a name ({} line {})", file, line.number);
            }
            materials.push(MtlMaterial::named(name));
            continue;
        }

        let Some(current) = materials.last_mut() else {
            return Err(LoadError::FieldBeforeNewmtl {
                file: file.to_string(),
                line: line.number,
                token: line.keyword,
            });
        };
        apply_field(current, &line, file, textures);
    }

    Ok(materials)
}

fn apply_field(mat: &mut MtlMaterial, line: &TokenLine, file: &str, textures: &mut TextureTable) {
    let args = line.args.as_slice();
    let key = line.keyword.as_str();

    // `ok` is false when the line ran out of tokens.
    let (flag, ok) = match key {
        "Ns" => (MtlFields::NS, read_scalar(args, &mut mat.ns)),
        "Ni" => (MtlFields::NI, read_scalar(args, &mut mat.ni)),
        "d" | "Tr" => {
            let mut value = if key == "d" { 1.0 } else { 0.0 };
            let ok = read_scalar(args, &mut value);
            let d = if key == "d" { value } else { 1.0 - value };
            if mat.has(MtlFields::D) && mat.d != d {
                log::warn!(
                    "Multiple transparency values ({} line {})",
                    file,
                    line.number
                );
            }
            mat.d = d;
            mat.declared |= MtlFields::D;
            warn_if_short(ok, file, line.number);
            return;
        }
        "Tf" => (MtlFields::TF, read_floats(args, &mut mat.tf)),
        "illum" => {
            let parsed = args.first().and_then(|t| t.parse::<u16>().ok());
            if let Some(v) = parsed {
                mat.illum = v;
            }
            (MtlFields::ILLUM, parsed.is_some())
        }
        "Ka" => (MtlFields::KA, read_floats(args, &mut mat.ka)),
        "Kd" => (MtlFields::KD, read_floats(args, &mut mat.kd)),
        "Ks" => (MtlFields::KS, read_floats(args, &mut mat.ks)),
        "Ke" => (MtlFields::KE, read_floats(args, &mut mat.ke)),
        "map_Ka" => (MtlFields::MAP_KA, read_map(args, textures, &mut mat.map_ka)),
        "map_Kd" => (MtlFields::MAP_KD, read_map(args, textures, &mut mat.map_kd)),
        "map_Ks" => (MtlFields::MAP_KS, read_map(args, textures, &mut mat.map_ks)),
        "map_Ke" => (MtlFields::MAP_KE, read_map(args, textures, &mut mat.map_ke)),
        "map_Ns" => (MtlFields::MAP_NS, read_map(args, textures, &mut mat.map_ns)),
        "map_d" => (MtlFields::MAP_D, read_map(args, textures, &mut mat.map_d)),
        k if k == "bump" || k.eq_ignore_ascii_case("map_bump") => {
            // Unlike other fields, a second bump map only warns when it
            // names a different file, and then replaces the first.
            let previous = mat.map_bump;
            let ok = read_map(args, textures, &mut mat.map_bump);
            if mat.has(MtlFields::MAP_BUMP) && previous != mat.map_bump {
                log::warn!("Multiple bump maps ({} line {})", file, line.number);
            }
            mat.declared |= MtlFields::MAP_BUMP;
            warn_if_short(ok, file, line.number);
            return;
        }
        _ => {
            log::warn!(
                "Unknown directive: {} ({} line {})",
                key,
                file,
                line.number
            );
            return;
        }
    };

    warn_if_short(ok, file, line.number);
    if mat.has(flag) {
        log::warn!("Duplicate {} declaration ({} line {})", key, file, line.number);
    }
    mat.declared |= flag;
}

fn warn_if_short(ok: bool, file: &str, line: usize) {
    if !ok {
        log::warn!("Not enough tokens ({} line {})", file, line);
    }
}

fn read_scalar(args: &[String], out: &mut f32) -> bool {
    let mut buf = [*out];
    let ok = read_floats(args, &mut buf);
    *out = buf[0];
    ok
}

/// Texture statements may carry options (`-bm 0.5`, `-o u v w`); the file
/// name is the last token.
fn read_map(
    args: &[String],
    textures: &mut TextureTable,
    out: &mut Option<TextureHandle>,
) -> bool {
    let Some(name) = args.last() else {
        return false;
    };
    match textures.intern(name) {
        Some(handle) => {
            *out = Some(handle);
            true
        }
        None => {
            log::warn!("Too many textures; ignoring '{}'", name);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(src: &str, textures: &mut TextureTable) -> Result<Vec<MtlMaterial>> {
        parse_mtl(Cursor::new(src), "test.mtl", textures)
    }

    #[test]
    fn two_materials_share_texture_table() {
        let mut textures = TextureTable::new();
        let mats = parse(
            "newmtl Red\nKd 1 0 0\nnewmtl Blue\nKd 0 0 1\nmap_Kd wall.png\n",
            &mut textures,
        )
        .expect("parse");

        assert_eq!(mats.len(), 2);
        assert_eq!(mats[0].name, "Red");
        assert_eq!(mats[0].kd, [1.0, 0.0, 0.0]);
        assert!(!mats[0].has(MtlFields::MAP_KD));
        assert!(mats[1].has(MtlFields::MAP_KD));
        assert_eq!(mats[1].map_kd, Some(TextureHandle(0)));
        assert_eq!(textures.lookup("wall.png"), Some(TextureHandle(0)));
    }

    #[test]
    fn field_before_newmtl_is_fatal() {
        let mut textures = TextureTable::new();
        let err = parse("# header\nKd 1 1 1\nnewmtl A\n", &mut textures).unwrap_err();
        match err {
            LoadError::FieldBeforeNewmtl { line, token, .. } => {
                assert_eq!(line, 2);
                assert_eq!(token, "Kd");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn presence_flags_track_declarations_only() {
        let mut textures = TextureTable::new();
        let mats = parse("newmtl A\nNs 10\nKa 0.1 0.1 0.1\n", &mut textures).expect("parse");
        let m = &mats[0];
        assert_eq!(m.declared, MtlFields::NS | MtlFields::KA);
        assert_eq!(m.ns, 10.0);
        assert!(!m.has(MtlFields::KD));
    }

    #[test]
    fn tr_and_d_share_opacity_last_wins() {
        let mut textures = TextureTable::new();
        let mats = parse("newmtl A\nd 0.25\nTr 0.5\n", &mut textures).expect("parse");
        assert!(mats[0].has(MtlFields::D));
        assert!((mats[0].d - 0.5).abs() < 1e-6);

        let mats = parse("newmtl B\nTr 0.3\n", &mut textures).expect("parse");
        assert!((mats[0].d - 0.7).abs() < 1e-6);
    }

    #[test]
    fn duplicates_and_malformed_lines_are_lenient() {
        let mut textures = TextureTable::new();
        let mats = parse(
            "newmtl A\nKd 1 1 1\nKd 0.5 0.25\nillum\nfoo 1 2\nNs 4\n",
            &mut textures,
        )
        .expect("parse");
        let m = &mats[0];
        // Second Kd stops at the missing blue component.
        assert_eq!(m.kd, [0.5, 0.25, 1.0]);
        assert!(m.has(MtlFields::ILLUM));
        assert_eq!(m.illum, 0);
        assert_eq!(m.ns, 4.0);
    }

    #[test]
    fn bump_redeclaration_overwrites() {
        let mut textures = TextureTable::new();
        let mats = parse(
            "newmtl A\nmap_bump first.png\nbump second.png\n",
            &mut textures,
        )
        .expect("parse");
        assert_eq!(mats[0].map_bump, textures.lookup("second.png"));
        assert!(mats[0].has(MtlFields::MAP_BUMP));
        assert_eq!(textures.len(), 2);
    }

    #[test]
    fn texture_options_are_skipped() {
        let mut textures = TextureTable::new();
        let mats = parse("newmtl A\nmap_bump -bm 0.5 normal.png\n", &mut textures).expect("parse");
        assert_eq!(mats[0].map_bump, textures.lookup("normal.png"));
        assert_eq!(textures.len(), 1);
    }
}
