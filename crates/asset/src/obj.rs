//! OBJ geometry reader: positions, normals, texture coordinates, faces and
//! material switches. Every face corner becomes a fresh output vertex;
//! polygons are fanned into triangles around their first corner.

use std::collections::HashMap;
use std::io::BufRead;

use crate::error::{LoadError, Result};
use crate::mesh::{MeshPart, Vertex};
use crate::mtl::{MtlMaterial, parse_mtl};
use crate::source::AssetSource;
use crate::texture::TextureTable;
use crate::tokenize::{TokenLine, read_floats, token_lines};

const DEFAULT_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];
const DEFAULT_UV: [f32; 2] = [0.0, 0.0];

/// Raw output of the OBJ reader, before part optimization.
#[derive(Clone, Debug, Default)]
pub struct ObjData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub materials: Vec<MtlMaterial>,
    /// One entry per material switch, in file order. May contain empty parts.
    pub parts: Vec<MeshPart>,
    pub textures: TextureTable,
}

/// Parse an OBJ stream. `mtllib` files are opened through `source`.
pub fn parse_obj<R: BufRead>(
    reader: R,
    file: &str,
    source: &dyn AssetSource,
    require_materials: bool,
) -> Result<ObjData> {
    let mut asm = Assembler::new(file, source, require_materials);
    for line in token_lines(reader, file) {
        asm.line(&line?)?;
    }
    Ok(asm.finish())
}

struct Assembler<'a> {
    file: &'a str,
    source: &'a dyn AssetSource,
    require_materials: bool,

    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,

    material_ids: HashMap<String, u16>,
    current_material: u16,
    out: ObjData,
}

/// Face corner resolved to 0-based pool indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Corner {
    pos: usize,
    tex: Option<usize>,
    norm: Option<usize>,
}

impl<'a> Assembler<'a> {
    fn new(file: &'a str, source: &'a dyn AssetSource, require_materials: bool) -> Self {
        let mut out = ObjData::default();
        out.parts.push(MeshPart::new(0, 0, 0));
        Self {
            file,
            source,
            require_materials,
            positions: Vec::new(),
            normals: Vec::new(),
            texcoords: Vec::new(),
            material_ids: HashMap::new(),
            current_material: 0,
            out,
        }
    }

    fn line(&mut self, line: &TokenLine) -> Result<()> {
        match line.keyword.as_str() {
            "v" => {
                let mut p = [0.0; 3];
                self.check(read_floats(&line.args, &mut p), line);
                self.positions.push(p);
            }
            "vn" => {
                let mut n = [0.0; 3];
                self.check(read_floats(&line.args, &mut n), line);
                self.normals.push(n);
            }
            "vt" => {
                let mut t = [0.0; 2];
                self.check(read_floats(&line.args, &mut t), line);
                t[1] = 1.0 - t[1];
                self.texcoords.push(t);
            }
            "f" => self.face(line)?,
            "usemtl" => self.use_material(line),
            "mtllib" => self.material_libs(line)?,
            "o" | "g" | "s" => {}
            other => log::warn!(
                "Unknown directive: {} ({} line {})",
                other,
                self.file,
                line.number
            ),
        }
        Ok(())
    }

    fn check(&self, ok: bool, line: &TokenLine) {
        if !ok {
            log::warn!("Not enough tokens ({} line {})", self.file, line.number);
        }
    }

    fn material_libs(&mut self, line: &TokenLine) -> Result<()> {
        if line.args.is_empty() {
            self.check(false, line);
        }
        for name in &line.args {
            match self.load_library(name) {
                Ok(count) => log::info!("Loaded {} materials from {}", count, name),
                Err(e) if !self.require_materials => {
                    log::error!("{e}; continuing without these materials")
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn load_library(&mut self, name: &str) -> Result<usize> {
        let source = self.source;
        let reader = source.open(name).map_err(|e| LoadError::io(name, e))?;
        let materials = parse_mtl(reader, name, &mut self.out.textures)?;
        let count = materials.len();
        for mat in materials {
            let Ok(id) = u16::try_from(self.out.materials.len()) else {
                log::warn!("Too many materials; ignoring '{}'", mat.name);
                continue;
            };
            if self.material_ids.contains_key(&mat.name) {
                log::warn!("Material '{}' defined more than once ({})", mat.name, name);
            } else {
                self.material_ids.insert(mat.name.clone(), id);
            }
            self.out.materials.push(mat);
        }
        Ok(count)
    }

    fn use_material(&mut self, line: &TokenLine) {
        let name = line.arg(0).unwrap_or_default();
        let id = match self.material_ids.get(name) {
            Some(&id) => id,
            None => {
                log::warn!(
                    "Unknown material '{}' ({} line {}); using material 0",
                    name,
                    self.file,
                    line.number
                );
                0
            }
        };
        if id == self.current_material {
            return;
        }

        let offset = self.out.indices.len() as u32;
        if let Some(open) = self.out.parts.last_mut() {
            open.len = offset - open.offset;
        }
        self.out.parts.push(MeshPart::new(offset, 0, id));
        self.current_material = id;
    }

    fn face(&mut self, line: &TokenLine) -> Result<()> {
        let corners = line
            .args
            .iter()
            .map(|d| self.corner(d, line.number))
            .collect::<Result<Vec<_>>>()?;

        if corners.len() < 3 {
            log::warn!(
                "Face with {} vertices skipped ({} line {})",
                corners.len(),
                self.file,
                line.number
            );
            return Ok(());
        }

        let base = self.out.vertices.len();
        let base = u32::try_from(base)
            .ok()
            .filter(|b| b.checked_add(corners.len() as u32).is_some())
            .ok_or_else(|| LoadError::TooManyVertices {
                file: self.file.to_string(),
            })?;

        for c in &corners {
            let position = self.positions[c.pos];
            let uv = c.tex.map_or(DEFAULT_UV, |i| self.texcoords[i]);
            let normal = c.norm.map_or(DEFAULT_NORMAL, |i| self.normals[i]);
            self.out.vertices.push(Vertex::new(position, normal, uv));
        }

        for i in 1..(corners.len() as u32 - 1) {
            self.out
                .indices
                .extend_from_slice(&[base, base + i, base + i + 1]);
        }
        Ok(())
    }

    /// Resolve `p`, `p/t`, `p/t/n` or `p//n`.
    fn corner(&self, desc: &str, line: usize) -> Result<Corner> {
        let mut split = desc.split('/');
        let pos = match split.next() {
            Some(p) if !p.is_empty() => self.index(p, self.positions.len(), "position", line)?,
            _ => return Err(self.bad_face(line, format!("'{desc}' has no position index"))),
        };
        let tex = match split.next() {
            Some(t) if !t.is_empty() => Some(self.index(t, self.texcoords.len(), "texcoord", line)?),
            _ => None,
        };
        let norm = match split.next() {
            Some(n) if !n.is_empty() => Some(self.index(n, self.normals.len(), "normal", line)?),
            _ => None,
        };
        Ok(Corner { pos, tex, norm })
    }

    fn index(&self, token: &str, len: usize, what: &str, line: usize) -> Result<usize> {
        let raw: i64 = token
            .parse()
            .map_err(|_| self.bad_face(line, format!("invalid {what} index '{token}'")))?;
        if raw < 1 || raw as u64 > len as u64 {
            return Err(self.bad_face(
                line,
                format!("{what} index {raw} out of range 1..={len}"),
            ));
        }
        Ok(raw as usize - 1)
    }

    fn bad_face(&self, line: usize, reason: String) -> LoadError {
        LoadError::InvalidFace {
            file: self.file.to_string(),
            line,
            reason,
        }
    }

    fn finish(mut self) -> ObjData {
        let end = self.out.indices.len() as u32;
        if let Some(open) = self.out.parts.last_mut() {
            open.len = end - open.offset;
        }
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use std::io::Cursor;

    fn parse(src: &str, source: &MemorySource) -> Result<ObjData> {
        parse_obj(Cursor::new(src), "test.obj", source, true)
    }

    #[test]
    fn parse_simple_triangle() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vn 0.0 0.0 1.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 0.0 1.0
            f 1/1/1 2/2/1 3/3/1
        "#;
        let obj = parse(src, &MemorySource::new()).expect("parse triangle");
        assert_eq!(obj.vertices.len(), 3);
        assert_eq!(obj.indices, vec![0, 1, 2]);
        // V is flipped.
        assert_eq!(obj.vertices[0].uv, [0.0, 1.0]);
        assert_eq!(obj.vertices[2].uv, [0.0, 0.0]);
        assert_eq!(obj.parts, vec![MeshPart::new(0, 3, 0)]);
    }

    #[test]
    fn quad_is_fanned_from_first_corner() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 1\nvt 0 0\nf 1/1/1 2/1/1 3/1/1 4/1/1\n";
        let obj = parse(src, &MemorySource::new()).expect("parse quad");
        assert_eq!(obj.vertices.len(), 4);
        assert_eq!(obj.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn ngon_produces_n_minus_two_triangles() {
        let src = "v 0 0 0\nv 1 0 0\nv 2 1 0\nv 1 2 0\nv 0 2 0\nv -1 1 0\nf 1 2 3 4 5 6\n";
        let obj = parse(src, &MemorySource::new()).expect("parse hexagon");
        assert_eq!(obj.indices.len(), 4 * 3);
        assert!(obj.indices.chunks(3).all(|t| t[0] == 0));
        // Missing attributes use defaults.
        assert_eq!(obj.vertices[0].normal, DEFAULT_NORMAL);
        assert_eq!(obj.vertices[0].uv, DEFAULT_UV);
    }

    #[test]
    fn descriptor_forms() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 1 0 0\nvt 0.5 0.25\nf 1//1 2/1 3/1/1\n";
        let obj = parse(src, &MemorySource::new()).expect("parse");
        assert_eq!(obj.vertices[0].normal, [1.0, 0.0, 0.0]);
        assert_eq!(obj.vertices[0].uv, DEFAULT_UV);
        assert_eq!(obj.vertices[1].uv, [0.5, 0.75]);
        assert_eq!(obj.vertices[1].normal, DEFAULT_NORMAL);
    }

    #[test]
    fn bad_indices_are_fatal() {
        for face in ["f 0 1 2", "f -1 1 2", "f 1 2 9", "f /1 2 3", "f 1 2 x"] {
            let src = format!("v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\n{face}\n");
            let err = parse(&src, &MemorySource::new()).unwrap_err();
            assert!(
                matches!(err, LoadError::InvalidFace { line: 5, .. }),
                "{face}: {err}"
            );
        }
    }

    #[test]
    fn degenerate_face_is_skipped() {
        let obj = parse("v 0 0 0\nv 1 0 0\nf 1 2\n", &MemorySource::new()).expect("parse");
        assert!(obj.vertices.is_empty());
        assert!(obj.indices.is_empty());
    }

    #[test]
    fn usemtl_opens_parts() {
        let mtl = "newmtl A\nKd 1 0 0\nnewmtl B\nKd 0 1 0\n";
        let source = MemorySource::new().with_file("scene.mtl", mtl);
        let src = "mtllib scene.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\n\
                   usemtl B\nf 1 2 3\nusemtl A\nf 1 2 3\nf 1 2 3\nusemtl B\nf 1 2 3\nusemtl Nope\nf 1 2 3\n";
        let obj = parse(src, &source).expect("parse");
        assert_eq!(obj.materials.len(), 2);
        let parts: Vec<_> = obj.parts.iter().map(|p| (p.offset, p.len, p.material)).collect();
        assert_eq!(
            parts,
            vec![(0, 0, 0), (0, 3, 1), (3, 6, 0), (9, 3, 1), (12, 3, 0)]
        );
    }

    #[test]
    fn missing_material_library() {
        let src = "mtllib missing.mtl\nv 0 0 0\n";
        let err = parse(src, &MemorySource::new()).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));

        let obj = parse_obj(Cursor::new(src), "test.obj", &MemorySource::new(), false)
            .expect("lenient load");
        assert!(obj.materials.is_empty());
        assert_eq!(obj.parts.len(), 1);
    }
}
