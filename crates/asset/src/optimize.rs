//! Merge mesh parts so each material is drawn from one contiguous index range.

use crate::mesh::MeshPart;

/// Stable-sort `parts` by material and rebuild `indices` so that every
/// material's triangles are adjacent. Empty parts are dropped. Triangle
/// contents are copied verbatim; only their position in the buffer changes.
pub fn optimize_parts(parts: &mut Vec<MeshPart>, indices: &mut Vec<u32>) {
    let before = parts.len();
    parts.retain(|p| p.len > 0);
    if parts.is_empty() {
        return;
    }

    // `sort_by_key` is stable.
    parts.sort_by_key(|p| p.material);

    let mut merged: Vec<MeshPart> = Vec::new();
    let mut packed: Vec<u32> = Vec::with_capacity(indices.len());
    for part in parts.iter() {
        let offset = packed.len() as u32;
        match merged.last_mut() {
            Some(last) if last.material == part.material => {}
            _ => merged.push(MeshPart::new(offset, 0, part.material)),
        }
        packed.extend_from_slice(&indices[part.offset as usize..(part.offset + part.len) as usize]);
        if let Some(last) = merged.last_mut() {
            last.len = packed.len() as u32 - last.offset;
        }
    }
    debug_assert_eq!(packed.len(), indices.len());

    log::info!(
        "Mesh optimized; number of parts reduced from {} to {}",
        before,
        merged.len()
    );
    *parts = merged;
    *indices = packed;
}
