//! Mesh upload: vertex/index buffers, textures and one bind group per material.

use std::collections::HashMap;

use asset::{Material, Mesh, MeshPart, ShaderKind, TextureData, TextureHandle, Vertex};
use bytemuck::{Pod, Zeroable};
use wgpu::{
    BindGroup, Buffer, BufferUsages, Device, Queue, RenderPass, Sampler, TextureView,
    VertexBufferLayout, VertexStepMode, util::DeviceExt,
};

use crate::shaders::{ShaderLibrary, ShadingMode};

pub const VERTEX_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: std::mem::size_of::<Vertex>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
        3 => Float32x3,
        4 => Float32x3,
    ],
};

/// Material UBO (std140, all vec4).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialUniform {
    pub ka: [f32; 4],
    /// w = dissolve.
    pub kd: [f32; 4],
    /// w = specular exponent.
    pub ks: [f32; 4],
    pub ke: [f32; 4],
    pub tf: [f32; 4],
}

impl From<&Material> for MaterialUniform {
    fn from(m: &Material) -> Self {
        let v4 = |c: [f32; 3], w: f32| [c[0], c[1], c[2], w];
        Self {
            ka: v4(m.ka, 1.0),
            kd: v4(m.kd, m.d),
            ks: v4(m.ks, m.ns),
            ke: v4(m.ke, 1.0),
            tf: v4(m.tf, 1.0),
        }
    }
}

/// Texture slots a material binds, in binding order 1..=5.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaterialTextures {
    pub ambient: Option<TextureHandle>,
    pub diffuse: Option<TextureHandle>,
    pub specular: Option<TextureHandle>,
    pub opacity: Option<TextureHandle>,
    pub bump: Option<TextureHandle>,
}

impl MaterialTextures {
    /// Usable textures of `m`. Ambient falls back to the diffuse map.
    pub fn of(m: &Material, valid: impl Fn(TextureHandle) -> bool) -> Self {
        let keep = |h: Option<TextureHandle>| h.filter(|&h| valid(h));
        let diffuse = keep(m.map_kd);
        Self {
            ambient: keep(m.map_ka).or(diffuse),
            diffuse,
            specular: keep(m.map_ks),
            opacity: keep(m.map_d),
            bump: keep(m.map_bump),
        }
    }
}

/// Texture uploaded once; color maps are sRGB, data maps (opacity, bump) linear.
fn upload_texture(device: &Device, queue: &Queue, tex: &TextureData, srgb: bool, label: &str) -> TextureView {
    let size = wgpu::Extent3d {
        width: tex.width,
        height: tex.height,
        depth_or_array_layers: 1,
    };
    let format = if srgb {
        wgpu::TextureFormat::Rgba8UnormSrgb
    } else {
        wgpu::TextureFormat::Rgba8Unorm
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        &tex.data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * tex.width),
            rows_per_image: Some(tex.height),
        },
        size,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

struct Placeholders {
    white: TextureView,
    flat_normal: TextureView,
}

/// GPU copy of a [`Mesh`]. Parts keep their load-time shader selection.
pub struct GpuMesh {
    vertex_buf: Buffer,
    index_buf: Buffer,
    index_count: u32,
    parts: Vec<MeshPart>,
    material_bgs: Vec<BindGroup>,
    // Keep uniform buffers alive alongside their bind groups.
    _material_bufs: Vec<Buffer>,
}

impl GpuMesh {
    pub fn new(device: &Device, queue: &Queue, library: &ShaderLibrary, mesh: &Mesh) -> Self {
        let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh VB"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: BufferUsages::VERTEX,
        });
        let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh IB"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: BufferUsages::INDEX,
        });

        let white = TextureData::white();
        let flat = TextureData::new_rgba8(1, 1, 4, vec![128, 128, 255, 255]).unwrap_or_else(TextureData::white);
        let placeholders = Placeholders {
            white: upload_texture(device, queue, &white, false, "White"),
            flat_normal: upload_texture(device, queue, &flat, false, "FlatNormal"),
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let mut views: HashMap<(TextureHandle, bool), TextureView> = HashMap::new();
        let mut view_of = |handle: Option<TextureHandle>, srgb: bool| -> Option<TextureView> {
            let handle = handle?;
            if let Some(view) = views.get(&(handle, srgb)) {
                return Some(view.clone());
            }
            let slot = mesh.textures.get(handle)?;
            let view = upload_texture(device, queue, slot.data()?, srgb, &slot.name);
            views.insert((handle, srgb), view.clone());
            Some(view)
        };

        let mut material_bgs = Vec::with_capacity(mesh.materials.len());
        let mut material_bufs = Vec::with_capacity(mesh.materials.len());
        for material in &mesh.materials {
            let set = MaterialTextures::of(material, |h| mesh.textures.is_valid(h));
            let ambient = view_of(set.ambient, true);
            let diffuse = view_of(set.diffuse, true);
            let specular = view_of(set.specular, true);
            let opacity = view_of(set.opacity, false);
            let bump = view_of(set.bump, false);

            let buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&material.name),
                contents: bytemuck::bytes_of(&MaterialUniform::from(material)),
                usage: BufferUsages::UNIFORM,
            });
            let bg = create_material_bg(
                device,
                library,
                &buf,
                [
                    ambient.as_ref().unwrap_or(&placeholders.white),
                    diffuse.as_ref().unwrap_or(&placeholders.white),
                    specular.as_ref().unwrap_or(&placeholders.white),
                    opacity.as_ref().unwrap_or(&placeholders.white),
                    bump.as_ref().unwrap_or(&placeholders.flat_normal),
                ],
                &sampler,
                &material.name,
            );
            material_bgs.push(bg);
            material_bufs.push(buf);
        }
        log::info!(
            "Uploaded {} vertices, {} indices, {} materials, {} textures",
            mesh.vertices.len(),
            mesh.indices.len(),
            mesh.materials.len(),
            views.len()
        );

        Self {
            vertex_buf,
            index_buf,
            index_count: mesh.indices.len() as u32,
            parts: mesh.parts.clone(),
            material_bgs,
            _material_bufs: material_bufs,
        }
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Draw every part, or only `isolate` when set.
    pub fn draw(
        &self,
        pass: &mut RenderPass<'_>,
        library: &ShaderLibrary,
        mode: ShadingMode,
        isolate: Option<usize>,
        bump_mapping: bool,
    ) {
        // Slicing an empty buffer panics.
        if self.index_count == 0 {
            return;
        }
        pass.set_vertex_buffer(0, self.vertex_buf.slice(..));
        pass.set_index_buffer(self.index_buf.slice(..), wgpu::IndexFormat::Uint32);

        let mut bound: Option<ShaderKind> = None;
        for (i, part) in self.parts.iter().enumerate() {
            if isolate.is_some_and(|only| only != i) {
                continue;
            }
            let Some(bg) = self.material_bgs.get(part.material as usize) else {
                continue;
            };
            library.bind(pass, mode.resolve(part.shader, bump_mapping), &mut bound);
            pass.set_bind_group(1, bg, &[]);
            pass.draw_indexed(part.range(), 0, 0..1);
        }
    }
}

fn create_material_bg(
    device: &Device,
    library: &ShaderLibrary,
    uniform: &Buffer,
    views: [&TextureView; 5],
    sampler: &Sampler,
    label: &str,
) -> BindGroup {
    let mut entries = vec![wgpu::BindGroupEntry {
        binding: 0,
        resource: uniform.as_entire_binding(),
    }];
    entries.extend(views.iter().enumerate().map(|(i, view)| wgpu::BindGroupEntry {
        binding: i as u32 + 1,
        resource: wgpu::BindingResource::TextureView(view),
    }));
    entries.push(wgpu::BindGroupEntry {
        binding: 6,
        resource: wgpu::BindingResource::Sampler(sampler),
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout: &library.material_bgl,
        entries: &entries,
    })
}
