//! Shader variants: one render pipeline per [`ShaderKind`], all sharing one
//! WGSL module, one vertex stage and one pipeline layout.

use std::num::NonZeroU64;

use asset::ShaderKind;
use wgpu::{
    BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType, BlendState,
    BufferBindingType, ColorTargetState, ColorWrites, DepthBiasState, DepthStencilState, Device,
    FragmentState, PipelineLayoutDescriptor, RenderPass, RenderPipeline,
    RenderPipelineDescriptor, SamplerBindingType, ShaderModuleDescriptor, ShaderSource,
    ShaderStages, TextureFormat, TextureSampleType, TextureViewDimension, VertexState,
};

use crate::gpu_mesh::{MaterialUniform, VERTEX_LAYOUT};
use crate::{CameraUniform, DEPTH_FORMAT};

/// How parts are shaded this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShadingMode {
    /// Each part's variant chosen at load time.
    #[default]
    Material,
    TexCoord,
    Normal,
    /// Untextured material colors.
    Flat,
}

impl ShadingMode {
    /// Variant to draw a part with, given its load-time selection.
    pub fn resolve(self, selected: ShaderKind, bump_mapping: bool) -> ShaderKind {
        match self {
            ShadingMode::Material if bump_mapping => selected,
            ShadingMode::Material => selected.without_bump(),
            ShadingMode::TexCoord => ShaderKind::TexCoord,
            ShadingMode::Normal => ShaderKind::Normal,
            ShadingMode::Flat => ShaderKind::Fallback,
        }
    }
}

/// Fragment entry point in `mesh.wgsl` for each variant.
pub fn fragment_entry(kind: ShaderKind) -> &'static str {
    match kind {
        ShaderKind::Fallback => "fs_fallback",
        ShaderKind::TexCoord => "fs_texcoord",
        ShaderKind::Normal => "fs_normal",
        ShaderKind::Diffuse => "fs_diffuse",
        ShaderKind::DiffuseSpecular => "fs_diffuse_specular",
        ShaderKind::DiffuseAlpha => "fs_diffuse_alpha",
        ShaderKind::DiffuseSpecularAlpha => "fs_diffuse_specular_alpha",
        ShaderKind::DiffuseBump => "fs_diffuse_bump",
        ShaderKind::DiffuseSpecularBump => "fs_diffuse_specular_bump",
        ShaderKind::DiffuseAlphaBump => "fs_diffuse_alpha_bump",
        ShaderKind::DiffuseSpecularAlphaBump => "fs_diffuse_specular_alpha_bump",
    }
}

/// Compiled variants plus the bind group layouts they share. Built once at
/// startup and passed by reference to upload and draw code.
pub struct ShaderLibrary {
    pipelines: Vec<RenderPipeline>,
    pub camera_bgl: BindGroupLayout,
    pub material_bgl: BindGroupLayout,
}

impl ShaderLibrary {
    pub fn new(device: &Device, color_format: TextureFormat) -> Self {
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Mesh WGSL"),
            source: ShaderSource::Wgsl(include_str!("shaders/mesh.wgsl").into()),
        });

        let camera_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Camera BGL"),
            entries: &[uniform_entry(0, size_of::<CameraUniform>())],
        });

        let texture_entry = |binding| BindGroupLayoutEntry {
            binding,
            visibility: ShaderStages::FRAGMENT,
            ty: BindingType::Texture {
                sample_type: TextureSampleType::Float { filterable: true },
                view_dimension: TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let material_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Material BGL"),
            entries: &[
                uniform_entry(0, size_of::<MaterialUniform>()),
                texture_entry(1),
                texture_entry(2),
                texture_entry(3),
                texture_entry(4),
                texture_entry(5),
                BindGroupLayoutEntry {
                    binding: 6,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Mesh PipelineLayout"),
            bind_group_layouts: &[&camera_bgl, &material_bgl],
            push_constant_ranges: &[],
        });

        let pipelines = ShaderKind::ALL
            .iter()
            .map(|&kind| {
                device.create_render_pipeline(&RenderPipelineDescriptor {
                    label: Some(fragment_entry(kind)),
                    layout: Some(&layout),
                    vertex: VertexState {
                        module: &shader,
                        entry_point: Some("vs_main"),
                        buffers: &[VERTEX_LAYOUT],
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    },
                    fragment: Some(FragmentState {
                        module: &shader,
                        entry_point: Some(fragment_entry(kind)),
                        targets: &[Some(ColorTargetState {
                            format: color_format,
                            blend: Some(BlendState::REPLACE),
                            write_mask: ColorWrites::ALL,
                        })],
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    }),
                    // Models like Sponza rely on two-sided geometry.
                    primitive: wgpu::PrimitiveState {
                        cull_mode: None,
                        ..Default::default()
                    },
                    depth_stencil: Some(DepthStencilState {
                        format: DEPTH_FORMAT,
                        depth_write_enabled: true,
                        depth_compare: wgpu::CompareFunction::LessEqual,
                        stencil: wgpu::StencilState::default(),
                        bias: DepthBiasState::default(),
                    }),
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                })
            })
            .collect();
        log::info!("Built {} shader variants", ShaderKind::ALL.len());

        Self {
            pipelines,
            camera_bgl,
            material_bgl,
        }
    }

    pub fn pipeline(&self, kind: ShaderKind) -> &RenderPipeline {
        &self.pipelines[kind.index()]
    }

    /// Switch `pass` to `kind` unless it is already bound.
    pub fn bind(&self, pass: &mut RenderPass<'_>, kind: ShaderKind, bound: &mut Option<ShaderKind>) {
        if *bound == Some(kind) {
            return;
        }
        pass.set_pipeline(self.pipeline(kind));
        *bound = Some(kind);
    }
}

fn uniform_entry(binding: u32, size: usize) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_a_distinct_entry_point() {
        let mut names: Vec<_> = ShaderKind::ALL.iter().map(|&k| fragment_entry(k)).collect();
        let src = include_str!("shaders/mesh.wgsl");
        for name in &names {
            assert!(src.contains(&format!("fn {name}(")), "missing {name}");
        }
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ShaderKind::ALL.len());
    }

    #[test]
    fn shading_mode_overrides() {
        let k = ShaderKind::DiffuseSpecularBump;
        assert_eq!(ShadingMode::Material.resolve(k, true), k);
        assert_eq!(
            ShadingMode::Material.resolve(k, false),
            ShaderKind::DiffuseSpecular
        );
        assert_eq!(ShadingMode::TexCoord.resolve(k, true), ShaderKind::TexCoord);
        assert_eq!(ShadingMode::Flat.resolve(k, true), ShaderKind::Fallback);
    }
}
