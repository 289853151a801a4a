// src/foliage.rs
//! The foliage renderer: merged geometry buffers, the indirect command
//! table, the culling pipeline and the single multi-draw submission.
//!
//! Draw order per frame: `encode_cull` once (both compute passes), then
//! `draw` once per viewport. The indirect call reads three commands from
//! the table; each command pulls its instances from the compacted visible
//! buffer via `first_instance`.

use wgpu::util::DeviceExt;

use crate::config::FOLIAGE_TYPE_COUNT;
use crate::context::DEPTH_FORMAT;
use crate::culling::{CullPipeline, PassStage};
use crate::frustum::CullSpec;
use crate::indirect::build_commands;
use crate::instances::InstanceStore;
use crate::mesh::{MergedMesh, Vertex};
use crate::texture::TextureArray;

pub struct FoliageRenderer {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    _source_buffer: wgpu::Buffer,
    command_buffer: wgpu::Buffer,

    cull: CullPipeline,

    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
}

impl FoliageRenderer {
    pub fn new(
        device: &wgpu::Device,
        camera_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
        merged: &MergedMesh,
        store: &InstanceStore,
        textures: &TextureArray,
    ) -> Self {
        // ------------------------------------------------------------------
        // Static geometry + instance data
        // ------------------------------------------------------------------
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("foliage_merged_vertices"),
            contents: bytemuck::cast_slice(&merged.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("foliage_merged_indices"),
            contents: bytemuck::cast_slice(&merged.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        // Zero instances still needs a non-empty binding.
        let source_bytes: Vec<u8> = if store.is_empty() {
            vec![0u8; std::mem::size_of::<crate::instances::PlantInstance>()]
        } else {
            bytemuck::cast_slice(store.instances()).to_vec()
        };
        let source_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("foliage_source_instances"),
            contents: &source_bytes,
            usage: wgpu::BufferUsages::STORAGE,
        });

        let commands = build_commands(&merged.ranges, store.ranges());
        let command_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("foliage_indirect_commands"),
            contents: bytemuck::cast_slice(&commands),
            usage: wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::STORAGE,
        });

        let cull = CullPipeline::new(
            device,
            &source_buffer,
            &command_buffer,
            store.ranges(),
            store.total(),
        );

        // ------------------------------------------------------------------
        // Draw pipeline
        // ------------------------------------------------------------------
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("foliage_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/foliage.wgsl").into()),
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("foliage_bind_group_layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2Array,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("foliage_bind_group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: cull.visible_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&textures.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&textures.sampler),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("foliage_pipeline_layout"),
            bind_group_layouts: &[camera_layout, &bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("foliage_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // Foliage cards are visible from both sides.
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
            cache: None,
        });

        Self {
            vertex_buffer,
            index_buffer,
            _source_buffer: source_buffer,
            command_buffer,
            cull,
            pipeline,
            bind_group,
        }
    }

    /// Run the full culling sequence for this frame. Must precede `draw`
    /// within the same submission.
    pub fn encode_cull(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        spec: &CullSpec,
    ) {
        self.cull.encode(encoder, queue, spec);
    }

    /// One multi-draw over the merged buffers, reading all three commands.
    pub fn draw<'pass>(
        &'pass self,
        pass: &mut wgpu::RenderPass<'pass>,
        camera: &'pass wgpu::BindGroup,
    ) {
        debug_assert_eq!(
            self.cull.stage(),
            PassStage::Culled,
            "foliage draw encoded before the culling sequence"
        );
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, camera, &[]);
        pass.set_bind_group(1, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.multi_draw_indexed_indirect(&self.command_buffer, 0, FOLIAGE_TYPE_COUNT as u32);
    }

    /// Permanently erase instances by linear index.
    pub fn mark_cut(&mut self, queue: &wgpu::Queue, indices: &[u32]) {
        self.cull.mark_cut(queue, indices);
    }

    pub fn is_cut(&self, index: u32) -> bool {
        self.cull.is_cut(index)
    }
}
