// src/overlay.rs
//! Wireframe overlay of the player camera's frustum, drawn unlit into the
//! god view so the culling volume is visible from outside. Depth testing is
//! off; the overlay is drawn last.

use glam::{Mat4, Vec3, Vec4};
use wgpu::util::DeviceExt;

use crate::context::DEPTH_FORMAT;

// Cube corners in NDC, bit-indexed: x = bit 0, y = bit 1, z (0..1) = bit 2.
const EDGE_INDICES: [u16; 24] = [
    0, 1, 1, 3, 3, 2, 2, 0, // near face
    4, 5, 5, 7, 7, 6, 6, 4, // far face
    0, 4, 1, 5, 2, 6, 3, 7, // connectors
];

pub struct FrustumOverlay {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    pipeline: wgpu::RenderPipeline,
}

impl FrustumOverlay {
    pub fn new(
        device: &wgpu::Device,
        camera_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frustum_overlay_vertices"),
            size: (8 * 3 * std::mem::size_of::<f32>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("frustum_overlay_indices"),
            contents: bytemuck::cast_slice(&EDGE_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("overlay_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/overlay.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("overlay_pipeline_layout"),
            bind_group_layouts: &[camera_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("overlay_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: (3 * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                }],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            // Overlay ignores scene depth but the pass still carries a
            // depth attachment, so the state must match the pass.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
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
            pipeline,
        }
    }

    /// Recompute the eight frustum corners by unprojecting the NDC cube
    /// through the inverse of the tracked camera's view-projection.
    pub fn update(&self, queue: &wgpu::Queue, view_proj: Mat4) {
        let inverse = view_proj.inverse();
        let mut corners = [[0.0f32; 3]; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let ndc = Vec4::new(
                if i & 1 == 0 { -1.0 } else { 1.0 },
                if i & 2 == 0 { -1.0 } else { 1.0 },
                if i & 4 == 0 { 0.0 } else { 1.0 },
                1.0,
            );
            let world = inverse * ndc;
            let world = Vec3::new(world.x, world.y, world.z) / world.w;
            *corner = world.to_array();
        }
        queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&corners));
    }

    pub fn draw<'pass>(
        &'pass self,
        pass: &mut wgpu::RenderPass<'pass>,
        camera: &'pass wgpu::BindGroup,
    ) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, camera, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..EDGE_INDICES.len() as u32, 0, 0..1);
    }
}
