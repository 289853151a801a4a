// src/scene.rs
//! Scene orchestration: dual cameras, ground, foliage and the slime.
//!
//! Per frame: `update` advances cameras, the slime and the persistent cut
//! flags; `render` runs one culling sequence against the player frustum and
//! draws both viewports (god view left, player view right) from the same
//! visible set.

use glam::Vec3;

use crate::camera::{
    camera_bind_group_layout, Camera, CameraUniform, OrbitController, WalkerController,
};
use crate::config::RenderConfig;
use crate::context::{GraphicsContext, DEPTH_FORMAT};
use crate::error::Result;
use crate::foliage::FoliageRenderer;
use crate::frustum::CullSpec;
use crate::gltf_loader::load_mesh;
use crate::ground::GroundRenderer;
use crate::instances::InstanceStore;
use crate::mesh::MergedMesh;
use crate::overlay::FrustumOverlay;
use crate::samples::{SampleSource, SpatialSampleFile};
use crate::slime::SlimeActor;
use crate::texture::{Texture2d, TextureArray};

/// One viewport's camera plus its GPU uniform.
struct ViewSlot {
    camera: Camera,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl ViewSlot {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, camera: Camera) -> Self {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("view_uniform"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("view_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        Self {
            camera,
            uniform_buffer,
            bind_group,
        }
    }

    fn upload(&self, queue: &wgpu::Queue) {
        let uniform = CameraUniform::from_camera(&self.camera);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
    }
}

pub struct Scene {
    config: RenderConfig,
    frame_width: u32,
    frame_height: u32,
    depth_view: wgpu::TextureView,

    god_view: ViewSlot,
    player_view: ViewSlot,
    orbit: OrbitController,
    walker: WalkerController,

    store: InstanceStore,
    foliage: FoliageRenderer,
    ground: GroundRenderer,
    overlay: FrustumOverlay,
    slime: SlimeActor,
}

impl Scene {
    /// Load every resource and build every pipeline. Mesh problems are
    /// fatal here; sample and texture problems degrade with a warning.
    pub fn init(
        ctx: &GraphicsContext,
        config: RenderConfig,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let device = &ctx.device;
        let surface_format = ctx.surface_format();

        // ------------------------------------------------------------------
        // Foliage geometry and placements
        // ------------------------------------------------------------------
        let meshes = [
            load_mesh(&config.foliage_meshes[0])?,
            load_mesh(&config.foliage_meshes[1])?,
            load_mesh(&config.foliage_meshes[2])?,
        ];
        let merged = MergedMesh::build(&meshes)?;

        let samples: Vec<SpatialSampleFile> = config
            .sample_files
            .iter()
            .map(|path| SpatialSampleFile::import_or_empty(path))
            .collect();
        let sources: [&dyn SampleSource; 3] = [&samples[0], &samples[1], &samples[2]];
        let store = InstanceStore::load(&sources);

        let textures = TextureArray::load(device, &ctx.queue, &config.foliage_textures)?;

        // ------------------------------------------------------------------
        // Cameras
        // ------------------------------------------------------------------
        let camera_layout = camera_bind_group_layout(device);

        let god_camera = Camera::new(
            Vec3::new(0.0, 55.0, 50.0),
            Vec3::new(0.0, 32.0, -12.0),
            Vec3::Y,
            60f32.to_radians(),
            0.1,
            512.0,
        );
        let orbit = OrbitController::new(god_camera.eye, god_camera.target);

        let player_camera = Camera::new(
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::new(0.0, 10.0, -10.0),
            Vec3::Y,
            45f32.to_radians(),
            1.0,
            150.0,
        );
        let walker = WalkerController::new(player_camera.eye);

        let god_view = ViewSlot::new(device, &camera_layout, god_camera);
        let player_view = ViewSlot::new(device, &camera_layout, player_camera);

        // ------------------------------------------------------------------
        // Renderers
        // ------------------------------------------------------------------
        let foliage = FoliageRenderer::new(
            device,
            &camera_layout,
            surface_format,
            &merged,
            &store,
            &textures,
        );
        let ground = GroundRenderer::new(
            device,
            &camera_layout,
            surface_format,
            config.max_draw_distance,
        );
        let overlay = FrustumOverlay::new(device, &camera_layout, surface_format);

        let slime_mesh = load_mesh(&config.slime_mesh)?;
        slime_mesh.validate()?;
        let slime_texture = Texture2d::load_or_placeholder(device, &ctx.queue, &config.slime_texture);
        let slime = SlimeActor::new(
            device,
            &camera_layout,
            surface_format,
            &slime_mesh,
            &slime_texture,
            config.erase_radius,
        );

        let depth_view = create_depth_view(device, width, height);

        let mut scene = Self {
            config,
            frame_width: width,
            frame_height: height,
            depth_view,
            god_view,
            player_view,
            orbit,
            walker,
            store,
            foliage,
            ground,
            overlay,
            slime,
        };
        scene.resize(ctx, width, height);
        Ok(scene)
    }

    /// Window resized. Both cameras render into half the window width.
    pub fn resize(&mut self, ctx: &GraphicsContext, width: u32, height: u32) {
        self.frame_width = width.max(2);
        self.frame_height = height.max(1);

        let half_width = self.frame_width / 2;
        self.god_view.camera.set_aspect(half_width, self.frame_height);
        self.player_view.camera.set_aspect(half_width, self.frame_height);

        self.depth_view = create_depth_view(&ctx.device, self.frame_width, self.frame_height);
    }

    /// Advance everything that is not a GPU pass: cameras, the slime, and
    /// the persistent cut flags for instances the slime rolled over.
    pub fn update(&mut self, queue: &wgpu::Queue, dt: f32) {
        self.orbit.apply(&mut self.god_view.camera);
        self.walker.update(dt, &mut self.player_view.camera);
        self.slime.update(queue, dt);

        let erase = self.slime.exclusion();
        let radius_sq = erase.radius * erase.radius;
        let mut newly_cut = Vec::new();
        for (index, inst) in self.store.instances().iter().enumerate() {
            let index = index as u32;
            if self.foliage.is_cut(index) {
                continue;
            }
            if erase.center.distance_squared(inst.position()) <= radius_sq {
                newly_cut.push(index);
            }
        }
        if !newly_cut.is_empty() {
            log::debug!("slime cut {} instances", newly_cut.len());
            self.foliage.mark_cut(queue, &newly_cut);
        }
    }

    /// Run the per-frame pipeline and present. Failure modes are surface
    /// loss (reconfigure and skip the frame) — nothing propagates out.
    pub fn render(&mut self, ctx: &mut GraphicsContext) {
        let frame = match ctx.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let (w, h) = ctx.size();
                ctx.resize(w, h);
                return;
            }
            Err(err) => {
                log::error!("surface error: {err}");
                return;
            }
        };
        let surface_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.god_view.upload(&ctx.queue);
        self.player_view.upload(&ctx.queue);
        self.overlay
            .update(&ctx.queue, self.player_view.camera.view_proj_matrix());

        // Culling runs against the player frustum; both viewports draw the
        // surviving set.
        let mut spec = CullSpec::new(
            self.player_view.camera.view_proj_matrix(),
            self.player_view.camera.view_origin(),
        );
        spec.max_draw_distance = self.config.max_draw_distance;
        spec.instance_radius = self.config.instance_radius;
        spec.exclusion = self.slime.exclusion();

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        self.foliage.encode_cull(&mut encoder, &ctx.queue, &spec);

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.02,
                            g: 0.03,
                            b: 0.05,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let half_width = (self.frame_width / 2) as f32;
            let height = self.frame_height as f32;

            // God view, left half.
            pass.set_viewport(0.0, 0.0, half_width, height, 0.0, 1.0);
            self.draw_view(&mut pass, ViewKind::God);

            // Player view, right half. Viewports are disjoint, so the
            // shared depth attachment needs no mid-pass clear.
            pass.set_viewport(half_width, 0.0, half_width, height, 0.0, 1.0);
            self.draw_view(&mut pass, ViewKind::Player);
        }

        ctx.queue.submit(Some(encoder.finish()));
        frame.present();
    }

    fn draw_view<'pass>(&'pass self, pass: &mut wgpu::RenderPass<'pass>, kind: ViewKind) {
        let view = match kind {
            ViewKind::God => &self.god_view,
            ViewKind::Player => &self.player_view,
        };
        self.ground.draw(pass, &view.bind_group);
        self.foliage.draw(pass, &view.bind_group);
        self.slime.draw(pass, &view.bind_group);
        self.overlay.draw(pass, &view.bind_group);
    }

    // ----------------------------------------------------------------------
    // Input plumbing, forwarded from the window layer
    // ----------------------------------------------------------------------

    /// 0:W 1:S 2:A 3:D.
    pub fn set_player_move_state(&mut self, direction: usize, pressed: bool) {
        self.walker.set_move_state(direction, pressed);
    }

    pub fn god_view_rotate(&mut self, dx: f32, dy: f32) {
        self.orbit.rotate(dx, dy);
    }

    pub fn god_view_pan(&mut self, dx: f32, dy: f32) {
        self.orbit.pan(dx, dy);
    }

    pub fn god_view_zoom(&mut self, delta: f32) {
        self.orbit.zoom(delta);
    }

    pub fn instance_total(&self) -> u32 {
        self.store.total()
    }
}

#[derive(Copy, Clone)]
enum ViewKind {
    God,
    Player,
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("scene_depth"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
