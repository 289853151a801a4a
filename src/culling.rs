// src/culling.rs
//! GPU-driven instance culling.
//!
//! Two compute passes per culling sequence:
//! * **cull** — evaluates the visibility predicate for every instance and
//!   compacts survivors into the visible buffer, counting per type through
//!   atomic adds;
//! * **update** — patches each indirect command's `instance_count` from the
//!   final counters.
//!
//! The sequence is `RESET_COUNTERS -> CULL -> barrier -> UPDATE_COMMANDS ->
//! barrier -> DRAW`. Within one command encoder, wgpu orders passes by
//! submission and inserts the storage/indirect hazards between them, so the
//! two barriers fall out of encoding the passes in this order. The draw
//! side asserts the sequence through [`CullPipeline::stage`].

use bytemuck::{Pod, Zeroable};

use crate::config::FOLIAGE_TYPE_COUNT;
use crate::frustum::{classify, CullSpec};
use crate::instances::{PlantInstance, TypeRange};

const INSTANCE_STRIDE: u64 = std::mem::size_of::<PlantInstance>() as u64;

/// Uniform block consumed by `shaders/cull.wgsl`. Field order and padding
/// must match the WGSL struct exactly.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct CullParams {
    pub planes: [[f32; 4]; 6],
    /// xyz = camera position, w = max draw distance (<= 0 disables).
    pub camera_and_dist: [f32; 4],
    /// xyz = exclusion center, w = radius (< 0 disables).
    pub exclusion: [f32; 4],
    /// Per-type offsets into the visible buffer; w unused.
    pub type_starts: [u32; 4],
    pub total_instances: u32,
    pub instance_radius: f32,
    pub _pad: [f32; 2],
}

impl CullParams {
    pub fn new(spec: &CullSpec, type_starts: [u32; 3], total_instances: u32) -> Self {
        Self {
            planes: spec.frustum.planes.map(|p| p.to_array()),
            camera_and_dist: [
                spec.camera_pos.x,
                spec.camera_pos.y,
                spec.camera_pos.z,
                spec.max_draw_distance,
            ],
            exclusion: [
                spec.exclusion.center.x,
                spec.exclusion.center.y,
                spec.exclusion.center.z,
                spec.exclusion.radius,
            ],
            type_starts: [type_starts[0], type_starts[1], type_starts[2], 0],
            total_instances,
            instance_radius: spec.instance_radius,
            _pad: [0.0; 2],
        }
    }
}

/// Where a culling sequence currently stands. The visible buffer and the
/// command table are only meaningful for drawing while `Culled`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PassStage {
    Idle,
    Culled,
}

/// Owns the frame-scoped culling resources and both compute pipelines.
///
/// One culling sequence per command-encoder submission: the parameter
/// uniform is written through the queue, and queued writes land before the
/// encoder's passes execute. Running two sequences inside one submission
/// would make the second write win for both. The dual-viewport renderer
/// culls once per frame against the player frustum, which both views draw.
pub struct CullPipeline {
    params_buffer: wgpu::Buffer,
    visible_buffer: wgpu::Buffer,
    counter_buffer: wgpu::Buffer,
    cut_mask_buffer: wgpu::Buffer,
    cut_mask: Vec<u32>,

    cull_pipeline: wgpu::ComputePipeline,
    cull_bind_group: wgpu::BindGroup,
    update_pipeline: wgpu::ComputePipeline,
    update_bind_group: wgpu::BindGroup,

    type_starts: [u32; 3],
    total_instances: u32,
    stage: PassStage,
}

impl CullPipeline {
    /// `source_buffer` holds every [`PlantInstance`]; `command_buffer` is
    /// the indirect table whose counts the update pass rewrites. Both are
    /// owned by the foliage renderer and only bound here.
    pub fn new(
        device: &wgpu::Device,
        source_buffer: &wgpu::Buffer,
        command_buffer: &wgpu::Buffer,
        type_ranges: &[TypeRange; FOLIAGE_TYPE_COUNT],
        total_instances: u32,
    ) -> Self {
        // Worst case every instance survives, so the visible buffer matches
        // the source size and no overflow path exists. Never zero-sized:
        // wgpu rejects empty bindings.
        let visible_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("foliage_visible_instances"),
            size: (total_instances.max(1) as u64) * INSTANCE_STRIDE,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let counter_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("foliage_type_counters"),
            size: (FOLIAGE_TYPE_COUNT * std::mem::size_of::<u32>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let cut_mask = vec![0u32; total_instances.max(1) as usize];
        let cut_mask_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("foliage_cut_mask"),
            size: (cut_mask.len() * std::mem::size_of::<u32>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cull_params"),
            size: std::mem::size_of::<CullParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // ------------------------------------------------------------------
        // Cull pass
        // ------------------------------------------------------------------
        let cull_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("cull_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/cull.wgsl").into()),
        });

        let storage = |read_only| wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        };
        let cull_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("cull_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: storage(true),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: storage(false),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: storage(false),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: storage(true),
                    count: None,
                },
            ],
        });
        let cull_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("cull_bind_group"),
            layout: &cull_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: source_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: visible_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: counter_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: cut_mask_buffer.as_entire_binding(),
                },
            ],
        });
        let cull_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("cull_pipeline_layout"),
                bind_group_layouts: &[&cull_layout],
                push_constant_ranges: &[],
            });
        let cull_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("cull_pipeline"),
            layout: Some(&cull_pipeline_layout),
            module: &cull_shader,
            entry_point: "main",
            compilation_options: Default::default(),
            cache: None,
        });

        // ------------------------------------------------------------------
        // Command-update pass
        // ------------------------------------------------------------------
        let update_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("update_cmd_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/update_cmd.wgsl").into()),
        });
        let update_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("update_cmd_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: storage(true),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: storage(false),
                    count: None,
                },
            ],
        });
        let update_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("update_cmd_bind_group"),
            layout: &update_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: counter_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: command_buffer.as_entire_binding(),
                },
            ],
        });
        let update_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("update_cmd_pipeline_layout"),
                bind_group_layouts: &[&update_layout],
                push_constant_ranges: &[],
            });
        let update_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("update_cmd_pipeline"),
            layout: Some(&update_pipeline_layout),
            module: &update_shader,
            entry_point: "main",
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            params_buffer,
            visible_buffer,
            counter_buffer,
            cut_mask_buffer,
            cut_mask,
            cull_pipeline,
            cull_bind_group,
            update_pipeline,
            update_bind_group,
            type_starts: std::array::from_fn(|t| type_ranges[t].first_instance),
            total_instances,
            stage: PassStage::Idle,
        }
    }

    /// Encode one full culling sequence into `encoder`.
    pub fn encode(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        spec: &CullSpec,
    ) {
        let params = CullParams::new(spec, self.type_starts, self.total_instances);
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        // RESET_COUNTERS
        encoder.clear_buffer(&self.counter_buffer, 0, None);

        // CULL
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("cull_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.cull_pipeline);
            pass.set_bind_group(0, &self.cull_bind_group, &[]);
            pass.dispatch_workgroups(self.total_instances.div_ceil(256), 1, 1);
        }

        // Pass boundary: the update pass observes the final counter values.

        // UPDATE_COMMANDS
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("update_cmd_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.update_pipeline);
            pass.set_bind_group(0, &self.update_bind_group, &[]);
            pass.dispatch_workgroups(1, 1, 1);
        }

        // Second boundary to DRAW happens when the render pass begins.
        self.stage = PassStage::Culled;
    }

    /// Permanently erase instances. Writes go through the queue and land
    /// before the next submitted culling sequence reads the mask.
    pub fn mark_cut(&mut self, queue: &wgpu::Queue, indices: &[u32]) {
        for &index in indices {
            let slot = index as usize;
            if slot >= self.cut_mask.len() || self.cut_mask[slot] != 0 {
                continue;
            }
            self.cut_mask[slot] = 1;
            queue.write_buffer(
                &self.cut_mask_buffer,
                (slot * std::mem::size_of::<u32>()) as u64,
                bytemuck::bytes_of(&1u32),
            );
        }
    }

    pub fn is_cut(&self, index: u32) -> bool {
        self.cut_mask
            .get(index as usize)
            .is_some_and(|&flag| flag != 0)
    }

    pub fn visible_buffer(&self) -> &wgpu::Buffer {
        &self.visible_buffer
    }

    pub fn stage(&self) -> PassStage {
        self.stage
    }
}

/// Host-side reference of the GPU compaction: same predicate, same output
/// layout, sequential slot assignment. The GPU pass may permute slots
/// within a type's range, so comparisons must treat each range as an
/// unordered multiset.
pub fn compact_on_host(
    instances: &[PlantInstance],
    ranges: &[TypeRange; FOLIAGE_TYPE_COUNT],
    cut_mask: &[u32],
    spec: &CullSpec,
) -> (Vec<PlantInstance>, [u32; FOLIAGE_TYPE_COUNT]) {
    let mut visible = vec![PlantInstance::new(glam::Vec3::ZERO, 0); instances.len()];
    let mut counts = [0u32; FOLIAGE_TYPE_COUNT];

    for (index, inst) in instances.iter().enumerate() {
        let cut = cut_mask.get(index).copied().unwrap_or(0) != 0;
        if !classify(inst.position(), cut, spec) {
            continue;
        }
        let type_id = (inst.type_id() as usize).min(FOLIAGE_TYPE_COUNT - 1);
        let slot = counts[type_id];
        visible[(ranges[type_id].first_instance + slot) as usize] = *inst;
        counts[type_id] += 1;
    }

    (visible, counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instances::InstanceStore;
    use crate::samples::InMemorySamples;
    use glam::{Mat4, Vec3};
    use std::collections::BTreeSet;

    #[test]
    fn cull_params_match_the_wgsl_layout() {
        // 6 planes (96) + camera (16) + exclusion (16) + starts (16) +
        // counts/radius/pad (16).
        assert_eq!(std::mem::size_of::<CullParams>(), 160);
    }

    /// Camera at origin looking down -Z; the far plane at 100 keeps the
    /// test points well inside unless placed outside on purpose.
    fn test_spec() -> CullSpec {
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);
        CullSpec::new(proj * view, Vec3::ZERO)
    }

    /// Three types with counts {10, 5, 2}: type 0 ahead of the camera,
    /// type 1 behind it (fully culled), type 2 ahead.
    fn three_type_store() -> InstanceStore {
        let ahead_a =
            InMemorySamples((0..10).map(|i| Vec3::new(0.0, i as f32 * 0.1, -10.0)).collect());
        let behind =
            InMemorySamples((0..5).map(|i| Vec3::new(0.0, i as f32 * 0.1, 50.0)).collect());
        let ahead_c =
            InMemorySamples((0..2).map(|i| Vec3::new(0.5, i as f32 * 0.1, -20.0)).collect());
        InstanceStore::load(&[&ahead_a, &behind, &ahead_c])
    }

    fn visible_sets(
        visible: &[PlantInstance],
        ranges: &[TypeRange; FOLIAGE_TYPE_COUNT],
        counts: &[u32; FOLIAGE_TYPE_COUNT],
    ) -> [BTreeSet<[u32; 4]>; FOLIAGE_TYPE_COUNT] {
        std::array::from_fn(|t| {
            let start = ranges[t].first_instance as usize;
            visible[start..start + counts[t] as usize]
                .iter()
                .map(|inst| inst.position_and_type.map(f32::to_bits))
                .collect()
        })
    }

    #[test]
    fn counts_respect_bounds() {
        let store = three_type_store();
        let cut = vec![0u32; store.total() as usize];
        let (_, counts) = compact_on_host(store.instances(), store.ranges(), &cut, &test_spec());

        let total: u32 = counts.iter().sum();
        assert!(total <= store.total());
        for t in 0..FOLIAGE_TYPE_COUNT {
            assert!(counts[t] <= store.ranges()[t].instance_count);
        }
    }

    #[test]
    fn frustum_excludes_exactly_the_back_type() {
        let store = three_type_store();
        let cut = vec![0u32; store.total() as usize];
        let (visible, counts) =
            compact_on_host(store.instances(), store.ranges(), &cut, &test_spec());

        assert_eq!(counts, [10, 0, 2]);
        // Each surviving type occupies a contiguous range at its offset.
        let sets = visible_sets(&visible, store.ranges(), &counts);
        assert_eq!(sets[0].len(), 10);
        assert_eq!(sets[1].len(), 0);
        assert_eq!(sets[2].len(), 2);
    }

    #[test]
    fn repeated_runs_are_idempotent() {
        let store = three_type_store();
        let cut = vec![0u32; store.total() as usize];
        let spec = test_spec();

        let (first_visible, first_counts) =
            compact_on_host(store.instances(), store.ranges(), &cut, &spec);
        let (second_visible, second_counts) =
            compact_on_host(store.instances(), store.ranges(), &cut, &spec);

        assert_eq!(first_counts, second_counts);
        let first_sets = visible_sets(&first_visible, store.ranges(), &first_counts);
        let second_sets = visible_sets(&second_visible, store.ranges(), &second_counts);
        assert_eq!(first_sets, second_sets);
    }

    #[test]
    fn zero_count_type_produces_zero_count() {
        let ahead = InMemorySamples(vec![Vec3::new(0.0, 0.0, -10.0); 4]);
        let empty = InMemorySamples(Vec::new());
        let also_ahead = InMemorySamples(vec![Vec3::new(1.0, 0.0, -10.0); 3]);
        let store = InstanceStore::load(&[&ahead, &empty, &also_ahead]);

        let cut = vec![0u32; store.total() as usize];
        let (_, counts) = compact_on_host(store.instances(), store.ranges(), &cut, &test_spec());
        assert_eq!(counts[1], 0);
        assert_eq!(counts, [4, 0, 3]);
    }

    #[test]
    fn exclusion_sphere_removes_centered_instance() {
        let store = three_type_store();
        let cut = vec![0u32; store.total() as usize];
        let mut spec = test_spec();
        // Centered exactly on the first type-0 instance.
        spec.exclusion = crate::frustum::ExclusionSphere {
            center: Vec3::new(0.0, 0.0, -10.0),
            radius: 0.05,
        };

        let (_, counts) = compact_on_host(store.instances(), store.ranges(), &cut, &spec);
        assert_eq!(counts, [9, 0, 2]);
    }

    #[test]
    fn command_table_reflects_final_counts() {
        use crate::indirect::build_commands;
        use crate::mesh::MeshRange;

        let store = three_type_store();
        let cut = vec![0u32; store.total() as usize];
        let (_, counts) = compact_on_host(store.instances(), store.ranges(), &cut, &test_spec());

        let mesh_ranges = [
            MeshRange { base_vertex: 0, first_index: 0, index_count: 12 },
            MeshRange { base_vertex: 8, first_index: 12, index_count: 12 },
            MeshRange { base_vertex: 16, first_index: 24, index_count: 12 },
        ];
        let mut commands = build_commands(&mesh_ranges, store.ranges());
        // What the update pass does: write each counter into its command.
        for t in 0..FOLIAGE_TYPE_COUNT {
            commands[t].instance_count = counts[t];
        }

        assert_eq!(commands.map(|c| c.instance_count), [10, 0, 2]);
        let drawn: u32 = commands.iter().map(|c| c.instance_count).sum();
        assert_eq!(drawn, 12);
        // Geometry fields stay untouched.
        for t in 0..FOLIAGE_TYPE_COUNT {
            assert_eq!(commands[t].index_count, mesh_ranges[t].index_count);
            assert_eq!(commands[t].first_instance, store.ranges()[t].first_instance);
        }
    }

    #[test]
    fn cut_mask_removes_instances_across_frames() {
        let store = three_type_store();
        let mut cut = vec![0u32; store.total() as usize];
        cut[0] = 1;
        cut[1] = 1;

        let (_, counts) = compact_on_host(store.instances(), store.ranges(), &cut, &test_spec());
        assert_eq!(counts, [8, 0, 2]);
    }
}
