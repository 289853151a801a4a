// src/instances.rs
//! The instance store: every placed foliage object, flat and immutable.
//!
//! Instances are concatenated in type order so each type occupies one
//! contiguous range. The culling shader relies on that partitioning to
//! attribute a linear instance index to its type without an extra lookup.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::config::FOLIAGE_TYPE_COUNT;
use crate::samples::SampleSource;

/// One placed instance. Matches the WGSL `PlantInstance` struct and the
/// record layout of both the source and visible GPU buffers: xyz position,
/// w carries the type id as a float.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PlantInstance {
    pub position_and_type: [f32; 4],
}

impl PlantInstance {
    pub fn new(position: Vec3, type_id: u32) -> Self {
        Self {
            position_and_type: [position.x, position.y, position.z, type_id as f32],
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(
            self.position_and_type[0],
            self.position_and_type[1],
            self.position_and_type[2],
        )
    }

    pub fn type_id(&self) -> u32 {
        self.position_and_type[3] as u32
    }
}

/// Contiguous slice of the instance array belonging to one type.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TypeRange {
    pub first_instance: u32,
    pub instance_count: u32,
}

/// Flat collection of all instances, partitioned by type. Built once at
/// load time; the culling pipeline only ever reads it.
pub struct InstanceStore {
    instances: Vec<PlantInstance>,
    ranges: [TypeRange; FOLIAGE_TYPE_COUNT],
}

impl InstanceStore {
    /// Concatenate one sample source per type, in type-id order. An empty
    /// source (e.g. a file that failed to load) contributes a zero-count
    /// range with a valid offset.
    pub fn load(sources: &[&dyn SampleSource; FOLIAGE_TYPE_COUNT]) -> Self {
        let total: usize = sources.iter().map(|s| s.len()).sum();
        let mut instances = Vec::with_capacity(total);
        let mut ranges = [TypeRange::default(); FOLIAGE_TYPE_COUNT];

        let mut offset = 0u32;
        for (type_id, source) in sources.iter().enumerate() {
            let count = source.len() as u32;
            ranges[type_id] = TypeRange {
                first_instance: offset,
                instance_count: count,
            };
            for i in 0..source.len() {
                instances.push(PlantInstance::new(source.position(i), type_id as u32));
            }
            offset += count;
        }

        log::info!(
            "instance store: {} instances ({:?})",
            instances.len(),
            ranges.map(|r| r.instance_count)
        );

        Self { instances, ranges }
    }

    pub fn instances(&self) -> &[PlantInstance] {
        &self.instances
    }

    pub fn ranges(&self) -> &[TypeRange; FOLIAGE_TYPE_COUNT] {
        &self.ranges
    }

    pub fn total(&self) -> u32 {
        self.instances.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::InMemorySamples;

    fn grid(count: usize, z: f32) -> InMemorySamples {
        InMemorySamples((0..count).map(|i| Vec3::new(i as f32, 0.0, z)).collect())
    }

    #[test]
    fn ranges_partition_contiguously() {
        let a = grid(10, 0.0);
        let b = grid(5, 1.0);
        let c = grid(2, 2.0);
        let store = InstanceStore::load(&[&a, &b, &c]);

        assert_eq!(store.total(), 17);
        let ranges = store.ranges();
        assert_eq!(ranges[0], TypeRange { first_instance: 0, instance_count: 10 });
        assert_eq!(ranges[1], TypeRange { first_instance: 10, instance_count: 5 });
        assert_eq!(ranges[2], TypeRange { first_instance: 15, instance_count: 2 });
        // The partition invariant: each range starts where the last ended.
        for i in 0..FOLIAGE_TYPE_COUNT - 1 {
            assert_eq!(
                ranges[i].first_instance + ranges[i].instance_count,
                ranges[i + 1].first_instance
            );
        }
    }

    #[test]
    fn instances_carry_their_type() {
        let a = grid(2, 0.0);
        let b = grid(0, 1.0);
        let c = grid(3, 2.0);
        let store = InstanceStore::load(&[&a, &b, &c]);

        assert_eq!(store.instances()[0].type_id(), 0);
        assert_eq!(store.instances()[2].type_id(), 2);
        assert_eq!(store.instances()[2].position().z, 2.0);
    }

    #[test]
    fn empty_source_yields_zero_count_range_with_valid_offset() {
        let a = grid(4, 0.0);
        let empty = InMemorySamples(Vec::new());
        let c = grid(3, 2.0);
        let store = InstanceStore::load(&[&a, &empty, &c]);

        let ranges = store.ranges();
        assert_eq!(ranges[1], TypeRange { first_instance: 4, instance_count: 0 });
        assert_eq!(ranges[2].first_instance, 4);
        assert_eq!(store.total(), 7);
    }

    #[test]
    fn instance_layout_is_16_bytes() {
        assert_eq!(std::mem::size_of::<PlantInstance>(), 16);
    }
}
