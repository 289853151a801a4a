// src/indirect.rs
//! Indirect draw command table.
//!
//! The command records live in GPU memory and are interpreted directly by
//! the multi-draw call, so their layout is a wire format: five 32-bit
//! fields, no padding, matching wgpu's `DrawIndexedIndirectArgs`.

use bytemuck::{Pod, Zeroable};

use crate::config::FOLIAGE_TYPE_COUNT;
use crate::instances::TypeRange;
use crate::mesh::MeshRange;

/// One indexed indirect draw command (bit-exact GPU layout).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedIndirect {
    /// Number of indices to draw. Fixed at build time.
    pub index_count: u32,
    /// Number of instances to draw. Rewritten every frame by the
    /// command-update pass from the culling counters.
    pub instance_count: u32,
    /// First index within the merged index buffer. Fixed at build time.
    pub first_index: u32,
    /// Added to each index value before vertex fetch. Fixed at build time.
    pub base_vertex: i32,
    /// The type's offset into the *visible* instance buffer (not the source
    /// buffer). Fixed at build time.
    pub first_instance: u32,
}

pub const COMMAND_STRIDE: u64 = std::mem::size_of::<DrawIndexedIndirect>() as u64;

/// Build the initial command table: geometry ranges from the merged mesh,
/// instance ranges from the store. `instance_count` starts at zero — the
/// first culling pass of a frame decides what is actually drawn.
pub fn build_commands(
    mesh_ranges: &[MeshRange; FOLIAGE_TYPE_COUNT],
    type_ranges: &[TypeRange; FOLIAGE_TYPE_COUNT],
) -> [DrawIndexedIndirect; FOLIAGE_TYPE_COUNT] {
    std::array::from_fn(|t| DrawIndexedIndirect {
        index_count: mesh_ranges[t].index_count,
        instance_count: 0,
        first_index: mesh_ranges[t].first_index,
        base_vertex: mesh_ranges[t].base_vertex as i32,
        first_instance: type_ranges[t].first_instance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_layout_is_bit_exact() {
        // Five 32-bit fields, no implicit padding. The multi-draw call
        // steps through the table at exactly this stride.
        assert_eq!(COMMAND_STRIDE, 20);
        assert_eq!(std::mem::size_of::<DrawIndexedIndirect>(), 20);
        assert_eq!(std::mem::align_of::<DrawIndexedIndirect>(), 4);

        let cmd = DrawIndexedIndirect {
            index_count: 1,
            instance_count: 2,
            first_index: 3,
            base_vertex: -4,
            first_instance: 5,
        };
        let bytes: &[u8] = bytemuck::bytes_of(&cmd);
        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &2u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &3u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &(-4i32).to_le_bytes());
        assert_eq!(&bytes[16..20], &5u32.to_le_bytes());
    }

    #[test]
    fn commands_point_into_visible_buffer() {
        let mesh_ranges = [
            MeshRange { base_vertex: 0, first_index: 0, index_count: 12 },
            MeshRange { base_vertex: 100, first_index: 12, index_count: 36 },
            MeshRange { base_vertex: 150, first_index: 48, index_count: 24 },
        ];
        let type_ranges = [
            TypeRange { first_instance: 0, instance_count: 10 },
            TypeRange { first_instance: 10, instance_count: 5 },
            TypeRange { first_instance: 15, instance_count: 2 },
        ];
        let commands = build_commands(&mesh_ranges, &type_ranges);

        for t in 0..FOLIAGE_TYPE_COUNT {
            assert_eq!(commands[t].index_count, mesh_ranges[t].index_count);
            assert_eq!(commands[t].first_index, mesh_ranges[t].first_index);
            assert_eq!(commands[t].base_vertex, mesh_ranges[t].base_vertex as i32);
            // first_instance addresses the compacted visible buffer, which
            // shares the source buffer's per-type offsets.
            assert_eq!(commands[t].first_instance, type_ranges[t].first_instance);
            assert_eq!(commands[t].instance_count, 0);
        }
    }

    #[test]
    fn zero_count_type_builds_a_valid_noop_command() {
        let mesh_ranges = [
            MeshRange { base_vertex: 0, first_index: 0, index_count: 6 },
            MeshRange { base_vertex: 4, first_index: 6, index_count: 6 },
            MeshRange { base_vertex: 8, first_index: 12, index_count: 6 },
        ];
        let type_ranges = [
            TypeRange { first_instance: 0, instance_count: 4 },
            TypeRange { first_instance: 4, instance_count: 0 },
            TypeRange { first_instance: 4, instance_count: 3 },
        ];
        let commands = build_commands(&mesh_ranges, &type_ranges);
        // instance_count 0 with in-range offsets draws nothing and reads
        // nothing: a no-op, not an error.
        assert_eq!(commands[1].instance_count, 0);
        assert_eq!(commands[1].first_instance, 4);
        assert_eq!(commands[1].index_count, 6);
    }
}
