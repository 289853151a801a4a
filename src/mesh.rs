// src/mesh.rs
//! Mesh types and the merged-buffer builder.
//!
//! All foliage types share one vertex buffer and one index buffer so a
//! single multi-draw call can render every type. The builder records, per
//! type, where its geometry starts in the shared arenas; indices are
//! rebased at build time so `base_vertex`/`first_index` reproduce the
//! original per-type geometry exactly.

use std::path::PathBuf;

use bytemuck::{Pod, Zeroable};

use crate::config::FOLIAGE_TYPE_COUNT;
use crate::error::{EngineError, Result};

/// Interleaved vertex record shared by every mesh in the crate.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// CPU-side mesh as produced by the loaders.
pub struct MeshData {
    pub source: PathBuf,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Reject meshes the merged buffer cannot represent. This is a
    /// load-time configuration error, not a runtime condition.
    pub fn validate(&self) -> Result<()> {
        if self.vertices.is_empty() || self.indices.is_empty() {
            return Err(EngineError::EmptyMesh {
                path: self.source.clone(),
                vertices: self.vertices.len(),
                indices: self.indices.len(),
            });
        }
        Ok(())
    }
}

/// Per-type location of geometry inside the merged arenas.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MeshRange {
    pub base_vertex: u32,
    pub first_index: u32,
    pub index_count: u32,
}

/// One vertex arena + one index arena holding every foliage type.
#[derive(Debug)]
pub struct MergedMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub ranges: [MeshRange; FOLIAGE_TYPE_COUNT],
}

impl MergedMesh {
    /// Concatenate the per-type meshes. Vertices for type `i` start at
    /// `base_vertex[i]`; every index of type `i` is rewritten as
    /// `original + base_vertex[i]` and placed starting at `first_index[i]`.
    pub fn build(meshes: &[MeshData; FOLIAGE_TYPE_COUNT]) -> Result<Self> {
        for mesh in meshes {
            mesh.validate()?;
        }

        let total_vertices: usize = meshes.iter().map(|m| m.vertices.len()).sum();
        let total_indices: usize = meshes.iter().map(|m| m.indices.len()).sum();

        let mut vertices = Vec::with_capacity(total_vertices);
        let mut indices = Vec::with_capacity(total_indices);
        let mut ranges = [MeshRange::default(); FOLIAGE_TYPE_COUNT];

        for (type_id, mesh) in meshes.iter().enumerate() {
            let base_vertex = vertices.len() as u32;
            let first_index = indices.len() as u32;

            vertices.extend_from_slice(&mesh.vertices);
            indices.extend(mesh.indices.iter().map(|&index| index + base_vertex));

            ranges[type_id] = MeshRange {
                base_vertex,
                first_index,
                index_count: mesh.indices.len() as u32,
            };
        }

        log::info!(
            "merged foliage mesh: {} vertices, {} indices",
            vertices.len(),
            indices.len()
        );

        Ok(Self {
            vertices,
            indices,
            ranges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_mesh(name: &str, vertex_count: usize, triangles: &[[u32; 3]]) -> MeshData {
        let vertices = (0..vertex_count)
            .map(|i| Vertex {
                position: [i as f32, 0.0, 0.0],
                normal: [0.0, 1.0, 0.0],
                uv: [0.0, 0.0],
            })
            .collect();
        MeshData {
            source: PathBuf::from(name),
            vertices,
            indices: triangles.iter().flatten().copied().collect(),
        }
    }

    #[test]
    fn base_vertices_accumulate() {
        let meshes = [
            flat_mesh("a", 100, &[[0, 1, 2]]),
            flat_mesh("b", 50, &[[0, 1, 2], [3, 4, 5]]),
            flat_mesh("c", 30, &[[7, 8, 9]]),
        ];
        let merged = MergedMesh::build(&meshes).unwrap();

        assert_eq!(merged.ranges[0].base_vertex, 0);
        assert_eq!(merged.ranges[1].base_vertex, 100);
        assert_eq!(merged.ranges[2].base_vertex, 150);
        assert_eq!(merged.ranges[0].first_index, 0);
        assert_eq!(merged.ranges[1].first_index, 3);
        assert_eq!(merged.ranges[2].first_index, 9);
        assert_eq!(merged.vertices.len(), 180);
    }

    #[test]
    fn original_triangles_re_derivable_from_merged_arenas() {
        let meshes = [
            flat_mesh("a", 100, &[[0, 1, 2]]),
            flat_mesh("b", 50, &[[0, 1, 2], [3, 4, 5]]),
            flat_mesh("c", 30, &[[7, 8, 9]]),
        ];
        let merged = MergedMesh::build(&meshes).unwrap();

        for (type_id, mesh) in meshes.iter().enumerate() {
            let range = merged.ranges[type_id];
            assert_eq!(range.index_count as usize, mesh.indices.len());
            for (k, &original_index) in mesh.indices.iter().enumerate() {
                let merged_index = merged.indices[(range.first_index as usize) + k];
                // Undoing the rebase must recover the original index...
                assert_eq!(merged_index - range.base_vertex, original_index);
                // ...and the vertex it points at must be the original vertex.
                assert_eq!(
                    merged.vertices[merged_index as usize],
                    mesh.vertices[original_index as usize]
                );
            }
        }
    }

    #[test]
    fn empty_mesh_is_rejected() {
        let meshes = [
            flat_mesh("a", 4, &[[0, 1, 2]]),
            flat_mesh("empty", 0, &[]),
            flat_mesh("c", 4, &[[0, 1, 2]]),
        ];
        let err = MergedMesh::build(&meshes).unwrap_err();
        assert!(matches!(err, EngineError::EmptyMesh { .. }));
    }

    #[test]
    fn mesh_with_vertices_but_no_indices_is_rejected() {
        let mesh = flat_mesh("no_indices", 12, &[]);
        assert!(mesh.validate().is_err());
    }
}
