// src/gltf_loader.rs
//! glTF mesh import, reduced to what the merge step needs: positions,
//! normals, UVs and index topology from the first primitive that carries a
//! position attribute. Materials, skins and the node hierarchy are ignored.

use std::path::Path;

use crate::error::{EngineError, Result};
use crate::mesh::{MeshData, Vertex};

/// Import the first usable primitive of a `.glb`/`.gltf` file.
///
/// Missing normals default to +Y, missing UVs to (0, 0) — the same defaults
/// the renderer would produce for flat ground-cover geometry. A file with no
/// position data at all is an error; emptiness is checked again by
/// [`MeshData::validate`] at merge time.
pub fn load_mesh(path: &Path) -> Result<MeshData> {
    let (document, buffers, _images) = gltf::import(path)?;

    for mesh in document.meshes() {
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let positions: Vec<[f32; 3]> = positions.collect();

            let normals: Vec<[f32; 3]> = match reader.read_normals() {
                Some(iter) => iter.collect(),
                None => vec![[0.0, 1.0, 0.0]; positions.len()],
            };
            let uvs: Vec<[f32; 2]> = match reader.read_tex_coords(0) {
                Some(coords) => coords.into_f32().collect(),
                None => vec![[0.0, 0.0]; positions.len()],
            };

            let vertices: Vec<Vertex> = positions
                .iter()
                .enumerate()
                .map(|(i, &position)| Vertex {
                    position,
                    normal: normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                    uv: uvs.get(i).copied().unwrap_or([0.0, 0.0]),
                })
                .collect();

            let indices: Vec<u32> = match reader.read_indices() {
                Some(iter) => iter.into_u32().collect(),
                // Non-indexed primitive: synthesize a 1:1 index list so the
                // merged buffer can still rebase it.
                None => (0..vertices.len() as u32).collect(),
            };

            log::info!(
                "loaded mesh {:?}: {} vertices, {} indices",
                path,
                vertices.len(),
                indices.len()
            );

            return Ok(MeshData {
                source: path.to_path_buf(),
                vertices,
                indices,
            });
        }
    }

    Err(EngineError::NoPrimitive(path.to_path_buf()))
}
