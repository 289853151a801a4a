// src/config.rs
//! Startup configuration, loaded once from a TOML file.
//!
//! Everything here is read at init and never mutated afterwards; per-frame
//! code receives plain copies of the values it needs.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;

/// Number of foliage types. The instance partitioning, the texture array
/// layer count and the indirect command table all share this constant.
pub const FOLIAGE_TYPE_COUNT: usize = 3;

/// Top-level render configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Initial window size in physical pixels.
    pub window_size: [u32; 2],
    /// Foliage past this distance from the culling camera is dropped even
    /// when it is inside the frustum. Matches the ground grid fade so the
    /// cutoff is not visible as a hard line.
    pub max_draw_distance: f32,
    /// Radius of the slime's erasure sphere.
    pub erase_radius: f32,
    /// Conservative bounding radius used for the per-instance frustum test.
    pub instance_radius: f32,
    /// One mesh per foliage type, in type-id order.
    pub foliage_meshes: [PathBuf; FOLIAGE_TYPE_COUNT],
    /// One albedo texture per foliage type, in type-id order.
    pub foliage_textures: [PathBuf; FOLIAGE_TYPE_COUNT],
    /// One spatial-sample point set per foliage type, in type-id order.
    pub sample_files: [PathBuf; FOLIAGE_TYPE_COUNT],
    /// The slime's mesh and albedo texture.
    pub slime_mesh: PathBuf,
    pub slime_texture: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_size: [1280, 720],
            max_draw_distance: 130.0,
            erase_radius: 2.0,
            instance_radius: 2.0,
            foliage_meshes: [
                PathBuf::from("assets/models/grass_b.glb"),
                PathBuf::from("assets/models/bush01.glb"),
                PathBuf::from("assets/models/bush05.glb"),
            ],
            foliage_textures: [
                PathBuf::from("assets/textures/grass_b_albedo.png"),
                PathBuf::from("assets/textures/bush01.png"),
                PathBuf::from("assets/textures/bush05.png"),
            ],
            sample_files: [
                PathBuf::from("assets/samples/poisson_grass.ss2"),
                PathBuf::from("assets/samples/poisson_bush01.ss2"),
                PathBuf::from("assets/samples/poisson_bush05.ss2"),
            ],
            slime_mesh: PathBuf::from("assets/models/slime.glb"),
            slime_texture: PathBuf::from("assets/textures/slime_albedo.jpg"),
        }
    }
}

impl RenderConfig {
    /// Load from a TOML file. A missing file is not an error: defaults apply
    /// and a note is logged, matching how asset fallbacks behave elsewhere.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(toml::from_str(&text)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("no config at {:?}, using defaults", path);
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = RenderConfig::default();
        assert_eq!(cfg.window_size, [1280, 720]);
        assert!(cfg.max_draw_distance > 0.0);
        assert!(cfg.erase_radius > 0.0);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: RenderConfig = toml::from_str("max_draw_distance = 99.5").unwrap();
        assert_eq!(cfg.max_draw_distance, 99.5);
        assert_eq!(cfg.window_size, [1280, 720]);
        assert_eq!(cfg.foliage_meshes.len(), FOLIAGE_TYPE_COUNT);
    }
}
