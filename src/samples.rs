// src/samples.rs
//! Spatial sample sources: the point sets that place foliage instances.
//!
//! The on-disk `.ss2` layout is a little-endian `u32` sample count followed
//! by `count * 3` `f32` positions. A file that is missing or truncated loads
//! as an empty source with a logged warning; downstream code treats a
//! zero-count type as a valid no-op, never as an error.

use std::io::Read;
use std::path::Path;

use glam::Vec3;

use crate::error::{EngineError, Result};

/// A set of world-space sample positions for one foliage type.
pub trait SampleSource {
    fn len(&self) -> usize;
    fn position(&self, index: usize) -> Vec3;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Samples imported from a binary `.ss2` file.
pub struct SpatialSampleFile {
    positions: Vec<Vec3>,
}

impl SpatialSampleFile {
    /// Strict import: any I/O or framing problem is an error.
    pub fn import(path: &Path) -> Result<Self> {
        let mut file = std::fs::File::open(path)?;

        let mut header = [0u8; 4];
        file.read_exact(&mut header)?;
        let count = u32::from_le_bytes(header) as usize;

        let mut payload = vec![0u8; count * 3 * 4];
        file.read_exact(&mut payload).map_err(|_| {
            EngineError::msg(format!(
                "{:?}: truncated sample file, expected {} samples",
                path, count
            ))
        })?;

        let mut positions = Vec::with_capacity(count);
        for record in payload.chunks_exact(12) {
            let x = f32::from_le_bytes(record[0..4].try_into().unwrap());
            let y = f32::from_le_bytes(record[4..8].try_into().unwrap());
            let z = f32::from_le_bytes(record[8..12].try_into().unwrap());
            positions.push(Vec3::new(x, y, z));
        }

        Ok(Self { positions })
    }

    /// Non-fatal import: a failed load becomes an empty source and a
    /// warning. This is the variant the scene uses.
    pub fn import_or_empty(path: &Path) -> Self {
        match Self::import(path) {
            Ok(samples) => {
                log::info!("loaded {} samples from {:?}", samples.len(), path);
                samples
            }
            Err(err) => {
                log::warn!("failed to load samples from {:?}: {}", path, err);
                Self {
                    positions: Vec::new(),
                }
            }
        }
    }
}

impl SampleSource for SpatialSampleFile {
    fn len(&self) -> usize {
        self.positions.len()
    }

    fn position(&self, index: usize) -> Vec3 {
        self.positions[index]
    }
}

/// In-memory sample source, used by tests and procedural setups.
pub struct InMemorySamples(pub Vec<Vec3>);

impl SampleSource for InMemorySamples {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn position(&self, index: usize) -> Vec3 {
        self.0[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_ss2(path: &Path, positions: &[[f32; 3]]) {
        let mut bytes = (positions.len() as u32).to_le_bytes().to_vec();
        for p in positions {
            for component in p {
                bytes.extend_from_slice(&component.to_le_bytes());
            }
        }
        std::fs::File::create(path)
            .unwrap()
            .write_all(&bytes)
            .unwrap();
    }

    #[test]
    fn round_trips_positions() {
        let dir = std::env::temp_dir();
        let path = dir.join("verdant_samples_ok.ss2");
        write_ss2(&path, &[[1.0, 2.0, 3.0], [-4.0, 0.5, 9.0]]);

        let samples = SpatialSampleFile::import(&path).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples.position(0), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(samples.position(1), Vec3::new(-4.0, 0.5, 9.0));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn truncated_file_is_an_error_but_loads_empty() {
        let dir = std::env::temp_dir();
        let path = dir.join("verdant_samples_truncated.ss2");
        // Header claims 10 samples, payload holds one.
        let mut bytes = 10u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 12]);
        std::fs::write(&path, &bytes).unwrap();

        assert!(SpatialSampleFile::import(&path).is_err());
        let fallback = SpatialSampleFile::import_or_empty(&path);
        assert!(fallback.is_empty());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_loads_empty() {
        let fallback =
            SpatialSampleFile::import_or_empty(Path::new("/definitely/not/here.ss2"));
        assert_eq!(fallback.len(), 0);
    }
}
