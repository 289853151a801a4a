// src/error.rs
//! Error handling for the entire crate.
//!
//! One lightweight enum, `Send + Sync + 'static`, so every loader and GPU
//! setup path can propagate with `?`. Allocations only happen on error paths.

use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide error type.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EngineError {
    /// I/O errors (asset files, config file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// glTF import failures.
    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),

    /// Image decode failures.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// A mesh arrived with no vertices or no indices. The merged foliage
    /// buffer cannot represent it, so this is fatal at load time.
    #[error("mesh {path:?} is empty ({vertices} vertices, {indices} indices)")]
    EmptyMesh {
        path: PathBuf,
        vertices: usize,
        indices: usize,
    },

    /// A glTF file contained no primitive with a position attribute.
    #[error("no usable mesh primitive in {0:?}")]
    NoPrimitive(PathBuf),

    /// No compatible GPU adapter was found.
    #[error("no compatible GPU adapter")]
    AdapterNotFound,

    /// The adapter does not support a feature the renderer depends on.
    #[error("missing GPU features: {0:?}")]
    MissingFeatures(wgpu::Features),

    /// Device creation failed.
    #[error("device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    /// Surface creation failed.
    #[error("surface creation failed: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    /// Simple custom message.
    #[error("{0}")]
    Custom(String),
}

impl EngineError {
    /// Shorthand for a one-off message error.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// Crate-wide result alias.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;
