// src/context.rs
//! GPU bootstrap: instance, adapter, device, queue and the window surface.
//!
//! Everything downstream borrows the device and queue from here; nothing in
//! the crate holds process-wide GPU state.

use std::sync::Arc;

use winit::window::Window;

use crate::error::{EngineError, Result};

/// Depth format shared by every pipeline that renders into the scene pass.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Features the indirect-draw pipeline cannot run without.
/// `MULTI_DRAW_INDIRECT` backs the single foliage submission and
/// `INDIRECT_FIRST_INSTANCE` lets each command's `first_instance` select the
/// type's slice of the visible-instance buffer.
pub const REQUIRED_FEATURES: wgpu::Features = wgpu::Features::MULTI_DRAW_INDIRECT
    .union(wgpu::Features::INDIRECT_FIRST_INSTANCE);

/// Owns the wgpu handles for one window.
pub struct GraphicsContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
}

impl GraphicsContext {
    /// Create the full wgpu stack for `window`. Fails if no adapter exists
    /// or the adapter cannot provide [`REQUIRED_FEATURES`] — there is no
    /// fallback path for the indirect pipeline.
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(EngineError::AdapterNotFound)?;

        let missing = REQUIRED_FEATURES - adapter.features();
        if !missing.is_empty() {
            return Err(EngineError::MissingFeatures(missing));
        }

        let info = adapter.get_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("verdant_device"),
                    required_features: REQUIRED_FEATURES,
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let size = window.inner_size();
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            surface,
            config,
        })
    }

    /// Reconfigure the surface after a window resize. Zero sizes are clamped
    /// because minimized windows report 0x0.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }
}
