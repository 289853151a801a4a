// src/texture.rs
//! Texture loading: the foliage albedo array and single 2D textures.
//!
//! A texture that fails to decode falls back to a neutral 1x1 placeholder
//! with a logged warning; texture trouble never aborts initialization.

use std::path::Path;

use image::GenericImageView;

use crate::error::Result;

const PLACEHOLDER_PIXEL: [u8; 4] = [180, 180, 180, 255];

/// A 2D-array texture with one layer per foliage type, sampled by
/// `layer == instance type id` in the foliage shader.
pub struct TextureArray {
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    _texture: wgpu::Texture,
}

impl TextureArray {
    /// Load `paths` into the layers of one array texture. All layers share
    /// the extent of the first image that decodes; failed or mismatched
    /// images become flat placeholder layers.
    pub fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        paths: &[impl AsRef<Path>],
    ) -> Result<Self> {
        let decoded: Vec<Option<image::DynamicImage>> = paths
            .iter()
            .map(|path| match image::open(path.as_ref()) {
                Ok(img) => Some(img),
                Err(err) => {
                    log::warn!(
                        "texture {:?} failed to load ({}), using placeholder",
                        path.as_ref(),
                        err
                    );
                    None
                }
            })
            .collect();

        let (width, height) = decoded
            .iter()
            .flatten()
            .next()
            .map(|img| img.dimensions())
            .unwrap_or((1, 1));

        let layer_count = paths.len().max(1) as u32;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("foliage_albedo_array"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: layer_count,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, maybe_img) in decoded.iter().enumerate() {
            let rgba = match maybe_img {
                Some(img) if img.dimensions() == (width, height) => img.to_rgba8().into_raw(),
                Some(img) => {
                    log::warn!(
                        "texture layer {} is {:?}, expected {}x{}; using placeholder",
                        layer,
                        img.dimensions(),
                        width,
                        height
                    );
                    flat_pixels(width, height)
                }
                None => flat_pixels(width, height),
            };
            write_layer(queue, &texture, layer as u32, width, height, &rgba);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("foliage_albedo_array_view"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("foliage_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            view,
            sampler,
            _texture: texture,
        })
    }
}

/// A plain 2D texture (the slime albedo).
pub struct Texture2d {
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    _texture: wgpu::Texture,
}

impl Texture2d {
    /// Load a single image, falling back to a 1x1 placeholder on failure.
    pub fn load_or_placeholder(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
    ) -> Self {
        let (width, height, rgba) = match image::open(path) {
            Ok(img) => {
                let (w, h) = img.dimensions();
                (w, h, img.to_rgba8().into_raw())
            }
            Err(err) => {
                log::warn!("texture {:?} failed to load ({}), using placeholder", path, err);
                (1, 1, PLACEHOLDER_PIXEL.to_vec())
            }
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("texture_2d"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        write_layer(queue, &texture, 0, width, height, &rgba);

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("texture_2d_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            view,
            sampler,
            _texture: texture,
        }
    }
}

fn flat_pixels(width: u32, height: u32) -> Vec<u8> {
    PLACEHOLDER_PIXEL.repeat((width * height) as usize)
}

fn write_layer(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    layer: u32,
    width: u32,
    height: u32,
    rgba: &[u8],
) {
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}
