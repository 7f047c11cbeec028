//! # Mip-Mapped Texture
//!
//! GPU side of mip generation. [`MipTexture`] creates an `Rgba8Unorm` texture with a full mip
//! chain, fills every level through [`QueueTextureSink`], and pairs it with a view covering all
//! levels and a trilinear sampler.
//!
//! The viewer does not decode image files; [`checkerboard`] produces the base image
//! procedurally.

use crate::error::{Error, Result};
use crate::mipmap::{self, Image, MipUpload, TextureUploadSink};

/// Uploads mip levels into a `wgpu::Texture` with `Queue::write_texture`.
///
/// Each upload is checked against the texture before anything is queued: the level must exist,
/// its extent must match the texture's extent at that level, and the pixel buffer must be
/// exactly `bytes_per_row * rows_per_image` bytes long.
pub struct QueueTextureSink<'a> {
    queue: &'a wgpu::Queue,
    texture: &'a wgpu::Texture,
}

impl<'a> QueueTextureSink<'a> {
    pub fn new(queue: &'a wgpu::Queue, texture: &'a wgpu::Texture) -> Self {
        Self { queue, texture }
    }
}

/// Checks `upload` against a 2D texture of `size` with `mip_level_count` levels.
///
/// The level must exist, its extent must equal the texture's extent at that level, and the
/// pixel buffer must be exactly `bytes_per_row * rows_per_image` bytes long.
pub fn check_upload(
    upload: &MipUpload<'_>,
    mip_level_count: u32,
    size: wgpu::Extent3d,
) -> Result<()> {
    if upload.mip_level >= mip_level_count {
        return Err(Error::SinkWrite(format!(
            "mip level {} is out of range for a texture with {mip_level_count} levels",
            upload.mip_level
        )));
    }

    let level_size = size.mip_level_size(upload.mip_level, wgpu::TextureDimension::D2);
    if (level_size.width, level_size.height) != (upload.width, upload.height) {
        return Err(Error::SinkWrite(format!(
            "mip level {} is {}x{}, upload is {}x{}",
            upload.mip_level, level_size.width, level_size.height, upload.width, upload.height
        )));
    }

    let expected = upload.bytes_per_row as usize * upload.rows_per_image as usize;
    if upload.pixels.len() != expected {
        return Err(Error::SinkWrite(format!(
            "mip level {} carries {} bytes, layout requires {expected}",
            upload.mip_level,
            upload.pixels.len()
        )));
    }
    Ok(())
}

/// Rejects base extents the device cannot allocate.
pub fn check_texture_extent(width: u32, height: u32, max_dimension: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimension { width, height });
    }
    if width > max_dimension || height > max_dimension {
        return Err(Error::TextureTooLarge {
            width,
            height,
            max_dimension,
        });
    }
    Ok(())
}

impl TextureUploadSink for QueueTextureSink<'_> {
    fn upload(&mut self, upload: MipUpload<'_>) -> Result<()> {
        check_upload(&upload, self.texture.mip_level_count(), self.texture.size())?;

        let [x, y, z] = upload.origin;
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: self.texture,
                mip_level: upload.mip_level,
                origin: wgpu::Origin3d { x, y, z },
                aspect: wgpu::TextureAspect::All,
            },
            upload.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(upload.bytes_per_row),
                rows_per_image: Some(upload.rows_per_image),
            },
            wgpu::Extent3d {
                width: upload.width,
                height: upload.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }
}

/// A sampled texture whose every mip level has been uploaded.
pub struct MipTexture {
    pub texture: wgpu::Texture,
    /// View over all mip levels.
    pub view: wgpu::TextureView,
    /// Linear filtering within and between mip levels.
    pub sampler: wgpu::Sampler,
    /// `(width, height)` of every level, level 0 first.
    pub extents: Vec<(u32, u32)>,
}

impl MipTexture {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Creates the texture for `image` and uploads its full mip chain.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimension`] for an empty image, [`Error::TextureTooLarge`] if an extent
    /// exceeds the device's `max_texture_dimension_2d`, or [`Error::SinkWrite`] if a level does
    /// not fit the texture.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, image: &Image) -> Result<Self> {
        check_texture_extent(
            image.width(),
            image.height(),
            device.limits().max_texture_dimension_2d,
        )?;

        let size = wgpu::Extent3d {
            width: image.width(),
            height: image.height(),
            depth_or_array_layers: 1,
        };
        let mip_level_count = mipmap::mip_level_count(size.width, size.height);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Mip Texture"),
            size,
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let uploaded = mipmap::generate(image, &mut QueueTextureSink::new(queue, &texture))?;
        log::info!(
            "Uploaded {uploaded} mip levels for a {}x{} texture",
            size.width,
            size.height
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Mip Texture View"),
            format: Some(Self::FORMAT),
            dimension: Some(wgpu::TextureViewDimension::D2),
            usage: None,
            aspect: wgpu::TextureAspect::All,
            base_mip_level: 0,
            mip_level_count: Some(mip_level_count),
            base_array_layer: 0,
            array_layer_count: Some(1),
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Mip Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            lod_min_clamp: 0.0,
            lod_max_clamp: 8.0,
            compare: None,
            anisotropy_clamp: 1,
            border_color: None,
        });

        let extents = (0..mip_level_count)
            .map(|level| {
                let level_size = size.mip_level_size(level, wgpu::TextureDimension::D2);
                (level_size.width, level_size.height)
            })
            .collect();

        Ok(Self {
            texture,
            view,
            sampler,
            extents,
        })
    }

    pub fn mip_level_count(&self) -> u32 {
        self.texture.mip_level_count()
    }
}

/// A `size` x `size` checkerboard with `cell`-texel squares.
///
/// Light squares carry a red/green gradient across the image so that minification blends
/// visibly between mip levels; dark squares are a flat grey.
pub fn checkerboard(size: u32, cell: u32) -> Image {
    let cell = cell.max(1);
    let span = u64::from(size.max(1));
    Image::from_fn(size, size, |x, y| {
        if (x / cell + y / cell) % 2 == 0 {
            let red = (u64::from(x) * 255 / span) as u8;
            let green = (u64::from(y) * 255 / span) as u8;
            [red, green, 160, 255]
        } else {
            [32, 32, 32, 255]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkerboard_alternates_cells() {
        let image = checkerboard(8, 2);
        assert_eq!((image.width(), image.height()), (8, 8));
        assert_eq!(image.texel(0, 0), Some([0, 0, 160, 255]));
        assert_eq!(image.texel(2, 0), Some([32, 32, 32, 255]));
        assert_eq!(image.texel(3, 3), Some([95, 95, 160, 255]));
        assert_eq!(image.texel(1, 2), Some([32, 32, 32, 255]));
    }

    #[test]
    fn checkerboard_chain_reaches_one_texel() {
        let mut levels = Vec::new();
        let count = mipmap::generate(&checkerboard(64, 8), &mut levels).unwrap();
        assert_eq!(count, 7);
        assert_eq!((levels[6].width, levels[6].height), (1, 1));
        assert_eq!(levels[6].texel(0, 0).map(|texel| texel[3]), Some(255));
    }

    fn extent(width: u32, height: u32) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        }
    }

    fn levels_of(image: &Image) -> Vec<mipmap::MipLevel> {
        let mut levels = Vec::new();
        mipmap::generate(image, &mut levels).unwrap();
        levels
    }

    #[test]
    fn generated_levels_pass_the_upload_check() {
        let levels = levels_of(&checkerboard(16, 4));
        for level in &levels {
            check_upload(&level.as_upload(), levels.len() as u32, extent(16, 16)).unwrap();
        }
    }

    #[test]
    fn upload_beyond_the_last_level_is_rejected() {
        let levels = levels_of(&checkerboard(16, 4));
        let result = check_upload(&levels[4].as_upload(), 4, extent(16, 16));
        assert!(matches!(result, Err(Error::SinkWrite(message)) if message.contains("out of range")));
    }

    #[test]
    fn upload_with_a_mismatched_extent_is_rejected() {
        let levels = levels_of(&checkerboard(16, 4));
        // Level 1 of a 16x16 texture is 8x8; this texture's level 1 is 16x16.
        let result = check_upload(&levels[1].as_upload(), 6, extent(32, 32));
        assert!(matches!(result, Err(Error::SinkWrite(message)) if message.contains("16x16")));
    }

    #[test]
    fn upload_with_a_short_pixel_buffer_is_rejected() {
        let levels = levels_of(&checkerboard(4, 1));
        let mut upload = levels[0].as_upload();
        let full = upload.pixels;
        upload.pixels = &full[..full.len() - 4];
        let result = check_upload(&upload, 3, extent(4, 4));
        assert!(matches!(result, Err(Error::SinkWrite(message)) if message.contains("60 bytes")));
    }

    #[test]
    fn texture_extent_is_bounded_by_the_device_limit() {
        assert!(check_texture_extent(2048, 2048, 2048).is_ok());
        assert!(matches!(
            check_texture_extent(16384, 16, 8192),
            Err(Error::TextureTooLarge {
                width: 16384,
                max_dimension: 8192,
                ..
            })
        ));
        assert!(matches!(
            check_texture_extent(16, 2049, 2048),
            Err(Error::TextureTooLarge { height: 2049, .. })
        ));
        assert!(matches!(
            check_texture_extent(0, 16, 2048),
            Err(Error::InvalidDimension { .. })
        ));
    }

    #[test]
    fn zero_cell_size_is_treated_as_one() {
        let image = checkerboard(2, 0);
        assert_eq!(image.texel(1, 0), Some([32, 32, 32, 255]));
    }
}
