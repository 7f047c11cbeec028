//! # Mip Pyramid Generation
//!
//! Builds the full mip chain of an RGBA8 [`Image`] on the CPU and streams every level, in
//! increasing level order, to a [`TextureUploadSink`].
//!
//! ## Filtering
//!
//! Level `k` is produced from level `k - 1` (never from the base image) with a 2x2 box filter:
//!
//! - The destination extent is the previous extent halved with integer division, clamped to a
//!   minimum of one texel per axis. Odd extents therefore drop their last row or column at that
//!   step.
//! - Destination texel `(i, j)` averages source texels `(2i, 2j)`, `(2i + 1, 2j)`, `(2i, 2j + 1)`
//!   and `(2i + 1, 2j + 1)` channel by channel. The sum is divided by four with truncation, so
//!   `255, 255, 255, 254` averages to `254`.
//! - Once an axis has reached one texel the second source coordinate on that axis is clamped to
//!   the last row or column, which replicates the edge.
//!
//! Alpha is filtered exactly like the color channels.
//!
//! ## Uploading
//!
//! [`generate`] never touches the GPU itself. The sink receives a [`MipUpload`] per level that
//! carries everything a `wgpu::Queue::write_texture` call needs: mip index, origin, extent,
//! bytes per row and rows per image. Only the previous level is kept alive while the next one is
//! computed. Any sink error aborts the chain immediately.
//!
//! ## Example
//!
//! ```rust
//! use mip_orbit::{generate, Image, MipLevel};
//!
//! let image = Image::solid(4, 4, [200, 100, 50, 255]);
//! let mut levels: Vec<MipLevel> = Vec::new();
//! let count = generate(&image, &mut levels).unwrap();
//! assert_eq!(count, 3);
//! assert_eq!((levels[2].width, levels[2].height), (1, 1));
//! ```

use crate::error::{Error, Result};

/// Size in bytes of one RGBA8 texel.
pub const BYTES_PER_TEXEL: u32 = 4;

/// Number of bytes an RGBA8 image of the given extent occupies.
fn rgba_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_TEXEL as usize
}

/// An immutable, row-major RGBA8 image used as level 0 of a mip chain.
///
/// The row stride is always `width * 4` bytes. An image with a zero extent can be constructed
/// (with an empty pixel buffer), but [`generate`] refuses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Image {
    /// Wraps an existing pixel buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PixelBufferSize`] when `pixels.len()` is not exactly `width * height * 4`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = rgba_len(width, height);
        if pixels.len() != expected {
            return Err(Error::PixelBufferSize {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Builds an image by evaluating `texel(x, y)` for every texel in row-major order.
    pub fn from_fn(width: u32, height: u32, mut texel: impl FnMut(u32, u32) -> [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity(rgba_len(width, height));
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&texel(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// An image filled with a single color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::from_fn(width, height, |_, _| rgba)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the texel at `(x, y)`, or `None` outside the image.
    pub fn texel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        texel_at(&self.pixels, self.width, self.height, x, y)
    }
}

fn texel_at(pixels: &[u8], width: u32, height: u32, x: u32, y: u32) -> Option<[u8; 4]> {
    if x >= width || y >= height {
        return None;
    }
    let offset = rgba_len(width, y) + (x * BYTES_PER_TEXEL) as usize;
    let mut texel = [0; 4];
    texel.copy_from_slice(&pixels[offset..offset + BYTES_PER_TEXEL as usize]);
    Some(texel)
}

/// One level of a mip chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MipLevel {
    /// Mip index, `0` being the full-resolution level.
    pub level: u32,
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8 texels, `4 * width * height` bytes.
    pub pixels: Vec<u8>,
}

impl MipLevel {
    pub fn bytes_per_row(&self) -> u32 {
        self.width * BYTES_PER_TEXEL
    }

    /// Returns the texel at `(x, y)`, or `None` outside the level.
    pub fn texel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        texel_at(&self.pixels, self.width, self.height, x, y)
    }

    /// Describes this level as an upload starting at the texture origin.
    pub fn as_upload(&self) -> MipUpload<'_> {
        MipUpload {
            mip_level: self.level,
            origin: [0, 0, 0],
            width: self.width,
            height: self.height,
            bytes_per_row: self.bytes_per_row(),
            rows_per_image: self.height,
            pixels: &self.pixels,
        }
    }
}

/// A single level handed to a [`TextureUploadSink`].
#[derive(Debug, Clone, Copy)]
pub struct MipUpload<'a> {
    /// Destination mip index.
    pub mip_level: u32,
    /// Destination texel origin `[x, y, z]`; always zero for a full level.
    pub origin: [u32; 3],
    pub width: u32,
    pub height: u32,
    pub bytes_per_row: u32,
    pub rows_per_image: u32,
    pub pixels: &'a [u8],
}

/// Destination for generated mip levels, typically a GPU texture.
///
/// Implementations must accept uploads in strictly increasing `mip_level` order starting at 0
/// for a given chain.
pub trait TextureUploadSink {
    /// Stores one level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SinkWrite`] when the level cannot be stored; [`generate`] then stops.
    fn upload(&mut self, upload: MipUpload<'_>) -> Result<()>;
}

/// Collects a chain in memory.
impl TextureUploadSink for Vec<MipLevel> {
    fn upload(&mut self, upload: MipUpload<'_>) -> Result<()> {
        self.push(MipLevel {
            level: upload.mip_level,
            width: upload.width,
            height: upload.height,
            pixels: upload.pixels.to_vec(),
        });
        Ok(())
    }
}

/// Number of levels in a full chain for a `width` x `height` base image.
///
/// This is the bit width of the larger extent: `0` for an empty extent, otherwise
/// `1 + floor(log2(max(width, height)))`.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    u32::BITS - width.max(height).leading_zeros()
}

/// Box-filters `previous` into the next level of the chain.
pub fn downsample(previous: &MipLevel) -> MipLevel {
    let width = (previous.width / 2).max(1);
    let height = (previous.height / 2).max(1);
    let last_x = previous.width.saturating_sub(1);
    let last_y = previous.height.saturating_sub(1);
    let source_offset =
        |x: u32, y: u32| rgba_len(previous.width, y) + (x * BYTES_PER_TEXEL) as usize;

    let mut pixels = vec![0; rgba_len(width, height)];
    for j in 0..height {
        let y0 = (2 * j).min(last_y);
        let y1 = (2 * j + 1).min(last_y);
        for i in 0..width {
            let x0 = (2 * i).min(last_x);
            let x1 = (2 * i + 1).min(last_x);
            let corners = [
                source_offset(x0, y0),
                source_offset(x1, y0),
                source_offset(x0, y1),
                source_offset(x1, y1),
            ];
            let destination = rgba_len(width, j) + (i * BYTES_PER_TEXEL) as usize;
            for channel in 0..BYTES_PER_TEXEL as usize {
                let sum: u16 = corners
                    .iter()
                    .map(|&offset| u16::from(previous.pixels[offset + channel]))
                    .sum();
                // Truncating division, not rounding.
                pixels[destination + channel] = (sum / 4) as u8;
            }
        }
    }

    MipLevel {
        level: previous.level + 1,
        width,
        height,
        pixels,
    }
}

/// Generates every mip level of `image` and uploads them to `sink` in level order.
///
/// Returns the number of uploaded levels, which is always
/// [`mip_level_count(width, height)`](mip_level_count).
///
/// # Errors
///
/// - [`Error::InvalidDimension`] if the image has a zero width or height. The sink is not called.
/// - Whatever the sink returns for a failed upload. Later levels are not produced.
pub fn generate<S>(image: &Image, sink: &mut S) -> Result<u32>
where
    S: TextureUploadSink + ?Sized,
{
    if image.width == 0 || image.height == 0 {
        return Err(Error::InvalidDimension {
            width: image.width,
            height: image.height,
        });
    }

    let level_count = mip_level_count(image.width, image.height);
    let mut current = MipLevel {
        level: 0,
        width: image.width,
        height: image.height,
        pixels: image.pixels.clone(),
    };

    for level in 0..level_count {
        if level > 0 {
            current = downsample(&current);
        }
        log::debug!(
            "Uploading mip level {level}/{}: {}x{}",
            level_count - 1,
            current.width,
            current.height
        );
        sink.upload(current.as_upload())?;
    }

    Ok(level_count)
}
