//! # Error Types
//!
//! Every fallible operation in the crate reports one [`Error`]. The mip generator and the
//! orbit camera only ever produce [`Error::InvalidDimension`], [`Error::PixelBufferSize`] and
//! [`Error::SinkWrite`]; the remaining variants belong to texture creation, configuration
//! loading, GPU initialization and the event loop of the surrounding viewer.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The base image of a mip chain has a zero width or height.
    #[error("Invalid image dimensions: width={width}, height={height}")]
    InvalidDimension { width: u32, height: u32 },

    /// A base image larger than the device's `max_texture_dimension_2d`.
    #[error("Texture {width}x{height} exceeds the device limit of {max_dimension} texels per side")]
    TextureTooLarge {
        width: u32,
        height: u32,
        max_dimension: u32,
    },

    #[error("Pixel buffer holds {actual} bytes, expected {expected} for a {width}x{height} RGBA8 image")]
    PixelBufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// A texture upload or uniform write sink rejected the data it was given.
    #[error("Sink write failed: {0}")]
    SinkWrite(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("No compatible GPU adapter found")]
    NoAdapter,

    #[error("Surface reports no supported texture formats")]
    NoSurfaceFormat,

    #[error("Failed to request a device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_format_error_names_the_surface() {
        let message = Error::NoSurfaceFormat.to_string();
        assert!(message.contains("no supported texture formats"));
        assert_ne!(message, Error::NoAdapter.to_string());
    }
}
