//! # GPU Management Module
//!
//! The `gpu` module owns the `wgpu` objects every other part of the renderer builds on: the
//! presentation surface, the logical device, and its command queue.
//!
//! ## Overview
//!
//! [`Gpu::new_async`] walks the usual `wgpu` bring-up sequence (instance, surface, adapter,
//! device) and reports the first step that fails as an [`Error`] instead of panicking, so the
//! application can log a readable message when no usable GPU is present.
//!
//! ## Features
//!
//! - **Surface Resizing**: [`Gpu::resize`] reconfigures the swap chain, ignoring the zero-sized
//!   extents some platforms report while a window is minimized.
//! - **Aspect Ratio**: [`Gpu::aspect_ratio`] feeds the perspective projection of the scene.
//! - **Depth Textures**: [`Gpu::create_depth_texture`] allocates the depth attachment that
//!   matches the current surface size.
//!
//! ## Example Usage
//!
//! ```ignore
//! let gpu = Gpu::new_async(window, 1280, 720).await?;
//! let depth = gpu.create_depth_texture(1280, 720);
//! ```

// `InstanceDescriptor` selects which backends the `wgpu` instance may use. The defaults enable
// every backend compiled into this build, which on the web is controlled by the `webgl` and
// `webgpu` crate features.
use wgpu::InstanceDescriptor;

use crate::error::{Error, Result};

/// The GPU resources shared by the scene and the `egui` renderer.
///
/// # Fields
/// - `surface`: The swap chain target tied to the window (or canvas on the web).
/// - `device`: Creates buffers, textures, and pipelines.
/// - `queue`: Receives buffer writes, texture uploads, and command buffers.
/// - `surface_config`: The current swap chain configuration, updated by [`Gpu::resize`].
/// - `surface_format`: The color format of the swap chain textures.
pub struct Gpu {
    /// The surface associated with the window.
    ///
    /// Frames rendered into the textures handed out by this surface are presented on screen.
    pub surface: wgpu::Surface<'static>,

    /// The logical device used to create every GPU resource of the application.
    ///
    /// Validation errors raised by the device outside of an error scope are routed to the
    /// `log` crate, see [`Gpu::new_async`].
    pub device: wgpu::Device,

    /// The command queue of `device`.
    ///
    /// Besides command submission it is the upload path for uniform data and for every level of
    /// the mip-mapped texture.
    pub queue: wgpu::Queue,

    /// The configuration of the swap chain.
    ///
    /// Holds the width, height, format, and presentation mode the surface was last configured
    /// with. `resize` updates the extent and reconfigures the surface.
    pub surface_config: wgpu::SurfaceConfiguration,

    /// The texture format of the swap chain.
    ///
    /// A non-sRGB format is preferred because `egui` writes gamma-encoded colors itself.
    pub surface_format: wgpu::TextureFormat,
}

impl Gpu {
    /// Returns the width of the surface divided by its height.
    ///
    /// A zero height is treated as `1` so the result is always finite.
    pub fn aspect_ratio(&self) -> f32 {
        self.surface_config.width as f32 / self.surface_config.height.max(1) as f32
    }

    /// Reconfigures the surface for a new window size.
    ///
    /// Zero-sized extents are ignored: configuring a surface with them is a validation error.
    /// Extents above the device's `max_texture_dimension_2d` are scaled down to fit, keeping the
    /// aspect ratio.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to {width}x{height}");
            return;
        }
        let max_dimension = self.device.limits().max_texture_dimension_2d;
        let (width, height) = clamp_surface_extent(width, height, max_dimension);
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Reapplies the current configuration after the surface was lost or became outdated.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Creates a `Depth32Float` texture of the given size and returns its view.
    ///
    /// Both extents are clamped to at least `1` so a minimized window never produces an
    /// invalid texture descriptor.
    pub fn create_depth_texture(&self, width: u32, height: u32) -> wgpu::TextureView {
        let texture = self.device.create_texture(
            &(wgpu::TextureDescriptor {
                label: Some("Depth Texture"),
                size: wgpu::Extent3d {
                    width: width.max(1),
                    height: height.max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Depth32Float,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            }),
        );
        texture.create_view(&wgpu::TextureViewDescriptor {
            label: None,
            format: Some(wgpu::TextureFormat::Depth32Float),
            dimension: Some(wgpu::TextureViewDimension::D2),
            aspect: wgpu::TextureAspect::All,
            base_mip_level: 0,
            base_array_layer: 0,
            array_layer_count: None,
            mip_level_count: None,
            usage: None,
        })
    }

    /// Creates the GPU context for `window` with an initial surface size.
    ///
    /// # Errors
    ///
    /// - [`Error::CreateSurface`] if the window cannot back a `wgpu` surface.
    /// - [`Error::NoAdapter`] if no adapter can present to that surface.
    /// - [`Error::NoSurfaceFormat`] if the surface supports no texture format on that adapter.
    /// - [`Error::RequestDevice`] if the adapter refuses the requested limits.
    pub async fn new_async(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let instance = wgpu::Instance::new(&InstanceDescriptor::default());

        let surface = instance.create_surface(window)?;

        // The adapter must be able to present to `surface`; on machines with several GPUs the
        // default power preference lets the platform choose.
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(Error::NoAdapter)?;

        let info = adapter.get_info();
        log::info!(
            "Using adapter {} ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );
        log::debug!("WGPU Adapter Features: {:#?}", adapter.features());

        // WebGL2 cannot satisfy the default limits, so web builds with the `webgl` feature ask
        // for the downlevel set instead.
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("WGPU Device"),
                    memory_hints: wgpu::MemoryHints::default(),
                    required_features: wgpu::Features::default(),
                    #[cfg(not(target_arch = "wasm32"))]
                    required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    #[cfg(all(target_arch = "wasm32", feature = "webgpu"))]
                    required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    #[cfg(all(target_arch = "wasm32", feature = "webgl"))]
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                },
                None,
            )
            .await?;

        device.on_uncaptured_error(Box::new(|error: wgpu::Error| {
            log::error!("Uncaptured wgpu error: {error}");
        }));

        let surface_capabilities = surface.get_capabilities(&adapter);

        let surface_format = pick_surface_format(&surface_capabilities.formats)?;

        let (width, height) = clamp_surface_extent(
            width.max(1),
            height.max(1),
            device.limits().max_texture_dimension_2d,
        );

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: surface_capabilities
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &surface_config);

        Ok(Self {
            surface,
            device,
            queue,
            surface_config,
            surface_format,
        })
    }
}

/// Picks the swap chain format, preferring a non-sRGB one because `egui` writes gamma-encoded
/// colors itself.
pub fn pick_surface_format(formats: &[wgpu::TextureFormat]) -> Result<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first().copied())
        .ok_or(Error::NoSurfaceFormat)
}

/// Scales `width` x `height` down so neither side exceeds `max_dimension`.
///
/// The longer side becomes `max_dimension` and the other keeps the aspect ratio, never dropping
/// below one texel. Extents already within the limit are returned unchanged.
pub fn clamp_surface_extent(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max_dimension = max_dimension.max(1);
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }
    let aspect = width as f64 / height.max(1) as f64;
    if width >= height {
        let scaled = (max_dimension as f64 / aspect).round().max(1.0) as u32;
        (max_dimension, scaled.min(max_dimension))
    } else {
        let scaled = (max_dimension as f64 * aspect).round().max(1.0) as u32;
        (scaled.min(max_dimension), max_dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extents_within_the_limit_are_kept() {
        assert_eq!(clamp_surface_extent(1280, 720, 8192), (1280, 720));
        assert_eq!(clamp_surface_extent(2048, 2048, 2048), (2048, 2048));
    }

    #[test]
    fn oversized_extents_keep_their_aspect_ratio() {
        assert_eq!(clamp_surface_extent(10000, 5000, 8192), (8192, 4096));
        assert_eq!(clamp_surface_extent(3000, 6000, 2048), (1024, 2048));
        assert_eq!(clamp_surface_extent(100_000, 10, 2048), (2048, 1));
    }

    #[test]
    fn non_srgb_surface_format_is_preferred() {
        let formats = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Bgra8Unorm,
        ];
        assert_eq!(
            pick_surface_format(&formats).unwrap(),
            wgpu::TextureFormat::Bgra8Unorm
        );
        assert_eq!(
            pick_surface_format(&formats[..1]).unwrap(),
            wgpu::TextureFormat::Bgra8UnormSrgb
        );
    }

    #[test]
    fn empty_format_list_is_a_surface_format_error() {
        assert!(matches!(
            pick_surface_format(&[]),
            Err(Error::NoSurfaceFormat)
        ));
    }
}
