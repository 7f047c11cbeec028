//! # Mip Orbit
//!
//! A small viewer that uploads a procedurally generated texture together with its full mip
//! chain and lets the user orbit a textured quad with the mouse. It runs natively and in the
//! browser (WebGPU or WebGL) on top of `wgpu`, `winit`, and `egui`.
//!
//! The two pieces that carry the interesting logic are independent of the GPU:
//!
//! - [`mipmap`]: Builds every level of a mip pyramid from an RGBA8 [`Image`] with a 2x2 box
//!   filter and hands each level to a [`TextureUploadSink`].
//! - [`camera`]: An [`OrbitCamera`] turning press, drag, release, and scroll input into view
//!   matrices, with inertia that decays geometrically after a drag ends. Every change is pushed
//!   to a [`UniformWriteSink`].
//!
//! Both write through small traits, so they are tested against recording sinks and used with
//! the `wgpu`-backed sinks in [`texture`] and [`uniform_binding`] at runtime.
//!
//! ## Modules
//!
//! - [`app`]: Window creation and the `winit` event loop; routes mouse input to the camera.
//! - [`renderer`]: Composes the scene and the `egui` overlay into a frame.
//! - [`gpu`]: Surface, adapter, device, and queue negotiation.
//! - [`scene`]: The textured quad, its pipeline, and per-frame uniform updates.
//! - [`texture`]: The mip-mapped texture and its `wgpu` upload sink.
//! - [`vertex`]: The vertex layout and the quad geometry.
//! - [`uniform_buffer`]: The `#[repr(C)]` uniform block shared by both shader stages.
//! - [`uniform_binding`]: The bind group and the view matrix sink.
//! - [`config`]: TOML configuration.
//! - [`error`]: The crate-wide [`Error`] type.
//!
//! ## Constants
//!
//! ### [`INDICES`]
//!
//! The two triangles of the quad, counter-clockwise when seen from `+Z`.
//!
//! ### [`SHADER_SOURCE`]
//!
//! The WGSL source of the vertex and fragment stages.
//!
//! ## Example
//!
//! ```rust
//! use mip_orbit::{generate, CameraSettings, Image, MipLevel, OrbitCamera, UniformWriteSink};
//!
//! let mut levels: Vec<MipLevel> = Vec::new();
//! generate(&Image::solid(8, 4, [255, 0, 0, 255]), &mut levels).unwrap();
//! assert_eq!(levels.len(), 4);
//!
//! struct LastView(Option<nalgebra_glm::Mat4>);
//!
//! impl UniformWriteSink for LastView {
//!     fn write_view_matrix(&mut self, view: &nalgebra_glm::Mat4) -> mip_orbit::Result<()> {
//!         self.0 = Some(*view);
//!         Ok(())
//!     }
//! }
//!
//! let mut camera = OrbitCamera::new(CameraSettings::default());
//! let mut sink = LastView(None);
//! camera.on_press(nalgebra_glm::vec2(100.0, 100.0));
//! camera.on_move(nalgebra_glm::vec2(140.0, 90.0), &mut sink).unwrap();
//! camera.on_release();
//! while camera.tick_inertia(&mut sink).unwrap() {}
//! assert!(sink.0.is_some());
//! ```
//!
//! ## Dependencies
//!
//! - `wgpu`: Rendering and texture uploads.
//! - `winit` and `egui`: Window, input, and the status panel.
//! - `nalgebra-glm`: Matrix and vector math.
//! - `log` with `env_logger` (native) or `console_log` (web): Logging.
//! - `serde` and `toml`: Configuration.
//! - `thiserror`: Error types.

pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod gpu;
pub mod mipmap;
pub mod renderer;
pub mod scene;
pub mod texture;
pub mod uniform_binding;
pub mod uniform_buffer;
pub mod vertex;

use web_time::Duration;

pub use crate::app::App;
pub use crate::camera::{CameraSettings, CameraState, DragState, OrbitCamera, UniformWriteSink};
pub use crate::config::AppConfig;
pub use crate::error::{Error, Result};
pub use crate::gpu::Gpu;
pub use crate::mipmap::{
    downsample, generate, mip_level_count, Image, MipLevel, MipUpload, TextureUploadSink,
};
pub use crate::renderer::Renderer;
pub use crate::scene::Scene;
pub use crate::texture::{checkerboard, MipTexture, QueueTextureSink};
pub use crate::uniform_binding::{UniformBinding, ViewMatrixWriter};
pub use crate::uniform_buffer::UniformBuffer;
pub use crate::vertex::{Vertex, VERTICES};

/// Indices of the two triangles forming the quad in [`VERTICES`].
///
/// Both triangles wind counter-clockwise when seen from `+Z`, matching the pipeline's
/// `FrontFace::Ccw`.
pub const INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// The source code for the shader written in WGSL.
///
/// ### Bindings
///
/// - `@group(0) @binding(0)`: The uniform block, see [`UniformBuffer`].
/// - `@group(0) @binding(1)`: The mip-mapped texture.
/// - `@group(0) @binding(2)`: Its sampler.
///
/// ### Vertex Stage
///
/// `vertex_main` reads the four attributes of [`Vertex`] and transforms the position by
/// `projection * view * model`.
///
/// ### Fragment Stage
///
/// `fragment_main` samples the texture, multiplies it by the vertex color and the uniform
/// color, and shades the result with a fixed directional light over the world-space normal.
/// Both faces of the quad receive the same light.
pub const SHADER_SOURCE: &str = include_str!("shader_source.wgsl");

/// Initializes logging, loads the configuration, and runs the viewer until its window closes.
///
/// On the web the event loop is handed to the browser and this returns immediately.
///
/// # Errors
///
/// Fails when the configuration file is invalid or the event loop cannot be created.
pub fn run() -> Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::init();

    #[cfg(target_arch = "wasm32")]
    {
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));
        if console_log::init_with_level(log::Level::Info).is_err() {
            log::warn!("Logger already initialized");
        }
    }

    let config = AppConfig::load_or_default()?;
    log::debug!("Configuration: {config:?}");

    let event_loop = winit::event_loop::EventLoop::new()?;
    let mut app = App::new(config);

    #[cfg(not(target_arch = "wasm32"))]
    event_loop.run_app(&mut app)?;

    #[cfg(target_arch = "wasm32")]
    {
        use winit::platform::web::EventLoopExtWebSys;
        event_loop.spawn_app(app);
    }

    Ok(())
}

/// Entry point of the web build.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    if let Err(error) = run() {
        log::error!("{error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_declares_both_entry_points() {
        assert!(SHADER_SOURCE.contains("fn vertex_main("));
        assert!(SHADER_SOURCE.contains("fn fragment_main("));
    }

    #[test]
    fn fragment_stage_shades_with_the_normal() {
        let fragment = SHADER_SOURCE
            .split("fn fragment_main(")
            .nth(1)
            .unwrap_or_default();
        assert!(fragment.contains("frag.normal"));
        assert!(fragment.contains("textureSample(base_texture, base_sampler, frag.uv)"));
    }
}
