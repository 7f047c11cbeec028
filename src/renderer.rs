//! # `renderer.rs` - Renderer Module
//!
//! The `renderer.rs` module contains the [`Renderer`], which composes the textured quad scene
//! and the `egui` overlay into a single frame.
//!
//! ## Key Features
//!
//! - **GPU Management**: The `Renderer` owns the [`Gpu`] context and recreates size-dependent
//!   resources when the window is resized.
//!
//! - **Depth Buffering**: A `Depth32Float` attachment keeps the quad correctly occluded by
//!   nothing but itself while `egui` draws on top.
//!
//! - **GUI Rendering**: An `egui_wgpu::Renderer` turns the overlay's paint jobs into draw calls
//!   inside the same render pass as the scene.
//!
//! - **Camera Access**: [`Renderer::view_sink`] hands the orbit camera a sink that writes the
//!   view matrix straight into the scene's uniform buffer.
//!
//! ## Frame Flow
//!
//! 1. The scene refreshes its projection and time uniforms.
//! 2. `egui` textures and buffers are updated.
//! 3. The surface texture is acquired. A lost or outdated surface is reconfigured and the frame
//!    is skipped.
//! 4. One render pass clears the targets, draws the quad, then draws the overlay.
//!
//! ## Example
//!
//! ```ignore
//! let mut renderer = Renderer::new(window, width, height, &checkerboard(512, 32)).await?;
//! camera.sync(&mut renderer.view_sink())?;
//! renderer.render_frame(screen_descriptor, paint_jobs, textures_delta, delta_time);
//! ```

// The GPU context (surface, device, queue) every resource below is created from.
use crate::gpu::Gpu;

// The textured quad together with its pipeline, buffers, and mip-mapped texture.
use crate::scene::Scene;

use crate::error::Result;
use crate::mipmap::Image;
use crate::uniform_binding::ViewMatrixWriter;

/// Renders the textured quad and the `egui` overlay.
///
/// # Fields
///
/// - `gpu`: The surface, device, and queue.
/// - `depth_texture_view`: The depth attachment, recreated on resize.
/// - `egui_renderer`: Draws the overlay's paint jobs.
/// - `scene`: The textured quad.
pub struct Renderer {
    /// The GPU context the renderer draws with.
    gpu: Gpu,

    /// The depth attachment of the render pass.
    ///
    /// Always matches the current surface extent; `resize` replaces it.
    depth_texture_view: wgpu::TextureView,

    /// The `egui` renderer drawing the overlay into the scene's render pass.
    ///
    /// It tracks the textures `egui` allocates (font atlas, images) through the
    /// `TexturesDelta` passed to `render_frame`.
    egui_renderer: egui_wgpu::Renderer,

    /// The textured quad and its resources.
    scene: Scene,
}

impl Renderer {
    /// The texture format used for the depth buffer.
    ///
    /// Shared with the scene's pipeline and the `egui` renderer, which must both match the depth
    /// attachment of the render pass.
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Creates the renderer for `window`, uploading `image` as the mip-mapped base texture.
    ///
    /// # Errors
    ///
    /// Returns the first failure of GPU initialization ([`Gpu::new_async`]) or of the mip chain
    /// upload ([`Scene::new`]).
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        image: &Image,
    ) -> Result<Self> {
        let gpu = Gpu::new_async(window, width, height).await?;

        let depth_texture_view =
            gpu.create_depth_texture(gpu.surface_config.width, gpu.surface_config.height);

        let egui_renderer = egui_wgpu::Renderer::new(
            &gpu.device,
            gpu.surface_config.format,
            Some(Self::DEPTH_FORMAT),
            1,
            false,
        );

        let scene = Scene::new(&gpu.device, &gpu.queue, gpu.surface_format, image)?;

        Ok(Self {
            gpu,
            depth_texture_view,
            egui_renderer,
            scene,
        })
    }

    /// Resizes the surface and the depth attachment.
    ///
    /// Zero-sized extents (a minimized window) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.gpu.resize(width, height);
        // The surface may have been clamped to the device limit.
        self.depth_texture_view = self
            .gpu
            .create_depth_texture(self.gpu.surface_config.width, self.gpu.surface_config.height);
    }

    /// Returns a sink that writes view matrices into the scene's uniform buffer.
    pub fn view_sink(&mut self) -> ViewMatrixWriter<'_> {
        self.scene.view_sink(&self.gpu.queue)
    }

    /// `(width, height)` of every level of the scene's texture, level 0 first.
    pub fn mip_extents(&self) -> &[(u32, u32)] {
        self.scene.mip_extents()
    }

    /// Renders a single frame, combining the scene and the `egui` overlay.
    ///
    /// # Parameters
    ///
    /// - `screen_descriptor`: Size in physical pixels and the DPI scale used by `egui`.
    /// - `paint_jobs`: The tessellated `egui` output.
    /// - `textures_delta`: Textures `egui` allocated or freed this frame.
    /// - `delta_time`: Time since the previous frame.
    ///
    /// Surface acquisition failures never panic. A lost or outdated surface is reconfigured and
    /// the frame is dropped; a timeout just drops the frame.
    pub fn render_frame(
        &mut self,
        screen_descriptor: egui_wgpu::ScreenDescriptor,
        paint_jobs: Vec<egui::epaint::ClippedPrimitive>,
        textures_delta: egui::TexturesDelta,
        delta_time: crate::Duration,
    ) {
        let delta_time = delta_time.as_secs_f32();

        self.scene
            .update(&self.gpu.queue, self.gpu.aspect_ratio(), delta_time);

        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(&self.gpu.device, &self.gpu.queue, *id, image_delta);
        }

        let surface_texture = match self.gpu.surface.get_current_texture() {
            Ok(surface_texture) => surface_texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.gpu.reconfigure();
                self.free_egui_textures(&textures_delta);
                return;
            }
            Err(error) => {
                log::error!("Failed to acquire the next surface texture: {error}");
                self.free_egui_textures(&textures_delta);
                return;
            }
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.egui_renderer.update_buffers(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        let surface_texture_view =
            surface_texture
                .texture
                .create_view(&wgpu::TextureViewDescriptor {
                    label: wgpu::Label::default(),
                    aspect: wgpu::TextureAspect::default(),
                    format: Some(self.gpu.surface_format),
                    dimension: None,
                    base_mip_level: 0,
                    mip_level_count: None,
                    base_array_layer: 0,
                    array_layer_count: None,
                    usage: None,
                });

        encoder.insert_debug_marker("Render scene");

        // This scope around the render pass keeps its borrow of the encoder from outliving the
        // draw calls, so `.finish()` can be called afterwards.
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.19,
                            g: 0.24,
                            b: 0.42,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.scene.render(&mut render_pass);

            self.egui_renderer.render(
                &mut render_pass.forget_lifetime(),
                &paint_jobs,
                &screen_descriptor,
            );
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();

        self.free_egui_textures(&textures_delta);
    }

    // Textures are freed only after the frame that may still reference them was submitted.
    fn free_egui_textures(&mut self, textures_delta: &egui::TexturesDelta) {
        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}
