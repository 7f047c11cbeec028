//! # Application Core (`app.rs`)
//!
//! The `App` struct implements `winit`'s [`ApplicationHandler`]: it creates the window, brings
//! up the [`Renderer`], feeds mouse input to the [`OrbitCamera`], and draws a small `egui` panel
//! describing the camera and the uploaded mip chain.
//!
//! ## Features and Components
//!
//! - **Window Management**: The window title and initial size come from [`AppConfig`]. On the
//!   web the window wraps the `<canvas id="canvas">` element of the page.
//! - **Camera Input**: Left-button drags orbit the camera, the wheel zooms, and every redraw
//!   advances the camera's inertia before the frame is rendered.
//! - **GUI State**: `egui` gets the first look at every window event. Events it consumes (for
//!   example a drag that starts on the panel) never reach the camera.
//! - **Frame Timing**: The time between redraws is forwarded to the scene for its time uniform.
//!
//! ## Platform-Specific Notes
//!
//! - **Desktop**: The renderer is created synchronously with `pollster`. If creation fails the
//!   error is logged and the event loop exits.
//! - **WebAssembly**: The renderer is created on the browser's executor with
//!   `wasm_bindgen_futures` and delivered through a `oneshot` channel. Events arriving before
//!   it is ready are ignored.
//!
//! ## Key Bindings
//!
//! | Input               | Action                         |
//! |---------------------|--------------------------------|
//! | Left mouse drag     | Orbit                          |
//! | Mouse wheel         | Zoom                           |
//! | `R`                 | Reset the camera               |
//! | `F1`                | Toggle the camera panel        |
//! | `Escape`            | Quit                           |

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use std::sync::Arc;

use nalgebra_glm as glm;
use web_time::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
    window::{Theme, Window},
};

use crate::camera::OrbitCamera;
use crate::config::AppConfig;
use crate::renderer::Renderer;
use crate::texture::checkerboard;

/// Scroll units per pixel for touchpads and other devices reporting pixel deltas.
pub const PIXEL_SCROLL_SCALE: f32 = 0.01;

/// The application state driven by the `winit` event loop.
pub struct App {
    /// Settings the window, camera, and texture are created from.
    config: AppConfig,

    /// The window, shared with the renderer's surface.
    window: Option<Arc<Window>>,

    /// Available once GPU initialization has finished.
    renderer: Option<Renderer>,

    gui_state: Option<egui_winit::State>,

    last_render_time: Option<Instant>,

    #[cfg(target_arch = "wasm32")]
    renderer_receiver: Option<futures::channel::oneshot::Receiver<Renderer>>,

    /// Surface size in physical pixels, used for the `egui` screen descriptor.
    last_size: (u32, u32),

    camera: OrbitCamera,

    /// Last cursor position in physical pixels. `winit` only reports positions on motion, so
    /// a press uses this value as its anchor.
    cursor_position: glm::Vec2,

    show_camera_panel: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let camera = OrbitCamera::new(config.camera);
        Self {
            config,
            window: None,
            renderer: None,
            gui_state: None,
            last_render_time: None,
            #[cfg(target_arch = "wasm32")]
            renderer_receiver: None,
            last_size: (0, 0),
            camera,
            cursor_position: glm::Vec2::zeros(),
            show_camera_panel: true,
        }
    }

    /// Installs a freshly created renderer and publishes the camera's current view to it.
    fn attach_renderer(&mut self, mut renderer: Renderer) {
        if let Err(error) = self.camera.sync(&mut renderer.view_sink()) {
            log::error!("Failed to write the initial view matrix: {error}");
        }
        self.renderer = Some(renderer);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        let mut attributes = Window::default_attributes();

        #[cfg(not(target_arch = "wasm32"))]
        {
            attributes = attributes
                .with_title(self.config.window.title.as_str())
                .with_inner_size(winit::dpi::LogicalSize::new(
                    self.config.window.width,
                    self.config.window.height,
                ));
        }

        #[allow(unused_assignments)]
        #[cfg(target_arch = "wasm32")]
        let mut canvas_width = 0;

        #[allow(unused_assignments)]
        #[cfg(target_arch = "wasm32")]
        let mut canvas_height = 0;

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;
            let Some(canvas) = wgpu::web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id("canvas"))
                .and_then(|element| element.dyn_into::<wgpu::web_sys::HtmlCanvasElement>().ok())
            else {
                log::error!("No <canvas id=\"canvas\"> element found");
                event_loop.exit();
                return;
            };
            canvas_width = canvas.width();
            canvas_height = canvas.height();
            self.last_size = (canvas_width, canvas_height);
            attributes = attributes.with_canvas(Some(canvas));
        }

        let window = match event_loop.create_window(attributes) {
            Ok(window) => window,
            Err(error) => {
                log::error!("Failed to create window: {error}");
                event_loop.exit();
                return;
            }
        };

        let first_window_handle = self.window.is_none();
        let window_handle = Arc::new(window);
        self.window = Some(window_handle.clone());
        if !first_window_handle {
            return;
        }

        let gui_context = egui::Context::default();

        #[cfg(not(target_arch = "wasm32"))]
        {
            let inner_size = window_handle.inner_size();
            self.last_size = (inner_size.width, inner_size.height);
        }

        #[cfg(target_arch = "wasm32")]
        {
            gui_context.set_pixels_per_point(window_handle.scale_factor() as f32);
        }

        let viewport_id = gui_context.viewport_id();
        let gui_state = egui_winit::State::new(
            gui_context,
            viewport_id,
            &window_handle,
            Some(window_handle.scale_factor() as _),
            Some(Theme::Dark),
            None,
        );

        let image = checkerboard(self.config.texture.size, self.config.texture.cell_size);

        #[cfg(not(target_arch = "wasm32"))]
        {
            let (width, height) = self.last_size;
            let result = pollster::block_on(async move {
                Renderer::new(window_handle.clone(), width, height, &image).await
            });
            match result {
                Ok(renderer) => self.attach_renderer(renderer),
                Err(error) => {
                    log::error!("Failed to create renderer: {error}");
                    event_loop.exit();
                    return;
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let (sender, receiver) = futures::channel::oneshot::channel();
            self.renderer_receiver = Some(receiver);
            log::info!("Canvas dimensions: ({canvas_width} x {canvas_height})");
            wasm_bindgen_futures::spawn_local(async move {
                match Renderer::new(window_handle.clone(), canvas_width, canvas_height, &image)
                    .await
                {
                    Ok(renderer) => {
                        if sender.send(renderer).is_err() {
                            log::error!("Failed to send renderer!");
                        }
                    }
                    Err(error) => log::error!("Failed to create renderer: {error}"),
                }
            });
        }

        self.gui_state = Some(gui_state);
        self.last_render_time = Some(Instant::now());
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: winit::event::WindowEvent,
    ) {
        #[cfg(target_arch = "wasm32")]
        {
            let received = self
                .renderer_receiver
                .as_mut()
                .and_then(|receiver| receiver.try_recv().ok().flatten());
            if let Some(renderer) = received {
                self.renderer_receiver = None;
                self.attach_renderer(renderer);
            }
        }

        let (Some(gui_state), Some(renderer), Some(window), Some(last_render_time)) = (
            self.gui_state.as_mut(),
            self.renderer.as_mut(),
            self.window.as_ref(),
            self.last_render_time.as_mut(),
        ) else {
            return;
        };

        let response = gui_state.on_window_event(window, &event);

        // Cursor tracking and drag release must see every event, even the ones egui consumes,
        // or a drag released over the panel would never end.
        match &event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_position = glm::vec2(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: MouseButton::Left,
                ..
            } => self.camera.on_release(),
            _ => (),
        }

        if response.consumed {
            return;
        }

        match event {
            WindowEvent::KeyboardInput {
                event:
                    winit::event::KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match key_code {
                KeyCode::Escape => event_loop.exit(),
                KeyCode::KeyR => {
                    if let Err(error) = self.camera.reset(&mut renderer.view_sink()) {
                        log::error!("Failed to reset camera: {error}");
                    }
                }
                KeyCode::F1 => self.show_camera_panel = !self.show_camera_panel,
                _ => (),
            },
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => self.camera.on_press(self.cursor_position),
            WindowEvent::CursorMoved { .. } => {
                if let Err(error) = self
                    .camera
                    .on_move(self.cursor_position, &mut renderer.view_sink())
                {
                    log::error!("Failed to update camera: {error}");
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => {
                        position.y as f32 * PIXEL_SCROLL_SCALE
                    }
                };
                if let Err(error) = self.camera.on_scroll(scroll, &mut renderer.view_sink()) {
                    log::error!("Failed to zoom camera: {error}");
                }
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                log::info!("Resizing renderer surface to: ({width}, {height})");
                renderer.resize(width, height);
                self.last_size = (width, height);
            }
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting...");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let delta_time = now - *last_render_time;
                *last_render_time = now;

                if let Err(error) = self.camera.tick_inertia(&mut renderer.view_sink()) {
                    log::error!("Failed to advance camera inertia: {error}");
                }

                let gui_input = gui_state.take_egui_input(window);
                gui_state.egui_ctx().begin_pass(gui_input);

                let mut reset_requested = false;
                if self.show_camera_panel {
                    let state = self.camera.state();
                    let velocity = self.camera.velocity();
                    let dragging = self.camera.is_dragging();
                    let extents = renderer.mip_extents();

                    egui::Window::new("Camera").show(gui_state.egui_ctx(), |ui| {
                        ui.label(format!("Backend: {}", backend_label()));
                        ui.separator();
                        egui::Grid::new("camera_state").show(ui, |ui| {
                            ui.label("Yaw");
                            ui.label(format!("{:.1}°", state.yaw().to_degrees()));
                            ui.end_row();
                            ui.label("Pitch");
                            ui.label(format!("{:.1}°", state.pitch().to_degrees()));
                            ui.end_row();
                            ui.label("Zoom");
                            ui.label(format!("{:.3} (distance {:.3})", state.zoom, state.distance()));
                            ui.end_row();
                            ui.label("Velocity");
                            ui.label(format!("({:.5}, {:.5})", velocity.x, velocity.y));
                            ui.end_row();
                            ui.label("Dragging");
                            ui.label(if dragging { "yes" } else { "no" });
                            ui.end_row();
                        });
                        ui.separator();
                        egui::CollapsingHeader::new(format!("Mip chain ({} levels)", extents.len()))
                            .default_open(false)
                            .show(ui, |ui| {
                                for (level, (width, height)) in extents.iter().enumerate() {
                                    ui.label(format!("Level {level}: {width} x {height}"));
                                }
                            });
                        ui.separator();
                        reset_requested = ui.button("Reset camera").clicked();
                    });
                }

                if reset_requested {
                    if let Err(error) = self.camera.reset(&mut renderer.view_sink()) {
                        log::error!("Failed to reset camera: {error}");
                    }
                }

                let egui_winit::egui::FullOutput {
                    textures_delta,
                    shapes,
                    pixels_per_point,
                    platform_output,
                    ..
                } = gui_state.egui_ctx().end_pass();

                gui_state.handle_platform_output(window, platform_output);

                let paint_jobs = gui_state.egui_ctx().tessellate(shapes, pixels_per_point);

                let screen_descriptor = {
                    let (width, height) = self.last_size;
                    egui_wgpu::ScreenDescriptor {
                        size_in_pixels: [width, height],
                        pixels_per_point: window.scale_factor() as f32,
                    }
                };

                renderer.render_frame(screen_descriptor, paint_jobs, textures_delta, delta_time);
            }
            _ => (),
        }

        window.request_redraw();
    }
}

fn backend_label() -> &'static str {
    if cfg!(feature = "webgpu") {
        "Wgpu/WebGPU"
    } else if cfg!(feature = "webgl") {
        "Wgpu/WebGL"
    } else {
        "Wgpu/Native"
    }
}
