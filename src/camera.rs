//! # Orbit Camera
//!
//! A camera orbiting the world origin, parameterized by two spherical angles and a logarithmic
//! zoom. Mouse gestures are fed in through plain method calls by whoever owns the event loop:
//!
//! - [`OrbitCamera::on_press`] starts a drag and snapshots the current [`CameraState`].
//! - [`OrbitCamera::on_move`] rotates the camera relative to that snapshot while dragging.
//! - [`OrbitCamera::on_release`] ends the drag; the last frame-to-frame motion keeps going.
//! - [`OrbitCamera::on_scroll`] zooms in or out.
//! - [`OrbitCamera::tick_inertia`] runs once per frame and lets a released drag coast to a stop
//!   with geometric decay.
//!
//! Every operation that changes the view pushes the new view matrix to a [`UniformWriteSink`].
//!
//! ## Conventions
//!
//! The world is Z-up and right-handed. For yaw `θ`, pitch `φ` and zoom `z` the eye sits at
//! `exp(-z) * (cos θ cos φ, sin θ cos φ, sin φ)` looking at the origin. Pitch is kept strictly
//! inside `(-π/2, π/2)` so the look-at basis never degenerates.

use std::f32::consts::FRAC_PI_2;

use nalgebra_glm as glm;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Distance kept between the pitch angle and the poles.
pub const PITCH_EPSILON: f32 = 1e-5;

/// Destination for view matrices, typically a region of a GPU uniform buffer.
pub trait UniformWriteSink {
    /// Stores a new view matrix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SinkWrite`] when the matrix cannot be stored.
    fn write_view_matrix(&mut self, view: &glm::Mat4) -> Result<()>;
}

/// Tunable constants of the [`OrbitCamera`].
///
/// Loaded from the `[camera]` section of the configuration file; missing keys take the
/// [`Default`] values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Radians of rotation per pixel of mouse travel.
    pub sensitivity: f32,
    /// Zoom change per scroll unit.
    pub scroll_sensitivity: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Factor applied to the coasting velocity every frame, in `(0, 1)`.
    pub damping: f32,
    /// Coasting stops once both velocity components are below this value.
    pub inertia_epsilon: f32,
    pub initial_yaw: f32,
    pub initial_pitch: f32,
    pub initial_zoom: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            sensitivity: 0.005,
            scroll_sensitivity: 0.1,
            min_zoom: -2.0,
            max_zoom: 2.0,
            damping: 0.9,
            inertia_epsilon: 1e-4,
            initial_yaw: 0.8,
            initial_pitch: 0.5,
            initial_zoom: -1.2,
        }
    }
}

impl CameraSettings {
    /// Checks that the settings describe a camera that can actually settle.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("sensitivity", self.sensitivity),
            ("scroll_sensitivity", self.scroll_sensitivity),
            ("inertia_epsilon", self.inertia_epsilon),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "camera.{name} must be a positive number, got {value}"
                )));
            }
        }
        if !(self.damping > 0.0 && self.damping < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "camera.damping must lie in (0, 1), got {}",
                self.damping
            )));
        }
        if !(self.min_zoom.is_finite() && self.max_zoom.is_finite() && self.min_zoom < self.max_zoom)
        {
            return Err(Error::InvalidConfig(format!(
                "camera zoom range [{}, {}] is empty",
                self.min_zoom, self.max_zoom
            )));
        }
        if !(self.initial_yaw.is_finite()
            && self.initial_pitch.is_finite()
            && self.initial_zoom.is_finite())
        {
            return Err(Error::InvalidConfig(
                "camera initial angles and zoom must be finite".to_owned(),
            ));
        }
        Ok(())
    }

    fn initial_state(&self) -> CameraState {
        CameraState {
            angles: glm::vec2(self.initial_yaw, clamp_pitch(self.initial_pitch)),
            zoom: self.initial_zoom.clamp(self.min_zoom, self.max_zoom),
        }
    }
}

/// Spherical camera parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// `x` is the yaw around +Z, `y` the pitch above the XY plane, both in radians.
    pub angles: glm::Vec2,
    /// Log-distance from the origin: the eye sits `exp(-zoom)` units away.
    pub zoom: f32,
}

impl CameraState {
    pub fn yaw(&self) -> f32 {
        self.angles.x
    }

    pub fn pitch(&self) -> f32 {
        self.angles.y
    }

    pub fn distance(&self) -> f32 {
        (-self.zoom).exp()
    }

    pub fn eye_position(&self) -> glm::Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw().sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch().sin_cos();
        glm::vec3(cos_yaw * cos_pitch, sin_yaw * cos_pitch, sin_pitch) * self.distance()
    }

    pub fn view_matrix(&self) -> glm::Mat4 {
        glm::look_at_rh(&self.eye_position(), &glm::Vec3::zeros(), &glm::Vec3::z())
    }
}

/// Per-gesture drag bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    pub active: bool,
    /// Mapped mouse position at the start of the gesture.
    pub start_mouse: glm::Vec2,
    /// Camera state at the start of the gesture.
    pub start_state: CameraState,
    /// Angle change per frame, carried into coasting after release.
    pub velocity: glm::Vec2,
    pub previous_delta: glm::Vec2,
}

impl DragState {
    fn idle(state: CameraState) -> Self {
        Self {
            active: false,
            start_mouse: glm::Vec2::zeros(),
            start_state: state,
            velocity: glm::Vec2::zeros(),
            previous_delta: glm::Vec2::zeros(),
        }
    }
}

/// Orbit camera driven by drag, scroll and per-frame inertia.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    settings: CameraSettings,
    state: CameraState,
    drag: DragState,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(CameraSettings::default())
    }
}

impl OrbitCamera {
    pub fn new(settings: CameraSettings) -> Self {
        let state = settings.initial_state();
        Self {
            settings,
            state,
            drag: DragState::idle(state),
        }
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn drag(&self) -> &DragState {
        &self.drag
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.active
    }

    pub fn velocity(&self) -> glm::Vec2 {
        self.drag.velocity
    }

    pub fn view_matrix(&self) -> glm::Mat4 {
        self.state.view_matrix()
    }

    /// Starts a drag at `mouse` (window pixels). Ignored while a drag is already active.
    pub fn on_press(&mut self, mouse: glm::Vec2) {
        if self.drag.active {
            return;
        }
        self.drag = DragState {
            active: true,
            start_mouse: map_mouse(mouse),
            start_state: self.state,
            velocity: glm::Vec2::zeros(),
            previous_delta: glm::Vec2::zeros(),
        };
    }

    /// Rotates the camera to follow the mouse while dragging; does nothing otherwise.
    pub fn on_move<S>(&mut self, mouse: glm::Vec2, sink: &mut S) -> Result<()>
    where
        S: UniformWriteSink + ?Sized,
    {
        if !self.drag.active {
            return Ok(());
        }

        let delta = (map_mouse(mouse) - self.drag.start_mouse) * self.settings.sensitivity;
        self.state.angles = self.drag.start_state.angles + delta;
        self.state.angles.y = clamp_pitch(self.state.angles.y);

        self.drag.velocity = delta - self.drag.previous_delta;
        self.drag.previous_delta = delta;

        self.sync(sink)
    }

    /// Ends the drag. The velocity of the last move is kept for [`Self::tick_inertia`].
    pub fn on_release(&mut self) {
        self.drag.active = false;
    }

    /// Zooms by `delta_y` scroll units, clamped to the configured zoom range.
    pub fn on_scroll<S>(&mut self, delta_y: f32, sink: &mut S) -> Result<()>
    where
        S: UniformWriteSink + ?Sized,
    {
        self.state.zoom = (self.state.zoom + self.settings.scroll_sensitivity * delta_y)
            .clamp(self.settings.min_zoom, self.settings.max_zoom);
        self.sync(sink)
    }

    /// Advances coasting by one frame.
    ///
    /// Returns `Ok(true)` if the camera moved. Nothing happens while dragging or once the
    /// velocity has decayed below `inertia_epsilon`.
    pub fn tick_inertia<S>(&mut self, sink: &mut S) -> Result<bool>
    where
        S: UniformWriteSink + ?Sized,
    {
        if self.drag.active {
            return Ok(false);
        }
        let epsilon = self.settings.inertia_epsilon;
        if self.drag.velocity.x.abs() < epsilon && self.drag.velocity.y.abs() < epsilon {
            return Ok(false);
        }

        self.state.angles += self.drag.velocity;
        self.state.angles.y = clamp_pitch(self.state.angles.y);
        self.drag.velocity *= self.settings.damping;
        if self.drag.velocity.x.abs() < epsilon && self.drag.velocity.y.abs() < epsilon {
            log::trace!("Camera inertia settled at {:?}", self.state.angles);
        }

        self.sync(sink).map(|()| true)
    }

    /// Restores the configured initial state and stops any coasting.
    pub fn reset<S>(&mut self, sink: &mut S) -> Result<()>
    where
        S: UniformWriteSink + ?Sized,
    {
        self.state = self.settings.initial_state();
        self.drag = DragState::idle(self.state);
        self.sync(sink)
    }

    /// Writes the current view matrix without changing any state.
    pub fn sync<S>(&self, sink: &mut S) -> Result<()>
    where
        S: UniformWriteSink + ?Sized,
    {
        sink.write_view_matrix(&self.view_matrix())
    }
}

/// Horizontal mouse motion is mirrored so that dragging right turns the scene right.
fn map_mouse(mouse: glm::Vec2) -> glm::Vec2 {
    glm::vec2(-mouse.x, mouse.y)
}

fn clamp_pitch(pitch: f32) -> f32 {
    pitch.clamp(-FRAC_PI_2 + PITCH_EPSILON, FRAC_PI_2 - PITCH_EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        views: Vec<glm::Mat4>,
    }

    impl UniformWriteSink for RecordingSink {
        fn write_view_matrix(&mut self, view: &glm::Mat4) -> Result<()> {
            self.views.push(*view);
            Ok(())
        }
    }

    struct RejectingSink;

    impl UniformWriteSink for RejectingSink {
        fn write_view_matrix(&mut self, _view: &glm::Mat4) -> Result<()> {
            Err(Error::SinkWrite("uniform buffer unavailable".to_owned()))
        }
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-5,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn drag_to_the_right_decreases_yaw() {
        let mut camera = OrbitCamera::default();
        let mut sink = RecordingSink::default();
        assert_close(camera.state().yaw(), 0.8);
        assert_close(camera.state().pitch(), 0.5);
        assert_close(camera.state().zoom, -1.2);

        camera.on_press(glm::vec2(0.0, 0.0));
        camera.on_move(glm::vec2(100.0, 0.0), &mut sink).unwrap();

        assert_close(camera.drag().previous_delta.x, -0.5);
        assert_close(camera.drag().previous_delta.y, 0.0);
        assert_close(camera.state().yaw(), 0.3);
        assert_close(camera.state().pitch(), 0.5);
        assert_eq!(sink.views.len(), 1);
        assert_eq!(sink.views[0], camera.view_matrix());
    }

    #[test]
    fn move_is_relative_to_the_drag_start() {
        let mut camera = OrbitCamera::default();
        let mut sink = RecordingSink::default();
        camera.on_press(glm::vec2(50.0, 50.0));
        camera.on_move(glm::vec2(60.0, 50.0), &mut sink).unwrap();
        camera.on_move(glm::vec2(70.0, 60.0), &mut sink).unwrap();

        // delta = (-20, 10) * 0.005
        assert_close(camera.state().yaw(), 0.8 - 0.1);
        assert_close(camera.state().pitch(), 0.5 + 0.05);
        // velocity = delta - previous delta = (-0.1, 0.05) - (-0.05, 0)
        assert_close(camera.velocity().x, -0.05);
        assert_close(camera.velocity().y, 0.05);
    }

    #[test]
    fn move_without_press_writes_nothing() {
        let mut camera = OrbitCamera::default();
        let mut sink = RecordingSink::default();
        let before = camera.state();
        camera.on_move(glm::vec2(500.0, 500.0), &mut sink).unwrap();
        assert_eq!(camera.state(), before);
        assert!(sink.views.is_empty());
    }

    #[test]
    fn second_press_keeps_the_first_anchor() {
        let mut camera = OrbitCamera::default();
        let mut sink = RecordingSink::default();
        camera.on_press(glm::vec2(0.0, 0.0));
        camera.on_press(glm::vec2(100.0, 0.0));
        camera.on_move(glm::vec2(100.0, 0.0), &mut sink).unwrap();
        assert_close(camera.state().yaw(), 0.3);
    }

    #[test]
    fn press_resets_gesture_velocity() {
        let mut camera = OrbitCamera::default();
        let mut sink = RecordingSink::default();
        camera.on_press(glm::vec2(0.0, 0.0));
        camera.on_move(glm::vec2(40.0, 0.0), &mut sink).unwrap();
        camera.on_release();
        assert!(camera.velocity().x.abs() > 0.0);

        camera.on_press(glm::vec2(10.0, 10.0));
        assert_eq!(camera.velocity(), glm::Vec2::zeros());
        assert_eq!(camera.drag().previous_delta, glm::Vec2::zeros());
    }

    #[test]
    fn pitch_stays_strictly_inside_the_poles() {
        let mut camera = OrbitCamera::default();
        let mut sink = RecordingSink::default();

        camera.on_press(glm::vec2(0.0, 0.0));
        for step in 1..50 {
            let y = if step % 2 == 0 { 1e6 } else { -1e6 };
            camera.on_move(glm::vec2(0.0, y * step as f32), &mut sink).unwrap();
            assert!(camera.state().pitch().abs() < FRAC_PI_2);
        }
        camera.on_release();
        for _ in 0..200 {
            camera.tick_inertia(&mut sink).unwrap();
            assert!(camera.state().pitch().abs() < FRAC_PI_2);
        }
        assert!(sink.views.iter().all(|view| view.iter().all(|v| v.is_finite())));
    }

    #[test]
    fn zoom_is_clamped_to_its_range() {
        let mut camera = OrbitCamera::default();
        let mut sink = RecordingSink::default();

        camera.on_scroll(3.0, &mut sink).unwrap();
        assert_close(camera.state().zoom, -0.9);

        camera.on_scroll(1000.0, &mut sink).unwrap();
        assert_eq!(camera.state().zoom, 2.0);

        for _ in 0..100 {
            camera.on_scroll(-7.5, &mut sink).unwrap();
            assert!(camera.state().zoom >= -2.0 && camera.state().zoom <= 2.0);
        }
        assert_eq!(camera.state().zoom, -2.0);
        assert_eq!(sink.views.len(), 102);
    }

    #[test]
    fn scroll_works_while_dragging() {
        let mut camera = OrbitCamera::default();
        let mut sink = RecordingSink::default();
        camera.on_press(glm::vec2(0.0, 0.0));
        camera.on_scroll(-1.0, &mut sink).unwrap();
        assert_close(camera.state().zoom, -1.3);
        assert!(camera.is_dragging());
    }

    #[test]
    fn inertia_decays_geometrically_and_settles() {
        let mut camera = OrbitCamera::default();
        let mut sink = RecordingSink::default();
        camera.on_press(glm::vec2(0.0, 0.0));
        camera.on_move(glm::vec2(100.0, 0.0), &mut sink).unwrap();
        camera.on_release();
        assert_close(camera.velocity().x, -0.5);

        assert!(camera.tick_inertia(&mut sink).unwrap());
        assert_close(camera.state().yaw(), 0.3 - 0.5);
        assert_close(camera.velocity().x, -0.45);

        let mut frames = 1;
        while camera.tick_inertia(&mut sink).unwrap() {
            frames += 1;
            assert!(frames < 1000, "inertia never settled");
        }
        // 0.5 * 0.9^n < 1e-4 first holds at n = 81
        assert_eq!(frames, 81);

        let settled = camera.state();
        let writes = sink.views.len();
        assert!(!camera.tick_inertia(&mut sink).unwrap());
        assert_eq!(camera.state(), settled);
        assert_eq!(sink.views.len(), writes);
    }

    #[test]
    fn inertia_waits_for_release() {
        let mut camera = OrbitCamera::default();
        let mut sink = RecordingSink::default();
        camera.on_press(glm::vec2(0.0, 0.0));
        camera.on_move(glm::vec2(100.0, 0.0), &mut sink).unwrap();
        let during_drag = camera.state();
        assert!(!camera.tick_inertia(&mut sink).unwrap());
        assert_eq!(camera.state(), during_drag);
    }

    #[test]
    fn idle_camera_without_history_does_not_coast() {
        let mut camera = OrbitCamera::default();
        let mut sink = RecordingSink::default();
        assert!(!camera.tick_inertia(&mut sink).unwrap());
        assert!(sink.views.is_empty());
    }

    #[test]
    fn view_matrix_looks_at_the_origin_from_the_zoom_distance() {
        let camera = OrbitCamera::default();
        let state = camera.state();
        let eye = state.eye_position();
        assert_close(glm::length(&eye), (1.2_f32).exp());

        let view = camera.view_matrix();
        let eye_in_view = view * glm::vec4(eye.x, eye.y, eye.z, 1.0);
        assert!(glm::length(&eye_in_view.xyz()) < 1e-4);

        let origin_in_view = view * glm::vec4(0.0, 0.0, 0.0, 1.0);
        assert_close(origin_in_view.x, 0.0);
        assert_close(origin_in_view.y, 0.0);
        assert!((origin_in_view.z + state.distance()).abs() < 1e-4);
    }

    #[test]
    fn sink_errors_are_propagated() {
        let mut camera = OrbitCamera::default();
        camera.on_press(glm::vec2(0.0, 0.0));
        let error = camera
            .on_move(glm::vec2(10.0, 0.0), &mut RejectingSink)
            .unwrap_err();
        assert!(matches!(error, Error::SinkWrite(_)));
        assert!(camera.on_scroll(1.0, &mut RejectingSink).is_err());
    }

    #[test]
    fn reset_restores_the_initial_state() {
        let mut camera = OrbitCamera::default();
        let mut sink = RecordingSink::default();
        camera.on_press(glm::vec2(0.0, 0.0));
        camera.on_move(glm::vec2(300.0, -40.0), &mut sink).unwrap();
        camera.on_release();
        camera.on_scroll(5.0, &mut sink).unwrap();

        camera.reset(&mut sink).unwrap();
        assert_eq!(camera.state(), OrbitCamera::default().state());
        assert_eq!(camera.velocity(), glm::Vec2::zeros());
        assert!(!camera.tick_inertia(&mut sink).unwrap());
    }

    #[test]
    fn settings_validation() {
        assert!(CameraSettings::default().validate().is_ok());

        let damping = CameraSettings {
            damping: 1.0,
            ..Default::default()
        };
        assert!(matches!(damping.validate(), Err(Error::InvalidConfig(_))));

        let zoom = CameraSettings {
            min_zoom: 1.0,
            max_zoom: 1.0,
            ..Default::default()
        };
        assert!(zoom.validate().is_err());

        let sensitivity = CameraSettings {
            sensitivity: f32::NAN,
            ..Default::default()
        };
        assert!(sensitivity.validate().is_err());
    }
}
