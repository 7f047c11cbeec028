//! # Uniform Buffer
//!
//! This module defines the `UniformBuffer` struct, the CPU-side mirror of the uniform block read
//! by both shader stages. It carries the three transformation matrices separately instead of a
//! single premultiplied MVP matrix, so the camera can rewrite the view matrix on its own without
//! touching the rest of the block.
//!
//! ## Layout
//!
//! The struct matches the WGSL declaration in `shader_source.wgsl` byte for byte:
//!
//! | Field        | WGSL type         | Offset | Size |
//! |--------------|-------------------|--------|------|
//! | `projection` | `mat4x4<f32>`     | 0      | 64   |
//! | `view`       | `mat4x4<f32>`     | 64     | 64   |
//! | `model`      | `mat4x4<f32>`     | 128    | 64   |
//! | `color`      | `vec4<f32>`       | 192    | 16   |
//! | `time`       | `f32`             | 208    | 4    |
//! | `_padding`   | (struct rounding) | 212    | 12   |
//!
//! WGSL rounds the size of a uniform struct up to its 16-byte alignment, hence the explicit
//! padding. [`VIEW_OFFSET`] is the byte offset used for partial view updates.
//!
//! ### Memory Layout and Traits
//!
//! - `#[repr(C)]`: Keeps the declared field order and a C-compatible layout.
//! - `bytemuck::Pod` and `bytemuck::Zeroable`: Allow the struct (and any single field) to be
//!   viewed as raw bytes for `wgpu::Queue::write_buffer`.

/// The uniform block shared by the vertex and fragment stages.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UniformBuffer {
    /// Perspective projection, refreshed every frame from the surface aspect ratio.
    pub projection: nalgebra_glm::Mat4,

    /// World-to-camera transform. Written only by the orbit camera's sink.
    pub view: nalgebra_glm::Mat4,

    /// Object-to-world transform of the textured quad.
    pub model: nalgebra_glm::Mat4,

    /// Tint multiplied with the sampled texel.
    pub color: nalgebra_glm::Vec4,

    /// Seconds since the scene was created.
    ///
    /// Part of the WGSL block layout; neither shader stage reads it at the moment.
    pub time: f32,

    pub _padding: [f32; 3],
}

impl Default for UniformBuffer {
    fn default() -> Self {
        Self {
            projection: nalgebra_glm::Mat4::identity(),
            view: nalgebra_glm::Mat4::identity(),
            model: nalgebra_glm::Mat4::identity(),
            color: nalgebra_glm::vec4(1.0, 1.0, 1.0, 1.0),
            time: 0.0,
            _padding: [0.0; 3],
        }
    }
}

/// Byte offset of [`UniformBuffer::view`] inside the GPU buffer.
pub const VIEW_OFFSET: wgpu::BufferAddress = std::mem::offset_of!(UniformBuffer, view) as _;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_the_wgsl_block() {
        assert_eq!(std::mem::size_of::<UniformBuffer>(), 224);
        assert_eq!(VIEW_OFFSET, 64);
        assert_eq!(std::mem::offset_of!(UniformBuffer, color), 192);
        assert_eq!(std::mem::offset_of!(UniformBuffer, time), 208);
    }

    #[test]
    fn view_bytes_are_a_contiguous_slice_of_the_block() {
        let mut uniforms = UniformBuffer::default();
        uniforms.view = nalgebra_glm::translation(&nalgebra_glm::vec3(1.0, 2.0, 3.0));
        let block = bytemuck::bytes_of(&uniforms);
        let view = bytemuck::bytes_of(&uniforms.view);
        let start = VIEW_OFFSET as usize;
        assert_eq!(&block[start..start + view.len()], view);
    }
}
