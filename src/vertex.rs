//! # Vertex Module
//!
//! This module provides the `Vertex` struct and its associated methods for defining vertex data
//! for the textured quad. Each vertex carries a position, a normal, a color that tints the
//! sampled texture, and texture coordinates.
//!
//! # Overview
//!
//! ## Structs
//!
//! - [`Vertex`]: A single vertex with position, normal, color and UV attributes.
//!
//! ## Methods
//!
//! - [`Vertex::vertex_attributes`]: Returns the attribute list matching the shader's
//!   `VertexInput` locations.
//! - [`Vertex::description`]: Returns the buffer layout the pipeline uses to step through a
//!   vertex buffer of `Vertex` values.
//!
//! ## Geometry
//!
//! [`VERTICES`] describes a 2x2 quad in the `z = 0` plane of the Z-up world, facing `+Z`, drawn
//! with the indices in [`crate::INDICES`]. The V texture coordinate grows downwards, so the top
//! edge of the quad (`y = +1`) shows the first row of the image.

/// A vertex of the textured quad, laid out for direct upload to a vertex buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Object-space position (`@location(0)`).
    position: [f32; 3],

    /// Object-space normal (`@location(1)`).
    normal: [f32; 3],

    /// Linear RGB tint multiplied with the texture (`@location(2)`).
    color: [f32; 3],

    /// Texture coordinates (`@location(3)`).
    uv: [f32; 2],
}

impl Vertex {
    /// Returns the vertex attributes in shader location order:
    ///
    /// | Location | Field      | Format      |
    /// |----------|------------|-------------|
    /// | 0        | `position` | `Float32x3` |
    /// | 1        | `normal`   | `Float32x3` |
    /// | 2        | `color`    | `Float32x3` |
    /// | 3        | `uv`       | `Float32x2` |
    pub fn vertex_attributes() -> Vec<wgpu::VertexAttribute> {
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3, 3 => Float32x2]
            .to_vec()
    }

    /// Builds the vertex buffer layout for `attributes`, stepping once per vertex with a stride
    /// of `size_of::<Vertex>()`.
    pub fn description(attributes: &[wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }
}

/// The four corners of the quad, counter-clockwise when seen from `+Z`.
pub const VERTICES: [Vertex; 4] = [
    Vertex {
        position: [-1.0, -1.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        color: [1.0, 1.0, 1.0],
        uv: [0.0, 1.0],
    },
    Vertex {
        position: [1.0, -1.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        color: [1.0, 1.0, 1.0],
        uv: [1.0, 1.0],
    },
    Vertex {
        position: [1.0, 1.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        color: [1.0, 1.0, 1.0],
        uv: [1.0, 0.0],
    },
    Vertex {
        position: [-1.0, 1.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        color: [1.0, 1.0, 1.0],
        uv: [0.0, 0.0],
    },
];
