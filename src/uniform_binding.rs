//! # Uniform Binding Module
//!
//! This module defines the `UniformBinding` struct, which owns the single bind group of the
//! render pipeline and keeps a CPU-side copy of the uniform block in sync with the GPU buffer.
//!
//! ## Overview
//!
//! The bind group exposes three resources to the shaders:
//!
//! - **Binding 0**: the uniform buffer holding [`UniformBuffer`], visible to the vertex and
//!   fragment stages.
//! - **Binding 1**: the mip-mapped base texture (`texture_2d<f32>`, filterable).
//! - **Binding 2**: the filtering sampler paired with that texture.
//!
//! ## Updating Uniform Data
//!
//! Two write paths exist and both go through the CPU mirror in [`UniformBinding::uniforms`]:
//!
//! 1. [`UniformBinding::update_buffer`] uploads the whole block. The scene uses it once per
//!    frame after refreshing the projection and the elapsed time.
//! 2. [`UniformBinding::write_view`] stores a new view matrix in the mirror and uploads only the
//!    64 bytes at [`VIEW_OFFSET`]. The orbit camera reaches it through [`ViewMatrixWriter`].
//!
//! Because the full upload always sends the mirror, a view written by the camera is never
//! overwritten by a stale one.
//!
//! ## Example
//!
//! ```ignore
//! let mut binding = UniformBinding::new(&device, &mip_texture);
//! binding.uniforms.projection = projection;
//! binding.update_buffer(&queue);
//!
//! camera.sync(&mut ViewMatrixWriter::new(&queue, &mut binding))?;
//!
//! render_pass.set_bind_group(0, &binding.bind_group, &[]);
//! ```

use nalgebra_glm as glm;

use crate::camera::UniformWriteSink;
use crate::error::{Error, Result};
use crate::texture::MipTexture;
use crate::uniform_buffer::{UniformBuffer, VIEW_OFFSET};

/// GPU resources of the pipeline's bind group together with the CPU copy of the uniform block.
pub struct UniformBinding {
    /// The uniform buffer bound at binding 0.
    pub buffer: wgpu::Buffer,

    /// The bind group that links the uniform buffer, texture view and sampler to the pipeline.
    pub bind_group: wgpu::BindGroup,

    /// Describes the three bindings; used when creating the pipeline layout.
    pub bind_group_layout: wgpu::BindGroupLayout,

    /// Last values written to (or about to be written to) `buffer`.
    pub uniforms: UniformBuffer,
}

impl UniformBinding {
    /// Creates the uniform buffer and the bind group around `texture`.
    pub fn new(device: &wgpu::Device, texture: &MipTexture) -> Self {
        let uniforms = UniformBuffer::default();

        let buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("Uniform Buffer"),
                contents: bytemuck::cast_slice(&[uniforms]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            },
        );

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<UniformBuffer>() as _,
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("uniform_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
            label: Some("uniform_bind_group"),
        });

        Self {
            buffer,
            bind_group,
            bind_group_layout,
            uniforms,
        }
    }

    /// Uploads the whole CPU mirror.
    pub fn update_buffer(&mut self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniforms]))
    }

    /// Stores `view` in the mirror and uploads just the view matrix.
    pub fn write_view(&mut self, queue: &wgpu::Queue, view: &glm::Mat4) {
        self.uniforms.view = *view;
        queue.write_buffer(&self.buffer, VIEW_OFFSET, bytemuck::bytes_of(view));
    }
}

/// [`UniformWriteSink`] that forwards view matrices into a [`UniformBinding`].
pub struct ViewMatrixWriter<'a> {
    queue: &'a wgpu::Queue,
    binding: &'a mut UniformBinding,
}

impl<'a> ViewMatrixWriter<'a> {
    pub fn new(queue: &'a wgpu::Queue, binding: &'a mut UniformBinding) -> Self {
        Self { queue, binding }
    }
}

impl UniformWriteSink for ViewMatrixWriter<'_> {
    fn write_view_matrix(&mut self, view: &glm::Mat4) -> Result<()> {
        check_view_matrix(view)?;
        self.binding.write_view(self.queue, view);
        Ok(())
    }
}

/// Rejects matrices containing NaN or infinity.
fn check_view_matrix(view: &glm::Mat4) -> Result<()> {
    if view.iter().all(|value| value.is_finite()) {
        Ok(())
    } else {
        Err(Error::SinkWrite(format!(
            "refusing to upload a non-finite view matrix: {view:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_view_matrices_are_accepted() {
        let view = glm::look_at_rh(
            &glm::vec3(1.0, 2.0, 3.0),
            &glm::Vec3::zeros(),
            &glm::Vec3::z(),
        );
        assert!(check_view_matrix(&view).is_ok());
    }

    #[test]
    fn non_finite_view_matrices_are_rejected() {
        let mut view = glm::Mat4::identity();
        view[(2, 3)] = f32::NAN;
        assert!(matches!(
            check_view_matrix(&view),
            Err(Error::SinkWrite(_))
        ));

        view[(2, 3)] = f32::INFINITY;
        assert!(check_view_matrix(&view).is_err());
    }
}
