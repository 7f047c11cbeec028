//! # Scene
//!
//! The `scene` module owns everything needed to draw the textured quad: its geometry buffers,
//! the mip-mapped texture, the uniform binding, and the render pipeline.
//!
//! ## Overview
//!
//! A [`Scene`] is created once the GPU is ready and lives as long as the renderer. Each frame:
//!
//! 1. [`Scene::update`] refreshes the projection for the current aspect ratio and the elapsed
//!    time, then uploads the uniform block.
//! 2. [`Scene::render`] records the draw call into the frame's render pass.
//!
//! The view matrix is not touched by either step. The orbit camera writes it through
//! [`Scene::view_sink`] whenever its orientation changes.
//!
//! ## Example Usage
//!
//! ```ignore
//! let mut scene = Scene::new(&device, &queue, surface_format, &checkerboard(512, 32))?;
//! camera.sync(&mut scene.view_sink(&queue))?;
//!
//! scene.update(&queue, aspect_ratio, delta_time);
//! scene.render(&mut render_pass);
//! ```
//!
//! ## Projection
//!
//! A right-handed perspective with a 45 degree vertical field of view and a `[0.01, 100]` depth
//! range mapped to `wgpu`'s `[0, 1]` clip space.

// The pipeline's depth-stencil state has to agree with the depth attachment the renderer creates.
use crate::renderer::Renderer;

// `Vertex` describes the buffer layout; `VERTICES` are the four corners of the quad.
use crate::vertex::{Vertex, VERTICES};

use crate::error::Result;
use crate::mipmap::Image;
use crate::texture::MipTexture;
use crate::uniform_binding::{UniformBinding, ViewMatrixWriter};

use crate::INDICES;
use crate::SHADER_SOURCE;

/// Vertical field of view of the projection, in degrees.
pub const FIELD_OF_VIEW_DEGREES: f32 = 45.0;

/// Near clipping plane distance.
pub const Z_NEAR: f32 = 0.01;

/// Far clipping plane distance.
pub const Z_FAR: f32 = 100.0;

/// The textured quad together with its GPU resources.
///
/// # Fields
///
/// - `model`: Object-to-world transform of the quad.
/// - `vertex_buffer` and `index_buffer`: The quad geometry.
/// - `texture`: The mip-mapped texture sampled by the fragment shader.
/// - `uniform`: The uniform buffer and the bind group tying it to the texture.
/// - `pipeline`: The render pipeline drawing the quad.
/// - `elapsed`: Seconds accumulated by [`Scene::update`].
pub struct Scene {
    /// The model transformation matrix of the quad.
    ///
    /// The quad already lies in the `z = 0` plane around the orbit target, so this stays the
    /// identity unless a caller moves it.
    pub model: nalgebra_glm::Mat4,

    /// The four vertices of the quad.
    pub vertex_buffer: wgpu::Buffer,

    /// Two counter-clockwise triangles referencing `vertex_buffer`.
    pub index_buffer: wgpu::Buffer,

    /// The uniform block, its GPU buffer, and the bind group.
    ///
    /// Its CPU mirror is the single source of truth for the view matrix, so the per-frame
    /// upload in `update` never undoes a camera write.
    pub uniform: UniformBinding,

    /// The texture and sampler bound at bindings 1 and 2.
    pub texture: MipTexture,

    /// The `wgpu::RenderPipeline` used to draw the quad.
    pub pipeline: wgpu::RenderPipeline,

    /// Seconds since the scene was created.
    pub elapsed: f32,
}

impl Scene {
    /// Creates the scene, uploading `image` and its whole mip chain to the GPU.
    ///
    /// # Errors
    ///
    /// Fails when the mip chain cannot be generated or uploaded, see [`MipTexture::new`].
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        image: &Image,
    ) -> Result<Self> {
        let vertex_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents: bytemuck::cast_slice(&VERTICES),
                usage: wgpu::BufferUsages::VERTEX,
            },
        );

        let index_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: bytemuck::cast_slice(&INDICES),
                usage: wgpu::BufferUsages::INDEX,
            },
        );

        let texture = MipTexture::new(device, queue, image)?;

        let uniform = UniformBinding::new(device, &texture);

        let pipeline = Self::create_pipeline(device, surface_format, &uniform);

        Ok(Self {
            model: nalgebra_glm::Mat4::identity(),
            vertex_buffer,
            index_buffer,
            uniform,
            texture,
            pipeline,
            elapsed: 0.0,
        })
    }

    /// Records the draw call of the quad into `renderpass`.
    pub fn render<'rpass>(&'rpass self, renderpass: &mut wgpu::RenderPass<'rpass>) {
        renderpass.set_pipeline(&self.pipeline);
        renderpass.set_bind_group(0, &self.uniform.bind_group, &[]);

        renderpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        renderpass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        renderpass.draw_indexed(0..(INDICES.len() as _), 0, 0..1);
    }

    /// Refreshes the projection, model, and time uniforms and uploads the block.
    ///
    /// The view matrix is left as the camera last wrote it.
    pub fn update(&mut self, queue: &wgpu::Queue, aspect_ratio: f32, delta_time: f32) {
        self.elapsed += delta_time;

        let uniforms = &mut self.uniform.uniforms;
        uniforms.projection = projection_matrix(aspect_ratio);
        uniforms.model = self.model;
        uniforms.time = self.elapsed;

        self.uniform.update_buffer(queue);
    }

    /// Returns the sink through which the orbit camera publishes its view matrix.
    pub fn view_sink<'a>(&'a mut self, queue: &'a wgpu::Queue) -> ViewMatrixWriter<'a> {
        ViewMatrixWriter::new(queue, &mut self.uniform)
    }

    /// `(width, height)` of every uploaded mip level, level 0 first.
    pub fn mip_extents(&self) -> &[(u32, u32)] {
        &self.texture.extents
    }

    fn create_pipeline(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        uniform: &UniformBinding,
    ) -> wgpu::RenderPipeline {
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Quad Shader"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(SHADER_SOURCE)),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Quad Pipeline Layout"),
            bind_group_layouts: &[&uniform.bind_group_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Quad Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: Some("vertex_main"),
                buffers: &[Vertex::description(&Vertex::vertex_attributes())],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None, // the quad is seen from both sides while orbiting
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
                unclipped_depth: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: Renderer::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                entry_point: Some("fragment_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
            cache: None,
        })
    }
}

/// Perspective projection for the given aspect ratio.
pub fn projection_matrix(aspect_ratio: f32) -> nalgebra_glm::Mat4 {
    nalgebra_glm::perspective_rh_zo(
        aspect_ratio,
        FIELD_OF_VIEW_DEGREES.to_radians(),
        Z_NEAR,
        Z_FAR,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_maps_the_depth_range_to_zero_one() {
        let projection = projection_matrix(16.0 / 9.0);
        let project = |z: f32| {
            let clip = projection * nalgebra_glm::vec4(0.0, 0.0, z, 1.0);
            clip.z / clip.w
        };
        assert!(project(-Z_NEAR).abs() < 1e-4);
        assert!((project(-Z_FAR) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn projection_uses_a_45_degree_vertical_field_of_view() {
        let projection = projection_matrix(1.0);
        let expected = 1.0 / (FIELD_OF_VIEW_DEGREES.to_radians() / 2.0).tan();
        assert!((projection[(1, 1)] - expected).abs() < 1e-5);
    }
}
