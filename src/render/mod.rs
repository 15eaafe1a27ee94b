//! Renderers.
//!
//! Each renderer owns its shader program and issues its draw calls through a
//! [`GraphicsContext`]. All of them follow the same discipline: bind
//! everything a draw needs, issue exactly one draw, then unbind everything
//! again so the context is left with no program, buffer, attribute array or
//! texture bound and with blending and culling as they were before.
//!
//! - [`Renderer`] draws a plain primitive (the animated triangle by default)
//! - [`BillboardRenderer`] draws textured quads turned towards the camera
//! - [`ModelRenderer`] draws any [`Drawable`](crate::data_structures::model::Drawable)

use cgmath::Matrix4;

use crate::{
    camera::Camera,
    gfx::{AttribLocation, GraphicsContext, UniformLocation},
    shader::{ShaderProgram, ShaderSource},
};

pub mod billboard;
pub mod mesh;
pub mod primitive;

pub use billboard::BillboardRenderer;
pub use mesh::ModelRenderer;
pub use primitive::Renderer;

pub(crate) const BASIC_SHADER: &str = include_str!("../../assets/shaders/basic.shader");
pub(crate) const TEXTURED_VERTEX_SHADER: &str = include_str!("../../assets/shaders/textured.vert.wgsl");
pub(crate) const BILLBOARD_FRAGMENT_SHADER: &str = include_str!("../../assets/shaders/billboard.frag.wgsl");
pub(crate) const MODEL_FRAGMENT_SHADER: &str = include_str!("../../assets/shaders/model.frag.wgsl");

/// Texture unit textured renderers sample from.
pub const DIFFUSE_UNIT: u32 = 0;

/// Locations of the names every built-in program uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgramLocations {
    pub vertex_pos: AttribLocation,
    pub vertex_uv: AttribLocation,
    pub transform: UniformLocation,
    pub view: UniformLocation,
    pub projection: UniformLocation,
    pub diffuse: UniformLocation,
}

impl ProgramLocations {
    /// Looks up the position attribute and the three matrices, plus the UV
    /// attribute and the diffuse texture when `textured`.
    pub fn resolve(program: &ShaderProgram, textured: bool) -> Self {
        if !program.is_valid() {
            return Self::default();
        }
        Self {
            vertex_pos: program.attrib_location("vertex_pos"),
            vertex_uv: textured.then(|| program.attrib_location("vertex_uv")).flatten(),
            transform: program.uniform_location("transform"),
            view: program.uniform_location("view"),
            projection: program.uniform_location("projection"),
            diffuse: textured.then(|| program.uniform_location("diffuse")).flatten(),
        }
    }

    /// Writes the model, view and projection matrices as three uniforms.
    pub fn upload_matrices(&self, ctx: &mut dyn GraphicsContext, transform: &Matrix4<f32>, camera: &dyn Camera) {
        ctx.uniform_matrix4(self.transform, transform);
        ctx.uniform_matrix4(self.view, &camera.view_matrix());
        ctx.uniform_matrix4(self.projection, &camera.projection_matrix());
    }

    pub fn disable_attributes(&self, ctx: &mut dyn GraphicsContext) {
        ctx.disable_vertex_attrib(self.vertex_pos);
        ctx.disable_vertex_attrib(self.vertex_uv);
    }
}

/// Builds a program for a renderer. Failures are logged and returned.
pub(crate) fn build_program(ctx: &mut dyn GraphicsContext, source: &ShaderSource) -> anyhow::Result<ShaderProgram> {
    Ok(ShaderProgram::try_build(ctx, source).inspect_err(|e| log::error!("{e}"))?)
}
