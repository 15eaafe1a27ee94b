//! Mesh models: vertex layout, GPU buffers and the bind/unbind contract used by
//! renderers.

use std::rc::Rc;

use crate::{
    data_structures::texture::Texture,
    gfx::{AttribLocation, BufferHandle, BufferTarget, GraphicsContext},
    resources::{load_string, mesh::MeshData},
};

/// One vertex as stored in a vertex buffer: position followed by UV.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    /// Bytes between two consecutive vertices.
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;
    pub const POSITION_OFFSET: u32 = 0;
    pub const UV_OFFSET: u32 = std::mem::size_of::<[f32; 3]>() as u32;

    pub const fn new(x: f32, y: f32, z: f32, u: f32, v: f32) -> Self {
        Self {
            position: [x, y, z],
            uv: [u, v],
        }
    }
}

/// Where the geometry of a [`Model`] comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshSource {
    /// Explicit vertex and index lists. Empty `indices` means a non-indexed
    /// triangle list.
    Data { vertices: Vec<Vertex>, indices: Vec<u32> },
    /// An already parsed mesh file.
    Mesh(MeshData),
}

impl MeshSource {
    fn into_parts(self) -> (Vec<Vertex>, Vec<u32>) {
        match self {
            MeshSource::Data { vertices, indices } => (vertices, indices),
            MeshSource::Mesh(mesh) => (mesh.vertices, mesh.indices),
        }
    }
}

/// Something a renderer can draw.
///
/// Renderers call the binding methods in a fixed order (vertex buffer,
/// attributes, index buffer, texture), issue [`Drawable::draw`] and then undo
/// them in reverse order.
pub trait Drawable {
    fn bind_vertex_buffer(&self, ctx: &mut dyn GraphicsContext);
    fn unbind_vertex_buffer(&self, ctx: &mut dyn GraphicsContext);
    fn bind_index_buffer(&self, ctx: &mut dyn GraphicsContext);
    fn unbind_index_buffer(&self, ctx: &mut dyn GraphicsContext);
    /// Binds the material on texture unit `unit`, or explicitly unbinds the
    /// unit when there is none.
    fn bind_texture(&self, ctx: &mut dyn GraphicsContext, unit: u32);
    fn unbind_texture(&self, ctx: &mut dyn GraphicsContext, unit: u32);

    /// Describes the vertex layout to the context. Must be called while the
    /// vertex buffer is bound.
    fn set_attributes(
        &self,
        ctx: &mut dyn GraphicsContext,
        position: AttribLocation,
        position_components: u32,
        uv: AttribLocation,
        uv_components: u32,
    );

    fn vertex_count(&self) -> u32;
    fn index_count(&self) -> u32;

    /// Issues one draw call: indexed when the drawable has indices.
    fn draw(&self, ctx: &mut dyn GraphicsContext) {
        if self.index_count() > 0 {
            ctx.draw_elements(self.index_count());
        } else {
            ctx.draw_arrays(0, self.vertex_count());
        }
    }
}

/// A mesh uploaded to the GPU together with its optional material.
///
/// Only counts and handles are kept on the host; the buffers are released when
/// the model is dropped.
#[derive(Debug)]
pub struct Model {
    vertex_buffer: BufferHandle,
    index_buffer: Option<BufferHandle>,
    vertex_count: u32,
    index_count: u32,
    material: Option<Rc<Texture>>,
}

impl Model {
    pub fn load(ctx: &mut dyn GraphicsContext, source: MeshSource) -> anyhow::Result<Self> {
        let (vertices, indices) = source.into_parts();
        validate(&vertices, &indices)?;

        let vertex_buffer = ctx.create_buffer(BufferTarget::Array, bytemuck::cast_slice(&vertices))?;
        let index_buffer = if indices.is_empty() {
            None
        } else {
            Some(ctx.create_buffer(BufferTarget::Element, bytemuck::cast_slice(&indices))?)
        };
        log::debug!("loaded model with {} vertices and {} indices", vertices.len(), indices.len());

        Ok(Self {
            vertex_buffer,
            index_buffer,
            vertex_count: vertices.len() as u32,
            index_count: indices.len() as u32,
            material: None,
        })
    }

    /// Loads a triangulated OBJ file from the assets directory.
    pub async fn load_obj(
        ctx: &mut dyn GraphicsContext,
        file_name: &str,
        flip_uv: bool,
    ) -> anyhow::Result<Self> {
        let text = load_string(file_name).await?;
        let mesh = MeshData::parse_obj(&text, flip_uv)?;
        Self::load(ctx, MeshSource::Mesh(mesh))
    }

    /// Replaces the whole geometry. On error the model is left untouched.
    pub fn reupload(&mut self, ctx: &mut dyn GraphicsContext, source: MeshSource) -> anyhow::Result<()> {
        let material = self.material.take();
        match Self::load(ctx, source) {
            Ok(mut model) => {
                model.material = material;
                *self = model;
                Ok(())
            }
            Err(e) => {
                self.material = material;
                Err(e)
            }
        }
    }

    pub fn material(&self) -> Option<&Rc<Texture>> {
        self.material.as_ref()
    }

    pub fn set_material(&mut self, material: Option<Rc<Texture>>) {
        self.material = material;
    }

    pub fn vertex_buffer(&self) -> &BufferHandle {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> Option<&BufferHandle> {
        self.index_buffer.as_ref()
    }
}

fn validate(vertices: &[Vertex], indices: &[u32]) -> anyhow::Result<()> {
    if vertices.is_empty() {
        anyhow::bail!("a model needs at least one vertex");
    }
    if u32::try_from(vertices.len()).is_err() || u32::try_from(indices.len()).is_err() {
        anyhow::bail!("model has more than u32::MAX vertices or indices");
    }
    if let Some(index) = indices.iter().find(|&&index| index as usize >= vertices.len()) {
        anyhow::bail!("index {index} is out of range for {} vertices", vertices.len());
    }
    Ok(())
}

impl Drawable for Model {
    fn bind_vertex_buffer(&self, ctx: &mut dyn GraphicsContext) {
        ctx.bind_buffer(BufferTarget::Array, Some(&self.vertex_buffer));
    }

    fn unbind_vertex_buffer(&self, ctx: &mut dyn GraphicsContext) {
        ctx.bind_buffer(BufferTarget::Array, None);
    }

    fn bind_index_buffer(&self, ctx: &mut dyn GraphicsContext) {
        if let Some(index_buffer) = &self.index_buffer {
            ctx.bind_buffer(BufferTarget::Element, Some(index_buffer));
        }
    }

    fn unbind_index_buffer(&self, ctx: &mut dyn GraphicsContext) {
        ctx.bind_buffer(BufferTarget::Element, None);
    }

    fn bind_texture(&self, ctx: &mut dyn GraphicsContext, unit: u32) {
        ctx.active_texture(unit);
        ctx.bind_texture(self.material.as_deref().map(Texture::handle));
    }

    fn unbind_texture(&self, ctx: &mut dyn GraphicsContext, unit: u32) {
        ctx.active_texture(unit);
        ctx.bind_texture(None);
    }

    fn set_attributes(
        &self,
        ctx: &mut dyn GraphicsContext,
        position: AttribLocation,
        position_components: u32,
        uv: AttribLocation,
        uv_components: u32,
    ) {
        ctx.enable_vertex_attrib(position);
        ctx.vertex_attrib_pointer(position, position_components, Vertex::STRIDE, Vertex::POSITION_OFFSET);
        ctx.enable_vertex_attrib(uv);
        ctx.vertex_attrib_pointer(uv, uv_components, Vertex::STRIDE, Vertex::UV_OFFSET);
    }

    fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    fn index_count(&self) -> u32 {
        self.index_count
    }
}
