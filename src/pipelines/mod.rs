//! Render pipeline creation and the keys pipelines are cached under.

pub mod basic;

pub use basic::{StageEntry, mk_render_pipeline};

use crate::gfx::{BlendFunc, ConstantInput, ProgramId};

/// Layout of one vertex buffer slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexBufferKey {
    pub stride: u32,
    /// `(shader location, f32 components, byte offset)` per attribute.
    pub attributes: Vec<(u32, u32, u32)>,
}

/// Everything a render pipeline depends on besides the target formats.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub program: ProgramId,
    pub vertex_buffers: Vec<VertexBufferKey>,
    /// Inputs read from the zero-filled slot after `vertex_buffers`.
    pub constant_inputs: Vec<ConstantInput>,
    pub blend: Option<BlendFunc>,
    pub cull_back_faces: bool,
}
