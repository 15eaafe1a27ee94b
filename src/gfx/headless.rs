//! In-memory backend.
//!
//! Keeps buffer contents, program metadata and texture sizes on the host and
//! records every submitted [`DrawCall`]. Nothing is rasterised; the recorded
//! calls and the binding state are what tests assert on.

use std::collections::{HashMap, VecDeque};

use crate::{
    gfx::{
        BindingState, BufferHandle, BufferId, BufferTarget, DrawCall, GraphicsContext,
        ProgramHandle, ProgramId, Resource, ResourceTracker, TextureHandle, TextureId,
    },
    shader::LinkedProgram,
};

/// Number of releases [`HeadlessContext::released`] remembers.
pub const RELEASE_LOG_CAPACITY: usize = 256;

#[derive(Debug, Default)]
pub struct HeadlessContext {
    state: BindingState,
    tracker: ResourceTracker,
    buffers: HashMap<BufferId, (BufferTarget, Vec<u8>)>,
    programs: HashMap<ProgramId, LinkedProgram>,
    textures: HashMap<TextureId, (u32, u32)>,
    draws: Vec<DrawCall>,
    released: VecDeque<Resource>,
    released_total: usize,
}

impl HeadlessContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every draw call submitted so far, in order.
    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    pub fn take_draws(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.draws)
    }

    pub fn buffer_data(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(&id).map(|(_, data)| data.as_slice())
    }

    pub fn program(&self, id: ProgramId) -> Option<&LinkedProgram> {
        self.programs.get(&id)
    }

    pub fn texture_size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&id).copied()
    }

    /// Number of buffers, programs and textures still alive.
    pub fn live_resources(&mut self) -> usize {
        self.collect_garbage();
        self.buffers.len() + self.programs.len() + self.textures.len()
    }

    /// The last [`RELEASE_LOG_CAPACITY`] released resources, in release order.
    pub fn released(&mut self) -> &[Resource] {
        self.collect_garbage();
        self.released.make_contiguous()
    }

    /// Number of resources released over the lifetime of the context.
    pub fn released_total(&mut self) -> usize {
        self.collect_garbage();
        self.released_total
    }

    pub fn collect_garbage(&mut self) {
        for resource in self.tracker.drain_released() {
            match resource {
                Resource::Buffer(id) => {
                    self.buffers.remove(&id);
                }
                Resource::Program(id) => {
                    self.programs.remove(&id);
                }
                Resource::Texture(id) => {
                    self.textures.remove(&id);
                }
            }
            self.state.forget(resource);
            log::debug!("released {resource:?}");
            if self.released.len() == RELEASE_LOG_CAPACITY {
                self.released.pop_front();
            }
            self.released.push_back(resource);
            self.released_total += 1;
        }
    }
}

impl GraphicsContext for HeadlessContext {
    fn state(&self) -> &BindingState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BindingState {
        &mut self.state
    }

    fn create_program(&mut self, program: &LinkedProgram) -> anyhow::Result<ProgramHandle> {
        self.collect_garbage();
        let handle = self.tracker.program();
        self.programs.insert(handle.id(), program.clone());
        Ok(handle)
    }

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> anyhow::Result<BufferHandle> {
        self.collect_garbage();
        let handle = self.tracker.buffer();
        self.buffers.insert(handle.id(), (target, data.to_vec()));
        Ok(handle)
    }

    fn write_buffer(&mut self, buffer: &BufferHandle, data: &[u8]) -> anyhow::Result<()> {
        self.collect_garbage();
        let (_, contents) = self
            .buffers
            .get_mut(&buffer.id())
            .ok_or_else(|| anyhow::anyhow!("buffer {:?} does not exist", buffer.id()))?;
        contents.clear();
        contents.extend_from_slice(data);
        Ok(())
    }

    fn create_texture(&mut self, image: &image::RgbaImage, label: &str) -> anyhow::Result<TextureHandle> {
        self.collect_garbage();
        let handle = self.tracker.texture();
        log::debug!("texture {label} ({}x{})", image.width(), image.height());
        self.textures.insert(handle.id(), image.dimensions());
        Ok(handle)
    }

    fn submit(&mut self, call: DrawCall) {
        self.draws.push(call);
    }

    fn program_info(&self, program: ProgramId) -> Option<&LinkedProgram> {
        self.programs.get(&program)
    }

    fn has_buffer(&self, buffer: BufferId) -> bool {
        self.buffers.contains_key(&buffer)
    }
}
