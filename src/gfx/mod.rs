//! Stateful drawing context.
//!
//! The renderers in this crate talk to the GPU through [`GraphicsContext`], a
//! small immediate-mode surface: select a program, bind buffers, describe vertex
//! attributes, write uniforms, bind textures, toggle blending/culling and issue
//! draw calls. The binding state is tracked in [`BindingState`] and every draw
//! call is resolved into a self-contained [`DrawCall`] and checked against its
//! program before being handed to the backend, so both backends accept and
//! skip the same draws.
//!
//! As with disabled attribute arrays in GL, a program input without an enabled
//! attribute reads zero instead of failing the draw.
//!
//! Two backends exist:
//!
//! - [`WgpuContext`] records draw calls and replays them into a wgpu render pass
//! - [`HeadlessContext`] keeps everything in memory, for tests and dry runs
//!
//! Resources (buffers, programs, textures) are handed out as [`GpuHandle`]s.
//! Dropping a handle queues the resource for release on the context that created
//! it, so an early return never leaks GPU memory.

use std::{cell::RefCell, rc::Rc};

use cgmath::Matrix4;
use naga::valid::Capabilities;

pub mod headless;
pub mod state;
pub mod wgpu_context;

pub use headless::HeadlessContext;
pub use state::{
    AttribPointer, BindingState, ConstantInput, DrawCall, DrawRange, MAX_CONSTANT_INPUTS, UniformValue,
};
pub use wgpu_context::WgpuContext;

use crate::shader::LinkedProgram;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub(crate) u64);

/// Any resource a context can release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Buffer(BufferId),
    Program(ProgramId),
    Texture(TextureId),
}

impl From<BufferId> for Resource {
    fn from(id: BufferId) -> Self {
        Resource::Buffer(id)
    }
}

impl From<ProgramId> for Resource {
    fn from(id: ProgramId) -> Self {
        Resource::Program(id)
    }
}

impl From<TextureId> for Resource {
    fn from(id: TextureId) -> Self {
        Resource::Texture(id)
    }
}

pub(crate) type ReleaseQueue = Rc<RefCell<Vec<Resource>>>;

/// Owning handle to a context resource.
///
/// The handle is the only way to refer to the resource in binding calls. When
/// it is dropped the resource is queued for release and freed the next time the
/// owning context drains its queue.
#[derive(Debug)]
pub struct GpuHandle<Id: Copy + Into<Resource>> {
    id: Id,
    release: ReleaseQueue,
}

impl<Id: Copy + Into<Resource>> GpuHandle<Id> {
    pub fn id(&self) -> Id {
        self.id
    }
}

impl<Id: Copy + Into<Resource>> Drop for GpuHandle<Id> {
    fn drop(&mut self) {
        self.release.borrow_mut().push(self.id.into());
    }
}

pub type BufferHandle = GpuHandle<BufferId>;
pub type ProgramHandle = GpuHandle<ProgramId>;
pub type TextureHandle = GpuHandle<TextureId>;

/// Hands out ids and collects dropped handles for one context.
#[derive(Debug, Default)]
pub struct ResourceTracker {
    next_id: u64,
    release: ReleaseQueue,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn buffer(&mut self) -> BufferHandle {
        let id = BufferId(self.next());
        self.handle(id)
    }

    pub fn program(&mut self) -> ProgramHandle {
        let id = ProgramId(self.next());
        self.handle(id)
    }

    pub fn texture(&mut self) -> TextureHandle {
        let id = TextureId(self.next());
        self.handle(id)
    }

    fn handle<Id: Copy + Into<Resource>>(&self, id: Id) -> GpuHandle<Id> {
        GpuHandle {
            id,
            release: Rc::clone(&self.release),
        }
    }

    /// Takes every resource whose handle was dropped since the last call.
    pub fn drain_released(&self) -> Vec<Resource> {
        std::mem::take(&mut *self.release.borrow_mut())
    }
}

/// Which binding point a buffer is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per-vertex data read through attribute pointers.
    Array,
    /// `u32` indices for indexed draws.
    Element,
}

/// Toggleable fixed-function state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Blend,
    CullFace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendFunc {
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

impl BlendFunc {
    pub const REPLACE: Self = Self {
        src: BlendFactor::One,
        dst: BlendFactor::Zero,
    };

    pub const ALPHA: Self = Self {
        src: BlendFactor::SrcAlpha,
        dst: BlendFactor::OneMinusSrcAlpha,
    };
}

impl Default for BlendFunc {
    fn default() -> Self {
        Self::REPLACE
    }
}

/// `@group` / `@binding` pair of a program resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformSlot {
    pub group: u32,
    pub binding: u32,
}

/// Attribute location of a program input. `None` when the name was not found.
pub type AttribLocation = Option<u32>;

/// Uniform location of a program resource. `None` when the name was not found.
pub type UniformLocation = Option<UniformSlot>;

/// The drawing surface every renderer is written against.
///
/// Backends implement the resource and submission methods; binding calls are
/// provided on top of [`BindingState`] so every backend shares the same
/// semantics. Calls taking a location silently do nothing for `None`.
pub trait GraphicsContext {
    fn state(&self) -> &BindingState;
    fn state_mut(&mut self) -> &mut BindingState;

    /// Creates a program object from a linked shader pair.
    fn create_program(&mut self, program: &LinkedProgram) -> anyhow::Result<ProgramHandle>;

    /// Creates a buffer and fills it with `data`.
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> anyhow::Result<BufferHandle>;

    /// Replaces the whole content of a buffer.
    fn write_buffer(&mut self, buffer: &BufferHandle, data: &[u8]) -> anyhow::Result<()>;

    /// Uploads an RGBA8 image as a sampled texture.
    fn create_texture(&mut self, image: &image::RgbaImage, label: &str) -> anyhow::Result<TextureHandle>;

    /// Hands a fully resolved draw call to the backend.
    fn submit(&mut self, call: DrawCall);

    /// The linked program behind a live program object.
    fn program_info(&self, program: ProgramId) -> Option<&LinkedProgram>;

    fn has_buffer(&self, buffer: BufferId) -> bool;

    /// Shader features programs built for this context may use.
    fn shader_capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn use_program(&mut self, program: Option<&ProgramHandle>) {
        self.state_mut().program = program.map(GpuHandle::id);
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<&BufferHandle>) {
        let id = buffer.map(GpuHandle::id);
        match target {
            BufferTarget::Array => self.state_mut().array_buffer = id,
            BufferTarget::Element => self.state_mut().element_buffer = id,
        }
    }

    fn enable_vertex_attrib(&mut self, location: AttribLocation) {
        if let Some(location) = location {
            self.state_mut().attribute_mut(location).enabled = true;
        }
    }

    fn disable_vertex_attrib(&mut self, location: AttribLocation) {
        if let Some(location) = location {
            self.state_mut().attribute_mut(location).enabled = false;
        }
    }

    /// Describes how the currently bound array buffer feeds `location`.
    fn vertex_attrib_pointer(&mut self, location: AttribLocation, components: u32, stride: u32, offset: u32) {
        let Some(location) = location else {
            return;
        };
        let Some(buffer) = self.state().array_buffer else {
            log::warn!("vertex_attrib_pointer({location}) called without a bound array buffer");
            return;
        };
        self.state_mut().attribute_mut(location).pointer = Some(AttribPointer {
            buffer,
            components,
            stride,
            offset,
        });
    }

    fn uniform_matrix4(&mut self, location: UniformLocation, value: &Matrix4<f32>) {
        if let Some(slot) = location {
            self.state_mut().set_uniform(slot, UniformValue::Mat4((*value).into()));
        }
    }

    /// Points a sampled texture uniform at a texture unit.
    fn uniform_sampler(&mut self, location: UniformLocation, unit: u32) {
        if let Some(slot) = location {
            self.state_mut().set_uniform(slot, UniformValue::Sampler(unit));
        }
    }

    fn active_texture(&mut self, unit: u32) {
        self.state_mut().active_texture_unit = unit;
    }

    /// Binds (or unbinds) a texture on the active texture unit.
    fn bind_texture(&mut self, texture: Option<&TextureHandle>) {
        let state = self.state_mut();
        let unit = state.active_texture_unit;
        match texture {
            Some(texture) => {
                state.texture_units.insert(unit, texture.id());
            }
            None => {
                state.texture_units.remove(&unit);
            }
        }
    }

    fn enable(&mut self, capability: Capability) {
        self.state_mut().set_capability(capability, true);
    }

    fn disable(&mut self, capability: Capability) {
        self.state_mut().set_capability(capability, false);
    }

    fn is_enabled(&self, capability: Capability) -> bool {
        self.state().capability(capability)
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.state_mut().blend_func = BlendFunc { src, dst };
    }

    /// Draws `count` vertices of the bound array buffer as a triangle list.
    fn draw_arrays(&mut self, first: u32, count: u32) {
        match resolve_draw(self, DrawRange::Arrays { first, count }) {
            Ok(call) => self.submit(call),
            Err(reason) => log::warn!("draw_arrays skipped: {reason}"),
        }
    }

    /// Draws `count` indices of the bound element buffer as a triangle list.
    fn draw_elements(&mut self, count: u32) {
        match resolve_draw(self, DrawRange::Elements { count }) {
            Ok(call) => self.submit(call),
            Err(reason) => log::warn!("draw_elements skipped: {reason}"),
        }
    }
}

fn resolve_draw<C: GraphicsContext + ?Sized>(ctx: &C, range: DrawRange) -> Result<DrawCall, String> {
    let mut call = ctx.state().resolve(range)?;
    let program = ctx
        .program_info(call.program)
        .ok_or_else(|| format!("program {:?} does not exist", call.program))?;
    call.match_program(program)?;

    let buffers = call.attributes.iter().map(|(_, pointer)| pointer.buffer);
    if let Some(missing) = buffers.chain(call.index_buffer).find(|&buffer| !ctx.has_buffer(buffer)) {
        return Err(format!("buffer {missing:?} does not exist"));
    }
    Ok(call)
}

/// Runs `f` with `capabilities` enabled and `blend` as blend function, then
/// restores whatever was set before.
pub fn with_capabilities<R>(
    ctx: &mut dyn GraphicsContext,
    capabilities: &[Capability],
    blend: BlendFunc,
    f: impl FnOnce(&mut dyn GraphicsContext) -> R,
) -> R {
    let previous: Vec<(Capability, bool)> = capabilities
        .iter()
        .map(|&capability| (capability, ctx.is_enabled(capability)))
        .collect();
    let previous_blend = ctx.state().blend_func;

    for &capability in capabilities {
        ctx.enable(capability);
    }
    ctx.blend_func(blend.src, blend.dst);

    let result = f(ctx);

    ctx.blend_func(previous_blend.src, previous_blend.dst);
    for (capability, was_enabled) in previous {
        if was_enabled {
            ctx.enable(capability);
        } else {
            ctx.disable(capability);
        }
    }
    result
}

/// Runs `f` and then puts back the texture bound on `unit` and the active
/// texture unit as they were before.
pub fn with_texture_unit<R>(
    ctx: &mut dyn GraphicsContext,
    unit: u32,
    f: impl FnOnce(&mut dyn GraphicsContext) -> R,
) -> R {
    let previous_unit = ctx.state().active_texture_unit;
    let previous_texture = ctx.state().texture_units.get(&unit).copied();

    let result = f(ctx);

    let state = ctx.state_mut();
    match previous_texture {
        Some(texture) => {
            state.texture_units.insert(unit, texture);
        }
        None => {
            state.texture_units.remove(&unit);
        }
    }
    state.active_texture_unit = previous_unit;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_handles_are_queued_for_release() {
        let mut tracker = ResourceTracker::new();
        let buffer = tracker.buffer();
        let program = tracker.program();
        let buffer_id = buffer.id();

        drop(buffer);
        assert_eq!(tracker.drain_released(), vec![Resource::Buffer(buffer_id)]);
        assert!(tracker.drain_released().is_empty());

        let program_id = program.id();
        drop(program);
        assert_eq!(tracker.drain_released(), vec![Resource::Program(program_id)]);
    }

    #[test]
    fn ids_are_unique_across_kinds() {
        let mut tracker = ResourceTracker::new();
        let a = tracker.buffer();
        let b = tracker.texture();
        let c = tracker.buffer();
        assert_ne!(a.id().0, b.id().0);
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn capabilities_are_restored_after_scope() {
        let mut ctx = HeadlessContext::new();
        ctx.enable(Capability::CullFace);

        with_capabilities(
            &mut ctx,
            &[Capability::Blend, Capability::CullFace],
            BlendFunc::ALPHA,
            |ctx| {
                assert!(ctx.is_enabled(Capability::Blend));
                assert!(ctx.is_enabled(Capability::CullFace));
                assert_eq!(ctx.state().blend_func, BlendFunc::ALPHA);
            },
        );

        assert!(!ctx.is_enabled(Capability::Blend));
        assert!(ctx.is_enabled(Capability::CullFace));
        assert_eq!(ctx.state().blend_func, BlendFunc::REPLACE);
    }

    #[test]
    fn texture_unit_is_restored_after_scope() {
        let mut ctx = HeadlessContext::new();
        let image = image::RgbaImage::new(1, 1);
        let outer = ctx.create_texture(&image, "outer").unwrap();
        let inner = ctx.create_texture(&image, "inner").unwrap();
        ctx.active_texture(2);
        ctx.bind_texture(Some(&outer));

        with_texture_unit(&mut ctx, 2, |ctx| {
            ctx.active_texture(2);
            ctx.bind_texture(Some(&inner));
            ctx.active_texture(5);
        });

        assert_eq!(ctx.state().texture_units.get(&2), Some(&outer.id()));
        assert_eq!(ctx.state().active_texture_unit, 2);

        with_texture_unit(&mut ctx, 7, |ctx| {
            ctx.active_texture(7);
            ctx.bind_texture(Some(&inner));
        });
        assert_eq!(ctx.state().texture_units.get(&7), None);
    }
}
