//! Binding state shared by every backend and the draw calls resolved from it.

use std::collections::{BTreeMap, HashMap};

use crate::{
    gfx::{BlendFunc, BufferId, Capability, ProgramId, Resource, TextureId, UniformSlot},
    shader::LinkedProgram,
};

/// Most program inputs one draw can leave without an enabled attribute.
pub const MAX_CONSTANT_INPUTS: usize = 16;

/// How one attribute location reads from a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttribPointer {
    pub buffer: BufferId,
    /// Number of `f32` components (1 to 4).
    pub components: u32,
    /// Bytes between two consecutive vertices.
    pub stride: u32,
    /// Byte offset of the first component inside a vertex.
    pub offset: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttribState {
    pub enabled: bool,
    pub pointer: Option<AttribPointer>,
}

/// A program input that no enabled attribute array feeds. Every vertex reads
/// zero for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstantInput {
    pub location: u32,
    pub components: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4([[f32; 4]; 4]),
    /// Texture unit a sampled texture reads from.
    Sampler(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawRange {
    Arrays { first: u32, count: u32 },
    Elements { count: u32 },
}

impl DrawRange {
    pub fn count(&self) -> u32 {
        match *self {
            DrawRange::Arrays { count, .. } | DrawRange::Elements { count } => count,
        }
    }
}

/// Everything a backend needs to execute one draw, captured at draw time.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub program: ProgramId,
    /// Enabled attributes, sorted by location.
    pub attributes: Vec<(u32, AttribPointer)>,
    /// Program inputs without an enabled attribute, sorted by location.
    pub constant_inputs: Vec<ConstantInput>,
    pub index_buffer: Option<BufferId>,
    pub uniforms: Vec<(UniformSlot, UniformValue)>,
    /// Sampled texture slots resolved through their texture unit.
    pub textures: Vec<(UniformSlot, TextureId)>,
    /// `None` when blending is disabled.
    pub blend: Option<BlendFunc>,
    pub cull_back_faces: bool,
    pub range: DrawRange,
}

impl DrawCall {
    /// Matches the enabled attributes against the vertex inputs of the
    /// program the call uses and fills in [`DrawCall::constant_inputs`].
    ///
    /// Only `f32` scalar and vector inputs can be drawn: they are the only
    /// ones attribute arrays feed and the only ones a constant zero stands in
    /// for.
    pub fn match_program(&mut self, program: &LinkedProgram) -> Result<(), String> {
        self.constant_inputs.clear();
        for input in &program.attributes {
            if !input.is_float() {
                return Err(format!(
                    "vertex input `{}` (location {}) is {}, not a float scalar or vector",
                    input.name,
                    input.location,
                    input.type_name()
                ));
            }
            if !self.attributes.iter().any(|(location, _)| *location == input.location) {
                self.constant_inputs.push(ConstantInput {
                    location: input.location,
                    components: input.components,
                });
            }
        }
        if self.constant_inputs.len() > MAX_CONSTANT_INPUTS {
            return Err(format!(
                "{} vertex inputs have no enabled attribute, at most {MAX_CONSTANT_INPUTS} can read zero",
                self.constant_inputs.len()
            ));
        }
        self.constant_inputs.sort_by_key(|input| input.location);
        Ok(())
    }
}

/// Current bindings of a context.
///
/// Uniform values belong to the program they were written for and survive
/// `use_program(None)`, everything else is global.
#[derive(Debug, Clone, Default)]
pub struct BindingState {
    pub program: Option<ProgramId>,
    pub array_buffer: Option<BufferId>,
    pub element_buffer: Option<BufferId>,
    pub attributes: BTreeMap<u32, AttribState>,
    pub active_texture_unit: u32,
    pub texture_units: BTreeMap<u32, TextureId>,
    pub blend_enabled: bool,
    pub cull_face_enabled: bool,
    pub blend_func: BlendFunc,
    uniforms: HashMap<ProgramId, BTreeMap<UniformSlot, UniformValue>>,
}

impl BindingState {
    pub fn attribute_mut(&mut self, location: u32) -> &mut AttribState {
        self.attributes.entry(location).or_default()
    }

    pub fn capability(&self, capability: Capability) -> bool {
        match capability {
            Capability::Blend => self.blend_enabled,
            Capability::CullFace => self.cull_face_enabled,
        }
    }

    pub fn set_capability(&mut self, capability: Capability, enabled: bool) {
        match capability {
            Capability::Blend => self.blend_enabled = enabled,
            Capability::CullFace => self.cull_face_enabled = enabled,
        }
    }

    /// Writes a uniform of the program in use.
    pub fn set_uniform(&mut self, slot: UniformSlot, value: UniformValue) {
        match self.program {
            Some(program) => {
                self.uniforms.entry(program).or_default().insert(slot, value);
            }
            None => log::warn!("uniform write to {slot:?} without a program in use"),
        }
    }

    pub fn uniform(&self, program: ProgramId, slot: UniformSlot) -> Option<UniformValue> {
        self.uniforms.get(&program)?.get(&slot).copied()
    }

    pub fn enabled_attributes(&self) -> impl Iterator<Item = u32> + '_ {
        self.attributes
            .iter()
            .filter(|(_, attribute)| attribute.enabled)
            .map(|(&location, _)| location)
    }

    /// True when nothing is bound, no attribute array is enabled and blending
    /// and culling are off. Renderers return the context in this state.
    pub fn is_reset(&self) -> bool {
        self.program.is_none()
            && self.array_buffer.is_none()
            && self.element_buffer.is_none()
            && self.enabled_attributes().next().is_none()
            && self.texture_units.is_empty()
            && !self.blend_enabled
            && !self.cull_face_enabled
    }

    /// Forgets every binding that refers to a released resource.
    pub fn forget(&mut self, resource: Resource) {
        match resource {
            Resource::Buffer(id) => {
                if self.array_buffer == Some(id) {
                    self.array_buffer = None;
                }
                if self.element_buffer == Some(id) {
                    self.element_buffer = None;
                }
                for attribute in self.attributes.values_mut() {
                    if attribute.pointer.is_some_and(|pointer| pointer.buffer == id) {
                        attribute.pointer = None;
                    }
                }
            }
            Resource::Program(id) => {
                if self.program == Some(id) {
                    self.program = None;
                }
                self.uniforms.remove(&id);
            }
            Resource::Texture(id) => self.texture_units.retain(|_, bound| *bound != id),
        }
    }

    /// Captures the state needed to execute a draw of `range`.
    pub fn resolve(&self, range: DrawRange) -> Result<DrawCall, String> {
        let program = self.program.ok_or("no program in use")?;
        if range.count() == 0 {
            return Err("nothing to draw".to_string());
        }

        let mut attributes = Vec::new();
        for location in self.enabled_attributes() {
            match self.attributes[&location].pointer {
                Some(pointer) if (1..=4).contains(&pointer.components) => attributes.push((location, pointer)),
                Some(pointer) => {
                    return Err(format!("attribute {location} has {} components", pointer.components));
                }
                None => return Err(format!("attribute {location} is enabled without a pointer")),
            }
        }

        let index_buffer = match range {
            DrawRange::Elements { .. } => Some(self.element_buffer.ok_or("no element buffer bound")?),
            DrawRange::Arrays { .. } => None,
        };

        let mut uniforms = Vec::new();
        let mut textures = Vec::new();
        if let Some(values) = self.uniforms.get(&program) {
            for (&slot, &value) in values {
                match value {
                    UniformValue::Sampler(unit) => {
                        if let Some(&texture) = self.texture_units.get(&unit) {
                            textures.push((slot, texture));
                        }
                    }
                    UniformValue::Mat4(_) => uniforms.push((slot, value)),
                }
            }
        }

        Ok(DrawCall {
            program,
            attributes,
            constant_inputs: Vec::new(),
            index_buffer,
            uniforms,
            textures,
            blend: self.blend_enabled.then_some(self.blend_func),
            cull_back_faces: self.cull_face_enabled,
            range,
        })
    }
}
