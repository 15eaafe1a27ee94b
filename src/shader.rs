//! Shader program building.
//!
//! A program is built from a vertex and a fragment WGSL source. Each stage is
//! compiled (parsed and validated with naga), the two stages are linked (every
//! fragment input must be written by the vertex stage with the same type and
//! interpolation, and shared resources must agree) and the result is handed to
//! the context to create the program object.
//!
//! Attribute and uniform locations are resolved by name from the reflected
//! stages:
//!
//! - the attribute location of `name` is the `@location` of the vertex entry
//!   point input called `name`
//! - the uniform location of `name` is the `@group`/`@binding` of the module
//!   scope resource called `name`
//!
//! [`ShaderProgram::build`] never fails: problems are logged and an invalid
//! program is returned, which every binding call tolerates.

use std::{collections::HashMap, fmt};

use naga::{
    AddressSpace, Binding, Interpolation, Module, Sampling, Scalar, ScalarKind, TypeInner,
    valid::{Capabilities, ValidationFlags, Validator},
};
use thiserror::Error;

use crate::{
    gfx::{AttribLocation, GraphicsContext, ProgramHandle, UniformLocation, UniformSlot},
    resources::load_string,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShaderError {
    #[error("Unable to compile the {stage} shader:\n{message}")]
    Compile { stage: ShaderStage, message: String },
    #[error("The {stage} shader has no {stage} entry point")]
    MissingEntryPoint { stage: ShaderStage },
    #[error("Failed to link program: {0}")]
    Link(String),
    #[error("Failed to create program object: {0}")]
    Backend(String),
}

/// Kind of a program resource binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// Uniform buffer of `size` bytes.
    Uniform { size: u32 },
    Texture,
    Sampler,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingInfo {
    pub name: String,
    pub slot: UniformSlot,
    pub kind: BindingKind,
    pub vertex: bool,
    pub fragment: bool,
}

/// A named `@location` of a stage interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name: String,
    pub location: u32,
    pub components: u32,
    /// `None` unless the value is a scalar or a vector.
    pub scalar: Option<Scalar>,
    pub interpolation: Option<Interpolation>,
    pub sampling: Option<Sampling>,
}

impl AttributeInfo {
    /// WGSL spelling of the value type, e.g. `vec2<f32>`.
    pub fn type_name(&self) -> String {
        let Some(scalar) = self.scalar else {
            return "a composite".to_string();
        };
        let scalar = match scalar.kind {
            ScalarKind::Float => format!("f{}", scalar.width * 8),
            ScalarKind::Sint => format!("i{}", scalar.width * 8),
            ScalarKind::Uint => format!("u{}", scalar.width * 8),
            ScalarKind::Bool => "bool".to_string(),
            other => format!("{other:?}"),
        };
        match self.components {
            1 => scalar,
            n => format!("vec{n}<{scalar}>"),
        }
    }

    /// True for `f32` scalars and vectors, the only inputs vertex buffers
    /// feed here.
    pub fn is_float(&self) -> bool {
        self.scalar == Some(Scalar::F32)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageSource {
    pub source: String,
    pub entry_point: String,
}

/// One successfully compiled stage together with its reflected interface.
#[derive(Debug, Clone)]
pub struct CompiledStage {
    pub stage: ShaderStage,
    pub source: StageSource,
    pub inputs: Vec<AttributeInfo>,
    pub outputs: Vec<AttributeInfo>,
    pub bindings: Vec<(String, UniformSlot, BindingKind)>,
}

/// A vertex and a fragment stage that fit together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkedProgram {
    pub vertex: StageSource,
    pub fragment: StageSource,
    /// Vertex stage inputs.
    pub attributes: Vec<AttributeInfo>,
    pub bindings: Vec<BindingInfo>,
}

impl LinkedProgram {
    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    pub fn binding(&self, name: &str) -> Option<&BindingInfo> {
        self.bindings.iter().find(|binding| binding.name == name)
    }
}

/// Parses, validates and reflects one stage using the baseline capabilities.
pub fn compile(stage: ShaderStage, source: &str) -> Result<CompiledStage, ShaderError> {
    compile_with(stage, source, Capabilities::default())
}

/// Parses, validates and reflects one stage. Shaders using anything outside
/// `capabilities` fail to compile.
pub fn compile_with(
    stage: ShaderStage,
    source: &str,
    capabilities: Capabilities,
) -> Result<CompiledStage, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Compile {
        stage,
        message: e.emit_to_string(source),
    })?;
    Validator::new(ValidationFlags::all(), capabilities)
        .validate(&module)
        .map_err(|e| ShaderError::Compile {
            stage,
            message: e.emit_to_string(source),
        })?;

    let entry = module
        .entry_points
        .iter()
        .find(|entry| entry.stage == stage.naga())
        .ok_or(ShaderError::MissingEntryPoint { stage })?;

    let mut inputs = Vec::new();
    for argument in &entry.function.arguments {
        interface(&module, argument.name.as_deref(), argument.ty, argument.binding.as_ref(), &mut inputs);
    }
    let mut outputs = Vec::new();
    if let Some(result) = &entry.function.result {
        interface(&module, None, result.ty, result.binding.as_ref(), &mut outputs);
    }

    let mut bindings = Vec::new();
    for (_, global) in module.global_variables.iter() {
        let (Some(binding), Some(name)) = (&global.binding, &global.name) else {
            continue;
        };
        let inner = &module.types[global.ty].inner;
        let kind = match (global.space, inner) {
            (AddressSpace::Uniform, inner) => BindingKind::Uniform {
                size: inner.size(module.to_ctx()),
            },
            (AddressSpace::Handle, TypeInner::Image { .. }) => BindingKind::Texture,
            (AddressSpace::Handle, TypeInner::Sampler { .. }) => BindingKind::Sampler,
            _ => {
                log::warn!("{stage} shader resource `{name}` has an unsupported kind and is ignored");
                continue;
            }
        };
        let slot = UniformSlot {
            group: binding.group,
            binding: binding.binding,
        };
        bindings.push((name.clone(), slot, kind));
    }

    Ok(CompiledStage {
        stage,
        source: StageSource {
            source: source.to_string(),
            entry_point: entry.name.clone(),
        },
        inputs,
        outputs,
        bindings,
    })
}

/// Collects the `@location`s of an entry point argument or result, descending
/// into structs.
fn interface(
    module: &Module,
    name: Option<&str>,
    ty: naga::Handle<naga::Type>,
    binding: Option<&Binding>,
    out: &mut Vec<AttributeInfo>,
) {
    match binding {
        Some(Binding::Location {
            location,
            interpolation,
            sampling,
            ..
        }) => {
            let (components, scalar) = value_type(module, ty);
            out.push(AttributeInfo {
                name: name.unwrap_or_default().to_string(),
                location: *location,
                components,
                scalar,
                interpolation: *interpolation,
                sampling: *sampling,
            })
        }
        Some(Binding::BuiltIn(_)) => (),
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    interface(module, member.name.as_deref(), member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

fn value_type(module: &Module, ty: naga::Handle<naga::Type>) -> (u32, Option<Scalar>) {
    match module.types[ty].inner {
        TypeInner::Scalar(scalar) => (1, Some(scalar)),
        TypeInner::Vector { size, scalar } => (size as u32, Some(scalar)),
        _ => (0, None),
    }
}

/// Checks that two compiled stages form a program.
pub fn link(vertex: CompiledStage, fragment: CompiledStage) -> Result<LinkedProgram, ShaderError> {
    for input in &fragment.inputs {
        let Some(output) = vertex.outputs.iter().find(|output| output.location == input.location) else {
            return Err(ShaderError::Link(format!(
                "fragment input `{}` at location {} is not written by the vertex shader",
                input.name, input.location
            )));
        };
        if output.scalar != input.scalar || output.components != input.components {
            return Err(ShaderError::Link(format!(
                "fragment input `{}` at location {} is {} but the vertex shader writes {}",
                input.name,
                input.location,
                input.type_name(),
                output.type_name()
            )));
        }
        if output.interpolation != input.interpolation || output.sampling != input.sampling {
            return Err(ShaderError::Link(format!(
                "fragment input `{}` at location {} is interpolated as {:?} {:?} but the vertex shader writes {:?} {:?}",
                input.name,
                input.location,
                input.interpolation,
                input.sampling,
                output.interpolation,
                output.sampling
            )));
        }
    }

    let mut bindings: Vec<BindingInfo> = vertex
        .bindings
        .iter()
        .map(|(name, slot, kind)| BindingInfo {
            name: name.clone(),
            slot: *slot,
            kind: *kind,
            vertex: true,
            fragment: false,
        })
        .collect();
    for (name, slot, kind) in fragment.bindings {
        match bindings.iter_mut().find(|binding| binding.slot == slot) {
            Some(shared) if shared.kind != kind || shared.name != name => {
                return Err(ShaderError::Link(format!(
                    "@group({}) @binding({}) is `{}` in the vertex shader but `{}` in the fragment shader",
                    slot.group, slot.binding, shared.name, name
                )));
            }
            Some(shared) => shared.fragment = true,
            None => bindings.push(BindingInfo {
                name,
                slot,
                kind,
                vertex: false,
                fragment: true,
            }),
        }
    }
    bindings.sort_by_key(|binding| binding.slot);

    Ok(LinkedProgram {
        vertex: vertex.source,
        fragment: fragment.source,
        attributes: vertex.inputs,
        bindings,
    })
}

/// Vertex and fragment source text of one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSource {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// Loads the two stages from separate asset files.
    pub async fn load(vertex_file: &str, fragment_file: &str) -> anyhow::Result<Self> {
        let vertex = load_string(vertex_file).await?;
        let fragment = load_string(fragment_file).await?;
        Ok(Self { vertex, fragment })
    }

    /// Loads a combined file, see [`ShaderSource::parse_combined`].
    pub async fn load_combined(file_name: &str) -> anyhow::Result<Self> {
        let text = load_string(file_name).await?;
        Self::parse_combined(&text)
    }

    /// Splits a combined file into its stages.
    ///
    /// The file is divided by `#shader vertex` and `#shader fragment` marker
    /// lines; everything up to the next marker belongs to the named stage.
    pub fn parse_combined(text: &str) -> anyhow::Result<Self> {
        let mut vertex: Option<String> = None;
        let mut fragment: Option<String> = None;
        let mut current: Option<&mut String> = None;

        for line in text.lines() {
            if let Some(stage) = line.trim().strip_prefix("#shader") {
                current = match stage.trim() {
                    "vertex" => Some(vertex.get_or_insert_with(String::new)),
                    "fragment" => Some(fragment.get_or_insert_with(String::new)),
                    other => anyhow::bail!("unknown shader stage marker `{other}`"),
                };
                continue;
            }
            if let Some(source) = current.as_deref_mut() {
                source.push_str(line);
                source.push('\n');
            }
        }

        match (vertex, fragment) {
            (Some(vertex), Some(fragment)) => Ok(Self { vertex, fragment }),
            (None, _) => anyhow::bail!("combined shader has no `#shader vertex` section"),
            (_, None) => anyhow::bail!("combined shader has no `#shader fragment` section"),
        }
    }
}

/// A program object plus the locations reflected from its stages.
#[derive(Debug, Default)]
pub struct ShaderProgram {
    handle: Option<ProgramHandle>,
    attributes: HashMap<String, u32>,
    uniforms: HashMap<String, UniformSlot>,
}

impl ShaderProgram {
    /// The sentinel for a program that failed to build.
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Builds a program, logging and returning [`ShaderProgram::invalid`] on
    /// failure.
    pub fn build(ctx: &mut dyn GraphicsContext, source: &ShaderSource) -> Self {
        match Self::try_build(ctx, source) {
            Ok(program) => program,
            Err(e) => {
                log::error!("{e}");
                Self::invalid()
            }
        }
    }

    pub fn try_build(ctx: &mut dyn GraphicsContext, source: &ShaderSource) -> Result<Self, ShaderError> {
        let capabilities = ctx.shader_capabilities();
        let vertex = compile_with(ShaderStage::Vertex, &source.vertex, capabilities)?;
        let fragment = compile_with(ShaderStage::Fragment, &source.fragment, capabilities)?;
        let linked = link(vertex, fragment)?;
        let handle = ctx
            .create_program(&linked)
            .map_err(|e| ShaderError::Backend(format!("{e:#}")))?;
        log::debug!(
            "built program {:?} ({} attributes, {} bindings)",
            handle.id(),
            linked.attributes.len(),
            linked.bindings.len()
        );

        Ok(Self {
            handle: Some(handle),
            attributes: linked
                .attributes
                .iter()
                .map(|attribute| (attribute.name.clone(), attribute.location))
                .collect(),
            uniforms: linked
                .bindings
                .iter()
                .map(|binding| (binding.name.clone(), binding.slot))
                .collect(),
        })
    }

    pub fn is_valid(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<&ProgramHandle> {
        self.handle.as_ref()
    }

    /// Location of the vertex input `name`; logs and returns `None` if the
    /// program has no such input.
    pub fn attrib_location(&self, name: &str) -> AttribLocation {
        let location = self.attributes.get(name).copied();
        if location.is_none() {
            log::warn!("Problem getting attribute `{name}`");
        }
        location
    }

    /// Location of the resource `name`; logs and returns `None` if the program
    /// has no such resource.
    pub fn uniform_location(&self, name: &str) -> UniformLocation {
        let location = self.uniforms.get(name).copied();
        if location.is_none() {
            log::warn!("Problem getting uniform `{name}`");
        }
        location
    }
}
