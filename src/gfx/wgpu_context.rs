//! wgpu backend.
//!
//! Draw calls arrive matched against the program they use. Each is turned
//! into a pipeline (cached per program, vertex layout, blend and cull state),
//! vertex buffers and freshly built bind groups, and recorded.
//! [`WgpuContext::flush`] replays every recorded draw into one render pass.
//!
//! Program inputs without an attribute array read from a zero-filled buffer
//! bound after the draw's own vertex buffers.
//!
//! Uniform values are captured per draw. Vertex and index buffer contents are
//! not: a buffer written twice before a flush is read with its last contents
//! by every draw of that flush.
//!
//! Validation errors the device raises while a resource or pipeline is created
//! fail that operation instead of reaching wgpu's default panicking handler.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::Context as _;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::texture::DEPTH_FORMAT,
    gfx::{
        BindingState, BlendFactor, BlendFunc, BufferHandle, BufferId, BufferTarget, DrawCall,
        DrawRange, GraphicsContext, MAX_CONSTANT_INPUTS, ProgramHandle, ProgramId, Resource,
        ResourceTracker, TextureHandle, TextureId, UniformSlot, UniformValue,
    },
    pipelines::{PipelineKey, StageEntry, VertexBufferKey, mk_render_pipeline},
    shader::{BindingKind, LinkedProgram},
};

/// Bytes of the buffer constant inputs read from: one zero `vec4<f32>`.
const ZERO_INPUT_SIZE: wgpu::BufferAddress = 16;

/// Collects the errors wgpu reports outside of error scopes.
///
/// wgpu-core hands them to the handler while the failing call is still on the
/// stack, so draining before and after a call attributes them to it.
#[derive(Debug, Clone, Default)]
struct DeviceErrors(Arc<Mutex<Vec<String>>>);

impl DeviceErrors {
    fn install(device: &wgpu::Device) -> Self {
        let errors = Self::default();
        let sink = Arc::clone(&errors.0);
        device.on_uncaptured_error(Arc::new(move |error: wgpu::Error| {
            sink.lock().unwrap_or_else(PoisonError::into_inner).push(error.to_string());
        }));
        errors
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Errors raised since the last call, as one message.
    fn check(&self, operation: &str) -> Result<(), String> {
        let errors = self.take();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(format!("{operation} failed: {}", errors.join("\n")))
        }
    }

    /// Logs errors that belong to no particular call.
    fn log_stale(&self) {
        for error in self.take() {
            log::error!("device error: {error}");
        }
    }
}

/// A sampled texture with the sampler it is read through.
#[derive(Debug, Clone)]
struct GpuTexture {
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

#[derive(Debug)]
struct GpuProgram {
    linked: LinkedProgram,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    bind_group_layouts: Vec<wgpu::BindGroupLayout>,
    pipeline_layout: wgpu::PipelineLayout,
}

#[derive(Debug)]
struct RecordedDraw {
    pipeline: wgpu::RenderPipeline,
    vertex_buffers: Vec<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
    bind_groups: Vec<wgpu::BindGroup>,
    reads_zero_inputs: bool,
    range: DrawRange,
}

#[derive(Debug)]
pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,
    state: BindingState,
    tracker: ResourceTracker,
    programs: HashMap<ProgramId, GpuProgram>,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    textures: HashMap<TextureId, GpuTexture>,
    fallback_texture: GpuTexture,
    zero_input: wgpu::Buffer,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    recorded: Vec<RecordedDraw>,
    errors: DeviceErrors,
}

impl WgpuContext {
    /// A context rendering into `color_format` targets with a
    /// [`DEPTH_FORMAT`] depth attachment.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, color_format: wgpu::TextureFormat) -> Self {
        Self::with_depth_format(device, queue, color_format, Some(DEPTH_FORMAT))
    }

    pub fn with_depth_format(
        device: wgpu::Device,
        queue: wgpu::Queue,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        let errors = DeviceErrors::install(&device);
        let white = image::RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
        let fallback_texture = upload_texture(&device, &queue, &white, "fallback texture");
        let zero_input = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Zero Input Buffer"),
            size: ZERO_INPUT_SIZE,
            usage: wgpu::BufferUsages::VERTEX,
            mapped_at_creation: false,
        });
        errors.log_stale();
        Self {
            device,
            queue,
            color_format,
            depth_format,
            state: BindingState::default(),
            tracker: ResourceTracker::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            fallback_texture,
            zero_input,
            pipelines: HashMap::new(),
            recorded: Vec::new(),
            errors,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    /// Number of draws waiting for the next [`WgpuContext::flush`].
    pub fn pending_draws(&self) -> usize {
        self.recorded.len()
    }

    /// Frees every resource whose handle was dropped.
    pub fn collect_garbage(&mut self) {
        for resource in self.tracker.drain_released() {
            match resource {
                Resource::Buffer(id) => {
                    self.buffers.remove(&id);
                }
                Resource::Program(id) => {
                    self.programs.remove(&id);
                    self.pipelines.retain(|key, _| key.program != id);
                }
                Resource::Texture(id) => {
                    self.textures.remove(&id);
                }
            }
            self.state.forget(resource);
            log::debug!("released {resource:?}");
        }
    }

    /// Encodes every recorded draw into one render pass that first clears
    /// `target` to `clear`, and submits it. Released resources are freed
    /// afterwards.
    pub fn flush(
        &mut self,
        target: &wgpu::TextureView,
        depth: Option<&wgpu::TextureView>,
        clear: wgpu::Color,
    ) -> anyhow::Result<wgpu::SubmissionIndex> {
        if self.depth_format.is_some() && depth.is_none() {
            anyhow::bail!("pipelines use a depth attachment but no depth view was given");
        }
        let draws = std::mem::take(&mut self.recorded);
        self.errors.log_stale();

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: depth.map(|view| wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            for draw in &draws {
                render_pass.set_pipeline(&draw.pipeline);
                for (index, bind_group) in draw.bind_groups.iter().enumerate() {
                    render_pass.set_bind_group(index as u32, bind_group, &[]);
                }
                for (slot, buffer) in draw.vertex_buffers.iter().enumerate() {
                    render_pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                }
                if draw.reads_zero_inputs {
                    render_pass.set_vertex_buffer(draw.vertex_buffers.len() as u32, self.zero_input.slice(..));
                }
                match draw.range {
                    DrawRange::Arrays { first, count } => render_pass.draw(first..first + count, 0..1),
                    DrawRange::Elements { count } => {
                        if let Some(index_buffer) = &draw.index_buffer {
                            render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                            render_pass.draw_indexed(0..count, 0, 0..1);
                        }
                    }
                }
            }
        }

        let index = self.queue.submit(std::iter::once(encoder.finish()));
        for error in self.errors.take() {
            log::error!("frame submission: {error}");
        }
        self.collect_garbage();
        Ok(index)
    }

    fn record(&mut self, call: &DrawCall) -> Result<RecordedDraw, String> {
        self.errors.log_stale();
        let program = self
            .programs
            .get(&call.program)
            .ok_or_else(|| format!("program {:?} does not exist", call.program))?;

        // One vertex buffer slot per (buffer, stride) pair, in first-use order.
        let mut slots: Vec<(BufferId, VertexBufferKey)> = Vec::new();
        for &(location, pointer) in &call.attributes {
            let attribute = (location, pointer.components, pointer.offset);
            match slots
                .iter_mut()
                .find(|(buffer, key)| *buffer == pointer.buffer && key.stride == pointer.stride)
            {
                Some((_, key)) => key.attributes.push(attribute),
                None => slots.push((
                    pointer.buffer,
                    VertexBufferKey {
                        stride: pointer.stride,
                        attributes: vec![attribute],
                    },
                )),
            }
        }

        let mut vertex_buffers = Vec::with_capacity(slots.len());
        for (id, _) in &slots {
            let buffer = self
                .buffers
                .get(id)
                .ok_or_else(|| format!("vertex buffer {id:?} does not exist"))?;
            vertex_buffers.push(buffer.clone());
        }
        let index_buffer = match call.index_buffer {
            Some(id) => Some(
                self.buffers
                    .get(&id)
                    .ok_or_else(|| format!("index buffer {id:?} does not exist"))?
                    .clone(),
            ),
            None => None,
        };

        let bind_groups = self.bind_groups(program, call);
        self.errors.check("binding resources")?;

        let key = PipelineKey {
            program: call.program,
            vertex_buffers: slots.into_iter().map(|(_, key)| key).collect(),
            constant_inputs: call.constant_inputs.clone(),
            blend: call.blend,
            cull_back_faces: call.cull_back_faces,
        };
        let pipeline = match self.pipelines.get(&key) {
            Some(pipeline) => pipeline.clone(),
            None => {
                let pipeline = self.create_pipeline(program, &key);
                self.errors.check("creating the pipeline")?;
                self.pipelines.insert(key, pipeline.clone());
                pipeline
            }
        };

        Ok(RecordedDraw {
            pipeline,
            vertex_buffers,
            index_buffer,
            bind_groups,
            reads_zero_inputs: !call.constant_inputs.is_empty(),
            range: call.range,
        })
    }

    fn create_pipeline(&self, program: &GpuProgram, key: &PipelineKey) -> wgpu::RenderPipeline {
        log::debug!("creating pipeline for {key:?}");
        let attributes: Vec<Vec<wgpu::VertexAttribute>> = key
            .vertex_buffers
            .iter()
            .map(|buffer| {
                buffer
                    .attributes
                    .iter()
                    .map(|&(location, components, offset)| wgpu::VertexAttribute {
                        offset: offset as wgpu::BufferAddress,
                        shader_location: location,
                        format: vertex_format(components),
                    })
                    .collect()
            })
            .collect();
        let zero_attributes = zero_input_attributes(key);
        let mut layouts: Vec<wgpu::VertexBufferLayout> = key
            .vertex_buffers
            .iter()
            .zip(&attributes)
            .map(|(buffer, attributes)| wgpu::VertexBufferLayout {
                array_stride: buffer.stride as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();
        if !zero_attributes.is_empty() {
            layouts.push(wgpu::VertexBufferLayout {
                array_stride: ZERO_INPUT_SIZE,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &zero_attributes,
            });
        }

        mk_render_pipeline(
            &self.device,
            &program.pipeline_layout,
            self.color_format,
            key.blend.map(blend_state),
            self.depth_format,
            &layouts,
            StageEntry {
                module: &program.vertex,
                entry_point: &program.linked.vertex.entry_point,
            },
            StageEntry {
                module: &program.fragment,
                entry_point: &program.linked.fragment.entry_point,
            },
            key.cull_back_faces.then_some(wgpu::Face::Back),
        )
    }

    fn bind_groups(&self, program: &GpuProgram, call: &DrawCall) -> Vec<wgpu::BindGroup> {
        let uniforms: BTreeMap<UniformSlot, UniformValue> = call.uniforms.iter().copied().collect();
        let textures: BTreeMap<UniformSlot, TextureId> = call.textures.iter().copied().collect();
        let texture_at = |slot: UniformSlot| {
            textures
                .get(&slot)
                .and_then(|id| self.textures.get(id))
                .unwrap_or(&self.fallback_texture)
        };

        program
            .bind_group_layouts
            .iter()
            .enumerate()
            .map(|(group, layout)| {
                let group = group as u32;
                let bindings: Vec<_> = program
                    .linked
                    .bindings
                    .iter()
                    .filter(|binding| binding.slot.group == group)
                    .collect();

                let uniform_buffers: Vec<Option<wgpu::Buffer>> = bindings
                    .iter()
                    .map(|binding| match binding.kind {
                        BindingKind::Uniform { size } => {
                            let mut contents = match uniforms.get(&binding.slot) {
                                Some(UniformValue::Mat4(matrix)) => bytemuck::cast_slice(matrix).to_vec(),
                                _ => Vec::new(),
                            };
                            contents.resize(size as usize, 0);
                            Some(self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                                label: Some(binding.name.as_str()),
                                contents: &contents,
                                usage: wgpu::BufferUsages::UNIFORM,
                            }))
                        }
                        _ => None,
                    })
                    .collect();

                let entries: Vec<wgpu::BindGroupEntry> = bindings
                    .iter()
                    .zip(&uniform_buffers)
                    .map(|(binding, buffer)| wgpu::BindGroupEntry {
                        binding: binding.slot.binding,
                        resource: match (binding.kind, buffer) {
                            (BindingKind::Uniform { .. }, Some(buffer)) => buffer.as_entire_binding(),
                            (BindingKind::Texture, _) | (BindingKind::Uniform { .. }, None) => {
                                wgpu::BindingResource::TextureView(&texture_at(binding.slot).view)
                            }
                            // A sampler reads with the texture bound right before it.
                            (BindingKind::Sampler, _) => {
                                let texture = binding
                                    .slot
                                    .binding
                                    .checked_sub(1)
                                    .map(|previous| texture_at(UniformSlot { group, binding: previous }))
                                    .unwrap_or(&self.fallback_texture);
                                wgpu::BindingResource::Sampler(&texture.sampler)
                            }
                        },
                    })
                    .collect();

                self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("draw_bind_group"),
                    layout,
                    entries: &entries,
                })
            })
            .collect()
    }
}

impl GraphicsContext for WgpuContext {
    fn state(&self) -> &BindingState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BindingState {
        &mut self.state
    }

    fn create_program(&mut self, program: &LinkedProgram) -> anyhow::Result<ProgramHandle> {
        self.collect_garbage();
        self.errors.log_stale();

        let vertex = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Vertex Shader"),
            source: wgpu::ShaderSource::Wgsl(program.vertex.source.as_str().into()),
        });
        let fragment = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Fragment Shader"),
            source: wgpu::ShaderSource::Wgsl(program.fragment.source.as_str().into()),
        });

        let group_count = program
            .bindings
            .iter()
            .map(|binding| binding.slot.group + 1)
            .max()
            .unwrap_or(0);
        let bind_group_layouts: Vec<wgpu::BindGroupLayout> = (0..group_count)
            .map(|group| {
                let entries: Vec<wgpu::BindGroupLayoutEntry> = program
                    .bindings
                    .iter()
                    .filter(|binding| binding.slot.group == group)
                    .map(|binding| {
                        let mut visibility = wgpu::ShaderStages::NONE;
                        if binding.vertex {
                            visibility |= wgpu::ShaderStages::VERTEX;
                        }
                        if binding.fragment {
                            visibility |= wgpu::ShaderStages::FRAGMENT;
                        }
                        wgpu::BindGroupLayoutEntry {
                            binding: binding.slot.binding,
                            visibility,
                            ty: match binding.kind {
                                BindingKind::Uniform { .. } => wgpu::BindingType::Buffer {
                                    ty: wgpu::BufferBindingType::Uniform,
                                    has_dynamic_offset: false,
                                    min_binding_size: None,
                                },
                                BindingKind::Texture => wgpu::BindingType::Texture {
                                    multisampled: false,
                                    view_dimension: wgpu::TextureViewDimension::D2,
                                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                },
                                BindingKind::Sampler => {
                                    wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
                                }
                            },
                            count: None,
                        }
                    })
                    .collect();
                self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("program_bind_group_layout"),
                    entries: &entries,
                })
            })
            .collect();

        let layout_refs: Vec<Option<&wgpu::BindGroupLayout>> = bind_group_layouts.iter().map(Some).collect();
        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &layout_refs,
            immediate_size: 0,
        });
        self.errors.check("creating the program").map_err(anyhow::Error::msg)?;

        let handle = self.tracker.program();
        self.programs.insert(
            handle.id(),
            GpuProgram {
                linked: program.clone(),
                vertex,
                fragment,
                bind_group_layouts,
                pipeline_layout,
            },
        );
        Ok(handle)
    }

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> anyhow::Result<BufferHandle> {
        self.collect_garbage();
        self.errors.log_stale();
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(match target {
                BufferTarget::Array => "Vertex Buffer",
                BufferTarget::Element => "Index Buffer",
            }),
            contents: data,
            usage: buffer_usage(target),
        });
        self.errors.check("creating the buffer").map_err(anyhow::Error::msg)?;
        let handle = self.tracker.buffer();
        self.buffers.insert(handle.id(), buffer);
        Ok(handle)
    }

    fn write_buffer(&mut self, buffer: &BufferHandle, data: &[u8]) -> anyhow::Result<()> {
        self.collect_garbage();
        self.errors.log_stale();
        let current = self
            .buffers
            .get(&buffer.id())
            .with_context(|| format!("buffer {:?} does not exist", buffer.id()))?;

        let mut contents = data.to_vec();
        contents.resize(contents.len().next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT as usize), 0);
        if contents.len() as u64 <= current.size() {
            self.queue.write_buffer(current, 0, &contents);
            self.errors.check("writing the buffer").map_err(anyhow::Error::msg)?;
        } else {
            let replacement = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Resized Buffer"),
                contents: &contents,
                usage: current.usage(),
            });
            self.errors.check("resizing the buffer").map_err(anyhow::Error::msg)?;
            self.buffers.insert(buffer.id(), replacement);
        }
        Ok(())
    }

    fn create_texture(&mut self, image: &image::RgbaImage, label: &str) -> anyhow::Result<TextureHandle> {
        self.collect_garbage();
        if image.width() == 0 || image.height() == 0 {
            anyhow::bail!("texture {label} is empty");
        }
        self.errors.log_stale();
        let texture = upload_texture(&self.device, &self.queue, image, label);
        self.errors
            .check(&format!("uploading texture {label}"))
            .map_err(anyhow::Error::msg)?;
        let handle = self.tracker.texture();
        self.textures.insert(handle.id(), texture);
        Ok(handle)
    }

    fn submit(&mut self, call: DrawCall) {
        match self.record(&call) {
            Ok(draw) => self.recorded.push(draw),
            Err(reason) => log::warn!("draw skipped: {reason}"),
        }
    }

    fn program_info(&self, program: ProgramId) -> Option<&LinkedProgram> {
        self.programs.get(&program).map(|program| &program.linked)
    }

    fn has_buffer(&self, buffer: BufferId) -> bool {
        self.buffers.contains_key(&buffer)
    }

    fn shader_capabilities(&self) -> naga::valid::Capabilities {
        shader_capabilities(self.device.features())
    }
}

/// Shader capabilities the enabled device features unlock.
fn shader_capabilities(features: wgpu::Features) -> naga::valid::Capabilities {
    use naga::valid::Capabilities;

    let mut capabilities = Capabilities::default();
    for (feature, capability) in [
        (wgpu::Features::SHADER_F64, Capabilities::FLOAT64),
        (wgpu::Features::SHADER_F16, Capabilities::SHADER_FLOAT16),
        (wgpu::Features::SHADER_INT64, Capabilities::SHADER_INT64),
        (wgpu::Features::PRIMITIVE_INDEX, Capabilities::PRIMITIVE_INDEX),
        (wgpu::Features::DUAL_SOURCE_BLENDING, Capabilities::DUAL_SOURCE_BLENDING),
        (wgpu::Features::CLIP_DISTANCES, Capabilities::CLIP_DISTANCE),
    ] {
        if features.contains(feature) {
            capabilities |= capability;
        }
    }
    capabilities
}

/// Attributes of the zero-filled slot, every one reading from offset 0.
fn zero_input_attributes(key: &PipelineKey) -> Vec<wgpu::VertexAttribute> {
    key.constant_inputs
        .iter()
        .take(MAX_CONSTANT_INPUTS)
        .map(|input| wgpu::VertexAttribute {
            offset: 0,
            shader_location: input.location,
            format: vertex_format(input.components),
        })
        .collect()
}

fn buffer_usage(target: BufferTarget) -> wgpu::BufferUsages {
    match target {
        BufferTarget::Array => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        BufferTarget::Element => wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
    }
}

fn vertex_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

fn blend_factor(factor: BlendFactor) -> wgpu::BlendFactor {
    match factor {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
    }
}

fn blend_state(func: BlendFunc) -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: blend_factor(func.src),
        dst_factor: blend_factor(func.dst),
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    image: &image::RgbaImage,
    label: &str,
) -> GpuTexture {
    let (width, height) = image.dimensions();
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        image,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    });
    GpuTexture { view, sampler }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::ConstantInput;

    #[test]
    fn blend_func_maps_to_both_components() {
        let state = blend_state(BlendFunc::ALPHA);
        assert_eq!(state.color.src_factor, wgpu::BlendFactor::SrcAlpha);
        assert_eq!(state.alpha.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
        assert_eq!(blend_state(BlendFunc::REPLACE).color, wgpu::BlendComponent::REPLACE);
    }

    #[test]
    fn vertex_formats_follow_component_count() {
        assert_eq!(vertex_format(2), wgpu::VertexFormat::Float32x2);
        assert_eq!(vertex_format(3), wgpu::VertexFormat::Float32x3);
    }

    #[test]
    fn constant_inputs_share_the_zero_slot() {
        let key = PipelineKey {
            program: ProgramId(7),
            vertex_buffers: Vec::new(),
            constant_inputs: vec![
                ConstantInput { location: 1, components: 2 },
                ConstantInput { location: 3, components: 4 },
            ],
            blend: None,
            cull_back_faces: false,
        };

        let attributes = zero_input_attributes(&key);
        assert_eq!(attributes.len(), 2);
        assert!(attributes.iter().all(|attribute| attribute.offset == 0));
        assert_eq!(attributes[0].shader_location, 1);
        assert_eq!(attributes[1].format, wgpu::VertexFormat::Float32x4);
    }

    #[test]
    fn device_features_unlock_shader_capabilities() {
        use naga::valid::Capabilities;

        assert_eq!(shader_capabilities(wgpu::Features::empty()), Capabilities::default());
        let capabilities = shader_capabilities(wgpu::Features::SHADER_F64 | wgpu::Features::SHADER_F16);
        assert!(capabilities.contains(Capabilities::FLOAT64 | Capabilities::SHADER_FLOAT16));
        assert!(!capabilities.contains(Capabilities::SHADER_INT64));
    }

    #[test]
    fn device_errors_are_drained_once() {
        let errors = DeviceErrors::default();
        errors.0.lock().unwrap().push("bad shader".to_string());

        let err = errors.check("creating the program").unwrap_err();
        assert!(err.contains("bad shader"), "{err}");
        assert!(errors.check("creating the program").is_ok());
    }
}
