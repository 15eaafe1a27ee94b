use std::rc::Rc;

use billboard_ngin::{
    Camera, GraphicsContext, Texture,
    cgmath::{Matrix4, SquareMatrix},
    gfx::{DrawCall, UniformSlot, UniformValue},
};

pub(crate) const BASIC_SHADER: &str = include_str!("../../assets/shaders/basic.shader");

/// Camera with fixed matrices so expected uniforms are easy to spell out.
pub(crate) struct FixedCamera {
    pub yaw: f32,
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
}

impl FixedCamera {
    pub(crate) fn identity() -> Self {
        Self::with_yaw(0.0)
    }

    pub(crate) fn with_yaw(yaw: f32) -> Self {
        Self {
            yaw,
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
        }
    }
}

impl Camera for FixedCamera {
    fn view_matrix(&self) -> Matrix4<f32> {
        self.view
    }

    fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }

    fn yaw(&self) -> f32 {
        self.yaw
    }
}

/// A 2x2 opaque texture in a single colour.
pub(crate) fn solid_texture(ctx: &mut dyn GraphicsContext, rgba: [u8; 4]) -> Rc<Texture> {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba));
    let texture = Texture::from_image(ctx, &image::DynamicImage::ImageRgba8(img), "solid")
        .expect("texture upload failed");
    Rc::new(texture)
}

pub(crate) fn uniform(call: &DrawCall, slot: Option<UniformSlot>) -> Option<UniformValue> {
    let slot = slot?;
    call.uniforms
        .iter()
        .find(|(s, _)| *s == slot)
        .map(|(_, value)| *value)
}

pub(crate) fn mat4(value: Matrix4<f32>) -> UniformValue {
    UniformValue::Mat4(value.into())
}

#[cfg(feature = "integration-tests")]
pub(crate) use gpu::OffscreenTarget;

#[cfg(feature = "integration-tests")]
mod gpu {
    use std::time::Duration;

    use billboard_ngin::{WgpuContext, data_structures::texture::DepthTexture};

    pub(crate) const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    /// A headless device rendering into a texture that can be read back.
    pub(crate) struct OffscreenTarget {
        pub gfx: WgpuContext,
        texture: wgpu::Texture,
        depth: DepthTexture,
        width: u32,
        height: u32,
    }

    impl OffscreenTarget {
        /// `width * 4` has to be a multiple of 256 for the readback copy.
        pub(crate) async fn new(width: u32, height: u32) -> anyhow::Result<Self> {
            let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::new_without_display_handle());
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::default(),
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await?;
            let (device, queue) = adapter
                .request_device(&wgpu::DeviceDescriptor {
                    label: Some("test device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                    memory_hints: Default::default(),
                    experimental_features: wgpu::ExperimentalFeatures::default(),
                    trace: wgpu::Trace::Off,
                })
                .await?;

            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("test target"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: COLOR_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });
            let depth = DepthTexture::new(&device, [width, height], "test depth");
            let gfx = WgpuContext::new(device, queue, COLOR_FORMAT);
            Ok(Self {
                gfx,
                texture,
                depth,
                width,
                height,
            })
        }

        /// Renders everything recorded so far and returns the frame.
        pub(crate) async fn render(&mut self, clear: wgpu::Color) -> anyhow::Result<image::RgbaImage> {
            let view = self.texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.gfx.flush(&view, Some(&self.depth.view), clear)?;

            let u32_size = std::mem::size_of::<u32>() as u32;
            let output_buffer = self.gfx.device().create_buffer(&wgpu::BufferDescriptor {
                size: (u32_size * self.width * self.height) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                label: None,
                mapped_at_creation: false,
            });
            let mut encoder = self
                .gfx
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &self.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &output_buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(u32_size * self.width),
                        rows_per_image: Some(self.height),
                    },
                },
                wgpu::Extent3d {
                    width: self.width,
                    height: self.height,
                    depth_or_array_layers: 1,
                },
            );
            self.gfx.queue().submit(std::iter::once(encoder.finish()));

            let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
            let buffer_slice = output_buffer.slice(..);
            buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
                tx.send(result).unwrap();
            });
            self.gfx.device().poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(Duration::from_secs(3)),
            })?;
            rx.receive().await.expect("map callback dropped")?;
            let data = buffer_slice.get_mapped_range().to_vec();
            output_buffer.unmap();
            image::RgbaImage::from_raw(self.width, self.height, data)
                .ok_or_else(|| anyhow::anyhow!("readback has the wrong size"))
        }
    }
}
