//! Sampled textures and the depth attachment.
//!
//! [`Texture`] is a decoded image uploaded through a [`GraphicsContext`]; the
//! handle it owns is what gets bound to a texture unit. [`DepthTexture`] is the
//! render attachment used by the wgpu surface.

use anyhow::Context as _;
use image::{ImageFormat, load_from_memory_with_format};

use crate::gfx::{GraphicsContext, TextureHandle};

/// Standard depth buffer texture format (32-bit float).
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// An RGBA texture owned by a context.
///
/// Typically created via [`from_bytes`](Self::from_bytes) from the contents of
/// an image file and shared between billboards or models through an `Rc`.
#[derive(Debug)]
pub struct Texture {
    handle: TextureHandle,
    width: u32,
    height: u32,
}

impl Texture {
    /// Decodes image file contents and uploads them.
    ///
    /// # Arguments
    ///
    /// * `bytes` represent raw image file data (PNG, JPEG, etc.)
    /// * `label` is used as a debug name for the GPU resource
    /// * `format` is an optional file extension hint (e.g. "png"). If None, auto-detect.
    pub fn from_bytes(
        ctx: &mut dyn GraphicsContext,
        bytes: &[u8],
        label: &str,
        format: Option<&str>,
    ) -> anyhow::Result<Self> {
        let img = match format {
            None => image::load_from_memory(bytes)?,
            Some(fmt) => {
                let format = ImageFormat::from_extension(fmt)
                    .with_context(|| format!("unknown image format `{fmt}`"))?;
                load_from_memory_with_format(bytes, format)?
            }
        };
        Self::from_image(ctx, &img, label)
    }

    pub fn from_image(
        ctx: &mut dyn GraphicsContext,
        img: &image::DynamicImage,
        label: &str,
    ) -> anyhow::Result<Self> {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let handle = ctx.create_texture(&rgba, label)?;
        Ok(Self {
            handle,
            width,
            height,
        })
    }

    pub fn handle(&self) -> &TextureHandle {
        &self.handle
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Depth attachment matching the colour target size.
#[derive(Debug)]
pub struct DepthTexture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl DepthTexture {
    /// Create a depth texture for depth-testing during rendering.
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn new(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[DEPTH_FORMAT],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::HeadlessContext;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 128]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn decoded_textures_keep_their_size() {
        let mut ctx = HeadlessContext::new();
        let texture = Texture::from_bytes(&mut ctx, &png(4, 2), "tree", Some("png")).unwrap();
        assert_eq!(texture.size(), (4, 2));
        assert_eq!(ctx.texture_size(texture.handle().id()), Some((4, 2)));
    }

    #[test]
    fn garbage_is_not_an_image() {
        let mut ctx = HeadlessContext::new();
        assert!(Texture::from_bytes(&mut ctx, b"not an image", "broken", None).is_err());
        assert!(Texture::from_bytes(&mut ctx, &png(1, 1), "broken", Some("nope")).is_err());
        assert_eq!(ctx.live_resources(), 0);
    }
}
