//! Frame driver.
//!
//! [`GameEngine`] owns the window surface and the [`WgpuContext`] renderers
//! record into. The application keeps its own event loop and calls
//! [`GameEngine::render_frame`] once per redraw; inside the callback renderers
//! issue their draws, afterwards everything recorded is flushed to the
//! swapchain and presented.

use std::{sync::Arc, time::Duration};

use instant::Instant;
use winit::window::Window;

use crate::{
    config::EngineConfig,
    context::Context,
    gfx::{GraphicsContext, WgpuContext},
    render::{BillboardRenderer, ModelRenderer, Renderer},
};

/// Timing of the frame being drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Number of frames presented before this one.
    pub tick: u64,
    /// Time since the engine was created.
    pub elapsed: Duration,
    /// Time since the previous frame.
    pub delta: Duration,
}

#[derive(Debug)]
pub struct GameEngine {
    ctx: Context,
    config: EngineConfig,
    running: bool,
    ticks: u64,
    started: Instant,
    last_frame: Instant,
}

impl GameEngine {
    /// Sets up the surface of `window` using the window and vsync settings of
    /// `config`.
    pub async fn new(window: Arc<Window>, config: EngineConfig) -> anyhow::Result<Self> {
        window.set_title(&config.window.title);
        let ctx = Context::new(window, config.vsync).await?;
        let now = Instant::now();
        log::info!(
            "engine ready: {}x{} {:?}",
            ctx.config.width,
            ctx.config.height,
            ctx.config.present_mode
        );
        Ok(Self {
            ctx,
            config,
            running: true,
            ticks: 0,
            started: now,
            last_frame: now,
        })
    }

    pub fn keep_running(&self) -> bool {
        self.running
    }

    pub fn exit(&mut self) {
        self.running = false;
    }

    pub fn set_window_title(&mut self, title: &str) {
        self.config.window.title = title.to_string();
        self.ctx.window.set_title(title);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
    }

    pub fn request_redraw(&self) {
        self.ctx.window.request_redraw();
    }

    /// Frames presented so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn window(&self) -> &Window {
        &self.ctx.window
    }

    /// The context renderers are created with and draw into.
    pub fn gfx(&mut self) -> &mut WgpuContext {
        &mut self.ctx.gfx
    }

    /// An uninitialized primitive renderer with the configured program.
    pub async fn primitive_renderer(&self) -> anyhow::Result<Renderer> {
        let source = self.config.shaders.primitive_source().await?;
        Ok(Renderer::new(source, crate::render::primitive::TRIANGLE.to_vec()))
    }

    pub async fn billboard_renderer(&mut self) -> anyhow::Result<BillboardRenderer> {
        let source = self.config.shaders.billboard_source().await?;
        BillboardRenderer::new(&mut self.ctx.gfx, &source, &self.config.billboard)
    }

    pub async fn model_renderer(&mut self) -> anyhow::Result<ModelRenderer> {
        let source = self.config.shaders.model_source().await?;
        ModelRenderer::new(&mut self.ctx.gfx, &source)
    }

    /// Draws one frame.
    ///
    /// `draw` records into the context; the recorded draws are then rendered
    /// over the configured clear colour and presented. A lost or outdated
    /// surface is reconfigured and the frame skipped; a suboptimal one is
    /// reconfigured after presenting.
    pub fn render_frame(&mut self, draw: impl FnOnce(&mut dyn GraphicsContext, &FrameInfo)) -> anyhow::Result<()> {
        let (output, suboptimal) = match self.ctx.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(output) => (output, false),
            wgpu::CurrentSurfaceTexture::Suboptimal(output) => (output, true),
            wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                log::warn!("surface lost or outdated, reconfiguring");
                self.ctx.reconfigure();
                return Ok(());
            }
            wgpu::CurrentSurfaceTexture::Timeout | wgpu::CurrentSurfaceTexture::Occluded => {
                log::debug!("no surface texture available, frame skipped");
                return Ok(());
            }
            wgpu::CurrentSurfaceTexture::Validation => {
                log::warn!("acquiring the surface texture failed validation, frame skipped");
                return Ok(());
            }
        };

        let now = Instant::now();
        let frame = FrameInfo {
            tick: self.ticks,
            elapsed: now.duration_since(self.started),
            delta: now.duration_since(self.last_frame),
        };
        self.last_frame = now;

        draw(&mut self.ctx.gfx, &frame);

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.ctx
            .gfx
            .flush(&view, Some(&self.ctx.depth_texture.view), self.config.clear_color())?;
        self.ctx.window.pre_present_notify();
        output.present();
        if suboptimal {
            self.ctx.reconfigure();
        }
        self.ticks += 1;
        Ok(())
    }
}
