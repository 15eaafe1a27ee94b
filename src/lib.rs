//! billboard-ngin
//!
//! A small rendering layer on top of wgpu: shader programs built from WGSL,
//! mesh models, a primitive renderer and camera-facing billboards. Renderers
//! are written against a stateful drawing context ([`gfx::GraphicsContext`])
//! that is backed by wgpu for real frames and by an in-memory recorder for
//! tests.
//!
//! High-level modules
//! - `camera`: the camera trait renderers read and a first-person camera
//! - `config`: TOML engine configuration
//! - `context`: window surface setup
//! - `data_structures`: models, textures, transforms and billboards
//! - `engine`: the frame driver owning the surface
//! - `gfx`: the drawing context and its backends
//! - `pipelines`: wgpu render pipeline creation
//! - `render`: the primitive, billboard and model renderers
//! - `resources`: helpers to load asset files
//! - `shader`: WGSL program building and reflection
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod engine;
pub mod gfx;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod shader;

pub use camera::{Camera, FirstPersonCamera, Projection};
pub use config::EngineConfig;
pub use data_structures::{
    billboard::Billboard,
    model::{Drawable, MeshSource, Model, Vertex},
    texture::Texture,
    transform::Transform,
};
pub use engine::{FrameInfo, GameEngine};
pub use gfx::{GraphicsContext, HeadlessContext, WgpuContext};
pub use render::{BillboardRenderer, ModelRenderer, Renderer};
pub use shader::{ShaderError, ShaderProgram, ShaderSource};

// Re-exports so downstream code uses the same versions.
pub use cgmath;
pub use wgpu;
pub use winit;

/// Initialises logging: `env_logger` natively (configured through
/// `RUST_LOG`), the browser console on the web. Calling it twice is harmless.
pub fn init_logging() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::log_1(&format!("Could not initialize logger: {e}").into());
        }
    }
}
