use std::time::Duration;

use crate::{
    camera::Camera,
    data_structures::transform::Transform,
    gfx::{BufferHandle, BufferTarget, GraphicsContext},
    render::{BASIC_SHADER, ProgramLocations, build_program},
    shader::{ShaderProgram, ShaderSource},
};

/// Resting shape of the animated triangle: `(x, y)` per vertex.
pub const TRIANGLE: [f32; 6] = [-1.0, 0.0, 1.0, 0.0, 0.0, 1.0];

/// Distance the animated vertices travel per second.
pub const ANIMATION_SPEED: f32 = 0.6;

/// The triangle after `elapsed` time: vertex 0 slides right from `x = -1`
/// until it reaches `x = 0`, vertex 2 slides down from `y = 1` until it
/// reaches `y = -1`.
pub fn animated_triangle(elapsed: Duration) -> [f32; 6] {
    let travelled = elapsed.as_secs_f32() * ANIMATION_SPEED;
    let mut vertices = TRIANGLE;
    vertices[0] = (TRIANGLE[0] + travelled).min(0.0);
    vertices[5] = (TRIANGLE[5] - travelled).max(-1.0);
    vertices
}

#[derive(Debug)]
enum State {
    Uninitialized,
    Ready {
        program: ShaderProgram,
        locations: ProgramLocations,
        vertex_buffer: BufferHandle,
    },
}

/// Draws a flat primitive given as a list of 2D positions.
///
/// A renderer starts uninitialized; [`Renderer::init`] builds its program and
/// uploads the vertices. Drawing before that only logs a warning.
#[derive(Debug)]
pub struct Renderer {
    source: ShaderSource,
    vertices: Vec<f32>,
    pub transform: Transform,
    state: State,
}

impl Renderer {
    pub fn new(source: ShaderSource, vertices: Vec<f32>) -> Self {
        Self {
            source,
            vertices,
            transform: Transform::default(),
            state: State::Uninitialized,
        }
    }

    /// The triangle with the embedded `basic.shader` program.
    pub fn triangle() -> anyhow::Result<Self> {
        Ok(Self::new(ShaderSource::parse_combined(BASIC_SHADER)?, TRIANGLE.to_vec()))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready { .. })
    }

    pub fn vertex_count(&self) -> u32 {
        (self.vertices.len() / 2) as u32
    }

    pub fn init(&mut self, ctx: &mut dyn GraphicsContext) -> anyhow::Result<()> {
        if self.is_ready() {
            log::warn!("Renderer::init called twice");
            return Ok(());
        }
        let program = build_program(ctx, &self.source)?;
        let locations = ProgramLocations::resolve(&program, false);
        let vertex_buffer = ctx.create_buffer(BufferTarget::Array, bytemuck::cast_slice(&self.vertices))?;
        self.state = State::Ready {
            program,
            locations,
            vertex_buffer,
        };
        Ok(())
    }

    /// Replaces the vertices, uploading them right away when initialized.
    pub fn set_vertices(&mut self, ctx: &mut dyn GraphicsContext, vertices: &[f32]) -> anyhow::Result<()> {
        self.vertices.clear();
        self.vertices.extend_from_slice(vertices);
        if let State::Ready { vertex_buffer, .. } = &self.state {
            ctx.write_buffer(vertex_buffer, bytemuck::cast_slice(vertices))?;
        }
        Ok(())
    }

    /// Moves the triangle to its shape after `elapsed`.
    pub fn animate(&mut self, ctx: &mut dyn GraphicsContext, elapsed: Duration) -> anyhow::Result<()> {
        self.set_vertices(ctx, &animated_triangle(elapsed))
    }

    pub fn draw(&self, ctx: &mut dyn GraphicsContext, camera: &dyn Camera) {
        let State::Ready {
            program,
            locations,
            vertex_buffer,
        } = &self.state
        else {
            log::warn!("Renderer::draw called before init");
            return;
        };

        ctx.use_program(program.handle());
        ctx.bind_buffer(BufferTarget::Array, Some(vertex_buffer));
        ctx.enable_vertex_attrib(locations.vertex_pos);
        ctx.vertex_attrib_pointer(locations.vertex_pos, 2, 2 * std::mem::size_of::<f32>() as u32, 0);
        locations.upload_matrices(ctx, &self.transform.to_matrix(), camera);

        ctx.draw_arrays(0, self.vertex_count());

        locations.disable_attributes(ctx);
        ctx.bind_buffer(BufferTarget::Array, None);
        ctx.use_program(None);
    }

    /// Releases the program and the vertex buffer.
    pub fn destroy(self) {
        if let State::Ready { program, .. } = &self.state {
            log::debug!("destroying renderer with program {:?}", program.handle().map(|h| h.id()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_starts_at_rest() {
        assert_eq!(animated_triangle(Duration::ZERO), TRIANGLE);
    }

    #[test]
    fn vertices_move_towards_their_targets() {
        let vertices = animated_triangle(Duration::from_millis(500));
        assert!((vertices[0] + 0.7).abs() < 1e-6);
        assert!((vertices[5] - 0.7).abs() < 1e-6);
        assert_eq!(&vertices[1..5], &TRIANGLE[1..5]);
    }

    #[test]
    fn movement_stops_at_the_end_positions() {
        let vertices = animated_triangle(Duration::from_secs(60));
        assert_eq!(vertices[0], 0.0);
        assert_eq!(vertices[5], -1.0);
    }
}
