use cgmath::{Deg, Matrix4, Vector3};

use crate::{
    camera::Camera,
    config::BillboardConfig,
    data_structures::{
        billboard::Billboard,
        model::{Drawable, MeshSource, Model, Vertex},
    },
    gfx::{BlendFunc, Capability, GraphicsContext, with_capabilities, with_texture_unit},
    render::{BILLBOARD_FRAGMENT_SHADER, DIFFUSE_UNIT, ProgramLocations, TEXTURED_VERTEX_SHADER, build_program},
    shader::{ShaderProgram, ShaderSource},
};

/// Unit quad standing on the origin: x in `[-0.5, 0.5]`, y in `[0, 1]`,
/// two counter-clockwise triangles facing `+z`.
pub const QUAD: [Vertex; 6] = [
    Vertex::new(0.5, 1.0, 0.0, 1.0, 1.0),
    Vertex::new(-0.5, 1.0, 0.0, 0.0, 1.0),
    Vertex::new(-0.5, 0.0, 0.0, 0.0, 0.0),
    Vertex::new(-0.5, 0.0, 0.0, 0.0, 0.0),
    Vertex::new(0.5, 0.0, 0.0, 1.0, 0.0),
    Vertex::new(0.5, 1.0, 0.0, 1.0, 1.0),
];

/// Rotation about `+y` in degrees that turns the quad towards a camera with
/// the given yaw.
pub fn billboard_angle(yaw: f32) -> f32 {
    360.0 - yaw - 90.0
}

/// Model matrix of a billboard seen from a camera with the given yaw.
pub fn billboard_transform(billboard: &Billboard, anchor_offset: Vector3<f32>, yaw: f32) -> Matrix4<f32> {
    Matrix4::from_translation(billboard.position)
        * Matrix4::from_translation(anchor_offset)
        * Matrix4::from_angle_y(Deg(billboard_angle(yaw)))
        * Matrix4::from_nonuniform_scale(billboard.scale_x, billboard.scale_y, 0.0)
}

/// Draws [`Billboard`]s as alpha-blended quads facing the camera.
#[derive(Debug)]
pub struct BillboardRenderer {
    program: ShaderProgram,
    locations: ProgramLocations,
    quad: Model,
    anchor_offset: Vector3<f32>,
}

impl BillboardRenderer {
    pub fn new(ctx: &mut dyn GraphicsContext, source: &ShaderSource, config: &BillboardConfig) -> anyhow::Result<Self> {
        let program = build_program(ctx, source)?;
        let locations = ProgramLocations::resolve(&program, true);
        let quad = Model::load(
            ctx,
            MeshSource::Data {
                vertices: QUAD.to_vec(),
                indices: Vec::new(),
            },
        )?;
        Ok(Self {
            program,
            locations,
            quad,
            anchor_offset: config.anchor_offset.into(),
        })
    }

    /// A renderer using the embedded billboard shaders.
    pub fn with_default_shaders(ctx: &mut dyn GraphicsContext, config: &BillboardConfig) -> anyhow::Result<Self> {
        let source = ShaderSource::new(TEXTURED_VERTEX_SHADER, BILLBOARD_FRAGMENT_SHADER);
        Self::new(ctx, &source, config)
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn draw(&self, ctx: &mut dyn GraphicsContext, billboard: &Billboard, camera: &dyn Camera) {
        let locations = &self.locations;
        let transform = billboard_transform(billboard, self.anchor_offset, camera.yaw());

        with_capabilities(
            ctx,
            &[Capability::CullFace, Capability::Blend],
            BlendFunc::ALPHA,
            |ctx| {
                with_texture_unit(ctx, DIFFUSE_UNIT, |ctx| {
                    ctx.use_program(self.program.handle());
                    self.quad.bind_vertex_buffer(ctx);
                    self.quad
                        .set_attributes(ctx, locations.vertex_pos, 3, locations.vertex_uv, 2);
                    locations.upload_matrices(ctx, &transform, camera);
                    ctx.uniform_sampler(locations.diffuse, DIFFUSE_UNIT);
                    ctx.active_texture(DIFFUSE_UNIT);
                    ctx.bind_texture(Some(billboard.texture.handle()));

                    self.quad.draw(ctx);

                    ctx.bind_texture(None);
                    locations.disable_attributes(ctx);
                    self.quad.unbind_vertex_buffer(ctx);
                    ctx.use_program(None);
                })
            },
        );
    }
}
