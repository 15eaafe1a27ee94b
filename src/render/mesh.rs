use crate::{
    camera::Camera,
    data_structures::{model::Drawable, transform::Transform},
    gfx::{BlendFunc, Capability, GraphicsContext, with_capabilities, with_texture_unit},
    render::{DIFFUSE_UNIT, MODEL_FRAGMENT_SHADER, ProgramLocations, TEXTURED_VERTEX_SHADER, build_program},
    shader::{ShaderProgram, ShaderSource},
};

/// Draws opaque textured meshes with back-face culling.
#[derive(Debug)]
pub struct ModelRenderer {
    program: ShaderProgram,
    locations: ProgramLocations,
}

impl ModelRenderer {
    pub fn new(ctx: &mut dyn GraphicsContext, source: &ShaderSource) -> anyhow::Result<Self> {
        let program = build_program(ctx, source)?;
        let locations = ProgramLocations::resolve(&program, true);
        Ok(Self { program, locations })
    }

    pub fn with_default_shaders(ctx: &mut dyn GraphicsContext) -> anyhow::Result<Self> {
        let source = ShaderSource::new(TEXTURED_VERTEX_SHADER, MODEL_FRAGMENT_SHADER);
        Self::new(ctx, &source)
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn draw(
        &self,
        ctx: &mut dyn GraphicsContext,
        model: &dyn Drawable,
        transform: &Transform,
        camera: &dyn Camera,
    ) {
        let locations = &self.locations;
        with_capabilities(ctx, &[Capability::CullFace], BlendFunc::REPLACE, |ctx| {
            with_texture_unit(ctx, DIFFUSE_UNIT, |ctx| {
                ctx.use_program(self.program.handle());
                model.bind_vertex_buffer(ctx);
                model.set_attributes(ctx, locations.vertex_pos, 3, locations.vertex_uv, 2);
                model.bind_index_buffer(ctx);
                ctx.uniform_sampler(locations.diffuse, DIFFUSE_UNIT);
                model.bind_texture(ctx, DIFFUSE_UNIT);
                locations.upload_matrices(ctx, &transform.to_matrix(), camera);

                model.draw(ctx);

                model.unbind_texture(ctx, DIFFUSE_UNIT);
                model.unbind_index_buffer(ctx);
                locations.disable_attributes(ctx);
                model.unbind_vertex_buffer(ctx);
                ctx.use_program(None);
            });
        });
    }
}
