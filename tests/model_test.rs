use billboard_ngin::{
    Drawable, GraphicsContext, HeadlessContext, MeshSource, Model, ModelRenderer, Transform, Vertex,
    cgmath::Vector3,
    gfx::{BlendFunc, Capability, DrawRange},
};

use crate::common::test_utils::{FixedCamera, mat4, solid_texture, uniform};

mod common;

fn triangle() -> Vec<Vertex> {
    vec![
        Vertex::new(0.0, 0.0, 0.0, 0.0, 0.0),
        Vertex::new(1.0, 0.0, 0.0, 1.0, 0.0),
        Vertex::new(0.0, 1.0, 0.0, 0.0, 1.0),
    ]
}

#[test]
fn should_load_model_with_matching_counts() {
    let mut ctx = HeadlessContext::new();
    let model = Model::load(
        &mut ctx,
        MeshSource::Data {
            vertices: triangle(),
            indices: vec![0, 1, 2, 2, 1, 0],
        },
    )
    .unwrap();

    assert_eq!(model.vertex_count(), 3);
    assert_eq!(model.index_count(), 6);
    let uploaded = ctx.buffer_data(model.vertex_buffer().id()).unwrap();
    assert_eq!(uploaded.len(), 3 * Vertex::STRIDE as usize);
    let indices = ctx.buffer_data(model.index_buffer().unwrap().id()).unwrap();
    assert_eq!(indices.len(), 6 * std::mem::size_of::<u32>());
}

#[test]
fn should_skip_index_buffer_without_indices() {
    let mut ctx = HeadlessContext::new();
    let model = Model::load(
        &mut ctx,
        MeshSource::Data {
            vertices: triangle(),
            indices: Vec::new(),
        },
    )
    .unwrap();

    assert!(model.index_buffer().is_none());
    assert_eq!(model.index_count(), 0);
    assert_eq!(ctx.live_resources(), 1);
}

#[test]
fn should_reject_empty_model() {
    let mut ctx = HeadlessContext::new();
    let result = Model::load(
        &mut ctx,
        MeshSource::Data {
            vertices: Vec::new(),
            indices: Vec::new(),
        },
    );

    assert!(result.is_err());
    assert_eq!(ctx.live_resources(), 0);
}

#[tokio::test]
async fn should_load_obj_from_assets() {
    let mut ctx = HeadlessContext::new();
    let model = Model::load_obj(&mut ctx, "models/quad.obj", false).await.unwrap();

    assert_eq!(model.vertex_count(), 4);
    assert_eq!(model.index_count(), 6);

    let flipped = Model::load_obj(&mut ctx, "models/quad.obj", true).await.unwrap();
    let data = ctx.buffer_data(flipped.vertex_buffer().id()).unwrap();
    let first: Vertex = bytemuck::pod_read_unaligned(&data[..Vertex::STRIDE as usize]);
    assert_eq!(first.uv, [0.0, 1.0]);

    assert!(Model::load_obj(&mut ctx, "models/missing.obj", false).await.is_err());
}

#[test]
fn should_draw_model_indexed_and_reset_state() {
    let mut ctx = HeadlessContext::new();
    let renderer = ModelRenderer::with_default_shaders(&mut ctx).unwrap();
    let mut model = Model::load(
        &mut ctx,
        MeshSource::Data {
            vertices: triangle(),
            indices: vec![0, 1, 2],
        },
    )
    .unwrap();
    let texture = solid_texture(&mut ctx, [255, 0, 0, 255]);
    model.set_material(Some(texture.clone()));
    let transform = Transform::from(Vector3::new(1.0, 2.0, 3.0));
    let camera = FixedCamera::identity();

    renderer.draw(&mut ctx, &model, &transform, &camera);

    let draws = ctx.take_draws();
    assert_eq!(draws.len(), 1);
    let call = &draws[0];
    assert_eq!(call.range, DrawRange::Elements { count: 3 });
    assert_eq!(call.index_buffer, model.index_buffer().map(|b| b.id()));
    assert!(call.cull_back_faces);
    assert_eq!(call.blend, None);
    assert_eq!(call.attributes.len(), 2);
    assert_eq!(call.attributes[0].1.stride, Vertex::STRIDE);
    assert_eq!(call.attributes[1].1.offset, Vertex::UV_OFFSET);
    assert_eq!(call.textures.len(), 1);
    assert_eq!(call.textures[0].1, texture.handle().id());

    let program = renderer.program();
    assert_eq!(
        uniform(call, program.uniform_location("transform")),
        Some(mat4(transform.to_matrix()))
    );
    assert_eq!(
        uniform(call, program.uniform_location("view")),
        Some(mat4(camera.view))
    );

    assert!(ctx.state().is_reset());
}

#[test]
fn should_restore_capabilities_after_model_draw() {
    let mut ctx = HeadlessContext::new();
    let renderer = ModelRenderer::with_default_shaders(&mut ctx).unwrap();
    let model = Model::load(
        &mut ctx,
        MeshSource::Data {
            vertices: triangle(),
            indices: Vec::new(),
        },
    )
    .unwrap();
    ctx.enable(Capability::Blend);
    ctx.blend_func(BlendFunc::ALPHA.src, BlendFunc::ALPHA.dst);

    renderer.draw(&mut ctx, &model, &Transform::default(), &FixedCamera::identity());

    let draws = ctx.take_draws();
    assert_eq!(draws[0].range, DrawRange::Arrays { first: 0, count: 3 });
    assert_eq!(draws[0].blend, Some(BlendFunc::REPLACE));
    assert!(draws[0].textures.is_empty());
    assert!(ctx.is_enabled(Capability::Blend));
    assert!(!ctx.is_enabled(Capability::CullFace));
    assert_eq!(ctx.state().blend_func, BlendFunc::ALPHA);
}

#[test]
fn should_not_sample_the_caller_texture_without_a_material() {
    let mut ctx = HeadlessContext::new();
    let renderer = ModelRenderer::with_default_shaders(&mut ctx).unwrap();
    let model = Model::load(
        &mut ctx,
        MeshSource::Data {
            vertices: triangle(),
            indices: vec![0, 1, 2],
        },
    )
    .unwrap();
    let caller = solid_texture(&mut ctx, [0, 0, 255, 255]);
    ctx.active_texture(0);
    ctx.bind_texture(Some(caller.handle()));

    renderer.draw(&mut ctx, &model, &Transform::default(), &FixedCamera::identity());

    let draws = ctx.take_draws();
    assert_eq!(draws.len(), 1);
    assert!(draws[0].textures.is_empty());
    assert_eq!(ctx.state().texture_units.get(&0), Some(&caller.handle().id()));
}
