use std::time::Duration;

use billboard_ngin::{
    GraphicsContext, HeadlessContext, Renderer, ShaderSource,
    cgmath::Vector3,
    render::primitive::{TRIANGLE, animated_triangle},
};

use crate::common::test_utils::{BASIC_SHADER, FixedCamera, mat4, uniform};

mod common;

fn floats(data: &[u8]) -> Vec<f32> {
    data.chunks_exact(4)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect()
}

#[test]
fn should_not_draw_before_init() {
    let mut ctx = HeadlessContext::new();
    let renderer = Renderer::triangle().unwrap();

    renderer.draw(&mut ctx, &FixedCamera::identity());

    assert!(!renderer.is_ready());
    assert!(ctx.draws().is_empty());
    assert!(ctx.state().is_reset());
    assert_eq!(ctx.live_resources(), 0);
}

#[test]
fn should_draw_triangle_after_init() {
    let mut ctx = HeadlessContext::new();
    let mut renderer = Renderer::triangle().unwrap();
    renderer.init(&mut ctx).unwrap();
    renderer.transform.position = Vector3::new(0.0, 0.5, 0.0);
    let camera = FixedCamera::identity();

    renderer.draw(&mut ctx, &camera);

    let draws = ctx.take_draws();
    assert_eq!(draws.len(), 1);
    let call = &draws[0];
    assert_eq!(call.range.count(), 3);
    assert_eq!(call.attributes.len(), 1);
    let (location, pointer) = call.attributes[0];
    assert_eq!(location, 0);
    assert_eq!((pointer.components, pointer.stride, pointer.offset), (2, 8, 0));
    assert_eq!(floats(ctx.buffer_data(pointer.buffer).unwrap()), TRIANGLE);
    assert!(call.textures.is_empty());
    assert_eq!(call.uniforms.len(), 3);
    let transform = ctx
        .program(call.program)
        .and_then(|program| program.binding("transform"))
        .map(|binding| binding.slot);
    assert_eq!(uniform(call, transform), Some(mat4(renderer.transform.to_matrix())));
    assert!(ctx.state().is_reset());
}

#[test]
fn should_upload_animated_vertices() {
    let mut ctx = HeadlessContext::new();
    let mut renderer = Renderer::triangle().unwrap();
    renderer.init(&mut ctx).unwrap();

    let elapsed = Duration::from_millis(1500);
    renderer.animate(&mut ctx, elapsed).unwrap();
    renderer.draw(&mut ctx, &FixedCamera::identity());

    let pointer = ctx.draws()[0].attributes[0].1;
    assert_eq!(floats(ctx.buffer_data(pointer.buffer).unwrap()), animated_triangle(elapsed));
}

#[test]
fn should_keep_vertices_set_before_init() {
    let mut ctx = HeadlessContext::new();
    let mut renderer = Renderer::triangle().unwrap();
    let square = [-1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, 1.0];
    renderer.set_vertices(&mut ctx, &square).unwrap();
    assert_eq!(ctx.live_resources(), 0);

    renderer.init(&mut ctx).unwrap();
    renderer.draw(&mut ctx, &FixedCamera::identity());

    assert_eq!(renderer.vertex_count(), 6);
    assert_eq!(ctx.draws()[0].range.count(), 6);
}

#[test]
fn should_release_resources_on_destroy() {
    let mut ctx = HeadlessContext::new();
    let mut renderer = Renderer::triangle().unwrap();
    renderer.init(&mut ctx).unwrap();
    assert_eq!(ctx.live_resources(), 2);

    renderer.destroy();

    assert_eq!(ctx.live_resources(), 0);
    assert_eq!(ctx.released().len(), 2);
}

#[test]
fn should_fail_init_with_broken_program() {
    let mut ctx = HeadlessContext::new();
    let source = ShaderSource::parse_combined(BASIC_SHADER).unwrap();
    let broken = ShaderSource::new(source.vertex, "@fragment fn fs_main( {");
    let mut renderer = Renderer::new(broken, TRIANGLE.to_vec());

    assert!(renderer.init(&mut ctx).is_err());
    assert!(!renderer.is_ready());

    renderer.draw(&mut ctx, &FixedCamera::identity());
    assert!(ctx.draws().is_empty());
    assert_eq!(ctx.live_resources(), 0);
}

#[test]
fn should_use_view_and_projection_of_the_camera() {
    let mut ctx = HeadlessContext::new();
    let mut renderer = Renderer::triangle().unwrap();
    renderer.init(&mut ctx).unwrap();
    let mut camera = FixedCamera::identity();
    camera.view = billboard_ngin::cgmath::Matrix4::from_scale(2.0);

    renderer.draw(&mut ctx, &camera);

    let call = &ctx.draws()[0];
    let program = ctx.program(call.program).unwrap();
    let view = program.binding("view").map(|binding| binding.slot);
    assert_eq!(uniform(call, view), Some(mat4(camera.view)));
}
