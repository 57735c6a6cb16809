//! Integration tests for render passes, handle lifetimes and batch aborts
//!
//! Run with: cargo test --test render_pass_integration_tests

mod test_utils;

use galaxy_3d_backend::galaxy3d::device::{SoftwareDevice, SoftwareDeviceConfig};
use galaxy_3d_backend::galaxy3d::{
    BackendConfig, DriverApi, Error, HandleKind, PixelRect, RenderPassParams, ResourceState,
    SwapChainDesc, TextureDesc, RenderTargetDesc, UniformBindingConfig, ValidationMode, Viewport,
};
use test_utils::*;

fn upload_color(screen: &mut Screen, material: &Material, color: [f32; 4]) {
    let config = UniformBindingConfig::new(32)
        .with_buffer_size(MATERIAL_BUFFER_SIZE)
        .with_byte_offset(64);
    let params = MaterialParams { color, offset: [0.0; 4] };
    screen.driver.upload_uniform(material.uniforms, &config, &params).unwrap();
}

// ============================================================================
// PASS CONTENTS
// ============================================================================

#[test]
fn test_integration_clear_only_pass() {
    let mut screen = Screen::new(8, 8, ValidationMode::Eager);
    screen.driver.begin_frame().unwrap();
    screen.driver.begin_render_pass(screen.target, RenderPassParams::cleared([1.0, 0.0, 0.0, 1.0])).unwrap();
    screen.driver.end_render_pass().unwrap();
    let readback = screen.driver.read_pixels(screen.target, PixelRect::new(0, 0, 8, 8)).unwrap();
    screen.driver.commit(screen.swap_chain).unwrap();
    screen.driver.end_frame().unwrap();

    let report = screen.driver.finish().unwrap();
    assert_eq!(report.render_passes, 1);
    assert_eq!(report.presents, 1);
    assert_eq!(report.draws, 0);
    let pixels = readback.take().unwrap();
    assert_eq!(pixels.len(), 8 * 8 * 4);
    assert!(pixels.chunks_exact(4).all(|p| p == [255, 0, 0, 255]));
}

#[test]
fn test_integration_second_pass_preserves_untouched_pixels() {
    let mut screen = Screen::new(8, 8, ValidationMode::Eager);
    let material = Material::new(&mut screen.driver);
    let triangle = Triangle::new(&mut screen.driver, FULLSCREEN);

    upload_color(&mut screen, &material, [0.0, 1.0, 0.0, 1.0]);
    screen.driver.begin_render_pass(screen.target, RenderPassParams::cleared([0.0, 0.0, 1.0, 1.0])).unwrap();
    screen.driver.draw(material.pipeline(), triangle.primitive, 0, 3, 1).unwrap();
    screen.driver.end_render_pass().unwrap();

    // Second pass only covers the top-right quadrant
    upload_color(&mut screen, &material, [1.0, 1.0, 1.0, 1.0]);
    let params = RenderPassParams::preserved().with_viewport(Viewport::new(4, 4, 4, 4));
    screen.driver.begin_render_pass(screen.target, params).unwrap();
    screen.driver.draw(material.pipeline(), triangle.primitive, 0, 3, 1).unwrap();
    screen.driver.end_render_pass().unwrap();

    let readback = screen.driver.read_pixels(screen.target, PixelRect::new(0, 0, 8, 8)).unwrap();
    screen.driver.execute().unwrap();

    let pixels = readback.take().unwrap();
    for y in 0..8 {
        for x in 0..8 {
            let expected = if x >= 4 && y >= 4 { WHITE } else { GREEN };
            assert_eq!(pixel(&pixels, 8, x, y), expected, "pixel ({}, {})", x, y);
        }
    }
}

#[test]
fn test_integration_offscreen_target_read_back() {
    let mut screen = Screen::new(4, 4, ValidationMode::Eager);
    let color = screen.driver.create_texture(TextureDesc::color_attachment(4, 4)).unwrap();
    let depth = screen.driver.create_texture(TextureDesc::depth_attachment(4, 4)).unwrap();
    let offscreen = screen
        .driver
        .create_render_target(RenderTargetDesc::with_color(4, 4, color).with_depth(depth))
        .unwrap();

    screen.driver.begin_render_pass(offscreen, RenderPassParams::cleared([0.0, 0.0, 1.0, 1.0])).unwrap();
    screen.driver.end_render_pass().unwrap();
    screen.driver.begin_render_pass(screen.target, RenderPassParams::cleared([0.0, 1.0, 0.0, 1.0])).unwrap();
    screen.driver.end_render_pass().unwrap();
    let offscreen_pixels = screen.driver.read_pixels(offscreen, PixelRect::new(0, 0, 4, 4)).unwrap();
    let screen_pixels = screen.driver.read_pixels(screen.target, PixelRect::new(1, 1, 2, 2)).unwrap();
    screen.driver.execute().unwrap();

    assert!(offscreen_pixels.take().unwrap().chunks_exact(4).all(|p| p == BLUE));
    let screen_pixels = screen_pixels.take().unwrap();
    assert_eq!(screen_pixels.len(), 16);
    assert!(screen_pixels.chunks_exact(4).all(|p| p == GREEN));
}

// ============================================================================
// STATE TRANSITIONS
// ============================================================================

#[test]
fn test_integration_illegal_transitions_eager() {
    let mut screen = Screen::new(4, 4, ValidationMode::Eager);
    let material = Material::new(&mut screen.driver);
    let triangle = Triangle::new(&mut screen.driver, FULLSCREEN);

    let draw = screen.driver.draw(material.pipeline(), triangle.primitive, 0, 3, 1);
    assert!(matches!(draw, Err(Error::IllegalStateTransition(_))));
    assert!(matches!(screen.driver.end_render_pass(), Err(Error::IllegalStateTransition(_))));

    screen.driver.begin_render_pass(screen.target, RenderPassParams::default()).unwrap();
    let nested = screen.driver.begin_render_pass(screen.target, RenderPassParams::default());
    assert!(matches!(nested, Err(Error::IllegalStateTransition(_))));
    let commit = screen.driver.commit(screen.swap_chain);
    assert!(matches!(commit, Err(Error::IllegalStateTransition(_))));
    screen.driver.end_render_pass().unwrap();

    // Only the legal commands were queued
    let report = screen.driver.execute().unwrap();
    assert_eq!(report.render_passes, 1);
    assert_eq!(report.draws, 0);
}

#[test]
fn test_integration_illegal_transition_deferred_aborts_batch() {
    let mut screen = Screen::new(4, 4, ValidationMode::Deferred);
    screen.driver.begin_render_pass(screen.target, RenderPassParams::default()).unwrap();
    screen.driver.begin_render_pass(screen.target, RenderPassParams::default()).unwrap();
    screen.driver.end_render_pass().unwrap();
    screen.driver.commit(screen.swap_chain).unwrap();

    let result = screen.driver.execute();
    assert!(matches!(result, Err(Error::IllegalStateTransition(_))));

    // The aborted pass was closed, so the next batch starts from Idle
    screen.driver.begin_render_pass(screen.target, RenderPassParams::cleared([1.0; 4])).unwrap();
    screen.driver.end_render_pass().unwrap();
    let readback = screen.driver.read_pixels(screen.target, PixelRect::new(0, 0, 4, 4)).unwrap();
    screen.driver.execute().unwrap();
    assert!(readback.take().unwrap().chunks_exact(4).all(|p| p == WHITE));
}

// ============================================================================
// HANDLE LIFETIMES
// ============================================================================

#[test]
fn test_integration_destroy_then_use_aborts_batch() {
    let mut screen = Screen::new(4, 4, ValidationMode::Deferred);
    let material = Material::new(&mut screen.driver);
    let triangle = Triangle::new(&mut screen.driver, FULLSCREEN);
    screen.driver.execute().unwrap();

    screen.driver.destroy(triangle.vertices).unwrap();
    screen.driver.update_buffer_object(triangle.vertices, &[0; 8], 0).unwrap();
    screen.driver.begin_render_pass(screen.target, RenderPassParams::cleared([0.0; 4])).unwrap();
    screen.driver.draw(material.pipeline(), triangle.primitive, 0, 3, 1).unwrap();
    screen.driver.end_render_pass().unwrap();
    let readback = screen.driver.read_pixels(screen.target, PixelRect::new(0, 0, 4, 4)).unwrap();

    let result = screen.driver.execute();
    assert!(matches!(result, Err(Error::InvalidHandle(_))));
    assert!(!readback.is_ready());
    assert_eq!(screen.driver.pending_commands(), 0);
    assert_eq!(screen.driver.stats().aborted_batches, 1);
    // The destroy itself executed before the abort
    assert_eq!(screen.driver.registry().state(triangle.vertices), None);
    assert_eq!(screen.driver.registry().state(triangle.indices), Some(ResourceState::Live));
}

#[test]
fn test_integration_destroy_then_use_refused_eager() {
    let mut screen = Screen::new(4, 4, ValidationMode::Eager);
    let triangle = Triangle::new(&mut screen.driver, FULLSCREEN);
    screen.driver.destroy(triangle.indices).unwrap();

    let update = screen.driver.update_buffer_object(triangle.indices, &[0; 6], 0);
    assert!(matches!(update, Err(Error::InvalidHandle(_))));
    assert!(matches!(screen.driver.destroy(triangle.indices), Err(Error::InvalidHandle(_))));

    screen.driver.execute().unwrap();
    assert_eq!(screen.driver.registry().state(triangle.indices), None);
    assert_eq!(screen.driver.registry().live_count(HandleKind::BufferObject), 1);
}

#[test]
fn test_integration_draw_through_destroyed_uniform_buffer_aborts_batch() {
    let mut screen = Screen::new(4, 4, ValidationMode::Deferred);
    let material = Material::new(&mut screen.driver);
    let triangle = Triangle::new(&mut screen.driver, FULLSCREEN);
    screen.driver.execute().unwrap();

    screen.driver.destroy(material.uniforms).unwrap();
    screen.driver.begin_render_pass(screen.target, RenderPassParams::cleared([0.0, 0.0, 1.0, 1.0])).unwrap();
    screen.driver.draw(material.pipeline(), triangle.primitive, 0, 3, 1).unwrap();
    screen.driver.end_render_pass().unwrap();

    let result = screen.driver.execute();
    assert!(matches!(result, Err(Error::InvalidHandle(_))), "{:?}", result);
    assert_eq!(screen.driver.stats().aborted_batches, 1);
    assert_eq!(screen.driver.stats().draws, 0);
    assert_eq!(screen.driver.registry().state(material.uniforms), None);
}

#[test]
fn test_integration_draw_through_destroyed_vertex_buffer_refused_eager() {
    let mut screen = Screen::new(4, 4, ValidationMode::Eager);
    let material = Material::new(&mut screen.driver);
    let triangle = Triangle::new(&mut screen.driver, FULLSCREEN);
    screen.driver.destroy(triangle.vertices).unwrap();

    screen.driver.begin_render_pass(screen.target, RenderPassParams::cleared([0.0, 0.0, 1.0, 1.0])).unwrap();
    let draw = screen.driver.draw(material.pipeline(), triangle.primitive, 0, 3, 1);
    assert!(matches!(draw, Err(Error::InvalidHandle(_))));
    screen.driver.end_render_pass().unwrap();

    let report = screen.driver.execute().unwrap();
    assert_eq!(report.draws, 0);
    assert_eq!(report.render_passes, 1);
}

// ============================================================================
// DEVICE FAILURES
// ============================================================================

#[test]
fn test_integration_device_limit_is_submission_failure() {
    let device = SoftwareDevice::new(SoftwareDeviceConfig { max_texture_dimension: 16, ..Default::default() });
    let config = BackendConfig::default().with_validation(ValidationMode::Eager);
    let mut driver = DriverApi::new(Box::new(device), config);
    let small = driver.create_swap_chain(SwapChainDesc::new(16, 16)).unwrap();
    let large = driver.create_swap_chain(SwapChainDesc::new(32, 32)).unwrap();
    driver.flush().unwrap();

    match driver.execute() {
        Err(Error::SubmissionFailure(msg)) => assert!(msg.starts_with("create_resource")),
        other => panic!("expected SubmissionFailure, got {:?}", other),
    }
    assert_eq!(driver.registry().state(small), Some(ResourceState::Live));
    assert_eq!(driver.registry().state(large), None);
    assert_eq!(driver.device_name(), "SoftwareDevice");
}
