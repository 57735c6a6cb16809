//! Integration tests for buffer updates under deferred execution
//!
//! Every test records a whole batch first and executes it once, then checks the
//! rendered pixels of the software device.
//!
//! Run with: cargo test --test buffer_update_integration_tests

mod test_utils;

use galaxy_3d_backend::galaxy3d::{
    Error, PixelRect, RenderPassFlags, RenderPassParams, TargetBufferFlags, UniformBindingConfig,
    ValidationMode,
};
use test_utils::*;

fn material_config() -> UniformBindingConfig {
    UniformBindingConfig::new(32)
        .with_buffer_size(MATERIAL_BUFFER_SIZE)
        .with_byte_offset(64)
}

fn upload(screen: &mut Screen, material: &Material, color: [f32; 4], offset: [f32; 4]) {
    screen
        .driver
        .upload_uniform(material.uniforms, &material_config(), &MaterialParams { color, offset })
        .unwrap();
}

// ============================================================================
// PARTIAL WRITES
// ============================================================================

#[test]
fn test_integration_partial_uniform_update_between_draws() {
    let mut screen = Screen::new(8, 8, ValidationMode::Eager);
    let material = Material::new(&mut screen.driver);
    let triangle = Triangle::new(&mut screen.driver, LOWER_LEFT);
    upload(&mut screen, &material, [1.0, 0.0, 0.5, 1.0], [0.0; 4]);

    let mut params = RenderPassParams::cleared([0.0, 0.0, 1.0, 1.0]);
    screen.driver.begin_render_pass(screen.target, params).unwrap();
    screen.driver.draw(material.pipeline(), triangle.primitive, 0, 3, 1).unwrap();
    screen.driver.end_render_pass().unwrap();

    // Only color.b, color.a, offset.x and offset.y change
    let partial = UniformBindingConfig::new(16)
        .with_buffer_size(MATERIAL_BUFFER_SIZE)
        .with_byte_offset(72);
    screen.driver.upload_uniform(material.uniforms, &partial, &[1.0f32, 1.0, 0.5, 0.5]).unwrap();

    params.flags.clear = TargetBufferFlags::NONE;
    params.flags.discard_start = TargetBufferFlags::NONE;
    screen.driver.begin_render_pass(screen.target, params).unwrap();
    screen.driver.draw(material.pipeline(), triangle.primitive, 0, 3, 1).unwrap();
    screen.driver.end_render_pass().unwrap();

    let readback = screen.driver.read_pixels(screen.target, PixelRect::new(0, 0, 8, 8)).unwrap();
    screen.driver.flush().unwrap();
    screen.driver.commit(screen.swap_chain).unwrap();
    screen.driver.finish().unwrap();

    let pixels = readback.take().unwrap();
    let first = [255, 0, 128, 255];
    let second = [255, 0, 255, 255];
    for y in 0..8 {
        for x in 0..8 {
            // Second triangle is the first one shifted by (0.5, 0.5) NDC = 2 pixels
            let expected = if x >= 2 && y >= 2 && x + y <= 11 {
                second
            } else if x + y <= 7 {
                first
            } else {
                BLUE
            };
            assert_eq!(pixel(&pixels, 8, x, y), expected, "pixel ({}, {})", x, y);
        }
    }
}

#[test]
fn test_integration_overlapping_updates_last_write_wins() {
    let mut screen = Screen::new(4, 4, ValidationMode::Eager);
    let material = Material::new(&mut screen.driver);
    let triangle = Triangle::new(&mut screen.driver, FULLSCREEN);
    upload(&mut screen, &material, [1.0, 0.0, 0.0, 1.0], [0.0; 4]);

    // [64, 72) then [68, 76): red stays 1, green ends at 0, blue ends at 1
    let first: [f32; 2] = [1.0, 1.0];
    let second: [f32; 2] = [0.0, 1.0];
    screen.driver.update_buffer_object(material.uniforms, bytemuck::cast_slice(&first), 64).unwrap();
    screen.driver.update_buffer_object(material.uniforms, bytemuck::cast_slice(&second), 68).unwrap();

    screen.driver.begin_render_pass(screen.target, RenderPassParams::cleared([0.0; 4])).unwrap();
    screen.driver.draw(material.pipeline(), triangle.primitive, 0, 3, 1).unwrap();
    screen.driver.end_render_pass().unwrap();
    let readback = screen.driver.read_pixels(screen.target, PixelRect::new(0, 0, 4, 4)).unwrap();
    screen.driver.execute().unwrap();

    let pixels = readback.take().unwrap();
    assert!(pixels.chunks_exact(4).all(|p| p == [255, 0, 255, 255]));
}

#[test]
fn test_integration_update_not_visible_to_earlier_draw() {
    let mut screen = Screen::new(4, 4, ValidationMode::Deferred);
    let material = Material::new(&mut screen.driver);
    let triangle = Triangle::new(&mut screen.driver, FULLSCREEN);
    upload(&mut screen, &material, [0.0, 1.0, 0.0, 1.0], [0.0; 4]);

    screen.driver.begin_render_pass(screen.target, RenderPassParams::cleared([0.0; 4])).unwrap();
    screen.driver.draw(material.pipeline(), triangle.primitive, 0, 3, 1).unwrap();
    screen.driver.end_render_pass().unwrap();
    let before = screen.driver.read_pixels(screen.target, PixelRect::new(0, 0, 4, 4)).unwrap();

    // Recorded after the draw, applied in the same batch
    upload(&mut screen, &material, [1.0, 1.0, 1.0, 1.0], [0.0; 4]);
    screen.driver.begin_render_pass(screen.target, RenderPassParams::preserved()).unwrap();
    screen.driver.draw(material.pipeline(), triangle.primitive, 0, 3, 1).unwrap();
    screen.driver.end_render_pass().unwrap();
    let after = screen.driver.read_pixels(screen.target, PixelRect::new(0, 0, 4, 4)).unwrap();

    let report = screen.driver.execute().unwrap();
    assert_eq!(report.draws, 2);
    assert!(before.take().unwrap().chunks_exact(4).all(|p| p == GREEN));
    assert!(after.take().unwrap().chunks_exact(4).all(|p| p == WHITE));
}

#[test]
fn test_integration_index_updates_alternate_per_triangle() {
    let mut screen = Screen::new(16, 16, ValidationMode::Eager);
    let material = Material::new(&mut screen.driver);
    let triangle = Triangle::new(&mut screen.driver, LOWER_LEFT);
    upload(&mut screen, &material, [1.0, 1.0, 1.0, 1.0], [0.0; 4]);

    let mut params = RenderPassParams::cleared([0.0, 1.0, 0.0, 1.0]);
    for i in 0..8u32 {
        let low = -1.0 + 0.25 * i as f32;
        let high = low + 0.25;
        let positions: [[f32; 2]; 3] = [[low, low], [high, low], [low, high]];
        screen.driver.update_buffer_object(triangle.vertices, bytemuck::cast_slice(&positions), 0).unwrap();

        if i % 2 == 0 {
            // One index per update, at its own offset
            for k in 0..3u16 {
                screen
                    .driver
                    .update_buffer_object(triangle.indices, bytemuck::bytes_of(&k), k as u32 * 2)
                    .unwrap();
            }
        } else {
            screen.driver.update_buffer_object(triangle.indices, &[0; 6], 0).unwrap();
        }

        if i > 0 {
            params.flags = RenderPassFlags::default();
        }
        screen.driver.begin_render_pass(screen.target, params).unwrap();
        screen.driver.draw(material.pipeline(), triangle.primitive, 0, 3, 1).unwrap();
        screen.driver.end_render_pass().unwrap();
    }
    let readback = screen.driver.read_pixels(screen.target, PixelRect::new(0, 0, 16, 16)).unwrap();
    let report = screen.driver.finish().unwrap();
    assert_eq!(report.render_passes, 8);

    let pixels = readback.take().unwrap();
    for i in 0..8u32 {
        let corner = pixel(&pixels, 16, 2 * i, 2 * i);
        let expected = if i % 2 == 0 { WHITE } else { GREEN };
        assert_eq!(corner, expected, "triangle {}", i);
        assert_eq!(pixel(&pixels, 16, 2 * i + 1, 2 * i + 1), GREEN);
    }
}

// ============================================================================
// RANGE CHECKS
// ============================================================================

#[test]
fn test_integration_out_of_range_update_eager() {
    let mut screen = Screen::new(4, 4, ValidationMode::Eager);
    let material = Material::new(&mut screen.driver);

    let result = screen.driver.update_buffer_object(material.uniforms, &[0; 16], 88);
    assert_eq!(
        result,
        Err(Error::OutOfRangeUpdate { byte_offset: 88, length: 16, buffer_size: 96 })
    );
    // The refused update never reached the queue
    screen.driver.execute().unwrap();
}

#[test]
fn test_integration_out_of_range_update_deferred() {
    let mut screen = Screen::new(4, 4, ValidationMode::Deferred);
    let material = Material::new(&mut screen.driver);
    screen.driver.update_buffer_object(material.uniforms, &[0; 16], 88).unwrap();
    screen.driver.flush().unwrap();

    let result = screen.driver.execute();
    assert!(matches!(result, Err(Error::OutOfRangeUpdate { .. })));
    assert_eq!(screen.driver.pending_commands(), 0);
    assert_eq!(screen.driver.stats().aborted_batches, 1);
}
