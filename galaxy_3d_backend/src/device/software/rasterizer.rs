/// Triangle setup and scan conversion
///
/// Clip space is y-up with NDC x, y, z in [-1, 1]; window depth is
/// `z * 0.5 + 0.5`. Pixels are sampled at their centers. Triangles with a
/// vertex at or behind the eye (w <= 0) are dropped rather than clipped.

use glam::{Vec3, Vec4};
use crate::render_pass::Viewport;
use crate::resource::{CullingMode, RasterState};

/// One covered pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Fragment {
    pub x: u32,
    pub y: u32,
    /// Window depth in [0, 1]
    pub depth: f32,
}

impl Fragment {
    /// Window coordinates of the pixel center
    pub(crate) fn frag_coord(&self) -> Vec4 {
        Vec4::new(self.x as f32 + 0.5, self.y as f32 + 0.5, self.depth, 1.0)
    }
}

/// Clip-space position to window coordinates
pub(crate) fn to_window(clip: Vec4, viewport: &Viewport) -> Option<Vec3> {
    if clip.w <= 0.0 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    Some(Vec3::new(
        viewport.left as f32 + (ndc.x + 1.0) * 0.5 * viewport.width as f32,
        viewport.bottom as f32 + (ndc.y + 1.0) * 0.5 * viewport.height as f32,
        ndc.z * 0.5 + 0.5,
    ))
}

fn edge(a: Vec3, b: Vec3, px: f32, py: f32) -> f32 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

/// Append the pixels covered by one triangle to `out`
///
/// Coverage is clipped to the viewport and to a `width × height` surface.
/// Returns the number of fragments appended.
pub(crate) fn rasterize_triangle(
    clip: [Vec4; 3],
    viewport: &Viewport,
    width: u32,
    height: u32,
    raster: &RasterState,
    out: &mut Vec<Fragment>,
) -> usize {
    let (Some(v0), Some(v1), Some(v2)) = (
        to_window(clip[0], viewport),
        to_window(clip[1], viewport),
        to_window(clip[2], viewport),
    ) else {
        return 0;
    };

    let area = edge(v0, v1, v2.x, v2.y);
    if area == 0.0 || !area.is_finite() {
        return 0;
    }

    // Counter-clockwise in y-up window space has a positive area
    let front = (area > 0.0) == raster.front_face_ccw;
    let culled = match raster.culling {
        CullingMode::None => false,
        CullingMode::Front => front,
        CullingMode::Back => !front,
        CullingMode::FrontAndBack => true,
    };
    if culled {
        return 0;
    }

    let clip_min_x = viewport.left.max(0) as f32;
    let clip_min_y = viewport.bottom.max(0) as f32;
    let clip_max_x = ((viewport.left as i64 + viewport.width as i64).clamp(0, width as i64)) as f32;
    let clip_max_y = ((viewport.bottom as i64 + viewport.height as i64).clamp(0, height as i64)) as f32;

    let min_x = v0.x.min(v1.x).min(v2.x).floor().max(clip_min_x);
    let min_y = v0.y.min(v1.y).min(v2.y).floor().max(clip_min_y);
    let max_x = v0.x.max(v1.x).max(v2.x).ceil().min(clip_max_x);
    let max_y = v0.y.max(v1.y).max(v2.y).ceil().min(clip_max_y);
    if min_x >= max_x || min_y >= max_y {
        return 0;
    }

    let sign = area.signum();
    let before = out.len();
    for y in min_y as u32..max_y as u32 {
        let py = y as f32 + 0.5;
        for x in min_x as u32..max_x as u32 {
            let px = x as f32 + 0.5;
            let w0 = edge(v1, v2, px, py) * sign;
            let w1 = edge(v2, v0, px, py) * sign;
            let w2 = edge(v0, v1, px, py) * sign;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }
            let depth = (w0 * v0.z + w1 * v1.z + w2 * v2.z) / (area * sign);
            out.push(Fragment { x, y, depth });
        }
    }
    out.len() - before
}

// ============================================================================
// Tests
// ============================================================================
