/// CPU-side image storage for textures and swap chains
///
/// Rows are stored bottom-to-top: row 0 is the bottom of the image, matching
/// window coordinates of the rasterizer and the read-back order.

use glam::Vec4;
use crate::command::PixelRect;
use crate::error::{Error, Result};
use crate::resource::TextureFormat;

#[derive(Debug, Clone)]
enum SurfaceData {
    /// RGBA8, four bytes per pixel
    Color(Vec<u8>),
    Depth(Vec<f32>),
}

/// One 2D image
#[derive(Debug, Clone)]
pub(crate) struct Surface {
    width: u32,
    height: u32,
    data: SurfaceData,
}

impl Surface {
    /// Zero-filled surface of `format`
    pub(crate) fn new(width: u32, height: u32, format: TextureFormat) -> Self {
        let pixels = width as usize * height as usize;
        let data = if format.is_depth() {
            SurfaceData::Depth(vec![1.0; pixels])
        } else {
            SurfaceData::Color(vec![0; pixels * 4])
        };
        Self { width, height, data }
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn is_depth(&self) -> bool {
        matches!(self.data, SurfaceData::Depth(_))
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    /// Fill a color surface with `color`, or a depth surface with `depth`
    pub(crate) fn clear(&mut self, color: [f32; 4], depth: f32) {
        match &mut self.data {
            SurfaceData::Color(bytes) => {
                let texel = to_rgba8(Vec4::from_array(color));
                for pixel in bytes.chunks_exact_mut(4) {
                    pixel.copy_from_slice(&texel);
                }
            }
            SurfaceData::Depth(values) => values.fill(depth),
        }
    }

    pub(crate) fn write_color(&mut self, x: u32, y: u32, texel: [u8; 4]) {
        if let Some(index) = self.index(x, y) {
            if let SurfaceData::Color(bytes) = &mut self.data {
                bytes[index * 4..index * 4 + 4].copy_from_slice(&texel);
            }
        }
    }

    pub(crate) fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        let index = self.index(x, y)?;
        match &self.data {
            SurfaceData::Depth(values) => Some(values[index]),
            SurfaceData::Color(_) => None,
        }
    }

    pub(crate) fn write_depth(&mut self, x: u32, y: u32, depth: f32) {
        if let Some(index) = self.index(x, y) {
            if let SurfaceData::Depth(values) = &mut self.data {
                values[index] = depth;
            }
        }
    }

    /// Copy `rect` out as RGBA8, rows bottom-to-top
    pub(crate) fn read_rgba8(&self, rect: PixelRect) -> Result<Vec<u8>> {
        let SurfaceData::Color(bytes) = &self.data else {
            return Err(Error::InvalidResource("cannot read pixels from a depth surface".to_string()));
        };
        let fits_x = rect.x.checked_add(rect.width).is_some_and(|end| end <= self.width);
        let fits_y = rect.y.checked_add(rect.height).is_some_and(|end| end <= self.height);
        if !fits_x || !fits_y {
            return Err(Error::InvalidResource(format!(
                "read-back rect {}x{} at ({}, {}) exceeds the {}x{} surface",
                rect.width, rect.height, rect.x, rect.y, self.width, self.height
            )));
        }

        let mut pixels = Vec::with_capacity(rect.rgba8_len());
        let row_bytes = rect.width as usize * 4;
        for y in rect.y..rect.y + rect.height {
            let start = (y as usize * self.width as usize + rect.x as usize) * 4;
            pixels.extend_from_slice(&bytes[start..start + row_bytes]);
        }
        Ok(pixels)
    }
}

/// Normalized color to RGBA8
pub(crate) fn to_rgba8(color: Vec4) -> [u8; 4] {
    let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    [quantize(color.x), quantize(color.y), quantize(color.z), quantize(color.w)]
}

// ============================================================================
// Tests
// ============================================================================
