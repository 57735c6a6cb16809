/// Render target descriptor

use crate::error::{Error, Result};
use crate::handle::{Handle, Texture};
use crate::render_pass::{TargetBufferFlags, MAX_COLOR_ATTACHMENTS};

/// One attachment of a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetBufferInfo {
    /// Texture rendered into
    pub texture: Handle<Texture>,
    /// Mip level
    pub level: u8,
    /// Array layer
    pub layer: u16,
}

impl TargetBufferInfo {
    pub fn new(texture: Handle<Texture>) -> Self {
        Self { texture, level: 0, layer: 0 }
    }
}

/// Descriptor for creating an offscreen render target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTargetDesc {
    /// Attachments present in this target
    pub targets: TargetBufferFlags,
    pub width: u32,
    pub height: u32,
    pub samples: u8,
    pub layer_count: u8,
    /// Color attachments, indexed like COLOR0..COLOR3
    pub color: [Option<TargetBufferInfo>; MAX_COLOR_ATTACHMENTS],
    pub depth: Option<TargetBufferInfo>,
    pub stencil: Option<TargetBufferInfo>,
}

impl RenderTargetDesc {
    /// Target with a single color attachment
    pub fn with_color(width: u32, height: u32, texture: Handle<Texture>) -> Self {
        let mut color = [None; MAX_COLOR_ATTACHMENTS];
        color[0] = Some(TargetBufferInfo::new(texture));
        Self {
            targets: TargetBufferFlags::COLOR0,
            width,
            height,
            samples: 1,
            layer_count: 1,
            color,
            depth: None,
            stencil: None,
        }
    }

    /// Add a depth attachment
    pub fn with_depth(mut self, texture: Handle<Texture>) -> Self {
        self.depth = Some(TargetBufferInfo::new(texture));
        self.targets |= TargetBufferFlags::DEPTH;
        self
    }

    /// Every attachment with the flag naming it
    pub fn attachments(&self) -> Vec<(TargetBufferFlags, TargetBufferInfo)> {
        let colors = self
            .color
            .iter()
            .enumerate()
            .filter_map(|(index, info)| info.map(|info| (TargetBufferFlags::color(index), info)));
        let depth = self.depth.map(|info| (TargetBufferFlags::DEPTH, info));
        let stencil = self.stencil.map(|info| (TargetBufferFlags::STENCIL, info));
        colors.chain(depth).chain(stencil).collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidResource(format!(
                "render target extent {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        let mut present = TargetBufferFlags::NONE;
        for (flag, _) in self.attachments() {
            present |= flag;
        }
        if present != self.targets {
            return Err(Error::InvalidResource(format!(
                "render target declares {:?} but provides attachments for {:?}",
                self.targets, present
            )));
        }
        Ok(())
    }
}
