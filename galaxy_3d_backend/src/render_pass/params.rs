/// Render pass parameters
///
/// Scoped to a single begin/end pair; nothing here outlives the pass.

use bitflags::bitflags;

/// Number of color attachments a render target can have
pub const MAX_COLOR_ATTACHMENTS: usize = 4;

bitflags! {
    /// Attachment selection, combined with bitwise OR
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TargetBufferFlags: u32 {
        const NONE    = 0x00;
        const COLOR0  = 0x01;
        const COLOR1  = 0x02;
        const COLOR2  = 0x04;
        const COLOR3  = 0x08;
        /// Alias of COLOR0
        const COLOR   = Self::COLOR0.bits();
        const COLOR_ALL = Self::COLOR0.bits() | Self::COLOR1.bits() | Self::COLOR2.bits() | Self::COLOR3.bits();
        const DEPTH   = 0x10;
        const STENCIL = 0x20;
        const DEPTH_AND_STENCIL = Self::DEPTH.bits() | Self::STENCIL.bits();
        const ALL     = Self::COLOR_ALL.bits() | Self::DEPTH_AND_STENCIL.bits();
    }
}

impl TargetBufferFlags {
    /// Flag of color attachment `index` (NONE past the last attachment)
    pub fn color(index: usize) -> Self {
        if index < MAX_COLOR_ATTACHMENTS {
            Self::from_bits_truncate(1 << index)
        } else {
            Self::NONE
        }
    }
}

/// Region of the render target covered by the pass
///
/// Origin is the bottom-left corner. A zero width or height means the whole
/// render target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub left: i32,
    pub bottom: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(left: i32, bottom: i32, width: u32, height: u32) -> Self {
        Self { left, bottom, width, height }
    }

    /// Full-target viewport for a `width × height` target
    pub fn full(width: u32, height: u32) -> Self {
        Self { left: 0, bottom: 0, width, height }
    }

    /// Resolve a zero-sized viewport against the target extent
    pub fn resolve(&self, target_width: u32, target_height: u32) -> Self {
        if self.width == 0 || self.height == 0 {
            Self::full(target_width, target_height)
        } else {
            *self
        }
    }
}

/// Load/store behavior of the pass attachments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderPassFlags {
    /// Attachments cleared on entry
    pub clear: TargetBufferFlags,
    /// Attachments whose prior contents need not be loaded
    pub discard_start: TargetBufferFlags,
    /// Attachments whose contents need not be stored on exit
    pub discard_end: TargetBufferFlags,
}

/// Per-pass transient state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPassParams {
    pub viewport: Viewport,
    /// RGBA clear color
    pub clear_color: [f32; 4],
    pub clear_depth: f32,
    pub clear_stencil: u32,
    pub flags: RenderPassFlags,
}

impl Default for RenderPassParams {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            clear_color: [0.0, 0.0, 0.0, 0.0],
            clear_depth: 1.0,
            clear_stencil: 0,
            flags: RenderPassFlags::default(),
        }
    }
}

impl RenderPassParams {
    /// Clear COLOR to `color`, discarding everything on entry
    pub fn cleared(color: [f32; 4]) -> Self {
        Self {
            clear_color: color,
            flags: RenderPassFlags {
                clear: TargetBufferFlags::COLOR,
                discard_start: TargetBufferFlags::ALL,
                discard_end: TargetBufferFlags::NONE,
            },
            ..Self::default()
        }
    }

    /// Keep prior contents of every attachment
    pub fn preserved() -> Self {
        Self::default()
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }
}
