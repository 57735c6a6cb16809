/// Recorded backend commands
///
/// Every backend operation is captured as one `Command` value and applied later
/// by the executor, strictly in submission order.

use std::sync::{Arc, Mutex, MutexGuard};
use crate::buffer_update::BufferUpdate;
use crate::error::Result;
use crate::handle::{
    AnyHandle, DescriptorSet, DescriptorSetLayout, Handle, HandleKind,
    RenderPrimitive, RenderTarget, SwapChain,
};
use crate::render_pass::RenderPassParams;
use crate::resource::{
    BufferObjectDesc, DescriptorBufferBinding, DescriptorSetLayoutDesc, PipelineState,
    ProgramDesc, RenderPrimitiveDesc, RenderTargetDesc, SwapChainDesc, TextureDesc,
};

// ============================================================================
// Resource descriptors
// ============================================================================

/// Descriptor carried by a CreateResource command
#[derive(Debug, Clone)]
pub enum ResourceDesc {
    BufferObject(BufferObjectDesc),
    Texture(TextureDesc),
    RenderTarget(RenderTargetDesc),
    /// Render target aliasing the current draw swap chain
    DefaultRenderTarget,
    SwapChain(SwapChainDesc),
    Program(ProgramDesc),
    DescriptorSetLayout(DescriptorSetLayoutDesc),
    DescriptorSet {
        layout: Handle<DescriptorSetLayout>,
    },
    RenderPrimitive(RenderPrimitiveDesc),
}

impl ResourceDesc {
    /// Kind of the resource this descriptor creates
    pub fn kind(&self) -> HandleKind {
        match self {
            ResourceDesc::BufferObject(_) => HandleKind::BufferObject,
            ResourceDesc::Texture(_) => HandleKind::Texture,
            ResourceDesc::RenderTarget(_) | ResourceDesc::DefaultRenderTarget => HandleKind::RenderTarget,
            ResourceDesc::SwapChain(_) => HandleKind::SwapChain,
            ResourceDesc::Program(_) => HandleKind::Program,
            ResourceDesc::DescriptorSetLayout(_) => HandleKind::DescriptorSetLayout,
            ResourceDesc::DescriptorSet { .. } => HandleKind::DescriptorSet,
            ResourceDesc::RenderPrimitive(_) => HandleKind::RenderPrimitive,
        }
    }

    /// Other resources the new one refers to
    pub fn dependencies(&self) -> Vec<AnyHandle> {
        match self {
            ResourceDesc::RenderTarget(desc) => desc
                .attachments()
                .into_iter()
                .map(|(_, info)| info.texture.erase())
                .collect(),
            ResourceDesc::DescriptorSet { layout } => vec![layout.erase()],
            ResourceDesc::RenderPrimitive(desc) => {
                vec![desc.vertex_buffer.erase(), desc.index_buffer.erase()]
            }
            _ => Vec::new(),
        }
    }

    /// Structural validation of the descriptor
    pub fn validate(&self) -> Result<()> {
        match self {
            ResourceDesc::BufferObject(desc) => desc.validate(),
            ResourceDesc::Texture(desc) => desc.validate(),
            ResourceDesc::RenderTarget(desc) => desc.validate(),
            ResourceDesc::DefaultRenderTarget => Ok(()),
            ResourceDesc::SwapChain(desc) => desc.validate(),
            ResourceDesc::Program(desc) => desc.validate(),
            ResourceDesc::DescriptorSetLayout(desc) => desc.validate(),
            ResourceDesc::DescriptorSet { .. } => Ok(()),
            ResourceDesc::RenderPrimitive(desc) => desc.validate(),
        }
    }
}

// ============================================================================
// Draw call
// ============================================================================

/// Parameters of one indexed draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub pipeline: PipelineState,
    pub primitive: Handle<RenderPrimitive>,
    /// First index read from the index buffer
    pub index_offset: u32,
    pub index_count: u32,
    pub instance_count: u32,
}

impl DrawCall {
    /// Every resource the draw reads, besides bound descriptor sets
    pub fn handles(&self) -> Vec<AnyHandle> {
        let layouts = self
            .pipeline
            .pipeline_layout
            .set_layout
            .iter()
            .flatten()
            .map(|layout| layout.erase());
        std::iter::once(self.pipeline.program.erase())
            .chain(layouts)
            .chain(std::iter::once(self.primitive.erase()))
            .collect()
    }
}

// ============================================================================
// Pixel read-back
// ============================================================================

/// Rectangle of pixels, origin at the bottom-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Number of bytes of an RGBA8 read-back of this rectangle
    pub fn rgba8_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Destination of a ReadPixels command
///
/// Filled with RGBA8 pixels (rows bottom-to-top) when the command executes.
/// Clones share the same destination.
#[derive(Debug, Clone, Default)]
pub struct PixelReadback {
    pixels: Arc<Mutex<Option<Vec<u8>>>>,
}

impl PixelReadback {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fulfill(&self, pixels: Vec<u8>) {
        *self.lock() = Some(pixels);
    }

    /// Whether the read-back has executed
    pub fn is_ready(&self) -> bool {
        self.lock().is_some()
    }

    /// Take the pixels out, leaving the read-back empty
    pub fn take(&self) -> Option<Vec<u8>> {
        self.lock().take()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Vec<u8>>> {
        // Poisoning cannot leave the Option half-written
        self.pixels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ============================================================================
// Command
// ============================================================================

/// One recorded backend operation
#[derive(Debug, Clone)]
pub enum Command {
    CreateResource {
        handle: AnyHandle,
        desc: ResourceDesc,
    },
    DestroyResource {
        handle: AnyHandle,
    },
    UpdateBufferRange(BufferUpdate),
    UpdateDescriptorSetBuffer {
        set: Handle<DescriptorSet>,
        binding: u8,
        range: DescriptorBufferBinding,
    },
    BindDescriptorSet {
        set: Handle<DescriptorSet>,
        set_index: u8,
    },
    MakeCurrent {
        draw: Handle<SwapChain>,
        read: Handle<SwapChain>,
    },
    BeginFrame {
        frame_id: u64,
    },
    EndFrame {
        frame_id: u64,
    },
    BeginRenderPass {
        target: Handle<RenderTarget>,
        params: RenderPassParams,
    },
    Draw(DrawCall),
    EndRenderPass,
    ReadPixels {
        target: Handle<RenderTarget>,
        rect: PixelRect,
        destination: PixelReadback,
    },
    Flush,
    Present {
        swap_chain: Handle<SwapChain>,
    },
}

impl Command {
    /// Operation name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateResource { .. } => "create_resource",
            Command::DestroyResource { .. } => "destroy",
            Command::UpdateBufferRange(_) => "update_buffer_object",
            Command::UpdateDescriptorSetBuffer { .. } => "update_descriptor_set_buffer",
            Command::BindDescriptorSet { .. } => "bind_descriptor_set",
            Command::MakeCurrent { .. } => "make_current",
            Command::BeginFrame { .. } => "begin_frame",
            Command::EndFrame { .. } => "end_frame",
            Command::BeginRenderPass { .. } => "begin_render_pass",
            Command::Draw(_) => "draw",
            Command::EndRenderPass => "end_render_pass",
            Command::ReadPixels { .. } => "read_pixels",
            Command::Flush => "flush",
            Command::Present { .. } => "commit",
        }
    }

    /// Existing resources the command refers to
    ///
    /// The handle a CreateResource command creates is not included; its
    /// dependencies are.
    pub fn handles(&self) -> Vec<AnyHandle> {
        match self {
            Command::CreateResource { desc, .. } => desc.dependencies(),
            Command::DestroyResource { handle } => vec![*handle],
            Command::UpdateBufferRange(update) => vec![update.buffer.erase()],
            Command::UpdateDescriptorSetBuffer { set, range, .. } => {
                vec![set.erase(), range.buffer.erase()]
            }
            Command::BindDescriptorSet { set, .. } => vec![set.erase()],
            Command::MakeCurrent { draw, read } => vec![draw.erase(), read.erase()],
            Command::BeginRenderPass { target, .. } => vec![target.erase()],
            Command::Draw(call) => call.handles(),
            Command::ReadPixels { target, .. } => vec![target.erase()],
            Command::Present { swap_chain } => vec![swap_chain.erase()],
            Command::BeginFrame { .. }
            | Command::EndFrame { .. }
            | Command::EndRenderPass
            | Command::Flush => Vec::new(),
        }
    }
}
