//! Device module - the native graphics API seam
//!
//! A `Device` receives already-validated commands from the executor, one call
//! per command, in submission order. Handles are allocated by the backend
//! before the device sees them; devices key their own objects by
//! `Handle::key()`.

pub mod software;

#[cfg(test)]
pub(crate) mod mock_device;

use crate::buffer_update::BufferUpdate;
use crate::command::{DrawCall, PixelRect};
use crate::error::Result;
use crate::handle::{
    AnyHandle, BufferObject, DescriptorSet, DescriptorSetLayout, Handle, Program,
    RenderPrimitive, RenderTarget, SwapChain, Texture,
};
use crate::render_pass::RenderPassParams;
use crate::resource::{
    BufferObjectDesc, DescriptorBufferBinding, DescriptorSetLayoutDesc, ProgramDesc,
    RenderPrimitiveDesc, RenderTargetDesc, SwapChainDesc, TextureDesc,
    MAX_DESCRIPTOR_SET_COUNT,
};

/// Descriptor sets bound at each set index when a draw executes
pub type BoundDescriptorSets = [Option<Handle<DescriptorSet>>; MAX_DESCRIPTOR_SET_COUNT];

/// Native device implementation
///
/// Errors returned here are reported to the client as `SubmissionFailure`
/// and abort the rest of the batch.
pub trait Device: Send {
    /// Device name (for logging)
    fn name(&self) -> &str;

    // ===== RESOURCE CREATION =====

    /// Create a buffer object of `desc.size` zeroed bytes
    fn create_buffer_object(&mut self, handle: Handle<BufferObject>, desc: &BufferObjectDesc) -> Result<()>;

    fn create_texture(&mut self, handle: Handle<Texture>, desc: &TextureDesc) -> Result<()>;

    /// Create an offscreen render target over existing textures
    fn create_render_target(&mut self, handle: Handle<RenderTarget>, desc: &RenderTargetDesc) -> Result<()>;

    /// Create the render target that aliases the current draw swap chain
    fn create_default_render_target(&mut self, handle: Handle<RenderTarget>) -> Result<()>;

    fn create_swap_chain(&mut self, handle: Handle<SwapChain>, desc: &SwapChainDesc) -> Result<()>;

    fn create_program(&mut self, handle: Handle<Program>, desc: &ProgramDesc) -> Result<()>;

    fn create_descriptor_set_layout(
        &mut self,
        handle: Handle<DescriptorSetLayout>,
        desc: &DescriptorSetLayoutDesc,
    ) -> Result<()>;

    fn create_descriptor_set(
        &mut self,
        handle: Handle<DescriptorSet>,
        layout: Handle<DescriptorSetLayout>,
    ) -> Result<()>;

    fn create_render_primitive(&mut self, handle: Handle<RenderPrimitive>, desc: &RenderPrimitiveDesc) -> Result<()>;

    /// Destroy any resource
    fn destroy(&mut self, handle: AnyHandle) -> Result<()>;

    // ===== UPDATES =====

    /// Write `update.data` at `update.byte_offset`; the range is already checked
    fn update_buffer_object(&mut self, update: &BufferUpdate) -> Result<()>;

    /// Point `binding` of `set` at a range of a buffer object
    fn update_descriptor_set_buffer(
        &mut self,
        set: Handle<DescriptorSet>,
        binding: u8,
        range: &DescriptorBufferBinding,
    ) -> Result<()>;

    // ===== FRAME =====

    /// Select the swap chains drawn into and read from
    fn make_current(&mut self, draw: Handle<SwapChain>, read: Handle<SwapChain>) -> Result<()>;

    fn begin_frame(&mut self, _frame_id: u64) -> Result<()> {
        Ok(())
    }

    fn end_frame(&mut self, _frame_id: u64) -> Result<()> {
        Ok(())
    }

    // ===== RENDER PASS =====

    /// Begin a pass on `target`, applying the load actions of `params.flags`
    fn begin_render_pass(&mut self, target: Handle<RenderTarget>, params: &RenderPassParams) -> Result<()>;

    /// Draw inside the current pass
    ///
    /// # Arguments
    ///
    /// * `call` - Pipeline, primitive and index range
    /// * `bound_sets` - Descriptor sets bound at each set index
    fn draw(&mut self, call: &DrawCall, bound_sets: &BoundDescriptorSets) -> Result<()>;

    /// End the current pass, applying its store actions
    fn end_render_pass(&mut self) -> Result<()>;

    // ===== SYNCHRONIZATION =====

    /// Read COLOR0 of `target` as RGBA8, rows bottom-to-top
    fn read_pixels(&mut self, target: Handle<RenderTarget>, rect: PixelRect) -> Result<Vec<u8>>;

    /// Submit everything applied so far
    fn flush(&mut self) -> Result<()>;

    /// Present `swap_chain`
    fn commit(&mut self, swap_chain: Handle<SwapChain>) -> Result<()>;

    /// Block until all submitted work has completed
    fn finish(&mut self) -> Result<()>;
}
