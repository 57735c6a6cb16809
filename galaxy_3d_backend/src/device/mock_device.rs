/// Mock Device for unit tests (no rendering)
///
/// Records every call as a string so tests can assert on the exact sequence
/// the executor produced, and can be told to fail a given operation.

use std::sync::{Arc, Mutex};
use crate::buffer_update::BufferUpdate;
use crate::command::{DrawCall, PixelRect};
use crate::device::{BoundDescriptorSets, Device};
use crate::error::{Error, Result};
use crate::handle::{
    AnyHandle, BufferObject, DescriptorSet, DescriptorSetLayout, Handle, Program,
    RenderPrimitive, RenderTarget, SwapChain, Texture,
};
use crate::render_pass::RenderPassParams;
use crate::resource::{
    BufferObjectDesc, DescriptorBufferBinding, DescriptorSetLayoutDesc, ProgramDesc,
    RenderPrimitiveDesc, RenderTargetDesc, SwapChainDesc, TextureDesc,
};

/// Mock device that tracks calls without rendering
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    /// Every call, in order
    pub calls: Arc<Mutex<Vec<String>>>,
    /// Operation name that fails when called
    pub fail_on: Option<String>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `operation` fail
    pub fn failing_on(operation: &str) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_on: Some(operation.to_string()),
        }
    }

    /// Snapshot of the recorded calls
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn push(&self, operation: &str, detail: String) -> Result<()> {
        if self.fail_on.as_deref() == Some(operation) {
            return Err(Error::SubmissionFailure(format!("mock failure in {}", operation)));
        }
        if let Ok(mut calls) = self.calls.lock() {
            if detail.is_empty() {
                calls.push(operation.to_string());
            } else {
                calls.push(format!("{} {}", operation, detail));
            }
        }
        Ok(())
    }
}

impl Device for MockDevice {
    fn name(&self) -> &str {
        "MockDevice"
    }

    fn create_buffer_object(&mut self, handle: Handle<BufferObject>, desc: &BufferObjectDesc) -> Result<()> {
        self.push("create_buffer_object", format!("{} size={}", handle, desc.size))
    }

    fn create_texture(&mut self, handle: Handle<Texture>, desc: &TextureDesc) -> Result<()> {
        self.push("create_texture", format!("{} {}x{}", handle, desc.width, desc.height))
    }

    fn create_render_target(&mut self, handle: Handle<RenderTarget>, _desc: &RenderTargetDesc) -> Result<()> {
        self.push("create_render_target", handle.to_string())
    }

    fn create_default_render_target(&mut self, handle: Handle<RenderTarget>) -> Result<()> {
        self.push("create_default_render_target", handle.to_string())
    }

    fn create_swap_chain(&mut self, handle: Handle<SwapChain>, _desc: &SwapChainDesc) -> Result<()> {
        self.push("create_swap_chain", handle.to_string())
    }

    fn create_program(&mut self, handle: Handle<Program>, desc: &ProgramDesc) -> Result<()> {
        self.push("create_program", format!("{} {}", handle, desc.name))
    }

    fn create_descriptor_set_layout(
        &mut self,
        handle: Handle<DescriptorSetLayout>,
        desc: &DescriptorSetLayoutDesc,
    ) -> Result<()> {
        self.push("create_descriptor_set_layout", format!("{} bindings={}", handle, desc.bindings.len()))
    }

    fn create_descriptor_set(
        &mut self,
        handle: Handle<DescriptorSet>,
        _layout: Handle<DescriptorSetLayout>,
    ) -> Result<()> {
        self.push("create_descriptor_set", handle.to_string())
    }

    fn create_render_primitive(&mut self, handle: Handle<RenderPrimitive>, _desc: &RenderPrimitiveDesc) -> Result<()> {
        self.push("create_render_primitive", handle.to_string())
    }

    fn destroy(&mut self, handle: AnyHandle) -> Result<()> {
        self.push("destroy", handle.to_string())
    }

    fn update_buffer_object(&mut self, update: &BufferUpdate) -> Result<()> {
        self.push(
            "update_buffer_object",
            format!("{} [{}..{})", update.buffer, update.byte_offset, update.end()),
        )
    }

    fn update_descriptor_set_buffer(
        &mut self,
        set: Handle<DescriptorSet>,
        binding: u8,
        _range: &DescriptorBufferBinding,
    ) -> Result<()> {
        self.push("update_descriptor_set_buffer", format!("{} binding={}", set, binding))
    }

    fn make_current(&mut self, draw: Handle<SwapChain>, _read: Handle<SwapChain>) -> Result<()> {
        self.push("make_current", draw.to_string())
    }

    fn begin_frame(&mut self, frame_id: u64) -> Result<()> {
        self.push("begin_frame", frame_id.to_string())
    }

    fn end_frame(&mut self, frame_id: u64) -> Result<()> {
        self.push("end_frame", frame_id.to_string())
    }

    fn begin_render_pass(&mut self, target: Handle<RenderTarget>, _params: &RenderPassParams) -> Result<()> {
        self.push("begin_render_pass", target.to_string())
    }

    fn draw(&mut self, call: &DrawCall, _bound_sets: &BoundDescriptorSets) -> Result<()> {
        self.push("draw", format!("count={}", call.index_count))
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.push("end_render_pass", String::new())
    }

    fn read_pixels(&mut self, target: Handle<RenderTarget>, rect: PixelRect) -> Result<Vec<u8>> {
        self.push("read_pixels", target.to_string())?;
        Ok(vec![0; rect.rgba8_len()])
    }

    fn flush(&mut self) -> Result<()> {
        self.push("flush", String::new())
    }

    fn commit(&mut self, swap_chain: Handle<SwapChain>) -> Result<()> {
        self.push("commit", swap_chain.to_string())
    }

    fn finish(&mut self) -> Result<()> {
        self.push("finish", String::new())
    }
}
