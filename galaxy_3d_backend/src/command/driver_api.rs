/// Driver API - the client-facing backend surface
///
/// Creation calls reserve a handle and record a CreateResource command; the
/// handle can be used in later commands right away even though the device
/// object only exists once the batch executes. Nothing reaches the device
/// before `execute()` or `finish()`.
///
/// # Example
///
/// ```no_run
/// use galaxy_3d_backend::galaxy3d::{
///     BackendConfig, DriverApi, PixelRect, RenderPassParams, SwapChainDesc,
/// };
/// use galaxy_3d_backend::galaxy3d::device::{SoftwareDevice, SoftwareDeviceConfig};
///
/// let device = SoftwareDevice::new(SoftwareDeviceConfig::default());
/// let mut driver = DriverApi::new(Box::new(device), BackendConfig::default());
///
/// let swap_chain = driver.create_swap_chain(SwapChainDesc::new(64, 64))?;
/// let target = driver.create_default_render_target()?;
/// driver.make_current(swap_chain, swap_chain)?;
/// driver.begin_render_pass(target, RenderPassParams::cleared([1.0, 0.0, 0.0, 1.0]))?;
/// driver.end_render_pass()?;
/// let readback = driver.read_pixels(target, PixelRect::new(0, 0, 64, 64))?;
/// driver.commit(swap_chain)?;
/// driver.finish()?;
/// assert!(readback.is_ready());
/// # Ok::<(), galaxy_3d_backend::galaxy3d::Error>(())
/// ```

use bytemuck::Pod;
use crate::buffer_update::{BufferUpdate, UniformBindingConfig};
use crate::config::BackendConfig;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::handle::{
    BufferObject, DescriptorSet, DescriptorSetLayout, Handle, Program, RenderPrimitive,
    RenderTarget, ResourceKind, ResourceRegistry, SwapChain, Texture,
};
use crate::render_pass::RenderPassParams;
use crate::resource::{
    BufferObjectBinding, BufferObjectDesc, BufferUsage, DescriptorBufferBinding,
    DescriptorSetLayoutDesc, PipelineState, ProgramDesc, RenderPrimitiveDesc, RenderTargetDesc,
    SwapChainDesc, TextureDesc,
};
use crate::{backend_bail, backend_err, backend_info};
use super::command::{Command, DrawCall, PixelReadback, PixelRect, ResourceDesc};
use super::executor::{BatchReport, CommandExecutor, ExecutorStats};
use super::recorder::CommandRecorder;

const SOURCE: &str = "galaxy3d::DriverApi";

/// Deferred backend driving one device through one command queue
pub struct DriverApi {
    config: BackendConfig,
    registry: ResourceRegistry,
    recorder: CommandRecorder,
    executor: CommandExecutor,
    device: Box<dyn Device>,
    frame_id: u64,
}

impl DriverApi {
    /// Create a driver over `device`
    ///
    /// # Arguments
    ///
    /// * `device` - Native device receiving executed commands
    /// * `config` - Backend configuration (validation mode)
    pub fn new(device: Box<dyn Device>, config: BackendConfig) -> Self {
        backend_info!(
            SOURCE,
            "'{}' on {} ({:?} validation)",
            config.app_name,
            device.name(),
            config.validation
        );
        Self {
            recorder: CommandRecorder::new(config.validation),
            config,
            registry: ResourceRegistry::new(),
            executor: CommandExecutor::new(),
            device,
            frame_id: 0,
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Handle registry (read-only view)
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Number of recorded commands not yet executed
    pub fn pending_commands(&self) -> usize {
        self.recorder.len()
    }

    pub fn stats(&self) -> ExecutorStats {
        self.executor.stats()
    }

    pub fn device_name(&self) -> &str {
        self.device.name()
    }

    // ===== RESOURCE CREATION =====

    /// Create a zero-initialised buffer object of `size` bytes
    pub fn create_buffer_object(
        &mut self,
        size: u32,
        binding: BufferObjectBinding,
        usage: BufferUsage,
    ) -> Result<Handle<BufferObject>> {
        let desc = BufferObjectDesc { size, binding, usage };
        self.create(Some(size as u64), ResourceDesc::BufferObject(desc))
    }

    pub fn create_texture(&mut self, desc: TextureDesc) -> Result<Handle<Texture>> {
        self.create(None, ResourceDesc::Texture(desc))
    }

    /// Create an offscreen render target over textures created earlier
    pub fn create_render_target(&mut self, desc: RenderTargetDesc) -> Result<Handle<RenderTarget>> {
        self.create(None, ResourceDesc::RenderTarget(desc))
    }

    /// Create the render target aliasing the current draw swap chain
    pub fn create_default_render_target(&mut self) -> Result<Handle<RenderTarget>> {
        self.create(None, ResourceDesc::DefaultRenderTarget)
    }

    pub fn create_swap_chain(&mut self, desc: SwapChainDesc) -> Result<Handle<SwapChain>> {
        self.create(None, ResourceDesc::SwapChain(desc))
    }

    pub fn create_program(&mut self, desc: ProgramDesc) -> Result<Handle<Program>> {
        self.create(None, ResourceDesc::Program(desc))
    }

    /// Create a program together with the layout of its uniform blocks
    ///
    /// The layout holds one uniform buffer binding per uniform block, in
    /// declaration order.
    pub fn compile_program(&mut self, desc: ProgramDesc) -> Result<(Handle<Program>, Handle<DescriptorSetLayout>)> {
        if let Err(err) = desc.validate() {
            backend_bail!(SOURCE, err);
        }
        let layout_desc = DescriptorSetLayoutDesc::uniform_buffers(desc.uniform_blocks.len());
        let program = self.create_program(desc)?;
        let layout = self.create_descriptor_set_layout(layout_desc)?;
        Ok((program, layout))
    }

    pub fn create_descriptor_set_layout(&mut self, desc: DescriptorSetLayoutDesc) -> Result<Handle<DescriptorSetLayout>> {
        self.create(None, ResourceDesc::DescriptorSetLayout(desc))
    }

    pub fn create_descriptor_set(&mut self, layout: Handle<DescriptorSetLayout>) -> Result<Handle<DescriptorSet>> {
        self.create(None, ResourceDesc::DescriptorSet { layout })
    }

    pub fn create_render_primitive(&mut self, desc: RenderPrimitiveDesc) -> Result<Handle<RenderPrimitive>> {
        self.create(None, ResourceDesc::RenderPrimitive(desc))
    }

    /// Record the destruction of `handle`
    pub fn destroy<T: ResourceKind>(&mut self, handle: Handle<T>) -> Result<()> {
        self.record(Command::DestroyResource { handle: handle.erase() })
    }

    // ===== BUFFER UPDATES =====

    /// Write `data` into `buffer` starting at `byte_offset`
    ///
    /// `data` is copied at record time; the write lands when the batch executes.
    pub fn update_buffer_object(&mut self, buffer: Handle<BufferObject>, data: &[u8], byte_offset: u32) -> Result<()> {
        self.record(Command::UpdateBufferRange(BufferUpdate::new(buffer, byte_offset, data)))
    }

    /// Write a whole uniform block placed by `config`
    pub fn upload_uniform<T: Pod>(
        &mut self,
        buffer: Handle<BufferObject>,
        config: &UniformBindingConfig,
        value: &T,
    ) -> Result<()> {
        if let Err(err) = config.validate() {
            backend_bail!(SOURCE, err);
        }
        let bytes = bytemuck::bytes_of(value);
        if bytes.len() != config.data_size as usize {
            backend_bail!(
                SOURCE,
                Error::InvalidResource(format!(
                    "uniform value is {} bytes, binding expects {}",
                    bytes.len(),
                    config.data_size
                ))
            );
        }
        if let Some(extent) = self.registry.extent(buffer) {
            if config.buffer_size as u64 > extent {
                backend_bail!(
                    SOURCE,
                    Error::InvalidResource(format!(
                        "binding describes a {} byte buffer, {} holds {}",
                        config.buffer_size, buffer, extent
                    ))
                );
            }
        }
        self.update_buffer_object(buffer, bytes, config.byte_offset)
    }

    /// Point `binding` of `set` at `size` bytes of `buffer` starting at `offset`
    pub fn update_descriptor_set_buffer(
        &mut self,
        set: Handle<DescriptorSet>,
        binding: u8,
        buffer: Handle<BufferObject>,
        offset: u32,
        size: u32,
    ) -> Result<()> {
        let range = DescriptorBufferBinding { buffer, offset, size };
        self.record(Command::UpdateDescriptorSetBuffer { set, binding, range })
    }

    pub fn bind_descriptor_set(&mut self, set: Handle<DescriptorSet>, set_index: u8) -> Result<()> {
        self.record(Command::BindDescriptorSet { set, set_index })
    }

    // ===== FRAME =====

    pub fn make_current(&mut self, draw: Handle<SwapChain>, read: Handle<SwapChain>) -> Result<()> {
        self.record(Command::MakeCurrent { draw, read })
    }

    /// Record the start of a new frame and return its id
    pub fn begin_frame(&mut self) -> Result<u64> {
        self.frame_id += 1;
        self.record(Command::BeginFrame { frame_id: self.frame_id })?;
        Ok(self.frame_id)
    }

    pub fn end_frame(&mut self) -> Result<()> {
        self.record(Command::EndFrame { frame_id: self.frame_id })
    }

    // ===== RENDER PASS =====

    pub fn begin_render_pass(&mut self, target: Handle<RenderTarget>, params: RenderPassParams) -> Result<()> {
        self.record(Command::BeginRenderPass { target, params })
    }

    /// Draw `index_count` indices of `primitive` starting at `index_offset`
    pub fn draw(
        &mut self,
        pipeline: PipelineState,
        primitive: Handle<RenderPrimitive>,
        index_offset: u32,
        index_count: u32,
        instance_count: u32,
    ) -> Result<()> {
        self.record(Command::Draw(DrawCall {
            pipeline,
            primitive,
            index_offset,
            index_count,
            instance_count,
        }))
    }

    pub fn end_render_pass(&mut self) -> Result<()> {
        self.record(Command::EndRenderPass)
    }

    // ===== SYNCHRONIZATION =====

    /// Record a read-back of COLOR0 of `target`
    ///
    /// The returned read-back is filled when the command executes.
    pub fn read_pixels(&mut self, target: Handle<RenderTarget>, rect: PixelRect) -> Result<PixelReadback> {
        let destination = PixelReadback::new();
        self.record(Command::ReadPixels {
            target,
            rect,
            destination: destination.clone(),
        })?;
        Ok(destination)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.record(Command::Flush)
    }

    /// Present `swap_chain`
    pub fn commit(&mut self, swap_chain: Handle<SwapChain>) -> Result<()> {
        self.record(Command::Present { swap_chain })
    }

    /// Execute every recorded command, in order
    ///
    /// The queue is empty afterwards whether or not the batch succeeded.
    pub fn execute(&mut self) -> Result<BatchReport> {
        let batch = self.recorder.take_batch();
        let result = self.executor.execute(batch, &mut self.registry, self.device.as_mut());
        if result.is_err() {
            self.recorder.resync(self.executor.bound_sets(), self.executor.dependencies());
        }
        result
    }

    /// Execute the pending batch and wait for the device to complete it
    pub fn finish(&mut self) -> Result<BatchReport> {
        let report = self.execute()?;
        self.device
            .finish()
            .map_err(|err| backend_err!(SOURCE, Error::submission("finish", err)))?;
        Ok(report)
    }

    fn create<T: ResourceKind>(&mut self, extent: Option<u64>, desc: ResourceDesc) -> Result<Handle<T>> {
        let handle = self.registry.reserve::<T>(extent);
        let command = Command::CreateResource { handle: handle.erase(), desc };
        if let Err(err) = self.recorder.record(command, &mut self.registry) {
            self.registry.unreserve(handle.erase());
            return Err(err);
        }
        Ok(handle)
    }

    fn record(&mut self, command: Command) -> Result<()> {
        self.recorder.record(command, &mut self.registry)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "driver_api_tests.rs"]
mod tests;
