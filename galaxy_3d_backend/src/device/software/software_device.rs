/// Software device - CPU implementation of the device contract
///
/// Buffers are byte vectors, textures and swap chains are `Surface`s, and draws
/// are rasterized immediately when the executor applies them. Since every call
/// completes synchronously, `flush` and `finish` have nothing to wait for.

use std::sync::Arc;
use glam::Vec4;
use rustc_hash::FxHashMap;
use crate::buffer_update::{apply_partial_write, BufferUpdate};
use crate::command::{DrawCall, PixelRect};
use crate::device::{BoundDescriptorSets, Device};
use crate::error::{Error, Result};
use crate::handle::{
    AnyHandle, BufferObject, DescriptorSet, DescriptorSetLayout, Handle, HandleKind, Program,
    RenderPrimitive, RenderTarget, ResourceKind, SwapChain, Texture,
};
use crate::render_pass::{LoadAction, RenderPassParams, TargetBufferFlags, Viewport};
use crate::resource::{
    BufferObjectDesc, DescriptorBufferBinding, DescriptorSetLayoutDesc, FragmentInput, IndexType,
    PrimitiveType, ProgramDesc, ProgramShading, RenderPrimitiveDesc, RenderTargetDesc,
    SwapChainDesc, TextureDesc, TextureFormat, UniformBlocks, VertexInput,
};
use crate::{backend_debug, backend_info, backend_trace};
use super::rasterizer::{rasterize_triangle, Fragment};
use super::surface::{to_rgba8, Surface};

const SOURCE: &str = "galaxy3d::SoftwareDevice";

/// Limits of the software device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftwareDeviceConfig {
    /// Largest texture or swap chain width/height
    pub max_texture_dimension: u32,
    /// Largest buffer object, in bytes
    pub max_buffer_size: u32,
}

impl Default for SoftwareDeviceConfig {
    fn default() -> Self {
        Self {
            max_texture_dimension: 4096,
            max_buffer_size: 64 * 1024 * 1024,
        }
    }
}

// ============================================================================
// Device objects
// ============================================================================

enum RenderTargetEntry {
    Offscreen(RenderTargetDesc),
    /// Resolves to the draw swap chain when a pass begins
    Default,
}

struct ProgramEntry {
    name: String,
    shading: Option<Arc<dyn ProgramShading>>,
}

struct DescriptorSetEntry {
    layout: Handle<DescriptorSetLayout>,
    bindings: FxHashMap<u8, DescriptorBufferBinding>,
}

/// Where an attachment's pixels live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SurfaceId {
    Texture(Handle<Texture>),
    SwapChain(Handle<SwapChain>),
}

/// Attachments of the pass being rendered
struct ActivePass {
    target: Handle<RenderTarget>,
    color: Option<SurfaceId>,
    depth: Option<SurfaceId>,
    width: u32,
    height: u32,
    viewport: Viewport,
}

/// CPU reference device
pub struct SoftwareDevice {
    config: SoftwareDeviceConfig,
    buffers: FxHashMap<Handle<BufferObject>, Vec<u8>>,
    textures: FxHashMap<Handle<Texture>, Surface>,
    render_targets: FxHashMap<Handle<RenderTarget>, RenderTargetEntry>,
    swap_chains: FxHashMap<Handle<SwapChain>, Surface>,
    programs: FxHashMap<Handle<Program>, ProgramEntry>,
    layouts: FxHashMap<Handle<DescriptorSetLayout>, DescriptorSetLayoutDesc>,
    descriptor_sets: FxHashMap<Handle<DescriptorSet>, DescriptorSetEntry>,
    primitives: FxHashMap<Handle<RenderPrimitive>, RenderPrimitiveDesc>,
    draw_swap_chain: Option<Handle<SwapChain>>,
    read_swap_chain: Option<Handle<SwapChain>>,
    active_pass: Option<ActivePass>,
    presented_frames: u64,
}

impl SoftwareDevice {
    pub fn new(config: SoftwareDeviceConfig) -> Self {
        backend_info!(
            SOURCE,
            "Software device (max texture {}, max buffer {} bytes)",
            config.max_texture_dimension,
            config.max_buffer_size
        );
        Self {
            config,
            buffers: FxHashMap::default(),
            textures: FxHashMap::default(),
            render_targets: FxHashMap::default(),
            swap_chains: FxHashMap::default(),
            programs: FxHashMap::default(),
            layouts: FxHashMap::default(),
            descriptor_sets: FxHashMap::default(),
            primitives: FxHashMap::default(),
            draw_swap_chain: None,
            read_swap_chain: None,
            active_pass: None,
            presented_frames: 0,
        }
    }

    pub fn config(&self) -> &SoftwareDeviceConfig {
        &self.config
    }

    /// Number of `commit` calls so far
    pub fn presented_frames(&self) -> u64 {
        self.presented_frames
    }

    /// Current contents of a buffer object
    pub fn buffer_data(&self, buffer: Handle<BufferObject>) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    fn check_extent(&self, what: &str, width: u32, height: u32) -> Result<()> {
        let max = self.config.max_texture_dimension;
        if width > max || height > max {
            return Err(Error::InvalidResource(format!(
                "{} extent {}x{} exceeds the device limit of {}",
                what, width, height, max
            )));
        }
        Ok(())
    }

    fn surface(&self, id: SurfaceId) -> Result<&Surface> {
        match id {
            SurfaceId::Texture(texture) => self.textures.get(&texture).ok_or_else(|| missing(texture)),
            SurfaceId::SwapChain(swap_chain) => self.swap_chains.get(&swap_chain).ok_or_else(|| missing(swap_chain)),
        }
    }

    fn surface_mut(&mut self, id: SurfaceId) -> Result<&mut Surface> {
        match id {
            SurfaceId::Texture(texture) => self.textures.get_mut(&texture).ok_or_else(|| missing(texture)),
            SurfaceId::SwapChain(swap_chain) => {
                self.swap_chains.get_mut(&swap_chain).ok_or_else(|| missing(swap_chain))
            }
        }
    }

    /// Attachments of `target` as (flag, surface) pairs
    ///
    /// # Arguments
    ///
    /// * `swap_chain` - Swap chain a default render target resolves to
    fn attachments(
        &self,
        target: Handle<RenderTarget>,
        swap_chain: Option<Handle<SwapChain>>,
    ) -> Result<Vec<(TargetBufferFlags, SurfaceId)>> {
        match self.render_targets.get(&target).ok_or_else(|| missing(target))? {
            RenderTargetEntry::Offscreen(desc) => Ok(desc
                .attachments()
                .into_iter()
                .map(|(flag, info)| (flag, SurfaceId::Texture(info.texture)))
                .collect()),
            RenderTargetEntry::Default => {
                let swap_chain = swap_chain.ok_or_else(|| {
                    Error::InvalidResource(format!(
                        "{} is the default render target but no swap chain is current",
                        target
                    ))
                })?;
                Ok(vec![(TargetBufferFlags::COLOR0, SurfaceId::SwapChain(swap_chain))])
            }
        }
    }

    /// Bytes visible through every bound descriptor set, captured now
    fn snapshot_uniforms(&self, bound_sets: &BoundDescriptorSets) -> Result<UniformBlocks> {
        let mut uniforms = UniformBlocks::new();
        for (set_index, set) in bound_sets.iter().enumerate() {
            let Some(set) = set else { continue };
            let entry = self.descriptor_sets.get(set).ok_or_else(|| missing(*set))?;
            for (binding, range) in &entry.bindings {
                let bytes = self.buffers.get(&range.buffer).ok_or_else(|| missing(range.buffer))?;
                let start = range.offset as usize;
                let end = if range.size == 0 { bytes.len() } else { start + range.size as usize };
                let slice = bytes.get(start..end).ok_or_else(|| {
                    Error::InvalidResource(format!(
                        "binding {} of {} reaches past the end of {}",
                        binding, set, range.buffer
                    ))
                })?;
                uniforms.insert(set_index as u8, *binding, slice.to_vec());
            }
        }
        Ok(uniforms)
    }

    /// Vertex indices `[index_offset, index_offset + index_count)` of a primitive
    fn fetch_indices(&self, desc: &RenderPrimitiveDesc, call: &DrawCall) -> Result<Vec<u32>> {
        let bytes = self.buffers.get(&desc.index_buffer).ok_or_else(|| missing(desc.index_buffer))?;
        let size = desc.index_type.size_bytes() as usize;
        let first = call.index_offset as usize;
        let last = first + call.index_count as usize;
        let range = bytes.get(first * size..last * size).ok_or_else(|| {
            Error::InvalidResource(format!(
                "indices [{}, {}) exceed the {} byte index buffer",
                first,
                last,
                bytes.len()
            ))
        })?;
        Ok(match desc.index_type {
            IndexType::U16 => range
                .chunks_exact(2)
                .map(|index| bytemuck::pod_read_unaligned::<u16>(index) as u32)
                .collect(),
            IndexType::U32 => range.chunks_exact(4).map(bytemuck::pod_read_unaligned::<u32>).collect(),
        })
    }

    /// Position of vertex `index`, widened to xyzw
    fn fetch_position(desc: &RenderPrimitiveDesc, vertices: &[u8], index: u32) -> Result<Vec4> {
        let attribute = &desc.position;
        let start = attribute.offset as usize + index as usize * attribute.stride as usize;
        let end = start + attribute.element.size_bytes() as usize;
        let bytes = vertices.get(start..end).ok_or_else(|| {
            Error::InvalidResource(format!(
                "vertex {} reaches past the end of the {} byte vertex buffer",
                index,
                vertices.len()
            ))
        })?;
        let mut position = Vec4::new(0.0, 0.0, 0.0, 1.0);
        for (component, value) in bytes.chunks_exact(4).enumerate() {
            position[component] = bytemuck::pod_read_unaligned::<f32>(value);
        }
        Ok(position)
    }

    fn create_surface(&mut self, id: SurfaceId, surface: Surface) {
        match id {
            SurfaceId::Texture(texture) => {
                self.textures.insert(texture, surface);
            }
            SurfaceId::SwapChain(swap_chain) => {
                self.swap_chains.insert(swap_chain, surface);
            }
        }
    }
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self::new(SoftwareDeviceConfig::default())
    }
}

fn missing<T: ResourceKind>(handle: Handle<T>) -> Error {
    Error::InvalidHandle(format!("{} does not exist on the software device", handle))
}

fn remove<K: ResourceKind, V>(map: &mut FxHashMap<Handle<K>, V>, handle: AnyHandle) -> Result<()> {
    let typed = handle.downcast::<K>().ok_or_else(|| Error::InvalidHandle(handle.to_string()))?;
    map.remove(&typed).map(|_| ()).ok_or_else(|| missing(typed))
}

impl Device for SoftwareDevice {
    fn name(&self) -> &str {
        "SoftwareDevice"
    }

    // ===== RESOURCE CREATION =====

    fn create_buffer_object(&mut self, handle: Handle<BufferObject>, desc: &BufferObjectDesc) -> Result<()> {
        if desc.size > self.config.max_buffer_size {
            return Err(Error::InvalidResource(format!(
                "buffer object of {} bytes exceeds the device limit of {}",
                desc.size, self.config.max_buffer_size
            )));
        }
        self.buffers.insert(handle, vec![0; desc.size as usize]);
        Ok(())
    }

    fn create_texture(&mut self, handle: Handle<Texture>, desc: &TextureDesc) -> Result<()> {
        self.check_extent("texture", desc.width, desc.height)?;
        self.create_surface(SurfaceId::Texture(handle), Surface::new(desc.width, desc.height, desc.format));
        Ok(())
    }

    fn create_render_target(&mut self, handle: Handle<RenderTarget>, desc: &RenderTargetDesc) -> Result<()> {
        for (flag, info) in desc.attachments() {
            let surface = self.textures.get(&info.texture).ok_or_else(|| missing(info.texture))?;
            let wants_depth = flag.intersects(TargetBufferFlags::DEPTH_AND_STENCIL);
            if surface.is_depth() != wants_depth {
                return Err(Error::InvalidResource(format!(
                    "{} has the wrong format for attachment {:?}",
                    info.texture, flag
                )));
            }
            if surface.width() < desc.width || surface.height() < desc.height {
                return Err(Error::InvalidResource(format!(
                    "{} is smaller than the {}x{} render target",
                    info.texture, desc.width, desc.height
                )));
            }
        }
        self.render_targets.insert(handle, RenderTargetEntry::Offscreen(desc.clone()));
        Ok(())
    }

    fn create_default_render_target(&mut self, handle: Handle<RenderTarget>) -> Result<()> {
        self.render_targets.insert(handle, RenderTargetEntry::Default);
        Ok(())
    }

    fn create_swap_chain(&mut self, handle: Handle<SwapChain>, desc: &SwapChainDesc) -> Result<()> {
        self.check_extent("swap chain", desc.width, desc.height)?;
        self.create_surface(
            SurfaceId::SwapChain(handle),
            Surface::new(desc.width, desc.height, TextureFormat::Rgba8),
        );
        Ok(())
    }

    fn create_program(&mut self, handle: Handle<Program>, desc: &ProgramDesc) -> Result<()> {
        self.programs.insert(
            handle,
            ProgramEntry {
                name: desc.name.clone(),
                shading: desc.shading.clone(),
            },
        );
        Ok(())
    }

    fn create_descriptor_set_layout(
        &mut self,
        handle: Handle<DescriptorSetLayout>,
        desc: &DescriptorSetLayoutDesc,
    ) -> Result<()> {
        self.layouts.insert(handle, desc.clone());
        Ok(())
    }

    fn create_descriptor_set(
        &mut self,
        handle: Handle<DescriptorSet>,
        layout: Handle<DescriptorSetLayout>,
    ) -> Result<()> {
        if !self.layouts.contains_key(&layout) {
            return Err(missing(layout));
        }
        self.descriptor_sets.insert(
            handle,
            DescriptorSetEntry {
                layout,
                bindings: FxHashMap::default(),
            },
        );
        Ok(())
    }

    fn create_render_primitive(&mut self, handle: Handle<RenderPrimitive>, desc: &RenderPrimitiveDesc) -> Result<()> {
        for buffer in [desc.vertex_buffer, desc.index_buffer] {
            if !self.buffers.contains_key(&buffer) {
                return Err(missing(buffer));
            }
        }
        self.primitives.insert(handle, *desc);
        Ok(())
    }

    fn destroy(&mut self, handle: AnyHandle) -> Result<()> {
        match handle.kind {
            HandleKind::BufferObject => remove(&mut self.buffers, handle),
            HandleKind::Texture => remove(&mut self.textures, handle),
            HandleKind::RenderTarget => remove(&mut self.render_targets, handle),
            HandleKind::SwapChain => {
                remove(&mut self.swap_chains, handle)?;
                let destroyed = handle.downcast::<SwapChain>();
                if self.draw_swap_chain == destroyed {
                    self.draw_swap_chain = None;
                }
                if self.read_swap_chain == destroyed {
                    self.read_swap_chain = None;
                }
                Ok(())
            }
            HandleKind::Program => remove(&mut self.programs, handle),
            HandleKind::DescriptorSetLayout => remove(&mut self.layouts, handle),
            HandleKind::DescriptorSet => remove(&mut self.descriptor_sets, handle),
            HandleKind::RenderPrimitive => remove(&mut self.primitives, handle),
        }
    }

    // ===== UPDATES =====

    fn update_buffer_object(&mut self, update: &BufferUpdate) -> Result<()> {
        let storage = self.buffers.get_mut(&update.buffer).ok_or_else(|| missing(update.buffer))?;
        apply_partial_write(storage, update.byte_offset as u64, &update.data)
    }

    fn update_descriptor_set_buffer(
        &mut self,
        set: Handle<DescriptorSet>,
        binding: u8,
        range: &DescriptorBufferBinding,
    ) -> Result<()> {
        if !self.buffers.contains_key(&range.buffer) {
            return Err(missing(range.buffer));
        }
        let entry = self.descriptor_sets.get_mut(&set).ok_or_else(|| missing(set))?;
        let declared = self
            .layouts
            .get(&entry.layout)
            .is_some_and(|layout| layout.binding(binding).is_some());
        if !declared {
            return Err(Error::InvalidResource(format!(
                "binding {} is not declared by the layout of {}",
                binding, set
            )));
        }
        entry.bindings.insert(binding, *range);
        Ok(())
    }

    // ===== FRAME =====

    fn make_current(&mut self, draw: Handle<SwapChain>, read: Handle<SwapChain>) -> Result<()> {
        for swap_chain in [draw, read] {
            if !self.swap_chains.contains_key(&swap_chain) {
                return Err(missing(swap_chain));
            }
        }
        self.draw_swap_chain = Some(draw);
        self.read_swap_chain = Some(read);
        Ok(())
    }

    fn begin_frame(&mut self, frame_id: u64) -> Result<()> {
        backend_trace!(SOURCE, "Begin frame {}", frame_id);
        Ok(())
    }

    // ===== RENDER PASS =====

    fn begin_render_pass(&mut self, target: Handle<RenderTarget>, params: &RenderPassParams) -> Result<()> {
        if let Some(active) = &self.active_pass {
            return Err(Error::IllegalStateTransition(format!(
                "{} begun while {} is being rendered",
                target, active.target
            )));
        }

        let attachments = self.attachments(target, self.draw_swap_chain)?;
        let mut color = None;
        let mut depth = None;
        let (mut width, mut height) = (u32::MAX, u32::MAX);
        for (flag, id) in &attachments {
            let surface = self.surface_mut(*id)?;
            width = width.min(surface.width());
            height = height.min(surface.height());
            // Discarded contents are left as they are
            if params.flags.load_action(*flag) == LoadAction::Clear {
                surface.clear(params.clear_color, params.clear_depth);
            }
            if *flag == TargetBufferFlags::COLOR0 {
                color = Some(*id);
            } else if *flag == TargetBufferFlags::DEPTH {
                depth = Some(*id);
            }
        }
        if let Some(RenderTargetEntry::Offscreen(desc)) = self.render_targets.get(&target) {
            width = desc.width;
            height = desc.height;
        } else if attachments.is_empty() {
            width = 0;
            height = 0;
        }

        self.active_pass = Some(ActivePass {
            target,
            color,
            depth,
            width,
            height,
            viewport: params.viewport.resolve(width, height),
        });
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall, bound_sets: &BoundDescriptorSets) -> Result<()> {
        let pass = self
            .active_pass
            .as_ref()
            .ok_or_else(|| Error::IllegalStateTransition("draw outside of a render pass".to_string()))?;
        let (color_id, depth_id, width, height, viewport) =
            (pass.color, pass.depth, pass.width, pass.height, pass.viewport);

        let program = self.programs.get(&call.pipeline.program).ok_or_else(|| missing(call.pipeline.program))?;
        let shading = program.shading.clone().ok_or_else(|| {
            Error::InvalidResource(format!("program '{}' has no CPU shading stages", program.name))
        })?;
        let primitive = *self.primitives.get(&call.primitive).ok_or_else(|| missing(call.primitive))?;
        let uniforms = self.snapshot_uniforms(bound_sets)?;
        let indices = self.fetch_indices(&primitive, call)?;
        let vertices = self
            .buffers
            .get(&primitive.vertex_buffer)
            .ok_or_else(|| missing(primitive.vertex_buffer))?;

        // Vertex stage and rasterization
        let raster = call.pipeline.raster_state;
        let mut fragments: Vec<Fragment> = Vec::new();
        for instance_index in 0..call.instance_count {
            let mut clip = Vec::with_capacity(indices.len());
            for &vertex_index in &indices {
                let input = VertexInput {
                    position: Self::fetch_position(&primitive, vertices, vertex_index)?,
                    vertex_index,
                    instance_index,
                };
                clip.push(shading.vertex(&input, &uniforms));
            }
            let triangles: Vec<[Vec4; 3]> = match primitive.primitive_type {
                PrimitiveType::Triangles => clip.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect(),
                PrimitiveType::TriangleStrip => clip
                    .windows(3)
                    .enumerate()
                    .map(|(i, t)| if i % 2 == 0 { [t[0], t[1], t[2]] } else { [t[1], t[0], t[2]] })
                    .collect(),
            };
            for triangle in triangles {
                rasterize_triangle(triangle, &viewport, width, height, &raster, &mut fragments);
            }
        }

        // Depth test, in primitive order
        if let Some(depth_id) = depth_id {
            let surface = self.surface_mut(depth_id)?;
            fragments.retain(|fragment| {
                let stored = surface.depth_at(fragment.x, fragment.y).unwrap_or(1.0);
                let passed = raster.depth_func.passes(fragment.depth, stored);
                if passed && raster.depth_write {
                    surface.write_depth(fragment.x, fragment.y, fragment.depth);
                }
                passed
            });
        }

        // Fragment stage
        if let (Some(color_id), true) = (color_id, raster.color_write) {
            let colors: Vec<[u8; 4]> = fragments
                .iter()
                .map(|fragment| {
                    let input = FragmentInput { frag_coord: fragment.frag_coord() };
                    to_rgba8(shading.fragment(&input, &uniforms))
                })
                .collect();
            let surface = self.surface_mut(color_id)?;
            for (fragment, texel) in fragments.iter().zip(colors) {
                surface.write_color(fragment.x, fragment.y, texel);
            }
        }

        backend_trace!(SOURCE, "Draw {} indices: {} fragments", indices.len(), fragments.len());
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.active_pass
            .take()
            .map(|_| ())
            .ok_or_else(|| Error::IllegalStateTransition("no render pass to end".to_string()))
    }

    // ===== SYNCHRONIZATION =====

    fn read_pixels(&mut self, target: Handle<RenderTarget>, rect: PixelRect) -> Result<Vec<u8>> {
        let swap_chain = self.read_swap_chain.or(self.draw_swap_chain);
        let color = self
            .attachments(target, swap_chain)?
            .into_iter()
            .find(|(flag, _)| *flag == TargetBufferFlags::COLOR0)
            .map(|(_, id)| id)
            .ok_or_else(|| Error::InvalidResource(format!("{} has no color attachment", target)))?;
        self.surface(color)?.read_rgba8(rect)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn commit(&mut self, swap_chain: Handle<SwapChain>) -> Result<()> {
        if !self.swap_chains.contains_key(&swap_chain) {
            return Err(missing(swap_chain));
        }
        self.presented_frames += 1;
        backend_debug!(SOURCE, "Presented {} (frame {})", swap_chain, self.presented_frames);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "software_device_tests.rs"]
mod tests;
