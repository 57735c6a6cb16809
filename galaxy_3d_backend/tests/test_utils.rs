//! Shared helpers for integration tests against the software device

#![allow(dead_code)]

use std::sync::Arc;
use galaxy_3d_backend::galaxy3d::device::{SoftwareDevice, SoftwareDeviceConfig};
use galaxy_3d_backend::galaxy3d::{
    BackendConfig, BufferObject, BufferObjectBinding, BufferUsage, DescriptorSet,
    DescriptorSetLayout, DriverApi, ElementType, FragmentInput, Handle, IndexType,
    PipelineLayout, PipelineState, PrimitiveType, Program, ProgramDesc, ProgramShading,
    RenderPrimitive, RenderPrimitiveDesc, RenderTarget, SwapChain, SwapChainDesc,
    UniformBlocks, ValidationMode, VertexAttribute, VertexInput,
};
use galaxy_3d_backend::glam::Vec4;

/// Set index the material's uniform block is bound at
pub const MATERIAL_SET: u8 = 1;

/// Size of the material uniform buffer: 64 bytes of padding, then `MaterialParams`
pub const MATERIAL_BUFFER_SIZE: u32 = 96;

/// Uniform block placed 64 bytes into the material buffer
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialParams {
    pub color: [f32; 4],
    pub offset: [f32; 4],
}

/// Positions shifted by `offset.xy`, fragments colored `color.rgb` with full alpha
pub struct MaterialShading;

impl ProgramShading for MaterialShading {
    fn vertex(&self, input: &VertexInput, uniforms: &UniformBlocks) -> Vec4 {
        let offset = uniforms.read_vec4(MATERIAL_SET, 0, 80).unwrap_or(Vec4::ZERO);
        Vec4::new(input.position.x + offset.x, input.position.y + offset.y, 0.0, 1.0)
    }

    fn fragment(&self, _input: &FragmentInput, uniforms: &UniformBlocks) -> Vec4 {
        let color = uniforms.read_vec4(MATERIAL_SET, 0, 64).unwrap_or(Vec4::ZERO);
        color.truncate().extend(1.0)
    }
}

/// Driver over a software device with a `width × height` swap chain made current
pub struct Screen {
    pub driver: DriverApi,
    pub swap_chain: Handle<SwapChain>,
    pub target: Handle<RenderTarget>,
    pub width: u32,
    pub height: u32,
}

impl Screen {
    pub fn new(width: u32, height: u32, validation: ValidationMode) -> Self {
        let device = SoftwareDevice::new(SoftwareDeviceConfig::default());
        let config = BackendConfig::default().with_validation(validation);
        let mut driver = DriverApi::new(Box::new(device), config);
        let swap_chain = driver.create_swap_chain(SwapChainDesc::new(width, height)).unwrap();
        let target = driver.create_default_render_target().unwrap();
        driver.make_current(swap_chain, swap_chain).unwrap();
        Self { driver, swap_chain, target, width, height }
    }
}

/// Compiled material program with its uniform buffer bound at `MATERIAL_SET`
pub struct Material {
    pub program: Handle<Program>,
    pub layout: Handle<DescriptorSetLayout>,
    pub set: Handle<DescriptorSet>,
    pub uniforms: Handle<BufferObject>,
}

impl Material {
    pub fn new(driver: &mut DriverApi) -> Self {
        let desc = ProgramDesc::new("material")
            .with_uniform_block("Params")
            .with_shading(Arc::new(MaterialShading));
        let (program, layout) = driver.compile_program(desc).unwrap();
        let set = driver.create_descriptor_set(layout).unwrap();
        let uniforms = driver
            .create_buffer_object(MATERIAL_BUFFER_SIZE, BufferObjectBinding::Uniform, BufferUsage::Static)
            .unwrap();
        driver.update_descriptor_set_buffer(set, 0, uniforms, 0, MATERIAL_BUFFER_SIZE).unwrap();
        driver.bind_descriptor_set(set, MATERIAL_SET).unwrap();
        Self { program, layout, set, uniforms }
    }

    pub fn pipeline(&self) -> PipelineState {
        PipelineState::new(self.program)
            .with_layout(PipelineLayout::with_set(MATERIAL_SET as usize, self.layout))
    }
}

/// One triangle with its own vertex and index buffers
pub struct Triangle {
    pub vertices: Handle<BufferObject>,
    pub indices: Handle<BufferObject>,
    pub primitive: Handle<RenderPrimitive>,
}

impl Triangle {
    pub fn new(driver: &mut DriverApi, positions: [[f32; 2]; 3]) -> Self {
        let vertices = driver
            .create_buffer_object(24, BufferObjectBinding::Vertex, BufferUsage::Dynamic)
            .unwrap();
        let indices = driver
            .create_buffer_object(6, BufferObjectBinding::Index, BufferUsage::Dynamic)
            .unwrap();
        driver.update_buffer_object(vertices, bytemuck::cast_slice(&positions), 0).unwrap();
        driver.update_buffer_object(indices, bytemuck::cast_slice(&[0u16, 1, 2]), 0).unwrap();
        let primitive = driver
            .create_render_primitive(RenderPrimitiveDesc {
                vertex_buffer: vertices,
                index_buffer: indices,
                index_type: IndexType::U16,
                primitive_type: PrimitiveType::Triangles,
                position: VertexAttribute::packed(ElementType::Float2),
            })
            .unwrap();
        Self { vertices, indices, primitive }
    }
}

/// Lower-left half of clip space
pub const LOWER_LEFT: [[f32; 2]; 3] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0]];

/// Covers the whole viewport
pub const FULLSCREEN: [[f32; 2]; 3] = [[-1.0, -1.0], [3.0, -1.0], [-1.0, 3.0]];

pub const BLUE: [u8; 4] = [0, 0, 255, 255];
pub const GREEN: [u8; 4] = [0, 255, 0, 255];
pub const WHITE: [u8; 4] = [255, 255, 255, 255];

/// RGBA8 pixel at (x, y) of a bottom-to-top read-back `width` pixels wide
pub fn pixel(pixels: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let start = ((y * width + x) * 4) as usize;
    [pixels[start], pixels[start + 1], pixels[start + 2], pixels[start + 3]]
}
