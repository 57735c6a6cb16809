/// Pipeline state passed with every draw

use crate::handle::{DescriptorSetLayout, Handle, Program};
use crate::resource::MAX_DESCRIPTOR_SET_COUNT;

// ===== RASTERIZATION ENUMS =====

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullingMode {
    /// No culling
    None,
    /// Cull front faces
    Front,
    /// Cull back faces
    Back,
    /// Cull everything
    FrontAndBack,
}

/// Depth comparison, applied as `fragment <op> stored`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthFunc {
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
    Equal,
    NotEqual,
    /// Always pass
    Always,
    /// Never pass
    Never,
}

impl DepthFunc {
    /// Whether a fragment at depth `fragment` passes against `stored`
    pub fn passes(&self, fragment: f32, stored: f32) -> bool {
        match self {
            DepthFunc::LessEqual => fragment <= stored,
            DepthFunc::GreaterEqual => fragment >= stored,
            DepthFunc::Less => fragment < stored,
            DepthFunc::Greater => fragment > stored,
            DepthFunc::Equal => fragment == stored,
            DepthFunc::NotEqual => fragment != stored,
            DepthFunc::Always => true,
            DepthFunc::Never => false,
        }
    }
}

// ===== RASTERIZATION STATE =====

/// Fixed-function rasterization state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterState {
    pub culling: CullingMode,
    pub depth_func: DepthFunc,
    /// Write fragment colors to COLOR0
    pub color_write: bool,
    /// Write fragment depth to the depth attachment
    pub depth_write: bool,
    /// Counter-clockwise triangles (in window space, y-up) are front faces
    pub front_face_ccw: bool,
}

impl Default for RasterState {
    fn default() -> Self {
        Self {
            culling: CullingMode::None,
            depth_func: DepthFunc::Always,
            color_write: true,
            depth_write: false,
            front_face_ccw: true,
        }
    }
}

// ===== PIPELINE =====

/// Descriptor set layouts expected at each set index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineLayout {
    pub set_layout: [Option<Handle<DescriptorSetLayout>>; MAX_DESCRIPTOR_SET_COUNT],
}

impl PipelineLayout {
    /// Layout using `layout` at `set_index` and nothing elsewhere
    pub fn with_set(set_index: usize, layout: Handle<DescriptorSetLayout>) -> Self {
        let mut pipeline_layout = Self::default();
        if let Some(slot) = pipeline_layout.set_layout.get_mut(set_index) {
            *slot = Some(layout);
        }
        pipeline_layout
    }
}

/// Everything a draw needs besides the geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineState {
    pub program: Handle<Program>,
    pub pipeline_layout: PipelineLayout,
    pub raster_state: RasterState,
}

impl PipelineState {
    pub fn new(program: Handle<Program>) -> Self {
        Self {
            program,
            pipeline_layout: PipelineLayout::default(),
            raster_state: RasterState::default(),
        }
    }

    pub fn with_layout(mut self, pipeline_layout: PipelineLayout) -> Self {
        self.pipeline_layout = pipeline_layout;
        self
    }

    pub fn with_raster_state(mut self, raster_state: RasterState) -> Self {
        self.raster_state = raster_state;
        self
    }
}
