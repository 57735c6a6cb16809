/// Program descriptor and the CPU shading interface
///
/// Shader compilation is outside the backend: a program arrives as opaque
/// source text plus the names of its uniform blocks. Devices that execute on
/// the CPU additionally need a `ProgramShading` implementation standing in for
/// the compiled stages.

use std::fmt;
use std::sync::Arc;
use bytemuck::Pod;
use glam::Vec4;
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::resource::MAX_DESCRIPTOR_BINDINGS;

// ============================================================================
// Shading stages
// ============================================================================

/// Per-vertex input of the vertex stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexInput {
    /// Position attribute, widened to xyzw (z = 0, w = 1 when absent)
    pub position: Vec4,
    /// Index fetched from the index buffer
    pub vertex_index: u32,
    pub instance_index: u32,
}

/// Per-fragment input of the fragment stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentInput {
    /// Window coordinates of the pixel center, depth in z, w = 1
    pub frag_coord: Vec4,
}

/// CPU implementation of a program's vertex and fragment stages
pub trait ProgramShading: Send + Sync {
    /// Clip-space position of a vertex
    fn vertex(&self, input: &VertexInput, uniforms: &UniformBlocks) -> Vec4;

    /// Color written to COLOR0
    fn fragment(&self, input: &FragmentInput, uniforms: &UniformBlocks) -> Vec4;
}

/// Uniform buffer ranges visible to a draw, keyed by (set index, binding)
///
/// Contents are captured when the draw executes, so they reflect every buffer
/// update recorded before the draw and none recorded after it.
#[derive(Debug, Clone, Default)]
pub struct UniformBlocks {
    blocks: FxHashMap<(u8, u8), Vec<u8>>,
}

impl UniformBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, set: u8, binding: u8, bytes: Vec<u8>) {
        self.blocks.insert((set, binding), bytes);
    }

    /// Raw bytes of the range bound at (set, binding)
    pub fn bytes(&self, set: u8, binding: u8) -> Option<&[u8]> {
        self.blocks.get(&(set, binding)).map(|bytes| bytes.as_slice())
    }

    /// Read a `T` at `byte_offset` inside the bound range
    pub fn read<T: Pod>(&self, set: u8, binding: u8, byte_offset: usize) -> Option<T> {
        let bytes = self.bytes(set, binding)?;
        let end = byte_offset.checked_add(std::mem::size_of::<T>())?;
        bytes.get(byte_offset..end).map(bytemuck::pod_read_unaligned)
    }

    /// Read a vec4 of f32 at `byte_offset`
    pub fn read_vec4(&self, set: u8, binding: u8, byte_offset: usize) -> Option<Vec4> {
        self.read::<[f32; 4]>(set, binding, byte_offset).map(Vec4::from_array)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

// ============================================================================
// Program descriptor
// ============================================================================

/// Descriptor for creating a program
#[derive(Clone)]
pub struct ProgramDesc {
    /// Debug name
    pub name: String,
    /// Vertex stage source, passed through untouched to native compilers
    pub vertex_source: String,
    /// Fragment stage source
    pub fragment_source: String,
    /// Uniform block names; block N is bound at binding N of the program's layout
    pub uniform_blocks: Vec<String>,
    /// CPU stages, required by the software device
    pub shading: Option<Arc<dyn ProgramShading>>,
}

impl ProgramDesc {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vertex_source: String::new(),
            fragment_source: String::new(),
            uniform_blocks: Vec::new(),
            shading: None,
        }
    }

    pub fn with_sources(mut self, vertex: &str, fragment: &str) -> Self {
        self.vertex_source = vertex.to_string();
        self.fragment_source = fragment.to_string();
        self
    }

    pub fn with_uniform_block(mut self, name: &str) -> Self {
        self.uniform_blocks.push(name.to_string());
        self
    }

    pub fn with_shading(mut self, shading: Arc<dyn ProgramShading>) -> Self {
        self.shading = Some(shading);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.uniform_blocks.len() > MAX_DESCRIPTOR_BINDINGS {
            return Err(Error::InvalidResource(format!(
                "program '{}' declares {} uniform blocks (max {})",
                self.name,
                self.uniform_blocks.len(),
                MAX_DESCRIPTOR_BINDINGS
            )));
        }
        for (index, block) in self.uniform_blocks.iter().enumerate() {
            if self.uniform_blocks[..index].contains(block) {
                return Err(Error::InvalidResource(format!(
                    "program '{}' declares uniform block '{}' twice",
                    self.name, block
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ProgramDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramDesc")
            .field("name", &self.name)
            .field("uniform_blocks", &self.uniform_blocks)
            .field("shading", &self.shading.is_some())
            .finish()
    }
}
