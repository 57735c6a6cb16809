/// Render primitive descriptor
///
/// A render primitive ties a vertex buffer object and an index buffer object
/// together with the layout needed to fetch positions from them.

use crate::error::{Error, Result};
use crate::handle::{BufferObject, Handle};

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// 16-bit indices
    U16,
    /// 32-bit indices
    U32,
}

impl IndexType {
    /// Size in bytes of one index element
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Primitive assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    /// Independent triangles, three indices each
    Triangles,
    /// Each index after the second forms a triangle with the previous two
    TriangleStrip,
}

/// Component layout of the position attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Float2,
    Float3,
    Float4,
}

impl ElementType {
    pub fn component_count(&self) -> u32 {
        match self {
            ElementType::Float2 => 2,
            ElementType::Float3 => 3,
            ElementType::Float4 => 4,
        }
    }

    pub fn size_bytes(&self) -> u32 {
        self.component_count() * 4
    }
}

/// Where positions live inside the vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub element: ElementType,
    /// Offset in bytes of the first position
    pub offset: u32,
    /// Stride in bytes between consecutive positions
    pub stride: u32,
}

impl VertexAttribute {
    /// Tightly packed positions starting at byte 0
    pub fn packed(element: ElementType) -> Self {
        Self { element, offset: 0, stride: element.size_bytes() }
    }
}

/// Descriptor for creating a render primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPrimitiveDesc {
    pub vertex_buffer: Handle<BufferObject>,
    pub index_buffer: Handle<BufferObject>,
    pub index_type: IndexType,
    pub primitive_type: PrimitiveType,
    pub position: VertexAttribute,
}

impl RenderPrimitiveDesc {
    pub fn validate(&self) -> Result<()> {
        if self.position.stride < self.position.element.size_bytes() {
            return Err(Error::InvalidResource(format!(
                "position stride {} is smaller than a {:?} element",
                self.position.stride, self.position.element
            )));
        }
        Ok(())
    }
}
