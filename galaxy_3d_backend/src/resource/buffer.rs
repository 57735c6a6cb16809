/// Buffer object descriptor

use crate::error::{Error, Result};

/// What a buffer object is bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferObjectBinding {
    /// Vertex attributes
    Vertex,
    /// Index data
    Index,
    /// Uniform/constant block
    Uniform,
    /// Shader storage
    Storage,
}

/// Expected update frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Rarely updated; backends prefer device-local memory
    Static,
    /// Updated every few frames
    Dynamic,
    /// Updated every frame
    Stream,
}

/// Descriptor for creating a buffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferObjectDesc {
    /// Size in bytes (fixed for the buffer's lifetime)
    pub size: u32,
    /// Buffer binding
    pub binding: BufferObjectBinding,
    /// Update frequency hint
    pub usage: BufferUsage,
}

impl BufferObjectDesc {
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::InvalidResource("buffer object size must be non-zero".to_string()));
        }
        Ok(())
    }
}
