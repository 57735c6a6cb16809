/// Buffer update engine
///
/// Range validation and byte-exact partial writes into buffer objects.
///
/// Updates are recorded as commands and applied strictly in submission order:
/// bytes `[byte_offset, byte_offset + len)` take the new data, every other byte
/// keeps its prior value, and overlapping writes resolve last-write-wins. A draw
/// sees every update recorded before it and none recorded after it.

use crate::error::{Error, Result};
use crate::handle::{BufferObject, Handle};

// ============================================================================
// Range checks
// ============================================================================

/// Check that `length` bytes written at `byte_offset` fit inside `buffer_size`
///
/// Zero-length writes are accepted as long as the offset lies inside the buffer
/// (or at its end).
pub fn check_update_range(buffer_size: u64, byte_offset: u64, length: u64) -> Result<()> {
    match byte_offset.checked_add(length) {
        Some(end) if end <= buffer_size => Ok(()),
        _ => Err(Error::OutOfRangeUpdate {
            byte_offset,
            length,
            buffer_size,
        }),
    }
}

/// Copy `data` into `storage` at `byte_offset`, leaving the rest untouched
///
/// # Arguments
///
/// * `storage` - Full contents of the buffer
/// * `byte_offset` - First byte to overwrite
/// * `data` - New bytes
pub fn apply_partial_write(storage: &mut [u8], byte_offset: u64, data: &[u8]) -> Result<()> {
    check_update_range(storage.len() as u64, byte_offset, data.len() as u64)?;
    let start = byte_offset as usize;
    storage[start..start + data.len()].copy_from_slice(data);
    Ok(())
}

// ============================================================================
// BufferUpdate
// ============================================================================

/// One recorded write into a buffer object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferUpdate {
    pub buffer: Handle<BufferObject>,
    pub byte_offset: u32,
    /// Bytes written, copied out of the caller's slice at record time
    pub data: Vec<u8>,
}

impl BufferUpdate {
    pub fn new(buffer: Handle<BufferObject>, byte_offset: u32, data: &[u8]) -> Self {
        Self {
            buffer,
            byte_offset,
            data: data.to_vec(),
        }
    }

    /// One past the last byte written
    pub fn end(&self) -> u64 {
        self.byte_offset as u64 + self.data.len() as u64
    }

    /// Byte range written
    pub fn range(&self) -> std::ops::Range<u64> {
        self.byte_offset as u64..self.end()
    }

    /// Whether both updates write at least one common byte of the same buffer
    pub fn overlaps(&self, other: &BufferUpdate) -> bool {
        self.buffer == other.buffer
            && (self.byte_offset as u64) < other.end()
            && (other.byte_offset as u64) < self.end()
    }

    /// Range check against the buffer's size
    pub fn check(&self, buffer_size: u64) -> Result<()> {
        check_update_range(buffer_size, self.byte_offset as u64, self.data.len() as u64)
    }
}

// ============================================================================
// Uniform binding configuration
// ============================================================================

/// Placement of one uniform block inside a uniform buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformBindingConfig {
    /// Size in bytes of the uniform block
    pub data_size: u32,
    /// Size in bytes of the buffer holding it
    pub buffer_size: u32,
    /// Offset of the block inside the buffer
    pub byte_offset: u32,
}

impl UniformBindingConfig {
    /// Block of `data_size` bytes at the start of an exactly-sized buffer
    pub fn new(data_size: u32) -> Self {
        Self {
            data_size,
            buffer_size: data_size,
            byte_offset: 0,
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: u32) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_byte_offset(mut self, byte_offset: u32) -> Self {
        self.byte_offset = byte_offset;
        self
    }

    /// `byte_offset + data_size <= buffer_size`
    pub fn validate(&self) -> Result<()> {
        let end = self.byte_offset as u64 + self.data_size as u64;
        if end > self.buffer_size as u64 {
            return Err(Error::InvalidResource(format!(
                "uniform block of {} bytes at offset {} does not fit in a {} byte buffer",
                self.data_size, self.byte_offset, self.buffer_size
            )));
        }
        Ok(())
    }

    /// Byte range occupied by the block
    pub fn range(&self) -> std::ops::Range<u64> {
        self.byte_offset as u64..self.byte_offset as u64 + self.data_size as u64
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "buffer_update_tests.rs"]
mod tests;
