/// Swap chain descriptor
///
/// Swap chains here are headless: the backend owns the presentable image and
/// windowing integration happens outside this crate.

use crate::error::{Error, Result};

/// Descriptor for creating a headless swap chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapChainDesc {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl SwapChainDesc {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidResource(format!(
                "swap chain extent {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        Ok(())
    }
}
