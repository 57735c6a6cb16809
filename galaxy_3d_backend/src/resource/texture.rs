/// Texture descriptor

use bitflags::bitflags;
use crate::error::{Error, Result};

/// Texture dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerType {
    Sampler2D,
    Sampler2DArray,
    Sampler3D,
    SamplerCubemap,
}

/// Pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// 8-bit RGBA, normalized
    Rgba8,
    /// 32-bit float depth
    Depth32F,
}

impl TextureFormat {
    /// Size in bytes of one texel
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8 => 4,
            TextureFormat::Depth32F => 4,
        }
    }

    pub fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::Depth32F)
    }
}

bitflags! {
    /// How a texture may be used
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u8 {
        const COLOR_ATTACHMENT   = 0x01;
        const DEPTH_ATTACHMENT   = 0x02;
        const STENCIL_ATTACHMENT = 0x04;
        const UPLOADABLE         = 0x08;
        const SAMPLEABLE         = 0x10;
    }
}

/// Descriptor for creating a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub sampler_type: SamplerType,
    /// Number of mip levels
    pub levels: u8,
    pub format: TextureFormat,
    /// Number of samples (1 = no MSAA)
    pub samples: u8,
    pub width: u32,
    pub height: u32,
    /// Depth or layer count
    pub depth: u32,
    pub usage: TextureUsage,
}

impl TextureDesc {
    /// Single-level 2D color attachment, the common render target case
    pub fn color_attachment(width: u32, height: u32) -> Self {
        Self {
            sampler_type: SamplerType::Sampler2D,
            levels: 1,
            format: TextureFormat::Rgba8,
            samples: 1,
            width,
            height,
            depth: 1,
            usage: TextureUsage::COLOR_ATTACHMENT | TextureUsage::SAMPLEABLE,
        }
    }

    /// Single-level 2D depth attachment
    pub fn depth_attachment(width: u32, height: u32) -> Self {
        Self {
            sampler_type: SamplerType::Sampler2D,
            levels: 1,
            format: TextureFormat::Depth32F,
            samples: 1,
            width,
            height,
            depth: 1,
            usage: TextureUsage::DEPTH_ATTACHMENT,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(Error::InvalidResource(format!(
                "texture extent {}x{}x{} must be non-zero",
                self.width, self.height, self.depth
            )));
        }
        if self.levels == 0 || self.samples == 0 {
            return Err(Error::InvalidResource("texture levels and samples must be at least 1".to_string()));
        }
        if self.format.is_depth() && self.usage.contains(TextureUsage::COLOR_ATTACHMENT) {
            return Err(Error::InvalidResource("depth format cannot be a color attachment".to_string()));
        }
        Ok(())
    }
}
