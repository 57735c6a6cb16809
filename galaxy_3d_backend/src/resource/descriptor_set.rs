/// Descriptor set layouts and buffer bindings
///
/// A layout lists the binding slots a program reads; a descriptor set
/// instantiates a layout and points each slot at a range of a buffer object.
/// Sets are bound at a set index before drawing.

use bitflags::bitflags;
use crate::error::{Error, Result};
use crate::handle::{BufferObject, Handle};

/// Number of set indices a pipeline layout can use
pub const MAX_DESCRIPTOR_SET_COUNT: usize = 4;

/// Number of binding slots in one descriptor set
pub const MAX_DESCRIPTOR_BINDINGS: usize = 16;

bitflags! {
    /// Shader stage visibility
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u8 {
        const VERTEX   = 0x1;
        const FRAGMENT = 0x2;
        const ALL_SHADER_STAGES = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

/// Type of resource bound at a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorType {
    UniformBuffer,
    StorageBuffer,
}

/// One slot of a descriptor set layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorSetLayoutBinding {
    /// Binding number (`layout(binding = N)`)
    pub binding: u8,
    pub descriptor_type: DescriptorType,
    pub stages: ShaderStageFlags,
}

/// Descriptor for creating a descriptor set layout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorSetLayoutDesc {
    pub bindings: Vec<DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayoutDesc {
    /// Layout with `count` uniform buffers at bindings 0..count, visible to all stages
    pub fn uniform_buffers(count: usize) -> Self {
        Self {
            bindings: (0..count)
                .map(|binding| DescriptorSetLayoutBinding {
                    binding: binding as u8,
                    descriptor_type: DescriptorType::UniformBuffer,
                    stages: ShaderStageFlags::ALL_SHADER_STAGES,
                })
                .collect(),
        }
    }

    /// Slot description for `binding`
    pub fn binding(&self, binding: u8) -> Option<&DescriptorSetLayoutBinding> {
        self.bindings.iter().find(|slot| slot.binding == binding)
    }

    pub fn validate(&self) -> Result<()> {
        for (index, slot) in self.bindings.iter().enumerate() {
            if slot.binding as usize >= MAX_DESCRIPTOR_BINDINGS {
                return Err(Error::InvalidResource(format!(
                    "binding {} exceeds the {} slots of a descriptor set",
                    slot.binding, MAX_DESCRIPTOR_BINDINGS
                )));
            }
            if self.bindings[..index].iter().any(|other| other.binding == slot.binding) {
                return Err(Error::InvalidResource(format!("binding {} declared twice", slot.binding)));
            }
        }
        Ok(())
    }
}

/// Range of a buffer object bound to a descriptor slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorBufferBinding {
    pub buffer: Handle<BufferObject>,
    /// First byte visible to the shader
    pub offset: u32,
    /// Number of bytes visible to the shader
    pub size: u32,
}
