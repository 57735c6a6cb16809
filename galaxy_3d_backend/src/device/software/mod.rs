//! Software device
//!
//! CPU reference implementation of the `Device` contract: byte-vector buffers,
//! RGBA8 and depth surfaces, and an edge-function triangle rasterizer.

mod surface;
mod rasterizer;
mod software_device;

pub use software_device::{SoftwareDevice, SoftwareDeviceConfig};
