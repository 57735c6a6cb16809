//! Resource handle module
//!
//! Opaque, generation-counted handles for backend resources and the registry
//! that decides when a handle may be used.

mod handle;
mod registry;

pub use handle::*;
pub use registry::{ResourceRegistry, ResourceState};
