/// Resource module - descriptors for every backend resource kind

// Module declarations
pub mod buffer;
pub mod texture;
pub mod render_target;
pub mod swap_chain;
pub mod program;
pub mod descriptor_set;
pub mod render_primitive;
pub mod pipeline;

// Re-export from modules
pub use buffer::*;
pub use texture::*;
pub use render_target::*;
pub use swap_chain::*;
pub use program::*;
pub use descriptor_set::*;
pub use render_primitive::*;
pub use pipeline::*;
