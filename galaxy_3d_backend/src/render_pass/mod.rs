//! Render pass module
//!
//! Per-pass parameters (clear, discard, viewport) and the checked state
//! machine governing begin/draw/end.

mod params;
mod state;

pub use params::*;
pub use state::*;
