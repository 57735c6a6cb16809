/*!
# Galaxy 3D Backend

Deferred, command-oriented graphics backend for the Galaxy 3D engine.

Clients hold opaque handles and record commands through `DriverApi`; nothing
touches the device until the batch is executed, at which point every command is
applied strictly in submission order against a `Device` implementation.

## Architecture

- **ResourceRegistry**: generation-counted handles and their lifecycle
- **CommandRecorder**: ordered command queue, optionally validated at record time
- **CommandExecutor**: drains a batch into the device, aborting on the first failure
- **Buffer updates**: range-checked partial writes, last write wins
- **RenderPassStateMachine**: Idle / Recording transitions and attachment load/store actions
- **Device**: native API seam, with a CPU `SoftwareDevice` reference implementation
*/

// Internal modules
mod error;
pub mod log;
pub mod config;
pub mod handle;
pub mod resource;
pub mod buffer_update;
pub mod render_pass;
pub mod command;
pub mod device;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Configuration
    pub use crate::config::{BackendConfig, ValidationMode};

    // Client-facing driver
    pub use crate::command::{
        BatchReport, CommandExecutor, CommandRecorder, DriverApi, ExecutorStats, PixelReadback,
        PixelRect,
    };

    // Buffer updates
    pub use crate::buffer_update::{BufferUpdate, UniformBindingConfig};

    // Handles and resource descriptors
    pub use crate::handle::*;
    pub use crate::resource::*;

    // Render pass parameters and state
    pub use crate::render_pass::*;

    // Recorded commands
    pub mod command {
        pub use crate::command::{Command, DrawCall, ResourceDesc};
    }

    // Logging sub-module (types and global logger control, NOT macros)
    pub mod log {
        pub use crate::log::{
            reset_logger, set_logger, set_min_severity, DefaultLogger, LogEntry, LogSeverity, Logger,
        };
    }

    // Device sub-module
    pub mod device {
        pub use crate::device::software::{SoftwareDevice, SoftwareDeviceConfig};
        pub use crate::device::{BoundDescriptorSets, Device};
    }
}

// Re-export math library at crate root
pub use glam;
