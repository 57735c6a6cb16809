//! Command module - deferred recording and execution
//!
//! `DriverApi` records every operation as a `Command` into the
//! `CommandRecorder` queue; `execute()` hands the queue to the
//! `CommandExecutor`, which applies it to the device in submission order.

mod command;
mod dependencies;
mod recorder;
mod executor;
mod driver_api;

pub use command::*;
pub use dependencies::ResourceDependencies;
pub use recorder::CommandRecorder;
pub use executor::{BatchReport, CommandExecutor, ExecutorStats};
pub use driver_api::DriverApi;
