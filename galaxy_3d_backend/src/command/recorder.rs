/// Command recorder
///
/// Captures backend operations in submission order without executing them.
/// With `ValidationMode::Eager` each command is checked against the registry
/// and the render pass state before it is queued, and refused if invalid.

use std::collections::VecDeque;
use crate::buffer_update::check_update_range;
use crate::config::ValidationMode;
use crate::error::{Error, Result};
use crate::device::BoundDescriptorSets;
use crate::handle::{AnyHandle, ResourceRegistry};
use crate::render_pass::RenderPassStateMachine;
use crate::resource::MAX_DESCRIPTOR_SET_COUNT;
use crate::{backend_err, backend_trace};
use super::command::Command;
use super::dependencies::ResourceDependencies;

const SOURCE: &str = "galaxy3d::Recorder";

/// Ordered queue of recorded commands
#[derive(Debug)]
pub struct CommandRecorder {
    queue: VecDeque<Command>,
    validation: ValidationMode,
    /// Pass state as seen by recording (eager mode only)
    pass_state: RenderPassStateMachine,
    /// Descriptor sets bound as seen by recording (eager mode only)
    bound_sets: BoundDescriptorSets,
    /// Indirect uses as seen by recording (eager mode only)
    dependencies: ResourceDependencies,
}

impl CommandRecorder {
    pub fn new(validation: ValidationMode) -> Self {
        Self {
            queue: VecDeque::new(),
            validation,
            pass_state: RenderPassStateMachine::new(),
            bound_sets: BoundDescriptorSets::default(),
            dependencies: ResourceDependencies::new(),
        }
    }

    pub fn validation(&self) -> ValidationMode {
        self.validation
    }

    /// Append `command` to the queue
    ///
    /// In eager mode the command is validated first; a rejected command is
    /// logged, returned as an error and not queued. A recorded destruction
    /// marks its handle in `registry` so later uses are refused.
    pub fn record(&mut self, command: Command, registry: &mut ResourceRegistry) -> Result<()> {
        if self.validation == ValidationMode::Eager {
            if let Err(err) = self.validate(&command, registry) {
                return Err(backend_err!(SOURCE, err));
            }
            self.track(&command);
        }
        backend_trace!(SOURCE, "#{} {}", self.queue.len(), command.name());
        self.queue.push_back(command);
        Ok(())
    }

    /// Hand the queued commands over for execution, leaving the queue empty
    pub fn take_batch(&mut self) -> VecDeque<Command> {
        std::mem::take(&mut self.queue)
    }

    /// Commands waiting for the next execution
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Realign the recording view with what the executor applied
    ///
    /// Called after an aborted batch: the dropped commands never happened.
    pub(crate) fn resync(&mut self, bound_sets: &BoundDescriptorSets, dependencies: &ResourceDependencies) {
        self.pass_state.reset();
        self.bound_sets = *bound_sets;
        self.dependencies = dependencies.clone();
    }

    fn track(&mut self, command: &Command) {
        match command {
            Command::BindDescriptorSet { set, set_index } => {
                if let Some(slot) = self.bound_sets.get_mut(*set_index as usize) {
                    *slot = Some(*set);
                }
            }
            Command::DestroyResource { handle } => {
                for slot in self.bound_sets.iter_mut() {
                    if slot.is_some_and(|set| set.erase() == *handle) {
                        *slot = None;
                    }
                }
            }
            _ => {}
        }
        self.dependencies.track(command);
    }

    /// Resources reached through `roots` must not be scheduled for destruction
    fn check_reached(&self, roots: impl IntoIterator<Item = AnyHandle>, registry: &ResourceRegistry) -> Result<()> {
        for handle in self.dependencies.resolve(roots) {
            registry.check_recordable(handle)?;
        }
        Ok(())
    }

    fn validate(&mut self, command: &Command, registry: &mut ResourceRegistry) -> Result<()> {
        match command {
            Command::CreateResource { desc, .. } => {
                desc.validate()?;
                self.check_handles(command, registry)
            }
            Command::DestroyResource { handle } => {
                if self.pass_state.active().is_some_and(|pass| pass.target.erase() == *handle) {
                    return Err(Error::IllegalStateTransition(format!(
                        "{} is the target of the recording render pass",
                        handle
                    )));
                }
                registry.mark_destroy_recorded(*handle)
            }
            Command::UpdateBufferRange(update) => {
                self.check_handles(command, registry)?;
                if let Some(size) = registry.extent(update.buffer) {
                    update.check(size)?;
                }
                Ok(())
            }
            Command::UpdateDescriptorSetBuffer { range, .. } => {
                self.check_handles(command, registry)?;
                if let Some(size) = registry.extent(range.buffer) {
                    check_update_range(size, range.offset as u64, range.size as u64)?;
                }
                Ok(())
            }
            Command::BindDescriptorSet { set_index, .. } => {
                if *set_index as usize >= MAX_DESCRIPTOR_SET_COUNT {
                    return Err(Error::InvalidResource(format!(
                        "set index {} exceeds the {} descriptor set slots",
                        set_index, MAX_DESCRIPTOR_SET_COUNT
                    )));
                }
                self.check_handles(command, registry)
            }
            Command::BeginRenderPass { target, params } => {
                self.check_handles(command, registry)?;
                self.check_reached([target.erase()], registry)?;
                self.pass_state.begin(*target, *params)
            }
            Command::Draw(call) => {
                if !self.pass_state.is_recording() {
                    return Err(Error::IllegalStateTransition(
                        "draw outside of a render pass".to_string(),
                    ));
                }
                self.check_handles(command, registry)?;
                let bound = self.bound_sets.iter().flatten().map(|set| set.erase());
                self.check_reached(call.handles().into_iter().chain(bound), registry)?;
                self.pass_state.draw().map(|_| ())
            }
            Command::EndRenderPass => self.pass_state.end().map(|_| ()),
            Command::ReadPixels { .. } | Command::Present { .. } => {
                if self.pass_state.is_recording() {
                    return Err(Error::IllegalStateTransition(format!(
                        "{} inside a render pass",
                        command.name()
                    )));
                }
                self.check_handles(command, registry)?;
                self.check_reached(command.handles(), registry)
            }
            Command::MakeCurrent { .. } => self.check_handles(command, registry),
            Command::BeginFrame { .. } | Command::EndFrame { .. } | Command::Flush => Ok(()),
        }
    }

    fn check_handles(&self, command: &Command, registry: &ResourceRegistry) -> Result<()> {
        for handle in command.handles() {
            registry.check_recordable(handle)?;
        }
        if let Command::CreateResource { handle, desc } = command {
            if desc.kind() != handle.kind {
                return Err(Error::InvalidHandle(format!(
                    "{} cannot be created from a {} descriptor",
                    handle,
                    desc.kind()
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "recorder_tests.rs"]
mod tests;
