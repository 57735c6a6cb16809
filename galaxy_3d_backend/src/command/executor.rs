/// Command executor
///
/// Drains a recorded batch against a `Device`, one command at a time and in
/// submission order. Every command is validated against the registry and the
/// render pass state right before it is applied; the first failure aborts the
/// rest of the batch.
///
/// On abort the registry is rolled back to what the device actually executed:
/// reservations of unexecuted creations are dropped and destruction marks of
/// unexecuted destructions are cleared. A pass left open is closed.
///
/// Draws, render passes and read-backs also require every resource reached
/// through their operands (primitive buffers, attachment textures, buffers
/// bound to the bound descriptor sets) to be live.

use std::collections::VecDeque;
use rustc_hash::FxHashMap;
use crate::buffer_update::check_update_range;
use crate::device::{BoundDescriptorSets, Device};
use crate::error::{Error, Result};
use crate::handle::{
    AnyHandle, DescriptorSet, DescriptorSetLayout, Handle, ResourceRegistry, ResourceState,
};
use crate::render_pass::RenderPassStateMachine;
use crate::resource::MAX_DESCRIPTOR_SET_COUNT;
use crate::{backend_debug, backend_error, backend_trace, backend_warn};
use super::command::{Command, DrawCall, ResourceDesc};
use super::dependencies::ResourceDependencies;

const SOURCE: &str = "galaxy3d::Executor";

/// Outcome of one executed batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Commands applied
    pub executed: usize,
    pub draws: usize,
    /// Render passes ended
    pub render_passes: usize,
    pub flushes: usize,
    pub presents: usize,
}

/// Cumulative executor statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    pub batches: u64,
    pub aborted_batches: u64,
    pub commands: u64,
    pub draws: u64,
}

/// Single consumer of recorded batches
#[derive(Debug, Default)]
pub struct CommandExecutor {
    pass_state: RenderPassStateMachine,
    bound_sets: BoundDescriptorSets,
    /// Layout each live descriptor set was created from
    set_layouts: FxHashMap<Handle<DescriptorSet>, Handle<DescriptorSetLayout>>,
    /// Indirect uses, as of the last applied command
    dependencies: ResourceDependencies,
    stats: ExecutorStats,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render pass state as of the last applied command
    pub fn pass_state(&self) -> &RenderPassStateMachine {
        &self.pass_state
    }

    /// Descriptor sets currently bound
    pub fn bound_sets(&self) -> &BoundDescriptorSets {
        &self.bound_sets
    }

    /// Dependency graph as of the last applied command
    pub fn dependencies(&self) -> &ResourceDependencies {
        &self.dependencies
    }

    pub fn stats(&self) -> ExecutorStats {
        self.stats
    }

    /// Apply every command of `batch` in order
    ///
    /// # Arguments
    ///
    /// * `batch` - Commands taken from the recorder; consumed entirely
    /// * `registry` - Handle registry shared with the recorder
    /// * `device` - Device receiving the commands
    ///
    /// # Errors
    ///
    /// The error of the first command that could not be applied. Device errors
    /// are wrapped as `SubmissionFailure`; the remaining commands are dropped.
    pub fn execute(
        &mut self,
        mut batch: VecDeque<Command>,
        registry: &mut ResourceRegistry,
        device: &mut dyn Device,
    ) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        self.stats.batches += 1;

        while let Some(command) = batch.pop_front() {
            backend_trace!(SOURCE, "#{} {}", report.executed, command.name());
            if let Err(err) = self.apply(&command, registry, device, &mut report) {
                backend_error!(
                    SOURCE,
                    "Batch aborted at command #{} ({}), {} commands dropped: {}",
                    report.executed,
                    command.name(),
                    batch.len(),
                    err
                );
                self.abort(std::iter::once(&command).chain(batch.iter()), registry, device);
                self.stats.aborted_batches += 1;
                self.stats.commands += report.executed as u64;
                self.stats.draws += report.draws as u64;
                return Err(err);
            }
            self.dependencies.track(&command);
            report.executed += 1;
        }

        self.stats.commands += report.executed as u64;
        self.stats.draws += report.draws as u64;
        backend_debug!(
            SOURCE,
            "Executed {} commands ({} draws, {} passes) on {}",
            report.executed,
            report.draws,
            report.render_passes,
            device.name()
        );
        Ok(report)
    }

    fn apply(
        &mut self,
        command: &Command,
        registry: &mut ResourceRegistry,
        device: &mut dyn Device,
        report: &mut BatchReport,
    ) -> Result<()> {
        let name = command.name();
        let submit = |err: Error| Error::submission(name, err);

        match command {
            Command::CreateResource { handle, desc } => {
                require_pending(registry, *handle)?;
                if desc.kind() != handle.kind {
                    return Err(Error::InvalidHandle(format!(
                        "{} cannot be created from a {} descriptor",
                        handle,
                        desc.kind()
                    )));
                }
                desc.validate()?;
                require_live_all(registry, &desc.dependencies())?;
                self.create(*handle, desc, device).map_err(submit)?;
                registry.activate(*handle)?;
            }
            Command::DestroyResource { handle } => {
                registry.require_live(*handle)?;
                if self.pass_state.active().is_some_and(|pass| pass.target.erase() == *handle) {
                    return Err(Error::IllegalStateTransition(format!(
                        "{} is the target of the recording render pass",
                        handle
                    )));
                }
                device.destroy(*handle).map_err(submit)?;
                registry.release(*handle)?;
                if let Some(set) = handle.downcast::<DescriptorSet>() {
                    self.set_layouts.remove(&set);
                    for slot in self.bound_sets.iter_mut() {
                        if *slot == Some(set) {
                            *slot = None;
                        }
                    }
                }
            }
            Command::UpdateBufferRange(update) => {
                registry.require_live(update.buffer.erase())?;
                if let Some(size) = registry.extent(update.buffer) {
                    update.check(size)?;
                }
                device.update_buffer_object(update).map_err(submit)?;
            }
            Command::UpdateDescriptorSetBuffer { set, binding, range } => {
                require_live_all(registry, &command.handles())?;
                if let Some(size) = registry.extent(range.buffer) {
                    check_update_range(size, range.offset as u64, range.size as u64)?;
                }
                device.update_descriptor_set_buffer(*set, *binding, range).map_err(submit)?;
            }
            Command::BindDescriptorSet { set, set_index } => {
                let slot = self.bound_sets.get_mut(*set_index as usize).ok_or_else(|| {
                    Error::InvalidResource(format!(
                        "set index {} exceeds the {} descriptor set slots",
                        set_index, MAX_DESCRIPTOR_SET_COUNT
                    ))
                })?;
                registry.require_live(set.erase())?;
                *slot = Some(*set);
            }
            Command::MakeCurrent { draw, read } => {
                require_live_all(registry, &command.handles())?;
                device.make_current(*draw, *read).map_err(submit)?;
            }
            Command::BeginFrame { frame_id } => device.begin_frame(*frame_id).map_err(submit)?,
            Command::EndFrame { frame_id } => device.end_frame(*frame_id).map_err(submit)?,
            Command::BeginRenderPass { target, params } => {
                registry.require_live(target.erase())?;
                require_live_all(registry, &self.dependencies.resolve([target.erase()]))?;
                self.pass_state.begin(*target, *params)?;
                if let Err(err) = device.begin_render_pass(*target, params) {
                    self.pass_state.reset();
                    return Err(submit(err));
                }
            }
            Command::Draw(call) => {
                if !self.pass_state.is_recording() {
                    return Err(Error::IllegalStateTransition(
                        "draw outside of a render pass".to_string(),
                    ));
                }
                require_live_all(registry, &call.handles())?;
                self.check_bound_layouts(call, registry)?;
                let bound = self.bound_sets.iter().flatten().map(|set| set.erase());
                let reached = self.dependencies.resolve(call.handles().into_iter().chain(bound));
                require_live_all(registry, &reached)?;
                self.pass_state.draw()?;
                device.draw(call, &self.bound_sets).map_err(submit)?;
                report.draws += 1;
            }
            Command::EndRenderPass => {
                self.pass_state.end()?;
                device.end_render_pass().map_err(submit)?;
                report.render_passes += 1;
            }
            Command::ReadPixels { target, rect, destination } => {
                self.require_outside_pass(name)?;
                registry.require_live(target.erase())?;
                require_live_all(registry, &self.dependencies.resolve([target.erase()]))?;
                let pixels = device.read_pixels(*target, *rect).map_err(submit)?;
                destination.fulfill(pixels);
            }
            Command::Flush => {
                device.flush().map_err(submit)?;
                report.flushes += 1;
            }
            Command::Present { swap_chain } => {
                self.require_outside_pass(name)?;
                registry.require_live(swap_chain.erase())?;
                device.commit(*swap_chain).map_err(submit)?;
                report.presents += 1;
            }
        }
        Ok(())
    }

    fn create(&mut self, handle: AnyHandle, desc: &ResourceDesc, device: &mut dyn Device) -> Result<()> {
        let mismatch = || Error::InvalidHandle(format!("{} does not match its descriptor", handle));
        match desc {
            ResourceDesc::BufferObject(desc) => {
                device.create_buffer_object(handle.downcast().ok_or_else(mismatch)?, desc)
            }
            ResourceDesc::Texture(desc) => device.create_texture(handle.downcast().ok_or_else(mismatch)?, desc),
            ResourceDesc::RenderTarget(desc) => {
                device.create_render_target(handle.downcast().ok_or_else(mismatch)?, desc)
            }
            ResourceDesc::DefaultRenderTarget => {
                device.create_default_render_target(handle.downcast().ok_or_else(mismatch)?)
            }
            ResourceDesc::SwapChain(desc) => {
                device.create_swap_chain(handle.downcast().ok_or_else(mismatch)?, desc)
            }
            ResourceDesc::Program(desc) => device.create_program(handle.downcast().ok_or_else(mismatch)?, desc),
            ResourceDesc::DescriptorSetLayout(desc) => {
                device.create_descriptor_set_layout(handle.downcast().ok_or_else(mismatch)?, desc)
            }
            ResourceDesc::DescriptorSet { layout } => {
                let set: Handle<DescriptorSet> = handle.downcast().ok_or_else(mismatch)?;
                device.create_descriptor_set(set, *layout)?;
                self.set_layouts.insert(set, *layout);
                Ok(())
            }
            ResourceDesc::RenderPrimitive(desc) => {
                device.create_render_primitive(handle.downcast().ok_or_else(mismatch)?, desc)
            }
        }
    }

    /// Every layout the pipeline declares must have a set of that layout bound
    fn check_bound_layouts(&self, call: &DrawCall, registry: &ResourceRegistry) -> Result<()> {
        let layouts = call.pipeline.pipeline_layout.set_layout.iter().enumerate();
        for (set_index, expected) in layouts {
            let Some(expected) = expected else { continue };
            let Some(bound) = self.bound_sets[set_index] else {
                return Err(Error::IllegalStateTransition(format!(
                    "draw expects a descriptor set of {} at set {}, none is bound",
                    expected, set_index
                )));
            };
            registry.require_live(bound.erase())?;
            if self.set_layouts.get(&bound) != Some(expected) {
                return Err(Error::IllegalStateTransition(format!(
                    "draw expects a descriptor set of {} at set {}, {} is bound",
                    expected, set_index, bound
                )));
            }
        }
        Ok(())
    }

    fn require_outside_pass(&self, operation: &str) -> Result<()> {
        if self.pass_state.is_recording() {
            return Err(Error::IllegalStateTransition(format!(
                "{} inside a render pass",
                operation
            )));
        }
        Ok(())
    }

    /// Roll back the registry for `unexecuted` commands and close an open pass
    fn abort<'a>(
        &mut self,
        unexecuted: impl Iterator<Item = &'a Command>,
        registry: &mut ResourceRegistry,
        device: &mut dyn Device,
    ) {
        for command in unexecuted {
            match command {
                Command::CreateResource { handle, .. } => registry.unreserve(*handle),
                Command::DestroyResource { handle } => registry.clear_destroy_mark(*handle),
                _ => {}
            }
        }
        if let Some(pass) = self.pass_state.reset() {
            if let Err(err) = device.end_render_pass() {
                backend_warn!(
                    SOURCE,
                    "Closing the render pass on {} after abort failed: {}",
                    pass.target,
                    err
                );
            }
        }
    }
}

fn require_pending(registry: &ResourceRegistry, handle: AnyHandle) -> Result<()> {
    match registry.state(handle) {
        Some(ResourceState::Pending) => Ok(()),
        Some(ResourceState::Live) => Err(Error::InvalidHandle(format!("{} was already created", handle))),
        None => Err(Error::InvalidHandle(format!("{} is unknown or destroyed", handle))),
    }
}

fn require_live_all(registry: &ResourceRegistry, handles: &[AnyHandle]) -> Result<()> {
    for handle in handles {
        registry.require_live(*handle)?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
