/// Resources reached indirectly through other resources
///
/// A render primitive reads its vertex and index buffers, a render target its
/// attachment textures, a descriptor set its layout and every buffer bound to
/// it. A command naming the outer object uses all of them, so each must still
/// exist when the command is recorded or applied.

use rustc_hash::{FxHashMap, FxHashSet};
use crate::handle::{AnyHandle, DescriptorSet, Handle};
use super::command::Command;

/// Dependency graph fed by the command stream
#[derive(Debug, Clone, Default)]
pub struct ResourceDependencies {
    /// Fixed at creation from the descriptor
    created: FxHashMap<AnyHandle, Vec<AnyHandle>>,
    /// Buffer bound to each (set, binding)
    bindings: FxHashMap<(Handle<DescriptorSet>, u8), AnyHandle>,
}

impl ResourceDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one command, in submission order
    pub fn track(&mut self, command: &Command) {
        match command {
            Command::CreateResource { handle, desc } => {
                let dependencies = desc.dependencies();
                if !dependencies.is_empty() {
                    self.created.insert(*handle, dependencies);
                }
            }
            Command::UpdateDescriptorSetBuffer { set, binding, range } => {
                self.bindings.insert((*set, *binding), range.buffer.erase());
            }
            Command::DestroyResource { handle } => {
                self.created.remove(handle);
                if let Some(set) = handle.downcast::<DescriptorSet>() {
                    self.bindings.retain(|(bound, _), _| *bound != set);
                }
            }
            _ => {}
        }
    }

    /// Every resource reachable from `roots`, roots excluded
    pub fn resolve(&self, roots: impl IntoIterator<Item = AnyHandle>) -> Vec<AnyHandle> {
        let mut pending: Vec<AnyHandle> = roots.into_iter().collect();
        let mut seen: FxHashSet<AnyHandle> = pending.iter().copied().collect();
        let mut reached = Vec::new();

        while let Some(handle) = pending.pop() {
            let mut visit = |dependency: AnyHandle| {
                if seen.insert(dependency) {
                    reached.push(dependency);
                    pending.push(dependency);
                }
            };
            if let Some(dependencies) = self.created.get(&handle) {
                dependencies.iter().copied().for_each(&mut visit);
            }
            if let Some(set) = handle.downcast::<DescriptorSet>() {
                self.bindings
                    .iter()
                    .filter(|((bound, _), _)| *bound == set)
                    .for_each(|(_, buffer)| visit(*buffer));
            }
        }
        reached
    }

    /// Number of descriptor bindings tracked
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "dependencies_tests.rs"]
mod tests;
