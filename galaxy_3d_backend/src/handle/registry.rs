/// Resource handle registry.
///
/// Issues handles at record time and tracks, per handle, whether its creation
/// and destruction have been recorded and executed. Owns no GPU memory.
///
/// Lifecycle of an entry:
///
/// ```text
/// reserve ──► Pending ──activate──► Live ──release──► (slot freed, generation bumped)
///                │                    │
///            unreserve          mark_destroy_recorded (record time)
/// ```

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use crate::error::{Error, Result};
use super::handle::{AnyHandle, Handle, HandleKind, ResourceKey, ResourceKind};

/// Execution-side state of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Creation recorded but not yet executed
    Pending,
    /// Creation executed; the device object exists
    Live,
}

#[derive(Debug)]
struct ResourceEntry {
    kind: HandleKind,
    state: ResourceState,
    /// A DestroyResource command for this handle is queued
    destroy_recorded: bool,
    /// Byte size for buffer objects
    extent: Option<u64>,
}

/// Registry of every handle issued by one driver
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    entries: SlotMap<ResourceKey, ResourceEntry>,
    live_counts: FxHashMap<HandleKind, usize>,
}

impl ResourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new handle whose creation is about to be recorded
    ///
    /// # Arguments
    ///
    /// * `extent` - Byte size for buffer objects, used to range-check updates
    pub fn reserve<T: ResourceKind>(&mut self, extent: Option<u64>) -> Handle<T> {
        let key = self.entries.insert(ResourceEntry {
            kind: T::KIND,
            state: ResourceState::Pending,
            destroy_recorded: false,
            extent,
        });
        Handle::from_key(key)
    }

    /// Drop a reservation whose creation never executed
    ///
    /// Live handles are left untouched.
    pub(crate) fn unreserve(&mut self, handle: AnyHandle) {
        let pending = self
            .entries
            .get(handle.key)
            .is_some_and(|entry| entry.kind == handle.kind && entry.state == ResourceState::Pending);
        if pending {
            self.entries.remove(handle.key);
        }
    }

    /// Check that a command referencing `handle` may still be recorded
    ///
    /// The handle must be known, of the right kind, and not already scheduled
    /// for destruction.
    pub fn check_recordable(&self, handle: AnyHandle) -> Result<()> {
        let entry = self.entry(handle)?;
        if entry.destroy_recorded {
            return Err(Error::InvalidHandle(format!(
                "{} is used after its destruction was recorded",
                handle
            )));
        }
        Ok(())
    }

    /// Record that `handle` is scheduled for destruction
    pub fn mark_destroy_recorded(&mut self, handle: AnyHandle) -> Result<()> {
        self.check_recordable(handle)?;
        if let Some(entry) = self.entries.get_mut(handle.key) {
            entry.destroy_recorded = true;
        }
        Ok(())
    }

    /// Undo `mark_destroy_recorded` for a destruction that never executed
    pub(crate) fn clear_destroy_mark(&mut self, handle: AnyHandle) {
        if let Some(entry) = self.entries.get_mut(handle.key) {
            if entry.kind == handle.kind {
                entry.destroy_recorded = false;
            }
        }
    }

    /// Creation of `handle` executed: Pending → Live
    pub fn activate(&mut self, handle: AnyHandle) -> Result<()> {
        let entry = self.entry_mut(handle)?;
        if entry.state != ResourceState::Pending {
            return Err(Error::InvalidHandle(format!("{} was already created", handle)));
        }
        entry.state = ResourceState::Live;
        *self.live_counts.entry(handle.kind).or_insert(0) += 1;
        Ok(())
    }

    /// Check that `handle` names an existing device object
    pub fn require_live(&self, handle: AnyHandle) -> Result<()> {
        let entry = self.entry(handle)?;
        if entry.state != ResourceState::Live {
            return Err(Error::InvalidHandle(format!("{} has not been created yet", handle)));
        }
        Ok(())
    }

    /// Destruction of `handle` executed: the slot is freed and the handle is dead
    pub fn release(&mut self, handle: AnyHandle) -> Result<()> {
        self.require_live(handle)?;
        self.entries.remove(handle.key);
        if let Some(count) = self.live_counts.get_mut(&handle.kind) {
            *count -= 1;
        }
        Ok(())
    }

    /// State of `handle`, or None if it is unknown or destroyed
    pub fn state(&self, handle: impl Into<AnyHandle>) -> Option<ResourceState> {
        let handle = handle.into();
        self.entry(handle).ok().map(|entry| entry.state)
    }

    /// Byte size recorded for a buffer object
    pub fn extent(&self, handle: impl Into<AnyHandle>) -> Option<u64> {
        let handle = handle.into();
        self.entry(handle).ok().and_then(|entry| entry.extent)
    }

    /// Number of live objects of `kind`
    pub fn live_count(&self, kind: HandleKind) -> usize {
        self.live_counts.get(&kind).copied().unwrap_or(0)
    }

    /// Number of tracked handles (pending and live)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, handle: AnyHandle) -> Result<&ResourceEntry> {
        let entry = self
            .entries
            .get(handle.key)
            .ok_or_else(|| Error::InvalidHandle(format!("{} is unknown or destroyed", handle)))?;
        if entry.kind != handle.kind {
            return Err(Error::InvalidHandle(format!(
                "{} refers to a {}",
                handle, entry.kind
            )));
        }
        Ok(entry)
    }

    fn entry_mut(&mut self, handle: AnyHandle) -> Result<&mut ResourceEntry> {
        self.entry(handle)?;
        self.entries
            .get_mut(handle.key)
            .ok_or_else(|| Error::InvalidHandle(format!("{} is unknown or destroyed", handle)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
