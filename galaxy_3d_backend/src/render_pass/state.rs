/// Render pass state machine and attachment actions
///
/// ```text
///        begin_render_pass            end_render_pass
/// Idle ─────────────────► Recording ─────────────────► Idle
///                            │  ▲
///                            └──┘ draw
/// ```
///
/// Every other transition is an `IllegalStateTransition` error.

use crate::error::{Error, Result};
use crate::handle::{Handle, RenderTarget};
use super::params::{RenderPassFlags, RenderPassParams, TargetBufferFlags};

// ============================================================================
// Attachment actions
// ============================================================================

/// What happens to an attachment when the pass begins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadAction {
    /// Prior contents are kept and visible to the pass
    Load,
    /// Filled with the clear value
    Clear,
    /// Prior contents are undefined
    DontCare,
}

/// What happens to an attachment when the pass ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAction {
    /// Rendered contents are kept
    Store,
    /// Rendered contents may be dropped
    DontCare,
}

impl RenderPassFlags {
    /// Load action of `attachment`: clear wins over discard, otherwise load
    pub fn load_action(&self, attachment: TargetBufferFlags) -> LoadAction {
        if self.clear.intersects(attachment) {
            LoadAction::Clear
        } else if self.discard_start.intersects(attachment) {
            LoadAction::DontCare
        } else {
            LoadAction::Load
        }
    }

    /// Store action of `attachment`
    pub fn store_action(&self, attachment: TargetBufferFlags) -> StoreAction {
        if self.discard_end.intersects(attachment) {
            StoreAction::DontCare
        } else {
            StoreAction::Store
        }
    }
}

// ============================================================================
// State machine
// ============================================================================

/// The pass currently being recorded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivePass {
    pub target: Handle<RenderTarget>,
    pub params: RenderPassParams,
    /// Draws issued so far in this pass
    pub draw_count: u32,
}

/// Render pass state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderPassState {
    Idle,
    Recording(ActivePass),
}

/// Checked Idle/Recording state
#[derive(Debug)]
pub struct RenderPassStateMachine {
    state: RenderPassState,
    completed_passes: u64,
}

impl RenderPassStateMachine {
    pub fn new() -> Self {
        Self {
            state: RenderPassState::Idle,
            completed_passes: 0,
        }
    }

    pub fn state(&self) -> &RenderPassState {
        &self.state
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, RenderPassState::Recording(_))
    }

    /// Pass being recorded, if any
    pub fn active(&self) -> Option<&ActivePass> {
        match &self.state {
            RenderPassState::Recording(pass) => Some(pass),
            RenderPassState::Idle => None,
        }
    }

    /// Number of passes that reached `end`
    pub fn completed_passes(&self) -> u64 {
        self.completed_passes
    }

    /// Idle → Recording
    pub fn begin(&mut self, target: Handle<RenderTarget>, params: RenderPassParams) -> Result<()> {
        if let RenderPassState::Recording(active) = &self.state {
            return Err(Error::IllegalStateTransition(format!(
                "begin_render_pass({}) while the pass on {} is still recording",
                target, active.target
            )));
        }
        self.state = RenderPassState::Recording(ActivePass {
            target,
            params,
            draw_count: 0,
        });
        Ok(())
    }

    /// Recording → Recording; returns the pass the draw belongs to
    pub fn draw(&mut self) -> Result<&ActivePass> {
        match &mut self.state {
            RenderPassState::Recording(active) => {
                active.draw_count += 1;
                Ok(&*active)
            }
            RenderPassState::Idle => Err(Error::IllegalStateTransition(
                "draw outside of a render pass".to_string(),
            )),
        }
    }

    /// Recording → Idle
    pub fn end(&mut self) -> Result<ActivePass> {
        match self.state {
            RenderPassState::Recording(active) => {
                self.state = RenderPassState::Idle;
                self.completed_passes += 1;
                Ok(active)
            }
            RenderPassState::Idle => Err(Error::IllegalStateTransition(
                "end_render_pass without a matching begin_render_pass".to_string(),
            )),
        }
    }

    /// Force the machine back to Idle, returning the abandoned pass
    pub fn reset(&mut self) -> Option<ActivePass> {
        match std::mem::replace(&mut self.state, RenderPassState::Idle) {
            RenderPassState::Recording(active) => Some(active),
            RenderPassState::Idle => None,
        }
    }
}

impl Default for RenderPassStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
