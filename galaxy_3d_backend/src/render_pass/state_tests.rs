/// Tests for the render pass state machine and attachment actions

use super::*;
use crate::handle::ResourceRegistry;
use crate::render_pass::Viewport;

fn target() -> Handle<RenderTarget> {
    let mut registry = ResourceRegistry::new();
    registry.reserve(None)
}

// ============================================================================
// Tests: Transitions
// ============================================================================

#[test]
fn test_starts_idle() {
    let machine = RenderPassStateMachine::new();
    assert!(!machine.is_recording());
    assert_eq!(machine.state(), &RenderPassState::Idle);
    assert!(machine.active().is_none());
    assert_eq!(machine.completed_passes(), 0);
}

#[test]
fn test_begin_draw_end() {
    let mut machine = RenderPassStateMachine::new();
    let rt = target();

    machine.begin(rt, RenderPassParams::cleared([1.0, 0.0, 0.0, 1.0])).unwrap();
    assert!(machine.is_recording());

    machine.draw().unwrap();
    let pass = machine.draw().unwrap();
    assert_eq!(pass.target, rt);
    assert_eq!(pass.draw_count, 2);

    let ended = machine.end().unwrap();
    assert_eq!(ended.draw_count, 2);
    assert_eq!(ended.params.clear_color, [1.0, 0.0, 0.0, 1.0]);
    assert!(!machine.is_recording());
    assert_eq!(machine.completed_passes(), 1);
}

#[test]
fn test_begin_while_recording_fails() {
    let mut machine = RenderPassStateMachine::new();
    let rt = target();
    machine.begin(rt, RenderPassParams::default()).unwrap();

    let result = machine.begin(rt, RenderPassParams::default());
    assert!(matches!(result, Err(Error::IllegalStateTransition(_))));
    // The first pass is still the one recording
    assert!(machine.is_recording());
}

#[test]
fn test_draw_while_idle_fails() {
    let mut machine = RenderPassStateMachine::new();
    assert!(matches!(machine.draw(), Err(Error::IllegalStateTransition(_))));
}

#[test]
fn test_end_while_idle_fails() {
    let mut machine = RenderPassStateMachine::new();
    assert!(matches!(machine.end(), Err(Error::IllegalStateTransition(_))));

    machine.begin(target(), RenderPassParams::default()).unwrap();
    machine.end().unwrap();
    assert!(matches!(machine.end(), Err(Error::IllegalStateTransition(_))));
    assert_eq!(machine.completed_passes(), 1);
}

#[test]
fn test_reset_abandons_pass() {
    let mut machine = RenderPassStateMachine::new();
    assert!(machine.reset().is_none());

    machine.begin(target(), RenderPassParams::default()).unwrap();
    let abandoned = machine.reset();
    assert!(abandoned.is_some());
    assert!(!machine.is_recording());
    assert_eq!(machine.completed_passes(), 0);
}

// ============================================================================
// Tests: Load/store actions
// ============================================================================

#[test]
fn test_clear_wins_over_discard() {
    let flags = RenderPassFlags {
        clear: TargetBufferFlags::COLOR,
        discard_start: TargetBufferFlags::ALL,
        discard_end: TargetBufferFlags::NONE,
    };
    assert_eq!(flags.load_action(TargetBufferFlags::COLOR0), LoadAction::Clear);
    assert_eq!(flags.load_action(TargetBufferFlags::DEPTH), LoadAction::DontCare);
    assert_eq!(flags.store_action(TargetBufferFlags::COLOR0), StoreAction::Store);
}

#[test]
fn test_no_flags_loads_and_stores() {
    let flags = RenderPassFlags::default();
    assert_eq!(flags.load_action(TargetBufferFlags::COLOR1), LoadAction::Load);
    assert_eq!(flags.store_action(TargetBufferFlags::DEPTH), StoreAction::Store);
}

#[test]
fn test_discard_end_drops_store() {
    let flags = RenderPassFlags {
        clear: TargetBufferFlags::NONE,
        discard_start: TargetBufferFlags::NONE,
        discard_end: TargetBufferFlags::DEPTH_AND_STENCIL,
    };
    assert_eq!(flags.store_action(TargetBufferFlags::DEPTH), StoreAction::DontCare);
    assert_eq!(flags.store_action(TargetBufferFlags::STENCIL), StoreAction::DontCare);
    assert_eq!(flags.store_action(TargetBufferFlags::COLOR0), StoreAction::Store);
}

#[test]
fn test_color_flag_helper() {
    assert_eq!(TargetBufferFlags::color(0), TargetBufferFlags::COLOR);
    assert_eq!(TargetBufferFlags::color(3), TargetBufferFlags::COLOR3);
    assert_eq!(TargetBufferFlags::color(4), TargetBufferFlags::NONE);
    assert!(TargetBufferFlags::ALL.contains(TargetBufferFlags::COLOR2 | TargetBufferFlags::STENCIL));
}

#[test]
fn test_viewport_resolve() {
    assert_eq!(Viewport::default().resolve(64, 32), Viewport::full(64, 32));
    let vp = Viewport::new(4, 4, 8, 8);
    assert_eq!(vp.resolve(64, 32), vp);
}
