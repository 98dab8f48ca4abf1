//! Integration tests: full editing sessions (ic-editor).
//!
//! Drives the controller with raw input events against a real store, the
//! way the browser bridge does, and checks the resulting chart.

use ic_core::model::*;
use ic_core::{ChartStore, EditorConfig, FixedEnv, NodeId};
use ic_editor::{CanvasController, InputEvent, Modifiers, Response, ShortcutAction};
use ic_render::scene::CanvasSize;
use pretty_assertions::assert_eq;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn session() -> (CanvasController, ChartStore<FixedEnv>) {
    init_logging();
    let config = EditorConfig::default();
    let canvas = CanvasSize::new(config.canvas_width, config.canvas_height);
    let store = ChartStore::with_env(config, FixedEnv::new(1_000));
    (CanvasController::new(canvas), store)
}

fn add(store: &mut ChartStore<FixedEnv>, name: &str, x: f64, y: f64) -> NodeId {
    let id = NodeId::intern(name);
    let mut node = store.config().node_template(id);
    node.x = x;
    node.y = y;
    store.add_node(node);
    id
}

// ─── Scenarios ──────────────────────────────────────────────────────────

#[test]
fn connect_then_delete_cascades() {
    let (mut ctl, mut store) = session();
    let a = add(&mut store, "sess-a", 400.0, 300.0);
    let b = add(&mut store, "sess-b", 200.0, 300.0);

    ctl.handle(&mut store, &InputEvent::secondary_down(400.0, 300.0));
    ctl.handle(&mut store, &InputEvent::primary_down(200.0, 300.0, Modifiers::NONE));
    assert_eq!(store.connections().len(), 1);

    store.select_node(Some(a));
    ctl.handle(&mut store, &InputEvent::key("Delete"));
    assert_eq!(store.connections().len(), 0);
    assert_eq!(store.nodes().len(), 1);
    assert_eq!(store.nodes()[0].id, b);
    assert!(store.selection().is_empty());
}

#[test]
fn group_drag_then_duplicate() {
    let (mut ctl, mut store) = session();
    let a = add(&mut store, "sess-ga", 400.0, 300.0);
    let b = add(&mut store, "sess-gb", 200.0, 300.0);

    // Rubber-band both nodes.
    ctl.handle(&mut store, &InputEvent::primary_down(100.0, 200.0, Modifiers::NONE));
    ctl.handle(&mut store, &InputEvent::pointer_move(500.0, 400.0));
    ctl.handle(&mut store, &InputEvent::pointer_up(500.0, 400.0, Modifiers::NONE));
    assert_eq!(store.selection().ids(), &[a, b]);

    ctl.handle(&mut store, &InputEvent::primary_down(400.0, 300.0, Modifiers::NONE));
    ctl.handle(&mut store, &InputEvent::pointer_move(450.0, 310.0));
    ctl.handle(&mut store, &InputEvent::pointer_up(450.0, 310.0, Modifiers::NONE));
    let b_node = store.node(b).unwrap();
    assert_eq!((b_node.x, b_node.y), (250.0, 310.0));

    let clones = store.duplicate_multiple_nodes(&[a, b]);
    assert_eq!(store.selection().ids(), clones.as_slice());
    let clone_of_b = store.node(clones[1]).unwrap();
    assert_eq!((clone_of_b.x, clone_of_b.y), (280.0, 340.0));
}

#[test]
fn every_drag_stays_in_bounds() {
    let (mut ctl, mut store) = session();
    let ids: Vec<NodeId> = (0..4)
        .map(|i| add(&mut store, &format!("sess-b{i}"), 100.0 + i as f64 * 150.0, 300.0))
        .collect();
    store.select_multiple_nodes(&ids);

    ctl.handle(&mut store, &InputEvent::primary_down(100.0, 300.0, Modifiers::NONE));
    for (x, y) in [(-500.0, -500.0), (5000.0, 300.0), (300.0, 9000.0), (0.0, 0.0)] {
        ctl.handle(&mut store, &InputEvent::pointer_move(x, y));
        for n in store.nodes() {
            assert!(n.radius <= n.x && n.x <= 800.0 - n.radius, "x out of bounds: {}", n.x);
            assert!(n.radius <= n.y && n.y <= 600.0 - n.radius, "y out of bounds: {}", n.y);
        }
    }
}

#[test]
fn new_chart_shortcut_is_forwarded_and_mid_gesture_reset_is_safe() {
    let (mut ctl, mut store) = session();
    add(&mut store, "sess-n", 400.0, 300.0);
    ctl.handle(&mut store, &InputEvent::secondary_down(400.0, 300.0));

    let ctrl = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };
    let response = ctl.handle(&mut store, &InputEvent::key_with("n", ctrl));
    assert_eq!(response, Response::Forward(ShortcutAction::NewChart));
    store.clear_current_chart();

    // The anchor is gone; the next press must not connect to anything.
    ctl.handle(&mut store, &InputEvent::primary_down(10.0, 10.0, Modifiers::NONE));
    assert!(store.connections().is_empty());
    assert!(!ctl.is_connecting());
}
