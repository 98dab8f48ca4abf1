//! Canvas interaction controller.
//!
//! Interprets pointer and keyboard input as one of four mutually exclusive
//! interaction modes and turns it into `ChartStore` calls:
//!
//! | Mode        | Entered by                          | Left by                         |
//! |-------------|-------------------------------------|---------------------------------|
//! | Idle        | (start), end of any gesture         | press                           |
//! | Drag        | primary press on a node             | release / pointer leave         |
//! | RubberBand  | primary press on empty canvas       | release / pointer leave         |
//! | Connect     | secondary press on a node           | next press, Escape              |
//!
//! Every committed change is a direct synchronous store call, so the store
//! is consistent after each event.

use crate::input::{InputEvent, Modifiers, PointerButton};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use ic_core::env::Env;
use ic_core::id::NodeId;
use ic_core::model::Connection;
use ic_core::store::ChartStore;
use ic_render::chrome::Overlay;
use ic_render::hit::{hit_test, nodes_in_rect};
use ic_render::scene::CanvasSize;
use kurbo::{Line, Point, Rect, Vec2};

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionMode {
    Idle,
    Drag {
        node: NodeId,
        /// Pointer position minus node center at press time.
        offset: Vec2,
        press: Point,
        moved: bool,
        /// Whether the node was already selected when pressed.
        was_selected: bool,
        modifiers: Modifiers,
    },
    RubberBand {
        start: Point,
        current: Point,
        /// Merge the result into the existing selection.
        additive: bool,
    },
    Connect {
        anchor: NodeId,
        pointer: Point,
    },
}

impl InteractionMode {
    /// The node this mode depends on, if any.
    fn referenced_node(&self) -> Option<NodeId> {
        match self {
            Self::Drag { node, .. } => Some(*node),
            Self::Connect { anchor, .. } => Some(*anchor),
            Self::Idle | Self::RubberBand { .. } => None,
        }
    }
}

/// What the host should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Unchanged,
    Redraw,
    /// A shortcut the controller does not own (save, new chart, export).
    Forward(ShortcutAction),
}

pub struct CanvasController {
    mode: InteractionMode,
    canvas: CanvasSize,
}

impl CanvasController {
    pub fn new(canvas: CanvasSize) -> Self {
        Self {
            mode: InteractionMode::Idle,
            canvas,
        }
    }

    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self.mode, InteractionMode::Connect { .. })
    }

    /// Drop any in-progress gesture.
    pub fn reset(&mut self) {
        self.mode = InteractionMode::Idle;
    }

    /// Update the drag bounds. Existing node positions are left alone.
    pub fn resize(&mut self, canvas: CanvasSize) {
        self.canvas = canvas;
    }

    /// Transient state for the chrome layer.
    pub fn overlay<E: Env>(&self, store: &ChartStore<E>) -> Overlay {
        match &self.mode {
            InteractionMode::RubberBand { start, current, .. } => Overlay {
                band: Some(Rect::from_points(*start, *current)),
                ..Overlay::default()
            },
            InteractionMode::Connect { anchor, pointer } => Overlay {
                band: None,
                preview: store
                    .node(*anchor)
                    .map(|n| Line::new((n.x, n.y), *pointer)),
                connecting: true,
            },
            InteractionMode::Idle | InteractionMode::Drag { .. } => Overlay::default(),
        }
    }

    pub fn handle<E: Env>(&mut self, store: &mut ChartStore<E>, event: &InputEvent) -> Response {
        self.revalidate(store);
        match event {
            InputEvent::PointerDown {
                x,
                y,
                button,
                modifiers,
            } => self.pointer_down(store, Point::new(*x, *y), *button, *modifiers),
            InputEvent::PointerMove { x, y, .. } => self.pointer_move(store, Point::new(*x, *y)),
            InputEvent::PointerUp { x, y, .. } => self.pointer_up(store, Some(Point::new(*x, *y)), true),
            InputEvent::PointerLeave => self.pointer_up(store, None, false),
            InputEvent::Key { key, modifiers } => self.key(store, key, *modifiers),
        }
    }

    /// Fall back to Idle if the node the current mode refers to is gone
    /// (deleted, or the chart was replaced mid-gesture).
    fn revalidate<E: Env>(&mut self, store: &ChartStore<E>) {
        if let Some(id) = self.mode.referenced_node()
            && store.node(id).is_none()
        {
            log::debug!("node {id} vanished mid-gesture; back to idle");
            self.mode = InteractionMode::Idle;
        }
    }

    // ─── Pointer ─────────────────────────────────────────────────────────

    fn pointer_down<E: Env>(
        &mut self,
        store: &mut ChartStore<E>,
        p: Point,
        button: PointerButton,
        modifiers: Modifiers,
    ) -> Response {
        let hit = hit_test(store.nodes(), p);

        if let InteractionMode::Connect { anchor, .. } = self.mode {
            if button != PointerButton::Other {
                if let Some(target) = hit
                    && target != anchor
                {
                    if let Err(e) = store.add_connection(Connection::new(anchor, target)) {
                        log::warn!("connection rejected: {e}");
                    }
                }
                self.mode = InteractionMode::Idle;
                return Response::Redraw;
            }
            return Response::Unchanged;
        }

        if !matches!(self.mode, InteractionMode::Idle) {
            return Response::Unchanged;
        }

        match (button, hit) {
            (PointerButton::Primary, Some(id)) => {
                let Some(node) = store.node(id) else {
                    return Response::Unchanged;
                };
                let offset = p - Point::new(node.x, node.y);
                let was_selected = store.is_selected(id);
                if !was_selected {
                    if modifiers.extends_selection() {
                        store.toggle_node_selection(id);
                    } else {
                        store.select_node(Some(id));
                    }
                }
                self.mode = InteractionMode::Drag {
                    node: id,
                    offset,
                    press: p,
                    moved: false,
                    was_selected,
                    modifiers,
                };
                Response::Redraw
            }
            (PointerButton::Primary, None) => {
                let additive = modifiers.extends_selection();
                if !additive {
                    store.clear_node_selection();
                }
                self.mode = InteractionMode::RubberBand {
                    start: p,
                    current: p,
                    additive,
                };
                Response::Redraw
            }
            (PointerButton::Secondary, Some(id)) => {
                store.select_node(Some(id));
                self.mode = InteractionMode::Connect {
                    anchor: id,
                    pointer: p,
                };
                Response::Redraw
            }
            _ => Response::Unchanged,
        }
    }

    fn pointer_move<E: Env>(&mut self, store: &mut ChartStore<E>, p: Point) -> Response {
        let canvas = self.canvas;
        match &mut self.mode {
            InteractionMode::Idle => Response::Unchanged,
            InteractionMode::RubberBand { current, .. } => {
                *current = p;
                Response::Redraw
            }
            InteractionMode::Connect { pointer, .. } => {
                *pointer = p;
                Response::Redraw
            }
            InteractionMode::Drag {
                node,
                offset,
                press,
                moved,
                ..
            } => {
                if p != *press {
                    *moved = true;
                }
                drag_to(store, *node, p - *offset, canvas);
                Response::Redraw
            }
        }
    }

    /// `click` is false for pointer-leave, which ends the gesture without
    /// click semantics.
    fn pointer_up<E: Env>(&mut self, store: &mut ChartStore<E>, p: Option<Point>, click: bool) -> Response {
        match std::mem::replace(&mut self.mode, InteractionMode::Idle) {
            InteractionMode::Idle => Response::Unchanged,
            mode @ InteractionMode::Connect { .. } => {
                self.mode = mode;
                Response::Unchanged
            }
            InteractionMode::RubberBand {
                start,
                current,
                additive,
            } => {
                let end = p.unwrap_or(current);
                let found = nodes_in_rect(store.nodes(), Rect::from_points(start, end));
                if additive {
                    let mut merged = store.selection().ids().to_vec();
                    merged.extend(found);
                    store.select_multiple_nodes(&merged);
                } else if !found.is_empty() {
                    store.select_multiple_nodes(&found);
                }
                Response::Redraw
            }
            InteractionMode::Drag {
                node,
                moved,
                was_selected,
                modifiers,
                ..
            } => {
                if click && !moved {
                    if modifiers.extends_selection() {
                        if was_selected {
                            store.toggle_node_selection(node);
                        }
                    } else if store.selection().len() > 1 {
                        store.select_node(Some(node));
                    }
                }
                Response::Redraw
            }
        }
    }

    // ─── Keyboard ────────────────────────────────────────────────────────

    fn key<E: Env>(&mut self, store: &mut ChartStore<E>, key: &str, m: Modifiers) -> Response {
        let Some(action) = ShortcutMap::resolve(key, m.ctrl, m.shift, m.alt, m.meta) else {
            return Response::Unchanged;
        };
        match action {
            ShortcutAction::Delete => {
                if store.selection().is_empty() {
                    return Response::Unchanged;
                }
                let ids = store.selection().ids().to_vec();
                store.remove_multiple_nodes(&ids);
                self.revalidate(store);
                Response::Redraw
            }
            ShortcutAction::Cancel => {
                if self.is_connecting() {
                    self.mode = InteractionMode::Idle;
                    Response::Redraw
                } else if !store.selection().is_empty() {
                    store.clear_node_selection();
                    Response::Redraw
                } else {
                    Response::Unchanged
                }
            }
            ShortcutAction::SelectAll => {
                store.select_all();
                Response::Redraw
            }
            other => Response::Forward(other),
        }
    }
}

// ─── Drag geometry ───────────────────────────────────────────────────────

/// Clamp one axis so a circle of radius `r` stays within `[0, extent]`.
/// When the canvas is smaller than the circle the lower bound wins.
pub fn clamp_axis(v: f64, r: f64, extent: f64) -> f64 {
    v.min(extent - r).max(r)
}

/// Move `id` toward `target` (clamped), carrying the rest of a multi-node
/// selection along by the same post-clamp delta.
fn drag_to<E: Env>(store: &mut ChartStore<E>, id: NodeId, target: Point, canvas: CanvasSize) {
    let Some(node) = store.node(id) else {
        return;
    };
    let x = clamp_axis(target.x, node.radius, canvas.width);
    let y = clamp_axis(target.y, node.radius, canvas.height);
    let (dx, dy) = (x - node.x, y - node.y);

    let selection = store.selection();
    if selection.len() > 1 && selection.contains(id) {
        let followers: Vec<(NodeId, f64, f64)> = selection
            .ids()
            .iter()
            .filter(|other| **other != id)
            .filter_map(|other| store.node(*other))
            .map(|n| {
                (
                    n.id,
                    clamp_axis(n.x + dx, n.radius, canvas.width),
                    clamp_axis(n.y + dy, n.radius, canvas.height),
                )
            })
            .collect();
        for (other, fx, fy) in followers {
            store.move_node_to(other, fx, fy);
        }
    }
    store.move_node_to(id, x, y);
}
