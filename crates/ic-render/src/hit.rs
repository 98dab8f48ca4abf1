//! Hit testing: point → node lookup, rectangle → enclosed nodes.

use ic_core::id::NodeId;
use ic_core::model::Node;
use kurbo::{Point, Rect};

/// Find the topmost node whose circle contains `point`.
/// Returns `None` if the point is on the background.
pub fn hit_test(nodes: &[Node], point: Point) -> Option<NodeId> {
    // Last drawn = topmost
    nodes
        .iter()
        .rev()
        .find(|n| n.contains(point.x, point.y))
        .map(|n| n.id)
}

/// All nodes whose circle lies fully inside `rect` (edges inclusive).
/// Used for rubber-band selection; `rect` may be given in any corner order.
pub fn nodes_in_rect(nodes: &[Node], rect: Rect) -> Vec<NodeId> {
    let r = rect.abs();
    nodes
        .iter()
        .filter(|n| {
            n.x - n.radius >= r.x0
                && n.x + n.radius <= r.x1
                && n.y - n.radius >= r.y0
                && n.y + n.radius <= r.y1
        })
        .map(|n| n.id)
        .collect()
}
