//! Viewport-only decoration: selection rings, rubber band, connection
//! preview, and the status hint. Drawn after the scene on screen and never
//! part of an export.

use crate::scene::{CONNECTION_COLOR, CONNECTION_WIDTH, CanvasSize, Primitive, StrokeSpec};
use ic_core::id::NodeId;
use ic_core::model::{Color, FontWeight, Node};
use kurbo::{Circle, Line, Point, Rect};

pub const SELECTION_RING: StrokeSpec = StrokeSpec::solid(Color::BLACK, 2.0);
pub const BAND_FILL: Color = Color::rgba(66, 133, 244, 26);
pub const BAND_STROKE: StrokeSpec = StrokeSpec::dashed(Color::rgb(66, 133, 244), 1.0, 4.0, 4.0);
pub const PREVIEW_STROKE: StrokeSpec = StrokeSpec::dashed(CONNECTION_COLOR, CONNECTION_WIDTH, 5.0, 5.0);
pub const CONNECT_HINT_COLOR: Color = Color::rgb(0xe8, 0x54, 0x6a);
pub const SELECTION_HINT_COLOR: Color = Color::rgb(0x4a, 0x86, 0xe8);
pub const HINT_Y: f64 = 60.0;
pub const HINT_SIZE: f64 = 14.0;

/// Transient interaction state the controller exposes for drawing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    /// Normalized rubber-band rectangle while selecting.
    pub band: Option<Rect>,
    /// Anchor-to-pointer line while drawing a connection.
    pub preview: Option<Line>,
    pub connecting: bool,
}

pub fn chrome(nodes: &[Node], selection: &[NodeId], overlay: &Overlay, canvas: CanvasSize) -> Vec<Primitive> {
    let mut out = Vec::new();

    for node in nodes.iter().filter(|n| selection.contains(&n.id)) {
        out.push(Primitive::Circle {
            circle: Circle::new((node.x, node.y), node.radius),
            fill: None,
            opacity: 1.0,
            stroke: Some(SELECTION_RING),
        });
    }

    if let Some(line) = overlay.preview {
        out.push(Primitive::Line {
            line,
            stroke: PREVIEW_STROKE,
        });
    }

    if let Some(rect) = overlay.band {
        out.push(Primitive::Rect {
            rect,
            corner: 0.0,
            fill: Some(BAND_FILL),
            stroke: Some(BAND_STROKE),
        });
    }

    let hint = if overlay.connecting {
        Some((
            "Connection Mode: Click on another node to connect, ESC to cancel".to_string(),
            CONNECT_HINT_COLOR,
        ))
    } else if selection.len() > 1 {
        Some((
            format!(
                "{} nodes selected - Press Delete to remove all selected nodes",
                selection.len()
            ),
            SELECTION_HINT_COLOR,
        ))
    } else {
        None
    };
    if let Some((text, color)) = hint {
        out.push(Primitive::Text {
            at: Point::new(canvas.width / 2.0, HINT_Y),
            text,
            size: HINT_SIZE,
            weight: FontWeight::Normal,
            color,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANVAS: CanvasSize = CanvasSize::new(800.0, 600.0);

    #[test]
    fn rings_only_for_selected_nodes() {
        let a = Node::new(NodeId::intern("chrome-a"), 10.0, 10.0, 5.0);
        let b = Node::new(NodeId::intern("chrome-b"), 50.0, 10.0, 5.0);
        let out = chrome(&[a.clone(), b], &[a.id], &Overlay::default(), CANVAS);
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Primitive::Circle { fill: None, stroke: Some(_), .. }));
    }

    #[test]
    fn multi_selection_shows_count_hint() {
        let a = Node::new(NodeId::intern("chrome-m1"), 10.0, 10.0, 5.0);
        let b = Node::new(NodeId::intern("chrome-m2"), 50.0, 10.0, 5.0);
        let out = chrome(&[a.clone(), b.clone()], &[a.id, b.id], &Overlay::default(), CANVAS);
        let Some(Primitive::Text { text, .. }) = out.last() else {
            panic!("expected hint text");
        };
        assert!(text.starts_with("2 nodes selected"));
    }

    #[test]
    fn connect_hint_wins_over_selection_hint() {
        let overlay = Overlay {
            band: None,
            preview: Some(Line::new((0.0, 0.0), (10.0, 10.0))),
            connecting: true,
        };
        let out = chrome(&[], &[], &overlay, CANVAS);
        assert!(matches!(out[0], Primitive::Line { stroke, .. } if stroke.dash == Some([5.0, 5.0])));
        assert!(matches!(&out[1], Primitive::Text { color, .. } if *color == CONNECT_HINT_COLOR));
    }
}
