//! Chart → drawing primitives.
//!
//! [`project`] is the single source of truth for what a chart looks like.
//! The on-screen renderers and the exporter all consume its output, so the
//! downloaded image always matches the canvas (minus viewport chrome).

use ic_core::model::{Chart, Color, FontWeight, Node};
use kurbo::{Circle, Line, Point, Rect};

pub const BACKGROUND: Color = Color::rgb(0xf8, 0xf9, 0xfa);
pub const BACKGROUND_CORNER: f64 = 10.0;
pub const TITLE_COLOR: Color = Color::rgb(0x33, 0x33, 0x33);
pub const TITLE_SIZE: f64 = 24.0;
pub const TITLE_Y: f64 = 30.0;
pub const CONNECTION_COLOR: Color = Color::rgb(0x66, 0x66, 0x66);
pub const CONNECTION_WIDTH: f64 = 2.0;
pub const LINE_HEIGHT: f64 = 1.2;
pub const UNTITLED_CHART: &str = "My Identity Chart";
pub const FONT_FAMILY: &str = "Arial, sans-serif";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// Outline of a shape. `dash` is `[on, off]` in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeSpec {
    pub color: Color,
    pub width: f64,
    pub dash: Option<[f64; 2]>,
}

impl StrokeSpec {
    pub const fn solid(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            dash: None,
        }
    }

    pub const fn dashed(color: Color, width: f64, on: f64, off: f64) -> Self {
        Self {
            color,
            width,
            dash: Some([on, off]),
        }
    }
}

/// One drawing command. Text is always horizontally and vertically
/// centered on `at`.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Rect {
        rect: Rect,
        corner: f64,
        fill: Option<Color>,
        stroke: Option<StrokeSpec>,
    },
    Line {
        line: Line,
        stroke: StrokeSpec,
    },
    Circle {
        circle: Circle,
        fill: Option<Color>,
        opacity: f64,
        stroke: Option<StrokeSpec>,
    },
    Text {
        at: Point,
        text: String,
        size: f64,
        weight: FontWeight,
        color: Color,
    },
    /// Square image of side `side` centered at `center`, rotated by
    /// `rotation` degrees about its center.
    Image {
        center: Point,
        side: f64,
        rotation: f64,
        href: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub size: CanvasSize,
    pub primitives: Vec<Primitive>,
}

// ─── Projection ──────────────────────────────────────────────────────────

/// Project a chart onto a canvas of the given size.
///
/// Order: background, chart title, connections, then each node (circle,
/// title, body lines, image) in node order. Connections whose endpoints no
/// longer resolve are skipped.
pub fn project(chart: &Chart, canvas: CanvasSize) -> Scene {
    let mut primitives = Vec::with_capacity(2 + chart.connections.len() + chart.nodes.len() * 4);

    primitives.push(Primitive::Rect {
        rect: canvas.rect(),
        corner: BACKGROUND_CORNER,
        fill: Some(BACKGROUND),
        stroke: None,
    });

    let title = if chart.title.is_empty() {
        UNTITLED_CHART
    } else {
        chart.title.as_str()
    };
    primitives.push(Primitive::Text {
        at: Point::new(canvas.width / 2.0, TITLE_Y),
        text: title.to_string(),
        size: TITLE_SIZE,
        weight: FontWeight::Bold,
        color: TITLE_COLOR,
    });

    for conn in &chart.connections {
        let (Some(a), Some(b)) = (chart.node(conn.source), chart.node(conn.target)) else {
            log::trace!("skipping dangling connection {} -> {}", conn.source, conn.target);
            continue;
        };
        primitives.push(Primitive::Line {
            line: Line::new((a.x, a.y), (b.x, b.y)),
            stroke: StrokeSpec::solid(CONNECTION_COLOR, CONNECTION_WIDTH),
        });
    }

    for node in &chart.nodes {
        project_node(node, &mut primitives);
    }

    Scene {
        size: canvas,
        primitives,
    }
}

fn project_node(node: &Node, out: &mut Vec<Primitive>) {
    out.push(Primitive::Circle {
        circle: Circle::new((node.x, node.y), node.radius),
        fill: Some(node_fill(node)),
        opacity: node.opacity.clamp(0.0, 1.0),
        stroke: None,
    });

    let has_title = !node.title.is_empty();
    if has_title {
        let y = if node.lines.is_empty() {
            node.y
        } else {
            node.y - node.radius / 3.0
        };
        out.push(Primitive::Text {
            at: Point::new(node.x, y),
            text: node.title.clone(),
            size: node.font_size + 2.0,
            weight: FontWeight::Bold,
            color: Color::WHITE,
        });
    }

    let lh = node.font_size * LINE_HEIGHT;
    let first = if has_title {
        node.y + node.radius / 6.0
    } else {
        node.y - (node.lines.len().saturating_sub(1) as f64) * lh / 2.0
    };
    for (i, line) in node.lines.iter().enumerate() {
        out.push(Primitive::Text {
            at: Point::new(node.x, first + i as f64 * lh),
            text: line.clone(),
            size: node.font_size,
            weight: node.font_weight,
            color: Color::WHITE,
        });
    }

    if let Some(href) = &node.image {
        let t = node.image_transform();
        out.push(Primitive::Image {
            center: Point::new(node.x + t.dx, node.y + t.dy),
            side: node.radius * t.size,
            rotation: t.rotation,
            href: href.clone(),
        });
    }
}

/// Node fill, falling back to the neutral connection gray for colors that
/// do not parse.
fn node_fill(node: &Node) -> Color {
    Color::from_hex(&node.color).unwrap_or(CONNECTION_COLOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ic_core::id::NodeId;
    use ic_core::model::Connection;
    use pretty_assertions::assert_eq;

    const CANVAS: CanvasSize = CanvasSize::new(800.0, 600.0);

    fn node(name: &str, x: f64, y: f64) -> Node {
        let mut n = Node::new(NodeId::intern(name), x, y, 60.0);
        n.color = "#4a86e8".into();
        n
    }

    fn texts(scene: &Scene) -> Vec<(String, f64)> {
        scene
            .primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Text { text, at, .. } => Some((text.clone(), at.y)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn empty_chart_has_background_and_default_title() {
        let chart = Chart::empty("c".into(), "", 0);
        let scene = project(&chart, CANVAS);
        assert_eq!(scene.primitives.len(), 2);
        assert!(matches!(
            scene.primitives[0],
            Primitive::Rect { corner, fill: Some(BACKGROUND), .. } if corner == 10.0
        ));
        assert_eq!(texts(&scene), vec![(UNTITLED_CHART.to_string(), 30.0)]);
    }

    #[test]
    fn order_is_connections_before_nodes() {
        let mut chart = Chart::empty("c".into(), "T", 0);
        let a = node("proj-a", 100.0, 100.0);
        let b = node("proj-b", 300.0, 100.0);
        chart.connections.push(Connection::new(a.id, b.id));
        chart.nodes.push(a);
        chart.nodes.push(b);
        let scene = project(&chart, CANVAS);
        assert!(matches!(scene.primitives[2], Primitive::Line { .. }));
        assert!(matches!(scene.primitives[3], Primitive::Circle { .. }));
        assert!(matches!(scene.primitives[4], Primitive::Circle { .. }));
    }

    #[test]
    fn dangling_connection_is_skipped() {
        let mut chart = Chart::empty("c".into(), "T", 0);
        let a = node("dangle-a", 100.0, 100.0);
        chart.connections.push(Connection::new(a.id, NodeId::intern("dangle-gone")));
        chart.nodes.push(a);
        let scene = project(&chart, CANVAS);
        assert!(!scene.primitives.iter().any(|p| matches!(p, Primitive::Line { .. })));
    }

    #[test]
    fn title_and_lines_layout() {
        let mut n = node("layout", 200.0, 300.0);
        n.title = "Me".into();
        n.lines = ["one".to_string(), "two".to_string()].into_iter().collect();
        let mut chart = Chart::empty("c".into(), "T", 0);
        chart.nodes.push(n);

        let t = texts(&project(&chart, CANVAS));
        assert_eq!(t[1], ("Me".to_string(), 280.0));
        assert_eq!(t[2], ("one".to_string(), 310.0));
        assert_eq!(t[3].0, "two");
        assert!((t[3].1 - (310.0 + 14.0 * 1.2)).abs() < 1e-9);
    }

    #[test]
    fn untitled_node_centers_line_block() {
        let mut n = node("block", 200.0, 300.0);
        n.lines = ["a".to_string(), "b".to_string(), "c".to_string()]
            .into_iter()
            .collect();
        let mut chart = Chart::empty("c".into(), "T", 0);
        chart.nodes.push(n);

        let t = texts(&project(&chart, CANVAS));
        let lh = 14.0 * 1.2;
        assert!((t[1].1 - (300.0 - lh)).abs() < 1e-9);
        assert!((t[2].1 - 300.0).abs() < 1e-9);
        assert!((t[3].1 - (300.0 + lh)).abs() < 1e-9);
    }

    #[test]
    fn title_only_node_is_centered() {
        let mut n = node("solo", 200.0, 300.0);
        n.title = "Solo".into();
        let mut chart = Chart::empty("c".into(), "T", 0);
        chart.nodes.push(n);
        assert_eq!(texts(&project(&chart, CANVAS))[1], ("Solo".to_string(), 300.0));
    }

    #[test]
    fn image_square_uses_transform() {
        let mut n = node("img", 200.0, 300.0);
        n.set_image("data:image/png;base64,AAAA".into());
        n.image_size = Some(0.5);
        n.image_x = Some(10.0);
        n.image_rotation = Some(45.0);
        let mut chart = Chart::empty("c".into(), "T", 0);
        chart.nodes.push(n);

        let scene = project(&chart, CANVAS);
        let Some(Primitive::Image { center, side, rotation, .. }) = scene.primitives.last() else {
            panic!("expected image primitive last");
        };
        assert_eq!(*center, Point::new(210.0, 300.0));
        assert_eq!(*side, 30.0);
        assert_eq!(*rotation, 45.0);
    }

    #[test]
    fn projection_is_deterministic() {
        let mut chart = Chart::empty("c".into(), "T", 0);
        chart.nodes.push(node("det", 1.0, 2.0));
        assert_eq!(project(&chart, CANVAS), project(&chart, CANVAS));
    }
}
