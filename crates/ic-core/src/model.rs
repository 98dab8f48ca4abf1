//! Core chart data model.
//!
//! A chart is a flat list of circular [`Node`]s plus undirected
//! [`Connection`]s between them. Node geometry is stored in canvas pixels
//! (center + radius). Everything here is plain data: all mutation of the
//! live chart goes through [`crate::store::ChartStore`].

use crate::id::NodeId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × u8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Helper to parse a single hex digit.
pub fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Parse a hex color string: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`.
    /// The string may optionally start with `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();

        match bytes.len() {
            3 | 4 => {
                let r = hex_val(bytes[0])? * 17;
                let g = hex_val(bytes[1])? * 17;
                let b = hex_val(bytes[2])? * 17;
                let a = match bytes.get(3) {
                    Some(&c) => hex_val(c)? * 17,
                    None => 255,
                };
                Some(Self::rgba(r, g, b, a))
            }
            6 | 8 => {
                let pair = |i: usize| -> Option<u8> {
                    Some(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?)
                };
                let a = if bytes.len() == 8 { pair(6)? } else { 255 };
                Some(Self::rgba(pair(0)?, pair(2)?, pair(4)?, a))
            }
            _ => None,
        }
    }

    /// Strict parse for user-typed color input: only `#RGB` or `#RRGGBB`.
    pub fn parse_input(value: &str) -> Option<Self> {
        let digits = value.strip_prefix('#')?;
        match digits.len() {
            3 | 6 => Self::from_hex(digits),
            _ => None,
        }
    }

    /// Emit as `#RRGGBB` (or `#RRGGBBAA` when not opaque).
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// Font weight applied to a node's body lines. Titles are always bold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    pub fn as_css(self) -> &'static str {
        match self {
            FontWeight::Normal => "normal",
            FontWeight::Bold => "bold",
        }
    }
}

/// Image scale bounds, as a fraction of the node radius.
pub const IMAGE_SIZE_MIN: f64 = 0.2;
pub const IMAGE_SIZE_MAX: f64 = 2.0;
/// Rotation applied by one rotate-step button press, in degrees.
pub const IMAGE_ROTATE_STEP: f64 = 15.0;

/// A circular chart element.
///
/// Image transform fields are explicit options: `Some(0.0)` rotation is a
/// real value, `None` means "never set" and renders with the default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    /// Hex fill color. Empty means "let the store pick one".
    #[serde(default)]
    pub color: String,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub lines: SmallVec<[String; 4]>,
    pub font_size: f64,
    #[serde(default)]
    pub font_weight: FontWeight,
    /// Data URI of the decoration image.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_rotation: Option<f64>,
}

fn default_opacity() -> f64 {
    1.0
}

impl Node {
    /// A bare node at `(x, y)`; styling fields take neutral defaults.
    pub fn new(id: NodeId, x: f64, y: f64, radius: f64) -> Self {
        Self {
            id,
            x,
            y,
            radius,
            color: String::new(),
            opacity: 1.0,
            title: String::new(),
            lines: SmallVec::new(),
            font_size: 14.0,
            font_weight: FontWeight::Normal,
            image: None,
            image_size: None,
            image_x: None,
            image_y: None,
            image_rotation: None,
        }
    }

    /// Apply a typed color value. Malformed input is dropped silently.
    pub fn set_color_input(&mut self, value: &str) -> bool {
        if Color::parse_input(value).is_none() {
            log::debug!("ignoring malformed color input {value:?}");
            return false;
        }
        self.color = value.to_string();
        true
    }

    /// Append a body line. Blank input is ignored.
    pub fn push_line(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.lines.push(text.to_string());
        true
    }

    pub fn remove_line(&mut self, index: usize) -> bool {
        if index >= self.lines.len() {
            return false;
        }
        self.lines.remove(index);
        true
    }

    pub fn edit_line(&mut self, index: usize, text: &str) -> bool {
        match self.lines.get_mut(index) {
            Some(line) => {
                *line = text.to_string();
                true
            }
            None => false,
        }
    }

    /// Attach an image and reset its transform.
    pub fn set_image(&mut self, data_uri: String) {
        self.image = Some(data_uri);
        self.image_size = Some(1.0);
        self.image_x = Some(0.0);
        self.image_y = Some(0.0);
        self.image_rotation = Some(0.0);
    }

    pub fn clear_image(&mut self) {
        self.image = None;
        self.image_size = None;
        self.image_x = None;
        self.image_y = None;
        self.image_rotation = None;
    }

    pub fn set_image_size(&mut self, size: f64) {
        self.image_size = Some(size.clamp(IMAGE_SIZE_MIN, IMAGE_SIZE_MAX));
    }

    pub fn nudge_image(&mut self, dx: f64, dy: f64) {
        self.image_x = Some(self.image_x.unwrap_or(0.0) + dx);
        self.image_y = Some(self.image_y.unwrap_or(0.0) + dy);
    }

    /// Rotate by one step. The result keeps the sign of the sum, so a
    /// counter-clockwise step from 0 yields -15.
    pub fn rotate_image_step(&mut self, clockwise: bool) {
        let step = if clockwise {
            IMAGE_ROTATE_STEP
        } else {
            -IMAGE_ROTATE_STEP
        };
        self.image_rotation = Some((self.image_rotation.unwrap_or(0.0) + step) % 360.0);
    }

    /// Effective image transform with unset fields defaulted.
    pub fn image_transform(&self) -> ImageTransform {
        ImageTransform {
            size: self.image_size.unwrap_or(1.0),
            dx: self.image_x.unwrap_or(0.0),
            dy: self.image_y.unwrap_or(0.0),
            rotation: self.image_rotation.unwrap_or(0.0),
        }
    }

    /// Whether the point lies inside (or on) the node's circle.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        let dx = px - self.x;
        let dy = py - self.y;
        dx * dx + dy * dy <= self.radius * self.radius
    }
}

/// Resolved image placement relative to the node center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageTransform {
    pub size: f64,
    pub dx: f64,
    pub dy: f64,
    pub rotation: f64,
}

// ─── Connections ─────────────────────────────────────────────────────────

/// An undirected link. `source`/`target` order is irrelevant for identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Connection {
    pub source: NodeId,
    pub target: NodeId,
}

impl Connection {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self { source, target }
    }

    /// Whether both connections join the same unordered pair.
    pub fn same_pair(&self, other: &Connection) -> bool {
        (self.source == other.source && self.target == other.target)
            || (self.source == other.target && self.target == other.source)
    }

    pub fn touches(&self, id: NodeId) -> bool {
        self.source == id || self.target == id
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.same_pair(other)
    }
}

impl Eq for Connection {}

// ─── Charts ──────────────────────────────────────────────────────────────

/// A complete diagram: metadata plus nodes and connections.
///
/// Used both for the live editing chart and for library snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub created_at: i64,
    pub last_modified: i64,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Chart {
    pub fn empty(id: String, title: &str, now_ms: i64) -> Self {
        Self {
            id,
            title: title.to_string(),
            created_at: now_ms,
            last_modified: now_ms,
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Structural deep copy for the saved-chart library.
    pub fn snapshot(&self) -> Chart {
        Chart {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            last_modified: self.last_modified,
            nodes: self.nodes.to_vec(),
            connections: self.connections.to_vec(),
        }
    }

    /// Same drawable content (title, nodes, connections), ignoring timestamps.
    pub fn same_content(&self, other: &Chart) -> bool {
        self.title == other.title
            && self.nodes == other.nodes
            && self.connections.len() == other.connections.len()
            && self
                .connections
                .iter()
                .zip(&other.connections)
                .all(|(a, b)| a.source == b.source && a.target == b.target)
    }
}

/// Which top-level view the app shows. Persisted as a tab index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ActiveView {
    #[default]
    Editor,
    Gallery,
}

impl From<u8> for ActiveView {
    fn from(tab: u8) -> Self {
        match tab {
            1 => ActiveView::Gallery,
            _ => ActiveView::Editor,
        }
    }
}

impl From<ActiveView> for u8 {
    fn from(view: ActiveView) -> u8 {
        match view {
            ActiveView::Editor => 0,
            ActiveView::Gallery => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node(id: &str) -> Node {
        Node::new(NodeId::intern(id), 100.0, 100.0, 40.0)
    }

    #[test]
    fn parse_hex_colors() {
        assert_eq!(Color::from_hex("#4a86e8"), Some(Color::rgb(0x4a, 0x86, 0xe8)));
        assert_eq!(Color::from_hex("fff"), Some(Color::WHITE));
        assert_eq!(
            Color::from_hex("#00000080"),
            Some(Color::rgba(0, 0, 0, 0x80))
        );
        assert_eq!(Color::from_hex("#12345"), None);
        assert_eq!(Color::from_hex("#zzzzzz"), None);
    }

    #[test]
    fn color_input_is_strict() {
        assert!(Color::parse_input("#abc").is_some());
        assert!(Color::parse_input("#AABBCC").is_some());
        assert!(Color::parse_input("AABBCC").is_none());
        assert!(Color::parse_input("#AABBCCDD").is_none());
        assert!(Color::parse_input("#ggg").is_none());
    }

    #[test]
    fn to_hex_roundtrip() {
        let c = Color::from_hex("#db4437").unwrap();
        assert_eq!(c.to_hex(), "#DB4437");
    }

    #[test]
    fn malformed_color_leaves_node_unchanged() {
        let mut n = node("color");
        n.color = "#4a86e8".into();
        assert!(!n.set_color_input("blue"));
        assert_eq!(n.color, "#4a86e8");
        assert!(n.set_color_input("#f00"));
        assert_eq!(n.color, "#f00");
    }

    #[test]
    fn line_editing() {
        let mut n = node("lines");
        assert!(n.push_line("  first  "));
        assert!(!n.push_line("   "));
        assert!(n.push_line("second"));
        assert!(n.edit_line(1, "2nd"));
        assert!(!n.edit_line(5, "nope"));
        assert!(n.remove_line(0));
        assert!(!n.remove_line(3));
        assert_eq!(n.lines.as_slice(), ["2nd".to_string()]);
    }

    #[test]
    fn image_transform_defaults_and_steps() {
        let mut n = node("img");
        assert_eq!(n.image_transform().size, 1.0);

        n.set_image("data:image/png;base64,AAAA".into());
        assert_eq!(n.image_rotation, Some(0.0));

        n.rotate_image_step(false);
        assert_eq!(n.image_rotation, Some(-15.0));
        for _ in 0..25 {
            n.rotate_image_step(true);
        }
        assert_eq!(n.image_rotation, Some(0.0));

        n.set_image_size(5.0);
        assert_eq!(n.image_size, Some(IMAGE_SIZE_MAX));
        n.nudge_image(5.0, -5.0);
        assert_eq!((n.image_x, n.image_y), (Some(5.0), Some(-5.0)));

        n.clear_image();
        assert_eq!(n.image, None);
        assert_eq!(n.image_rotation, None);
    }

    #[test]
    fn connection_equality_is_unordered() {
        let a = NodeId::intern("a");
        let b = NodeId::intern("b");
        assert_eq!(Connection::new(a, b), Connection::new(b, a));
        assert!(Connection::new(a, a).is_self_loop());
    }

    #[test]
    fn node_json_uses_camel_case() {
        let mut n = node("json");
        n.set_image("data:x".into());
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["fontSize"], 14.0);
        assert_eq!(json["fontWeight"], "normal");
        assert_eq!(json["imageRotation"], 0.0);
    }

    #[test]
    fn unset_image_fields_stay_unset_after_roundtrip() {
        let n = node("plain");
        let text = serde_json::to_string(&n).unwrap();
        assert!(!text.contains("imageSize"));
        let back: Node = serde_json::from_str(&text).unwrap();
        assert_eq!(back, n);
    }

    #[test]
    fn active_view_serializes_as_tab_index() {
        assert_eq!(serde_json::to_string(&ActiveView::Gallery).unwrap(), "1");
        let v: ActiveView = serde_json::from_str("7").unwrap();
        assert_eq!(v, ActiveView::Editor);
    }
}
