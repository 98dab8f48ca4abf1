//! Editor configuration: canvas size, new-node template, palette.

use crate::id::NodeId;
use crate::model::{FontWeight, Node};
use serde::{Deserialize, Serialize};

/// Palette used when a node is added without a color.
pub const NODE_PALETTE: [&str; 20] = [
    "#4a86e8", "#0f9d58", "#db4437", "#f4b400", "#9e5fff", "#00acc1", "#e8546a", "#ff9800",
    "#795548", "#607d8b", "#4caf50", "#9c27b0", "#3f51b5", "#2196f3", "#009688", "#8bc34a",
    "#cddc39", "#ffeb3b", "#ffc107", "#ff5722",
];

/// Configuration for the editor.
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Canvas width in CSS pixels.
    pub canvas_width: f64,
    /// Canvas height in CSS pixels.
    pub canvas_height: f64,

    /// Where "add node" places the new node.
    pub node_x: f64,
    pub node_y: f64,
    pub node_radius: f64,
    pub node_title: String,
    pub node_lines: Vec<String>,
    pub node_font_size: f64,

    /// Offset applied to duplicated nodes on both axes.
    pub duplicate_offset: f64,

    /// Colors drawn from when a node has none.
    pub palette: Vec<String>,

    /// Key of the persisted record in browser storage.
    pub storage_key: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas_width: 800.0,
            canvas_height: 600.0,
            node_x: 400.0,
            node_y: 300.0,
            node_radius: 60.0,
            node_title: "New Node".to_string(),
            node_lines: vec!["Click to edit".to_string()],
            node_font_size: 14.0,
            duplicate_offset: 30.0,
            palette: NODE_PALETTE.iter().map(|c| c.to_string()).collect(),
            storage_key: "identity-chart-storage".to_string(),
        }
    }
}

impl EditorConfig {
    /// Parse a config from JSON, falling back to defaults for absent fields.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Build the node "add node" creates. The color is left empty so the
    /// store assigns one from the palette.
    pub fn node_template(&self, id: NodeId) -> Node {
        let mut node = Node::new(id, self.node_x, self.node_y, self.node_radius);
        node.title = self.node_title.clone();
        node.lines = self.node_lines.iter().cloned().collect();
        node.font_size = self.node_font_size;
        node.font_weight = FontWeight::Normal;
        node
    }

    /// Pick a palette color from a unit sample.
    pub fn palette_color(&self, sample: f64) -> String {
        if self.palette.is_empty() {
            return NODE_PALETTE[0].to_string();
        }
        let i = ((sample.clamp(0.0, 1.0) * self.palette.len() as f64) as usize)
            .min(self.palette.len() - 1);
        self.palette[i].clone()
    }
}
