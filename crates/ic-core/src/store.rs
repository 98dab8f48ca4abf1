//! The chart store: single owner of the live chart, the selection, the
//! active view, and the saved-chart library.
//!
//! Every change goes through a named operation on [`ChartStore`]. Callers
//! (the canvas controller, the browser bridge) hold the store by `&mut`
//! and never write fields directly, so each operation can keep the
//! invariants below:
//!
//! - node ids are unique within the current chart;
//! - every connection joins a distinct unordered pair, and removing a node
//!   removes every connection touching it;
//! - every selected id names an existing node;
//! - `last_modified` advances on every change to the chart itself.
//!
//! Lookups by id are permissive: an unknown id is a no-op, never an error.
//! [`ChartStore::add_connection`] is the only operation that reports a
//! rejection.

use crate::config::EditorConfig;
use crate::env::{Env, SystemEnv};
use crate::id::{NodeId, base36};
use crate::model::{ActiveView, Chart, Connection, Node};
use crate::persist::PersistedState;
use smallvec::SmallVec;
use thiserror::Error;

pub const DEFAULT_CHART_TITLE: &str = "My Identity Chart";
pub const NEW_CHART_TITLE: &str = "New Identity Chart";

/// Why `add_connection` refused a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("{0} and {1} are already connected")]
    Duplicate(NodeId, NodeId),
    #[error("{0} cannot be connected to itself")]
    SelfLoop(NodeId),
}

// ─── Selection ───────────────────────────────────────────────────────────

/// Ordered set of selected node ids.
///
/// The *primary* node (the one the single-node editor panel shows) is
/// defined exactly when one node is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: SmallVec<[NodeId; 4]>,
}

impl Selection {
    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.ids.contains(&id)
    }

    pub fn primary(&self) -> Option<NodeId> {
        match self.ids.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    fn insert(&mut self, id: NodeId) {
        if !self.contains(id) {
            self.ids.push(id);
        }
    }

    fn remove(&mut self, id: NodeId) {
        self.ids.retain(|s| *s != id);
    }

    fn clear(&mut self) {
        self.ids.clear();
    }
}

// ─── Store ───────────────────────────────────────────────────────────────

pub struct ChartStore<E: Env = SystemEnv> {
    env: E,
    config: EditorConfig,
    current: Chart,
    selection: Selection,
    saved: Vec<Chart>,
    view: ActiveView,
}

impl ChartStore<SystemEnv> {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_env(config, SystemEnv::default())
    }
}

impl<E: Env> ChartStore<E> {
    /// A store holding a fresh, unsaved chart.
    pub fn with_env(config: EditorConfig, env: E) -> Self {
        let now = env.now_ms();
        let suffix = base36((env.random_unit() * 36f64.powi(5)) as u64);
        let current = Chart::empty(format!("my-chart-{now}-{suffix}"), DEFAULT_CHART_TITLE, now);
        Self {
            env,
            config,
            current,
            selection: Selection::default(),
            saved: Vec::new(),
            view: ActiveView::Editor,
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn chart(&self) -> &Chart {
        &self.current
    }

    pub fn nodes(&self) -> &[Node] {
        &self.current.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.current.node(id)
    }

    pub fn connections(&self) -> &[Connection] {
        &self.current.connections
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn primary_selection(&self) -> Option<NodeId> {
        self.selection.primary()
    }

    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selection.contains(id)
    }

    pub fn saved_charts(&self) -> &[Chart] {
        &self.saved
    }

    pub fn saved_chart(&self, id: &str) -> Option<&Chart> {
        self.saved.iter().find(|c| c.id == id)
    }

    pub fn active_view(&self) -> ActiveView {
        self.view
    }

    /// Mint a fresh node id from the store's environment.
    pub fn generate_node_id(&self) -> NodeId {
        NodeId::generate(self.env.now_ms(), self.env.random_unit())
    }

    /// True when the current chart has no identical library entry.
    pub fn has_unsaved_changes(&self) -> bool {
        match self.saved_chart(&self.current.id) {
            Some(saved) => !saved.same_content(&self.current),
            None => true,
        }
    }

    fn touch(&mut self) {
        self.current.last_modified = self.env.now_ms();
    }

    // ─── Node operations ─────────────────────────────────────────────────

    /// Append a node and make it the only selected node.
    ///
    /// An empty color is replaced with a random palette color. Nodes with a
    /// duplicate id or a non-positive radius/font size are refused.
    pub fn add_node(&mut self, mut node: Node) -> bool {
        if self.node(node.id).is_some() {
            log::warn!("add_node: id {} already exists", node.id);
            return false;
        }
        if !is_well_formed(&node) {
            log::warn!("add_node: refusing malformed node {}", node.id);
            return false;
        }
        if node.color.is_empty() {
            node.color = self.config.palette_color(self.env.random_unit());
        }
        let id = node.id;
        log::debug!("add node {id} at ({}, {})", node.x, node.y);
        self.current.nodes.push(node);
        self.selection.clear();
        self.selection.insert(id);
        self.touch();
        true
    }

    /// Replace the stored node with the same id, wholesale.
    pub fn update_node(&mut self, node: Node) -> bool {
        if !is_well_formed(&node) {
            log::warn!("update_node: refusing malformed node {}", node.id);
            return false;
        }
        let Some(slot) = self.current.nodes.iter_mut().find(|n| n.id == node.id) else {
            return false;
        };
        *slot = node;
        self.touch();
        true
    }

    /// Set a node's center. Used by drag, which would otherwise clone the
    /// whole node (image data included) on every pointer move.
    pub fn move_node_to(&mut self, id: NodeId, x: f64, y: f64) -> bool {
        let Some(node) = self.current.nodes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        node.x = x;
        node.y = y;
        self.touch();
        true
    }

    pub fn remove_node(&mut self, id: NodeId) -> bool {
        self.remove_multiple_nodes(&[id]) > 0
    }

    /// Remove nodes, every connection touching them, and their selection
    /// entries. Returns how many nodes were removed.
    pub fn remove_multiple_nodes(&mut self, ids: &[NodeId]) -> usize {
        let before = self.current.nodes.len();
        self.current.nodes.retain(|n| !ids.contains(&n.id));
        let removed = before - self.current.nodes.len();
        if removed == 0 {
            return 0;
        }
        self.current
            .connections
            .retain(|c| !ids.contains(&c.source) && !ids.contains(&c.target));
        for id in ids {
            self.selection.remove(*id);
        }
        log::debug!("removed {removed} node(s)");
        self.touch();
        removed
    }

    /// Clone a node with a fresh id, offset on both axes, and select the
    /// clone alone.
    pub fn duplicate_node(&mut self, id: NodeId) -> Option<NodeId> {
        self.duplicate_multiple_nodes(&[id]).into_iter().next()
    }

    /// Clone every listed node (in chart order) and select exactly the
    /// clones. Unknown ids are skipped.
    pub fn duplicate_multiple_nodes(&mut self, ids: &[NodeId]) -> Vec<NodeId> {
        let offset = self.config.duplicate_offset;
        let originals: Vec<Node> = self
            .current
            .nodes
            .iter()
            .filter(|n| ids.contains(&n.id))
            .cloned()
            .collect();
        if originals.is_empty() {
            return Vec::new();
        }

        let mut new_ids = Vec::with_capacity(originals.len());
        for mut clone in originals {
            clone.id = self.generate_node_id();
            clone.x += offset;
            clone.y += offset;
            new_ids.push(clone.id);
            self.current.nodes.push(clone);
        }

        self.selection.clear();
        for id in &new_ids {
            self.selection.insert(*id);
        }
        self.touch();
        new_ids
    }

    // ─── Selection operations ────────────────────────────────────────────

    /// Select exactly one node, or clear the selection with `None`.
    pub fn select_node(&mut self, id: Option<NodeId>) {
        match id {
            None => self.selection.clear(),
            Some(id) if self.node(id).is_some() => {
                self.selection.clear();
                self.selection.insert(id);
            }
            Some(id) => log::debug!("select_node: unknown id {id}"),
        }
    }

    /// Replace the selection. Unknown and repeated ids are dropped.
    pub fn select_multiple_nodes(&mut self, ids: &[NodeId]) {
        self.selection.clear();
        for id in ids {
            if self.current.node(*id).is_some() {
                self.selection.insert(*id);
            }
        }
    }

    pub fn toggle_node_selection(&mut self, id: NodeId) {
        if self.selection.contains(id) {
            self.selection.remove(id);
        } else if self.node(id).is_some() {
            self.selection.insert(id);
        }
    }

    pub fn clear_node_selection(&mut self) {
        self.selection.clear();
    }

    pub fn select_all(&mut self) {
        let ids: Vec<NodeId> = self.current.nodes.iter().map(|n| n.id).collect();
        self.select_multiple_nodes(&ids);
    }

    // ─── Connection operations ───────────────────────────────────────────

    /// Add an undirected connection.
    ///
    /// # Errors
    /// [`ConnectError::Duplicate`] if the unordered pair is already
    /// connected, [`ConnectError::SelfLoop`] if both ends are the same node.
    pub fn add_connection(&mut self, connection: Connection) -> Result<(), ConnectError> {
        if connection.is_self_loop() {
            return Err(ConnectError::SelfLoop(connection.source));
        }
        if self.current.connections.iter().any(|c| c.same_pair(&connection)) {
            return Err(ConnectError::Duplicate(connection.source, connection.target));
        }
        log::debug!("connect {} <-> {}", connection.source, connection.target);
        self.current.connections.push(connection);
        self.touch();
        Ok(())
    }

    /// Remove the connection joining the same unordered pair, if any.
    pub fn remove_connection(&mut self, connection: Connection) -> bool {
        let before = self.current.connections.len();
        self.current.connections.retain(|c| !c.same_pair(&connection));
        let removed = self.current.connections.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    // ─── Chart operations ────────────────────────────────────────────────

    pub fn rename_chart(&mut self, title: &str) {
        self.current.title = title.to_string();
        self.touch();
    }

    /// Snapshot the current chart into the library (upsert by id) and
    /// return its id.
    ///
    /// A first save stamps `created_at` and the current chart adopts the
    /// snapshot's metadata; later saves overwrite the entry in place.
    pub fn save_chart(&mut self) -> String {
        let now = self.env.now_ms();
        if self.current.id.is_empty() {
            self.current.id = self.fresh_chart_id();
        }
        let mut snapshot = self.current.snapshot();
        snapshot.last_modified = now;

        match self.saved.iter_mut().find(|c| c.id == snapshot.id) {
            Some(entry) => {
                log::debug!("update saved chart {}", snapshot.id);
                *entry = snapshot;
            }
            None => {
                log::debug!("insert saved chart {}", snapshot.id);
                snapshot.created_at = now;
                self.current.created_at = snapshot.created_at;
                self.current.last_modified = snapshot.last_modified;
                self.saved.push(snapshot);
            }
        }
        self.current.id.clone()
    }

    /// Make a deep copy of `chart` the current chart and switch to the
    /// editor.
    pub fn load_chart(&mut self, chart: &Chart) {
        self.current = chart.snapshot();
        self.current.last_modified = self.env.now_ms();
        self.selection.clear();
        self.view = ActiveView::Editor;
        log::debug!("loaded chart {}", self.current.id);
    }

    /// Load a library entry by id.
    pub fn load_saved_chart(&mut self, id: &str) -> bool {
        let Some(chart) = self.saved_chart(id).map(Chart::snapshot) else {
            return false;
        };
        self.load_chart(&chart);
        true
    }

    /// Remove a library entry. The current chart is untouched.
    pub fn delete_chart(&mut self, id: &str) -> bool {
        let before = self.saved.len();
        self.saved.retain(|c| c.id != id);
        self.saved.len() != before
    }

    /// Start over with an empty chart under a new id.
    pub fn clear_current_chart(&mut self) {
        let now = self.env.now_ms();
        self.current = Chart::empty(self.fresh_chart_id(), NEW_CHART_TITLE, now);
        self.selection.clear();
    }

    /// `chart-<ms>-<base36>`, bumped with a counter until it names neither
    /// the current chart nor a library entry.
    fn fresh_chart_id(&self) -> String {
        let now = self.env.now_ms();
        let stem = format!("chart-{now}-{}", base36((self.env.random_unit() * 36f64.powi(5)) as u64));
        let taken = |id: &str| self.current.id == id || self.saved.iter().any(|c| c.id == id);
        let mut id = stem.clone();
        let mut n = 1u32;
        while taken(&id) {
            id = format!("{stem}-{n}");
            n += 1;
        }
        id
    }

    pub fn set_active_view(&mut self, view: ActiveView) {
        self.view = view;
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    /// The subset of state that survives a reload.
    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            saved_charts: self.saved.iter().map(Chart::snapshot).collect(),
            current_tab: self.view,
        }
    }

    pub fn restore(&mut self, state: PersistedState) {
        log::debug!("restored {} saved chart(s)", state.saved_charts.len());
        self.saved = state.saved_charts;
        self.view = state.current_tab;
    }
}

fn is_well_formed(node: &Node) -> bool {
    let positive = |v: f64| v.is_finite() && v > 0.0;
    positive(node.radius) && positive(node.font_size) && node.x.is_finite() && node.y.is_finite()
}
