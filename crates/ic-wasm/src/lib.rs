//! WASM bridge for the identity chart editor.
//!
//! Compiled via `wasm-pack build --target web`. The page owns the DOM
//! (canvas, toolbar, node editor panel, gallery); everything stateful lives
//! in [`ChartApp`]. Methods returning `String` return JSON.

mod download;
mod env;
mod render2d;
mod storage;
mod upload;

pub use env::JsEnv;
pub use upload::{UploadError, UploadSlot, UploadTicket};

use ic_core::config::EditorConfig;
use ic_core::id::NodeId;
use ic_core::model::{ActiveView, Chart, Node};
use ic_core::persist::PersistedState;
use ic_core::store::ChartStore;
use ic_editor::controller::{CanvasController, Response};
use ic_editor::input::{InputEvent, Modifiers, PointerButton};
use ic_editor::shortcuts::{ShortcutAction, ShortcutMap};
use ic_render::chrome::chrome;
use ic_render::export::{ExportArtifact, ExportPipeline};
use ic_render::scene::{CanvasSize, project};
use ic_render::svg::preview_svg;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

type Store = ChartStore<JsEnv>;

/// The main WASM-facing editor.
///
/// Holds the chart store, the canvas controller and the export/upload
/// slots. All interaction from the page goes through this struct.
#[wasm_bindgen]
pub struct ChartApp {
    /// Shared with pending upload callbacks.
    store: Rc<RefCell<Store>>,
    controller: CanvasController,
    exports: ExportPipeline,
    uploads: UploadSlot,
    images: render2d::ImageCache,
    /// `(message, kind)` with kind `"success"` or `"error"`.
    notify: Option<js_sys::Function>,
    /// Called when async work (image decode, upload) needs a repaint.
    redraw: Option<js_sys::Function>,
}

#[wasm_bindgen]
impl ChartApp {
    /// Create an editor with the default configuration and the given
    /// canvas size.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        let config = EditorConfig {
            canvas_width: width,
            canvas_height: height,
            ..EditorConfig::default()
        };
        Self::from_config(config)
    }

    /// Create an editor from a (possibly partial) JSON `EditorConfig`.
    /// Malformed JSON falls back to the defaults.
    pub fn with_config(config_json: &str) -> Self {
        let config = EditorConfig::from_json(config_json).unwrap_or_else(|e| {
            log::warn!("invalid editor config, using defaults: {e}");
            EditorConfig::default()
        });
        Self::from_config(config)
    }

    pub fn set_notify_callback(&mut self, f: js_sys::Function) {
        self.notify = Some(f);
    }

    pub fn set_redraw_callback(&mut self, f: js_sys::Function) {
        self.redraw = Some(f);
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Render the chart plus viewport chrome to a Canvas2D context.
    pub fn render(&self, ctx: &CanvasRenderingContext2d) {
        let store = self.store.borrow();
        let canvas = self.controller.canvas();
        let scene = project(store.chart(), canvas);
        let overlay = self.controller.overlay(&store);
        let extra = chrome(store.nodes(), store.selection().ids(), &overlay, canvas);
        self.images.retain_live(store.nodes());
        render2d::render(ctx, &scene, &extra, &self.images, self.redraw.as_ref());
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.controller.resize(CanvasSize::new(width, height));
    }

    // ─── Pointer / keyboard ──────────────────────────────────────────────

    /// Handle pointer down. `button` is `MouseEvent.button`.
    /// Returns true if the canvas needs a repaint.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_down(
        &mut self,
        x: f64,
        y: f64,
        button: i16,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        let event = InputEvent::PointerDown {
            x,
            y,
            button: PointerButton::from_dom(button),
            modifiers: mods(shift, ctrl, alt, meta),
        };
        self.dispatch(&event)
    }

    pub fn handle_pointer_move(&mut self, x: f64, y: f64, shift: bool, ctrl: bool, alt: bool, meta: bool) -> bool {
        let event = InputEvent::PointerMove {
            x,
            y,
            modifiers: mods(shift, ctrl, alt, meta),
        };
        self.dispatch(&event)
    }

    pub fn handle_pointer_up(&mut self, x: f64, y: f64, shift: bool, ctrl: bool, alt: bool, meta: bool) -> bool {
        let event = InputEvent::PointerUp {
            x,
            y,
            modifiers: mods(shift, ctrl, alt, meta),
        };
        self.dispatch(&event)
    }

    pub fn handle_pointer_leave(&mut self) -> bool {
        self.dispatch(&InputEvent::PointerLeave)
    }

    /// Handle a keyboard event. Returns a JSON string:
    /// `{"changed":bool,"action":"<action_name>"}`.
    ///
    /// Save and export run here; `newChart` is only reported so the page
    /// can ask for a title and call [`ChartApp::new_chart`].
    pub fn handle_key(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> String {
        let event = InputEvent::Key {
            key: key.to_string(),
            modifiers: mods(shift, ctrl, alt, meta),
        };
        let response = self.controller.handle(&mut self.store.borrow_mut(), &event);
        let (changed, action) = match response {
            Response::Unchanged => (false, None),
            Response::Redraw => (true, ShortcutMap::resolve(key, ctrl, shift, alt, meta)),
            Response::Forward(action) => {
                let changed = match action {
                    ShortcutAction::Save => {
                        self.save();
                        true
                    }
                    ShortcutAction::Export => {
                        self.export_png();
                        false
                    }
                    _ => false,
                };
                (changed, Some(action))
            }
        };
        json!({
            "changed": changed,
            "action": action.map(action_to_name).unwrap_or("none"),
        })
        .to_string()
    }

    // ─── Chart operations ────────────────────────────────────────────────

    /// Add a node from the configured template and select it.
    /// Returns the new node's id.
    pub fn add_node(&mut self) -> String {
        let mut store = self.store.borrow_mut();
        let id = store.generate_node_id();
        let node = store.config().node_template(id);
        store.add_node(node);
        id.as_str().to_string()
    }

    /// Save the current chart to the library and persist it.
    /// Returns `{"ok":true,"id":"..."}`.
    pub fn save(&mut self) -> String {
        let (id, title) = {
            let mut store = self.store.borrow_mut();
            if store.chart().title.is_empty() {
                store.rename_chart(ic_core::store::DEFAULT_CHART_TITLE);
            }
            let id = store.save_chart();
            (id, store.chart().title.clone())
        };
        self.persist_quietly();
        self.notify(&format!("Chart \"{title}\" saved to gallery!"), true);
        json!({ "ok": true, "id": id }).to_string()
    }

    /// Replace the current chart with an empty one. An empty title keeps
    /// the default.
    pub fn new_chart(&mut self, title: &str) {
        let mut store = self.store.borrow_mut();
        store.clear_current_chart();
        let title = title.trim();
        if !title.is_empty() {
            store.rename_chart(title);
        }
        self.controller.reset();
    }

    /// Load a library entry into the editor. Returns false for unknown ids.
    pub fn load_chart(&mut self, id: &str) -> bool {
        let loaded = self.store.borrow_mut().load_saved_chart(id);
        if loaded {
            self.controller.reset();
            self.persist_quietly();
        }
        loaded
    }

    pub fn delete_chart(&mut self, id: &str) -> bool {
        let deleted = self.store.borrow_mut().delete_chart(id);
        if deleted {
            self.persist_quietly();
        }
        deleted
    }

    pub fn rename(&mut self, title: &str) {
        self.store.borrow_mut().rename_chart(title);
    }

    pub fn duplicate_selected(&mut self) -> bool {
        let mut store = self.store.borrow_mut();
        let ids = store.selection().ids().to_vec();
        !store.duplicate_multiple_nodes(&ids).is_empty()
    }

    pub fn delete_selected(&mut self) -> bool {
        let mut store = self.store.borrow_mut();
        let ids = store.selection().ids().to_vec();
        store.remove_multiple_nodes(&ids) > 0
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.store.borrow().has_unsaved_changes()
    }

    /// 0 = editor, 1 = gallery.
    pub fn active_view(&self) -> u8 {
        self.store.borrow().active_view().into()
    }

    pub fn set_active_view(&mut self, tab: u8) {
        self.store.borrow_mut().set_active_view(ActiveView::from(tab));
        self.persist_quietly();
    }

    // ─── Node editing ────────────────────────────────────────────────────

    pub fn get_chart_json(&self) -> String {
        serde_json::to_string(self.store.borrow().chart()).unwrap_or_else(|_| "{}".to_string())
    }

    /// The node as JSON, or `{}` if unknown.
    pub fn get_node_json(&self, id: &str) -> String {
        let store = self.store.borrow();
        store
            .node(NodeId::intern(id))
            .and_then(|n| serde_json::to_string(n).ok())
            .unwrap_or_else(|| "{}".to_string())
    }

    /// The primary selected node, or `{}` when zero or several are selected.
    pub fn get_selected_node_json(&self) -> String {
        let primary = self.store.borrow().primary_selection();
        match primary {
            Some(id) => self.get_node_json(id.as_str()),
            None => "{}".to_string(),
        }
    }

    pub fn get_selected_ids(&self) -> String {
        let store = self.store.borrow();
        let ids: Vec<&str> = store.selection().ids().iter().map(|id| id.as_str()).collect();
        serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string())
    }

    /// Replace a node from its JSON form (full replace by id).
    /// Returns `{"ok":true}` or `{"ok":false,"error":"..."}`.
    pub fn update_node_json(&mut self, json: &str) -> String {
        let node: Node = match serde_json::from_str(json) {
            Ok(n) => n,
            Err(e) => return error_json(&format!("invalid node: {e}")),
        };
        if self.store.borrow_mut().update_node(node) {
            ok_json()
        } else {
            error_json("unknown node or invalid geometry")
        }
    }

    /// Apply a typed `#RGB`/`#RRGGBB` color. Malformed input is ignored.
    pub fn set_node_color(&mut self, id: &str, value: &str) -> bool {
        self.edit_node(id, |n| n.set_color_input(value))
    }

    pub fn add_node_line(&mut self, id: &str, text: &str) -> bool {
        self.edit_node(id, |n| n.push_line(text))
    }

    pub fn remove_node_line(&mut self, id: &str, index: usize) -> bool {
        self.edit_node(id, |n| n.remove_line(index))
    }

    pub fn edit_node_line(&mut self, id: &str, index: usize, text: &str) -> bool {
        self.edit_node(id, |n| n.edit_line(index, text))
    }

    pub fn set_image_size(&mut self, id: &str, size: f64) -> bool {
        self.edit_node(id, |n| {
            n.set_image_size(size);
            true
        })
    }

    pub fn nudge_image(&mut self, id: &str, dx: f64, dy: f64) -> bool {
        self.edit_node(id, |n| {
            n.nudge_image(dx, dy);
            true
        })
    }

    pub fn rotate_image(&mut self, id: &str, clockwise: bool) -> bool {
        self.edit_node(id, |n| {
            n.rotate_image_step(clockwise);
            true
        })
    }

    pub fn clear_image(&mut self, id: &str) -> bool {
        self.edit_node(id, |n| {
            let had = n.image.is_some();
            n.clear_image();
            had
        })
    }

    // ─── Library ─────────────────────────────────────────────────────────

    /// Saved charts with an SVG thumbnail each.
    pub fn get_library_json(&self) -> String {
        let store = self.store.borrow();
        let entries: Vec<serde_json::Value> = store
            .saved_charts()
            .iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "title": c.title,
                    "createdAt": c.created_at,
                    "lastModified": c.last_modified,
                    "nodeCount": c.nodes.len(),
                    "connectionCount": c.connections.len(),
                    "preview": preview_svg(c),
                })
            })
            .collect();
        serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string())
    }

    /// A saved chart's full JSON, or `{}` if unknown.
    pub fn get_saved_chart_json(&self, id: &str) -> String {
        self.store
            .borrow()
            .saved_chart(id)
            .and_then(|c: &Chart| serde_json::to_string(c).ok())
            .unwrap_or_else(|| "{}".to_string())
    }

    // ─── Export / upload ─────────────────────────────────────────────────

    /// Start a PNG download of the current chart. Completion is reported
    /// through the notify callback. Returns `{"ok":true}` once started.
    pub fn export_png(&mut self) -> String {
        let now = js_sys::Date::now() as i64;
        let job = match self.exports.begin(self.store.borrow().chart(), now) {
            Ok(job) => job,
            Err(e) => {
                self.notify(&e.to_string(), false);
                return error_json(&e.to_string());
            }
        };
        let notify = self.notify.clone();
        let started = download::start(job, move |result| {
            let (msg, ok) = match result {
                Ok(ExportArtifact::Raster { .. }) => ("Chart downloaded successfully!".to_string(), true),
                Ok(ExportArtifact::Vector { .. }) => {
                    ("PNG export failed; downloaded SVG instead.".to_string(), true)
                }
                Err(e) => (format!("Error creating image: {e}"), false),
            };
            send_notification(notify.as_ref(), &msg, ok);
        });
        match started {
            Ok(()) => ok_json(),
            Err(e) => {
                self.notify(&format!("Error: {e}"), false);
                error_json(&e.to_string())
            }
        }
    }

    /// Attach an image file to the selected node. The read completes
    /// asynchronously; the redraw callback fires when it does.
    pub fn upload_image(&mut self, file: web_sys::File) -> String {
        let target = self.store.borrow().primary_selection();
        let ticket = match self.uploads.begin(target) {
            Ok(t) => t,
            Err(e) => return error_json(&e.to_string()),
        };
        let notify = self.notify.clone();
        let redraw = self.redraw.clone();
        let result = upload::read_image_file(&file, ticket, Rc::clone(&self.store), move |outcome| {
            match outcome {
                Ok(_) => {
                    if let Some(cb) = &redraw {
                        let _ = cb.call0(&JsValue::NULL);
                    }
                }
                Err(e) => send_notification(notify.as_ref(), &e.to_string(), false),
            }
        });
        match result {
            Ok(()) => ok_json(),
            Err(e) => error_json(&e.to_string()),
        }
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    /// Restore the library and active tab from localStorage.
    /// Returns false if storage is unavailable.
    pub fn load_persisted(&mut self) -> bool {
        let mut storage = match storage::LocalStorage::open() {
            Ok(s) => s,
            Err(e) => {
                log::warn!("{e}");
                return false;
            }
        };
        let mut store = self.store.borrow_mut();
        let key = store.config().storage_key.clone();
        store.restore(PersistedState::load(&mut storage, &key));
        true
    }

    /// Write the library and active tab to localStorage.
    pub fn persist(&self) -> String {
        match self.try_persist() {
            Ok(()) => ok_json(),
            Err(e) => error_json(&e.to_string()),
        }
    }
}

impl ChartApp {
    fn from_config(config: EditorConfig) -> Self {
        console_error_panic_hook_setup();
        let canvas = CanvasSize::new(config.canvas_width, config.canvas_height);
        Self {
            store: Rc::new(RefCell::new(ChartStore::with_env(config, JsEnv))),
            controller: CanvasController::new(canvas),
            exports: ExportPipeline::new(),
            uploads: UploadSlot::default(),
            images: render2d::ImageCache::default(),
            notify: None,
            redraw: None,
        }
    }

    fn dispatch(&mut self, event: &InputEvent) -> bool {
        let response = self.controller.handle(&mut self.store.borrow_mut(), event);
        response != Response::Unchanged
    }

    fn edit_node(&mut self, id: &str, edit: impl FnOnce(&mut Node) -> bool) -> bool {
        let mut store = self.store.borrow_mut();
        let Some(mut node) = store.node(NodeId::intern(id)).cloned() else {
            return false;
        };
        edit(&mut node) && store.update_node(node)
    }

    fn try_persist(&self) -> Result<(), ic_core::persist::PersistError> {
        let mut storage = storage::LocalStorage::open()?;
        let store = self.store.borrow();
        store.persisted_state().save(&mut storage, &store.config().storage_key)
    }

    fn persist_quietly(&self) {
        if let Err(e) = self.try_persist() {
            log::warn!("could not persist library: {e}");
        }
    }

    fn notify(&self, message: &str, ok: bool) {
        send_notification(self.notify.as_ref(), message, ok);
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn mods(shift: bool, ctrl: bool, alt: bool, meta: bool) -> Modifiers {
    Modifiers {
        shift,
        ctrl,
        alt,
        meta,
    }
}

fn send_notification(callback: Option<&js_sys::Function>, message: &str, ok: bool) {
    if !ok {
        log::warn!("{message}");
    }
    if let Some(cb) = callback {
        let kind = if ok { "success" } else { "error" };
        let _ = cb.call2(&JsValue::NULL, &JsValue::from_str(message), &JsValue::from_str(kind));
    }
}

fn action_to_name(action: ShortcutAction) -> &'static str {
    match action {
        ShortcutAction::Save => "save",
        ShortcutAction::NewChart => "newChart",
        ShortcutAction::Export => "export",
        ShortcutAction::SelectAll => "selectAll",
        ShortcutAction::Delete => "delete",
        ShortcutAction::Cancel => "cancel",
    }
}

fn ok_json() -> String {
    r#"{"ok":true}"#.to_string()
}

fn error_json(message: &str) -> String {
    json!({ "ok": false, "error": message }).to_string()
}

/// Best-effort text for a thrown JS value.
pub(crate) fn js_error(value: JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

// ─── Console logging and panic hook ──────────────────────────────────────

/// Per-mutation `debug!` records stay out of the browser console.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
const CONSOLE_LOG_LEVEL: log::Level = log::Level::Info;

/// Route `log` records to the browser console and report panics there.
/// Runs once per page however many editors are created.
fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            if let Err(e) = console_log::init_with_level(CONSOLE_LOG_LEVEL) {
                web_sys::console::warn_1(&format!("console logger unavailable: {e}").into());
            }
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Identity chart WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone helpers (no editor needed) ───────────────────────────────

/// Validate a typed node color. Accepts `#RGB` and `#RRGGBB`.
#[wasm_bindgen]
pub fn is_valid_color(value: &str) -> bool {
    ic_core::model::Color::parse_input(value).is_some()
}

/// Export filename for a chart title at the given time.
#[wasm_bindgen]
pub fn export_filename(title: &str, now_ms: f64, ext: &str) -> String {
    ic_render::export::export_filename(title, now_ms as i64, ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn action_names_are_camel_case() {
        assert_eq!(action_to_name(ShortcutAction::NewChart), "newChart");
        assert_eq!(action_to_name(ShortcutAction::SelectAll), "selectAll");
    }

    #[test]
    fn error_json_escapes_message() {
        assert_eq!(error_json("bad \"quote\""), r#"{"error":"bad \"quote\"","ok":false}"#);
        assert_eq!(ok_json(), r#"{"ok":true}"#);
    }

    #[test]
    fn console_shows_warnings_but_not_mutation_traces() {
        assert!(log::Level::Warn <= CONSOLE_LOG_LEVEL);
        assert!(log::Level::Debug > CONSOLE_LOG_LEVEL);
    }

    #[test]
    fn color_validation_is_strict() {
        assert!(is_valid_color("#abc"));
        assert!(is_valid_color("#A1B2C3"));
        assert!(!is_valid_color("#abcd"));
        assert!(!is_valid_color("abc"));
    }

    #[test]
    fn export_filename_matches_render_crate() {
        assert_eq!(export_filename("", 12.0, "png"), "identity-chart-12.png");
    }
}
