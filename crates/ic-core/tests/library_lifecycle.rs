//! Integration tests: chart library lifecycle (ic-core).
//!
//! Drives a `ChartStore` through build, save, reload-from-storage, load and
//! delete, the way the browser bridge does across a page refresh.

use ic_core::model::*;
use ic_core::persist::{MemoryStorage, PersistedState};
use ic_core::{ChartStore, EditorConfig, FixedEnv, NodeId};
use pretty_assertions::assert_eq;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn store_at(now: i64) -> ChartStore<FixedEnv> {
    ChartStore::with_env(EditorConfig::default(), FixedEnv::with_samples(now, vec![0.25, 0.75]))
}

fn build_chart(store: &mut ChartStore<FixedEnv>) -> (NodeId, NodeId) {
    let config = store.config().clone();
    let me = store.generate_node_id();
    store.add_node(config.node_template(me));
    let work = store.generate_node_id();
    let mut node = config.node_template(work);
    node.x = 600.0;
    node.title = "Work".into();
    store.add_node(node);
    store.add_connection(Connection::new(me, work)).unwrap();
    store.rename_chart("Who I Am");
    (me, work)
}

// ─── Save / reload ──────────────────────────────────────────────────────

#[test]
fn library_survives_reload() {
    init_logging();
    let key = EditorConfig::default().storage_key;
    let mut storage = MemoryStorage::new();

    let mut first = store_at(1_000);
    build_chart(&mut first);
    let id = first.save_chart();
    first.set_active_view(ActiveView::Gallery);
    first.persisted_state().save(&mut storage, &key).unwrap();

    let mut second = store_at(9_000);
    second.restore(PersistedState::load(&mut storage, &key));
    assert_eq!(second.active_view(), ActiveView::Gallery);
    assert_eq!(second.saved_charts().len(), 1);
    assert_eq!(second.saved_charts()[0].title, "Who I Am");
    // Only the library is persisted.
    assert!(second.nodes().is_empty());

    assert!(second.load_saved_chart(&id));
    assert_eq!(second.active_view(), ActiveView::Editor);
    assert_eq!(second.nodes().len(), 2);
    assert_eq!(second.connections().len(), 1);
    assert_eq!(second.chart().last_modified, 9_000);
}

#[test]
fn new_chart_after_save_gets_its_own_entry() {
    init_logging();
    let mut store = store_at(1_000);
    build_chart(&mut store);
    let first = store.save_chart();

    store.env().advance(100);
    store.clear_current_chart();
    build_chart(&mut store);
    let second = store.save_chart();

    assert_ne!(first, second);
    assert_eq!(store.saved_charts().len(), 2);

    assert!(store.delete_chart(&first));
    assert_eq!(store.saved_charts().len(), 1);
    assert_eq!(store.chart().id, second);
}

#[test]
fn deleting_node_keeps_saved_snapshot() {
    let mut store = store_at(1_000);
    let (me, _) = build_chart(&mut store);
    store.save_chart();
    store.remove_node(me);

    assert!(store.has_unsaved_changes());
    let saved = &store.saved_charts()[0];
    assert_eq!(saved.nodes.len(), 2);
    assert_eq!(saved.connections.len(), 1);
    assert!(store.connections().is_empty());
}
