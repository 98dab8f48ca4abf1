//! Node image upload.
//!
//! Reading a file is asynchronous, so an upload is a one-shot
//! [`UploadTicket`] naming the target node, resolved by
//! [`UploadTicket::finish`] when the read completes. Only one upload may be
//! pending at a time.

use crate::js_error;
use ic_core::env::Env;
use ic_core::id::NodeId;
use ic_core::inflight::{InFlight, InFlightGuard};
use ic_core::store::ChartStore;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("an image upload is already in progress")]
    Busy,
    #[error("select a single node to attach an image to")]
    NoTarget,
    #[error("the node was removed before the image finished loading")]
    TargetGone,
    #[error("not an image: {0}")]
    NotImage(String),
    #[error("could not read file: {0}")]
    Read(String),
}

#[derive(Debug, Default)]
pub struct UploadSlot {
    slot: InFlight,
}

impl UploadSlot {
    pub fn begin(&self, target: Option<NodeId>) -> Result<UploadTicket, UploadError> {
        let target = target.ok_or(UploadError::NoTarget)?;
        let guard = self.slot.try_begin().ok_or(UploadError::Busy)?;
        Ok(UploadTicket {
            target,
            _guard: guard,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.slot.is_busy()
    }
}

#[derive(Debug)]
pub struct UploadTicket {
    target: NodeId,
    _guard: InFlightGuard,
}

impl UploadTicket {
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Attach the read data URI to the target node, resetting its image
    /// transform.
    pub fn finish<E: Env>(
        self,
        store: &mut ChartStore<E>,
        read: Result<String, String>,
    ) -> Result<NodeId, UploadError> {
        let data_uri = read.map_err(UploadError::Read)?;
        if !data_uri.starts_with("data:image/") {
            let kind = data_uri.split(';').next().unwrap_or_default().to_string();
            return Err(UploadError::NotImage(kind));
        }
        let mut node = store.node(self.target).cloned().ok_or(UploadError::TargetGone)?;
        node.set_image(data_uri);
        store.update_node(node);
        log::debug!("attached image to {}", self.target);
        Ok(self.target)
    }
}

// ─── Browser glue ────────────────────────────────────────────────────────

/// Read `file` as a data URI and resolve `ticket` against `store`.
/// `on_done` runs after the store borrow is released.
pub fn read_image_file<E: Env + 'static>(
    file: &web_sys::File,
    ticket: UploadTicket,
    store: Rc<RefCell<ChartStore<E>>>,
    on_done: impl FnOnce(Result<NodeId, UploadError>) + 'static,
) -> Result<(), UploadError> {
    let mime = file.type_();
    if !mime.starts_with("image/") {
        return Err(UploadError::NotImage(mime));
    }

    let reader = web_sys::FileReader::new().map_err(|e| UploadError::Read(js_error(e)))?;
    let result_reader = reader.clone();
    let onloadend = Closure::once_into_js(move || {
        let read = result_reader
            .result()
            .ok()
            .and_then(|v| v.as_string())
            .ok_or_else(|| "empty result".to_string());
        let outcome = match store.try_borrow_mut() {
            Ok(mut store) => ticket.finish(&mut store, read),
            Err(_) => Err(UploadError::Read("editor busy".into())),
        };
        on_done(outcome);
    });
    reader.set_onloadend(Some(onloadend.unchecked_ref()));
    reader
        .read_as_data_url(file)
        .map_err(|e| UploadError::Read(js_error(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ic_core::env::FixedEnv;
    use ic_core::model::Node;
    use ic_core::EditorConfig;
    use pretty_assertions::assert_eq;

    fn store_with(name: &str) -> (ChartStore<FixedEnv>, NodeId) {
        let mut store = ChartStore::with_env(EditorConfig::default(), FixedEnv::new(0));
        let id = NodeId::intern(name);
        store.add_node(Node::new(id, 100.0, 100.0, 40.0));
        (store, id)
    }

    #[test]
    fn finish_attaches_image_with_default_transform() {
        let (mut store, id) = store_with("up-a");
        let slot = UploadSlot::default();
        let ticket = slot.begin(Some(id)).unwrap();
        assert!(slot.is_busy());

        let done = ticket.finish(&mut store, Ok("data:image/png;base64,AAAA".into()));
        assert_eq!(done, Ok(id));
        assert!(!slot.is_busy());
        let node = store.node(id).unwrap();
        assert_eq!(node.image.as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(node.image_size, Some(1.0));
        assert_eq!(node.image_rotation, Some(0.0));
    }

    #[test]
    fn second_upload_refused_while_pending() {
        let (_, id) = store_with("up-b");
        let slot = UploadSlot::default();
        let _pending = slot.begin(Some(id)).unwrap();
        assert_eq!(slot.begin(Some(id)).unwrap_err(), UploadError::Busy);
        assert_eq!(UploadSlot::default().begin(None).unwrap_err(), UploadError::NoTarget);
    }

    #[test]
    fn vanished_target_and_bad_data_are_errors() {
        let (mut store, id) = store_with("up-c");
        let slot = UploadSlot::default();

        let ticket = slot.begin(Some(id)).unwrap();
        assert_eq!(
            ticket.finish(&mut store, Ok("data:text/plain;base64,AA".into())),
            Err(UploadError::NotImage("data:text/plain".into()))
        );

        let ticket = slot.begin(Some(id)).unwrap();
        store.remove_node(id);
        assert_eq!(
            ticket.finish(&mut store, Ok("data:image/png;base64,AA".into())),
            Err(UploadError::TargetGone)
        );

        let ticket = slot.begin(Some(id)).unwrap();
        assert_eq!(
            ticket.finish(&mut store, Err("aborted".into())),
            Err(UploadError::Read("aborted".into()))
        );
    }
}
