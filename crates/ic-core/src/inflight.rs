//! Single-flight guard for one-shot async operations (export, upload).
//!
//! The UI is single-threaded, so the flag is an `Rc<Cell<bool>>`. A guard
//! is handed to the pending operation and releases the slot when dropped,
//! whichever way the operation resolves.

use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Default, Clone)]
pub struct InFlight {
    busy: Rc<Cell<bool>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Claim the slot. Returns `None` while another operation holds it.
    pub fn try_begin(&self) -> Option<InFlightGuard> {
        if self.busy.replace(true) {
            return None;
        }
        Some(InFlightGuard {
            busy: Rc::clone(&self.busy),
        })
    }
}

/// Held by a pending operation; frees the slot on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    busy: Rc<Cell<bool>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.busy.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_refused_until_guard_dropped() {
        let slot = InFlight::new();
        let guard = slot.try_begin().expect("first claim");
        assert!(slot.is_busy());
        assert!(slot.try_begin().is_none());
        drop(guard);
        assert!(!slot.is_busy());
        assert!(slot.try_begin().is_some());
    }
}
