pub mod controller;
pub mod input;
pub mod shortcuts;

pub use controller::{CanvasController, InteractionMode, Response};
pub use input::{InputEvent, Modifiers, PointerButton};
pub use shortcuts::{ShortcutAction, ShortcutMap};
