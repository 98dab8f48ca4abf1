//! Input abstraction layer.
//!
//! Normalizes browser mouse and keyboard events into a unified
//! `InputEvent` enum consumed by the canvas controller. Coordinates are
//! canvas-local CSS pixels.

use kurbo::Point;

/// Which pointer button went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Left mouse button, touch, pen contact.
    Primary,
    /// Right mouse button (context click).
    Secondary,
    Other,
}

impl PointerButton {
    /// Map `MouseEvent.button`.
    pub fn from_dom(button: i16) -> Self {
        match button {
            0 => Self::Primary,
            2 => Self::Secondary,
            _ => Self::Other,
        }
    }
}

/// Modifier keys held during an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    /// Shift adds to (or toggles within) the selection instead of
    /// replacing it.
    pub fn extends_selection(&self) -> bool {
        self.shift
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        x: f64,
        y: f64,
        button: PointerButton,
        modifiers: Modifiers,
    },

    PointerMove {
        x: f64,
        y: f64,
        modifiers: Modifiers,
    },

    PointerUp {
        x: f64,
        y: f64,
        modifiers: Modifiers,
    },

    /// Pointer left the canvas. Ends a drag or rubber band as if released.
    PointerLeave,

    /// `key` is the `KeyboardEvent.key` value.
    Key { key: String, modifiers: Modifiers },
}

impl InputEvent {
    pub fn primary_down(x: f64, y: f64, modifiers: Modifiers) -> Self {
        Self::PointerDown {
            x,
            y,
            button: PointerButton::Primary,
            modifiers,
        }
    }

    pub fn secondary_down(x: f64, y: f64) -> Self {
        Self::PointerDown {
            x,
            y,
            button: PointerButton::Secondary,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_move(x: f64, y: f64) -> Self {
        Self::PointerMove {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_up(x: f64, y: f64, modifiers: Modifiers) -> Self {
        Self::PointerUp { x, y, modifiers }
    }

    pub fn key(key: &str) -> Self {
        Self::Key {
            key: key.to_string(),
            modifiers: Modifiers::NONE,
        }
    }

    pub fn key_with(key: &str, modifiers: Modifiers) -> Self {
        Self::Key {
            key: key.to_string(),
            modifiers,
        }
    }

    /// Extract position if this is a positioned pointer event.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y, .. } | Self::PointerMove { x, y, .. } | Self::PointerUp { x, y, .. } => {
                Some(Point::new(*x, *y))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dom_buttons() {
        assert_eq!(PointerButton::from_dom(0), PointerButton::Primary);
        assert_eq!(PointerButton::from_dom(2), PointerButton::Secondary);
        assert_eq!(PointerButton::from_dom(1), PointerButton::Other);
    }

    #[test]
    fn only_shift_extends_selection() {
        assert!(Modifiers::SHIFT.extends_selection());
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        assert!(!ctrl.extends_selection());
    }

    #[test]
    fn position_of_pointer_events() {
        assert_eq!(
            InputEvent::pointer_move(3.0, 4.0).position(),
            Some(Point::new(3.0, 4.0))
        );
        assert_eq!(InputEvent::PointerLeave.position(), None);
        assert_eq!(InputEvent::key("a").position(), None);
    }
}
