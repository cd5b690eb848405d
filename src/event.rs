//! Key events consumed by the matcher and the payload handed to callbacks.

use crate::shortcut::Modifiers;
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Which key event stream a manager listens to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Fired when a key goes down, and again on auto-repeat.
    #[default]
    KeyDown,
    /// Fired for non-modifier keys when they go down or repeat.
    KeyPress,
    /// Fired when a key is released.
    KeyUp,
}

impl FromStr for EventType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "keydown" => Ok(EventType::KeyDown),
            "keypress" => Ok(EventType::KeyPress),
            "keyup" => Ok(EventType::KeyUp),
            _ => Err(anyhow!("Unknown key event type: {}", s)),
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::KeyDown => write!(f, "keydown"),
            EventType::KeyPress => write!(f, "keypress"),
            EventType::KeyUp => write!(f, "keyup"),
        }
    }
}

/// A raw key event delivered by a key source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub event_type: EventType,
    pub key_code: u32,
    pub modifiers: Modifiers,
    /// Set for auto-repeat events while a key is held.
    pub repeat: bool,
    default_prevented: bool,
}

impl KeyEvent {
    pub fn new(event_type: EventType, key_code: u32, modifiers: Modifiers) -> Self {
        Self {
            event_type,
            key_code,
            modifiers,
            repeat: false,
            default_prevented: false,
        }
    }

    /// Shorthand for a `keydown` event.
    pub fn key_down(key_code: u32, modifiers: Modifiers) -> Self {
        Self::new(EventType::KeyDown, key_code, modifiers)
    }

    /// Mark the event as an auto-repeat.
    pub fn repeated(self) -> Self {
        Self {
            repeat: true,
            ..self
        }
    }

    /// Signal to the source that the event has been handled.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Payload passed to every callback of a matched shortcut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutEvent {
    pub event_type: EventType,
    pub key_code: u32,
    pub modifiers: Modifiers,
    pub repeat: bool,
    /// Canonical form of the shortcut that fired, e.g. `"CTRL+SHIFT+A"`.
    pub shortcut: String,
}

impl ShortcutEvent {
    pub(crate) fn from_key_event(event: &KeyEvent, shortcut: &str) -> Self {
        Self {
            event_type: event.event_type,
            key_code: event.key_code,
            modifiers: event.modifiers,
            repeat: event.repeat,
            shortcut: shortcut.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_default() {
        assert_eq!(EventType::default(), EventType::KeyDown);
    }

    #[test]
    fn test_event_type_from_str() {
        assert_eq!("keydown".parse::<EventType>().unwrap(), EventType::KeyDown);
        assert_eq!("KeyPress".parse::<EventType>().unwrap(), EventType::KeyPress);
        assert_eq!("keyup".parse::<EventType>().unwrap(), EventType::KeyUp);
        assert!("keyhold".parse::<EventType>().is_err());
    }

    #[test]
    fn test_event_type_display() {
        assert_eq!(EventType::KeyUp.to_string(), "keyup");
        assert_eq!(EventType::KeyDown.to_string().parse::<EventType>().unwrap(), EventType::KeyDown);
    }

    #[test]
    fn test_prevent_default() {
        let mut event = KeyEvent::key_down(65, Modifiers::none());
        assert!(!event.default_prevented());
        event.prevent_default();
        assert!(event.default_prevented());
    }

    #[test]
    fn test_shortcut_event_copies_key_data() {
        let event = KeyEvent::key_down(65, Modifiers::none().with_ctrl()).repeated();
        let payload = ShortcutEvent::from_key_event(&event, "CTRL+A");
        assert_eq!(payload.key_code, 65);
        assert!(payload.modifiers.ctrl);
        assert!(payload.repeat);
        assert_eq!(payload.event_type, EventType::KeyDown);
        assert_eq!(payload.shortcut, "CTRL+A");
    }
}
