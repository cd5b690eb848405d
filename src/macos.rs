//! macOS implementation using rdev.

use crate::listener::{emit_key, EventSink, KeyAction, ModifierState};
use crate::shortcut::Modifier;
use anyhow::{Context, Result};
use rdev::{listen, Event, EventType, Key};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn modifier_for(key: Key) -> Option<Modifier> {
    match key {
        Key::ShiftLeft | Key::ShiftRight => Some(Modifier::Shift),
        Key::ControlLeft | Key::ControlRight => Some(Modifier::Ctrl),
        Key::Alt | Key::AltGr => Some(Modifier::Alt),
        Key::MetaLeft | Key::MetaRight => Some(Modifier::Meta),
        _ => None,
    }
}

/// Convert an rdev key to the key code used by the key table.
fn to_key_code(key: Key) -> Option<u32> {
    let code = match key {
        Key::Backspace => 8,
        Key::Tab => 9,
        Key::Return | Key::KpReturn => 13,
        Key::ShiftLeft | Key::ShiftRight => 16,
        Key::ControlLeft | Key::ControlRight => 17,
        Key::Alt | Key::AltGr => 18,
        Key::Pause => 19,
        Key::Escape => 27,
        Key::Space => 32,
        Key::PageUp => 33,
        Key::PageDown => 34,
        Key::End => 35,
        Key::Home => 36,
        Key::LeftArrow => 37,
        Key::UpArrow => 38,
        Key::RightArrow => 39,
        Key::DownArrow => 40,
        Key::Insert => 45,
        Key::Delete => 46,
        Key::Num0 => 48,
        Key::Num1 => 49,
        Key::Num2 => 50,
        Key::Num3 => 51,
        Key::Num4 => 52,
        Key::Num5 => 53,
        Key::Num6 => 54,
        Key::Num7 => 55,
        Key::Num8 => 56,
        Key::Num9 => 57,
        Key::KeyA => 65,
        Key::KeyB => 66,
        Key::KeyC => 67,
        Key::KeyD => 68,
        Key::KeyE => 69,
        Key::KeyF => 70,
        Key::KeyG => 71,
        Key::KeyH => 72,
        Key::KeyI => 73,
        Key::KeyJ => 74,
        Key::KeyK => 75,
        Key::KeyL => 76,
        Key::KeyM => 77,
        Key::KeyN => 78,
        Key::KeyO => 79,
        Key::KeyP => 80,
        Key::KeyQ => 81,
        Key::KeyR => 82,
        Key::KeyS => 83,
        Key::KeyT => 84,
        Key::KeyU => 85,
        Key::KeyV => 86,
        Key::KeyW => 87,
        Key::KeyX => 88,
        Key::KeyY => 89,
        Key::KeyZ => 90,
        Key::MetaLeft | Key::MetaRight => 91,
        Key::F1 => 112,
        Key::F2 => 113,
        Key::F3 => 114,
        Key::F4 => 115,
        Key::F5 => 116,
        Key::F6 => 117,
        Key::F7 => 118,
        Key::F8 => 119,
        Key::F9 => 120,
        Key::F10 => 121,
        Key::F11 => 122,
        Key::F12 => 123,
        Key::ScrollLock => 145,
        _ => return None,
    };
    Some(code)
}

/// Key source backed by rdev's global event tap.
pub struct KeyboardSource;

impl KeyboardSource {
    pub fn new() -> Self {
        Self
    }

    /// Listen on a background thread.
    ///
    /// rdev's tap cannot be removed once installed; after `running` is cleared
    /// events are dropped instead of being passed to `sink`.
    pub fn start(self, mut sink: EventSink, running: Arc<AtomicBool>) -> Result<()> {
        thread::Builder::new()
            .name("shortcut-rdev".to_string())
            .spawn(move || {
                let mut modifiers: ModifierState<Key> = ModifierState::new();
                // rdev reports auto-repeat as another press
                let mut held: Vec<Key> = Vec::new();
                let tap_running = Arc::clone(&running);

                let callback = move |event: Event| {
                    if !tap_running.load(Ordering::Relaxed) {
                        return;
                    }
                    let (key, action) = match event.event_type {
                        EventType::KeyPress(key) if held.contains(&key) => (key, KeyAction::Repeat),
                        EventType::KeyPress(key) => {
                            held.push(key);
                            (key, KeyAction::Press)
                        }
                        EventType::KeyRelease(key) => {
                            held.retain(|k| *k != key);
                            (key, KeyAction::Release)
                        }
                        _ => return,
                    };

                    let modifier = modifier_for(key);
                    if let Some(modifier) = modifier {
                        modifiers.update(key, modifier, action);
                    }

                    if let Some(code) = to_key_code(key) {
                        let mods = modifiers.modifiers();
                        emit_key(&mut sink, code, mods, action, modifier.is_some());
                    }
                };

                if let Err(e) = listen(callback) {
                    log::error!("Error listening to keyboard events: {:?}", e);
                    running.store(false, Ordering::SeqCst);
                }
            })
            .context("Failed to spawn keyboard thread")?;
        Ok(())
    }
}
