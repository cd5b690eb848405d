//! Keyboard shortcut manager with modifier-precise matching.
//!
//! Shortcuts are plain strings such as `"CTRL + SHIFT + A"` bound to one or
//! more callbacks. Every key event is resolved to at most one shortcut: the
//! registered definitions with the most modifiers are tried first, so
//! `"CTRL+SHIFT+A"` wins over `"CTRL+A"` when both could match.
//!
//! # Features
//!
//! - **Flexible definitions** - case-insensitive, whitespace around `+` is ignored
//! - **Many-to-many registration** - one call binds several shortcuts to several callbacks
//! - **Conflict resolution** - the most specific shortcut fires, nothing else does
//! - **Extensible key table** - add your own key names and codes
//! - **Pluggable event sources** - feed events from a UI loop, a channel, or the
//!   global keyboard (evdev on Linux, rdev on macOS)
//! - **Explicit teardown** - detach a listener with [`Listener::dispose`] or by dropping it
//!
//! # Example
//!
//! ```
//! use shortcut_manager::{KeyEvent, Modifiers, ShortcutEvent, ShortcutManager};
//!
//! let manager = ShortcutManager::default();
//!
//! // One callback, one shortcut.
//! manager.register("A", |event: &ShortcutEvent| println!("{} pressed", event.shortcut));
//! // One callback, many shortcuts.
//! manager.register(["A", "ESCAPE"], |event: &ShortcutEvent| println!("{}", event.shortcut));
//! // Flexible definitions.
//! manager.register("ctrl + a", |_: &ShortcutEvent| println!("select all"));
//!
//! let mut event = KeyEvent::key_down(27, Modifiers::none());
//! assert_eq!(manager.handle_event(&mut event).as_deref(), Some("ESCAPE"));
//! ```
//!
//! Listening to the global keyboard:
//!
//! ```no_run
//! use shortcut_manager::{EventType, ShortcutEvent, ShortcutManagerBuilder};
//!
//! fn main() -> anyhow::Result<()> {
//!     let (manager, listener) = ShortcutManagerBuilder::new()
//!         .event_type(EventType::KeyDown)
//!         .start()?;
//!
//!     manager.register("CTRL + SHIFT + F8", |_: &ShortcutEvent| println!("recording"));
//!
//!     std::thread::sleep(std::time::Duration::from_secs(60));
//!     listener.dispose();
//!     Ok(())
//! }
//! ```
//!
//! # Linux Requirements
//!
//! On Linux, the global keyboard reads `/dev/input/event*` devices. This
//! typically means running as root or being a member of the `input` group.

mod event;
mod key;
mod listener;
mod manager;
mod registry;
mod shortcut;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

pub use event::{EventType, KeyEvent, ShortcutEvent};
pub use key::KeyCodeTable;
pub use listener::{ChannelSource, EventSink, GlobalKeyboard, KeySource, Listener};
pub use manager::{ShortcutManager, ShortcutManagerBuilder};
pub use registry::{Callback, IntoCallbacks, IntoDefinitions, Registry};
pub use shortcut::{normalize, Modifier, Modifiers, Shortcut};

#[cfg(target_os = "linux")]
pub use linux::find_keyboards;
