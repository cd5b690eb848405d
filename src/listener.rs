//! Key event sources and the handle that detaches a manager from one.

use crate::event::{EventType, KeyEvent};
use crate::shortcut::{Modifier, Modifiers};
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Receives every raw key event a source produces.
pub type EventSink = Box<dyn FnMut(&mut KeyEvent) + Send>;

/// A producer of raw key events, such as the global keyboard or a host UI loop.
pub trait KeySource {
    /// Start delivering events to `sink` until `running` is cleared.
    ///
    /// Implementations deliver events one at a time, each fully handled before
    /// the next one is passed on.
    fn start(self, sink: EventSink, running: Arc<AtomicBool>) -> Result<()>;
}

/// Handle for a manager attached to a key source.
///
/// The source stops delivering events once the handle is disposed or dropped.
///
/// # Example
///
/// ```
/// use shortcut_manager::{ChannelSource, ShortcutManager};
///
/// let manager = ShortcutManager::default();
/// let (_tx, source) = ChannelSource::new();
/// let listener = manager.attach(source).unwrap();
/// assert!(listener.is_running());
/// listener.dispose();
/// ```
#[must_use = "dropping the listener detaches it from the key source"]
pub struct Listener {
    running: Arc<AtomicBool>,
}

impl Listener {
    pub(crate) fn new(running: Arc<AtomicBool>) -> Self {
        Self { running }
    }

    /// Check if the source is still delivering events.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop delivering events to the manager.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            log::debug!("Shortcut listener detached");
        }
    }

    /// Detach from the source and release the handle.
    pub fn dispose(self) {
        self.stop();
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.stop();
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A key source fed by the host through an [`mpsc`] channel.
///
/// Useful when key events come from a UI toolkit or terminal library. The
/// channel is one-way, so hosts that need to know whether an event was
/// handled should call [`ShortcutManager::handle_event`] directly instead.
///
/// [`ShortcutManager::handle_event`]: crate::ShortcutManager::handle_event
pub struct ChannelSource {
    rx: Receiver<KeyEvent>,
}

impl ChannelSource {
    /// Create a source along with the sender that feeds it.
    pub fn new() -> (Sender<KeyEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }

    pub fn from_receiver(rx: Receiver<KeyEvent>) -> Self {
        Self { rx }
    }
}

impl KeySource for ChannelSource {
    fn start(self, mut sink: EventSink, running: Arc<AtomicBool>) -> Result<()> {
        thread::Builder::new()
            .name("shortcut-channel".to_string())
            .spawn(move || {
                while running.load(Ordering::Relaxed) {
                    match self.rx.recv_timeout(POLL_INTERVAL) {
                        // Events that arrive after the listener was stopped are dropped
                        Ok(mut event) if running.load(Ordering::SeqCst) => sink(&mut event),
                        Ok(_) => {}
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => {
                            log::debug!("Key event channel closed, stopping listener");
                            running.store(false, Ordering::SeqCst);
                        }
                    }
                }
            })
            .context("Failed to spawn key event thread")?;
        Ok(())
    }
}

/// The system-wide keyboard: evdev on Linux, rdev on macOS.
///
/// Global events are observed, not intercepted, so marking one as handled
/// does not stop it from reaching other applications.
pub struct GlobalKeyboard {
    #[cfg(target_os = "linux")]
    inner: crate::linux::KeyboardSource,
    #[cfg(target_os = "macos")]
    inner: crate::macos::KeyboardSource,
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    #[allow(dead_code)]
    inner: (),
}

impl GlobalKeyboard {
    /// Open every keyboard device.
    ///
    /// The user must be able to read `/dev/input/event*`, which usually means
    /// membership of the `input` group.
    #[cfg(target_os = "linux")]
    pub fn new() -> Result<Self> {
        let keyboards = crate::linux::find_keyboards()?;
        Ok(Self {
            inner: crate::linux::KeyboardSource::new(keyboards),
        })
    }

    /// Prepare the rdev event tap.
    #[cfg(target_os = "macos")]
    pub fn new() -> Result<Self> {
        Ok(Self {
            inner: crate::macos::KeyboardSource::new(),
        })
    }

    /// Unsupported platform stub.
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    pub fn new() -> Result<Self> {
        anyhow::bail!("Global keyboard listening is not supported on this platform")
    }
}

impl KeySource for GlobalKeyboard {
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    fn start(self, sink: EventSink, running: Arc<AtomicBool>) -> Result<()> {
        self.inner.start(sink, running)
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    fn start(self, _sink: EventSink, _running: Arc<AtomicBool>) -> Result<()> {
        anyhow::bail!("Global keyboard listening is not supported on this platform")
    }
}

/// State change reported by a platform backend for one physical key.
#[cfg(any(target_os = "linux", target_os = "macos", test))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyAction {
    Press,
    Repeat,
    Release,
}

/// Modifier keys currently held down, tracked per physical key.
///
/// `K` identifies a physical key, so left and right variants of a modifier
/// (or the same modifier on two keyboards) are held independently.
#[cfg(any(target_os = "linux", target_os = "macos", test))]
#[derive(Debug, Clone)]
pub(crate) struct ModifierState<K> {
    held: Vec<(K, Modifier)>,
}

#[cfg(any(target_os = "linux", target_os = "macos", test))]
impl<K: PartialEq + Copy> ModifierState<K> {
    pub(crate) fn new() -> Self {
        Self { held: Vec::new() }
    }

    /// Record a modifier key change.
    pub(crate) fn update(&mut self, key: K, modifier: Modifier, action: KeyAction) {
        if action == KeyAction::Release {
            self.held.retain(|(k, _)| *k != key);
        } else if !self.held.iter().any(|(k, _)| *k == key) {
            self.held.push((key, modifier));
        }
    }

    /// Forget every held key, e.g. after the devices were reopened.
    #[cfg_attr(target_os = "macos", allow(dead_code))]
    pub(crate) fn clear(&mut self) {
        self.held.clear();
    }

    pub(crate) fn modifiers(&self) -> Modifiers {
        let mut modifiers = Modifiers::none();
        for &(_, modifier) in &self.held {
            modifiers.set(modifier, true);
        }
        modifiers
    }
}

/// Translate a physical key change into `keydown`/`keypress`/`keyup` events.
///
/// `keypress` is only produced for non-modifier keys.
#[cfg(any(target_os = "linux", target_os = "macos"))]
pub(crate) fn emit_key(
    sink: &mut EventSink,
    key_code: u32,
    modifiers: Modifiers,
    action: KeyAction,
    is_modifier: bool,
) {
    let repeat = action == KeyAction::Repeat;
    let types: &[EventType] = match action {
        KeyAction::Release => &[EventType::KeyUp],
        _ if is_modifier => &[EventType::KeyDown],
        _ => &[EventType::KeyDown, EventType::KeyPress],
    };
    for &event_type in types {
        let mut event = KeyEvent::new(event_type, key_code, modifiers);
        event.repeat = repeat;
        sink(&mut event);
        if event.default_prevented() {
            log::debug!(
                "Global {} for key code {} handled; it still reaches other applications",
                event_type,
                key_code
            );
        }
    }
}
