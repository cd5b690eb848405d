//! Shortcut registration and dispatch.

use crate::event::{EventType, KeyEvent, ShortcutEvent};
use crate::key::KeyCodeTable;
use crate::listener::{EventSink, GlobalKeyboard, KeySource, Listener};
use crate::registry::{IntoCallbacks, IntoDefinitions, Registry};
use anyhow::Result;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Builder for creating a shortcut manager.
#[derive(Debug, Default)]
pub struct ShortcutManagerBuilder {
    event_type: EventType,
    keys: Option<KeyCodeTable>,
}

impl ShortcutManagerBuilder {
    /// Create a new builder listening to `keydown` with the default key table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the key event stream to match against.
    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.event_type = event_type;
        self
    }

    /// Replace the key table.
    pub fn key_table(mut self, keys: KeyCodeTable) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Add a custom key name to the table.
    pub fn add_key(mut self, name: &str, code: u32) -> Self {
        self.keys
            .get_or_insert_with(KeyCodeTable::default)
            .insert(name, code);
        self
    }

    /// Build a manager that is not yet attached to any key source.
    pub fn build(self) -> ShortcutManager {
        ShortcutManager {
            shared: Arc::new(Shared {
                event_type: self.event_type,
                state: Mutex::new(State {
                    keys: self.keys.unwrap_or_default(),
                    registry: Registry::new(),
                }),
            }),
        }
    }

    /// Build the manager and attach it to the global keyboard.
    pub fn start(self) -> Result<(ShortcutManager, Listener)> {
        let manager = self.build();
        let listener = manager.attach(GlobalKeyboard::new()?)?;
        Ok((manager, listener))
    }
}

struct State {
    keys: KeyCodeTable,
    registry: Registry,
}

struct Shared {
    event_type: EventType,
    state: Mutex<State>,
}

/// Binds shortcut strings such as `"CTRL + SHIFT + A"` to callbacks.
///
/// Clones share the same registry and key table. Each key event is matched
/// against the registered shortcuts with the most modifiers first, and only
/// the first match fires.
///
/// # Example
///
/// ```
/// use shortcut_manager::{KeyEvent, Modifiers, ShortcutEvent, ShortcutManager};
///
/// let manager = ShortcutManager::default();
/// manager.register("CTRL + A", |event: &ShortcutEvent| {
///     println!("{} pressed", event.shortcut);
/// });
///
/// let mut event = KeyEvent::key_down(65, Modifiers::none().with_ctrl());
/// assert_eq!(manager.handle_event(&mut event).as_deref(), Some("CTRL+A"));
/// assert!(event.default_prevented());
/// ```
#[derive(Clone)]
pub struct ShortcutManager {
    shared: Arc<Shared>,
}

impl ShortcutManager {
    /// Create a manager matching the given event stream.
    pub fn new(event_type: EventType) -> Self {
        ShortcutManagerBuilder::new().event_type(event_type).build()
    }

    pub fn builder() -> ShortcutManagerBuilder {
        ShortcutManagerBuilder::new()
    }

    /// The event stream this manager matches against.
    pub fn event_type(&self) -> EventType {
        self.shared.event_type
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind every definition to every callback.
    ///
    /// Both arguments take either a single value or a sequence. Callbacks are
    /// appended after any already registered for the same definition, and the
    /// same callback may be registered more than once.
    pub fn register<D, C>(&self, definitions: D, callbacks: C)
    where
        D: IntoDefinitions,
        C: IntoCallbacks,
    {
        let definitions = definitions.into_definitions();
        let callbacks = callbacks.into_callbacks();
        self.lock().registry.register(definitions, callbacks);
    }

    /// Look up a key name in the key table.
    pub fn key_code(&self, name: &str) -> Option<u32> {
        self.lock().keys.get(name)
    }

    /// Add or replace a key name, returning the previous code if any.
    pub fn set_key_code(&self, name: &str, code: u32) -> Option<u32> {
        self.lock().keys.insert(name, code)
    }

    /// A copy of the current key table.
    pub fn key_table(&self) -> KeyCodeTable {
        self.lock().keys.clone()
    }

    /// Registered definitions with their callback counts, in registration order.
    pub fn definitions(&self) -> Vec<(String, usize)> {
        self.lock().registry.definitions()
    }

    /// Match a key event and run the callbacks of the winning shortcut.
    ///
    /// On a match the event is marked as handled and the canonical shortcut is
    /// returned. Events of a different type than the manager's are ignored.
    /// Shortcuts registered by a callback take effect from the next event.
    pub fn handle_event(&self, event: &mut KeyEvent) -> Option<String> {
        if event.event_type != self.shared.event_type {
            return None;
        }

        let (shortcut, callbacks) = {
            let state = self.lock();
            let (shortcut, callbacks) =
                state
                    .registry
                    .find(event.key_code, event.modifiers, &state.keys)?;
            (shortcut.canonical().to_string(), callbacks.to_vec())
        };

        event.prevent_default();
        log::debug!(
            "Shortcut {} matched key code {}, running {} callback(s)",
            shortcut,
            event.key_code,
            callbacks.len()
        );

        let payload = ShortcutEvent::from_key_event(event, &shortcut);
        for callback in &callbacks {
            callback(&payload);
        }
        Some(shortcut)
    }

    /// Start receiving events from `source`.
    ///
    /// Events keep flowing until the returned [`Listener`] is disposed or dropped.
    pub fn attach<S: KeySource>(&self, source: S) -> Result<Listener> {
        let running = Arc::new(AtomicBool::new(true));
        let manager = self.clone();
        let sink: EventSink = Box::new(move |event: &mut KeyEvent| {
            manager.handle_event(event);
        });
        source.start(sink, Arc::clone(&running))?;
        log::info!("Listening for {} shortcuts", self.shared.event_type);
        Ok(Listener::new(running))
    }
}

impl Default for ShortcutManager {
    fn default() -> Self {
        Self::new(EventType::default())
    }
}

impl std::fmt::Debug for ShortcutManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ShortcutManager")
            .field("event_type", &self.shared.event_type)
            .field("registry", &state.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::ChannelSource;
    use crate::registry::Callback;
    use crate::shortcut::Modifiers;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    type Log = Arc<Mutex<Vec<String>>>;

    fn record(log: &Log, label: &'static str) -> Callback {
        let log = Arc::clone(log);
        Arc::new(move |event: &ShortcutEvent| {
            log.lock()
                .unwrap()
                .push(format!("{}:{}", label, event.shortcut));
        })
    }

    fn press(manager: &ShortcutManager, code: u32, modifiers: Modifiers) -> KeyEvent {
        let mut event = KeyEvent::key_down(code, modifiers);
        manager.handle_event(&mut event);
        event
    }

    #[test]
    fn test_single_key_fires_once() {
        let manager = ShortcutManager::default();
        let log = Log::default();
        manager.register("A", record(&log, "a"));

        let event = press(&manager, 65, Modifiers::none());
        assert!(event.default_prevented());
        assert_eq!(*log.lock().unwrap(), vec!["a:A"]);
    }

    #[test]
    fn test_payload_carries_event_data() {
        let manager = ShortcutManager::default();
        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        manager.register("alt + f4", move |event: &ShortcutEvent| {
            *slot.lock().unwrap() = Some(event.clone());
        });

        let mut event = KeyEvent::key_down(115, Modifiers::none().with_alt()).repeated();
        manager.handle_event(&mut event);

        let payload = seen.lock().unwrap().clone().unwrap();
        assert_eq!(payload.shortcut, "ALT+F4");
        assert_eq!(payload.key_code, 115);
        assert!(payload.modifiers.alt);
        assert!(payload.repeat);
        assert_eq!(payload.event_type, EventType::KeyDown);
    }

    #[test]
    fn test_callbacks_fire_in_registration_order() {
        let manager = ShortcutManager::default();
        let log = Log::default();
        manager.register("CTRL+A", vec![record(&log, "first"), record(&log, "second")]);
        manager.register("ctrl + a", record(&log, "third"));

        press(&manager, 65, Modifiers::none().with_ctrl());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:CTRL+A", "second:CTRL+A", "third:CTRL+A"]
        );
    }

    #[test]
    fn test_same_callback_registered_twice_fires_twice() {
        let manager = ShortcutManager::default();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let callback: Callback = Arc::new(move |_: &ShortcutEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        manager.register("SPACE", [callback.clone(), callback]);

        press(&manager, 32, Modifiers::none());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_one_callback_many_definitions() {
        let manager = ShortcutManager::default();
        let log = Log::default();
        manager.register(["A", "ESCAPE"], record(&log, "cb"));

        press(&manager, 27, Modifiers::none());
        press(&manager, 65, Modifiers::none());
        assert_eq!(*log.lock().unwrap(), vec!["cb:ESCAPE", "cb:A"]);
    }

    #[test]
    fn test_more_specific_shortcut_wins() {
        let manager = ShortcutManager::default();
        let log = Log::default();
        manager.register("CTRL+A", record(&log, "short"));
        manager.register("CTRL+SHIFT+A", record(&log, "long"));

        press(&manager, 65, Modifiers::none().with_ctrl().with_shift());
        assert_eq!(*log.lock().unwrap(), vec!["long:CTRL+SHIFT+A"]);

        press(&manager, 65, Modifiers::none().with_ctrl());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["long:CTRL+SHIFT+A", "short:CTRL+A"]
        );
    }

    #[test]
    fn test_extra_held_modifier_still_matches() {
        // Only the modifiers named in the shortcut are checked.
        let manager = ShortcutManager::default();
        let log = Log::default();
        manager.register("CTRL+A", record(&log, "cb"));

        let event = press(&manager, 65, Modifiers::none().with_ctrl().with_shift());
        assert!(event.default_prevented());
        assert_eq!(*log.lock().unwrap(), vec!["cb:CTRL+A"]);
    }

    #[test]
    fn test_missing_modifier_does_not_match() {
        let manager = ShortcutManager::default();
        let log = Log::default();
        manager.register("CTRL+SHIFT+A", record(&log, "cb"));

        let event = press(&manager, 65, Modifiers::none().with_ctrl());
        assert!(!event.default_prevented());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unmatched_event_passes_through() {
        let manager = ShortcutManager::default();
        let log = Log::default();
        manager.register("A", record(&log, "cb"));

        let mut event = KeyEvent::key_down(66, Modifiers::none());
        assert_eq!(manager.handle_event(&mut event), None);
        assert!(!event.default_prevented());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_other_event_types_ignored() {
        let manager = ShortcutManager::new(EventType::KeyUp);
        let log = Log::default();
        manager.register("A", record(&log, "cb"));

        let event = press(&manager, 65, Modifiers::none());
        assert!(!event.default_prevented());
        let mut up = KeyEvent::new(EventType::KeyUp, 65, Modifiers::none());
        assert_eq!(manager.handle_event(&mut up).as_deref(), Some("A"));
        assert_eq!(*log.lock().unwrap(), vec!["cb:A"]);
    }

    #[test]
    fn test_registration_between_events_is_seen() {
        let manager = ShortcutManager::default();
        let log = Log::default();

        press(&manager, 27, Modifiers::none());
        manager.register("escape", record(&log, "cb"));
        press(&manager, 27, Modifiers::none());
        assert_eq!(*log.lock().unwrap(), vec!["cb:ESCAPE"]);
    }

    #[test]
    fn test_callback_may_register_for_next_event() {
        let manager = ShortcutManager::default();
        let log = Log::default();
        let inner = manager.clone();
        let late = record(&log, "late");
        manager.register("A", move |_: &ShortcutEvent| {
            inner.register("A", late.clone());
        });

        press(&manager, 65, Modifiers::none());
        assert!(log.lock().unwrap().is_empty());
        press(&manager, 65, Modifiers::none());
        assert_eq!(*log.lock().unwrap(), vec!["late:A"]);
    }

    #[test]
    fn test_unknown_names_never_fire() {
        let manager = ShortcutManager::default();
        let log = Log::default();
        manager.register(vec!["HYPER+A", "CTRL+NOPE", ""], record(&log, "cb"));

        for code in 0..256 {
            let all = Modifiers::none().with_ctrl().with_alt().with_shift().with_meta();
            press(&manager, code, all);
        }
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(manager.definitions().len(), 3);
    }

    #[test]
    fn test_custom_key_name() {
        let manager = ShortcutManager::builder().add_key("semicolon", 186).build();
        let log = Log::default();
        manager.register("ctrl+semicolon", record(&log, "cb"));
        manager.set_key_code("BACKQUOTE", 192);
        manager.register("BACKQUOTE", record(&log, "cb"));

        press(&manager, 186, Modifiers::none().with_ctrl());
        press(&manager, 192, Modifiers::none());
        assert_eq!(manager.key_code("Semicolon"), Some(186));
        assert_eq!(manager.key_code("A"), Some(65));
        assert_eq!(*log.lock().unwrap(), vec!["cb:CTRL+SEMICOLON", "cb:BACKQUOTE"]);
    }

    #[test]
    fn test_definitions_introspection() {
        let manager = ShortcutManager::default();
        manager.register(["ctrl+s", "A"], |_: &ShortcutEvent| {});
        manager.register("ctrl + s", |_: &ShortcutEvent| {});
        assert_eq!(
            manager.definitions(),
            vec![("CTRL+S".to_string(), 2), ("A".to_string(), 1)]
        );
        assert!(format!("{:?}", manager).contains("\"CTRL+S\": 2"));
    }

    #[test]
    fn test_attach_and_dispose() {
        let manager = ShortcutManager::default();
        let (fired_tx, fired_rx) = mpsc::channel();
        let fired_tx = Mutex::new(fired_tx);
        manager.register("A", move |event: &ShortcutEvent| {
            let _ = fired_tx.lock().unwrap().send(event.shortcut.clone());
        });

        let (tx, source) = ChannelSource::new();
        let listener = manager.attach(source).unwrap();
        tx.send(KeyEvent::key_down(65, Modifiers::none())).unwrap();
        assert_eq!(
            fired_rx.recv_timeout(Duration::from_secs(2)).unwrap(),
            "A"
        );

        listener.dispose();
        // The channel closes once the source thread has exited.
        let deadline = Instant::now() + Duration::from_secs(2);
        while tx.send(KeyEvent::key_down(65, Modifiers::none())).is_ok() {
            assert!(Instant::now() < deadline, "source thread still running");
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(fired_rx.try_recv().is_err());
    }

    #[test]
    fn test_event_type_accessor() {
        assert_eq!(ShortcutManager::default().event_type(), EventType::KeyDown);
        let manager = ShortcutManager::builder()
            .event_type(EventType::KeyPress)
            .build();
        assert_eq!(manager.event_type(), EventType::KeyPress);
    }

    #[test]
    fn test_builder_replaces_key_table() {
        let mut keys = KeyCodeTable::empty();
        keys.insert("PLAY", 250);
        let manager = ShortcutManager::builder().key_table(keys).build();
        let log = Log::default();
        manager.register(["PLAY", "A"], record(&log, "cb"));

        press(&manager, 250, Modifiers::none());
        press(&manager, 65, Modifiers::none());
        assert_eq!(manager.key_code("A"), None);
        assert_eq!(*log.lock().unwrap(), vec!["cb:PLAY"]);
    }

    #[test]
    fn test_key_table_is_a_snapshot() {
        let manager = ShortcutManager::default();
        manager.set_key_code("SEMICOLON", 186);

        let mut keys = manager.key_table();
        assert_eq!(keys.get("SEMICOLON"), Some(186));
        assert_eq!(keys.get("ESCAPE"), Some(27));

        keys.insert("BACKQUOTE", 192);
        assert_eq!(manager.key_code("BACKQUOTE"), None);
    }
}
