//! Shortcut registry and the priority matcher.

use crate::event::ShortcutEvent;
use crate::key::KeyCodeTable;
use crate::shortcut::{Modifier, Modifiers, Shortcut};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A function invoked when its shortcut fires.
pub type Callback = Arc<dyn Fn(&ShortcutEvent) + Send + Sync>;

/// One or more shortcut definitions accepted by `register`.
pub trait IntoDefinitions {
    fn into_definitions(self) -> Vec<String>;
}

impl IntoDefinitions for &str {
    fn into_definitions(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoDefinitions for String {
    fn into_definitions(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoDefinitions for &String {
    fn into_definitions(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl IntoDefinitions for &[&str] {
    fn into_definitions(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl<const N: usize> IntoDefinitions for [&str; N] {
    fn into_definitions(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl IntoDefinitions for Vec<&str> {
    fn into_definitions(self) -> Vec<String> {
        self.into_iter().map(String::from).collect()
    }
}

impl IntoDefinitions for Vec<String> {
    fn into_definitions(self) -> Vec<String> {
        self
    }
}

impl IntoDefinitions for &[String] {
    fn into_definitions(self) -> Vec<String> {
        self.to_vec()
    }
}

/// One or more callbacks accepted by `register`.
pub trait IntoCallbacks {
    fn into_callbacks(self) -> Vec<Callback>;
}

impl<F> IntoCallbacks for F
where
    F: Fn(&ShortcutEvent) + Send + Sync + 'static,
{
    fn into_callbacks(self) -> Vec<Callback> {
        let callback: Callback = Arc::new(self);
        vec![callback]
    }
}

impl IntoCallbacks for Callback {
    fn into_callbacks(self) -> Vec<Callback> {
        vec![self]
    }
}

impl IntoCallbacks for Vec<Callback> {
    fn into_callbacks(self) -> Vec<Callback> {
        self
    }
}

impl<const N: usize> IntoCallbacks for [Callback; N] {
    fn into_callbacks(self) -> Vec<Callback> {
        self.into_iter().collect()
    }
}

struct Entry {
    shortcut: Shortcut,
    callbacks: Vec<Callback>,
}

/// Canonical shortcut definitions mapped to their callbacks.
///
/// Entries are kept in the order they were first registered; that order also
/// breaks ties between candidates of equal priority.
#[derive(Default)]
pub struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `callbacks` to every definition, creating missing entries.
    pub fn register(&mut self, definitions: Vec<String>, callbacks: Vec<Callback>) {
        for definition in definitions {
            let shortcut = Shortcut::parse(&definition);
            match self
                .entries
                .iter_mut()
                .find(|e| e.shortcut.canonical() == shortcut.canonical())
            {
                Some(entry) => entry.callbacks.extend(callbacks.iter().cloned()),
                None => {
                    log::debug!("Registered shortcut {}", shortcut);
                    self.entries.push(Entry {
                        shortcut,
                        callbacks: callbacks.clone(),
                    });
                }
            }
        }
    }

    /// Callbacks registered for a canonical definition.
    pub fn callbacks(&self, canonical: &str) -> Option<&[Callback]> {
        self.entries
            .iter()
            .find(|e| e.shortcut.canonical() == canonical)
            .map(|e| e.callbacks.as_slice())
    }

    /// `(canonical, callback count)` for every entry, in registration order.
    pub fn definitions(&self) -> Vec<(String, usize)> {
        self.entries
            .iter()
            .map(|e| (e.shortcut.canonical().to_string(), e.callbacks.len()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the highest-priority shortcut matching a key code and modifier state.
    ///
    /// Candidates are grouped by token count and examined from the largest
    /// group down; the first candidate whose terminal key has `key_code` and
    /// whose modifiers are all held wins. Extra held modifiers do not prevent
    /// a match.
    pub fn find(
        &self,
        key_code: u32,
        modifiers: Modifiers,
        keys: &KeyCodeTable,
    ) -> Option<(&Shortcut, &[Callback])> {
        let mut priorities: BTreeMap<usize, Vec<&Entry>> = BTreeMap::new();
        for entry in &self.entries {
            priorities
                .entry(entry.shortcut.priority())
                .or_default()
                .push(entry);
        }

        for (_, candidates) in priorities.range(1..).rev() {
            for &entry in candidates {
                if keys.get(entry.shortcut.terminal()) != Some(key_code) {
                    continue;
                }
                if entry
                    .shortcut
                    .modifier_tokens()
                    .iter()
                    .all(|token| modifier_held(modifiers, token))
                {
                    return Some((&entry.shortcut, entry.callbacks.as_slice()));
                }
            }
        }
        None
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.entries
                    .iter()
                    .map(|e| (e.shortcut.canonical(), e.callbacks.len())),
            )
            .finish()
    }
}

fn modifier_held(modifiers: Modifiers, token: &str) -> bool {
    match Modifier::from_token(token) {
        Some(modifier) => modifiers.is_held(modifier),
        None => {
            log::warn!("Unknown shortcut modifier: {}", token);
            false
        }
    }
}
