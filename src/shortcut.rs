//! Shortcut definitions and modifier keys.

/// A modifier key that can prefix a shortcut's terminal key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
    Meta,
}

impl Modifier {
    /// Recognize an uppercase modifier token such as `"CTRL"`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "CTRL" => Some(Modifier::Ctrl),
            "ALT" => Some(Modifier::Alt),
            "SHIFT" => Some(Modifier::Shift),
            "META" => Some(Modifier::Meta),
            _ => None,
        }
    }
}

impl std::fmt::Display for Modifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modifier::Ctrl => write!(f, "CTRL"),
            Modifier::Alt => write!(f, "ALT"),
            Modifier::Shift => write!(f, "SHIFT"),
            Modifier::Meta => write!(f, "META"),
        }
    }
}

/// Modifier keys held while a key event fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    /// No modifiers held.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_ctrl(self) -> Self {
        Self { ctrl: true, ..self }
    }

    pub fn with_alt(self) -> Self {
        Self { alt: true, ..self }
    }

    pub fn with_shift(self) -> Self {
        Self { shift: true, ..self }
    }

    pub fn with_meta(self) -> Self {
        Self { meta: true, ..self }
    }

    /// Whether the given modifier is held.
    pub fn is_held(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Ctrl => self.ctrl,
            Modifier::Alt => self.alt,
            Modifier::Shift => self.shift,
            Modifier::Meta => self.meta,
        }
    }

    /// Mark a modifier as held or released.
    pub fn set(&mut self, modifier: Modifier, held: bool) {
        match modifier {
            Modifier::Ctrl => self.ctrl = held,
            Modifier::Alt => self.alt = held,
            Modifier::Shift => self.shift = held,
            Modifier::Meta => self.meta = held,
        }
    }
}

/// A normalized shortcut definition: uppercase tokens, terminal key last.
///
/// Tokens keep the order they were written in, so `"SHIFT+CTRL+A"` and
/// `"CTRL+SHIFT+A"` are different definitions even though they match the
/// same key events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shortcut {
    tokens: Vec<String>,
    canonical: String,
}

impl Shortcut {
    /// Normalize a shortcut string like `"ctrl + shift + a"`.
    ///
    /// Parsing never fails. Unknown key names or stray separators produce a
    /// shortcut that simply never matches a real key event.
    pub fn parse(s: &str) -> Self {
        let tokens: Vec<String> = s.split('+').map(|t| t.trim().to_uppercase()).collect();
        let canonical = tokens.join("+");
        Self { tokens, canonical }
    }

    /// The canonical `+`-joined form used as the registry key.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// The key that completes the shortcut (always the last token).
    pub fn terminal(&self) -> &str {
        self.tokens.last().map(String::as_str).unwrap_or("")
    }

    /// Every token before the terminal key.
    pub fn modifier_tokens(&self) -> &[String] {
        &self.tokens[..self.tokens.len().saturating_sub(1)]
    }

    /// Number of tokens; shortcuts with more modifiers win over shorter ones.
    pub fn priority(&self) -> usize {
        self.tokens.len()
    }
}

impl std::fmt::Display for Shortcut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical)
    }
}

/// Canonicalize a shortcut string: split on `+`, trim, uppercase, rejoin.
pub fn normalize(s: &str) -> String {
    Shortcut::parse(s).canonical
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_simple_key() {
        assert_eq!(normalize("a"), "A");
        assert_eq!(normalize("ESCAPE"), "ESCAPE");
    }

    #[test]
    fn test_normalize_case_and_whitespace_variants() {
        let expected = "CTRL+SHIFT+A";
        for variant in ["CTRL+SHIFT+A", "ctrl + shift + a", "Ctrl+Shift + a", "  ctrl  +shift+A "] {
            assert_eq!(normalize(variant), expected, "variant {:?}", variant);
        }
    }

    #[test]
    fn test_normalize_preserves_order() {
        assert_eq!(normalize("shift+ctrl+a"), "SHIFT+CTRL+A");
        assert_ne!(normalize("shift+ctrl+a"), normalize("ctrl+shift+a"));
    }

    #[test]
    fn test_normalize_does_not_deduplicate() {
        assert_eq!(normalize("ctrl+ctrl+a"), "CTRL+CTRL+A");
    }

    #[test]
    fn test_normalize_malformed() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("ctrl+"), "CTRL+");
        assert_eq!(normalize("+a"), "+A");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("alt + meta + f4");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_parse_parts() {
        let shortcut = Shortcut::parse("Ctrl + Alt + Delete");
        assert_eq!(shortcut.canonical(), "CTRL+ALT+DELETE");
        assert_eq!(shortcut.terminal(), "DELETE");
        assert_eq!(shortcut.modifier_tokens(), ["CTRL", "ALT"]);
        assert_eq!(shortcut.priority(), 3);
        assert_eq!(shortcut.to_string(), "CTRL+ALT+DELETE");
    }

    #[test]
    fn test_parse_without_modifiers() {
        let shortcut = Shortcut::parse("space");
        assert_eq!(shortcut.terminal(), "SPACE");
        assert!(shortcut.modifier_tokens().is_empty());
        assert_eq!(shortcut.priority(), 1);
    }

    #[test]
    fn test_modifier_from_token() {
        assert_eq!(Modifier::from_token("CTRL"), Some(Modifier::Ctrl));
        assert_eq!(Modifier::from_token("META"), Some(Modifier::Meta));
        assert_eq!(Modifier::from_token("ctrl"), None);
        assert_eq!(Modifier::from_token("HYPER"), None);
    }

    #[test]
    fn test_modifiers_is_held() {
        let mods = Modifiers::none().with_ctrl().with_shift();
        assert!(mods.is_held(Modifier::Ctrl));
        assert!(mods.is_held(Modifier::Shift));
        assert!(!mods.is_held(Modifier::Alt));
        assert!(!mods.is_held(Modifier::Meta));
    }

    #[test]
    fn test_modifiers_set() {
        let mut mods = Modifiers::none();
        mods.set(Modifier::Meta, true);
        assert!(mods.meta);
        mods.set(Modifier::Meta, false);
        assert_eq!(mods, Modifiers::none());
    }
}
