// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Frontend-neutral key presses and their normalized chord strings.

const MODIFIER_KEYS: [&str; 9] = [
    "control", "ctrl", "shift", "alt", "altgraph", "meta", "super", "os", "hyper",
];

/// One key-down as reported by a frontend. `key` uses DOM-style names
/// (`Enter`, `ArrowDown`, `Escape`, `F4`, `a`, `?`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl KeyPress {
    pub fn named(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl: false,
            alt: false,
            shift: false,
            meta: false,
        }
    }

    pub fn char(ch: char) -> Self {
        Self::named(ch.to_string())
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn is_modifier(&self) -> bool {
        let lowered = self.key.to_ascii_lowercase();
        MODIFIER_KEYS.contains(&lowered.as_str())
    }

    /// The printable character this press types into a text input, if any.
    pub fn text(&self) -> Option<char> {
        if self.ctrl || self.alt || self.meta {
            return None;
        }
        let mut chars = self.key.chars();
        let ch = chars.next()?;
        if chars.next().is_some() || ch.is_control() {
            return None;
        }
        Some(ch)
    }

    /// Normalized chord: `ctrl+`, `alt+`, `shift+` in that order, then the
    /// lowercased key name. Meta folds into `ctrl`. Shift is left out for
    /// punctuation whose shifted form is already the key itself (`?`).
    /// Modifier-only presses yield `None`.
    pub fn chord(&self) -> Option<String> {
        if self.key.is_empty() || self.is_modifier() {
            return None;
        }

        let key = match self.key.as_str() {
            " " => "space".to_owned(),
            other => other.to_lowercase(),
        };
        let shift_is_baked_in = {
            let mut chars = self.key.chars();
            matches!((chars.next(), chars.next()), (Some(ch), None) if !ch.is_alphanumeric() && ch != ' ')
        };

        let mut chord = String::new();
        if self.ctrl || self.meta {
            chord.push_str("ctrl+");
        }
        if self.alt {
            chord.push_str("alt+");
        }
        if self.shift && !shift_is_baked_in {
            chord.push_str("shift+");
        }
        chord.push_str(&key);
        Some(chord)
    }
}

#[cfg(test)]
mod tests {
    use super::KeyPress;

    #[test]
    fn modifiers_render_in_fixed_order() {
        let press = KeyPress::char('S').shift().alt().ctrl();
        assert_eq!(press.chord().as_deref(), Some("ctrl+alt+shift+s"));
    }

    #[test]
    fn meta_folds_into_ctrl() {
        assert_eq!(KeyPress::char('s').meta().chord().as_deref(), Some("ctrl+s"));
        assert_eq!(
            KeyPress::char('k').meta().ctrl().chord().as_deref(),
            Some("ctrl+k")
        );
    }

    #[test]
    fn modifier_only_presses_produce_no_chord() {
        assert_eq!(KeyPress::named("Control").ctrl().chord(), None);
        assert_eq!(KeyPress::named("Shift").shift().chord(), None);
        assert_eq!(KeyPress::named("Meta").chord(), None);
    }

    #[test]
    fn named_keys_are_lowercased() {
        assert_eq!(KeyPress::named("ArrowDown").chord().as_deref(), Some("arrowdown"));
        assert_eq!(KeyPress::named("F8").ctrl().chord().as_deref(), Some("ctrl+f8"));
        assert_eq!(KeyPress::named("F2").alt().chord().as_deref(), Some("alt+f2"));
        assert_eq!(KeyPress::char(' ').chord().as_deref(), Some("space"));
    }

    #[test]
    fn shifted_punctuation_keeps_its_own_name() {
        assert_eq!(KeyPress::char('?').shift().chord().as_deref(), Some("?"));
        assert_eq!(KeyPress::named("Tab").shift().chord().as_deref(), Some("shift+tab"));
    }

    #[test]
    fn text_ignores_command_chords() {
        assert_eq!(KeyPress::char('a').text(), Some('a'));
        assert_eq!(KeyPress::char('a').ctrl().text(), None);
        assert_eq!(KeyPress::named("Enter").text(), None);
    }
}
