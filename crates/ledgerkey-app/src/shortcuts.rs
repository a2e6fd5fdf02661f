// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Scoped chord dispatch. Bindings carry an action value instead of a callback;
//! the owner of the registry executes the action it gets back, synchronously,
//! inside the same key handler.

use tracing::warn;

use crate::{InteractionError, KeyPress};

/// Dispatch priority. Later variants win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScopeKind {
    Global,
    Form,
    Field,
    Modal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub kind: ScopeKind,
    pub name: String,
    /// Dispatch does not look past an exclusive scope.
    pub exclusive: bool,
}

impl Scope {
    fn new(kind: ScopeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            exclusive: false,
        }
    }

    pub fn global(name: impl Into<String>) -> Self {
        Self::new(ScopeKind::Global, name)
    }

    pub fn form(name: impl Into<String>) -> Self {
        Self::new(ScopeKind::Form, name)
    }

    pub fn field(name: impl Into<String>) -> Self {
        Self::new(ScopeKind::Field, name)
    }

    pub fn modal(name: impl Into<String>) -> Self {
        Self::new(ScopeKind::Modal, name)
    }

    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutBinding<A> {
    pub chord: String,
    pub description: String,
    pub action: A,
    pub prevent_default: bool,
}

impl<A> ShortcutBinding<A> {
    pub fn new(chord: &str, description: impl Into<String>, action: A) -> Self {
        Self {
            chord: normalize_chord(chord),
            description: description.into(),
            action,
            prevent_default: true,
        }
    }

    /// After the action runs, the key still reaches the focused field as typing.
    pub fn allow_default(mut self) -> Self {
        self.prevent_default = false;
        self
    }
}

/// Teardown token returned by [`ShortcutRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use = "a scope must be torn down when its region goes away"]
pub struct ScopeHandle(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpEntry {
    pub combo: String,
    pub description: String,
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch<A> {
    Handled {
        action: A,
        prevent_default: bool,
        scope: String,
    },
    PassThrough,
}

impl<A> Dispatch<A> {
    pub fn action(self) -> Option<A> {
        match self {
            Self::Handled { action, .. } => Some(action),
            Self::PassThrough => None,
        }
    }
}

#[derive(Debug, Clone)]
struct RegisteredScope<A> {
    handle: u64,
    scope: Scope,
    bindings: Vec<ShortcutBinding<A>>,
}

#[derive(Debug, Clone)]
pub struct ShortcutRegistry<A> {
    scopes: Vec<RegisteredScope<A>>,
    catalogue: Vec<HelpEntry>,
    next_handle: u64,
}

impl<A> Default for ShortcutRegistry<A> {
    fn default() -> Self {
        Self {
            scopes: Vec::new(),
            catalogue: Vec::new(),
            next_handle: 1,
        }
    }
}

impl<A: Clone> ShortcutRegistry<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `bindings` for the lifetime of one UI region. A chord already
    /// bound under the same scope name is a registration bug: debug builds
    /// reject the whole set, release builds keep the first binding and log.
    pub fn register(
        &mut self,
        bindings: Vec<ShortcutBinding<A>>,
        scope: Scope,
    ) -> Result<ScopeHandle, InteractionError> {
        let mut accepted: Vec<ShortcutBinding<A>> = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let taken = accepted.iter().any(|other| other.chord == binding.chord)
                || self.is_bound_in(&scope.name, &binding.chord);
            if !taken {
                accepted.push(binding);
                continue;
            }
            if cfg!(debug_assertions) {
                return Err(InteractionError::DuplicateRegistration {
                    chord: binding.chord,
                    scope: scope.name,
                });
            }
            warn!(
                chord = %binding.chord,
                scope = %scope.name,
                "duplicate shortcut registration dropped"
            );
        }

        for binding in &accepted {
            let listed = self
                .catalogue
                .iter()
                .any(|entry| entry.combo == binding.chord && entry.scope == scope.name);
            if !listed {
                self.catalogue.push(HelpEntry {
                    combo: binding.chord.clone(),
                    description: binding.description.clone(),
                    scope: scope.name.clone(),
                });
            }
        }

        let handle = self.next_handle;
        self.next_handle += 1;
        self.scopes.push(RegisteredScope {
            handle,
            scope,
            bindings: accepted,
        });
        Ok(ScopeHandle(handle))
    }

    /// Detaches a scope and drops the help entries only it provided. Returns
    /// false when the handle was already torn down.
    pub fn teardown(&mut self, handle: ScopeHandle) -> bool {
        let Some(position) = self.scopes.iter().position(|entry| entry.handle == handle.0) else {
            return false;
        };
        let removed = self.scopes.remove(position);
        let scope_name = removed.scope.name;
        for binding in removed.bindings {
            if !self.is_bound_in(&scope_name, &binding.chord) {
                self.catalogue
                    .retain(|entry| !(entry.combo == binding.chord && entry.scope == scope_name));
            }
        }
        true
    }

    pub fn dispatch(&self, press: &KeyPress) -> Dispatch<A> {
        match press.chord() {
            Some(chord) => self.dispatch_chord(&chord),
            None => Dispatch::PassThrough,
        }
    }

    /// Innermost scope first: higher kind, then most recently registered.
    pub fn dispatch_chord(&self, chord: &str) -> Dispatch<A> {
        let mut ordered: Vec<&RegisteredScope<A>> = self.scopes.iter().collect();
        ordered.sort_by(|left, right| {
            right
                .scope
                .kind
                .cmp(&left.scope.kind)
                .then(right.handle.cmp(&left.handle))
        });

        for entry in ordered {
            if let Some(binding) = entry.bindings.iter().find(|binding| binding.chord == chord) {
                return Dispatch::Handled {
                    action: binding.action.clone(),
                    prevent_default: binding.prevent_default,
                    scope: entry.scope.name.clone(),
                };
            }
            if entry.scope.exclusive {
                break;
            }
        }
        Dispatch::PassThrough
    }

    pub fn catalogue(&self) -> &[HelpEntry] {
        &self.catalogue
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_active(&self, handle: ScopeHandle) -> bool {
        self.scopes.iter().any(|entry| entry.handle == handle.0)
    }

    fn is_bound_in(&self, scope_name: &str, chord: &str) -> bool {
        self.scopes.iter().any(|entry| {
            entry.scope.name == scope_name
                && entry.bindings.iter().any(|binding| binding.chord == chord)
        })
    }
}

/// Rewrites a hand-written chord (`Cmd+Shift+K`, `alt+D`) into the order and
/// spelling [`KeyPress::chord`] produces.
pub fn normalize_chord(raw: &str) -> String {
    let raw = raw.trim();
    let (modifier_part, key) = match raw.rsplit_once('+') {
        Some((mods, "")) => (mods.strip_suffix('+').unwrap_or(mods), "+"),
        Some((mods, key)) => (mods, key),
        None => ("", raw),
    };

    let (mut ctrl, mut alt, mut shift) = (false, false, false);
    for token in modifier_part.split('+').filter(|token| !token.is_empty()) {
        match token.to_ascii_lowercase().as_str() {
            "ctrl" | "control" | "cmd" | "command" | "meta" | "mod" | "super" => ctrl = true,
            "alt" | "opt" | "option" => alt = true,
            "shift" => shift = true,
            _ => {}
        }
    }

    let mut chord = String::new();
    if ctrl {
        chord.push_str("ctrl+");
    }
    if alt {
        chord.push_str("alt+");
    }
    if shift {
        chord.push_str("shift+");
    }
    chord.push_str(&key.to_lowercase());
    chord
}
