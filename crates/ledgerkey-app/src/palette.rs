// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::KeyPress;

pub const PALETTE_CHORD: &str = "ctrl+k";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteCommand<A> {
    pub id: &'static str,
    pub label: String,
    pub group: &'static str,
    pub action: A,
}

impl<A> PaletteCommand<A> {
    pub fn new(id: &'static str, label: impl Into<String>, group: &'static str, action: A) -> Self {
        Self {
            id,
            label: label.into(),
            group,
            action,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteOutcome<A> {
    Opened,
    Closed,
    Updated,
    /// The palette is already closed; run the action.
    Run(A),
}

/// Jump-to-anywhere overlay over a fixed catalogue. While open it consumes
/// every key it is handed.
#[derive(Debug, Clone)]
pub struct CommandPalette<A> {
    commands: Vec<PaletteCommand<A>>,
    open: bool,
    query: String,
    selected: usize,
}

impl<A: Clone> CommandPalette<A> {
    pub fn new(commands: Vec<PaletteCommand<A>>) -> Self {
        Self {
            commands,
            open: false,
            query: String::new(),
            selected: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn toggle(&mut self) -> PaletteOutcome<A> {
        if self.open {
            self.close();
            PaletteOutcome::Closed
        } else {
            self.open = true;
            self.query.clear();
            self.selected = 0;
            PaletteOutcome::Opened
        }
    }

    pub fn close(&mut self) {
        self.open = false;
        self.query.clear();
        self.selected = 0;
    }

    /// Label or group contains the query, ignoring case.
    pub fn matches(&self) -> Vec<&PaletteCommand<A>> {
        let needle = self.query.to_lowercase();
        self.commands
            .iter()
            .filter(|command| {
                needle.is_empty()
                    || command.label.to_lowercase().contains(&needle)
                    || command.group.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn handle_key(&mut self, press: &KeyPress) -> PaletteOutcome<A> {
        if !self.open {
            return PaletteOutcome::Updated;
        }
        let chord = press.chord();
        match chord.as_deref() {
            Some(PALETTE_CHORD) | Some("escape") => {
                self.close();
                PaletteOutcome::Closed
            }
            Some("arrowdown") => {
                let count = self.matches().len();
                self.selected = (self.selected + 1).min(count.saturating_sub(1));
                PaletteOutcome::Updated
            }
            Some("arrowup") => {
                self.selected = self.selected.saturating_sub(1);
                PaletteOutcome::Updated
            }
            Some("enter") => {
                let action = self
                    .matches()
                    .get(self.selected)
                    .map(|command| command.action.clone());
                self.close();
                match action {
                    Some(action) => PaletteOutcome::Run(action),
                    None => PaletteOutcome::Closed,
                }
            }
            Some("backspace") => {
                self.query.pop();
                self.selected = 0;
                PaletteOutcome::Updated
            }
            _ => {
                if let Some(ch) = press.text() {
                    self.query.push(ch);
                    self.selected = 0;
                }
                PaletteOutcome::Updated
            }
        }
    }
}
