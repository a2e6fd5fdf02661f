// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: i64,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: i64, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
        }
    }
}

/// What the owner of a combobox must do after a key was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComboSignal {
    Ignored,
    Opened,
    Closed,
    QueryChanged,
    HighlightMoved(usize),
    /// The value is already committed; the field should now advance.
    CommitThenAdvance(SelectOption),
    /// Leave the field by normal traversal, with a value if one was committed.
    TabOut(Option<SelectOption>),
    /// Open a create dialog seeded with the typed query.
    Create { query: String },
}

/// Typeahead select over a static option list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComboboxState {
    options: Vec<SelectOption>,
    filtered: Vec<usize>,
    open: bool,
    query: String,
    highlight: usize,
    committed: Option<SelectOption>,
}

impl ComboboxState {
    pub fn new(options: Vec<SelectOption>) -> Self {
        let mut state = Self {
            options,
            ..Self::default()
        };
        state.refilter();
        state
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn highlight(&self) -> usize {
        self.highlight
    }

    pub fn committed(&self) -> Option<&SelectOption> {
        self.committed.as_ref()
    }

    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    /// Text shown in the input. Closed, it is always the committed label.
    pub fn display_text(&self) -> &str {
        if self.open {
            &self.query
        } else {
            self.committed
                .as_ref()
                .map(|option| option.label.as_str())
                .unwrap_or("")
        }
    }

    pub fn filtered(&self) -> Vec<&SelectOption> {
        self.filtered
            .iter()
            .filter_map(|index| self.options.get(*index))
            .collect()
    }

    pub fn highlighted(&self) -> Option<&SelectOption> {
        self.filtered
            .get(self.highlight)
            .and_then(|index| self.options.get(*index))
    }

    /// Swaps in a refreshed option list. The committed value survives even
    /// when the new list no longer carries it.
    pub fn set_options(&mut self, options: Vec<SelectOption>) {
        self.options = options;
        self.refilter();
        self.highlight = self.highlight.min(self.filtered.len().saturating_sub(1));
    }

    /// Commits a value chosen outside the list, e.g. a freshly created record.
    pub fn set_committed(&mut self, value: Option<SelectOption>) {
        self.committed = value;
        self.close();
    }

    pub fn arrow_down(&mut self) -> ComboSignal {
        if !self.open {
            return self.open_list();
        }
        self.move_highlight(1)
    }

    pub fn arrow_up(&mut self) -> ComboSignal {
        if !self.open {
            return ComboSignal::Ignored;
        }
        self.move_highlight(-1)
    }

    pub fn enter(&mut self) -> ComboSignal {
        if !self.open {
            return self.open_list();
        }
        match self.highlighted().cloned() {
            Some(option) => {
                self.committed = Some(option.clone());
                self.close();
                ComboSignal::CommitThenAdvance(option)
            }
            None => {
                self.close();
                ComboSignal::Closed
            }
        }
    }

    pub fn escape(&mut self) -> ComboSignal {
        if !self.open {
            return ComboSignal::Ignored;
        }
        self.close();
        ComboSignal::Closed
    }

    /// Outside click: same as Escape.
    pub fn dismiss(&mut self) -> ComboSignal {
        self.escape()
    }

    pub fn tab(&mut self) -> ComboSignal {
        if !self.open {
            return ComboSignal::TabOut(None);
        }
        let chosen = self.highlighted().cloned();
        if let Some(option) = &chosen {
            self.committed = Some(option.clone());
        }
        self.close();
        ComboSignal::TabOut(chosen)
    }

    pub fn type_char(&mut self, ch: char) -> ComboSignal {
        if !self.open {
            self.open = true;
            self.query.clear();
        }
        self.query.push(ch);
        self.refilter();
        self.highlight = 0;
        ComboSignal::QueryChanged
    }

    pub fn backspace(&mut self) -> ComboSignal {
        if !self.open {
            return ComboSignal::Ignored;
        }
        self.query.pop();
        self.refilter();
        self.highlight = 0;
        ComboSignal::QueryChanged
    }

    pub fn request_create(&mut self) -> ComboSignal {
        let query = if self.open {
            self.query.clone()
        } else {
            String::new()
        };
        self.close();
        ComboSignal::Create { query }
    }

    fn open_list(&mut self) -> ComboSignal {
        self.open = true;
        self.query.clear();
        self.refilter();
        self.highlight = self
            .committed
            .as_ref()
            .and_then(|committed| {
                self.filtered.iter().position(|index| {
                    self.options
                        .get(*index)
                        .is_some_and(|option| option.value == committed.value)
                })
            })
            .unwrap_or(0);
        ComboSignal::Opened
    }

    fn close(&mut self) {
        self.open = false;
        self.query.clear();
        self.refilter();
        self.highlight = 0;
    }

    fn move_highlight(&mut self, delta: isize) -> ComboSignal {
        let count = self.filtered.len();
        if count == 0 {
            self.highlight = 0;
            return ComboSignal::HighlightMoved(0);
        }
        let next = (self.highlight as isize + delta).clamp(0, count as isize - 1);
        self.highlight = next as usize;
        ComboSignal::HighlightMoved(self.highlight)
    }

    fn refilter(&mut self) {
        let needle = self.query.to_lowercase();
        self.filtered = self
            .options
            .iter()
            .enumerate()
            .filter(|(_, option)| needle.is_empty() || option.label.to_lowercase().contains(&needle))
            .map(|(index, _)| index)
            .collect();
    }
}
