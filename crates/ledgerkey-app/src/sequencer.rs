// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Deterministic focus traversal over header fields, grid cells and trailing
//! fields.
//!
//! The sequencer never owns the inputs it focuses. Each field registers a
//! [`FieldBinder`], which records a `Weak` reference to whatever the frontend
//! uses as the focusable element; dropping the binder (the field unmounting)
//! removes the entry again. Focus requests for ids whose element is not bound
//! yet are parked and retried on the next few [`FocusSequencer::after_layout`]
//! passes, which the frontend runs once per rendered frame.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use tracing::debug;

use crate::{FieldId, ModalKind, RowId, RowKind};

/// Layout passes a parked focus request survives before it is dropped.
pub const PENDING_FOCUS_PASSES: u8 = 3;

pub trait FocusTarget {
    fn focus(&self);

    fn blur(&self) {}
}

type BindingMap = HashMap<FieldId, Weak<dyn FocusTarget>>;

/// Declarative description of the current form shape.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldLayout {
    pub header: Vec<FieldId>,
    pub rows: Vec<(RowId, RowKind)>,
    pub trailing: Vec<FieldId>,
}

impl FieldLayout {
    pub fn sequence(&self) -> Vec<FieldId> {
        let mut sequence = self.header.clone();
        for (row, kind) in &self.rows {
            sequence.extend(
                kind.columns()
                    .iter()
                    .map(|column| FieldId::cell(*row, *column)),
            );
        }
        sequence.extend(self.trailing.iter().copied());
        sequence
    }

    fn last_row(&self) -> Option<(RowId, RowKind)> {
        self.rows.last().copied()
    }
}

/// Form-side decisions the sequencer asks for while advancing.
pub trait AdvanceHost {
    /// Evaluated against current values each time `field` is about to be left.
    fn interrupt_on_leave(&self, _field: FieldId) -> Option<ModalKind> {
        None
    }

    fn row_is_blank(&self, _row: RowId) -> bool {
        false
    }

    /// Adds a row and returns its id with the updated layout.
    fn append_row(&mut self) -> Option<(RowId, FieldLayout)>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved(FieldId),
    /// Target is known but not bound yet; focus lands after layout.
    Parked(FieldId),
    Interrupted { field: FieldId, kind: ModalKind },
    RowAppended { row: RowId, awaiting: FieldId },
    AtBoundary,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingFocus {
    field: FieldId,
    row: Option<RowId>,
    passes_left: u8,
}

/// Registration handle for one field. Dropping it unbinds the field.
pub struct FieldBinder {
    id: FieldId,
    slots: Weak<RefCell<BindingMap>>,
    bound: RefCell<Option<Weak<dyn FocusTarget>>>,
}

impl FieldBinder {
    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn bind<T: FocusTarget + 'static>(&self, target: &Rc<T>) {
        let weak = Rc::downgrade(target);
        let weak: Weak<dyn FocusTarget> = weak;
        if let Some(slots) = self.slots.upgrade() {
            slots.borrow_mut().insert(self.id, weak.clone());
        }
        *self.bound.borrow_mut() = Some(weak);
    }
}

impl Drop for FieldBinder {
    fn drop(&mut self) {
        let Some(slots) = self.slots.upgrade() else {
            return;
        };
        let Some(ours) = self.bound.borrow_mut().take() else {
            return;
        };
        let mut slots = slots.borrow_mut();
        if slots
            .get(&self.id)
            .is_some_and(|current| Weak::ptr_eq(current, &ours))
        {
            slots.remove(&self.id);
        }
    }
}

pub struct FocusSequencer {
    layout: FieldLayout,
    sequence: Vec<FieldId>,
    slots: Rc<RefCell<BindingMap>>,
    current: Option<FieldId>,
    pending: Option<PendingFocus>,
}

impl Default for FocusSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusSequencer {
    pub fn new() -> Self {
        Self {
            layout: FieldLayout::default(),
            sequence: Vec::new(),
            slots: Rc::new(RefCell::new(HashMap::new())),
            current: None,
            pending: None,
        }
    }

    pub fn with_layout(layout: &FieldLayout) -> Self {
        let mut sequencer = Self::new();
        sequencer.rebuild(layout);
        sequencer
    }

    pub fn register_field(&self, id: FieldId) -> FieldBinder {
        FieldBinder {
            id,
            slots: Rc::downgrade(&self.slots),
            bound: RefCell::new(None),
        }
    }

    pub fn sequence(&self) -> &[FieldId] {
        &self.sequence
    }

    pub fn current(&self) -> Option<FieldId> {
        self.current
    }

    pub fn pending(&self) -> Option<FieldId> {
        self.pending.map(|pending| pending.field)
    }

    pub fn contains(&self, id: FieldId) -> bool {
        self.sequence.contains(&id)
    }

    pub fn is_bound(&self, id: FieldId) -> bool {
        self.target(id).is_some()
    }

    /// Recomputes the sequence. Focus or parked focus on a field that no longer
    /// exists moves to the entry now at the same position, so nothing stale is
    /// ever focused afterwards.
    pub fn rebuild(&mut self, layout: &FieldLayout) {
        let previous_index = self
            .current
            .and_then(|current| self.sequence.iter().position(|id| *id == current));
        self.sequence = layout.sequence();
        self.layout = layout.clone();

        if let Some(pending) = self.pending
            && !self.sequence.contains(&pending.field)
        {
            debug!(field = %pending.field, "parked focus dropped; field left the form");
            self.pending = None;
        }

        let Some(current) = self.current else {
            return;
        };
        if self.sequence.contains(&current) {
            return;
        }
        self.current = None;
        if self.sequence.is_empty() {
            return;
        }
        let fallback_index = previous_index
            .unwrap_or(0)
            .min(self.sequence.len().saturating_sub(1));
        let fallback = self.sequence[fallback_index];
        self.focus(fallback);
    }

    /// Focuses `id` now if its element is bound, otherwise parks the request
    /// for the next layout passes.
    pub fn focus(&mut self, id: FieldId) -> Advance {
        if !self.contains(id) {
            return Advance::Unknown;
        }
        match self.target(id) {
            Some(target) => {
                self.blur_current();
                target.focus();
                self.current = Some(id);
                self.pending = None;
                Advance::Moved(id)
            }
            None => {
                self.park(id);
                Advance::Parked(id)
            }
        }
    }

    pub fn advance<H: AdvanceHost + ?Sized>(&mut self, from: FieldId, host: &mut H) -> Advance {
        let Some(index) = self.position(from) else {
            debug!(field = %from, "advance from a field outside the form ignored");
            return Advance::Unknown;
        };
        if let Some(kind) = host.interrupt_on_leave(from) {
            return Advance::Interrupted { field: from, kind };
        }
        self.step_forward(index, from, host)
    }

    /// Advances past `trigger` without re-running its interrupt check. Used when
    /// a modal that `trigger` opened has been committed.
    pub fn resume_after<H: AdvanceHost + ?Sized>(
        &mut self,
        trigger: FieldId,
        host: &mut H,
    ) -> Advance {
        let Some(index) = self.position(trigger) else {
            return Advance::Unknown;
        };
        self.step_forward(index, trigger, host)
    }

    pub fn retreat(&mut self, from: FieldId) -> Advance {
        match self.position(from) {
            None => Advance::Unknown,
            Some(0) => Advance::AtBoundary,
            Some(index) => self.focus(self.sequence[index - 1]),
        }
    }

    /// Runs after the frontend finished laying out a frame.
    pub fn after_layout(&mut self) -> Option<FieldId> {
        let mut pending = self.pending?;
        if let Some(target) = self.target(pending.field) {
            self.blur_current();
            target.focus();
            self.current = Some(pending.field);
            self.pending = None;
            return Some(pending.field);
        }

        pending.passes_left = pending.passes_left.saturating_sub(1);
        if pending.passes_left == 0 {
            debug!(
                field = %pending.field,
                row = ?pending.row.map(RowId::get),
                "focus target never bound; giving up"
            );
            self.pending = None;
        } else {
            self.pending = Some(pending);
        }
        None
    }

    fn step_forward<H: AdvanceHost + ?Sized>(
        &mut self,
        index: usize,
        from: FieldId,
        host: &mut H,
    ) -> Advance {
        if let FieldId::Cell { row, column } = from
            && let Some((last_row, kind)) = self.last_row()
            && row == last_row
        {
            if column == kind.first_column()
                && self.layout.rows.len() > 1
                && host.row_is_blank(row)
                && let Some(first_trailing) = self.first_trailing()
            {
                return self.focus(first_trailing);
            }
            if column == kind.last_column() {
                return self.append_and_await(host);
            }
        }

        match self.sequence.get(index + 1).copied() {
            Some(next) => self.focus(next),
            None => Advance::AtBoundary,
        }
    }

    fn append_and_await<H: AdvanceHost + ?Sized>(&mut self, host: &mut H) -> Advance {
        let Some((row, layout)) = host.append_row() else {
            return Advance::AtBoundary;
        };
        self.rebuild(&layout);
        let Some((_, kind)) = layout.rows.iter().find(|(id, _)| *id == row).copied() else {
            return Advance::AtBoundary;
        };
        let awaiting = FieldId::cell(row, kind.first_column());
        self.park(awaiting);
        Advance::RowAppended { row, awaiting }
    }

    fn park(&mut self, field: FieldId) {
        self.pending = Some(PendingFocus {
            field,
            row: field.row(),
            passes_left: PENDING_FOCUS_PASSES,
        });
    }

    fn target(&self, id: FieldId) -> Option<Rc<dyn FocusTarget>> {
        self.slots.borrow().get(&id).and_then(Weak::upgrade)
    }

    fn blur_current(&self) {
        if let Some(current) = self.current
            && let Some(target) = self.target(current)
        {
            target.blur();
        }
    }

    fn position(&self, id: FieldId) -> Option<usize> {
        self.sequence.iter().position(|entry| *entry == id)
    }

    fn last_row(&self) -> Option<(RowId, RowKind)> {
        self.layout.last_row()
    }

    fn first_trailing(&self) -> Option<FieldId> {
        self.layout.trailing.first().copied()
    }
}
