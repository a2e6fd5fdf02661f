// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! The voucher entry controller. Keys go through the shortcut registry first;
//! whatever no scope claims is treated as typing into the focused field or
//! the open dialog.

use std::cell::Cell;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::rc::Rc;
use time::Date;
use tracing::{debug, info, warn};

use crate::{
    Advance, BillAllocation, ColumnKey, ComboSignal, ComboboxState, CommandPalette, CommitValue,
    Completion, Dispatch, FieldBinder, FieldId, FocusSequencer, FocusTarget, HeaderField,
    HelpEntry, InteractionError, KeyPress, MasterKind, MasterRecord, ModalInterruption, ModalKind,
    ModalSession, NetworkError, PaletteCommand, PaletteOutcome, Request, RequestId, Resolved,
    Response, RowId, Scope, ScopeHandle, SelectOption, ShortcutBinding, ShortcutRegistry,
    TrailingField, ValidationIssue, VoucherForm, VoucherId, VoucherKind, WorkingPeriod,
    parse_hundredths,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpTarget {
    Date,
    Party,
    FirstRow,
    Narration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    Advance,
    TabOut,
    Retreat,
    ListDown,
    ListUp,
    RevertSelect,
    CreateFromSelect,
    Save,
    DeleteRow,
    Print,
    ChangePeriod,
    SwitchVoucher(VoucherKind),
    TogglePalette,
    ToggleHelp,
    ModalAccept,
    ModalCancel,
    ModalNextField,
    Jump(JumpTarget),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    FocusMoved(FieldId),
    FocusParked(FieldId),
    RowAdded(RowId),
    RowRemoved(RowId),
    VoucherSwitched(VoucherKind),
    SelectionCommitted { field: FieldId, record: MasterRecord },
    ModalOpened(ModalKind),
    ModalFailed(String),
    ModalClosed(ModalKind),
    PaletteToggled(bool),
    HelpToggled(bool),
    PeriodPrompt(bool),
    PeriodChanged(WorkingPeriod),
    ValidationFailed(Vec<ValidationIssue>),
    Request(Request),
    PrintRequested(VoucherKind),
    Saved(VoucherId),
    StatusUpdated(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub voucher: VoucherKind,
    pub min_rows: usize,
    pub period: WorkingPeriod,
    pub today: Date,
}

/// Stand-in for a rendered input. The frontend reads `is_focused` when it
/// draws the field.
#[derive(Debug)]
pub struct FieldElement {
    id: FieldId,
    focused: Cell<bool>,
}

impl FieldElement {
    fn new(id: FieldId) -> Self {
        Self {
            id,
            focused: Cell::new(false),
        }
    }

    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn is_focused(&self) -> bool {
        self.focused.get()
    }
}

impl FocusTarget for FieldElement {
    fn focus(&self) {
        self.focused.set(true);
    }

    fn blur(&self) {
        self.focused.set(false);
    }
}

#[derive(Debug, Clone, Default)]
struct MasterCache {
    records: Vec<MasterRecord>,
    loaded: bool,
    stale: bool,
    loading: Option<RequestId>,
}

impl MasterCache {
    fn needs_load(&self) -> bool {
        (!self.loaded || self.stale) && self.loading.is_none()
    }
}

pub struct EntrySession {
    registry: ShortcutRegistry<EntryAction>,
    sequencer: FocusSequencer,
    modal: ModalInterruption,
    palette: CommandPalette<EntryAction>,
    form: VoucherForm,
    combos: HashMap<FieldId, ComboboxState>,
    masters: HashMap<MasterKind, MasterCache>,
    mounted: HashMap<FieldId, (FieldBinder, Rc<FieldElement>)>,
    period: WorkingPeriod,
    period_prompt: Option<String>,
    help_visible: bool,
    status: Option<String>,
    issues: Vec<ValidationIssue>,
    saving: Option<RequestId>,
    last_request: u64,
    field_scope: Option<(FieldId, ScopeHandle)>,
    modal_scope: Option<ScopeHandle>,
}

impl EntrySession {
    pub fn new(config: SessionConfig) -> Result<Self, InteractionError> {
        let mut registry = ShortcutRegistry::new();
        // Both scopes live as long as the session.
        let _ = registry.register(global_bindings(), Scope::global("app"))?;
        let _ = registry.register(form_bindings(), Scope::form("voucher"))?;

        let form = VoucherForm::new(config.voucher, config.min_rows, config.today.to_string());
        let mut sequencer = FocusSequencer::with_layout(&form.layout());
        if let Some(first) = sequencer.sequence().first().copied() {
            sequencer.focus(first);
        }

        Ok(Self {
            registry,
            sequencer,
            modal: ModalInterruption::new(),
            palette: CommandPalette::new(palette_commands()),
            form,
            combos: HashMap::new(),
            masters: HashMap::new(),
            mounted: HashMap::new(),
            period: config.period,
            period_prompt: None,
            help_visible: false,
            status: None,
            issues: Vec::new(),
            saving: None,
            last_request: 0,
            field_scope: None,
            modal_scope: None,
        })
    }

    /// Requests the option lists the form needs up front.
    pub fn start(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        for kind in [MasterKind::Ledger, MasterKind::StockItem] {
            self.ensure_fresh(kind, &mut events);
        }
        events
    }

    pub fn form(&self) -> &VoucherForm {
        &self.form
    }

    pub fn period(&self) -> WorkingPeriod {
        self.period
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn is_saving(&self) -> bool {
        self.saving.is_some()
    }

    pub fn help_visible(&self) -> bool {
        self.help_visible
    }

    pub fn palette(&self) -> &CommandPalette<EntryAction> {
        &self.palette
    }

    pub fn period_prompt(&self) -> Option<&str> {
        self.period_prompt.as_deref()
    }

    pub fn modal(&self) -> Option<&ModalSession> {
        self.modal.session()
    }

    pub fn current_field(&self) -> Option<FieldId> {
        self.sequencer.current()
    }

    pub fn pending_field(&self) -> Option<FieldId> {
        self.sequencer.pending()
    }

    pub fn sequence(&self) -> &[FieldId] {
        self.sequencer.sequence()
    }

    pub fn catalogue(&self) -> &[HelpEntry] {
        self.registry.catalogue()
    }

    pub fn combobox(&self, field: FieldId) -> Option<&ComboboxState> {
        self.combos.get(&field)
    }

    pub fn is_focused(&self, field: FieldId) -> bool {
        self.mounted
            .get(&field)
            .is_some_and(|(_, element)| element.is_focused())
    }

    /// Text a frontend shows for `field` right now.
    pub fn display_text(&self, field: FieldId) -> String {
        if field.master().is_none() {
            return self.form.text(field).to_owned();
        }
        match self.combos.get(&field) {
            Some(combo) if combo.is_open() => combo.display_text().to_owned(),
            _ => self
                .form
                .pick(field)
                .map(|record| record.name.clone())
                .unwrap_or_default(),
        }
    }

    /// Moves focus straight to `field`.
    pub fn focus(&mut self, field: FieldId) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let outcome = self.sequencer.focus(field);
        self.note_advance(outcome, &mut events);
        self.sync_focus(&mut events);
        events
    }

    pub fn handle_key(&mut self, press: &KeyPress) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if press.is_modifier() {
            return events;
        }

        if self.palette.is_open() {
            match self.palette.handle_key(press) {
                PaletteOutcome::Run(action) => {
                    events.push(SessionEvent::PaletteToggled(false));
                    self.run(action, &mut events);
                }
                PaletteOutcome::Closed => events.push(SessionEvent::PaletteToggled(false)),
                PaletteOutcome::Opened | PaletteOutcome::Updated => {}
            }
        } else if self.period_prompt.is_some() {
            self.period_key(press, &mut events);
        } else if self.help_visible {
            self.help_key(press, &mut events);
        } else {
            match self.registry.dispatch(press) {
                Dispatch::Handled {
                    action,
                    prevent_default,
                    ..
                } => {
                    self.run(action, &mut events);
                    // Opted-out bindings still type into the focused field.
                    if !prevent_default {
                        self.edit(press, &mut events);
                    }
                }
                Dispatch::PassThrough => self.edit(press, &mut events),
            }
        }

        self.sync_focus(&mut events);
        events
    }

    /// Mounts inputs for the current sequence, unmounts removed ones, then
    /// lets the sequencer settle any parked focus. Frontends call this once per
    /// drawn frame.
    pub fn layout_pass(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let sequence = self.sequencer.sequence().to_vec();
        self.mounted.retain(|id, _| sequence.contains(id));
        for id in sequence {
            self.mounted.entry(id).or_insert_with(|| {
                let binder = self.sequencer.register_field(id);
                let element = Rc::new(FieldElement::new(id));
                binder.bind(&element);
                (binder, element)
            });
        }
        self.sequencer.after_layout();
        self.sync_focus(&mut events);
        events
    }

    pub fn apply_response(&mut self, response: Response) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        match response {
            Response::Masters {
                request,
                kind,
                result,
            } => self.apply_masters(request, kind, result, &mut events),
            Response::Created {
                request,
                kind,
                name,
                result,
            } => {
                let record = result.map(|id| MasterRecord::new(id, name));
                match self.modal.complete(request, record) {
                    Completion::Resolved(resolved) => {
                        if let CommitValue::Created(record) = &resolved.value {
                            info!(kind = kind.label(), id = record.id, name = %record.name, "master created");
                        }
                        self.finish_modal(resolved, &mut events);
                    }
                    Completion::Failed(message) => {
                        let status = self.set_status(format!("create failed: {message}"));
                        events.push(SessionEvent::ModalFailed(message));
                        events.push(status);
                    }
                    Completion::Stale => {}
                }
            }
            Response::Saved { request, result } => {
                if self.saving != Some(request) {
                    debug!(request = request.get(), "stale save response discarded");
                } else {
                    self.saving = None;
                    match result {
                        Ok(id) => self.finish_save(id, &mut events),
                        Err(error) => {
                            warn!(%error, "voucher save failed");
                            events.push(self.set_status(format!(
                                "save failed: {error}; press ctrl+s to retry"
                            )));
                        }
                    }
                }
            }
        }
        self.sync_focus(&mut events);
        events
    }

    fn run(&mut self, action: EntryAction, events: &mut Vec<SessionEvent>) {
        match action {
            EntryAction::Advance => self.advance_field(false, events),
            EntryAction::TabOut => self.advance_field(true, events),
            EntryAction::Retreat => {
                if let Some(field) = self.sequencer.current() {
                    if let Some(combo) = self.combos.get_mut(&field) {
                        combo.escape();
                    }
                    let outcome = self.sequencer.retreat(field);
                    self.note_advance(outcome, events);
                }
            }
            EntryAction::ListDown => {
                self.with_combo(|combo| combo.arrow_down());
            }
            EntryAction::ListUp => {
                self.with_combo(|combo| combo.arrow_up());
            }
            EntryAction::RevertSelect => {
                self.with_combo(|combo| combo.escape());
            }
            EntryAction::CreateFromSelect => self.create_from_select(events),
            EntryAction::Save => self.save(events),
            EntryAction::DeleteRow => self.delete_row(events),
            EntryAction::Print => {
                events.push(SessionEvent::PrintRequested(self.form.kind()));
                events.push(self.set_status("print requested"));
            }
            EntryAction::ChangePeriod => {
                self.period_prompt = Some(self.period.to_string());
                events.push(SessionEvent::PeriodPrompt(true));
            }
            EntryAction::SwitchVoucher(kind) => self.switch_voucher(kind, events),
            EntryAction::TogglePalette => {
                self.palette.toggle();
                events.push(SessionEvent::PaletteToggled(self.palette.is_open()));
            }
            EntryAction::ToggleHelp => {
                self.help_visible = !self.help_visible;
                events.push(SessionEvent::HelpToggled(self.help_visible));
            }
            EntryAction::ModalAccept => self.accept_modal(events),
            EntryAction::ModalCancel => self.cancel_modal(events),
            EntryAction::ModalNextField => {
                let pending = self.modal.session().is_some_and(ModalSession::is_pending);
                if let Some(draft) = self.modal.draft_mut()
                    && !pending
                {
                    draft.next_field();
                }
            }
            EntryAction::Jump(target) => {
                if let Some(field) = self.jump_field(target) {
                    let outcome = self.sequencer.focus(field);
                    self.note_advance(outcome, events);
                }
            }
        }
    }

    fn advance_field(&mut self, tab: bool, events: &mut Vec<SessionEvent>) {
        let Some(field) = self.sequencer.current() else {
            return;
        };

        if field.master().is_some() {
            let signal = {
                let combo = self.combo_mut(field);
                if tab { combo.tab() } else { combo.enter() }
            };
            match signal {
                ComboSignal::CommitThenAdvance(option) | ComboSignal::TabOut(Some(option)) => {
                    self.commit_option(field, &option, events);
                }
                ComboSignal::TabOut(None) => {}
                ComboSignal::Ignored
                | ComboSignal::Opened
                | ComboSignal::Closed
                | ComboSignal::QueryChanged
                | ComboSignal::HighlightMoved(_)
                | ComboSignal::Create { .. } => return,
            }
        } else if let FieldId::Cell {
            row,
            column: ColumnKey::Rate,
        } = field
        {
            self.form.fill_item_amount(row);
        }

        let outcome = self.sequencer.advance(field, &mut self.form);
        self.note_advance(outcome, events);
    }

    fn note_advance(&mut self, outcome: Advance, events: &mut Vec<SessionEvent>) {
        match outcome {
            Advance::Moved(_) => {}
            Advance::Parked(field) => events.push(SessionEvent::FocusParked(field)),
            Advance::Interrupted { field, kind } => {
                let seed = self.form.text(field).to_owned();
                self.open_modal(kind, field, &seed, events);
            }
            Advance::RowAppended { row, awaiting } => {
                events.push(SessionEvent::RowAdded(row));
                events.push(SessionEvent::FocusParked(awaiting));
            }
            Advance::AtBoundary => {
                events.push(self.set_status("end of voucher; ctrl+s saves"));
            }
            Advance::Unknown => debug!("focus request for a field outside the form ignored"),
        }
    }

    fn commit_option(
        &mut self,
        field: FieldId,
        option: &SelectOption,
        events: &mut Vec<SessionEvent>,
    ) {
        let record = field
            .master()
            .and_then(|kind| self.masters.get(&kind))
            .and_then(|cache| cache.records.iter().find(|record| record.id == option.value))
            .cloned()
            .unwrap_or_else(|| MasterRecord::new(option.value, option.label.clone()));
        match self.form.set_pick(field, Some(record.clone())) {
            Ok(()) => {
                self.issues.retain(|issue| issue.field != field);
                events.push(SessionEvent::SelectionCommitted { field, record });
            }
            Err(error) => warn!(%field, %error, "selection not written"),
        }
    }

    fn create_from_select(&mut self, events: &mut Vec<SessionEvent>) {
        let Some(field) = self.sequencer.current() else {
            return;
        };
        let Some(kind) = field.master().and_then(MasterKind::create_modal) else {
            return;
        };
        if let ComboSignal::Create { query } = self.combo_mut(field).request_create() {
            self.open_modal(kind, field, &query, events);
        }
    }

    fn open_modal(
        &mut self,
        kind: ModalKind,
        trigger: FieldId,
        seed: &str,
        events: &mut Vec<SessionEvent>,
    ) {
        if let Err(error) = self.modal.open(kind, trigger, seed) {
            warn!(%error, "modal open rejected");
            events.push(self.set_status(error.to_string()));
            return;
        }
        match self
            .registry
            .register(modal_bindings(), Scope::modal(kind.title()).exclusive())
        {
            Ok(handle) => self.modal_scope = Some(handle),
            Err(error) => warn!(%error, "modal shortcuts not registered"),
        }
        events.push(SessionEvent::ModalOpened(kind));
    }

    fn accept_modal(&mut self, events: &mut Vec<SessionEvent>) {
        let Some(session) = self.modal.session() else {
            return;
        };
        let (kind, trigger) = (session.kind, session.trigger);

        if kind.is_create() {
            let name = session.draft.value("name").trim().to_owned();
            if name.is_empty() {
                self.reject_modal("name is required", events);
                return;
            }
            let Some(master) = trigger.master() else {
                return;
            };
            match self.modal.begin_commit() {
                Ok(request) => {
                    events.push(self.set_status(format!("creating {} {name:?}", master.label())));
                    events.push(SessionEvent::Request(Request::CreateMaster {
                        request,
                        kind: master,
                        name,
                    }));
                }
                Err(error) => events.push(self.set_status(error.to_string())),
            }
            return;
        }

        let reference = session.draft.value("bill ref").trim().to_owned();
        let amount = parse_hundredths(session.draft.value("amount"));
        if reference.is_empty() {
            self.reject_modal("bill reference is required", events);
            return;
        }
        let Some(amount_cents) = amount.filter(|amount| *amount != 0) else {
            self.reject_modal("allocation amount is required", events);
            return;
        };
        let allocations = vec![BillAllocation {
            reference,
            amount_cents,
        }];
        match self.modal.commit_local(CommitValue::Allocations(allocations)) {
            Ok(resolved) => self.finish_modal(resolved, events),
            Err(error) => events.push(self.set_status(error.to_string())),
        }
    }

    fn reject_modal(&mut self, message: &str, events: &mut Vec<SessionEvent>) {
        match self.modal.reject(message) {
            Ok(()) => events.push(SessionEvent::ModalFailed(message.to_owned())),
            Err(error) => events.push(self.set_status(error.to_string())),
        }
    }

    fn finish_modal(&mut self, resolved: Resolved, events: &mut Vec<SessionEvent>) {
        self.teardown_modal_scope();
        events.push(SessionEvent::ModalClosed(resolved.kind));
        let trigger = resolved.trigger;

        match resolved.value {
            CommitValue::Created(record) => {
                if let Err(error) = self.form.set_pick(trigger, Some(record.clone())) {
                    warn!(field = %trigger, %error, "created record not written");
                }
                if let Some(combo) = self.combos.get_mut(&trigger) {
                    combo.set_committed(Some(SelectOption::new(record.id, record.name.clone())));
                }
                if let Some(kind) = trigger.master() {
                    self.invalidate(kind, events);
                }
                events.push(SessionEvent::SelectionCommitted {
                    field: trigger,
                    record,
                });
            }
            CommitValue::Allocations(allocations) => {
                if let Some(row) = trigger.row()
                    && let Err(error) = self.form.set_allocations(row, allocations)
                {
                    warn!(field = %trigger, %error, "allocation not written");
                }
            }
        }

        let outcome = self.sequencer.resume_after(trigger, &mut self.form);
        self.note_advance(outcome, events);
    }

    fn cancel_modal(&mut self, events: &mut Vec<SessionEvent>) {
        let Some(kind) = self.modal.session().map(|session| session.kind) else {
            return;
        };
        let Some(trigger) = self.modal.cancel() else {
            return;
        };
        self.teardown_modal_scope();
        events.push(SessionEvent::ModalClosed(kind));
        let outcome = self.sequencer.focus(trigger);
        self.note_advance(outcome, events);
    }

    fn teardown_modal_scope(&mut self) {
        if let Some(handle) = self.modal_scope.take() {
            self.registry.teardown(handle);
        }
    }

    fn save(&mut self, events: &mut Vec<SessionEvent>) {
        if self.saving.is_some() {
            events.push(self.set_status("save already in progress"));
            return;
        }
        match self.form.payload(&self.period) {
            Err(issues) => {
                let summary = match issues.as_slice() {
                    [only] => format!("{}: {}", only.field, only.message),
                    [first, rest @ ..] => {
                        format!("{}: {} (+{} more)", first.field, first.message, rest.len())
                    }
                    [] => "voucher is incomplete".to_owned(),
                };
                self.issues = issues.clone();
                events.push(SessionEvent::ValidationFailed(issues));
                events.push(self.set_status(summary));
            }
            Ok(payload) => {
                let request = self.next_request();
                self.saving = Some(request);
                self.issues.clear();
                events.push(self.set_status(format!(
                    "saving {} voucher",
                    payload.voucher_type.label()
                )));
                events.push(SessionEvent::Request(Request::SaveVoucher { request, payload }));
            }
        }
    }

    fn finish_save(&mut self, id: VoucherId, events: &mut Vec<SessionEvent>) {
        info!(voucher = id.get(), kind = self.form.kind().as_str(), "voucher saved");
        self.form.reset_entries();
        self.sequencer.rebuild(&self.form.layout());
        self.prune_fields();
        events.push(SessionEvent::Saved(id));
        events.push(self.set_status(format!("voucher #{} saved", id.get())));
        if let Some(first) = self.sequencer.sequence().first().copied() {
            let outcome = self.sequencer.focus(first);
            self.note_advance(outcome, events);
        }
    }

    fn delete_row(&mut self, events: &mut Vec<SessionEvent>) {
        let Some(row) = self.sequencer.current().and_then(FieldId::row) else {
            events.push(self.set_status("move to a grid row to delete it"));
            return;
        };
        match self.form.remove_row(row) {
            Ok(_) => {
                self.sequencer.rebuild(&self.form.layout());
                self.prune_fields();
                events.push(SessionEvent::RowRemoved(row));
                events.push(self.set_status("row deleted"));
            }
            Err(error) => events.push(self.set_status(error.to_string())),
        }
    }

    fn switch_voucher(&mut self, kind: VoucherKind, events: &mut Vec<SessionEvent>) {
        if self.form.kind() != kind {
            self.form.set_kind(kind);
            self.sequencer.rebuild(&self.form.layout());
            self.prune_fields();
            events.push(SessionEvent::VoucherSwitched(kind));
            if let Some(first) = self.sequencer.sequence().first().copied() {
                let outcome = self.sequencer.focus(first);
                self.note_advance(outcome, events);
            }
        }
        events.push(self.set_status(format!("{} voucher", kind.label())));
    }

    fn period_key(&mut self, press: &KeyPress, events: &mut Vec<SessionEvent>) {
        let Some(prompt) = self.period_prompt.as_mut() else {
            return;
        };
        match press.chord().as_deref() {
            Some("escape") => {
                self.period_prompt = None;
                events.push(SessionEvent::PeriodPrompt(false));
            }
            Some("enter") => match WorkingPeriod::parse(prompt) {
                Ok(period) => {
                    self.period = period;
                    self.period_prompt = None;
                    events.push(SessionEvent::PeriodPrompt(false));
                    events.push(SessionEvent::PeriodChanged(period));
                    events.push(self.set_status(format!("working period {period}")));
                }
                Err(error) => events.push(self.set_status(format!("{error:#}"))),
            },
            Some("backspace") => {
                prompt.pop();
            }
            _ => {
                if let Some(ch) = press.text() {
                    prompt.push(ch);
                }
            }
        }
    }

    /// The help overlay covers the form, so it swallows everything but the
    /// keys that close it.
    fn help_key(&mut self, press: &KeyPress, events: &mut Vec<SessionEvent>) {
        if matches!(press.chord().as_deref(), Some("escape" | "?")) {
            self.help_visible = false;
            events.push(SessionEvent::HelpToggled(false));
        }
    }

    /// Typing that no shortcut claimed.
    fn edit(&mut self, press: &KeyPress, events: &mut Vec<SessionEvent>) {
        let backspace = press.chord().as_deref() == Some("backspace");
        let text = press.text();
        if !backspace && text.is_none() {
            return;
        }

        if let Some(session) = self.modal.session() {
            if session.is_pending() {
                return;
            }
            if let Some(draft) = self.modal.draft_mut() {
                match text {
                    Some(ch) => draft.push_char(ch),
                    None => draft.backspace(),
                }
            }
            return;
        }

        let Some(field) = self.sequencer.current() else {
            return;
        };
        self.issues.retain(|issue| issue.field != field);

        if let Some(kind) = field.master() {
            let combo = self.combo_mut(field);
            match text {
                Some(ch) => combo.type_char(ch),
                None => combo.backspace(),
            };
            self.ensure_fresh(kind, events);
            return;
        }

        match self.form.text_mut(field) {
            Ok(value) => match text {
                Some(ch) => value.push(ch),
                None => {
                    value.pop();
                }
            },
            Err(error) => debug!(%error, "keystroke for a read-only field dropped"),
        }
    }

    /// Keeps the field scope on the focused field. Leaving a select closes its
    /// list without committing.
    fn sync_focus(&mut self, events: &mut Vec<SessionEvent>) {
        let current = self.sequencer.current();
        if current == self.field_scope.map(|(field, _)| field) {
            return;
        }
        if let Some((previous, handle)) = self.field_scope.take() {
            self.registry.teardown(handle);
            if let Some(combo) = self.combos.get_mut(&previous) {
                combo.dismiss();
            }
        }
        let Some(field) = current else {
            return;
        };
        match self
            .registry
            .register(field_bindings(field), Scope::field(field.to_string()))
        {
            Ok(handle) => self.field_scope = Some((field, handle)),
            Err(error) => warn!(%field, %error, "field shortcuts not registered"),
        }
        if let Some(kind) = field.master() {
            self.combo_mut(field);
            self.ensure_fresh(kind, events);
        }
        events.push(SessionEvent::FocusMoved(field));
    }

    fn combo_mut(&mut self, field: FieldId) -> &mut ComboboxState {
        match self.combos.entry(field) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let options = field
                    .master()
                    .and_then(|kind| self.masters.get(&kind))
                    .map(|cache| select_options(&cache.records))
                    .unwrap_or_default();
                let mut combo = ComboboxState::new(options);
                combo.set_committed(
                    self.form
                        .pick(field)
                        .map(|record| SelectOption::new(record.id, record.name.clone())),
                );
                entry.insert(combo)
            }
        }
    }

    fn with_combo(&mut self, apply: impl FnOnce(&mut ComboboxState) -> ComboSignal) {
        if let Some(field) = self.sequencer.current()
            && field.master().is_some()
        {
            apply(self.combo_mut(field));
        }
    }

    fn ensure_fresh(&mut self, kind: MasterKind, events: &mut Vec<SessionEvent>) {
        let needs_load = self.masters.get(&kind).is_none_or(MasterCache::needs_load);
        if !needs_load {
            return;
        }
        let request = self.next_request();
        self.masters.entry(kind).or_default().loading = Some(request);
        events.push(SessionEvent::Request(Request::LoadMasters { request, kind }));
    }

    /// Marks a cached list out of date and supersedes any load in flight.
    fn invalidate(&mut self, kind: MasterKind, events: &mut Vec<SessionEvent>) {
        let cache = self.masters.entry(kind).or_default();
        cache.stale = true;
        cache.loading = None;
        self.ensure_fresh(kind, events);
    }

    fn apply_masters(
        &mut self,
        request: RequestId,
        kind: MasterKind,
        result: Result<Vec<MasterRecord>, NetworkError>,
        events: &mut Vec<SessionEvent>,
    ) {
        let cache = self.masters.entry(kind).or_default();
        if cache.loading != Some(request) {
            debug!(request = request.get(), kind = kind.label(), "stale option list discarded");
            return;
        }
        cache.loading = None;
        match result {
            Ok(records) => {
                debug!(kind = kind.label(), count = records.len(), "option list loaded");
                let options = select_options(&records);
                cache.records = records;
                cache.loaded = true;
                cache.stale = false;
                for (field, combo) in &mut self.combos {
                    if field.master() == Some(kind) {
                        combo.set_options(options.clone());
                    }
                }
            }
            Err(error) => {
                warn!(kind = kind.label(), %error, "option list load failed");
                events.push(self.set_status(format!("could not load {}s: {error}", kind.label())));
            }
        }
    }

    fn prune_fields(&mut self) {
        let sequencer = &self.sequencer;
        self.combos.retain(|field, _| sequencer.contains(*field));
        self.mounted.retain(|field, _| sequencer.contains(*field));
        self.issues.retain(|issue| sequencer.contains(issue.field));
    }

    fn jump_field(&self, target: JumpTarget) -> Option<FieldId> {
        let field = match target {
            JumpTarget::Date => FieldId::Header(HeaderField::Date),
            JumpTarget::Party => FieldId::Header(HeaderField::Party),
            JumpTarget::Narration => FieldId::Trailing(TrailingField::Narration),
            JumpTarget::FirstRow => {
                let row = self.form.rows().first()?;
                FieldId::cell(row.id, row.kind.first_column())
            }
        };
        self.sequencer.contains(field).then_some(field)
    }

    fn next_request(&mut self) -> RequestId {
        self.last_request += 1;
        RequestId::new(self.last_request)
    }

    fn set_status(&mut self, message: impl Into<String>) -> SessionEvent {
        let message = message.into();
        self.status = Some(message.clone());
        SessionEvent::StatusUpdated(message)
    }
}

fn select_options(records: &[MasterRecord]) -> Vec<SelectOption> {
    records
        .iter()
        .map(|record| SelectOption::new(record.id, record.name.clone()))
        .collect()
}

fn global_bindings() -> Vec<ShortcutBinding<EntryAction>> {
    vec![
        ShortcutBinding::new("ctrl+k", "command palette", EntryAction::TogglePalette),
        ShortcutBinding::new("?", "keyboard shortcuts", EntryAction::ToggleHelp),
    ]
}

fn form_bindings() -> Vec<ShortcutBinding<EntryAction>> {
    let mut bindings = vec![
        ShortcutBinding::new("ctrl+s", "save voucher", EntryAction::Save),
        ShortcutBinding::new("alt+d", "delete row", EntryAction::DeleteRow),
        ShortcutBinding::new("alt+p", "print voucher", EntryAction::Print),
        ShortcutBinding::new("alt+f2", "change working period", EntryAction::ChangePeriod),
    ];
    bindings.extend(VoucherKind::ALL.into_iter().map(|kind| {
        ShortcutBinding::new(
            kind.chord(),
            format!("{} voucher", kind.label()),
            EntryAction::SwitchVoucher(kind),
        )
    }));
    bindings
}

fn field_bindings(field: FieldId) -> Vec<ShortcutBinding<EntryAction>> {
    let mut bindings = vec![
        ShortcutBinding::new("enter", "next field", EntryAction::Advance),
        ShortcutBinding::new("tab", "next field", EntryAction::TabOut),
        ShortcutBinding::new("shift+tab", "previous field", EntryAction::Retreat),
    ];
    let Some(kind) = field.master() else {
        return bindings;
    };
    bindings.extend([
        ShortcutBinding::new("arrowdown", "open list / next option", EntryAction::ListDown),
        ShortcutBinding::new("arrowup", "previous option", EntryAction::ListUp),
        ShortcutBinding::new("escape", "close list", EntryAction::RevertSelect),
    ]);
    if kind.create_modal().is_some() {
        bindings.push(ShortcutBinding::new(
            "alt+c",
            format!("create {}", kind.label()),
            EntryAction::CreateFromSelect,
        ));
    }
    bindings
}

fn modal_bindings() -> Vec<ShortcutBinding<EntryAction>> {
    vec![
        ShortcutBinding::new("escape", "cancel dialog", EntryAction::ModalCancel),
        ShortcutBinding::new("ctrl+a", "accept dialog", EntryAction::ModalAccept),
        ShortcutBinding::new("tab", "next dialog field", EntryAction::ModalNextField),
        ShortcutBinding::new("enter", "next dialog field", EntryAction::ModalNextField),
    ]
}

fn palette_commands() -> Vec<PaletteCommand<EntryAction>> {
    let mut commands: Vec<_> = VoucherKind::ALL
        .into_iter()
        .map(|kind| {
            PaletteCommand::new(
                kind.as_str(),
                format!("{} voucher", kind.label()),
                "Vouchers",
                EntryAction::SwitchVoucher(kind),
            )
        })
        .collect();
    commands.extend([
        PaletteCommand::new("save", "Save voucher", "Actions", EntryAction::Save),
        PaletteCommand::new("print", "Print voucher", "Actions", EntryAction::Print),
        PaletteCommand::new("delete-row", "Delete current row", "Actions", EntryAction::DeleteRow),
        PaletteCommand::new(
            "period",
            "Change working period",
            "Actions",
            EntryAction::ChangePeriod,
        ),
        PaletteCommand::new("go-date", "Date", "Go to", EntryAction::Jump(JumpTarget::Date)),
        PaletteCommand::new("go-party", "Party", "Go to", EntryAction::Jump(JumpTarget::Party)),
        PaletteCommand::new(
            "go-first-row",
            "First line",
            "Go to",
            EntryAction::Jump(JumpTarget::FirstRow),
        ),
        PaletteCommand::new(
            "go-narration",
            "Narration",
            "Go to",
            EntryAction::Jump(JumpTarget::Narration),
        ),
        PaletteCommand::new("help", "Keyboard shortcuts", "Help", EntryAction::ToggleHelp),
    ]);
    commands
}

#[cfg(test)]
mod tests {
    use super::{EntryAction, EntrySession, SessionConfig, SessionEvent};
    use crate::{
        ColumnKey, FieldId, HeaderField, KeyPress, MasterKind, MasterRecord, ModalKind,
        NetworkError, Request, Response, RowId, Scope, ShortcutBinding, TrailingField, VoucherId,
        VoucherKind, WorkingPeriod,
    };
    use time::{Date, Month};

    fn config(voucher: VoucherKind) -> SessionConfig {
        SessionConfig {
            voucher,
            min_rows: 2,
            period: WorkingPeriod::parse("2026-04-01..2027-03-31").expect("valid period"),
            today: Date::from_calendar_date(2026, Month::October, 19).expect("valid date"),
        }
    }

    fn ledgers() -> Vec<MasterRecord> {
        vec![
            MasterRecord::new(1, "Cash"),
            MasterRecord::new(2, "Bank - HDFC"),
            MasterRecord::new(3, "Bank - SBI"),
            MasterRecord::new(4, "Acme Traders").bill_wise(),
        ]
    }

    /// A session with the ledger list loaded and the first field focused.
    fn started(voucher: VoucherKind) -> EntrySession {
        let mut session = EntrySession::new(config(voucher)).expect("session builds");
        let events = session.start();
        for event in events {
            if let SessionEvent::Request(Request::LoadMasters { request, kind }) = event {
                let records = match kind {
                    MasterKind::Ledger => ledgers(),
                    _ => vec![MasterRecord::new(10, "Widget")],
                };
                session.apply_response(Response::Masters {
                    request,
                    kind,
                    result: Ok(records),
                });
            }
        }
        session.layout_pass();
        session
    }

    fn key(session: &mut EntrySession, press: KeyPress) -> Vec<SessionEvent> {
        session.handle_key(&press)
    }

    fn named(session: &mut EntrySession, name: &str) -> Vec<SessionEvent> {
        key(session, KeyPress::named(name))
    }

    fn type_text(session: &mut EntrySession, text: &str) {
        for ch in text.chars() {
            key(session, KeyPress::char(ch));
        }
    }

    fn row(session: &EntrySession, index: usize) -> RowId {
        session.form().rows()[index].id
    }

    fn requests(events: &[SessionEvent]) -> Vec<&Request> {
        events
            .iter()
            .filter_map(|event| match event {
                SessionEvent::Request(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn first_layout_pass_focuses_the_first_field() {
        let mut session = EntrySession::new(config(VoucherKind::Payment)).expect("session builds");
        let date = FieldId::Header(HeaderField::Date);
        assert_eq!(session.current_field(), None);
        assert_eq!(session.pending_field(), Some(date));

        let events = session.layout_pass();
        assert_eq!(events, vec![SessionEvent::FocusMoved(date)]);
        assert!(session.is_focused(date));
        assert!(
            session
                .catalogue()
                .iter()
                .any(|entry| entry.combo == "enter" && entry.scope == "date")
        );
    }

    #[test]
    fn binding_that_allows_default_runs_and_still_types() {
        let mut session = started(VoucherKind::Payment);
        let date = FieldId::Header(HeaderField::Date);
        session.focus(date);
        let before = session.display_text(date);
        let _scope = session
            .registry
            .register(
                vec![
                    ShortcutBinding::new("/", "print voucher", EntryAction::Print)
                        .allow_default(),
                ],
                Scope::field("date-extra"),
            )
            .expect("scope registers");

        let events = key(&mut session, KeyPress::char('/'));
        assert!(events.contains(&SessionEvent::PrintRequested(VoucherKind::Payment)));
        assert_eq!(session.display_text(date), format!("{before}/"));
    }

    #[test]
    fn escape_closes_help_and_typing_behind_it_is_ignored() {
        let mut session = started(VoucherKind::Payment);
        let date = FieldId::Header(HeaderField::Date);
        session.focus(date);
        let before = session.display_text(date);

        let events = key(&mut session, KeyPress::char('?'));
        assert!(events.contains(&SessionEvent::HelpToggled(true)));
        type_text(&mut session, "x");
        assert_eq!(session.display_text(date), before);

        let events = named(&mut session, "Escape");
        assert!(events.contains(&SessionEvent::HelpToggled(false)));
        assert!(!session.help_visible());
        assert!(session.is_focused(date));

        key(&mut session, KeyPress::char('?'));
        key(&mut session, KeyPress::char('?'));
        assert!(!session.help_visible());
    }

    #[test]
    fn enter_on_last_amount_appends_a_row_and_focuses_its_ledger_after_layout() {
        let mut session = started(VoucherKind::Payment);
        let last = row(&session, 1);
        session.focus(FieldId::cell(last, ColumnKey::Amount));
        type_text(&mut session, "250");

        let events = named(&mut session, "Enter");
        let appended = row(&session, 2);
        let awaiting = FieldId::cell(appended, ColumnKey::Ledger);
        assert!(events.contains(&SessionEvent::RowAdded(appended)));
        assert!(events.contains(&SessionEvent::FocusParked(awaiting)));

        let events = session.layout_pass();
        assert!(events.contains(&SessionEvent::FocusMoved(awaiting)));
        assert_eq!(session.current_field(), Some(awaiting));
    }

    #[test]
    fn typed_query_commits_then_advances_in_one_keystroke() {
        let mut session = started(VoucherKind::Payment);
        let ledger = FieldId::cell(row(&session, 0), ColumnKey::Ledger);
        session.focus(ledger);
        type_text(&mut session, "ban");
        assert_eq!(session.display_text(ledger), "ban");

        let events = named(&mut session, "Enter");
        let committed = events
            .iter()
            .position(|event| matches!(event, SessionEvent::SelectionCommitted { .. }))
            .expect("selection committed");
        let moved = events
            .iter()
            .position(|event| matches!(event, SessionEvent::FocusMoved(_)))
            .expect("focus moved");
        assert!(committed < moved);
        assert_eq!(session.display_text(ledger), "Bank - HDFC");
        assert_eq!(
            session.current_field(),
            Some(FieldId::cell(row(&session, 0), ColumnKey::Amount))
        );
    }

    #[test]
    fn bill_wise_ledger_opens_allocation_and_resumes_after_the_amount() {
        let mut session = started(VoucherKind::Receipt);
        let first = row(&session, 0);
        let amount = FieldId::cell(first, ColumnKey::Amount);
        session.focus(FieldId::cell(first, ColumnKey::Ledger));
        type_text(&mut session, "acme");
        named(&mut session, "Enter");
        type_text(&mut session, "500");

        let events = named(&mut session, "Enter");
        assert!(events.contains(&SessionEvent::ModalOpened(ModalKind::BillAllocation)));
        assert_eq!(session.current_field(), Some(amount));

        let events = key(&mut session, KeyPress::char('s').ctrl());
        assert!(requests(&events).is_empty(), "save is suppressed under a modal");

        type_text(&mut session, "INV-9");
        let events = key(&mut session, KeyPress::char('a').ctrl());
        assert!(events.contains(&SessionEvent::ModalClosed(ModalKind::BillAllocation)));
        assert_eq!(
            session.current_field(),
            Some(FieldId::cell(row(&session, 1), ColumnKey::Ledger))
        );
        let allocations = &session.form().rows()[0].allocations;
        assert_eq!(allocations.len(), 1);
        assert_eq!(allocations[0].reference, "INV-9");
        assert_eq!(allocations[0].amount_cents, 50_000);
    }

    #[test]
    fn cancelled_create_returns_to_trigger_and_ignores_late_response() {
        let mut session = started(VoucherKind::Payment);
        let ledger = FieldId::cell(row(&session, 0), ColumnKey::Ledger);
        session.focus(ledger);
        type_text(&mut session, "Petty");
        let events = key(&mut session, KeyPress::char('c').alt());
        assert!(events.contains(&SessionEvent::ModalOpened(ModalKind::CreateLedger)));
        assert_eq!(
            session.modal().map(|modal| modal.draft.value("name")),
            Some("Petty")
        );

        let events = key(&mut session, KeyPress::char('a').ctrl());
        let Some(Request::CreateMaster { request, .. }) = requests(&events).first().copied()
        else {
            panic!("create request expected, got {events:?}");
        };
        let request = *request;

        named(&mut session, "Escape");
        assert!(session.modal().is_none());
        assert_eq!(session.current_field(), Some(ledger));
        assert_eq!(session.form().pick(ledger), None);

        let events = session.apply_response(Response::Created {
            request,
            kind: MasterKind::Ledger,
            name: "Petty".to_owned(),
            result: Ok(42),
        });
        assert!(events.is_empty());
        assert_eq!(session.form().pick(ledger), None);
    }

    #[test]
    fn failed_create_keeps_dialog_and_success_refreshes_the_cache() {
        let mut session = started(VoucherKind::Payment);
        let ledger = FieldId::cell(row(&session, 0), ColumnKey::Ledger);
        session.focus(ledger);
        key(&mut session, KeyPress::char('c').alt());
        type_text(&mut session, "Petty Cash");

        let events = key(&mut session, KeyPress::char('a').ctrl());
        let Some(Request::CreateMaster { request, .. }) = requests(&events).first().copied()
        else {
            panic!("create request expected");
        };
        let events = session.apply_response(Response::Created {
            request: *request,
            kind: MasterKind::Ledger,
            name: "Petty Cash".to_owned(),
            result: Err(NetworkError::with_status(409, "ledger already exists")),
        });
        assert!(events.contains(&SessionEvent::ModalFailed("ledger already exists".to_owned())));
        let modal = session.modal().expect("dialog stays open");
        assert_eq!(modal.error(), Some("ledger already exists"));
        assert_eq!(modal.draft.value("name"), "Petty Cash");

        let events = key(&mut session, KeyPress::char('a').ctrl());
        let Some(Request::CreateMaster { request, .. }) = requests(&events).first().copied()
        else {
            panic!("retry request expected");
        };
        let events = session.apply_response(Response::Created {
            request: *request,
            kind: MasterKind::Ledger,
            name: "Petty Cash".to_owned(),
            result: Ok(77),
        });
        assert!(session.modal().is_none());
        assert_eq!(session.form().pick(ledger).map(|record| record.id), Some(77));
        assert!(
            requests(&events)
                .iter()
                .any(|request| matches!(request, Request::LoadMasters { kind: MasterKind::Ledger, .. }))
        );
        assert_eq!(
            session.current_field(),
            Some(FieldId::cell(row(&session, 0), ColumnKey::Amount))
        );
    }

    #[test]
    fn second_modal_is_rejected_while_one_is_open() {
        let mut session = started(VoucherKind::Payment);
        let ledger = FieldId::cell(row(&session, 0), ColumnKey::Ledger);
        session.focus(ledger);
        key(&mut session, KeyPress::char('c').alt());
        let before = session.modal().cloned();

        let events = key(&mut session, KeyPress::char('c').alt());
        assert!(!events.contains(&SessionEvent::ModalOpened(ModalKind::CreateLedger)));
        assert_eq!(session.modal().cloned(), before);
    }

    #[test]
    fn palette_closes_before_switching_voucher() {
        let mut session = started(VoucherKind::Payment);
        let events = key(&mut session, KeyPress::char('k').ctrl());
        assert_eq!(events, vec![SessionEvent::PaletteToggled(true)]);
        type_text(&mut session, "sales");

        let events = named(&mut session, "Enter");
        assert_eq!(events[0], SessionEvent::PaletteToggled(false));
        assert!(events.contains(&SessionEvent::VoucherSwitched(VoucherKind::Sales)));
        assert!(!session.palette().is_open());
        assert_eq!(session.form().kind(), VoucherKind::Sales);
        assert!(session.sequence().contains(&FieldId::Header(HeaderField::Party)));
    }

    #[test]
    fn function_keys_switch_voucher_type() {
        let mut session = started(VoucherKind::Payment);
        key(&mut session, KeyPress::named("F8").ctrl());
        assert_eq!(session.form().kind(), VoucherKind::CreditNote);
        named(&mut session, "F4");
        assert_eq!(session.form().kind(), VoucherKind::Contra);
    }

    #[test]
    fn save_validates_then_sends_and_ignores_stale_responses() {
        let mut session = started(VoucherKind::Payment);
        let events = key(&mut session, KeyPress::char('s').ctrl());
        assert!(
            events
                .iter()
                .any(|event| matches!(event, SessionEvent::ValidationFailed(_)))
        );
        assert!(!session.is_saving());

        session.focus(FieldId::cell(row(&session, 0), ColumnKey::Ledger));
        type_text(&mut session, "cash");
        named(&mut session, "Enter");
        type_text(&mut session, "100");

        let events = key(&mut session, KeyPress::char('s').ctrl());
        let Some(Request::SaveVoucher { request, payload }) = requests(&events).first().copied()
        else {
            panic!("save request expected, got {events:?}");
        };
        assert_eq!(payload.entries.len(), 1);
        assert_eq!(payload.entries[0].amount_cents, 10_000);
        let request = *request;

        let events = key(&mut session, KeyPress::char('s').ctrl());
        assert!(requests(&events).is_empty());

        let stale = session.apply_response(Response::Saved {
            request: crate::RequestId::new(request.get() + 100),
            result: Ok(VoucherId::new(1)),
        });
        assert!(stale.is_empty());
        assert!(session.is_saving());

        let events = session.apply_response(Response::Saved {
            request,
            result: Ok(VoucherId::new(31)),
        });
        assert!(events.contains(&SessionEvent::Saved(VoucherId::new(31))));
        assert!(session.form().rows().iter().all(|row| row.is_blank()));
        assert_eq!(session.status(), Some("voucher #31 saved"));
    }

    #[test]
    fn failed_save_keeps_the_form_for_retry() {
        let mut session = started(VoucherKind::Payment);
        session.focus(FieldId::cell(row(&session, 0), ColumnKey::Ledger));
        type_text(&mut session, "cash");
        named(&mut session, "Enter");
        type_text(&mut session, "100");
        let events = key(&mut session, KeyPress::char('s').ctrl());
        let request = requests(&events)[0].id();

        session.apply_response(Response::Saved {
            request,
            result: Err(NetworkError::new("server unavailable")),
        });
        assert!(!session.is_saving());
        assert_eq!(
            session
                .form()
                .text(FieldId::cell(row(&session, 0), ColumnKey::Amount)),
            "100"
        );
        let events = key(&mut session, KeyPress::char('s').ctrl());
        assert_eq!(requests(&events).len(), 1);
    }

    #[test]
    fn deleting_a_row_never_leaves_focus_on_it() {
        let mut session = started(VoucherKind::Journal);
        let last = row(&session, 1);
        session.focus(FieldId::cell(last, ColumnKey::Amount));
        named(&mut session, "Enter");
        session.layout_pass();
        let doomed = row(&session, 1);
        session.focus(FieldId::cell(doomed, ColumnKey::Amount));

        let events = key(&mut session, KeyPress::char('d').alt());
        assert!(events.contains(&SessionEvent::RowRemoved(doomed)));
        let current = session.current_field().expect("focus survives");
        assert_ne!(current.row(), Some(doomed));
        assert!(session.sequence().iter().all(|field| field.row() != Some(doomed)));

        let events = key(&mut session, KeyPress::char('d').alt());
        assert!(!events.iter().any(|event| matches!(event, SessionEvent::RowRemoved(_))));
        assert_eq!(session.status(), Some("a voucher keeps at least 2 rows"));
    }

    #[test]
    fn period_prompt_parses_and_rejects() {
        let mut session = started(VoucherKind::Payment);
        let events = key(&mut session, KeyPress::named("F2").alt());
        assert_eq!(events, vec![SessionEvent::PeriodPrompt(true)]);
        for _ in 0.."2026-04-01..2027-03-31".len() {
            named(&mut session, "Backspace");
        }
        type_text(&mut session, "2027-03-31..2026-04-01");
        named(&mut session, "Enter");
        assert!(session.period_prompt().is_some());

        for _ in 0.."2027-03-31..2026-04-01".len() {
            named(&mut session, "Backspace");
        }
        type_text(&mut session, "2025-04-01..2026-03-31");
        let events = named(&mut session, "Enter");
        let period = WorkingPeriod::parse("2025-04-01..2026-03-31").expect("valid period");
        assert!(events.contains(&SessionEvent::PeriodChanged(period)));
        assert_eq!(session.period(), period);
    }

    #[test]
    fn blank_last_line_closes_the_grid() {
        let mut session = started(VoucherKind::Payment);
        session.focus(FieldId::cell(row(&session, 1), ColumnKey::Ledger));
        named(&mut session, "Tab");
        assert_eq!(
            session.current_field(),
            Some(FieldId::Trailing(TrailingField::Narration))
        );
    }
}
