// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::debug;

use crate::{
    BillAllocation, FieldId, InteractionError, MasterRecord, ModalKind, NetworkError, RequestId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftField {
    pub label: &'static str,
    pub value: String,
}

/// What the operator has typed into the dialog so far. Survives failed commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalDraft {
    pub fields: Vec<DraftField>,
    pub cursor: usize,
}

impl ModalDraft {
    pub fn for_kind(kind: ModalKind, seed: &str) -> Self {
        let fields = match kind {
            ModalKind::CreateLedger | ModalKind::CreateItem => vec![DraftField {
                label: "name",
                value: seed.to_owned(),
            }],
            ModalKind::BillAllocation => vec![
                DraftField {
                    label: "bill ref",
                    value: String::new(),
                },
                DraftField {
                    label: "amount",
                    value: seed.to_owned(),
                },
            ],
        };
        Self { fields, cursor: 0 }
    }

    pub fn value(&self, label: &str) -> &str {
        self.fields
            .iter()
            .find(|field| field.label == label)
            .map(|field| field.value.as_str())
            .unwrap_or("")
    }

    pub fn push_char(&mut self, ch: char) {
        if let Some(field) = self.fields.get_mut(self.cursor) {
            field.value.push(ch);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.cursor) {
            field.value.pop();
        }
    }

    pub fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.cursor = (self.cursor + 1) % self.fields.len();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Editing,
    Committing(RequestId),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalSession {
    pub kind: ModalKind,
    pub trigger: FieldId,
    pub draft: ModalDraft,
    pub resolution: Resolution,
}

impl ModalSession {
    pub fn is_pending(&self) -> bool {
        matches!(self.resolution, Resolution::Committing(_))
    }

    pub fn error(&self) -> Option<&str> {
        match &self.resolution {
            Resolution::Failed(message) => Some(message),
            Resolution::Editing | Resolution::Committing(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitValue {
    Created(MasterRecord),
    Allocations(Vec<BillAllocation>),
}

/// A session that finished successfully; the caller writes `value` into
/// `trigger` and resumes traversal after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub kind: ModalKind,
    pub trigger: FieldId,
    pub value: CommitValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Resolved(Resolved),
    Failed(String),
    /// The response belongs to a session that is gone or was superseded.
    Stale,
}

/// IDLE / OPEN state machine guarding the single in-flight interruption.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModalInterruption {
    session: Option<ModalSession>,
    last_request: u64,
}

impl ModalInterruption {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&ModalSession> {
        self.session.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut ModalDraft> {
        self.session.as_mut().map(|session| &mut session.draft)
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn open(
        &mut self,
        kind: ModalKind,
        trigger: FieldId,
        seed: &str,
    ) -> Result<&ModalSession, InteractionError> {
        if let Some(open) = &self.session {
            return Err(InteractionError::ModalBusy {
                open: open.kind,
                requested: kind,
            });
        }
        Ok(self.session.insert(ModalSession {
            kind,
            trigger,
            draft: ModalDraft::for_kind(kind, seed),
            resolution: Resolution::Editing,
        }))
    }

    /// Marks the session as waiting on a create call and returns the id the
    /// response must carry.
    pub fn begin_commit(&mut self) -> Result<RequestId, InteractionError> {
        let Some(session) = self.session.as_mut() else {
            return Err(InteractionError::NoModal);
        };
        if session.is_pending() {
            return Err(InteractionError::CommitPending);
        }
        self.last_request += 1;
        let request = RequestId::new(self.last_request);
        session.resolution = Resolution::Committing(request);
        Ok(request)
    }

    /// Commits a value that needs no round trip (bill allocations).
    pub fn commit_local(&mut self, value: CommitValue) -> Result<Resolved, InteractionError> {
        match &self.session {
            None => return Err(InteractionError::NoModal),
            Some(session) if session.is_pending() => return Err(InteractionError::CommitPending),
            Some(_) => {}
        }
        let session = self.session.take().ok_or(InteractionError::NoModal)?;
        Ok(Resolved {
            kind: session.kind,
            trigger: session.trigger,
            value,
        })
    }

    /// Flags input the dialog cannot accept yet. The draft stays as typed.
    pub fn reject(&mut self, message: impl Into<String>) -> Result<(), InteractionError> {
        let Some(session) = self.session.as_mut() else {
            return Err(InteractionError::NoModal);
        };
        if session.is_pending() {
            return Err(InteractionError::CommitPending);
        }
        session.resolution = Resolution::Failed(message.into());
        Ok(())
    }

    /// Applies the response of a create call.
    pub fn complete(
        &mut self,
        request: RequestId,
        result: Result<MasterRecord, NetworkError>,
    ) -> Completion {
        let matches = self
            .session
            .as_ref()
            .is_some_and(|session| session.resolution == Resolution::Committing(request));
        if !matches {
            debug!(request = request.get(), "stale modal response discarded");
            return Completion::Stale;
        }

        match result {
            Ok(record) => match self.session.take() {
                Some(session) => Completion::Resolved(Resolved {
                    kind: session.kind,
                    trigger: session.trigger,
                    value: CommitValue::Created(record),
                }),
                None => Completion::Stale,
            },
            Err(error) => {
                let message = error.to_string();
                if let Some(session) = self.session.as_mut() {
                    session.resolution = Resolution::Failed(message.clone());
                }
                Completion::Failed(message)
            }
        }
    }

    /// Closes without touching the origin field, even while a create call is
    /// still in flight. Returns the field focus goes back to.
    pub fn cancel(&mut self) -> Option<FieldId> {
        self.session.take().map(|session| session.trigger)
    }
}
