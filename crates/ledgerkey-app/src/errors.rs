// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

use crate::{FieldId, ModalKind};

/// Misuse of the interaction engine that callers are expected to handle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InteractionError {
    #[error("shortcut {chord:?} is already registered in scope {scope:?}")]
    DuplicateRegistration { chord: String, scope: String },

    #[error("cannot open {requested:?} while {open:?} is still open -- finish or cancel it first")]
    ModalBusy { open: ModalKind, requested: ModalKind },

    #[error("no modal is open")]
    NoModal,

    #[error("modal commit already in flight; wait for it or press Esc")]
    CommitPending,

    #[error("field {0} is not part of the current form")]
    UnknownField(FieldId),

    #[error("a voucher keeps at least {min} rows")]
    RowMinimum { min: usize },
}

/// A create or save call that did not succeed. The form keeps all input so the
/// operator can retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct NetworkError {
    pub message: String,
    pub status: Option<u16>,
}

impl NetworkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }
}

impl From<anyhow::Error> for NetworkError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<NetworkError>() {
            Ok(network) => network,
            Err(other) => Self::new(format!("{other:#}")),
        }
    }
}

/// A local, non-fatal problem with the entered data. Shown inline next to the
/// field; editing continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: FieldId,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: FieldId, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}
