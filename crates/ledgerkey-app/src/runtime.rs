// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use std::sync::mpsc::Sender;

use crate::{MasterKind, MasterRecord, NetworkError, RequestId, VoucherId, VoucherPayload};

/// Outbound work the entry session asks its host to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    LoadMasters {
        request: RequestId,
        kind: MasterKind,
    },
    CreateMaster {
        request: RequestId,
        kind: MasterKind,
        name: String,
    },
    SaveVoucher {
        request: RequestId,
        payload: VoucherPayload,
    },
}

impl Request {
    pub fn id(&self) -> RequestId {
        match self {
            Self::LoadMasters { request, .. }
            | Self::CreateMaster { request, .. }
            | Self::SaveVoucher { request, .. } => *request,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Masters {
        request: RequestId,
        kind: MasterKind,
        result: Result<Vec<MasterRecord>, NetworkError>,
    },
    Created {
        request: RequestId,
        kind: MasterKind,
        name: String,
        result: Result<i64, NetworkError>,
    },
    Saved {
        request: RequestId,
        result: Result<VoucherId, NetworkError>,
    },
}

impl Response {
    pub fn id(&self) -> RequestId {
        match self {
            Self::Masters { request, .. }
            | Self::Created { request, .. }
            | Self::Saved { request, .. } => *request,
        }
    }
}

/// Record service behind the entry form.
pub trait AppRuntime {
    fn list_masters(&mut self, kind: MasterKind) -> Result<Vec<MasterRecord>>;
    fn create_master(&mut self, kind: MasterKind, name: &str) -> Result<i64>;
    fn save_voucher(&mut self, payload: &VoucherPayload) -> Result<VoucherId>;

    fn execute(&mut self, request: Request) -> Response {
        match request {
            Request::LoadMasters { request, kind } => Response::Masters {
                request,
                kind,
                result: self.list_masters(kind).map_err(NetworkError::from),
            },
            Request::CreateMaster {
                request,
                kind,
                name,
            } => {
                let result = self.create_master(kind, &name).map_err(NetworkError::from);
                Response::Created {
                    request,
                    kind,
                    name,
                    result,
                }
            }
            Request::SaveVoucher { request, payload } => Response::Saved {
                request,
                result: self.save_voucher(&payload).map_err(NetworkError::from),
            },
        }
    }

    /// Runs `request` and delivers its response on `tx`. The default is
    /// synchronous; networked runtimes override it to answer from a worker.
    fn spawn_request(&mut self, request: Request, tx: Sender<Response>) -> Result<()> {
        let response = self.execute(request);
        tx.send(response)
            .map_err(|_| anyhow!("response channel closed"))?;
        Ok(())
    }
}
