// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use ledgerkey_app::{
    AppRuntime, MasterKind, MasterRecord, Request, Response, VoucherId, VoucherPayload,
};
use ledgerkey_client::Client;
use ledgerkey_testkit::MemoryRuntime;
use std::sync::mpsc::Sender;

const DEMO_SEED: u64 = 2026;
const DEMO_PARTIES: usize = 40;

/// Record service the binary talks to: the ledger service over HTTP, or an
/// in-memory book for `--demo`.
pub enum Backend {
    Http(Client),
    Memory(MemoryRuntime),
}

impl Backend {
    pub fn demo() -> Self {
        Self::Memory(MemoryRuntime::demo(DEMO_SEED, DEMO_PARTIES))
    }

    /// Number of voucher types the backend knows; fails when it cannot be
    /// reached.
    pub fn check(&mut self) -> Result<usize> {
        match self {
            Self::Http(client) => client.ping(),
            Self::Memory(memory) => Ok(memory.list_masters(MasterKind::VoucherType)?.len()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Http(client) => client.base_url().to_owned(),
            Self::Memory(_) => "in-memory demo book".to_owned(),
        }
    }
}

impl AppRuntime for Backend {
    fn list_masters(&mut self, kind: MasterKind) -> Result<Vec<MasterRecord>> {
        match self {
            Self::Http(client) => AppRuntime::list_masters(client, kind),
            Self::Memory(memory) => memory.list_masters(kind),
        }
    }

    fn create_master(&mut self, kind: MasterKind, name: &str) -> Result<i64> {
        match self {
            Self::Http(client) => AppRuntime::create_master(client, kind, name),
            Self::Memory(memory) => memory.create_master(kind, name),
        }
    }

    fn save_voucher(&mut self, payload: &VoucherPayload) -> Result<VoucherId> {
        match self {
            Self::Http(client) => AppRuntime::save_voucher(client, payload),
            Self::Memory(memory) => memory.save_voucher(payload),
        }
    }

    fn spawn_request(&mut self, request: Request, tx: Sender<Response>) -> Result<()> {
        match self {
            Self::Http(client) => client.spawn_request(request, tx),
            Self::Memory(memory) => memory.spawn_request(request, tx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Backend;
    use anyhow::Result;
    use ledgerkey_app::{
        AppRuntime, MasterKind, Request, RequestId, Response, VoucherKind,
    };
    use ledgerkey_client::Client;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn demo_backend_reports_every_voucher_type() -> Result<()> {
        let mut backend = Backend::demo();
        assert_eq!(backend.check()?, VoucherKind::ALL.len());
        assert_eq!(backend.describe(), "in-memory demo book");
        Ok(())
    }

    #[test]
    fn demo_backend_has_generated_parties() -> Result<()> {
        let mut backend = Backend::demo();
        let ledgers = backend.list_masters(MasterKind::Ledger)?;
        assert!(ledgers.len() > 6, "expected generated parties, got {}", ledgers.len());
        assert!(ledgers.iter().any(|record| record.name == "Cash"));
        Ok(())
    }

    #[test]
    fn memory_backend_answers_spawned_requests_on_the_channel() -> Result<()> {
        let mut backend = Backend::demo();
        let (tx, rx) = mpsc::channel();
        backend.spawn_request(
            Request::CreateMaster {
                request: RequestId::new(3),
                kind: MasterKind::Ledger,
                name: "Petty Cash".to_owned(),
            },
            tx,
        )?;

        match rx.recv_timeout(Duration::from_secs(1))? {
            Response::Created { request, result, .. } => {
                assert_eq!(request, RequestId::new(3));
                assert!(result.is_ok());
            }
            other => panic!("unexpected response {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn http_backend_check_surfaces_unreachable_service() -> Result<()> {
        let client = Client::new("http://127.0.0.1:1/api", Duration::from_millis(50))?;
        let mut backend = Backend::Http(client);
        assert_eq!(backend.describe(), "http://127.0.0.1:1/api");
        let error = backend.check().expect_err("unreachable service must fail");
        assert!(format!("{error:#}").contains("server.base_url"));
        Ok(())
    }
}
