// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use ledgerkey_app::{
    AppRuntime, MasterKind, MasterRecord, NetworkError, Request, Response, VoucherId,
    VoucherPayload,
};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Blocking client for the ledger service. Cheap to clone; clones share the
/// connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("server.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("parse server.base_url {base_url:?}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "server.base_url must use http or https, got {:?}",
                parsed.scheme()
            );
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn list_masters(&self, kind: MasterKind) -> Result<Vec<MasterRecord>> {
        let response = self
            .http
            .get(self.endpoint(kind))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let rows: Vec<MasterRow> = response
            .json()
            .with_context(|| format!("decode {} list", kind.label()))?;
        Ok(rows.into_iter().map(MasterRow::into_record).collect())
    }

    pub fn create_master(&self, kind: MasterKind, name: &str) -> Result<i64> {
        if kind == MasterKind::VoucherType {
            bail!("voucher types cannot be created from the entry screen");
        }
        let response = self
            .http
            .post(self.endpoint(kind))
            .json(&CreateMasterRequest { name })
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let created: CreatedResponse = response
            .json()
            .with_context(|| format!("decode created {}", kind.label()))?;
        Ok(created.id)
    }

    pub fn save_voucher(&self, payload: &VoucherPayload) -> Result<VoucherId> {
        let response = self
            .http
            .post(format!("{}/vouchers", self.base_url))
            .json(payload)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let created: CreatedResponse = response.json().context("decode saved voucher")?;
        Ok(VoucherId::new(created.id))
    }

    /// Confirms the service answers by listing voucher types.
    pub fn ping(&self) -> Result<usize> {
        let types = self.list_masters(MasterKind::VoucherType)?;
        if types.is_empty() {
            bail!(
                "{} returned no voucher types -- check that the company is loaded",
                self.base_url
            );
        }
        Ok(types.len())
    }

    fn endpoint(&self, kind: MasterKind) -> String {
        format!("{}/{}", self.base_url, collection(kind))
    }
}

impl AppRuntime for Client {
    fn list_masters(&mut self, kind: MasterKind) -> Result<Vec<MasterRecord>> {
        Client::list_masters(self, kind)
    }

    fn create_master(&mut self, kind: MasterKind, name: &str) -> Result<i64> {
        Client::create_master(self, kind, name)
    }

    fn save_voucher(&mut self, payload: &VoucherPayload) -> Result<VoucherId> {
        Client::save_voucher(self, payload)
    }

    /// Answers from a worker thread so the event loop keeps drawing while the
    /// call is in flight.
    fn spawn_request(&mut self, request: Request, tx: Sender<Response>) -> Result<()> {
        let mut worker = self.clone();
        let id = request.id();
        thread::Builder::new()
            .name(format!("ledgerkey-request-{}", id.get()))
            .spawn(move || {
                let response = worker.execute(request);
                if tx.send(response).is_err() {
                    debug!(request = id.get(), "response dropped; event loop gone");
                }
            })
            .context("spawn request worker")?;
        Ok(())
    }
}

const fn collection(kind: MasterKind) -> &'static str {
    match kind {
        MasterKind::Ledger => "ledgers",
        MasterKind::StockItem => "stock-items",
        MasterKind::VoucherType => "voucher-types",
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    warn!(%base_url, %error, "ledger service unreachable");
    let message = if error.is_timeout() {
        format!("{base_url} timed out -- raise server.timeout or check server.base_url")
    } else {
        format!(
            "cannot reach {base_url} -- check server.base_url and that the ledger service is running ({error})"
        )
    };
    NetworkError::new(message).into()
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    let code = status.as_u16();
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.error.or(parsed.message)
        && !message.is_empty()
    {
        return NetworkError::with_status(code, message).into();
    }

    if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        return NetworkError::with_status(code, format!("server error ({code}): {body}")).into();
    }

    let message = match status.canonical_reason() {
        Some(reason) => format!("server returned {code} {reason}"),
        None => format!("server returned {code}"),
    };
    NetworkError::with_status(code, message).into()
}

/// Turns any error from this crate into the message the form shows.
pub fn describe(error: &anyhow::Error) -> String {
    match error.downcast_ref::<NetworkError>() {
        Some(network) => network.message.clone(),
        None => format!("{error:#}"),
    }
}

#[derive(Debug, Serialize)]
struct CreateMasterRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct MasterRow {
    id: i64,
    name: String,
    #[serde(default)]
    bill_wise: bool,
}

impl MasterRow {
    fn into_record(self) -> MasterRecord {
        let record = MasterRecord::new(self.id, self.name);
        if self.bill_wise {
            record.bill_wise()
        } else {
            record
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
    message: Option<String>,
}
