// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use ledgerkey_app::{
    AppRuntime, EntryLine, MasterKind, NetworkError, Request, RequestId, Response, VoucherId,
    VoucherKind, VoucherPayload,
};
use ledgerkey_client::Client;
use std::io::Read;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Response as HttpResponse, Server};

fn json_response(body: &str, status: u16) -> HttpResponse<std::io::Cursor<Vec<u8>>> {
    HttpResponse::from_string(body)
        .with_status_code(status)
        .with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        )
}

fn mock_server() -> Result<(Server, String)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());
    Ok((server, addr))
}

#[test]
fn unreachable_server_reports_actionable_network_error() {
    let client =
        Client::new("http://127.0.0.1:1/api", Duration::from_millis(50)).expect("client builds");

    let error = client
        .list_masters(MasterKind::Ledger)
        .expect_err("unreachable endpoint must fail");
    let network = NetworkError::from(error);
    assert_eq!(network.status, None);
    assert!(
        network.message.contains("server.base_url"),
        "{}",
        network.message
    );
}

#[test]
fn list_masters_reads_each_collection() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        for _ in 0..2 {
            let request = server.recv().expect("request expected");
            assert_eq!(request.method(), &Method::Get);
            let body = match request.url() {
                "/api/ledgers" => {
                    r#"[{"id":1,"name":"Cash"},{"id":4,"name":"Acme Traders","bill_wise":true,"group":"Sundry Debtors"}]"#
                }
                "/api/stock-items" => r#"[{"id":101,"name":"Copper Wire 1.5mm"}]"#,
                other => panic!("unexpected path {other}"),
            };
            request
                .respond(json_response(body, 200))
                .expect("response should succeed");
        }
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let ledgers = client.list_masters(MasterKind::Ledger)?;
    assert_eq!(ledgers.len(), 2);
    assert_eq!(ledgers[0].name, "Cash");
    assert!(!ledgers[0].bill_wise);
    assert!(ledgers[1].bill_wise);

    let items = client.list_masters(MasterKind::StockItem)?;
    assert_eq!(items[0].id, 101);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn create_master_posts_name_and_surfaces_conflicts() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Post);
        assert_eq!(request.url(), "/api/ledgers");
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("read body");
        assert_eq!(body, r#"{"name":"Petty Cash"}"#);
        request
            .respond(json_response(r#"{"id":77}"#, 201))
            .expect("response should succeed");

        let request = server.recv().expect("request expected");
        request
            .respond(json_response(
                r#"{"error":"ledger \"Petty Cash\" already exists"}"#,
                409,
            ))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    assert_eq!(client.create_master(MasterKind::Ledger, "Petty Cash")?, 77);

    let error = client
        .create_master(MasterKind::Ledger, "Petty Cash")
        .expect_err("conflict must fail");
    assert_eq!(
        NetworkError::from(error),
        NetworkError::with_status(409, "ledger \"Petty Cash\" already exists")
    );

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn save_voucher_sends_payload_json() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/vouchers");
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("read body");
        let parsed: serde_json::Value = serde_json::from_str(&body).expect("json body");
        assert_eq!(parsed["voucher_type"], "payment");
        assert_eq!(parsed["date"], "2026-10-19");
        assert_eq!(parsed["entries"].as_array().map(Vec::len), Some(1));
        request
            .respond(json_response(r#"{"id":31}"#, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let payload = VoucherPayload {
        voucher_type: VoucherKind::Payment,
        date: "2026-10-19".to_owned(),
        reference: "CHQ-1".to_owned(),
        party_id: None,
        narration: String::new(),
        entries: vec![EntryLine {
            ledger_id: Some(ledgerkey_app::LedgerId::new(2)),
            item_id: None,
            quantity_hundredths: None,
            rate_cents: None,
            amount_cents: 250_000,
            allocations: Vec::new(),
        }],
    };
    assert_eq!(client.save_voucher(&payload)?, VoucherId::new(31));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn spawned_requests_answer_on_the_channel() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/voucher-types");
        request
            .respond(HttpResponse::from_string("maintenance").with_status_code(503))
            .expect("response should succeed");
    });

    let mut client = Client::new(&addr, Duration::from_secs(1))?;
    let (tx, rx) = mpsc::channel();
    client.spawn_request(
        Request::LoadMasters {
            request: RequestId::new(9),
            kind: MasterKind::VoucherType,
        },
        tx,
    )?;

    let response = rx.recv_timeout(Duration::from_secs(2))?;
    assert_eq!(
        response,
        Response::Masters {
            request: RequestId::new(9),
            kind: MasterKind::VoucherType,
            result: Err(NetworkError::with_status(
                503,
                "server error (503): maintenance"
            )),
        }
    );

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn ping_counts_voucher_types() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/voucher-types");
        request
            .respond(json_response(
                r#"[{"id":1,"name":"Contra"},{"id":2,"name":"Payment"}]"#,
                200,
            ))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    assert_eq!(client.ping()?, 2);

    handle.join().expect("server thread should join");
    Ok(())
}
