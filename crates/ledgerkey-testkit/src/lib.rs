// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use ledgerkey_app::{
    AppRuntime, EntryLine, LedgerId, MasterKind, MasterRecord, NetworkError, VoucherId,
    VoucherKind, VoucherPayload, WorkingPeriod,
};
use std::collections::VecDeque;
use time::{Date, Month};
use tracing::debug;

const PARTY_ADJECTIVES: [&str; 12] = [
    "Acme", "Bharat", "Crescent", "Deccan", "Eastern", "Global", "Himalaya", "Indus", "Jyoti",
    "Kaveri", "Lotus", "Meridian",
];

const PARTY_TRADES: [&str; 10] = [
    "Traders",
    "Textiles",
    "Hardware",
    "Electricals",
    "Pharma",
    "Foods",
    "Steel",
    "Plastics",
    "Paper Mills",
    "Motors",
];

const PARTY_SUFFIXES: [&str; 5] = ["", " & Sons", " Pvt Ltd", " Agencies", " Enterprises"];

const ITEM_MATERIALS: [&str; 10] = [
    "Copper", "Steel", "PVC", "Cotton", "Teak", "Brass", "Glass", "Nylon", "Granite", "Rubber",
];

const ITEM_SHAPES: [&str; 8] = [
    "Wire 1.5mm",
    "Pipe 20mm",
    "Sheet 4x8",
    "Bolt M10",
    "Roll 50m",
    "Panel",
    "Washer",
    "Fitting",
];

const NARRATION_WORDS: [&str; 14] = [
    "being", "amount", "paid", "received", "towards", "invoice", "advance", "settlement", "for",
    "goods", "services", "rendered", "as", "per",
];

const CASH_LEDGER: i64 = 1;

/// Ledgers every seeded runtime starts with. `Acme Traders` keeps bill-wise
/// details so amount entry against it opens the allocation dialog.
pub fn seed_ledgers() -> Vec<MasterRecord> {
    vec![
        MasterRecord::new(CASH_LEDGER, "Cash"),
        MasterRecord::new(2, "Bank - HDFC"),
        MasterRecord::new(3, "Bank - SBI"),
        MasterRecord::new(4, "Acme Traders").bill_wise(),
        MasterRecord::new(5, "Sales Account"),
        MasterRecord::new(6, "Purchase Account"),
    ]
}

pub fn seed_items() -> Vec<MasterRecord> {
    vec![
        MasterRecord::new(101, "Copper Wire 1.5mm"),
        MasterRecord::new(102, "Steel Bolt M10"),
        MasterRecord::new(103, "PVC Pipe 20mm"),
    ]
}

pub fn voucher_types() -> Vec<MasterRecord> {
    VoucherKind::ALL
        .into_iter()
        .zip(1_i64..)
        .map(|(kind, id)| MasterRecord::new(id, kind.label()))
        .collect()
}

pub fn fixture_date() -> Date {
    Date::from_calendar_date(2026, Month::October, 19).expect("valid fixture date")
}

pub fn fixture_period() -> WorkingPeriod {
    WorkingPeriod::fiscal_year_containing(fixture_date()).expect("valid fixture period")
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator for demo masters and amounts. The same seed always
/// produces the same sequence.
#[derive(Debug, Clone)]
pub struct LedgerFaker {
    rng: DeterministicRng,
}

impl LedgerFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn party_name(&mut self) -> String {
        let adjective = self.pick(&PARTY_ADJECTIVES);
        let trade = self.pick(&PARTY_TRADES);
        let suffix = self.pick(&PARTY_SUFFIXES);
        format!("{adjective} {trade}{suffix}")
    }

    pub fn stock_item_name(&mut self) -> String {
        let material = self.pick(&ITEM_MATERIALS);
        let shape = self.pick(&ITEM_SHAPES);
        format!("{material} {shape}")
    }

    /// An amount in hundredths between 1.00 and 99,999.00, whole rupees half
    /// of the time.
    pub fn amount_hundredths(&mut self) -> i64 {
        let rupees = 1 + self.rng.int_n(99_999) as i64;
        let paise = if self.rng.bool() {
            0
        } else {
            self.rng.int_n(100) as i64
        };
        rupees * 100 + paise
    }

    pub fn narration(&mut self) -> String {
        let count = 3 + self.rng.int_n(5);
        let mut words = Vec::with_capacity(count);
        for _ in 0..count {
            words.push(self.pick(&NARRATION_WORDS));
        }
        let mut sentence = words.join(" ");
        if let Some(first) = sentence.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        sentence
    }

    fn pick<'a>(&mut self, values: &[&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeCall {
    ListMasters(MasterKind),
    CreateMaster(MasterKind),
    SaveVoucher,
}

impl RuntimeCall {
    fn same_operation(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::ListMasters(_), Self::ListMasters(_))
                | (Self::CreateMaster(_), Self::CreateMaster(_))
                | (Self::SaveVoucher, Self::SaveVoucher)
        )
    }
}

/// In-process record service. Answers synchronously, keeps everything it is
/// given, and can be told to fail the next call of a given kind.
#[derive(Debug, Clone, Default)]
pub struct MemoryRuntime {
    ledgers: Vec<MasterRecord>,
    items: Vec<MasterRecord>,
    voucher_types: Vec<MasterRecord>,
    saved: Vec<(VoucherId, VoucherPayload)>,
    calls: Vec<RuntimeCall>,
    failures: VecDeque<(RuntimeCall, NetworkError)>,
    next_master_id: i64,
    next_voucher_id: i64,
}

impl MemoryRuntime {
    pub fn new() -> Self {
        Self {
            next_master_id: 1_000,
            next_voucher_id: 1,
            ..Self::default()
        }
    }

    pub fn seeded() -> Self {
        Self {
            ledgers: seed_ledgers(),
            items: seed_items(),
            voucher_types: voucher_types(),
            ..Self::new()
        }
    }

    /// Seeded masters plus `parties` generated party ledgers and as many stock
    /// items. Every generated party also gets one receipt against Cash in the
    /// saved history, so new vouchers do not start at #1.
    pub fn demo(seed: u64, parties: usize) -> Self {
        let mut runtime = Self::seeded();
        let mut faker = LedgerFaker::new(seed);
        for _ in 0..parties {
            let party = faker.party_name();
            let item = faker.stock_item_name();
            let _ = runtime.insert(MasterKind::StockItem, &item);
            let Ok(party_id) = runtime.insert(MasterKind::Ledger, &party) else {
                continue;
            };
            let receipt = VoucherPayload {
                voucher_type: VoucherKind::Receipt,
                date: fixture_date().to_string(),
                reference: String::new(),
                party_id: Some(LedgerId::new(party_id)),
                narration: faker.narration(),
                entries: vec![EntryLine {
                    ledger_id: Some(LedgerId::new(CASH_LEDGER)),
                    item_id: None,
                    quantity_hundredths: None,
                    rate_cents: None,
                    amount_cents: faker.amount_hundredths(),
                    allocations: Vec::new(),
                }],
            };
            let id = VoucherId::new(runtime.next_voucher_id);
            runtime.next_voucher_id += 1;
            runtime.saved.push((id, receipt));
        }
        runtime
    }

    /// Queues a failure for the next call of the same operation. Failures are
    /// consumed in the order they were queued.
    pub fn fail_next(&mut self, call: RuntimeCall, error: NetworkError) {
        self.failures.push_back((call, error));
    }

    pub fn calls(&self) -> &[RuntimeCall] {
        &self.calls
    }

    pub fn saved(&self) -> &[(VoucherId, VoucherPayload)] {
        &self.saved
    }

    pub fn masters(&self, kind: MasterKind) -> &[MasterRecord] {
        match kind {
            MasterKind::Ledger => &self.ledgers,
            MasterKind::StockItem => &self.items,
            MasterKind::VoucherType => &self.voucher_types,
        }
    }

    fn masters_mut(&mut self, kind: MasterKind) -> &mut Vec<MasterRecord> {
        match kind {
            MasterKind::Ledger => &mut self.ledgers,
            MasterKind::StockItem => &mut self.items,
            MasterKind::VoucherType => &mut self.voucher_types,
        }
    }

    fn insert(&mut self, kind: MasterKind, name: &str) -> Result<i64> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(NetworkError::with_status(422, "name is required").into());
        }
        if self
            .masters(kind)
            .iter()
            .any(|record| record.name.eq_ignore_ascii_case(trimmed))
        {
            return Err(NetworkError::with_status(
                409,
                format!("{} {trimmed:?} already exists", kind.label()),
            )
            .into());
        }
        let id = self.next_master_id;
        self.next_master_id += 1;
        self.masters_mut(kind).push(MasterRecord::new(id, trimmed));
        Ok(id)
    }

    fn record(&mut self, call: RuntimeCall) -> Result<()> {
        self.calls.push(call);
        let position = self
            .failures
            .iter()
            .position(|(queued, _)| queued.same_operation(call));
        if let Some((_, error)) = position.and_then(|index| self.failures.remove(index)) {
            debug!(?call, %error, "injected failure");
            return Err(error.into());
        }
        Ok(())
    }
}

impl AppRuntime for MemoryRuntime {
    fn list_masters(&mut self, kind: MasterKind) -> Result<Vec<MasterRecord>> {
        self.record(RuntimeCall::ListMasters(kind))?;
        Ok(self.masters(kind).to_vec())
    }

    fn create_master(&mut self, kind: MasterKind, name: &str) -> Result<i64> {
        self.record(RuntimeCall::CreateMaster(kind))?;
        if kind == MasterKind::VoucherType {
            bail!("voucher types are fixed");
        }
        self.insert(kind, name)
    }

    fn save_voucher(&mut self, payload: &VoucherPayload) -> Result<VoucherId> {
        self.record(RuntimeCall::SaveVoucher)?;
        let id = VoucherId::new(self.next_voucher_id);
        self.next_voucher_id += 1;
        self.saved.push((id, payload.clone()));
        Ok(id)
    }
}
