// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::macros::format_description;
use time::{Date, Month};

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherKind {
    Contra,
    Payment,
    Receipt,
    Journal,
    Sales,
    Purchase,
    CreditNote,
    DebitNote,
}

impl VoucherKind {
    pub const ALL: [Self; 8] = [
        Self::Contra,
        Self::Payment,
        Self::Receipt,
        Self::Journal,
        Self::Sales,
        Self::Purchase,
        Self::CreditNote,
        Self::DebitNote,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contra => "contra",
            Self::Payment => "payment",
            Self::Receipt => "receipt",
            Self::Journal => "journal",
            Self::Sales => "sales",
            Self::Purchase => "purchase",
            Self::CreditNote => "credit_note",
            Self::DebitNote => "debit_note",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "contra" => Some(Self::Contra),
            "payment" => Some(Self::Payment),
            "receipt" => Some(Self::Receipt),
            "journal" => Some(Self::Journal),
            "sales" => Some(Self::Sales),
            "purchase" => Some(Self::Purchase),
            "credit_note" => Some(Self::CreditNote),
            "debit_note" => Some(Self::DebitNote),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Contra => "Contra",
            Self::Payment => "Payment",
            Self::Receipt => "Receipt",
            Self::Journal => "Journal",
            Self::Sales => "Sales",
            Self::Purchase => "Purchase",
            Self::CreditNote => "Credit Note",
            Self::DebitNote => "Debit Note",
        }
    }

    /// Direct-switch chord for this voucher type.
    pub const fn chord(self) -> &'static str {
        match self {
            Self::Contra => "f4",
            Self::Payment => "f5",
            Self::Receipt => "f6",
            Self::Journal => "f7",
            Self::Sales => "f8",
            Self::Purchase => "f9",
            Self::CreditNote => "ctrl+f8",
            Self::DebitNote => "ctrl+f9",
        }
    }

    pub const fn row_kind(self) -> RowKind {
        match self {
            Self::Contra | Self::Payment | Self::Receipt | Self::Journal => RowKind::Account,
            Self::Sales | Self::Purchase | Self::CreditNote | Self::DebitNote => RowKind::Item,
        }
    }
}

/// Shape of a grid row. Account rows post to ledgers; item rows describe stock
/// lines of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    Account,
    Item,
}

impl RowKind {
    pub const fn columns(self) -> &'static [ColumnKey] {
        match self {
            Self::Account => &[ColumnKey::Ledger, ColumnKey::Amount],
            Self::Item => &[
                ColumnKey::Item,
                ColumnKey::Quantity,
                ColumnKey::Rate,
                ColumnKey::Amount,
            ],
        }
    }

    pub fn first_column(self) -> ColumnKey {
        self.columns()[0]
    }

    pub fn last_column(self) -> ColumnKey {
        self.columns()[self.columns().len() - 1]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnKey {
    Ledger,
    Item,
    Quantity,
    Rate,
    Amount,
}

impl ColumnKey {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ledger => "ledger",
            Self::Item => "item",
            Self::Quantity => "qty",
            Self::Rate => "rate",
            Self::Amount => "amount",
        }
    }

    /// Columns that pick a master record through a searchable select.
    pub const fn master(self) -> Option<MasterKind> {
        match self {
            Self::Ledger => Some(MasterKind::Ledger),
            Self::Item => Some(MasterKind::StockItem),
            Self::Quantity | Self::Rate | Self::Amount => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeaderField {
    Date,
    Reference,
    Party,
}

impl HeaderField {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Reference => "ref",
            Self::Party => "party",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TrailingField {
    Narration,
}

impl TrailingField {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Narration => "narration",
        }
    }
}

/// Stable key of one navigable input in the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldId {
    Header(HeaderField),
    Cell { row: RowId, column: ColumnKey },
    Trailing(TrailingField),
}

impl FieldId {
    pub const fn cell(row: RowId, column: ColumnKey) -> Self {
        Self::Cell { row, column }
    }

    pub const fn row(self) -> Option<RowId> {
        match self {
            Self::Cell { row, .. } => Some(row),
            Self::Header(_) | Self::Trailing(_) => None,
        }
    }

    pub const fn master(self) -> Option<MasterKind> {
        match self {
            Self::Header(HeaderField::Party) => Some(MasterKind::Ledger),
            Self::Cell { column, .. } => column.master(),
            Self::Header(_) | Self::Trailing(_) => None,
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header(field) => f.write_str(field.label()),
            Self::Cell { row, column } => write!(f, "row {} {}", row.get(), column.label()),
            Self::Trailing(field) => f.write_str(field.label()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MasterKind {
    Ledger,
    StockItem,
    VoucherType,
}

impl MasterKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ledger => "ledger",
            Self::StockItem => "stock item",
            Self::VoucherType => "voucher type",
        }
    }

    pub const fn create_modal(self) -> Option<ModalKind> {
        match self {
            Self::Ledger => Some(ModalKind::CreateLedger),
            Self::StockItem => Some(ModalKind::CreateItem),
            Self::VoucherType => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModalKind {
    CreateLedger,
    CreateItem,
    BillAllocation,
}

impl ModalKind {
    pub const fn title(self) -> &'static str {
        match self {
            Self::CreateLedger => "create ledger",
            Self::CreateItem => "create stock item",
            Self::BillAllocation => "bill-wise allocation",
        }
    }

    pub const fn is_create(self) -> bool {
        matches!(self, Self::CreateLedger | Self::CreateItem)
    }
}

/// Any selectable master (ledger, stock item, voucher type) as returned by the
/// record service. Only `id` and `name` are interpreted; `bill_wise` applies to
/// ledgers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub bill_wise: bool,
}

impl MasterRecord {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bill_wise: false,
        }
    }

    pub fn bill_wise(mut self) -> Self {
        self.bill_wise = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillAllocation {
    pub reference: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryLine {
    pub ledger_id: Option<LedgerId>,
    pub item_id: Option<StockItemId>,
    pub quantity_hundredths: Option<i64>,
    pub rate_cents: Option<i64>,
    pub amount_cents: i64,
    pub allocations: Vec<BillAllocation>,
}

/// Composite save payload for one voucher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoucherPayload {
    pub voucher_type: VoucherKind,
    pub date: String,
    pub reference: String,
    pub party_id: Option<LedgerId>,
    pub narration: String,
    pub entries: Vec<EntryLine>,
}

/// Accounting period new vouchers must fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingPeriod {
    pub from: Date,
    pub to: Date,
}

impl WorkingPeriod {
    pub fn new(from: Date, to: Date) -> Result<Self> {
        if to < from {
            bail!("period end {to} is before its start {from}");
        }
        Ok(Self { from, to })
    }

    /// Parses `YYYY-MM-DD..YYYY-MM-DD`.
    pub fn parse(raw: &str) -> Result<Self> {
        let Some((from, to)) = raw.trim().split_once("..") else {
            bail!("invalid period {raw:?}; use YYYY-MM-DD..YYYY-MM-DD");
        };
        Self::new(parse_date(from)?, parse_date(to)?)
    }

    /// April-to-March financial year that holds `date`.
    pub fn fiscal_year_containing(date: Date) -> Result<Self> {
        let start_year = if u8::from(date.month()) >= 4 {
            date.year()
        } else {
            date.year() - 1
        };
        let from = Date::from_calendar_date(start_year, Month::April, 1)
            .context("compute financial year start")?;
        let to = Date::from_calendar_date(start_year + 1, Month::March, 31)
            .context("compute financial year end")?;
        Self::new(from, to)
    }

    pub fn contains(&self, date: Date) -> bool {
        self.from <= date && date <= self.to
    }
}

impl fmt::Display for WorkingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}

pub fn parse_date(raw: &str) -> Result<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("invalid date {raw:?}; use YYYY-MM-DD"))
}

/// Parses a decimal amount such as `1,250.5` into hundredths. Returns `None` for
/// empty or malformed input.
pub fn parse_hundredths(raw: &str) -> Option<i64> {
    let cleaned: String = raw.trim().chars().filter(|ch| *ch != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if fraction.len() > 2
        || !whole.chars().all(|ch| ch.is_ascii_digit())
        || !fraction.chars().all(|ch| ch.is_ascii_digit())
    {
        return None;
    }
    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };
    let value = whole.checked_mul(100)?.checked_add(fraction)?;
    Some(if negative { -value } else { value })
}

pub fn format_hundredths(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
