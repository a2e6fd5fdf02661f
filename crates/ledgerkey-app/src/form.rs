// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use crate::{
    AdvanceHost, BillAllocation, ColumnKey, EntryLine, FieldId, FieldLayout, HeaderField,
    InteractionError, LedgerId, MasterRecord, ModalKind, RowId, RowKind, StockItemId,
    TrailingField, ValidationIssue, VoucherKind, VoucherPayload, WorkingPeriod, format_hundredths,
    parse_date, parse_hundredths,
};

pub const DEFAULT_MIN_ROWS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    pub id: RowId,
    pub kind: RowKind,
    pub text: BTreeMap<ColumnKey, String>,
    pub picks: BTreeMap<ColumnKey, MasterRecord>,
    pub allocations: Vec<BillAllocation>,
}

impl GridRow {
    fn new(id: RowId, kind: RowKind) -> Self {
        Self {
            id,
            kind,
            text: BTreeMap::new(),
            picks: BTreeMap::new(),
            allocations: Vec::new(),
        }
    }

    pub fn columns(&self) -> &'static [ColumnKey] {
        self.kind.columns()
    }

    pub fn text(&self, column: ColumnKey) -> &str {
        self.text.get(&column).map(String::as_str).unwrap_or("")
    }

    pub fn pick(&self, column: ColumnKey) -> Option<&MasterRecord> {
        self.picks.get(&column)
    }

    pub fn is_blank(&self) -> bool {
        self.picks.is_empty()
            && self.allocations.is_empty()
            && self.text.values().all(|value| value.trim().is_empty())
    }

    pub fn amount_hundredths(&self) -> Option<i64> {
        parse_hundredths(self.text(ColumnKey::Amount))
    }
}

/// Header fields shown for a voucher type. Invoices carry a party ledger.
pub fn header_fields(kind: VoucherKind) -> &'static [HeaderField] {
    match kind.row_kind() {
        RowKind::Account => &[HeaderField::Date, HeaderField::Reference],
        RowKind::Item => &[HeaderField::Date, HeaderField::Reference, HeaderField::Party],
    }
}

/// The grid the interaction engine drives: header, rows, narration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoucherForm {
    kind: VoucherKind,
    date: String,
    reference: String,
    party: Option<MasterRecord>,
    narration: String,
    rows: Vec<GridRow>,
    min_rows: usize,
    next_row: u64,
}

impl VoucherForm {
    pub fn new(kind: VoucherKind, min_rows: usize, date: impl Into<String>) -> Self {
        let mut form = Self {
            kind,
            date: date.into(),
            reference: String::new(),
            party: None,
            narration: String::new(),
            rows: Vec::new(),
            min_rows: min_rows.max(1),
            next_row: 1,
        };
        form.fill_minimum();
        form
    }

    pub fn kind(&self) -> VoucherKind {
        self.kind
    }

    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    pub fn row(&self, id: RowId) -> Option<&GridRow> {
        self.rows.iter().find(|row| row.id == id)
    }

    pub fn min_rows(&self) -> usize {
        self.min_rows
    }

    pub fn layout(&self) -> FieldLayout {
        FieldLayout {
            header: header_fields(self.kind)
                .iter()
                .map(|field| FieldId::Header(*field))
                .collect(),
            rows: self.rows.iter().map(|row| (row.id, row.kind)).collect(),
            trailing: vec![FieldId::Trailing(TrailingField::Narration)],
        }
    }

    pub fn contains(&self, field: FieldId) -> bool {
        match field {
            FieldId::Header(header) => header_fields(self.kind).contains(&header),
            FieldId::Cell { row, column } => self
                .row(row)
                .is_some_and(|row| row.columns().contains(&column)),
            FieldId::Trailing(_) => true,
        }
    }

    /// Switches the voucher type. A change of row shape starts a fresh grid;
    /// otherwise rows are kept.
    pub fn set_kind(&mut self, kind: VoucherKind) {
        let reshape = kind.row_kind() != self.kind.row_kind();
        self.kind = kind;
        if !header_fields(kind).contains(&HeaderField::Party) {
            self.party = None;
        }
        if reshape {
            self.rows.clear();
            self.fill_minimum();
        }
    }

    pub fn add_row(&mut self) -> RowId {
        let id = RowId::new(self.next_row);
        self.next_row += 1;
        self.rows.push(GridRow::new(id, self.kind.row_kind()));
        id
    }

    pub fn remove_row(&mut self, id: RowId) -> Result<GridRow, InteractionError> {
        let Some(position) = self.rows.iter().position(|row| row.id == id) else {
            return Err(InteractionError::UnknownField(FieldId::cell(
                id,
                self.kind.row_kind().first_column(),
            )));
        };
        if self.rows.len() <= self.min_rows {
            return Err(InteractionError::RowMinimum { min: self.min_rows });
        }
        Ok(self.rows.remove(position))
    }

    /// Clears every entered value, keeping the voucher type and date.
    pub fn reset_entries(&mut self) {
        self.reference.clear();
        self.party = None;
        self.narration.clear();
        self.rows.clear();
        self.fill_minimum();
    }

    pub fn text(&self, field: FieldId) -> &str {
        match field {
            FieldId::Header(HeaderField::Date) => &self.date,
            FieldId::Header(HeaderField::Reference) => &self.reference,
            FieldId::Header(HeaderField::Party) => "",
            FieldId::Cell { row, column } => self.row(row).map(|row| row.text(column)).unwrap_or(""),
            FieldId::Trailing(TrailingField::Narration) => &self.narration,
        }
    }

    pub fn text_mut(&mut self, field: FieldId) -> Result<&mut String, InteractionError> {
        if field.master().is_some() || !self.contains(field) {
            return Err(InteractionError::UnknownField(field));
        }
        match field {
            FieldId::Header(HeaderField::Date) => Ok(&mut self.date),
            FieldId::Header(HeaderField::Reference) => Ok(&mut self.reference),
            FieldId::Trailing(TrailingField::Narration) => Ok(&mut self.narration),
            FieldId::Cell { row, column } => self
                .row_mut(row)
                .map(|row| row.text.entry(column).or_default())
                .ok_or(InteractionError::UnknownField(field)),
            FieldId::Header(HeaderField::Party) => Err(InteractionError::UnknownField(field)),
        }
    }

    pub fn pick(&self, field: FieldId) -> Option<&MasterRecord> {
        match field {
            FieldId::Header(HeaderField::Party) => self.party.as_ref(),
            FieldId::Cell { row, column } => self.row(row).and_then(|row| row.pick(column)),
            FieldId::Header(_) | FieldId::Trailing(_) => None,
        }
    }

    pub fn set_pick(
        &mut self,
        field: FieldId,
        record: Option<MasterRecord>,
    ) -> Result<(), InteractionError> {
        if field.master().is_none() || !self.contains(field) {
            return Err(InteractionError::UnknownField(field));
        }
        match field {
            FieldId::Header(HeaderField::Party) => self.party = record,
            FieldId::Cell { row, column } => {
                let row = self
                    .row_mut(row)
                    .ok_or(InteractionError::UnknownField(field))?;
                match record {
                    Some(record) => {
                        let changed = row
                            .picks
                            .get(&column)
                            .is_none_or(|previous| previous.id != record.id);
                        if changed {
                            row.allocations.clear();
                        }
                        row.picks.insert(column, record);
                    }
                    None => {
                        row.picks.remove(&column);
                        row.allocations.clear();
                    }
                }
            }
            FieldId::Header(_) | FieldId::Trailing(_) => {
                return Err(InteractionError::UnknownField(field));
            }
        }
        Ok(())
    }

    pub fn set_allocations(
        &mut self,
        row: RowId,
        allocations: Vec<BillAllocation>,
    ) -> Result<(), InteractionError> {
        let kind = self.kind.row_kind();
        let row = self
            .row_mut(row)
            .ok_or(InteractionError::UnknownField(FieldId::cell(row, kind.first_column())))?;
        row.allocations = allocations;
        Ok(())
    }

    /// Fills an empty item amount from quantity times rate.
    pub fn fill_item_amount(&mut self, row: RowId) -> Option<i64> {
        let row = self.row_mut(row)?;
        if row.kind != RowKind::Item || !row.text(ColumnKey::Amount).trim().is_empty() {
            return None;
        }
        let quantity = parse_hundredths(row.text(ColumnKey::Quantity))?;
        let rate = parse_hundredths(row.text(ColumnKey::Rate))?;
        let amount = quantity.checked_mul(rate)? / 100;
        row.text.insert(ColumnKey::Amount, format_hundredths(amount));
        Some(amount)
    }

    /// Required-field checks only. Never blocks editing.
    pub fn validate(&self, period: &WorkingPeriod) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let date_field = FieldId::Header(HeaderField::Date);
        if self.date.trim().is_empty() {
            issues.push(ValidationIssue::new(date_field, "date is required"));
        } else {
            match parse_date(&self.date) {
                Ok(date) if !period.contains(date) => issues.push(ValidationIssue::new(
                    date_field,
                    format!("date falls outside the working period {period}"),
                )),
                Ok(_) => {}
                Err(error) => issues.push(ValidationIssue::new(date_field, error.to_string())),
            }
        }

        if header_fields(self.kind).contains(&HeaderField::Party) && self.party.is_none() {
            issues.push(ValidationIssue::new(
                FieldId::Header(HeaderField::Party),
                "party ledger is required",
            ));
        }

        let mut filled = 0;
        for row in self.rows.iter().filter(|row| !row.is_blank()) {
            filled += 1;
            let master_column = row.kind.first_column();
            if row.pick(master_column).is_none() {
                issues.push(ValidationIssue::new(
                    FieldId::cell(row.id, master_column),
                    format!("{} is required", master_column.label()),
                ));
            }
            if row.kind == RowKind::Item {
                for column in [ColumnKey::Quantity, ColumnKey::Rate] {
                    let raw = row.text(column);
                    if !raw.trim().is_empty() && parse_hundredths(raw).is_none() {
                        issues.push(ValidationIssue::new(
                            FieldId::cell(row.id, column),
                            format!("{} must be a number", column.label()),
                        ));
                    }
                }
            }
            if row.amount_hundredths().is_none() {
                issues.push(ValidationIssue::new(
                    FieldId::cell(row.id, ColumnKey::Amount),
                    "amount is required",
                ));
            }
        }

        if filled == 0
            && let Some(first) = self.rows.first()
        {
            issues.push(ValidationIssue::new(
                FieldId::cell(first.id, first.kind.first_column()),
                "enter at least one line",
            ));
        }
        issues
    }

    pub fn payload(&self, period: &WorkingPeriod) -> Result<VoucherPayload, Vec<ValidationIssue>> {
        let issues = self.validate(period);
        if !issues.is_empty() {
            return Err(issues);
        }
        let entries = self
            .rows
            .iter()
            .filter(|row| !row.is_blank())
            .map(|row| EntryLine {
                ledger_id: row.pick(ColumnKey::Ledger).map(|pick| LedgerId::new(pick.id)),
                item_id: row
                    .pick(ColumnKey::Item)
                    .map(|pick| StockItemId::new(pick.id)),
                quantity_hundredths: parse_hundredths(row.text(ColumnKey::Quantity)),
                rate_cents: parse_hundredths(row.text(ColumnKey::Rate)),
                amount_cents: row.amount_hundredths().unwrap_or_default(),
                allocations: row.allocations.clone(),
            })
            .collect();
        Ok(VoucherPayload {
            voucher_type: self.kind,
            date: self.date.trim().to_owned(),
            reference: self.reference.trim().to_owned(),
            party_id: self.party.as_ref().map(|party| LedgerId::new(party.id)),
            narration: self.narration.trim().to_owned(),
            entries,
        })
    }

    fn row_mut(&mut self, id: RowId) -> Option<&mut GridRow> {
        self.rows.iter_mut().find(|row| row.id == id)
    }

    fn fill_minimum(&mut self) {
        while self.rows.len() < self.min_rows {
            self.add_row();
        }
    }
}

impl AdvanceHost for VoucherForm {
    /// Leaving the amount of a line posted to a bill-wise ledger demands an
    /// allocation before the operator moves on.
    fn interrupt_on_leave(&self, field: FieldId) -> Option<ModalKind> {
        let FieldId::Cell {
            row,
            column: ColumnKey::Amount,
        } = field
        else {
            return None;
        };
        let row = self.row(row)?;
        let bill_wise = row.pick(ColumnKey::Ledger).is_some_and(|ledger| ledger.bill_wise);
        let amount = row.amount_hundredths().unwrap_or_default();
        (row.kind == RowKind::Account && bill_wise && amount != 0 && row.allocations.is_empty())
            .then_some(ModalKind::BillAllocation)
    }

    fn row_is_blank(&self, row: RowId) -> bool {
        self.row(row).is_some_and(GridRow::is_blank)
    }

    fn append_row(&mut self) -> Option<(RowId, FieldLayout)> {
        let row = self.add_row();
        Some((row, self.layout()))
    }
}

#[cfg(test)]
mod tests {
    use super::VoucherForm;
    use crate::{
        AdvanceHost, BillAllocation, ColumnKey, FieldId, HeaderField, InteractionError,
        MasterRecord, ModalKind, RowId, RowKind, TrailingField, VoucherKind, WorkingPeriod,
    };

    fn period() -> WorkingPeriod {
        WorkingPeriod::parse("2026-04-01..2027-03-31").expect("valid period")
    }

    fn first_row(form: &VoucherForm) -> RowId {
        form.rows()[0].id
    }

    fn set_text(form: &mut VoucherForm, field: FieldId, value: &str) {
        *form.text_mut(field).expect("text field") = value.to_owned();
    }

    #[test]
    fn new_form_fills_minimum_rows_and_layout() {
        let form = VoucherForm::new(VoucherKind::Payment, 2, "2026-10-19");
        let layout = form.layout();
        assert_eq!(layout.header.len(), 2);
        assert_eq!(layout.rows.len(), 2);
        assert_eq!(layout.trailing, vec![FieldId::Trailing(TrailingField::Narration)]);
        assert_eq!(layout.sequence().len(), 2 + 2 * 2 + 1);
    }

    #[test]
    fn switching_row_shape_rebuilds_the_grid() {
        let mut form = VoucherForm::new(VoucherKind::Payment, 2, "2026-10-19");
        let old = first_row(&form);
        form.set_kind(VoucherKind::Receipt);
        assert_eq!(first_row(&form), old);

        form.set_kind(VoucherKind::Sales);
        assert!(form.row(old).is_none());
        assert!(form.rows().iter().all(|row| row.kind == RowKind::Item));
        assert!(form.contains(FieldId::Header(HeaderField::Party)));
        assert_eq!(form.layout().sequence().len(), 3 + 2 * 4 + 1);
    }

    #[test]
    fn rows_above_the_minimum_can_be_removed() {
        let mut form = VoucherForm::new(VoucherKind::Journal, 2, "2026-10-19");
        let first = first_row(&form);
        assert_eq!(
            form.remove_row(first),
            Err(InteractionError::RowMinimum { min: 2 })
        );

        let extra = form.add_row();
        assert!(extra > first);
        assert!(form.remove_row(first).is_ok());
        assert_eq!(form.rows().len(), 2);
        assert!(!form.contains(FieldId::cell(first, ColumnKey::Ledger)));
    }

    #[test]
    fn bill_wise_ledger_interrupts_on_amount_until_allocated() {
        let mut form = VoucherForm::new(VoucherKind::Receipt, 2, "2026-10-19");
        let row = first_row(&form);
        let ledger = FieldId::cell(row, ColumnKey::Ledger);
        let amount = FieldId::cell(row, ColumnKey::Amount);
        form.set_pick(ledger, Some(MasterRecord::new(4, "Acme Traders").bill_wise()))
            .expect("ledger field");

        assert_eq!(form.interrupt_on_leave(amount), None);
        set_text(&mut form, amount, "500");
        assert_eq!(form.interrupt_on_leave(amount), Some(ModalKind::BillAllocation));
        assert_eq!(form.interrupt_on_leave(ledger), None);

        form.set_allocations(
            row,
            vec![BillAllocation {
                reference: "INV-1".to_owned(),
                amount_cents: 50_000,
            }],
        )
        .expect("row exists");
        assert_eq!(form.interrupt_on_leave(amount), None);

        form.set_pick(ledger, Some(MasterRecord::new(1, "Cash")))
            .expect("ledger field");
        assert!(form.row(row).expect("row").allocations.is_empty());
        assert_eq!(form.interrupt_on_leave(amount), None);
    }

    #[test]
    fn validation_lists_missing_fields_without_blocking() {
        let mut form = VoucherForm::new(VoucherKind::Payment, 2, "2025-01-01");
        let issues = form.validate(&period());
        let fields: Vec<_> = issues.iter().map(|issue| issue.field).collect();
        assert_eq!(
            fields,
            vec![
                FieldId::Header(HeaderField::Date),
                FieldId::cell(first_row(&form), ColumnKey::Ledger),
            ]
        );

        set_text(&mut form, FieldId::Header(HeaderField::Date), "2026-10-19");
        let row = first_row(&form);
        set_text(&mut form, FieldId::cell(row, ColumnKey::Amount), "12.5");
        let issues = form.validate(&period());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "ledger is required");

        form.set_pick(FieldId::cell(row, ColumnKey::Ledger), Some(MasterRecord::new(1, "Cash")))
            .expect("ledger field");
        let payload = form.payload(&period()).expect("valid voucher");
        assert_eq!(payload.entries.len(), 1);
        assert_eq!(payload.entries[0].amount_cents, 1250);
        assert_eq!(payload.date, "2026-10-19");
    }

    #[test]
    fn item_amount_fills_from_quantity_and_rate() {
        let mut form = VoucherForm::new(VoucherKind::Sales, 1, "2026-10-19");
        let row = first_row(&form);
        set_text(&mut form, FieldId::cell(row, ColumnKey::Quantity), "3");
        set_text(&mut form, FieldId::cell(row, ColumnKey::Rate), "12.50");
        assert_eq!(form.fill_item_amount(row), Some(3750));
        assert_eq!(form.text(FieldId::cell(row, ColumnKey::Amount)), "37.50");
        assert_eq!(form.fill_item_amount(row), None);
    }

    #[test]
    fn master_fields_reject_text_and_text_fields_reject_picks() {
        let mut form = VoucherForm::new(VoucherKind::Payment, 2, "2026-10-19");
        let ledger = FieldId::cell(first_row(&form), ColumnKey::Ledger);
        assert!(form.text_mut(ledger).is_err());
        assert!(
            form.set_pick(FieldId::Header(HeaderField::Date), Some(MasterRecord::new(1, "Cash")))
                .is_err()
        );
        assert!(
            form.set_pick(
                FieldId::Header(HeaderField::Party),
                Some(MasterRecord::new(1, "Cash"))
            )
            .is_err()
        );
    }
}
