use crate::ids::{CompanyId, DocumentId, ValidationError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

pub const EXPENSE_DESCRIPTION_MAX_LEN: usize = 240;
pub const EXPENSE_CATEGORY_MAX_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum InvoiceStatus {
    Open,
    Paid,
    Void,
}

impl InvoiceStatus {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim() {
            "open" => Ok(Self::Open),
            "paid" => Ok(Self::Paid),
            "void" => Ok(Self::Void),
            other => Err(ValidationError(format!(
                "invoice status must be one of open, paid, void (got '{other}')"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Paid => "paid",
            Self::Void => "void",
        }
    }
}

impl Display for InvoiceStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[non_exhaustive]
pub struct Invoice {
    pub id: DocumentId,
    pub company_id: CompanyId,
    pub client_id: DocumentId,
    pub work_order_id: Option<DocumentId>,
    pub amount_cents: i64,
    pub status: InvoiceStatus,
    pub issued_on: NaiveDate,
    pub paid_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn new(
        company_id: CompanyId,
        client_id: DocumentId,
        amount_cents: i64,
        issued_on: NaiveDate,
    ) -> Result<Self, ValidationError> {
        if amount_cents < 0 {
            return Err(ValidationError(
                "invoice amount must not be negative".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: DocumentId::generate(),
            company_id,
            client_id,
            work_order_id: None,
            amount_cents,
            status: InvoiceStatus::Open,
            issued_on,
            paid_on: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Status toggles stamp `paid_on` once on the way into `paid` and clear
    /// it when the invoice leaves that state.
    pub fn set_status(&mut self, status: InvoiceStatus, today: NaiveDate) {
        self.status = status;
        match status {
            InvoiceStatus::Paid => {
                if self.paid_on.is_none() {
                    self.paid_on = Some(today);
                }
            }
            InvoiceStatus::Open | InvoiceStatus::Void => self.paid_on = None,
        }
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[non_exhaustive]
pub struct Expense {
    pub id: DocumentId,
    pub company_id: CompanyId,
    pub description: String,
    pub category: String,
    pub amount_cents: i64,
    pub incurred_on: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(
        company_id: CompanyId,
        description: &str,
        category: &str,
        amount_cents: i64,
        incurred_on: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let description = parse_expense_description(description)?;
        let category = parse_expense_category(category)?;
        if amount_cents < 0 {
            return Err(ValidationError(
                "expense amount must not be negative".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: DocumentId::generate(),
            company_id,
            description,
            category,
            amount_cents,
            incurred_on,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        parse_expense_description(&self.description)?;
        parse_expense_category(&self.category)?;
        if self.amount_cents < 0 {
            return Err(ValidationError(
                "expense amount must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

pub fn parse_expense_description(input: &str) -> Result<String, ValidationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ValidationError(
            "expense must have a description".to_string(),
        ));
    }
    if s.len() > EXPENSE_DESCRIPTION_MAX_LEN {
        return Err(ValidationError(format!(
            "expense description exceeds max length {EXPENSE_DESCRIPTION_MAX_LEN}"
        )));
    }
    Ok(s.to_string())
}

pub fn parse_expense_category(input: &str) -> Result<String, ValidationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ValidationError("expense must have a category".to_string()));
    }
    if s.len() > EXPENSE_CATEGORY_MAX_LEN {
        return Err(ValidationError(format!(
            "expense category exceeds max length {EXPENSE_CATEGORY_MAX_LEN}"
        )));
    }
    Ok(s.to_string())
}

/// Aggregates for one tenant over an optional inclusive date window.
/// Void invoices are left out of every total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[non_exhaustive]
pub struct FinanceSummary {
    pub invoiced_cents: i64,
    pub paid_cents: i64,
    pub open_cents: i64,
    pub expense_cents: i64,
    pub net_cents: i64,
    pub expenses_by_category: BTreeMap<String, i64>,
}

#[must_use]
pub fn summarize_finances(
    invoices: &[Invoice],
    expenses: &[Expense],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> FinanceSummary {
    let in_window = |day: NaiveDate| -> bool {
        if let Some(from) = from {
            if day < from {
                return false;
            }
        }
        if let Some(to) = to {
            if day > to {
                return false;
            }
        }
        true
    };

    let mut paid_cents = 0i64;
    let mut open_cents = 0i64;
    for invoice in invoices {
        if !in_window(invoice.issued_on) {
            continue;
        }
        match invoice.status {
            InvoiceStatus::Paid => paid_cents = paid_cents.saturating_add(invoice.amount_cents),
            InvoiceStatus::Open => open_cents = open_cents.saturating_add(invoice.amount_cents),
            InvoiceStatus::Void => {}
        }
    }

    let mut expense_cents = 0i64;
    let mut expenses_by_category: BTreeMap<String, i64> = BTreeMap::new();
    for expense in expenses {
        if !in_window(expense.incurred_on) {
            continue;
        }
        expense_cents = expense_cents.saturating_add(expense.amount_cents);
        *expenses_by_category
            .entry(expense.category.clone())
            .or_insert(0) += expense.amount_cents;
    }

    FinanceSummary {
        invoiced_cents: paid_cents.saturating_add(open_cents),
        paid_cents,
        open_cents,
        expense_cents,
        net_cents: paid_cents.saturating_sub(expense_cents),
        expenses_by_category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(amount: i64, status: InvoiceStatus, issued: NaiveDate) -> Invoice {
        let mut inv = Invoice::new(
            CompanyId::generate(),
            DocumentId::generate(),
            amount,
            issued,
        )
        .unwrap();
        inv.status = status;
        inv
    }

    fn expense(amount: i64, category: &str, incurred: NaiveDate) -> Expense {
        Expense::new(
            CompanyId::generate(),
            "materials run",
            category,
            amount,
            incurred,
        )
        .unwrap()
    }

    #[test]
    fn summary_splits_paid_and_open_and_skips_void() {
        let d = day(2024, 3, 10);
        let invoices = vec![
            invoice(10_000, InvoiceStatus::Paid, d),
            invoice(4_000, InvoiceStatus::Open, d),
            invoice(99_000, InvoiceStatus::Void, d),
        ];
        let s = summarize_finances(&invoices, &[], None, None);
        assert_eq!(s.paid_cents, 10_000);
        assert_eq!(s.open_cents, 4_000);
        assert_eq!(s.invoiced_cents, 14_000);
    }

    #[test]
    fn expenses_group_by_category() {
        let d = day(2024, 3, 10);
        let expenses = vec![
            expense(1_500, "fuel", d),
            expense(2_500, "fuel", d),
            expense(8_000, "glass", d),
        ];
        let s = summarize_finances(&[], &expenses, None, None);
        assert_eq!(s.expense_cents, 12_000);
        assert_eq!(s.expenses_by_category["fuel"], 4_000);
        assert_eq!(s.expenses_by_category["glass"], 8_000);
        assert_eq!(s.net_cents, -12_000);
    }

    #[test]
    fn date_window_is_inclusive_on_both_ends() {
        let invoices = vec![
            invoice(100, InvoiceStatus::Paid, day(2024, 1, 1)),
            invoice(200, InvoiceStatus::Paid, day(2024, 1, 15)),
            invoice(400, InvoiceStatus::Paid, day(2024, 1, 31)),
            invoice(800, InvoiceStatus::Paid, day(2024, 2, 1)),
        ];
        let s = summarize_finances(
            &invoices,
            &[],
            Some(day(2024, 1, 1)),
            Some(day(2024, 1, 31)),
        );
        assert_eq!(s.paid_cents, 700);
    }

    #[test]
    fn net_is_paid_minus_expenses() {
        let d = day(2024, 6, 1);
        let invoices = vec![invoice(50_000, InvoiceStatus::Paid, d)];
        let expenses = vec![expense(18_000, "fuel", d)];
        let s = summarize_finances(&invoices, &expenses, None, None);
        assert_eq!(s.net_cents, 32_000);
    }

    #[test]
    fn paid_status_stamps_paid_on_once() {
        let mut inv = invoice(100, InvoiceStatus::Open, day(2024, 5, 1));
        inv.set_status(InvoiceStatus::Paid, day(2024, 5, 20));
        assert_eq!(inv.paid_on, Some(day(2024, 5, 20)));
        inv.set_status(InvoiceStatus::Paid, day(2024, 5, 25));
        assert_eq!(inv.paid_on, Some(day(2024, 5, 20)));
        inv.set_status(InvoiceStatus::Open, day(2024, 5, 26));
        assert_eq!(inv.paid_on, None);
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(Invoice::new(
            CompanyId::generate(),
            DocumentId::generate(),
            -1,
            day(2024, 1, 1)
        )
        .is_err());
        assert!(Expense::new(CompanyId::generate(), "x", "fuel", -1, day(2024, 1, 1)).is_err());
    }
}
