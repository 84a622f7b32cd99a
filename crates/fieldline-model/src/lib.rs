#![forbid(unsafe_code)]
//! Fieldline domain model SSOT.
//!
//! ```compile_fail
//! use fieldline_model::QuoteStatus;
//!
//! fn exhaustive_match(s: QuoteStatus) -> &'static str {
//!     match s {
//!         QuoteStatus::Draft => "d",
//!         QuoteStatus::Sent => "s",
//!         QuoteStatus::Approved => "a",
//!         QuoteStatus::Cancelled => "c",
//!     }
//! }
//! ```

mod account;
mod client;
mod finance;
mod ids;
mod quote;
mod work_order;

pub use account::{
    parse_company_name, parse_display_name, Company, Role, UserAccount, UserPublic,
    COMPANY_NAME_MAX_LEN, DISPLAY_NAME_MAX_LEN,
};
pub use client::{parse_client_name, ClientRecord, CLIENT_NAME_MAX_LEN};
pub use finance::{
    parse_expense_category, parse_expense_description, summarize_finances, Expense,
    FinanceSummary, Invoice, InvoiceStatus, EXPENSE_CATEGORY_MAX_LEN, EXPENSE_DESCRIPTION_MAX_LEN,
};
pub use ids::{
    parse_company_id, parse_document_id, parse_email, CompanyId, DocumentId, Email,
    ValidationError, COMPANY_ID_MAX_LEN, DOCUMENT_ID_LEN, EMAIL_MAX_LEN,
};
pub use quote::{
    parse_quote_title, Quote, QuoteItem, QuoteStatus, ITEM_DESCRIPTION_MAX_LEN,
    QUOTE_TITLE_MAX_LEN,
};
pub use work_order::{WorkOrder, WorkOrderStatus};

pub const CRATE_NAME: &str = "fieldline-model";
