use crate::ids::{CompanyId, DocumentId, ValidationError};
use crate::quote::{parse_quote_title, Quote, QuoteStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum WorkOrderStatus {
    Scheduled,
    InProgress,
    Done,
    Cancelled,
}

impl WorkOrderStatus {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim() {
            "scheduled" => Ok(Self::Scheduled),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(ValidationError(format!(
                "work order status must be one of scheduled, in_progress, done, cancelled (got '{other}')"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Display for WorkOrderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scheduled service job. Carries a back-reference to the quote it was
/// derived from when it came out of a conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[non_exhaustive]
pub struct WorkOrder {
    pub id: DocumentId,
    pub company_id: CompanyId,
    pub client_id: DocumentId,
    pub quote_id: Option<DocumentId>,
    pub title: String,
    pub status: WorkOrderStatus,
    pub scheduled_for: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkOrder {
    pub fn new(
        company_id: CompanyId,
        client_id: DocumentId,
        title: &str,
    ) -> Result<Self, ValidationError> {
        let title = parse_quote_title(title)?;
        let now = Utc::now();
        Ok(Self {
            id: DocumentId::generate(),
            company_id,
            client_id,
            quote_id: None,
            title,
            status: WorkOrderStatus::Scheduled,
            scheduled_for: None,
            notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Derives a scheduled job from an approved quote. Any other quote
    /// status is a validation failure.
    pub fn from_quote(quote: &Quote) -> Result<Self, ValidationError> {
        if quote.status != QuoteStatus::Approved {
            return Err(ValidationError(format!(
                "only approved quotes can be converted (status is '{}')",
                quote.status
            )));
        }
        let mut order = Self::new(
            quote.company_id.clone(),
            quote.client_id.clone(),
            &quote.title,
        )?;
        order.quote_id = Some(quote.id.clone());
        order.notes = quote.notes.clone();
        Ok(order)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        parse_quote_title(&self.title).map(|_| ())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::QuoteItem;

    fn quote_with_status(status: QuoteStatus) -> Quote {
        let mut q = Quote::new(
            CompanyId::generate(),
            DocumentId::generate(),
            "Window replacement",
            vec![QuoteItem {
                description: "Pane".to_string(),
                quantity: 1,
                unit_price_cents: 12_000,
            }],
        )
        .unwrap();
        q.status = status;
        q
    }

    #[test]
    fn conversion_requires_an_approved_quote() {
        for status in [QuoteStatus::Draft, QuoteStatus::Sent, QuoteStatus::Cancelled] {
            let err = WorkOrder::from_quote(&quote_with_status(status)).unwrap_err();
            assert!(err.0.contains("only approved quotes"));
        }
    }

    #[test]
    fn conversion_copies_tenant_client_and_title() {
        let q = quote_with_status(QuoteStatus::Approved);
        let order = WorkOrder::from_quote(&q).unwrap();
        assert_eq!(order.company_id, q.company_id);
        assert_eq!(order.client_id, q.client_id);
        assert_eq!(order.title, q.title);
        assert_eq!(order.quote_id.as_ref(), Some(&q.id));
        assert_eq!(order.status, WorkOrderStatus::Scheduled);
        assert_ne!(order.id, q.id);
    }

    #[test]
    fn status_parse_covers_all_variants() {
        assert_eq!(
            WorkOrderStatus::parse("in_progress").unwrap(),
            WorkOrderStatus::InProgress
        );
        assert!(WorkOrderStatus::parse("paused").is_err());
    }
}
