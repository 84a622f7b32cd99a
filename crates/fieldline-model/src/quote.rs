// SPDX-License-Identifier: Apache-2.0

use crate::ids::{CompanyId, DocumentId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const QUOTE_TITLE_MAX_LEN: usize = 160;
pub const ITEM_DESCRIPTION_MAX_LEN: usize = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum QuoteStatus {
    Draft,
    Sent,
    Approved,
    Cancelled,
}

impl QuoteStatus {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim() {
            "draft" => Ok(Self::Draft),
            "sent" => Ok(Self::Sent),
            "approved" => Ok(Self::Approved),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(ValidationError(format!(
                "quote status must be one of draft, sent, approved, cancelled (got '{other}')"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Approved => "approved",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Display for QuoteStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One priced line on a quote. Amounts are integer cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuoteItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

impl QuoteItem {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let d = self.description.trim();
        if d.is_empty() {
            return Err(ValidationError(
                "quote item must have a description".to_string(),
            ));
        }
        if d.len() > ITEM_DESCRIPTION_MAX_LEN {
            return Err(ValidationError(format!(
                "quote item description exceeds max length {ITEM_DESCRIPTION_MAX_LEN}"
            )));
        }
        if self.quantity == 0 {
            return Err(ValidationError(
                "quote item quantity must be at least 1".to_string(),
            ));
        }
        if self.unit_price_cents < 0 {
            return Err(ValidationError(
                "quote item unit price must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents.saturating_mul(i64::from(self.quantity))
    }
}

/// Priced proposal for a client. Status moves through draft/sent/approved/
/// cancelled via direct toggles; only an approved quote can become a work
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[non_exhaustive]
pub struct Quote {
    pub id: DocumentId,
    pub company_id: CompanyId,
    pub client_id: DocumentId,
    pub title: String,
    pub items: Vec<QuoteItem>,
    pub status: QuoteStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(
        company_id: CompanyId,
        client_id: DocumentId,
        title: &str,
        items: Vec<QuoteItem>,
    ) -> Result<Self, ValidationError> {
        let title = parse_quote_title(title)?;
        for item in &items {
            item.validate()?;
        }
        let now = Utc::now();
        Ok(Self {
            id: DocumentId::generate(),
            company_id,
            client_id,
            title,
            items,
            status: QuoteStatus::Draft,
            notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        parse_quote_title(&self.title)?;
        for item in &self.items {
            item.validate()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn total_cents(&self) -> i64 {
        self.items
            .iter()
            .fold(0i64, |acc, item| acc.saturating_add(item.line_total_cents()))
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

pub fn parse_quote_title(input: &str) -> Result<String, ValidationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ValidationError("quote must have a title".to_string()));
    }
    if s.len() > QUOTE_TITLE_MAX_LEN {
        return Err(ValidationError(format!(
            "quote title exceeds max length {QUOTE_TITLE_MAX_LEN}"
        )));
    }
    Ok(s.to_string())
}
