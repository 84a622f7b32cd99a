// SPDX-License-Identifier: Apache-2.0

use crate::ids::{CompanyId, DocumentId, Email, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const DISPLAY_NAME_MAX_LEN: usize = 120;
pub const COMPANY_NAME_MAX_LEN: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Role {
    Owner,
    Admin,
    Technician,
}

impl Role {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim() {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "technician" => Ok(Self::Technician),
            other => Err(ValidationError(format!(
                "role must be one of owner, admin, technician (got '{other}')"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Technician => "technician",
        }
    }

    /// Team management (inviting and creating members) is owner/admin only.
    #[must_use]
    pub const fn can_manage_team(self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One customer organization. `billing_customer_id` is recorded the first
/// time the billing provider hands one out and reused afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[non_exhaustive]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub billing_email: Option<Email>,
    pub billing_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        let name = parse_company_name(name)?;
        let now = Utc::now();
        Ok(Self {
            id: CompanyId::generate(),
            name,
            billing_email: None,
            billing_customer_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

pub fn parse_company_name(input: &str) -> Result<String, ValidationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ValidationError("company name must not be empty".to_string()));
    }
    if s.len() > COMPANY_NAME_MAX_LEN {
        return Err(ValidationError(format!(
            "company name exceeds max length {COMPANY_NAME_MAX_LEN}"
        )));
    }
    Ok(s.to_string())
}

pub fn parse_display_name(input: &str) -> Result<String, ValidationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ValidationError("displayName must not be empty".to_string()));
    }
    if s.len() > DISPLAY_NAME_MAX_LEN {
        return Err(ValidationError(format!(
            "displayName exceeds max length {DISPLAY_NAME_MAX_LEN}"
        )));
    }
    Ok(s.to_string())
}

/// Full account document as persisted. Credential digests ride along in the
/// stored body; wire responses go through [`UserAccount::public_view`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[non_exhaustive]
pub struct UserAccount {
    pub id: DocumentId,
    pub company_id: CompanyId,
    pub email: Email,
    pub display_name: String,
    pub role: Role,
    pub password_hash: String,
    pub session_token_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn new(
        company_id: CompanyId,
        email: Email,
        display_name: &str,
        role: Role,
        password_hash: String,
    ) -> Result<Self, ValidationError> {
        let display_name = parse_display_name(display_name)?;
        let now = Utc::now();
        Ok(Self {
            id: DocumentId::generate(),
            company_id,
            email,
            display_name,
            role,
            password_hash,
            session_token_hash: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    #[must_use]
    pub fn public_view(&self) -> UserPublic {
        UserPublic {
            id: self.id.clone(),
            company_id: self.company_id.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// Credential-free projection of an account, safe to return on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[non_exhaustive]
pub struct UserPublic {
    pub id: DocumentId,
    pub company_id: CompanyId,
    pub email: Email,
    pub display_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}
