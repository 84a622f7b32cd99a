use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

pub const COMPANY_ID_MAX_LEN: usize = 64;
pub const EMAIL_MAX_LEN: usize = 254;
pub const DOCUMENT_ID_LEN: usize = 26;

pub fn parse_company_id(input: &str) -> Result<CompanyId, ValidationError> {
    CompanyId::parse(input)
}

pub fn parse_document_id(input: &str) -> Result<DocumentId, ValidationError> {
    DocumentId::parse(input)
}

pub fn parse_email(input: &str) -> Result<Email, ValidationError> {
    Email::parse(input)
}

/// Tenant identifier. Copied onto every document at creation time and
/// trusted by every later query that carries it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct CompanyId(String);

impl CompanyId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError("companyId must not be empty".to_string()));
        }
        if s.len() > COMPANY_ID_MAX_LEN {
            return Err(ValidationError(format!(
                "companyId exceeds max length {COMPANY_ID_MAX_LEN}"
            )));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ValidationError(
                "companyId must match [A-Za-z0-9_-]+".to_string(),
            ));
        }
        Ok(Self(s.to_string()))
    }

    #[must_use]
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for CompanyId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Document identifier. Always minted server-side, ULID text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct DocumentId(String);

impl DocumentId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.len() != DOCUMENT_ID_LEN {
            return Err(ValidationError(format!(
                "document id must be {DOCUMENT_ID_LEN} characters"
            )));
        }
        if ulid::Ulid::from_string(s).is_err() {
            return Err(ValidationError(
                "document id must be a valid ULID".to_string(),
            ));
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    #[must_use]
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Login/contact address, normalized to ASCII lowercase. Uniqueness across
/// user accounts is enforced by the store, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct Email(String);

impl Email {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim().to_ascii_lowercase();
        if s.is_empty() {
            return Err(ValidationError("email must not be empty".to_string()));
        }
        if s.len() > EMAIL_MAX_LEN {
            return Err(ValidationError(format!(
                "email exceeds max length {EMAIL_MAX_LEN}"
            )));
        }
        if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ValidationError(
                "email must not contain whitespace".to_string(),
            ));
        }
        let Some((local, domain)) = s.split_once('@') else {
            return Err(ValidationError("email must contain '@'".to_string()));
        };
        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return Err(ValidationError(
                "email must have a local part and a dotted domain".to_string(),
            ));
        }
        Ok(Self(s))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
