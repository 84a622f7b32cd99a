use crate::ids::{CompanyId, DocumentId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CLIENT_NAME_MAX_LEN: usize = 120;

/// End-customer record for one tenant. The only enforced invariant is the
/// presence of a name; contact fields are free-form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[non_exhaustive]
pub struct ClientRecord {
    pub id: DocumentId,
    pub company_id: CompanyId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClientRecord {
    pub fn new(company_id: CompanyId, name: &str) -> Result<Self, ValidationError> {
        let name = parse_client_name(name)?;
        let now = Utc::now();
        Ok(Self {
            id: DocumentId::generate(),
            company_id,
            name,
            email: None,
            phone: None,
            address: None,
            notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        parse_client_name(&self.name).map(|_| ())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

pub fn parse_client_name(input: &str) -> Result<String, ValidationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ValidationError("client must have a name".to_string()));
    }
    if s.len() > CLIENT_NAME_MAX_LEN {
        return Err(ValidationError(format!(
            "client name exceeds max length {CLIENT_NAME_MAX_LEN}"
        )));
    }
    Ok(s.to_string())
}
