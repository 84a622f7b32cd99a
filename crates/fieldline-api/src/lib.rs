#![forbid(unsafe_code)]

//! Wire contract for the Fieldline API. Every failure serializes as
//! `{"error": {code, message, details}}`; `ApiError::status_code` gives the
//! HTTP status the envelope travels with.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

mod dto;

pub use dto::{
    CancelSubscriptionResponse, CheckoutSessionResponse, CreateCustomerResponse, LoginResponse,
    SignupResponse, SubscriptionEnvelope, TeamCreateResponse, VersionResponse,
};

pub const CRATE_NAME: &str = "fieldline-api";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ApiErrorCode {
    ValidationFailed,
    MissingField,
    InvalidField,
    Unauthorized,
    Forbidden,
    NotFound,
    EmailAlreadyExists,
    BillingUpstream,
    NotReady,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ApiErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
        }
    }

    #[must_use]
    pub fn missing_field(name: &str) -> Self {
        Self::new(
            ApiErrorCode::MissingField,
            format!("missing required field: {name}"),
            json!({"field": name}),
        )
    }

    #[must_use]
    pub fn invalid_field(name: &str, reason: &str) -> Self {
        Self::new(
            ApiErrorCode::InvalidField,
            format!("invalid field: {name}"),
            json!({"field": name, "reason": reason}),
        )
    }

    #[must_use]
    pub fn validation(message: &str) -> Self {
        Self::new(ApiErrorCode::ValidationFailed, message, Value::Null)
    }

    #[must_use]
    pub fn unauthorized(message: &str) -> Self {
        Self::new(ApiErrorCode::Unauthorized, message, Value::Null)
    }

    #[must_use]
    pub fn forbidden(message: &str) -> Self {
        Self::new(ApiErrorCode::Forbidden, message, Value::Null)
    }

    #[must_use]
    pub fn not_found(what: &str) -> Self {
        Self::new(
            ApiErrorCode::NotFound,
            format!("{what} not found"),
            Value::Null,
        )
    }

    #[must_use]
    pub fn email_already_exists(email: &str) -> Self {
        Self::new(
            ApiErrorCode::EmailAlreadyExists,
            "a user with this email already exists",
            json!({"email": email}),
        )
    }

    /// Provider failures surface the provider's own message, unmodified.
    #[must_use]
    pub fn billing_upstream(provider_message: &str) -> Self {
        Self::new(ApiErrorCode::BillingUpstream, provider_message, Value::Null)
    }

    #[must_use]
    pub fn not_ready(message: &str) -> Self {
        Self::new(ApiErrorCode::NotReady, message, Value::Null)
    }

    #[must_use]
    pub fn internal(message: &str) -> Self {
        Self::new(ApiErrorCode::Internal, message, Value::Null)
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self.code {
            ApiErrorCode::ValidationFailed
            | ApiErrorCode::MissingField
            | ApiErrorCode::InvalidField
            | ApiErrorCode::EmailAlreadyExists => 400,
            ApiErrorCode::Unauthorized => 401,
            ApiErrorCode::Forbidden => 403,
            ApiErrorCode::NotFound => 404,
            ApiErrorCode::NotReady => 503,
            ApiErrorCode::BillingUpstream | ApiErrorCode::Internal => 500,
        }
    }
}

/// Extraction helpers for JSON request bodies. The contract is the original
/// one: required fields answer 400 when absent, unknown extra fields are
/// ignored.
pub mod body {
    use super::ApiError;
    use serde_json::Value;

    pub fn require_str<'a>(body: &'a Value, name: &str) -> Result<&'a str, ApiError> {
        match body.get(name) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
            Some(Value::String(_)) | None | Some(Value::Null) => {
                Err(ApiError::missing_field(name))
            }
            Some(_) => Err(ApiError::invalid_field(name, "expected a string")),
        }
    }

    pub fn optional_str<'a>(body: &'a Value, name: &str) -> Result<Option<&'a str>, ApiError> {
        match body.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(ApiError::invalid_field(name, "expected a string")),
        }
    }

    pub fn optional_bool(body: &Value, name: &str) -> Result<Option<bool>, ApiError> {
        match body.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(ApiError::invalid_field(name, "expected a boolean")),
        }
    }

    pub fn require_i64(body: &Value, name: &str) -> Result<i64, ApiError> {
        match body.get(name) {
            None | Some(Value::Null) => Err(ApiError::missing_field(name)),
            Some(Value::Number(n)) => n
                .as_i64()
                .ok_or_else(|| ApiError::invalid_field(name, "expected an integer")),
            Some(_) => Err(ApiError::invalid_field(name, "expected an integer")),
        }
    }

    pub fn optional_i64(body: &Value, name: &str) -> Result<Option<i64>, ApiError> {
        match body.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| ApiError::invalid_field(name, "expected an integer")),
            Some(_) => Err(ApiError::invalid_field(name, "expected an integer")),
        }
    }

    pub fn optional_array<'a>(
        body: &'a Value,
        name: &str,
    ) -> Result<Option<&'a Vec<Value>>, ApiError> {
        match body.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(_) => Err(ApiError::invalid_field(name, "expected an array")),
        }
    }
}

/// Query-string parsing for the list and summary endpoints.
pub mod params {
    use super::ApiError;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DateWindow {
        pub from: Option<NaiveDate>,
        pub to: Option<NaiveDate>,
    }

    pub fn parse_date_window(query: &BTreeMap<String, String>) -> Result<DateWindow, ApiError> {
        let parse = |name: &str| -> Result<Option<NaiveDate>, ApiError> {
            match query.get(name) {
                None => Ok(None),
                Some(raw) => raw
                    .parse::<NaiveDate>()
                    .map(Some)
                    .map_err(|_| ApiError::invalid_field(name, "expected YYYY-MM-DD")),
            }
        };
        let window = DateWindow {
            from: parse("from")?,
            to: parse("to")?,
        };
        if let (Some(from), Some(to)) = (window.from, window.to) {
            if from > to {
                return Err(ApiError::invalid_field("from", "must not be after 'to'"));
            }
        }
        Ok(window)
    }

    pub fn optional_param<'a>(
        query: &'a BTreeMap<String, String>,
        name: &str,
    ) -> Option<&'a str> {
        query.get(name).map(String::as_str).filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::body::{optional_bool, require_i64, require_str};
    use super::params::parse_date_window;
    use super::{ApiError, ApiErrorCode};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn missing_and_blank_fields_read_as_missing() {
        let body = json!({"email": "", "name": "Ana"});
        assert_eq!(
            require_str(&body, "companyId").unwrap_err().code,
            ApiErrorCode::MissingField
        );
        assert_eq!(
            require_str(&body, "email").unwrap_err().code,
            ApiErrorCode::MissingField
        );
        assert_eq!(require_str(&body, "name").unwrap(), "Ana");
    }

    #[test]
    fn wrong_types_read_as_invalid() {
        let body = json!({"companyId": 7, "cancelImmediately": "yes", "amountCents": "12"});
        assert_eq!(
            require_str(&body, "companyId").unwrap_err().code,
            ApiErrorCode::InvalidField
        );
        assert_eq!(
            optional_bool(&body, "cancelImmediately").unwrap_err().code,
            ApiErrorCode::InvalidField
        );
        assert_eq!(
            require_i64(&body, "amountCents").unwrap_err().code,
            ApiErrorCode::InvalidField
        );
    }

    #[test]
    fn absent_optional_bool_is_none() {
        let body = json!({});
        assert_eq!(optional_bool(&body, "cancelImmediately").unwrap(), None);
    }

    #[test]
    fn status_mapping_matches_contract() {
        assert_eq!(ApiError::missing_field("x").status_code(), 400);
        assert_eq!(ApiError::email_already_exists("a@b.co").status_code(), 400);
        assert_eq!(ApiError::unauthorized("no token").status_code(), 401);
        assert_eq!(ApiError::forbidden("nope").status_code(), 403);
        assert_eq!(ApiError::not_found("client").status_code(), 404);
        assert_eq!(ApiError::billing_upstream("boom").status_code(), 500);
        assert_eq!(ApiError::not_ready("draining").status_code(), 503);
    }

    #[test]
    fn error_codes_serialize_snake_case() {
        let v = serde_json::to_value(ApiErrorCode::EmailAlreadyExists).unwrap();
        assert_eq!(v, "email_already_exists");
    }

    #[test]
    fn date_window_parses_and_orders() {
        let mut q = BTreeMap::new();
        q.insert("from".to_string(), "2024-01-01".to_string());
        q.insert("to".to_string(), "2024-01-31".to_string());
        let w = parse_date_window(&q).unwrap();
        assert!(w.from.is_some() && w.to.is_some());

        q.insert("to".to_string(), "2023-12-01".to_string());
        assert_eq!(
            parse_date_window(&q).unwrap_err().code,
            ApiErrorCode::InvalidField
        );

        q.insert("to".to_string(), "not-a-date".to_string());
        assert_eq!(
            parse_date_window(&q).unwrap_err().code,
            ApiErrorCode::InvalidField
        );
    }

    #[test]
    fn billing_upstream_keeps_provider_message_verbatim() {
        let e = ApiError::billing_upstream("No such customer: cus_123");
        assert_eq!(e.message, "No such customer: cus_123");
    }
}
