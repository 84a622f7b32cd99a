// SPDX-License-Identifier: Apache-2.0

use crate::http::handlers::api_error_response;
use crate::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use fieldline_api::ApiError;
use fieldline_core::session_token_hash;
use fieldline_model::{CompanyId, DocumentId, Role};
use tracing::error;

/// Identity resolved from a bearer token, attached to the request as an
/// extension for handlers behind the protected router.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: DocumentId,
    pub company_id: CompanyId,
    pub role: Role,
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

pub(crate) async fn bearer_auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        return api_error_response(
            StatusCode::UNAUTHORIZED,
            ApiError::unauthorized("missing bearer token"),
        );
    };
    let token_hash = session_token_hash(token);
    match state.store.find_user_by_token_hash(&token_hash).await {
        Ok(Some(user)) => {
            let context = AuthContext {
                user_id: user.id.clone(),
                company_id: user.company_id.clone(),
                role: user.role,
            };
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Ok(None) => api_error_response(
            StatusCode::UNAUTHORIZED,
            ApiError::unauthorized("invalid or revoked token"),
        ),
        Err(err) => {
            error!(error = %err, "bearer token lookup failed");
            api_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::internal("token lookup failed"),
            )
        }
    }
}
