// SPDX-License-Identifier: Apache-2.0

use crate::auth::AuthContext;
use crate::http::handlers::{
    finish, parse_json_body, propagated_request_id, store_error, validation_error,
};
use crate::*;
use fieldline_api::{
    body::require_str, LoginResponse, SignupResponse, TeamCreateResponse,
};
use fieldline_core::{hash_password, mint_session_token, verify_password};
use fieldline_model::{parse_email, Company, Role, UserAccount};
use serde_json::{json, Value};

const ROUTE_SIGNUP: &str = "/v1/companies";
const ROUTE_LOGIN: &str = "/v1/auth/login";
const ROUTE_TEAM_CREATE: &str = "/api/team/create";
const ROUTE_TEAM_LIST: &str = "/v1/team";

const PASSWORD_MIN_LEN: usize = 6;

fn parse_password(body: &Value) -> Result<&str, ApiError> {
    let password = require_str(body, "password")?;
    if password.len() < PASSWORD_MIN_LEN {
        return Err(ApiError::invalid_field(
            "password",
            "must be at least 6 characters",
        ));
    }
    Ok(password)
}

pub(crate) async fn signup_company_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = signup_company(&state, &body).await;
    finish(&state, ROUTE_SIGNUP, started, &request_id, out).await
}

async fn signup_company(state: &AppState, raw: &Bytes) -> Result<Response, ApiError> {
    let body = parse_json_body(raw)?;
    let name = require_str(&body, "name")?;
    let owner = body
        .get("owner")
        .filter(|v| v.is_object())
        .ok_or_else(|| ApiError::missing_field("owner"))?;
    let email = parse_email(require_str(owner, "email")?).map_err(validation_error)?;
    let password = parse_password(owner)?;
    let display_name = require_str(owner, "displayName")?;

    let company = Company::new(name).map_err(validation_error)?;
    let user = UserAccount::new(
        company.id.clone(),
        email.clone(),
        display_name,
        Role::Owner,
        hash_password(password),
    )
    .map_err(validation_error)?;

    state.store.put_company(&company).await.map_err(store_error)?;
    match state.store.put_user(&user).await {
        Ok(()) => {}
        Err(StoreError::EmailExists) => {
            return Err(ApiError::email_already_exists(email.as_str()));
        }
        Err(err) => return Err(store_error(err)),
    }
    info!(company_id = %company.id, user_id = %user.id, "company signed up");
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            company_id: company.id.to_string(),
            user_id: user.id.to_string(),
        }),
    )
        .into_response())
}

pub(crate) async fn login_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = login(&state, &body).await;
    finish(&state, ROUTE_LOGIN, started, &request_id, out).await
}

async fn login(state: &AppState, raw: &Bytes) -> Result<Response, ApiError> {
    let body = parse_json_body(raw)?;
    let email = parse_email(require_str(&body, "email")?).map_err(validation_error)?;
    let password = require_str(&body, "password")?;

    let mut user = state
        .store
        .find_user_by_email(&email)
        .await
        .map_err(store_error)?
        .ok_or_else(|| ApiError::unauthorized("invalid email or password"))?;
    if !verify_password(password, &user.password_hash) {
        return Err(ApiError::unauthorized("invalid email or password"));
    }

    // One live session per user: minting a new token revokes the old one.
    let (token, token_hash) = mint_session_token();
    user.session_token_hash = Some(token_hash);
    user.touch();
    state.store.put_user(&user).await.map_err(store_error)?;
    info!(user_id = %user.id, company_id = %user.company_id, "login succeeded");
    Ok(Json(LoginResponse {
        token,
        user: user.public_view(),
    })
    .into_response())
}

pub(crate) async fn team_create_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = team_create(&state, &context, &body).await;
    finish(&state, ROUTE_TEAM_CREATE, started, &request_id, out).await
}

async fn team_create(
    state: &AppState,
    context: &AuthContext,
    raw: &Bytes,
) -> Result<Response, ApiError> {
    if !context.role.can_manage_team() {
        return Err(ApiError::forbidden(
            "only owners and admins can create team members",
        ));
    }
    let body = parse_json_body(raw)?;
    let email = parse_email(require_str(&body, "email")?).map_err(validation_error)?;
    let password = parse_password(&body)?;
    let display_name = require_str(&body, "displayName")?;
    let role = Role::parse(require_str(&body, "role")?).map_err(validation_error)?;

    let user = UserAccount::new(
        context.company_id.clone(),
        email.clone(),
        display_name,
        role,
        hash_password(password),
    )
    .map_err(validation_error)?;
    match state.store.put_user(&user).await {
        Ok(()) => {}
        Err(StoreError::EmailExists) => {
            return Err(ApiError::email_already_exists(email.as_str()));
        }
        Err(err) => return Err(store_error(err)),
    }
    info!(
        company_id = %context.company_id,
        user_id = %user.id,
        role = %role,
        "team member created"
    );
    Ok(Json(TeamCreateResponse {
        success: true,
        user_id: user.id.to_string(),
    })
    .into_response())
}

pub(crate) async fn team_list_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = team_list(&state, &context).await;
    finish(&state, ROUTE_TEAM_LIST, started, &request_id, out).await
}

async fn team_list(state: &AppState, context: &AuthContext) -> Result<Response, ApiError> {
    let members: Vec<_> = state
        .store
        .list_team(&context.company_id)
        .await
        .map_err(store_error)?
        .iter()
        .map(UserAccount::public_view)
        .collect();
    Ok(Json(json!({"members": members})).into_response())
}
