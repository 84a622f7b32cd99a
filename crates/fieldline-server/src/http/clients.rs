use crate::auth::AuthContext;
use crate::http::handlers::{
    apply_optional, finish, parse_doc_id, parse_json_body, propagated_request_id, store_error,
    validation_error,
};
use crate::*;
use fieldline_api::body::require_str;
use fieldline_model::{parse_client_name, ClientRecord};
use serde_json::json;

const ROUTE_CLIENTS: &str = "/v1/clients";
const ROUTE_CLIENT: &str = "/v1/clients/:id";

pub(crate) async fn create_client_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = create_client(&state, &context, &body).await;
    finish(&state, ROUTE_CLIENTS, started, &request_id, out).await
}

async fn create_client(
    state: &AppState,
    context: &AuthContext,
    raw: &Bytes,
) -> Result<Response, ApiError> {
    let body = parse_json_body(raw)?;
    let name = require_str(&body, "name")?;
    let mut client =
        ClientRecord::new(context.company_id.clone(), name).map_err(validation_error)?;
    apply_optional(&body, "email", &mut client.email)?;
    apply_optional(&body, "phone", &mut client.phone)?;
    apply_optional(&body, "address", &mut client.address)?;
    apply_optional(&body, "notes", &mut client.notes)?;
    state.store.put_client(&client).await.map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(client)).into_response())
}

pub(crate) async fn list_clients_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = list_clients(&state, &context).await;
    finish(&state, ROUTE_CLIENTS, started, &request_id, out).await
}

async fn list_clients(state: &AppState, context: &AuthContext) -> Result<Response, ApiError> {
    let clients = state
        .store
        .list_clients(&context.company_id)
        .await
        .map_err(store_error)?;
    Ok(Json(json!({"clients": clients})).into_response())
}

pub(crate) async fn get_client_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = get_client(&state, &context, &id).await;
    finish(&state, ROUTE_CLIENT, started, &request_id, out).await
}

async fn get_client(
    state: &AppState,
    context: &AuthContext,
    raw_id: &str,
) -> Result<Response, ApiError> {
    let id = parse_doc_id(raw_id, "client")?;
    let client = state
        .store
        .get_client(&context.company_id, &id)
        .await
        .map_err(store_error)?;
    Ok(Json(client).into_response())
}

pub(crate) async fn update_client_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = update_client(&state, &context, &id, &body).await;
    finish(&state, ROUTE_CLIENT, started, &request_id, out).await
}

async fn update_client(
    state: &AppState,
    context: &AuthContext,
    raw_id: &str,
    raw: &Bytes,
) -> Result<Response, ApiError> {
    let id = parse_doc_id(raw_id, "client")?;
    let body = parse_json_body(raw)?;
    let mut client = state
        .store
        .get_client(&context.company_id, &id)
        .await
        .map_err(store_error)?;
    if body.get("name").is_some() {
        client.name = parse_client_name(require_str(&body, "name")?).map_err(validation_error)?;
    }
    apply_optional(&body, "email", &mut client.email)?;
    apply_optional(&body, "phone", &mut client.phone)?;
    apply_optional(&body, "address", &mut client.address)?;
    apply_optional(&body, "notes", &mut client.notes)?;
    client.touch();
    state.store.put_client(&client).await.map_err(store_error)?;
    Ok(Json(client).into_response())
}

pub(crate) async fn delete_client_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = delete_client(&state, &context, &id).await;
    finish(&state, ROUTE_CLIENT, started, &request_id, out).await
}

async fn delete_client(
    state: &AppState,
    context: &AuthContext,
    raw_id: &str,
) -> Result<Response, ApiError> {
    let id = parse_doc_id(raw_id, "client")?;
    state
        .store
        .delete_client(&context.company_id, &id)
        .await
        .map_err(store_error)?;
    Ok(Json(json!({"success": true})).into_response())
}
