//! Webhook endpoint handlers.
//!
//! Handlers resolve the webhook, authorize the request, and delegate to the
//! store. Credential hashing and verification are CPU-bound by design and run
//! on the blocking pool, never while a store lock is held.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequest, Path, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use tracing::{error, info, warn};

use crate::model::{
    BasicAuth, CredentialHasher, HeaderList, Message, Webhook, WebhookCreated, WebhookInput,
};
use crate::storage::{StoreError, WebhookStorage};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn WebhookStorage>,
    pub hasher: Arc<CredentialHasher>,
}

impl AppState {
    pub fn new(store: Arc<dyn WebhookStorage>, hasher: CredentialHasher) -> Self {
        Self {
            store,
            hasher: Arc::new(hasher),
        }
    }
}

/// Error body returned to clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            message: message.into(),
        }),
    )
        .into_response()
}

/// Map a store failure to a response. Internal detail is logged, not returned.
fn store_error_response(err: StoreError, webhook_id: &str, message: &str) -> Response {
    match err {
        StoreError::NotFound(id) => error_response(
            StatusCode::NOT_FOUND,
            format!("Webhook with ID: {} does not exist", id),
        ),
        StoreError::Internal(detail) => {
            error!(webhook_id = %webhook_id, error = %detail, "store_operation_failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Fallback for unknown paths and unsupported methods.
pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

// =============================================================================
// Registration
// =============================================================================

/// Register a new webhook.
///
/// Body: `{"displayName"?, "password"?, "tokenName"?, "tokenValue"?}`.
/// Returns only the assigned ID.
pub async fn register_webhook(State(state): State<AppState>, body: Bytes) -> Response {
    let input = match decode_input(&body) {
        Ok(input) => input,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    let hasher = Arc::clone(&state.hasher);
    let webhook = match tokio::task::spawn_blocking(move || Webhook::from_input(input, &hasher)).await
    {
        Ok(webhook) => webhook,
        Err(e) => {
            error!(error = %e, "webhook_build_failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error occurred while inserting webhook.",
            );
        }
    };

    if let Err(e) = webhook.validate() {
        warn!(error = %e, "webhook_validation_failed");
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string());
    }

    let has_password = webhook.has_password();
    let has_token = webhook.has_token();

    match state.store.insert_webhook(webhook) {
        Ok(id) => {
            info!(
                webhook_id = %id,
                has_password = has_password,
                has_token = has_token,
                "webhook_registered"
            );
            (StatusCode::OK, Json(WebhookCreated { id })).into_response()
        }
        Err(e) => {
            error!(error = %e, "webhook_insert_failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error occurred while inserting webhook.",
            )
        }
    }
}

/// Decode a registration body, or return the client-facing reason it was
/// rejected.
///
/// The body is checked for well-formed JSON before its fields are looked at,
/// so a syntax error is never reported as an unknown field.
fn decode_input(body: &[u8]) -> Result<WebhookInput, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        warn!("webhook_input_empty");
        return Err("Could not process body. Invalid input".to_string());
    }

    let value: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "webhook_input_malformed");
        match e.classify() {
            Category::Syntax | Category::Eof => "Body contains malformed json".to_string(),
            Category::Data | Category::Io => "Could not process body. Invalid input".to_string(),
        }
    })?;

    WebhookInput::deserialize(value).map_err(|e| {
        warn!(error = %e, "webhook_input_invalid");
        let message = e.to_string();
        if message.starts_with("unknown field") {
            message
        } else {
            "Wrong type provided for input".to_string()
        }
    })
}

// =============================================================================
// Messages
// =============================================================================

/// Store the request body as a message on the webhook.
///
/// The body is only buffered once the webhook is known and the caller is
/// authorized; the router's body limit still applies when it is read.
pub async fn post_message(
    Path(webhook_id): Path<String>,
    State(state): State<AppState>,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();
    let webhook = match authorize(&state, &webhook_id, &parts.headers).await {
        Ok(webhook) => webhook,
        Err(response) => return response,
    };

    let headers = collect_headers(&parts.headers, webhook.token_name.as_deref());
    let request = Request::from_parts(parts, body);
    let body = match Bytes::from_request(request, &state).await {
        Ok(body) => body,
        Err(rejection) => {
            warn!(
                webhook_id = %webhook.id,
                status = %rejection.status(),
                error = %rejection.body_text(),
                "message_body_rejected"
            );
            return rejection.into_response();
        }
    };
    let body_length = body.len();

    if let Err(e) = state
        .store
        .insert_message(&webhook.id, Message::new(body.to_vec(), headers))
    {
        return store_error_response(e, &webhook.id, "Something went wrong");
    }

    info!(webhook_id = %webhook.id, body_length = body_length, "message_inserted");
    StatusCode::OK.into_response()
}

/// Return every message received on the webhook, oldest first.
pub async fn get_messages(
    Path(webhook_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let webhook = match authorize(&state, &webhook_id, &headers).await {
        Ok(webhook) => webhook,
        Err(response) => return response,
    };

    match state.store.get_messages_for_webhook(&webhook.id) {
        Ok(messages) => {
            info!(
                webhook_id = %webhook.id,
                message_count = messages.len(),
                "messages_retrieved"
            );
            (StatusCode::OK, Json(messages)).into_response()
        }
        Err(e) => store_error_response(e, &webhook.id, "Something went wrong"),
    }
}

/// Resolve the webhook and check the request's credentials against it.
async fn authorize(
    state: &AppState,
    webhook_id: &str,
    headers: &HeaderMap,
) -> Result<Arc<Webhook>, Response> {
    let webhook = state
        .store
        .get_webhook(webhook_id)
        .map_err(|e| {
            warn!(webhook_id = %webhook_id, error = %e, "webhook_lookup_failed");
            store_error_response(e, webhook_id, "Could not retrieve webhook")
        })?;

    let candidate = Arc::clone(&webhook);
    let presented = headers.clone();
    let authorized = tokio::task::spawn_blocking(move || {
        let basic = BasicAuth::from_headers(&presented);
        candidate.validate_authorization(basic.as_ref(), &presented)
    })
    .await
    .map_err(|e| {
        error!(webhook_id = %webhook_id, error = %e, "authorization_task_failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
    })?;

    if !authorized {
        warn!(webhook_id = %webhook_id, "webhook_unauthorized");
        return Err(StatusCode::UNAUTHORIZED.into_response());
    }

    Ok(webhook)
}

/// Copy request headers for storage, minus `Authorization` and the webhook's
/// token header.
fn collect_headers(headers: &HeaderMap, token_name: Option<&str>) -> HeaderList {
    let mut list = HeaderList::new();
    for (name, value) in headers {
        if *name == AUTHORIZATION {
            continue;
        }
        if token_name.is_some_and(|token| name.as_str().eq_ignore_ascii_case(token)) {
            continue;
        }
        list.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    list
}
