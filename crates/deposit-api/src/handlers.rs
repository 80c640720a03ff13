//! # Request Handlers
//!
//! Axum handlers mirroring the store operations over HTTP. Record shapes
//! on the wire are identical to the persisted ones; credentials are
//! stripped from every user response.

use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use deposit_core::auth::{validate_password, SafeUser, Session, User};
use deposit_core::error::DepositError;
use deposit_core::record::{PaymentDraft, PaymentRecord, PaymentStatus, RequestDraft};
use deposit_core::store::{PaymentStore, RequestStore};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn deposit_error_to_response(err: DepositError) -> HandlerError {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

/// Register request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response: sanitized user plus the session token
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: SafeUser,
    pub token: String,
}

/// Status transition request
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: PaymentStatus,
}

/// Attach-payment request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachPaymentRequest {
    pub payment_id: String,
}

// =============================================================================
// Auth helpers
// =============================================================================

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

/// Resolve the bearer token to a session, erroring when absent or unknown
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Session, HandlerError> {
    let token = bearer_token(headers)
        .ok_or_else(|| deposit_error_to_response(DepositError::Unauthorized))?;
    state
        .store
        .find_session(&token)
        .await
        .map_err(deposit_error_to_response)?
        .ok_or_else(|| deposit_error_to_response(DepositError::Unauthorized))
}

/// Resolve the bearer token when present; anonymous callers pass through
async fn maybe_authenticate(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<Session>, HandlerError> {
    match bearer_token(headers) {
        Some(token) => state
            .store
            .find_session(&token)
            .await
            .map_err(deposit_error_to_response),
        None => Ok(None),
    }
}

fn require_field(value: &str, field: &str) -> Result<(), HandlerError> {
    if value.trim().is_empty() {
        return Err(deposit_error_to_response(DepositError::MissingField {
            field: field.to_string(),
        }));
    }
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "deposit-api",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// List all dorms in the catalog
pub async fn list_dorms(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.catalog.dorms.clone())
}

/// Get a dorm by id
pub async fn get_dorm(
    State(state): State<AppState>,
    Path(dorm_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    state
        .catalog
        .get(&dorm_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            deposit_error_to_response(DepositError::RecordNotFound { id: dorm_id })
        })
}

/// Register a new account
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    require_field(&request.name, "name")?;
    require_field(&request.email, "email")?;
    validate_password(&request.password).map_err(|message| {
        deposit_error_to_response(DepositError::Validation {
            field: "password".to_string(),
            message: message.to_string(),
        })
    })?;

    let user = User::new(request.name, request.email, &request.password, request.phone);
    let user = state
        .store
        .add_user(user)
        .await
        .map_err(deposit_error_to_response)?;

    info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user.sanitized())))
}

/// Log in, minting a bearer session
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, HandlerError> {
    let user = state
        .store
        .find_user_by_email(&request.email)
        .await
        .map_err(deposit_error_to_response)?
        .ok_or_else(|| deposit_error_to_response(DepositError::InvalidCredentials))?;

    if !user.verify_password(&request.password) {
        return Err(deposit_error_to_response(DepositError::InvalidCredentials));
    }

    let session = state
        .store
        .add_session(Session::new(user.id.clone()))
        .await
        .map_err(deposit_error_to_response)?;

    Ok(Json(LoginResponse {
        user: user.sanitized(),
        token: session.token,
    }))
}

/// List the caller's requests (plus legacy anonymous ones)
pub async fn list_requests(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HandlerError> {
    let session = authenticate(&state, &headers).await?;
    let requests = RequestStore::list_all(&*state.store)
        .await
        .map_err(deposit_error_to_response)?;
    let owned: Vec<_> = requests
        .into_iter()
        .filter(|r| r.user_id.is_none() || r.user_id.as_deref() == Some(session.user_id.as_str()))
        .collect();
    Ok(Json(owned))
}

/// Create a waitlist request. A session is optional; when present, the
/// request is stamped with the owning user.
#[instrument(skip(state, headers, draft), fields(dorm_id = %draft.dorm_id))]
pub async fn create_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut draft): Json<RequestDraft>,
) -> Result<impl IntoResponse, HandlerError> {
    require_field(&draft.dorm_id, "dormId")?;
    require_field(&draft.full_name, "fullName")?;
    require_field(&draft.university, "university")?;
    require_field(&draft.contact_value, "contactValue")?;
    require_field(&draft.room_type, "roomType")?;
    require_field(&draft.move_in_month, "moveInMonth")?;

    if let Some(session) = maybe_authenticate(&state, &headers).await? {
        draft.user_id = Some(session.user_id);
    }

    let request = RequestStore::append(&*state.store, draft)
        .await
        .map_err(deposit_error_to_response)?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Delete a request the caller owns
pub async fn delete_request(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HandlerError> {
    let session = authenticate(&state, &headers).await?;

    let requests = RequestStore::list_all(&*state.store)
        .await
        .map_err(deposit_error_to_response)?;
    if let Some(request) = requests.iter().find(|r| r.id == request_id) {
        if request.user_id.is_some() && request.user_id.as_deref() != Some(session.user_id.as_str())
        {
            return Err(deposit_error_to_response(DepositError::Forbidden));
        }
    }

    RequestStore::delete(&*state.store, &request_id)
        .await
        .map_err(deposit_error_to_response)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Stamp a payment id onto a request
pub async fn attach_payment(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(body): Json<AttachPaymentRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    state
        .store
        .attach_payment(&request_id, &body.payment_id)
        .await
        .map_err(deposit_error_to_response)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Debug wipe of the request collection
pub async fn clear_requests(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, HandlerError> {
    RequestStore::clear(&*state.store)
        .await
        .map_err(deposit_error_to_response)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// List the caller's payments (plus legacy anonymous ones)
pub async fn list_payments(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HandlerError> {
    let session = authenticate(&state, &headers).await?;
    let payments = PaymentStore::list_all(&*state.store)
        .await
        .map_err(deposit_error_to_response)?;
    let owned: Vec<_> = payments
        .into_iter()
        .filter(|p| p.user_id.is_none() || p.user_id.as_deref() == Some(session.user_id.as_str()))
        .collect();
    Ok(Json(owned))
}

/// Create a payment record. No authentication is required here; a
/// session, when present, stamps the owner.
#[instrument(skip(state, headers, draft), fields(dorm_id = %draft.dorm_id))]
pub async fn create_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut draft): Json<PaymentDraft>,
) -> Result<(StatusCode, Json<PaymentRecord>), HandlerError> {
    require_field(&draft.dorm_id, "dormId")?;
    require_field(&draft.dorm_name, "dormName")?;
    if draft.amount <= 0 {
        return Err(deposit_error_to_response(DepositError::Validation {
            field: "amount".to_string(),
            message: "amount must be positive".to_string(),
        }));
    }

    if let Some(session) = maybe_authenticate(&state, &headers).await? {
        draft.user_id = Some(session.user_id);
    }

    let record = PaymentStore::append(&*state.store, draft)
        .await
        .map_err(deposit_error_to_response)?;
    info!(payment_id = %record.id, "payment recorded");
    Ok((StatusCode::CREATED, Json(record)))
}

/// Transition a payment's status (refunds, in practice)
#[instrument(skip(state, body), fields(payment_id = %payment_id))]
pub async fn set_payment_status(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    Json(body): Json<SetStatusRequest>,
) -> Result<Json<PaymentRecord>, HandlerError> {
    let record = state
        .store
        .set_status(&payment_id, body.status)
        .await
        .map_err(deposit_error_to_response)?;
    Ok(Json(record))
}

/// Debug wipe of the payment collection
pub async fn clear_payments(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, HandlerError> {
    PaymentStore::clear(&*state.store)
        .await
        .map_err(deposit_error_to_response)?;
    Ok(Json(serde_json::json!({ "success": true })))
}
