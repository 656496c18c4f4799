use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use tabrelay_core::{AutomationError, SavedCredential};
use tabrelay_registration::{AutomationRequest, AutomationResponse, GateDecision, ManualAssistOutcome};

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Malformed or mistyped JSON bodies are client errors like any other bad input.
fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError::Automation(AutomationError::InvalidInput(rejection.body_text()))
}

pub async fn automate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<AutomationRequest>, JsonRejection>,
) -> Result<Json<AutomationResponse>, ApiError> {
    let Json(request) = payload.map_err(invalid_body)?;
    info!(user_id = %user.user_id, url = %request.url, "automation requested");
    let cancel = state.shutdown.child_token();
    let response = state.orchestrator.run(&user.user_id, request, &cancel).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCheckRequest {
    #[serde(default = "default_repeat_count")]
    pub repeat_count: u32,
}

fn default_repeat_count() -> u32 {
    1
}

/// Non-consuming preview of whether `repeatCount` runs would be admitted.
/// Unexpected failures answer `allowed: true` so paying users are never locked out.
pub async fn usage_check(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    body: Bytes,
) -> Response {
    let repeat_count = if body.iter().all(u8::is_ascii_whitespace) {
        default_repeat_count()
    } else {
        match serde_json::from_slice::<UsageCheckRequest>(&body) {
            Ok(request) => request.repeat_count,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "allowed": false, "message": format!("invalid request body: {}", e) })),
                )
                    .into_response()
            }
        }
    };

    match state.orchestrator.gate().preview(&user.user_id, repeat_count).await {
        Ok(GateDecision::Allowed(usage)) => {
            let message = if usage.has_paid { "Premium user - unlimited access" } else { "OK" };
            (
                StatusCode::OK,
                Json(json!({ "allowed": true, "message": message, "usage": usage })),
            )
                .into_response()
        }
        Ok(GateDecision::Denied { usage, .. }) => (
            StatusCode::FORBIDDEN,
            Json(json!({ "allowed": false, "message": "Free usage limit exceeded", "usage": usage })),
        )
            .into_response(),
        Err(AutomationError::InvalidInput(message)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "allowed": false, "message": message })),
        )
            .into_response(),
        Err(e) => {
            warn!(user_id = %user.user_id, error = %e, "usage check failed, allowing");
            (StatusCode::OK, Json(json!({ "allowed": true, "error": e.to_string() }))).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualFormRequest {
    #[serde(default)]
    pub html_code: String,
    #[serde(default)]
    pub url: Option<String>,
}

pub async fn manual_form(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<ManualFormRequest>, JsonRejection>,
) -> Result<Json<ManualAssistOutcome>, ApiError> {
    let Json(request) = payload.map_err(invalid_body)?;
    let outcome = state
        .orchestrator
        .manual_assist()
        .analyze(&user.user_id, &request.html_code, request.url.as_deref())
        .await?;
    Ok(Json(outcome))
}

pub async fn list_credentials(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<SavedCredential>>, ApiError> {
    Ok(Json(state.orchestrator.credentials().list(&user.user_id).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedCredential {
    pub id: Uuid,
    pub url: String,
    pub site_name: String,
    pub email: String,
    pub password: String,
}

pub async fn reveal_credential(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RevealedCredential>, ApiError> {
    let (credential, password) = state
        .orchestrator
        .credentials()
        .reveal(&user.user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(RevealedCredential {
        id: credential.id,
        url: credential.url,
        site_name: credential.site_name,
        email: credential.email,
        password,
    }))
}
