use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use tabrelay_core::AutomationError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Automation(#[from] AutomationError),

    #[error("not found")]
    NotFound,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Automation(e) => match e {
                AutomationError::Auth(_) => StatusCode::UNAUTHORIZED,
                AutomationError::UsageLimit => StatusCode::FORBIDDEN,
                AutomationError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Automation(AutomationError::UsageLimit) => json!({
                "success": false,
                "error": "Usage limit exceeded",
                "message": "All free runs are used up. Premium access is required."
            }),
            ApiError::Automation(AutomationError::Auth(_)) => json!({
                "success": false,
                "error": "Unauthorized"
            }),
            other => {
                if status.is_server_error() {
                    error!(error = %other, "request failed");
                }
                json!({
                    "success": false,
                    "error": other.to_string()
                })
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AutomationError::Auth("bad".into()), StatusCode::UNAUTHORIZED),
            (AutomationError::UsageLimit, StatusCode::FORBIDDEN),
            (AutomationError::InvalidInput("url".into()), StatusCode::BAD_REQUEST),
            (AutomationError::Storage("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AutomationError::Crypto("tag".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
    }
}
