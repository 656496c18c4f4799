// Bearer token verification for the /v1 routes. Tokens are issued by the
// external identity provider; this service only checks them.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use tabrelay_core::AutomationError;

use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub email: Option<String>,
}

pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn hs256(secret: &str) -> Result<Self, AutomationError> {
        if secret.trim().is_empty() {
            return Err(AutomationError::Config(
                "jwt secret is not configured (set TABRELAY_JWT_SECRET)".to_string(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;

        Ok(Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AutomationError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| AutomationError::Auth(e.to_string()))?;
        if data.claims.sub.trim().is_empty() {
            return Err(AutomationError::Auth("token has no subject".to_string()));
        }
        Ok(data.claims)
    }
}

/// The caller, as established by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: Option<String>,
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "success": false,
            "error": message
        })),
    )
        .into_response()
}

pub async fn auth_middleware(State(state): State<AppState>, mut request: Request<Body>, next: Next) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) if !token.trim().is_empty() => token.trim(),
        _ => return unauthorized("Unauthorized - No authorization header"),
    };

    let claims = match state.verifier.verify(token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!(error = %e, "bearer token rejected");
            return unauthorized("Unauthorized - Invalid token");
        }
    };

    // First sight of a user creates their ledger row. A failure here is left for
    // the handler to surface so the usage check can still fail open.
    if let Err(e) = state.usage.ensure_usage_record(&claims.sub).await {
        warn!(user_id = %claims.sub, error = %e, "could not ensure usage record");
    }

    debug!(user_id = %claims.sub, "request authenticated");
    request.extensions_mut().insert(AuthenticatedUser {
        user_id: claims.sub,
        email: claims.email,
    });

    next.run(request).await
}

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| unauthorized("Authentication required"))
    }
}
