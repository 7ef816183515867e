//! Custom Axum extractors for request authentication.
//!
//! Provides `AuthedSession`, which resolves the `Authorization: Bearer`
//! header against the configured access tokens and yields the
//! [`SessionAuth`] identity the coordinator authorizes against.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use ofd_core::auth::SessionAuth;
use uuid::Uuid;

use crate::config::runtime::authenticate;
use crate::state::AppState;

/// An authenticated session identity, one per request.
///
/// REST requests are stateless, so each gets a fresh `session_id`; only the
/// WebSocket endpoint keeps a session alive across intents.
pub struct AuthedSession(pub SessionAuth);

/// Errors returned by the [`AuthedSession`] extractor.
#[derive(Debug, thiserror::Error)]
pub enum AuthRejection {
    #[error("missing Authorization header")]
    MissingHeader,
    #[error("malformed Authorization header")]
    MalformedHeader,
    #[error("unknown credential")]
    UnknownToken,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let message = match self {
            AuthRejection::MissingHeader => "missing Authorization header",
            AuthRejection::MalformedHeader => "malformed Authorization header",
            AuthRejection::UnknownToken => "unknown credential",
        };
        (StatusCode::UNAUTHORIZED, message).into_response()
    }
}

impl FromRequestParts<AppState> for AuthedSession {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthRejection::MissingHeader)?
            .to_str()
            .map_err(|_| AuthRejection::MalformedHeader)?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or(AuthRejection::MalformedHeader)?;

        let tokens = state.config.access_tokens.read().await;
        let (subject_id, role) =
            authenticate(&tokens, token).ok_or(AuthRejection::UnknownToken)?;
        drop(tokens);

        Ok(AuthedSession(SessionAuth {
            session_id: Uuid::new_v4(),
            subject_id,
            role,
        }))
    }
}

/// Resolve a raw token string (from the WebSocket `token` query parameter)
/// to a session identity.
pub async fn session_from_token(state: &AppState, token: &str) -> Option<SessionAuth> {
    let tokens = state.config.access_tokens.read().await;
    let (subject_id, role) = authenticate(&tokens, token)?;
    Some(SessionAuth {
        session_id: Uuid::new_v4(),
        subject_id,
        role,
    })
}
