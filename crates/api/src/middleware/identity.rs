//! Caller identity extractor.
//!
//! Authentication and session issuance are owned by the auth gateway in
//! front of this service. The gateway injects exactly one of two headers on
//! every authenticated request:
//!
//! - `X-User-Id` - the signed-in user's numeric id
//! - `X-Session-Token` - an opaque token for an anonymous browsing session
//!
//! The identity is the cart key: one cart per user id, one per session
//! token. Handlers that require a caller extract [`Identity`]; requests with
//! neither header are rejected with 401 (the provider webhook route takes no
//! identity at all).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use duka_core::{SessionToken, UserId};

use crate::error::AppError;

const USER_ID_HEADER: &str = "x-user-id";
const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// The caller on whose behalf a request runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// A signed-in user.
    User(UserId),
    /// An anonymous session.
    Session(SessionToken),
}

impl Identity {
    /// The user id, if this is a signed-in caller.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Session(_) => None,
        }
    }

    /// The session token, if this is an anonymous caller.
    #[must_use]
    pub const fn session_token(&self) -> Option<&SessionToken> {
        match self {
            Self::User(_) => None,
            Self::Session(token) => Some(token),
        }
    }

    /// User id as a nullable SQL bind parameter.
    #[must_use]
    pub fn user_param(&self) -> Option<i64> {
        self.user_id().map(|id| id.as_i64())
    }

    /// Session token as a nullable SQL bind parameter.
    #[must_use]
    pub fn session_param(&self) -> Option<&str> {
        self.session_token().map(SessionToken::as_str)
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(value) = parts.headers.get(USER_ID_HEADER) {
            let raw = value
                .to_str()
                .map_err(|_| AppError::BadRequest("invalid X-User-Id header".to_string()))?;
            let id: i64 = raw
                .parse()
                .map_err(|_| AppError::BadRequest("invalid X-User-Id header".to_string()))?;
            return Ok(Self::User(UserId::new(id)));
        }

        if let Some(value) = parts.headers.get(SESSION_TOKEN_HEADER) {
            let token = value
                .to_str()
                .map_err(|_| AppError::BadRequest("invalid X-Session-Token header".to_string()))?;
            if token.is_empty() {
                return Err(AppError::BadRequest(
                    "empty X-Session-Token header".to_string(),
                ));
            }
            return Ok(Self::Session(SessionToken::new(token.to_string())));
        }

        Err(AppError::Unauthorized(
            "missing caller identity".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_identity_params() {
        let identity = Identity::User(UserId::new(42));
        assert_eq!(identity.user_param(), Some(42));
        assert_eq!(identity.session_param(), None);
    }

    #[test]
    fn test_session_identity_params() {
        let identity = Identity::Session(SessionToken::new("abc123".to_string()));
        assert_eq!(identity.user_param(), None);
        assert_eq!(identity.session_param(), Some("abc123"));
    }
}
