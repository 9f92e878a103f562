//! Request identity extraction.
//!
//! Authentication itself lives upstream (out of scope here); requests arrive
//! with an `x-user-id` header set by the auth proxy, an `x-session-token`
//! header minted by the cart endpoints for anonymous visitors, or both
//! during the login handoff (which is what triggers the cart merge).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use rand::Rng;
use rand::distr::Alphanumeric;

use altiplano_core::UserId;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the authenticated user id (set by the auth proxy).
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the anonymous cart session token.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";
/// Header carrying the admin shared secret.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Length of minted session tokens.
const SESSION_TOKEN_LENGTH: usize = 32;

/// The identity a request acts as.
///
/// Both fields may be present on the first authenticated request after an
/// anonymous browsing session; the cart service uses that overlap to merge
/// the anonymous cart into the user's.
#[derive(Debug, Clone, Default)]
pub struct RequestIdentity {
    /// Authenticated user, if any.
    pub user_id: Option<UserId>,
    /// Anonymous session token, if any.
    pub session_token: Option<String>,
}

impl RequestIdentity {
    /// Whether the request carries any identity at all.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.user_id.is_some() || self.session_token.is_some()
    }

    /// The authenticated user id, or `Unauthorized` for endpoints that
    /// require an account (orders, payments, addresses).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` when no user id is present.
    pub fn require_user(&self) -> Result<UserId, AppError> {
        self.user_id
            .ok_or_else(|| AppError::Unauthorized("authentication required".to_string()))
    }
}

impl<S> FromRequestParts<S> for RequestIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = match parts.headers.get(USER_ID_HEADER) {
            Some(value) => {
                let raw = value
                    .to_str()
                    .map_err(|_| AppError::BadRequest("invalid x-user-id header".to_string()))?;
                let id = raw
                    .parse::<i32>()
                    .map_err(|_| AppError::BadRequest("invalid x-user-id header".to_string()))?;
                Some(UserId::new(id))
            }
            None => None,
        };

        let session_token = match parts.headers.get(SESSION_TOKEN_HEADER) {
            Some(value) => {
                let raw = value
                    .to_str()
                    .map_err(|_| {
                        AppError::BadRequest("invalid x-session-token header".to_string())
                    })?
                    .to_string();
                if raw.is_empty() || raw.len() > 128 {
                    return Err(AppError::BadRequest(
                        "invalid x-session-token header".to_string(),
                    ));
                }
                Some(raw)
            }
            None => None,
        };

        Ok(Self {
            user_id,
            session_token,
        })
    }
}

/// Mint a fresh opaque session token for an anonymous visitor.
#[must_use]
pub fn mint_session_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Guard extractor for admin endpoints.
///
/// Compares the `x-admin-token` header against the configured shared secret
/// in constant time.
pub struct AdminAuth;

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing admin token".to_string()))?;

        if !state.config().admin_token_matches(presented) {
            return Err(AppError::Unauthorized("invalid admin token".to_string()));
        }

        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_tokens_are_opaque_and_distinct() {
        let a = mint_session_token();
        let b = mint_session_token();
        assert_eq!(a.len(), SESSION_TOKEN_LENGTH);
        assert!(a.chars().all(char::is_alphanumeric));
        assert_ne!(a, b);
    }

    #[test]
    fn require_user_rejects_anonymous_identities() {
        let anonymous = RequestIdentity {
            user_id: None,
            session_token: Some("tok".to_string()),
        };
        assert!(anonymous.require_user().is_err());

        let authenticated = RequestIdentity {
            user_id: Some(UserId::new(1)),
            session_token: None,
        };
        assert_eq!(
            authenticated.require_user().expect("user"),
            UserId::new(1)
        );
    }
}
