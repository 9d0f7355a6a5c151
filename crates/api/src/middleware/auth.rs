//! Authentication extractors.
//!
//! A request is authenticated by the session cookie first, then by an
//! `Authorization: Bearer <id token>` header verified with the identity
//! provider. Either way handlers receive the same [`CurrentUser`].

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tower_sessions::Session;

use crate::db::UserRepository;
use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};
use crate::services::identity::IdentityError;
use crate::state::AppState;

/// Extractor that requires an authenticated user.
///
/// Rejects with 401 and `{"message": ...}` when neither the session nor a
/// bearer token identifies a user.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.display_name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

fn unauthorized() -> AppError {
    AppError::Unauthorized("Authentication required".to_string())
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve a bearer token to a user: verify it, then load the profile row.
async fn user_from_token(state: &AppState, token: &str) -> Result<CurrentUser, AppError> {
    let verified = state
        .identity()
        .verify_id_token(token)
        .await
        .map_err(|e| match e {
            IdentityError::InvalidToken => unauthorized(),
            other => other.into(),
        })?;

    let profile = UserRepository::new(state.pool())
        .get_profile(&verified.uid)
        .await?
        .ok_or_else(unauthorized)?;

    Ok(CurrentUser {
        uid: profile.user_id,
        email: profile.email,
        phone_number: profile.phone_number,
        display_name: profile.display_name,
        role: verified.claims.role,
        verified: verified.claims.verified,
    })
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>()
            && let Some(user) = session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten()
        {
            return Ok(Self(user));
        }

        let token = bearer_token(parts).ok_or_else(unauthorized)?;
        let user = user_from_token(state, token).await?;

        tracing::Span::current().record("user_id", user.uid.as_str());
        Ok(Self(user))
    }
}

/// Extractor that requires an authenticated admin.
///
/// Rejects with 401 when unauthenticated and 403 for non-admins.
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(Self(user))
    }
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be flushed.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/user");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(Some("Basic dXNlcg=="))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }
}
