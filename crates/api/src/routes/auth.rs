//! Authentication route handlers.
//!
//! Passwords and tokens are handled by the identity provider. Registration
//! creates the provider account and the local profile row together; login
//! exchanges a provider ID token for a signed session cookie.

use axum::{Json, extract::State, http::StatusCode};
use lasu_mart_core::{Email, OtpKind, PhoneNumber, Role};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::db::UserRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, NewUser, UserProfile, Verified};
use crate::services::identity::{Claims, IdentityError, NewIdentity};
use crate::services::otp;
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Email,
    pub password: String,
    #[serde(alias = "displayName")]
    pub display_name: String,
    /// Local or international format; the configured country code is
    /// prepended to local numbers.
    #[serde(alias = "phoneNumber")]
    pub phone_number: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "idToken")]
    pub id_token: String,
}

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    #[serde(alias = "type")]
    pub kind: OtpKind,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(alias = "otpValue")]
    pub code: String,
}

/// `GET /auth/verify` response: the stored profile plus live claims.
#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub verified: Verified,
}

// =============================================================================
// Registration and login
// =============================================================================

/// Create an identity-provider account and its profile row.
///
/// POST /auth/register
///
/// If the profile row cannot be written the provider account is deleted
/// again so a retry starts clean.
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let display_name = body.display_name.trim();
    if display_name.is_empty() {
        return Err(AppError::BadRequest(
            "Display name must be a non-empty string".to_string(),
        ));
    }
    let phone_number =
        PhoneNumber::with_country_code(&body.phone_number, &state.config().phone_country_code)
            .map_err(|e| AppError::BadRequest(format!("Invalid phone number: {e}")))?;

    let identity = state.identity();
    let record = identity
        .create_user(&NewIdentity {
            email: body.email,
            password: SecretString::from(body.password),
            display_name: display_name.to_string(),
            phone_number,
        })
        .await?;

    let stored = async {
        identity.set_claims(&record.uid, &Claims::default()).await?;
        UserRepository::new(state.pool())
            .create(&NewUser {
                uid: record.uid.clone(),
                email: record.email.clone(),
                display_name: record.display_name.clone(),
                phone_number: record.phone_number.clone(),
                role: Role::User,
            })
            .await?;
        Ok::<(), AppError>(())
    }
    .await;

    if let Err(e) = stored {
        if let Err(cleanup) = identity.delete_user(&record.uid).await {
            warn!(uid = %record.uid, error = %cleanup, "Failed to roll back identity account");
        }
        return Err(e);
    }

    info!(uid = %record.uid, "Account created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Account created successfully" })),
    ))
}

/// Exchange an identity-provider ID token for a session.
///
/// POST /auth/login
#[instrument(skip(state, session, body))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<CurrentUser>> {
    let verified = state
        .identity()
        .verify_id_token(body.id_token.trim())
        .await
        .map_err(|e| match e {
            IdentityError::InvalidToken => AppError::Unauthorized("Invalid credentials".to_string()),
            other => other.into(),
        })?;

    let profile = UserRepository::new(state.pool())
        .get_profile(&verified.uid)
        .await?
        .ok_or_else(|| AppError::Unauthorized("No profile for this account".to_string()))?;

    let user = CurrentUser {
        uid: profile.user_id,
        email: profile.email,
        phone_number: profile.phone_number,
        display_name: profile.display_name,
        role: verified.claims.role,
        verified: verified.claims.verified,
    };

    // New session ID on login
    session.cycle_id().await?;
    set_current_user(&session, &user).await?;
    set_sentry_user(&user.uid, Some(user.email.as_str()));

    info!(uid = %user.uid, "Logged in");
    Ok(Json(user))
}

/// End the session.
///
/// POST /auth/logout
pub async fn logout(session: Session) -> Result<Json<Value>> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Json(json!({ "message": "Logged out" })))
}

/// The caller's profile and verification state.
///
/// GET /auth/verify
#[instrument(skip(state, user), fields(user_id = %user.uid))]
pub async fn verify(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<SessionView>> {
    let profile = UserRepository::new(state.pool())
        .get_profile(&user.uid)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(SessionView {
        profile,
        verified: user.verified,
    }))
}

// =============================================================================
// One-time codes
// =============================================================================

/// Send a verification code to the caller's email or phone.
///
/// POST /auth/otp
pub async fn send_otp(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<SendOtpRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    otp::send(
        state.pool(),
        state.email(),
        &user,
        body.kind,
        state.config().otp_ttl,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(json!({ "message": "OTP sent" }))))
}

/// Check a verification code and mark the channel verified.
///
/// POST /auth/otp/verify
pub async fn verify_otp(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(body): Json<VerifyOtpRequest>,
) -> Result<Json<Value>> {
    let user = otp::verify(state.pool(), state.identity(), &user, &body.code).await?;
    set_current_user(&session, &user).await?;

    Ok(Json(json!({
        "message": "Verification successful",
        "verified": user.verified,
    })))
}
