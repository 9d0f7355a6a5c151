//! Profile, profile photo and cart handlers.

use axum::{
    Json,
    extract::{Multipart, Query, State},
    http::StatusCode,
};
use serde::Serialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::db::{CartRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::{
    AddToCart, CartItem, CurrentUser, MAX_LINE_QUANTITY, ProfileUpdate, RemoveFromCart,
    UserProfile,
};
use crate::services::assets::PROFILE_FOLDER;
use crate::state::AppState;

/// Multipart field carrying the new profile photo.
const PHOTO_FIELD: &str = "profile_photo";

// =============================================================================
// Profile
// =============================================================================

/// GET /user
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UserProfile>> {
    UserRepository::new(state.pool())
        .get_profile(&user.uid)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Update display name, address and payment preference.
///
/// PUT /user
#[instrument(skip(state, session, user, body), fields(user_id = %user.uid))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(mut body): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>> {
    if body.is_empty() {
        return Err(AppError::BadRequest("Nothing to update".to_string()));
    }
    if let Some(name) = body.display_name.as_mut() {
        *name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest(
                "Display name must be a non-empty string".to_string(),
            ));
        }
    }

    let profile = UserRepository::new(state.pool())
        .update_profile(&user.uid, &body)
        .await?;

    if profile.display_name != user.display_name {
        set_current_user(
            &session,
            &CurrentUser {
                display_name: profile.display_name.clone(),
                ..user
            },
        )
        .await?;
    }

    Ok(Json(profile))
}

#[derive(Debug, Serialize)]
pub struct PhotoResponse {
    pub picture_url: Option<String>,
}

/// Replace the profile photo.
///
/// POST /user/photo (multipart, field `profile_photo`)
#[instrument(skip(state, user, multipart), fields(user_id = %user.uid))]
pub async fn upload_photo(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    mut multipart: Multipart,
) -> Result<Json<PhotoResponse>> {
    let mut photo = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() == Some(PHOTO_FIELD) {
            let file_name = field.file_name().unwrap_or("photo").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            photo = Some((file_name, bytes.to_vec()));
        }
    }

    let (file_name, bytes) = photo
        .filter(|(_, bytes)| !bytes.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Missing `{PHOTO_FIELD}` file")))?;

    let assets = state.assets();
    let uploaded = assets.upload(bytes, &file_name, PROFILE_FOLDER).await?;

    let previous = match UserRepository::new(state.pool())
        .replace_photo(&user.uid, Some((uploaded.url.as_str(), uploaded.public_id.as_str())))
        .await
    {
        Ok(previous) => previous,
        Err(e) => {
            if let Err(cleanup) = assets.destroy(&uploaded.public_id).await {
                warn!(public_id = %uploaded.public_id, error = %cleanup, "Failed to discard uploaded photo");
            }
            return Err(e.into());
        }
    };

    if let Some(previous) = previous
        && let Err(e) = assets.destroy(&previous).await
    {
        warn!(public_id = %previous, error = %e, "Failed to delete previous profile photo");
    }

    Ok(Json(PhotoResponse {
        picture_url: Some(uploaded.url),
    }))
}

/// Remove the profile photo.
///
/// DELETE /user/photo
#[instrument(skip(state, user), fields(user_id = %user.uid))]
pub async fn delete_photo(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<PhotoResponse>> {
    let previous = UserRepository::new(state.pool())
        .replace_photo(&user.uid, None)
        .await?;

    if let Some(previous) = previous
        && let Err(e) = state.assets().destroy(&previous).await
    {
        warn!(public_id = %previous, error = %e, "Failed to delete profile photo");
    }

    Ok(Json(PhotoResponse { picture_url: None }))
}

// =============================================================================
// Cart
// =============================================================================

/// GET /user/cart
pub async fn cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<CartItem>>> {
    let items = CartRepository::new(state.pool()).list(&user.uid).await?;
    Ok(Json(items))
}

/// Add to the cart. Repeated adds of the same product and variant
/// accumulate.
///
/// POST /user/cart
#[instrument(skip(state, user), fields(user_id = %user.uid))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<AddToCart>,
) -> Result<(StatusCode, Json<Value>)> {
    let quantity = body.checked_quantity().ok_or_else(|| {
        AppError::BadRequest(format!(
            "Quantity must be between 1 and {MAX_LINE_QUANTITY}"
        ))
    })?;
    let variant = body.variant.as_deref().map(str::trim).filter(|v| !v.is_empty());

    let carts = CartRepository::new(state.pool());
    carts
        .add(&user.uid, body.product_id, variant, quantity)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::Conflict(_) => {
                AppError::NotFound("Product not found".to_string())
            }
            other => other.into(),
        })?;
    let total_cart_items = carts.count(&user.uid).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Added to cart", "total_cart_items": total_cart_items })),
    ))
}

/// Remove a product (and variant) from the cart.
///
/// DELETE /user/cart?product_id=...&variant=...
pub async fn remove_from_cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<RemoveFromCart>,
) -> Result<Json<Value>> {
    let variant = query.variant.as_deref().map(str::trim).filter(|v| !v.is_empty());

    let carts = CartRepository::new(state.pool());
    carts.remove(&user.uid, query.product_id, variant).await?;
    let total_cart_items = carts.count(&user.uid).await?;

    Ok(Json(
        json!({ "message": "Removed from cart", "total_cart_items": total_cart_items }),
    ))
}
