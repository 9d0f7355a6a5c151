//! User repository for database operations.

use sqlx::PgPool;

use lasu_mart_core::{Email, PaymentMethod, Role, UserId};

use super::RepositoryError;
use crate::models::{NewUser, ProfileUpdate, UserProfile};

const PROFILE_COLUMNS: &str = r"
    u.user_id, u.email, u.display_name, u.phone_number, u.picture_url,
    u.picture_public_id, u.role, u.address, u.preferred_payment_method, u.created_at,
    (SELECT COUNT(*) FROM cart_lines c WHERE c.user_id = u.user_id) AS total_cart_items
";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert the local profile for a freshly created identity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the uid or email already exists.
    pub async fn create(&self, user: &NewUser) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO users (user_id, email, display_name, phone_number, role)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(&user.uid)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.phone_number)
        .bind(user.role)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "account already exists"))?;

        Ok(())
    }

    /// Get a user's profile with their cart item count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_profile(&self, uid: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM users u WHERE u.user_id = $1"
        ))
        .bind(uid)
        .fetch_optional(self.pool)
        .await?;

        Ok(profile)
    }

    /// The user's saved payment preference (`not_set` for unknown users).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn preferred_payment_method(
        &self,
        uid: &UserId,
    ) -> Result<PaymentMethod, RepositoryError> {
        let method = sqlx::query_scalar::<_, PaymentMethod>(
            "SELECT preferred_payment_method FROM users WHERE user_id = $1",
        )
        .bind(uid)
        .fetch_optional(self.pool)
        .await?;

        Ok(method.unwrap_or_default())
    }

    /// Update the editable profile fields, keeping any that are `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no profile.
    pub async fn update_profile(
        &self,
        uid: &UserId,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, RepositoryError> {
        let updated = sqlx::query(
            r"
            UPDATE users
            SET display_name = COALESCE($2, display_name),
                address = COALESCE($3, address),
                preferred_payment_method = COALESCE($4, preferred_payment_method)
            WHERE user_id = $1
            ",
        )
        .bind(uid)
        .bind(update.display_name.as_deref())
        .bind(update.address.as_deref())
        .bind(update.preferred_payment_method)
        .execute(self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get_profile(uid).await?.ok_or(RepositoryError::NotFound)
    }

    /// Replace the profile photo, returning the previous asset id (if any).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no profile.
    pub async fn replace_photo(
        &self,
        uid: &UserId,
        photo: Option<(&str, &str)>,
    ) -> Result<Option<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query_scalar::<_, Option<String>>(
            "SELECT picture_public_id FROM users WHERE user_id = $1 FOR UPDATE",
        )
        .bind(uid)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let (url, public_id) = photo.unzip();
        sqlx::query(
            "UPDATE users SET picture_url = $2, picture_public_id = $3 WHERE user_id = $1",
        )
        .bind(uid)
        .bind(url)
        .bind(public_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(previous)
    }

    /// Look up a user's uid by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_uid_by_email(&self, email: &Email) -> Result<Option<UserId>, RepositoryError> {
        let uid = sqlx::query_scalar::<_, UserId>("SELECT user_id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.pool)
            .await?;

        Ok(uid)
    }

    /// Record a role change made at the identity provider.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no profile.
    pub async fn set_role(&self, uid: &UserId, role: Role) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET role = $2 WHERE user_id = $1")
            .bind(uid)
            .bind(role)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Get a user's display name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn display_name(&self, uid: &UserId) -> Result<Option<String>, RepositoryError> {
        let name = sqlx::query_scalar::<_, String>(
            "SELECT display_name FROM users WHERE user_id = $1",
        )
        .bind(uid)
        .fetch_optional(self.pool)
        .await?;

        Ok(name)
    }
}
