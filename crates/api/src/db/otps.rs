//! One-time code repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use lasu_mart_core::OtpKind;

use super::RepositoryError;
use crate::models::OtpRecord;

/// Repository for OTP database operations.
pub struct OtpRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OtpRepository<'a> {
    /// Create a new OTP repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a code, replacing anything outstanding for the same receiver
    /// and kind.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either statement fails.
    pub async fn replace(
        &self,
        kind: OtpKind,
        receiver: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM auth_otps WHERE receiver = $1 AND otp_kind = $2")
            .bind(receiver)
            .bind(kind)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r"
            INSERT INTO auth_otps (otp_kind, code, receiver, expires_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(kind)
        .bind(code)
        .bind(receiver)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Find the most recent record with this code issued to one of
    /// `receivers`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_for(
        &self,
        code: &str,
        receivers: &[&str],
    ) -> Result<Option<OtpRecord>, RepositoryError> {
        let receivers: Vec<String> = receivers.iter().map(|r| (*r).to_owned()).collect();
        let record = sqlx::query_as::<_, OtpRecord>(
            r"
            SELECT otp_id, otp_kind, code, receiver, expires_at
            FROM auth_otps
            WHERE code = $1 AND receiver = ANY($2)
            ORDER BY created_at DESC
            LIMIT 1
            ",
        )
        .bind(code)
        .bind(receivers)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// Find the most recent record with this code, whoever it was issued to.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, code: &str) -> Result<Option<OtpRecord>, RepositoryError> {
        let record = sqlx::query_as::<_, OtpRecord>(
            r"
            SELECT otp_id, otp_kind, code, receiver, expires_at
            FROM auth_otps
            WHERE code = $1
            ORDER BY created_at DESC
            LIMIT 1
            ",
        )
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// Delete every code issued to the given receivers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_for(&self, receivers: &[&str]) -> Result<u64, RepositoryError> {
        let receivers: Vec<String> = receivers.iter().map(|r| (*r).to_owned()).collect();
        let result = sqlx::query("DELETE FROM auth_otps WHERE receiver = ANY($1)")
            .bind(receivers)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Remove expired codes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM auth_otps WHERE expires_at <= NOW()")
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
