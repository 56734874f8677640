use sqlx::{FromRow, SqliteExecutor};
use time::OffsetDateTime;

use crate::app::domain::UserId;

/// Database row for password_reset_tokens table.
#[derive(Debug, FromRow)]
pub struct PasswordResetToken {
    pub token: String,
    pub user_id: String,
    pub expires_at: i64,
}

pub async fn insert_token<'e, E>(
    executor: E,
    user_id: &UserId,
    token: &str,
    expires_at: OffsetDateTime,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query(
        "INSERT INTO password_reset_tokens (token, user_id, expires_at, used_at, created_at) VALUES (?, ?, ?, NULL, ?)",
    )
    .bind(token)
    .bind(user_id.as_str())
    .bind(expires_at.unix_timestamp())
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

/// Find an unused, unexpired token.
pub async fn find_valid<'e, E>(
    executor: E,
    token: &str,
) -> Result<Option<PasswordResetToken>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query_as::<_, PasswordResetToken>(
        "SELECT token, user_id, expires_at FROM password_reset_tokens WHERE token = ? AND used_at IS NULL AND expires_at > ?",
    )
    .bind(token)
    .bind(now)
    .fetch_optional(executor)
    .await
}

/// Mark a token used. Returns false if it was already consumed.
pub async fn mark_used<'e, E>(executor: E, token: &str) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let result = sqlx::query(
        "UPDATE password_reset_tokens SET used_at = ? WHERE token = ? AND used_at IS NULL",
    )
    .bind(now)
    .bind(token)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}
