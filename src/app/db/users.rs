use sqlx::{FromRow, SqliteExecutor};
use time::OffsetDateTime;

use crate::app::domain::{HashedPassword, Role, UserId, Username};

/// Database row for users table.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub session_generation: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    /// Global role. Unknown stored values decode as `Role::User`.
    pub fn role(&self) -> Role {
        Role::from_stored(&self.role)
    }
}

/// Data structure for inserting a new user.
pub struct NewUser {
    pub id: UserId,
    pub username: Username,
    pub password_hash: HashedPassword,
    pub role: Role,
}

/// Find a user by ID.
pub async fn find_by_id<'e, E>(executor: E, user_id: &UserId) -> Result<Option<User>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, User>("SELECT id, username, password_hash, role, session_generation, created_at, updated_at FROM users WHERE id = ?")
        .bind(user_id.as_str())
        .fetch_optional(executor)
        .await
}

/// Find a user by login name.
pub async fn find_by_username<'e, E>(
    executor: E,
    username: &Username,
) -> Result<Option<User>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, User>("SELECT id, username, password_hash, role, session_generation, created_at, updated_at FROM users WHERE username = ?")
        .bind(username.as_str())
        .fetch_optional(executor)
        .await
}

/// Insert a new user.
pub async fn insert<'e, E>(executor: E, user: &NewUser) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query(
        "INSERT INTO users (id, username, password_hash, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(user.id.as_str())
    .bind(user.username.as_str())
    .bind(user.password_hash.as_str())
    .bind(user.role.to_string())
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

/// Replace a user's password hash and invalidate every session issued before.
pub async fn update_password<'e, E>(
    executor: E,
    user_id: &UserId,
    password_hash: &HashedPassword,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query("UPDATE users SET password_hash = ?, session_generation = session_generation + 1, updated_at = ? WHERE id = ?")
        .bind(password_hash.as_str())
        .bind(now)
        .bind(user_id.as_str())
        .execute(executor)
        .await?;
    Ok(())
}
