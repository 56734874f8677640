use sqlx::{FromRow, SqliteExecutor};
use time::OffsetDateTime;

use crate::app::domain::OrganizationId;

/// Database row for accounts table.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
}

pub struct NewAccount {
    pub organization_id: OrganizationId,
    pub name: String,
    pub description: Option<String>,
}

/// Accounts owned by an organization, by name.
pub async fn list_for_organization<'e, E>(
    executor: E,
    organization_id: &OrganizationId,
) -> Result<Vec<Account>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Account>(
        "SELECT id, organization_id, name, description, created_at FROM accounts WHERE organization_id = ? ORDER BY name",
    )
    .bind(organization_id.as_str())
    .fetch_all(executor)
    .await
}

/// Find an account inside an organization. Accounts of other orgs are invisible.
pub async fn find_in_organization<'e, E>(
    executor: E,
    organization_id: &OrganizationId,
    account_id: &str,
) -> Result<Option<Account>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Account>(
        "SELECT id, organization_id, name, description, created_at FROM accounts WHERE organization_id = ? AND id = ?",
    )
    .bind(organization_id.as_str())
    .bind(account_id)
    .fetch_optional(executor)
    .await
}

/// Insert an account. Returns the new account ID.
pub async fn insert<'e, E>(executor: E, account: &NewAccount) -> Result<String, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let id = ulid::Ulid::new().to_string();
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query(
        "INSERT INTO accounts (id, organization_id, name, description, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(account.organization_id.as_str())
    .bind(&account.name)
    .bind(&account.description)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(id)
}
