use sqlx::{FromRow, SqliteExecutor};
use time::OffsetDateTime;

use crate::app::domain::OrganizationId;

/// Database row for organizations table.
#[derive(Debug, Clone, FromRow)]
pub struct Organization {
    pub id: String,
    pub name: String,
    /// Public host the organization is served from, e.g. `books.example.org`.
    pub host: Option<String>,
    pub subdomain: Option<String>,
    pub created_at: i64,
}

impl Organization {
    /// Base URL for links that leave the app (emails). Falls back to `app_url`
    /// when the organization has no host of its own.
    pub fn base_url(&self, app_url: &str) -> String {
        match self.host.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
            Some(host) => format!("https://{}", host.trim_end_matches('/')),
            None => app_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Data structure for inserting a new organization.
pub struct NewOrganization {
    pub id: OrganizationId,
    pub name: String,
    pub host: Option<String>,
    pub subdomain: Option<String>,
}

/// Find an organization by ID.
pub async fn find_by_id<'e, E>(
    executor: E,
    organization_id: &OrganizationId,
) -> Result<Option<Organization>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Organization>(
        "SELECT id, name, host, subdomain, created_at FROM organizations WHERE id = ?",
    )
    .bind(organization_id.as_str())
    .fetch_optional(executor)
    .await
}

/// All organizations, by name. Superadmin overview only.
pub async fn list_all<'e, E>(executor: E) -> Result<Vec<Organization>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Organization>(
        "SELECT id, name, host, subdomain, created_at FROM organizations ORDER BY name",
    )
    .fetch_all(executor)
    .await
}

/// Insert a new organization.
pub async fn insert<'e, E>(
    executor: E,
    organization: &NewOrganization,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query(
        "INSERT INTO organizations (id, name, host, subdomain, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(organization.id.as_str())
    .bind(&organization.name)
    .bind(&organization.host)
    .bind(&organization.subdomain)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}
