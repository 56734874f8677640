use sqlx::{FromRow, SqliteExecutor};
use time::OffsetDateTime;

use crate::app::domain::{OrganizationId, Role, UserId};

/// Database row for organization_members table.
#[derive(Debug, Clone, FromRow)]
pub struct Membership {
    pub organization_id: String,
    pub user_id: String,
    pub role: String,
    pub is_default: bool,
    pub created_at: i64,
}

impl Membership {
    pub fn role(&self) -> Role {
        Role::from_stored(&self.role)
    }
}

/// A user's membership joined with the organization's display name.
#[derive(Debug, Clone, FromRow)]
pub struct MembershipWithOrganization {
    pub organization_id: String,
    pub organization_name: String,
    pub role: String,
    pub is_default: bool,
}

/// A member of one organization, with login and contact details.
#[derive(Debug, Clone, FromRow)]
pub struct MemberWithContact {
    pub user_id: String,
    pub username: String,
    pub role: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// Add a user to an organization.
pub async fn insert<'e, E>(
    executor: E,
    organization_id: &OrganizationId,
    user_id: &UserId,
    role: Role,
    is_default: bool,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query(
        "INSERT INTO organization_members (organization_id, user_id, role, is_default, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(organization_id.as_str())
    .bind(user_id.as_str())
    .bind(role.to_string())
    .bind(is_default)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

/// Find the membership for a (user, organization) pair.
pub async fn find<'e, E>(
    executor: E,
    user_id: &UserId,
    organization_id: &OrganizationId,
) -> Result<Option<Membership>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Membership>(
        "SELECT organization_id, user_id, role, is_default, created_at FROM organization_members WHERE user_id = ? AND organization_id = ?",
    )
    .bind(user_id.as_str())
    .bind(organization_id.as_str())
    .fetch_optional(executor)
    .await
}

/// All memberships of a user, in the order they were created.
pub async fn list_for_user<'e, E>(
    executor: E,
    user_id: &UserId,
) -> Result<Vec<MembershipWithOrganization>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, MembershipWithOrganization>(
        r#"
        SELECT m.organization_id, o.name AS organization_name, m.role, m.is_default
        FROM organization_members m
        JOIN organizations o ON o.id = m.organization_id
        WHERE m.user_id = ?
        ORDER BY m.rowid
        "#,
    )
    .bind(user_id.as_str())
    .fetch_all(executor)
    .await
}

/// All members of an organization, in the order they joined.
pub async fn list_for_organization<'e, E>(
    executor: E,
    organization_id: &OrganizationId,
) -> Result<Vec<MemberWithContact>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, MemberWithContact>(
        r#"
        SELECT u.id AS user_id, u.username, m.role, c.first_name, c.last_name, c.email
        FROM organization_members m
        JOIN users u ON u.id = m.user_id
        LEFT JOIN contacts c ON c.user_id = u.id
        WHERE m.organization_id = ?
        ORDER BY m.rowid
        "#,
    )
    .bind(organization_id.as_str())
    .fetch_all(executor)
    .await
}

/// Clear `is_default` on every membership of the user.
pub async fn clear_defaults<'e, E>(executor: E, user_id: &UserId) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("UPDATE organization_members SET is_default = 0 WHERE user_id = ?")
        .bind(user_id.as_str())
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Set `is_default` on one membership. Returns false when the pair does not exist.
pub async fn set_default<'e, E>(
    executor: E,
    user_id: &UserId,
    organization_id: &OrganizationId,
    value: bool,
) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE organization_members SET is_default = ? WHERE user_id = ? AND organization_id = ?",
    )
    .bind(value)
    .bind(user_id.as_str())
    .bind(organization_id.as_str())
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Remove a user from an organization. Returns false when there was nothing to remove.
pub async fn delete<'e, E>(
    executor: E,
    user_id: &UserId,
    organization_id: &OrganizationId,
) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM organization_members WHERE user_id = ? AND organization_id = ?")
        .bind(user_id.as_str())
        .bind(organization_id.as_str())
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Remove a membership unless it is the organization's last ADMIN or
/// SUPERADMIN seat. The count and the delete run as one statement.
/// Returns false when nothing was removed.
pub async fn delete_unless_last_admin<'e, E>(
    executor: E,
    user_id: &UserId,
    organization_id: &OrganizationId,
) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        DELETE FROM organization_members
        WHERE user_id = ? AND organization_id = ?
          AND (
            role NOT IN ('ADMIN', 'SUPERADMIN')
            OR (
              SELECT COUNT(*) FROM organization_members
              WHERE organization_id = ? AND role IN ('ADMIN', 'SUPERADMIN')
            ) > 1
          )
        "#,
    )
    .bind(user_id.as_str())
    .bind(organization_id.as_str())
    .bind(organization_id.as_str())
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::db::{self, organizations::NewOrganization, NewUser};
    use crate::app::domain::{HashedPassword, Password, Username};
    use sqlx::SqlitePool;

    async fn pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    async fn seed(pool: &SqlitePool, username: &str) -> (UserId, OrganizationId) {
        let user_id = UserId::new();
        db::users::insert(
            pool,
            &NewUser {
                id: user_id.clone(),
                username: Username::new(username.to_string()).unwrap(),
                password_hash: HashedPassword::from_password(&Password::for_verification("x".into())).unwrap(),
                role: Role::User,
            },
        )
        .await
        .unwrap();
        let organization_id = OrganizationId::new();
        db::organizations::insert(
            pool,
            &NewOrganization {
                id: organization_id.clone(),
                name: "Riverside Fund".to_string(),
                host: None,
                subdomain: None,
            },
        )
        .await
        .unwrap();
        (user_id, organization_id)
    }

    #[tokio::test]
    async fn role_and_default_round_trip() {
        let pool = pool().await;
        let (user_id, org_id) = seed(&pool, "treasurer").await;
        insert(&pool, &org_id, &user_id, Role::Admin, true).await.unwrap();

        let membership = find(&pool, &user_id, &org_id).await.unwrap().unwrap();
        assert_eq!(membership.role(), Role::Admin);
        assert!(membership.is_default);
    }

    #[tokio::test]
    async fn set_default_reports_missing_pair() {
        let pool = pool().await;
        let (user_id, org_id) = seed(&pool, "treasurer").await;

        assert!(!set_default(&pool, &user_id, &org_id, true).await.unwrap());
        insert(&pool, &org_id, &user_id, Role::User, false).await.unwrap();
        assert!(set_default(&pool, &user_id, &org_id, true).await.unwrap());
        assert_eq!(clear_defaults(&pool, &user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_removes_only_that_membership() {
        let pool = pool().await;
        let (user_id, org_id) = seed(&pool, "treasurer").await;
        insert(&pool, &org_id, &user_id, Role::User, false).await.unwrap();

        assert!(delete(&pool, &user_id, &org_id).await.unwrap());
        assert!(!delete(&pool, &user_id, &org_id).await.unwrap());
        assert!(find(&pool, &user_id, &org_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn organization_listing_keeps_storage_order() {
        let pool = pool().await;
        let (admin, org_id) = seed(&pool, "clerk").await;
        let (member, _) = seed(&pool, "bookkeeper").await;
        insert(&pool, &org_id, &admin, Role::Admin, false).await.unwrap();
        insert(&pool, &org_id, &member, Role::User, false).await.unwrap();

        let everyone = list_for_organization(&pool, &org_id).await.unwrap();
        let usernames: Vec<_> = everyone.iter().map(|m| m.username.as_str()).collect();
        assert_eq!(usernames, ["clerk", "bookkeeper"]);
    }

    #[tokio::test]
    async fn last_admin_seat_survives_guarded_delete() {
        let pool = pool().await;
        let (admin, org_id) = seed(&pool, "clerk").await;
        let (owner, _) = seed(&pool, "owner").await;
        let (member, _) = seed(&pool, "bookkeeper").await;
        insert(&pool, &org_id, &admin, Role::Admin, false).await.unwrap();
        insert(&pool, &org_id, &owner, Role::Superadmin, false).await.unwrap();
        insert(&pool, &org_id, &member, Role::User, false).await.unwrap();

        // A per-org SUPERADMIN counts as an admin seat.
        assert!(delete_unless_last_admin(&pool, &admin, &org_id).await.unwrap());
        assert!(!delete_unless_last_admin(&pool, &owner, &org_id).await.unwrap());
        assert!(find(&pool, &owner, &org_id).await.unwrap().is_some());

        assert!(delete_unless_last_admin(&pool, &member, &org_id).await.unwrap());
        assert!(!delete_unless_last_admin(&pool, &member, &org_id).await.unwrap());
    }
}
