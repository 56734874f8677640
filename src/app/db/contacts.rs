use sqlx::{FromRow, SqliteExecutor};
use time::OffsetDateTime;

use crate::app::domain::{Email, UserId};

/// Database row for contacts table. Every user owns at most one contact.
#[derive(Debug, Clone, FromRow)]
pub struct Contact {
    pub id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

impl Contact {
    /// "First Last", or whatever part is present.
    pub fn display_name(&self) -> Option<String> {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }
}

pub struct NewContact {
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<Email>,
}

pub async fn find_by_user<'e, E>(executor: E, user_id: &UserId) -> Result<Option<Contact>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Contact>(
        "SELECT id, user_id, first_name, last_name, email FROM contacts WHERE user_id = ?",
    )
    .bind(user_id.as_str())
    .fetch_optional(executor)
    .await
}

pub async fn insert<'e, E>(executor: E, contact: &NewContact) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query(
        "INSERT INTO contacts (id, user_id, first_name, last_name, email, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(ulid::Ulid::new().to_string())
    .bind(contact.user_id.as_str())
    .bind(&contact.first_name)
    .bind(&contact.last_name)
    .bind(contact.email.as_ref().map(|e| e.as_str()))
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(first: &str, last: &str) -> Contact {
        Contact {
            id: "c".into(),
            user_id: "u".into(),
            first_name: first.into(),
            last_name: last.into(),
            email: None,
        }
    }

    #[test]
    fn display_name_joins_parts() {
        assert_eq!(contact("Ada", "Lovelace").display_name().as_deref(), Some("Ada Lovelace"));
        assert_eq!(contact("", "Lovelace").display_name().as_deref(), Some("Lovelace"));
    }

    #[test]
    fn display_name_empty_when_blank() {
        assert_eq!(contact(" ", "").display_name(), None);
    }
}
