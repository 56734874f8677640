use std::env;

use async_trait::async_trait;
use rand::prelude::{IndexedRandom, SliceRandom};
use sqlx::SqlitePool;

use crate::app::db::{self, organizations::NewOrganization, NewUser};
use crate::app::domain::{HashedPassword, OrganizationId, Password, Role, UserId, Username};
use crate::seeds::{Seed, SeedOutcome};

const LETTERS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const DIGITS: &[u8] = b"23456789";

fn random_password() -> String {
    let mut rng = rand::rng();
    let mut chars: Vec<char> = Vec::with_capacity(16);
    chars.extend(LETTERS.choose_multiple(&mut rng, 12).map(|&b| b as char));
    chars.extend(DIGITS.choose_multiple(&mut rng, 4).map(|&b| b as char));
    chars.shuffle(&mut rng);
    chars.into_iter().collect()
}

/// Superadmin for local development, member (ADMIN, default) of "Admin Org".
/// Runs only when SEED_SUPERADMIN_USERNAME is set.
pub struct DevSuperadmin;

#[async_trait]
impl Seed for DevSuperadmin {
    fn version(&self) -> i64 {
        20260301120000
    }

    fn description(&self) -> &str {
        "dev_superadmin"
    }

    async fn run(&self, pool: &SqlitePool) -> Result<SeedOutcome, sqlx::Error> {
        let username = match env::var("SEED_SUPERADMIN_USERNAME") {
            Ok(raw) if !raw.trim().is_empty() => match Username::new(raw) {
                Ok(username) => username,
                Err(_) => return Ok(SeedOutcome::Skipped),
            },
            _ => return Ok(SeedOutcome::Skipped),
        };
        if db::users::find_by_username(pool, &username).await?.is_some() {
            return Ok(SeedOutcome::Applied);
        }

        let Ok(password) = Password::new(random_password()) else {
            return Ok(SeedOutcome::Skipped);
        };
        let password_hash = HashedPassword::from_password(&password)
            .map_err(|e| sqlx::Error::Protocol(format!("password hashing failed: {}", e)))?;

        let mut tx = pool.begin().await?;

        let organization_id = OrganizationId::new();
        db::organizations::insert(
            &mut *tx,
            &NewOrganization {
                id: organization_id.clone(),
                name: "Admin Org".to_string(),
                host: None,
                subdomain: None,
            },
        )
        .await?;

        let user_id = UserId::new();
        db::users::insert(
            &mut *tx,
            &NewUser {
                id: user_id.clone(),
                username: username.clone(),
                password_hash,
                role: Role::Superadmin,
            },
        )
        .await?;

        db::memberships::insert(&mut *tx, &organization_id, &user_id, Role::Admin, true).await?;
        tx.commit().await?;

        eprintln!(
            "Created superadmin: {} / {}",
            username.as_str(),
            std::str::from_utf8(password.as_bytes()).unwrap_or("<utf8?>")
        );
        Ok(SeedOutcome::Applied)
    }
}
