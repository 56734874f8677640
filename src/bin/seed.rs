use dotenvy::dotenv;
use fundbook::app;
use fundbook::seeds;
use sqlx::sqlite::SqlitePoolOptions;
use std::env;
use std::time::Duration;

#[tokio::main]
async fn main() {
    dotenv().ok();

    let config = app::config::Config::from_env().unwrap_or_else(|e| {
        eprintln!("Failed to load config: {}", e);
        std::process::exit(1);
    });

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::query("PRAGMA journal_mode=WAL")
        .execute(&pool)
        .await
        .expect("Failed to set WAL mode");

    sqlx::query("PRAGMA busy_timeout=5000")
        .execute(&pool)
        .await
        .expect("Failed to set busy timeout");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    seeds::ensure_seeds_table(&pool)
        .await
        .expect("Failed to create _fundbook_seeds table");

    let force_all = env::args().any(|a| a == "--force-all");
    let applied = seeds::applied_versions(&pool)
        .await
        .expect("Failed to query applied seeds");

    for seed in seeds::all_seeds() {
        let version = seed.version();
        let description = seed.description();

        if applied.contains(&version) {
            if !force_all {
                eprintln!("Skipping {} (already applied)", description);
                continue;
            }
            sqlx::query("DELETE FROM _fundbook_seeds WHERE version = ?")
                .bind(version)
                .execute(&pool)
                .await
                .expect("Failed to remove seed from tracking for re-run");
        }

        eprintln!("Running {}...", description);
        match seed.run(&pool).await {
            Ok(seeds::SeedOutcome::Applied) => {
                seeds::record_seed(&pool, version, description)
                    .await
                    .expect("Failed to record seed success");
                eprintln!("Done {}", description);
            }
            Ok(seeds::SeedOutcome::Skipped) => {
                eprintln!("Skipped {} (SEED_SUPERADMIN_USERNAME unset or invalid)", description);
            }
            Err(e) => {
                eprintln!("Seed {} failed: {}", description, e);
                std::process::exit(1);
            }
        }
    }
}
