//! First-run data bootstrap.
//!
//! Mirrors the administrative seed of the original deployment: when the
//! credential store is empty, the two administrator accounts are created so
//! the fleet back end is reachable after a fresh install. Runs once at
//! startup and is a no-op on any non-empty database.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::api::handlers::auth::{hash_password, Role};

struct SeedAdmin {
    email: &'static str,
    username: &'static str,
    password: &'static str,
    full_name: &'static str,
    phone_number: &'static str,
}

const SEED_ADMINS: &[SeedAdmin] = &[
    SeedAdmin {
        email: "admin@flotilla.dev",
        username: "javier",
        password: "admin123",
        full_name: "Javier Albarracin",
        phone_number: "+57 300 123 4567",
    },
    SeedAdmin {
        email: "admin2@flotilla.dev",
        username: "maria",
        password: "admin123",
        full_name: "Maria Antonieta",
        phone_number: "+57 301 234 5678",
    },
];

/// Seed the administrator accounts when the user table is empty.
///
/// # Errors
///
/// Returns an error if counting or inserting fails; partial seeding is
/// prevented by running all inserts in one transaction.
pub async fn seed_admin_accounts(pool: &PgPool) -> Result<()> {
    let query = "SELECT COUNT(*) AS total FROM users";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let total: i64 = sqlx::query(query)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to count users")?
        .get("total");

    if total > 0 {
        return Ok(());
    }

    let mut tx = pool.begin().await.context("begin seed transaction")?;

    for admin in SEED_ADMINS {
        let password_hash = hash_password(admin.password)?;
        let query = r"
            INSERT INTO users
                (email, username, password_hash, role, active, unique_id, full_name, phone_number)
            VALUES ($1, $2, $3, $4, TRUE, $5, $6, $7)
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(admin.email)
            .bind(admin.username)
            .bind(&password_hash)
            .bind(Role::Admin.as_str())
            .bind(Uuid::new_v4())
            .bind(admin.full_name)
            .bind(admin.phone_number)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .with_context(|| format!("failed to seed admin {}", admin.username))?;
    }

    tx.commit().await.context("commit seed transaction")?;

    info!("Seeded {} administrator accounts", SEED_ADMINS.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_accounts_are_admins_with_distinct_identities() {
        assert_eq!(SEED_ADMINS.len(), 2);
        let mut usernames: Vec<&str> = SEED_ADMINS.iter().map(|admin| admin.username).collect();
        usernames.sort_unstable();
        usernames.dedup();
        assert_eq!(usernames.len(), SEED_ADMINS.len());
        assert!(SEED_ADMINS.iter().any(|admin| admin.username == "javier"));
    }
}
