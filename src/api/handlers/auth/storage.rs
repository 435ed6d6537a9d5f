//! Database helpers for accounts and reset-ticket state.
//!
//! Every mutation that touches more than one row runs in a single
//! transaction so readers never observe a half-updated ticket, and ticket
//! consumption is one atomic UPDATE so exactly one concurrent consumer can
//! win.

use anyhow::{anyhow, Context, Result};
use serde_json::json;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::identity::Role;
use super::state::AuthConfig;
use super::utils::build_reset_url;

/// One account row, as the auth core sees it.
#[derive(Debug, Clone)]
pub(crate) struct UserRecord {
    pub(crate) id: i64,
    pub(crate) email: String,
    pub(crate) username: String,
    pub(crate) password_hash: String,
    pub(crate) role: Role,
    pub(crate) active: bool,
    pub(crate) unique_id: Option<Uuid>,
    pub(crate) full_name: Option<String>,
    pub(crate) phone_number: Option<String>,
}

/// Outcome when creating a new owner account.
#[derive(Debug)]
pub(super) enum CreateOutcome {
    Created(UserRecord),
    Conflict(&'static str),
}

/// Outcome for a partial profile update.
#[derive(Debug)]
pub(super) enum UpdateOutcome {
    Updated(UserRecord),
    NotFound,
    Conflict(&'static str),
}

const USER_COLUMNS: &str =
    "id, email, username, password_hash, role, active, unique_id, full_name, phone_number";

fn user_from_row(row: &PgRow) -> Result<UserRecord> {
    let role: String = row.get("role");
    let role = Role::from_name(&role).ok_or_else(|| anyhow!("unknown role in users row: {role}"))?;
    Ok(UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        role,
        active: row.get("active"),
        unique_id: row.get("unique_id"),
        full_name: row.get("full_name"),
        phone_number: row.get("phone_number"),
    })
}

fn unique_violation_message(err: &sqlx::Error) -> Option<&'static str> {
    if let sqlx::Error::Database(db_err) = err {
        if db_err.code().is_some_and(|code| code.as_ref() == "23505") {
            return Some(match db_err.constraint() {
                Some("users_email_key") => "Email is already registered",
                Some("users_username_key") => "Username is already registered",
                _ => "Email or username already exists",
            });
        }
    }
    None
}

pub(crate) async fn lookup_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(username)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by username")?;

    row.as_ref().map(user_from_row).transpose()
}

pub(super) async fn lookup_by_id(pool: &PgPool, id: i64) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    row.as_ref().map(user_from_row).transpose()
}

/// One page of owner accounts plus the total owner count, newest first.
pub(super) async fn list_owners(
    pool: &PgPool,
    page: i64,
    size: i64,
) -> Result<(Vec<UserRecord>, i64)> {
    let query = format!(
        "SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY id DESC LIMIT $2 OFFSET $3"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .bind(Role::Owner.as_str())
        .bind(size)
        .bind(page.saturating_mul(size))
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list owner accounts")?;

    let owners = rows
        .iter()
        .map(user_from_row)
        .collect::<Result<Vec<_>>>()?;

    let query = "SELECT COUNT(*) AS total FROM users WHERE role = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let total: i64 = sqlx::query(query)
        .bind(Role::Owner.as_str())
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to count owner accounts")?
        .get("total");

    Ok((owners, total))
}

pub(super) struct NewOwner {
    pub(super) email: String,
    pub(super) username: String,
    pub(super) password_hash: String,
    pub(super) full_name: Option<String>,
    pub(super) phone_number: Option<String>,
}

pub(super) async fn insert_owner(pool: &PgPool, owner: NewOwner) -> Result<CreateOutcome> {
    let query = format!(
        r"
        INSERT INTO users
            (email, username, password_hash, role, active, unique_id, full_name, phone_number)
        VALUES ($1, $2, $3, $4, TRUE, $5, $6, $7)
        RETURNING {USER_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(&owner.email)
        .bind(&owner.username)
        .bind(&owner.password_hash)
        .bind(Role::Owner.as_str())
        .bind(Uuid::new_v4())
        .bind(&owner.full_name)
        .bind(&owner.phone_number)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(CreateOutcome::Created(user_from_row(&row)?)),
        Err(err) => match unique_violation_message(&err) {
            Some(message) => Ok(CreateOutcome::Conflict(message)),
            None => Err(err).context("failed to insert owner account"),
        },
    }
}

pub(super) struct ProfileUpdate {
    pub(super) email: Option<String>,
    pub(super) username: Option<String>,
    pub(super) full_name: Option<String>,
    pub(super) phone_number: Option<String>,
    pub(super) active: Option<bool>,
}

/// Partial profile update; absent fields keep their current values.
pub(super) async fn update_profile(
    pool: &PgPool,
    id: i64,
    update: ProfileUpdate,
) -> Result<UpdateOutcome> {
    let query = format!(
        r"
        UPDATE users
        SET email = COALESCE($2, email),
            username = COALESCE($3, username),
            full_name = COALESCE($4, full_name),
            phone_number = COALESCE($5, phone_number),
            active = COALESCE($6, active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .bind(&update.email)
        .bind(&update.username)
        .bind(&update.full_name)
        .bind(&update.phone_number)
        .bind(update.active)
        .fetch_optional(pool)
        .instrument(span)
        .await;

    match row {
        Ok(Some(row)) => Ok(UpdateOutcome::Updated(user_from_row(&row)?)),
        Ok(None) => Ok(UpdateOutcome::NotFound),
        Err(err) => match unique_violation_message(&err) {
            Some(message) => Ok(UpdateOutcome::Conflict(message)),
            None => Err(err).context("failed to update account profile"),
        },
    }
}

pub(super) async fn delete_user(pool: &PgPool, id: i64) -> Result<bool> {
    let query = "DELETE FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete account")?;
    Ok(result.rows_affected() > 0)
}

pub(super) async fn set_password(pool: &PgPool, id: i64, password_hash: &str) -> Result<bool> {
    let query = r"
        UPDATE users
        SET password_hash = $2,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to set account password")?;
    Ok(result.rows_affected() > 0)
}

/// Attach a fresh reset ticket to the account with this email and enqueue
/// the reset email in the same transaction.
///
/// Overwrites any outstanding ticket (only the most recent one is valid).
/// Returns `false` when no account carries the email; the caller answers
/// identically either way.
pub(super) async fn issue_reset_ticket(
    pool: &PgPool,
    email: &str,
    token: &str,
    config: &AuthConfig,
) -> Result<bool> {
    let mut tx = pool.begin().await.context("begin reset-ticket transaction")?;

    let query = r"
        UPDATE users
        SET reset_token = $2,
            reset_token_expiry = NOW() + ($3 * INTERVAL '1 second'),
            updated_at = NOW()
        WHERE email = $1
        RETURNING email, username, full_name
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(token)
        .bind(config.reset_token_ttl_seconds())
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to attach reset ticket")?;

    let Some(row) = row else {
        tx.commit().await.context("commit reset-ticket noop")?;
        return Ok(false);
    };

    let full_name: Option<String> = row.get("full_name");
    let username: String = row.get("username");
    let reset_url = build_reset_url(config.frontend_base_url(), token);
    let payload_json = json!({
        "email": email,
        "name": full_name.unwrap_or(username),
        "reset_url": reset_url,
    });
    let payload_text =
        serde_json::to_string(&payload_json).context("failed to serialize email payload")?;

    let query = r"
        INSERT INTO email_outbox (to_email, template, payload_json)
        VALUES ($1, $2, $3::jsonb)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind("password_reset")
        .bind(payload_text)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert email outbox row")?;

    tx.commit().await.context("commit reset-ticket transaction")?;

    Ok(true)
}

/// Consume a reset ticket and rotate the password in one atomic statement.
///
/// The `reset_token_expiry > NOW()` predicate makes expiry and consumption a
/// single read-then-write on the row: of two concurrent consumers, exactly
/// one observes the non-null token and wins.
pub(super) async fn consume_reset_ticket(
    pool: &PgPool,
    token: &str,
    password_hash: &str,
) -> Result<bool> {
    let query = r"
        UPDATE users
        SET password_hash = $2,
            reset_token = NULL,
            reset_token_expiry = NULL,
            updated_at = NOW()
        WHERE reset_token = $1
          AND reset_token_expiry > NOW()
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token)
        .bind(password_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to consume reset ticket")?;

    Ok(row.is_some())
}

/// Read-only check that a ticket exists and has not expired. Does not
/// consume it.
pub(super) async fn reset_ticket_valid(pool: &PgPool, token: &str) -> Result<bool> {
    let query = r"
        SELECT 1 AS one
        FROM users
        WHERE reset_token = $1
          AND reset_token_expiry > NOW()
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to validate reset ticket")?;
    Ok(row.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_outcome_debug_names() {
        let record = UserRecord {
            id: 1,
            email: "owner@fleet.example".to_string(),
            username: "skipper".to_string(),
            password_hash: "hash".to_string(),
            role: Role::Owner,
            active: true,
            unique_id: None,
            full_name: None,
            phone_number: None,
        };
        assert!(format!("{:?}", CreateOutcome::Created(record)).starts_with("Created"));
        assert_eq!(
            format!("{:?}", CreateOutcome::Conflict("Email is already registered")),
            "Conflict(\"Email is already registered\")"
        );
    }

    #[test]
    fn update_outcome_debug_names() {
        assert_eq!(format!("{:?}", UpdateOutcome::NotFound), "NotFound");
        assert!(
            format!("{:?}", UpdateOutcome::Conflict("Username is already registered"))
                .starts_with("Conflict")
        );
    }

    #[test]
    fn user_columns_never_include_reset_fields() {
        // The shared projection feeds every externally visible record.
        assert!(!USER_COLUMNS.contains("reset_token"));
        assert!(USER_COLUMNS.contains("password_hash"));
    }
}
