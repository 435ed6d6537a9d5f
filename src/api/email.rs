//! Password-reset email delivery through a transactional outbox.
//!
//! The recovery flow inserts an `email_outbox` row in the same transaction
//! that attaches the reset ticket, so a ticket without a queued email (or
//! the reverse) cannot exist. A background task drains the table: it locks a
//! batch with `FOR UPDATE SKIP LOCKED`, hands each row to an [`EmailSender`],
//! and marks the row `sent` or reschedules it with exponential backoff until
//! the attempt limit, after which it is marked `failed`.
//!
//! The default sender for local development is [`LogEmailSender`], which
//! logs the payload instead of delivering real mail. Production deployments
//! implement [`EmailSender`] against their SMTP relay or provider API.

use anyhow::{Context, Result};
use rand::Rng;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// One outbox row ready for delivery.
#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to_email: String,
    pub template: String,
    pub payload_json: String,
}

/// Delivery abstraction used by the outbox worker.
pub trait EmailSender: Send + Sync {
    /// Deliver a message, or return an error to schedule a retry.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Development sender: logs the reset email instead of delivering it.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            template = %message.template,
            payload = %message.payload_json,
            "email outbox send stub"
        );
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct EmailWorkerConfig {
    poll_interval: Duration,
    batch_size: usize,
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl EmailWorkerConfig {
    /// Defaults: 5s poll, 10 rows per batch, 5 attempts, 5s..5m backoff.
    #[must_use]
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 10,
            max_attempts: 5,
            backoff_base: Duration::from_secs(5),
            backoff_max: Duration::from_secs(300),
        }
    }

    #[must_use]
    pub fn with_poll_interval_seconds(mut self, seconds: u64) -> Self {
        self.poll_interval = Duration::from_secs(seconds.max(1));
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_backoff_seconds(mut self, base: u64, max: u64) -> Self {
        self.backoff_base = Duration::from_secs(base.max(1));
        self.backoff_max = Duration::from_secs(max.max(base.max(1)));
        self
    }
}

impl Default for EmailWorkerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the background task that drains the outbox.
pub fn spawn_outbox_worker(
    pool: PgPool,
    sender: Arc<dyn EmailSender>,
    config: EmailWorkerConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(err) = drain_batch(&pool, sender.as_ref(), &config).await {
                error!("email outbox batch failed: {err:#}");
            }
            sleep(config.poll_interval).await;
        }
    })
}

async fn drain_batch(
    pool: &PgPool,
    sender: &dyn EmailSender,
    config: &EmailWorkerConfig,
) -> Result<usize> {
    let mut tx = pool
        .begin()
        .await
        .context("failed to start email outbox transaction")?;

    // SKIP LOCKED lets several workers drain concurrently without ever
    // delivering the same row twice.
    let query = r"
        SELECT id, to_email, template, payload_json::text AS payload_json, attempts
        FROM email_outbox
        WHERE status = 'pending'
          AND next_attempt_at <= NOW()
        ORDER BY next_attempt_at ASC, created_at ASC
        LIMIT $1
        FOR UPDATE SKIP LOCKED
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(i64::try_from(config.batch_size).unwrap_or(1))
        .fetch_all(&mut *tx)
        .instrument(span)
        .await
        .context("failed to load email outbox batch")?;

    let row_count = rows.len();
    for row in rows {
        let id: Uuid = row.get("id");
        let attempts: i32 = row.get("attempts");
        let attempt = u32::try_from(attempts).unwrap_or(0).saturating_add(1);
        let message = EmailMessage {
            to_email: row.get("to_email"),
            template: row.get("template"),
            payload_json: row.get("payload_json"),
        };

        match sender.send(&message) {
            Ok(()) => mark_sent(&mut tx, id, attempt).await?,
            Err(err) if attempt >= config.max_attempts => {
                mark_failed(&mut tx, id, attempt, &err.to_string()).await?;
            }
            Err(err) => {
                let delay = backoff_delay(attempt, config.backoff_base, config.backoff_max);
                reschedule(&mut tx, id, attempt, &err.to_string(), delay).await?;
            }
        }
    }

    tx.commit()
        .await
        .context("failed to commit email outbox batch")?;

    Ok(row_count)
}

async fn mark_sent(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    attempt: u32,
) -> Result<()> {
    let query = r"
        UPDATE email_outbox
        SET status = 'sent',
            attempts = $2,
            last_error = NULL,
            sent_at = NOW()
        WHERE id = $1
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .bind(i32::try_from(attempt).unwrap_or(i32::MAX))
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to mark outbox row sent")?;
    Ok(())
}

async fn mark_failed(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    attempt: u32,
    last_error: &str,
) -> Result<()> {
    let query = r"
        UPDATE email_outbox
        SET status = 'failed',
            attempts = $2,
            last_error = $3
        WHERE id = $1
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .bind(i32::try_from(attempt).unwrap_or(i32::MAX))
        .bind(last_error)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to mark outbox row failed")?;
    Ok(())
}

async fn reschedule(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    attempt: u32,
    last_error: &str,
    delay: Duration,
) -> Result<()> {
    let query = r"
        UPDATE email_outbox
        SET attempts = $2,
            last_error = $3,
            next_attempt_at = NOW() + ($4 * INTERVAL '1 millisecond')
        WHERE id = $1
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .bind(i32::try_from(attempt).unwrap_or(i32::MAX))
        .bind(last_error)
        .bind(i64::try_from(delay.as_millis()).unwrap_or(i64::MAX))
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to reschedule outbox row")?;
    Ok(())
}

/// Exponential backoff with half-window jitter, capped at `max`.
fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let shift = attempt.saturating_sub(1).min(31);
    let factor = 1u32 << shift;
    let capped = base.checked_mul(factor).unwrap_or(max).min(max);
    let capped_ms = u64::try_from(capped.as_millis()).unwrap_or(u64::MAX);
    if capped_ms < 2 {
        return capped;
    }
    let half = capped_ms / 2;
    let jitter = rand::thread_rng().gen_range(0..=half);
    Duration::from_millis(half + jitter)
}
