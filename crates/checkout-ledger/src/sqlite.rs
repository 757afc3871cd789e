//! SQLite-backed fulfillment ledger.
//!
//! One row per fulfilled session. The primary key on `session_id` is the
//! claim: `INSERT OR IGNORE` inside a transaction either creates the row
//! (this caller won) or changes nothing (someone else already did). The
//! fulfiller runs inside the winning transaction, so a failed side effect
//! rolls the row back and a later observation can try again.

use async_trait::async_trait;
use checkout_core::{
    CheckoutError, CheckoutResult, Fulfiller, FulfillmentLedger, FulfillmentOutcome,
    FulfillmentRecord, PaymentStatus, SessionStatus,
};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS fulfillments (
    session_id        TEXT PRIMARY KEY NOT NULL,
    business_order_id TEXT NOT NULL,
    fulfilled_at      TEXT NOT NULL
)";

fn unavailable(e: sqlx::Error) -> CheckoutError {
    CheckoutError::LedgerUnavailable(e.to_string())
}

/// Durable ledger in a single SQLite file
pub struct SqliteLedger {
    pool: Pool<Sqlite>,
    fulfiller: Arc<dyn Fulfiller>,
}

impl SqliteLedger {
    /// Open (or create) the ledger file and ensure the schema exists.
    pub async fn open(
        path: impl AsRef<Path>,
        fulfiller: Arc<dyn Fulfiller>,
    ) -> CheckoutResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CheckoutError::LedgerUnavailable(format!(
                    "Cannot create ledger directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(unavailable)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            // A record must survive power loss once the claim is reported.
            .synchronous(sqlx::sqlite::SqliteSynchronous::Full)
            .busy_timeout(Duration::from_secs(5));

        // Writers serialize on the single connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .map_err(unavailable)?;

        sqlx::query(SCHEMA_SQL)
            .execute(&pool)
            .await
            .map_err(unavailable)?;

        info!("Fulfillment ledger opened at {}", path.display());

        Ok(Self { pool, fulfiller })
    }

    /// Number of fulfilled sessions
    pub async fn fulfilled_count(&self) -> CheckoutResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM fulfillments")
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)
    }

    /// Close the pool, flushing the WAL.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn record_from_row(row: &SqliteRow) -> CheckoutResult<FulfillmentRecord> {
        let fulfilled_at: DateTime<Utc> = row.try_get("fulfilled_at").map_err(unavailable)?;
        Ok(FulfillmentRecord {
            session_id: row.try_get("session_id").map_err(unavailable)?,
            business_order_id: row.try_get("business_order_id").map_err(unavailable)?,
            fulfilled_at,
        })
    }
}

#[async_trait]
impl FulfillmentLedger for SqliteLedger {
    #[instrument(skip(self, observed), fields(session_id = %observed.session_id, status = %observed.payment_status))]
    async fn claim_and_fulfill(
        &self,
        observed: &SessionStatus,
    ) -> CheckoutResult<FulfillmentOutcome> {
        if observed.payment_status != PaymentStatus::Paid {
            debug!("Session not paid, nothing to fulfill");
            return Ok(FulfillmentOutcome::NotPaid {
                status: observed.payment_status.clone(),
            });
        }

        let record = FulfillmentRecord::for_session(observed);

        // Write lock up front; other processes wait on the busy timeout.
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(unavailable)?;

        let claimed = sqlx::query(
            "INSERT OR IGNORE INTO fulfillments (session_id, business_order_id, fulfilled_at)
             VALUES (?, ?, ?)",
        )
        .bind(&record.session_id)
        .bind(&record.business_order_id)
        .bind(record.fulfilled_at)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?
        .rows_affected()
            == 1;

        if !claimed {
            let row = sqlx::query(
                "SELECT session_id, business_order_id, fulfilled_at
                 FROM fulfillments WHERE session_id = ?",
            )
            .bind(&record.session_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(unavailable)?;
            let existing = Self::record_from_row(&row)?;
            tx.commit().await.map_err(unavailable)?;

            debug!("Session already fulfilled at {}", existing.fulfilled_at);
            return Ok(FulfillmentOutcome::AlreadyFulfilled { record: existing });
        }

        // Dropping `tx` on error rolls the claim back.
        if let Err(e) = self.fulfiller.fulfill(&record, observed).await {
            warn!("Fulfillment failed, releasing claim: {}", e);
            return Err(match e {
                CheckoutError::FulfillmentFailed { .. } => e,
                other => CheckoutError::FulfillmentFailed {
                    session_id: record.session_id.clone(),
                    message: other.to_string(),
                },
            });
        }

        tx.commit().await.map_err(unavailable)?;

        info!(order_id = %record.business_order_id, "Session fulfilled");
        Ok(FulfillmentOutcome::NewlyFulfilled { record })
    }

    async fn get(&self, session_id: &str) -> CheckoutResult<Option<FulfillmentRecord>> {
        let row = sqlx::query(
            "SELECT session_id, business_order_id, fulfilled_at
             FROM fulfillments WHERE session_id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.as_ref().map(Self::record_from_row).transpose()
    }

    async fn health_check(&self) -> CheckoutResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}
