use chrono::{NaiveDate, NaiveDateTime, Utc};

use super::{format_timestamp, AlertDispatchRepository, RepositoryError};
use crate::DbPool;

/// Dispatch ledger shared by every process using the same database.
pub struct SqlAlertDispatchRepository {
    pool: DbPool,
}

impl SqlAlertDispatchRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AlertDispatchRepository for SqlAlertDispatchRepository {
    async fn claim(&self, alert_at: NaiveDateTime) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO alert_dispatch (alert_at, dispatched_at)
             VALUES (?, ?)
             ON CONFLICT(alert_at) DO NOTHING",
        )
        .bind(format_timestamp(alert_at))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn prune_before(&self, day: NaiveDate) -> Result<u64, RepositoryError> {
        let cutoff = day.and_time(chrono::NaiveTime::MIN);
        let result = sqlx::query("DELETE FROM alert_dispatch WHERE alert_at < ?")
            .bind(format_timestamp(cutoff))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
