use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use timeclock_core::domain::session::Session;

use super::{RepositoryError, SessionRepository};
use crate::DbPool;

pub struct SqlSessionRepository {
    pool: DbPool,
}

impl SqlSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SessionRepository for SqlSessionRepository {
    async fn find(&self, messaging_id: &str) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query(
            "SELECT messaging_id, action, contents FROM chat_session WHERE messaging_id = ?",
        )
        .bind(messaging_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(session_from_row).transpose()
    }

    async fn save(&self, session: Session) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO chat_session (messaging_id, action, contents, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(messaging_id) DO UPDATE SET
                action = excluded.action,
                contents = excluded.contents,
                updated_at = excluded.updated_at",
        )
        .bind(&session.messaging_id)
        .bind(session.action.as_deref())
        .bind(session.contents.as_deref())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn session_from_row(row: SqliteRow) -> Result<Session, RepositoryError> {
    Ok(Session {
        messaging_id: row.try_get("messaging_id")?,
        action: row.try_get("action")?,
        contents: row.try_get("contents")?,
    })
}
