use chrono::NaiveDate;
use sqlx::{sqlite::SqliteRow, Row};

use timeclock_core::calendar;
use timeclock_core::domain::attendance::PunchType;
use timeclock_core::domain::user::{Role, User, UserId};

use super::{RepositoryError, UserRepository};
use crate::DbPool;

const USER_COLUMNS: &str = "id, messaging_id, name, role, manager_id, org_code";

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM app_user WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(user_from_row).transpose()
    }

    async fn find_by_messaging_id(
        &self,
        messaging_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {USER_COLUMNS} FROM app_user WHERE messaging_id = ?"))
                .bind(messaging_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(user_from_row).transpose()
    }

    async fn admin_members(&self, admin: &User) -> Result<Vec<User>, RepositoryError> {
        let rows = match &admin.org_code {
            Some(org_code) => {
                sqlx::query(&format!(
                    "SELECT {USER_COLUMNS}
                     FROM app_user
                     WHERE id <> ? AND org_code = ?
                     ORDER BY id ASC"
                ))
                .bind(admin.id.0)
                .bind(org_code)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {USER_COLUMNS} FROM app_user WHERE id <> ? ORDER BY id ASC"
                ))
                .bind(admin.id.0)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(user_from_row).collect()
    }

    async fn manager_members(&self, manager: &User) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS}
             FROM app_user
             WHERE manager_id = ? AND id <> ?
             ORDER BY id ASC"
        ))
        .bind(manager.id.0)
        .bind(manager.id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(user_from_row).collect()
    }

    async fn missing_punch(
        &self,
        day: NaiveDate,
        punch_type: PunchType,
    ) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS}
             FROM app_user u
             WHERE u.messaging_id IS NOT NULL
               AND NOT EXISTS (
                   SELECT 1 FROM attendance a
                   WHERE a.user_id = u.id
                     AND a.punch_type = ?
                     AND a.attendance_day = ?
                     AND a.punched_at IS NOT NULL
               )
             ORDER BY u.id ASC"
        ))
        .bind(punch_type.as_str())
        .bind(calendar::day_key(day))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(user_from_row).collect()
    }

    async fn save(&self, user: User) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO app_user (id, messaging_id, name, role, manager_id, org_code)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                messaging_id = excluded.messaging_id,
                name = excluded.name,
                role = excluded.role,
                manager_id = excluded.manager_id,
                org_code = excluded.org_code",
        )
        .bind(user.id.0)
        .bind(user.messaging_id.as_deref())
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.manager_id.map(|id| id.0))
        .bind(user.org_code.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn user_from_row(row: SqliteRow) -> Result<User, RepositoryError> {
    let role_raw = row.try_get::<String, _>("role")?;
    let role = role_raw
        .parse::<Role>()
        .map_err(|_| RepositoryError::Decode(format!("unknown role `{role_raw}`")))?;

    Ok(User {
        id: UserId(row.try_get("id")?),
        messaging_id: row.try_get("messaging_id")?,
        name: row.try_get("name")?,
        role,
        manager_id: row.try_get::<Option<i64>, _>("manager_id")?.map(UserId),
        org_code: row.try_get("org_code")?,
    })
}
