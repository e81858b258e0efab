use chrono::NaiveDate;
use sqlx::{sqlite::SqliteRow, Row};

use timeclock_core::calendar::{self, YearMonth};
use timeclock_core::domain::attendance::{PunchRecord, PunchType};
use timeclock_core::domain::user::UserId;

use super::{format_timestamp, parse_timestamp, AttendanceRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAttendanceRepository {
    pool: DbPool,
}

impl SqlAttendanceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AttendanceRepository for SqlAttendanceRepository {
    async fn find(
        &self,
        user_id: UserId,
        punch_type: PunchType,
        day: NaiveDate,
    ) -> Result<Option<PunchRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id, punch_type, attendance_day, punched_at, edited
             FROM attendance
             WHERE user_id = ? AND punch_type = ? AND attendance_day = ?",
        )
        .bind(user_id.0)
        .bind(punch_type.as_str())
        .bind(calendar::day_key(day))
        .fetch_optional(&self.pool)
        .await?;

        row.map(record_from_row).transpose()
    }

    async fn save(&self, record: PunchRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO attendance (user_id, punch_type, attendance_day, punched_at, edited)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(user_id, punch_type, attendance_day) DO UPDATE SET
                punched_at = excluded.punched_at,
                edited = excluded.edited",
        )
        .bind(record.user_id.0)
        .bind(record.punch_type.as_str())
        .bind(calendar::day_key(record.day))
        .bind(record.punched_at.map(format_timestamp))
        .bind(record.edited)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_month(
        &self,
        user_id: UserId,
        month: YearMonth,
    ) -> Result<Vec<PunchRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT user_id, punch_type, attendance_day, punched_at, edited
             FROM attendance
             WHERE user_id = ? AND substr(attendance_day, 1, 6) = ?
             ORDER BY attendance_day ASC, punch_type ASC",
        )
        .bind(user_id.0)
        .bind(month.key())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(record_from_row).collect()
    }

    async fn list_month_all(&self, month: YearMonth) -> Result<Vec<PunchRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT user_id, punch_type, attendance_day, punched_at, edited
             FROM attendance
             WHERE substr(attendance_day, 1, 6) = ?
             ORDER BY user_id ASC, attendance_day ASC, punch_type ASC",
        )
        .bind(month.key())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(record_from_row).collect()
    }
}

fn record_from_row(row: SqliteRow) -> Result<PunchRecord, RepositoryError> {
    let punch_type_raw = row.try_get::<String, _>("punch_type")?;
    let punch_type = punch_type_raw
        .parse::<PunchType>()
        .map_err(|_| RepositoryError::Decode(format!("unknown punch type `{punch_type_raw}`")))?;

    let day_raw = row.try_get::<String, _>("attendance_day")?;
    let day = calendar::parse_day_key(&day_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("invalid attendance day `{day_raw}`")))?;

    let punched_at = row
        .try_get::<Option<String>, _>("punched_at")?
        .map(|value| parse_timestamp("punched_at", &value))
        .transpose()?;

    Ok(PunchRecord {
        user_id: UserId(row.try_get("user_id")?),
        punch_type,
        day,
        punched_at,
        edited: row.try_get("edited")?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use timeclock_core::calendar::YearMonth;
    use timeclock_core::domain::attendance::{PunchRecord, PunchType};
    use timeclock_core::domain::user::{Role, User, UserId};

    use super::SqlAttendanceRepository;
    use crate::migrations;
    use crate::repositories::{AttendanceRepository, SqlUserRepository, UserRepository};
    use crate::{connect_with_settings, DbPool};

    #[tokio::test]
    async fn save_upserts_a_single_record_per_key() {
        let pool = setup_pool(&[1]).await;
        let repo = SqlAttendanceRepository::new(pool.clone());
        let day = date(2024, 6, 15);

        let mut record = PunchRecord::empty(UserId(1), PunchType::Arrival, day);
        record.punched_at = day.and_hms_opt(9, 12, 0);
        repo.save(record.clone()).await.expect("save first punch");

        record.punched_at = day.and_hms_opt(9, 5, 0);
        record.edited = true;
        repo.save(record.clone()).await.expect("save correction");

        let found = repo.find(UserId(1), PunchType::Arrival, day).await.expect("find");
        assert_eq!(found, Some(record));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance")
            .fetch_one(&pool)
            .await
            .expect("count rows");
        assert_eq!(count, 1);

        pool.close().await;
    }

    #[tokio::test]
    async fn list_month_filters_by_user_and_month_in_day_order() {
        let pool = setup_pool(&[1, 2]).await;
        let repo = SqlAttendanceRepository::new(pool.clone());

        for (user, day, punch_type) in [
            (1, date(2024, 6, 20), PunchType::Departure),
            (1, date(2024, 6, 3), PunchType::Departure),
            (1, date(2024, 6, 3), PunchType::Arrival),
            (1, date(2024, 7, 1), PunchType::Arrival),
            (2, date(2024, 6, 3), PunchType::Arrival),
        ] {
            let mut record = PunchRecord::empty(UserId(user), punch_type, day);
            record.punched_at = day.and_hms_opt(9, 0, 0);
            repo.save(record).await.expect("save record");
        }

        let june = YearMonth::new(2024, 6).expect("month");
        let mine = repo.list_month(UserId(1), june).await.expect("list month");
        let keys: Vec<(NaiveDate, PunchType)> =
            mine.iter().map(|record| (record.day, record.punch_type)).collect();
        assert_eq!(
            keys,
            vec![
                (date(2024, 6, 3), PunchType::Arrival),
                (date(2024, 6, 3), PunchType::Departure),
                (date(2024, 6, 20), PunchType::Departure),
            ]
        );

        let everyone = repo.list_month_all(june).await.expect("list month for all");
        assert_eq!(everyone.len(), 4);
        assert_eq!(everyone.last().map(|record| record.user_id), Some(UserId(2)));

        pool.close().await;
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let pool = setup_pool(&[1]).await;
        let repo = SqlAttendanceRepository::new(pool.clone());

        let found =
            repo.find(UserId(1), PunchType::Departure, date(2024, 6, 15)).await.expect("find");
        assert_eq!(found, None);

        pool.close().await;
    }

    async fn setup_pool(user_ids: &[i64]) -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");

        let users = SqlUserRepository::new(pool.clone());
        for id in user_ids {
            users
                .save(User {
                    id: UserId(*id),
                    messaging_id: Some(format!("U-{id}")),
                    name: format!("User {id}"),
                    role: Role::Employee,
                    manager_id: None,
                    org_code: None,
                })
                .await
                .expect("seed user");
        }
        pool
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }
}
