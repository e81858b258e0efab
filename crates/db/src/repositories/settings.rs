use chrono::NaiveTime;
use sqlx::{sqlite::SqliteRow, Row};

use timeclock_core::domain::settings::{
    decode_business_days, encode_business_days, AttendanceSettings, ClockThreshold,
};

use super::{RepositoryError, SettingsRepository};
use crate::DbPool;

pub struct SqlSettingsRepository {
    pool: DbPool,
}

impl SqlSettingsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SettingsRepository for SqlSettingsRepository {
    async fn get(&self) -> Result<AttendanceSettings, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                alert_enabled,
                arrival_alert_time,
                arrival_alert_leeway,
                departure_alert_time,
                departure_alert_leeway,
                open_time,
                open_leeway,
                close_time,
                close_leeway,
                business_days
             FROM attendance_settings
             WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => settings_from_row(row),
            None => Ok(AttendanceSettings::default()),
        }
    }

    async fn save(&self, settings: AttendanceSettings) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO attendance_settings (
                id,
                alert_enabled,
                arrival_alert_time,
                arrival_alert_leeway,
                departure_alert_time,
                departure_alert_leeway,
                open_time,
                open_leeway,
                close_time,
                close_leeway,
                business_days
             ) VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                alert_enabled = excluded.alert_enabled,
                arrival_alert_time = excluded.arrival_alert_time,
                arrival_alert_leeway = excluded.arrival_alert_leeway,
                departure_alert_time = excluded.departure_alert_time,
                departure_alert_leeway = excluded.departure_alert_leeway,
                open_time = excluded.open_time,
                open_leeway = excluded.open_leeway,
                close_time = excluded.close_time,
                close_leeway = excluded.close_leeway,
                business_days = excluded.business_days",
        )
        .bind(settings.alert_enabled)
        .bind(format_time(settings.arrival_alert.time))
        .bind(i64::from(settings.arrival_alert.leeway_minutes))
        .bind(format_time(settings.departure_alert.time))
        .bind(i64::from(settings.departure_alert.leeway_minutes))
        .bind(format_time(settings.open.time))
        .bind(i64::from(settings.open.leeway_minutes))
        .bind(format_time(settings.close.time))
        .bind(i64::from(settings.close.leeway_minutes))
        .bind(encode_business_days(&settings.business_days))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn settings_from_row(row: SqliteRow) -> Result<AttendanceSettings, RepositoryError> {
    let business_days_raw = row.try_get::<String, _>("business_days")?;
    let business_days = decode_business_days(&business_days_raw)
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;

    Ok(AttendanceSettings {
        alert_enabled: row.try_get("alert_enabled")?,
        arrival_alert: threshold(&row, "arrival_alert_time", "arrival_alert_leeway")?,
        departure_alert: threshold(&row, "departure_alert_time", "departure_alert_leeway")?,
        open: threshold(&row, "open_time", "open_leeway")?,
        close: threshold(&row, "close_time", "close_leeway")?,
        business_days,
    })
}

fn threshold(
    row: &SqliteRow,
    time_column: &str,
    leeway_column: &str,
) -> Result<ClockThreshold, RepositoryError> {
    let time_raw = row.try_get::<String, _>(time_column)?;
    let time = NaiveTime::parse_from_str(&time_raw, "%H:%M").map_err(|error| {
        RepositoryError::Decode(format!("invalid time in `{time_column}`: `{time_raw}` ({error})"))
    })?;

    let leeway_raw = row.try_get::<i64, _>(leeway_column)?;
    let leeway_minutes = u32::try_from(leeway_raw).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{leeway_column}` (expected non-negative minutes): {leeway_raw}"
        ))
    })?;

    Ok(ClockThreshold { time, leeway_minutes })
}

fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}
