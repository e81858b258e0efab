use std::sync::Arc;

use chrono::NaiveDate;

use timeclock_core::domain::attendance::{PunchRecord, PunchType};
use timeclock_core::domain::user::UserId;
use timeclock_core::messaging::Messenger;
use timeclock_db::repositories::{
    InMemoryAlertDispatchRepository, InMemoryAttendanceRepository, InMemorySessionRepository,
    InMemorySettingsRepository, InMemoryUserRepository, SqlAlertDispatchRepository,
    SqlAttendanceRepository, SqlSessionRepository, SqlSettingsRepository, SqlUserRepository,
};
use timeclock_db::{
    AlertDispatchRepository, AttendanceRepository, DbPool, SessionRepository, SettingsRepository,
    UserRepository,
};

use crate::AssistantError;

/// Repository handles plus the outbound messenger, shared by every flow.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserRepository>,
    pub attendance: Arc<dyn AttendanceRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    pub alerts: Arc<dyn AlertDispatchRepository>,
    pub messenger: Arc<dyn Messenger>,
}

impl Stores {
    pub fn sql(pool: DbPool, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            users: Arc::new(SqlUserRepository::new(pool.clone())),
            attendance: Arc::new(SqlAttendanceRepository::new(pool.clone())),
            sessions: Arc::new(SqlSessionRepository::new(pool.clone())),
            settings: Arc::new(SqlSettingsRepository::new(pool.clone())),
            alerts: Arc::new(SqlAlertDispatchRepository::new(pool)),
            messenger,
        }
    }

    pub fn in_memory(messenger: Arc<dyn Messenger>) -> Self {
        let attendance = Arc::new(InMemoryAttendanceRepository::default());
        Self {
            users: Arc::new(InMemoryUserRepository::with_attendance(attendance.clone())),
            attendance,
            sessions: Arc::new(InMemorySessionRepository::default()),
            settings: Arc::new(InMemorySettingsRepository::default()),
            alerts: Arc::new(InMemoryAlertDispatchRepository::default()),
            messenger,
        }
    }

    /// The stored record for the key, or an unpunched one if none exists.
    pub async fn punch_record(
        &self,
        user_id: UserId,
        punch_type: PunchType,
        day: NaiveDate,
    ) -> Result<PunchRecord, AssistantError> {
        let record = self.attendance.find(user_id, punch_type, day).await?;
        Ok(record.unwrap_or_else(|| PunchRecord::empty(user_id, punch_type, day)))
    }
}
