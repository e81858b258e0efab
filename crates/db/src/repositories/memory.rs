use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tokio::sync::RwLock;

use timeclock_core::calendar::YearMonth;
use timeclock_core::domain::attendance::{PunchRecord, PunchType};
use timeclock_core::domain::session::Session;
use timeclock_core::domain::settings::AttendanceSettings;
use timeclock_core::domain::user::{User, UserId};

use super::{
    AlertDispatchRepository, AttendanceRepository, RepositoryError, SessionRepository,
    SettingsRepository, UserRepository,
};

type RecordKey = (UserId, NaiveDate, PunchType);

#[derive(Default)]
pub struct InMemoryAttendanceRepository {
    records: RwLock<BTreeMap<RecordKey, PunchRecord>>,
}

impl InMemoryAttendanceRepository {
    async fn is_punched(&self, user_id: UserId, punch_type: PunchType, day: NaiveDate) -> bool {
        let records = self.records.read().await;
        records.get(&(user_id, day, punch_type)).is_some_and(PunchRecord::is_punched)
    }
}

#[async_trait::async_trait]
impl AttendanceRepository for InMemoryAttendanceRepository {
    async fn find(
        &self,
        user_id: UserId,
        punch_type: PunchType,
        day: NaiveDate,
    ) -> Result<Option<PunchRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.get(&(user_id, day, punch_type)).cloned())
    }

    async fn save(&self, record: PunchRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.insert((record.user_id, record.day, record.punch_type), record);
        Ok(())
    }

    async fn list_month(
        &self,
        user_id: UserId,
        month: YearMonth,
    ) -> Result<Vec<PunchRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|record| record.user_id == user_id && month.contains(record.day))
            .cloned()
            .collect())
    }

    async fn list_month_all(&self, month: YearMonth) -> Result<Vec<PunchRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.values().filter(|record| month.contains(record.day)).cloned().collect())
    }
}

/// Users keyed by id. Missing-punch queries consult the attendance
/// repository it was built with.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<BTreeMap<UserId, User>>,
    attendance: Arc<InMemoryAttendanceRepository>,
}

impl InMemoryUserRepository {
    pub fn with_attendance(attendance: Arc<InMemoryAttendanceRepository>) -> Self {
        Self { users: RwLock::default(), attendance }
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_messaging_id(
        &self,
        messaging_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.messaging_id.as_deref() == Some(messaging_id)).cloned())
    }

    async fn admin_members(&self, admin: &User) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .filter(|user| user.id != admin.id)
            .filter(|user| admin.org_code.is_none() || user.org_code == admin.org_code)
            .cloned()
            .collect())
    }

    async fn manager_members(&self, manager: &User) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .filter(|user| user.id != manager.id && user.manager_id == Some(manager.id))
            .cloned()
            .collect())
    }

    async fn missing_punch(
        &self,
        day: NaiveDate,
        punch_type: PunchType,
    ) -> Result<Vec<User>, RepositoryError> {
        let linked: Vec<User> = {
            let users = self.users.read().await;
            users.values().filter(|user| user.messaging_id.is_some()).cloned().collect()
        };

        let mut missing = Vec::with_capacity(linked.len());
        for user in linked {
            if !self.attendance.is_punched(user.id, punch_type, day).await {
                missing.push(user);
            }
        }
        Ok(missing)
    }

    async fn save(&self, user: User) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        users.insert(user.id, user);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<String, Session>>,
}

#[async_trait::async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn find(&self, messaging_id: &str) -> Result<Option<Session>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(messaging_id).cloned())
    }

    async fn save(&self, session: Session) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.messaging_id.clone(), session);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySettingsRepository {
    settings: RwLock<Option<AttendanceSettings>>,
}

impl InMemorySettingsRepository {
    pub fn with_settings(settings: AttendanceSettings) -> Self {
        Self { settings: RwLock::new(Some(settings)) }
    }
}

#[async_trait::async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn get(&self) -> Result<AttendanceSettings, RepositoryError> {
        let settings = self.settings.read().await;
        Ok(settings.clone().unwrap_or_default())
    }

    async fn save(&self, settings: AttendanceSettings) -> Result<(), RepositoryError> {
        *self.settings.write().await = Some(settings);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAlertDispatchRepository {
    dispatched: RwLock<BTreeSet<NaiveDateTime>>,
}

#[async_trait::async_trait]
impl AlertDispatchRepository for InMemoryAlertDispatchRepository {
    async fn claim(&self, alert_at: NaiveDateTime) -> Result<bool, RepositoryError> {
        let mut dispatched = self.dispatched.write().await;
        Ok(dispatched.insert(alert_at))
    }

    async fn prune_before(&self, day: NaiveDate) -> Result<u64, RepositoryError> {
        let cutoff = day.and_time(NaiveTime::MIN);
        let mut dispatched = self.dispatched.write().await;
        let before = dispatched.len();
        dispatched.retain(|instant| *instant >= cutoff);
        Ok((before - dispatched.len()) as u64)
    }
}
