use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use timeclock_core::calendar::YearMonth;
use timeclock_core::domain::attendance::{PunchRecord, PunchType};
use timeclock_core::domain::session::Session;
use timeclock_core::domain::settings::AttendanceSettings;
use timeclock_core::domain::user::{User, UserId};

pub mod alert;
pub mod attendance;
pub mod memory;
pub mod session;
pub mod settings;
pub mod user;

pub use alert::SqlAlertDispatchRepository;
pub use attendance::SqlAttendanceRepository;
pub use memory::{
    InMemoryAlertDispatchRepository, InMemoryAttendanceRepository, InMemorySessionRepository,
    InMemorySettingsRepository, InMemoryUserRepository,
};
pub use session::SqlSessionRepository;
pub use settings::SqlSettingsRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn find_by_messaging_id(&self, messaging_id: &str)
        -> Result<Option<User>, RepositoryError>;

    /// Users an admin may inspect, excluding the admin, ordered by id.
    /// Scoped to the admin's organization when the admin belongs to one.
    async fn admin_members(&self, admin: &User) -> Result<Vec<User>, RepositoryError>;

    /// Direct reports of `manager`, ordered by id.
    async fn manager_members(&self, manager: &User) -> Result<Vec<User>, RepositoryError>;

    /// Users linked to a messaging identity who have no punch of
    /// `punch_type` on `day`, ordered by id.
    async fn missing_punch(
        &self,
        day: NaiveDate,
        punch_type: PunchType,
    ) -> Result<Vec<User>, RepositoryError>;

    async fn save(&self, user: User) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn find(
        &self,
        user_id: UserId,
        punch_type: PunchType,
        day: NaiveDate,
    ) -> Result<Option<PunchRecord>, RepositoryError>;

    /// Inserts or replaces the record for its (user, type, day) key.
    async fn save(&self, record: PunchRecord) -> Result<(), RepositoryError>;

    /// One user's records for `month`, ordered by day then punch type.
    async fn list_month(
        &self,
        user_id: UserId,
        month: YearMonth,
    ) -> Result<Vec<PunchRecord>, RepositoryError>;

    /// Every user's records for `month`, ordered by user, day, punch type.
    async fn list_month_all(&self, month: YearMonth) -> Result<Vec<PunchRecord>, RepositoryError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn find(&self, messaging_id: &str) -> Result<Option<Session>, RepositoryError>;
    async fn save(&self, session: Session) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Falls back to [`AttendanceSettings::default`] when nothing is stored.
    async fn get(&self) -> Result<AttendanceSettings, RepositoryError>;
    async fn save(&self, settings: AttendanceSettings) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AlertDispatchRepository: Send + Sync {
    /// Records `alert_at` as dispatched. Returns `true` only for the first
    /// caller to claim that instant.
    async fn claim(&self, alert_at: NaiveDateTime) -> Result<bool, RepositoryError>;

    /// Forgets instants dated before `day`. Returns how many were removed.
    async fn prune_before(&self, day: NaiveDate) -> Result<u64, RepositoryError>;
}

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<NaiveDateTime, RepositoryError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|error| {
        RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
    })
}
