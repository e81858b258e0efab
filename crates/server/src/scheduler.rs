use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use timeclock_assistant::{AlertDispatcher, AssistantError};
use timeclock_core::calendar::WallClock;

/// Drives the alert dispatcher over consecutive, gap-free windows. Ticks run
/// one after another on a single task, so windows never overlap in-process.
pub struct AlertScheduler {
    alerts: AlertDispatcher,
    clock: WallClock,
    last_tick: Option<NaiveDateTime>,
}

impl AlertScheduler {
    pub fn new(alerts: AlertDispatcher, clock: WallClock) -> Self {
        Self { alerts, clock, last_tick: None }
    }

    /// Scans from the previous successful tick up to `now`. The first call
    /// only records where the next window starts, and the start only
    /// advances when a scan succeeds.
    pub async fn tick_at(&mut self, now: NaiveDateTime) -> Result<usize, AssistantError> {
        let Some(begin) = self.last_tick else {
            self.last_tick = Some(now);
            return Ok(0);
        };
        let sent = self.alerts.dispatch(begin, now).await?;
        self.last_tick = Some(now);
        Ok(sent)
    }

    pub fn spawn(mut self, tick: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                event_name = "system.scheduler.start",
                correlation_id = "scheduler",
                tick_secs = tick.as_secs(),
                "alert scheduler started"
            );

            loop {
                interval.tick().await;
                let now = self.clock.now();
                match self.tick_at(now).await {
                    Ok(0) => debug!(event_name = "system.scheduler.tick", at = %now),
                    Ok(sent) => info!(
                        event_name = "system.scheduler.alerts_sent",
                        correlation_id = "scheduler",
                        at = %now,
                        sent,
                        "alert reminders pushed"
                    ),
                    Err(error) => warn!(
                        event_name = "system.scheduler.tick_failed",
                        correlation_id = "scheduler",
                        error = %error,
                        "alert scan failed; retrying next tick"
                    ),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveDateTime};

    use timeclock_assistant::{AlertDispatcher, Stores};
    use timeclock_core::calendar::WallClock;
    use timeclock_core::domain::settings::{AttendanceSettings, ClockThreshold};
    use timeclock_core::domain::user::{Role, User, UserId};
    use timeclock_core::messaging::RecordingMessenger;
    use timeclock_db::{SettingsRepository, UserRepository};

    use super::AlertScheduler;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .and_then(|day| day.and_hms_opt(hour, minute, 0))
            .expect("timestamp")
    }

    async fn scheduler() -> (AlertScheduler, RecordingMessenger) {
        let messenger = RecordingMessenger::default();
        let stores = Stores::in_memory(Arc::new(messenger.clone()));
        stores
            .users
            .save(User {
                id: UserId(1),
                messaging_id: Some("U1".to_owned()),
                name: "Emi Employee".to_owned(),
                role: Role::Employee,
                manager_id: None,
                org_code: None,
            })
            .await
            .expect("save user");
        stores
            .settings
            .save(AttendanceSettings {
                alert_enabled: true,
                arrival_alert: ClockThreshold::new(9, 30, 0).expect("threshold"),
                ..AttendanceSettings::default()
            })
            .await
            .expect("save settings");

        let clock = WallClock::from_offset_minutes(540).expect("offset");
        (AlertScheduler::new(AlertDispatcher::new(stores), clock), messenger)
    }

    #[tokio::test]
    async fn first_tick_only_sets_the_window_start() {
        let (mut scheduler, messenger) = scheduler().await;

        assert_eq!(scheduler.tick_at(at(9, 30)).await.expect("tick"), 0);
        assert!(messenger.messages().is_empty());
    }

    #[tokio::test]
    async fn consecutive_ticks_cover_the_alert_instant_once() {
        let (mut scheduler, messenger) = scheduler().await;

        scheduler.tick_at(at(9, 29)).await.expect("tick");
        let sent = scheduler.tick_at(at(9, 30)).await.expect("tick");
        let after = scheduler.tick_at(at(9, 31)).await.expect("tick");

        assert_eq!(sent, 1);
        assert_eq!(after, 0);
        assert_eq!(messenger.messages().len(), 1);
    }
}
