use chrono::NaiveDateTime;
use tracing::{debug, info};

use timeclock_core::domain::attendance::PunchType;
use timeclock_db::{AlertDispatchRepository, SettingsRepository, UserRepository};

use crate::messages;
use crate::stores::Stores;
use crate::AssistantError;

/// Pushes missing-punch reminders when a configured alert instant falls
/// inside the scanned window.
///
/// Each instant is claimed through the alert store right before its
/// reminders are pushed, so overlapping windows (or several processes sharing one database)
/// deliver a given reminder round at most once.
#[derive(Clone)]
pub struct AlertDispatcher {
    stores: Stores,
}

impl AlertDispatcher {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Scans `[begin, end]` and returns how many reminders were pushed.
    pub async fn dispatch(
        &self,
        begin: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<usize, AssistantError> {
        let settings = self.stores.settings.get().await?;
        if !settings.alert_enabled {
            debug!(event_name = "alert.disabled", "alerts are disabled");
            return Ok(0);
        }

        let today = end.date();
        let mut sent = 0;
        for (punch_type, threshold) in [
            (PunchType::Arrival, settings.arrival_alert),
            (PunchType::Departure, settings.departure_alert),
        ] {
            let alert_at = threshold.on(today);
            if alert_at < begin || alert_at > end {
                continue;
            }

            // Claim only once recipients are known.
            let users = self.stores.users.missing_punch(today, punch_type).await?;
            if !self.stores.alerts.claim(alert_at).await? {
                debug!(event_name = "alert.already_claimed", alert_at = %alert_at);
                continue;
            }

            let reminder = messages::missing_punch_reminder(punch_type);
            for user in &users {
                if let Some(identity) = user.messaging_id.as_deref() {
                    self.stores.messenger.push_message(identity, &reminder).await;
                    sent += 1;
                }
            }
            info!(
                event_name = "alert.dispatched",
                punch_type = punch_type.as_str(),
                alert_at = %alert_at,
                recipients = users.len(),
                "missing-punch reminders pushed"
            );
        }

        self.stores.alerts.prune_before(today).await?;
        Ok(sent)
    }
}
