use chrono::NaiveDateTime;
use tracing::{debug, info};

use timeclock_core::domain::attendance::PunchType;
use timeclock_core::domain::user::User;

use crate::messages;
use crate::stores::Stores;
use crate::AssistantError;

/// One-shot punch in / punch out. Each call saves at most one record and
/// sends exactly one reply.
#[derive(Clone)]
pub struct ClockInOutFlow {
    stores: Stores,
}

impl ClockInOutFlow {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn punch_in(
        &self,
        user: &User,
        reply_token: &str,
        now: NaiveDateTime,
    ) -> Result<(), AssistantError> {
        let today = now.date();
        let mut arrival = self.stores.punch_record(user.id, PunchType::Arrival, today).await?;

        if arrival.is_punched() {
            debug!(event_name = "flow.clock.rejected", user_id = %user.id, reason = "already_in");
            return self.reply(reply_token, messages::ALREADY_PUNCHED_IN).await;
        }

        let departure = self.stores.punch_record(user.id, PunchType::Departure, today).await?;
        if departure.is_punched() {
            debug!(event_name = "flow.clock.rejected", user_id = %user.id, reason = "already_out");
            return self.reply(reply_token, messages::PUNCH_IN_AFTER_PUNCH_OUT).await;
        }

        arrival.punched_at = Some(now);
        self.stores.attendance.save(arrival).await?;
        info!(event_name = "flow.clock.punched_in", user_id = %user.id, at = %now, "punched in");

        self.reply(reply_token, &messages::punched_in(now)).await
    }

    /// Saves the departure even when no arrival exists, adding a warning.
    pub async fn punch_out(
        &self,
        user: &User,
        reply_token: &str,
        now: NaiveDateTime,
    ) -> Result<(), AssistantError> {
        let today = now.date();
        let mut departure = self.stores.punch_record(user.id, PunchType::Departure, today).await?;

        if departure.is_punched() {
            debug!(event_name = "flow.clock.rejected", user_id = %user.id, reason = "already_out");
            return self.reply(reply_token, messages::ALREADY_PUNCHED_OUT).await;
        }

        departure.punched_at = Some(now);
        self.stores.attendance.save(departure).await?;
        info!(event_name = "flow.clock.punched_out", user_id = %user.id, at = %now, "punched out");

        let arrival = self.stores.punch_record(user.id, PunchType::Arrival, today).await?;
        let mut text = messages::punched_out(now);
        if !arrival.is_punched() {
            text.push('\n');
            text.push_str(messages::FORGOT_PUNCH_IN);
        }

        self.reply(reply_token, &text).await
    }

    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), AssistantError> {
        self.stores.messenger.reply_message(reply_token, text).await;
        Ok(())
    }
}
