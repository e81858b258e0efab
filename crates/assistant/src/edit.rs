use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

use timeclock_core::calendar::{self, MonthDay};
use timeclock_core::domain::attendance::PunchType;
use timeclock_core::flows::{ConversationState, EditStep};
use timeclock_db::AttendanceRepository;

use crate::messages;
use crate::router::Turn;
use crate::stores::Stores;
use crate::AssistantError;

/// Correction of a past punch: day, then punch type, then the new time.
///
/// A bad day or time re-prompts in place. A reply that is not a punch type
/// drops back to the menu instead.
#[derive(Clone)]
pub struct EditFlow {
    stores: Stores,
}

impl EditFlow {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn start(&self, reply_token: &str) -> ConversationState {
        self.stores.messenger.reply_message(reply_token, messages::PROMPT_MONTH_DAY).await;
        ConversationState::Edit(EditStep::AwaitDate)
    }

    pub async fn handle(
        &self,
        turn: &Turn<'_>,
        step: EditStep,
    ) -> Result<ConversationState, AssistantError> {
        match step {
            EditStep::AwaitDate => Ok(self.choose_date(turn).await),
            EditStep::AwaitType { month_day } => self.choose_type(turn, month_day).await,
            EditStep::AwaitTime { punch_type, day } => self.enter_time(turn, punch_type, day).await,
        }
    }

    async fn choose_date(&self, turn: &Turn<'_>) -> ConversationState {
        let Some(month_day) = calendar::parse_month_day(turn.text, turn.now.year()) else {
            return self.start(turn.reply_token).await;
        };

        let labels: Vec<String> =
            PunchType::ALL.iter().map(|punch_type| punch_type.label().to_owned()).collect();
        self.stores
            .messenger
            .push_buttons(turn.identity, messages::SELECT_PUNCH_TYPE_TITLE, &labels)
            .await;
        ConversationState::Edit(EditStep::AwaitType { month_day })
    }

    async fn choose_type(
        &self,
        turn: &Turn<'_>,
        month_day: MonthDay,
    ) -> Result<ConversationState, AssistantError> {
        let target = PunchType::from_label(turn.text)
            .and_then(|punch_type| Some((punch_type, month_day.in_year(turn.now.year())?)));
        let Some((punch_type, day)) = target else {
            debug!(event_name = "flow.edit.type_mismatch", user_id = %turn.user.id);
            self.stores.messenger.reply_message(turn.reply_token, messages::SELECT_MENU).await;
            return Ok(ConversationState::Idle);
        };

        let record = self.stores.punch_record(turn.user.id, punch_type, day).await?;
        let current = record
            .punched_at
            .map(calendar::format_month_day_time)
            .unwrap_or_else(|| messages::NOT_YET_ENTERED.to_owned());
        let text = format!(
            "{}\n{}",
            messages::current_value(punch_type, &current),
            messages::prompt_new_time(punch_type)
        );
        self.stores.messenger.reply_message(turn.reply_token, &text).await;

        Ok(ConversationState::Edit(EditStep::AwaitTime { punch_type, day }))
    }

    async fn enter_time(
        &self,
        turn: &Turn<'_>,
        punch_type: PunchType,
        day: NaiveDate,
    ) -> Result<ConversationState, AssistantError> {
        let Some(time) = calendar::parse_hour_minute(turn.text) else {
            let prompt = messages::prompt_new_time(punch_type);
            self.stores.messenger.reply_message(turn.reply_token, &prompt).await;
            return Ok(ConversationState::Edit(EditStep::AwaitTime { punch_type, day }));
        };

        let punched_at = day.and_time(time);
        let mut record = self.stores.punch_record(turn.user.id, punch_type, day).await?;
        record.punched_at = Some(punched_at);
        record.edited = true;
        self.stores.attendance.save(record).await?;
        info!(
            event_name = "flow.edit.saved",
            user_id = %turn.user.id,
            punch_type = punch_type.as_str(),
            at = %punched_at,
            "correction saved"
        );

        let saved = messages::correction_saved(punch_type, punched_at);
        self.stores.messenger.reply_message(turn.reply_token, &saved).await;
        Ok(ConversationState::Edit(EditStep::AwaitDate))
    }
}
