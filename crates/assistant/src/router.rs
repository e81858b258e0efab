use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::{debug, warn};

use timeclock_core::calendar::WallClock;
use timeclock_core::domain::session::Session;
use timeclock_core::domain::user::User;
use timeclock_core::errors::ApplicationError;
use timeclock_core::flows::{ConversationState, MenuCommand};
use timeclock_db::{SessionRepository, UserRepository};
use timeclock_gateway::events::{ConversationService, EventContext, TextMessageEvent};

use crate::clock::ClockInOutFlow;
use crate::edit::EditFlow;
use crate::list::ListFlow;
use crate::messages;
use crate::stores::Stores;
use crate::AssistantError;

/// One inbound text from a registered user.
#[derive(Clone, Copy, Debug)]
pub struct Turn<'a> {
    pub user: &'a User,
    pub identity: &'a str,
    pub reply_token: &'a str,
    pub text: &'a str,
    pub now: NaiveDateTime,
}

pub struct ConversationRouter {
    stores: Stores,
    clock: WallClock,
    clock_in_out: ClockInOutFlow,
    list: ListFlow,
    edit: EditFlow,
}

impl ConversationRouter {
    pub fn new(stores: Stores, clock: WallClock) -> Self {
        Self {
            clock_in_out: ClockInOutFlow::new(stores.clone()),
            list: ListFlow::new(stores.clone()),
            edit: EditFlow::new(stores.clone()),
            stores,
            clock,
        }
    }

    /// Runs one turn and persists the resulting state. Returns the state
    /// the session was left in.
    pub async fn handle(
        &self,
        identity: &str,
        reply_token: &str,
        text: &str,
        now: NaiveDateTime,
    ) -> Result<ConversationState, AssistantError> {
        let Some(user) = self.stores.users.find_by_messaging_id(identity).await? else {
            debug!(event_name = "flow.router.unregistered", identity);
            self.stores.messenger.reply_message(reply_token, messages::NOT_REGISTERED).await;
            return Ok(ConversationState::Idle);
        };

        let mut session =
            self.stores.sessions.find(identity).await?.unwrap_or_else(|| Session::new(identity));
        let current = session.state();
        let turn = Turn { user: &user, identity, reply_token, text, now };

        let next = match MenuCommand::parse(text) {
            Some(command) => self.run_command(&turn, command).await?,
            None => self.continue_flow(&turn, current.clone()).await?,
        };
        debug!(
            event_name = "flow.router.turn",
            user_id = %user.id,
            from = ?current,
            to = ?next
        );

        session.set_state(&next);
        self.stores.sessions.save(session).await?;
        Ok(next)
    }

    async fn run_command(
        &self,
        turn: &Turn<'_>,
        command: MenuCommand,
    ) -> Result<ConversationState, AssistantError> {
        let next = match command {
            MenuCommand::PunchIn => {
                self.clock_in_out.punch_in(turn.user, turn.reply_token, turn.now).await?;
                ConversationState::Idle
            }
            MenuCommand::PunchOut => {
                self.clock_in_out.punch_out(turn.user, turn.reply_token, turn.now).await?;
                ConversationState::Idle
            }
            MenuCommand::List => self.list.start(turn.reply_token).await,
            MenuCommand::Edit => self.edit.start(turn.reply_token).await,
        };
        Ok(next)
    }

    async fn continue_flow(
        &self,
        turn: &Turn<'_>,
        state: ConversationState,
    ) -> Result<ConversationState, AssistantError> {
        match state {
            ConversationState::List(step) => self.list.handle(turn, step).await,
            ConversationState::Edit(step) => self.edit.handle(turn, step).await,
            ConversationState::Idle => {
                self.stores.messenger.reply_message(turn.reply_token, messages::SELECT_MENU).await;
                Ok(ConversationState::Idle)
            }
        }
    }
}

#[async_trait]
impl ConversationService for ConversationRouter {
    async fn handle_text(
        &self,
        event: &TextMessageEvent,
        ctx: &EventContext,
    ) -> Result<(), ApplicationError> {
        let now = self.clock.now();
        self.handle(&event.sender_identity, &event.reply_token, &event.text, now)
            .await
            .map(|_| ())
            .map_err(|error| {
                warn!(
                    event_name = "flow.router.failed",
                    correlation_id = %ctx.correlation_id,
                    error = %error,
                    "conversation turn failed"
                );
                ApplicationError::from(error)
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use timeclock_core::calendar::WallClock;
    use timeclock_core::domain::attendance::PunchType;
    use timeclock_core::flows::{ConversationState, EditStep, ListStep};
    use timeclock_core::messaging::OutboundMessage;
    use timeclock_db::{AttendanceRepository, SessionRepository};
    use timeclock_gateway::events::{conversation_dispatcher, EventContext, InboundEvent};

    use super::ConversationRouter;
    use crate::messages;
    use crate::testing::{at, replies, stores_with_users, EMPLOYEE, EMPLOYEE_ID, MANAGER};

    fn router(stores: crate::Stores) -> ConversationRouter {
        let clock = WallClock::from_offset_minutes(540).expect("offset");
        ConversationRouter::new(stores, clock)
    }

    #[tokio::test]
    async fn unregistered_identity_gets_notice_and_no_session() {
        let (stores, messenger) = stores_with_users().await;
        let router = router(stores.clone());

        let state = router
            .handle("U-stranger", "rt-1", "Punch in", at(2024, 6, 3, "09:00:00"))
            .await
            .expect("turn");

        assert_eq!(state, ConversationState::Idle);
        assert_eq!(replies(&messenger), vec![messages::NOT_REGISTERED.to_owned()]);
        assert!(stores.sessions.find("U-stranger").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn idle_free_text_asks_for_a_menu_item() {
        let (stores, messenger) = stores_with_users().await;
        let router = router(stores);

        let now = at(2024, 6, 3, "09:00:00");
        let state = router.handle(EMPLOYEE, "rt-1", "hello", now).await.expect("turn");

        assert_eq!(state, ConversationState::Idle);
        assert_eq!(replies(&messenger), vec![messages::SELECT_MENU.to_owned()]);
    }

    #[tokio::test]
    async fn menu_command_resets_flow_in_progress() {
        let (stores, messenger) = stores_with_users().await;
        let router = router(stores.clone());
        let now = at(2024, 6, 3, "08:45:00");

        router.handle(EMPLOYEE, "rt-1", "Edit", now).await.expect("edit");
        let state = router.handle(EMPLOYEE, "rt-2", "punch in", now).await.expect("punch in");

        assert_eq!(state, ConversationState::Idle);
        assert_eq!(
            replies(&messenger),
            vec![messages::PROMPT_MONTH_DAY.to_owned(), messages::punched_in(now)]
        );
        let session = stores.sessions.find(EMPLOYEE).await.expect("find").expect("session");
        assert_eq!(session.state(), ConversationState::Idle);
        assert!(stores
            .attendance
            .find(EMPLOYEE_ID, PunchType::Arrival, now.date())
            .await
            .expect("find")
            .is_some());
    }

    #[tokio::test]
    async fn multi_turn_state_survives_between_turns() {
        let (stores, messenger) = stores_with_users().await;
        let router = router(stores.clone());
        let now = at(2024, 6, 20, "12:00:00");

        router.handle(EMPLOYEE, "rt-1", "Edit", now).await.expect("edit");
        router.handle(EMPLOYEE, "rt-2", "6/14", now).await.expect("date");
        let state = router.handle(EMPLOYEE, "rt-3", "Departure", now).await.expect("type");
        assert!(matches!(
            state,
            ConversationState::Edit(EditStep::AwaitTime { punch_type: PunchType::Departure, .. })
        ));

        let state = router.handle(EMPLOYEE, "rt-4", "1815", now).await.expect("time");
        assert_eq!(state, ConversationState::Edit(EditStep::AwaitDate));
        let stored = stores.sessions.find(EMPLOYEE).await.expect("find").expect("session");
        assert_eq!(stored.action.as_deref(), Some("edit.await_date"));
        assert!(messenger
            .take()
            .iter()
            .any(|message| matches!(message, OutboundMessage::Buttons { .. })));
    }

    #[tokio::test]
    async fn postbacks_drive_the_router_through_the_dispatcher() {
        let (stores, messenger) = stores_with_users().await;
        let router = Arc::new(router(stores.clone()));
        let dispatcher = conversation_dispatcher(router);

        let turns = [(Some("List"), None), (None, Some("202406"))];
        for (index, (text, data)) in turns.into_iter().enumerate() {
            let event = InboundEvent {
                sender_identity: MANAGER.to_owned(),
                reply_token: format!("rt-{index}"),
                text: text.map(str::to_owned),
                data: data.map(str::to_owned),
            };
            dispatcher
                .dispatch(&event.into_envelope(format!("env-{index}")), &EventContext::default())
                .await
                .expect("dispatch");
        }

        let session = stores.sessions.find(MANAGER).await.expect("find").expect("session");
        assert!(matches!(
            session.state(),
            ConversationState::List(ListStep::AwaitUserSelection { .. })
        ));
        assert!(matches!(messenger.take().last(), Some(OutboundMessage::Buttons { .. })));
    }
}
