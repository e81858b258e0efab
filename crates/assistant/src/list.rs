use tracing::debug;

use timeclock_core::calendar::{self, YearMonth};
use timeclock_core::domain::user::{Role, User, UserId};
use timeclock_core::flows::{ConversationState, ListStep};
use timeclock_db::UserRepository;

use crate::messages;
use crate::report::render_month_report;
use crate::router::Turn;
use crate::stores::Stores;
use crate::AssistantError;

/// Month report for the sender, or for a member the sender may inspect.
#[derive(Clone)]
pub struct ListFlow {
    stores: Stores,
}

impl ListFlow {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn start(&self, reply_token: &str) -> ConversationState {
        self.stores.messenger.reply_message(reply_token, messages::PROMPT_YEAR_MONTH).await;
        ConversationState::List(ListStep::AwaitMonth)
    }

    pub async fn handle(
        &self,
        turn: &Turn<'_>,
        step: ListStep,
    ) -> Result<ConversationState, AssistantError> {
        match step {
            ListStep::AwaitMonth => self.choose_month(turn).await,
            ListStep::AwaitUserSelection { month } => self.select_user(turn, month).await,
        }
    }

    async fn choose_month(&self, turn: &Turn<'_>) -> Result<ConversationState, AssistantError> {
        let Some(month) = calendar::parse_year_month(turn.text) else {
            return Ok(self.start(turn.reply_token).await);
        };

        let members = self.members(turn.user).await?;
        debug!(
            event_name = "flow.list.members",
            user_id = %turn.user.id,
            month = %month,
            members = members.len()
        );

        // A selection menu only makes sense with at least two other people.
        if members.len() >= 2 {
            let labels: Vec<String> = members
                .iter()
                .chain(std::iter::once(turn.user))
                .map(User::selection_label)
                .collect();
            self.stores
                .messenger
                .push_buttons(turn.identity, messages::SELECT_USER_TITLE, &labels)
                .await;
            return Ok(ConversationState::List(ListStep::AwaitUserSelection { month }));
        }

        self.reply_report(turn.reply_token, turn.user.id, month).await?;
        Ok(ConversationState::List(ListStep::AwaitMonth))
    }

    async fn select_user(
        &self,
        turn: &Turn<'_>,
        month: YearMonth,
    ) -> Result<ConversationState, AssistantError> {
        let Some(user_id) = leading_user_id(turn.text) else {
            self.stores.messenger.reply_message(turn.reply_token, messages::SELECT_MENU).await;
            return Ok(ConversationState::Idle);
        };

        self.reply_report(turn.reply_token, user_id, month).await?;
        Ok(ConversationState::List(ListStep::AwaitUserSelection { month }))
    }

    async fn members(&self, user: &User) -> Result<Vec<User>, AssistantError> {
        let members = match user.role {
            Role::Admin => self.stores.users.admin_members(user).await?,
            Role::Manager => self.stores.users.manager_members(user).await?,
            Role::Employee => Vec::new(),
        };
        Ok(members)
    }

    async fn reply_report(
        &self,
        reply_token: &str,
        user_id: UserId,
        month: YearMonth,
    ) -> Result<(), AssistantError> {
        let report = render_month_report(&self.stores, user_id, month).await?;
        self.stores.messenger.reply_message(reply_token, &report).await;
        Ok(())
    }
}

/// Selection buttons carry `"{id} {name}"`.
fn leading_user_id(text: &str) -> Option<UserId> {
    text.split_whitespace().next()?.parse().ok().map(UserId)
}

#[cfg(test)]
mod tests {
    use timeclock_core::domain::attendance::PunchType;
    use timeclock_core::domain::user::User;
    use timeclock_core::flows::{ConversationState, ListStep};
    use timeclock_core::messaging::OutboundMessage;
    use timeclock_db::UserRepository;

    use super::{leading_user_id, ListFlow};
    use crate::messages;
    use crate::router::Turn;
    use crate::testing::{
        at, june, punch, stores_with_users, ADMIN, ADMIN_ID, EMPLOYEE, EMPLOYEE_ID, MANAGER,
        MANAGER_ID, SOLO_MANAGER, SOLO_MANAGER_ID,
    };
    use crate::Stores;

    async fn user(stores: &Stores, id: timeclock_core::domain::user::UserId) -> User {
        stores.users.find_by_id(id).await.expect("find").expect("user exists")
    }

    fn turn<'a>(user: &'a User, identity: &'a str, text: &'a str) -> Turn<'a> {
        Turn { user, identity, reply_token: "rt-list", text, now: at(2024, 7, 1, "10:00:00") }
    }

    #[test]
    fn selection_payload_leads_with_user_id() {
        assert_eq!(leading_user_id("3 Emi Employee"), Some(timeclock_core::UserId(3)));
        assert_eq!(leading_user_id("  12"), Some(timeclock_core::UserId(12)));
        assert_eq!(leading_user_id("Emi 3"), None);
        assert_eq!(leading_user_id(""), None);
    }

    #[tokio::test]
    async fn employee_gets_own_report_and_may_ask_again() {
        let (stores, messenger) = stores_with_users().await;
        punch(&stores, EMPLOYEE_ID, PunchType::Arrival, at(2024, 6, 3, "08:50:00")).await;
        let flow = ListFlow::new(stores.clone());
        let employee = user(&stores, EMPLOYEE_ID).await;

        let next = flow
            .handle(&turn(&employee, EMPLOYEE, "202406"), ListStep::AwaitMonth)
            .await
            .expect("list");

        assert_eq!(next, ConversationState::List(ListStep::AwaitMonth));
        let sent = messenger.take();
        assert_eq!(sent.len(), 1);
        assert!(matches!(
            &sent[0],
            OutboundMessage::Reply { text, .. } if text == "Emi Employee 2024/6\n6/3 08:50～\n"
        ));
    }

    #[tokio::test]
    async fn unparseable_month_reprompts_in_place() {
        let (stores, messenger) = stores_with_users().await;
        let flow = ListFlow::new(stores.clone());
        let employee = user(&stores, EMPLOYEE_ID).await;

        let next = flow
            .handle(&turn(&employee, EMPLOYEE, "June please"), ListStep::AwaitMonth)
            .await
            .expect("list");

        assert_eq!(next, ConversationState::List(ListStep::AwaitMonth));
        assert_eq!(
            messenger.take(),
            vec![OutboundMessage::Reply {
                reply_token: "rt-list".to_owned(),
                text: messages::PROMPT_YEAR_MONTH.to_owned(),
            }]
        );
    }

    #[tokio::test]
    async fn manager_with_one_report_sees_own_report_immediately() {
        let (stores, messenger) = stores_with_users().await;
        let flow = ListFlow::new(stores.clone());
        let manager = user(&stores, SOLO_MANAGER_ID).await;

        let next = flow
            .handle(&turn(&manager, SOLO_MANAGER, "2024/6"), ListStep::AwaitMonth)
            .await
            .expect("list");

        assert_eq!(next, ConversationState::List(ListStep::AwaitMonth));
        let sent = messenger.take();
        assert_eq!(sent.len(), 1);
        assert!(matches!(
            &sent[0],
            OutboundMessage::Reply { text, .. } if text.starts_with("Sol Manager 2024/6\n")
        ));
    }

    #[tokio::test]
    async fn manager_with_reports_selects_and_reselects() {
        let (stores, messenger) = stores_with_users().await;
        punch(&stores, MANAGER_ID, PunchType::Arrival, at(2024, 6, 4, "09:00:00")).await;
        let flow = ListFlow::new(stores.clone());
        let manager = user(&stores, MANAGER_ID).await;

        let next = flow
            .handle(&turn(&manager, MANAGER, "202406"), ListStep::AwaitMonth)
            .await
            .expect("list");
        assert_eq!(next, ConversationState::List(ListStep::AwaitUserSelection { month: june() }));

        let sent = messenger.take();
        let Some(OutboundMessage::Buttons { identity, title, labels }) = sent.first() else {
            panic!("expected a selection menu, got {sent:?}");
        };
        assert_eq!(identity, MANAGER);
        assert_eq!(title, messages::SELECT_USER_TITLE);
        assert_eq!(labels, &["3 Emi Employee", "4 Ken Employee", "2 Mika Manager"]);

        let last = labels.last().expect("self entry").clone();
        let step = ListStep::AwaitUserSelection { month: june() };
        let next = flow.handle(&turn(&manager, MANAGER, &last), step.clone()).await.expect("select");

        assert_eq!(next, ConversationState::List(step));
        assert!(matches!(
            messenger.take().as_slice(),
            [OutboundMessage::Reply { text, .. }] if text == "Mika Manager 2024/6\n6/4 09:00～\n"
        ));
    }

    #[tokio::test]
    async fn admin_selects_from_own_organization_only() {
        let (stores, messenger) = stores_with_users().await;
        punch(&stores, EMPLOYEE_ID, PunchType::Arrival, at(2024, 6, 5, "08:45:00")).await;
        punch(&stores, EMPLOYEE_ID, PunchType::Departure, at(2024, 6, 5, "18:10:00")).await;
        let flow = ListFlow::new(stores.clone());
        let admin = user(&stores, ADMIN_ID).await;

        let next = flow
            .handle(&turn(&admin, ADMIN, "2024/6"), ListStep::AwaitMonth)
            .await
            .expect("list");
        assert_eq!(next, ConversationState::List(ListStep::AwaitUserSelection { month: june() }));

        let sent = messenger.take();
        let Some(OutboundMessage::Buttons { identity, title, labels }) = sent.first() else {
            panic!("expected a selection menu, got {sent:?}");
        };
        assert_eq!(sent.len(), 1);
        assert_eq!(identity, ADMIN);
        assert_eq!(title, messages::SELECT_USER_TITLE);
        assert_eq!(
            labels,
            &["2 Mika Manager", "3 Emi Employee", "4 Ken Employee", "1 Aiko Admin"]
        );

        let step = ListStep::AwaitUserSelection { month: june() };
        let next =
            flow.handle(&turn(&admin, ADMIN, &labels[1]), step.clone()).await.expect("select");

        assert_eq!(next, ConversationState::List(step));
        assert!(matches!(
            messenger.take().as_slice(),
            [OutboundMessage::Reply { text, .. }]
                if text == "Emi Employee 2024/6\n6/5 08:45～18:10\n"
        ));
    }

    #[tokio::test]
    async fn selecting_user_without_punches_reports_not_found() {
        let (stores, messenger) = stores_with_users().await;
        let flow = ListFlow::new(stores.clone());
        let manager = user(&stores, MANAGER_ID).await;
        let step = ListStep::AwaitUserSelection { month: june() };

        flow.handle(&turn(&manager, MANAGER, "4 Ken Employee"), step).await.expect("select");

        assert!(matches!(
            messenger.take().as_slice(),
            [OutboundMessage::Reply { text, .. }]
                if text == &format!("Ken Employee 2024/6\n{}", messages::NO_ATTENDANCE)
        ));
    }

    #[tokio::test]
    async fn garbage_selection_aborts_to_idle() {
        let (stores, messenger) = stores_with_users().await;
        let flow = ListFlow::new(stores.clone());
        let manager = user(&stores, MANAGER_ID).await;
        let step = ListStep::AwaitUserSelection { month: june() };

        let next = flow.handle(&turn(&manager, MANAGER, "Ken"), step).await.expect("select");

        assert_eq!(next, ConversationState::Idle);
        assert!(matches!(
            messenger.take().as_slice(),
            [OutboundMessage::Reply { text, .. }] if text == messages::SELECT_MENU
        ));
    }
}
