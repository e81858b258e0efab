//! Conversation core of the time-clock assistant.
//!
//! Every inbound text goes through the [`router::ConversationRouter`], which
//! resolves the sender, loads the persisted session and hands the turn to
//! one of the flows:
//!
//! - **ClockInOutFlow** (`clock`) - one-shot punch in / punch out
//! - **ListFlow** (`list`) - month report for self or a chosen member
//! - **EditFlow** (`edit`) - multi-turn correction of a past punch
//!
//! The [`alert::AlertDispatcher`] runs beside the router, driven by a
//! scheduler, and pushes reminders to users who have not punched yet.
//!
//! Flows never fail on bad input: parse failures and business-rule
//! rejections become reply messages. Only repository failures surface as
//! [`AssistantError`].

pub mod alert;
pub mod clock;
pub mod edit;
pub mod list;
pub mod messages;
pub mod report;
pub mod router;
pub mod stores;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;
use timeclock_core::errors::ApplicationError;
use timeclock_db::RepositoryError;

pub use alert::AlertDispatcher;
pub use router::{ConversationRouter, Turn};
pub use stores::Stores;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<AssistantError> for ApplicationError {
    fn from(error: AssistantError) -> Self {
        match error {
            AssistantError::Repository(error) => Self::Persistence(error.to_string()),
        }
    }
}
