use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{self, MonthDay, YearMonth};
use crate::domain::attendance::PunchType;

/// Where an identity is in its conversation. Each multi-turn flow owns a
/// closed set of steps, and each step carries the data collected so far.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationState {
    Idle,
    List(ListStep),
    Edit(EditStep),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListStep {
    AwaitMonth,
    AwaitUserSelection { month: YearMonth },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditStep {
    AwaitDate,
    AwaitType { month_day: MonthDay },
    AwaitTime { punch_type: PunchType, day: NaiveDate },
}

const LIST_AWAIT_MONTH: &str = "list.await_month";
const LIST_AWAIT_USER_SELECTION: &str = "list.await_user_selection";
const EDIT_AWAIT_DATE: &str = "edit.await_date";
const EDIT_AWAIT_TYPE: &str = "edit.await_type";
const EDIT_AWAIT_TIME_ARRIVAL: &str = "edit.await_time_arrival";
const EDIT_AWAIT_TIME_DEPARTURE: &str = "edit.await_time_departure";

impl ConversationState {
    /// Decodes the stored `(action, contents)` pair. Unknown action codes or
    /// contents that no longer parse fall back to `Idle`.
    pub fn decode(action: Option<&str>, contents: Option<&str>) -> Self {
        let Some(action) = action.map(str::trim).filter(|action| !action.is_empty()) else {
            return Self::Idle;
        };
        let contents = contents.unwrap_or_default();

        let decoded = match action {
            LIST_AWAIT_MONTH => Some(Self::List(ListStep::AwaitMonth)),
            LIST_AWAIT_USER_SELECTION => YearMonth::from_key(contents)
                .map(|month| Self::List(ListStep::AwaitUserSelection { month })),
            EDIT_AWAIT_DATE => Some(Self::Edit(EditStep::AwaitDate)),
            EDIT_AWAIT_TYPE => MonthDay::from_key(contents)
                .map(|month_day| Self::Edit(EditStep::AwaitType { month_day })),
            EDIT_AWAIT_TIME_ARRIVAL => calendar::parse_day_key(contents).map(|day| {
                Self::Edit(EditStep::AwaitTime { punch_type: PunchType::Arrival, day })
            }),
            EDIT_AWAIT_TIME_DEPARTURE => calendar::parse_day_key(contents).map(|day| {
                Self::Edit(EditStep::AwaitTime { punch_type: PunchType::Departure, day })
            }),
            _ => None,
        };

        decoded.unwrap_or(Self::Idle)
    }

    pub fn encode(&self) -> (Option<&'static str>, Option<String>) {
        match self {
            Self::Idle => (None, None),
            Self::List(ListStep::AwaitMonth) => (Some(LIST_AWAIT_MONTH), None),
            Self::List(ListStep::AwaitUserSelection { month }) => {
                (Some(LIST_AWAIT_USER_SELECTION), Some(month.key()))
            }
            Self::Edit(EditStep::AwaitDate) => (Some(EDIT_AWAIT_DATE), None),
            Self::Edit(EditStep::AwaitType { month_day }) => {
                (Some(EDIT_AWAIT_TYPE), Some(month_day.key()))
            }
            Self::Edit(EditStep::AwaitTime { punch_type, day }) => {
                let action = match punch_type {
                    PunchType::Arrival => EDIT_AWAIT_TIME_ARRIVAL,
                    PunchType::Departure => EDIT_AWAIT_TIME_DEPARTURE,
                };
                (Some(action), Some(calendar::day_key(*day)))
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
