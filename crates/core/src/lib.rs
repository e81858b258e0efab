//! Domain model for the time-clock assistant: employees, punch records,
//! attendance settings, conversation state and the wall-clock helpers
//! shared by every other crate.

pub mod calendar;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod messaging;

pub use calendar::{MonthDay, PunchRemark, WallClock, YearMonth};
pub use domain::attendance::{DayAttendance, PunchRecord, PunchType};
pub use domain::session::Session;
pub use domain::settings::{AttendanceSettings, ClockThreshold};
pub use domain::user::{Role, User, UserId};
pub use errors::{ApplicationError, DomainError, InterfaceError, InterfaceErrorKind};
pub use flows::{ConversationState, EditStep, ListStep, MenuCommand};
pub use messaging::{Messenger, OutboundMessage, RecordingMessenger};
