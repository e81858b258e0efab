//! Every text the assistant sends to employees.

use chrono::NaiveDateTime;

use timeclock_core::calendar;
use timeclock_core::domain::attendance::PunchType;

pub const SELECT_MENU: &str = "Please choose an item from the menu.";
pub const NOT_REGISTERED: &str =
    "This account is not registered yet. Ask an administrator to link it.";

pub const ALREADY_PUNCHED_IN: &str = "You have already punched in today.";
pub const PUNCH_IN_AFTER_PUNCH_OUT: &str =
    "You have already punched out today, so you cannot punch in again.";
pub const ALREADY_PUNCHED_OUT: &str = "You have already punched out today.";
pub const FORGOT_PUNCH_IN: &str =
    "No punch-in was recorded today. Please correct it from the Edit menu.";

pub const PROMPT_YEAR_MONTH: &str = "Which month do you want to see? (e.g. 202406)";
pub const SELECT_USER_TITLE: &str = "Whose attendance do you want to see?";
pub const NO_ATTENDANCE: &str = "No attendance found.";

pub const PROMPT_MONTH_DAY: &str = "Which day do you want to correct? (e.g. 0615)";
pub const SELECT_PUNCH_TYPE_TITLE: &str = "Which punch do you want to correct?";
pub const NOT_YET_ENTERED: &str = "not yet entered";

pub const EDITED_MARKER: &str = "*";

pub fn punched_in(at: NaiveDateTime) -> String {
    format!("Punched in at {}.", calendar::format_time(at))
}

pub fn punched_out(at: NaiveDateTime) -> String {
    format!("Punched out at {}.", calendar::format_time(at))
}

pub fn current_value(punch_type: PunchType, value: &str) -> String {
    format!("Current {}: {value}", punch_type.label())
}

pub fn prompt_new_time(punch_type: PunchType) -> String {
    format!("Enter the new {} time. (e.g. 0905)", punch_type.label())
}

pub fn correction_saved(punch_type: PunchType, at: NaiveDateTime) -> String {
    format!("{} saved as {}.", punch_type.label(), calendar::format_month_day_time(at))
}

pub fn missing_punch_reminder(punch_type: PunchType) -> String {
    match punch_type {
        PunchType::Arrival => "You have not punched in yet today.".to_owned(),
        PunchType::Departure => "You have not punched out yet today.".to_owned(),
    }
}
