//! Shared fixtures for the flow tests.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use timeclock_core::calendar::YearMonth;
use timeclock_core::domain::attendance::{PunchRecord, PunchType};
use timeclock_core::domain::user::{Role, User, UserId};
use timeclock_core::messaging::{OutboundMessage, RecordingMessenger};
use timeclock_db::{AttendanceRepository, UserRepository};

use crate::stores::Stores;

pub const ADMIN_ID: UserId = UserId(1);
pub const MANAGER_ID: UserId = UserId(2);
pub const EMPLOYEE_ID: UserId = UserId(3);
pub const SOLO_MANAGER_ID: UserId = UserId(5);

pub const ADMIN: &str = "U-admin";
pub const MANAGER: &str = "U-manager";
pub const EMPLOYEE: &str = "U-emi";
pub const SOLO_MANAGER: &str = "U-solo";

fn user(
    id: i64,
    messaging_id: Option<&str>,
    name: &str,
    role: Role,
    manager_id: Option<i64>,
    org_code: &str,
) -> User {
    User {
        id: UserId(id),
        messaging_id: messaging_id.map(str::to_owned),
        name: name.to_owned(),
        role,
        manager_id: manager_id.map(UserId),
        org_code: Some(org_code.to_owned()),
    }
}

/// Admin (1) over org HQ; manager 2 with reports 3 and 4; manager 5 in org
/// BR with a single report 6 that has no messaging identity.
pub async fn stores_with_users() -> (Stores, RecordingMessenger) {
    let messenger = RecordingMessenger::default();
    let stores = Stores::in_memory(Arc::new(messenger.clone()));

    let users = [
        user(1, Some(ADMIN), "Aiko Admin", Role::Admin, None, "HQ"),
        user(2, Some(MANAGER), "Mika Manager", Role::Manager, Some(1), "HQ"),
        user(3, Some(EMPLOYEE), "Emi Employee", Role::Employee, Some(2), "HQ"),
        user(4, Some("U-ken"), "Ken Employee", Role::Employee, Some(2), "HQ"),
        user(5, Some(SOLO_MANAGER), "Sol Manager", Role::Manager, None, "BR"),
        user(6, None, "Tao Employee", Role::Employee, Some(5), "BR"),
    ];
    for user in users {
        stores.users.save(user).await.expect("save user");
    }

    (stores, messenger)
}

pub fn at(year: i32, month: u32, day: u32, time: &str) -> NaiveDateTime {
    let date = NaiveDate::from_ymd_opt(year, month, day).expect("date");
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S").expect("time");
    date.and_time(time)
}

pub fn june() -> YearMonth {
    YearMonth::new(2024, 6).expect("month")
}

pub async fn punch(
    stores: &Stores,
    user_id: UserId,
    punch_type: PunchType,
    punched_at: NaiveDateTime,
) {
    let record = PunchRecord {
        user_id,
        punch_type,
        day: punched_at.date(),
        punched_at: Some(punched_at),
        edited: false,
    };
    stores.attendance.save(record).await.expect("save punch");
}

/// Text of every reply sent since the last call.
pub fn replies(messenger: &RecordingMessenger) -> Vec<String> {
    messenger
        .take()
        .into_iter()
        .filter_map(|message| match message {
            OutboundMessage::Reply { text, .. } => Some(text),
            _ => None,
        })
        .collect()
}
