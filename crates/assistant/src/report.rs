//! Month report text and the month-wide attendance listing.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use timeclock_core::calendar::{self, YearMonth};
use timeclock_core::domain::attendance::{DayAttendance, PunchRecord, PunchType};
use timeclock_core::domain::settings::AttendanceSettings;
use timeclock_core::domain::user::UserId;
use timeclock_db::{AttendanceRepository, SettingsRepository, UserRepository};

use crate::messages;
use crate::stores::Stores;
use crate::AssistantError;

#[derive(Default)]
struct DayLine<'a> {
    arrival: Option<&'a PunchRecord>,
    departure: Option<&'a PunchRecord>,
}

/// Renders `"{name} {yyyy/M}"` followed by one line per day that has a
/// punch, ascending. Records without a timestamp are skipped.
pub fn render_report(
    name: &str,
    month: YearMonth,
    records: &[PunchRecord],
    settings: &AttendanceSettings,
) -> String {
    let mut days: BTreeMap<NaiveDate, DayLine<'_>> = BTreeMap::new();
    for record in records.iter().filter(|record| record.is_punched()) {
        let line = days.entry(record.day).or_default();
        match record.punch_type {
            PunchType::Arrival => line.arrival = Some(record),
            PunchType::Departure => line.departure = Some(record),
        }
    }

    let mut report = format!("{name} {month}\n");
    if days.is_empty() {
        report.push_str(messages::NO_ATTENDANCE);
        return report;
    }

    for (day, line) in &days {
        report.push_str(&calendar::format_short_date(*day));
        report.push(' ');
        push_punch(&mut report, line.arrival);
        report.push('～');
        push_punch(&mut report, line.departure);

        let remarks: Vec<&str> = [line.arrival, line.departure]
            .into_iter()
            .flatten()
            .filter_map(|record| calendar::classify(record, settings))
            .map(|remark| remark.label())
            .collect();
        if !remarks.is_empty() {
            report.push(' ');
            report.push_str(&remarks.join(", "));
        }
        report.push('\n');
    }

    report
}

fn push_punch(report: &mut String, record: Option<&PunchRecord>) {
    let Some(record) = record else {
        return;
    };
    if let Some(punched_at) = record.punched_at {
        report.push_str(&calendar::format_time(punched_at));
    }
    if record.edited {
        report.push_str(messages::EDITED_MARKER);
    }
}

/// Report for one user. An unknown user id yields the not-found message.
pub async fn render_month_report(
    stores: &Stores,
    user_id: UserId,
    month: YearMonth,
) -> Result<String, AssistantError> {
    let Some(user) = stores.users.find_by_id(user_id).await? else {
        return Ok(messages::NO_ATTENDANCE.to_owned());
    };

    let settings = stores.settings.get().await?;
    let records = stores.attendance.list_month(user.id, month).await?;
    Ok(render_report(&user.name, month, &records, &settings))
}

/// Every user's punches for `month`, one entry per (user, day).
pub async fn day_attendance_list(
    attendance: &dyn AttendanceRepository,
    month: YearMonth,
) -> Result<Vec<DayAttendance>, AssistantError> {
    let records = attendance.list_month_all(month).await?;

    let mut days: BTreeMap<(UserId, NaiveDate), DayAttendance> = BTreeMap::new();
    for record in records {
        let entry = days.entry((record.user_id, record.day)).or_insert_with(|| DayAttendance {
            user_id: record.user_id,
            day: record.day,
            arrival: None,
            departure: None,
        });
        match record.punch_type {
            PunchType::Arrival => entry.arrival = record.punched_at,
            PunchType::Departure => entry.departure = record.punched_at,
        }
    }

    Ok(days.into_values().collect())
}
