//! Wall-clock arithmetic for attendance.
//!
//! Every timestamp handled by the assistant is a naive local time in the one
//! process-wide zone configured by `attendance.utc_offset_minutes`. Nothing in
//! this module takes a zone argument; [`WallClock`] is the only place where
//! UTC instants are turned into local wall-clock time.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::attendance::{PunchRecord, PunchType};
use crate::domain::settings::AttendanceSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        ((1..=9999).contains(&year) && (1..=12).contains(&month)).then_some(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Storage key, `yyyyMM`.
    pub fn key(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        if key.len() != 6 {
            return None;
        }
        Self::new(digits(key.get(..4)?)? as i32, digits(key.get(4..)?)?)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.year, self.month)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonthDay {
    month: u32,
    day: u32,
}

impl MonthDay {
    /// Validated against `year`, so Feb 29 is only accepted in leap years.
    pub fn new(month: u32, day: u32, year: i32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(|_| Self { month, day })
    }

    /// Storage key, `MMdd`.
    pub fn key(&self) -> String {
        format!("{:02}{:02}", self.month, self.day)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        if key.len() != 4 {
            return None;
        }
        // 2000 is a leap year, so any real calendar day decodes.
        Self::new(digits(key.get(..2)?)?, digits(key.get(2..)?)?, 2000)
    }

    pub fn in_year(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
    }
}

/// Special marks rendered next to a day's punches in the month report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PunchRemark {
    Late,
    HolidayWork,
    EarlyLeave,
}

impl PunchRemark {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Late => "Late",
            Self::HolidayWork => "Holiday work",
            Self::EarlyLeave => "Early leave",
        }
    }
}

pub fn is_business_day(date: NaiveDate, settings: &AttendanceSettings) -> bool {
    settings.business_days.contains(&date.weekday())
}

/// Late when punched strictly after open time plus leeway on a business day;
/// any arrival on a non-business day is holiday work.
pub fn classify_arrival(
    record: &PunchRecord,
    settings: &AttendanceSettings,
) -> Option<PunchRemark> {
    let punched_at = record.punched_at?;
    if !is_business_day(record.day, settings) {
        return Some(PunchRemark::HolidayWork);
    }
    (punched_at > settings.open.on(record.day)).then_some(PunchRemark::Late)
}

/// Early leave when punched strictly before close time plus leeway on a
/// business day. Non-business days never flag.
pub fn classify_departure(
    record: &PunchRecord,
    settings: &AttendanceSettings,
) -> Option<PunchRemark> {
    let punched_at = record.punched_at?;
    if !is_business_day(record.day, settings) {
        return None;
    }
    (punched_at < settings.close.on(record.day)).then_some(PunchRemark::EarlyLeave)
}

pub fn classify(record: &PunchRecord, settings: &AttendanceSettings) -> Option<PunchRemark> {
    match record.punch_type {
        PunchType::Arrival => classify_arrival(record, settings),
        PunchType::Departure => classify_departure(record, settings),
    }
}

/// Accepts `yyyyMM`, `yyyy/M` or `yyyy-M`.
pub fn parse_year_month(text: &str) -> Option<YearMonth> {
    let text = text.trim();
    match split_pair(text) {
        Some((year, month)) if year.len() == 4 && (1..=2).contains(&month.len()) => {
            YearMonth::new(digits(year)? as i32, digits(month)?)
        }
        Some(_) => None,
        None => YearMonth::from_key(text),
    }
}

/// Accepts `MMdd` or `M/d`, validated against `year`.
pub fn parse_month_day(text: &str, year: i32) -> Option<MonthDay> {
    let text = text.trim();
    match split_pair(text) {
        Some((month, day)) if (1..=2).contains(&month.len()) && (1..=2).contains(&day.len()) => {
            MonthDay::new(digits(month)?, digits(day)?, year)
        }
        Some(_) => None,
        None if text.len() == 4 => {
            MonthDay::new(digits(text.get(..2)?)?, digits(text.get(2..)?)?, year)
        }
        None => None,
    }
}

/// Accepts `HHmm`, `H:mm` or `HH:mm`.
pub fn parse_hour_minute(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    let (hour, minute) = match text.split_once(':') {
        Some((hour, minute)) if (1..=2).contains(&hour.len()) && minute.len() == 2 => {
            (digits(hour)?, digits(minute)?)
        }
        Some(_) => return None,
        None if text.len() == 4 => (digits(text.get(..2)?)?, digits(text.get(2..)?)?),
        None => return None,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Storage key for a calendar day, `yyyyMMdd`.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    if key.len() != 8 {
        return None;
    }
    NaiveDate::from_ymd_opt(
        digits(key.get(..4)?)? as i32,
        digits(key.get(4..6)?)?,
        digits(key.get(6..)?)?,
    )
}

/// `HH:mm`
pub fn format_time(at: NaiveDateTime) -> String {
    at.format("%H:%M").to_string()
}

/// `MM/dd HH:mm`
pub fn format_month_day_time(at: NaiveDateTime) -> String {
    at.format("%m/%d %H:%M").to_string()
}

/// `M/d`
pub fn format_short_date(date: NaiveDate) -> String {
    format!("{}/{}", date.month(), date.day())
}

/// Converts UTC instants to the process-wide wall clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WallClock {
    offset: FixedOffset,
}

impl WallClock {
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(|offset| Self { offset })
    }

    pub fn local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.offset).naive_local()
    }

    pub fn now(&self) -> NaiveDateTime {
        self.local(Utc::now())
    }
}

fn split_pair(text: &str) -> Option<(&str, &str)> {
    text.split_once('/').or_else(|| text.split_once('-'))
}

fn digits(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
