use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// A wall-clock time plus a leeway in minutes, e.g. "09:00 + 15".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockThreshold {
    pub time: NaiveTime,
    pub leeway_minutes: u32,
}

impl ClockThreshold {
    pub fn new(hour: u32, minute: u32, leeway_minutes: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(|time| Self { time, leeway_minutes })
    }

    /// The absolute instant this threshold falls on for `day`.
    pub fn on(&self, day: NaiveDate) -> NaiveDateTime {
        day.and_time(self.time) + Duration::minutes(i64::from(self.leeway_minutes))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSettings {
    pub alert_enabled: bool,
    pub arrival_alert: ClockThreshold,
    pub departure_alert: ClockThreshold,
    pub open: ClockThreshold,
    pub close: ClockThreshold,
    pub business_days: Vec<Weekday>,
}

impl Default for AttendanceSettings {
    fn default() -> Self {
        Self {
            alert_enabled: false,
            arrival_alert: threshold(9, 30),
            departure_alert: threshold(20, 0),
            open: threshold(9, 0),
            close: threshold(18, 0),
            business_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }
}

fn threshold(hour: u32, minute: u32) -> ClockThreshold {
    ClockThreshold {
        time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN),
        leeway_minutes: 0,
    }
}

/// Comma separated storage form, e.g. `mon,tue,wed`.
pub fn encode_business_days(days: &[Weekday]) -> String {
    days.iter().map(|day| weekday_code(*day)).collect::<Vec<_>>().join(",")
}

pub fn decode_business_days(code: &str) -> Result<Vec<Weekday>, DomainError> {
    code.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            parse_weekday(token).ok_or_else(|| DomainError::UnknownCode {
                kind: "weekday",
                code: token.to_string(),
            })
        })
        .collect()
}

fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

fn parse_weekday(token: &str) -> Option<Weekday> {
    match token.to_ascii_lowercase().as_str() {
        "mon" => Some(Weekday::Mon),
        "tue" => Some(Weekday::Tue),
        "wed" => Some(Weekday::Wed),
        "thu" => Some(Weekday::Thu),
        "fri" => Some(Weekday::Fri),
        "sat" => Some(Weekday::Sat),
        "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Weekday};

    use super::{decode_business_days, encode_business_days, ClockThreshold};

    #[test]
    fn threshold_adds_leeway_to_wall_clock_time() {
        let threshold = ClockThreshold::new(9, 0, 15).expect("threshold");
        let day = NaiveDate::from_ymd_opt(2024, 6, 3).expect("date");
        assert_eq!(threshold.on(day).format("%Y-%m-%d %H:%M").to_string(), "2024-06-03 09:15");
    }

    #[test]
    fn business_days_storage_form() {
        let days = vec![Weekday::Mon, Weekday::Sat];
        assert_eq!(encode_business_days(&days), "mon,sat");
        assert_eq!(decode_business_days(" MON, sat ,").expect("decode"), days);
        assert!(decode_business_days("mon,someday").is_err());
    }
}
