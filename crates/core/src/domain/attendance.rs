use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PunchType {
    Arrival,
    Departure,
}

impl PunchType {
    pub const ALL: [PunchType; 2] = [PunchType::Arrival, PunchType::Departure];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arrival => "arrival",
            Self::Departure => "departure",
        }
    }

    /// Button label shown to employees; postbacks come back as this text.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Arrival => "Arrival",
            Self::Departure => "Departure",
        }
    }

    pub fn from_label(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::ALL.into_iter().find(|punch_type| punch_type.label().eq_ignore_ascii_case(text))
    }
}

impl std::str::FromStr for PunchType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "arrival" => Ok(Self::Arrival),
            "departure" => Ok(Self::Departure),
            other => Err(DomainError::UnknownCode { kind: "punch type", code: other.to_string() }),
        }
    }
}

/// One punch slot, keyed by (user, type, day). `punched_at` stays `None`
/// until the employee punches or a correction is saved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunchRecord {
    pub user_id: UserId,
    pub punch_type: PunchType,
    pub day: NaiveDate,
    pub punched_at: Option<NaiveDateTime>,
    pub edited: bool,
}

impl PunchRecord {
    pub fn empty(user_id: UserId, punch_type: PunchType, day: NaiveDate) -> Self {
        Self { user_id, punch_type, day, punched_at: None, edited: false }
    }

    pub fn is_punched(&self) -> bool {
        self.punched_at.is_some()
    }
}

/// All punches of one user on one day, used by month-wide listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DayAttendance {
    pub user_id: UserId,
    pub day: NaiveDate,
    pub arrival: Option<NaiveDateTime>,
    pub departure: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{PunchRecord, PunchType};
    use crate::domain::user::UserId;

    #[test]
    fn punch_type_matches_button_labels_loosely() {
        assert_eq!(PunchType::from_label(" arrival "), Some(PunchType::Arrival));
        assert_eq!(PunchType::from_label("DEPARTURE"), Some(PunchType::Departure));
        assert_eq!(PunchType::from_label("lunch"), None);
    }

    #[test]
    fn storage_codes_are_strict() {
        assert_eq!("departure".parse::<PunchType>().expect("code"), PunchType::Departure);
        assert!("Departure".parse::<PunchType>().is_err());
    }

    #[test]
    fn empty_record_is_not_punched() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 3).expect("date");
        let record = PunchRecord::empty(UserId(1), PunchType::Arrival, day);
        assert!(!record.is_punched());
        assert!(!record.edited);
    }
}
