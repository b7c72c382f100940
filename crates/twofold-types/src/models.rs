use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the two people sharing the app. The set is closed: the store
/// rejects any other identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partner {
    Partner1,
    Partner2,
}

impl Partner {
    pub const ALL: [Partner; 2] = [Partner::Partner1, Partner::Partner2];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Partner1 => "partner1",
            Self::Partner2 => "partner2",
        }
    }

    /// The partner who is not `self`.
    pub fn other(self) -> Partner {
        match self {
            Self::Partner1 => Self::Partner2,
            Self::Partner2 => Self::Partner1,
        }
    }
}

impl fmt::Display for Partner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown user identifier '{0}'")]
pub struct UnknownPartner(pub String);

impl FromStr for Partner {
    type Err = UnknownPartner;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "partner1" => Ok(Self::Partner1),
            "partner2" => Ok(Self::Partner2),
            other => Err(UnknownPartner(other.to_string())),
        }
    }
}

/// Which daily slot an answer fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    Random,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown answer source '{0}'")]
pub struct UnknownSource(pub String);

impl FromStr for AnswerSource {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(Self::Random),
            "manual" => Ok(Self::Manual),
            other => Err(UnknownSource(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Partner,
    pub points: i64,
    pub streak: i64,
    pub last_answer_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub text: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A recorded answer. The store only keeps a reference to the audio,
/// never the audio itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: i64,
    pub user_id: Partner,
    pub audio_ref: String,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate progress shared by the couple. Exactly one of these exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoupleState {
    pub love_points: i64,
    pub streak_count: i64,
    pub last_streak_update_date: Option<NaiveDate>,
    pub daily_progress_date: Option<NaiveDate>,
    pub daily_random_answered: bool,
    pub daily_manual_answered: bool,
}

impl CoupleState {
    /// The state as it should be reported on `today`: slot flags recorded
    /// on an earlier day no longer count.
    pub fn as_of(&self, today: NaiveDate) -> CoupleState {
        let current = self.daily_progress_date == Some(today);
        CoupleState {
            daily_random_answered: current && self.daily_random_answered,
            daily_manual_answered: current && self.daily_manual_answered,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partner_parses_only_known_ids() {
        assert_eq!("partner1".parse::<Partner>(), Ok(Partner::Partner1));
        assert_eq!("partner2".parse::<Partner>(), Ok(Partner::Partner2));
        assert!("Partner1".parse::<Partner>().is_err());
        assert!("nobody".parse::<Partner>().is_err());
    }

    #[test]
    fn other_partner_is_symmetric() {
        for p in Partner::ALL {
            assert_ne!(p, p.other());
            assert_eq!(p, p.other().other());
        }
    }

    #[test]
    fn stale_daily_flags_are_masked() {
        let yesterday = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let state = CoupleState {
            love_points: 6,
            streak_count: 2,
            last_streak_update_date: Some(yesterday),
            daily_progress_date: Some(yesterday),
            daily_random_answered: true,
            daily_manual_answered: true,
        };

        let seen = state.as_of(today);
        assert!(!seen.daily_random_answered);
        assert!(!seen.daily_manual_answered);
        assert_eq!(seen.love_points, 6);

        assert_eq!(state.as_of(yesterday), state);
    }
}
