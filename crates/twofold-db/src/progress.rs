//! Point, streak and daily slot rules. Pure functions; the store applies
//! their results inside its own transactions.

use chrono::NaiveDate;
use twofold_types::models::{AnswerSource, CoupleState};

/// Awarded when the other partner has not answered the question yet.
pub const FIRST_ANSWER_POINTS: i64 = 1;
/// Awarded for the answer that completes the pair.
pub const COMPLETING_ANSWER_POINTS: i64 = 5;

pub fn points_for_answer(other_partner_answered: bool) -> i64 {
    if other_partner_answered {
        COMPLETING_ANSWER_POINTS
    } else {
        FIRST_ANSWER_POINTS
    }
}

/// The streak after earning points on `today`, given when it last moved.
///
/// Unchanged if it already moved today, extended if it moved yesterday,
/// otherwise restarted at one.
pub fn advance_streak(streak: i64, last_update: Option<NaiveDate>, today: NaiveDate) -> i64 {
    match last_update {
        Some(last) if last == today => streak,
        Some(last) if Some(last) == today.pred_opt() => streak + 1,
        _ => 1,
    }
}

/// Changes to apply to the couple state. Points are added; every other
/// field is overwritten when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoupleStateDelta {
    pub add_points: i64,
    pub streak_count: Option<i64>,
    pub last_streak_update_date: Option<NaiveDate>,
    pub daily_progress_date: Option<NaiveDate>,
    pub daily_random_answered: Option<bool>,
    pub daily_manual_answered: Option<bool>,
}

impl CoupleStateDelta {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, state: &CoupleState) -> CoupleState {
        CoupleState {
            love_points: state.love_points + self.add_points,
            streak_count: self.streak_count.unwrap_or(state.streak_count),
            last_streak_update_date: self
                .last_streak_update_date
                .or(state.last_streak_update_date),
            daily_progress_date: self.daily_progress_date.or(state.daily_progress_date),
            daily_random_answered: self
                .daily_random_answered
                .unwrap_or(state.daily_random_answered),
            daily_manual_answered: self
                .daily_manual_answered
                .unwrap_or(state.daily_manual_answered),
        }
    }
}

/// Clear both slots and move the progress date to `today`, unless the
/// state already tracks today.
pub fn rollover_delta(state: &CoupleState, today: NaiveDate) -> CoupleStateDelta {
    if state.daily_progress_date == Some(today) {
        return CoupleStateDelta::default();
    }
    CoupleStateDelta {
        daily_progress_date: Some(today),
        daily_random_answered: Some(false),
        daily_manual_answered: Some(false),
        ..CoupleStateDelta::default()
    }
}

/// Everything an answer worth `awarded` points changes on `today`.
pub fn answer_delta(
    state: &CoupleState,
    awarded: i64,
    source: AnswerSource,
    today: NaiveDate,
) -> CoupleStateDelta {
    let mut delta = rollover_delta(state, today);
    delta.add_points = awarded;

    if awarded > 0 && state.last_streak_update_date != Some(today) {
        delta.streak_count = Some(advance_streak(
            state.streak_count,
            state.last_streak_update_date,
            today,
        ));
        delta.last_streak_update_date = Some(today);
    }

    match source {
        AnswerSource::Random => delta.daily_random_answered = Some(true),
        AnswerSource::Manual => delta.daily_manual_answered = Some(true),
    }

    delta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn state(streak: i64, last: u32, progress: Option<u32>) -> CoupleState {
        CoupleState {
            love_points: 10,
            streak_count: streak,
            last_streak_update_date: Some(day(last)),
            daily_progress_date: progress.map(day),
            daily_random_answered: progress.is_some(),
            daily_manual_answered: false,
        }
    }

    #[test]
    fn completing_answer_is_worth_more() {
        assert_eq!(points_for_answer(false), 1);
        assert_eq!(points_for_answer(true), 5);
    }

    #[test]
    fn streak_extends_from_yesterday() {
        assert_eq!(advance_streak(3, Some(day(9)), day(10)), 4);
    }

    #[test]
    fn streak_holds_on_same_day() {
        assert_eq!(advance_streak(3, Some(day(10)), day(10)), 3);
    }

    #[test]
    fn streak_restarts_after_gap() {
        assert_eq!(advance_streak(7, Some(day(2)), day(10)), 1);
        assert_eq!(advance_streak(0, None, day(10)), 1);
    }

    #[test]
    fn streak_extends_across_month_boundary() {
        let last = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(advance_streak(2, Some(last), day(1)), 3);
    }

    #[test]
    fn rollover_is_noop_on_same_day() {
        assert!(rollover_delta(&state(1, 10, Some(10)), day(10)).is_empty());
    }

    #[test]
    fn rollover_clears_flags_on_new_day() {
        let before = state(1, 9, Some(9));
        let after = rollover_delta(&before, day(10)).apply(&before);

        assert_eq!(after.daily_progress_date, Some(day(10)));
        assert!(!after.daily_random_answered);
        assert!(!after.daily_manual_answered);
        assert_eq!(after.love_points, before.love_points);
    }

    #[test]
    fn first_award_of_day_moves_streak_and_marks_slot() {
        let before = state(2, 9, Some(9));
        let after = answer_delta(&before, 1, AnswerSource::Manual, day(10)).apply(&before);

        assert_eq!(after.love_points, 11);
        assert_eq!(after.streak_count, 3);
        assert_eq!(after.last_streak_update_date, Some(day(10)));
        assert!(after.daily_manual_answered);
        assert!(!after.daily_random_answered);
    }

    #[test]
    fn second_award_of_day_keeps_streak() {
        let before = state(3, 10, Some(10));
        let delta = answer_delta(&before, 5, AnswerSource::Random, day(10));

        assert_eq!(delta.streak_count, None);
        assert_eq!(delta.last_streak_update_date, None);
        let after = delta.apply(&before);
        assert_eq!(after.love_points, 15);
        assert_eq!(after.streak_count, 3);
        assert!(after.daily_random_answered);
    }
}
