use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};
use twofold_types::models::{AnswerSource, CoupleState, Partner};

use crate::Database;
use crate::error::Result;
use crate::models::format_date;
use crate::progress::{advance_streak, answer_delta, points_for_answer};
use crate::queries::{answer_exists, find_or_create_question, insert_answer, query_user};
use crate::state;

/// One partner's answer to a question, as the app layer hands it over.
#[derive(Debug, Clone)]
pub struct AnswerSubmission {
    pub user: Partner,
    pub question_text: String,
    pub source: AnswerSource,
    pub audio_ref: String,
    pub timestamp: DateTime<Utc>,
    /// Calendar day the answer counts towards.
    pub today: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub question_id: i64,
    pub points_awarded: i64,
    pub state: CoupleState,
}

impl Database {
    /// Record an answer and everything it earns, atomically: the question
    /// (created if new), the answer row, the couple's points, streak and
    /// daily slot, and the answering partner's own tally.
    pub fn submit_answer(&self, submission: &AnswerSubmission) -> Result<AnswerOutcome> {
        let AnswerSubmission {
            user,
            question_text,
            source,
            audio_ref,
            timestamp,
            today,
        } = submission;
        let (user, today) = (*user, *today);

        let outcome = self.with_tx(|tx| {
            let question_id = find_or_create_question(tx, question_text, *timestamp)?;
            insert_answer(tx, question_id, user, audio_ref, *timestamp)?;

            let awarded = points_for_answer(answer_exists(tx, question_id, user.other())?);
            debug!(
                "Question {}: {} earns {} point(s)",
                question_id, user, awarded
            );

            let current = state::load(tx)?;
            let next = answer_delta(&current, awarded, *source, today).apply(&current);
            state::store(tx, &next)?;

            let tally = query_user(tx, user)?;
            let streak = advance_streak(tally.streak, tally.last_answer_date, today);
            tx.execute(
                "UPDATE Users SET points = ?1, streak = ?2, last_answer_date = ?3 WHERE id = ?4",
                rusqlite::params![
                    tally.points + awarded,
                    streak,
                    format_date(today),
                    user.as_str()
                ],
            )?;

            Ok(AnswerOutcome {
                question_id,
                points_awarded: awarded,
                state: next,
            })
        })?;

        info!(
            "Answer saved: question={} user={} points={} streak={}",
            outcome.question_id, user, outcome.state.love_points, outcome.state.streak_count
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn submission(user: Partner, text: &str, source: AnswerSource, d: u32) -> AnswerSubmission {
        AnswerSubmission {
            user,
            question_text: text.to_string(),
            source,
            audio_ref: format!("{user}-{d}.webm"),
            timestamp: Utc.with_ymd_and_hms(2024, 6, d, 20, 0, 0).unwrap(),
            today: day(d),
        }
    }

    fn db(seed_day: u32) -> Database {
        let db = Database::from_connection(rusqlite::Connection::open_in_memory().unwrap())
            .unwrap();
        db.initialize(day(seed_day)).unwrap();
        db
    }

    #[test]
    fn pair_of_answers_earns_one_then_five() {
        let db = db(1);

        let first = db
            .submit_answer(&submission(Partner::Partner1, "Best trip?", AnswerSource::Random, 1))
            .unwrap();
        assert_eq!(first.points_awarded, 1);
        assert_eq!(first.state.love_points, 1);
        assert_eq!(first.state.streak_count, 1);
        assert!(first.state.daily_random_answered);

        let second = db
            .submit_answer(&submission(Partner::Partner2, "Best trip?", AnswerSource::Random, 1))
            .unwrap();
        assert_eq!(second.question_id, first.question_id);
        assert_eq!(second.points_awarded, 5);
        assert_eq!(second.state.love_points, 6);
        assert_eq!(second.state.streak_count, 1);

        assert_eq!(db.user(Partner::Partner1).unwrap().points, 1);
        assert_eq!(db.user(Partner::Partner2).unwrap().points, 5);
    }

    #[test]
    fn padded_question_text_pairs_with_the_plain_one() {
        let db = db(1);

        let first = db
            .submit_answer(&submission(Partner::Partner1, "Q ", AnswerSource::Random, 1))
            .unwrap();
        let second = db
            .submit_answer(&submission(Partner::Partner2, "Q", AnswerSource::Random, 1))
            .unwrap();

        assert_eq!(second.question_id, first.question_id);
        assert_eq!(second.points_awarded, 5);
        assert_eq!(db.questions().unwrap().len(), 1);
    }

    #[test]
    fn consecutive_days_extend_streak_and_reset_slots() {
        let db = db(1);

        db.submit_answer(&submission(Partner::Partner1, "Q1", AnswerSource::Manual, 1))
            .unwrap();
        let next = db
            .submit_answer(&submission(Partner::Partner1, "Q2", AnswerSource::Random, 2))
            .unwrap();

        assert_eq!(next.state.streak_count, 2);
        assert_eq!(next.state.daily_progress_date, Some(day(2)));
        assert!(next.state.daily_random_answered);
        assert!(!next.state.daily_manual_answered);

        let user = db.user(Partner::Partner1).unwrap();
        assert_eq!(user.streak, 2);
        assert_eq!(user.last_answer_date, Some(day(2)));
    }

    #[test]
    fn missed_day_restarts_streak() {
        let db = db(1);

        db.submit_answer(&submission(Partner::Partner1, "Q1", AnswerSource::Manual, 1))
            .unwrap();
        db.submit_answer(&submission(Partner::Partner2, "Q2", AnswerSource::Manual, 2))
            .unwrap();
        let later = db
            .submit_answer(&submission(Partner::Partner1, "Q3", AnswerSource::Manual, 5))
            .unwrap();

        assert_eq!(later.state.streak_count, 1);
    }

    #[test]
    fn rejected_submission_changes_nothing() {
        let db = db(1);
        db.submit_answer(&submission(Partner::Partner1, "Q1", AnswerSource::Random, 1))
            .unwrap();
        let state_before = db.couple_state().unwrap();

        let err = db
            .submit_answer(&submission(Partner::Partner1, "Q1", AnswerSource::Manual, 1))
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)), "{err:?}");
        assert_eq!(db.couple_state().unwrap(), state_before);
        assert_eq!(db.user(Partner::Partner1).unwrap().points, 1);

        let mut blank_audio = submission(Partner::Partner2, "Brand new?", AnswerSource::Random, 1);
        blank_audio.audio_ref.clear();
        assert!(db.submit_answer(&blank_audio).is_err());
        assert!(db.question_by_text("Brand new?").unwrap().is_none());
    }
}
