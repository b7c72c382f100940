//! Accessors for the `CoupleState` singleton. Nothing else in the crate
//! touches that table directly.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;
use twofold_types::models::CoupleState;

use crate::Database;
use crate::error::{Result, StoreError};
use crate::models::{couple_state_from_row, format_opt_date};
use crate::progress::{CoupleStateDelta, rollover_delta};

const SINGLETON_ID: i64 = 1;

impl Database {
    pub fn couple_state(&self) -> Result<CoupleState> {
        self.with_conn(load)
    }

    /// The couple state as reported on `today`, with slot flags from an
    /// earlier day masked out. Does not write.
    pub fn today_progress(&self, today: NaiveDate) -> Result<CoupleState> {
        Ok(self.couple_state()?.as_of(today))
    }

    /// Read, modify and write back the singleton in one transaction.
    pub fn update_couple_state<F>(&self, f: F) -> Result<CoupleState>
    where
        F: FnOnce(&mut CoupleState),
    {
        self.with_tx(|tx| {
            let mut state = load(tx)?;
            f(&mut state);
            store(tx, &state)?;
            Ok(state)
        })
    }

    /// Apply `delta` to the singleton and return the result.
    pub fn upsert_couple_state(&self, delta: &CoupleStateDelta) -> Result<CoupleState> {
        self.update_couple_state(|state| *state = delta.apply(state))
    }

    /// Start a new daily cycle if the stored one is not `today`.
    pub fn roll_daily_progress(&self, today: NaiveDate) -> Result<CoupleState> {
        self.with_tx(|tx| {
            let state = load(tx)?;
            let delta = rollover_delta(&state, today);
            if delta.is_empty() {
                return Ok(state);
            }
            let next = delta.apply(&state);
            store(tx, &next)?;
            debug!("Daily progress rolled over to {}", today);
            Ok(next)
        })
    }
}

pub(crate) fn load(conn: &Connection) -> Result<CoupleState> {
    conn.query_row(
        "SELECT love_points, streak_count, last_streak_update_date,
                daily_progress_date, daily_random_answered, daily_manual_answered
         FROM CoupleState WHERE id = ?1",
        [SINGLETON_ID],
        couple_state_from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound("couple state row".into()))
}

pub(crate) fn store(conn: &Connection, state: &CoupleState) -> Result<()> {
    let changed = conn.execute(
        "UPDATE CoupleState
         SET love_points = ?1, streak_count = ?2, last_streak_update_date = ?3,
             daily_progress_date = ?4, daily_random_answered = ?5, daily_manual_answered = ?6
         WHERE id = ?7",
        rusqlite::params![
            state.love_points,
            state.streak_count,
            format_opt_date(state.last_streak_update_date),
            format_opt_date(state.daily_progress_date),
            state.daily_random_answered,
            state.daily_manual_answered,
            SINGLETON_ID,
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound("couple state row".into()));
    }
    Ok(())
}
