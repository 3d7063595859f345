// src/pool_game.rs

//! Daily pool rules: who may draw, who may answer, and how strikes move.
//!
//! Per (student, day) the pool goes `NotStarted -> InProgress -> Finished`.
//! The row for the day is created by the first answer, not the first draw,
//! and a new calendar day simply means no row exists yet.

use crate::{error::AppError, models::pool::StudentPool};

/// Wrong answers allowed before the day is over.
pub const MAX_STRIKES: i16 = 3;

pub const POOL_LIMIT_MESSAGE: &str = "Only one pool per day";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    NotStarted,
    InProgress { strike: i16 },
    Finished { strike: i16 },
}

impl PoolState {
    pub fn of(pool: Option<&StudentPool>) -> Self {
        match pool {
            None => PoolState::NotStarted,
            Some(p) if p.strike >= MAX_STRIKES => PoolState::Finished { strike: p.strike },
            Some(p) => PoolState::InProgress { strike: p.strike },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PoolState::NotStarted => "not_started",
            PoolState::InProgress { .. } => "in_progress",
            PoolState::Finished { .. } => "finished",
        }
    }

    pub fn strike(&self) -> i16 {
        match self {
            PoolState::NotStarted => 0,
            PoolState::InProgress { strike } | PoolState::Finished { strike } => *strike,
        }
    }
}

/// How the next question should be drawn.
#[derive(Debug, PartialEq, Eq)]
pub enum Draw<'a> {
    /// No pool row yet today: draw from the whole question set.
    Fresh,
    /// Continue today's pool, skipping the questions it already holds.
    Continue(&'a StudentPool),
}

/// Decides whether a question may be drawn.
///
/// Once today's pool exists the caller must present its current token, and a
/// finished pool admits no further draws.
pub fn guard_draw<'a>(
    pool: Option<&'a StudentPool>,
    token: Option<&str>,
) -> Result<Draw<'a>, AppError> {
    match pool {
        None => Ok(Draw::Fresh),
        Some(p) if p.strike >= MAX_STRIKES || token != Some(p.token.as_str()) => {
            Err(AppError::BadRequest(POOL_LIMIT_MESSAGE.to_string()))
        }
        Some(p) => Ok(Draw::Continue(p)),
    }
}

/// Rejects answers once the day's strikes are used up.
pub fn guard_answer(strike: i16) -> Result<(), AppError> {
    if strike >= MAX_STRIKES {
        Err(AppError::BadRequest(POOL_LIMIT_MESSAGE.to_string()))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct { strike: i16 },
    Incorrect { strike: i16 },
    GameOver { strike: i16 },
}

impl AnswerOutcome {
    pub fn strike(&self) -> i16 {
        match self {
            AnswerOutcome::Correct { strike }
            | AnswerOutcome::Incorrect { strike }
            | AnswerOutcome::GameOver { strike } => *strike,
        }
    }
}

/// Applies one answer to the current strike count.
pub fn apply_answer(strike: i16, is_correct: bool) -> AnswerOutcome {
    if is_correct {
        return AnswerOutcome::Correct { strike };
    }

    let strike = (strike + 1).min(MAX_STRIKES);
    if strike == MAX_STRIKES {
        AnswerOutcome::GameOver { strike }
    } else {
        AnswerOutcome::Incorrect { strike }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn pool(strike: i16, token: &str) -> StudentPool {
        StudentPool {
            id: 1,
            student_id: 9,
            pool_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            strike,
            token: token.to_string(),
        }
    }

    #[test]
    fn first_draw_of_the_day_needs_no_token() {
        assert_eq!(guard_draw(None, None).unwrap(), Draw::Fresh);
    }

    #[test]
    fn draw_requires_current_token() {
        let p = pool(1, "abc");
        assert!(matches!(guard_draw(Some(&p), Some("abc")), Ok(Draw::Continue(_))));
        assert!(matches!(
            guard_draw(Some(&p), Some("stale")),
            Err(AppError::BadRequest(_))
        ));
        assert!(guard_draw(Some(&p), None).is_err());
    }

    #[test]
    fn finished_pool_admits_no_draw_even_with_token() {
        let p = pool(3, "abc");
        assert!(matches!(
            guard_draw(Some(&p), Some("abc")),
            Err(AppError::BadRequest(msg)) if msg == POOL_LIMIT_MESSAGE
        ));
    }

    #[test]
    fn three_misses_end_the_game() {
        let first = apply_answer(0, false);
        let second = apply_answer(first.strike(), false);
        let third = apply_answer(second.strike(), false);

        assert_eq!(first, AnswerOutcome::Incorrect { strike: 1 });
        assert_eq!(second, AnswerOutcome::Incorrect { strike: 2 });
        assert_eq!(third, AnswerOutcome::GameOver { strike: 3 });
        assert!(guard_answer(third.strike()).is_err());
    }

    #[test]
    fn correct_answer_keeps_strike() {
        assert_eq!(apply_answer(2, true), AnswerOutcome::Correct { strike: 2 });
    }

    #[test]
    fn state_follows_strike_count() {
        assert_eq!(PoolState::of(None), PoolState::NotStarted);
        assert_eq!(PoolState::of(Some(&pool(2, "t"))), PoolState::InProgress { strike: 2 });
        assert_eq!(PoolState::of(Some(&pool(3, "t"))).label(), "finished");
    }
}
