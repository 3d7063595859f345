// src/services/pool_service.rs

use chrono::NaiveDate;
use sqlx::{PgExecutor, PgPool};

use crate::{
    error::{AppError, is_unique_violation},
    models::{
        exam::PublicQuestion,
        pool::{PoolAnswerRequest, PoolAnswerResponse, PoolPlayer, PoolStatusResponse, StudentPool},
    },
    pool_game::{self, AnswerOutcome, Draw, PoolState},
    services::catalog,
    utils::{
        jwt::Principal,
        pagination::{Page, PageWindow},
        token::{POOL_TOKEN_LENGTH, generate_token},
    },
};

const STUDENT_POOL_COLUMNS: &str = "id, student_id, pool_date, strike, token";

/// Result of a pool answer that was accepted for processing.
#[derive(Debug, PartialEq, Eq)]
pub enum PoolAnswerOutcome {
    /// Correct or incorrect, game continues.
    Answered(PoolAnswerResponse),
    /// The question already has an entry today. Nothing was recorded; the
    /// token was still rotated and is returned so the client can continue.
    AlreadyAnswered { token: String, strike: i16 },
    /// Third strike. `score` counts today's correct entries.
    GameOver { score: i64, strike: i16 },
}

/// Owns `student_pools` and `pool_entries`.
#[derive(Clone)]
pub struct PoolService {
    pool: PgPool,
}

impl PoolService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Draws the next question for today. Does not create the day's pool row;
    /// that happens on the first answer.
    pub async fn question(
        &self,
        principal: &Principal,
        today: NaiveDate,
        token: Option<&str>,
    ) -> Result<PublicQuestion, AppError> {
        principal.require_participant()?;
        let student = catalog::require_student(&self.pool, principal.id).await?;
        let todays_pool = find_pool(&self.pool, student.id, today).await?;

        let exclude: Vec<i64> = match pool_game::guard_draw(todays_pool.as_ref(), token)? {
            Draw::Fresh => Vec::new(),
            Draw::Continue(pool) => {
                sqlx::query_scalar("SELECT question_id FROM pool_entries WHERE student_pool_id = $1")
                    .bind(pool.id)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        catalog::random_pool_question(&self.pool, student.exam_type_id, &exclude)
            .await?
            .ok_or_else(|| AppError::NotFound("No pool questions left for today".to_string()))
    }

    /// Records one pool answer.
    ///
    /// The day's row is upserted first, which takes its row lock: answers from
    /// the same student on the same day serialize from there until commit, so
    /// the strike counter and the "already answered" check cannot race. The
    /// strike increment and the entry insert commit together.
    pub async fn answer(
        &self,
        principal: &Principal,
        today: NaiveDate,
        req: &PoolAnswerRequest,
    ) -> Result<PoolAnswerOutcome, AppError> {
        principal.require_participant()?;
        let student = catalog::require_student(&self.pool, principal.id).await?;

        if let Some(existing) = find_pool(&self.pool, student.id, today).await? {
            pool_game::guard_answer(existing.strike)?;
        }

        let exam_type_id = catalog::question_exam_type(&self.pool, req.question_id).await?;
        if exam_type_id != Some(student.exam_type_id) {
            return Err(AppError::BadRequest(
                "Question is not part of your pool".to_string(),
            ));
        }

        let option = catalog::find_option(&self.pool, req.option_id)
            .await?
            .filter(|o| o.question_id == req.question_id)
            .ok_or_else(|| {
                AppError::BadRequest("Option does not belong to this question".to_string())
            })?;

        let mut tx = self.pool.begin().await?;

        let pool = sqlx::query_as::<_, StudentPool>(&format!(
            r#"
            INSERT INTO student_pools (student_id, pool_date, strike, token)
            VALUES ($1, $2, 0, $3)
            ON CONFLICT (student_id, pool_date)
            DO UPDATE SET token = EXCLUDED.token, updated_at = NOW()
            RETURNING {STUDENT_POOL_COLUMNS}
            "#
        ))
        .bind(student.id)
        .bind(today)
        .bind(generate_token(POOL_TOKEN_LENGTH))
        .fetch_one(&mut *tx)
        .await?;

        // Re-check under the lock; a concurrent answer may have ended the day.
        if let Err(e) = pool_game::guard_answer(pool.strike) {
            tx.rollback().await?;
            return Err(e);
        }

        let answered: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM pool_entries WHERE student_pool_id = $1 AND question_id = $2)",
        )
        .bind(pool.id)
        .bind(req.question_id)
        .fetch_one(&mut *tx)
        .await?;

        if answered {
            tx.commit().await?;
            return Ok(PoolAnswerOutcome::AlreadyAnswered {
                token: pool.token,
                strike: pool.strike,
            });
        }

        let outcome = pool_game::apply_answer(pool.strike, option.value);

        sqlx::query(
            r#"
            INSERT INTO pool_entries (student_pool_id, question_id, option_id, is_correct)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(pool.id)
        .bind(req.question_id)
        .bind(option.id)
        .bind(option.value)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Question already answered".to_string())
            } else {
                tracing::error!("Failed to record pool entry: {:?}", e);
                AppError::InternalServerError(e.to_string())
            }
        })?;

        if outcome.strike() != pool.strike {
            sqlx::query("UPDATE student_pools SET strike = $2, updated_at = NOW() WHERE id = $1")
                .bind(pool.id)
                .bind(outcome.strike())
                .execute(&mut *tx)
                .await?;
        }

        let result = match outcome {
            AnswerOutcome::Correct { strike } => PoolAnswerOutcome::Answered(PoolAnswerResponse {
                answer_type: 1,
                strike,
                token: pool.token,
            }),
            AnswerOutcome::Incorrect { strike } => {
                PoolAnswerOutcome::Answered(PoolAnswerResponse {
                    answer_type: 0,
                    strike,
                    token: pool.token,
                })
            }
            AnswerOutcome::GameOver { strike } => PoolAnswerOutcome::GameOver {
                score: correct_entries(&mut *tx, pool.id).await?,
                strike,
            },
        };

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit pool answer: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        match &result {
            PoolAnswerOutcome::GameOver { score, .. } => {
                tracing::info!(student_id = student.id, score, "Pool finished for today")
            }
            _ => tracing::info!(
                student_id = student.id,
                question_id = req.question_id,
                strike = outcome.strike(),
                "Pool answer recorded"
            ),
        }

        Ok(result)
    }

    /// Today's pool for the principal, including the current token.
    pub async fn status(
        &self,
        principal: &Principal,
        today: NaiveDate,
    ) -> Result<PoolStatusResponse, AppError> {
        principal.require_participant()?;
        let todays_pool = find_pool(&self.pool, principal.id, today).await?;
        let state = PoolState::of(todays_pool.as_ref());

        let score = match &todays_pool {
            Some(pool) => correct_entries(&self.pool, pool.id).await?,
            None => 0,
        };

        Ok(PoolStatusResponse {
            state: state.label(),
            strike: state.strike(),
            score,
            token: todays_pool.map(|p| p.token),
        })
    }

    /// Today's players of one exam type, best score first.
    pub async fn leaderboard(
        &self,
        exam_type_id: i64,
        today: NaiveDate,
        window: PageWindow,
    ) -> Result<Page<PoolPlayer>, AppError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM student_pools sp
            JOIN students s ON s.id = sp.student_id
            WHERE sp.pool_date = $1 AND s.exam_type_id = $2
            "#,
        )
        .bind(today)
        .bind(exam_type_id)
        .fetch_one(&self.pool)
        .await?;

        let players = sqlx::query_as::<_, PoolPlayer>(
            r#"
            SELECT
                sp.student_id,
                s.name AS student_name,
                COUNT(pe.id) FILTER (WHERE pe.is_correct) AS score,
                sp.strike
            FROM student_pools sp
            JOIN students s ON s.id = sp.student_id
            LEFT JOIN pool_entries pe ON pe.student_pool_id = sp.id
            WHERE sp.pool_date = $1 AND s.exam_type_id = $2
            GROUP BY sp.id, sp.student_id, s.name, sp.strike
            ORDER BY score DESC, sp.strike ASC, sp.id ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(today)
        .bind(exam_type_id)
        .bind(window.per_page)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch pool leaderboard: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(Page::new(players, window, total))
    }

    /// Exam type of the principal, used when the leaderboard is not scoped explicitly.
    pub async fn exam_type_of(&self, principal: &Principal) -> Result<i64, AppError> {
        Ok(catalog::require_student(&self.pool, principal.id)
            .await?
            .exam_type_id)
    }
}

async fn find_pool<'e, E: PgExecutor<'e>>(
    executor: E,
    student_id: i64,
    day: NaiveDate,
) -> Result<Option<StudentPool>, AppError> {
    let pool = sqlx::query_as::<_, StudentPool>(&format!(
        "SELECT {STUDENT_POOL_COLUMNS} FROM student_pools WHERE student_id = $1 AND pool_date = $2"
    ))
    .bind(student_id)
    .bind(day)
    .fetch_optional(executor)
    .await?;

    Ok(pool)
}

async fn correct_entries<'e, E: PgExecutor<'e>>(executor: E, student_pool_id: i64) -> Result<i64, AppError> {
    let score: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pool_entries WHERE student_pool_id = $1 AND is_correct",
    )
    .bind(student_pool_id)
    .fetch_one(executor)
    .await?;

    Ok(score)
}
