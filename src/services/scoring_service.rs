// src/services/scoring_service.rs

use axum::http::StatusCode;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        exam::Exam,
        student_exam::{
            ExamSheet, LeaderboardEntry, LeaderboardRow, LedgerCounts, ScoreSummary,
            SolutionEntry, SolutionRow, StudentExam, SubmitAnswersRequest,
        },
    },
    scoring::{self, GradedAnswer, MarkingScheme},
    services::catalog,
    utils::{
        jwt::Principal,
        pagination::{Page, PageWindow},
    },
};

const STUDENT_EXAM_COLUMNS: &str = "id, student_id, exam_id, is_exam_completed, created_at";

/// Owns the answer ledger: starts attempts, records submissions and scores them.
#[derive(Clone)]
pub struct ScoringService {
    pool: PgPool,
}

impl ScoringService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the attempt on first call and pre-fills one empty answersheet
    /// row per question, in one transaction. Later calls return the existing
    /// attempt with `started = false`.
    pub async fn ensure_started(
        &self,
        principal: &Principal,
        exam: &Exam,
    ) -> Result<(StudentExam, bool), AppError> {
        principal.require_participant()?;
        catalog::require_student(&self.pool, principal.id).await?;

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, StudentExam>(&format!(
            r#"
            INSERT INTO student_exams (student_id, exam_id)
            VALUES ($1, $2)
            ON CONFLICT (student_id, exam_id) DO NOTHING
            RETURNING {STUDENT_EXAM_COLUMNS}
            "#
        ))
        .bind(principal.id)
        .bind(exam.id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match inserted {
            Some(student_exam) => {
                sqlx::query(
                    r#"
                    INSERT INTO answersheets (student_exam_id, question_id)
                    SELECT $1, id FROM questions WHERE exam_id = $2
                    ON CONFLICT (student_exam_id, question_id) DO NOTHING
                    "#,
                )
                .bind(student_exam.id)
                .bind(exam.id)
                .execute(&mut *tx)
                .await?;

                tracing::info!(
                    student_id = principal.id,
                    exam_id = exam.id,
                    student_exam_id = student_exam.id,
                    "Exam started"
                );
                (student_exam, true)
            }
            None => {
                let existing = find_student_exam(&mut *tx, principal.id, exam.id)
                    .await?
                    .ok_or_else(|| {
                        AppError::InternalServerError("Attempt vanished during start".to_string())
                    })?;
                (existing, false)
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Question listing. Starting the attempt here is what makes submission
    /// reachable.
    pub async fn exam_sheet(
        &self,
        principal: &Principal,
        exam_id: i64,
        window: PageWindow,
    ) -> Result<ExamSheet, AppError> {
        let exam = catalog::require_exam(&self.pool, exam_id).await?;
        let (student_exam, started) = self.ensure_started(principal, &exam).await?;
        let questions = catalog::public_questions(&self.pool, exam.id, window).await?;

        Ok(ExamSheet {
            student_exam_id: student_exam.id,
            started,
            is_exam_completed: student_exam.is_exam_completed,
            questions,
        })
    }

    /// Validates, records and scores a batch of answers.
    ///
    /// Every check runs before the first write. The answersheet upserts and
    /// the completion flag commit together, under a row lock on the attempt
    /// so concurrent submissions for the same (student, exam) serialize.
    pub async fn submit_answers(
        &self,
        principal: &Principal,
        req: SubmitAnswersRequest,
    ) -> Result<ScoreSummary, AppError> {
        principal.require_participant()?;
        req.validate()?;

        let exam = catalog::require_exam(&self.pool, req.exam_id).await?;
        let pairs = scoring::pair_answers(req.question_id.as_deref(), req.option_id.as_deref())?;

        let student_exam = find_student_exam(&self.pool, principal.id, exam.id)
            .await?
            .ok_or_else(|| AppError::Unprocessable("Exam has not been started".to_string()))?;
        if student_exam.is_exam_completed {
            return Err(self.already_completed(&exam, student_exam.id).await);
        }

        let key = {
            let mut conn = self.pool.acquire().await?;
            catalog::answer_key(&mut *conn, exam.id).await?
        };
        let graded = scoring::grade(&pairs, &key)?;
        let completed = req.is_exam_completed == 1;

        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_as::<_, StudentExam>(&format!(
            "SELECT {STUDENT_EXAM_COLUMNS} FROM student_exams WHERE id = $1 FOR UPDATE"
        ))
        .bind(student_exam.id)
        .fetch_one(&mut *tx)
        .await?;

        // A concurrent request may have finished the attempt while we validated.
        if locked.is_exam_completed {
            tx.rollback().await?;
            return Err(self.already_completed(&exam, student_exam.id).await);
        }

        upsert_answers(&mut *tx, student_exam.id, &graded).await?;

        sqlx::query(
            "UPDATE student_exams SET is_exam_completed = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(student_exam.id)
        .bind(completed)
        .execute(&mut *tx)
        .await?;

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit answer submission: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        tracing::info!(
            student_id = principal.id,
            exam_id = exam.id,
            answers = graded.len(),
            completed,
            "Answers recorded"
        );

        self.summary(&exam, student_exam.id, completed).await
    }

    /// Read-only score of the principal's attempt.
    pub async fn score(&self, principal: &Principal, exam_id: i64) -> Result<ScoreSummary, AppError> {
        principal.require_participant()?;
        let exam = catalog::require_exam(&self.pool, exam_id).await?;
        let student_exam = find_student_exam(&self.pool, principal.id, exam.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Exam has not been started".to_string()))?;

        self.summary(&exam, student_exam.id, student_exam.is_exam_completed)
            .await
    }

    /// Questions with every option's correctness and the student's choice.
    /// Only available once the attempt is completed.
    pub async fn solutions(
        &self,
        principal: &Principal,
        exam_id: i64,
        window: PageWindow,
    ) -> Result<Page<SolutionEntry>, AppError> {
        principal.require_participant()?;
        let exam = catalog::require_exam(&self.pool, exam_id).await?;
        let student_exam = find_student_exam(&self.pool, principal.id, exam.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Exam has not been started".to_string()))?;
        if !student_exam.is_exam_completed {
            return Err(AppError::Conflict(
                "Solutions are available after the exam is completed".to_string(),
            ));
        }

        let total = catalog::count_questions(&self.pool, exam.id).await?;
        let rows = sqlx::query_as::<_, SolutionRow>(
            r#"
            SELECT q.id, q.content, a.option_id AS user_choosed
            FROM questions q
            LEFT JOIN answersheets a
                   ON a.question_id = q.id AND a.student_exam_id = $2
            WHERE q.exam_id = $1
            ORDER BY q.id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(exam.id)
        .bind(student_exam.id)
        .bind(window.per_page)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut options = catalog::options_for(&self.pool, &ids).await?;
        let data = rows
            .into_iter()
            .map(|row| SolutionEntry {
                question_id: row.id,
                question: row.content,
                options: options.remove(&row.id).unwrap_or_default(),
                user_choosed: row.user_choosed,
            })
            .collect();

        Ok(Page::new(data, window, total))
    }

    /// Ranks every attempt on the exam by marks, then by correct answers.
    pub async fn leaderboard(
        &self,
        exam_id: i64,
        window: PageWindow,
    ) -> Result<Page<LeaderboardEntry>, AppError> {
        let exam = catalog::require_exam(&self.pool, exam_id).await?;
        let scheme = MarkingScheme::of(&exam);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM student_exams WHERE exam_id = $1")
            .bind(exam.id)
            .fetch_one(&self.pool)
            .await?;

        let marks = MarkingScheme::marks_sql(
            "COALESCE(a.correct, 0)",
            "COALESCE(a.incorrect, 0)",
            "e.negative_marking",
            "e.negative_marking_point",
        );
        let query = format!(
            r#"
            SELECT
                se.student_id,
                s.name AS student_name,
                se.is_exam_completed,
                COALESCE(a.correct, 0) AS correct_answer_count,
                COALESCE(a.incorrect, 0) AS incorrect_answer_count
            FROM student_exams se
            JOIN students s ON s.id = se.student_id
            JOIN exams e ON e.id = se.exam_id
            LEFT JOIN (
                SELECT
                    student_exam_id,
                    COUNT(*) FILTER (WHERE is_correct = TRUE) AS correct,
                    COUNT(*) FILTER (WHERE is_correct = FALSE) AS incorrect
                FROM answersheets
                GROUP BY student_exam_id
            ) a ON a.student_exam_id = se.id
            WHERE se.exam_id = $1
            ORDER BY {marks} DESC, correct_answer_count DESC, se.id ASC
            LIMIT $2 OFFSET $3
            "#
        );

        let rows = sqlx::query_as::<_, LeaderboardRow>(&query)
            .bind(exam.id)
            .bind(window.per_page)
            .bind(window.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch exam leaderboard: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

        let data = rows
            .into_iter()
            .enumerate()
            .map(|(idx, row)| LeaderboardEntry {
                rank: window.offset + idx as i64 + 1,
                student_id: row.student_id,
                student_name: row.student_name,
                marks: scheme.marks(row.correct_answer_count, row.incorrect_answer_count),
                correct_answer_count: row.correct_answer_count,
                incorrect_answer_count: row.incorrect_answer_count,
                is_exam_completed: row.is_exam_completed,
            })
            .collect();

        Ok(Page::new(data, window, total))
    }

    /// Recomputes the summary from the ledger.
    async fn summary(
        &self,
        exam: &Exam,
        student_exam_id: i64,
        is_exam_completed: bool,
    ) -> Result<ScoreSummary, AppError> {
        let counts = sqlx::query_as::<_, LedgerCounts>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE is_correct = TRUE) AS correct_answer_count,
                COUNT(*) FILTER (WHERE is_correct = FALSE) AS incorrect_answer_count
            FROM answersheets
            WHERE student_exam_id = $1
            "#,
        )
        .bind(student_exam_id)
        .fetch_one(&self.pool)
        .await?;

        let full_marks = catalog::count_questions(&self.pool, exam.id).await?;
        Ok(scoring::summarize(exam, full_marks, counts, is_exam_completed))
    }

    /// 409 carrying the standing score so the client can resynchronize.
    async fn already_completed(&self, exam: &Exam, student_exam_id: i64) -> AppError {
        match self.summary(exam, student_exam_id, true).await {
            Ok(summary) => AppError::state_conflict(
                StatusCode::CONFLICT,
                "Exam already completed",
                serde_json::json!({ "result": summary }),
            ),
            Err(e) => e,
        }
    }
}

pub async fn find_student_exam<'e, E: PgExecutor<'e>>(
    executor: E,
    student_id: i64,
    exam_id: i64,
) -> Result<Option<StudentExam>, AppError> {
    let student_exam = sqlx::query_as::<_, StudentExam>(&format!(
        "SELECT {STUDENT_EXAM_COLUMNS} FROM student_exams WHERE student_id = $1 AND exam_id = $2"
    ))
    .bind(student_id)
    .bind(exam_id)
    .fetch_optional(executor)
    .await?;

    Ok(student_exam)
}

/// One multi-row upsert keyed by (student_exam_id, question_id).
/// Re-answering a question overwrites the previous choice.
async fn upsert_answers<'e, E: PgExecutor<'e>>(
    executor: E,
    student_exam_id: i64,
    graded: &[GradedAnswer],
) -> Result<(), AppError> {
    if graded.is_empty() {
        return Ok(());
    }

    let mut query_builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO answersheets (student_exam_id, question_id, option_id, is_correct) ",
    );
    query_builder.push_values(graded, |mut row, answer| {
        row.push_bind(student_exam_id)
            .push_bind(answer.question_id)
            .push_bind(answer.option_id)
            .push_bind(answer.is_correct);
    });
    query_builder.push(
        " ON CONFLICT (student_exam_id, question_id) DO UPDATE SET \
         option_id = EXCLUDED.option_id, \
         is_correct = EXCLUDED.is_correct, \
         updated_at = NOW()",
    );

    query_builder.build().execute(executor).await?;
    Ok(())
}
