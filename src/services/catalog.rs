// src/services/catalog.rs

//! Read-model queries over the exam catalog and the student store.
//! Both are owned elsewhere; nothing here writes.

use std::collections::HashMap;

use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::{
    error::AppError,
    models::{
        exam::{Exam, ExamOption, PublicOption, PublicQuestion, QuestionRow},
        student::Student,
    },
    scoring::{AnswerKey, OptionKey},
    utils::pagination::{Page, PageWindow},
};

pub async fn find_exam<'e, E: PgExecutor<'e>>(
    executor: E,
    exam_id: i64,
) -> Result<Option<Exam>, AppError> {
    let exam = sqlx::query_as::<_, Exam>(
        r#"
        SELECT id, name, category, exam_type_id, negative_marking,
               negative_marking_point, created_at
        FROM exams
        WHERE id = $1
        "#,
    )
    .bind(exam_id)
    .fetch_optional(executor)
    .await?;

    Ok(exam)
}

/// Fetches the exam or fails with 404.
pub async fn require_exam<'e, E: PgExecutor<'e>>(executor: E, exam_id: i64) -> Result<Exam, AppError> {
    find_exam(executor, exam_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Exam {} not found", exam_id)))
}

pub async fn require_student<'e, E: PgExecutor<'e>>(
    executor: E,
    student_id: i64,
) -> Result<Student, AppError> {
    sqlx::query_as::<_, Student>("SELECT id, name, exam_type_id FROM students WHERE id = $1")
        .bind(student_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".to_string()))
}

/// Number of questions in the exam; this is also the exam's full marks.
pub async fn count_questions<'e, E: PgExecutor<'e>>(executor: E, exam_id: i64) -> Result<i64, AppError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_one(executor)
        .await?;

    Ok(total)
}

/// Loads every question id and option of the exam for submission checks.
pub async fn answer_key(conn: &mut PgConnection, exam_id: i64) -> Result<AnswerKey, AppError> {
    let question_ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM questions WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_all(&mut *conn)
        .await?;

    let options = sqlx::query_as::<_, OptionKey>(
        r#"
        SELECT o.id, o.question_id, o.value
        FROM options o
        JOIN questions q ON q.id = o.question_id
        WHERE q.exam_id = $1
        "#,
    )
    .bind(exam_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(AnswerKey::new(question_ids, options))
}

/// Looks up a single option with the question it belongs to.
pub async fn find_option<'e, E: PgExecutor<'e>>(
    executor: E,
    option_id: i64,
) -> Result<Option<OptionKey>, AppError> {
    let option = sqlx::query_as::<_, OptionKey>(
        "SELECT id, question_id, value FROM options WHERE id = $1",
    )
    .bind(option_id)
    .fetch_optional(executor)
    .await?;

    Ok(option)
}

/// Exam type a question is drawn under, through its exam.
pub async fn question_exam_type<'e, E: PgExecutor<'e>>(
    executor: E,
    question_id: i64,
) -> Result<Option<i64>, AppError> {
    let exam_type_id = sqlx::query_scalar(
        r#"
        SELECT e.exam_type_id
        FROM questions q
        JOIN exams e ON e.id = q.exam_id
        WHERE q.id = $1
        "#,
    )
    .bind(question_id)
    .fetch_optional(executor)
    .await?;

    Ok(exam_type_id)
}

/// Options of the given questions, grouped by question id, in id order.
pub async fn options_for<'e, E: PgExecutor<'e>>(
    executor: E,
    question_ids: &[i64],
) -> Result<HashMap<i64, Vec<ExamOption>>, AppError> {
    let options = sqlx::query_as::<_, ExamOption>(
        r#"
        SELECT id, question_id, content, value
        FROM options
        WHERE question_id = ANY($1)
        ORDER BY id
        "#,
    )
    .bind(question_ids)
    .fetch_all(executor)
    .await?;

    let mut grouped: HashMap<i64, Vec<ExamOption>> = HashMap::new();
    for option in options {
        grouped.entry(option.question_id).or_default().push(option);
    }

    Ok(grouped)
}

fn publish(question: QuestionRow, options: &mut HashMap<i64, Vec<ExamOption>>) -> PublicQuestion {
    PublicQuestion {
        id: question.id,
        content: question.content,
        options: options
            .remove(&question.id)
            .unwrap_or_default()
            .into_iter()
            .map(PublicOption::from)
            .collect(),
    }
}

/// One page of the exam's questions, correctness hidden.
pub async fn public_questions(
    pool: &PgPool,
    exam_id: i64,
    window: PageWindow,
) -> Result<Page<PublicQuestion>, AppError> {
    let total = count_questions(pool, exam_id).await?;

    let questions = sqlx::query_as::<_, QuestionRow>(
        r#"
        SELECT id, content
        FROM questions
        WHERE exam_id = $1
        ORDER BY id
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(exam_id)
    .bind(window.per_page)
    .bind(window.offset)
    .fetch_all(pool)
    .await?;

    let ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
    let mut options = options_for(pool, &ids).await?;
    let data = questions
        .into_iter()
        .map(|q| publish(q, &mut options))
        .collect();

    Ok(Page::new(data, window, total))
}

/// Draws one random question from the exam type's pool, skipping `exclude`.
pub async fn random_pool_question(
    pool: &PgPool,
    exam_type_id: i64,
    exclude: &[i64],
) -> Result<Option<PublicQuestion>, AppError> {
    let question = sqlx::query_as::<_, QuestionRow>(
        r#"
        SELECT q.id, q.content
        FROM questions q
        JOIN exams e ON e.id = q.exam_id
        WHERE e.exam_type_id = $1
          AND NOT (q.id = ANY($2))
        ORDER BY RANDOM()
        LIMIT 1
        "#,
    )
    .bind(exam_type_id)
    .bind(exclude)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to draw pool question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let Some(question) = question else {
        return Ok(None);
    };

    let mut options = options_for(pool, &[question.id]).await?;
    Ok(Some(publish(question, &mut options)))
}
