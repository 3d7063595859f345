// src/handlers/exam.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    models::student_exam::SubmitAnswersRequest,
    services::scoring_service::ScoringService,
    utils::{jwt::Principal, pagination::PageParams},
};

/// Lists a page of the exam's questions, starting the attempt on first call.
pub async fn list_questions(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(principal): Extension<Principal>,
    Path(exam_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let sheet = ScoringService::new(pool)
        .exam_sheet(&principal, exam_id, params.window(config.per_page))
        .await?;

    Ok(Json(sheet))
}

/// Submits answers for an exam and returns the recomputed score.
///
/// * Rejects mismatched or foreign ids with 422 before writing anything.
/// * Upserts one answersheet row per question (last choice wins).
/// * Returns 409 with the standing score if the exam was already completed.
pub async fn submit_answers(
    State(pool): State<PgPool>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<SubmitAnswersRequest>,
) -> Result<impl IntoResponse, AppError> {
    let summary = ScoringService::new(pool)
        .submit_answers(&principal, req)
        .await?;

    Ok(Json(summary))
}

pub async fn get_score(
    State(pool): State<PgPool>,
    Extension(principal): Extension<Principal>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let summary = ScoringService::new(pool).score(&principal, exam_id).await?;
    Ok(Json(summary))
}

/// Paginated solutions: every option with its correctness and `user_choosed`.
pub async fn view_solutions(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(principal): Extension<Principal>,
    Path(exam_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = ScoringService::new(pool)
        .solutions(&principal, exam_id, params.window(config.per_page))
        .await?;

    Ok(Json(page))
}

/// Exam ranking, same marks formula as submission.
pub async fn get_leaderboard(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Path(exam_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = ScoringService::new(pool)
        .leaderboard(exam_id, params.window(config.per_page))
        .await?;

    Ok(Json(page))
}
