// src/handlers/pool.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    models::pool::{PoolAnswerRequest, PoolLeaderboardParams, PoolQuestionParams},
    services::pool_service::{PoolAnswerOutcome, PoolService},
    utils::{clock::PoolClock, jwt::Principal, pagination::PageParams},
};

/// Draws the next pool question for today (correctness hidden).
pub async fn get_question(
    State(pool): State<PgPool>,
    State(clock): State<PoolClock>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<PoolQuestionParams>,
) -> Result<impl IntoResponse, AppError> {
    let question = PoolService::new(pool)
        .question(&principal, clock.today(), params.token.as_deref())
        .await?;

    Ok(Json(question))
}

/// Answers a pool question.
///
/// Returns `{type, strike, token}`; "already answered" and "game over"
/// come back as 400 with the state the client needs to carry on.
pub async fn submit_answer(
    State(pool): State<PgPool>,
    State(clock): State<PoolClock>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<PoolAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = PoolService::new(pool)
        .answer(&principal, clock.today(), &req)
        .await?;

    match outcome {
        PoolAnswerOutcome::Answered(response) => Ok(Json(response)),
        PoolAnswerOutcome::AlreadyAnswered { token, strike } => Err(AppError::state_conflict(
            StatusCode::BAD_REQUEST,
            "Question already answered",
            json!({ "token": token, "strike": strike }),
        )),
        PoolAnswerOutcome::GameOver { score, strike } => Err(AppError::state_conflict(
            StatusCode::BAD_REQUEST,
            "Game over",
            json!({ "score": score, "strike": strike }),
        )),
    }
}

/// Today's pool state for the caller, including the current token.
pub async fn get_status(
    State(pool): State<PgPool>,
    State(clock): State<PoolClock>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, AppError> {
    let status = PoolService::new(pool)
        .status(&principal, clock.today())
        .await?;

    Ok(Json(status))
}

/// Today's players, scoped to an exam type (the caller's own by default).
pub async fn get_leaderboard(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(clock): State<PoolClock>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<PoolLeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let service = PoolService::new(pool);
    let exam_type_id = match params.exam_type_id {
        Some(id) => id,
        None => service.exam_type_of(&principal).await?,
    };
    let window = PageParams { page: params.page }.window(config.per_page);

    let page = service
        .leaderboard(exam_type_id, clock.today(), window)
        .await?;

    Ok(Json(page))
}
