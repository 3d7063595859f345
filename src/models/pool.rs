// src/models/pool.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'student_pools' table: one row per (student, day).
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct StudentPool {
    pub id: i64,
    pub student_id: i64,
    pub pool_date: NaiveDate,

    /// Wrong answers so far today, 0..=3. Three ends the day.
    pub strike: i16,

    /// Session token; rotated on every answer.
    #[serde(skip)]
    pub token: String,
}

/// Query parameters for drawing the next pool question.
#[derive(Debug, Default, Deserialize)]
pub struct PoolQuestionParams {
    /// Token from the latest answer response. Not needed for the first draw.
    pub token: Option<String>,
}

/// DTO for answering a pool question.
#[derive(Debug, Deserialize)]
pub struct PoolAnswerRequest {
    pub question_id: i64,
    pub option_id: i64,
}

/// Successful pool answer. `type` is 1 for correct, 0 for incorrect.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PoolAnswerResponse {
    #[serde(rename = "type")]
    pub answer_type: u8,
    pub strike: i16,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct PoolStatusResponse {
    pub state: &'static str,
    pub strike: i16,
    pub score: i64,
    pub token: Option<String>,
}

/// Query parameters for today's pool leaderboard.
#[derive(Debug, Default, Deserialize)]
pub struct PoolLeaderboardParams {
    pub page: Option<i64>,
    pub exam_type_id: Option<i64>,
}

/// One ranked row of today's pool players.
#[derive(Debug, FromRow, Serialize)]
pub struct PoolPlayer {
    pub student_id: i64,
    pub student_name: String,
    pub score: i64,
    pub strike: i16,
}
