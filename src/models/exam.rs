// src/models/exam.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'exams' table. Read-only from the scoring engine's side.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub name: String,

    /// 'free', 'sprint', 'mock', 'corporate' or 'question_bank'.
    pub category: String,

    /// Enrollment track the exam belongs to. Also scopes the daily pool.
    pub exam_type_id: i64,

    pub negative_marking: bool,

    /// Penalty subtracted per wrong answer when `negative_marking` is on.
    pub negative_marking_point: Decimal,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'options' table, correctness included.
/// Only exposed to clients through the solutions view.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamOption {
    pub id: i64,
    pub question_id: i64,
    pub content: String,
    pub value: bool,
}

/// Option as shown while the exam or pool question is still open.
#[derive(Debug, Clone, Serialize)]
pub struct PublicOption {
    pub id: i64,
    pub content: String,
}

impl From<ExamOption> for PublicOption {
    fn from(option: ExamOption) -> Self {
        Self {
            id: option.id,
            content: option.content,
        }
    }
}

/// Question row without its options.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub content: String,
}

/// DTO for sending a question to the client (no correctness flags).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub content: String,
    pub options: Vec<PublicOption>,
}
