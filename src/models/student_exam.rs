// src/models/student_exam.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{
    models::exam::{ExamOption, PublicQuestion},
    utils::pagination::Page,
};

/// Represents the 'student_exams' table.
/// One row per (student, exam); the unit of idempotent submission.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StudentExam {
    pub id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub is_exam_completed: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for submitting answers.
///
/// `question_id` and `option_id` are parallel arrays. They stay optional so
/// a missing array is reported as a length mismatch instead of a JSON error.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswersRequest {
    pub exam_id: i64,

    #[serde(default)]
    pub question_id: Option<Vec<i64>>,

    #[serde(default)]
    pub option_id: Option<Vec<i64>>,

    /// 0 keeps the attempt open, 1 finishes it.
    #[validate(range(min = 0, max = 1, message = "is_exam_completed must be 0 or 1"))]
    pub is_exam_completed: i32,
}

/// Correct/incorrect tallies read back from the answer ledger.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct LedgerCounts {
    pub correct_answer_count: i64,
    pub incorrect_answer_count: i64,
}

/// Score summary returned by submission and by the score endpoint.
/// Never says which answers were right.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoreSummary {
    pub exam_id: i64,
    pub marks: Decimal,
    pub full_marks: i64,
    pub correct_answer_count: i64,
    pub incorrect_answer_count: i64,
    pub missed_answer_count: i64,
    pub negative_marking: bool,
    pub negative_marking_point: Decimal,
    pub is_exam_completed: bool,
}

/// Response of the question listing that starts an attempt.
#[derive(Debug, Serialize)]
pub struct ExamSheet {
    pub student_exam_id: i64,
    /// True only on the call that created the attempt.
    pub started: bool,
    pub is_exam_completed: bool,
    pub questions: Page<PublicQuestion>,
}

/// Question row joined with the student's chosen option.
#[derive(Debug, FromRow)]
pub struct SolutionRow {
    pub id: i64,
    pub content: String,
    pub user_choosed: Option<i64>,
}

/// One entry of the solutions view.
#[derive(Debug, Serialize)]
pub struct SolutionEntry {
    pub question_id: i64,
    pub question: String,
    pub options: Vec<ExamOption>,
    pub user_choosed: Option<i64>,
}

/// Per-attempt aggregate used to rank an exam.
#[derive(Debug, FromRow)]
pub struct LeaderboardRow {
    pub student_id: i64,
    pub student_name: String,
    pub is_exam_completed: bool,
    pub correct_answer_count: i64,
    pub incorrect_answer_count: i64,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub student_id: i64,
    pub student_name: String,
    pub marks: Decimal,
    pub correct_answer_count: i64,
    pub incorrect_answer_count: i64,
    pub is_exam_completed: bool,
}
