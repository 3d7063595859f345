// src/scoring.rs

//! Scoring rules shared by submission, the score view and the exam leaderboard.
//!
//! Nothing in here touches the database: the service layer loads an
//! [`AnswerKey`] for the exam, and these functions decide what is accepted
//! and how many marks it is worth.

use std::collections::{BTreeMap, HashMap, HashSet};

use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::{
    error::AppError,
    models::{
        exam::Exam,
        student_exam::{LedgerCounts, ScoreSummary},
    },
};

/// An option id with the question it belongs to and its correctness flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct OptionKey {
    pub id: i64,
    pub question_id: i64,
    pub value: bool,
}

/// The id sets a submission is checked against.
#[derive(Debug, Default)]
pub struct AnswerKey {
    question_ids: HashSet<i64>,
    options: HashMap<i64, OptionKey>,
}

impl AnswerKey {
    pub fn new(question_ids: impl IntoIterator<Item = i64>, options: Vec<OptionKey>) -> Self {
        Self {
            question_ids: question_ids.into_iter().collect(),
            options: options.into_iter().map(|o| (o.id, o)).collect(),
        }
    }
}

/// One accepted answer, ready to be upserted into the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub option_id: i64,
    pub is_correct: bool,
}

/// Zips the parallel `question_id` / `option_id` arrays.
///
/// Both must be present and of equal length.
pub fn pair_answers(
    question_ids: Option<&[i64]>,
    option_ids: Option<&[i64]>,
) -> Result<Vec<(i64, i64)>, AppError> {
    match (question_ids, option_ids) {
        (Some(questions), Some(options)) if questions.len() == options.len() => Ok(questions
            .iter()
            .copied()
            .zip(options.iter().copied())
            .collect()),
        _ => Err(AppError::Unprocessable(
            "question_id and option_id must be arrays of the same length".to_string(),
        )),
    }
}

/// Checks every submitted pair against the exam and grades the result.
///
/// The whole batch is rejected if any question id is not part of the exam,
/// if any option id is not an option of the exam, or if an option is paired
/// with a question it does not belong to. When a question appears more than
/// once, its last occurrence wins.
pub fn grade(pairs: &[(i64, i64)], key: &AnswerKey) -> Result<Vec<GradedAnswer>, AppError> {
    let unknown_questions: Vec<i64> = pairs
        .iter()
        .map(|(q, _)| *q)
        .filter(|q| !key.question_ids.contains(q))
        .collect();
    if !unknown_questions.is_empty() {
        return Err(AppError::Unprocessable(format!(
            "Questions {:?} do not belong to this exam",
            unknown_questions
        )));
    }

    let unknown_options: Vec<i64> = pairs
        .iter()
        .map(|(_, o)| *o)
        .filter(|o| !key.options.contains_key(o))
        .collect();
    if !unknown_options.is_empty() {
        return Err(AppError::Unprocessable(format!(
            "Options {:?} do not belong to this exam",
            unknown_options
        )));
    }

    let mut selected: BTreeMap<i64, OptionKey> = BTreeMap::new();
    for (question_id, option_id) in pairs {
        let option = key.options[option_id];
        if option.question_id != *question_id {
            return Err(AppError::Unprocessable(format!(
                "Option {} is not an option of question {}",
                option_id, question_id
            )));
        }
        selected.insert(*question_id, option);
    }

    Ok(selected
        .into_iter()
        .map(|(question_id, option)| GradedAnswer {
            question_id,
            option_id: option.id,
            is_correct: option.value,
        })
        .collect())
}

/// Negative-marking parameters of an exam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkingScheme {
    pub negative_marking: bool,
    pub negative_marking_point: Decimal,
}

impl MarkingScheme {
    pub fn of(exam: &Exam) -> Self {
        Self {
            negative_marking: exam.negative_marking,
            negative_marking_point: exam.negative_marking_point,
        }
    }

    /// `correct - incorrect * point` with negative marking, `correct` without.
    pub fn marks(&self, correct: i64, incorrect: i64) -> Decimal {
        let correct = Decimal::from(correct);
        if self.negative_marking {
            correct - Decimal::from(incorrect) * self.negative_marking_point
        } else {
            correct
        }
    }

    /// SQL rendition of [`MarkingScheme::marks`] over the given column
    /// expressions. Ordering in SQL and the `marks` reported from Rust must
    /// never disagree, so both are kept here.
    pub fn marks_sql(correct: &str, incorrect: &str, enabled: &str, point: &str) -> String {
        format!(
            "({correct} - CASE WHEN {enabled} THEN {incorrect} * {point} ELSE 0 END)"
        )
    }
}

/// Builds the summary returned to the student.
///
/// Unanswered questions are whatever is left of `full_marks` after the
/// answered ones.
pub fn summarize(
    exam: &Exam,
    full_marks: i64,
    counts: LedgerCounts,
    is_exam_completed: bool,
) -> ScoreSummary {
    let scheme = MarkingScheme::of(exam);
    let answered = counts.correct_answer_count + counts.incorrect_answer_count;

    ScoreSummary {
        exam_id: exam.id,
        marks: scheme.marks(counts.correct_answer_count, counts.incorrect_answer_count),
        full_marks,
        correct_answer_count: counts.correct_answer_count,
        incorrect_answer_count: counts.incorrect_answer_count,
        missed_answer_count: (full_marks - answered).max(0),
        negative_marking: scheme.negative_marking,
        negative_marking_point: scheme.negative_marking_point,
        is_exam_completed,
    }
}
