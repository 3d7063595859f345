// src/models/student.rs

use serde::Serialize;
use sqlx::FromRow;

/// Represents the 'students' table.
/// The principal id carried by the bearer token is the student id.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub exam_type_id: i64,
}
