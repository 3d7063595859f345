// src/models/mod.rs

pub mod exam;
pub mod pool;
pub mod student;
pub mod student_exam;
