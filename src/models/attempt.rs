// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use std::collections::HashMap;

/// Represents the 'attempts' table: a student's record of taking an exam.
/// Unique per (exam, student).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub exam_id: i64,
    pub student_id: i64,
    pub paper_id: i64,
    pub score: i64,
    pub completed: bool,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for submitting an exam attempt.
///
/// Key: Question ID. Value: the chosen option letter.
#[derive(Debug, Deserialize)]
pub struct SubmitExamRequest {
    pub answers: HashMap<i64, String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitExamResponse {
    pub score: i64,
    pub total_marks: i64,
    pub percentage: f64,
}

/// One scored attempt in a results listing.
#[derive(Debug, Serialize)]
pub struct ExamResultRow {
    pub attempt_id: i64,
    pub student_name: String,
    pub score: i64,
    pub total_marks: i64,
    pub percentage: f64,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Progress statistics for the student dashboard.
#[derive(Debug, Serialize)]
pub struct StudentProgress {
    pub total_exams: i64,
    pub completed_exams: i64,
    pub total_score: i64,
    pub average_score: f64,
    pub completion_percentage: f64,
    /// Marks obtained vs. marks possible over the papers attempted.
    pub average_percentage: f64,
    /// 1-based position among all students by average percentage, or null
    /// when the student has no completed attempt.
    pub rank: Option<i64>,
}

/// Per-question accuracy row inside `ExamAnalytics`.
#[derive(Debug, Serialize)]
pub struct QuestionStat {
    pub question_id: i64,
    pub text: String,
    pub correct_answers: i64,
    pub accuracy_percentage: f64,
}

/// Aggregate statistics for a single exam. Score fields are null until at
/// least one attempt has been submitted.
#[derive(Debug, Serialize)]
pub struct ExamAnalytics {
    pub exam_name: String,
    pub total_students: i64,
    pub attempted_students: i64,
    pub average_score: Option<f64>,
    pub median_score: Option<i64>,
    pub highest_score: Option<i64>,
    pub lowest_score: Option<i64>,
    pub pass_percentage: Option<f64>,
    pub question_statistics: Vec<QuestionStat>,
}
