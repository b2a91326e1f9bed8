// src/models/paper.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::models::question::Question;

/// Represents the 'question_papers' table: a named set of questions with a
/// declared total-marks figure.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionPaper {
    pub id: i64,
    pub faculty_id: i64,
    pub title: String,
    pub total_marks: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Row for the paper list, joined with its question count.
#[derive(Debug, Serialize, FromRow)]
pub struct PaperSummary {
    pub id: i64,
    pub title: String,
    pub total_marks: i64,
    pub question_count: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Paper detail, including the full question list.
#[derive(Debug, Serialize)]
pub struct PaperDetail {
    pub id: i64,
    pub title: String,
    pub total_marks: i64,
    pub questions: Vec<Question>,
}

/// DTO for creating a paper from existing questions.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaperRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(range(min = 1))]
    pub total_marks: i64,
    #[validate(length(min = 1, message = "At least one question is required."))]
    pub question_ids: Vec<i64>,
}

/// One inline question in a wizard request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct WizardQuestion {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    #[validate(length(min = 1, max = 500))]
    pub option_a: String,
    #[validate(length(min = 1, max = 500))]
    pub option_b: String,
    #[validate(length(min = 1, max = 500))]
    pub option_c: String,
    #[validate(length(min = 1, max = 500))]
    pub option_d: String,
    #[validate(length(min = 1, max = 1))]
    pub answer: String,
    #[validate(range(min = 1))]
    pub max_marks: i64,
}

/// DTO for the one-shot paper wizard: creates the questions and the paper
/// together. The marks of the questions must sum to `total_marks`.
#[derive(Debug, Deserialize, Validate)]
pub struct WizardPaperRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(range(min = 1))]
    pub total_marks: i64,
    #[validate(length(min = 1, message = "At least one question is required."), nested)]
    pub questions: Vec<WizardQuestion>,
}

/// DTO for updating a paper. A present `question_ids` replaces the set.
#[derive(Debug, Deserialize)]
pub struct UpdatePaperRequest {
    pub title: Option<String>,
    pub total_marks: Option<i64>,
    pub question_ids: Option<Vec<i64>>,
}
