// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::error::AppError;

/// Represents the 'questions' table: one multiple-choice question with four
/// options and a correct-option letter.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub faculty_id: i64,

    /// The text content of the question.
    pub text: String,

    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,

    /// The correct option letter: 'A', 'B', 'C' or 'D'.
    pub answer: String,

    pub max_marks: i64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for sending a question to students (excludes the answer).
#[derive(Debug, Serialize, FromRow)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub max_marks: i64,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        PublicQuestion {
            id: q.id,
            text: q.text,
            option_a: q.option_a,
            option_b: q.option_b,
            option_c: q.option_c,
            option_d: q.option_d,
            max_marks: q.max_marks,
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
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

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateQuestionRequest {
    pub text: Option<String>,
    pub option_a: Option<String>,
    pub option_b: Option<String>,
    pub option_c: Option<String>,
    pub option_d: Option<String>,
    pub answer: Option<String>,
    pub max_marks: Option<i64>,
}

/// Uppercases the submitted answer letter and rejects anything outside A-D.
pub fn normalize_answer(answer: &str) -> Result<String, AppError> {
    let letter = answer.trim().to_uppercase();
    match letter.as_str() {
        "A" | "B" | "C" | "D" => Ok(letter),
        _ => Err(AppError::BadRequest(
            "Answer must be one of A, B, C, D".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_answer_uppercases() {
        assert_eq!(normalize_answer("c").unwrap(), "C");
        assert_eq!(normalize_answer(" a ").unwrap(), "A");
    }

    #[test]
    fn normalize_answer_rejects_other_letters() {
        assert!(normalize_answer("E").is_err());
        assert!(normalize_answer("").is_err());
        assert!(normalize_answer("AB").is_err());
    }
}
