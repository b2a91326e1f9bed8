// src/handlers/attempt.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::attempt::{ExamResultRow, SubmitExamRequest, SubmitExamResponse},
    utils::{
        jwt::{Claims, ROLE_STUDENT},
        notify,
    },
};

use super::exam::fetch_exam;

/// Helper struct for fetching answer keys from the database.
#[derive(sqlx::FromRow)]
struct AnswerKey {
    id: i64,
    answer: String,
    max_marks: i64,
}

struct GradedAnswer {
    question_id: i64,
    chosen: String,
    correct: bool,
}

/// Grades a submission against the paper's answer keys.
///
/// Every question on the paper is graded; a missing answer counts as the
/// non-option 'E'. Comparison is case-insensitive. The score is the sum of
/// `max_marks` over correct answers.
fn grade(keys: &[AnswerKey], answers: &HashMap<i64, String>) -> (i64, Vec<GradedAnswer>) {
    let mut score = 0;
    let mut graded = Vec::with_capacity(keys.len());

    for key in keys {
        let chosen = answers
            .get(&key.id)
            .map(|a| a.trim().to_uppercase())
            .unwrap_or_else(|| "E".to_string());
        let correct = chosen.eq_ignore_ascii_case(&key.answer);
        if correct {
            score += key.max_marks;
        }
        graded.push(GradedAnswer {
            question_id: key.id,
            chosen,
            correct,
        });
    }

    (score, graded)
}

fn percentage(score: i64, total_marks: i64) -> f64 {
    if total_marks <= 0 {
        return 0.0;
    }
    (score as f64 / total_marks as f64 * 100.0 * 100.0).round() / 100.0
}

/// Submits a student's answers for an exam and scores them.
///
/// * Rejects a second submission for the same exam.
/// * Rejects submissions outside the exam's time window.
/// * Persists the attempt and one answer row per question in a transaction.
pub async fn submit_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
    Json(req): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id();
    let exam = fetch_exam(&pool, exam_id).await?;

    let already_submitted: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM attempts WHERE exam_id = ?1 AND student_id = ?2 AND completed = 1",
    )
    .bind(exam_id)
    .bind(student_id)
    .fetch_optional(&pool)
    .await?;
    if already_submitted.is_some() {
        return Err(AppError::BadRequest(
            "You have already submitted this exam".to_string(),
        ));
    }

    let now = Utc::now();
    if now < exam.start_time {
        return Err(AppError::BadRequest("Exam has not started yet".to_string()));
    }
    if now > exam.end_time {
        return Err(AppError::BadRequest("Exam time has expired".to_string()));
    }

    let total_marks: i64 =
        sqlx::query_scalar("SELECT total_marks FROM question_papers WHERE id = ?1")
            .bind(exam.paper_id)
            .fetch_one(&pool)
            .await?;

    let keys = sqlx::query_as::<_, AnswerKey>(
        r#"
        SELECT q.id, q.answer, q.max_marks
        FROM questions q
        JOIN paper_questions pq ON pq.question_id = q.id
        WHERE pq.paper_id = ?1
        ORDER BY q.id
        "#,
    )
    .bind(exam.paper_id)
    .fetch_all(&pool)
    .await?;

    let (score, graded) = grade(&keys, &req.answers);

    let mut tx = pool.begin().await?;

    let attempt_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO attempts (exam_id, student_id, paper_id, score, completed, submitted_at)
        VALUES (?1, ?2, ?3, ?4, 1, ?5)
        RETURNING id
        "#,
    )
    .bind(exam_id)
    .bind(student_id)
    .bind(exam.paper_id)
    .bind(score)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        // The (exam, student) unique index closes the race between two
        // concurrent submissions from the same student.
        if e.to_string().contains("UNIQUE constraint failed") {
            AppError::BadRequest("You have already submitted this exam".to_string())
        } else {
            tracing::error!("Failed to record attempt: {:?}", e);
            AppError::from(e)
        }
    })?;

    for answer in &graded {
        sqlx::query(
            "INSERT INTO attempt_answers (attempt_id, question_id, chosen, correct)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(attempt_id)
        .bind(answer.question_id)
        .bind(&answer.chosen)
        .bind(answer.correct)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        "Exam '{}' submitted by student {} with score {}/{}",
        exam.name,
        student_id,
        score,
        total_marks
    );

    notify::dispatch(
        pool,
        student_id,
        notify::KIND_RESULT_READY,
        format!("Result available: {}", exam.name),
        format!("You scored {} out of {} in '{}'.", score, total_marks, exam.name),
        Some(exam_id),
    );

    Ok(Json(SubmitExamResponse {
        score,
        total_marks,
        percentage: percentage(score, total_marks),
    }))
}

#[derive(sqlx::FromRow)]
struct ResultRow {
    id: i64,
    student_name: String,
    score: i64,
    submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Results for an exam. Students see their own completed attempt; faculty see
/// every completed attempt for their own exams.
pub async fn exam_results(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();
    let exam = fetch_exam(&pool, exam_id).await?;

    let total_marks: i64 =
        sqlx::query_scalar("SELECT total_marks FROM question_papers WHERE id = ?1")
            .bind(exam.paper_id)
            .fetch_one(&pool)
            .await?;

    let rows = if claims.role == ROLE_STUDENT {
        sqlx::query_as::<_, ResultRow>(
            r#"
            SELECT a.id, u.username AS student_name, a.score, a.submitted_at
            FROM attempts a
            JOIN users u ON u.id = a.student_id
            WHERE a.exam_id = ?1 AND a.completed = 1 AND a.student_id = ?2
            ORDER BY a.score DESC
            "#,
        )
        .bind(exam_id)
        .bind(user_id)
        .fetch_all(&pool)
        .await?
    } else {
        if exam.faculty_id != user_id {
            return Err(AppError::Forbidden(
                "You can only view results for your own exams".to_string(),
            ));
        }
        sqlx::query_as::<_, ResultRow>(
            r#"
            SELECT a.id, u.username AS student_name, a.score, a.submitted_at
            FROM attempts a
            JOIN users u ON u.id = a.student_id
            WHERE a.exam_id = ?1 AND a.completed = 1
            ORDER BY a.score DESC
            "#,
        )
        .bind(exam_id)
        .fetch_all(&pool)
        .await?
    };

    let results: Vec<ExamResultRow> = rows
        .into_iter()
        .map(|r| ExamResultRow {
            attempt_id: r.id,
            student_name: r.student_name,
            score: r.score,
            total_marks,
            percentage: percentage(r.score, total_marks),
            submitted_at: r.submitted_at,
        })
        .collect();

    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: i64, answer: &str, marks: i64) -> AnswerKey {
        AnswerKey {
            id,
            answer: answer.to_string(),
            max_marks: marks,
        }
    }

    #[test]
    fn grade_sums_marks_of_correct_answers() {
        let keys = vec![key(1, "A", 5), key(2, "B", 3), key(3, "C", 2)];
        let mut answers = HashMap::new();
        answers.insert(1, "A".to_string());
        answers.insert(2, "C".to_string()); // Wrong
        answers.insert(3, "C".to_string());

        let (score, graded) = grade(&keys, &answers);
        assert_eq!(score, 7);
        assert_eq!(graded.len(), 3);
        assert!(graded[0].correct);
        assert!(!graded[1].correct);
    }

    #[test]
    fn grade_is_case_insensitive() {
        let keys = vec![key(1, "A", 4)];
        let mut answers = HashMap::new();
        answers.insert(1, "a".to_string());

        let (score, _) = grade(&keys, &answers);
        assert_eq!(score, 4);
    }

    #[test]
    fn grade_treats_missing_answers_as_wrong() {
        let keys = vec![key(1, "A", 4), key(2, "D", 6)];
        let answers = HashMap::new();

        let (score, graded) = grade(&keys, &answers);
        assert_eq!(score, 0);
        assert!(graded.iter().all(|g| g.chosen == "E" && !g.correct));
    }

    #[test]
    fn grade_ignores_answers_to_unknown_questions() {
        let keys = vec![key(1, "B", 2)];
        let mut answers = HashMap::new();
        answers.insert(99, "B".to_string());

        let (score, graded) = grade(&keys, &answers);
        assert_eq!(score, 0);
        assert_eq!(graded.len(), 1);
    }

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert_eq!(percentage(5, 10), 50.0);
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(0, 0), 0.0);
    }
}
