// src/handlers/exam.rs

use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        exam::{CreateExamRequest, Exam, ExamSummary, StudentExamView, UpdateExamRequest},
        question::PublicQuestion,
    },
    utils::{
        jwt::{Claims, ROLE_FACULTY},
        notify,
    },
};

use super::paper::paper_questions;

const EXAM_SUMMARY_SQL: &str = r#"
    SELECT e.id, e.name, e.paper_id, p.title AS paper_title, p.total_marks,
           (SELECT COUNT(*) FROM paper_questions pq WHERE pq.paper_id = e.paper_id) AS question_count,
           u.username AS faculty_name, e.start_time, e.end_time
    FROM exams e
    JOIN question_papers p ON p.id = e.paper_id
    JOIN users u ON u.id = e.faculty_id
"#;

/// Lists exams. Faculty see their own; students see every exam, split into
/// `upcoming` (not yet completed by them) and `completed`.
pub async fn list_exams(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    if claims.role == ROLE_FACULTY {
        let sql = format!("{} WHERE e.faculty_id = ?1 ORDER BY e.start_time", EXAM_SUMMARY_SQL);
        let exams = sqlx::query_as::<_, ExamSummary>(&sql)
            .bind(claims.user_id())
            .fetch_all(&pool)
            .await?;
        return Ok(Json(exams).into_response());
    }

    let sql = format!("{} ORDER BY e.start_time", EXAM_SUMMARY_SQL);
    let exams = sqlx::query_as::<_, ExamSummary>(&sql).fetch_all(&pool).await?;

    let completed_ids: Vec<i64> = sqlx::query_scalar(
        "SELECT exam_id FROM attempts WHERE student_id = ?1 AND completed = 1",
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;
    let completed_ids: HashSet<i64> = completed_ids.into_iter().collect();

    let (completed, upcoming): (Vec<ExamSummary>, Vec<ExamSummary>) = exams
        .into_iter()
        .partition(|e| completed_ids.contains(&e.id));

    Ok(Json(serde_json::json!({
        "upcoming": upcoming,
        "completed": completed,
    }))
    .into_response())
}

/// Creates a new exam on one of the caller's papers. Faculty only.
pub async fn create_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Shares its path with the student listing, so the role gate lives here
    // instead of in a router layer.
    if claims.role != ROLE_FACULTY {
        return Err(AppError::Forbidden(
            "Only faculty can create exams".to_string(),
        ));
    }

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if payload.end_time <= payload.start_time {
        return Err(AppError::BadRequest(
            "end_time must be after start_time".to_string(),
        ));
    }

    let faculty_id = claims.user_id();

    let paper_exists: Option<i64> =
        sqlx::query_scalar("SELECT id FROM question_papers WHERE id = ?1 AND faculty_id = ?2")
            .bind(payload.paper_id)
            .bind(faculty_id)
            .fetch_optional(&pool)
            .await?;
    if paper_exists.is_none() {
        return Err(AppError::NotFound("Question paper not found".to_string()));
    }

    let exam = sqlx::query_as::<_, Exam>(
        r#"
        INSERT INTO exams (faculty_id, name, paper_id, start_time, end_time)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING id, faculty_id, name, paper_id, start_time, end_time, created_at
        "#,
    )
    .bind(faculty_id)
    .bind(&payload.name)
    .bind(payload.paper_id)
    .bind(payload.start_time)
    .bind(payload.end_time)
    .fetch_one(&pool)
    .await?;

    tracing::info!("Exam '{}' created by faculty {}", exam.name, faculty_id);

    notify::broadcast_students(
        pool,
        notify::KIND_EXAM_CREATED,
        format!("New exam: {}", exam.name),
        format!(
            "The exam '{}' is scheduled from {} to {}.",
            exam.name, exam.start_time, exam.end_time
        ),
        Some(exam.id),
    );

    Ok((StatusCode::CREATED, Json(exam)))
}

/// Exam detail. Faculty get the raw record; students get the paper's
/// questions with answers stripped, plus the duration.
pub async fn get_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = fetch_exam(&pool, id).await?;

    if claims.role == ROLE_FACULTY {
        return Ok(Json(exam).into_response());
    }

    let sql = format!("{} WHERE e.id = ?1", EXAM_SUMMARY_SQL);
    let summary = sqlx::query_as::<_, ExamSummary>(&sql)
        .bind(id)
        .fetch_one(&pool)
        .await?;

    let questions: Vec<PublicQuestion> = paper_questions(&pool, exam.paper_id)
        .await?
        .into_iter()
        .map(PublicQuestion::from)
        .collect();

    let duration_minutes = (exam.end_time - exam.start_time).num_minutes();

    Ok(Json(StudentExamView {
        id: exam.id,
        name: exam.name,
        faculty_name: summary.faculty_name,
        total_marks: summary.total_marks,
        start_time: exam.start_time,
        end_time: exam.end_time,
        duration_minutes,
        questions,
    })
    .into_response())
}

/// Updates an exam. Owner only.
pub async fn update_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let faculty_id = claims.user_id();
    let existing = owned_exam(&pool, id, faculty_id).await?;

    if let Some(paper_id) = payload.paper_id {
        let owned: Option<i64> =
            sqlx::query_scalar("SELECT id FROM question_papers WHERE id = ?1 AND faculty_id = ?2")
                .bind(paper_id)
                .bind(faculty_id)
                .fetch_optional(&pool)
                .await?;
        if owned.is_none() {
            return Err(AppError::NotFound("Question paper not found".to_string()));
        }
    }

    let start_time = payload.start_time.unwrap_or(existing.start_time);
    let end_time = payload.end_time.unwrap_or(existing.end_time);
    if end_time <= start_time {
        return Err(AppError::BadRequest(
            "end_time must be after start_time".to_string(),
        ));
    }

    let exam = sqlx::query_as::<_, Exam>(
        r#"
        UPDATE exams SET name = ?1, paper_id = ?2, start_time = ?3, end_time = ?4
        WHERE id = ?5
        RETURNING id, faculty_id, name, paper_id, start_time, end_time, created_at
        "#,
    )
    .bind(payload.name.unwrap_or(existing.name))
    .bind(payload.paper_id.unwrap_or(existing.paper_id))
    .bind(start_time)
    .bind(end_time)
    .bind(id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(exam))
}

/// Deletes an exam. Owner only. Attempts on the exam cascade away.
pub async fn delete_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = owned_exam(&pool, id, claims.user_id()).await?;

    sqlx::query("DELETE FROM exams WHERE id = ?1")
        .bind(id)
        .execute(&pool)
        .await?;

    tracing::info!("Exam '{}' deleted", exam.name);

    Ok(StatusCode::NO_CONTENT)
}

pub async fn fetch_exam(pool: &SqlitePool, id: i64) -> Result<Exam, AppError> {
    sqlx::query_as::<_, Exam>(
        "SELECT id, faculty_id, name, paper_id, start_time, end_time, created_at FROM exams WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Exam not found".to_string()))
}

async fn owned_exam(pool: &SqlitePool, id: i64, faculty_id: i64) -> Result<Exam, AppError> {
    let exam = fetch_exam(pool, id).await?;

    if exam.faculty_id != faculty_id {
        return Err(AppError::Forbidden(
            "You can only modify your own exams".to_string(),
        ));
    }

    Ok(exam)
}
