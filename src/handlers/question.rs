// src/handlers/question.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
    error::AppError,
    models::question::{CreateQuestionRequest, Question, UpdateQuestionRequest, normalize_answer},
    utils::{html::clean_html, jwt::Claims},
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Lists the caller's question bank, newest first.
pub async fn list_questions(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0).max(0);

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, faculty_id, text, option_a, option_b, option_c, option_d,
               answer, max_marks, created_at
        FROM questions
        WHERE faculty_id = ?1
        ORDER BY id DESC
        LIMIT ?2 OFFSET ?3
        "#,
    )
    .bind(claims.user_id())
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    Ok(Json(questions))
}

/// Creates a new question in the caller's bank.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let answer = normalize_answer(&payload.answer)?;

    let question = sqlx::query_as::<_, Question>(
        r#"
        INSERT INTO questions (faculty_id, text, option_a, option_b, option_c, option_d, answer, max_marks)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        RETURNING id, faculty_id, text, option_a, option_b, option_c, option_d,
                  answer, max_marks, created_at
        "#,
    )
    .bind(claims.user_id())
    .bind(clean_html(&payload.text))
    .bind(clean_html(&payload.option_a))
    .bind(clean_html(&payload.option_b))
    .bind(clean_html(&payload.option_c))
    .bind(clean_html(&payload.option_d))
    .bind(&answer)
    .bind(payload.max_marks)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Fetches a question and verifies the caller owns it.
async fn owned_question(
    pool: &SqlitePool,
    id: i64,
    faculty_id: i64,
) -> Result<Question, AppError> {
    let question = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, faculty_id, text, option_a, option_b, option_c, option_d,
               answer, max_marks, created_at
        FROM questions WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    if question.faculty_id != faculty_id {
        return Err(AppError::Forbidden(
            "You can only modify your own questions".to_string(),
        ));
    }

    Ok(question)
}

/// Updates a question. Owner only.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let existing = owned_question(&pool, id, claims.user_id()).await?;

    let answer = match &payload.answer {
        Some(a) => normalize_answer(a)?,
        None => existing.answer,
    };

    let question = sqlx::query_as::<_, Question>(
        r#"
        UPDATE questions
        SET text = ?1, option_a = ?2, option_b = ?3, option_c = ?4, option_d = ?5,
            answer = ?6, max_marks = ?7
        WHERE id = ?8
        RETURNING id, faculty_id, text, option_a, option_b, option_c, option_d,
                  answer, max_marks, created_at
        "#,
    )
    .bind(payload.text.as_deref().map(clean_html).unwrap_or(existing.text))
    .bind(payload.option_a.as_deref().map(clean_html).unwrap_or(existing.option_a))
    .bind(payload.option_b.as_deref().map(clean_html).unwrap_or(existing.option_b))
    .bind(payload.option_c.as_deref().map(clean_html).unwrap_or(existing.option_c))
    .bind(payload.option_d.as_deref().map(clean_html).unwrap_or(existing.option_d))
    .bind(&answer)
    .bind(payload.max_marks.unwrap_or(existing.max_marks))
    .bind(id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(question))
}

/// Deletes a question. Owner only.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    owned_question(&pool, id, claims.user_id()).await?;

    sqlx::query("DELETE FROM questions WHERE id = ?1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
