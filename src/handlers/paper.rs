// src/handlers/paper.rs

use std::collections::BTreeSet;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        paper::{
            CreatePaperRequest, PaperDetail, PaperSummary, QuestionPaper, UpdatePaperRequest,
            WizardPaperRequest,
        },
        question::{Question, normalize_answer},
    },
    utils::{html::clean_html, jwt::Claims},
};

/// Lists the caller's question papers with question counts.
pub async fn list_papers(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let papers = sqlx::query_as::<_, PaperSummary>(
        r#"
        SELECT p.id, p.title, p.total_marks, COUNT(pq.question_id) AS question_count, p.created_at
        FROM question_papers p
        LEFT JOIN paper_questions pq ON pq.paper_id = p.id
        WHERE p.faculty_id = ?1
        GROUP BY p.id
        ORDER BY p.id DESC
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(papers))
}

/// Paper detail with its full question list. Owner only.
pub async fn get_paper(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let paper = owned_paper(&pool, id, claims.user_id()).await?;
    let questions = paper_questions(&pool, paper.id).await?;

    Ok(Json(PaperDetail {
        id: paper.id,
        title: paper.title,
        total_marks: paper.total_marks,
        questions,
    }))
}

/// Creates a paper from existing questions in the caller's bank.
pub async fn create_paper(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePaperRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let faculty_id = claims.user_id();
    let ids: BTreeSet<i64> = payload.question_ids.iter().copied().collect();
    verify_question_ownership(&pool, faculty_id, &ids).await?;

    let mut tx = pool.begin().await?;

    let paper = sqlx::query_as::<_, QuestionPaper>(
        r#"
        INSERT INTO question_papers (faculty_id, title, total_marks)
        VALUES (?1, ?2, ?3)
        RETURNING id, faculty_id, title, total_marks, created_at
        "#,
    )
    .bind(faculty_id)
    .bind(&payload.title)
    .bind(payload.total_marks)
    .fetch_one(&mut *tx)
    .await?;

    for qid in &ids {
        sqlx::query("INSERT INTO paper_questions (paper_id, question_id) VALUES (?1, ?2)")
            .bind(paper.id)
            .bind(qid)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!("Paper '{}' created with {} questions", paper.title, ids.len());

    Ok((StatusCode::CREATED, Json(paper)))
}

/// One-shot paper wizard: creates the questions and the paper together,
/// rejecting the whole request when the marks don't add up to `total_marks`.
/// Nothing is persisted on failure.
pub async fn create_paper_wizard(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<WizardPaperRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let marks_sum: i64 = payload.questions.iter().map(|q| q.max_marks).sum();
    if marks_sum != payload.total_marks {
        return Err(AppError::BadRequest(
            "Sum of question marks must equal total marks".to_string(),
        ));
    }

    let faculty_id = claims.user_id();
    let mut tx = pool.begin().await?;

    let paper = sqlx::query_as::<_, QuestionPaper>(
        r#"
        INSERT INTO question_papers (faculty_id, title, total_marks)
        VALUES (?1, ?2, ?3)
        RETURNING id, faculty_id, title, total_marks, created_at
        "#,
    )
    .bind(faculty_id)
    .bind(&payload.title)
    .bind(payload.total_marks)
    .fetch_one(&mut *tx)
    .await?;

    for q in &payload.questions {
        let answer = normalize_answer(&q.answer)?;

        let question_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO questions (faculty_id, text, option_a, option_b, option_c, option_d, answer, max_marks)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING id
            "#,
        )
        .bind(faculty_id)
        .bind(clean_html(&q.text))
        .bind(clean_html(&q.option_a))
        .bind(clean_html(&q.option_b))
        .bind(clean_html(&q.option_c))
        .bind(clean_html(&q.option_d))
        .bind(&answer)
        .bind(q.max_marks)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO paper_questions (paper_id, question_id) VALUES (?1, ?2)")
            .bind(paper.id)
            .bind(question_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!(
        "Paper '{}' created via wizard with {} questions",
        paper.title,
        payload.questions.len()
    );

    Ok((StatusCode::CREATED, Json(paper)))
}

/// Updates a paper's title/marks and optionally replaces its question set.
/// Owner only.
pub async fn update_paper(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePaperRequest>,
) -> Result<impl IntoResponse, AppError> {
    let faculty_id = claims.user_id();
    let existing = owned_paper(&pool, id, faculty_id).await?;

    let ids: Option<BTreeSet<i64>> = payload
        .question_ids
        .map(|ids| ids.into_iter().collect::<BTreeSet<i64>>());

    if let Some(ids) = &ids {
        if ids.is_empty() {
            return Err(AppError::BadRequest(
                "At least one question is required.".to_string(),
            ));
        }
        verify_question_ownership(&pool, faculty_id, ids).await?;
    }

    let mut tx = pool.begin().await?;

    let paper = sqlx::query_as::<_, QuestionPaper>(
        r#"
        UPDATE question_papers SET title = ?1, total_marks = ?2 WHERE id = ?3
        RETURNING id, faculty_id, title, total_marks, created_at
        "#,
    )
    .bind(payload.title.unwrap_or(existing.title))
    .bind(payload.total_marks.unwrap_or(existing.total_marks))
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(ids) = &ids {
        sqlx::query("DELETE FROM paper_questions WHERE paper_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for qid in ids {
            sqlx::query("INSERT INTO paper_questions (paper_id, question_id) VALUES (?1, ?2)")
                .bind(id)
                .bind(qid)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;

    Ok(Json(paper))
}

/// Deletes a paper. Owner only. Exams on the paper cascade away.
pub async fn delete_paper(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    owned_paper(&pool, id, claims.user_id()).await?;

    sqlx::query("DELETE FROM question_papers WHERE id = ?1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn owned_paper(
    pool: &SqlitePool,
    id: i64,
    faculty_id: i64,
) -> Result<QuestionPaper, AppError> {
    let paper = sqlx::query_as::<_, QuestionPaper>(
        "SELECT id, faculty_id, title, total_marks, created_at FROM question_papers WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Question paper not found".to_string()))?;

    if paper.faculty_id != faculty_id {
        return Err(AppError::Forbidden(
            "You can only modify your own question papers".to_string(),
        ));
    }

    Ok(paper)
}

/// All questions on a paper, in question-id order.
pub async fn paper_questions(pool: &SqlitePool, paper_id: i64) -> Result<Vec<Question>, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT q.id, q.faculty_id, q.text, q.option_a, q.option_b, q.option_c, q.option_d,
               q.answer, q.max_marks, q.created_at
        FROM questions q
        JOIN paper_questions pq ON pq.question_id = q.id
        WHERE pq.paper_id = ?1
        ORDER BY q.id
        "#,
    )
    .bind(paper_id)
    .fetch_all(pool)
    .await?;

    Ok(questions)
}

/// Fails with 400 unless every id names a question owned by the caller.
async fn verify_question_ownership(
    pool: &SqlitePool,
    faculty_id: i64,
    ids: &BTreeSet<i64>,
) -> Result<(), AppError> {
    let mut query_builder = sqlx::QueryBuilder::<Sqlite>::new(
        "SELECT COUNT(*) FROM questions WHERE faculty_id = ",
    );
    query_builder.push_bind(faculty_id);
    query_builder.push(" AND id IN (");

    let mut separated = query_builder.separated(",");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let owned: i64 = query_builder.build_query_scalar().fetch_one(pool).await?;

    if owned != ids.len() as i64 {
        return Err(AppError::BadRequest(
            "All questions must exist and belong to you".to_string(),
        ));
    }

    Ok(())
}
