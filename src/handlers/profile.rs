// src/handlers/profile.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::user::{MeResponse, User},
    utils::jwt::{Claims, ROLE_STUDENT},
};

/// Get the current user's profile and role-specific statistics.
pub async fn get_me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password, role, created_at FROM users WHERE id = ?1",
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    let mut me = MeResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        role: user.role.clone(),
        created_at: user.created_at,
        address: None,
        stream: None,
        subject: None,
        completed_exams: None,
        total_score: None,
        questions_count: None,
        exams_count: None,
    };

    if user.role == ROLE_STUDENT {
        let profile = sqlx::query_as::<_, (Option<String>, Option<String>)>(
            "SELECT address, stream FROM student_info WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&pool)
        .await?;
        if let Some((address, stream)) = profile {
            me.address = address;
            me.stream = stream;
        }

        let (completed, total_score) = sqlx::query_as::<_, (i64, Option<i64>)>(
            "SELECT COUNT(*), SUM(score) FROM attempts WHERE student_id = ?1 AND completed = 1",
        )
        .bind(user_id)
        .fetch_one(&pool)
        .await?;
        me.completed_exams = Some(completed);
        me.total_score = Some(total_score.unwrap_or(0));
    } else {
        let profile = sqlx::query_as::<_, (Option<String>, Option<String>)>(
            "SELECT address, subject FROM faculty_info WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&pool)
        .await?;
        if let Some((address, subject)) = profile {
            me.address = address;
            me.subject = subject;
        }

        let questions: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE faculty_id = ?1")
                .bind(user_id)
                .fetch_one(&pool)
                .await?;
        let exams: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exams WHERE faculty_id = ?1")
            .bind(user_id)
            .fetch_one(&pool)
            .await?;
        me.questions_count = Some(questions);
        me.exams_count = Some(exams);
    }

    Ok(Json(me))
}
