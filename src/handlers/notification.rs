// src/handlers/notification.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::notification::{Notification, NotificationListParams},
    utils::jwt::Claims,
};

/// Lists the caller's notifications, newest first.
pub async fn list_notifications(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<NotificationListParams>,
) -> Result<impl IntoResponse, AppError> {
    let unread_only = params.unread.unwrap_or(false);

    let notifications = sqlx::query_as::<_, Notification>(
        r#"
        SELECT id, recipient_id, kind, title, message, exam_id, is_read, created_at
        FROM notifications
        WHERE recipient_id = ?1 AND (?2 = 0 OR is_read = 0)
        ORDER BY id DESC
        "#,
    )
    .bind(claims.user_id())
    .bind(unread_only)
    .fetch_all(&pool)
    .await?;

    Ok(Json(notifications))
}

/// Marks one of the caller's notifications as read.
pub async fn mark_read(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND recipient_id = ?2",
    )
    .bind(id)
    .bind(claims.user_id())
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "id": id, "is_read": true })))
}
