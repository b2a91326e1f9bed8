// src/utils/notify.rs
//
// Fire-and-forget notification delivery. Handlers never wait on (or fail
// because of) a notification insert; failures are logged and dropped.

use sqlx::SqlitePool;

use crate::utils::jwt::ROLE_STUDENT;

pub const KIND_WELCOME: &str = "WELCOME";
pub const KIND_EXAM_CREATED: &str = "EXAM_CREATED";
pub const KIND_RESULT_READY: &str = "RESULT_READY";

/// Queue a notification for a single recipient on a background task.
pub fn dispatch(
    pool: SqlitePool,
    recipient_id: i64,
    kind: &'static str,
    title: String,
    message: String,
    exam_id: Option<i64>,
) {
    tokio::spawn(async move {
        let res = sqlx::query(
            "INSERT INTO notifications (recipient_id, kind, title, message, exam_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(recipient_id)
        .bind(kind)
        .bind(&title)
        .bind(&message)
        .bind(exam_id)
        .execute(&pool)
        .await;

        if let Err(e) = res {
            tracing::warn!("Failed to deliver {} notification to user {}: {:?}", kind, recipient_id, e);
        }
    });
}

/// Queue a notification for every student on a background task.
pub fn broadcast_students(
    pool: SqlitePool,
    kind: &'static str,
    title: String,
    message: String,
    exam_id: Option<i64>,
) {
    tokio::spawn(async move {
        let res = sqlx::query(
            "INSERT INTO notifications (recipient_id, kind, title, message, exam_id)
             SELECT id, ?1, ?2, ?3, ?4 FROM users WHERE role = ?5",
        )
        .bind(kind)
        .bind(&title)
        .bind(&message)
        .bind(exam_id)
        .bind(ROLE_STUDENT)
        .execute(&pool)
        .await;

        match res {
            Ok(done) => {
                tracing::debug!("{} broadcast reached {} students", kind, done.rows_affected())
            }
            Err(e) => tracing::warn!("Failed to broadcast {} notification: {:?}", kind, e),
        }
    });
}
