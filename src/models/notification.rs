// src/models/notification.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Represents the 'notifications' table: in-app messages delivered to a user
/// by background tasks (welcome, new exam, result ready).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: i64,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub exam_id: Option<i64>,
    pub is_read: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Query params for the notification list.
#[derive(Debug, Deserialize)]
pub struct NotificationListParams {
    /// When true, only unread notifications are returned.
    pub unread: Option<bool>,
}
