use serde::{Deserialize, Serialize};

/// Kind of activity a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Someone commented on the recipient's post
    Comment,
    /// Someone liked the recipient's post
    Like,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Comment => "comment",
            NotificationKind::Like => "like",
        }
    }
}

/// A notification about to be stored and pushed to its recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

/// Message published on the push channel once a notification is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PushEvent {
    Notification {
        notification_id: i64,
        user_id: i64,
        title: String,
        body: String,
        payload: serde_json::Value,
    },
}
