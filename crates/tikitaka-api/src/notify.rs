use std::sync::Arc;

use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use tikitaka_db::Database;
use tikitaka_types::events::{NewNotification, NotificationKind, PushEvent};

/// Records notifications and publishes them on the push channel.
///
/// Delivery is fire-and-forget: the triggering request never waits for it
/// and failures are only logged.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

struct NotifierInner {
    db: Database,
    push_tx: broadcast::Sender<PushEvent>,
}

impl Notifier {
    pub fn new(db: Database) -> Self {
        let (push_tx, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(NotifierInner { db, push_tx }),
        }
    }

    /// Subscribe to push events. A push gateway would forward these to devices.
    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.inner.push_tx.subscribe()
    }

    /// Tell a post's owner that someone commented on it.
    pub fn comment_created(&self, owner_id: i64, commenter_id: i64, post_id: i64, comment_id: i64) -> JoinHandle<()> {
        let db = self.inner.db.clone();
        self.dispatch(async move {
            let name = actor_name(&db, commenter_id).await;
            NewNotification {
                user_id: owner_id,
                kind: NotificationKind::Comment,
                title: "New comment".into(),
                body: format!("{name} commented on your post"),
                data: json!({ "post_id": post_id, "comment_id": comment_id, "user_id": commenter_id }),
            }
        })
    }

    /// Tell a post's owner that someone liked it.
    pub fn post_liked(&self, owner_id: i64, liker_id: i64, post_id: i64) -> JoinHandle<()> {
        let db = self.inner.db.clone();
        self.dispatch(async move {
            let name = actor_name(&db, liker_id).await;
            NewNotification {
                user_id: owner_id,
                kind: NotificationKind::Like,
                title: "New like".into(),
                body: format!("{name} liked your post"),
                data: json!({ "post_id": post_id, "user_id": liker_id }),
            }
        })
    }

    fn dispatch<F>(&self, build: F) -> JoinHandle<()>
    where
        F: Future<Output = NewNotification> + Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let notification = build.await;
            let id = match inner.db.insert_notification(&notification).await {
                Ok(id) => id,
                Err(e) => {
                    warn!("Failed to store notification for user {}: {:#}", notification.user_id, e);
                    return;
                }
            };

            let mut payload = notification.data;
            if let Some(obj) = payload.as_object_mut() {
                obj.insert("type".into(), json!(notification.kind.as_str()));
            }
            let event = PushEvent::Notification {
                notification_id: id,
                user_id: notification.user_id,
                title: notification.title,
                body: notification.body,
                payload,
            };
            // No subscribers is fine
            if inner.push_tx.send(event).is_err() {
                debug!("No push subscribers for notification {}", id);
            }
        })
    }
}

async fn actor_name(db: &Database, user_id: i64) -> String {
    match db.full_name(user_id).await {
        Ok(Some(name)) => name,
        Ok(None) => "Someone".into(),
        Err(e) => {
            warn!("Failed to look up user {}: {:#}", user_id, e);
            "Someone".into()
        }
    }
}
