use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde_json::json;

use tikitaka_db::models::Identity;
use tikitaka_types::api::PageQuery;
use tikitaka_types::pagination::Page;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::Id;

const NOTIFICATIONS_PAGE_SIZE: i64 = 20;

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = Page::from_query(query.page.as_deref(), query.limit.as_deref(), NOTIFICATIONS_PAGE_SIZE);
    let notifications = state.db.notifications_for(me.id, page.limit, page.offset()).await?;
    let unread_count = state.db.unread_notifications(me.id).await?;

    let pagination = page.info(notifications.len());
    Ok(Json(json!({
        "success": true,
        "notifications": notifications,
        "unread_count": unread_count,
        "pagination": pagination,
    })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
    Id(notification_id): Id,
) -> ApiResult<impl IntoResponse> {
    if !state.db.mark_notification_read(notification_id, me.id).await? {
        return Err(ApiError::not_found("Notification not found"));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Notification marked as read",
    })))
}

pub async fn mark_all_read(State(state): State<AppState>, Extension(me): Extension<Identity>) -> ApiResult<impl IntoResponse> {
    let updated = state.db.mark_all_notifications_read(me.id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "All notifications marked as read",
        "updated": updated,
    })))
}
