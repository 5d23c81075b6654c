use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;

use tikitaka_db::Relation;
use tikitaka_db::models::Identity;
use tikitaka_types::api::{CommentRequest, PageQuery};
use tikitaka_types::pagination::Page;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Id, ValidJson};
use crate::middleware::Viewer;

pub const COMMENTS_PAGE_SIZE: i64 = 20;

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Id(post_id): Id,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    if state.db.post_meta(post_id).await?.is_none() {
        return Err(ApiError::not_found("Post not found"));
    }

    let page = Page::from_query(query.page.as_deref(), query.limit.as_deref(), COMMENTS_PAGE_SIZE);
    let mut comments = state.db.comments_for_post(post_id, page.limit, page.offset()).await?;
    let total = state.db.count_comments(post_id).await?;

    if let Some(user_id) = viewer.id() {
        let ids: Vec<i64> = comments.iter().map(|c| c.id).collect();
        let liked = state.db.marked_targets(Relation::CommentLike, user_id, &ids).await?;
        for comment in comments.iter_mut() {
            comment.is_liked = liked.contains(&comment.id);
        }
    }

    let pagination = page.info_with_total(comments.len(), total);
    Ok(Json(json!({
        "success": true,
        "comments": comments,
        "pagination": pagination,
    })))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
    Id(post_id): Id,
    ValidJson(req): ValidJson<CommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let post = state
        .db
        .post_meta(post_id)
        .await?
        .filter(|p| !p.is_draft)
        .ok_or_else(|| ApiError::not_found("Post not found or is a draft"))?;

    let comment_id = state.db.create_comment(post_id, me.id, req.content.trim()).await?;
    if post.user_id != me.id {
        state.notifier.comment_created(post.user_id, me.id, post_id, comment_id);
    }

    let comment = state
        .db
        .find_comment(comment_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("comment {comment_id} missing after insert"))?;

    info!("User {} commented on post {}", me.id, post_id);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Comment created successfully",
            "comment": comment,
        })),
    ))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
    Id(comment_id): Id,
    ValidJson(req): ValidJson<CommentRequest>,
) -> ApiResult<impl IntoResponse> {
    ensure_author(&state, comment_id, me.id).await?;
    state.db.update_comment(comment_id, req.content.trim()).await?;

    let mut comment = state
        .db
        .find_comment(comment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;
    comment.is_liked = state
        .db
        .marked_targets(Relation::CommentLike, me.id, &[comment_id])
        .await?
        .contains(&comment_id);

    Ok(Json(json!({
        "success": true,
        "message": "Comment updated successfully",
        "comment": comment,
    })))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
    Id(comment_id): Id,
) -> ApiResult<impl IntoResponse> {
    ensure_author(&state, comment_id, me.id).await?;
    state.db.delete_comment(comment_id).await?;

    info!("User {} deleted comment {}", me.id, comment_id);
    Ok(Json(json!({
        "success": true,
        "message": "Comment deleted successfully",
    })))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
    Id(comment_id): Id,
) -> ApiResult<impl IntoResponse> {
    if state.db.comment_author(comment_id).await?.is_none() {
        return Err(ApiError::not_found("Comment not found"));
    }

    let outcome = state.db.toggle_relation(Relation::CommentLike, me.id, comment_id).await?;
    let message = if outcome.active { "Like added" } else { "Like removed" };
    Ok(Json(json!({
        "success": true,
        "message": message,
        "data": {
            "is_liked": outcome.active,
            "likes_count": outcome.count,
        },
    })))
}

async fn ensure_author(state: &AppState, comment_id: i64, user_id: i64) -> ApiResult<()> {
    match state.db.comment_author(comment_id).await? {
        Some(author) if author == user_id => Ok(()),
        _ => Err(ApiError::not_found("Comment not found or not yours")),
    }
}
