use axum::{
    Extension, Json,
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Value, json};
use tracing::info;

use tikitaka_db::models::{FeedFilter, Identity, NewPost, PostChanges, PostView};
use tikitaka_db::{Database, Relation};
use tikitaka_types::api::{CreatePostRequest, FeedQuery, PageQuery, UpdatePostRequest};
use tikitaka_types::pagination::{Page, parse_positive};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Id, ValidJson};
use crate::media::{MediaKind, read_upload};
use crate::middleware::Viewer;

pub const FEED_PAGE_SIZE: i64 = 10;

/// Fill `is_liked` / `is_favorited` for the viewer. One query per relation.
pub(crate) async fn mark_viewer_flags(db: &Database, viewer: Option<i64>, posts: &mut [PostView]) -> anyhow::Result<()> {
    let Some(user_id) = viewer else {
        return Ok(());
    };
    if posts.is_empty() {
        return Ok(());
    }

    let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    let liked = db.marked_targets(Relation::PostLike, user_id, &ids).await?;
    let favorited = db.marked_targets(Relation::PostFavorite, user_id, &ids).await?;
    for post in posts.iter_mut() {
        post.is_liked = liked.contains(&post.id);
        post.is_favorited = favorited.contains(&post.id);
    }
    Ok(())
}

async fn feed_page(
    state: &AppState,
    viewer: &Viewer,
    filter: FeedFilter,
    page: Page,
) -> ApiResult<Json<Value>> {
    let mut posts = state.db.feed(filter, page.limit, page.offset()).await?;
    mark_viewer_flags(&state.db, viewer.id(), &mut posts).await?;

    let pagination = page.info(posts.len());
    Ok(Json(json!({
        "success": true,
        "posts": posts,
        "pagination": pagination,
    })))
}

pub async fn feed(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<FeedQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = Page::from_query(query.page.as_deref(), query.limit.as_deref(), FEED_PAGE_SIZE);
    let filter = FeedFilter {
        team_id: parse_positive(query.team_id.as_deref()),
        author_id: None,
    };
    feed_page(&state, &viewer, filter, page).await
}

pub async fn user_posts(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Id(user_id): Id,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = Page::from_query(query.page.as_deref(), query.limit.as_deref(), FEED_PAGE_SIZE);
    let filter = FeedFilter {
        team_id: None,
        author_id: Some(user_id),
    };
    feed_page(&state, &viewer, filter, page).await
}

pub async fn drafts(State(state): State<AppState>, Extension(me): Extension<Identity>) -> ApiResult<impl IntoResponse> {
    let drafts = state.db.drafts_of(me.id).await?;
    Ok(Json(json!({
        "success": true,
        "drafts": drafts,
    })))
}

pub async fn favorites(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = Page::from_query(query.page.as_deref(), query.limit.as_deref(), FEED_PAGE_SIZE);
    let mut posts = state.db.favorite_posts(me.id, page.limit, page.offset()).await?;
    mark_viewer_flags(&state.db, Some(me.id), &mut posts).await?;

    let pagination = page.info(posts.len());
    Ok(Json(json!({
        "success": true,
        "posts": posts,
        "pagination": pagination,
    })))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
    ValidJson(req): ValidJson<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    if !state.db.team_exists(req.team_id).await? {
        return Err(ApiError::bad_request("Invalid team"));
    }
    let image_url = match req.image_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => Some(checked_image_url(&state, url, None).await?),
        None => None,
    };

    let post_id = state
        .db
        .create_post(&NewPost {
            user_id: me.id,
            team_id: req.team_id,
            content: req.content.trim(),
            image_url,
            is_draft: req.is_draft,
        })
        .await?;

    let post = state
        .db
        .find_post(post_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("post {post_id} missing after insert"))?;

    info!("User {} created post {} (draft: {})", me.id, post_id, req.is_draft);
    let message = if req.is_draft {
        "Draft saved successfully"
    } else {
        "Post created successfully"
    };
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": message,
            "post": post,
        })),
    ))
}

pub async fn upload_image(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let upload = read_upload(&mut multipart, MediaKind::PostImage).await?;
    let image_url = state.media.save(MediaKind::PostImage, &upload).await?;

    info!("User {} uploaded {}", me.id, image_url);
    Ok(Json(json!({
        "success": true,
        "message": "Image uploaded successfully",
        "image_url": image_url,
    })))
}

pub async fn update_post(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
    Id(post_id): Id,
    ValidJson(req): ValidJson<UpdatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    let current = state
        .db
        .post_meta(post_id)
        .await?
        .filter(|p| p.user_id == me.id)
        .ok_or_else(|| ApiError::not_found("Post not found or not yours"))?;

    if !state.db.team_exists(req.team_id).await? {
        return Err(ApiError::bad_request("Invalid team"));
    }

    // Absent keeps the current image, empty clears it
    let image_url = match req.image_url.as_deref().map(str::trim) {
        None => current.image_url.clone(),
        Some("") => None,
        Some(url) if current.image_url.as_deref() == Some(url) => Some(url.to_string()),
        Some(url) => Some(checked_image_url(&state, url, Some(post_id)).await?.to_string()),
    };

    state
        .db
        .update_post(
            post_id,
            &PostChanges {
                content: req.content.trim(),
                team_id: req.team_id,
                is_draft: req.is_draft.unwrap_or(current.is_draft),
                image_url: image_url.as_deref(),
            },
        )
        .await?;

    if let Some(old) = current.image_url.as_deref() {
        if image_url.as_deref() != Some(old) {
            state.media.delete(old).await;
        }
    }

    let mut post = state
        .db
        .find_post(post_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    mark_viewer_flags(&state.db, Some(me.id), std::slice::from_mut(&mut post)).await?;

    info!("User {} updated post {}", me.id, post_id);
    Ok(Json(json!({
        "success": true,
        "message": "Post updated successfully",
        "post": post,
    })))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
    Id(post_id): Id,
) -> ApiResult<impl IntoResponse> {
    let post = state
        .db
        .post_meta(post_id)
        .await?
        .filter(|p| p.user_id == me.id)
        .ok_or_else(|| ApiError::not_found("Post not found or not yours"))?;

    state.db.delete_post(post_id).await?;
    if let Some(url) = post.image_url.as_deref() {
        state.media.delete(url).await;
    }

    info!("User {} deleted post {}", me.id, post_id);
    Ok(Json(json!({
        "success": true,
        "message": "Post deleted successfully",
    })))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
    Id(post_id): Id,
) -> ApiResult<impl IntoResponse> {
    let post = state
        .db
        .post_meta(post_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    let outcome = state.db.toggle_relation(Relation::PostLike, me.id, post_id).await?;
    if outcome.active && post.user_id != me.id {
        state.notifier.post_liked(post.user_id, me.id, post_id);
    }

    let message = if outcome.active { "Like added" } else { "Like removed" };
    Ok(Json(json!({
        "success": true,
        "message": message,
        "is_liked": outcome.active,
        "likes_count": outcome.count,
    })))
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
    Id(post_id): Id,
) -> ApiResult<impl IntoResponse> {
    if state.db.post_meta(post_id).await?.is_none() {
        return Err(ApiError::not_found("Post not found"));
    }

    let outcome = state.db.toggle_relation(Relation::PostFavorite, me.id, post_id).await?;
    let message = if outcome.active {
        "Added to favorites"
    } else {
        "Removed from favorites"
    };
    Ok(Json(json!({
        "success": true,
        "message": message,
        "is_favorited": outcome.active,
    })))
}

/// An attached image must be a post upload that is still on disk and not
/// referenced by any other post.
async fn checked_image_url<'a>(state: &AppState, url: &'a str, post_id: Option<i64>) -> ApiResult<&'a str> {
    if !state.media.exists(MediaKind::PostImage, url).await || state.db.image_in_use(url, post_id).await? {
        return Err(ApiError::bad_request("Invalid image_url"));
    }
    Ok(url)
}
