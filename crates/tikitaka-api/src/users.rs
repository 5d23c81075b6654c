use axum::{
    Extension, Json,
    extract::{Multipart, Query, State},
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;

use tikitaka_db::models::{Identity, ProfileChanges};
use tikitaka_types::api::{ChangePasswordRequest, SearchQuery, UpdateProfileRequest};

use crate::AppState;
use crate::auth::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::extract::{Id, ValidJson};
use crate::media::{MediaKind, read_upload};
use crate::teams::search_term;

pub async fn own_profile(State(state): State<AppState>, Extension(me): Extension<Identity>) -> ApiResult<impl IntoResponse> {
    let user = state
        .db
        .profile(me.id, true)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(json!({
        "success": true,
        "user": user,
    })))
}

/// Public profile. The email is never included.
pub async fn get_user(State(state): State<AppState>, Id(user_id): Id) -> ApiResult<impl IntoResponse> {
    let user = state
        .db
        .profile(user_id, false)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(json!({
        "success": true,
        "user": user,
    })))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
    ValidJson(req): ValidJson<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let changes = ProfileChanges {
        username: req.username.map(|u| u.trim().to_string()),
        full_name: req.full_name.map(|n| n.trim().to_string()),
        team_id: req.team_id,
        bio: req.bio,
    };
    if changes.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    if let Some(username) = changes.username.as_deref() {
        if state.db.username_taken_by_other(username, me.id).await? {
            return Err(ApiError::conflict("Username already in use"));
        }
    }
    if let Some(team_id) = changes.team_id {
        if !state.db.team_exists(team_id).await? {
            return Err(ApiError::bad_request("Invalid team"));
        }
    }

    state
        .db
        .update_profile(me.id, &changes)
        .await
        .map_err(|e| ApiError::unique_conflict(e, "Username already in use"))?;
    let user = state
        .db
        .profile(me.id, true)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!("User {} updated their profile", me.id);
    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "user": user,
    })))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
    ValidJson(req): ValidJson<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let current_hash = state
        .db
        .password_hash(me.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !verify_password(&req.current_password, &current_hash) {
        return Err(ApiError::bad_request("Current password is incorrect"));
    }

    let new_hash = hash_password(&req.new_password)?;
    state.db.set_password_hash(me.id, &new_hash).await?;

    info!("User {} changed their password", me.id);
    Ok(Json(json!({
        "success": true,
        "message": "Password changed successfully",
    })))
}

pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(me): Extension<Identity>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let upload = read_upload(&mut multipart, MediaKind::Avatar).await?;
    let previous = state.db.profile_image(me.id).await?.flatten();
    let image_url = state.media.save(MediaKind::Avatar, &upload).await?;

    if let Err(e) = state.db.set_profile_image(me.id, &image_url).await {
        state.media.delete(&image_url).await;
        return Err(e.into());
    }

    if let Some(old) = previous.filter(|old| *old != image_url) {
        state.media.delete(&old).await;
    }

    info!("User {} uploaded avatar {}", me.id, image_url);
    Ok(Json(json!({
        "success": true,
        "message": "Profile image updated successfully",
        "image_url": image_url,
    })))
}

pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let term = search_term(query.q.as_deref())?;
    let users = state.db.search_users(term).await?;

    Ok(Json(json!({
        "success": true,
        "users": users,
    })))
}
